//! On-disk cache helpers shared by the lookup adapters.
//!
//! Every cache file is keyed by [`safe_filename`] and written through
//! [`write_atomic`]: the bytes go to a uniquely named temp file in the same
//! directory which is then renamed over the target.  Concurrent writers of the
//! same key therefore never leave a torn file behind; the last rename wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppPaths;

use super::TranslationCache;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cache key for `word`: ASCII letters only, lowercased.
pub fn safe_filename(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Write `bytes` to `path` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Unique temp path next to `path`, so the final rename stays on one
/// filesystem.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.{n}.tmp", std::process::id()))
}

/// Read and parse a JSON cache file.  Missing or corrupt files are a miss.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("cache: ignoring unreadable {}: {e}", path.display());
            None
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec(value).map_err(io::Error::other)?;
    write_atomic(path, &bytes)
}

// ---------------------------------------------------------------------------
// JsonTranslationCache
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct CachedTranslation {
    trans: String,
}

/// Word translations stored as `<dir>/<word>-trans.json`.
#[derive(Debug, Clone)]
pub struct JsonTranslationCache {
    dir: PathBuf,
}

impl JsonTranslationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, word: &str) -> Option<PathBuf> {
        let safe = safe_filename(word);
        (!safe.is_empty()).then(|| self.dir.join(format!("{safe}-trans.json")))
    }
}

impl TranslationCache for JsonTranslationCache {
    fn lookup(&self, word: &str) -> Option<String> {
        let cached: CachedTranslation = read_json(&self.path_for(word)?)?;
        let trans = cached.trans.trim();
        (!trans.is_empty()).then(|| trans.to_string())
    }

    fn store(&self, word: &str, translation: &str) {
        let Some(path) = self.path_for(word) else {
            return;
        };
        let value = CachedTranslation {
            trans: translation.to_string(),
        };
        if let Err(e) = write_json(&path, &value) {
            log::warn!("cache: failed to store translation for '{word}': {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| match entry.metadata() {
            Ok(meta) if meta.is_dir() => dir_size(&entry.path()),
            Ok(meta) => meta.len(),
            Err(_) => 0,
        })
        .sum()
}

/// Total size of the data directory in megabytes.
pub fn cache_size_mb(paths: &AppPaths) -> f64 {
    dir_size(&paths.data_dir) as f64 / (1024.0 * 1024.0)
}

/// Delete every cached file, keeping the directories and the vocabulary
/// list.  Returns the number of files removed.
pub fn clear_cache(paths: &AppPaths) -> usize {
    let mut removed = 0;
    for dir in paths.cache_dirs() {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path == paths.vocab_file || !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("cache: failed to remove {}: {e}", path.display()),
            }
        }
    }
    log::info!("cache: cleared {removed} files");
    removed
}
