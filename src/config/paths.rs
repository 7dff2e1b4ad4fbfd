//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\english-helper\
//!   macOS:   ~/Library/Application Support/english-helper/
//!   Linux:   ~/.config/english-helper/
//!
//! Data dir (caches + frequency list):
//!   Windows: %LOCALAPPDATA%\english-helper\
//!   macOS:   ~/Library/Application Support/english-helper/
//!   Linux:   ~/.local/share/english-helper/
//!
//! ```text
//! <data_dir>/
//!   vocab_20k.txt
//!   Images/   <word>.jpg, <word>.nofound
//!   Dicts/    <word>-full.json, <word>-trans.json
//!   Audio/    <word>-us.mp3, <word>-uk.mp3
//! ```

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Root of all cached data.
    pub data_dir: PathBuf,
    /// Cached illustrative images and not-found markers.
    pub images_dir: PathBuf,
    /// Cached dictionary entries and word translations.
    pub dicts_dir: PathBuf,
    /// Cached pronunciation audio.
    pub audio_dir: PathBuf,
    /// Word-frequency list used by the vocabulary filter.
    pub vocab_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "english-helper";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::with_roots(config_dir, data_dir)
    }

    /// Build the layout under explicit roots (useful for tests).
    pub fn with_roots(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let settings_file = config_dir.join("settings.toml");
        Self {
            settings_file,
            images_dir: data_dir.join("Images"),
            dicts_dir: data_dir.join("Dicts"),
            audio_dir: data_dir.join("Audio"),
            vocab_file: data_dir.join("vocab_20k.txt"),
            config_dir,
            data_dir,
        }
    }

    /// Create every cache directory.  Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.cache_dirs() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// The three cache subdirectories, in a fixed order.
    pub fn cache_dirs(&self) -> [&Path; 3] {
        [&self.images_dir, &self.dicts_dir, &self.audio_dir]
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.data_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .vocab_file
            .file_name()
            .is_some_and(|n| n == "vocab_20k.txt"));
    }

    #[test]
    fn ensure_dirs_creates_cache_tree() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = AppPaths::with_roots(dir.path().join("cfg"), dir.path().join("data"));
        paths.ensure_dirs().expect("create dirs");
        for d in paths.cache_dirs() {
            assert!(d.is_dir(), "{} missing", d.display());
        }
        // second call is a no-op
        paths.ensure_dirs().expect("idempotent");
    }
}
