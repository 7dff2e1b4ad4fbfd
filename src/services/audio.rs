//! Pronunciation audio: the TTS file cache and the external player.
//!
//! ```text
//! <audio_dir>/<word>-us.mp3      valid once larger than MIN_VALID_AUDIO_SIZE
//!
//! TtsAudioCache::download ──▶ temp file ──rename──▶ cache path
//! CommandPlayer::play_from_cache ──▶ `<player> [args] <path>`
//! ```
//!
//! Playback goes through an external command (`afplay`, `ffplay`,
//! PowerShell) run with `tokio::process`, so the async runtime is never
//! blocked while a word is spoken.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::cache::{safe_filename, temp_sibling};
use super::http::HttpClient;
use super::{AudioPlayer, AudioStore, FetchError};

/// A cached audio file at or below this size is treated as broken.
pub const MIN_VALID_AUDIO_SIZE: u64 = 1024;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised while fetching or playing pronunciation audio.  The
/// pipeline logs and swallows all of them.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The player executable could not be started.
    #[error("audio player '{0}' is not available")]
    NoPlayer(String),

    /// The player ran but reported failure.
    #[error("playback failed: {0}")]
    Playback(String),

    #[error("audio download failed: {0}")]
    Download(#[from] FetchError),

    #[error("audio file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Voice / AudioProbe
// ---------------------------------------------------------------------------

/// Pronunciation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Voice {
    #[default]
    Us,
    Uk,
}

impl Voice {
    /// Suffix used in cache file names.
    pub fn code(self) -> &'static str {
        match self {
            Voice::Us => "us",
            Voice::Uk => "uk",
        }
    }

    /// Language tag understood by the TTS endpoint.
    pub fn lang_tag(self) -> &'static str {
        match self {
            Voice::Us => "en-US",
            Voice::Uk => "en-GB",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "en-us" => Ok(Voice::Us),
            "uk" | "gb" | "en-gb" => Ok(Voice::Uk),
            other => Err(format!("unknown voice '{other}'")),
        }
    }
}

/// Result of a cache probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioProbe {
    pub exists: bool,
    pub size_ok: bool,
}

impl AudioProbe {
    pub fn is_ready(self) -> bool {
        self.exists && self.size_ok
    }
}

// ---------------------------------------------------------------------------
// TtsAudioCache
// ---------------------------------------------------------------------------

/// Pronunciation files stored as `<dir>/<word>-<voice>.mp3`.
#[derive(Debug, Clone)]
pub struct TtsAudioCache {
    http: HttpClient,
    dir: PathBuf,
}

impl TtsAudioCache {
    pub fn new(http: HttpClient, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    /// Download the pronunciation into the cache unless a valid file is
    /// already there.  Returns the cache path.
    pub async fn download(&self, word: &str, voice: Voice) -> Result<PathBuf, AudioError> {
        let path = self.cache_path(word, voice);
        if self.probe(word, voice).is_ready() {
            return Ok(path);
        }
        let bytes = self.http.get_bytes(&self.tts_url(word, voice)).await?;
        if (bytes.len() as u64) <= MIN_VALID_AUDIO_SIZE {
            return Err(AudioError::Download(FetchError::Parse(format!(
                "TTS answer too small ({} bytes)",
                bytes.len()
            ))));
        }
        let tmp = temp_sibling(&path);
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        log::debug!("audio: cached {}", path.display());
        Ok(path)
    }
}

impl AudioStore for TtsAudioCache {
    fn probe(&self, word: &str, voice: Voice) -> AudioProbe {
        match std::fs::metadata(self.cache_path(word, voice)) {
            Ok(meta) => AudioProbe {
                exists: true,
                size_ok: meta.len() > MIN_VALID_AUDIO_SIZE,
            },
            Err(_) => AudioProbe::default(),
        }
    }

    fn cache_path(&self, word: &str, voice: Voice) -> PathBuf {
        self.dir
            .join(format!("{}-{}.mp3", safe_filename(word), voice.code()))
    }

    fn tts_url(&self, word: &str, voice: Voice) -> String {
        tts_url(word, voice)
    }
}

/// Google TTS URL for `word`.
pub fn tts_url(word: &str, voice: Voice) -> String {
    reqwest::Url::parse_with_params(
        TTS_ENDPOINT,
        &[
            ("ie", "UTF-8"),
            ("client", "tw-ob"),
            ("tl", voice.lang_tag()),
            ("q", word),
        ],
    )
    .map(String::from)
    .unwrap_or_else(|_| TTS_ENDPOINT.to_string())
}

// ---------------------------------------------------------------------------
// CommandPlayer
// ---------------------------------------------------------------------------

/// Placeholder replaced with the audio path in player arguments.  When no
/// argument contains it, the path is appended.
const PATH_PLACEHOLDER: &str = "{path}";

/// Plays audio files by running an external command.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    http: HttpClient,
}

impl CommandPlayer {
    /// Build from a configured command line (whitespace-separated, no
    /// quoting) or fall back to the platform default.
    pub fn new(http: HttpClient, command: Option<&str>) -> Self {
        let mut parts: Vec<String> = match command.map(str::trim).filter(|c| !c.is_empty()) {
            Some(cmd) => cmd.split_whitespace().map(str::to_string).collect(),
            None => default_command(),
        };
        let program = parts.remove(0);
        Self {
            program,
            args: parts,
            http,
        }
    }

    fn command_for(&self, path: &Path) -> tokio::process::Command {
        let path = path.to_string_lossy();
        let mut cmd = tokio::process::Command::new(&self.program);
        let mut substituted = false;
        for arg in &self.args {
            if arg.contains(PATH_PLACEHOLDER) {
                substituted = true;
                cmd.arg(arg.replace(PATH_PLACEHOLDER, &path));
            } else {
                cmd.arg(arg);
            }
        }
        if !substituted {
            cmd.arg(path.as_ref());
        }
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[cfg(target_os = "macos")]
fn default_command() -> Vec<String> {
    vec!["afplay".into()]
}

#[cfg(windows)]
fn default_command() -> Vec<String> {
    let script = "Add-Type -AssemblyName presentationCore; \
                  $p = New-Object System.Windows.Media.MediaPlayer; \
                  $p.Open([uri]'{path}'); $p.Play(); Start-Sleep -Milliseconds 300; \
                  while ($p.Position -lt $p.NaturalDuration.TimeSpan) { Start-Sleep -Milliseconds 100 }";
    vec![
        "powershell".into(),
        "-NoProfile".into(),
        "-Command".into(),
        script.into(),
    ]
}

#[cfg(not(any(target_os = "macos", windows)))]
fn default_command() -> Vec<String> {
    ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play_from_cache(&self, path: &Path) -> Result<(), AudioError> {
        let status = self.command_for(path).status().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AudioError::NoPlayer(self.program.clone())
            } else {
                AudioError::Io(e)
            }
        })?;
        if !status.success() {
            return Err(AudioError::Playback(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }

    async fn stream_play_and_cache(&self, url: &str, path: &Path) -> Result<(), AudioError> {
        let mut response = self.http.send(self.http.get(url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()).into());
        }

        let tmp = temp_sibling(path);
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut written = 0u64;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&tmp).await;
                    return Err(FetchError::from(e).into());
                }
            }
        }
        file.flush().await?;
        drop(file);

        if written <= MIN_VALID_AUDIO_SIZE {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AudioError::Download(FetchError::Parse(format!(
                "TTS answer too small ({written} bytes)"
            ))));
        }
        tokio::fs::rename(&tmp, path).await?;
        log::debug!("audio: streamed and cached {}", path.display());
        self.play_from_cache(path).await
    }
}
