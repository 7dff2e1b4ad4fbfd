//! Keyboard-layout gate.
//!
//! Keystrokes typed in a non-target layout (e.g. Russian while the user is
//! chatting in Russian) must not feed the English pipeline.  Asking the OS
//! for the active layout on every key would be wasteful, so [`LayoutGate`]
//! caches the answer for a short TTL and re-queries lazily.
//!
//! Query failures fail **open**: a broken probe must never silence the
//! assistant.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// LayoutError / LayoutSource
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout command failed: {0}")]
    Command(String),

    #[error("layout query is not supported: {0}")]
    Unsupported(&'static str),
}

/// Something that can tell whether the active input layout is the target
/// one.
#[async_trait]
pub trait LayoutSource: Send + Sync {
    async fn query(&self) -> Result<bool, LayoutError>;
}

/// Always reports the same answer.  Used when no probe is configured.
#[derive(Debug, Clone, Copy)]
pub struct FixedLayout(pub bool);

#[async_trait]
impl LayoutSource for FixedLayout {
    async fn query(&self) -> Result<bool, LayoutError> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// CommandLayout
// ---------------------------------------------------------------------------

/// Runs a shell command printing the active layout name (e.g.
/// `xkb-switch -p`, `im-select`) and prefix-matches it against the target.
#[derive(Debug, Clone)]
pub struct CommandLayout {
    program: String,
    args: Vec<String>,
    target: String,
}

impl CommandLayout {
    /// `None` for a blank command line.
    pub fn new(command: &str, target: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            target: target.trim().to_lowercase(),
        })
    }
}

/// `true` when the reported layout names the target one.  Matches prefixes
/// so `us` accepts `us(intl)` and `en` accepts `en_US`.
fn layout_matches(reported: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    let reported = reported.trim().to_lowercase();
    let tail = reported.rsplit(['.', '/']).next().unwrap_or(&reported);
    reported.starts_with(target) || tail.starts_with(target)
}

#[async_trait]
impl LayoutSource for CommandLayout {
    async fn query(&self) -> Result<bool, LayoutError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LayoutError::Command(format!("{}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(LayoutError::Command(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        let reported = String::from_utf8_lossy(&output.stdout);
        Ok(layout_matches(&reported, &self.target))
    }
}

// ---------------------------------------------------------------------------
// ForegroundWindowLayout (Windows)
// ---------------------------------------------------------------------------

/// Layout of the thread owning the foreground window.  English layouts have
/// primary language id `0x09` in the low bits of the HKL.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ForegroundWindowLayout;

#[cfg(windows)]
#[async_trait]
impl LayoutSource for ForegroundWindowLayout {
    async fn query(&self) -> Result<bool, LayoutError> {
        use windows::Win32::UI::Input::KeyboardAndMouse::GetKeyboardLayout;
        use windows::Win32::UI::WindowsAndMessaging::{
            GetForegroundWindow, GetWindowThreadProcessId,
        };

        const LANG_ENGLISH: usize = 0x09;
        const PRIMARY_LANG_MASK: usize = 0x3FF;

        let hkl = unsafe {
            let fg = GetForegroundWindow();
            if fg.0.is_null() {
                return Err(LayoutError::Unsupported("no foreground window"));
            }
            let thread_id = GetWindowThreadProcessId(fg, None);
            GetKeyboardLayout(thread_id)
        };
        Ok((hkl.0 as usize) & PRIMARY_LANG_MASK == LANG_ENGLISH)
    }
}

// ---------------------------------------------------------------------------
// LayoutGate
// ---------------------------------------------------------------------------

/// TTL cache in front of a [`LayoutSource`].
pub struct LayoutGate {
    source: Box<dyn LayoutSource>,
    ttl: Duration,
    /// `(is_target_layout, last_checked)`.
    cache: Mutex<Option<(bool, Instant)>>,
}

impl LayoutGate {
    pub fn new(source: Box<dyn LayoutSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Cached answer, re-querying the source at most once per TTL.  The lock
    /// is never held across the query.
    pub async fn is_target_layout(&self) -> bool {
        let now = Instant::now();
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((value, checked)) = *cache {
                if now.duration_since(checked) < self.ttl {
                    return value;
                }
            }
        }

        let value = match self.source.query().await {
            Ok(v) => v,
            Err(e) => {
                log::debug!("input: layout query failed, assuming target layout: {e}");
                true
            }
        };
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some((value, now));
        value
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts queries and returns a switchable answer or an error.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        answer: Arc<AtomicBool>,
        fail: bool,
    }

    #[async_trait]
    impl LayoutSource for CountingSource {
        async fn query(&self) -> Result<bool, LayoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LayoutError::Command("boom".into()))
            } else {
                Ok(self.answer.load(Ordering::SeqCst))
            }
        }
    }

    fn gate(answer: bool, fail: bool) -> (LayoutGate, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let flag = Arc::new(AtomicBool::new(answer));
        let source = CountingSource {
            calls: calls.clone(),
            answer: flag.clone(),
            fail,
        };
        (
            LayoutGate::new(Box::new(source), Duration::from_millis(500)),
            calls,
            flag,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn answer_is_cached_for_ttl() {
        let (gate, calls, flag) = gate(false, false);
        assert!(!gate.is_target_layout().await);
        flag.store(true, Ordering::SeqCst);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!gate.is_target_layout().await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(gate.is_target_layout().await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_fails_open() {
        let (gate, calls, _) = gate(false, true);
        assert!(gate.is_target_layout().await);
        assert!(gate.is_target_layout().await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fixed_layout() {
        assert!(!FixedLayout(false).query().await.unwrap());
    }

    #[test]
    fn command_layout_parsing() {
        assert!(CommandLayout::new("   ", "us").is_none());
        let c = CommandLayout::new("xkb-switch -p", "US").unwrap();
        assert_eq!(c.program, "xkb-switch");
        assert_eq!(c.args, ["-p"]);
        assert_eq!(c.target, "us");
    }

    #[test]
    fn layout_name_matching() {
        assert!(layout_matches("us\n", "us"));
        assert!(layout_matches("us(intl)", "us"));
        assert!(layout_matches("com.apple.keylayout.US", "us"));
        assert!(!layout_matches("ru", "us"));
        assert!(!layout_matches("com.apple.keylayout.Russian", "us"));
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let c = CommandLayout::new("definitely-not-a-layout-tool", "us").unwrap();
        assert!(c.query().await.is_err());
    }
}
