//! Timed character-by-character reveal of an already-received answer.
//!
//! Presentation only: the full text is known up front. The background task
//! lives exactly as long as the [`Reveal`] that owns it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Reveal {
    text: String,
    total_chars: usize,
    shown: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl Reveal {
    /// Start revealing `text` one character per `interval`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(text: impl Into<String>, interval: Duration) -> Self {
        let text = text.into();
        let total_chars = text.chars().count();
        let shown = Arc::new(AtomicUsize::new(0));

        let task = if total_chars == 0 || interval.is_zero() {
            shown.store(total_chars, Ordering::Relaxed);
            None
        } else {
            let shown = Arc::clone(&shown);
            Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let next = shown.load(Ordering::Relaxed) + 1;
                    shown.store(next.min(total_chars), Ordering::Relaxed);
                    if next >= total_chars {
                        break;
                    }
                }
            }))
        };

        Self {
            text,
            total_chars,
            shown,
            task,
        }
    }

    /// The revealed prefix.
    pub fn visible(&self) -> &str {
        visible_prefix(&self.text, self.shown.load(Ordering::Relaxed))
    }

    pub fn is_done(&self) -> bool {
        self.shown.load(Ordering::Relaxed) >= self.total_chars
    }

    /// Show everything now.
    pub fn finish(&mut self) {
        self.cancel();
        self.shown.store(self.total_chars, Ordering::Relaxed);
    }

    /// Stop advancing, leaving the current prefix visible.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Reveal {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Reveal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reveal")
            .field("shown", &self.shown.load(Ordering::Relaxed))
            .field("total_chars", &self.total_chars)
            .finish()
    }
}

/// First `chars` characters of `text`, cut on a char boundary.
pub fn visible_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_char_boundaries() {
        assert_eq!(visible_prefix("héllo", 2), "hé");
        assert_eq!(visible_prefix("🦊🦊", 1), "🦊");
        assert_eq!(visible_prefix("abc", 10), "abc");
        assert_eq!(visible_prefix("abc", 0), "");
    }

    #[tokio::test(start_paused = true)]
    async fn reveals_progressively_then_completes() {
        let reveal = Reveal::start("hello world", Duration::from_millis(10));
        assert!(!reveal.is_done());

        tokio::time::sleep(Duration::from_millis(35)).await;
        let partial = reveal.visible().len();
        assert!(partial > 0 && partial < "hello world".len(), "partial = {}", partial);
        assert!("hello world".starts_with(reveal.visible()));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(reveal.is_done());
        assert_eq!(reveal.visible(), "hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_freezes_progress() {
        let mut reveal = Reveal::start("abcdefghijklmnop", Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(25)).await;
        reveal.cancel();
        let frozen = reveal.visible().to_string();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(reveal.visible(), frozen);
        assert!(!reveal.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_shows_everything() {
        let mut reveal = Reveal::start("abcdef", Duration::from_secs(1));
        reveal.finish();
        assert!(reveal.is_done());
        assert_eq!(reveal.visible(), "abcdef");
    }

    #[tokio::test]
    async fn zero_interval_or_empty_text_is_immediate() {
        assert!(Reveal::start("", Duration::from_millis(10)).is_done());
        assert_eq!(Reveal::start("now", Duration::ZERO).visible(), "now");
    }
}
