//! Query debouncing.

use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debouncer for query text.
///
/// Each [`push`](Self::push) restarts the quiet window. Once the window
/// elapses the latest text is released, unless it equals the last text
/// released.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<String>,
    deadline: Option<Instant>,
    last_delivered: String,
}

impl Debouncer {
    /// The session starts with an empty query, so an empty push is a no-op
    /// until something else was delivered.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
            last_delivered: String::new(),
        }
    }

    pub fn push(&mut self, text: String, now: Instant) {
        self.pending = Some(text);
        self.deadline = Some(now + self.window);
    }

    /// When the pending text becomes ready, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Releases the pending text once its window has elapsed.
    pub fn take_ready(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return None,
        }
        self.deadline = None;
        let text = self.pending.take()?;
        if text == self.last_delivered {
            return None;
        }
        self.last_delivered = text.clone();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    #[test]
    fn releases_only_after_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("a".to_string(), start);

        assert_eq!(debouncer.take_ready(start + Duration::from_millis(100)), None);
        assert_eq!(debouncer.take_ready(start + WINDOW), Some("a".to_string()));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn keystrokes_within_window_coalesce_to_latest() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("m".to_string(), start);
        debouncer.push("ma".to_string(), start + Duration::from_millis(50));
        debouncer.push("mai".to_string(), start + Duration::from_millis(100));

        // The window restarted with the last keystroke.
        assert_eq!(debouncer.take_ready(start + WINDOW), None);
        assert_eq!(
            debouncer.take_ready(start + Duration::from_millis(300)),
            Some("mai".to_string())
        );
    }

    #[test]
    fn repeated_text_is_not_released_twice() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.push(String::new(), start);
        assert_eq!(debouncer.take_ready(start + WINDOW), None);

        debouncer.push("x".to_string(), start);
        assert_eq!(debouncer.take_ready(start + WINDOW), Some("x".to_string()));
        debouncer.push("x".to_string(), start + WINDOW);
        assert_eq!(debouncer.take_ready(start + WINDOW * 2), None);

        debouncer.push(String::new(), start + WINDOW * 2);
        assert_eq!(debouncer.take_ready(start + WINDOW * 3), Some(String::new()));
    }
}
