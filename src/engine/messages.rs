use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RECENT_WINDOW: usize = 20;

/// Ordered sink a check writes human-readable diagnostic lines to while
/// it runs. The lines are independent of the verdict and are never part
/// of the serialized report.
#[derive(Debug, Default)]
pub struct MessageSink {
    lines: Vec<String>,
}

impl MessageSink {
    pub fn write(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Consumes all captured lines in write order.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Bounded FIFO window over the most recent capture lines of a batch.
/// Once the cap is exceeded the oldest lines are dropped and the
/// truncation marker stays set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentMessages {
    window: usize,
    lines: VecDeque<String>,
    truncated: bool,
}

impl RecentMessages {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            lines: VecDeque::new(),
            truncated: false,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.window {
            self.lines.pop_front();
            self.truncated = true;
        }
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            self.push(line);
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// One line per entry, prefixed with an ellipsis marker once older
    /// lines have been dropped.
    pub fn as_text(&self) -> String {
        let mut out = String::new();
        if self.truncated {
            out.push_str("...\n");
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_drain_consumes_in_order() {
        let mut sink = MessageSink::default();
        sink.write("one");
        sink.write("two");
        assert_eq!(sink.drain(), vec!["one".to_string(), "two".to_string()]);
        assert!(sink.is_empty());
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn window_drops_oldest_and_marks_truncation() {
        let mut recent = RecentMessages::new(3);
        for n in 1..=3 {
            recent.push(format!("line {n}"));
        }
        assert!(!recent.truncated());

        recent.push("line 4");
        assert!(recent.truncated());
        assert_eq!(
            recent.lines().collect::<Vec<_>>(),
            vec!["line 2", "line 3", "line 4"]
        );
        assert!(recent.as_text().starts_with("...\n"));
    }

    #[test]
    fn window_round_trips_through_serde() {
        let mut recent = RecentMessages::new(2);
        recent.push("a");
        recent.push("b");
        recent.push("c");

        let json = serde_json::to_string(&recent).expect("serialize");
        let restored: RecentMessages = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, recent);
    }
}
