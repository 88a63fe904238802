//! Context assembly from stored history.
//!
//! The window works in whole turns so a user message is never sent without
//! the reply that followed it.

use healthmate_core::{ChatMessage, History, Turn};

/// Limits on how much history is replayed to the model.
///
/// Both limits default to `None`: every stored turn is included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of most recent turns to include
    pub max_turns: Option<usize>,
    /// Maximum characters of history (both sides of every included turn)
    pub max_chars: Option<usize>,
}

impl HistoryConfig {
    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }
}

/// A sliding window over a session's turns.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    config: HistoryConfig,
}

impl HistoryWindow {
    #[must_use]
    pub const fn with_config(config: HistoryConfig) -> Self {
        Self { config }
    }

    /// The most recent turns that fit both limits, oldest first.
    #[must_use]
    pub fn select<'a>(&self, history: &'a History) -> &'a [Turn] {
        let turns = history.turns();
        let mut start = self
            .config
            .max_turns
            .map_or(0, |max| turns.len().saturating_sub(max));

        if let Some(max_chars) = self.config.max_chars {
            let mut total: usize = turns[start..].iter().map(Turn::char_len).sum();
            while start < turns.len() && total > max_chars {
                total -= turns[start].char_len();
                start += 1;
            }
        }

        &turns[start..]
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }
}

/// Builds model context from a persona prompt, history and the new message.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    window: HistoryWindow,
}

impl HistoryManager {
    #[must_use]
    pub const fn new(config: HistoryConfig) -> Self {
        Self {
            window: HistoryWindow::with_config(config),
        }
    }

    /// `[system] + windowed turns as user/assistant pairs + [user]`.
    #[must_use]
    pub fn build_context(
        &self,
        system_prompt: &str,
        history: &History,
        new_message: &str,
    ) -> Vec<ChatMessage> {
        let selected = self.window.select(history);

        let mut messages = Vec::with_capacity(selected.len() * 2 + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(selected.iter().flat_map(Turn::to_messages));
        messages.push(ChatMessage::user(new_message));
        messages
    }

    /// Get conversation statistics.
    #[must_use]
    pub fn stats(&self, history: &History) -> HistoryStats {
        let total_chars: usize = history.turns().iter().map(Turn::char_len).sum();
        let included_turns = self.window.select(history).len();

        HistoryStats {
            total_turns: history.len(),
            included_turns,
            total_characters: total_chars,
            estimated_tokens: total_chars / 4, // Rough estimate: 4 chars per token
        }
    }
}

/// Statistics about conversation history.
#[derive(Debug, Clone, Copy)]
pub struct HistoryStats {
    pub total_turns: usize,
    pub included_turns: usize,
    pub total_characters: usize,
    pub estimated_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthmate_core::Role;

    fn create_test_history(count: usize) -> History {
        (0..count)
            .map(|i| Turn::new(format!("Q{i}: {}", "x".repeat(46)), format!("A{i}: {}", "y".repeat(46))))
            .collect()
    }

    #[test]
    fn test_default_window_keeps_everything() {
        let window = HistoryWindow::default();
        let history = create_test_history(30);
        assert_eq!(window.select(&history).len(), 30);
    }

    #[test]
    fn test_turn_limit_keeps_most_recent() {
        let window = HistoryWindow::with_config(HistoryConfig::default().with_max_turns(3));
        let history = create_test_history(10);

        let selected = window.select(&history);
        assert_eq!(selected.len(), 3);
        assert!(selected[0].user_text.starts_with("Q7"));
        assert!(selected[2].user_text.starts_with("Q9"));
    }

    #[test]
    fn test_char_limit_drops_whole_turns() {
        // Each turn is exactly 100 chars.
        let window = HistoryWindow::with_config(HistoryConfig::default().with_max_chars(250));
        let history = create_test_history(10);

        let selected = window.select(&history);
        assert_eq!(selected.len(), 2);
        assert!(selected[0].user_text.starts_with("Q8"));
    }

    #[test]
    fn test_char_limit_smaller_than_one_turn() {
        let window = HistoryWindow::with_config(HistoryConfig::default().with_max_chars(10));
        assert!(window.select(&create_test_history(3)).is_empty());
    }

    #[test]
    fn test_build_context_shape() {
        let manager = HistoryManager::default();
        let history: History = vec![Turn::new("a", "b")].into();

        let messages = manager.build_context("You are helpful.", &history, "c");

        assert_eq!(
            messages,
            vec![
                ChatMessage::system("You are helpful."),
                ChatMessage::user("a"),
                ChatMessage::assistant("b"),
                ChatMessage::user("c"),
            ]
        );
    }

    #[test]
    fn test_build_context_empty_history() {
        let manager = HistoryManager::new(HistoryConfig::default().with_max_turns(5));
        let messages = manager.build_context("sys", &History::new(), "hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_history_stats() {
        let manager = HistoryManager::new(HistoryConfig::default().with_max_turns(4));
        let history = create_test_history(10);

        let stats = manager.stats(&history);

        assert_eq!(stats.total_turns, 10);
        assert_eq!(stats.included_turns, 4);
        assert_eq!(stats.total_characters, 1000);
        assert_eq!(stats.estimated_tokens, 250);
    }
}
