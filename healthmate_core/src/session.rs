//! Session identifiers, conversation turns and the storage contract.
//!
//! A session owns exactly one [`History`]: an append-only, ordered list of
//! [`Turn`]s. Backends implement [`SessionStore`]; a history is always read
//! or appended as a whole.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ChatMessage;

/// Opaque session key. Carries no meaning beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a caller-supplied key. Empty keys are treated as absent.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Mint a fresh, globally unique key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user utterance and the assistant reply that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user_text: String,
    pub ai_text: String,
}

impl Turn {
    #[must_use]
    pub fn new(user_text: impl Into<String>, ai_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ai_text: ai_text.into(),
        }
    }

    /// Role-tagged context entries: user first, then assistant.
    #[must_use]
    pub fn to_messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::user(self.user_text.clone()),
            ChatMessage::assistant(self.ai_text.clone()),
        ]
    }

    /// Display lines as exposed on the wire (`User: ...`, `AI: ...`).
    #[must_use]
    pub fn to_lines(&self) -> [String; 2] {
        [
            format!("User: {}", self.user_text),
            format!("AI: {}", self.ai_text),
        ]
    }

    /// Character count of both sides, used for context budgeting.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.user_text.chars().count() + self.ai_text.chars().count()
    }
}

/// Ordered turns of one session. Insertion order is conversation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Flatten into `User: ...` / `AI: ...` lines.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        self.turns.iter().flat_map(Turn::to_lines).collect()
    }

    /// Flatten into alternating user/assistant context entries.
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().flat_map(Turn::to_messages).collect()
    }

    /// Drop the oldest turns until at most `max` remain. Returns how many
    /// were evicted.
    pub fn retain_last(&mut self, max: usize) -> usize {
        let excess = self.turns.len().saturating_sub(max);
        self.turns.drain(..excess);
        excess
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<Turn> for History {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

/// Bounds applied by a store when appending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLimits {
    /// Keep at most this many turns per session, evicting the oldest.
    /// `None` keeps everything.
    #[serde(default)]
    pub max_turns: Option<usize>,
}

impl StoreLimits {
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { max_turns: None }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub turns: usize,
    pub updated_at: DateTime<Utc>,
}

/// Per-session, append-only conversation log.
///
/// Unknown sessions read as empty. Errors are backend I/O failures and
/// are safe to retry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read(&self, id: &SessionId) -> anyhow::Result<History>;

    async fn append(&self, id: &SessionId, turn: Turn) -> anyhow::Result<()>;

    /// Remove a session's history. Returns whether it existed.
    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool>;

    /// Known sessions, most recently updated first.
    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn read(&self, id: &SessionId) -> anyhow::Result<History> {
        (**self).read(id).await
    }

    async fn append(&self, id: &SessionId, turn: Turn) -> anyhow::Result<()> {
        (**self).append(id, turn).await
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        (**self).delete(id).await
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        (**self).list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn empty_session_id_is_absent() {
        assert!(SessionId::new("").is_none());
        assert_eq!(SessionId::new("s1").map(|s| s.to_string()), Some("s1".to_string()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn turn_maps_to_user_then_assistant() {
        let turn = Turn::new("a", "b");
        let [user, assistant] = turn.to_messages();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "a");
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "b");
    }

    #[test]
    fn history_lines_preserve_order() {
        let history: History = vec![Turn::new("hi", "hello"), Turn::new("bye", "see you")].into();
        assert_eq!(
            history.to_lines(),
            vec!["User: hi", "AI: hello", "User: bye", "AI: see you"]
        );
        assert_eq!(history.to_messages().len(), 4);
    }

    #[test]
    fn retain_last_drops_oldest() {
        let mut history: History = (0..5).map(|i| Turn::new(format!("q{i}"), "a")).collect();
        assert_eq!(history.retain_last(2), 3);
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].user_text, "q3");
        assert_eq!(history.retain_last(10), 0);
    }

    #[test]
    fn history_serializes_as_array() {
        let history: History = vec![Turn::new("a", "b")].into();
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
    }
}
