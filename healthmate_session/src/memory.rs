use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healthmate_core::{History, SessionId, SessionStore, SessionSummary, StoreLimits, Turn};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Entry {
    history: History,
    updated_at: DateTime<Utc>,
}

/// In-process session store.
///
/// Each session id maps to its own history, so sessions never observe each
/// other's turns. A write is visible to the next read on the same instance.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    limits: StoreLimits,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        info!("MemorySessionStore initialized (max_turns: {:?})", limits.max_turns);
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read(&self, id: &SessionId) -> anyhow::Result<History> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .map(|entry| entry.history.clone())
            .unwrap_or_default())
    }

    async fn append(&self, id: &SessionId, turn: Turn) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id.clone()).or_insert_with(|| Entry {
            history: History::new(),
            updated_at: Utc::now(),
        });
        entry.history.push(turn);
        entry.updated_at = Utc::now();

        if let Some(max) = self.limits.max_turns {
            let evicted = entry.history.retain_last(max);
            if evicted > 0 {
                debug!("Evicted {evicted} turn(s) from session: {id}");
            }
        }

        info!("Appended turn to session: {id}");
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        let existed = self.sessions.write().await.remove(id).is_some();
        info!("Cleared session: {id} (existed: {existed})");
        Ok(existed)
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, entry)| SessionSummary {
                id: id.clone(),
                turns: entry.history.len(),
                updated_at: entry.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    #[tokio::test]
    async fn unseen_session_reads_empty() {
        let store = MemorySessionStore::new();
        let history = store.read(&sid("never-written")).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn append_is_visible_to_next_read() {
        let store = MemorySessionStore::new();
        store.append(&sid("s1"), Turn::new("a", "b")).await.unwrap();

        let history = store.read(&sid("s1")).await.unwrap();
        assert_eq!(history.turns(), &[Turn::new("a", "b")]);
    }

    #[tokio::test]
    async fn sessions_are_partitioned() {
        let store = MemorySessionStore::new();
        store.append(&sid("s1"), Turn::new("one", "1")).await.unwrap();
        store.append(&sid("s2"), Turn::new("two", "2")).await.unwrap();

        assert_eq!(store.read(&sid("s1")).await.unwrap().len(), 1);
        assert_eq!(
            store.read(&sid("s2")).await.unwrap().turns()[0].user_text,
            "two"
        );
    }

    #[tokio::test]
    async fn turns_keep_arrival_order() {
        let store = MemorySessionStore::new();
        for i in 0..5 {
            store
                .append(&sid("s1"), Turn::new(format!("q{i}"), format!("a{i}")))
                .await
                .unwrap();
        }

        let history = store.read(&sid("s1")).await.unwrap();
        let questions: Vec<&str> = history.turns().iter().map(|t| t.user_text.as_str()).collect();
        assert_eq!(questions, vec!["q0", "q1", "q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn max_turns_evicts_oldest() {
        let store = MemorySessionStore::with_limits(StoreLimits::unbounded().with_max_turns(2));
        for i in 0..4 {
            store
                .append(&sid("s1"), Turn::new(format!("q{i}"), "a"))
                .await
                .unwrap();
        }

        let history = store.read(&sid("s1")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].user_text, "q2");
        assert_eq!(history.turns()[1].user_text, "q3");
    }

    #[tokio::test]
    async fn delete_clears_history() {
        let store = MemorySessionStore::new();
        store.append(&sid("s1"), Turn::new("a", "b")).await.unwrap();

        assert!(store.delete(&sid("s1")).await.unwrap());
        assert!(!store.delete(&sid("s1")).await.unwrap());
        assert!(store.read(&sid("s1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_reports_turn_counts() {
        let store = MemorySessionStore::new();
        store.append(&sid("s1"), Turn::new("a", "b")).await.unwrap();
        store.append(&sid("s1"), Turn::new("c", "d")).await.unwrap();
        store.append(&sid("s2"), Turn::new("e", "f")).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let s1 = summaries.iter().find(|s| s.id == sid("s1")).unwrap();
        assert_eq!(s1.turns, 2);
    }
}
