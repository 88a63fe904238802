use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healthmate_core::{History, SessionId, SessionStore, SessionSummary, StoreLimits, Turn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

const CREATE_TURNS_TABLE: &str = "CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    user_text TEXT NOT NULL,
    ai_text TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const CREATE_SESSION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_turns_session ON turns (session_id, id)";

/// SQLite-backed session store.
///
/// Every turn is one row; the autoincrement `id` is the arrival order.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    limits: StoreLimits,
}

impl SqliteSessionStore {
    /// Open (or create) the database file at `db_path`.
    pub async fn new(db_path: &Path, limits: StoreLimits) -> anyhow::Result<Self> {
        info!("Connecting to database: sqlite:{}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::init(pool, limits).await
    }

    /// Private in-memory database. Contents vanish with the store.
    pub async fn in_memory(limits: StoreLimits) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A second connection would open a second, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init(pool, limits).await
    }

    async fn init(pool: SqlitePool, limits: StoreLimits) -> anyhow::Result<Self> {
        sqlx::query(CREATE_TURNS_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_SESSION_INDEX).execute(&pool).await?;

        info!(
            "SqliteSessionStore initialized (max_turns: {:?})",
            limits.max_turns
        );
        Ok(Self { pool, limits })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn read(&self, id: &SessionId) -> anyhow::Result<History> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT user_text, ai_text FROM turns WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_text, ai_text)| Turn { user_text, ai_text })
            .collect())
    }

    async fn append(&self, id: &SessionId, turn: Turn) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO turns (session_id, user_text, ai_text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(&turn.user_text)
        .bind(&turn.ai_text)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if let Some(max) = self.limits.max_turns {
            let keep = i64::try_from(max).unwrap_or(i64::MAX);
            let evicted = sqlx::query(
                "DELETE FROM turns WHERE session_id = ? AND id NOT IN \
                 (SELECT id FROM turns WHERE session_id = ? ORDER BY id DESC LIMIT ?)",
            )
            .bind(id.as_str())
            .bind(id.as_str())
            .bind(keep)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if evicted > 0 {
                debug!("Evicted {evicted} turn(s) from session: {id}");
            }
        }

        tx.commit().await?;

        info!("Appended turn to session: {id}");
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        let removed = sqlx::query("DELETE FROM turns WHERE session_id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Cleared session: {id} ({removed} turn(s))");
        Ok(removed > 0)
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let rows: Vec<(String, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT t.session_id, g.turns, t.created_at FROM turns t \
             JOIN (SELECT session_id, COUNT(*) AS turns, MAX(id) AS last_id \
                   FROM turns GROUP BY session_id) g ON t.id = g.last_id \
             ORDER BY t.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, turns, updated_at)| {
                Some(SessionSummary {
                    id: SessionId::new(id)?,
                    turns: usize::try_from(turns).unwrap_or_default(),
                    updated_at,
                })
            })
            .collect())
    }
}
