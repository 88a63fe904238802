//! Session inspection commands: `history`, `sessions`, `reset`.

use std::path::PathBuf;

use healthmate_core::SessionId;

use super::init_common_components;

/// Input shared by the per-session commands.
#[derive(Debug, Clone)]
pub struct HistoryInput {
    pub config_path: Option<PathBuf>,
    pub session_id: String,
}

impl HistoryInput {
    fn session_id(&self) -> anyhow::Result<SessionId> {
        SessionId::new(self.session_id.clone())
            .ok_or_else(|| anyhow::anyhow!("Session id must not be empty"))
    }
}

/// Print a session's history as `User:` / `AI:` lines.
#[derive(Debug, Clone, Copy)]
pub struct HistoryStrategy;

impl super::CommandStrategy for HistoryStrategy {
    type Input = HistoryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let id = input.session_id()?;
        let common = init_common_components(input.config_path.as_deref()).await?;

        let history = common.gateway.history(Some(&id)).await?;
        if history.is_empty() {
            println!("No history for session {id}");
        }
        for line in history.to_lines() {
            println!("{line}");
        }
        Ok(())
    }
}

/// List stored sessions, most recent first.
#[derive(Debug, Clone, Copy)]
pub struct SessionsStrategy;

impl super::CommandStrategy for SessionsStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, config_path: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(config_path.as_deref()).await?;

        let sessions = common.gateway.sessions().await?;
        if sessions.is_empty() {
            println!("No sessions stored");
        }
        for session in sessions {
            println!(
                "{}  {} turn(s)  last updated {}",
                session.id,
                session.turns,
                session.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Ok(())
    }
}

/// Delete a session's stored history.
#[derive(Debug, Clone, Copy)]
pub struct ResetStrategy;

impl super::CommandStrategy for ResetStrategy {
    type Input = HistoryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let id = input.session_id()?;
        let common = init_common_components(input.config_path.as_deref()).await?;

        if common.gateway.reset(&id).await? {
            println!("Cleared history for session {id}");
        } else {
            println!("No history stored for session {id}");
        }
        Ok(())
    }
}
