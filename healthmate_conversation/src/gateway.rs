//! Conversation gateway: one chat turn end to end.
//!
//! A turn reads the session's history, asks the model for a reply and
//! appends the new turn. The store is mutated exactly once per successful
//! turn and never on a failed one.

use std::sync::Arc;
use std::time::Duration;

use healthmate_core::{
    DEFAULT_SYSTEM_PROMPT, History, InferenceProvider, LLMResponse, SessionId, SessionStore,
    SessionSummary, Turn, Usage,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::history::{HistoryConfig, HistoryManager};
use crate::locks::{SessionLocks, TurnGuard};

/// Configuration for the conversation gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Persona prompt sent ahead of every context
    pub system_prompt: String,
    /// How much stored history is replayed to the model
    pub history: HistoryConfig,
    /// Upper bound on a single inference call
    pub inference_timeout: Option<Duration>,
    /// Serialize concurrent turns on the same session
    pub serialize_turns: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history: HistoryConfig::default(),
            inference_timeout: None,
            serialize_turns: true,
        }
    }
}

impl GatewayConfig {
    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = prompt;
        self
    }

    #[must_use]
    pub const fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub const fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn with_serialize_turns(mut self, serialize: bool) -> Self {
        self.serialize_turns = serialize;
        self
    }
}

/// Errors that can occur while handling a turn.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Input must be a non-empty string")]
    EmptyInput,

    #[error("Session storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("Inference error: {0:#}")]
    Inference(anyhow::Error),

    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(Duration),
}

impl ConversationError {
    /// Whether resending the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::EmptyInput)
    }
}

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Assistant's reply
    pub reply: String,
    /// Session the turn was recorded under; freshly minted if none was given
    pub session_id: SessionId,
    /// 1-based position of this turn in the session
    pub turn_number: usize,
    pub usage: Option<Usage>,
}

/// Orchestrates chat turns over a session store and an inference provider.
///
/// Holds no per-session state of its own; everything lives in the store.
pub struct ConversationGateway<P = Arc<dyn InferenceProvider>, S = Arc<dyn SessionStore>>
where
    P: Send + Sync,
    S: Send + Sync,
{
    provider: P,
    store: S,
    config: GatewayConfig,
    history: HistoryManager,
    locks: SessionLocks,
}

impl<P, S> ConversationGateway<P, S>
where
    P: InferenceProvider + Send + Sync,
    S: SessionStore + Send + Sync,
{
    pub fn new(provider: P, store: S, config: GatewayConfig) -> Self {
        info!(
            "Creating conversation gateway (serialize_turns: {}, timeout: {:?})",
            config.serialize_turns, config.inference_timeout
        );
        Self {
            provider,
            store,
            history: HistoryManager::new(config.history),
            config,
            locks: SessionLocks::default(),
        }
    }

    /// Process a single conversation turn.
    ///
    /// Mints a session id when `session_id` is `None`. On any error the
    /// session's history is left untouched.
    pub async fn handle_message(
        &self,
        session_id: Option<SessionId>,
        user_text: &str,
    ) -> Result<TurnResult, ConversationError> {
        if user_text.is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let session_id = session_id.unwrap_or_else(|| {
            let id = SessionId::generate();
            info!("Minted new session: {id}");
            id
        });

        let _turn_guard = self.lock(&session_id).await;

        let history = self
            .store
            .read(&session_id)
            .await
            .map_err(ConversationError::Storage)?;
        let turn_number = history.len() + 1;
        info!("Processing turn {turn_number} for session: {session_id}");

        let context = self
            .history
            .build_context(&self.config.system_prompt, &history, user_text);
        let stats = self.history.stats(&history);
        debug!(
            "Context: {} message(s), {}/{} turn(s) replayed, ~{} history tokens",
            context.len(),
            stats.included_turns,
            stats.total_turns,
            stats.estimated_tokens
        );

        let response = match self.infer(&context).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Turn {turn_number} failed for session {session_id}: {e}");
                return Err(e);
            }
        };

        self.store
            .append(&session_id, Turn::new(user_text, response.content.clone()))
            .await
            .map_err(ConversationError::Storage)?;

        debug!("Turn {turn_number} completed successfully");

        Ok(TurnResult {
            reply: response.content,
            session_id,
            turn_number,
            usage: response.usage,
        })
    }

    /// Stored history for a session; no session means no history.
    pub async fn history(&self, session_id: Option<&SessionId>) -> Result<History, ConversationError> {
        match session_id {
            Some(id) => self.store.read(id).await.map_err(ConversationError::Storage),
            None => Ok(History::new()),
        }
    }

    /// Append an already answered turn without calling the model.
    ///
    /// Takes the same per-session lock as `handle_message`, so a recorded
    /// turn never lands between another turn's read and append.
    pub async fn record(&self, session_id: &SessionId, turn: Turn) -> Result<(), ConversationError> {
        let _turn_guard = self.lock(session_id).await;
        self.store
            .append(session_id, turn)
            .await
            .map_err(ConversationError::Storage)
    }

    /// Clear a session's stored history. Returns whether it existed.
    pub async fn reset(&self, session_id: &SessionId) -> Result<bool, ConversationError> {
        let _turn_guard = self.lock(session_id).await;
        self.store
            .delete(session_id)
            .await
            .map_err(ConversationError::Storage)
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSummary>, ConversationError> {
        self.store.list().await.map_err(ConversationError::Storage)
    }

    /// The underlying session store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn lock(&self, session_id: &SessionId) -> Option<TurnGuard<'_>> {
        if self.config.serialize_turns {
            Some(self.locks.acquire(session_id).await)
        } else {
            None
        }
    }

    async fn infer(
        &self,
        context: &[healthmate_core::ChatMessage],
    ) -> Result<LLMResponse, ConversationError> {
        let call = self.provider.infer(context);
        match self.config.inference_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ConversationError::InferenceTimeout(limit))?,
            None => call.await,
        }
        .map_err(ConversationError::Inference)
    }
}
