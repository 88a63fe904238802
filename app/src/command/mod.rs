//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use healthmate_config::{Config, ProviderConfig, StorageBackend};
use healthmate_conversation::{ConversationGateway, GatewayConfig, HistoryConfig};
use healthmate_core::{InferenceProvider, SessionStore};
use healthmate_providers::{OpenAiCompatibleProvider, WorkersAiProvider};
use healthmate_session::{MemorySessionStore, SqliteSessionStore};
use tracing::info;

mod chat;
mod history;
mod info;
mod init;
mod serve;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use history::{HistoryInput, HistoryStrategy, ResetStrategy, SessionsStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         // Command logic here
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Components shared by every command that talks to the gateway.
pub struct CommonComponents {
    pub config: Config,
    pub gateway: Arc<ConversationGateway>,
}

pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };
    let config = Config::load_from(&path)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load config and wire provider, store and gateway together.
pub async fn init_common_components(
    config_path: Option<&Path>,
) -> anyhow::Result<CommonComponents> {
    let config = load_config(config_path)?;
    let provider = build_provider(&config)?;
    let store = build_store(&config).await?;
    let gateway = ConversationGateway::new(provider, store, build_gateway_config(&config));

    Ok(CommonComponents {
        config,
        gateway: Arc::new(gateway),
    })
}

pub fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn InferenceProvider>> {
    let model = config.agents.defaults.model.clone();
    let timeout = config.agents.defaults.inference_timeout();

    let provider: Arc<dyn InferenceProvider> = match &config.provider {
        ProviderConfig::WorkersAi {
            account_id,
            api_token,
            base_url,
        } => {
            let provider =
                WorkersAiProvider::new(account_id.clone(), api_token.clone(), model, timeout)?;
            Arc::new(match base_url {
                Some(url) => provider.with_base_url(url.clone()),
                None => provider,
            })
        }
        ProviderConfig::OpenAiCompatible { api_key, base_url } => Arc::new(
            OpenAiCompatibleProvider::new(api_key.clone(), base_url.clone(), model, timeout)?,
        ),
    };

    info!("Using inference provider: {}", config.provider.name());
    Ok(provider)
}

pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn SessionStore>> {
    let limits = config.storage.limits();
    let store: Arc<dyn SessionStore> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemorySessionStore::with_limits(limits)),
        StorageBackend::Sqlite => {
            let db_path: PathBuf = config.storage.sqlite_path()?;
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!("Database path: {}", db_path.display());
            Arc::new(SqliteSessionStore::new(&db_path, limits).await?)
        }
    };
    Ok(store)
}

pub fn build_gateway_config(config: &Config) -> GatewayConfig {
    let defaults = &config.agents.defaults;

    let mut history = HistoryConfig::default();
    if let Some(turns) = defaults.history_turns {
        history = history.with_max_turns(turns);
    }
    if let Some(chars) = defaults.history_chars {
        history = history.with_max_chars(chars);
    }

    let mut gateway = GatewayConfig::default()
        .with_system_prompt(defaults.system_prompt().to_string())
        .with_history(history)
        .with_serialize_turns(defaults.serialize_turns);
    if let Some(timeout) = defaults.inference_timeout() {
        gateway = gateway.with_inference_timeout(timeout);
    }
    gateway
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(json: &str) -> Config {
        Config::from_json(json).unwrap()
    }

    #[test]
    fn gateway_config_follows_agent_defaults() {
        let config = config(
            r#"{
                "agents": { "defaults": {
                    "system_prompt": "custom",
                    "history_turns": 6,
                    "history_chars": 4000,
                    "inference_timeout_secs": 30,
                    "serialize_turns": false
                } },
                "provider": { "kind": "workers_ai", "account_id": "a", "api_token": "t" }
            }"#,
        );

        let gateway = build_gateway_config(&config);
        assert_eq!(gateway.system_prompt, "custom");
        assert_eq!(gateway.history.max_turns, Some(6));
        assert_eq!(gateway.history.max_chars, Some(4000));
        assert_eq!(gateway.inference_timeout, Some(Duration::from_secs(30)));
        assert!(!gateway.serialize_turns);
    }

    #[test]
    fn gateway_config_defaults_are_unbounded() {
        let config = config(r#"{ "provider": { "kind": "workers_ai", "account_id": "a", "api_token": "t" } }"#);
        let gateway = build_gateway_config(&config);
        assert_eq!(gateway.history, HistoryConfig::default());
        assert!(gateway.inference_timeout.is_none());
        assert!(gateway.serialize_turns);
    }

    #[tokio::test]
    async fn memory_backend_builds() {
        let config = config(
            r#"{
                "provider": { "kind": "openai_compatible", "api_key": "k", "base_url": "http://localhost:1/v1" },
                "storage": { "backend": "memory", "max_turns": 3 }
            }"#,
        );
        let store = build_store(&config).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(build_provider(&config).is_ok());
    }
}
