use std::path::PathBuf;

use healthmate_config::{Config, ProviderConfig, StorageBackend};
use healthmate_core::SessionStore;
use tracing::info;

use super::{build_store, load_config};

/// Strategy for displaying configuration information.
///
/// Outputs the effective configuration with the provider credential masked,
/// and checks that the configured session store can be opened.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, config_path: Self::Input) -> anyhow::Result<()> {
        let config = load_config(config_path.as_deref())?;

        println!("=== HealthMate Configuration ===\n");

        println!("Server:");
        println!("  Bind: {}", config.server.bind);
        match &config.server.internal_bind {
            Some(addr) => println!("  Session Store Routes: {addr}"),
            None => println!("  Session Store Routes: disabled"),
        }
        println!();

        println!("Provider:");
        println!("  Kind: {}", config.provider.name());
        match &config.provider {
            ProviderConfig::WorkersAi {
                account_id,
                base_url,
                ..
            } => {
                println!("  Account: {account_id}");
                if let Some(url) = base_url {
                    println!("  Base URL: {url}");
                }
            }
            ProviderConfig::OpenAiCompatible { base_url, .. } => {
                println!("  Base URL: {base_url}");
            }
        }
        println!("  Credential: {}", mask_secret(config.provider.secret()));
        println!();

        print_agent_defaults(&config);

        println!("Storage:");
        match config.storage.backend {
            StorageBackend::Memory => println!("  Backend: memory (not persisted)"),
            StorageBackend::Sqlite => {
                println!("  Backend: sqlite");
                println!("  Path: {}", config.storage.sqlite_path()?.display());
            }
        }
        match config.storage.max_turns {
            Some(max) => println!("  Max Turns: {max}"),
            None => println!("  Max Turns: unbounded"),
        }

        info!("Testing session store");
        match build_store(&config).await {
            Ok(store) => match store.list().await {
                Ok(sessions) => println!("  Status: OK ({} session(s))", sessions.len()),
                Err(e) => {
                    println!("  Status: Query failed");
                    println!("  Error: {e}");
                }
            },
            Err(e) => {
                println!("  Status: Open failed");
                println!("  Error: {e}");
            }
        }

        Ok(())
    }
}

fn print_agent_defaults(config: &Config) {
    let defaults = &config.agents.defaults;

    println!("Agent Defaults:");
    println!("  Model: {}", defaults.model);
    println!("  System Prompt: {}", truncate(defaults.system_prompt(), 60));
    match defaults.history_turns {
        Some(turns) => println!("  History Turns: {turns}"),
        None => println!("  History Turns: all"),
    }
    if let Some(chars) = defaults.history_chars {
        println!("  History Chars: {chars}");
    }
    match defaults.inference_timeout_secs {
        Some(secs) => println!("  Inference Timeout: {secs}s"),
        None => println!("  Inference Timeout: none"),
    }
    println!("  Serialize Turns: {}", defaults.serialize_turns);
    println!();
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(mask_secret("short"), "***");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }
}
