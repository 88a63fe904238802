use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use healthmate_core::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, StoreLimits};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,
    /// Address for the session store routes; not served when unset
    #[serde(default)]
    pub internal_bind: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            internal_bind: None,
        }
    }
}

impl ServerConfig {
    fn default_bind() -> String {
        "127.0.0.1:8787".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    #[serde(default = "AgentDefaults::default_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Most recent turns replayed to the model; unset replays all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_turns: Option<usize>,
    /// Character budget for replayed turns; unset means no budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_timeout_secs: Option<u64>,
    #[serde(default = "AgentDefaults::default_serialize_turns")]
    pub serialize_turns: bool,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            system_prompt: None,
            history_turns: None,
            history_chars: None,
            inference_timeout_secs: None,
            serialize_turns: Self::default_serialize_turns(),
        }
    }
}

impl AgentDefaults {
    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    const fn default_serialize_turns() -> bool {
        true
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    #[must_use]
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    WorkersAi {
        account_id: String,
        api_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible {
        api_key: String,
        base_url: String,
    },
}

impl ProviderConfig {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WorkersAi { .. } => "workers_ai",
            Self::OpenAiCompatible { .. } => "openai_compatible",
        }
    }

    /// The credential, for display purposes.
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::WorkersAi { api_token, .. } => api_token,
            Self::OpenAiCompatible { api_key, .. } => api_key,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite database file; defaults to `~/healthmate/sessions.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Per-session turn cap; unset keeps every turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,
}

impl StorageConfig {
    #[must_use]
    pub const fn limits(&self) -> StoreLimits {
        StoreLimits {
            max_turns: self.max_turns,
        }
    }

    pub fn sqlite_path(&self) -> anyhow::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_dir()?.join("sessions.db")),
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "server": {
    "bind": "127.0.0.1:8787"
  },
  "agents": {
    "defaults": {
      "model": "@cf/meta/llama-3.3-70b-instruct-fp8-fast",
      "inference_timeout_secs": 60,
      "serialize_turns": true
    }
  },
  "provider": {
    "kind": "workers_ai",
    "account_id": "your-cloudflare-account-id",
    "api_token": "your-workers-ai-api-token"
  },
  "storage": {
    "backend": "sqlite"
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("healthmate"))
    }

    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'healthmate init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.internal_bind.as_deref() == Some(self.server.bind.as_str()) {
            anyhow::bail!("server.internal_bind must differ from server.bind");
        }
        if self.storage.max_turns == Some(0) {
            anyhow::bail!("storage.max_turns must be at least 1");
        }
        if self.agents.defaults.inference_timeout_secs == Some(0) {
            anyhow::bail!("agents.defaults.inference_timeout_secs must be at least 1");
        }
        if self.agents.defaults.model.trim().is_empty() {
            anyhow::bail!("agents.defaults.model must not be empty");
        }
        Ok(())
    }

    /// Write the config template to `config_path`, refusing to overwrite.
    pub fn create_config(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your Workers AI account id and token");
        println!("   2. Run 'healthmate serve' to start the HTTP endpoint");
        println!();
        println!("🔧 Configuration options:");
        println!("   - provider.kind: workers_ai or openai_compatible");
        println!("   - server.internal_bind: address for the session store routes (default: off)");
        println!("   - agents.defaults.history_turns: turns replayed to the model (default: all)");
        println!("   - storage.backend: memory or sqlite");
        println!("   - storage.max_turns: per-session turn cap (default: unbounded)");
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_and_validates() {
        let config = Config::from_json(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8787");
        assert_eq!(config.provider.name(), "workers_ai");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            config.agents.defaults.inference_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_json(
            r#"{ "provider": { "kind": "openai_compatible", "api_key": "k", "base_url": "http://localhost:11434/v1" } }"#,
        )
        .unwrap();

        assert_eq!(config.provider.name(), "openai_compatible");
        assert_eq!(config.agents.defaults.model, DEFAULT_MODEL);
        assert_eq!(config.agents.defaults.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert!(config.agents.defaults.serialize_turns);
        assert!(config.agents.defaults.history_turns.is_none());
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.limits(), StoreLimits::unbounded());
    }

    #[test]
    fn internal_bind_is_opt_in_and_separate() {
        let provider = r#""provider": { "kind": "workers_ai", "account_id": "a", "api_token": "t" }"#;

        let config = Config::from_json(&format!("{{ {provider} }}")).unwrap();
        assert!(config.server.internal_bind.is_none());

        let config = Config::from_json(&format!(
            r#"{{ "server": {{ "internal_bind": "127.0.0.1:8788" }}, {provider} }}"#
        ))
        .unwrap();
        assert_eq!(config.server.internal_bind.as_deref(), Some("127.0.0.1:8788"));

        let clash = format!(
            r#"{{ "server": {{ "bind": "127.0.0.1:9000", "internal_bind": "127.0.0.1:9000" }}, {provider} }}"#
        );
        assert!(Config::from_json(&clash).is_err());
    }

    #[test]
    fn zero_turn_cap_is_rejected() {
        let err = Config::from_json(
            r#"{
                "provider": { "kind": "workers_ai", "account_id": "a", "api_token": "t" },
                "storage": { "backend": "memory", "max_turns": 0 }
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_turns"));
    }

    #[test]
    fn explicit_sqlite_path_wins() {
        let storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: Some(PathBuf::from("/tmp/hm.db")),
            max_turns: Some(50),
        };
        assert_eq!(storage.sqlite_path().unwrap(), PathBuf::from("/tmp/hm.db"));
        assert_eq!(storage.limits().max_turns, Some(50));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Config::load_from(Path::new("/nonexistent/healthmate/config.json")).unwrap_err();
        assert!(err.to_string().contains("healthmate init"));
    }
}
