//! JSON configuration loaded from `~/healthmate/config.json`.

mod schema;

pub use schema::{
    AgentDefaults, AgentsConfig, Config, ProviderConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
