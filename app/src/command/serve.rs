use std::path::PathBuf;

use tracing::info;

use super::init_common_components;

/// Input for the serve command.
#[derive(Debug, Clone)]
pub struct ServeInput {
    pub config_path: Option<PathBuf>,
    /// Overrides `server.bind` from config
    pub bind: Option<String>,
    /// Overrides `server.internal_bind` from config
    pub internal_bind: Option<String>,
}

/// Strategy for running the HTTP endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(input.config_path.as_deref()).await?;
        let bind = input
            .bind
            .unwrap_or_else(|| common.config.server.bind.clone());

        let internal_bind = input
            .internal_bind
            .or_else(|| common.config.server.internal_bind.clone());
        if internal_bind.as_deref() == Some(bind.as_str()) {
            anyhow::bail!("Internal bind address must differ from the public one: {bind}");
        }

        info!("Starting HealthMate server. Press Ctrl+C to stop.");
        healthmate_server::serve(common.gateway, &bind, internal_bind.as_deref()).await?;
        Ok(())
    }
}
