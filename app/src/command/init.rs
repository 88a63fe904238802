use std::path::PathBuf;

use healthmate_config::Config;

/// Strategy for initializing the configuration.
///
/// Writes the config template to `~/healthmate/config.json`, or to the
/// path given with `--config`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, config_path: Self::Input) -> anyhow::Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => Config::default_path()?,
        };
        Config::create_config(&path)
    }
}
