#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    ChatInput, ChatStrategy, CommandStrategy, HistoryInput, HistoryStrategy, InfoStrategy,
    InitStrategy, ResetStrategy, ServeInput, ServeStrategy, SessionsStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "healthmate")]
#[command(about = "HealthMate health-advice chat gateway", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/healthmate/config.json)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP chat endpoint
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,

        /// Address for the session store routes (overrides server.internal_bind)
        #[arg(long)]
        internal_bind: Option<String>,
    },
    /// Chat from the terminal
    Chat {
        /// Session ID to resume
        #[arg(short = 's', long)]
        session: Option<String>,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    /// Print a session's stored history
    History {
        /// Session ID
        session: String,
    },
    /// List stored sessions
    Sessions,
    /// Delete a session's stored history
    Reset {
        /// Session ID
        session: String,
    },
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Serve {
            bind,
            internal_bind,
        } => {
            ServeStrategy
                .execute(ServeInput {
                    config_path,
                    bind,
                    internal_bind,
                })
                .await
        }
        Commands::Chat { session, message } => {
            ChatStrategy
                .execute(ChatInput {
                    config_path,
                    session_id: session,
                    message,
                })
                .await
        }
        Commands::History { session } => {
            HistoryStrategy
                .execute(HistoryInput {
                    config_path,
                    session_id: session,
                })
                .await
        }
        Commands::Sessions => SessionsStrategy.execute(config_path).await,
        Commands::Reset { session } => {
            ResetStrategy
                .execute(HistoryInput {
                    config_path,
                    session_id: session,
                })
                .await
        }
        Commands::Init => InitStrategy.execute(config_path).await,
        Commands::Info => InfoStrategy.execute(config_path).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_global_config() {
        let cli = Cli::try_parse_from([
            "healthmate",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "-c",
            "/tmp/hm.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/hm.json")));
        assert!(
            matches!(cli.command, Commands::Serve { bind: Some(ref b), internal_bind: None } if b == "0.0.0.0:9000")
        );
    }

    #[test]
    fn parses_chat_message() {
        let cli = Cli::try_parse_from(["healthmate", "chat", "-s", "s1", "-m", "hello"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Chat { session: Some(ref s), message: Some(ref m) } if s == "s1" && m == "hello"
        ));
    }

    #[test]
    fn history_requires_session() {
        assert!(Cli::try_parse_from(["healthmate", "history"]).is_err());
    }
}
