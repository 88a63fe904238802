//! Terminal chat against the configured gateway.
//!
//! Uses the same store as `serve`, so a session started here can be
//! resumed over HTTP with its id and vice versa.

use std::io::Write;
use std::path::PathBuf;

use healthmate_conversation::ConversationGateway;
use healthmate_core::SessionId;
use tracing::{debug, info};

use super::init_common_components;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub config_path: Option<PathBuf>,
    /// Session to resume (a new one is minted if not provided)
    pub session_id: Option<String>,
    /// Single message to send (non-interactive mode)
    pub message: Option<String>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(input.config_path.as_deref()).await?;
        let session_id = input.session_id.and_then(SessionId::new);

        if let Some(msg) = input.message {
            let result = common.gateway.handle_message(session_id, &msg).await?;
            println!("{}", result.reply);
            eprintln!("session: {}", result.session_id);
            info!("Turn {} completed.", result.turn_number);
        } else {
            run_interactive(&common.gateway, session_id).await?;
        }

        Ok(())
    }
}

/// Read lines from stdin until `exit`, keeping one session across turns.
async fn run_interactive(
    gateway: &ConversationGateway,
    mut session_id: Option<SessionId>,
) -> anyhow::Result<()> {
    match &session_id {
        Some(id) => println!("=== HealthMate session: {id} ==="),
        None => println!("=== HealthMate (new session) ==="),
    }
    println!("Type 'exit' or 'quit' to end, 'reset' to clear this session's history.\n");

    let mut turns = 0_usize;
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input, "exit" | "quit" | "q") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        if input == "reset" {
            if let Some(id) = &session_id {
                gateway.reset(id).await?;
                println!("History cleared for session {id}\n");
            }
            continue;
        }

        match gateway.handle_message(session_id.clone(), input).await {
            Ok(result) => {
                println!("\n{}\n", result.reply);
                if let Some(usage) = result.usage {
                    debug!(
                        "Tokens: {} prompt + {} completion = {} total",
                        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                    );
                }
                session_id = Some(result.session_id);
                turns += 1;
            }
            Err(e) => {
                eprintln!("Error: {e}");
            }
        }
    }

    match &session_id {
        Some(id) => println!("\nSession {id} ended after {turns} turn(s)."),
        None => println!("\nSession ended."),
    }
    Ok(())
}
