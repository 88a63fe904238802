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

mod normalize;
mod openai;
mod workers_ai;

use std::time::Duration;

use reqwest::Client;

pub use normalize::normalize_reply;
pub use openai::OpenAiCompatibleProvider;
pub use workers_ai::WorkersAiProvider;

/// Shared HTTP client; `timeout` bounds the whole request.
fn build_client(timeout: Option<Duration>) -> anyhow::Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn parse_usage(value: &serde_json::Value) -> Option<healthmate_core::Usage> {
    let usage = value.as_object()?;
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    Some(healthmate_core::Usage {
        prompt_tokens: count("prompt_tokens"),
        completion_tokens: count("completion_tokens"),
        total_tokens: count("total_tokens"),
    })
}
