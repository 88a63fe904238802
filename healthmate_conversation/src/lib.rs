#![warn(
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

//! Multi-turn conversation handling over a session store.
//!
//! # Key Features
//! - Session ids minted on first contact and echoed back
//! - Configurable history window for model context
//! - Optional per-session serialization of concurrent turns
//! - No store mutation on any failed turn

mod gateway;
mod history;
mod locks;

pub use gateway::{ConversationError, ConversationGateway, GatewayConfig, TurnResult};
pub use history::{HistoryConfig, HistoryManager, HistoryStats, HistoryWindow};
pub use locks::{SessionLocks, TurnGuard};
