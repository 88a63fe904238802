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

//! Session store backends.
//!
//! - [`MemorySessionStore`]: process-local map, lost on restart
//! - [`SqliteSessionStore`]: one row per turn in a SQLite database

mod memory;
mod sqlite;

pub use healthmate_core::{SessionStore, StoreLimits};
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
