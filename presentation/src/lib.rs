//! Presentation layer for council-deliberation
//!
//! This crate contains the CLI definition, the NDJSON event writer used by
//! `council ask`, and the streaming HTTP server used by `council serve`.

pub mod cli;
pub mod output;
pub mod server;

// Re-export commonly used types
pub use cli::commands::{AskArgs, Cli, Command, ModeArg, ServeArgs};
pub use output::ndjson::NdjsonWriter;
pub use server::{AppState, CouncilError, DeliberationService, TranscriptFactory, router, serve};
