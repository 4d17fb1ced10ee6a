//! Infrastructure layer for council-deliberation
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod backend;
pub mod config;
pub mod leaderboard;
pub mod logging;
pub mod memory;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use backend::OpenAiCompatibleBackend;
pub use config::{ConfigError, ConfigLoader, ConfigValidationError, FileConfig};
pub use leaderboard::JsonFileLeaderboard;
pub use logging::JsonlConversationLogger;
pub use memory::HttpMemoryLookup;
pub use tools::HttpToolInvoker;
