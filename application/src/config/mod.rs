//! Application-level configuration.
//!
//! - [`DeliberationConfig`] — orchestrator parameters (timeouts, retries, memory policy)

pub mod deliberation_config;

pub use deliberation_config::DeliberationConfig;
