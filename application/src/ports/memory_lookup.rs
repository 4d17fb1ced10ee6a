//! Long-term memory port: lookup before a run, write-back after it

use async_trait::async_trait;
use council_domain::MemoryFact;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Memory service unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid memory response: {0}")]
    InvalidResponse(String),
}

/// Confidence-scored search against the memory store, plus recording of
/// finished answers so later runs can find them
#[async_trait]
pub trait MemoryLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MemoryFact>, MemoryError>;

    async fn record(&self, query: &str, response: &str) -> Result<(), MemoryError>;
}

/// Memory disabled
pub struct NoMemory;

#[async_trait]
impl MemoryLookup for NoMemory {
    async fn search(&self, _query: &str) -> Result<Vec<MemoryFact>, MemoryError> {
        Ok(Vec::new())
    }

    async fn record(&self, _query: &str, _response: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}
