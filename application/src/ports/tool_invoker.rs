//! Tool invocation port
//!
//! Tool servers are reached through one uniform call:
//! `invoke(server, tool, arguments) -> {success, content | error}`.

use async_trait::async_trait;
use council_domain::{ToolInventory, ToolResponse};
use serde_json::Value;
use thiserror::Error;

/// Transport-level failures reaching a tool server
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolInvokeError {
    #[error("Tool server unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Tool call timed out")]
    Timeout,

    #[error("Unknown tool server: {0}")]
    UnknownServer(String),

    #[error("Invalid tool response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Every tool currently offered across all servers
    async fn inventory(&self) -> Result<ToolInventory, ToolInvokeError>;

    /// Run one tool. `Ok` may still carry a failure payload.
    async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: &Value,
    ) -> Result<ToolResponse, ToolInvokeError>;
}

/// No tool servers configured
pub struct NoTools;

#[async_trait]
impl ToolInvoker for NoTools {
    async fn inventory(&self) -> Result<ToolInventory, ToolInvokeError> {
        Ok(ToolInventory::default())
    }

    async fn invoke(
        &self,
        server: &str,
        _tool: &str,
        _arguments: &Value,
    ) -> Result<ToolResponse, ToolInvokeError> {
        Err(ToolInvokeError::UnknownServer(server.to_string()))
    }
}
