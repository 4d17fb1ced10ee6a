//! HTTP tool gateway client — the concrete implementation of [`ToolInvoker`].
//!
//! One gateway fronts every tool server:
//!
//! ```text
//! GET  {endpoint}/tools   -> {"tools": [{"server", "name", "description", "input_schema"}]}
//! POST {endpoint}/invoke  <- {"server", "tool", "arguments"}
//!                         -> {"success": bool, "content": ..., "error": "..."}
//! ```
//!
//! A reply with `success: false` is a content failure and comes back as
//! `Ok`; only transport problems are errors.

use async_trait::async_trait;
use council_application::ports::tool_invoker::{ToolInvokeError, ToolInvoker};
use council_domain::{ToolDescriptor, ToolInventory, ToolResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    server: &'a str,
    tool: &'a str,
    arguments: &'a Value,
}

/// Tool invoker backed by an HTTP gateway
pub struct HttpToolInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpToolInvoker {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ToolInvokeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ToolInvokeError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport_error(e: reqwest::Error) -> ToolInvokeError {
    if e.is_timeout() {
        ToolInvokeError::Timeout
    } else {
        ToolInvokeError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl ToolInvoker for HttpToolInvoker {
    async fn inventory(&self) -> Result<ToolInventory, ToolInvokeError> {
        let response = self
            .client
            .get(format!("{}/tools", self.endpoint))
            .send()
            .await
            .map_err(transport_error)?;
        let listing: ToolListing = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ToolInvokeError::InvalidResponse(e.to_string()))?;
        debug!("Tool gateway lists {} tool(s)", listing.tools.len());
        Ok(ToolInventory::new(listing.tools))
    }

    async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: &Value,
    ) -> Result<ToolResponse, ToolInvokeError> {
        let response = self
            .client
            .post(format!("{}/invoke", self.endpoint))
            .json(&InvokeRequest {
                server,
                tool,
                arguments,
            })
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ToolInvokeError::UnknownServer(server.to_string()));
        }
        Self::check(response)
            .await?
            .json::<ToolResponse>()
            .await
            .map_err(|e| ToolInvokeError::InvalidResponse(e.to_string()))
    }
}
