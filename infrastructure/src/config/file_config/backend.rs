//! Model backend configuration from TOML (`[backend]` section)
//!
//! ```toml
//! [backend]
//! base_url = "https://openrouter.ai/api/v1"
//! api_key_env = "OPENROUTER_API_KEY"
//! default_model = "openai/gpt-5.1"
//! ```

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Chairman used by councils that name none
    pub default_model: String,
    /// Connect timeout for the HTTP client
    pub connect_timeout_seconds: u64,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            default_model: "openai/gpt-5.1".to_string(),
            connect_timeout_seconds: 10,
        }
    }
}

impl FileBackendConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName {
                field: "backend.default_model".to_string(),
            });
        }
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroTimeout {
                field: "backend.connect_timeout_seconds".to_string(),
            });
        }
        Ok(())
    }

    /// API key read from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
