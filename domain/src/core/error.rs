//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid panel: {0}")]
    InvalidPanel(#[from] crate::council::panel::PanelError),

    #[error("Invalid council: {0}")]
    InvalidCouncil(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let error = DomainError::InvalidQuery("empty".to_string());
        assert_eq!(error.to_string(), "Invalid query: empty");
    }

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::InvalidTransition {
            from: "stage2".to_string(),
            to: "stage1".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid state transition: stage2 -> stage1");
    }
}
