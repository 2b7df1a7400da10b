//! Failure taxonomy shared by the tools and the ordering driver. Lower
//! layers return these wrapped in `anyhow::Error`; the tool layer turns
//! them into text for the model so a turn never crashes the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrandError {
    /// Malformed tool arguments, rejected before any side effect.
    #[error("Invalid arguments: {0}")]
    Validation(String),
    /// Credential acquisition failed. Not retried automatically.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// The Calendar/Gmail service (or the token endpoint) returned an error.
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("Could not find menu item matching '{0}'")]
    ItemNotFound(String),
    #[error("Could not find page element: {0}")]
    ElementNotFound(String),
    #[error("{0} is not implemented yet")]
    NotImplemented(String),
}

impl ErrandError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ErrandError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ErrandError::Upstream(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        ErrandError::Authentication(msg.into())
    }
}

/// Render any error the way the model sees it in a tool result.
pub fn tool_error_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ErrandError>() {
        Some(e) => format!("Error: {}", e),
        None => format!("Error: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn it_renders_taxonomy_errors_as_text() {
        let err: anyhow::Error = ErrandError::validation("missing field `summary`").into();
        assert_eq!(
            tool_error_text(&err),
            "Error: Invalid arguments: missing field `summary`"
        );

        let err: anyhow::Error = ErrandError::ItemNotFound("pizza".to_string()).into();
        assert_eq!(
            tool_error_text(&err),
            "Error: Could not find menu item matching 'pizza'"
        );
    }

    #[test]
    fn it_renders_context_chain_for_other_errors() {
        let err = anyhow!("connection refused").context("Calendar request failed");
        assert_eq!(
            tool_error_text(&err),
            "Error: Calendar request failed: connection refused"
        );
    }
}
