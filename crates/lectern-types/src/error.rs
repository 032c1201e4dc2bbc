use thiserror::Error;

use crate::llm::LlmError;

/// Errors related to persona catalog operations.
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("persona not found")]
    NotFound,

    #[error("invalid persona name: {0}")]
    InvalidName(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<RepositoryError> for PersonaError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => PersonaError::NotFound,
            other => PersonaError::StorageError(other.to_string()),
        }
    }
}

/// Errors from session history backends.
///
/// Never surfaced to a conversation caller: reads degrade to an empty
/// window and writes are logged and dropped.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage unavailable: {0}")]
    Storage(String),

    #[error("history encoding error: {0}")]
    Encoding(String),
}

/// Errors from a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    #[error("tool request failed: {0}")]
    Request(String),

    #[error("tool API error (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("tool response could not be decoded: {0}")]
    Decode(String),
}

/// Errors that end a conversation turn.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("persona not found")]
    PersonaNotFound,

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("model error: {0}")]
    Model(#[from] LlmError),

    #[error("persona lookup failed: {0}")]
    Lookup(String),

    #[error("conversation cancelled")]
    Cancelled,
}

/// Errors from repository operations (used by trait definitions in lectern-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_error_display() {
        let err = PersonaError::InvalidName("name is required".to_string());
        assert_eq!(err.to_string(), "invalid persona name: name is required");
    }

    #[test]
    fn test_repository_not_found_maps_to_persona_not_found() {
        let err: PersonaError = RepositoryError::NotFound.into();
        assert!(matches!(err, PersonaError::NotFound));

        let err: PersonaError = RepositoryError::Query("locked".to_string()).into();
        assert!(matches!(err, PersonaError::StorageError(msg) if msg.contains("locked")));
    }

    #[test]
    fn test_conversation_error_wraps_llm_error() {
        let err: ConversationError = LlmError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), "model error: authentication failed");
    }

    #[test]
    fn test_tool_api_error_display() {
        let err = ToolError::Api {
            code: 401,
            message: "bad key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
