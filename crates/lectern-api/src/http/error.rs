//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use lectern_types::error::{ConversationError, PersonaError};

use super::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Persona(PersonaError),
    Conversation(ConversationError),
    Validation(String),
}

impl From<PersonaError> for AppError {
    fn from(e: PersonaError) -> Self {
        AppError::Persona(e)
    }
}

impl From<ConversationError> for AppError {
    fn from(e: ConversationError) -> Self {
        AppError::Conversation(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Persona(PersonaError::NotFound)
            | AppError::Conversation(ConversationError::PersonaNotFound) => (
                StatusCode::NOT_FOUND,
                "PERSONA_NOT_FOUND",
                "Persona not found".to_string(),
            ),
            AppError::Persona(PersonaError::InvalidName(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Persona(e @ PersonaError::StorageError(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Conversation(e @ ConversationError::InvalidSessionId(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Conversation(e @ ConversationError::Model(_)) => {
                (StatusCode::BAD_GATEWAY, "MODEL_ERROR", e.to_string())
            }
            AppError::Conversation(e @ ConversationError::Lookup(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Conversation(e @ ConversationError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED", e.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            warn!(status = %status, code, error = %message, "request failed");
        }
        (status, Json(ApiResponse::error(code, message))).into_response()
    }
}
