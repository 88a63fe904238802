use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use healthmate_conversation::ConversationError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Conversation(ConversationError::EmptyInput) => {
                StatusCode::BAD_REQUEST
            }
            Self::Conversation(ConversationError::Inference(_)) => StatusCode::BAD_GATEWAY,
            Self::Conversation(ConversationError::InferenceTimeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::Conversation(ConversationError::Storage(_)) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({status}): {self}");
        } else {
            warn!("Rejected request ({status}): {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            Error::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::from(ConversationError::EmptyInput).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::from(ConversationError::Inference(anyhow::anyhow!("quota"))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::from(ConversationError::InferenceTimeout(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::from(ConversationError::Storage(anyhow::anyhow!("disk"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
