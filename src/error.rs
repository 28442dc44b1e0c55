use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;

/// ApiError
///
/// Failure of a call to the remote portal API. Pages never show the raw error;
/// they ask for `user_message` with their own fallback text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to portal API failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("portal API answered {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("portal API response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid portal API url: {0}")]
    InvalidUrl(String),
}

/// Shape of error bodies produced by the remote API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Builds a `Status` error, keeping the server's `message` when the body carries one.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty());
        ApiError::Status { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// The server-provided message if there is one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// PageError
///
/// A page that could not be produced at all. Rendered as a bare 500.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "page rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_fallback() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Email already registered".to_string()),
        };
        assert_eq!(err.user_message("Failed"), "Email already registered");
    }

    #[test]
    fn fallback_used_without_message() {
        let err = ApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message("Failed to load"), "Failed to load");
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_detected() {
        let err = ApiError::Status {
            status: 404,
            message: None,
        };
        assert!(err.is_not_found());
    }
}
