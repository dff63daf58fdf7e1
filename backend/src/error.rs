use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("user_email is required")]
    MissingEmail,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LeadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LeadError::InvalidBody(_) | LeadError::MissingEmail => StatusCode::BAD_REQUEST,
            LeadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LeadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // internal details stay in the logs
        let message = match &self {
            LeadError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Email provider rejected the message: {0}")]
    Provider(String),
    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build email message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}
