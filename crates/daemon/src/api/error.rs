/// Mapping from domain failures to HTTP responses

use super::responses::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use onionmsg_common::OnionMsgError;
use onionmsg_core::{DirectoryError, OnionError};
use tracing::{error, warn};

/// Application error type
#[derive(Debug)]
pub struct AppError {
    message: String,
    status_code: StatusCode,
}

impl AppError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!("API Error: {}", self.message);
        } else {
            warn!("API Error: {}", self.message);
        }

        let body = Json(ErrorResponse::new(self.message, self.status_code.as_u16()));

        (self.status_code, body).into_response()
    }
}

impl From<OnionError> for AppError {
    fn from(err: OnionError) -> Self {
        match err {
            OnionError::InsufficientRelays { .. } => AppError::unavailable(err.to_string()),
            OnionError::CryptoFailure(_) => AppError::internal(err.to_string()),
            OnionError::EmptyCircuit
            | OnionError::DuplicateRelay(_)
            | OnionError::MalformedLayer(_)
            | OnionError::KeyUnwrapFailure
            | OnionError::PayloadDecryptFailure => AppError::bad_request(err.to_string()),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::AlreadyRegistered(_) => AppError::conflict(err.to_string()),
            DirectoryError::InsufficientRelays { .. } => AppError::unavailable(err.to_string()),
            DirectoryError::EmptySubset => AppError::bad_request(err.to_string()),
        }
    }
}

impl From<OnionMsgError> for AppError {
    fn from(err: OnionMsgError) -> Self {
        if err.is_transport() {
            return AppError::bad_gateway(err.to_string());
        }
        match err {
            OnionMsgError::UnknownRelay(_) | OnionMsgError::UnknownDestination(_) => {
                AppError::bad_gateway(err.to_string())
            }
            OnionMsgError::Registry(_) => AppError::unavailable(err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
