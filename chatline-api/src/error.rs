use crate::types::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chatline_core::{ChatError, IdentityError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid session token")]
    InvalidSession,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Chat(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationFailed | ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Chat(ChatError::UnknownUser(_)) => StatusCode::NOT_FOUND,
            ApiError::Chat(ChatError::Identity(IdentityError::NotFound)) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Chat(ChatError::Identity(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Chat(ChatError::Store(err)) => match err {
                StoreError::NotFound | StoreError::NoSuchMember => StatusCode::NOT_FOUND,
                StoreError::DuplicateConversation => StatusCode::CONFLICT,
                StoreError::NotAMember | StoreError::Forbidden => StatusCode::FORBIDDEN,
                StoreError::NotDirect
                | StoreError::NotGroup
                | StoreError::InvalidTransition { .. }
                | StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
