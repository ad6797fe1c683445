use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sea_orm::{DbErr, SqlErr};
use sync::SyncError;
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

/// Request-level failures, mapped onto stable error codes.
///
/// Internal detail (database errors, provider messages) is logged at the
/// conversion sites and never reaches the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("No provider access token is linked to this user")]
    AccessTokenMissing,

    #[error("A transaction with this external id already exists")]
    DuplicateTransaction,

    #[error("A sync for this user is already in progress")]
    SyncInProgress,

    #[error("The provider request failed")]
    Provider,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AccessTokenMissing => StatusCode::BAD_REQUEST,
            ApiError::DuplicateTransaction => StatusCode::CONFLICT,
            ApiError::SyncInProgress => StatusCode::CONFLICT,
            ApiError::Provider => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::AccessTokenMissing => "access_token_missing",
            ApiError::DuplicateTransaction => "duplicate_transaction",
            ApiError::SyncInProgress => "sync_in_progress",
            ApiError::Provider => "provider_error",
            ApiError::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        // Two concurrent creates can both pass a pre-insert duplicate check;
        // the loser surfaces here as a unique violation, not an internal error.
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            warn!("Unique constraint violation: {}", err);
            return ApiError::DuplicateTransaction;
        }
        error!("Database error: {}", err);
        ApiError::Internal
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::MissingAccessToken => ApiError::AccessTokenMissing,
            SyncError::SyncInProgress => ApiError::SyncInProgress,
            SyncError::Provider(e) => {
                warn!("Provider error during sync: {}", e);
                ApiError::Provider
            }
            SyncError::PageLimitExceeded(limit) => {
                warn!("Provider feed exceeded the page limit of {}", limit);
                ApiError::Provider
            }
            SyncError::Database(e) => ApiError::from(e),
            SyncError::Codec(e) => {
                error!("Field codec error: {}", e);
                ApiError::Internal
            }
        }
    }
}
