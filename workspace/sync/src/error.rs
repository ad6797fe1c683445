use thiserror::Error;

use crate::provider::ProviderError;

/// Error types for the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Error surfaced by the provider gateway
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The user has not linked a provider item yet
    #[error("No provider access token is linked for this user")]
    MissingAccessToken,

    /// Another reconciliation already holds this user's sync permit
    #[error("A sync is already in flight for this user")]
    SyncInProgress,

    /// The provider kept reporting `has_more` past the page cap
    #[error("Provider pagination exceeded {0} pages without completing")]
    PageLimitExceeded(usize),

    /// Error from the field codec at the storage boundary
    #[error("Field codec error: {0}")]
    Codec(#[from] common::codec::CodecError),
}

/// Type alias for Result with SyncError
pub type Result<T> = std::result::Result<T, SyncError>;
