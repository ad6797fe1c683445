//! Abstraction over the external aggregation provider's change-feed.
//!
//! The gateway wraps two provider calls: the cursor-paginated transaction
//! feed and the account listing. It never retries internally; bounding and
//! retry policy belong to the [`crate::reconciler`].

pub mod http;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by a provider gateway.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("Provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider returned a structured API error.
    #[error("Provider API error {code}: {message}")]
    Api { code: String, message: String },

    /// The provider rejected the pagination cursor; callers should restart
    /// pagination from the beginning of the feed.
    #[error("Provider rejected the pagination cursor")]
    InvalidCursor,

    /// The provider response body could not be decoded.
    #[error("Provider response could not be decoded: {0}")]
    Decode(String),
}

/// One transaction as reported by the provider feed.
///
/// Sign convention is the provider's: a positive amount is money leaving the
/// account. The reconciler inverts this into the local convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTransaction {
    pub transaction_id: String,
    /// External id of the account the transaction was posted to.
    pub account_id: String,
    pub name: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Optional category hint, underscore-separated (e.g. `FOOD_AND_DRINK`).
    pub category: Option<String>,
}

/// One account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub account_id: String,
    pub name: Option<String>,
    pub official_name: Option<String>,
    /// Provider account type (e.g. `depository`, `credit`, `loan`).
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub balance: Decimal,
    pub currency_code: Option<String>,
}

/// One page of the provider's transaction change-feed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    pub added: Vec<ProviderTransaction>,
    /// Cursor to resume from. Valid even on the final page.
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Minimal contract over the provider API.
#[async_trait]
pub trait ProviderGateway: Send + Sync + std::fmt::Debug {
    /// Fetch one page of the transaction feed, resuming from `cursor` when
    /// given or starting from the beginning of the item's history otherwise.
    async fn fetch_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, ProviderError>;

    /// Fetch the current account list for the item.
    async fn fetch_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, ProviderError>;
}
