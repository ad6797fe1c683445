//! Transport-layer types shared between the backend and the sync engine.
//! These structs mirror the JSON payloads served by the handlers so the
//! sync crate can compute over them without depending on the server crate.

pub mod codec;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Category label used when a transaction carries no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A ledger transaction in the shape callers see it: trimmed name, absolute
/// amount, category defaulted. Filtering, sorting and all insight reports
/// run over this view rather than the raw entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionView {
    pub id: i32,
    pub name: String,
    /// Absolute value; direction is carried by `is_received`.
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Never empty; [`UNCATEGORIZED`] stands in for a missing label.
    pub category: String,
    pub is_received: bool,
    pub bank_account_id: i32,
    pub account_name: Option<String>,
    /// Provider-assigned external identifier (the dedup key).
    pub transaction_id: String,
}

/// Spending per category over all outgoing transactions.
/// Parallel lists keep the payload chart-friendly: `amounts[i]` and
/// `percentages[i]` belong to `categories[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryBreakdown {
    pub categories: Vec<String>,
    pub amounts: Vec<Decimal>,
    /// Whole percents of `total_spent`, rounded.
    pub percentages: Vec<i64>,
    pub total_spent: Decimal,
}

/// Transaction count per account, as a share of all transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountBreakdown {
    pub accounts: Vec<String>,
    pub transaction_counts: Vec<u64>,
    /// Whole percents of `total_transactions`, rounded.
    pub percentages: Vec<i64>,
    pub total_transactions: u64,
}

/// Headline spending figures over the full transaction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpendingStatistics {
    pub highest_received_transaction: Option<TransactionView>,
    pub highest_spent_transaction: Option<TransactionView>,
    pub transaction_count: u64,
}
