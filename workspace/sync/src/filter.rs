//! Composable, declarative transaction filtering.
//!
//! Each request-level filter is one tagged variant with typed parameters;
//! a query is just a slice of them, combined with logical AND by the
//! matcher. Sorting and pagination live here as well so every caller gets
//! the same deterministic ordering.

use chrono::NaiveDate;
use common::TransactionView;
use rust_decimal::Decimal;

/// Fixed page size for transaction listings.
pub const PAGE_SIZE: usize = 50;

/// Direction of a transaction from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Received,
    Spent,
}

impl TransactionKind {
    /// Parse the `type` query parameter. Anything other than `received`
    /// selects spent transactions.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("received") {
            TransactionKind::Received
        } else {
            TransactionKind::Spent
        }
    }
}

/// One filter predicate over a [`TransactionView`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionFilter {
    /// Case-insensitive substring match on the transaction name.
    Search(String),
    /// Case-insensitive exact match on the category label.
    Category(String),
    /// Inclusive lower bound on the date.
    StartDate(NaiveDate),
    /// Inclusive upper bound on the date.
    EndDate(NaiveDate),
    /// Inclusive lower bound on the absolute amount.
    MinAmount(Decimal),
    /// Inclusive upper bound on the absolute amount.
    MaxAmount(Decimal),
    Kind(TransactionKind),
    /// Restrict to one bank account by local id.
    Account(i32),
}

impl TransactionFilter {
    pub fn matches(&self, txn: &TransactionView) -> bool {
        match self {
            TransactionFilter::Search(needle) => txn
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            TransactionFilter::Category(category) => {
                txn.category.eq_ignore_ascii_case(category)
            }
            TransactionFilter::StartDate(start) => txn.date >= *start,
            TransactionFilter::EndDate(end) => txn.date <= *end,
            TransactionFilter::MinAmount(min) => txn.amount >= *min,
            TransactionFilter::MaxAmount(max) => txn.amount <= *max,
            TransactionFilter::Kind(kind) => {
                txn.is_received == matches!(kind, TransactionKind::Received)
            }
            TransactionFilter::Account(id) => txn.bank_account_id == *id,
        }
    }
}

/// Keep only transactions matching every filter (logical AND).
pub fn apply(
    filters: &[TransactionFilter],
    transactions: Vec<TransactionView>,
) -> Vec<TransactionView> {
    transactions
        .into_iter()
        .filter(|txn| filters.iter().all(|f| f.matches(txn)))
        .collect()
}

/// Sort by date descending; id descending breaks ties so identical queries
/// always paginate identically.
pub fn sort_newest_first(transactions: &mut [TransactionView]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

/// Fixed-size pagination. An empty set still has one (empty) page, and an
/// out-of-range page number clamps to the nearest valid page.
pub fn paginate<T>(items: Vec<T>, page: usize) -> Page<T> {
    let total_pages = items.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let items = items
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    Page {
        items,
        page,
        total_pages,
    }
}
