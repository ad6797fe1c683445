use std::sync::Arc;

use common::codec::FieldCodec;
use common::{AccountBreakdown, CategoryBreakdown, SpendingStatistics, TransactionView};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use sync::Reconciler;
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for per-user insight aggregates
    pub cache: Cache<String, CachedInsight>,
    /// Provider sync engine
    pub reconciler: Arc<Reconciler>,
    /// Codec applied to sensitive columns at the storage boundary
    pub codec: Arc<dyn FieldCodec>,
}

/// Cached insight payloads, keyed per user and endpoint
#[derive(Clone, Debug)]
pub enum CachedInsight {
    Category(CategoryBreakdown),
    Account(AccountBreakdown),
    Statistics(SpendingStatistics),
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Stable error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Generic mutation acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::transactions::get_all_transactions,
        crate::handlers::transactions::add_transaction,
        crate::handlers::transactions::edit_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::transactions::get_categories,
        crate::handlers::banking::get_bank_accounts,
        crate::handlers::banking::sync_bank_accounts,
        crate::handlers::banking::get_account_balance,
        crate::handlers::banking::delete_bank_account,
        crate::handlers::insights::get_all_transactions_insights,
        crate::handlers::insights::get_category_breakdown,
        crate::handlers::insights::get_account_breakdown,
        crate::handlers::insights::get_spending_statistics,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            StatusResponse,
            TransactionView,
            CategoryBreakdown,
            AccountBreakdown,
            SpendingStatistics,
            crate::handlers::transactions::TransactionListResponse,
            crate::handlers::transactions::CreateTransactionRequest,
            crate::handlers::transactions::UpdateTransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::transactions::CategoriesResponse,
            crate::handlers::banking::BankAccountResponse,
            crate::handlers::banking::BankAccountsResponse,
            crate::handlers::banking::SyncAccountsResponse,
            crate::handlers::banking::AccountBalance,
            crate::handlers::banking::AccountBalancesResponse,
            crate::handlers::insights::InsightsResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "transactions", description = "Transaction listing and mutation endpoints"),
        (name = "banking", description = "Bank account endpoints"),
        (name = "insights", description = "Spending insight endpoints"),
    ),
    info(
        title = "ledgersync API",
        description = "Personal finance ledger with provider transaction synchronization",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
