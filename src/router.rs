use crate::handlers::{
    banking::{delete_bank_account, get_account_balance, get_bank_accounts, sync_bank_accounts},
    health::health_check,
    insights::{
        get_account_breakdown, get_all_transactions_insights, get_category_breakdown,
        get_spending_statistics,
    },
    transactions::{
        add_transaction, delete_transaction, edit_transaction, get_all_transactions,
        get_categories,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Transaction routes
        .route("/get-all-transactions/", get(get_all_transactions))
        .route("/add-transaction/", post(add_transaction))
        .route("/edit-transaction/:transaction_id/", post(edit_transaction))
        .route("/delete-transaction/:transaction_id/", post(delete_transaction))
        .route("/get-categories/", get(get_categories))
        // Banking routes
        .route("/get-bank-accounts/", get(get_bank_accounts))
        .route("/sync-bank-accounts/", post(sync_bank_accounts))
        .route("/get-account-balance/", get(get_account_balance))
        .route("/delete-bank-account/:account_id/", post(delete_bank_account))
        // Insight routes
        .route("/get-all-transactions-insights/", get(get_all_transactions_insights))
        .route("/get-category-breakdown/", get(get_category_breakdown))
        .route("/get-account-breakdown/", get(get_account_breakdown))
        .route("/get-spending-statistics/", get(get_spending_statistics))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
