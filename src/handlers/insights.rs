//! Spending insight endpoints.
//!
//! Aggregates are computed over the same normalized views the listing
//! serves and cached per user. Transaction mutations invalidate the cache
//! eagerly; the TTL only bounds staleness after background syncs.

use axum::extract::State;
use axum::response::Json;
use common::{AccountBreakdown, CategoryBreakdown, SpendingStatistics};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sync::{reports, views};
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::schemas::{AppState, CachedInsight};

fn category_key(user_id: i32) -> String {
    format!("insight:category:{user_id}")
}

fn account_key(user_id: i32) -> String {
    format!("insight:account:{user_id}")
}

fn statistics_key(user_id: i32) -> String {
    format!("insight:statistics:{user_id}")
}

/// Drop all cached insight aggregates for one user.
pub async fn invalidate_user_insights(cache: &Cache<String, CachedInsight>, user_id: i32) {
    cache.invalidate(&category_key(user_id)).await;
    cache.invalidate(&account_key(user_id)).await;
    cache.invalidate(&statistics_key(user_id)).await;
}

async fn category_breakdown_for(
    state: &AppState,
    user_id: i32,
) -> Result<CategoryBreakdown, ApiError> {
    let key = category_key(user_id);
    if let Some(CachedInsight::Category(cached)) = state.cache.get(&key).await {
        return Ok(cached);
    }

    let transactions = views::user_transaction_views(&state.db, user_id).await?;
    let breakdown = reports::category_breakdown(&transactions);
    state
        .cache
        .insert(key, CachedInsight::Category(breakdown.clone()))
        .await;
    Ok(breakdown)
}

async fn account_breakdown_for(
    state: &AppState,
    user_id: i32,
) -> Result<AccountBreakdown, ApiError> {
    let key = account_key(user_id);
    if let Some(CachedInsight::Account(cached)) = state.cache.get(&key).await {
        return Ok(cached);
    }

    let transactions = views::user_transaction_views(&state.db, user_id).await?;
    let breakdown = reports::account_breakdown(&transactions);
    state
        .cache
        .insert(key, CachedInsight::Account(breakdown.clone()))
        .await;
    Ok(breakdown)
}

async fn spending_statistics_for(
    state: &AppState,
    user_id: i32,
) -> Result<SpendingStatistics, ApiError> {
    let key = statistics_key(user_id);
    if let Some(CachedInsight::Statistics(cached)) = state.cache.get(&key).await {
        return Ok(cached);
    }

    let transactions = views::user_transaction_views(&state.db, user_id).await?;
    let statistics = reports::spending_statistics(&transactions);
    state
        .cache
        .insert(key, CachedInsight::Statistics(statistics.clone()))
        .await;
    Ok(statistics)
}

/// All insight aggregates in one payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InsightsResponse {
    pub category_breakdown: CategoryBreakdown,
    pub account_breakdown: AccountBreakdown,
    pub spending_statistics: SpendingStatistics,
}

/// Combined insights over the user's ledger
#[utoipa::path(
    get,
    path = "/get-all-transactions-insights/",
    tag = "insights",
    responses(
        (status = 200, description = "Insights retrieved successfully", body = InsightsResponse),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_all_transactions_insights(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<InsightsResponse>, ApiError> {
    Ok(Json(InsightsResponse {
        category_breakdown: category_breakdown_for(&state, user.0.id).await?,
        account_breakdown: account_breakdown_for(&state, user.0.id).await?,
        spending_statistics: spending_statistics_for(&state, user.0.id).await?,
    }))
}

/// Spending per category
#[utoipa::path(
    get,
    path = "/get-category-breakdown/",
    tag = "insights",
    responses(
        (status = 200, description = "Breakdown retrieved successfully", body = CategoryBreakdown),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_category_breakdown(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CategoryBreakdown>, ApiError> {
    Ok(Json(category_breakdown_for(&state, user.0.id).await?))
}

/// Transaction counts per account
#[utoipa::path(
    get,
    path = "/get-account-breakdown/",
    tag = "insights",
    responses(
        (status = 200, description = "Breakdown retrieved successfully", body = AccountBreakdown),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_account_breakdown(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AccountBreakdown>, ApiError> {
    Ok(Json(account_breakdown_for(&state, user.0.id).await?))
}

/// Headline spending statistics
#[utoipa::path(
    get,
    path = "/get-spending-statistics/",
    tag = "insights",
    responses(
        (status = 200, description = "Statistics retrieved successfully", body = SpendingStatistics),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_spending_statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SpendingStatistics>, ApiError> {
    Ok(Json(spending_statistics_for(&state, user.0.id).await?))
}
