use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use common::{TransactionView, UNCATEGORIZED};
use model::entities::prelude::*;
use model::entities::{bank_account, transaction};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use sync::filter::{self, TransactionFilter, TransactionKind};
use sync::views;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::insights::invalidate_user_insights;
use crate::schemas::{AppState, StatusResponse};

/// Query parameters for the transaction listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransactionListQuery {
    /// Substring to search transaction names for
    pub search: Option<String>,
    /// Category label to match exactly
    pub category: Option<String>,
    /// Inclusive start of the date range (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Inclusive end of the date range (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
    /// Inclusive lower bound on the absolute amount
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on the absolute amount
    pub max_price: Option<Decimal>,
    /// Direction: "received" or "spent"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Bank account id to restrict to
    pub bank_account: Option<i32>,
    /// Page number (1-based, 50 per page)
    pub page: Option<usize>,
}

/// One page of transactions
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionView>,
    pub page: usize,
    pub total_pages: usize,
}

/// Request body for creating a transaction manually
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub name: String,
    /// Positive amount; direction is carried by `is_received`
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: Option<String>,
    #[serde(default)]
    pub is_received: bool,
    /// Local id of the bank account the transaction belongs to
    pub bank_account: i32,
    /// External identifier; must be unique across the store
    pub transaction_id: String,
}

/// Request body for partially updating a transaction
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateTransactionRequest {
    pub name: Option<String>,
    /// Positive amount; the stored sign is re-derived from `is_received`
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub is_received: Option<bool>,
}

/// A single mutated transaction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub success: bool,
    pub transaction: TransactionView,
}

/// Distinct category labels of the user's ledger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

fn build_filters(query: &TransactionListQuery) -> Vec<TransactionFilter> {
    let mut filters = Vec::new();
    if let Some(search) = &query.search {
        filters.push(TransactionFilter::Search(search.clone()));
    }
    if let Some(category) = &query.category {
        filters.push(TransactionFilter::Category(category.clone()));
    }
    if let Some(start) = query.start_date {
        filters.push(TransactionFilter::StartDate(start));
    }
    if let Some(end) = query.end_date {
        filters.push(TransactionFilter::EndDate(end));
    }
    if let Some(min) = query.min_price {
        filters.push(TransactionFilter::MinAmount(min));
    }
    if let Some(max) = query.max_price {
        filters.push(TransactionFilter::MaxAmount(max));
    }
    if let Some(kind) = &query.kind {
        filters.push(TransactionFilter::Kind(TransactionKind::parse(kind)));
    }
    if let Some(account) = query.bank_account {
        filters.push(TransactionFilter::Account(account));
    }
    filters
}

fn to_view(txn: transaction::Model, account_name: Option<String>) -> TransactionView {
    TransactionView {
        id: txn.id,
        name: txn.name.trim().to_string(),
        amount: txn.amount.abs(),
        date: txn.date,
        category: txn
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        is_received: txn.is_received,
        bank_account_id: txn.account_id,
        account_name,
        transaction_id: txn.external_id,
    }
}

/// List transactions with filters and pagination
#[utoipa::path(
    get,
    path = "/get-all-transactions/",
    tag = "transactions",
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = TransactionListResponse),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_all_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    // Opportunistic sync. A busy, unlinked or failing provider never breaks
    // the read path; the outcome is only logged.
    match state.reconciler.try_sync_transactions(&state.db, &user.0).await {
        Ok(Some(outcome)) => {
            if outcome.processed > 0 {
                invalidate_user_insights(&state.cache, user.0.id).await;
            }
            info!(
                processed = outcome.processed,
                skipped = outcome.skipped(),
                "opportunistic sync before listing"
            );
        }
        Ok(None) => {}
        Err(e) => warn!("Opportunistic sync failed: {}", e),
    }

    let all = views::user_transaction_views(&state.db, user.0.id).await?;
    let filters = build_filters(&query);
    let mut matched = filter::apply(&filters, all);
    filter::sort_newest_first(&mut matched);
    let page = filter::paginate(matched, query.page.unwrap_or(1));

    Ok(Json(TransactionListResponse {
        transactions: page.items,
        page: page.page,
        total_pages: page.total_pages,
    }))
}

/// Create a transaction manually
#[utoipa::path(
    post,
    path = "/add-transaction/",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 200, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Bank account not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Duplicate external id", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn add_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::InvalidRequest("Amount must be positive".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Name must not be empty".to_string()));
    }

    let account = BankAccount::find_by_id(request.bank_account)
        .filter(bank_account::Column::OwnerId.eq(user.0.id))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Bank account"))?;

    let duplicate = Transaction::find()
        .filter(transaction::Column::ExternalId.eq(&request.transaction_id))
        .one(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::DuplicateTransaction);
    }

    let created = transaction::ActiveModel {
        owner_id: Set(user.0.id),
        account_id: Set(account.id),
        name: Set(request.name.trim().to_string()),
        amount: Set(transaction::Model::signed_amount(request.amount, request.is_received)),
        date: Set(request.date),
        category: Set(request.category.filter(|c| !c.is_empty())),
        is_received: Set(request.is_received),
        external_id: Set(request.transaction_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    invalidate_user_insights(&state.cache, user.0.id).await;
    info!(transaction_id = created.id, "transaction created");

    Ok(Json(TransactionResponse {
        success: true,
        transaction: to_view(created, account.account_name),
    }))
}

/// Partially update a transaction
#[utoipa::path(
    post,
    path = "/edit-transaction/{transaction_id}/",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = TransactionResponse),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn edit_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<i32>,
    Json(request): Json<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let existing = Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::OwnerId.eq(user.0.id))
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Transaction"))?;

    // The effective direction decides the stored sign even when only one of
    // amount and is_received changes.
    let effective_received = request.is_received.unwrap_or(existing.is_received);
    let effective_amount = match request.amount {
        Some(amount) if amount <= Decimal::ZERO => {
            return Err(ApiError::InvalidRequest("Amount must be positive".to_string()));
        }
        Some(amount) => amount,
        None => existing.amount.abs(),
    };

    let account_id = existing.account_id;
    let mut active: transaction::ActiveModel = existing.into();
    if let Some(name) = request.name {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Name must not be empty".to_string()));
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(date) = request.date {
        active.date = Set(date);
    }
    if let Some(category) = request.category {
        active.category = Set(Some(category).filter(|c| !c.is_empty()));
    }
    active.amount = Set(transaction::Model::signed_amount(effective_amount, effective_received));
    active.is_received = Set(effective_received);

    let updated = active.update(&state.db).await?;

    let account_name = BankAccount::find_by_id(account_id)
        .one(&state.db)
        .await?
        .and_then(|a| a.account_name);

    invalidate_user_insights(&state.cache, user.0.id).await;
    info!(transaction_id = updated.id, "transaction updated");

    Ok(Json(TransactionResponse {
        success: true,
        transaction: to_view(updated, account_name),
    }))
}

/// Delete a transaction
#[utoipa::path(
    post,
    path = "/delete-transaction/{transaction_id}/",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = StatusResponse),
        (status = 404, description = "Transaction not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<i32>,
) -> Result<Json<StatusResponse>, ApiError> {
    let result = Transaction::delete_many()
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::OwnerId.eq(user.0.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Transaction"));
    }

    invalidate_user_insights(&state.cache, user.0.id).await;
    info!(transaction_id, "transaction deleted");

    Ok(Json(StatusResponse { success: true }))
}

/// Sorted distinct category labels of the user's ledger
#[utoipa::path(
    get,
    path = "/get-categories/",
    tag = "transactions",
    responses(
        (status = 200, description = "Categories retrieved successfully", body = CategoriesResponse),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let labels: Vec<Option<String>> = Transaction::find()
        .filter(transaction::Column::OwnerId.eq(user.0.id))
        .select_only()
        .column(transaction::Column::Category)
        .distinct()
        .into_tuple()
        .all(&state.db)
        .await?;

    let categories: BTreeSet<String> = labels
        .into_iter()
        .map(|label| {
            label
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNCATEGORIZED.to_string())
        })
        .collect();

    Ok(Json(CategoriesResponse {
        categories: categories.into_iter().collect(),
    }))
}
