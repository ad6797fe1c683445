use axum::extract::{Path, State};
use axum::response::Json;
use model::entities::bank_account;
use model::entities::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::insights::invalidate_user_insights;
use crate::schemas::{AppState, StatusResponse};

/// One linked bank account, without balance
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BankAccountResponse {
    pub id: i32,
    pub bank_name: String,
    pub account_name: Option<String>,
    pub kind: String,
    pub currency_code: String,
}

impl From<bank_account::Model> for BankAccountResponse {
    fn from(model: bank_account::Model) -> Self {
        Self {
            id: model.id,
            bank_name: model.bank_name,
            account_name: model.account_name,
            kind: model.kind.to_value(),
            currency_code: model.currency_code,
        }
    }
}

/// Active accounts of the user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BankAccountsResponse {
    pub accounts: Vec<BankAccountResponse>,
}

/// Outcome of an account sync
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncAccountsResponse {
    /// Number of newly linked accounts
    pub synced: u64,
}

/// One account with its decoded balance
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountBalance {
    pub id: i32,
    pub bank_name: String,
    pub account_name: Option<String>,
    pub balance: Decimal,
    pub currency_code: String,
}

/// All account balances of the user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountBalancesResponse {
    pub accounts: Vec<AccountBalance>,
}

/// List the user's active bank accounts
#[utoipa::path(
    get,
    path = "/get-bank-accounts/",
    tag = "banking",
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = BankAccountsResponse),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_bank_accounts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BankAccountsResponse>, ApiError> {
    let accounts = BankAccount::find()
        .filter(bank_account::Column::OwnerId.eq(user.0.id))
        .filter(bank_account::Column::IsActive.eq(true))
        .order_by_asc(bank_account::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(BankAccountsResponse {
        accounts: accounts.into_iter().map(BankAccountResponse::from).collect(),
    }))
}

/// Pull accounts from the provider and link any new ones
#[utoipa::path(
    post,
    path = "/sync-bank-accounts/",
    tag = "banking",
    responses(
        (status = 200, description = "Account sync finished", body = SyncAccountsResponse),
        (status = 400, description = "No access token linked", body = crate::schemas::ErrorResponse),
        (status = 409, description = "A sync is already in progress", body = crate::schemas::ErrorResponse),
        (status = 502, description = "Provider request failed", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn sync_bank_accounts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SyncAccountsResponse>, ApiError> {
    let synced = state.reconciler.sync_accounts(&state.db, &user.0).await?;
    info!(synced, "account sync requested via API");
    Ok(Json(SyncAccountsResponse { synced }))
}

/// List accounts with their decoded balances
#[utoipa::path(
    get,
    path = "/get-account-balance/",
    tag = "banking",
    responses(
        (status = 200, description = "Balances retrieved successfully", body = AccountBalancesResponse),
        (status = 401, description = "Authentication required", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn get_account_balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AccountBalancesResponse>, ApiError> {
    let models = BankAccount::find()
        .filter(bank_account::Column::OwnerId.eq(user.0.id))
        .filter(bank_account::Column::IsActive.eq(true))
        .order_by_asc(bank_account::Column::Id)
        .all(&state.db)
        .await?;

    let mut accounts = Vec::with_capacity(models.len());
    for model in models {
        let plaintext = state.codec.decode(&model.balance).map_err(|e| {
            error!(account_id = model.id, "Failed to decode account balance: {}", e);
            ApiError::Internal
        })?;
        let balance: Decimal = plaintext.parse().map_err(|e| {
            error!(account_id = model.id, "Stored balance is not a decimal: {}", e);
            ApiError::Internal
        })?;
        accounts.push(AccountBalance {
            id: model.id,
            bank_name: model.bank_name,
            account_name: model.account_name,
            balance,
            currency_code: model.currency_code,
        });
    }

    Ok(Json(AccountBalancesResponse { accounts }))
}

/// Delete a bank account and its transactions
#[utoipa::path(
    post,
    path = "/delete-bank-account/{account_id}/",
    tag = "banking",
    params(
        ("account_id" = i32, Path, description = "Bank account ID"),
    ),
    responses(
        (status = 200, description = "Account deleted successfully", body = StatusResponse),
        (status = 404, description = "Account not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn delete_bank_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(account_id): Path<i32>,
) -> Result<Json<StatusResponse>, ApiError> {
    // The foreign key cascades to the account's transactions.
    let result = BankAccount::delete_many()
        .filter(bank_account::Column::Id.eq(account_id))
        .filter(bank_account::Column::OwnerId.eq(user.0.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Bank account"));
    }

    invalidate_user_insights(&state.cache, user.0.id).await;
    info!(account_id, "bank account deleted");

    Ok(Json(StatusResponse { success: true }))
}
