//! Loading normalized transaction views from the ledger store.

use common::{TransactionView, UNCATEGORIZED};
use model::entities::prelude::*;
use model::entities::transaction;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::error::Result;

/// Load all of a user's transactions as [`TransactionView`]s: names trimmed,
/// amounts absolute, missing categories defaulted, account names joined in.
pub async fn user_transaction_views(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<TransactionView>> {
    let rows = Transaction::find()
        .filter(transaction::Column::OwnerId.eq(user_id))
        .find_also_related(BankAccount)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(txn, account)| TransactionView {
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
            account_name: account.and_then(|a| a.account_name),
            transaction_id: txn.external_id,
        })
        .collect())
}
