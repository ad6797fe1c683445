use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{bank_account, user};

/// A single ledger transaction, created either by the reconciler from
/// provider data or by manual entry.
///
/// Sign convention: the stored amount is positive when the transaction was
/// received and negative when spent, matching `is_received`. The sign is
/// always derived from the flag, so callers display `amount.abs()`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owner_id: i32,
    /// The bank account this transaction was posted to. Must belong to the
    /// same user as `owner_id`.
    pub account_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Free-text category label; `None` means uncategorized.
    pub category: Option<String>,
    #[sea_orm(default_value = "false")]
    pub is_received: bool,
    /// Provider-assigned transaction identifier; unique across the whole
    /// store and the sole dedup key during sync.
    #[sea_orm(unique)]
    pub external_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::OwnerId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "bank_account::Entity",
        from = "Column::AccountId",
        to = "bank_account::Column::Id",
        on_delete = "Cascade"
    )]
    BankAccount,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccount.def()
    }
}

impl Model {
    /// Display amount: absolute value, direction carried by `is_received`.
    pub fn display_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// Normalize a user-supplied amount to the stored sign convention.
    pub fn signed_amount(amount: Decimal, is_received: bool) -> Decimal {
        if is_received { amount.abs() } else { -amount.abs() }
    }
}

impl ActiveModelBehavior for ActiveModel {}
