use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use super::user;

/// The kind of bank account, mapped from the provider's type/subtype pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum AccountKind {
    #[sea_orm(string_value = "checking")]
    Checking,
    #[sea_orm(string_value = "savings")]
    Savings,
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "loan")]
    Loan,
    #[sea_orm(string_value = "investment")]
    Investment,
    #[sea_orm(string_value = "other")]
    Other,
}

/// A linked bank account as reported by the aggregation provider.
/// Created on first sync (or manual link), updated on subsequent syncs,
/// soft-scoped by `is_active`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bank_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The user who owns this account.
    pub owner_id: i32,
    pub bank_name: String,
    pub account_name: Option<String>,
    /// Provider-assigned account identifier; unique across the whole store.
    #[sea_orm(unique)]
    pub external_id: String,
    pub kind: AccountKind,
    /// Current balance as field-codec ciphertext; decoded only at the
    /// storage-adapter boundary, never in queries.
    pub balance: String,
    /// ISO 4217 currency code, e.g., "USD", "GBP".
    pub currency_code: String,
    /// Inactive accounts are hidden from filter lookups but keep their history.
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    pub last_synced: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An account belongs to one owner.
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::OwnerId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
