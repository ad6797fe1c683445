//! This file serves as the root for all SeaORM entity modules.
//! The ledger store keeps users, their provider-linked bank accounts, the
//! reconciled transactions, and the per-user provider sync cursor.

pub mod bank_account;
pub mod sync_cursor;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::bank_account::Entity as BankAccount;
    pub use super::sync_cursor::Entity as SyncCursor;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        // Connect to the SQLite database
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        // Try to apply migrations first
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(db: &DatabaseConnection, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(username.to_string()),
            access_token: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn insert_account(
        db: &DatabaseConnection,
        owner_id: i32,
        external_id: &str,
    ) -> Result<bank_account::Model, DbErr> {
        bank_account::ActiveModel {
            owner_id: Set(owner_id),
            bank_name: Set("Test Bank".to_string()),
            account_name: Set(Some("Current".to_string())),
            external_id: Set(external_id.to_string()),
            kind: Set(bank_account::AccountKind::Checking),
            balance: Set("opaque-ciphertext".to_string()),
            currency_code: Set("GBP".to_string()),
            is_active: Set(true),
            last_synced: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn insert_transaction(
        db: &DatabaseConnection,
        owner_id: i32,
        account_id: i32,
        external_id: &str,
    ) -> Result<transaction::Model, DbErr> {
        transaction::ActiveModel {
            owner_id: Set(owner_id),
            account_id: Set(account_id),
            name: Set("Groceries".to_string()),
            amount: Set(Decimal::new(-1250, 2)),
            date: Set(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()),
            category: Set(Some("Food".to_string())),
            is_received: Set(false),
            external_id: Set(external_id.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_create_user_account_and_transaction() {
        let db = setup_db().await.unwrap();

        let user = insert_user(&db, "alice").await.unwrap();
        let account = insert_account(&db, user.id, "acct-ext-1").await.unwrap();
        let txn = insert_transaction(&db, user.id, account.id, "txn-ext-1")
            .await
            .unwrap();

        assert_eq!(txn.owner_id, user.id);
        assert_eq!(txn.account_id, account.id);
        assert_eq!(txn.display_amount(), Decimal::new(1250, 2));
    }

    #[tokio::test]
    async fn test_transaction_external_id_is_unique() {
        let db = setup_db().await.unwrap();

        let user = insert_user(&db, "alice").await.unwrap();
        let account = insert_account(&db, user.id, "acct-ext-1").await.unwrap();

        insert_transaction(&db, user.id, account.id, "txn-dup")
            .await
            .unwrap();
        let duplicate = insert_transaction(&db, user.id, account.id, "txn-dup").await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_account_external_id_is_unique() {
        let db = setup_db().await.unwrap();

        let alice = insert_user(&db, "alice").await.unwrap();
        let bob = insert_user(&db, "bob").await.unwrap();

        insert_account(&db, alice.id, "acct-dup").await.unwrap();
        // Uniqueness holds across the whole store, not per user.
        assert!(insert_account(&db, bob.id, "acct-dup").await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_accounts_and_transactions() {
        let db = setup_db().await.unwrap();

        let user = insert_user(&db, "alice").await.unwrap();
        let account = insert_account(&db, user.id, "acct-ext-1").await.unwrap();
        insert_transaction(&db, user.id, account.id, "txn-1")
            .await
            .unwrap();
        sync_cursor::ActiveModel {
            user_id: Set(user.id),
            cursor: Set("cursor-token".to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        User::delete_by_id(user.id).exec(&db).await.unwrap();

        assert_eq!(BankAccount::find().count(&db).await.unwrap(), 0);
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 0);
        assert_eq!(SyncCursor::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleting_account_cascades_only_to_its_transactions() {
        let db = setup_db().await.unwrap();

        let user = insert_user(&db, "alice").await.unwrap();
        let kept = insert_account(&db, user.id, "acct-kept").await.unwrap();
        let dropped = insert_account(&db, user.id, "acct-dropped").await.unwrap();
        insert_transaction(&db, user.id, kept.id, "txn-kept")
            .await
            .unwrap();
        insert_transaction(&db, user.id, dropped.id, "txn-dropped")
            .await
            .unwrap();

        BankAccount::delete_by_id(dropped.id).exec(&db).await.unwrap();

        let remaining = Transaction::find()
            .filter(transaction::Column::OwnerId.eq(user.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].external_id, "txn-kept");
        assert_eq!(BankAccount::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_signed_amount_follows_direction_flag() {
        let amount = Decimal::new(2000, 2);
        assert_eq!(
            transaction::Model::signed_amount(amount, true),
            Decimal::new(2000, 2)
        );
        assert_eq!(
            transaction::Model::signed_amount(amount, false),
            Decimal::new(-2000, 2)
        );
        // Already-signed input is normalized, not double-negated.
        assert_eq!(
            transaction::Model::signed_amount(Decimal::new(-2000, 2), true),
            Decimal::new(2000, 2)
        );
    }
}
