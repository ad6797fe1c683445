//! Idempotent merge of the provider change-feed into the ledger store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use common::codec::FieldCodec;
use model::entities::bank_account::AccountKind;
use model::entities::prelude::*;
use model::entities::{bank_account, sync_cursor, transaction, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::lock::UserSyncLocks;
use crate::provider::{ProviderAccount, ProviderError, ProviderGateway, ProviderTransaction};

/// Cap on provider pages per sync, so a feed that never reports
/// `has_more = false` cannot pin a request forever.
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Counters reported by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Newly created transactions.
    pub processed: u64,
    /// Provider transactions whose external id was already in the store.
    pub skipped_duplicates: u64,
    /// Provider transactions whose account has not been linked locally.
    /// These are dropped, not queued; they reappear only on a full re-walk.
    pub skipped_unmatched: u64,
    /// Pages fetched from the provider.
    pub pages: u32,
}

impl SyncOutcome {
    pub fn skipped(&self) -> u64 {
        self.skipped_duplicates + self.skipped_unmatched
    }
}

/// Merges one user's provider data into the ledger store.
///
/// Sync is append-only with respect to transactions: existing rows are never
/// mutated, and the provider external id is the sole dedup key. At most one
/// reconciliation runs per user at a time.
#[derive(Debug)]
pub struct Reconciler {
    gateway: Arc<dyn ProviderGateway>,
    codec: Arc<dyn FieldCodec>,
    locks: UserSyncLocks,
    max_pages: usize,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn ProviderGateway>, codec: Arc<dyn FieldCodec>) -> Self {
        Self {
            gateway,
            codec,
            locks: UserSyncLocks::new(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn locks(&self) -> &UserSyncLocks {
        &self.locks
    }

    fn access_token(&self, user: &user::Model) -> Result<String> {
        let ciphertext = user
            .access_token
            .as_deref()
            .ok_or(SyncError::MissingAccessToken)?;
        Ok(self.codec.decode(ciphertext)?)
    }

    /// Merge the user's provider transactions into the store. Fails with
    /// [`SyncError::SyncInProgress`] when another sync holds the user's slot.
    #[instrument(skip(self, db, user), fields(user_id = user.id))]
    pub async fn sync_transactions(
        &self,
        db: &DatabaseConnection,
        user: &user::Model,
    ) -> Result<SyncOutcome> {
        let _permit = self
            .locks
            .try_acquire(user.id)
            .ok_or(SyncError::SyncInProgress)?;
        self.sync_transactions_locked(db, user).await
    }

    /// Non-blocking variant for read paths: skips the sync entirely when one
    /// is already in flight, returning `Ok(None)`.
    #[instrument(skip(self, db, user), fields(user_id = user.id))]
    pub async fn try_sync_transactions(
        &self,
        db: &DatabaseConnection,
        user: &user::Model,
    ) -> Result<Option<SyncOutcome>> {
        match self.locks.try_acquire(user.id) {
            Some(_permit) => {
                let outcome = self.sync_transactions_locked(db, user).await?;
                Ok(Some(outcome))
            }
            None => {
                debug!(user_id = user.id, "sync already in flight, skipping");
                Ok(None)
            }
        }
    }

    async fn sync_transactions_locked(
        &self,
        db: &DatabaseConnection,
        user: &user::Model,
    ) -> Result<SyncOutcome> {
        let access_token = self.access_token(user)?;

        // The existing-ID set is the sole deduplication mechanism; staged ids
        // are added to it immediately so duplicates later in the same feed
        // are skipped too.
        let mut existing_ids: HashSet<String> = Transaction::find()
            .filter(transaction::Column::OwnerId.eq(user.id))
            .select_only()
            .column(transaction::Column::ExternalId)
            .into_tuple::<String>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let accounts: HashMap<String, i32> = BankAccount::find()
            .filter(bank_account::Column::OwnerId.eq(user.id))
            .all(db)
            .await?
            .into_iter()
            .map(|account| (account.external_id, account.id))
            .collect();

        let stored_cursor = SyncCursor::find()
            .filter(sync_cursor::Column::UserId.eq(user.id))
            .one(db)
            .await?;
        let mut cursor: Option<String> = stored_cursor.as_ref().map(|c| c.cursor.clone());

        let mut outcome = SyncOutcome::default();
        let mut staged: Vec<transaction::ActiveModel> = Vec::new();
        let mut first_fetch = true;

        loop {
            if outcome.pages as usize >= self.max_pages {
                return Err(SyncError::PageLimitExceeded(self.max_pages));
            }

            let page = match self.gateway.fetch_page(&access_token, cursor.as_deref()).await {
                Ok(page) => page,
                Err(ProviderError::InvalidCursor) if first_fetch && cursor.is_some() => {
                    warn!(
                        user_id = user.id,
                        "stored provider cursor rejected, re-walking feed from the start"
                    );
                    cursor = None;
                    self.gateway.fetch_page(&access_token, None).await?
                }
                Err(e) => return Err(e.into()),
            };
            first_fetch = false;
            outcome.pages += 1;

            for txn in page.added {
                if existing_ids.contains(&txn.transaction_id) {
                    outcome.skipped_duplicates += 1;
                    continue;
                }
                let Some(&account_id) = accounts.get(&txn.account_id) else {
                    outcome.skipped_unmatched += 1;
                    continue;
                };

                existing_ids.insert(txn.transaction_id.clone());
                staged.push(stage_transaction(user.id, account_id, txn));
                outcome.processed += 1;
            }

            cursor = page.next_cursor.or(cursor);
            if !page.has_more {
                break;
            }
        }

        // Staged rows and the resume cursor land in one database
        // transaction; a failed bulk insert leaves both untouched.
        let txn_db = db.begin().await?;
        if !staged.is_empty() {
            Transaction::insert_many(staged).exec(&txn_db).await?;
        }
        if let Some(token) = cursor {
            match stored_cursor {
                Some(model) => {
                    let mut active: sync_cursor::ActiveModel = model.into();
                    active.cursor = Set(token);
                    active.updated_at = Set(Utc::now());
                    active.update(&txn_db).await?;
                }
                None => {
                    sync_cursor::ActiveModel {
                        user_id: Set(user.id),
                        cursor: Set(token),
                        updated_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(&txn_db)
                    .await?;
                }
            }
        }
        txn_db.commit().await?;

        info!(
            user_id = user.id,
            processed = outcome.processed,
            skipped_duplicates = outcome.skipped_duplicates,
            skipped_unmatched = outcome.skipped_unmatched,
            pages = outcome.pages,
            "transaction sync finished"
        );
        Ok(outcome)
    }

    /// Pull accounts from the provider and create any not yet linked locally.
    /// Existing accounts are left untouched. Returns the number created.
    ///
    /// Linking a new account also drops the user's resume cursor: transactions
    /// for that account seen before the link were skipped as unmatched, and
    /// only a full re-walk (made safe by dedup) can recover them.
    #[instrument(skip(self, db, user), fields(user_id = user.id))]
    pub async fn sync_accounts(&self, db: &DatabaseConnection, user: &user::Model) -> Result<u64> {
        let _permit = self
            .locks
            .try_acquire(user.id)
            .ok_or(SyncError::SyncInProgress)?;

        let access_token = self.access_token(user)?;
        let provider_accounts = self.gateway.fetch_accounts(&access_token).await?;

        let existing: HashSet<String> = BankAccount::find()
            .filter(bank_account::Column::OwnerId.eq(user.id))
            .select_only()
            .column(bank_account::Column::ExternalId)
            .into_tuple::<String>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let now = Utc::now();
        let mut staged = Vec::new();
        for account in provider_accounts {
            if existing.contains(&account.account_id) {
                continue;
            }
            staged.push(self.stage_account(user.id, account, now)?);
        }

        let created = staged.len() as u64;
        if !staged.is_empty() {
            BankAccount::insert_many(staged).exec(db).await?;
            SyncCursor::delete_many()
                .filter(sync_cursor::Column::UserId.eq(user.id))
                .exec(db)
                .await?;
            debug!(
                user_id = user.id,
                "new accounts linked, next transaction sync re-walks the feed"
            );
        }

        info!(user_id = user.id, created, "account sync finished");
        Ok(created)
    }

    fn stage_account(
        &self,
        owner_id: i32,
        account: ProviderAccount,
        now: chrono::DateTime<Utc>,
    ) -> Result<bank_account::ActiveModel> {
        let bank_name = account
            .official_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown Bank".to_string());
        let balance = self.codec.encode(&account.balance.to_string())?;

        Ok(bank_account::ActiveModel {
            owner_id: Set(owner_id),
            bank_name: Set(bank_name),
            account_name: Set(account.name),
            external_id: Set(account.account_id),
            kind: Set(map_account_kind(&account.kind, account.subtype.as_deref())),
            balance: Set(balance),
            currency_code: Set(account
                .currency_code
                .unwrap_or_else(|| "GBP".to_string())),
            is_active: Set(true),
            last_synced: Set(now),
            ..Default::default()
        })
    }
}

/// Normalize one provider transaction into a stageable row.
///
/// The provider's sign convention is inverted relative to the local one
/// (provider: positive = money leaving the account), so the stored amount is
/// the negated provider amount and `is_received` holds iff the provider
/// amount was negative.
fn stage_transaction(
    owner_id: i32,
    account_id: i32,
    txn: ProviderTransaction,
) -> transaction::ActiveModel {
    let is_received = txn.amount < Decimal::ZERO;
    let category = txn
        .category
        .filter(|hint| !hint.is_empty())
        .map(|hint| hint.replace('_', " "));

    transaction::ActiveModel {
        owner_id: Set(owner_id),
        account_id: Set(account_id),
        name: Set(txn.name.trim().to_string()),
        amount: Set(-txn.amount),
        date: Set(txn.date),
        category: Set(category),
        is_received: Set(is_received),
        external_id: Set(txn.transaction_id),
        ..Default::default()
    }
}

/// Map the provider's type/subtype pair onto the local account kind.
fn map_account_kind(kind: &str, subtype: Option<&str>) -> AccountKind {
    match kind {
        "depository" => match subtype {
            Some("checking") => AccountKind::Checking,
            Some("savings") => AccountKind::Savings,
            _ => AccountKind::Other,
        },
        "credit" => AccountKind::Credit,
        "loan" => AccountKind::Loan,
        "investment" => AccountKind::Investment,
        _ => AccountKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{provider_account, provider_txn, MockGateway};
    use common::codec::AesGcmCodec;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectionTrait, Database, PaginatorTrait};

    fn codec() -> Arc<AesGcmCodec> {
        Arc::new(AesGcmCodec::new([1u8; 32]))
    }

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");
        Migrator::up(&db, None).await.expect("Migrations failed");
        db
    }

    async fn seed_user(db: &DatabaseConnection, codec: &AesGcmCodec) -> user::Model {
        let token = codec.encode("access-token").unwrap();
        user::ActiveModel {
            username: Set("alice".to_string()),
            access_token: Set(Some(token)),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn seed_account(
        db: &DatabaseConnection,
        owner_id: i32,
        external_id: &str,
    ) -> bank_account::Model {
        bank_account::ActiveModel {
            owner_id: Set(owner_id),
            bank_name: Set("Test Bank".to_string()),
            account_name: Set(Some("Current".to_string())),
            external_id: Set(external_id.to_string()),
            kind: Set(AccountKind::Checking),
            balance: Set("cipher".to_string()),
            currency_code: Set("GBP".to_string()),
            is_active: Set(true),
            last_synced: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn reconciler(gateway: MockGateway) -> Reconciler {
        Reconciler::new(Arc::new(gateway), codec())
    }

    #[tokio::test]
    async fn merges_one_page_with_dedup_and_unmatched_skips() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        let account = seed_account(&db, user.id, "acct-X").await;

        // Transaction A already exists locally.
        transaction::ActiveModel {
            owner_id: Set(user.id),
            account_id: Set(account.id),
            name: Set("Existing".to_string()),
            amount: Set(Decimal::new(-1000, 2)),
            date: Set(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            category: Set(None),
            is_received: Set(false),
            external_id: Set("A".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let gateway = MockGateway::with_pages(vec![vec![
            provider_txn("A", "acct-X", "10", (2024, 1, 2), None),
            provider_txn("B", "acct-X", "-20", (2024, 1, 3), None),
            provider_txn("C", "acct-Y", "5", (2024, 1, 4), None),
        ]]);
        let reconciler = Reconciler::new(Arc::new(gateway), codec);

        let outcome = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped_duplicates, 1);
        assert_eq!(outcome.skipped_unmatched, 1);
        assert_eq!(outcome.skipped(), 2);

        let created = Transaction::find()
            .filter(transaction::Column::ExternalId.eq("B"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        // Provider -20 means money received; stored under the local
        // convention with a positive sign.
        assert!(created.is_received);
        assert_eq!(created.amount, Decimal::from(20));
        assert_eq!(created.display_amount(), Decimal::from(20));
        assert_eq!(created.account_id, account.id);

        assert_eq!(Transaction::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn second_sync_resumes_from_persisted_cursor_and_creates_nothing() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let gateway = Arc::new(MockGateway::with_pages(vec![
            vec![provider_txn("t1", "acct-X", "10", (2024, 1, 1), None)],
            vec![provider_txn("t2", "acct-X", "15", (2024, 1, 2), None)],
        ]));
        let reconciler = Reconciler::new(gateway.clone(), codec);

        let first = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.pages, 2);

        let stored = SyncCursor::find().one(&db).await.unwrap().unwrap();
        assert_eq!(stored.cursor, "cursor-2");

        let second = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.pages, 1);

        // The second run started from the stored cursor, not the beginning.
        let log = gateway.fetch_log();
        assert_eq!(log.last().unwrap().as_deref(), Some("cursor-2"));
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn full_rewalk_without_cursor_is_idempotent() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let pages = vec![vec![
            provider_txn("t1", "acct-X", "10", (2024, 1, 1), None),
            provider_txn("t2", "acct-X", "-5", (2024, 1, 2), None),
        ]];
        let reconciler = reconciler(MockGateway::with_pages(pages.clone()));
        let first = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(first.processed, 2);

        // Drop the cursor to force a re-walk over the same feed; dedup alone
        // must keep the store unchanged.
        SyncCursor::delete_many().exec(&db).await.unwrap();
        let second = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped_duplicates, 2);
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_within_the_same_feed_is_staged_once() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let reconciler = reconciler(MockGateway::with_pages(vec![
            vec![
                provider_txn("dup", "acct-X", "10", (2024, 1, 1), None),
                provider_txn("dup", "acct-X", "10", (2024, 1, 1), None),
            ],
            vec![provider_txn("dup", "acct-X", "10", (2024, 1, 1), None)],
        ]));

        let outcome = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped_duplicates, 2);
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn category_hint_is_normalized_and_absence_means_uncategorized() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let reconciler = reconciler(MockGateway::with_pages(vec![vec![
            provider_txn("t1", "acct-X", "12", (2024, 1, 1), Some("FOOD_AND_DRINK")),
            provider_txn("t2", "acct-X", "8", (2024, 1, 2), None),
        ]]));
        reconciler.sync_transactions(&db, &user).await.unwrap();

        let hinted = Transaction::find()
            .filter(transaction::Column::ExternalId.eq("t1"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hinted.category.as_deref(), Some("FOOD AND DRINK"));

        let unhinted = Transaction::find()
            .filter(transaction::Column::ExternalId.eq("t2"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unhinted.category, None);
    }

    #[tokio::test]
    async fn invalid_stored_cursor_falls_back_to_full_rewalk() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        sync_cursor::ActiveModel {
            user_id: Set(user.id),
            cursor: Set("stale-token".to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let gateway = Arc::new(MockGateway::with_pages(vec![vec![provider_txn(
            "t1", "acct-X", "10", (2024, 1, 1), None,
        )]]));
        let reconciler = Reconciler::new(gateway.clone(), codec);

        let outcome = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(outcome.processed, 1);

        let log = gateway.fetch_log();
        assert_eq!(log[0].as_deref(), Some("stale-token"));
        assert_eq!(log[1], None);

        let stored = SyncCursor::find().one(&db).await.unwrap().unwrap();
        assert_eq!(stored.cursor, "cursor-1");
    }

    #[tokio::test]
    async fn page_limit_bounds_a_feed_that_never_ends() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let pages = (0..5)
            .map(|i| {
                vec![provider_txn(
                    &format!("t{i}"),
                    "acct-X",
                    "10",
                    (2024, 1, 1),
                    None,
                )]
            })
            .collect();
        let reconciler = reconciler(MockGateway::with_pages(pages)).with_max_pages(2);

        let err = reconciler.sync_transactions(&db, &user).await.unwrap_err();
        assert!(matches!(err, SyncError::PageLimitExceeded(2)));
        // Nothing is persisted from an aborted sync.
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_access_token_is_rejected() {
        let db = setup_db().await;
        let user = user::ActiveModel {
            username: Set("bob".to_string()),
            access_token: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let reconciler = reconciler(MockGateway::new());
        let err = reconciler.sync_transactions(&db, &user).await.unwrap_err();
        assert!(matches!(err, SyncError::MissingAccessToken));
    }

    #[tokio::test]
    async fn concurrent_sync_for_same_user_is_rejected() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;

        let reconciler = reconciler(MockGateway::new());
        let _held = reconciler.locks().try_acquire(user.id).unwrap();

        let err = reconciler.sync_transactions(&db, &user).await.unwrap_err();
        assert!(matches!(err, SyncError::SyncInProgress));

        let skipped = reconciler.try_sync_transactions(&db, &user).await.unwrap();
        assert!(skipped.is_none());
    }

    #[tokio::test]
    async fn linking_a_new_account_resets_the_cursor_and_recovers_its_history() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-X").await;

        let gateway = Arc::new(
            MockGateway::with_pages(vec![vec![
                provider_txn("t1", "acct-X", "10", (2024, 1, 1), None),
                provider_txn("t2", "acct-Y", "-20", (2024, 1, 2), None),
            ]])
            .with_accounts(vec![
                provider_account("acct-X", "Current", "depository", Some("checking"), "100.00"),
                provider_account("acct-Y", "Rainy Day", "depository", Some("savings"), "10.00"),
            ]),
        );
        let reconciler = Reconciler::new(gateway, codec);

        // acct-Y is not linked yet, so its transaction is dropped and the
        // cursor moves past it.
        let first = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.skipped_unmatched, 1);
        assert!(SyncCursor::find().one(&db).await.unwrap().is_some());

        let created = reconciler.sync_accounts(&db, &user).await.unwrap();
        assert_eq!(created, 1);
        assert!(SyncCursor::find().one(&db).await.unwrap().is_none());

        // The forced re-walk recovers the skipped transaction; dedup keeps
        // the rest unchanged.
        let second = reconciler.sync_transactions(&db, &user).await.unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.skipped_duplicates, 1);
        assert_eq!(second.skipped_unmatched, 0);

        let recovered = Transaction::find()
            .filter(transaction::Column::ExternalId.eq("t2"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(recovered.is_received);
        assert_eq!(Transaction::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn account_sync_creates_only_missing_accounts() {
        let db = setup_db().await;
        let codec = codec();
        let user = seed_user(&db, &codec).await;
        seed_account(&db, user.id, "acct-existing").await;

        let gateway = MockGateway::new().with_accounts(vec![
            provider_account("acct-existing", "Current", "depository", Some("checking"), "100.00"),
            provider_account("acct-new", "Rainy Day", "depository", Some("savings"), "2500.50"),
            provider_account("acct-card", "Credit Card", "credit", None, "-42.00"),
        ]);
        let reconciler = Reconciler::new(Arc::new(gateway), codec.clone());

        let created = reconciler.sync_accounts(&db, &user).await.unwrap();
        assert_eq!(created, 2);

        let savings = BankAccount::find()
            .filter(bank_account::Column::ExternalId.eq("acct-new"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(savings.kind, AccountKind::Savings);
        assert!(savings.is_active);
        // Balance is stored as ciphertext and round-trips through the codec.
        assert_ne!(savings.balance, "2500.50");
        assert_eq!(codec.decode(&savings.balance).unwrap(), "2500.50");

        let card = BankAccount::find()
            .filter(bank_account::Column::ExternalId.eq("acct-card"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(card.kind, AccountKind::Credit);

        // Running again creates nothing new.
        let again = reconciler.sync_accounts(&db, &user).await.unwrap();
        assert_eq!(again, 0);
        assert_eq!(BankAccount::find().count(&db).await.unwrap(), 3);
    }

    #[test]
    fn account_kind_mapping_covers_provider_types() {
        assert_eq!(
            map_account_kind("depository", Some("checking")),
            AccountKind::Checking
        );
        assert_eq!(
            map_account_kind("depository", Some("savings")),
            AccountKind::Savings
        );
        assert_eq!(map_account_kind("depository", None), AccountKind::Other);
        assert_eq!(map_account_kind("credit", None), AccountKind::Credit);
        assert_eq!(map_account_kind("loan", None), AccountKind::Loan);
        assert_eq!(map_account_kind("investment", None), AccountKind::Investment);
        assert_eq!(map_account_kind("brokerage", None), AccountKind::Other);
    }
}
