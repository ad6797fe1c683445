#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use axum::Router;
    use chrono::Utc;
    use common::codec::{AesGcmCodec, FieldCodec};
    use migration::{Migrator, MigratorTrait};
    use model::entities::bank_account::AccountKind;
    use model::entities::{bank_account, user};
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
    use sync::testing::MockGateway;
    use sync::Reconciler;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::router::create_router;
    use crate::schemas::AppState;

    /// Fixed codec key so seeded ciphertexts decode across helpers.
    const TEST_KEY: [u8; 32] = [7u8; 32];

    pub fn test_codec() -> Arc<AesGcmCodec> {
        Arc::new(AesGcmCodec::new(TEST_KEY))
    }

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState over a scripted provider gateway
    pub async fn setup_state_with_gateway(gateway: MockGateway) -> AppState {
        let db = setup_test_db().await;
        let codec = test_codec();
        let reconciler = Arc::new(Reconciler::new(Arc::new(gateway), codec.clone()));
        let cache = Cache::new(100);

        AppState {
            db,
            cache,
            reconciler,
            codec,
        }
    }

    /// Seed a user with a linked access token and one checking account
    /// (external id `acct-X`, balance 1234.56).
    pub async fn seed_user_with_account(state: &AppState) -> (user::Model, bank_account::Model) {
        let codec = test_codec();

        let user = user::ActiveModel {
            username: Set("alice".to_string()),
            access_token: Set(Some(codec.encode("access-token").unwrap())),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to create test user");

        let account = bank_account::ActiveModel {
            owner_id: Set(user.id),
            bank_name: Set("Test Bank".to_string()),
            account_name: Set(Some("Main".to_string())),
            external_id: Set("acct-X".to_string()),
            kind: Set(AccountKind::Checking),
            balance: Set(codec.encode("1234.56").unwrap()),
            currency_code: Set("GBP".to_string()),
            is_active: Set(true),
            last_synced: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to create test account");

        (user, account)
    }

    /// Seed a second user without a provider access token
    pub async fn seed_user_without_token(state: &AppState) -> user::Model {
        user::ActiveModel {
            username: Set("bob".to_string()),
            access_token: Set(None),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to create second test user")
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from RUST_LOG, defaulting to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create an axum app (plus its state and seeded fixtures) for testing
    pub async fn setup_test_app_with_gateway(
        gateway: MockGateway,
    ) -> (Router, AppState, user::Model, bank_account::Model) {
        let _ = init_test_tracing();

        let state = setup_state_with_gateway(gateway).await;
        let (user, account) = seed_user_with_account(&state).await;
        let router = create_router(state.clone());
        (router, state, user, account)
    }

    /// Create an axum app over a gateway that serves nothing
    pub async fn setup_test_app() -> (Router, AppState, user::Model, bank_account::Model) {
        setup_test_app_with_gateway(MockGateway::new()).await
    }
}
