use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::codec::AesGcmCodec;
use moka::future::Cache;
use sea_orm::Database;
use secrecy::{ExposeSecret, SecretString};
use sync::provider::http::{HttpProviderGateway, ProviderConfig};
use sync::Reconciler;

use crate::schemas::AppState;

/// Initialize application state against a specific database URL.
///
/// Provider credentials and the field-encryption key come from the
/// environment (`.env` supported): `PROVIDER_BASE_URL`, `PROVIDER_CLIENT_ID`,
/// `PROVIDER_SECRET`, `ENCRYPTION_KEY`.
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    dotenvy::dotenv().ok();

    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Cache for insight aggregates; entries are also invalidated explicitly
    // on transaction mutations, the TTL only bounds staleness after syncs.
    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(300)) // 5 minutes
        .build();

    let encryption_key: SecretString = std::env::var("ENCRYPTION_KEY")
        .context("ENCRYPTION_KEY must be set (base64-encoded 32-byte key)")?
        .into();
    let codec = Arc::new(AesGcmCodec::from_base64(encryption_key.expose_secret())?);

    let provider_config = ProviderConfig {
        base_url: std::env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://sandbox.provider.com".to_string()),
        client_id: std::env::var("PROVIDER_CLIENT_ID").context("PROVIDER_CLIENT_ID must be set")?,
        secret: std::env::var("PROVIDER_SECRET").context("PROVIDER_SECRET must be set")?,
    };
    let gateway = Arc::new(HttpProviderGateway::new(provider_config)?);

    let reconciler = Arc::new(Reconciler::new(gateway, codec.clone()));

    Ok(AppState {
        db,
        cache,
        reconciler,
        codec,
    })
}
