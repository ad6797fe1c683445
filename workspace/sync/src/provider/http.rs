//! HTTP implementation of the provider gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ProviderAccount, ProviderError, ProviderGateway, TransactionPage};

/// Error code the provider uses when a cursor can no longer be resumed.
const INVALID_CURSOR_CODE: &str = "INVALID_CURSOR";

/// Per-request timeout; keeps a stuck provider from pinning a sync forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the provider API.
#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: String,
    pub secret: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The client secret must not leak through Debug output.
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// reqwest-backed [`ProviderGateway`] speaking the provider's JSON API.
#[derive(Debug)]
pub struct HttpProviderGateway {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct SyncRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct AccountsRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<ProviderAccount>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error_code: String,
    error_message: String,
}

impl HttpProviderGateway {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    async fn post<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(err) if err.error_code == INVALID_CURSOR_CODE => ProviderError::InvalidCursor,
                Ok(err) => ProviderError::Api {
                    code: err.error_code,
                    message: err.error_message,
                },
                Err(_) => ProviderError::Api {
                    code: status.as_u16().to_string(),
                    message: text,
                },
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    #[instrument(skip(self, access_token), fields(has_cursor = cursor.is_some()))]
    async fn fetch_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, ProviderError> {
        let request = SyncRequest {
            client_id: &self.config.client_id,
            secret: &self.config.secret,
            access_token,
            cursor,
        };
        let page: TransactionPage = self.post("/transactions/sync", &request).await?;
        debug!(
            added = page.added.len(),
            has_more = page.has_more,
            "fetched provider transaction page"
        );
        Ok(page)
    }

    #[instrument(skip(self, access_token))]
    async fn fetch_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, ProviderError> {
        let request = AccountsRequest {
            client_id: &self.config.client_id,
            secret: &self.config.secret,
            access_token,
        };
        let response: AccountsResponse = self.post("/accounts/get", &request).await?;
        debug!(accounts = response.accounts.len(), "fetched provider accounts");
        Ok(response.accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secret() {
        let config = ProviderConfig {
            base_url: "https://sandbox.provider.test".to_string(),
            client_id: "client-1".to_string(),
            secret: "super-secret".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("client-1"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn sync_request_omits_missing_cursor() {
        let request = SyncRequest {
            client_id: "c",
            secret: "s",
            access_token: "t",
            cursor: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("cursor").is_none());

        let request = SyncRequest {
            cursor: Some("abc"),
            ..SyncRequest {
                client_id: "c",
                secret: "s",
                access_token: "t",
                cursor: None,
            }
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["cursor"], "abc");
    }
}
