//! Test fixtures: an in-memory provider gateway and fixture builders.
//!
//! Public (not `#[cfg(test)]`) so the HTTP layer's integration tests can
//! drive a full sync without a live provider.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::provider::{
    ProviderAccount, ProviderError, ProviderGateway, ProviderTransaction, TransactionPage,
};

/// Scripted [`ProviderGateway`] serving a fixed sequence of pages.
///
/// Cursors are positional: `None` addresses page 0, `cursor-N` page N. A
/// cursor past the end yields an empty final page, which is exactly what a
/// resumed sync with no new activity sees. Any other cursor string is
/// rejected with [`ProviderError::InvalidCursor`].
#[derive(Debug, Default)]
pub struct MockGateway {
    pages: Vec<Vec<ProviderTransaction>>,
    accounts: Vec<ProviderAccount>,
    fetch_log: Mutex<Vec<Option<String>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: Vec<Vec<ProviderTransaction>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<ProviderAccount>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Every cursor passed to [`ProviderGateway::fetch_page`], in order.
    pub fn fetch_log(&self) -> Vec<Option<String>> {
        self.fetch_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn page_index(&self, cursor: Option<&str>) -> Result<usize, ProviderError> {
        match cursor {
            None => Ok(0),
            Some(token) => token
                .strip_prefix("cursor-")
                .and_then(|n| n.parse().ok())
                .ok_or(ProviderError::InvalidCursor),
        }
    }
}

#[async_trait]
impl ProviderGateway for MockGateway {
    async fn fetch_page(
        &self,
        _access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, ProviderError> {
        self.fetch_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cursor.map(str::to_string));

        let index = self.page_index(cursor)?;
        if index >= self.pages.len() {
            return Ok(TransactionPage {
                added: Vec::new(),
                next_cursor: Some(format!("cursor-{}", self.pages.len())),
                has_more: false,
            });
        }

        Ok(TransactionPage {
            added: self.pages[index].clone(),
            next_cursor: Some(format!("cursor-{}", index + 1)),
            has_more: index + 1 < self.pages.len(),
        })
    }

    async fn fetch_accounts(
        &self,
        _access_token: &str,
    ) -> Result<Vec<ProviderAccount>, ProviderError> {
        Ok(self.accounts.clone())
    }
}

/// Build a provider transaction fixture. The amount uses the provider's
/// sign convention: positive means money leaving the account.
pub fn provider_txn(
    transaction_id: &str,
    account_id: &str,
    amount: &str,
    date: (i32, u32, u32),
    category: Option<&str>,
) -> ProviderTransaction {
    ProviderTransaction {
        transaction_id: transaction_id.to_string(),
        account_id: account_id.to_string(),
        name: format!("Transaction {transaction_id}"),
        amount: amount.parse().expect("Invalid fixture amount"),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("Invalid fixture date"),
        category: category.map(str::to_string),
    }
}

/// Build a provider account fixture.
pub fn provider_account(
    account_id: &str,
    name: &str,
    kind: &str,
    subtype: Option<&str>,
    balance: &str,
) -> ProviderAccount {
    ProviderAccount {
        account_id: account_id.to_string(),
        name: Some(name.to_string()),
        official_name: Some(format!("{name} Ltd")),
        kind: kind.to_string(),
        subtype: subtype.map(str::to_string),
        balance: balance.parse::<Decimal>().expect("Invalid fixture balance"),
        currency_code: Some("GBP".to_string()),
    }
}
