//! Transaction synchronization engine.
//!
//! This crate holds everything between the external aggregation provider and
//! the HTTP handlers: the provider gateway abstraction, the reconciler that
//! merges the provider change-feed into the ledger store, per-user sync
//! locks, the composable filter layer, and the insight reports.

pub mod error;
pub mod filter;
pub mod lock;
pub mod provider;
pub mod reconciler;
pub mod reports;
pub mod testing;
pub mod views;

pub use error::{Result, SyncError};
pub use reconciler::{Reconciler, SyncOutcome, DEFAULT_MAX_PAGES};
