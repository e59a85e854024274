//! Printvault Database Layer
//!
//! Postgres persistence for the asset entitlement ledger. The ledger is the
//! one durable structure this subsystem owns: an append-only record of which
//! purchaser acquired which digital assets, keyed for idempotency on the
//! payment processor's checkout session id.

pub mod db;

pub use db::{AssetTransactionRepository, TransactionStore};

/// Embedded migrations for the `asset_transactions` ledger.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
