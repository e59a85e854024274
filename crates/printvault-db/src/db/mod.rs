//! Database repositories for data access layer
//!
//! Each repository is responsible for a specific domain entity and provides
//! the queries the service layer consumes. Traits live next to their Postgres
//! implementations so tests can substitute in-memory fakes.

pub mod asset_transaction;

pub use asset_transaction::{AssetTransactionRepository, TransactionStore};
