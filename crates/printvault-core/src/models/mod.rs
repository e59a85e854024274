//! Domain models

pub mod asset_transaction;
pub mod checkout;

pub use asset_transaction::{
    AssetTransaction, NewAssetTransaction, RecordOutcome, TransactionStatus,
};
pub use checkout::CheckoutCompleted;
