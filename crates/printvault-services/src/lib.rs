//! Printvault Services Layer
//!
//! This crate is the **business service layer**: upload orchestration
//! (validate → store → asset reference) and the entitlement ledger service
//! (idempotent consumer of payment-completion events, entitlement queries).
//! It also owns the narrow object-storage contract (`AssetStore`) this
//! subsystem requires from its storage collaborator. Keep coordination here;
//! keep pure validation in printvault-core and persistence in printvault-db.

pub mod entitlement;
pub mod storage;
pub mod upload;

pub use entitlement::EntitlementService;
pub use storage::{AssetStore, LocalAssetStore, StorageError, StorageResult};
pub use upload::{StoredAsset, UploadService};
