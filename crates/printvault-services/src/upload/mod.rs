//! Upload orchestration

pub mod service;

pub use service::{sanitize_filename, StoredAsset, UploadService};
