//! Printvault Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! upload validator shared across all printvault components. Everything here
//! is pure: persistence lives in printvault-db, orchestration in
//! printvault-services.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::UploadLimitsConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{
    validate, SizeClass, UploadCandidate, UploadPolicy, ValidationVerdict, VerdictReason,
};
