//! Asset upload service
//!
//! Orchestrates the upload pipeline: sanitize → validate → store. The
//! validator gates what is allowed to become an asset reference; only
//! accepted content reaches the storage write, and the returned reference is
//! what a later ledger entry records.

use std::sync::Arc;

use printvault_core::validation::{validate, SizeClass, UploadCandidate, UploadPolicy};
use printvault_core::{AppError, VerdictReason};
use uuid::Uuid;

use crate::storage::AssetStore;

/// Result of a stored upload: the asset reference a future transaction
/// entitles a purchaser to, plus the servable URL.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub asset_ref: String,
    pub url: String,
    pub size: usize,
}

/// Upload service
///
/// Holds the single policy table so size/extension limits are never
/// duplicated at call sites.
pub struct UploadService {
    policy: UploadPolicy,
    store: Arc<dyn AssetStore>,
}

impl UploadService {
    pub fn new(policy: UploadPolicy, store: Arc<dyn AssetStore>) -> Self {
        Self { policy, store }
    }

    /// Validate and store one upload, returning its asset reference.
    ///
    /// Rejections are caller errors: oversize content maps to
    /// `PayloadTooLarge`, everything else to `InvalidInput`. Storage failures
    /// surface as retryable `Storage` errors.
    pub async fn upload(
        &self,
        class: SizeClass,
        declared_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredAsset, AppError> {
        let candidate = UploadCandidate::new(declared_name, &data);
        let verdict = validate(&candidate, class, &self.policy);
        let class_policy = self.policy.class(class);

        match verdict.reason {
            VerdictReason::Ok => {}
            VerdictReason::ExtensionNotAllowed => {
                return Err(AppError::InvalidInput(format!(
                    "Invalid file extension. Allowed extensions: {}",
                    class_policy.allowed_extensions.join(", ")
                )));
            }
            VerdictReason::SizeExceeded => {
                return Err(AppError::PayloadTooLarge(format!(
                    "File size exceeds maximum allowed size of {} MB",
                    class_policy.max_bytes / 1024 / 1024
                )));
            }
            VerdictReason::SignatureMismatch => {
                return Err(AppError::InvalidInput(
                    "File content does not match its declared format".to_string(),
                ));
            }
        }

        let safe_original_filename = sanitize_filename(declared_name)?;
        let extension = candidate.extension();
        let uuid_filename = format!("{}.{}", Uuid::new_v4(), extension);
        let file_size = data.len();

        tracing::info!(
            original_filename = %safe_original_filename,
            file_size = file_size,
            class = %class.as_str(),
            "Processing upload"
        );

        let (storage_key, storage_url) = self
            .store
            .upload(&uuid_filename, content_type, data)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, filename = %uuid_filename, "Failed to upload to storage");
                AppError::Storage(format!("Failed to upload file: {}", e))
            })?;

        tracing::info!(
            storage_key = %storage_key,
            storage_url = %storage_url,
            "Upload to storage successful"
        );

        Ok(StoredAsset {
            asset_ref: storage_key,
            url: storage_url,
            size: file_size,
        })
    }
}

/// Sanitize filename to prevent path traversal and invalid characters.
/// Returns an error if the filename contains path traversal attempts.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    if filename.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}
