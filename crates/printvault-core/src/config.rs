//! Configuration module
//!
//! Environment-driven configuration for upload limits. Every value has a
//! default matching production behavior; deployments override via env vars.

use std::env;

use crate::validation::{ClassPolicy, UploadPolicy};

// Ceiling defaults, in MB (converted to bytes when building the policy)
const DEFAULT_MAX_IMAGE_SIZE_MB: usize = 5;
const DEFAULT_MAX_MODEL_SIZE_MB: usize = 100;
const DEFAULT_MAX_VIEWABLE_SIZE_MB: usize = 15;

const DEFAULT_IMAGE_EXTENSIONS: &str = "png,jpg,jpeg,gif,webp";
const DEFAULT_MODEL_EXTENSIONS: &str = "glb,gltf,obj,stl,3mf";
const DEFAULT_VIEWABLE_EXTENSIONS: &str = "glb,gltf";

/// Upload limits configuration
///
/// One size-class table for the whole application; call sites consult the
/// derived [`UploadPolicy`] instead of carrying their own literals.
#[derive(Clone, Debug)]
pub struct UploadLimitsConfig {
    pub max_image_size_bytes: usize,
    pub image_allowed_extensions: Vec<String>,
    pub max_model_size_bytes: usize,
    pub model_allowed_extensions: Vec<String>,
    pub max_viewable_size_bytes: usize,
    pub viewable_allowed_extensions: Vec<String>,
}

fn size_mb_from_env(var: &str, default_mb: usize) -> Result<usize, anyhow::Error> {
    let mb = env::var(var)
        .unwrap_or_else(|_| default_mb.to_string())
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("Invalid {}: {}", var, e))?;
    Ok(mb * 1024 * 1024)
}

fn extensions_from_env(var: &str, default: &str) -> Vec<String> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl UploadLimitsConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            max_image_size_bytes: size_mb_from_env("MAX_IMAGE_SIZE_MB", DEFAULT_MAX_IMAGE_SIZE_MB)?,
            image_allowed_extensions: extensions_from_env(
                "IMAGE_ALLOWED_EXTENSIONS",
                DEFAULT_IMAGE_EXTENSIONS,
            ),
            max_model_size_bytes: size_mb_from_env("MAX_MODEL_SIZE_MB", DEFAULT_MAX_MODEL_SIZE_MB)?,
            model_allowed_extensions: extensions_from_env(
                "MODEL_ALLOWED_EXTENSIONS",
                DEFAULT_MODEL_EXTENSIONS,
            ),
            max_viewable_size_bytes: size_mb_from_env(
                "MAX_VIEWABLE_SIZE_MB",
                DEFAULT_MAX_VIEWABLE_SIZE_MB,
            )?,
            viewable_allowed_extensions: extensions_from_env(
                "VIEWABLE_ALLOWED_EXTENSIONS",
                DEFAULT_VIEWABLE_EXTENSIONS,
            ),
        })
    }

    /// Build the validator policy table from this configuration.
    pub fn into_policy(self) -> UploadPolicy {
        UploadPolicy::new(
            ClassPolicy::new(self.image_allowed_extensions, self.max_image_size_bytes),
            ClassPolicy::new(self.model_allowed_extensions, self.max_model_size_bytes),
            ClassPolicy::new(
                self.viewable_allowed_extensions,
                self.max_viewable_size_bytes,
            ),
        )
    }
}

impl Default for UploadLimitsConfig {
    fn default() -> Self {
        let split = |s: &str| s.split(',').map(|e| e.to_string()).collect();
        Self {
            max_image_size_bytes: DEFAULT_MAX_IMAGE_SIZE_MB * 1024 * 1024,
            image_allowed_extensions: split(DEFAULT_IMAGE_EXTENSIONS),
            max_model_size_bytes: DEFAULT_MAX_MODEL_SIZE_MB * 1024 * 1024,
            model_allowed_extensions: split(DEFAULT_MODEL_EXTENSIONS),
            max_viewable_size_bytes: DEFAULT_MAX_VIEWABLE_SIZE_MB * 1024 * 1024,
            viewable_allowed_extensions: split(DEFAULT_VIEWABLE_EXTENSIONS),
        }
    }
}
