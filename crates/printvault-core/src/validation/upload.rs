//! Upload validation
//!
//! Decides whether a candidate file is acceptable before anything is written
//! to object storage: extension allow-list per size class, a per-class byte
//! ceiling, and a magic-number check for formats that have a reliable
//! signature. Pure functions of their inputs; no I/O, no panics on malformed
//! content.

use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upload purpose bucket, each with its own ceiling and extension allow-list.
///
/// A candidate is classified by its intended use before validation, not by
/// its extension alone: `glb` is valid as both a purchasable model and a
/// viewable preview, with different ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Image,
    Model,
    Viewable,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Image => "image",
            SizeClass::Model => "model",
            SizeClass::Viewable => "viewable",
        }
    }
}

/// A candidate file as declared by the uploader.
///
/// The extension is always derived from the declared name and lowercased.
/// It is attacker-controlled metadata and is cross-checked against the
/// content where a signature rule exists for the format.
#[derive(Debug, Clone)]
pub struct UploadCandidate<'a> {
    pub declared_name: &'a str,
    pub content: &'a [u8],
}

impl<'a> UploadCandidate<'a> {
    pub fn new(declared_name: &'a str, content: &'a [u8]) -> Self {
        Self {
            declared_name,
            content,
        }
    }

    /// Lowercased extension derived from the declared name. Empty when the
    /// name carries no extension (and therefore never in any allow-list).
    pub fn extension(&self) -> String {
        Path::new(self.declared_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }

    pub fn byte_length(&self) -> usize {
        self.content.len()
    }
}

/// Why a candidate was accepted or rejected. No partial-accept state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    Ok,
    ExtensionNotAllowed,
    SizeExceeded,
    SignatureMismatch,
}

/// Result of validating one upload candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: VerdictReason,
}

impl ValidationVerdict {
    fn accept() -> Self {
        Self {
            accepted: true,
            reason: VerdictReason::Ok,
        }
    }

    fn reject(reason: VerdictReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

/// Allow-list and byte ceiling for one size class.
#[derive(Debug, Clone)]
pub struct ClassPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: usize,
}

impl ClassPolicy {
    pub fn new(allowed_extensions: Vec<String>, max_bytes: usize) -> Self {
        Self {
            allowed_extensions,
            max_bytes,
        }
    }
}

/// The single configuration table mapping each size class to its allowed
/// extensions and ceiling. All call sites consult this table through
/// [`validate`]; limits are never duplicated as per-route literals.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    image: ClassPolicy,
    model: ClassPolicy,
    viewable: ClassPolicy,
}

impl UploadPolicy {
    pub fn new(image: ClassPolicy, model: ClassPolicy, viewable: ClassPolicy) -> Self {
        Self {
            image,
            model,
            viewable,
        }
    }

    pub fn class(&self, class: SizeClass) -> &ClassPolicy {
        match class {
            SizeClass::Image => &self.image,
            SizeClass::Model => &self.model,
            SizeClass::Viewable => &self.viewable,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        let exts = |list: &[&str]| list.iter().map(|e| e.to_string()).collect();
        Self {
            image: ClassPolicy::new(exts(&["png", "jpg", "jpeg", "gif", "webp"]), 5 * 1024 * 1024),
            model: ClassPolicy::new(
                exts(&["glb", "gltf", "obj", "stl", "3mf"]),
                100 * 1024 * 1024,
            ),
            viewable: ClassPolicy::new(exts(&["glb", "gltf"]), 15 * 1024 * 1024),
        }
    }
}

/// A fixed published byte sequence at a fixed offset identifying a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureRule {
    pub offset: usize,
    pub magic: &'static [u8],
}

impl SignatureRule {
    /// True when the content carries the expected bytes at the expected
    /// offset. Truncated or empty content cannot match.
    pub fn matches(&self, content: &[u8]) -> bool {
        content
            .get(self.offset..self.offset + self.magic.len())
            .is_some_and(|window| window == self.magic)
    }
}

/// Signature rule for an extension, where a reliable one exists.
///
/// `obj` and `gltf` are text formats and `stl` has no universal magic
/// (binary STL starts with an arbitrary 80-byte header), so those pass the
/// signature step on trust. This stage is defense-in-depth against extension
/// spoofing, not a format parser; callers needing strict enforcement must
/// layer a full parse externally.
pub fn signature_rule(extension: &str) -> Option<SignatureRule> {
    let rule = match extension {
        "glb" => SignatureRule {
            offset: 0,
            magic: b"glTF",
        },
        // 3mf is a zip container, same leading bytes
        "zip" | "3mf" => SignatureRule {
            offset: 0,
            magic: &[0x50, 0x4B, 0x03, 0x04],
        },
        "png" => SignatureRule {
            offset: 0,
            magic: &[0x89, 0x50, 0x4E, 0x47],
        },
        "jpg" | "jpeg" => SignatureRule {
            offset: 0,
            magic: &[0xFF, 0xD8, 0xFF],
        },
        "gif" => SignatureRule {
            offset: 0,
            magic: b"GIF8",
        },
        _ => return None,
    };
    Some(rule)
}

/// Decide whether a candidate upload is acceptable for the given class.
///
/// Checks run in strict order and short-circuit on the first failure:
/// 1. the derived extension must be in the class allow-list,
/// 2. the byte length must not exceed the class ceiling,
/// 3. where a signature rule exists for the extension, the content must
///    carry the expected magic bytes.
pub fn validate(
    candidate: &UploadCandidate<'_>,
    class: SizeClass,
    policy: &UploadPolicy,
) -> ValidationVerdict {
    let class_policy = policy.class(class);
    let extension = candidate.extension();

    if !class_policy
        .allowed_extensions
        .iter()
        .any(|allowed| allowed == &extension)
    {
        return ValidationVerdict::reject(VerdictReason::ExtensionNotAllowed);
    }

    if candidate.byte_length() > class_policy.max_bytes {
        return ValidationVerdict::reject(VerdictReason::SizeExceeded);
    }

    if let Some(rule) = signature_rule(&extension) {
        if !rule.matches(candidate.content) {
            return ValidationVerdict::reject(VerdictReason::SignatureMismatch);
        }
    }

    ValidationVerdict::accept()
}
