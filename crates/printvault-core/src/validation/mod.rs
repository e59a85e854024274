//! Validation modules

pub mod upload;

pub use upload::{
    signature_rule, validate, ClassPolicy, SignatureRule, SizeClass, UploadCandidate,
    UploadPolicy, ValidationVerdict, VerdictReason,
};
