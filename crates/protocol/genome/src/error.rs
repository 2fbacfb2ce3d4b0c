use thiserror::Error;

/// A single schema-validation failure. All of them are collected before
/// returning to the caller — schema validation never fails fast.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unsupported schema_version '{found}', expected '{expected}'")]
    UnsupportedVersion { found: String, expected: String },

    #[error("missing or empty required field '{0}'")]
    MissingField(&'static str),

    #[error("authority.threshold ({threshold}) exceeds signer count ({signer_count})")]
    ThresholdExceedsSigners { threshold: u32, signer_count: usize },

    #[error("authority.threshold must be at least 1")]
    ThresholdBelowOne,

    #[error("authority.signers is empty")]
    NoSigners,

    #[error("signer '{key_id}' declares unsupported algorithm '{alg}'")]
    UnsupportedAlgorithm { key_id: String, alg: String },

    #[error("signer '{key_id}' has an invalid public_key encoding: {reason}")]
    InvalidPublicKey { key_id: String, reason: String },

    #[error("duplicate signer key_id '{0}'")]
    DuplicateSignerKeyId(String),

    #[error("invariant '{0}' has an empty testable_claim")]
    EmptyInvariantClaim(String),

    #[error("capability '{0}' lists the same action in both allow_actions and deny_actions")]
    ConflictingCapabilityAction(String),

    #[error("failed to parse genome JSON: {0}")]
    InvalidJson(String),

    #[error("failed to read genome file '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Errors produced while verifying a genome's signatures or build manifest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("genome failed schema validation")]
    Schema,

    #[error("unknown signer key_id '{0}' in signature list")]
    UnknownSignerKeyId(String),

    #[error("signature from '{0}' does not verify against the declared public key")]
    BadSignature(String),

    #[error(
        "signature threshold not met: {valid_distinct} distinct valid signatures, need {threshold}"
    )]
    ThresholdUnmet { valid_distinct: usize, threshold: u32 },

    #[error("manifest entry '{path}' is missing from the repository")]
    ManifestFileMissing { path: String },

    #[error("manifest entry '{path}' hash mismatch: expected {expected}, computed {computed}")]
    ManifestHashMismatch {
        path: String,
        expected: String,
        computed: String,
    },

    #[error("manifest entry '{path}' carries a placeholder hash, which is forbidden outside development mode")]
    PlaceholderInStrictMode { path: String },

    #[error("manifest entry '{path}' could not be read: {reason}")]
    ManifestIo { path: String, reason: String },

    #[error("canonicalization of the genome failed: {0}")]
    Canon(#[from] kernel_core::CanonError),
}
