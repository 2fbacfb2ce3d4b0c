use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("module file '{path}' is missing")]
    FileMissing { path: String },

    #[error("module file '{path}' read failed: {reason}")]
    Io { path: String, reason: String },

    #[error("module file '{path}' hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        path: String,
        expected: String,
        computed: String,
    },

    #[error("module file '{path}' carries a placeholder hash and strict mode is enabled")]
    PlaceholderInStrictMode { path: String },

    #[error("canary '{name}' failed")]
    CanaryFailed { name: String },
}
