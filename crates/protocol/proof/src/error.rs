use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("a proof must contain at least one stage")]
    EmptyProof,

    #[error("cumulative hash mismatch (proof tampered)")]
    CumulativeMismatch,

    #[error("signature does not verify (forgery or wrong boot key)")]
    SignatureMismatch,

    #[error("failed to canonicalize proof input: {0}")]
    Canon(#[from] kernel_core::CanonError),
}
