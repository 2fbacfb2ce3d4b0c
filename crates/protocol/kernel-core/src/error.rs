use thiserror::Error;

/// Errors produced while turning a value into its canonical byte form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonError {
    #[error("value contains a cycle and cannot be canonicalized")]
    Cycle,

    #[error("value contains a non-finite number, which has no canonical JSON form")]
    NonFiniteNumber,
}
