//! Per-boot HMAC key and the governance-proof builder (spec §4.D).
//!
//! [`BootKey`] is generated once when the process starts and never
//! persisted; [`ProofBuilder`] accumulates stage hashes across one request
//! and signs the resulting chain when [`ProofBuilder::build`] is called.
//! [`verify_proof`] is the inverse: it recomputes the cumulative hash and
//! checks the signature, detecting any tampering with the stage hashes.

pub mod boot_key;
pub mod builder;
pub mod error;

pub use boot_key::BootKey;
pub use builder::{denial_proof, hash_stage, verify_proof, ProofBuilder};
pub use error::ProofError;
