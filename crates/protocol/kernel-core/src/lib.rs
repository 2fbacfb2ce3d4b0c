//! Canonical JSON encoding, SHA-256 hashing, and the shared data model for
//! the governance kernel.
//!
//! Every other crate in this workspace builds on top of three things
//! defined here: a byte-stable [`canonical`] encoding, the [`hash`]
//! helpers built on it, and the [`model`] structs that flow through the
//! pipeline. [`payload`] supplies a cycle-capable tree for request and
//! response bodies, since `serde_json::Value` cannot represent a cycle at
//! all and the firewall needs to be able to reject one.

#![forbid(unsafe_code)]

pub mod canonical;
pub mod codes;
pub mod error;
pub mod hash;
pub mod model;
pub mod payload;
pub mod time;

pub use canonical::{canonicalize, sha256_hex, strip_signature_fields};
pub use error::CanonError;
pub use hash::sha256;
pub use model::*;
pub use payload::{Payload, PayloadRef};
pub use time::{now_unix_ms, format_rfc3339_ms};
