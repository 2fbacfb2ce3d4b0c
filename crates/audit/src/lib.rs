//! Tamper-evident, append-only, hash-chained audit log (spec §4.J).
//!
//! Every ingress, egress, action, and output-check decision is recorded
//! here. Entries chain via `previous_entry_hash` -> `entry_hash`, so
//! altering or removing a past entry is detectable by replaying the
//! chain. The actual file write happens on a background thread; the
//! chain itself advances synchronously so enqueue order always matches
//! chain order even under concurrent producers.

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{build_entry, compute_entry_hash, Severity};
pub use error::AuditError;
pub use log::{read_all, verify_integrity, AuditLog};
