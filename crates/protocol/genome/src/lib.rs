//! Genome loading and verification.
//!
//! A genome is loaded once at boot, verified, and cached for the lifetime
//! of the process (see the kernel's lifecycle notes); this crate only
//! provides the pure functions — `load`, `verify`, `verify_manifest` — the
//! caching and the "loaded once" discipline live in `gate`.

pub mod error;
pub mod loader;
pub mod schema;
pub mod verify;

pub use error::{SchemaError, VerifyError};
pub use loader::{load, parse};
pub use schema::validate;
pub use verify::{genome_id, verify, verify_manifest, ManifestReport, RawSignature, VerificationOutcome};
