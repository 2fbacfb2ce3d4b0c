//! Stable, machine-readable error codes surfaced at the kernel boundary.
//!
//! This is the single canonical list every crate draws from: `cif` and
//! `cdi` each re-export the subset they can produce so call sites read
//! `cif::codes::CIF_SECRET_LEAK` rather than a bare string literal, but
//! the string values themselves live here so two crates never drift
//! into emitting two different spellings of the same code.

pub const CIF_INGRESS_MALFORMED: &str = "CIF_INGRESS_MALFORMED";
pub const CIF_REQUEST_TOO_LARGE: &str = "CIF_REQUEST_TOO_LARGE";
pub const CIF_RATE_LIMITED: &str = "CIF_RATE_LIMITED";
pub const CIF_QUARANTINED: &str = "CIF_QUARANTINED";
pub const CIF_EGRESS_TOO_LARGE: &str = "CIF_EGRESS_TOO_LARGE";
pub const CIF_EGRESS_MALFORMED: &str = "CIF_EGRESS_MALFORMED";
pub const CIF_SECRET_LEAK: &str = "CIF_SECRET_LEAK";

pub const CDI_CAPABILITY_CEILING: &str = "CDI_CAPABILITY_CEILING";
pub const CDI_CONSENT_STOP: &str = "CDI_CONSENT_STOP";
pub const CDI_FORBIDDEN_CLASS: &str = "CDI_FORBIDDEN_CLASS";
pub const CDI_UNCERTAIN: &str = "CDI_UNCERTAIN";
pub const CDI_OUTPUT_VIOLATION: &str = "CDI_OUTPUT_VIOLATION";

pub const TOKEN_MISSING: &str = "TOKEN_MISSING";
pub const TOKEN_INVALID: &str = "TOKEN_INVALID";

pub const POSTURE_VIOLATION: &str = "POSTURE_VIOLATION";

pub const GENOME_INVALID: &str = "GENOME_INVALID";
pub const GENOME_SIG_THRESHOLD_UNMET: &str = "GENOME_SIG_THRESHOLD_UNMET";
pub const MANIFEST_MISMATCH: &str = "MANIFEST_MISMATCH";

pub const INTEGRITY_FAILURE: &str = "INTEGRITY_FAILURE";
pub const HANDLER_TIMEOUT: &str = "HANDLER_TIMEOUT";
