//! Stable, machine-readable violation codes this crate can produce
//! (subset of the kernel-wide list in `kernel_core::codes`).

pub use kernel_core::codes::{
    CIF_EGRESS_MALFORMED, CIF_EGRESS_TOO_LARGE, CIF_INGRESS_MALFORMED, CIF_QUARANTINED,
    CIF_RATE_LIMITED, CIF_REQUEST_TOO_LARGE, CIF_SECRET_LEAK,
};
