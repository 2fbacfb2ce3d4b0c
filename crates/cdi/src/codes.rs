//! Stable, machine-readable violation codes this crate can produce
//! (subset of the kernel-wide list in `kernel_core::codes`).

pub use kernel_core::codes::{
    CDI_CAPABILITY_CEILING, CDI_CONSENT_STOP, CDI_FORBIDDEN_CLASS, CDI_OUTPUT_VIOLATION,
    CDI_UNCERTAIN,
};
