//! Integrity monitor (spec §4.K): re-hashes the kernel's own module
//! files against a manifest and runs named canary checks, at boot and
//! periodically. Any failure escalates the posture ladder to
//! FAIL_CLOSED, since it means some enforcement stage may no longer be
//! doing what it claims.

pub mod canary;
pub mod error;
pub mod manifest;

use std::path::Path;

use kernel_core::BuildManifest;
use posture::PostureManager;
use tracing::error;

pub use canary::{Canary, CanaryRegistry};
pub use error::IntegrityError;
pub use manifest::{verify_module_hashes, ModuleHashReport};

/// Runs a full integrity sweep: module-hash verification plus every
/// registered canary. On any failure, escalates `posture` to
/// FAIL_CLOSED and locks it, per spec.md §4.K.
pub fn run_sweep(
    manifest: &BuildManifest,
    repo_root: &Path,
    strict: bool,
    canaries: &CanaryRegistry,
    posture: &PostureManager,
) -> SweepReport {
    let module_report = verify_module_hashes(manifest, repo_root, strict);
    let canary_failures = canaries.run_all();

    let ok = module_report.ok() && canary_failures.is_empty();
    if !ok {
        error!(
            module_errors = module_report.errors.len(),
            canary_failures = canary_failures.len(),
            "integrity sweep failed, escalating to FAIL_CLOSED"
        );
        posture.escalate_to_fail_closed("integrity sweep failure", true);
    }

    SweepReport {
        module_report,
        canary_failures: canary_failures.into_iter().map(|e| e.to_string()).collect(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub module_report: ModuleHashReport,
    pub canary_failures: Vec<String>,
}

impl SweepReport {
    pub fn ok(&self) -> bool {
        self.module_report.ok() && self.canary_failures.is_empty()
    }

    /// The stable code to surface at the kernel boundary when this sweep
    /// failed; `None` when it passed cleanly.
    pub fn code(&self) -> Option<&'static str> {
        if self.ok() {
            None
        } else {
            Some(kernel_core::codes::INTEGRITY_FAILURE)
        }
    }
}
