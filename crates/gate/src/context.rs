//! `KernelContext`: the explicitly-passed, non-global state every
//! governed action runs against. No ambient singletons — every piece
//! of shared state a request's pipeline touches is a field here,
//! constructed once at boot and threaded through explicitly.

use std::path::PathBuf;

use cdi::{Cdi, CdiConfig};
use cif::{Cif, CifConfig};
use genome::VerificationOutcome;
use kernel_core::{BuildManifest, Genome, Posture};
use posture::PostureManager;
use proof::BootKey;
use tokens::TokenValidator;
use tracing::{error, info, warn};

use crate::env::EnvConfig;
use crate::error::GateError;

/// A handler invocation that runs longer than this is treated as a
/// `HANDLER_TIMEOUT` denial once it returns, per spec.md §5's
/// cancellation/timeout rules. Synchronous handlers in this workspace
/// cannot be preempted mid-flight without unsafe code or a `'static`
/// bound this crate's `Fn(&Value) -> Value` handler signature does not
/// carry, so the deadline is enforced cooperatively: the orchestrator
/// measures wall-clock time around the call and discards a late result.
pub const DEFAULT_HANDLER_TIMEOUT_MS: u64 = 30_000;

pub struct KernelContext {
    pub(crate) genome: Option<Genome>,
    pub(crate) boot_key: BootKey,
    pub(crate) posture: PostureManager,
    pub(crate) audit: audit::AuditLog,
    pub(crate) cif: Cif,
    pub(crate) cdi: Cdi,
    pub(crate) token_validator: TokenValidator,
    pub(crate) handler_timeout_ms: u64,
}

impl KernelContext {
    /// Boots a context: generates the boot key, loads and verifies the
    /// genome named by `env` (if any), opens the audit log, and wires up
    /// `cif`/`cdi`/posture/token bookkeeping. A missing or invalid
    /// genome does not prevent construction — per spec.md §9 this is a
    /// deployment choice, not a panic — but it does escalate posture to
    /// a locked FAIL_CLOSED, since "genome invalid" is an explicit
    /// FAIL_CLOSED trigger (spec.md §4.I).
    pub fn bootstrap(
        env: &EnvConfig,
        repo_root: PathBuf,
        audit_log_path: PathBuf,
        cif_config: CifConfig,
        cdi_config: CdiConfig,
    ) -> Result<Self, GateError> {
        let boot_key = BootKey::generate();
        let posture = PostureManager::new(Posture::Normal);

        let genome = match load_and_verify_genome(env, &repo_root) {
            GenomeOutcome::None => None,
            GenomeOutcome::Valid(genome) => {
                info!(name = %genome.name, version = %genome.version, "genome loaded and verified");
                Some(genome)
            }
            GenomeOutcome::Invalid(reason) => {
                error!(reason, "genome failed verification, escalating to FAIL_CLOSED");
                posture.escalate_to_fail_closed(&format!("genome invalid: {reason}"), true);
                None
            }
        };

        let audit = audit::AuditLog::open(&audit_log_path)?;

        Ok(Self {
            genome,
            boot_key,
            posture,
            audit,
            cif: Cif::new(cif_config),
            cdi: Cdi::new(cdi_config),
            token_validator: TokenValidator::new(),
            handler_timeout_ms: DEFAULT_HANDLER_TIMEOUT_MS,
        })
    }

    /// For tests and embedders that already hold a verified genome and
    /// don't want to go through file I/O.
    pub fn new_with_genome(
        genome: Option<Genome>,
        audit: audit::AuditLog,
        cif_config: CifConfig,
        cdi_config: CdiConfig,
    ) -> Self {
        Self {
            genome,
            boot_key: BootKey::generate(),
            posture: PostureManager::new(Posture::Normal),
            audit,
            cif: Cif::new(cif_config),
            cdi: Cdi::new(cdi_config),
            token_validator: TokenValidator::new(),
            handler_timeout_ms: DEFAULT_HANDLER_TIMEOUT_MS,
        }
    }

    /// Overrides the handler deadline (milliseconds) used by `governed`.
    pub fn with_handler_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.handler_timeout_ms = timeout_ms;
        self
    }

    pub fn genome(&self) -> Option<&Genome> {
        self.genome.as_ref()
    }

    pub fn posture(&self) -> &PostureManager {
        &self.posture
    }

    pub fn audit(&self) -> &audit::AuditLog {
        &self.audit
    }

    pub fn boot_key(&self) -> &BootKey {
        &self.boot_key
    }

    pub fn cdi(&self) -> &Cdi {
        &self.cdi
    }

    /// Runs an integrity sweep (module hashes plus canaries) against
    /// this context's posture manager. Intended to run at boot and on a
    /// timer, per spec.md §4.K.
    pub fn run_integrity_sweep(
        &self,
        manifest: &BuildManifest,
        repo_root: &std::path::Path,
        strict: bool,
        canaries: &integrity::CanaryRegistry,
    ) -> integrity::SweepReport {
        integrity::run_sweep(manifest, repo_root, strict, canaries, &self.posture)
    }
}

enum GenomeOutcome {
    None,
    Valid(Genome),
    Invalid(String),
}

fn load_and_verify_genome(env: &EnvConfig, repo_root: &std::path::Path) -> GenomeOutcome {
    let Some(path) = &env.genome_path else {
        return GenomeOutcome::None;
    };

    let (genome, signatures) = match genome::load(path) {
        Ok(v) => v,
        Err(e) => {
            return GenomeOutcome::Invalid(format!(
                "[{}] {e}",
                kernel_core::codes::GENOME_INVALID
            ))
        }
    };

    let outcome: VerificationOutcome = genome::verify(&genome, &signatures);
    if !outcome.ok {
        let threshold_unmet = outcome
            .signature_errors
            .iter()
            .any(|e| matches!(e, genome::VerifyError::ThresholdUnmet { .. }));
        let code = if threshold_unmet {
            kernel_core::codes::GENOME_SIG_THRESHOLD_UNMET
        } else {
            kernel_core::codes::GENOME_INVALID
        };
        return GenomeOutcome::Invalid(format!(
            "[{code}] {} schema error(s), {} signature error(s)",
            outcome.schema_errors.len(),
            outcome.signature_errors.len()
        ));
    }

    if env.strict_manifest() {
        let report = genome::verify_manifest(&genome, repo_root, true);
        if !report.ok() {
            return GenomeOutcome::Invalid(format!(
                "[{}] {} manifest error(s)",
                kernel_core::codes::MANIFEST_MISMATCH,
                report.errors.len()
            ));
        }
    } else {
        warn!("genome loaded without manifest verification");
    }

    GenomeOutcome::Valid(genome)
}
