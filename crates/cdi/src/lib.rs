//! CDI — the pre-action decision interface and post-action output check
//! (spec §4.G).
//!
//! [`Cdi::check_action`] consults consent, the genome's capability
//! ceiling, the built-in prohibited-action list, and context completeness
//! before minting a capability token. [`Cdi::check_output`] scans handler
//! output for forbidden self-presentation claims and, in strict mode,
//! cross-namespace leakage.

pub mod action;
pub mod codes;
pub mod config;
pub mod consent;
pub mod forbidden;
pub mod output;
pub mod output_patterns;

pub use action::{ActionContext, CheckActionResult};
pub use config::CdiConfig;
pub use consent::{ConsentError, ConsentMap, ConsentState};
pub use output::OutputCheckResult;
use output_patterns::OutputRule;

pub struct Cdi {
    config: CdiConfig,
    consent: ConsentMap,
    output_rules: Vec<OutputRule>,
}

impl Cdi {
    pub fn new(config: CdiConfig) -> Self {
        Self {
            config,
            consent: ConsentMap::new(),
            output_rules: output::default_output_rules(),
        }
    }

    pub fn consent(&self) -> &ConsentMap {
        &self.consent
    }
}
