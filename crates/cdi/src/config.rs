use serde::{Deserialize, Serialize};

/// CDI configuration. `strict_mode` governs whether an `Uncertain`
/// verdict from the action check is converted to a deny (spec.md §6,
/// default `true`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdiConfig {
    pub strict_mode: bool,
}

impl Default for CdiConfig {
    fn default() -> Self {
        Self { strict_mode: true }
    }
}
