//! Static action registry: the single source of truth both CIF and CDI
//! consult for what an `action_id` means.
//!
//! The table is an in-source literal built once per process behind a
//! `once_cell::sync::Lazy`, giving `O(1)` lookup with no runtime
//! construction cost beyond the first access.

use std::collections::HashMap;

use kernel_core::{ActionRegistryEntry, ActionRiskClass};
use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("action '{0}' is not registered")]
    UnregisteredAction(String),
}

macro_rules! entry {
    ($id:expr, $risk:expr, $side_effect:expr, $desc:expr) => {
        ActionRegistryEntry {
            id: $id,
            risk_class: $risk,
            side_effect: $side_effect,
            description: $desc,
            requires_governance: true,
        }
    };
}

/// The in-source table. Adding an action means adding a line here; there
/// is no way to register an action at runtime.
static ACTIONS: &[ActionRegistryEntry] = &[
    entry!(
        "read",
        ActionRiskClass::Low,
        false,
        "Read-only access to a resource"
    ),
    entry!(
        "write",
        ActionRiskClass::Medium,
        true,
        "Mutate a resource the actor is scoped to"
    ),
    entry!(
        "delete",
        ActionRiskClass::High,
        true,
        "Irreversibly remove a resource"
    ),
    entry!(
        "admin.grant",
        ActionRiskClass::Critical,
        true,
        "Grant elevated privilege to another actor"
    ),
    entry!(
        "admin.revoke",
        ActionRiskClass::High,
        true,
        "Revoke privilege from another actor"
    ),
    entry!(
        "network.connect",
        ActionRiskClass::Medium,
        true,
        "Open an outbound network connection"
    ),
    entry!(
        "other",
        ActionRiskClass::Low,
        false,
        "Unclassified action used by test and example scenarios"
    ),
];

static INDEX: Lazy<HashMap<&'static str, &'static ActionRegistryEntry>> = Lazy::new(|| {
    ACTIONS.iter().map(|entry| (entry.id, entry)).collect()
});

/// Looks up `action_id` in `O(1)`. Unknown IDs are a terminal deny for the
/// caller, not a panic.
pub fn validate(action_id: &str) -> Result<&'static ActionRegistryEntry, RegistryError> {
    INDEX
        .get(action_id)
        .copied()
        .ok_or_else(|| RegistryError::UnregisteredAction(action_id.to_string()))
}

/// Returns every registered entry, for tooling and tests that need to
/// enumerate the full table.
pub fn all() -> &'static [ActionRegistryEntry] {
    ACTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_action_resolves() {
        let entry = validate("read").unwrap();
        assert_eq!(entry.id, "read");
        assert!(entry.requires_governance);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = validate("teleport").unwrap_err();
        assert_eq!(err, RegistryError::UnregisteredAction("teleport".into()));
    }

    #[test]
    fn lookup_is_idempotent_across_calls() {
        assert_eq!(validate("write").unwrap().id, validate("write").unwrap().id);
    }

    #[test]
    fn table_has_no_duplicate_ids() {
        let mut seen = std::collections::HashSet::new();
        for entry in all() {
            assert!(seen.insert(entry.id), "duplicate action id: {}", entry.id);
        }
    }
}
