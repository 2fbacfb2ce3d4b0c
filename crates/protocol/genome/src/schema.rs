//! Schema validation for a parsed [`Genome`].
//!
//! Every failure is collected; validation never stops at the first
//! problem, because audit tooling and operators need the full list of
//! what is wrong with a candidate genome, not just the first thing.

use std::collections::HashSet;

use kernel_core::Genome;

use crate::error::SchemaError;

pub const SUPPORTED_SCHEMA_VERSION: &str = kernel_core::GENOME_SCHEMA_VERSION;

/// Validates `genome` against the documented schema, returning every
/// violation found rather than the first one.
pub fn validate(genome: &Genome) -> Vec<SchemaError> {
    let mut errors = Vec::new();

    if genome.schema_version != SUPPORTED_SCHEMA_VERSION {
        errors.push(SchemaError::UnsupportedVersion {
            found: genome.schema_version.clone(),
            expected: SUPPORTED_SCHEMA_VERSION.to_string(),
        });
    }

    if genome.name.trim().is_empty() {
        errors.push(SchemaError::MissingField("name"));
    }
    if genome.version.trim().is_empty() {
        errors.push(SchemaError::MissingField("version"));
    }
    if genome.created_at.trim().is_empty() {
        errors.push(SchemaError::MissingField("created_at"));
    }

    validate_authority(genome, &mut errors);
    validate_invariants(genome, &mut errors);
    validate_capabilities(genome, &mut errors);

    errors
}

fn validate_authority(genome: &Genome, errors: &mut Vec<SchemaError>) {
    let authority = &genome.authority;

    if authority.signers.is_empty() {
        errors.push(SchemaError::NoSigners);
    }
    if authority.threshold < 1 {
        errors.push(SchemaError::ThresholdBelowOne);
    }
    if (authority.threshold as usize) > authority.signers.len() {
        errors.push(SchemaError::ThresholdExceedsSigners {
            threshold: authority.threshold,
            signer_count: authority.signers.len(),
        });
    }

    let mut seen = HashSet::new();
    for signer in &authority.signers {
        if signer.alg != "ed25519" {
            errors.push(SchemaError::UnsupportedAlgorithm {
                key_id: signer.key_id.clone(),
                alg: signer.alg.clone(),
            });
        }
        if !seen.insert(signer.key_id.clone()) {
            errors.push(SchemaError::DuplicateSignerKeyId(signer.key_id.clone()));
        }
        if let Err(reason) = decode_spki_public_key(&signer.public_key) {
            errors.push(SchemaError::InvalidPublicKey {
                key_id: signer.key_id.clone(),
                reason,
            });
        }
    }
}

fn validate_invariants(genome: &Genome, errors: &mut Vec<SchemaError>) {
    for invariant in &genome.invariants {
        if invariant.testable_claim.trim().is_empty() {
            errors.push(SchemaError::EmptyInvariantClaim(invariant.id.clone()));
        }
    }
}

fn validate_capabilities(genome: &Genome, errors: &mut Vec<SchemaError>) {
    for capability in &genome.capabilities {
        let allow: HashSet<&str> = capability.allow_actions.iter().map(String::as_str).collect();
        let conflict = capability
            .deny_actions
            .iter()
            .any(|action| allow.contains(action.as_str()));
        if conflict {
            errors.push(SchemaError::ConflictingCapabilityAction(
                capability.cap_id.clone(),
            ));
        }
    }
}

/// Decodes a base64 SPKI-wrapped Ed25519 public key down to its raw 32
/// bytes. Accepts either a bare 32-byte base64 key or a full
/// DER/SPKI-wrapped key (the DER prefix is stripped by taking the final
/// 32 bytes of the decoded buffer, which is where Ed25519 SPKI always
/// places the raw key).
pub fn decode_spki_public_key(encoded: &str) -> Result<[u8; 32], String> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    if bytes.len() < 32 {
        return Err(format!("decoded key too short ({} bytes)", bytes.len()));
    }
    let raw = &bytes[bytes.len() - 32..];
    let mut out = [0u8; 32];
    out.copy_from_slice(raw);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_core::{Authority, BuildManifest, Genome, Signer};

    fn minimal_genome() -> Genome {
        Genome {
            schema_version: SUPPORTED_SCHEMA_VERSION.to_string(),
            name: "test".into(),
            version: "1.0.0".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
            parents: vec![],
            authority: Authority {
                signers: vec![Signer {
                    key_id: "k1".into(),
                    alg: "ed25519".into(),
                    public_key: base64::Engine::encode(
                        &base64::engine::general_purpose::STANDARD,
                        [0u8; 32],
                    ),
                }],
                threshold: 1,
            },
            invariants: vec![],
            capabilities: vec![],
            build_manifest: BuildManifest { files: vec![] },
            signature: None,
            signatures: None,
        }
    }

    #[test]
    fn minimal_genome_is_valid() {
        assert!(validate(&minimal_genome()).is_empty());
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let mut g = minimal_genome();
        g.schema_version = "genome.v0.2".into();
        let errors = validate(&g);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::UnsupportedVersion { .. })));
    }

    #[test]
    fn threshold_exceeding_signer_count_is_rejected() {
        let mut g = minimal_genome();
        g.authority.threshold = 2;
        let errors = validate(&g);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::ThresholdExceedsSigners { .. })));
    }

    #[test]
    fn all_errors_are_collected_not_just_the_first() {
        let mut g = minimal_genome();
        g.schema_version = "bogus".into();
        g.authority.threshold = 0;
        g.name = "".into();
        let errors = validate(&g);
        assert!(errors.len() >= 3);
    }

    #[test]
    fn conflicting_allow_and_deny_is_rejected() {
        let mut g = minimal_genome();
        g.capabilities.push(kernel_core::Capability {
            cap_id: "cap1".into(),
            risk_class: kernel_core::CapabilityRiskClass::A,
            allow_actions: vec!["write".into()],
            deny_actions: vec!["write".into()],
        });
        let errors = validate(&g);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SchemaError::ConflictingCapabilityAction(_))));
    }
}
