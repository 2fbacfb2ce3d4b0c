//! Tamper-evident governance proof: one per request, built up stage by
//! stage, signed once at the end.

use std::collections::BTreeMap;

use kernel_core::{canonical, GovernanceProof, Verdict};
use serde_json::{json, Value};

use crate::boot_key::BootKey;
use crate::error::ProofError;

/// Builds a [`GovernanceProof`] across the lifetime of one request.
///
/// Each completed pipeline stage is recorded with [`ProofBuilder::add_stage`].
/// The `ticket` passed to the per-stage hash is a per-request monotonic
/// counter (never wall-clock time, per the Open Questions resolution in
/// spec.md §9): two stages with identical input/output within the same
/// request still produce distinct hashes, but the whole proof remains
/// reproducible given the same sequence of `add_stage` calls.
pub struct ProofBuilder {
    request_id: String,
    request_fingerprint: String,
    stage_hashes: BTreeMap<String, String>,
    verdict: Verdict,
    ticket: u64,
}

impl ProofBuilder {
    pub fn new(request_id: impl Into<String>, request_fingerprint: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            request_fingerprint: request_fingerprint.into(),
            stage_hashes: BTreeMap::new(),
            verdict: Verdict::Uncertain,
            ticket: 0,
        }
    }

    /// Records a completed stage. `input`/`output` are whatever
    /// canonicalizable value the stage consumed/produced; they are hashed
    /// together with a fresh ticket, never stored verbatim in the proof.
    pub fn add_stage(
        &mut self,
        stage_name: &str,
        input: &Value,
        output: &Value,
    ) -> Result<(), ProofError> {
        let hash = hash_stage(stage_name, input, output, self.next_ticket())?;
        self.stage_hashes.insert(stage_name.to_string(), hash);
        Ok(())
    }

    pub fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = verdict;
    }

    fn next_ticket(&mut self) -> u64 {
        let t = self.ticket;
        self.ticket += 1;
        t
    }

    /// Finalizes the proof: computes the cumulative hash over every
    /// recorded stage (in canonical stage-name order) and signs it with
    /// `boot_key`.
    pub fn build(self, boot_key: &BootKey) -> Result<GovernanceProof, ProofError> {
        let cumulative_hash = cumulative_hash(&self.stage_hashes)?;
        let signature = boot_key.sign(cumulative_hash.as_bytes());
        Ok(GovernanceProof {
            request_id: self.request_id,
            request_fingerprint: self.request_fingerprint,
            boot_key_id: boot_key.boot_key_id().to_string(),
            verdict: self.verdict,
            stage_hashes: self.stage_hashes,
            cumulative_hash,
            signature,
            timestamp: kernel_core::format_rfc3339_ms(kernel_core::now_unix_ms()),
        })
    }
}

/// SHA-256 over canonical `{stage, input_canonical, output_canonical, ticket}`.
pub fn hash_stage(
    stage_name: &str,
    input: &Value,
    output: &Value,
    ticket: u64,
) -> Result<String, ProofError> {
    let envelope = json!({
        "stage": stage_name,
        "input": input,
        "output": output,
        "ticket": ticket,
    });
    Ok(canonical::sha256_hex(&envelope)?)
}

fn cumulative_hash(stage_hashes: &BTreeMap<String, String>) -> Result<String, ProofError> {
    let value: Value = stage_hashes
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<serde_json::Map<_, _>>()
        .into();
    Ok(canonical::sha256_hex(&value)?)
}

/// Builds a one-stage denial proof: the only stage present is the one
/// that failed. Used by every pipeline stage that short-circuits.
pub fn denial_proof(
    request_id: impl Into<String>,
    request_fingerprint: impl Into<String>,
    failing_stage: &str,
    stage_input: &Value,
    stage_output: &Value,
    boot_key: &BootKey,
) -> Result<GovernanceProof, ProofError> {
    let mut builder = ProofBuilder::new(request_id, request_fingerprint);
    builder.add_stage(failing_stage, stage_input, stage_output)?;
    builder.set_verdict(Verdict::Deny);
    builder.build(boot_key)
}

/// Recomputes the cumulative hash from `proof.stage_hashes` and verifies
/// the signature in constant time. Any alteration to a stage hash, any
/// added or removed stage, or a signature recomputed under the wrong key
/// is detected here.
pub fn verify_proof(proof: &GovernanceProof, boot_key: &BootKey) -> Result<(), ProofError> {
    if proof.stage_hashes.is_empty() {
        return Err(ProofError::EmptyProof);
    }
    let recomputed = cumulative_hash(&proof.stage_hashes)?;
    if recomputed != proof.cumulative_hash {
        return Err(ProofError::CumulativeMismatch);
    }
    if !boot_key.verify(proof.cumulative_hash.as_bytes(), &proof.signature) {
        return Err(ProofError::SignatureMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> BootKey {
        BootKey::from_bytes([5u8; 32])
    }

    #[test]
    fn build_and_verify_round_trip() {
        let boot_key = key();
        let mut builder = ProofBuilder::new("req-1", "fp-1");
        builder
            .add_stage("cif_ingress", &json!({"a": 1}), &json!({"ok": true}))
            .unwrap();
        builder
            .add_stage("cdi_action", &json!({"action": "read"}), &json!({"verdict": "allow"}))
            .unwrap();
        builder.set_verdict(Verdict::Allow);
        let proof = builder.build(&boot_key).unwrap();
        assert_eq!(proof.cumulative_hash.len(), 64);
        assert!(verify_proof(&proof, &boot_key).is_ok());
    }

    #[test]
    fn altering_a_stage_hash_is_detected() {
        let boot_key = key();
        let mut builder = ProofBuilder::new("req-1", "fp-1");
        builder
            .add_stage("cif_ingress", &json!({}), &json!({}))
            .unwrap();
        builder
            .add_stage("cdi_action", &json!({}), &json!({}))
            .unwrap();
        builder.set_verdict(Verdict::Allow);
        let mut proof = builder.build(&boot_key).unwrap();
        proof.stage_hashes.insert("cdi_action".to_string(), "x".repeat(64));
        assert_eq!(
            verify_proof(&proof, &boot_key).unwrap_err(),
            ProofError::CumulativeMismatch
        );
    }

    #[test]
    fn adding_an_extra_stage_is_detected() {
        let boot_key = key();
        let mut builder = ProofBuilder::new("req-1", "fp-1");
        builder.add_stage("cif_ingress", &json!({}), &json!({})).unwrap();
        builder.set_verdict(Verdict::Allow);
        let mut proof = builder.build(&boot_key).unwrap();
        proof
            .stage_hashes
            .insert("cif_egress".to_string(), "a".repeat(64));
        assert_eq!(
            verify_proof(&proof, &boot_key).unwrap_err(),
            ProofError::CumulativeMismatch
        );
    }

    #[test]
    fn removing_a_stage_is_detected() {
        let boot_key = key();
        let mut builder = ProofBuilder::new("req-1", "fp-1");
        builder.add_stage("cif_ingress", &json!({}), &json!({})).unwrap();
        builder.add_stage("cdi_action", &json!({}), &json!({})).unwrap();
        builder.set_verdict(Verdict::Allow);
        let mut proof = builder.build(&boot_key).unwrap();
        proof.stage_hashes.remove("cdi_action");
        assert!(verify_proof(&proof, &boot_key).is_err());
    }

    #[test]
    fn wrong_key_fails_signature_check() {
        let mut builder = ProofBuilder::new("req-1", "fp-1");
        builder.add_stage("cif_ingress", &json!({}), &json!({})).unwrap();
        builder.set_verdict(Verdict::Allow);
        let proof = builder.build(&key()).unwrap();
        let other = BootKey::from_bytes([6u8; 32]);
        assert_eq!(
            verify_proof(&proof, &other).unwrap_err(),
            ProofError::SignatureMismatch
        );
    }

    #[test]
    fn denial_proof_has_exactly_one_stage_and_deny_verdict() {
        let boot_key = key();
        let proof = denial_proof(
            "req-2",
            "fp-2",
            "cif_ingress",
            &json!({"bytes": 99}),
            &json!({"violation": "REQUEST_TOO_LARGE"}),
            &boot_key,
        )
        .unwrap();
        assert_eq!(proof.stage_hashes.len(), 1);
        assert_eq!(proof.verdict, Verdict::Deny);
        assert!(verify_proof(&proof, &boot_key).is_ok());
    }

    #[test]
    fn identical_stage_twice_in_one_request_differs_by_ticket() {
        let h1 = hash_stage("cdi_action", &json!({}), &json!({}), 0).unwrap();
        let h2 = hash_stage("cdi_action", &json!({}), &json!({}), 1).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn same_ticket_and_inputs_reproduce_the_same_hash() {
        let h1 = hash_stage("cdi_action", &json!({"x": 1}), &json!({"y": 2}), 3).unwrap();
        let h2 = hash_stage("cdi_action", &json!({"x": 1}), &json!({"y": 2}), 3).unwrap();
        assert_eq!(h1, h2);
    }
}
