//! Shared data model for the governance kernel (spec §3).
//!
//! These types are plain, serializable data: they carry no behavior of
//! their own beyond what `serde` needs. The crates that own a piece of the
//! pipeline (`genome`, `tokens`, `proof`, `audit`, `posture`, `registry`)
//! build their verbs on top of these shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const GENOME_SCHEMA_VERSION: &str = "genome.v0.1";

/// Immutable once signed. See the crate-level docs for the signing
/// invariant: the genome ID is the SHA-256 of the canonical genome with
/// `signature`/`signatures` stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    pub schema_version: String,
    pub name: String,
    pub version: String,
    pub created_at: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub authority: Authority,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    pub build_manifest: BuildManifest,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signatures: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authority {
    pub signers: Vec<Signer>,
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub key_id: String,
    pub alg: String,
    /// SPKI-encoded Ed25519 public key, base64.
    pub public_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invariant {
    pub id: String,
    pub severity: Severity,
    pub testable_claim: String,
    pub enforcement_hook: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityRiskClass {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub cap_id: String,
    pub risk_class: CapabilityRiskClass,
    #[serde(default)]
    pub allow_actions: Vec<String>,
    #[serde(default)]
    pub deny_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    pub sha256: String,
}

/// Short-lived, signed, single-use-by-default proof that an actor may
/// perform a specific action. The `signature` and `boot_key_id` fields are
/// excluded when computing the signature over the remaining fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub token_id: String,
    pub action_id: String,
    pub actor: String,
    pub context: TokenContext,
    pub issued_at: String,
    pub expires_at: String,
    pub max_use: u32,
    pub use_count: u32,
    pub boot_key_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenContext {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,
    pub request_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Deny,
    Uncertain,
}

pub const STAGE_CIF_INGRESS: &str = "cif_ingress";
pub const STAGE_CDI_ACTION: &str = "cdi_action";
pub const STAGE_HANDLER: &str = "handler";
pub const STAGE_CDI_OUTPUT: &str = "cdi_output";
pub const STAGE_CIF_EGRESS: &str = "cif_egress";

/// Per-request tamper-evident record of every stage executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceProof {
    pub request_id: String,
    pub request_fingerprint: String,
    pub boot_key_id: String,
    pub verdict: Verdict,
    /// Keyed by stage name; a `BTreeMap` so canonical (stage-name-sorted)
    /// serialization needs no extra sorting step of its own.
    pub stage_hashes: BTreeMap<String, String>,
    pub cumulative_hash: String,
    pub signature: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
    Action,
    Output,
}

/// One entry in the tamper-evident audit log. `entry_hash` is computed
/// over the canonical form of every other field; chaining is established
/// by carrying the previous entry's `entry_hash` forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub direction: Direction,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action: Option<String>,
    pub allowed: bool,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_entry_hash: Option<String>,
    pub entry_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionRiskClass {
    Low,
    Medium,
    High,
    Critical,
}

/// Statically known, immutable at compile time: the single source of
/// truth both CIF and CDI consult for a given `action_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRegistryEntry {
    pub id: &'static str,
    pub risk_class: ActionRiskClass,
    pub side_effect: bool,
    pub description: &'static str,
    pub requires_governance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Posture {
    Normal,
    Defensive,
    FailClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureTransition {
    pub from: Posture,
    pub to: Posture,
    pub reason: String,
    pub timestamp: String,
    pub automatic: bool,
}
