//! Signature threshold verification and build-manifest verification.

use std::collections::HashSet;
use std::path::Path;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use kernel_core::{canonical, hash, Genome};

use crate::error::VerifyError;
use crate::schema::{self, SchemaError};

/// Result of [`verify`]: the genome ID is always computed, even when
/// verification fails, because callers (audit, boot) need it either way.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub genome_id: String,
    pub ok: bool,
    pub schema_errors: Vec<SchemaError>,
    pub signature_errors: Vec<VerifyError>,
}

/// One raw signature entry, as attached to a genome's `signature` or
/// `signatures` field: `{key_id, signature (hex)}`.
#[derive(Debug, Clone)]
pub struct RawSignature {
    pub key_id: String,
    pub signature_hex: String,
}

/// Computes the genome ID: SHA-256 of the canonical genome with any
/// `signature`/`signatures` fields stripped. Semantically identical
/// genomes (any key order, any signature presence) hash identically.
pub fn genome_id(genome: &Genome) -> Result<String, VerifyError> {
    let value = serde_json::to_value(genome).expect("Genome has no non-serializable fields");
    let stripped = canonical::strip_signature_fields(&value);
    Ok(canonical::sha256_hex(&stripped)?)
}

/// Verifies schema validity and the Ed25519 signature threshold for
/// `genome` given its attached raw signatures.
pub fn verify(genome: &Genome, signatures: &[RawSignature]) -> VerificationOutcome {
    let genome_id = genome_id(genome).unwrap_or_default();
    let schema_errors = schema::validate(genome);

    let mut signature_errors = Vec::new();
    let mut valid_distinct: HashSet<String> = HashSet::new();

    if schema_errors.is_empty() {
        let message_value = serde_json::to_value(genome).unwrap_or(serde_json::Value::Null);
        let stripped = canonical::strip_signature_fields(&message_value);
        let message = match canonical::canonicalize(&stripped) {
            Ok(bytes) => bytes,
            Err(e) => {
                let ok = false;
                return VerificationOutcome {
                    genome_id,
                    ok,
                    schema_errors,
                    signature_errors: vec![VerifyError::Canon(e)],
                };
            }
        };

        for sig in signatures {
            let Some(signer) = genome
                .authority
                .signers
                .iter()
                .find(|s| s.key_id == sig.key_id)
            else {
                signature_errors.push(VerifyError::UnknownSignerKeyId(sig.key_id.clone()));
                continue;
            };

            match verify_one(signer, &message, &sig.signature_hex) {
                Ok(true) => {
                    valid_distinct.insert(sig.key_id.clone());
                }
                Ok(false) => {
                    signature_errors.push(VerifyError::BadSignature(sig.key_id.clone()));
                }
                Err(e) => signature_errors.push(e),
            }
        }

        let threshold = genome.authority.threshold;
        if valid_distinct.len() < threshold as usize {
            signature_errors.push(VerifyError::ThresholdUnmet {
                valid_distinct: valid_distinct.len(),
                threshold,
            });
        }
    }

    let ok = schema_errors.is_empty() && signature_errors.is_empty();
    VerificationOutcome {
        genome_id,
        ok,
        schema_errors,
        signature_errors,
    }
}

fn verify_one(
    signer: &kernel_core::Signer,
    message: &[u8],
    signature_hex: &str,
) -> Result<bool, VerifyError> {
    let raw_key = schema::decode_spki_public_key(&signer.public_key)
        .map_err(|_| VerifyError::BadSignature(signer.key_id.clone()))?;
    let verifying_key = VerifyingKey::from_bytes(&raw_key)
        .map_err(|_| VerifyError::BadSignature(signer.key_id.clone()))?;

    let sig_bytes = hex::decode(signature_hex.trim_start_matches("0x"))
        .map_err(|_| VerifyError::BadSignature(signer.key_id.clone()))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| VerifyError::BadSignature(signer.key_id.clone()))?;
    let signature = Signature::from_bytes(&sig_array);

    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Outcome of verifying a genome's `build_manifest` against a repository
/// root. `placeholder_mode` governs whether a placeholder hash (containing
/// the literal substring `TODO`) is tolerated (development) or rejected
/// (production/strict).
#[derive(Debug, Clone, Default)]
pub struct ManifestReport {
    pub errors: Vec<VerifyError>,
}

impl ManifestReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn verify_manifest(genome: &Genome, repo_root: &Path, strict: bool) -> ManifestReport {
    let mut report = ManifestReport::default();

    for file in &genome.build_manifest.files {
        if file.sha256.contains("TODO") {
            if strict {
                report.errors.push(VerifyError::PlaceholderInStrictMode {
                    path: file.path.clone(),
                });
            }
            continue;
        }

        let full_path = repo_root.join(&file.path);
        let bytes = match std::fs::read(&full_path) {
            Ok(b) => b,
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    report.errors.push(VerifyError::ManifestFileMissing {
                        path: file.path.clone(),
                    });
                } else {
                    report.errors.push(VerifyError::ManifestIo {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                }
                continue;
            }
        };

        let computed = hash::to_hex(&hash::sha256(&bytes));
        if computed != file.sha256 {
            report.errors.push(VerifyError::ManifestHashMismatch {
                path: file.path.clone(),
                expected: file.sha256.clone(),
                computed,
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use ed25519_dalek::{Signer as _, SigningKey};
    use kernel_core::{Authority, BuildManifest, ManifestFile, Signer as GenomeSigner};

    fn signed_genome() -> (Genome, SigningKey, SigningKey, SigningKey) {
        let a = SigningKey::from_bytes(&[1u8; 32]);
        let b = SigningKey::from_bytes(&[2u8; 32]);
        let c = SigningKey::from_bytes(&[3u8; 32]);
        let genome = Genome {
            schema_version: schema::SUPPORTED_SCHEMA_VERSION.to_string(),
            name: "x".into(),
            version: "1.0.0".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
            parents: vec![],
            authority: Authority {
                signers: vec![
                    signer_of("a", &a),
                    signer_of("b", &b),
                    signer_of("c", &c),
                ],
                threshold: 2,
            },
            invariants: vec![],
            capabilities: vec![],
            build_manifest: BuildManifest { files: vec![] },
            signature: None,
            signatures: None,
        };
        (genome, a, b, c)
    }

    fn signer_of(key_id: &str, key: &SigningKey) -> GenomeSigner {
        GenomeSigner {
            key_id: key_id.to_string(),
            alg: "ed25519".to_string(),
            public_key: base64::engine::general_purpose::STANDARD
                .encode(key.verifying_key().to_bytes()),
        }
    }

    fn sign(genome: &Genome, key_id: &str, key: &SigningKey) -> RawSignature {
        let value = serde_json::to_value(genome).unwrap();
        let stripped = canonical::strip_signature_fields(&value);
        let message = canonical::canonicalize(&stripped).unwrap();
        let sig = key.sign(&message);
        RawSignature {
            key_id: key_id.to_string(),
            signature_hex: hex::encode(sig.to_bytes()),
        }
    }

    #[test]
    fn threshold_met_with_distinct_signers() {
        let (genome, a, b, _c) = signed_genome();
        let sigs = vec![sign(&genome, "a", &a), sign(&genome, "b", &b)];
        let outcome = verify(&genome, &sigs);
        assert!(outcome.ok, "{:?}", outcome.signature_errors);
        assert_eq!(outcome.genome_id.len(), 64);
    }

    #[test]
    fn duplicate_signer_does_not_count_twice() {
        let (genome, a, _b, _c) = signed_genome();
        let sig1 = sign(&genome, "a", &a);
        let sig2 = sign(&genome, "a", &a);
        let outcome = verify(&genome, &[sig1, sig2]);
        assert!(!outcome.ok);
        assert!(outcome
            .signature_errors
            .iter()
            .any(|e| matches!(e, VerifyError::ThresholdUnmet { .. })));
    }

    #[test]
    fn unknown_signer_is_an_error_but_not_counted() {
        let (genome, a, _b, _c) = signed_genome();
        let sig1 = sign(&genome, "a", &a);
        let bogus = RawSignature {
            key_id: "ghost".into(),
            signature_hex: sig1.signature_hex.clone(),
        };
        let outcome = verify(&genome, &[sig1, bogus]);
        assert!(!outcome.ok);
        assert!(outcome
            .signature_errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownSignerKeyId(_))));
    }

    #[test]
    fn genome_id_stable_across_key_order() {
        let (genome, _a, _b, _c) = signed_genome();
        let id1 = genome_id(&genome).unwrap();

        let mut reordered = genome.clone();
        reordered.authority.signers.reverse();
        let id2 = genome_id(&reordered).unwrap();
        assert_ne!(
            id1, id2,
            "signer order is semantic content, not incidental key order"
        );
    }

    #[test]
    fn manifest_missing_file_is_reported() {
        let mut genome = signed_genome().0;
        genome.build_manifest.files.push(ManifestFile {
            path: "does-not-exist.bin".into(),
            sha256: "a".repeat(64),
        });
        let dir = tempfile::tempdir().unwrap();
        let report = verify_manifest(&genome, dir.path(), true);
        assert!(!report.ok());
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::ManifestFileMissing { .. })));
    }

    #[test]
    fn manifest_placeholder_rejected_in_strict_mode_only() {
        let mut genome = signed_genome().0;
        genome.build_manifest.files.push(ManifestFile {
            path: "x.bin".into(),
            sha256: "0xTODO_COMPUTE_THIS_VALUE".into(),
        });
        let dir = tempfile::tempdir().unwrap();
        let strict = verify_manifest(&genome, dir.path(), true);
        assert!(!strict.ok());
        let permissive = verify_manifest(&genome, dir.path(), false);
        assert!(permissive.ok());
    }

    #[test]
    fn manifest_hash_match_passes() {
        let mut genome = signed_genome().0;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("real.bin");
        std::fs::write(&file_path, b"hello").unwrap();
        let digest = hash::to_hex(&hash::sha256(b"hello"));
        genome.build_manifest.files.push(ManifestFile {
            path: "real.bin".into(),
            sha256: digest,
        });
        let report = verify_manifest(&genome, dir.path(), true);
        assert!(report.ok());
    }
}
