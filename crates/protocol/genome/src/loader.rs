//! Loads a genome file from disk and splits out its attached signatures.

use std::path::Path;

use kernel_core::Genome;

use crate::error::SchemaError;
use crate::verify::RawSignature;

/// Parses `bytes` as a genome document, returning the typed [`Genome`]
/// plus the raw signature entries extracted from its `signature` (single
/// object) or `signatures` (array) field, whichever is present.
pub fn parse(bytes: &[u8]) -> Result<(Genome, Vec<RawSignature>), SchemaError> {
    let genome: Genome =
        serde_json::from_slice(bytes).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
    let signatures = extract_signatures(&genome);
    Ok((genome, signatures))
}

/// Reads and parses the genome at `path`.
pub fn load(path: &Path) -> Result<(Genome, Vec<RawSignature>), SchemaError> {
    let bytes = std::fs::read(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse(&bytes)
}

fn extract_signatures(genome: &Genome) -> Vec<RawSignature> {
    if let Some(single) = &genome.signature {
        return raw_signatures_from_value(single);
    }
    if let Some(many) = &genome.signatures {
        return raw_signatures_from_value(many);
    }
    Vec::new()
}

fn raw_signatures_from_value(value: &serde_json::Value) -> Vec<RawSignature> {
    let entries: Vec<&serde_json::Value> = match value {
        serde_json::Value::Array(items) => items.iter().collect(),
        serde_json::Value::Object(_) => vec![value],
        _ => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let key_id = entry.get("key_id")?.as_str()?.to_string();
            let signature_hex = entry.get("signature")?.as_str()?.to_string();
            Some(RawSignature {
                key_id,
                signature_hex,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "schema_version":"genome.v0.1","name":"X","version":"1.0.0","parents":[],
        "created_at":"2025-01-01T00:00:00Z",
        "authority":{"signers":[{"key_id":"k1","alg":"ed25519","public_key":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}],"threshold":1},
        "invariants":[],"capabilities":[],"build_manifest":{"files":[]}
    }"#;

    #[test]
    fn minimal_genome_parses_with_no_signatures() {
        let (genome, sigs) = parse(MINIMAL.as_bytes()).unwrap();
        assert_eq!(genome.name, "X");
        assert!(sigs.is_empty());
    }

    #[test]
    fn single_signature_object_is_extracted() {
        let doc = MINIMAL.trim_end_matches('}').to_string()
            + r#", "signature":{"key_id":"k1","signature":"aa"}}"#;
        let (_genome, sigs) = parse(doc.as_bytes()).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].key_id, "k1");
    }

    #[test]
    fn signatures_array_is_extracted() {
        let doc = MINIMAL.trim_end_matches('}').to_string()
            + r#", "signatures":[{"key_id":"k1","signature":"aa"},{"key_id":"k1","signature":"bb"}]}"#;
        let (_genome, sigs) = parse(doc.as_bytes()).unwrap();
        assert_eq!(sigs.len(), 2);
    }

    #[test]
    fn malformed_json_is_a_schema_error() {
        assert!(parse(b"{not json").is_err());
    }
}
