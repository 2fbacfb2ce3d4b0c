//! Canonical JSON encoding.
//!
//! Produces a byte-stable encoding for any `serde_json::Value`: object keys
//! sorted lexicographically at every depth, no insignificant whitespace,
//! array order preserved, numbers in `serde_json`'s shortest round-trip
//! form. Two values with identical semantic content but different key
//! order or whitespace canonicalize to identical bytes.
//!
//! The deep sort falls out of a property of this workspace rather than an
//! explicit sorting pass: `serde_json::Map` is backed by a `BTreeMap`
//! whenever the `preserve_order` feature is disabled, which it is
//! everywhere in this workspace. `serde_json::to_vec` therefore already
//! walks every nested object in sorted key order. A prior iteration of
//! this codebase sorted only the top-level keys before delegating to
//! `serde_json`; that shallow approach does not canonicalize nested
//! objects and must not be reintroduced.

use serde_json::Value;

use crate::error::CanonError;

/// Encodes `value` into its canonical byte form.
///
/// Fails if `value` contains a non-finite number (NaN / infinity), which
/// has no representation in JSON.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonError> {
    reject_non_finite(value)?;
    serde_json::to_vec(value).map_err(|_| CanonError::NonFiniteNumber)
}

fn reject_non_finite(value: &Value) -> Result<(), CanonError> {
    match value {
        Value::Number(n) => {
            if n.as_f64().map(|f| !f.is_finite()).unwrap_or(false) {
                return Err(CanonError::NonFiniteNumber);
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_non_finite),
        Value::Object(map) => map.values().try_for_each(reject_non_finite),
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

/// Canonicalizes `value` and returns the SHA-256 hex digest of the
/// resulting bytes.
pub fn sha256_hex(value: &Value) -> Result<String, CanonError> {
    let bytes = canonicalize(value)?;
    Ok(crate::hash::sha256_hex(&bytes))
}

/// Strips `signature` and `signatures` fields from a top-level JSON object
/// before canonicalizing a genome, per the data model's invariant that
/// genome ID is computed over the genome *without* its signature(s).
/// Returns the value unchanged if it is not an object.
pub fn strip_signature_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = map.clone();
            out.remove("signature");
            out.remove("signatures");
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_output() {
        let a = json!({"b": 1, "a": 2, "z": {"y": 1, "x": 2}});
        let b = json!({"a": 2, "z": {"x": 2, "y": 1}, "b": 1});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn deep_nesting_is_sorted_not_just_top_level() {
        let value = json!({"outer": {"zeta": 1, "alpha": 2}});
        let bytes = canonicalize(&value).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
    }

    #[test]
    fn array_order_is_preserved() {
        let value = json!([3, 1, 2]);
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(bytes, b"[3,1,2]");
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"a": 1});
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(bytes, b"{\"a\":1}");
    }

    #[test]
    fn strips_signature_and_signatures() {
        let with_sig = json!({"name": "x", "signature": {"sig": "abc"}});
        let with_sigs = json!({"name": "x", "signatures": [{"sig": "abc"}]});
        let bare = json!({"name": "x"});
        assert_eq!(
            canonicalize(&strip_signature_fields(&with_sig)).unwrap(),
            canonicalize(&bare).unwrap()
        );
        assert_eq!(
            canonicalize(&strip_signature_fields(&with_sigs)).unwrap(),
            canonicalize(&bare).unwrap()
        );
    }

    #[test]
    fn hashes_are_stable_across_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(sha256_hex(&a).unwrap(), sha256_hex(&b).unwrap());
        assert!(sha256_hex(&a).unwrap().len() == 64);
    }
}
