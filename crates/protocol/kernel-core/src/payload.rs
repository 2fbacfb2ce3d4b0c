//! A request/response payload tree that can, deliberately, contain cycles.
//!
//! Ingress and egress both have to reject adversarial self-referential
//! payloads (spec scenario S2). `serde_json::Value` cannot represent a
//! cycle at all -- it is a tree -- so it cannot exercise that code path.
//! `Payload` is the same shape as JSON but built from `Rc<RefCell<_>>`
//! nodes, so a caller (or a fuzzer) can wire a node back to one of its own
//! ancestors and hand it to the canonicalizer.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::CanonError;

pub type PayloadRef = Rc<RefCell<Payload>>;

#[derive(Debug, Clone)]
pub enum Payload {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PayloadRef>),
    Object(BTreeMap<String, PayloadRef>),
}

impl Payload {
    pub fn into_ref(self) -> PayloadRef {
        Rc::new(RefCell::new(self))
    }

    pub fn null_ref() -> PayloadRef {
        Payload::Null.into_ref()
    }

    pub fn object(fields: impl IntoIterator<Item = (String, PayloadRef)>) -> PayloadRef {
        Payload::Object(fields.into_iter().collect()).into_ref()
    }

    pub fn array(items: impl IntoIterator<Item = PayloadRef>) -> PayloadRef {
        Payload::Array(items.into_iter().collect()).into_ref()
    }

    pub fn string(s: impl Into<String>) -> PayloadRef {
        Payload::String(s.into()).into_ref()
    }

    pub fn number(n: f64) -> PayloadRef {
        Payload::Number(n).into_ref()
    }

    pub fn bool(b: bool) -> PayloadRef {
        Payload::Bool(b).into_ref()
    }
}

/// Converts a `serde_json::Value` into a cycle-free `Payload` tree.
pub fn from_json(value: &Value) -> PayloadRef {
    match value {
        Value::Null => Payload::null_ref(),
        Value::Bool(b) => Payload::bool(*b),
        Value::Number(n) => Payload::number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Payload::string(s.clone()),
        Value::Array(arr) => Payload::array(arr.iter().map(from_json)),
        Value::Object(map) => {
            Payload::object(map.iter().map(|(k, v)| (k.clone(), from_json(v))))
        }
    }
}

/// Walks `payload` and converts it to a `serde_json::Value`, failing if the
/// same node reappears among its own ancestors (a true cycle). Siblings or
/// diamonds that share a node (a DAG, not a cycle) are permitted: the
/// ancestor set is popped on the way back up the recursion.
pub fn to_canonical_value(payload: &PayloadRef) -> Result<Value, CanonError> {
    let mut ancestors = HashSet::new();
    to_value_rec(payload, &mut ancestors)
}

fn to_value_rec(payload: &PayloadRef, ancestors: &mut HashSet<usize>) -> Result<Value, CanonError> {
    let ptr = Rc::as_ptr(payload) as usize;
    if !ancestors.insert(ptr) {
        return Err(CanonError::Cycle);
    }
    let result = match &*payload.borrow() {
        Payload::Null => Ok(Value::Null),
        Payload::Bool(b) => Ok(Value::Bool(*b)),
        Payload::Number(n) => {
            if !n.is_finite() {
                Err(CanonError::NonFiniteNumber)
            } else {
                Ok(serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null))
            }
        }
        Payload::String(s) => Ok(Value::String(s.clone())),
        Payload::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_value_rec(item, ancestors)?);
            }
            Ok(Value::Array(out))
        }
        Payload::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (k, v) in fields {
                out.insert(k.clone(), to_value_rec(v, ancestors)?);
            }
            Ok(Value::Object(out))
        }
    };
    ancestors.remove(&ptr);
    result
}

/// Estimates the serialized size of `payload` in bytes without allocating
/// the serialized form. Strings are weighted by character count; a cycle
/// is detected via the same ancestor-set walk as [`to_canonical_value`] but,
/// rather than failing, the repeated branch is skipped (counted as zero
/// additional bytes) so a malicious cyclic payload cannot be used to hang
/// the size check itself. The real cycle rejection happens later, when
/// [`to_canonical_value`] is called to actually serialize the payload.
pub fn estimate_size(payload: &PayloadRef) -> usize {
    let mut ancestors = HashSet::new();
    estimate_rec(payload, &mut ancestors)
}

fn estimate_rec(payload: &PayloadRef, ancestors: &mut HashSet<usize>) -> usize {
    let ptr = Rc::as_ptr(payload) as usize;
    if !ancestors.insert(ptr) {
        return 0;
    }
    let size = match &*payload.borrow() {
        Payload::Null => 4,
        Payload::Bool(_) => 5,
        Payload::Number(n) => format!("{n}").len(),
        Payload::String(s) => s.chars().count() + 2,
        Payload::Array(items) => {
            2 + items.iter().map(|i| estimate_rec(i, ancestors) + 1).sum::<usize>()
        }
        Payload::Object(fields) => {
            2 + fields
                .iter()
                .map(|(k, v)| k.len() + 3 + estimate_rec(v, ancestors) + 1)
                .sum::<usize>()
        }
    };
    ancestors.remove(&ptr);
    size
}
