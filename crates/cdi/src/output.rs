use serde_json::Value;
use tracing::warn;

use crate::codes;
use crate::output_patterns::{honest_limits_rules, non_personhood_rules, OutputRule};
use crate::Cdi;

/// Traversal depth limit for the output scanner. The walk is iterative
/// (an explicit stack, not recursion) so a maliciously deep response
/// cannot exhaust the call stack; depth is bounded regardless, per
/// spec.md §9 Design Notes.
const MAX_SCAN_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct OutputCheckResult {
    pub allowed: bool,
    pub violations: Vec<String>,
    pub redacted_response: Value,
}

impl Cdi {
    /// Scans `content` for forbidden self-presentation claims and, in
    /// strict mode, cross-namespace leakage against `source_namespace`.
    pub fn check_output(&self, content: &Value, source_namespace: Option<&str>) -> OutputCheckResult {
        let mut violations = Vec::new();
        let hits = scan_leaves(content, &self.output_rules);
        if !hits.is_empty() {
            violations.push(codes::CDI_OUTPUT_VIOLATION.to_string());
            violations.extend(hits);
        }

        if self.config.strict_mode {
            if let Some(mismatch) = scan_cross_namespace(content, source_namespace) {
                warn!(found = %mismatch, "cross-namespace leakage detected");
                violations.push(codes::CDI_OUTPUT_VIOLATION.to_string());
                violations.push(format!("cross-namespace leakage: namespace_id '{mismatch}'"));
            }
        }

        let redacted = if violations.is_empty() {
            content.clone()
        } else {
            redact_leaves(content, &self.output_rules)
        };

        OutputCheckResult {
            allowed: violations.is_empty(),
            violations,
            redacted_response: redacted,
        }
    }
}

pub fn default_output_rules() -> Vec<OutputRule> {
    let mut rules = non_personhood_rules();
    rules.extend(honest_limits_rules());
    rules
}

fn scan_leaves(root: &Value, rules: &[OutputRule]) -> Vec<String> {
    let mut hits = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_SCAN_DEPTH {
            continue;
        }
        match value {
            Value::String(s) => {
                for rule in rules {
                    if rule.regex.is_match(s) {
                        hits.push(rule.label.to_string());
                    }
                }
            }
            Value::Array(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            Value::Object(map) => stack.extend(map.values().map(|v| (v, depth + 1))),
            _ => {}
        }
    }
    hits
}

fn redact_leaves(value: &Value, rules: &[OutputRule]) -> Value {
    match value {
        Value::String(s) => {
            let mut out = s.clone();
            for rule in rules {
                if rule.regex.is_match(&out) {
                    out = rule.regex.replace_all(&out, rule.replacement).into_owned();
                }
            }
            Value::String(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| redact_leaves(v, rules)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_leaves(v, rules)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Iterative, depth-limited walk looking for a `namespace_id` field
/// whose value differs from `source_namespace`. Returns the first
/// mismatching value found.
fn scan_cross_namespace(root: &Value, source_namespace: Option<&str>) -> Option<String> {
    let Some(source) = source_namespace else {
        return None;
    };
    let mut stack = vec![(root, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        if depth > MAX_SCAN_DEPTH {
            continue;
        }
        if let Value::Object(map) = value {
            if let Some(Value::String(namespace_id)) = map.get("namespace_id") {
                if namespace_id != source {
                    return Some(namespace_id.clone());
                }
            }
            stack.extend(map.values().map(|v| (v, depth + 1)));
        } else if let Value::Array(items) = value {
            stack.extend(items.iter().map(|v| (v, depth + 1)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CdiConfig;
    use serde_json::json;

    fn cdi() -> Cdi {
        Cdi::new(CdiConfig::default())
    }

    #[test]
    fn clean_output_is_allowed() {
        let result = cdi().check_output(&json!({"text": "the weather is nice today"}), None);
        assert!(result.allowed);
    }

    #[test]
    fn sentience_claim_is_denied_and_redacted() {
        let result = cdi().check_output(&json!({"text": "I am sentient"}), None);
        assert!(!result.allowed);
        assert!(result.redacted_response["text"]
            .as_str()
            .unwrap()
            .contains("REDACTED"));
    }

    #[test]
    fn cross_namespace_leak_is_caught_in_strict_mode() {
        let result = cdi().check_output(
            &json!({"namespace_id": "other-tenant", "text": "ok"}),
            Some("this-tenant"),
        );
        assert!(!result.allowed);
    }

    #[test]
    fn matching_namespace_is_allowed() {
        let result = cdi().check_output(
            &json!({"namespace_id": "this-tenant", "text": "ok"}),
            Some("this-tenant"),
        );
        assert!(result.allowed);
    }

    #[test]
    fn cross_namespace_check_is_skipped_outside_strict_mode() {
        let cdi = Cdi::new(CdiConfig { strict_mode: false });
        let result = cdi.check_output(
            &json!({"namespace_id": "other-tenant", "text": "ok"}),
            Some("this-tenant"),
        );
        assert!(result.allowed);
    }
}
