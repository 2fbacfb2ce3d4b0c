use kernel_core::payload::{self, PayloadRef};
use serde_json::Value;
use tracing::{debug, warn};

use crate::codes;
use crate::Cif;

#[derive(Debug, Clone)]
pub struct EgressContext {
    pub payload: PayloadRef,
}

#[derive(Debug, Clone)]
pub struct EgressResult {
    pub allowed: bool,
    pub sanitized_payload: Value,
    pub violations: Vec<String>,
    pub leaks_detected: Vec<String>,
}

impl Cif {
    /// Runs every egress step in spec.md §4.F order.
    pub fn egress(&self, ctx: EgressContext) -> EgressResult {
        // 1. estimate size before serializing; reject early on an
        // obviously oversized tree without paying for a full encode.
        let estimate = payload::estimate_size(&ctx.payload);
        if estimate > self.config.max_response_bytes {
            debug!(estimate, "egress payload estimated oversized");
            return EgressResult {
                allowed: false,
                sanitized_payload: Value::Null,
                violations: vec![codes::CIF_EGRESS_TOO_LARGE.to_string()],
                leaks_detected: Vec::new(),
            };
        }

        // 2. serialize canonically, fail-closed on a cycle.
        let value = match payload::to_canonical_value(&ctx.payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = ?e, "egress payload failed canonicalization");
                return EgressResult {
                    allowed: false,
                    sanitized_payload: Value::Null,
                    violations: vec![codes::CIF_EGRESS_MALFORMED.to_string()],
                    leaks_detected: Vec::new(),
                };
            }
        };
        let canonical_bytes = match kernel_core::canonicalize(&value) {
            Ok(b) => b,
            Err(_) => {
                return EgressResult {
                    allowed: false,
                    sanitized_payload: Value::Null,
                    violations: vec![codes::CIF_EGRESS_MALFORMED.to_string()],
                    leaks_detected: Vec::new(),
                }
            }
        };

        // 3. actual size cap.
        if canonical_bytes.len() > self.config.max_response_bytes {
            return EgressResult {
                allowed: false,
                sanitized_payload: value,
                violations: vec![codes::CIF_EGRESS_TOO_LARGE.to_string()],
                leaks_detected: Vec::new(),
            };
        }

        // 4 & 5. PII is informational; secrets are fatal.
        let mut leaks = Vec::new();
        let mut violations = Vec::new();

        if self.scan_pii(&value) {
            leaks.push("PII detected".to_string());
        }
        if self.scan_secret(&value) {
            warn!("egress payload contains a secret-shaped leak");
            leaks.push("Secrets detected".to_string());
            violations.push("Attempted secret leakage".to_string());
            violations.push(codes::CIF_SECRET_LEAK.to_string());
        }

        // 6. redact if anything was flagged.
        let sanitized = if leaks.is_empty() {
            value
        } else {
            self.redact_value(&value)
        };

        EgressResult {
            allowed: violations.is_empty(),
            sanitized_payload: sanitized,
            violations,
            leaks_detected: leaks,
        }
    }
}
