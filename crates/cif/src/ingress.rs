use kernel_core::payload::{self, PayloadRef};
use serde_json::Value;
use tracing::{debug, warn};

use crate::codes;
use crate::Cif;

#[derive(Debug, Clone)]
pub struct IngressContext {
    pub client_id: String,
    pub payload: PayloadRef,
    pub now_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IngressResult {
    pub allowed: bool,
    pub quarantined: bool,
    pub sanitized_payload: Value,
    pub violations: Vec<String>,
    pub rate_limit_remaining: u64,
}

impl IngressResult {
    fn malformed() -> Self {
        Self {
            allowed: false,
            quarantined: true,
            sanitized_payload: Value::Null,
            violations: vec![codes::CIF_INGRESS_MALFORMED.to_string()],
            rate_limit_remaining: 0,
        }
    }
}

impl Cif {
    /// Runs every ingress step in spec.md §4.F order. Each step is
    /// fail-closed: the first hard failure returns immediately with
    /// `allowed: false`.
    pub fn ingress(&self, ctx: IngressContext) -> IngressResult {
        // 1. canonicalize; a cycle or non-finite number is malformed and
        // quarantined (scenario S2).
        let value = match payload::to_canonical_value(&ctx.payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = ?e, "ingress payload failed canonicalization");
                return IngressResult::malformed();
            }
        };
        let canonical_bytes = match kernel_core::canonicalize(&value) {
            Ok(b) => b,
            Err(_) => return IngressResult::malformed(),
        };

        // 2. size cap.
        if canonical_bytes.len() > self.config.max_request_bytes {
            debug!(bytes = canonical_bytes.len(), "ingress payload too large");
            return IngressResult {
                allowed: false,
                quarantined: false,
                sanitized_payload: value,
                violations: vec![codes::CIF_REQUEST_TOO_LARGE.to_string()],
                rate_limit_remaining: 0,
            };
        }

        // 3. token-bucket rate limit.
        let remaining = match self.rate_limiter.try_acquire(&ctx.client_id, ctx.now_ms) {
            Some(remaining) => remaining,
            None => {
                warn!(client_id = %ctx.client_id, "ingress rate limited");
                return IngressResult {
                    allowed: false,
                    quarantined: false,
                    sanitized_payload: value,
                    violations: vec![codes::CIF_RATE_LIMITED.to_string()],
                    rate_limit_remaining: 0,
                };
            }
        };

        // 4. sanitize string leaves, then re-parse. `sanitize_value`
        // only rewrites strings in place, so re-parsing can't fail for
        // input that already canonicalized successfully.
        let sanitized = self.sanitize_value(&value);

        // 5. scan for quarantine patterns.
        let hits = self.scan_suspicious(&sanitized);
        if !hits.is_empty() {
            warn!(patterns = ?hits, "ingress payload quarantined");
            return IngressResult {
                allowed: false,
                quarantined: true,
                sanitized_payload: sanitized,
                violations: hits,
                rate_limit_remaining: remaining,
            };
        }

        IngressResult {
            allowed: true,
            quarantined: false,
            sanitized_payload: sanitized,
            violations: Vec::new(),
            rate_limit_remaining: remaining,
        }
    }
}
