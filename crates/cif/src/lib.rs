//! CIF — the ingress/egress firewall (spec §4.F).
//!
//! Every request passes through [`Cif::ingress`] before it reaches the
//! decision interface, and every response passes through [`Cif::egress`]
//! before it leaves the trust boundary. Pattern sets are compiled once in
//! [`Cif::new`] and reused for the life of the process.

pub mod codes;
pub mod config;
pub mod egress;
pub mod ingress;
pub mod patterns;
pub mod rate_limit;

use serde_json::Value;

pub use config::CifConfig;
pub use egress::{EgressContext, EgressResult};
pub use ingress::{IngressContext, IngressResult};

use patterns::{NamedPattern, SanitizerPattern};
use rate_limit::RateLimiter;

pub struct Cif {
    config: CifConfig,
    pii_patterns: Vec<NamedPattern>,
    secret_patterns: Vec<NamedPattern>,
    suspicious_patterns: Vec<NamedPattern>,
    sanitizers: Vec<SanitizerPattern>,
    rate_limiter: RateLimiter,
}

impl Cif {
    pub fn new(config: CifConfig) -> Self {
        let mut pii_patterns = patterns::default_pii_patterns();
        let mut secret_patterns = patterns::default_secret_patterns();
        let mut suspicious_patterns = patterns::default_suspicious_patterns();
        extend_custom(&mut pii_patterns, &config.extra_pii_patterns);
        extend_custom(&mut secret_patterns, &config.extra_secret_patterns);
        extend_custom(&mut suspicious_patterns, &config.extra_suspicious_patterns);

        let rate_limiter = RateLimiter::new(config.rate_limit.clone());
        Self {
            config,
            pii_patterns,
            secret_patterns,
            suspicious_patterns,
            sanitizers: patterns::default_sanitizers(),
            rate_limiter,
        }
    }

    /// Evicts rate-limit buckets idle for longer than `idle_ms`. Callers
    /// invoke this on a timer; it is never called implicitly from
    /// `ingress`.
    pub fn evict_idle_rate_buckets(&self, now_ms: u64, idle_ms: u64) {
        self.rate_limiter.evict_idle(now_ms, idle_ms);
    }

    fn sanitize_value(&self, value: &Value) -> Value {
        map_strings(value, |s| {
            let mut out = s.to_string();
            for sanitizer in &self.sanitizers {
                out = sanitizer.regex.replace_all(&out, sanitizer.replacement).into_owned();
            }
            out
        })
    }

    fn scan_suspicious(&self, value: &Value) -> Vec<String> {
        self.scan(value, &self.suspicious_patterns)
    }

    fn scan_pii(&self, value: &Value) -> bool {
        !self.scan(value, &self.pii_patterns).is_empty()
    }

    fn scan_secret(&self, value: &Value) -> bool {
        !self.scan(value, &self.secret_patterns).is_empty()
    }

    fn scan(&self, value: &Value, patterns: &[NamedPattern]) -> Vec<String> {
        let mut hits = Vec::new();
        visit_strings(value, &mut |s| {
            for pattern in patterns {
                if pattern.regex.is_match(s) {
                    hits.push(pattern.label.to_string());
                }
            }
        });
        hits
    }

    fn redact_value(&self, value: &Value) -> Value {
        let all_leak_patterns: Vec<&NamedPattern> = self
            .pii_patterns
            .iter()
            .chain(self.secret_patterns.iter())
            .collect();
        map_strings(value, |s| {
            if all_leak_patterns.iter().any(|p| p.regex.is_match(s)) {
                "[REDACTED]".to_string()
            } else {
                s.to_string()
            }
        })
    }
}

fn extend_custom(patterns: &mut Vec<NamedPattern>, extra: &[String]) {
    for raw in extra {
        if let Ok(regex) = regex::Regex::new(raw) {
            patterns.push(NamedPattern {
                label: "custom",
                regex,
            });
        }
    }
}

fn visit_strings(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| visit_strings(v, f)),
        Value::Object(map) => map.values().for_each(|v| visit_strings(v, f)),
        _ => {}
    }
}

fn map_strings(value: &Value, f: impl Fn(&str) -> String + Copy) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), map_strings(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}
