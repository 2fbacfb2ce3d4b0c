use serde::{Deserialize, Serialize};

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 1_000,
            max_requests: 50,
        }
    }
}

/// CIF configuration. Field defaults match spec.md §4.F / §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CifConfig {
    pub max_request_bytes: usize,
    pub max_response_bytes: usize,
    pub rate_limit: RateLimitConfig,
    /// Custom pattern additions; the built-in defaults in `patterns.rs`
    /// are always compiled in and these are appended to them.
    pub extra_pii_patterns: Vec<String>,
    pub extra_secret_patterns: Vec<String>,
    pub extra_suspicious_patterns: Vec<String>,
    pub audit_log: bool,
}

impl Default for CifConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: MIB,
            max_response_bytes: MIB,
            rate_limit: RateLimitConfig::default(),
            extra_pii_patterns: Vec::new(),
            extra_secret_patterns: Vec::new(),
            extra_suspicious_patterns: Vec::new(),
            audit_log: true,
        }
    }
}
