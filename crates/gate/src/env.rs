//! Reads the three recognized environment variables (spec.md §6):
//! `{PREFIX}_GENOME_PATH`, `{PREFIX}_VERIFY_MANIFEST`, `{PREFIX}_ENV`.
//! Binding this to a transport or CLI is out of scope; only the loader
//! is provided.

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub genome_path: Option<PathBuf>,
    pub verify_manifest: bool,
    /// `production` forces strict manifest verification regardless of
    /// `verify_manifest`, per spec.md §6.
    pub environment: String,
}

impl EnvConfig {
    pub fn from_prefixed_env(prefix: &str) -> Self {
        let genome_path = std::env::var(format!("{prefix}_GENOME_PATH"))
            .ok()
            .map(PathBuf::from);
        let verify_manifest = std::env::var(format!("{prefix}_VERIFY_MANIFEST"))
            .ok()
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let environment = std::env::var(format!("{prefix}_ENV")).unwrap_or_default();

        Self {
            genome_path,
            verify_manifest,
            environment,
        }
    }

    /// `production` always implies strict manifest verification, on top
    /// of whatever `{PREFIX}_VERIFY_MANIFEST` said.
    pub fn strict_manifest(&self) -> bool {
        self.verify_manifest || self.is_production()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
