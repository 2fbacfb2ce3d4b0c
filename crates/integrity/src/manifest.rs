use std::path::Path;

use kernel_core::{hash, BuildManifest};

use crate::error::IntegrityError;

/// Outcome of [`verify_module_hashes`]: every mismatch is collected, not
/// just the first, so operators see the full blast radius at once.
#[derive(Debug, Clone, Default)]
pub struct ModuleHashReport {
    pub errors: Vec<String>,
}

impl ModuleHashReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Re-hashes every file listed in `manifest` under `repo_root` and
/// compares it against the recorded digest. In `strict` mode a
/// placeholder hash (containing `TODO`) is an error rather than a
/// skip, mirroring the genome build-manifest check this is grounded on.
pub fn verify_module_hashes(manifest: &BuildManifest, repo_root: &Path, strict: bool) -> ModuleHashReport {
    let mut report = ModuleHashReport::default();

    for file in &manifest.files {
        if file.sha256.contains("TODO") {
            if strict {
                report.errors.push(
                    IntegrityError::PlaceholderInStrictMode { path: file.path.clone() }.to_string(),
                );
            }
            continue;
        }

        let full_path = repo_root.join(&file.path);
        let bytes = match std::fs::read(&full_path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report
                    .errors
                    .push(IntegrityError::FileMissing { path: file.path.clone() }.to_string());
                continue;
            }
            Err(e) => {
                report.errors.push(
                    IntegrityError::Io {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    }
                    .to_string(),
                );
                continue;
            }
        };

        let computed = hash::to_hex(&hash::sha256(&bytes));
        if computed != file.sha256 {
            report.errors.push(
                IntegrityError::HashMismatch {
                    path: file.path.clone(),
                    expected: file.sha256.clone(),
                    computed,
                }
                .to_string(),
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_core::ManifestFile;

    #[test]
    fn matching_hash_passes() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.rs");
        std::fs::write(&file_path, b"fn main() {}").unwrap();
        let digest = hash::to_hex(&hash::sha256(b"fn main() {}"));

        let manifest = BuildManifest {
            files: vec![ManifestFile { path: "a.rs".to_string(), sha256: digest }],
        };
        let report = verify_module_hashes(&manifest, dir.path(), false);
        assert!(report.ok());
    }

    #[test]
    fn mismatched_hash_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), b"fn main() {}").unwrap();

        let manifest = BuildManifest {
            files: vec![ManifestFile { path: "a.rs".to_string(), sha256: "0".repeat(64) }],
        };
        let report = verify_module_hashes(&manifest, dir.path(), false);
        assert!(!report.ok());
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = BuildManifest {
            files: vec![ManifestFile { path: "missing.rs".to_string(), sha256: "0".repeat(64) }],
        };
        let report = verify_module_hashes(&manifest, dir.path(), false);
        assert!(!report.ok());
    }

    #[test]
    fn placeholder_tolerated_unless_strict() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = BuildManifest {
            files: vec![ManifestFile { path: "a.rs".to_string(), sha256: "TODO".to_string() }],
        };
        assert!(verify_module_hashes(&manifest, dir.path(), false).ok());
        assert!(!verify_module_hashes(&manifest, dir.path(), true).ok());
    }
}
