//! SHA-256 helpers. Every crate in the kernel that needs a digest goes
//! through here rather than calling `sha2` directly, so there is exactly
//! one place that defines what "hash" means for this codebase.

use sha2::{Digest, Sha256};

/// Hashes `bytes` and returns the raw 32-byte digest.
#[must_use]
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hashes `bytes` and returns the digest as lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

/// Encodes a raw digest as lowercase hex.
#[must_use]
pub fn to_hex(digest: &[u8; 32]) -> String {
    hex::encode(digest)
}

/// Decodes a lowercase-hex digest back into its 32 raw bytes.
pub fn from_hex(s: &str) -> Result<[u8; 32], hex::FromHexError> {
    let bytes = hex::decode(s)?;
    let mut out = [0u8; 32];
    if bytes.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}
