//! Per-boot HMAC key.
//!
//! Generated once when the process starts, held only in memory, and
//! discarded on shutdown. Every token and proof signed during this boot
//! is signed with this key; a token minted in a previous boot can never
//! validate again, because its `boot_key_id` won't match.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// A 256-bit key generated at process start, plus the short fingerprint
/// (`boot_key_id`) that tokens and proofs carry so a verifier can tell
/// whether they were issued under the current boot without needing the
/// raw key.
pub struct BootKey {
    key: [u8; 32],
    boot_key_id: String,
}

impl BootKey {
    /// Generates a fresh 256-bit key from a cryptographic RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::from_bytes(key)
    }

    /// Builds a `BootKey` from existing key material. Exposed for tests
    /// that need a deterministic key; production callers should use
    /// [`BootKey::generate`].
    pub fn from_bytes(key: [u8; 32]) -> Self {
        let boot_key_id = hex::encode(kernel_core::sha256(&key))[..16].to_string();
        Self { key, boot_key_id }
    }

    /// First 16 hex characters of SHA-256(key): stable for the life of
    /// the process, never reveals the key itself.
    pub fn boot_key_id(&self) -> &str {
        &self.boot_key_id
    }

    /// HMAC-SHA-256 over `message`, hex-encoded.
    pub fn sign(&self, message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies `signature_hex` against `message` in constant time.
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(&self.expected_raw(message)) else {
            return false;
        };
        let Ok(given) = hex::decode(signature_hex) else {
            return false;
        };
        if given.len() != expected.len() {
            return false;
        }
        expected.ct_eq(&given).into()
    }

    fn expected_raw(&self, message: &[u8]) -> String {
        self.sign(message)
    }
}
