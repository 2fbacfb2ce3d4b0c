//! Capability tokens: mint, sign, validate, single-use enforcement
//! (spec §4.E).
//!
//! Validation keeps the per-token use count in an internal, per-boot
//! `DashMap` keyed by `token_id` rather than returning a mutated copy the
//! caller has to thread through subsequent calls — the Open Questions
//! resolution in spec.md §9. Callers always pass the original,
//! never-mutated token.

pub mod error;

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use kernel_core::{CapabilityToken, TokenContext};
use proof::BootKey;
use serde_json::{json, Value};

pub use error::TokenError;

const DEFAULT_TTL_MS: u64 = 60_000;
const DEFAULT_MAX_USE: u32 = 1;

/// Fields the caller expects a token to match; `None` skips that check.
#[derive(Debug, Default, Clone)]
pub struct Expected {
    pub action_id: Option<String>,
    pub actor: Option<String>,
}

/// Mints a capability token for `action_id`, scoped to `actor`, after
/// confirming the action is registered. See [`signable_value`] for the
/// exact set of fields the signature covers.
pub fn mint(
    action_id: &str,
    actor: &str,
    context: TokenContext,
    boot_key: &BootKey,
    ttl_ms: Option<u64>,
    max_use: Option<u32>,
) -> Result<CapabilityToken, TokenError> {
    registry::validate(action_id)
        .map_err(|e| TokenError::MintFailed(action_id.to_string(), e.to_string()))?;

    let now = kernel_core::now_unix_ms();
    let ttl_ms = ttl_ms.unwrap_or(DEFAULT_TTL_MS);
    let mut token = CapabilityToken {
        token_id: random_token_id(),
        action_id: action_id.to_string(),
        actor: actor.to_string(),
        context,
        issued_at: kernel_core::format_rfc3339_ms(now),
        expires_at: kernel_core::format_rfc3339_ms(now + ttl_ms),
        max_use: max_use.unwrap_or(DEFAULT_MAX_USE),
        use_count: 0,
        boot_key_id: boot_key.boot_key_id().to_string(),
        signature: String::new(),
    };
    token.signature = sign(&token, boot_key);
    Ok(token)
}

fn random_token_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The signed payload is every field of the token except `signature`
/// itself; `boot_key_id` is included so a token can't be re-signed under
/// a different boot without the signature breaking.
fn signable_value(token: &CapabilityToken) -> Value {
    json!({
        "token_id": token.token_id,
        "action_id": token.action_id,
        "actor": token.actor,
        "context": {
            "route": token.context.route,
            "method": token.context.method,
            "request_hash": token.context.request_hash,
        },
        "issued_at": token.issued_at,
        "expires_at": token.expires_at,
        "max_use": token.max_use,
        "use_count": token.use_count,
        "boot_key_id": token.boot_key_id,
    })
}

fn sign(token: &CapabilityToken, boot_key: &BootKey) -> String {
    let value = signable_value(token);
    let bytes = kernel_core::canonicalize(&value).expect("token payload has no cycles");
    boot_key.sign(&bytes)
}

/// Tracks per-boot use counts for minted tokens. One instance lives for
/// the life of the process; validation against it is `O(1)` and performs
/// no I/O.
#[derive(Default)]
pub struct TokenValidator {
    use_counts: DashMap<String, u32>,
    monotonic_guard: AtomicU64,
}

impl TokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `token` against `boot_key` and `expected`, in the order
    /// the spec requires: boot session, signature, expiry, use count,
    /// then the caller's action/actor expectations. On success, when
    /// `increment_use` is set, the internal use count for this token is
    /// incremented; the token value handed back to the caller is
    /// unchanged.
    pub fn validate(
        &self,
        token: &CapabilityToken,
        boot_key: &BootKey,
        expected: &Expected,
        increment_use: bool,
    ) -> Result<(), TokenError> {
        if token.boot_key_id != boot_key.boot_key_id() {
            return Err(TokenError::WrongBoot);
        }

        let bytes = kernel_core::canonicalize(&signable_value(token))
            .expect("token payload has no cycles");
        if !boot_key.verify(&bytes, &token.signature) {
            return Err(TokenError::BadSignature);
        }

        let now = kernel_core::now_unix_ms();
        if now >= parse_rfc3339_ms(&token.expires_at).unwrap_or(0) {
            return Err(TokenError::Expired);
        }

        // Hold one `entry()` guard across the read-check-increment
        // sequence: `DashMap::entry` keeps the shard locked for the
        // guard's lifetime, so two threads validating the same
        // single-use token concurrently can't both observe
        // `current_use < max_use` before either one writes the
        // increment back. Matches `rate_limit::RateLimiter::try_acquire`'s
        // single-critical-section shape.
        let mut slot = self
            .use_counts
            .entry(token.token_id.clone())
            .or_insert(token.use_count);
        if *slot >= token.max_use {
            return Err(TokenError::Exhausted);
        }

        if let Some(expected_action) = &expected.action_id {
            if expected_action != &token.action_id {
                return Err(TokenError::ActionMismatch {
                    expected: expected_action.clone(),
                    found: token.action_id.clone(),
                });
            }
        }
        if let Some(expected_actor) = &expected.actor {
            if expected_actor != &token.actor {
                return Err(TokenError::ActorMismatch {
                    expected: expected_actor.clone(),
                    found: token.actor.clone(),
                });
            }
        }

        if increment_use {
            self.monotonic_guard.fetch_add(1, Ordering::Relaxed);
            *slot += 1;
        }

        Ok(())
    }

    /// Drops bookkeeping for tokens issued more than `max_age_ms` ago,
    /// relative to `now_ms`. Prevents the use-count map from growing
    /// without bound across a long-running process; callers invoke this
    /// on a timer, analogous to rate-limit bucket eviction in `cif`.
    pub fn evict_expired(&self, tokens: impl Iterator<Item = (String, String)>, now_ms: u64) {
        for (token_id, expires_at) in tokens {
            if parse_rfc3339_ms(&expires_at).unwrap_or(u64::MAX) <= now_ms {
                self.use_counts.remove(&token_id);
            }
        }
    }
}

fn parse_rfc3339_ms(s: &str) -> Option<u64> {
    // Tokens are always stamped by `kernel_core::format_rfc3339_ms`, so a
    // full RFC-3339 parser is unnecessary: only the shape this crate
    // itself produces needs to round-trip.
    let digits: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'T' || *c == '-' || *c == ':' || *c == '.')
        .collect();
    let (date, time) = digits.split_once('T')?;
    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;

    let time = time.trim_end_matches('Z');
    let (hms, millis) = time.split_once('.').unwrap_or((time, "0"));
    let mut hms_parts = hms.split(':');
    let hour: i64 = hms_parts.next()?.parse().ok()?;
    let minute: i64 = hms_parts.next()?.parse().ok()?;
    let second: i64 = hms_parts.next()?.parse().ok()?;
    let millis: i64 = millis.parse().ok()?;

    let days = days_from_civil(year, month, day);
    let total_ms = days * 86_400_000 + hour * 3_600_000 + minute * 60_000 + second * 1000 + millis;
    Some(total_ms.max(0) as u64)
}

/// Inverse of the `civil_from_days` algorithm in `kernel_core::time`.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TokenContext {
        TokenContext {
            route: Some("/do".into()),
            method: Some("POST".into()),
            request_hash: "a".repeat(64),
        }
    }

    fn key() -> BootKey {
        BootKey::from_bytes([3u8; 32])
    }

    #[test]
    fn mint_rejects_unregistered_action() {
        let err = mint("teleport", "alice", ctx(), &key(), None, None).unwrap_err();
        assert!(matches!(err, TokenError::MintFailed(_, _)));
    }

    #[test]
    fn mint_then_validate_succeeds_once() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, None, None).unwrap();
        let validator = TokenValidator::new();
        assert!(validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .is_ok());
    }

    #[test]
    fn second_validate_of_single_use_token_is_exhausted() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, None, None).unwrap();
        let validator = TokenValidator::new();
        validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .unwrap();
        let err = validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .unwrap_err();
        assert_eq!(err, TokenError::Exhausted);
    }

    #[test]
    fn token_from_previous_boot_is_rejected() {
        let token = mint("read", "alice", ctx(), &key(), None, None).unwrap();
        let other_boot = BootKey::from_bytes([4u8; 32]);
        let validator = TokenValidator::new();
        let err = validator
            .validate(&token, &other_boot, &Expected::default(), true)
            .unwrap_err();
        assert_eq!(err, TokenError::WrongBoot);
    }

    #[test]
    fn single_bit_flip_in_signature_fails_validation() {
        let boot_key = key();
        let mut token = mint("read", "alice", ctx(), &boot_key, None, None).unwrap();
        let mut bytes = hex::decode(&token.signature).unwrap();
        bytes[0] ^= 0x01;
        token.signature = hex::encode(bytes);
        let validator = TokenValidator::new();
        let err = validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn expired_token_is_rejected() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, Some(0), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let validator = TokenValidator::new();
        let err = validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn action_and_actor_expectations_are_enforced() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, None, None).unwrap();
        let validator = TokenValidator::new();
        let expected = Expected {
            action_id: Some("write".into()),
            actor: None,
        };
        let err = validator
            .validate(&token, &boot_key, &expected, false)
            .unwrap_err();
        assert!(matches!(err, TokenError::ActionMismatch { .. }));
    }

    #[test]
    fn validate_without_increment_can_be_called_repeatedly() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, None, None).unwrap();
        let validator = TokenValidator::new();
        assert!(validator
            .validate(&token, &boot_key, &Expected::default(), false)
            .is_ok());
        assert!(validator
            .validate(&token, &boot_key, &Expected::default(), false)
            .is_ok());
    }

    #[test]
    fn multi_use_token_is_exhausted_only_after_max_use() {
        let boot_key = key();
        let token = mint("read", "alice", ctx(), &boot_key, None, Some(2)).unwrap();
        let validator = TokenValidator::new();
        assert!(validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .is_ok());
        assert!(validator
            .validate(&token, &boot_key, &Expected::default(), true)
            .is_ok());
        assert_eq!(
            validator
                .validate(&token, &boot_key, &Expected::default(), true)
                .unwrap_err(),
            TokenError::Exhausted
        );
    }
}
