//! Posture manager: the kernel's global restrictiveness ladder (spec
//! §4.I). NORMAL -> DEFENSIVE -> FAIL_CLOSED. Current-state reads are
//! lock-free via an atomic; transitions serialize through a mutex
//! guarding the append-only history, per spec.md §5.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use kernel_core::{now_unix_ms, format_rfc3339_ms, Posture, PostureTransition};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostureError {
    #[error("posture is locked at {0:?}; an explicit unlock is required before downgrading")]
    Locked(Posture),

    #[error("operation '{op}' is not permitted in posture {posture:?}")]
    OperationDenied { op: Operation, posture: Posture },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Connect,
}

#[derive(Debug, Clone)]
pub struct PosturePolicy {
    pub allow_reads: bool,
    pub allow_writes: bool,
    pub allow_new_connections: bool,
    pub restrictions: Vec<String>,
}

fn posture_to_u8(p: Posture) -> u8 {
    match p {
        Posture::Normal => 0,
        Posture::Defensive => 1,
        Posture::FailClosed => 2,
    }
}

fn u8_to_posture(v: u8) -> Posture {
    match v {
        0 => Posture::Normal,
        1 => Posture::Defensive,
        _ => Posture::FailClosed,
    }
}

pub struct PostureManager {
    state: AtomicU8,
    locked: AtomicBool,
    history: Mutex<Vec<PostureTransition>>,
}

impl PostureManager {
    pub fn new(initial: Posture) -> Self {
        Self {
            state: AtomicU8::new(posture_to_u8(initial)),
            locked: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Posture {
        u8_to_posture(self.state.load(Ordering::Acquire))
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn history(&self) -> Vec<PostureTransition> {
        self.history.lock().clone()
    }

    pub fn escalate_to_defensive(&self, reason: &str) {
        self.transition(Posture::Defensive, reason, false, false);
    }

    pub fn escalate_to_fail_closed(&self, reason: &str, lock: bool) {
        self.transition(Posture::FailClosed, reason, false, lock);
    }

    /// Downgrades to `to`. Refuses when locked: an explicit [`unlock`]
    /// is required first. Severity is monotonic while locked, per
    /// spec.md §3.
    pub fn downgrade(&self, to: Posture, reason: &str, manual: bool) -> Result<(), PostureError> {
        if self.is_locked() {
            return Err(PostureError::Locked(self.current()));
        }
        self.transition(to, reason, manual, false);
        Ok(())
    }

    /// Clears the lock. Authentication is an integration concern (spec
    /// §4.I); this call always logs the transition with `automatic:
    /// false` and the caller-supplied reason, matching the Open
    /// Questions resolution in spec.md §9.
    pub fn unlock(&self, authorization_reason: &str) {
        self.locked.store(false, Ordering::Release);
        let current = self.current();
        self.record_transition(PostureTransition {
            from: current,
            to: current,
            reason: format!("unlock: {authorization_reason}"),
            timestamp: format_rfc3339_ms(now_unix_ms()),
            automatic: false,
        });
        info!(reason = authorization_reason, "posture unlocked");
    }

    fn transition(&self, to: Posture, reason: &str, manual: bool, lock: bool) {
        let from = self.current();
        self.state.store(posture_to_u8(to), Ordering::Release);
        if lock {
            self.locked.store(true, Ordering::Release);
        }
        let automatic = !manual;
        warn!(?from, ?to, reason, automatic, "posture transition");
        self.record_transition(PostureTransition {
            from,
            to,
            reason: reason.to_string(),
            timestamp: format_rfc3339_ms(now_unix_ms()),
            automatic,
        });
    }

    fn record_transition(&self, transition: PostureTransition) {
        self.history.lock().push(transition);
    }

    pub fn policy(&self) -> PosturePolicy {
        match self.current() {
            Posture::Normal => PosturePolicy {
                allow_reads: true,
                allow_writes: true,
                allow_new_connections: true,
                restrictions: Vec::new(),
            },
            Posture::Defensive => PosturePolicy {
                allow_reads: true,
                allow_writes: false,
                allow_new_connections: false,
                restrictions: vec![
                    "writes suspended".to_string(),
                    "no new outbound connections".to_string(),
                ],
            },
            Posture::FailClosed => PosturePolicy {
                allow_reads: false,
                allow_writes: false,
                allow_new_connections: false,
                restrictions: vec!["all operations suspended pending unlock".to_string()],
            },
        }
    }

    pub fn assert_allowed(&self, op: Operation) -> Result<(), PostureError> {
        let policy = self.policy();
        let allowed = match op {
            Operation::Read => policy.allow_reads,
            Operation::Write => policy.allow_writes,
            Operation::Connect => policy.allow_new_connections,
        };
        if allowed {
            Ok(())
        } else {
            Err(PostureError::OperationDenied {
                op,
                posture: self.current(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_given_initial_posture() {
        let manager = PostureManager::new(Posture::Normal);
        assert_eq!(manager.current(), Posture::Normal);
        assert!(!manager.is_locked());
    }

    #[test]
    fn escalation_is_recorded_as_automatic() {
        let manager = PostureManager::new(Posture::Normal);
        manager.escalate_to_defensive("resource pressure");
        assert_eq!(manager.current(), Posture::Defensive);
        let history = manager.history();
        assert_eq!(history.len(), 1);
        assert!(history[0].automatic);
    }

    #[test]
    fn locked_fail_closed_refuses_downgrade_until_unlocked() {
        let manager = PostureManager::new(Posture::Normal);
        manager.escalate_to_fail_closed("integrity failure", true);
        assert!(manager.downgrade(Posture::Normal, "looks fine now", true).is_err());
        manager.unlock("operator confirmed false positive");
        assert!(manager.downgrade(Posture::Normal, "resolved", true).is_ok());
        assert_eq!(manager.current(), Posture::Normal);
    }

    #[test]
    fn unlock_logs_a_manual_transition_with_reason() {
        let manager = PostureManager::new(Posture::Normal);
        manager.escalate_to_fail_closed("integrity failure", true);
        manager.unlock("operator confirmed false positive");
        let last = manager.history().last().cloned().unwrap();
        assert!(!last.automatic);
        assert!(last.reason.contains("operator confirmed false positive"));
    }

    #[test]
    fn fail_closed_policy_denies_everything() {
        let manager = PostureManager::new(Posture::FailClosed);
        assert!(manager.assert_allowed(Operation::Read).is_err());
        assert!(manager.assert_allowed(Operation::Write).is_err());
        assert!(manager.assert_allowed(Operation::Connect).is_err());
    }

    #[test]
    fn defensive_policy_allows_reads_only() {
        let manager = PostureManager::new(Posture::Defensive);
        assert!(manager.assert_allowed(Operation::Read).is_ok());
        assert!(manager.assert_allowed(Operation::Write).is_err());
    }
}
