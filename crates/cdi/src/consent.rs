//! Per-actor consent state machine (spec §4.G).
//!
//! `active -> paused -> active`, `active -> stopped` (terminal until an
//! explicit clear). Absence of an actor in the map means `Active`: most
//! actors never touch consent state at all.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    Active,
    Paused,
    Stopped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsentError {
    #[error("actor '{0}' consent is stopped; pause/resume is not valid until an explicit clear")]
    Terminal(String),
}

#[derive(Default)]
pub struct ConsentMap {
    states: RwLock<HashMap<String, ConsentState>>,
}

impl ConsentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, actor: &str) -> ConsentState {
        self.states
            .read()
            .get(actor)
            .copied()
            .unwrap_or(ConsentState::Active)
    }

    /// A stop is unconditional: an actor can be stopped from any state.
    pub fn stop(&self, actor: &str) {
        self.states
            .write()
            .insert(actor.to_string(), ConsentState::Stopped);
    }

    pub fn pause(&self, actor: &str) -> Result<(), ConsentError> {
        let mut states = self.states.write();
        if matches!(states.get(actor), Some(ConsentState::Stopped)) {
            return Err(ConsentError::Terminal(actor.to_string()));
        }
        states.insert(actor.to_string(), ConsentState::Paused);
        Ok(())
    }

    pub fn resume(&self, actor: &str) -> Result<(), ConsentError> {
        let mut states = self.states.write();
        if matches!(states.get(actor), Some(ConsentState::Stopped)) {
            return Err(ConsentError::Terminal(actor.to_string()));
        }
        states.insert(actor.to_string(), ConsentState::Active);
        Ok(())
    }

    /// Explicit clear: the only way out of `Stopped`.
    pub fn clear(&self, actor: &str) {
        self.states.write().insert(actor.to_string(), ConsentState::Active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_actor_is_active() {
        let map = ConsentMap::new();
        assert_eq!(map.state("alice"), ConsentState::Active);
    }

    #[test]
    fn pause_then_resume_round_trips() {
        let map = ConsentMap::new();
        map.pause("alice").unwrap();
        assert_eq!(map.state("alice"), ConsentState::Paused);
        map.resume("alice").unwrap();
        assert_eq!(map.state("alice"), ConsentState::Active);
    }

    #[test]
    fn stop_is_terminal_until_cleared() {
        let map = ConsentMap::new();
        map.stop("alice");
        assert_eq!(map.state("alice"), ConsentState::Stopped);
        assert!(map.pause("alice").is_err());
        assert!(map.resume("alice").is_err());
        map.clear("alice");
        assert_eq!(map.state("alice"), ConsentState::Active);
    }
}
