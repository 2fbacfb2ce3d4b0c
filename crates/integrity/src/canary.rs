//! Named canary tests: known-bad inputs the kernel must always reject.
//! Run at boot and on a timer; any failure escalates posture to
//! FAIL_CLOSED (spec.md §4.K), since a canary failing means the stage
//! it exercises has silently stopped enforcing.

use crate::error::IntegrityError;

pub struct Canary {
    pub name: String,
    check: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Canary {
    pub fn new(name: impl Into<String>, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn run(&self) -> Result<(), IntegrityError> {
        if (self.check)() {
            Ok(())
        } else {
            Err(IntegrityError::CanaryFailed { name: self.name.clone() })
        }
    }
}

/// Holds the registered canaries and runs all of them, collecting every
/// failure rather than stopping at the first.
#[derive(Default)]
pub struct CanaryRegistry {
    canaries: Vec<Canary>,
}

impl CanaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, canary: Canary) {
        self.canaries.push(canary);
    }

    pub fn run_all(&self) -> Vec<IntegrityError> {
        self.canaries
            .iter()
            .filter_map(|c| c.run().err())
            .collect()
    }
}
