//! Deployment status state machine.
//!
//! The lifecycle store that persists status lives elsewhere; this module only
//! decides which transitions are legal and enforces the validation gate on
//! activation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Draft,
    Testing,
    Pending,
    Active,
    Paused,
    Stopped,
    Error,
    Archived,
}

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("illegal status transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
    #[error("strategy cannot be activated: validation reported {errors} error(s)")]
    ValidationFailed { errors: usize },
    #[error("strategy cannot be activated without a validation result")]
    ValidationMissing,
}

impl DeploymentStatus {
    pub fn can_transition_to(self, to: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, to),
            (Draft, Testing)
                | (Testing, Draft)
                | (Testing, Pending)
                | (Pending, Active)
                | (Active, Paused)
                | (Active, Stopped)
                | (Active, Error)
                | (Paused, Active)
                | (Paused, Stopped)
                | (Paused, Archived)
                | (Stopped, Archived)
                | (Error, Testing)
                | (Error, Archived)
        )
    }

    /// Move to `to`, enforcing the transition table and the activation gate.
    pub fn transition(
        self,
        to: DeploymentStatus,
        validation: Option<&ValidationResult>,
    ) -> Result<DeploymentStatus, LifecycleError> {
        if !self.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from: self, to });
        }
        if to == DeploymentStatus::Active {
            let result = validation.ok_or(LifecycleError::ValidationMissing)?;
            if !result.valid {
                return Err(LifecycleError::ValidationFailed {
                    errors: result.errors.len(),
                });
            }
        }
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationResult;

    fn result(valid: bool) -> ValidationResult {
        ValidationResult {
            valid,
            ..ValidationResult::default()
        }
    }

    #[test]
    fn happy_path_to_archived() {
        let ok = result(true);
        let mut status = DeploymentStatus::Draft;
        for next in [
            DeploymentStatus::Testing,
            DeploymentStatus::Pending,
            DeploymentStatus::Active,
            DeploymentStatus::Stopped,
            DeploymentStatus::Archived,
        ] {
            status = status.transition(next, Some(&ok)).unwrap();
        }
        assert_eq!(status, DeploymentStatus::Archived);
    }

    #[test]
    fn activation_requires_valid_result() {
        let bad = result(false);
        assert_eq!(
            DeploymentStatus::Pending.transition(DeploymentStatus::Active, Some(&bad)),
            Err(LifecycleError::ValidationFailed { errors: 0 })
        );
        assert_eq!(
            DeploymentStatus::Pending.transition(DeploymentStatus::Active, None),
            Err(LifecycleError::ValidationMissing)
        );
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(matches!(
            DeploymentStatus::Draft.transition(DeploymentStatus::Active, Some(&result(true))),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert!(!DeploymentStatus::Archived.can_transition_to(DeploymentStatus::Draft));
    }
}
