//! Negotiation-stage machine.
//!
//! Stages follow the canonical forward path `intro → reply → meeting →
//! review → deal`, but the machine only validates membership in that set.
//! Backward jumps, skipped stages, and re-application of the current stage
//! are all accepted; whether a particular move is good marketing practice is
//! orchestration policy, not a structural rule. Every accepted transition
//! appends one ledger entry.

use crate::ledger::History;
use crate::TransitionError;
use chrono::{DateTime, Utc};
use connect_types::{Stage, SubjectId};

/// Validates and applies negotiation-stage transitions.
pub struct StageMachine;

impl StageMachine {
    /// Validate a raw target value against the recognized stage set.
    pub fn accept(target: &str) -> Result<Stage, TransitionError> {
        Stage::parse(target).ok_or_else(|| TransitionError::UnknownStage(target.to_string()))
    }

    /// Apply a transition: set the stage and append one history entry.
    ///
    /// On rejection nothing is touched. Returns the server-assigned
    /// timestamp of the appended entry.
    pub fn apply(
        target: &str,
        stage: &mut Stage,
        history: &mut History<Stage>,
        actor: Option<SubjectId>,
    ) -> Result<DateTime<Utc>, TransitionError> {
        let next = Self::accept(target)?;
        let now = Utc::now();
        *stage = next;
        history.append(next, now, actor);
        Ok(now)
    }
}
