//! Administrative-status machine.
//!
//! Status (`pending → inDiscussion → completed/closed`) evolves fully
//! independently of the negotiation stage. `completed` and `closed` are
//! conventionally terminal in the domain, but the machine does not
//! hard-block transitions out of them; callers needing terminality enforce
//! it at the orchestration layer.

use crate::ledger::History;
use crate::TransitionError;
use chrono::{DateTime, Utc};
use connect_types::{Status, SubjectId};

/// Validates and applies administrative-status transitions.
pub struct StatusMachine;

impl StatusMachine {
    /// Validate a raw target value against the recognized status set.
    pub fn accept(target: &str) -> Result<Status, TransitionError> {
        Status::parse(target).ok_or_else(|| TransitionError::UnknownStatus(target.to_string()))
    }

    /// Apply a transition: set the status and append one history entry.
    ///
    /// Returns the server-assigned timestamp of the appended entry; the
    /// aggregate mirrors it into `last_status_at` so the derived field and
    /// the ledger can never disagree.
    pub fn apply(
        target: &str,
        status: &mut Status,
        history: &mut History<Status>,
        actor: Option<SubjectId>,
    ) -> Result<DateTime<Utc>, TransitionError> {
        let next = Self::accept(target)?;
        let now = Utc::now();
        *status = next;
        history.append(next, now, actor);
        Ok(now)
    }
}
