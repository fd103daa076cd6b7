//! The connection aggregate.
//!
//! Owns invariant enforcement for the whole entity: identity fields are
//! immutable after creation, both state machines mutate their field and
//! ledger together, `last_status_at` always equals the last status ledger
//! entry's timestamp, and the version counter moves by exactly one per
//! accepted mutation. Direct field writes are impossible from outside this
//! module; everything goes through [`Connection::create`],
//! [`Connection::apply_stage`], or [`Connection::apply_status`].

use crate::ledger::History;
use crate::stage::StageMachine;
use crate::status::StatusMachine;
use crate::TransitionError;
use chrono::{DateTime, Utc};
use connect_types::{
    ConnectionId, Locale, MatchId, NegotiationPayload, ProfileId, Stage, Status, SubjectId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or illegal creation input. Reported to the caller, never
/// retried automatically.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("intro message must not be empty")]
    EmptyIntroMessage,

    #[error("buyer and supplier profiles must differ: {0}")]
    IdenticalParties(ProfileId),

    #[error("unrecognized locale: {0:?}")]
    UnknownLocale(String),
}

/// Creation input for a connection. The id is minted by the caller (the
/// service boundary or a dedicated id collaborator), never inside the
/// aggregate.
#[derive(Clone, Debug)]
pub struct NewConnection {
    pub id: ConnectionId,
    pub owner_id: SubjectId,
    pub match_id: MatchId,
    pub buyer_profile_id: ProfileId,
    pub supplier_profile_id: ProfileId,
    pub intro_message: String,
    pub locale: String,
    pub payload: NegotiationPayload,
}

/// An introduction between a buyer and a supplier, with its negotiation
/// stage, administrative status, and their audit ledgers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    id: ConnectionId,
    owner_id: SubjectId,
    match_id: MatchId,
    buyer_profile_id: ProfileId,
    supplier_profile_id: ProfileId,
    intro_message: String,
    locale: Locale,
    payload: NegotiationPayload,
    stage: Stage,
    stage_history: History<Stage>,
    status: Status,
    status_history: History<Status>,
    last_status_at: DateTime<Utc>,
    version: u64,
    created_at: DateTime<Utc>,
}

impl Connection {
    /// Default stage for a newly created connection: the match already
    /// carries the buyer's introduction, so the ball is in the supplier's
    /// court from the start.
    pub const INITIAL_STAGE: Stage = Stage::Reply;
    /// Default administrative status for a newly created connection.
    pub const INITIAL_STATUS: Status = Status::Pending;

    /// Validate input and build a fresh aggregate at version 1, with both
    /// ledgers seeded with one entry carrying the creation timestamp.
    pub fn create(input: NewConnection) -> Result<Self, ValidationError> {
        if input.intro_message.trim().is_empty() {
            return Err(ValidationError::EmptyIntroMessage);
        }
        if input.buyer_profile_id == input.supplier_profile_id {
            return Err(ValidationError::IdenticalParties(input.buyer_profile_id));
        }
        let locale =
            Locale::parse(&input.locale).ok_or(ValidationError::UnknownLocale(input.locale))?;

        let now = Utc::now();
        let actor = Some(input.owner_id.clone());
        Ok(Self {
            id: input.id,
            owner_id: input.owner_id,
            match_id: input.match_id,
            buyer_profile_id: input.buyer_profile_id,
            supplier_profile_id: input.supplier_profile_id,
            intro_message: input.intro_message,
            locale,
            payload: input.payload,
            stage: Self::INITIAL_STAGE,
            stage_history: History::seeded(Self::INITIAL_STAGE, now, actor.clone()),
            status: Self::INITIAL_STATUS,
            status_history: History::seeded(Self::INITIAL_STATUS, now, actor),
            last_status_at: now,
            version: 1,
            created_at: now,
        })
    }

    /// Apply a negotiation-stage transition.
    ///
    /// On acceptance the stage, its ledger, and the version counter move
    /// together; on rejection the aggregate is untouched.
    pub fn apply_stage(
        &mut self,
        target: &str,
        actor: Option<SubjectId>,
    ) -> Result<(), TransitionError> {
        StageMachine::apply(target, &mut self.stage, &mut self.stage_history, actor)?;
        self.version += 1;
        Ok(())
    }

    /// Apply an administrative-status transition.
    ///
    /// `last_status_at` is set to the appended ledger entry's timestamp, so
    /// the derived field can never drift from the audit trail.
    pub fn apply_status(
        &mut self,
        target: &str,
        actor: Option<SubjectId>,
    ) -> Result<(), TransitionError> {
        let at = StatusMachine::apply(target, &mut self.status, &mut self.status_history, actor)?;
        self.last_status_at = at;
        self.version += 1;
        Ok(())
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn owner_id(&self) -> &SubjectId {
        &self.owner_id
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn buyer_profile_id(&self) -> &ProfileId {
        &self.buyer_profile_id
    }

    pub fn supplier_profile_id(&self) -> &ProfileId {
        &self.supplier_profile_id
    }

    /// True when the given profile is either party of this connection.
    pub fn involves_profile(&self, profile: &ProfileId) -> bool {
        &self.buyer_profile_id == profile || &self.supplier_profile_id == profile
    }

    pub fn intro_message(&self) -> &str {
        &self.intro_message
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn payload(&self) -> &NegotiationPayload {
        &self.payload
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stage_history(&self) -> &History<Stage> {
        &self.stage_history
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn status_history(&self) -> &History<Status> {
        &self.status_history
    }

    pub fn last_status_at(&self) -> DateTime<Utc> {
        self.last_status_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_input() -> NewConnection {
        NewConnection {
            id: ConnectionId::new("c1"),
            owner_id: SubjectId::new("u1"),
            match_id: MatchId::new("m1"),
            buyer_profile_id: ProfileId::new("buyer-1"),
            supplier_profile_id: ProfileId::new("supplier-1"),
            intro_message: "Interested in Q3 supply".to_string(),
            locale: "fr".to_string(),
            payload: NegotiationPayload::default(),
        }
    }

    #[test]
    fn creation_seeds_both_ledgers_at_version_one() {
        let connection = Connection::create(valid_input()).unwrap();

        assert_eq!(connection.stage(), Stage::Reply);
        assert_eq!(connection.status(), Status::Pending);
        assert_eq!(connection.version(), 1);
        assert_eq!(connection.stage_history().len(), 1);
        assert_eq!(connection.status_history().len(), 1);
        assert_eq!(
            connection.stage_history().last().unwrap().value,
            connection.stage()
        );
        assert_eq!(
            connection.status_history().last().unwrap().value,
            connection.status()
        );
        assert_eq!(
            connection.last_status_at(),
            connection.status_history().last().unwrap().timestamp
        );
    }

    #[test]
    fn creation_rejects_blank_intro_message() {
        let mut input = valid_input();
        input.intro_message = "   ".to_string();
        assert_eq!(
            Connection::create(input).unwrap_err(),
            ValidationError::EmptyIntroMessage
        );
    }

    #[test]
    fn creation_rejects_identical_parties() {
        let mut input = valid_input();
        input.buyer_profile_id = ProfileId::new("p1");
        input.supplier_profile_id = ProfileId::new("p1");
        assert_eq!(
            Connection::create(input).unwrap_err(),
            ValidationError::IdenticalParties(ProfileId::new("p1"))
        );
    }

    #[test]
    fn creation_rejects_unknown_locale() {
        let mut input = valid_input();
        input.locale = "es".to_string();
        assert_eq!(
            Connection::create(input).unwrap_err(),
            ValidationError::UnknownLocale("es".to_string())
        );
    }

    #[test]
    fn accepted_stage_transition_moves_field_ledger_and_version_together() {
        let mut connection = Connection::create(valid_input()).unwrap();

        connection.apply_stage("meeting", None).unwrap();
        assert_eq!(connection.stage(), Stage::Meeting);
        assert_eq!(connection.stage_history().len(), 2);
        assert_eq!(connection.version(), 2);
        // Status side untouched: the machines are independent.
        assert_eq!(connection.status(), Status::Pending);
        assert_eq!(connection.status_history().len(), 1);
    }

    #[test]
    fn rejected_stage_transition_is_a_full_no_op() {
        let mut connection = Connection::create(valid_input()).unwrap();

        let err = connection.apply_stage("archived", None).unwrap_err();
        assert_eq!(err, TransitionError::UnknownStage("archived".to_string()));
        assert_eq!(connection.stage(), Stage::Reply);
        assert_eq!(connection.stage_history().len(), 1);
        assert_eq!(connection.version(), 1);
    }

    #[test]
    fn status_transition_keeps_last_status_at_in_lockstep() {
        let mut connection = Connection::create(valid_input()).unwrap();

        connection
            .apply_status("inDiscussion", Some(SubjectId::new("u2")))
            .unwrap();
        assert_eq!(connection.status(), Status::InDiscussion);
        assert_eq!(connection.status_history().len(), 2);
        assert_eq!(connection.version(), 2);
        let last = connection.status_history().last().unwrap();
        assert_eq!(connection.last_status_at(), last.timestamp);
        assert_eq!(last.actor, Some(SubjectId::new("u2")));
    }

    #[test]
    fn closed_connection_can_still_be_in_an_early_stage() {
        let mut connection = Connection::create(valid_input()).unwrap();

        connection.apply_stage("intro", None).unwrap();
        connection.apply_status("closed", None).unwrap();
        assert_eq!(connection.stage(), Stage::Intro);
        assert_eq!(connection.status(), Status::Closed);
    }

    #[test]
    fn reapplying_the_current_status_appends_a_duplicate_entry() {
        let mut connection = Connection::create(valid_input()).unwrap();

        connection.apply_status("pending", None).unwrap();
        assert_eq!(connection.status(), Status::Pending);
        assert_eq!(connection.status_history().len(), 2);
        assert_eq!(connection.version(), 2);
    }

    #[test]
    fn connection_round_trips_through_json() {
        let mut connection = Connection::create(valid_input()).unwrap();
        connection.apply_status("inDiscussion", None).unwrap();

        let json = serde_json::to_string(&connection).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, connection);
    }

    proptest! {
        #[test]
        fn ledger_grows_exactly_with_accepted_transitions(
            targets in proptest::collection::vec(
                prop_oneof![
                    Just("intro".to_string()),
                    Just("reply".to_string()),
                    Just("meeting".to_string()),
                    Just("review".to_string()),
                    Just("deal".to_string()),
                    "[a-z]{1,12}",
                ],
                0..32,
            )
        ) {
            let mut connection = Connection::create(valid_input()).unwrap();
            let mut accepted = 0u64;

            for target in &targets {
                if connection.apply_stage(target, None).is_ok() {
                    accepted += 1;
                }
            }

            prop_assert_eq!(connection.stage_history().len() as u64, 1 + accepted);
            prop_assert_eq!(connection.version(), 1 + accepted);
            prop_assert_eq!(
                connection.stage_history().last().unwrap().value,
                connection.stage()
            );
        }
    }
}
