//! Connection workflow engine core.
//!
//! A connection is an introduction between a buyer profile and a supplier
//! profile that progresses through negotiation stages toward a deal, or is
//! closed. The aggregate carries two independent state machines (negotiation
//! stage and administrative status), each backed by an append-only history
//! ledger, and a version counter incremented on every accepted mutation so
//! the persistence layer can detect concurrent writes.
//!
//! Everything in this crate is synchronous and pure: persistence and
//! concurrency control live at the service boundary.

#![deny(unsafe_code)]

mod connection;
mod ledger;
mod stage;
mod status;

pub use connection::{Connection, NewConnection, ValidationError};
pub use ledger::{History, HistoryEntry};
pub use stage::StageMachine;
pub use status::StatusMachine;

use thiserror::Error;

/// Rejection of a stage/status transition whose target is not in the
/// recognized state set. Nothing is mutated and no history entry is
/// appended when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("unknown stage: {0:?}")]
    UnknownStage(String),

    #[error("unknown status: {0:?}")]
    UnknownStatus(String),
}
