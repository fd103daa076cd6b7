//! Request-level use cases for the connection workflow engine.
//!
//! The service is stateless: every call loads the aggregate from the store,
//! delegates the mutation to the aggregate's machines, and persists the
//! result under the store's optimistic guard. Two racing updates against the
//! same base version can never both succeed; the loser gets
//! [`ServiceError::VersionConflict`], no mutation is applied, and the
//! history never forks. Callers retry by reloading and resubmitting.

#![deny(unsafe_code)]

pub mod admin;

use connect_access::AccessError;
use connect_storage::{ConnectionStore, QueryWindow, StorageError};
use connect_types::{ConnectionId, MatchId, NegotiationPayload, ProfileId, SubjectId};
use connect_workflow::{Connection, NewConnection, TransitionError, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Per-request, recoverable failures. None is fatal to the process.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or illegal input. Reported, never retried automatically.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Target stage/status outside the recognized set. Reported, not retried.
    #[error(transparent)]
    InvalidState(#[from] TransitionError),

    /// Concurrent mutation race. Retryable: reload and resubmit.
    #[error("version conflict on connection {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: ConnectionId,
        expected: u64,
        found: u64,
    },

    #[error("connection not found: {0}")]
    NotFound(ConnectionId),

    /// Denial from the access gate (administrative surface only).
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Persistence backend fault.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Boundary input for connection creation.
#[derive(Clone, Debug)]
pub struct CreateConnectionInput {
    pub buyer_profile_id: ProfileId,
    pub supplier_profile_id: ProfileId,
    pub match_id: MatchId,
    pub intro_message: String,
    pub locale: String,
    pub payload: NegotiationPayload,
}

/// Orchestrates the connection use cases over a shared store.
pub struct ConnectionService {
    store: Arc<dyn ConnectionStore>,
}

impl ConnectionService {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// Create a connection on behalf of an authenticated owner.
    ///
    /// Entitlement beyond authentication (that the owner controls
    /// `buyer_profile_id`) is external policy, not checked here.
    pub async fn create_connection(
        &self,
        owner: &SubjectId,
        input: CreateConnectionInput,
    ) -> Result<Connection, ServiceError> {
        let connection = Connection::create(NewConnection {
            id: ConnectionId::generate(),
            owner_id: owner.clone(),
            match_id: input.match_id,
            buyer_profile_id: input.buyer_profile_id,
            supplier_profile_id: input.supplier_profile_id,
            intro_message: input.intro_message,
            locale: input.locale,
            payload: input.payload,
        })?;

        self.store.insert(connection.clone()).await?;
        info!(
            connection = %connection.id(),
            match_id = %connection.match_id(),
            "connection created"
        );
        Ok(connection)
    }

    /// All connections where the profile is buyer or supplier, most recent
    /// status change first.
    pub async fn list_for_owner(
        &self,
        profile: &ProfileId,
    ) -> Result<Vec<Connection>, ServiceError> {
        let connections = self
            .store
            .list_for_profile(profile, QueryWindow::default())
            .await?;
        debug!(profile = %profile, count = connections.len(), "listed connections");
        Ok(connections)
    }

    /// Fetch one connection by id.
    pub async fn get_one(&self, id: &ConnectionId) -> Result<Connection, ServiceError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Apply an administrative-status transition under the optimistic guard.
    pub async fn update_status(
        &self,
        subject: &SubjectId,
        id: &ConnectionId,
        target: &str,
        expected_version: u64,
    ) -> Result<Connection, ServiceError> {
        self.update(subject, id, expected_version, |connection, actor| {
            connection.apply_status(target, actor)
        })
        .await
    }

    /// Apply a negotiation-stage transition under the optimistic guard.
    pub async fn update_stage(
        &self,
        subject: &SubjectId,
        id: &ConnectionId,
        target: &str,
        expected_version: u64,
    ) -> Result<Connection, ServiceError> {
        self.update(subject, id, expected_version, |connection, actor| {
            connection.apply_stage(target, actor)
        })
        .await
    }

    /// Shared load -> check version -> mutate -> save path.
    ///
    /// The version is checked twice: once against the loaded aggregate so a
    /// stale caller fails before any work, and once inside the store's
    /// `save` so a racer that slipped in between cannot clobber the winner.
    async fn update(
        &self,
        subject: &SubjectId,
        id: &ConnectionId,
        expected_version: u64,
        mutate: impl FnOnce(&mut Connection, Option<SubjectId>) -> Result<(), TransitionError>,
    ) -> Result<Connection, ServiceError> {
        let mut connection = self.get_one(id).await?;

        if connection.version() != expected_version {
            warn!(
                connection = %id,
                expected = expected_version,
                found = connection.version(),
                "stale update rejected"
            );
            return Err(ServiceError::VersionConflict {
                id: id.clone(),
                expected: expected_version,
                found: connection.version(),
            });
        }

        mutate(&mut connection, Some(subject.clone()))?;

        match self.store.save(connection.clone(), expected_version).await {
            Ok(version) => {
                info!(connection = %id, version, "connection updated");
                Ok(connection)
            }
            Err(StorageError::Conflict(_)) => {
                // Lost the race between load and save; report retryable.
                let found = self
                    .store
                    .load(id)
                    .await?
                    .map(|current| current.version())
                    .unwrap_or(expected_version);
                Err(ServiceError::VersionConflict {
                    id: id.clone(),
                    expected: expected_version,
                    found,
                })
            }
            Err(other) => Err(ServiceError::Storage(other)),
        }
    }
}
