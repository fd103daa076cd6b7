use crate::StorageResult;
use async_trait::async_trait;
use connect_types::{ConnectionId, ProfileId};
use connect_workflow::Connection;

/// Generic query window for paged reads. A limit of 0 means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Storage interface for connection aggregates.
///
/// The aggregate is persisted whole: a history entry and the field change it
/// audits are committed together or not at all.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert a newly created connection. Fails with
    /// [`StorageError::Conflict`](crate::StorageError::Conflict) if the id
    /// already exists.
    async fn insert(&self, connection: Connection) -> StorageResult<()>;

    /// Load one connection by id.
    async fn load(&self, id: &ConnectionId) -> StorageResult<Option<Connection>>;

    /// Persist a mutated aggregate under the optimistic guard.
    ///
    /// The persisted version must equal `expected_version`; on mismatch the
    /// call fails with `Conflict` and nothing is written. Returns the newly
    /// persisted version on success.
    async fn save(&self, connection: Connection, expected_version: u64) -> StorageResult<u64>;

    /// List connections where the profile is buyer or supplier, most recent
    /// status change first.
    async fn list_for_profile(
        &self,
        profile: &ProfileId,
        window: QueryWindow,
    ) -> StorageResult<Vec<Connection>>;

    /// List connections across all owners, most recent status change first.
    /// Consumed by the privileged administrative surface only.
    async fn list_recent(&self, window: QueryWindow) -> StorageResult<Vec<Connection>>;
}
