//! In-memory reference implementation of the connection store.
//!
//! This adapter is deterministic and test-friendly. Production deployments
//! should use a transactional backend (feature `postgres`) for
//! source-of-truth data.

use crate::traits::{ConnectionStore, QueryWindow};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use connect_types::{ConnectionId, ProfileId};
use connect_workflow::Connection;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory connection store.
#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn insert(&self, connection: Connection) -> StorageResult<()> {
        let mut guard = self
            .connections
            .write()
            .map_err(|_| StorageError::Backend("connections lock poisoned".to_string()))?;

        if guard.contains_key(connection.id()) {
            return Err(StorageError::Conflict(format!(
                "connection {} already exists",
                connection.id()
            )));
        }

        guard.insert(connection.id().clone(), connection);
        Ok(())
    }

    async fn load(&self, id: &ConnectionId) -> StorageResult<Option<Connection>> {
        let guard = self
            .connections
            .read()
            .map_err(|_| StorageError::Backend("connections lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn save(&self, connection: Connection, expected_version: u64) -> StorageResult<u64> {
        let mut guard = self
            .connections
            .write()
            .map_err(|_| StorageError::Backend("connections lock poisoned".to_string()))?;

        let persisted = guard.get(connection.id()).ok_or_else(|| {
            StorageError::NotFound(format!("connection {} not found", connection.id()))
        })?;

        if persisted.version() != expected_version {
            return Err(StorageError::Conflict(format!(
                "connection {}: expected version {}, found {}",
                connection.id(),
                expected_version,
                persisted.version()
            )));
        }

        if connection.version() <= expected_version {
            return Err(StorageError::InvariantViolation(format!(
                "connection {}: save without a version increment ({} -> {})",
                connection.id(),
                expected_version,
                connection.version()
            )));
        }

        let version = connection.version();
        guard.insert(connection.id().clone(), connection);
        Ok(version)
    }

    async fn list_for_profile(
        &self,
        profile: &ProfileId,
        window: QueryWindow,
    ) -> StorageResult<Vec<Connection>> {
        let guard = self
            .connections
            .read()
            .map_err(|_| StorageError::Backend("connections lock poisoned".to_string()))?;
        let mut values = guard
            .values()
            .filter(|connection| connection.involves_profile(profile))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.last_status_at().cmp(&a.last_status_at()));
        Ok(apply_window(values, window))
    }

    async fn list_recent(&self, window: QueryWindow) -> StorageResult<Vec<Connection>> {
        let guard = self
            .connections
            .read()
            .map_err(|_| StorageError::Backend("connections lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.last_status_at().cmp(&a.last_status_at()));
        Ok(apply_window(values, window))
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_types::{MatchId, NegotiationPayload, SubjectId};
    use connect_workflow::NewConnection;

    fn connection(id: &str, buyer: &str, supplier: &str) -> Connection {
        Connection::create(NewConnection {
            id: ConnectionId::new(id),
            owner_id: SubjectId::new("u1"),
            match_id: MatchId::new("m1"),
            buyer_profile_id: ProfileId::new(buyer),
            supplier_profile_id: ProfileId::new(supplier),
            intro_message: "Interested in Q3 supply".to_string(),
            locale: "en".to_string(),
            payload: NegotiationPayload::default(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = InMemoryConnectionStore::new();
        store
            .insert(connection("c1", "buyer-1", "supplier-1"))
            .await
            .unwrap();
        let result = store.insert(connection("c1", "buyer-2", "supplier-2")).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn save_enforces_the_expected_version() {
        let store = InMemoryConnectionStore::new();
        let base = connection("c1", "buyer-1", "supplier-1");
        store.insert(base.clone()).await.unwrap();

        // Two callers load the same version-1 aggregate and race.
        let mut first = base.clone();
        first.apply_status("inDiscussion", None).unwrap();
        let mut second = base;
        second.apply_status("closed", None).unwrap();

        assert_eq!(store.save(first, 1).await.unwrap(), 2);
        let result = store.save(second, 1).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        // The loser changed nothing: persisted state is exactly the winner's.
        let persisted = store.load(&ConnectionId::new("c1")).await.unwrap().unwrap();
        assert_eq!(persisted.version(), 2);
        assert_eq!(persisted.status().as_str(), "inDiscussion");
        assert_eq!(persisted.status_history().len(), 2);
    }

    #[tokio::test]
    async fn save_rejects_unknown_connections() {
        let store = InMemoryConnectionStore::new();
        let result = store.save(connection("ghost", "b", "s"), 1).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_matches_either_party_newest_status_first() {
        let store = InMemoryConnectionStore::new();
        let as_buyer = connection("c1", "p1", "other-supplier");
        let mut as_supplier = connection("c2", "other-buyer", "p1");
        let unrelated = connection("c3", "x", "y");
        as_supplier.apply_status("inDiscussion", None).unwrap();

        store.insert(as_buyer).await.unwrap();
        store.insert(unrelated).await.unwrap();
        store.insert(as_supplier).await.unwrap();

        let listed = store
            .list_for_profile(&ProfileId::new("p1"), QueryWindow::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id(), &ConnectionId::new("c2"));
        assert_eq!(listed[1].id(), &ConnectionId::new("c1"));
    }

    #[tokio::test]
    async fn windowing_applies_offset_then_limit() {
        let store = InMemoryConnectionStore::new();
        for i in 0..5 {
            store
                .insert(connection(&format!("c{i}"), "p1", &format!("s{i}")))
                .await
                .unwrap();
        }

        let page = store
            .list_for_profile(&ProfileId::new("p1"), QueryWindow { limit: 2, offset: 1 })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let all = store
            .list_recent(QueryWindow::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }
}
