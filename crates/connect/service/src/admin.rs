//! Administrative operations layered on top of the connection core.
//!
//! Privileged reads cross the access gate first; everything below the gate
//! is the same store the regular use cases run against. The gate is
//! consulted on every call, so a role change in the identity store takes
//! effect on the next request.

use crate::ServiceError;
use connect_access::AccessGate;
use connect_storage::{ConnectionStore, QueryWindow};
use connect_types::SubjectId;
use connect_workflow::Connection;
use std::sync::Arc;
use tracing::info;

/// Privileged read surface for back-office tooling.
pub struct AdminOps {
    gate: AccessGate,
    store: Arc<dyn ConnectionStore>,
}

impl AdminOps {
    pub fn new(gate: AccessGate, store: Arc<dyn ConnectionStore>) -> Self {
        Self { gate, store }
    }

    /// List the newest connections across all owners.
    ///
    /// Denials from the gate surface unchanged: `Unauthenticated` when the
    /// subject is missing or unknown, `Forbidden` when the role is not
    /// owner/admin.
    pub async fn list_recent(
        &self,
        subject: Option<&SubjectId>,
        window: QueryWindow,
    ) -> Result<Vec<Connection>, ServiceError> {
        let grant = self.gate.authorize(subject).await?;
        let connections = self.store.list_recent(window).await?;
        info!(
            subject = %grant.subject,
            role = ?grant.role,
            count = connections.len(),
            "admin listing served"
        );
        Ok(connections)
    }
}
