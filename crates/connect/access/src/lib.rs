//! Access gate for privileged connection endpoints.
//!
//! Roles live in an external identity store as free strings; this crate
//! isolates that stringly-typed boundary to one adapter
//! ([`role_from_descriptor`]) and makes every authorization decision over
//! the closed [`Role`] set. The gate runs per request with no caching
//! across requests (a role can change between calls) and fails closed:
//! any ambiguity about identity or role resolves to denial, never to
//! silent allowance.

#![deny(unsafe_code)]

use async_trait::async_trait;
use connect_types::{Role, RoleDescriptor, SubjectId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Bounds on normalized role fields. Anything longer is oversized/garbage
/// input from the identity store and gets truncated before matching.
const MAX_ROLE_KIND_LEN: usize = 80;
const MAX_ROLE_NAME_LEN: usize = 120;

/// Authorization failure. All variants are denials; there is no partial
/// allowance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No resolvable subject: missing id, or the identity store does not
    /// know it.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The subject resolved to a role without privileged access.
    #[error("forbidden")]
    Forbidden,

    /// The identity store could not be consulted. Treated as a denial by
    /// callers; never an allowance.
    #[error("role resolution failed: {0}")]
    Resolver(String),
}

/// A granted authorization: who was allowed and as what.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    pub subject: SubjectId,
    pub role: Role,
}

/// Failure to consult the external identity store.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("identity store error: {0}")]
pub struct ResolverError(pub String);

/// Per-request role resolution against the external identity store.
///
/// `Ok(None)` means the subject is unknown there; the gate turns that into
/// `Unauthenticated`.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve_role(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<RoleDescriptor>, ResolverError>;
}

/// In-memory resolver for composition roots and tests.
#[derive(Default)]
pub struct StaticRoleResolver {
    roles: RwLock<HashMap<SubjectId, RoleDescriptor>>,
}

impl StaticRoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, subject: SubjectId, descriptor: RoleDescriptor) {
        if let Ok(mut roles) = self.roles.write() {
            roles.insert(subject, descriptor);
        }
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn resolve_role(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<RoleDescriptor>, ResolverError> {
        let roles = self
            .roles
            .read()
            .map_err(|_| ResolverError("roles lock poisoned".to_string()))?;
        Ok(roles.get(subject).cloned())
    }
}

/// Map a raw descriptor onto the closed role set.
///
/// Normalization: trim surrounding whitespace, lowercase, truncate to the
/// field bound. Both the role kind and the role name are considered: a
/// privileged match on either field wins, otherwise the first field that
/// maps to a known role.
pub fn role_from_descriptor(descriptor: &RoleDescriptor) -> Role {
    let kind_role = role_from_normalized(&normalize(&descriptor.kind, MAX_ROLE_KIND_LEN));
    let name_role = role_from_normalized(&normalize(&descriptor.name, MAX_ROLE_NAME_LEN));

    if kind_role.is_privileged() {
        kind_role
    } else if name_role.is_privileged() {
        name_role
    } else if kind_role != Role::Unknown {
        kind_role
    } else {
        name_role
    }
}

fn role_from_normalized(value: &str) -> Role {
    match value {
        "owner" => Role::Owner,
        "admin" => Role::Admin,
        "member" => Role::Member,
        _ => Role::Unknown,
    }
}

fn normalize(raw: &str, max_len: usize) -> String {
    let trimmed = raw.trim().to_lowercase();
    trimmed.chars().take(max_len).collect()
}

/// The authorization gate protecting privileged read endpoints.
pub struct AccessGate {
    resolver: Arc<dyn RoleResolver>,
}

impl AccessGate {
    pub fn new(resolver: Arc<dyn RoleResolver>) -> Self {
        Self { resolver }
    }

    /// Authorize a subject for privileged access.
    ///
    /// Allows only when the resolved role is `owner` or `admin` (by kind or
    /// name, case-insensitive). Everything else is a denial.
    pub async fn authorize(
        &self,
        subject: Option<&SubjectId>,
    ) -> Result<AccessGrant, AccessError> {
        let subject = subject.ok_or(AccessError::Unauthenticated)?;

        let descriptor = self
            .resolver
            .resolve_role(subject)
            .await
            .map_err(|e| AccessError::Resolver(e.0))?
            .ok_or(AccessError::Unauthenticated)?;

        let role = role_from_descriptor(&descriptor);
        if role.is_privileged() {
            Ok(AccessGrant {
                subject: subject.clone(),
                role,
            })
        } else {
            Err(AccessError::Forbidden)
        }
    }
}
