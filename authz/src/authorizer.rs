//! Authorizer contract and simple implementations.

use crate::{AccessRequest, AuthorizationError, AuthorizationResult, Privilege};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::debug;

/// Evaluates access requests. Only the contract is defined here; policy
/// engines plug in behind it.
pub trait Authorizer: Send + Sync {
    fn verify_access(&self, request: &AccessRequest) -> AuthorizationResult<()>;
}

/// Grants every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn verify_access(&self, _request: &AccessRequest) -> AuthorizationResult<()> {
        Ok(())
    }
}

/// A privilege grant, optionally limited to entity types (matched against
/// the target's type and supertypes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub privilege: Privilege,
    pub entity_types: BTreeSet<String>,
}

impl Grant {
    pub fn any(privilege: Privilege) -> Self {
        Self {
            privilege,
            entity_types: BTreeSet::new(),
        }
    }

    pub fn on_type(privilege: Privilege, entity_type: impl Into<String>) -> Self {
        Self {
            privilege,
            entity_types: [entity_type.into()].into_iter().collect(),
        }
    }

    fn permits(&self, request: &AccessRequest) -> bool {
        if self.privilege != request.privilege() {
            return false;
        }
        if self.entity_types.is_empty() {
            return true;
        }
        request
            .as_entity()
            .map(|r| {
                r.entity_type_and_all_supertypes()
                    .iter()
                    .any(|t| self.entity_types.contains(t))
            })
            .unwrap_or(false)
    }
}

/// Static grant table keyed by user and by group.
#[derive(Debug, Default, Clone)]
pub struct GrantTable {
    users: HashMap<String, Vec<Grant>>,
    groups: HashMap<String, Vec<Grant>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_user(mut self, user: impl Into<String>, grant: Grant) -> Self {
        self.users.entry(user.into()).or_default().push(grant);
        self
    }

    pub fn grant_group(mut self, group: impl Into<String>, grant: Grant) -> Self {
        self.groups.entry(group.into()).or_default().push(grant);
        self
    }

    /// Grant every listed privilege to a user on any entity.
    pub fn grant_user_all<I>(mut self, user: impl Into<String>, privileges: I) -> Self
    where
        I: IntoIterator<Item = Privilege>,
    {
        let grants = self.users.entry(user.into()).or_default();
        grants.extend(privileges.into_iter().map(Grant::any));
        self
    }
}

impl Authorizer for GrantTable {
    fn verify_access(&self, request: &AccessRequest) -> AuthorizationResult<()> {
        let caller = request.caller();
        let by_user = self.users.get(&caller.user).into_iter().flatten();
        let by_group = caller
            .groups
            .iter()
            .filter_map(|g| self.groups.get(g))
            .flatten();

        if by_user.chain(by_group).any(|g| g.permits(request)) {
            Ok(())
        } else {
            debug!(user = %caller.user, privilege = %request.privilege(), "access denied");
            Err(AuthorizationError::denied(
                caller.user.clone(),
                request.privilege(),
                request.resource(),
            ))
        }
    }
}

/// Wraps an authorizer and records every request it sees.
#[derive(Debug, Default)]
pub struct RecordingAuthorizer<A> {
    inner: A,
    requests: Mutex<Vec<AccessRequest>>,
}

impl<A: Authorizer> RecordingAuthorizer<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<AccessRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Requests seen for one privilege.
    pub fn requests_for(&self, privilege: Privilege) -> Vec<AccessRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.privilege() == privilege)
            .collect()
    }

    pub fn clear(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl<A: Authorizer> Authorizer for RecordingAuthorizer<A> {
    fn verify_access(&self, request: &AccessRequest) -> AuthorizationResult<()> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        self.inner.verify_access(request)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for std::sync::Arc<A> {
    fn verify_access(&self, request: &AccessRequest) -> AuthorizationResult<()> {
        (**self).verify_access(request)
    }
}
