//! Access request model.
//!
//! An [`AccessRequest`] is either entity-directed or admin-directed. Entity
//! requests are assembled with [`EntityAccessRequestBuilder`] and are
//! immutable once built.

use crate::Privilege;
use std::collections::BTreeSet;
use std::fmt;
use strata_core::{Classification, EntityHeader};
use strata_registry::Registry;

/// Who is asking, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerIdentity {
    pub user: String,
    pub groups: BTreeSet<String>,
    pub client_ip: Option<String>,
    pub forwarded_addresses: Vec<String>,
    pub remote_ip: Option<String>,
}

impl CallerIdentity {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }
}

/// Request against a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAccessRequest {
    privilege: Privilege,
    caller: CallerIdentity,
    entity: Option<EntityHeader>,
    entity_id: String,
    classification: Option<Classification>,
    label: Option<String>,
    business_metadata: Option<String>,
    attributes: Option<Vec<String>>,
    system_attributes: Option<Vec<String>>,
    entity_type_and_all_supertypes: BTreeSet<String>,
    entity_classifications: BTreeSet<String>,
    classification_type_and_all_supertypes: BTreeSet<String>,
}

impl EntityAccessRequest {
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    pub fn entity(&self) -> Option<&EntityHeader> {
        self.entity.as_ref()
    }

    /// Resource identifier: the first unique attribute value, or the GUID.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        self.entity.as_ref().map(|e| e.type_name.as_str()).unwrap_or("")
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn business_metadata(&self) -> Option<&str> {
        self.business_metadata.as_deref()
    }

    /// Changed attribute names, when the request concerns an update.
    pub fn attributes(&self) -> Option<&[String]> {
        self.attributes.as_deref()
    }

    /// Changed system attribute names, when the request concerns an update.
    pub fn system_attributes(&self) -> Option<&[String]> {
        self.system_attributes.as_deref()
    }

    pub fn entity_type_and_all_supertypes(&self) -> &BTreeSet<String> {
        &self.entity_type_and_all_supertypes
    }

    /// Names of all classifications held by the target entity.
    pub fn entity_classifications(&self) -> &BTreeSet<String> {
        &self.entity_classifications
    }

    /// The requested classification type and all its supertypes.
    pub fn classification_type_and_all_supertypes(&self) -> &BTreeSet<String> {
        &self.classification_type_and_all_supertypes
    }
}

/// Request for a capability not tied to one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminAccessRequest {
    privilege: Privilege,
    caller: CallerIdentity,
}

impl AdminAccessRequest {
    pub fn new(privilege: Privilege, caller: CallerIdentity) -> Self {
        Self { privilege, caller }
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }
}

/// An authorization request.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessRequest {
    Entity(EntityAccessRequest),
    Admin(AdminAccessRequest),
}

impl AccessRequest {
    pub fn privilege(&self) -> Privilege {
        match self {
            AccessRequest::Entity(r) => r.privilege(),
            AccessRequest::Admin(r) => r.privilege(),
        }
    }

    pub fn caller(&self) -> &CallerIdentity {
        match self {
            AccessRequest::Entity(r) => r.caller(),
            AccessRequest::Admin(r) => r.caller(),
        }
    }

    pub fn as_entity(&self) -> Option<&EntityAccessRequest> {
        match self {
            AccessRequest::Entity(r) => Some(r),
            AccessRequest::Admin(_) => None,
        }
    }

    /// Human-readable resource description used in denial messages.
    pub fn resource(&self) -> String {
        match self {
            AccessRequest::Entity(r) => {
                let mut out = format!("on entity {}:{}", r.entity_type(), r.entity_id());
                if let Some(c) = r.classification() {
                    out.push_str(&format!(" classification={}", c.type_name));
                }
                if let Some(label) = r.label() {
                    out.push_str(&format!(" label={}", label));
                }
                if let Some(bm) = r.business_metadata() {
                    out.push_str(&format!(" businessMetadata={}", bm));
                }
                out
            }
            AccessRequest::Admin(_) => String::new(),
        }
    }
}

impl fmt::Display for AccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) {}", self.privilege(), self.caller().user, self.resource())
    }
}

impl From<EntityAccessRequest> for AccessRequest {
    fn from(r: EntityAccessRequest) -> Self {
        AccessRequest::Entity(r)
    }
}

impl From<AdminAccessRequest> for AccessRequest {
    fn from(r: AdminAccessRequest) -> Self {
        AccessRequest::Admin(r)
    }
}

/// Builder for an entity-directed request.
pub struct EntityAccessRequestBuilder<'r> {
    registry: &'r Registry,
    privilege: Privilege,
    caller: CallerIdentity,
    entity: Option<EntityHeader>,
    classification: Option<Classification>,
    label: Option<String>,
    business_metadata: Option<String>,
    attributes: Option<Vec<String>>,
    system_attributes: Option<Vec<String>>,
}

impl<'r> EntityAccessRequestBuilder<'r> {
    pub fn new(registry: &'r Registry, privilege: Privilege, caller: CallerIdentity) -> Self {
        Self {
            registry,
            privilege,
            caller,
            entity: None,
            classification: None,
            label: None,
            business_metadata: None,
            attributes: None,
            system_attributes: None,
        }
    }

    pub fn entity(mut self, entity: EntityHeader) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn business_metadata(mut self, namespace: impl Into<String>) -> Self {
        self.business_metadata = Some(namespace.into());
        self
    }

    pub fn attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn system_attributes(mut self, system_attributes: Vec<String>) -> Self {
        self.system_attributes = Some(system_attributes);
        self
    }

    pub fn build(self) -> AccessRequest {
        let entity_id = self
            .entity
            .as_ref()
            .map(|e| resource_id(self.registry, e))
            .unwrap_or_default();
        let entity_type_and_all_supertypes = self
            .entity
            .as_ref()
            .map(|e| self.registry.entity_type_and_all_supertypes(&e.type_name))
            .unwrap_or_default();
        let entity_classifications = self
            .entity
            .as_ref()
            .map(EntityHeader::classification_names)
            .unwrap_or_default();
        let classification_type_and_all_supertypes = self
            .classification
            .as_ref()
            .map(|c| self.registry.classification_type_and_all_supertypes(&c.type_name))
            .unwrap_or_default();

        AccessRequest::Entity(EntityAccessRequest {
            privilege: self.privilege,
            caller: self.caller,
            entity: self.entity,
            entity_id,
            classification: self.classification,
            label: self.label,
            business_metadata: self.business_metadata,
            attributes: self.attributes,
            system_attributes: self.system_attributes,
            entity_type_and_all_supertypes,
            entity_classifications,
            classification_type_and_all_supertypes,
        })
    }
}

fn resource_id(registry: &Registry, entity: &EntityHeader) -> String {
    registry
        .unique_attributes(&entity.type_name)
        .into_iter()
        .find_map(|def| entity.attributes.get(&def.name))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| entity.guid.to_string())
}
