//! Entity structures for the catalog.
//!
//! An [`Entity`] is the full typed record accepted by the mutation core; an
//! [`EntityHeader`] is the light-weight view handed to authorization and
//! change notification.

use crate::{Attributes, BusinessAttributes, Guid, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lifecycle status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityStatus {
    #[default]
    Active,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "ACTIVE",
            EntityStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an entity, either by GUID or by (type, unique-attribute tuple).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectId {
    pub guid: Option<Guid>,
    pub type_name: String,
    pub unique_attributes: Attributes,
}

impl ObjectId {
    /// Reference an entity by GUID.
    pub fn by_guid(guid: Guid, type_name: impl Into<String>) -> Self {
        Self {
            guid: Some(guid),
            type_name: type_name.into(),
            unique_attributes: Attributes::new(),
        }
    }

    /// Reference an entity by its unique-attribute tuple.
    pub fn by_unique_attributes(type_name: impl Into<String>, unique_attributes: Attributes) -> Self {
        Self {
            guid: None,
            type_name: type_name.into(),
            unique_attributes,
        }
    }

    /// The GUID, if one was given and it is not a batch-local placeholder.
    pub fn assigned_guid(&self) -> Option<&Guid> {
        self.guid.as_ref().filter(|g| g.is_assigned())
    }

    /// Canonical key of the (type, unique-attribute tuple) pair, usable as a map
    /// key. `None` when no unique attributes were given.
    pub fn unique_key(&self) -> Option<String> {
        if self.unique_attributes.is_empty() {
            return None;
        }
        let sorted: BTreeMap<_, _> = self.unique_attributes.iter().collect();
        let mut key = self.type_name.clone();
        for (name, value) in sorted {
            key.push('|');
            key.push_str(name);
            key.push('=');
            key.push_str(&value.to_string());
        }
        Some(key)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.guid, self.unique_key()) {
            (Some(guid), _) => write!(f, "{}#{}", self.type_name, guid),
            (None, Some(key)) => write!(f, "{}", key),
            (None, None) => write!(f, "{}#?", self.type_name),
        }
    }
}

/// A classification attached to an entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub type_name: String,
    pub attributes: Attributes,
    /// Entity the classification originates from; differs from the holder
    /// when the classification was propagated.
    pub entity_guid: Option<Guid>,
    pub propagate: Option<bool>,
}

impl Classification {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_entity_guid(mut self, guid: Guid) -> Self {
        self.entity_guid = Some(guid);
        self
    }

    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = Some(propagate);
        self
    }

    /// True if this classification is held directly by `holder` (not propagated).
    pub fn is_direct_on(&self, holder: &Guid) -> bool {
        match &self.entity_guid {
            None => true,
            Some(g) if g.is_empty() => true,
            Some(g) => g.as_str().eq_ignore_ascii_case(holder.as_str()),
        }
    }
}

/// System attribute names reported in access requests.
pub mod system_attrs {
    pub const HOME_ID: &str = "homeId";
    pub const CREATED_BY: &str = "createdBy";
    pub const CREATE_TIME: &str = "createTime";
    pub const UPDATED_BY: &str = "updatedBy";
    pub const UPDATE_TIME: &str = "updateTime";
    pub const STATUS: &str = "status";
    pub const PROVENANCE_TYPE: &str = "provenanceType";
    pub const IS_PROXY: &str = "isProxy";
    pub const VERSION: &str = "version";
}

/// A typed entity record.
///
/// Optional collections distinguish "not supplied" (`None`, leave persisted
/// state alone) from "supplied empty" (`Some(empty)`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub guid: Guid,
    pub type_name: String,
    pub attributes: Attributes,
    pub relationship_attributes: Attributes,
    pub custom_attributes: Option<BTreeMap<String, String>>,
    pub status: Option<EntityStatus>,
    pub classifications: Option<Vec<Classification>>,
    pub labels: Option<BTreeSet<String>>,
    pub business_attributes: Option<BusinessAttributes>,
    pub home_id: Option<String>,
    pub created_by: Option<String>,
    pub create_time: Option<i64>,
    pub updated_by: Option<String>,
    pub update_time: Option<i64>,
    pub version: i64,
    pub is_proxy: bool,
    pub provenance_type: i32,
    pub is_incomplete: bool,
}

impl Entity {
    /// Create an entity of the given type with the given (possibly temporary) GUID.
    pub fn new(type_name: impl Into<String>, guid: Guid) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.relationship_attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classifications
            .get_or_insert_with(Vec::new)
            .push(classification);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.get_or_insert_with(BTreeSet::new).insert(label.into());
        self
    }

    pub fn with_custom_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_business_attr(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.business_attributes
            .get_or_insert_with(BusinessAttributes::new)
            .entry(namespace.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    pub fn with_home_id(mut self, home_id: impl Into<String>) -> Self {
        self.home_id = Some(home_id.into());
        self
    }

    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// An object reference to this entity by GUID.
    pub fn object_id(&self) -> ObjectId {
        ObjectId::by_guid(self.guid.clone(), self.type_name.clone())
    }

    /// Every object reference held in attributes and relationship attributes.
    pub fn referenced_ids(&self) -> Vec<&ObjectId> {
        let mut out = Vec::new();
        for value in self
            .attributes
            .values()
            .chain(self.relationship_attributes.values())
        {
            value.collect_refs(&mut out);
        }
        out
    }
}

/// Light-weight view of an entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityHeader {
    pub guid: Guid,
    pub type_name: String,
    pub status: EntityStatus,
    pub attributes: Attributes,
    pub classifications: Vec<Classification>,
    pub labels: BTreeSet<String>,
}

impl EntityHeader {
    pub fn new(guid: Guid, type_name: impl Into<String>) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Names of all classifications on the entity, direct or propagated.
    pub fn classification_names(&self) -> BTreeSet<String> {
        self.classifications
            .iter()
            .map(|c| c.type_name.clone())
            .collect()
    }
}

impl From<&Entity> for EntityHeader {
    fn from(entity: &Entity) -> Self {
        Self {
            guid: entity.guid.clone(),
            type_name: entity.type_name.clone(),
            status: entity.status.unwrap_or_default(),
            attributes: entity.attributes.clone(),
            classifications: entity.classifications.clone().unwrap_or_default(),
            labels: entity.labels.clone().unwrap_or_default(),
        }
    }
}
