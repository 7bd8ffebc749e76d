//! Persisted entity vertex.

use std::collections::{BTreeMap, BTreeSet};
use strata_core::{
    Attributes, BusinessAttributes, Classification, Entity, EntityHeader, EntityStatus, Guid,
    ObjectId,
};

/// A persisted graph node representing one entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vertex {
    pub guid: Guid,
    pub type_name: String,
    pub status: EntityStatus,
    pub attributes: Attributes,
    pub relationship_attributes: Attributes,
    pub custom_attributes: BTreeMap<String, String>,
    pub classifications: Vec<Classification>,
    pub labels: BTreeSet<String>,
    pub business_attributes: BusinessAttributes,
    pub home_id: Option<String>,
    pub created_by: Option<String>,
    pub create_time: i64,
    pub updated_by: Option<String>,
    pub update_time: i64,
    pub version: i64,
    pub is_proxy: bool,
    pub provenance_type: i32,
    pub is_incomplete: bool,
}

impl Vertex {
    pub fn new(guid: Guid, type_name: impl Into<String>) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted
    }

    /// Classifications held directly (not propagated from another entity).
    pub fn direct_classifications(&self) -> impl Iterator<Item = &Classification> {
        self.classifications
            .iter()
            .filter(|c| c.is_direct_on(&self.guid))
    }

    /// Find the direct association of a classification type.
    pub fn direct_classification(&self, type_name: &str) -> Option<&Classification> {
        self.direct_classifications()
            .find(|c| c.type_name == type_name)
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::by_guid(self.guid.clone(), self.type_name.clone())
    }

    pub fn header(&self) -> EntityHeader {
        EntityHeader {
            guid: self.guid.clone(),
            type_name: self.type_name.clone(),
            status: self.status,
            attributes: self.attributes.clone(),
            classifications: self.classifications.clone(),
            labels: self.labels.clone(),
        }
    }

    /// Full entity view of this vertex.
    pub fn to_entity(&self) -> Entity {
        Entity {
            guid: self.guid.clone(),
            type_name: self.type_name.clone(),
            attributes: self.attributes.clone(),
            relationship_attributes: self.relationship_attributes.clone(),
            custom_attributes: Some(self.custom_attributes.clone()),
            status: Some(self.status),
            classifications: Some(self.classifications.clone()),
            labels: Some(self.labels.clone()),
            business_attributes: Some(self.business_attributes.clone()),
            home_id: self.home_id.clone(),
            created_by: self.created_by.clone(),
            create_time: Some(self.create_time),
            updated_by: self.updated_by.clone(),
            update_time: Some(self.update_time),
            version: self.version,
            is_proxy: self.is_proxy,
            provenance_type: self.provenance_type,
            is_incomplete: self.is_incomplete,
        }
    }
}
