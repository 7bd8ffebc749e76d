//! Staged partition of a batch.

use crate::DiscoveryContext;
use std::collections::{BTreeSet, HashMap};
use strata_core::{Entity, Guid, Value};

/// The created / updated / deleted / reactivated partition of one batch,
/// plus the GUID assignments made while building it.
///
/// Entities are held with their final GUIDs.
#[derive(Debug, Clone, Default)]
pub struct EntityMutationContext {
    discovery: DiscoveryContext,
    created: Vec<Entity>,
    updated: Vec<Entity>,
    reactivated: BTreeSet<Guid>,
    entities_to_delete: Vec<Guid>,
    guid_assignments: HashMap<Guid, Guid>,
}

impl EntityMutationContext {
    pub fn new(discovery: DiscoveryContext) -> Self {
        Self {
            discovery,
            ..Default::default()
        }
    }

    pub fn discovery(&self) -> &DiscoveryContext {
        &self.discovery
    }

    pub fn add_created(&mut self, entity: Entity, reactivated: bool) {
        if reactivated {
            self.reactivated.insert(entity.guid.clone());
        }
        self.created.push(entity);
    }

    pub fn add_updated(&mut self, entity: Entity) {
        self.updated.push(entity);
    }

    /// Take an entity out of the updated set.
    pub fn remove_updated(&mut self, guid: &Guid) -> Option<Entity> {
        let pos = self.updated.iter().position(|e| &e.guid == guid)?;
        Some(self.updated.remove(pos))
    }

    pub fn created(&self) -> &[Entity] {
        &self.created
    }

    pub fn updated(&self) -> &[Entity] {
        &self.updated
    }

    pub fn is_created(&self, guid: &Guid) -> bool {
        self.created.iter().any(|e| &e.guid == guid)
    }

    pub fn is_reactivated(&self, guid: &Guid) -> bool {
        self.reactivated.contains(guid)
    }

    pub fn add_entity_to_delete(&mut self, guid: Guid) {
        if !self.entities_to_delete.contains(&guid) {
            self.entities_to_delete.push(guid);
        }
    }

    pub fn entities_to_delete(&self) -> &[Guid] {
        &self.entities_to_delete
    }

    pub fn add_guid_assignment(&mut self, from: Guid, to: Guid) {
        self.guid_assignments.insert(from, to);
    }

    pub fn guid_assignments(&self) -> &HashMap<Guid, Guid> {
        &self.guid_assignments
    }

    /// Rewrite the references in `value` to final GUIDs.
    pub fn resolve_value(&self, value: &Value) -> Value {
        self.discovery.resolve_value(value, &self.guid_assignments)
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.entities_to_delete.is_empty()
    }
}
