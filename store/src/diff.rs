//! Change detection between an incoming entity and its persisted vertex.

use crate::EntityMutationContext;
use strata_core::{system_attrs, Classification, Entity, EntityStatus};
use strata_graph::Vertex;
use strata_registry::Registry;

/// The system fields compared by change detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemAttributes {
    pub home_id: Option<String>,
    pub created_by: Option<String>,
    pub create_time: Option<i64>,
    pub updated_by: Option<String>,
    pub update_time: Option<i64>,
    pub status: Option<EntityStatus>,
    pub provenance_type: i32,
    pub is_proxy: bool,
    pub version: i64,
}

impl SystemAttributes {
    pub fn of_entity(entity: &Entity) -> Self {
        Self {
            home_id: entity.home_id.clone(),
            created_by: entity.created_by.clone(),
            create_time: entity.create_time,
            updated_by: entity.updated_by.clone(),
            update_time: entity.update_time,
            status: entity.status,
            provenance_type: entity.provenance_type,
            is_proxy: entity.is_proxy,
            version: entity.version,
        }
    }

    pub fn of_vertex(vertex: &Vertex) -> Self {
        Self {
            home_id: vertex.home_id.clone(),
            created_by: vertex.created_by.clone(),
            create_time: Some(vertex.create_time),
            updated_by: vertex.updated_by.clone(),
            update_time: Some(vertex.update_time),
            status: Some(vertex.status),
            provenance_type: vertex.provenance_type,
            is_proxy: vertex.is_proxy,
            version: vertex.version,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Names of the system attributes `updated` changes relative to `original`.
pub fn updated_system_attributes(
    original: &SystemAttributes,
    updated: &SystemAttributes,
) -> Vec<String> {
    let mut changed = Vec::new();

    if let Some(home_id) = non_empty(&updated.home_id) {
        if original.home_id.as_deref() != Some(home_id) {
            changed.push(system_attrs::HOME_ID);
        }
    }
    if let Some(created_by) = non_empty(&updated.created_by) {
        if original.created_by.as_deref() != Some(created_by) {
            changed.push(system_attrs::CREATED_BY);
        }
    }
    if updated.create_time.is_some() && updated.create_time != original.create_time {
        changed.push(system_attrs::CREATE_TIME);
    }
    if let Some(updated_by) = non_empty(&updated.updated_by) {
        if original.updated_by.as_deref() != Some(updated_by) {
            changed.push(system_attrs::UPDATED_BY);
        }
    }
    // NOTE: update time counts as changed when it is EQUAL to the persisted
    // value, unlike every other field here. Entities resent as read back
    // from the store therefore always carry an update-time change.
    if updated.update_time.is_some() && updated.update_time == original.update_time {
        changed.push(system_attrs::UPDATE_TIME);
    }
    if updated.status.is_some() && updated.status != original.status {
        changed.push(system_attrs::STATUS);
    }
    if updated.provenance_type != original.provenance_type {
        changed.push(system_attrs::PROVENANCE_TYPE);
    }
    if updated.is_proxy != original.is_proxy {
        changed.push(system_attrs::IS_PROXY);
    }
    if updated.version != original.version {
        changed.push(system_attrs::VERSION);
    }

    changed.into_iter().map(str::to_string).collect()
}

/// What an incoming entity changes on its persisted vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDiff {
    pub status_changed: bool,
    pub attributes: Vec<String>,
    pub relationship_attributes: Vec<String>,
    pub custom_attributes_changed: bool,
    pub classifications_changed: bool,
    pub business_attributes_changed: bool,
    pub system_attributes: Vec<String>,
}

impl EntityDiff {
    pub fn has_changes(&self) -> bool {
        self.status_changed
            || !self.attributes.is_empty()
            || !self.relationship_attributes.is_empty()
            || self.custom_attributes_changed
            || self.classifications_changed
            || self.business_attributes_changed
            || !self.system_attributes.is_empty()
    }

    /// Changed attribute and relationship attribute names, for access requests.
    pub fn changed_attribute_names(&self) -> Vec<String> {
        self.attributes
            .iter()
            .chain(self.relationship_attributes.iter())
            .cloned()
            .collect()
    }
}

/// Compares incoming entities with persisted vertices.
pub struct ChangeDetector<'a> {
    registry: &'a Registry,
    replace_classifications: bool,
    replace_business_attributes: bool,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            replace_classifications: false,
            replace_business_attributes: false,
        }
    }

    pub fn replace_classifications(mut self, replace: bool) -> Self {
        self.replace_classifications = replace;
        self
    }

    pub fn replace_business_attributes(mut self, replace: bool) -> Self {
        self.replace_business_attributes = replace;
        self
    }

    /// Diff `entity` against `vertex`. Only attributes present in the
    /// payload are compared; references are resolved through `context`
    /// first, so a batch-local GUID assigned earlier compares equal to the
    /// persisted GUID.
    pub fn diff(
        &self,
        entity: &Entity,
        vertex: &Vertex,
        context: &EntityMutationContext,
    ) -> EntityDiff {
        let mut diff = EntityDiff {
            status_changed: entity.status.map(|s| s != vertex.status).unwrap_or(false),
            ..Default::default()
        };

        for (name, value) in &entity.attributes {
            let Some(def) = self.registry.get_attribute(&entity.type_name, name) else {
                continue;
            };
            let incoming = context.resolve_value(value);
            if !self.registry.are_equal_values(
                &def.attr_type,
                vertex.attributes.get(name),
                Some(&incoming),
                context.guid_assignments(),
            ) {
                diff.attributes.push(name.clone());
            }
        }
        diff.attributes.sort();

        for (name, value) in &entity.relationship_attributes {
            let Some(def) = self
                .registry
                .get_relationship_attribute(&entity.type_name, name)
            else {
                continue;
            };
            let incoming = context.resolve_value(value);
            if !self.registry.are_equal_values(
                &def.attr_type,
                vertex.relationship_attributes.get(name),
                Some(&incoming),
                context.guid_assignments(),
            ) {
                diff.relationship_attributes.push(name.clone());
            }
        }
        diff.relationship_attributes.sort();

        if let Some(custom) = &entity.custom_attributes {
            diff.custom_attributes_changed = custom != &vertex.custom_attributes;
        }

        if self.replace_classifications {
            let incoming = entity.classifications.as_deref().unwrap_or_default();
            let current: Vec<&Classification> = vertex.direct_classifications().collect();
            diff.classifications_changed =
                canonical(incoming.iter()) != canonical(current.into_iter());
        }

        if self.replace_business_attributes {
            let incoming = entity.business_attributes.clone().unwrap_or_default();
            diff.business_attributes_changed = incoming != vertex.business_attributes;
        }

        diff.system_attributes = updated_system_attributes(
            &SystemAttributes::of_vertex(vertex),
            &SystemAttributes::of_entity(entity),
        );

        diff
    }
}

/// Classifications compared by type, attributes and propagation flag, in
/// type order; the originating GUID of a direct association is ignored.
fn canonical<'c>(
    classifications: impl Iterator<Item = &'c Classification>,
) -> Vec<(&'c str, Vec<(&'c String, &'c strata_core::Value)>, Option<bool>)> {
    let mut out: Vec<_> = classifications
        .map(|c| {
            let mut attrs: Vec<_> = c.attributes.iter().collect();
            attrs.sort_by(|a, b| a.0.cmp(b.0));
            (c.type_name.as_str(), attrs, c.propagate)
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(b.0));
    out
}
