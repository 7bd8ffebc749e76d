//! Graph mapper contract and the default mapper.
//!
//! The mapper performs the vertex writes once a call has been resolved,
//! diffed and authorized. It does no authorization or validation of its own.

use crate::{EntityMutationContext, EntityMutationResponse, EntityOperation, StoreError, StoreResult};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use strata_core::{
    Attributes, BusinessAttributes, Classification, Entity, EntityStatus, ErrorCode, Guid, Value,
};
use strata_graph::{GraphStore, Vertex};

/// How staged entities are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Merge supplied attributes instead of replacing the attribute map.
    pub partial: bool,
    pub replace_classifications: bool,
    pub replace_business_attributes: bool,
}

/// Writes resolved, authorized changes to the graph.
pub trait GraphMapper: Send + Sync {
    /// Write every created and updated entity of `context`.
    fn map_attributes_and_classifications(
        &self,
        graph: &mut dyn GraphStore,
        context: &EntityMutationContext,
        options: MapOptions,
        user: &str,
    ) -> StoreResult<EntityMutationResponse>;

    /// Copy the system fields an entity carries onto its vertex.
    fn update_system_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        entity: &Entity,
    ) -> StoreResult<()>;

    fn add_classifications(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        classifications: &[Classification],
        user: &str,
    ) -> StoreResult<Vertex>;

    fn update_classifications(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        classifications: &[Classification],
        user: &str,
    ) -> StoreResult<Vertex>;

    /// Remove one classification, returning it. Without
    /// `associated_entity_guid` (or when it is `guid`) the direct
    /// association is removed; otherwise the one propagated from it.
    fn delete_classification(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        name: &str,
        associated_entity_guid: Option<&Guid>,
        user: &str,
    ) -> StoreResult<Classification>;

    fn set_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex>;

    fn add_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: &BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex>;

    fn remove_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: &BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex>;

    /// Write business attributes. With `overwrite` the supplied map replaces
    /// the persisted one; otherwise it is merged and null values remove.
    fn write_business_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        business_attributes: &BusinessAttributes,
        overwrite: bool,
        user: &str,
    ) -> StoreResult<Vertex>;

    fn remove_business_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        business_attributes: &BusinessAttributes,
        user: &str,
    ) -> StoreResult<Vertex>;
}

/// Current time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Stamp modification metadata.
pub(crate) fn touch(vertex: &mut Vertex, user: &str) {
    vertex.updated_by = Some(user.to_string());
    vertex.update_time = now_millis();
}

/// Apply `change` to a copy of the vertex and write it back.
pub(crate) fn write_vertex(
    graph: &mut dyn GraphStore,
    guid: &Guid,
    change: impl FnOnce(&mut Vertex),
) -> StoreResult<Vertex> {
    let mut vertex = graph
        .get_vertex(guid)
        .cloned()
        .ok_or_else(|| StoreError::guid_not_found(guid))?;
    change(&mut vertex);
    graph.put_vertex(vertex.clone())?;
    Ok(vertex)
}

/// The default mapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGraphMapper;

impl DefaultGraphMapper {
    fn resolved(context: &EntityMutationContext, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), context.resolve_value(v)))
            .collect()
    }

    fn merge(context: &EntityMutationContext, target: &mut Attributes, supplied: &Attributes) {
        for (name, value) in supplied {
            if value.is_null() {
                target.remove(name);
            } else {
                target.insert(name.clone(), context.resolve_value(value));
            }
        }
    }

    /// Incoming classifications as direct associations of `guid`, keeping
    /// the persisted propagated ones.
    fn direct(guid: &Guid, classifications: &[Classification]) -> Vec<Classification> {
        classifications
            .iter()
            .cloned()
            .map(|mut c| {
                c.entity_guid = Some(guid.clone());
                c
            })
            .collect()
    }

    fn replace_direct(vertex: &mut Vertex, incoming: &[Classification]) {
        let guid = vertex.guid.clone();
        vertex.classifications.retain(|c| !c.is_direct_on(&guid));
        vertex
            .classifications
            .extend(Self::direct(&guid, incoming));
    }

    fn map_created(
        &self,
        graph: &mut dyn GraphStore,
        context: &EntityMutationContext,
        entity: &Entity,
        user: &str,
    ) -> StoreResult<Vertex> {
        let attributes = Self::resolved(context, &entity.attributes);
        let relationships = Self::resolved(context, &entity.relationship_attributes);
        write_vertex(graph, &entity.guid, |v| {
            v.attributes = attributes;
            v.relationship_attributes = relationships;
            if let Some(custom) = &entity.custom_attributes {
                v.custom_attributes = custom.clone();
            }
            if let Some(labels) = &entity.labels {
                v.labels = labels.clone();
            }
            if let Some(classifications) = &entity.classifications {
                Self::replace_direct(v, classifications);
            }
            if let Some(business) = &entity.business_attributes {
                v.business_attributes = business.clone();
            }
            v.status = EntityStatus::Active;
            v.is_incomplete = entity.is_incomplete;
            if context.is_reactivated(&entity.guid) {
                touch(v, user);
            }
        })
    }

    fn map_updated(
        &self,
        graph: &mut dyn GraphStore,
        context: &EntityMutationContext,
        entity: &Entity,
        options: MapOptions,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, &entity.guid, |v| {
            if options.partial {
                Self::merge(context, &mut v.attributes, &entity.attributes);
            } else {
                v.attributes = Self::resolved(context, &entity.attributes);
                v.is_incomplete = entity.is_incomplete;
            }
            Self::merge(
                context,
                &mut v.relationship_attributes,
                &entity.relationship_attributes,
            );
            if let Some(custom) = &entity.custom_attributes {
                v.custom_attributes = custom.clone();
            }
            if options.replace_classifications {
                Self::replace_direct(v, entity.classifications.as_deref().unwrap_or_default());
            }
            if options.replace_business_attributes {
                v.business_attributes = entity.business_attributes.clone().unwrap_or_default();
            }
            touch(v, user);
        })
    }
}

impl GraphMapper for DefaultGraphMapper {
    fn map_attributes_and_classifications(
        &self,
        graph: &mut dyn GraphStore,
        context: &EntityMutationContext,
        options: MapOptions,
        user: &str,
    ) -> StoreResult<EntityMutationResponse> {
        let mut response = EntityMutationResponse::new();

        for entity in context.created() {
            let vertex = self.map_created(graph, context, entity, user)?;
            response.add(EntityOperation::Create, vertex.header());
        }
        for entity in context.updated() {
            let vertex = self.map_updated(graph, context, entity, options, user)?;
            response.add(EntityOperation::Update, vertex.header());
        }

        response.set_guid_assignments(context.guid_assignments().clone());
        Ok(response)
    }

    fn update_system_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        entity: &Entity,
    ) -> StoreResult<()> {
        write_vertex(graph, guid, |v| {
            v.version = entity.version;
            v.is_proxy = entity.is_proxy;
            v.provenance_type = entity.provenance_type;
            if let Some(create_time) = entity.create_time {
                v.create_time = create_time;
            }
            if let Some(update_time) = entity.update_time {
                v.update_time = update_time;
            }
            if let Some(created_by) = entity.created_by.as_ref().filter(|s| !s.is_empty()) {
                v.created_by = Some(created_by.clone());
            }
            if let Some(updated_by) = entity.updated_by.as_ref().filter(|s| !s.is_empty()) {
                v.updated_by = Some(updated_by.clone());
            }
            if let Some(home_id) = entity.home_id.as_ref().filter(|s| !s.is_empty()) {
                v.home_id = Some(home_id.clone());
            }
        })?;
        Ok(())
    }

    fn add_classifications(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        classifications: &[Classification],
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            v.classifications.extend(Self::direct(guid, classifications));
            touch(v, user);
        })
    }

    fn update_classifications(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        classifications: &[Classification],
        user: &str,
    ) -> StoreResult<Vertex> {
        let vertex = graph
            .get_vertex(guid)
            .ok_or_else(|| StoreError::guid_not_found(guid))?;
        for classification in classifications {
            if vertex.direct_classification(&classification.type_name).is_none() {
                return Err(StoreError::not_found(
                    ErrorCode::ClassificationNotFound,
                    format!(
                        "classification {} is not associated with entity {}",
                        classification.type_name, guid
                    ),
                ));
            }
        }

        write_vertex(graph, guid, |v| {
            for incoming in classifications {
                let holder = v.guid.clone();
                if let Some(existing) = v
                    .classifications
                    .iter_mut()
                    .find(|c| c.type_name == incoming.type_name && c.is_direct_on(&holder))
                {
                    existing.attributes = incoming.attributes.clone();
                    if incoming.propagate.is_some() {
                        existing.propagate = incoming.propagate;
                    }
                }
            }
            touch(v, user);
        })
    }

    fn delete_classification(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        name: &str,
        associated_entity_guid: Option<&Guid>,
        user: &str,
    ) -> StoreResult<Classification> {
        let source = associated_entity_guid
            .filter(|g| !g.is_empty())
            .unwrap_or(guid)
            .clone();
        let vertex = graph
            .get_vertex(guid)
            .ok_or_else(|| StoreError::guid_not_found(guid))?;
        let position = vertex
            .classifications
            .iter()
            .position(|c| {
                c.type_name == name
                    && if &source == guid {
                        c.is_direct_on(guid)
                    } else {
                        c.entity_guid.as_ref() == Some(&source)
                    }
            })
            .ok_or_else(|| StoreError::not_found(ErrorCode::ClassificationNotFound, name))?;

        let mut removed = None;
        write_vertex(graph, guid, |v| {
            removed = Some(v.classifications.remove(position));
            touch(v, user);
        })?;
        removed.ok_or_else(|| StoreError::not_found(ErrorCode::ClassificationNotFound, name))
    }

    fn set_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            v.labels = labels;
            touch(v, user);
        })
    }

    fn add_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: &BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            v.labels.extend(labels.iter().cloned());
            touch(v, user);
        })
    }

    fn remove_labels(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        labels: &BTreeSet<String>,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            v.labels.retain(|l| !labels.contains(l));
            touch(v, user);
        })
    }

    fn write_business_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        business_attributes: &BusinessAttributes,
        overwrite: bool,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            if overwrite {
                v.business_attributes.clear();
            }
            for (namespace, attrs) in business_attributes {
                let target = v.business_attributes.entry(namespace.clone()).or_default();
                for (name, value) in attrs {
                    if value.is_null() {
                        target.remove(name);
                    } else {
                        target.insert(name.clone(), value.clone());
                    }
                }
            }
            v.business_attributes.retain(|_, attrs| !attrs.is_empty());
            touch(v, user);
        })
    }

    fn remove_business_attributes(
        &self,
        graph: &mut dyn GraphStore,
        guid: &Guid,
        business_attributes: &BusinessAttributes,
        user: &str,
    ) -> StoreResult<Vertex> {
        write_vertex(graph, guid, |v| {
            for (namespace, attrs) in business_attributes {
                if let Some(target) = v.business_attributes.get_mut(namespace) {
                    for name in attrs.keys() {
                        target.remove(name);
                    }
                }
            }
            v.business_attributes.retain(|_, attrs| !attrs.is_empty());
            touch(v, user);
        })
    }
}

/// Remove every reference to `removed` from `value`; `None` when the value
/// itself was such a reference.
pub(crate) fn strip_references(value: &Value, removed: &BTreeSet<Guid>) -> Option<Value> {
    match value {
        Value::Ref(id) => match &id.guid {
            Some(guid) if removed.contains(guid) => None,
            _ => Some(value.clone()),
        },
        Value::List(items) => Some(Value::List(
            items
                .iter()
                .filter_map(|v| strip_references(v, removed))
                .collect(),
        )),
        Value::Map(entries) => Some(Value::Map(
            entries
                .iter()
                .filter_map(|(k, v)| strip_references(v, removed).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}
