//! Create-or-update of entity batches and the targeted update paths.

use crate::mapper::{now_millis, MapOptions};
use crate::store::unique_attributes_not_found;
use crate::{
    ChangeDetector, ChangeEvent, DiscoveryContext, DiscoveryEngine, EntityDiff, EntityMutationContext,
    EntityMutationResponse, EntityOperation, EntityStore, EntityStream, RequestContext,
    StoreError, StoreResult, SystemAttributes,
};
use crate::diff::updated_system_attributes;
use std::collections::HashMap;
use strata_authz::Privilege;
use strata_core::messages::{ERR_NO_ENTITIES, ERR_NO_ENTITY_TO_UPDATE, ERR_NULL_ENTITY};
use strata_core::{Entity, EntityHeader, EntityStatus, ErrorCode, Guid, ObjectId, Value};
use strata_graph::{GraphStore, Vertex};
use strata_registry::{Registry, TypeCategory};
use tracing::{debug, warn};

/// Move relationship attributes supplied in the plain attribute map to the
/// relationship map. A value already in the relationship map wins.
pub(crate) fn compact_attributes(registry: &Registry, entity: &mut Entity) {
    let names: Vec<String> = entity
        .attributes
        .keys()
        .filter(|name| {
            registry
                .get_relationship_attribute(&entity.type_name, name)
                .is_some()
        })
        .cloned()
        .collect();

    for name in names {
        let Some(value) = entity.attributes.remove(&name) else {
            continue;
        };
        if value.is_null() || entity.relationship_attributes.contains_key(&name) {
            continue;
        }
        entity.relationship_attributes.insert(name, value);
    }
}

impl<G: GraphStore + Send> EntityStore<G> {
    /// Create or update every entity of `stream` in one transaction.
    ///
    /// Entities found by GUID or unique attributes are updated, others are
    /// created. Updated entities with no material change are skipped. With
    /// `replace_classifications` / `replace_business_attributes` the
    /// incoming lists replace the persisted ones.
    pub fn create_or_update(
        &self,
        ctx: &mut RequestContext,
        stream: EntityStream,
        is_partial: bool,
        replace_classifications: bool,
        replace_business_attributes: bool,
    ) -> StoreResult<EntityMutationResponse> {
        if stream.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_NO_ENTITIES));
        }
        let options = MapOptions {
            partial: is_partial,
            replace_classifications,
            replace_business_attributes,
        };
        self.run(ctx, "createOrUpdate", Vec::new(), |tx, ctx| {
            self.create_or_update_in(tx, ctx, stream, options)
        })
    }

    /// Import a batch: no per-entity authorization, caller-supplied GUIDs
    /// are kept, classifications and business attributes are replaced.
    pub fn create_or_update_for_import(
        &self,
        ctx: &mut RequestContext,
        stream: EntityStream,
    ) -> StoreResult<EntityMutationResponse> {
        if stream.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_NO_ENTITIES));
        }
        self.run(ctx, "createOrUpdateForImport", Vec::new(), |tx, ctx| {
            self.create_or_update_for_import_in(tx, ctx, stream)
        })
    }

    /// Import a batch into a transaction the caller already holds, see
    /// [`EntityStore::in_transaction`]. Nothing is committed here; queued
    /// events are delivered when the caller's transaction commits.
    pub fn create_or_update_for_import_in(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        stream: EntityStream,
    ) -> StoreResult<EntityMutationResponse> {
        if stream.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_NO_ENTITIES));
        }
        let options = MapOptions {
            partial: false,
            replace_classifications: true,
            replace_business_attributes: true,
        };
        let previous = ctx.is_import_in_progress();
        ctx.set_import_in_progress(true);
        let result = self.create_or_update_in(graph, ctx, stream, options);
        ctx.set_import_in_progress(previous);
        result
    }

    /// Update the entity `object_id` names, by GUID or unique attributes.
    pub fn update_entity(
        &self,
        ctx: &mut RequestContext,
        object_id: &ObjectId,
        mut entity: Entity,
        is_partial: bool,
    ) -> StoreResult<EntityMutationResponse> {
        let guid = match object_id.assigned_guid() {
            Some(guid) => guid.clone(),
            None if !object_id.unique_attributes.is_empty() => self
                .guid_by_unique_attributes(&object_id.type_name, &object_id.unique_attributes)?,
            None => return Err(StoreError::invalid_parameters(ERR_NULL_ENTITY)),
        };
        entity.guid = guid;
        self.create_or_update(ctx, EntityStream::single(entity), is_partial, false, false)
    }

    /// Partially update the entity of `type_name` holding `unique_attributes`.
    pub fn update_by_unique_attributes(
        &self,
        ctx: &mut RequestContext,
        type_name: &str,
        unique_attributes: &strata_core::Attributes,
        mut entity: Entity,
    ) -> StoreResult<EntityMutationResponse> {
        if entity.type_name.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_NO_ENTITY_TO_UPDATE));
        }
        self.check_entity_type(type_name)?;
        let guid = self
            .with_graph(|g| {
                g.find_by_unique_attributes(type_name, unique_attributes)
                    .map(|v| v.guid.clone())
            })
            .ok_or_else(|| unique_attributes_not_found(type_name, unique_attributes))?;

        entity.guid = guid;
        self.gate(ctx.caller()).verify_entity(
            Privilege::EntityUpdate,
            &EntityHeader::from(&entity),
            "update entity by unique attributes",
        )?;
        self.create_or_update(ctx, EntityStream::single(entity), true, false, false)
    }

    /// Set one attribute of an entity. Only primitive and object-id
    /// attributes can be updated this way.
    pub fn update_entity_attribute_by_guid(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        attr_name: &str,
        value: Value,
    ) -> StoreResult<EntityMutationResponse> {
        let header = self
            .with_graph(|g| g.find_by_guid(guid).map(Vertex::header))
            .ok_or_else(|| StoreError::guid_not_found(guid))?;
        self.gate(ctx.caller()).verify_entity(
            Privilege::EntityUpdate,
            &header,
            "update entity attribute",
        )?;

        let type_name = header.type_name.clone();
        let (attr_type, is_relationship) = match self.registry.get_attribute(&type_name, attr_name) {
            Some(def) => (def.attr_type.clone(), false),
            None => match self.registry.get_relationship_attribute(&type_name, attr_name) {
                Some(def) => (def.attr_type.clone(), true),
                None => {
                    return Err(StoreError::not_found(
                        ErrorCode::UnknownAttribute,
                        format!("{}, {}", attr_name, type_name),
                    ))
                }
            },
        };

        let value = match attr_type.category() {
            TypeCategory::Primitive => value,
            TypeCategory::ObjectId => match value {
                Value::String(target) => Value::Ref(ObjectId::by_guid(
                    Guid::new(target),
                    attr_type.to_string(),
                )),
                Value::Ref(id) => Value::Ref(id),
                other => {
                    return Err(StoreError::invalid_parameters(format!(
                        "{}: expected an object id, got {}",
                        attr_name,
                        other.type_name()
                    )))
                }
            },
            _ => {
                return Err(StoreError::unsupported(
                    ErrorCode::AttributeUpdateNotSupported,
                    format!("{}, {}", attr_name, attr_type),
                ))
            }
        };

        let entity = Entity::new(type_name, guid.clone());
        let entity = if is_relationship {
            entity.with_relationship(attr_name, value)
        } else {
            entity.with_attr(attr_name, value)
        };
        self.create_or_update(ctx, EntityStream::single(entity), true, false, false)
    }

    // ==================== Batch Pipeline ====================

    pub(crate) fn create_or_update_in(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        mut stream: EntityStream,
        options: MapOptions,
    ) -> StoreResult<EntityMutationResponse> {
        let is_import = ctx.is_import_in_progress();

        for entity in stream.iter_mut() {
            compact_attributes(&self.registry, entity);
            self.validate_custom_attributes(entity)?;
            if let Some(labels) = &entity.labels {
                self.validate_labels(labels)?;
            }
        }

        let discovery =
            DiscoveryEngine::new(&self.registry, &*graph, is_import).discover_and_resolve(&stream)?;
        let mut context = self.pre_create_or_update(graph, ctx, stream, discovery, options.partial)?;

        let diffs = self.detect_changes(graph, ctx, &mut context, options);
        self.authorize_and_stamp(graph, ctx, &context, &diffs)?;

        let mut response = self.mapper.map_attributes_and_classifications(
            graph,
            &context,
            options,
            ctx.user(),
        )?;

        if !context.entities_to_delete().is_empty() {
            let gate_caller = ctx.caller().clone();
            let gate = self.gate(&gate_caller);
            for guid in context.entities_to_delete() {
                if is_import {
                    break;
                }
                if let Some(vertex) = graph.get_vertex(guid) {
                    gate.verify_entity(Privilege::EntityDelete, &vertex.header(), "delete entity")?;
                }
            }
            ctx.clear_delete_report();
            self.soft_delete.delete_entities(
                graph,
                &self.registry,
                context.entities_to_delete(),
                ctx,
            )?;
            for header in ctx.deleted_entities() {
                response.add(EntityOperation::Delete, header.clone());
            }
            for header in ctx.updated_entities() {
                response.add(EntityOperation::Update, header.clone());
            }
        }

        debug!(
            created = response.created().len(),
            updated = response.updated().len(),
            deleted = response.deleted().len(),
            skipped = ctx.skipped_guids().len(),
            "create/update mapped"
        );

        if !response.is_empty() && (!is_import || self.config.notify_on_import) {
            ctx.queue_event(ChangeEvent::EntitiesMutated {
                response: response.clone(),
                is_import,
            });
        }
        Ok(response)
    }

    /// Partition the batch into created, updated, reactivated and deleted
    /// entities, creating vertices for new entities.
    fn pre_create_or_update(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        mut stream: EntityStream,
        discovery: DiscoveryContext,
        is_partial: bool,
    ) -> StoreResult<EntityMutationContext> {
        let is_import = ctx.is_import_in_progress();
        let referenced: Vec<Guid> = discovery.referenced_guids().to_vec();
        let resolved: HashMap<Guid, Guid> = referenced
            .iter()
            .filter_map(|g| discovery.resolved_guid(g).map(|v| (g.clone(), v.clone())))
            .collect();
        let mut context = EntityMutationContext::new(discovery);
        let mut messages = Vec::new();

        for guid in referenced {
            // Only referred to, not part of the batch
            let Some(entity) = stream.get_by_guid_mut(&guid) else {
                continue;
            };
            let mut entity = std::mem::take(entity);

            match resolved.get(&guid) {
                Some(vertex_guid) => {
                    let vertex = graph
                        .get_vertex(vertex_guid)
                        .ok_or_else(|| StoreError::guid_not_found(vertex_guid))?;
                    let vertex_status = vertex.status;

                    self.registry
                        .validate_and_normalize_entity(&mut entity, !is_partial, &mut messages);

                    if vertex_guid != &guid {
                        ctx.record_guid_update(guid.clone(), vertex_guid.clone());
                        context.add_guid_assignment(guid.clone(), vertex_guid.clone());
                        entity.guid = vertex_guid.clone();
                    }

                    match (vertex_status, entity.status) {
                        (EntityStatus::Active, Some(EntityStatus::Deleted)) => {
                            context.add_entity_to_delete(entity.guid.clone());
                        }
                        (EntityStatus::Deleted, Some(EntityStatus::Active)) => {
                            warn!(guid = %entity.guid, type_name = %entity.type_name, "reactivating deleted entity");
                            entity.status = Some(EntityStatus::Active);
                            context.add_created(entity, true);
                        }
                        _ => context.add_updated(entity),
                    }
                }
                None => {
                    self.registry
                        .validate_and_normalize_entity(&mut entity, true, &mut messages);

                    let keep_supplied = is_import
                        || entity.home_id.as_deref().map_or(false, |h| !h.is_empty());
                    let new_guid = if keep_supplied && entity.guid.is_assigned() {
                        entity.guid.clone()
                    } else {
                        Guid::generate()
                    };
                    graph.create_vertex_with_guid(&entity.type_name, new_guid.clone())?;
                    let now = now_millis();
                    let user = ctx.user().to_string();
                    graph.update_vertex(&new_guid, &mut |v: &mut Vertex| {
                        v.created_by = Some(user.clone());
                        v.updated_by = Some(user.clone());
                        v.create_time = now;
                        v.update_time = now;
                    })?;

                    if new_guid != guid {
                        ctx.record_guid_update(guid.clone(), new_guid.clone());
                        context.add_guid_assignment(guid.clone(), new_guid.clone());
                    }
                    entity.guid = new_guid;
                    entity.status = Some(EntityStatus::Active);
                    context.add_created(entity, false);
                }
            }
        }

        if !messages.is_empty() {
            return Err(StoreError::validation_failed(messages));
        }
        Ok(context)
    }

    /// Diff every updated entity; unchanged ones leave the write set and are
    /// recorded on the skip list.
    fn detect_changes(
        &self,
        graph: &dyn GraphStore,
        ctx: &mut RequestContext,
        context: &mut EntityMutationContext,
        options: MapOptions,
    ) -> HashMap<Guid, EntityDiff> {
        let detector = ChangeDetector::new(&self.registry)
            .replace_classifications(options.replace_classifications)
            .replace_business_attributes(options.replace_business_attributes);

        let mut diffs = HashMap::new();
        let mut unchanged = Vec::new();
        for entity in context.updated() {
            let Some(vertex) = graph.get_vertex(&entity.guid) else {
                continue;
            };
            let diff = detector.diff(entity, vertex, context);
            if diff.has_changes() {
                diffs.insert(entity.guid.clone(), diff);
            } else {
                unchanged.push(entity.guid.clone());
            }
        }

        for guid in unchanged {
            debug!(guid = %guid, "skipping unchanged entity");
            context.remove_updated(&guid);
            ctx.record_skipped(guid);
        }
        diffs
    }

    /// Authorize every created and changed entity, writing each one's
    /// system attributes right after its own check.
    fn authorize_and_stamp(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &RequestContext,
        context: &EntityMutationContext,
        diffs: &HashMap<Guid, EntityDiff>,
    ) -> StoreResult<()> {
        let is_import = ctx.is_import_in_progress();
        let gate = self.gate(ctx.caller());

        for entity in context.created() {
            if !is_import {
                let mut attributes: Vec<String> = entity
                    .attributes
                    .iter()
                    .filter(|(_, value)| !matches!(value, Value::Null))
                    .map(|(name, _)| name.clone())
                    .collect();
                attributes.sort();
                let system_attributes = updated_system_attributes(
                    &SystemAttributes::default(),
                    &SystemAttributes::of_entity(entity),
                );
                gate.verify_mutation(
                    Privilege::EntityCreate,
                    &EntityHeader::from(entity),
                    attributes,
                    system_attributes,
                )?;
            }
            self.mapper
                .update_system_attributes(graph, &entity.guid, entity)?;
        }

        for entity in context.updated() {
            let Some(diff) = diffs.get(&entity.guid) else {
                continue;
            };
            if !is_import {
                gate.verify_mutation(
                    Privilege::EntityUpdate,
                    &EntityHeader::from(entity),
                    diff.changed_attribute_names(),
                    diff.system_attributes.clone(),
                )?;
            }
            if !diff.system_attributes.is_empty() {
                self.mapper
                    .update_system_attributes(graph, &entity.guid, entity)?;
            }
        }
        Ok(())
    }

    fn validate_custom_attributes(&self, entity: &Entity) -> StoreResult<()> {
        let Some(custom) = &entity.custom_attributes else {
            return Ok(());
        };
        let mut messages = Vec::new();
        for (key, value) in custom {
            if key.chars().count() > self.config.custom_attribute_key_max_length {
                messages.push(format!(
                    "{}: key exceeds {} characters",
                    key, self.config.custom_attribute_key_max_length
                ));
            } else if !self.label_regex.is_match(key) {
                messages.push(format!("{}: key contains invalid characters", key));
            }
            if value.chars().count() > self.config.custom_attribute_value_max_length {
                messages.push(format!(
                    "{}: value exceeds {} characters",
                    key, self.config.custom_attribute_value_max_length
                ));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::with_messages(
                ErrorCode::InvalidCustomAttribute,
                messages,
            ))
        }
    }
}
