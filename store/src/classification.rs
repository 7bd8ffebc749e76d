//! Classification manager.
//!
//! Classifications are held directly by an entity or propagated to it from
//! another one. Only direct associations are added, updated and removed
//! here; removing a propagated one is not checked against the target.

use crate::{ChangeEvent, EntityStore, RequestContext, StoreError, StoreResult};
use std::collections::BTreeSet;
use strata_authz::Privilege;
use strata_core::messages::{
    ERR_CLASSIFICATIONS_NOT_SPECIFIED, ERR_CLASSIFICATION_NOT_SPECIFIED, ERR_GUID_NOT_SPECIFIED,
};
use strata_core::{Classification, EntityHeader, ErrorCode, Guid};
use strata_graph::{GraphStore, Vertex};
use tracing::debug;

fn find_vertex<'g>(graph: &'g dyn GraphStore, guid: &Guid) -> StoreResult<&'g Vertex> {
    graph
        .find_by_guid(guid)
        .ok_or_else(|| StoreError::guid_not_found(guid))
}

impl<G: GraphStore + Send> EntityStore<G> {
    // ==================== Reads ====================

    /// Every classification of an entity, direct and propagated.
    pub fn get_classifications(
        &self,
        ctx: &RequestContext,
        guid: &Guid,
    ) -> StoreResult<Vec<Classification>> {
        let (header, classifications) = self.with_graph(|g| {
            find_vertex(g, guid).map(|v| (v.header(), v.classifications.clone()))
        })?;
        self.gate(ctx.caller())
            .verify_entity(Privilege::EntityRead, &header, "get classifications")?;
        Ok(classifications)
    }

    /// One classification by type name (case-insensitive), preferring the
    /// direct association over a propagated one.
    pub fn get_classification(
        &self,
        ctx: &RequestContext,
        guid: &Guid,
        name: &str,
    ) -> StoreResult<Classification> {
        let vertex = self.with_graph(|g| find_vertex(g, guid).map(Vertex::clone))?;
        if !vertex.classifications.is_empty() {
            self.gate(ctx.caller())
                .verify_entity(Privilege::EntityRead, &vertex.header(), "get classification")?;
        }

        let matches = |c: &&Classification| c.type_name.eq_ignore_ascii_case(name);
        let found = vertex
            .direct_classifications()
            .find(matches)
            .or_else(|| vertex.classifications.iter().find(matches))
            .cloned();
        found.ok_or_else(|| StoreError::not_found(ErrorCode::ClassificationNotFound, name))
    }

    // ==================== Mutations ====================

    /// Add classifications to one entity. Fails if any is already directly
    /// associated or cannot apply to the entity's type.
    pub fn add_classifications(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        classifications: Vec<Classification>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        if classifications.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_CLASSIFICATIONS_NOT_SPECIFIED));
        }
        self.run(ctx, "addClassifications", vec![guid.clone()], |tx, ctx| {
            self.add_classifications_in(tx, ctx, guid, classifications)
        })
    }

    /// Overwrite the attributes of directly associated classifications.
    pub fn update_classifications(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        classifications: Vec<Classification>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        if classifications.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_CLASSIFICATIONS_NOT_SPECIFIED));
        }
        self.run(ctx, "updateClassifications", vec![guid.clone()], |tx, ctx| {
            self.update_classifications_in(tx, ctx, guid, classifications)
        })
    }

    /// Add one classification to several entities. Every entity is locked
    /// and authorized before any is written.
    pub fn add_classification(
        &self,
        ctx: &mut RequestContext,
        guids: &[Guid],
        classification: Classification,
    ) -> StoreResult<()> {
        if guids.is_empty() || guids.iter().any(Guid::is_empty) {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        if classification.type_name.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_CLASSIFICATION_NOT_SPECIFIED));
        }
        self.run(ctx, "addClassification", guids.to_vec(), |tx, ctx| {
            let caller = ctx.caller().clone();
            let gate = self.gate(&caller);
            for guid in guids {
                let header = find_vertex(tx, guid)?.header();
                gate.verify_classification(
                    Privilege::EntityAddClassification,
                    &header,
                    &classification,
                )?;
            }

            let mut normalized = vec![classification];
            self.normalize_classifications(&mut normalized)?;

            for guid in guids {
                self.validate_entity_associations(find_vertex(tx, guid)?, &normalized)?;
                let vertex =
                    self.mapper
                        .add_classifications(tx, guid, &normalized, ctx.user())?;
                ctx.queue_event(ChangeEvent::ClassificationsAdded {
                    entity: vertex.header(),
                    classifications: normalized.clone(),
                });
            }
            Ok(())
        })
    }

    /// Remove a classification. Without `associated_entity_guid` (or when it
    /// names `guid` itself) the direct association is removed and the caller
    /// needs remove access; otherwise the one propagated from that entity.
    pub fn delete_classification(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        name: &str,
        associated_entity_guid: Option<&Guid>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        if name.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_CLASSIFICATIONS_NOT_SPECIFIED));
        }
        self.run(ctx, "deleteClassification", vec![guid.clone()], |tx, ctx| {
            self.delete_classification_in(tx, ctx, guid, name, associated_entity_guid)
        })
    }

    /// Make the direct classifications of each entity match its header:
    /// missing ones are added, changed ones updated, absent ones deleted.
    pub fn set_classifications(
        &self,
        ctx: &mut RequestContext,
        entities: Vec<EntityHeader>,
    ) -> StoreResult<String> {
        if entities.is_empty() || entities.iter().any(|h| h.guid.is_empty()) {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        let guids: Vec<Guid> = entities.iter().map(|h| h.guid.clone()).collect();
        self.run(ctx, "setClassifications", guids, |tx, ctx| {
            let (mut added, mut updated, mut deleted) = (0, 0, 0);
            for header in entities {
                let guid = header.guid.clone();
                let current: Vec<Classification> =
                    find_vertex(tx, &guid)?.direct_classifications().cloned().collect();
                let requested: Vec<Classification> = header
                    .classifications
                    .into_iter()
                    .filter(|c| c.is_direct_on(&guid))
                    .collect();

                let requested_names: BTreeSet<&str> =
                    requested.iter().map(|c| c.type_name.as_str()).collect();
                let to_delete: Vec<String> = current
                    .iter()
                    .filter(|c| !requested_names.contains(c.type_name.as_str()))
                    .map(|c| c.type_name.clone())
                    .collect();

                let mut to_add = Vec::new();
                let mut to_update = Vec::new();
                for classification in requested {
                    match current.iter().find(|c| c.type_name == classification.type_name) {
                        None => to_add.push(classification),
                        Some(existing) if differs(existing, &classification) => {
                            to_update.push(classification)
                        }
                        Some(_) => {}
                    }
                }

                for name in &to_delete {
                    self.delete_classification_in(tx, ctx, &guid, name, None)?;
                }
                deleted += to_delete.len();
                if !to_update.is_empty() {
                    updated += to_update.len();
                    self.update_classifications_in(tx, ctx, &guid, to_update)?;
                }
                if !to_add.is_empty() {
                    added += to_add.len();
                    self.add_classifications_in(tx, ctx, &guid, to_add)?;
                }
            }
            Ok(format!(
                "classifications added: {}, updated: {}, deleted: {}",
                added, updated, deleted
            ))
        })
    }

    // ==================== In-Transaction Steps ====================

    fn add_classifications_in(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        guid: &Guid,
        mut classifications: Vec<Classification>,
    ) -> StoreResult<()> {
        let header = find_vertex(graph, guid)?.header();
        let caller = ctx.caller().clone();
        let gate = self.gate(&caller);
        for classification in &classifications {
            gate.verify_classification(Privilege::EntityAddClassification, &header, classification)?;
        }

        self.normalize_classifications(&mut classifications)?;
        self.validate_entity_associations(find_vertex(graph, guid)?, &classifications)?;

        debug!(guid = %guid, count = classifications.len(), "adding classifications");
        let vertex = self
            .mapper
            .add_classifications(graph, guid, &classifications, ctx.user())?;
        ctx.queue_event(ChangeEvent::ClassificationsAdded {
            entity: vertex.header(),
            classifications,
        });
        Ok(())
    }

    fn update_classifications_in(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        guid: &Guid,
        mut classifications: Vec<Classification>,
    ) -> StoreResult<()> {
        let header = find_vertex(graph, guid)?.header();
        let caller = ctx.caller().clone();
        let gate = self.gate(&caller);
        for classification in &classifications {
            gate.verify_classification(
                Privilege::EntityUpdateClassification,
                &header,
                classification,
            )?;
        }

        if let Some(propagated) = classifications.iter().find(|c| !c.is_direct_on(guid)) {
            return Err(StoreError::invalid_parameters(format!(
                "classification {} is propagated to {} and cannot be updated there",
                propagated.type_name, guid
            )));
        }
        self.normalize_classifications(&mut classifications)?;

        let vertex = self
            .mapper
            .update_classifications(graph, guid, &classifications, ctx.user())?;
        ctx.queue_event(ChangeEvent::ClassificationsUpdated {
            entity: vertex.header(),
            classifications,
        });
        Ok(())
    }

    fn delete_classification_in(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        guid: &Guid,
        name: &str,
        associated_entity_guid: Option<&Guid>,
    ) -> StoreResult<()> {
        let vertex = find_vertex(graph, guid)?;
        let is_direct = associated_entity_guid.map_or(true, |g| g.is_empty() || g == guid);
        if is_direct {
            let classification = vertex
                .direct_classification(name)
                .cloned()
                .unwrap_or_else(|| Classification::new(name));
            self.gate(ctx.caller()).verify_classification(
                Privilege::EntityRemoveClassification,
                &vertex.header(),
                &classification,
            )?;
        }

        let removed =
            self.mapper
                .delete_classification(graph, guid, name, associated_entity_guid, ctx.user())?;
        let header = find_vertex(graph, guid)?.header();
        ctx.queue_event(ChangeEvent::ClassificationsDeleted {
            entity: header,
            classifications: vec![removed],
        });
        Ok(())
    }

    fn normalize_classifications(&self, classifications: &mut [Classification]) -> StoreResult<()> {
        let mut messages = Vec::new();
        for classification in classifications.iter_mut() {
            self.registry
                .validate_and_normalize_classification(classification, &mut messages);
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::validation_failed(messages))
        }
    }

    fn validate_entity_associations(
        &self,
        vertex: &Vertex,
        classifications: &[Classification],
    ) -> StoreResult<()> {
        let mut seen = BTreeSet::new();
        for classification in classifications {
            let name = classification.type_name.as_str();
            if vertex.direct_classification(name).is_some() || !seen.insert(name) {
                return Err(StoreError::new(
                    ErrorCode::ClassificationAlreadyAssociated,
                    format!(
                        "classification {} is already associated with entity {}",
                        name, vertex.guid
                    ),
                ));
            }
            if !self
                .registry
                .can_apply_to_entity_type(name, &vertex.type_name)
            {
                return Err(StoreError::new(
                    ErrorCode::InvalidEntityForClassification,
                    format!(
                        "classification {} cannot be applied to entity type {}",
                        name, vertex.type_name
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn differs(current: &Classification, requested: &Classification) -> bool {
    current.attributes != requested.attributes
        || (requested.propagate.is_some() && current.propagate != requested.propagate)
}
