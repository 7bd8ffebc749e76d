//! Delete and purge.

use crate::handler::DeleteHandler;
use crate::{
    ChangeEvent, EntityMutationResponse, EntityOperation, EntityStore, RequestContext, StoreError,
    StoreResult,
};
use strata_authz::Privilege;
use strata_core::messages::ERR_GUID_NOT_SPECIFIED;
use strata_core::{Attributes, Guid};
use strata_graph::GraphStore;
use tracing::{debug, info};

impl<G: GraphStore + Send> EntityStore<G> {
    /// Soft-delete one entity. A missing or already deleted entity is a no-op.
    pub fn delete_by_id(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
    ) -> StoreResult<EntityMutationResponse> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        self.delete_by_ids(ctx, std::slice::from_ref(guid))
    }

    /// Soft-delete several entities; each found one needs delete access.
    pub fn delete_by_ids(
        &self,
        ctx: &mut RequestContext,
        guids: &[Guid],
    ) -> StoreResult<EntityMutationResponse> {
        if guids.is_empty() || guids.iter().any(Guid::is_empty) {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        self.run(ctx, "deleteByIds", Vec::new(), |tx, ctx| {
            let caller = ctx.caller().clone();
            let gate = self.gate(&caller);
            let mut candidates = Vec::new();
            for guid in guids {
                match tx.find_by_guid(guid) {
                    Some(vertex) => {
                        gate.verify_entity(Privilege::EntityDelete, &vertex.header(), "delete entity")?;
                        candidates.push(guid.clone());
                    }
                    None => debug!(guid = %guid, "delete ignored for non-existent entity"),
                }
            }
            self.delete_vertices(
                tx,
                ctx,
                self.soft_delete.as_ref(),
                &candidates,
                EntityOperation::Delete,
            )
        })
    }

    /// Soft-delete the entity holding `unique_attributes`. No match is a no-op.
    pub fn delete_by_unique_attributes(
        &self,
        ctx: &mut RequestContext,
        type_name: &str,
        unique_attributes: &Attributes,
    ) -> StoreResult<EntityMutationResponse> {
        self.check_entity_type(type_name)?;
        self.run(ctx, "deleteByUniqueAttributes", Vec::new(), |tx, ctx| {
            let mut candidates = Vec::new();
            match tx.find_by_unique_attributes(type_name, unique_attributes) {
                Some(vertex) => {
                    self.gate(ctx.caller()).verify_entity(
                        Privilege::EntityDelete,
                        &vertex.header(),
                        "delete entity by unique attributes",
                    )?;
                    candidates.push(vertex.guid.clone());
                }
                None => debug!(type_name, "delete ignored for non-existent entity"),
            }
            self.delete_vertices(
                tx,
                ctx,
                self.soft_delete.as_ref(),
                &candidates,
                EntityOperation::Delete,
            )
        })
    }

    /// Remove soft-deleted entities for good. One admin check covers the
    /// whole set; active or missing GUIDs are skipped.
    pub fn purge_by_ids(
        &self,
        ctx: &mut RequestContext,
        guids: &[Guid],
    ) -> StoreResult<EntityMutationResponse> {
        if guids.is_empty() || guids.iter().any(Guid::is_empty) {
            return Err(StoreError::invalid_parameters(ERR_GUID_NOT_SPECIFIED));
        }
        self.run(ctx, "purgeByIds", Vec::new(), |tx, ctx| {
            let names: Vec<&str> = guids.iter().map(Guid::as_str).collect();
            self.gate(ctx.caller()).verify_admin(
                Privilege::AdminPurge,
                &format!("purge entity: guids={}", names.join(",")),
            )?;

            let mut candidates = Vec::new();
            for guid in guids {
                match tx.find_deleted_by_guid(guid) {
                    Some(_) => candidates.push(guid.clone()),
                    None => debug!(guid = %guid, "purge skipped for active or non-existent entity"),
                }
            }
            if candidates.is_empty() {
                info!("no deleted entities found to purge");
            }
            self.delete_vertices(
                tx,
                ctx,
                self.hard_delete.as_ref(),
                &candidates,
                EntityOperation::Purge,
            )
        })
    }

    /// Run a delete handler and report what it touched.
    fn delete_vertices(
        &self,
        graph: &mut dyn GraphStore,
        ctx: &mut RequestContext,
        handler: &dyn DeleteHandler,
        candidates: &[Guid],
        op: EntityOperation,
    ) -> StoreResult<EntityMutationResponse> {
        let mut response = EntityMutationResponse::new();
        if candidates.is_empty() {
            return Ok(response);
        }

        ctx.clear_delete_report();
        handler.delete_entities(graph, &self.registry, candidates, ctx)?;
        for header in ctx.deleted_entities() {
            response.add(op, header.clone());
        }
        for header in ctx.updated_entities() {
            response.add(EntityOperation::Update, header.clone());
        }

        if !response.is_empty() {
            ctx.queue_event(ChangeEvent::EntitiesMutated {
                response: response.clone(),
                is_import: ctx.is_import_in_progress(),
            });
        }
        Ok(response)
    }
}
