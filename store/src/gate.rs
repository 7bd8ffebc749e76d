//! Authorization gate.
//!
//! Every authorization-relevant change unit issues exactly one request; the
//! first denial aborts the calling operation.

use crate::StoreResult;
use strata_authz::{
    AccessRequest, AdminAccessRequest, Authorizer, CallerIdentity, EntityAccessRequestBuilder,
    Privilege,
};
use strata_core::{Classification, EntityHeader};
use strata_registry::Registry;
use tracing::debug;

pub struct AuthorizationGate<'a> {
    registry: &'a Registry,
    authorizer: &'a dyn Authorizer,
    caller: &'a CallerIdentity,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(
        registry: &'a Registry,
        authorizer: &'a dyn Authorizer,
        caller: &'a CallerIdentity,
    ) -> Self {
        Self {
            registry,
            authorizer,
            caller,
        }
    }

    /// Start an entity-directed request.
    pub fn entity_request(
        &self,
        privilege: Privilege,
        entity: &EntityHeader,
    ) -> EntityAccessRequestBuilder<'a> {
        EntityAccessRequestBuilder::new(self.registry, privilege, self.caller.clone())
            .entity(entity.clone())
    }

    pub fn verify(&self, request: AccessRequest, action: &str) -> StoreResult<()> {
        debug!(action, request = %request, "verifying access");
        self.authorizer.verify_access(&request)?;
        Ok(())
    }

    pub fn verify_entity(
        &self,
        privilege: Privilege,
        entity: &EntityHeader,
        action: &str,
    ) -> StoreResult<()> {
        self.verify(self.entity_request(privilege, entity).build(), action)
    }

    pub fn verify_classification(
        &self,
        privilege: Privilege,
        entity: &EntityHeader,
        classification: &Classification,
    ) -> StoreResult<()> {
        let request = self
            .entity_request(privilege, entity)
            .classification(classification.clone())
            .build();
        self.verify(request, "classification")
    }

    pub fn verify_label(
        &self,
        privilege: Privilege,
        entity: &EntityHeader,
        label: &str,
    ) -> StoreResult<()> {
        let request = self.entity_request(privilege, entity).label(label).build();
        self.verify(request, "label")
    }

    pub fn verify_business_metadata(
        &self,
        entity: &EntityHeader,
        namespace: &str,
    ) -> StoreResult<()> {
        let request = self
            .entity_request(Privilege::EntityUpdateBusinessMetadata, entity)
            .business_metadata(namespace)
            .build();
        self.verify(request, "business-metadata")
    }

    /// Request on an entity create or update, carrying the changed names.
    pub fn verify_mutation(
        &self,
        privilege: Privilege,
        entity: &EntityHeader,
        attributes: Vec<String>,
        system_attributes: Vec<String>,
    ) -> StoreResult<()> {
        let request = self
            .entity_request(privilege, entity)
            .attributes(attributes)
            .system_attributes(system_attributes)
            .build();
        self.verify(request, "create/update entity")
    }

    pub fn verify_admin(&self, privilege: Privilege, action: &str) -> StoreResult<()> {
        self.verify(
            AdminAccessRequest::new(privilege, self.caller.clone()).into(),
            action,
        )
    }
}
