//! The entity store facade.
//!
//! Every public operation runs inside one scoped graph transaction. The
//! operation itself lives in a sibling module (`mutate`, `remove`,
//! `classification`, `labels`, `business`, `import`); this module holds the
//! shared plumbing and the read paths.

use crate::handler::{DeleteHandler, HardDeleteHandler, SoftDeleteHandler};
use crate::mapper::{DefaultGraphMapper, GraphMapper};
use crate::{
    AuthorizationGate, ChangeNotifier, NoopNotifier, RequestContext, StoreConfig, StoreError,
    StoreResult,
};
use regex_lite::Regex;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use strata_authz::{AllowAll, Authorizer, CallerIdentity, Privilege};
use strata_core::messages::ERR_GUID_EMPTY;
use strata_core::{Attributes, Entity, EntityHeader, ErrorCode, Guid};
use strata_graph::{GraphStore, MemoryGraph, Vertex};
use strata_registry::Registry;
use strata_transaction::{EntityLockManager, Transaction};
use tracing::debug;

/// The catalog mutation core over a graph store.
pub struct EntityStore<G = MemoryGraph> {
    graph: Mutex<G>,
    pub(crate) registry: Arc<Registry>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn ChangeNotifier>,
    pub(crate) mapper: Arc<dyn GraphMapper>,
    pub(crate) soft_delete: Arc<dyn DeleteHandler>,
    pub(crate) hard_delete: Arc<dyn DeleteHandler>,
    locks: EntityLockManager,
    pub(crate) config: StoreConfig,
    pub(crate) label_regex: Regex,
}

impl EntityStore<MemoryGraph> {
    /// A store over an empty in-memory graph with the default configuration.
    pub fn in_memory(registry: Arc<Registry>) -> StoreResult<Self> {
        let graph = MemoryGraph::new(registry.clone());
        Self::new(graph, registry, StoreConfig::default())
    }
}

impl<G: GraphStore + Send> EntityStore<G> {
    /// A store allowing every access, discarding notifications, and using
    /// the default mapper with soft delete.
    pub fn new(graph: G, registry: Arc<Registry>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let label_regex = config.label_regex()?;
        Ok(Self {
            graph: Mutex::new(graph),
            registry,
            authorizer: Arc::new(AllowAll),
            notifier: Arc::new(NoopNotifier),
            mapper: Arc::new(DefaultGraphMapper),
            soft_delete: Arc::new(SoftDeleteHandler),
            hard_delete: Arc::new(HardDeleteHandler),
            locks: EntityLockManager::new(),
            config,
            label_regex,
        })
    }

    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub fn with_notifier(mut self, notifier: impl ChangeNotifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn with_mapper(mut self, mapper: impl GraphMapper + 'static) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }

    /// Replace the handler used by delete operations.
    pub fn with_delete_handler(mut self, handler: impl DeleteHandler + 'static) -> Self {
        self.soft_delete = Arc::new(handler);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run `f` against the committed graph.
    pub fn with_graph<T>(&self, f: impl FnOnce(&G) -> T) -> T {
        f(&self.lock_graph())
    }

    /// Copy of the committed graph.
    pub fn snapshot(&self) -> G
    where
        G: Clone,
    {
        let graph = self.lock_graph();
        G::clone(&graph)
    }

    // ==================== Plumbing ====================

    pub(crate) fn lock_graph(&self) -> MutexGuard<'_, G> {
        // A panicking writer has already rolled its transaction back.
        self.graph
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn gate<'a>(&'a self, caller: &'a CallerIdentity) -> AuthorizationGate<'a> {
        AuthorizationGate::new(&self.registry, self.authorizer.as_ref(), caller)
    }

    /// Run one operation in a transaction.
    ///
    /// Advisory locks on `lock_guids` are taken first and released by the
    /// transaction's completion hook. Events queued on `ctx` reach the
    /// notifier only after commit.
    pub(crate) fn run<T>(
        &self,
        ctx: &mut RequestContext,
        operation: &'static str,
        lock_guids: Vec<Guid>,
        work: impl FnOnce(&mut Transaction<'_, G>, &mut RequestContext) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let started = Instant::now();
        debug!(operation, user = ctx.user(), "==> entity store");

        let lock_guard = if lock_guids.is_empty() {
            None
        } else {
            Some(self.locks.lock(lock_guids, self.config.lock_timeout())?)
        };

        let result = {
            let mut graph = self.lock_graph();
            let mut tx = Transaction::begin(&mut *graph);
            if let Some(guard) = lock_guard {
                tx.on_complete(move |_| drop(guard));
            }
            match work(&mut tx, ctx) {
                Ok(value) => {
                    tx.commit();
                    Ok(value)
                }
                Err(e) => {
                    tx.rollback();
                    Err(e)
                }
            }
        };

        let events = ctx.take_events();
        match &result {
            Ok(_) => {
                for event in &events {
                    debug!(event = event.name(), "notifying");
                    self.notifier.notify(event);
                }
            }
            Err(e) => debug!(operation, error = %e, "rolled back"),
        }

        let elapsed = started.elapsed();
        ctx.record_metric(operation, elapsed);
        debug!(operation, elapsed_ms = elapsed.as_millis() as u64, "<== entity store");
        result
    }

    /// Run `work` in one transaction over the graph. It commits only if
    /// `work` succeeds, so several `_in` operations can share one commit.
    pub fn in_transaction<T>(
        &self,
        ctx: &mut RequestContext,
        work: impl FnOnce(&mut dyn GraphStore, &mut RequestContext) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.run(ctx, "transaction", Vec::new(), |tx, ctx| work(tx, ctx))
    }

    // ==================== Reads ====================

    /// The full entity with the given GUID, in any state.
    pub fn get_by_id(&self, ctx: &RequestContext, guid: &Guid) -> StoreResult<Entity> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        let entity = self.with_graph(|g| g.find_by_guid(guid).map(Vertex::to_entity));
        let entity = entity.ok_or_else(|| StoreError::guid_not_found(guid))?;
        self.gate(ctx.caller())
            .verify_entity(Privilege::EntityRead, &EntityHeader::from(&entity), "read entity")?;
        Ok(entity)
    }

    pub fn get_header_by_id(&self, ctx: &RequestContext, guid: &Guid) -> StoreResult<EntityHeader> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        let header = self.with_graph(|g| g.find_by_guid(guid).map(Vertex::header));
        let header = header.ok_or_else(|| StoreError::guid_not_found(guid))?;
        self.gate(ctx.caller())
            .verify_entity(Privilege::EntityRead, &header, "read entity header")?;
        Ok(header)
    }

    /// Every entity in `guids`; fails on the first missing or unreadable one.
    pub fn get_by_ids(&self, ctx: &RequestContext, guids: &[Guid]) -> StoreResult<Vec<Entity>> {
        guids.iter().map(|guid| self.get_by_id(ctx, guid)).collect()
    }

    pub fn get_by_unique_attributes(
        &self,
        ctx: &RequestContext,
        type_name: &str,
        unique_attributes: &Attributes,
    ) -> StoreResult<Entity> {
        let guid = self.guid_by_unique_attributes(type_name, unique_attributes)?;
        self.get_by_id(ctx, &guid)
    }

    pub fn get_header_by_unique_attributes(
        &self,
        ctx: &RequestContext,
        type_name: &str,
        unique_attributes: &Attributes,
    ) -> StoreResult<EntityHeader> {
        let guid = self.guid_by_unique_attributes(type_name, unique_attributes)?;
        self.get_header_by_id(ctx, &guid)
    }

    /// Entities for several unique-attribute tuples of one type. Tuples that
    /// match nothing are left out.
    pub fn get_entities_by_unique_attributes(
        &self,
        ctx: &RequestContext,
        type_name: &str,
        unique_attributes: &[Attributes],
    ) -> StoreResult<Vec<Entity>> {
        self.check_entity_type(type_name)?;
        let guids: Vec<Guid> = self.with_graph(|g| {
            unique_attributes
                .iter()
                .filter_map(|attrs| g.find_by_unique_attributes(type_name, attrs))
                .map(|v| v.guid.clone())
                .collect()
        });
        self.get_by_ids(ctx, &guids)
    }

    /// GUIDs of the active entities of a type.
    pub fn get_entity_guids(&self, type_name: &str) -> StoreResult<Vec<Guid>> {
        self.check_entity_type(type_name)?;
        Ok(self.with_graph(|g| {
            g.vertex_guids_of_type(type_name)
                .into_iter()
                .filter(|guid| g.get_vertex(guid).map_or(false, Vertex::is_active))
                .collect()
        }))
    }

    pub fn guid_by_unique_attributes(
        &self,
        type_name: &str,
        unique_attributes: &Attributes,
    ) -> StoreResult<Guid> {
        self.check_entity_type(type_name)?;
        let guid = self.with_graph(|g| {
            g.find_by_unique_attributes(type_name, unique_attributes)
                .map(|v| v.guid.clone())
        });
        guid.ok_or_else(|| unique_attributes_not_found(type_name, unique_attributes))
    }

    pub(crate) fn check_entity_type(&self, type_name: &str) -> StoreResult<()> {
        if type_name.is_empty() || self.registry.entity_type(type_name).is_none() {
            return Err(StoreError::not_found(ErrorCode::UnknownTypename, type_name));
        }
        Ok(())
    }
}

pub(crate) fn unique_attributes_not_found(type_name: &str, attrs: &Attributes) -> StoreError {
    let mut pairs: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    StoreError::not_found(
        ErrorCode::InstanceByUniqueAttributeNotFound,
        format!("{} {{{}}}", type_name, pairs.join(", ")),
    )
}
