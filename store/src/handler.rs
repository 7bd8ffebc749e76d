//! Delete handlers.
//!
//! A delete handler removes a set of entities (plus the entities they own
//! through composite relationships) and reports every entity it touched on
//! the [`RequestContext`].

use crate::mapper::{strip_references, touch};
use crate::{RequestContext, StoreResult};
use std::collections::BTreeSet;
use strata_core::{EntityStatus, Guid};
use strata_graph::{GraphStore, Vertex};
use strata_registry::Registry;
use tracing::debug;

/// Removes entities from the graph.
pub trait DeleteHandler: Send + Sync {
    /// Delete `guids` and their owned entities. Deleted entities are
    /// recorded with [`RequestContext::record_deleted`], and referrers
    /// changed as a consequence with [`RequestContext::record_updated`].
    fn delete_entities(
        &self,
        graph: &mut dyn GraphStore,
        registry: &Registry,
        guids: &[Guid],
        ctx: &mut RequestContext,
    ) -> StoreResult<()>;
}

/// GUIDs owned by `vertex` through composite relationship attributes.
fn owned_guids(registry: &Registry, vertex: &Vertex) -> Vec<Guid> {
    let mut out = Vec::new();
    for (name, value) in &vertex.relationship_attributes {
        let composite = registry
            .get_relationship_attribute(&vertex.type_name, name)
            .map_or(false, |def| def.composite);
        if !composite {
            continue;
        }
        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        out.extend(refs.into_iter().filter_map(|id| id.guid.clone()));
    }
    out
}

/// Expand `roots` over composite ownership, keeping vertices `eligible`
/// accepts. Roots that are missing or not eligible are skipped.
fn expand(
    graph: &dyn GraphStore,
    registry: &Registry,
    roots: &[Guid],
    eligible: impl Fn(&Vertex) -> bool,
) -> Vec<Guid> {
    let mut seen = BTreeSet::new();
    let mut order = Vec::new();
    let mut pending: Vec<Guid> = roots.iter().rev().cloned().collect();

    while let Some(guid) = pending.pop() {
        if seen.contains(&guid) {
            continue;
        }
        let Some(vertex) = graph.get_vertex(&guid) else {
            continue;
        };
        if !eligible(vertex) {
            continue;
        }
        seen.insert(guid.clone());
        pending.extend(owned_guids(registry, vertex).into_iter().rev());
        order.push(guid);
    }
    order
}

/// Drop references to `removed` from every other active vertex.
fn detach_referrers(
    graph: &mut dyn GraphStore,
    removed: &BTreeSet<Guid>,
    ctx: &mut RequestContext,
) -> StoreResult<()> {
    for guid in graph.all_vertex_guids() {
        if removed.contains(&guid) {
            continue;
        }
        let Some(vertex) = graph.get_vertex(&guid) else {
            continue;
        };
        if !vertex.is_active() {
            continue;
        }

        let mut changed = vertex.clone();
        for attrs in [&mut changed.attributes, &mut changed.relationship_attributes] {
            let stripped = attrs
                .iter()
                .filter_map(|(k, v)| strip_references(v, removed).map(|v| (k.clone(), v)))
                .collect();
            *attrs = stripped;
        }
        if changed.attributes == vertex.attributes
            && changed.relationship_attributes == vertex.relationship_attributes
        {
            continue;
        }

        touch(&mut changed, ctx.user());
        let header = changed.header();
        graph.put_vertex(changed)?;
        ctx.record_updated(header);
    }
    Ok(())
}

/// Marks entities deleted, keeping their data for reactivation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftDeleteHandler;

impl DeleteHandler for SoftDeleteHandler {
    fn delete_entities(
        &self,
        graph: &mut dyn GraphStore,
        registry: &Registry,
        guids: &[Guid],
        ctx: &mut RequestContext,
    ) -> StoreResult<()> {
        let targets = expand(graph, registry, guids, Vertex::is_active);
        if targets.is_empty() {
            return Ok(());
        }
        debug!(count = targets.len(), "soft-deleting entities");

        let user = ctx.user().to_string();
        for guid in &targets {
            graph.update_vertex(guid, &mut |v: &mut Vertex| {
                v.status = EntityStatus::Deleted;
                touch(v, &user);
            })?;
            if let Some(vertex) = graph.get_vertex(guid) {
                ctx.record_deleted(vertex.header());
            }
        }

        let removed: BTreeSet<Guid> = targets.into_iter().collect();
        detach_referrers(graph, &removed, ctx)
    }
}

/// Removes vertices from the graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardDeleteHandler;

impl DeleteHandler for HardDeleteHandler {
    fn delete_entities(
        &self,
        graph: &mut dyn GraphStore,
        registry: &Registry,
        guids: &[Guid],
        ctx: &mut RequestContext,
    ) -> StoreResult<()> {
        let targets = expand(graph, registry, guids, |_| true);
        if targets.is_empty() {
            return Ok(());
        }
        debug!(count = targets.len(), "removing entities");

        for guid in &targets {
            let mut vertex = graph.remove_vertex(guid)?;
            vertex.status = EntityStatus::Deleted;
            ctx.record_deleted(vertex.header());
        }

        let removed: BTreeSet<Guid> = targets.into_iter().collect();
        detach_referrers(graph, &removed, ctx)
    }
}
