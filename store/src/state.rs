//! Entity state checks and repair.

use crate::mapper::strip_references;
use crate::{EntityStore, RequestContext, StoreResult};
use std::collections::{BTreeMap, BTreeSet};
use strata_core::{Guid, Value};
use strata_graph::{GraphStore, Vertex};
use strata_registry::Registry;
use tracing::{debug, info, warn};

/// Which entities to check, and whether to repair what can be repaired.
///
/// With neither `guids` nor `type_names` every vertex is checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckStateRequest {
    pub guids: Vec<Guid>,
    pub type_names: Vec<String>,
    pub fix_issues: bool,
}

impl CheckStateRequest {
    pub fn for_guids(guids: impl IntoIterator<Item = Guid>) -> Self {
        Self {
            guids: guids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn for_types<S: Into<String>>(type_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            type_names: type_names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn fixing(mut self) -> Self {
        self.fix_issues = true;
        self
    }
}

/// Outcome of checking one entity. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityState {
    Ok,
    Fixed,
    Corrupted,
    NotFound,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Ok => "OK",
            EntityState::Fixed => "FIXED",
            EntityState::Corrupted => "CORRUPTED",
            EntityState::NotFound => "NOT_FOUND",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityStateResult {
    pub guid: Guid,
    pub type_name: Option<String>,
    pub state: EntityState,
    pub issues: Vec<String>,
}

/// Per-entity results of one state check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckStateResult {
    pub entities: BTreeMap<Guid, EntityStateResult>,
}

impl CheckStateResult {
    pub fn get(&self, guid: &Guid) -> Option<&EntityStateResult> {
        self.entities.get(guid)
    }

    pub fn scanned(&self) -> usize {
        self.entities.len()
    }

    pub fn count(&self, state: EntityState) -> usize {
        self.entities.values().filter(|e| e.state == state).count()
    }

    /// The worst state found; `Ok` when nothing was scanned.
    pub fn state(&self) -> EntityState {
        self.entities
            .values()
            .map(|e| e.state)
            .max()
            .unwrap_or(EntityState::Ok)
    }
}

impl<G: GraphStore + Send> EntityStore<G> {
    /// Check entities for an unknown type, unindexed or contested unique
    /// values, unknown classifications and references to missing vertices.
    ///
    /// With `fix_issues` repairable issues are repaired in the same
    /// transaction. An unknown type or a contested unique value leaves the
    /// entity corrupted.
    pub fn check_state(
        &self,
        ctx: &mut RequestContext,
        request: &CheckStateRequest,
    ) -> StoreResult<CheckStateResult> {
        let locks = if request.fix_issues {
            request.guids.clone()
        } else {
            Vec::new()
        };
        self.run(ctx, "checkState", locks, |tx, _| {
            check_state_in(tx, &self.registry, request)
        })
    }
}

fn check_state_in(
    graph: &mut dyn GraphStore,
    registry: &Registry,
    request: &CheckStateRequest,
) -> StoreResult<CheckStateResult> {
    let mut guids: BTreeSet<Guid> = request.guids.iter().cloned().collect();
    for type_name in &request.type_names {
        guids.extend(graph.vertex_guids_of_type(type_name));
    }
    if request.guids.is_empty() && request.type_names.is_empty() {
        guids.extend(graph.all_vertex_guids());
    }

    let mut result = CheckStateResult::default();
    for guid in guids {
        let Some(vertex) = graph.get_vertex(&guid) else {
            debug!(guid = %guid, "check state: entity not found");
            result.entities.insert(
                guid.clone(),
                EntityStateResult {
                    guid,
                    type_name: None,
                    state: EntityState::NotFound,
                    issues: Vec::new(),
                },
            );
            continue;
        };

        let mut checked = Checked::new(vertex.clone());
        checked.check_type(registry);
        checked.check_unique_values(registry, &*graph);
        checked.check_classifications(registry);
        checked.check_references(&*graph);

        let state = if checked.unfixable {
            EntityState::Corrupted
        } else if checked.issues.is_empty() {
            EntityState::Ok
        } else if request.fix_issues {
            graph.put_vertex(checked.repaired.clone())?;
            info!(guid = %guid, issues = checked.issues.len(), "entity state repaired");
            EntityState::Fixed
        } else {
            EntityState::Corrupted
        };
        if state == EntityState::Corrupted {
            warn!(guid = %guid, issues = ?checked.issues, "entity state corrupted");
        }

        result.entities.insert(
            guid.clone(),
            EntityStateResult {
                guid,
                type_name: Some(checked.repaired.type_name),
                state,
                issues: checked.issues,
            },
        );
    }
    Ok(result)
}

/// Issues found on one vertex, and the vertex with fixable ones repaired.
struct Checked {
    repaired: Vertex,
    issues: Vec<String>,
    unfixable: bool,
}

impl Checked {
    fn new(vertex: Vertex) -> Self {
        Self {
            repaired: vertex,
            issues: Vec::new(),
            unfixable: false,
        }
    }

    fn check_type(&mut self, registry: &Registry) {
        if registry.entity_type(&self.repaired.type_name).is_none() {
            self.issues
                .push(format!("unknown entity type {}", self.repaired.type_name));
            self.unfixable = true;
        }
    }

    /// Only active vertices hold unique values.
    fn check_unique_values(&mut self, registry: &Registry, graph: &dyn GraphStore) {
        if !self.repaired.is_active() {
            return;
        }
        let vertex = &self.repaired;
        for def in registry.unique_attributes(&vertex.type_name) {
            let Some(value) = vertex.attributes.get(&def.name) else {
                continue;
            };
            if matches!(value, Value::Null | Value::List(_) | Value::Map(_) | Value::Ref(_)) {
                continue;
            }
            match graph.find_by_unique_attribute(&vertex.type_name, &def.name, value) {
                Some(holder) if holder.guid == vertex.guid => {}
                Some(holder) => {
                    self.issues.push(format!(
                        "unique attribute {} is held by {}",
                        def.name, holder.guid
                    ));
                    self.unfixable = true;
                }
                // Writing the vertex back re-indexes it
                None => self
                    .issues
                    .push(format!("unique attribute {} is not indexed", def.name)),
            }
        }
    }

    fn check_classifications(&mut self, registry: &Registry) {
        let (known, unknown): (Vec<_>, Vec<_>) = std::mem::take(&mut self.repaired.classifications)
            .into_iter()
            .partition(|c| registry.classification_type(&c.type_name).is_some());
        for classification in &unknown {
            self.issues
                .push(format!("unknown classification {}", classification.type_name));
        }
        self.repaired.classifications = known;
    }

    fn check_references(&mut self, graph: &dyn GraphStore) {
        let mut missing = BTreeSet::new();
        for value in self
            .repaired
            .attributes
            .values()
            .chain(self.repaired.relationship_attributes.values())
        {
            collect_missing_references(graph, value, &mut missing);
        }
        if missing.is_empty() {
            return;
        }

        for guid in &missing {
            self.issues.push(format!("reference to missing entity {}", guid));
        }
        for attrs in [
            &mut self.repaired.attributes,
            &mut self.repaired.relationship_attributes,
        ] {
            *attrs = attrs
                .iter()
                .filter_map(|(k, v)| strip_references(v, &missing).map(|v| (k.clone(), v)))
                .collect();
        }
    }
}

fn collect_missing_references(graph: &dyn GraphStore, value: &Value, missing: &mut BTreeSet<Guid>) {
    match value {
        Value::Ref(id) => {
            if let Some(guid) = id.assigned_guid() {
                if graph.get_vertex(guid).is_none() {
                    missing.insert(guid.clone());
                }
            }
        }
        Value::List(items) => {
            for item in items {
                collect_missing_references(graph, item, missing);
            }
        }
        Value::Map(entries) => {
            for item in entries.values() {
                collect_missing_references(graph, item, missing);
            }
        }
        _ => {}
    }
}
