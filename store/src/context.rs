//! Per-request context threaded through every store operation.

use crate::ChangeEvent;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use strata_authz::CallerIdentity;
use strata_core::{EntityHeader, Guid};

/// Elapsed time of one named step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub name: String,
    pub elapsed: Duration,
}

/// Explicit request state: who is calling, in which mode, and what the
/// calls made with this context have observed so far.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    caller: CallerIdentity,
    import_in_progress: bool,
    skipped: BTreeSet<Guid>,
    guid_updates: BTreeMap<Guid, Guid>,
    metrics: Vec<MetricRecord>,
    deleted: BTreeMap<Guid, EntityHeader>,
    updated: BTreeMap<Guid, EntityHeader>,
    pending_events: Vec<ChangeEvent>,
}

impl RequestContext {
    pub fn new(caller: CallerIdentity) -> Self {
        Self {
            caller,
            ..Default::default()
        }
    }

    /// Context for an import: authorization of individual entities is
    /// skipped and caller-supplied GUIDs are kept.
    pub fn for_import(caller: CallerIdentity) -> Self {
        Self {
            caller,
            import_in_progress: true,
            ..Default::default()
        }
    }

    pub fn caller(&self) -> &CallerIdentity {
        &self.caller
    }

    pub fn user(&self) -> &str {
        &self.caller.user
    }

    pub fn is_import_in_progress(&self) -> bool {
        self.import_in_progress
    }

    pub fn set_import_in_progress(&mut self, import_in_progress: bool) {
        self.import_in_progress = import_in_progress;
    }

    // ==================== Skip List ====================

    /// Mark an entity as unchanged so later phases leave it alone.
    pub fn record_skipped(&mut self, guid: Guid) {
        self.skipped.insert(guid);
    }

    pub fn is_skipped(&self, guid: &Guid) -> bool {
        self.skipped.contains(guid)
    }

    pub fn skipped_guids(&self) -> &BTreeSet<Guid> {
        &self.skipped
    }

    // ==================== GUID Updates ====================

    pub fn record_guid_update(&mut self, from: Guid, to: Guid) {
        self.guid_updates.insert(from, to);
    }

    pub fn guid_updates(&self) -> &BTreeMap<Guid, Guid> {
        &self.guid_updates
    }

    // ==================== Metrics ====================

    pub fn record_metric(&mut self, name: impl Into<String>, elapsed: Duration) {
        self.metrics.push(MetricRecord {
            name: name.into(),
            elapsed,
        });
    }

    pub fn metrics(&self) -> &[MetricRecord] {
        &self.metrics
    }

    // ==================== Delete Report ====================

    pub fn record_deleted(&mut self, header: EntityHeader) {
        self.updated.remove(&header.guid);
        self.deleted.insert(header.guid.clone(), header);
    }

    /// Record an entity changed as a side effect of a delete. Entities
    /// already reported deleted stay deleted.
    pub fn record_updated(&mut self, header: EntityHeader) {
        if !self.deleted.contains_key(&header.guid) {
            self.updated.insert(header.guid.clone(), header);
        }
    }

    pub fn deleted_entities(&self) -> impl Iterator<Item = &EntityHeader> {
        self.deleted.values()
    }

    pub fn updated_entities(&self) -> impl Iterator<Item = &EntityHeader> {
        self.updated.values()
    }

    pub fn is_deleted_in_request(&self, guid: &Guid) -> bool {
        self.deleted.contains_key(guid)
    }

    pub(crate) fn clear_delete_report(&mut self) {
        self.deleted.clear();
        self.updated.clear();
    }

    // ==================== Pending Events ====================

    pub(crate) fn queue_event(&mut self, event: ChangeEvent) {
        self.pending_events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.pending_events)
    }
}
