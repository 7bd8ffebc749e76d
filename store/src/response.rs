//! Mutation and import reports.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use strata_core::{EntityHeader, Guid};

/// Operation applied to an entity by a mutation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityOperation {
    Create,
    Update,
    Delete,
    Purge,
}

impl EntityOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityOperation::Create => "CREATE",
            EntityOperation::Update => "UPDATE",
            EntityOperation::Delete => "DELETE",
            EntityOperation::Purge => "PURGE",
        }
    }

    /// Reports of higher rank replace lower ones for the same entity.
    fn rank(&self) -> u8 {
        match self {
            EntityOperation::Update => 0,
            EntityOperation::Create => 1,
            EntityOperation::Delete | EntityOperation::Purge => 2,
        }
    }
}

impl fmt::Display for EntityOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-entity operation report of one mutation call, plus the identifiers
/// reassigned while processing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMutationResponse {
    entries: BTreeMap<Guid, (EntityOperation, EntityHeader)>,
    guid_assignments: HashMap<Guid, Guid>,
}

impl EntityMutationResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation. An entity keeps a single entry: deletion wins
    /// over creation, which wins over update.
    pub fn add(&mut self, op: EntityOperation, header: EntityHeader) {
        match self.entries.get(&header.guid) {
            Some((existing, _)) if existing.rank() > op.rank() => {}
            _ => {
                self.entries.insert(header.guid.clone(), (op, header));
            }
        }
    }

    pub fn set_guid_assignments(&mut self, assignments: HashMap<Guid, Guid>) {
        self.guid_assignments = assignments;
    }

    /// Temporary (or unique-attribute matched) GUID to persisted GUID.
    pub fn guid_assignments(&self) -> &HashMap<Guid, Guid> {
        &self.guid_assignments
    }

    pub fn operation(&self, guid: &Guid) -> Option<EntityOperation> {
        self.entries.get(guid).map(|(op, _)| *op)
    }

    pub fn entities_by_operation(&self, op: EntityOperation) -> Vec<&EntityHeader> {
        self.entries
            .values()
            .filter(|(o, _)| *o == op)
            .map(|(_, h)| h)
            .collect()
    }

    pub fn created(&self) -> Vec<&EntityHeader> {
        self.entities_by_operation(EntityOperation::Create)
    }

    pub fn updated(&self) -> Vec<&EntityHeader> {
        self.entities_by_operation(EntityOperation::Update)
    }

    pub fn deleted(&self) -> Vec<&EntityHeader> {
        self.entities_by_operation(EntityOperation::Delete)
    }

    pub fn purged(&self) -> Vec<&EntityHeader> {
        self.entities_by_operation(EntityOperation::Purge)
    }

    pub fn first_created(&self) -> Option<&EntityHeader> {
        self.created().into_iter().next()
    }

    pub fn first_updated(&self) -> Option<&EntityHeader> {
        self.updated().into_iter().next()
    }

    /// All entries, ordered by GUID.
    pub fn iter(&self) -> impl Iterator<Item = (EntityOperation, &EntityHeader)> {
        self.entries.values().map(|(op, h)| (*op, h))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one bulk-import row or entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    pub parent_object_name: String,
    pub child_object_name: String,
    pub status: ImportStatus,
    pub remarks: String,
    /// 1-based row number, for row-level failures.
    pub line: Option<usize>,
}

impl ImportInfo {
    pub fn success(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent_object_name: parent.into(),
            child_object_name: child.into(),
            status: ImportStatus::Success,
            remarks: String::new(),
            line: None,
        }
    }

    pub fn failed(remarks: impl Into<String>) -> Self {
        Self {
            parent_object_name: String::new(),
            child_object_name: String::new(),
            status: ImportStatus::Failed,
            remarks: remarks.into(),
            line: None,
        }
    }

    pub fn with_names(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.parent_object_name = parent.into();
        self.child_object_name = child.into();
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Report of a bulk business-metadata import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkImportResponse {
    pub success: Vec<ImportInfo>,
    pub failed: Vec<ImportInfo>,
}
