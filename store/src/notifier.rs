//! Change notification contract.
//!
//! Events are queued on the request context while a call runs and handed to
//! the notifier only after its transaction commits; a rolled-back call
//! reports nothing.

use crate::EntityMutationResponse;
use std::collections::BTreeSet;
use std::sync::Arc;
use strata_core::{BusinessAttributes, Classification, EntityHeader};

/// A committed change, as seen by downstream indexing and audit.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    EntitiesMutated {
        response: EntityMutationResponse,
        is_import: bool,
    },
    ClassificationsAdded {
        entity: EntityHeader,
        classifications: Vec<Classification>,
    },
    ClassificationsUpdated {
        entity: EntityHeader,
        classifications: Vec<Classification>,
    },
    ClassificationsDeleted {
        entity: EntityHeader,
        classifications: Vec<Classification>,
    },
    LabelsAdded {
        entity: EntityHeader,
        labels: BTreeSet<String>,
    },
    LabelsDeleted {
        entity: EntityHeader,
        labels: BTreeSet<String>,
    },
    BusinessAttributesUpdated {
        entity: EntityHeader,
        updated: BusinessAttributes,
    },
}

impl ChangeEvent {
    /// Short event name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::EntitiesMutated { .. } => "entities-mutated",
            ChangeEvent::ClassificationsAdded { .. } => "classifications-added",
            ChangeEvent::ClassificationsUpdated { .. } => "classifications-updated",
            ChangeEvent::ClassificationsDeleted { .. } => "classifications-deleted",
            ChangeEvent::LabelsAdded { .. } => "labels-added",
            ChangeEvent::LabelsDeleted { .. } => "labels-deleted",
            ChangeEvent::BusinessAttributesUpdated { .. } => "business-attributes-updated",
        }
    }
}

/// Receives committed changes.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, event: &ChangeEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _event: &ChangeEvent) {}
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Arc<N> {
    fn notify(&self, event: &ChangeEvent) {
        (**self).notify(event)
    }
}
