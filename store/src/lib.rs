//! Strata Store
//!
//! The entity mutation core of the metadata catalog.
//!
//! Responsibilities:
//! - Resolve batches of entity descriptions against persisted state (discovery)
//! - Decide per entity whether it is created, updated, unchanged or deleted
//! - Authorize every change unit before anything is written
//! - Apply classification, label and business-metadata overlays
//! - Delete, purge and bulk-import with the same transactional guarantees
//! - Check persisted entities for inconsistent state and repair it

mod business;
mod classification;
mod config;
mod context;
mod diff;
mod discovery;
mod error;
mod gate;
mod handler;
mod import;
mod labels;
mod mapper;
mod mutate;
mod mutation_context;
mod notifier;
mod remove;
mod response;
mod state;
mod store;
mod stream;

pub use config::StoreConfig;
pub use context::{MetricRecord, RequestContext};
pub use diff::{updated_system_attributes, ChangeDetector, EntityDiff, SystemAttributes};
pub use discovery::{DiscoveryContext, DiscoveryEngine};
pub use error::{StoreError, StoreResult};
pub use gate::AuthorizationGate;
pub use handler::{DeleteHandler, HardDeleteHandler, SoftDeleteHandler};
pub use import::parse_import_rows;
pub use mapper::{DefaultGraphMapper, GraphMapper, MapOptions};
pub use mutation_context::EntityMutationContext;
pub use notifier::{ChangeEvent, ChangeNotifier, NoopNotifier};
pub use response::{
    BulkImportResponse, EntityMutationResponse, EntityOperation, ImportInfo, ImportStatus,
};
pub use state::{CheckStateRequest, CheckStateResult, EntityState, EntityStateResult};
pub use store::EntityStore;
pub use stream::EntityStream;
