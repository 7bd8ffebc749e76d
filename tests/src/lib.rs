//! Strata Tests
//!
//! Scenario-driven integration testing for the entity store.
//!
//! Responsibilities:
//! - Provide the catalog fixture: type system, users and grants
//! - Run named steps against a fresh store and verify each result
//! - Record access requests and change events per step

pub mod error;
pub mod fixture;
pub mod notifier;
pub mod scenario;

pub use assertion::{Assertion, AssertionBuilder, StepOutcome};
pub use error::{ScenarioError, ScenarioResult};
pub use fixture::Catalog;
pub use notifier::RecordingNotifier;
pub use scenario::{Scenario, Step};

/// Everything an integration test file needs.
pub mod prelude {
    pub use crate::fixture::{
        by_name, catalog_grants, catalog_registry, column, ctx, database, init_tracing, process,
        table, ADMIN, READER, STEWARD, TABLE_EDITOR,
    };
    pub use crate::{Assertion, AssertionBuilder, Catalog, Scenario, ScenarioResult, StepOutcome};
    pub use strata_authz::{Privilege, RecordingAuthorizer};
    pub use strata_core::{
        attrs, Attributes, BusinessAttributes, Classification, Entity, EntityHeader, EntityStatus,
        ErrorCode, Guid, ObjectId, Value,
    };
    pub use strata_store::{EntityOperation, EntityStream, ImportStatus, StoreConfig, StoreError};
}
