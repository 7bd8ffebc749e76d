//! The catalog fixture: a small data-lake type system, the users acting on
//! it, and a store wired with recording collaborators.

use crate::error::{ScenarioError, ScenarioResult};
use crate::notifier::RecordingNotifier;
use std::sync::Arc;
use strata_authz::{Authorizer, CallerIdentity, Grant, GrantTable, Privilege, RecordingAuthorizer};
use strata_core::{attrs, Entity, Guid, ObjectId};
use strata_graph::MemoryGraph;
use strata_registry::{AttrDef, AttrType, Registry, RegistryBuilder};
use strata_store::{EntityMutationResponse, EntityStore, EntityStream, RequestContext, StoreConfig, StoreResult};
use tracing_subscriber::EnvFilter;

/// Holds every privilege.
pub const ADMIN: &str = "admin";
/// Holds every privilege except purge.
pub const STEWARD: &str = "steward";
/// May only read.
pub const READER: &str = "reader";
/// May read, create and update tables, nothing else.
pub const TABLE_EDITOR: &str = "table-editor";

const ENTITY_PRIVILEGES: [Privilege; 10] = [
    Privilege::EntityRead,
    Privilege::EntityCreate,
    Privilege::EntityUpdate,
    Privilege::EntityDelete,
    Privilege::EntityAddClassification,
    Privilege::EntityUpdateClassification,
    Privilege::EntityRemoveClassification,
    Privilege::EntityAddLabel,
    Privilege::EntityRemoveLabel,
    Privilege::EntityUpdateBusinessMetadata,
];

/// Install a test subscriber once; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The catalog type system.
///
/// `Asset` carries the unique `qualifiedName`; tables own their columns
/// through a composite relationship; processes link assets as inputs and
/// outputs.
pub fn catalog_registry() -> ScenarioResult<Registry> {
    let mut builder = RegistryBuilder::new();
    let fixture = |e: strata_registry::RegistryError| ScenarioError::fixture(e.to_string());

    builder
        .add_entity_type("Asset")
        .attr(AttrDef::new("qualifiedName", AttrType::String).unique())
        .attr(AttrDef::new("name", AttrType::String))
        .attr(AttrDef::new("description", AttrType::String))
        .done()
        .map_err(fixture)?;
    builder
        .add_entity_type("Database")
        .extends("Asset")
        .done()
        .map_err(fixture)?;
    builder
        .add_entity_type("Table")
        .extends("Asset")
        .attr(AttrDef::new("rowCount", AttrType::Long))
        .relationship("db", "table_db", AttrType::object_id("Database"))
        .composite("columns", "table_columns", AttrType::array(AttrType::object_id("Column")))
        .done()
        .map_err(fixture)?;
    builder
        .add_entity_type("Column")
        .extends("Asset")
        .attr(AttrDef::new("dataType", AttrType::String))
        .relationship("table", "table_columns", AttrType::object_id("Table"))
        .done()
        .map_err(fixture)?;
    builder
        .add_entity_type("Process")
        .extends("Asset")
        .relationship("inputs", "process_inputs", AttrType::array(AttrType::object_id("Asset")))
        .relationship("outputs", "process_outputs", AttrType::array(AttrType::object_id("Asset")))
        .done()
        .map_err(fixture)?;

    builder
        .add_classification_type("PII")
        .attr(AttrDef::new("level", AttrType::Int))
        .done()
        .map_err(fixture)?;
    builder
        .add_classification_type("Confidential")
        .applies_to("Table")
        .done()
        .map_err(fixture)?;
    builder
        .add_classification_type("Deprecated")
        .done()
        .map_err(fixture)?;

    builder
        .add_business_metadata("Governance")
        .attr(AttrDef::new("owner", AttrType::String).required(), ["Asset"])
        .attr(AttrDef::new("steward", AttrType::String), ["Asset"])
        .done()
        .map_err(fixture)?;
    builder
        .add_business_metadata("Finance")
        .attr(AttrDef::new("costCenter", AttrType::String).with_max_length(8), ["Table"])
        .attr(AttrDef::new("budgets", AttrType::array(AttrType::Double)), ["Table"])
        .done()
        .map_err(fixture)?;

    builder.build().map_err(fixture)
}

/// Grants of the fixture users.
pub fn catalog_grants() -> GrantTable {
    GrantTable::new()
        .grant_user_all(ADMIN, ENTITY_PRIVILEGES.into_iter().chain([Privilege::AdminPurge]))
        .grant_user_all(STEWARD, ENTITY_PRIVILEGES)
        .grant_user(READER, Grant::any(Privilege::EntityRead))
        .grant_user(TABLE_EDITOR, Grant::any(Privilege::EntityRead))
        .grant_user(TABLE_EDITOR, Grant::on_type(Privilege::EntityCreate, "Table"))
        .grant_user(TABLE_EDITOR, Grant::on_type(Privilege::EntityUpdate, "Table"))
}

/// A request context for a fixture user.
pub fn ctx(user: &str) -> RequestContext {
    RequestContext::new(CallerIdentity::new(user))
}

/// Reference by qualified name.
pub fn by_name(type_name: &str, qualified_name: &str) -> ObjectId {
    ObjectId::by_unique_attributes(type_name, attrs! { "qualifiedName" => qualified_name })
}

pub fn database(qualified_name: &str) -> Entity {
    Entity::new("Database", Guid::default()).with_attr("qualifiedName", qualified_name)
}

pub fn table(qualified_name: &str) -> Entity {
    Entity::new("Table", Guid::default()).with_attr("qualifiedName", qualified_name)
}

pub fn column(qualified_name: &str, table: &str) -> Entity {
    Entity::new("Column", Guid::default())
        .with_attr("qualifiedName", qualified_name)
        .with_relationship("table", by_name("Table", table))
}

pub fn process(qualified_name: &str, inputs: Vec<ObjectId>, outputs: Vec<ObjectId>) -> Entity {
    Entity::new("Process", Guid::default())
        .with_attr("qualifiedName", qualified_name)
        .with_relationship("inputs", inputs)
        .with_relationship("outputs", outputs)
}

/// A store over the catalog with recording collaborators.
pub struct Catalog {
    pub store: EntityStore,
    pub notifier: Arc<RecordingNotifier>,
    pub authorizer: Arc<RecordingAuthorizer<Arc<dyn Authorizer>>>,
}

impl Catalog {
    /// The catalog with the fixture grants.
    pub fn new() -> ScenarioResult<Self> {
        Self::build(Arc::new(catalog_grants()), StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> ScenarioResult<Self> {
        Self::build(Arc::new(catalog_grants()), config)
    }

    pub fn build(authorizer: Arc<dyn Authorizer>, config: StoreConfig) -> ScenarioResult<Self> {
        init_tracing();
        let registry = Arc::new(catalog_registry()?);
        let notifier = Arc::new(RecordingNotifier::new());
        let authorizer = Arc::new(RecordingAuthorizer::new(authorizer));
        let store = EntityStore::new(MemoryGraph::new(registry.clone()), registry, config)
            .map_err(|e| ScenarioError::fixture(e.to_string()))?
            .with_authorizer(authorizer.clone())
            .with_notifier(notifier.clone());
        Ok(Self {
            store,
            notifier,
            authorizer,
        })
    }

    /// Create or fully update entities as `user`.
    pub fn create(&self, user: &str, entities: Vec<Entity>) -> StoreResult<EntityMutationResponse> {
        self.store
            .create_or_update(&mut ctx(user), EntityStream::new(entities), false, false, false)
    }

    /// GUID of an active entity by qualified name.
    pub fn guid_of(&self, type_name: &str, qualified_name: &str) -> StoreResult<Guid> {
        self.store
            .guid_by_unique_attributes(type_name, &attrs! { "qualifiedName" => qualified_name })
    }

    /// Read an entity as the admin.
    pub fn entity(&self, guid: &Guid) -> StoreResult<Entity> {
        self.store.get_by_id(&ctx(ADMIN), guid)
    }

    /// Forget recorded access requests and events.
    pub fn reset_recordings(&self) {
        self.authorizer.clear();
        self.notifier.clear();
    }
}
