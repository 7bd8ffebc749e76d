//! Common error messages used across catalog components.
//!
//! These constants keep the wording of parameter errors consistent between
//! the entity store operations.

/// Error: no GUID supplied.
pub const ERR_GUID_NOT_SPECIFIED: &str = "Guid(s) not specified";

/// Error: GUID argument is empty.
pub const ERR_GUID_EMPTY: &str = "guid is null/empty";

/// Error: no classifications supplied.
pub const ERR_CLASSIFICATIONS_NOT_SPECIFIED: &str = "classifications(s) not specified";

/// Error: no classification supplied.
pub const ERR_CLASSIFICATION_NOT_SPECIFIED: &str = "classification not specified";

/// Error: no labels supplied.
pub const ERR_LABELS_EMPTY: &str = "labels is null/empty";

/// Error: no business attributes supplied.
pub const ERR_BUSINESS_ATTRIBUTES_EMPTY: &str = "businessAttributes is null/empty";

/// Error: create-or-update called without entities.
pub const ERR_NO_ENTITIES: &str = "no entities to create/update.";

/// Error: update called without an entity or object id.
pub const ERR_NULL_ENTITY: &str = "null entity-id/entity";

/// Error: update by unique attributes called without an entity.
pub const ERR_NO_ENTITY_TO_UPDATE: &str = "no entity to update.";
