//! Common error types for the catalog.

use crate::Guid;
use std::fmt;
use thiserror::Error;

/// Errors raised by a graph store backend.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Vertex not found.
    #[error("Vertex not found: {0}")]
    VertexNotFound(Guid),

    /// A vertex with this GUID already exists.
    #[error("Vertex already exists: {0}")]
    DuplicateGuid(Guid),

    /// Another vertex of the type already holds the unique attribute value.
    #[error("Unique attribute {attr} of type {type_name} already held by {existing}")]
    UniqueViolation {
        type_name: String,
        attr: String,
        existing: Guid,
    },

    /// Backend failure.
    #[error("Graph backend failure: {0}")]
    Backend(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Broad category of a failure, see [`ErrorCode::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidParameters,
    AuthorizationDenied,
    ValidationFailed,
    UnsupportedOperation,
    Storage,
}

/// Machine-readable failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InstanceGuidNotFound,
    InstanceByUniqueAttributeNotFound,
    ReferencedEntityNotFound,
    UnknownTypename,
    TypeNameInvalid,
    UnknownAttribute,
    ClassificationNotFound,
    InvalidParameters,
    ClassificationAlreadyAssociated,
    InvalidEntityForClassification,
    InvalidLabel,
    InvalidCustomAttribute,
    FileNameNotFound,
    Unauthorized,
    InstanceCrudInvalidParams,
    AttributeUpdateNotSupported,
    LockTimeout,
    GraphFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InstanceGuidNotFound => "INSTANCE_GUID_NOT_FOUND",
            ErrorCode::InstanceByUniqueAttributeNotFound => "INSTANCE_BY_UNIQUE_ATTRIBUTE_NOT_FOUND",
            ErrorCode::ReferencedEntityNotFound => "REFERENCED_ENTITY_NOT_FOUND",
            ErrorCode::UnknownTypename => "UNKNOWN_TYPENAME",
            ErrorCode::TypeNameInvalid => "TYPE_NAME_INVALID",
            ErrorCode::UnknownAttribute => "UNKNOWN_ATTRIBUTE",
            ErrorCode::ClassificationNotFound => "CLASSIFICATION_NOT_FOUND",
            ErrorCode::InvalidParameters => "INVALID_PARAMETERS",
            ErrorCode::ClassificationAlreadyAssociated => "CLASSIFICATION_ALREADY_ASSOCIATED",
            ErrorCode::InvalidEntityForClassification => "INVALID_ENTITY_FOR_CLASSIFICATION",
            ErrorCode::InvalidLabel => "INVALID_LABEL",
            ErrorCode::InvalidCustomAttribute => "INVALID_CUSTOM_ATTRIBUTE",
            ErrorCode::FileNameNotFound => "FILE_NAME_NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED_ACCESS",
            ErrorCode::InstanceCrudInvalidParams => "INSTANCE_CRUD_INVALID_PARAMS",
            ErrorCode::AttributeUpdateNotSupported => "ATTRIBUTE_UPDATE_NOT_SUPPORTED",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::GraphFailure => "GRAPH_FAILURE",
        }
    }

    /// Category this code reports under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::InstanceGuidNotFound
            | ErrorCode::InstanceByUniqueAttributeNotFound
            | ErrorCode::ReferencedEntityNotFound
            | ErrorCode::UnknownTypename
            | ErrorCode::TypeNameInvalid
            | ErrorCode::UnknownAttribute
            | ErrorCode::ClassificationNotFound => ErrorKind::NotFound,
            ErrorCode::InvalidParameters
            | ErrorCode::ClassificationAlreadyAssociated
            | ErrorCode::InvalidEntityForClassification
            | ErrorCode::InvalidLabel
            | ErrorCode::InvalidCustomAttribute
            | ErrorCode::FileNameNotFound => ErrorKind::InvalidParameters,
            ErrorCode::Unauthorized => ErrorKind::AuthorizationDenied,
            ErrorCode::InstanceCrudInvalidParams => ErrorKind::ValidationFailed,
            ErrorCode::AttributeUpdateNotSupported => ErrorKind::UnsupportedOperation,
            ErrorCode::LockTimeout | ErrorCode::GraphFailure => ErrorKind::Storage,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
