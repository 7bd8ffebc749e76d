//! Entity store error types.

use strata_authz::AuthorizationError;
use strata_core::{ErrorCode, ErrorKind, GraphError};
use strata_transaction::TransactionError;
use thiserror::Error;

/// Result type for entity store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A typed failure carrying a machine-readable code and every message
/// collected before the failure was raised.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{code}: {}", .messages.join("; "))]
    NotFound {
        code: ErrorCode,
        messages: Vec<String>,
    },

    #[error("{code}: {}", .messages.join("; "))]
    InvalidParameters {
        code: ErrorCode,
        messages: Vec<String>,
    },

    #[error("UNAUTHORIZED_ACCESS: {source}")]
    AuthorizationDenied {
        #[from]
        source: AuthorizationError,
    },

    #[error("{code}: {}", .messages.join("; "))]
    ValidationFailed {
        code: ErrorCode,
        messages: Vec<String>,
    },

    #[error("{code}: {}", .messages.join("; "))]
    UnsupportedOperation {
        code: ErrorCode,
        messages: Vec<String>,
    },

    #[error("{code}: {}", .messages.join("; "))]
    Storage {
        code: ErrorCode,
        messages: Vec<String>,
    },
}

impl StoreError {
    /// Build an error of the category `code` reports under.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_messages(code, vec![message.into()])
    }

    pub fn with_messages(code: ErrorCode, messages: Vec<String>) -> Self {
        match code.kind() {
            ErrorKind::NotFound => Self::NotFound { code, messages },
            ErrorKind::InvalidParameters => Self::InvalidParameters { code, messages },
            ErrorKind::ValidationFailed => Self::ValidationFailed { code, messages },
            ErrorKind::UnsupportedOperation => Self::UnsupportedOperation { code, messages },
            ErrorKind::Storage | ErrorKind::AuthorizationDenied => {
                Self::Storage { code, messages }
            }
        }
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            messages: vec![message.into()],
        }
    }

    pub fn guid_not_found(guid: impl std::fmt::Display) -> Self {
        Self::not_found(ErrorCode::InstanceGuidNotFound, guid.to_string())
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            code: ErrorCode::InvalidParameters,
            messages: vec![message.into()],
        }
    }

    pub fn validation_failed(messages: Vec<String>) -> Self {
        Self::ValidationFailed {
            code: ErrorCode::InstanceCrudInvalidParams,
            messages,
        }
    }

    pub fn unsupported(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            code,
            messages: vec![message.into()],
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { code, .. }
            | Self::InvalidParameters { code, .. }
            | Self::ValidationFailed { code, .. }
            | Self::UnsupportedOperation { code, .. }
            | Self::Storage { code, .. } => *code,
            Self::AuthorizationDenied { .. } => ErrorCode::Unauthorized,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            Self::AuthorizationDenied { .. } => ErrorKind::AuthorizationDenied,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Human-readable messages.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::NotFound { messages, .. }
            | Self::InvalidParameters { messages, .. }
            | Self::ValidationFailed { messages, .. }
            | Self::UnsupportedOperation { messages, .. }
            | Self::Storage { messages, .. } => messages.clone(),
            Self::AuthorizationDenied { source } => vec![source.to_string()],
        }
    }
}

impl From<GraphError> for StoreError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::VertexNotFound(guid) => Self::guid_not_found(guid),
            other => Self::Storage {
                code: ErrorCode::GraphFailure,
                messages: vec![other.to_string()],
            },
        }
    }
}

impl From<TransactionError> for StoreError {
    fn from(e: TransactionError) -> Self {
        Self::Storage {
            code: ErrorCode::LockTimeout,
            messages: vec![e.to_string()],
        }
    }
}
