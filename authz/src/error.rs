//! Authorization error types.

use crate::Privilege;
use thiserror::Error;

/// Authorization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The caller lacks the privilege on the resource.
    #[error("{user} is not authorized to perform {privilege} {resource}")]
    Denied {
        user: String,
        privilege: Privilege,
        resource: String,
    },
}

impl AuthorizationError {
    pub fn denied(
        user: impl Into<String>,
        privilege: Privilege,
        resource: impl Into<String>,
    ) -> Self {
        Self::Denied {
            user: user.into(),
            privilege,
            resource: resource.into(),
        }
    }
}

/// Result type for authorization checks.
pub type AuthorizationResult<T> = Result<T, AuthorizationError>;
