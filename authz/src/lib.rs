//! Strata Authorization
//!
//! The access-request model and the authorizer contract the mutation core
//! checks before every write. Policy evaluation lives behind [`Authorizer`].

mod authorizer;
mod error;
mod privilege;
mod request;

pub use authorizer::{AllowAll, Authorizer, Grant, GrantTable, RecordingAuthorizer};
pub use error::{AuthorizationError, AuthorizationResult};
pub use privilege::Privilege;
pub use request::{
    AccessRequest, AdminAccessRequest, CallerIdentity, EntityAccessRequest,
    EntityAccessRequestBuilder,
};
