//! Strata Core Types
//!
//! This crate provides the foundational types used throughout the catalog:
//! - Identity types (Guid, ObjectId)
//! - Value types (the Value enum with scalar, reference and container values)
//! - Entity structures (Entity, EntityHeader, Classification)
//! - Common error types and message constants

mod entity;
mod error;
mod id;
pub mod messages;
mod value;

pub use entity::*;
pub use error::*;
pub use id::*;
pub use value::*;
