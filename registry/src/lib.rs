//! Type registry for the catalog.
//!
//! Resolves entity, classification and business-metadata type names to
//! their schema, and provides the type-aware validation, normalization and
//! equality used by the mutation core. Read-only after construction.

mod builder;
mod registry;
mod types;
mod validation;

pub use builder::{
    BusinessMetadataBuilder, ClassificationTypeBuilder, EntityTypeBuilder, RegistryBuilder,
    RegistryError,
};
pub use registry::Registry;
pub use types::*;
