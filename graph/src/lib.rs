//! Strata Graph Storage
//!
//! The graph accessor contract consumed by the mutation core, plus an
//! in-memory backend:
//! - Vertex storage keyed by GUID
//! - Type index: find vertices by type
//! - Unique-attribute index: find a vertex by (type, attribute, value)

mod index;
mod memory;
mod store;
mod vertex;

pub use index::{AttrValue, TypeIndex, UniqueIndex, UniqueKey};
pub use memory::MemoryGraph;
pub use store::GraphStore;
pub use vertex::Vertex;
