//! Input batches.

use std::collections::HashMap;
use strata_core::{Entity, Guid};

/// A batch of entities submitted in one call, plus entities the batch only
/// refers to. Entities submitted without a GUID get a batch-local one.
#[derive(Debug, Clone, Default)]
pub struct EntityStream {
    entities: Vec<Entity>,
    /// Index by the GUID each entity was submitted with.
    by_guid: HashMap<Guid, usize>,
}

impl EntityStream {
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut stream = Self::default();
        for entity in entities {
            stream.push(entity);
        }
        stream
    }

    pub fn single(entity: Entity) -> Self {
        Self::new(vec![entity])
    }

    /// Add a referred entity.
    pub fn with_referred(mut self, entity: Entity) -> Self {
        self.push(entity);
        self
    }

    fn push(&mut self, mut entity: Entity) {
        if entity.guid.is_empty() {
            let mut seq = self.entities.len() as u64 + 1;
            while self.by_guid.contains_key(&Guid::temporary(seq)) {
                seq += 1;
            }
            entity.guid = Guid::temporary(seq);
        }
        self.by_guid.insert(entity.guid.clone(), self.entities.len());
        self.entities.push(entity);
    }

    /// Look up an entity by the GUID it was submitted with.
    pub fn get_by_guid(&self, guid: &Guid) -> Option<&Entity> {
        self.by_guid.get(guid).map(|&i| &self.entities[i])
    }

    pub(crate) fn get_by_guid_mut(&mut self, guid: &Guid) -> Option<&mut Entity> {
        self.by_guid.get(guid).map(|&i| &mut self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl From<Vec<Entity>> for EntityStream {
    fn from(entities: Vec<Entity>) -> Self {
        Self::new(entities)
    }
}

impl From<Entity> for EntityStream {
    fn from(entity: Entity) -> Self {
        Self::single(entity)
    }
}
