//! RegistryBuilder for constructing an immutable Registry.

use crate::{
    AttrDef, AttrType, BusinessAttrDef, BusinessMetadataDef, ClassificationTypeDef, EntityTypeDef,
    EnumDef, Registry, RelationshipAttrDef, SupertypeIndex,
};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors that can occur during registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateTypeName(String),

    #[error("Unknown parent type: {0}")]
    UnknownParentType(String),

    #[error("Unknown type {referenced} referenced by attribute {attr}")]
    UnknownReferencedType { attr: String, referenced: String },

    #[error("Unknown entity type {entity_type} in applicability of {owner}")]
    UnknownApplicableType { owner: String, entity_type: String },

    #[error("Relationship attribute {0} must reference an entity type")]
    InvalidRelationshipType(String),
}

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entity_types: HashMap<String, EntityTypeDef>,
    classification_types: HashMap<String, ClassificationTypeDef>,
    business_metadata: HashMap<String, BusinessMetadataDef>,
    enums: HashMap<String, EnumDef>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_defined(&self, name: &str) -> bool {
        self.entity_types.contains_key(name)
            || self.classification_types.contains_key(name)
            || self.business_metadata.contains_key(name)
            || self.enums.contains_key(name)
    }

    /// Add an entity type definition.
    pub fn add_entity_type(&mut self, name: impl Into<String>) -> EntityTypeBuilder<'_> {
        EntityTypeBuilder {
            builder: self,
            def: EntityTypeDef::new(name),
        }
    }

    /// Add a classification type definition.
    pub fn add_classification_type(&mut self, name: impl Into<String>) -> ClassificationTypeBuilder<'_> {
        ClassificationTypeBuilder {
            builder: self,
            def: ClassificationTypeDef {
                name: name.into(),
                supertypes: Vec::new(),
                attributes: HashMap::new(),
                entity_types: BTreeSet::new(),
            },
        }
    }

    /// Add a business-metadata namespace.
    pub fn add_business_metadata(&mut self, name: impl Into<String>) -> BusinessMetadataBuilder<'_> {
        BusinessMetadataBuilder {
            builder: self,
            def: BusinessMetadataDef {
                name: name.into(),
                attributes: HashMap::new(),
            },
        }
    }

    /// Add an enumeration.
    pub fn add_enum<I, S>(&mut self, name: impl Into<String>, values: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.is_defined(&name) {
            return Err(RegistryError::DuplicateTypeName(name));
        }
        let def = EnumDef {
            name: name.clone(),
            values: values.into_iter().map(Into::into).collect(),
        };
        self.enums.insert(name, def);
        Ok(())
    }

    fn check_attr_type(&self, attr: &str, attr_type: &AttrType) -> Result<(), RegistryError> {
        match attr_type {
            AttrType::ObjectId(name) if !self.entity_types.contains_key(name) => {
                Err(RegistryError::UnknownReferencedType {
                    attr: attr.to_string(),
                    referenced: name.clone(),
                })
            }
            AttrType::Enum(name) if !self.enums.contains_key(name) => {
                Err(RegistryError::UnknownReferencedType {
                    attr: attr.to_string(),
                    referenced: name.clone(),
                })
            }
            AttrType::Array(inner) | AttrType::Map(inner) => self.check_attr_type(attr, inner),
            _ => Ok(()),
        }
    }

    /// Build the immutable Registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        // References are resolved here so types may refer to each other in any order
        for def in self.entity_types.values() {
            for attr in def.attributes.values() {
                self.check_attr_type(&attr.name, &attr.attr_type)?;
            }
            for rel in def.relationship_attributes.values() {
                let target = match &rel.attr_type {
                    AttrType::ObjectId(_) => &rel.attr_type,
                    AttrType::Array(inner) if matches!(**inner, AttrType::ObjectId(_)) => inner,
                    _ => return Err(RegistryError::InvalidRelationshipType(rel.name.clone())),
                };
                self.check_attr_type(&rel.name, target)?;
            }
        }
        for def in self.classification_types.values() {
            for attr in def.attributes.values() {
                self.check_attr_type(&attr.name, &attr.attr_type)?;
            }
            for entity_type in &def.entity_types {
                if !self.entity_types.contains_key(entity_type) {
                    return Err(RegistryError::UnknownApplicableType {
                        owner: def.name.clone(),
                        entity_type: entity_type.clone(),
                    });
                }
            }
        }
        for def in self.business_metadata.values() {
            for attr in def.attributes.values() {
                self.check_attr_type(&attr.attr.name, &attr.attr.attr_type)?;
                for entity_type in &attr.applicable_entity_types {
                    if !self.entity_types.contains_key(entity_type) {
                        return Err(RegistryError::UnknownApplicableType {
                            owner: attr.qualified_name(),
                            entity_type: entity_type.clone(),
                        });
                    }
                }
            }
        }

        let entity_index =
            SupertypeIndex::build(self.entity_types.iter().map(|(n, d)| (n, &d.supertypes)));
        let classification_index = SupertypeIndex::build(
            self.classification_types
                .iter()
                .map(|(n, d)| (n, &d.supertypes)),
        );

        Ok(Registry::new(
            self.entity_types,
            self.classification_types,
            self.business_metadata,
            self.enums,
            entity_index,
            classification_index,
        ))
    }
}

/// Builder for an entity type definition.
pub struct EntityTypeBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    def: EntityTypeDef,
}

impl<'a> EntityTypeBuilder<'a> {
    /// Add a supertype by name.
    pub fn extends(mut self, parent_name: impl Into<String>) -> Self {
        self.def.supertypes.push(parent_name.into());
        self
    }

    /// Add an attribute.
    pub fn attr(mut self, attr: AttrDef) -> Self {
        self.def.attributes.insert(attr.name.clone(), attr);
        self
    }

    /// Add a relationship attribute.
    pub fn relationship(
        self,
        name: impl Into<String>,
        relationship_type: impl Into<String>,
        attr_type: AttrType,
    ) -> Self {
        self.relationship_def(name.into(), relationship_type.into(), attr_type, false)
    }

    /// Add a relationship attribute whose targets are owned by this entity.
    pub fn composite(
        self,
        name: impl Into<String>,
        relationship_type: impl Into<String>,
        attr_type: AttrType,
    ) -> Self {
        self.relationship_def(name.into(), relationship_type.into(), attr_type, true)
    }

    fn relationship_def(
        mut self,
        name: String,
        relationship_type: String,
        attr_type: AttrType,
        composite: bool,
    ) -> Self {
        self.def.relationship_attributes.insert(
            name.clone(),
            RelationshipAttrDef {
                name,
                relationship_type,
                attr_type,
                composite,
            },
        );
        self
    }

    /// Finish building this type.
    pub fn done(self) -> Result<(), RegistryError> {
        if self.builder.is_defined(&self.def.name) {
            return Err(RegistryError::DuplicateTypeName(self.def.name));
        }
        // Parents must already be defined, which rules out cycles
        for parent in &self.def.supertypes {
            if !self.builder.entity_types.contains_key(parent) {
                return Err(RegistryError::UnknownParentType(parent.clone()));
            }
        }
        self.builder
            .entity_types
            .insert(self.def.name.clone(), self.def);
        Ok(())
    }
}

/// Builder for a classification type definition.
pub struct ClassificationTypeBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    def: ClassificationTypeDef,
}

impl<'a> ClassificationTypeBuilder<'a> {
    /// Add a supertype by name.
    pub fn extends(mut self, parent_name: impl Into<String>) -> Self {
        self.def.supertypes.push(parent_name.into());
        self
    }

    /// Add an attribute.
    pub fn attr(mut self, attr: AttrDef) -> Self {
        self.def.attributes.insert(attr.name.clone(), attr);
        self
    }

    /// Restrict the classification to an entity type (and its subtypes).
    pub fn applies_to(mut self, entity_type: impl Into<String>) -> Self {
        self.def.entity_types.insert(entity_type.into());
        self
    }

    /// Finish building this type.
    pub fn done(self) -> Result<(), RegistryError> {
        if self.builder.is_defined(&self.def.name) {
            return Err(RegistryError::DuplicateTypeName(self.def.name));
        }
        for parent in &self.def.supertypes {
            if !self.builder.classification_types.contains_key(parent) {
                return Err(RegistryError::UnknownParentType(parent.clone()));
            }
        }
        self.builder
            .classification_types
            .insert(self.def.name.clone(), self.def);
        Ok(())
    }
}

/// Builder for a business-metadata namespace.
pub struct BusinessMetadataBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    def: BusinessMetadataDef,
}

impl<'a> BusinessMetadataBuilder<'a> {
    /// Add an attribute applicable to the given entity types (empty for any).
    pub fn attr<I, S>(mut self, attr: AttrDef, applicable_entity_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let def = BusinessAttrDef {
            namespace: self.def.name.clone(),
            attr,
            applicable_entity_types: applicable_entity_types.into_iter().map(Into::into).collect(),
        };
        self.def.attributes.insert(def.attr.name.clone(), def);
        self
    }

    /// Finish building this namespace.
    pub fn done(self) -> Result<(), RegistryError> {
        if self.builder.is_defined(&self.def.name) {
            return Err(RegistryError::DuplicateTypeName(self.def.name));
        }
        self.builder
            .business_metadata
            .insert(self.def.name.clone(), self.def);
        Ok(())
    }
}
