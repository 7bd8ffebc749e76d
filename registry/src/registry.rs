//! The Registry - immutable schema lookup.

use crate::{
    AttrDef, BusinessAttrDef, BusinessMetadataDef, ClassificationTypeDef, EntityTypeDef, EnumDef,
    RelationshipAttrDef, SupertypeIndex,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The Registry provides runtime lookup of schema definitions.
/// It is immutable after construction.
#[derive(Debug)]
pub struct Registry {
    entity_types: HashMap<String, EntityTypeDef>,
    classification_types: HashMap<String, ClassificationTypeDef>,
    business_metadata: HashMap<String, BusinessMetadataDef>,
    enums: HashMap<String, EnumDef>,

    /// Precomputed supertype relationships for entity types.
    entity_index: SupertypeIndex,
    /// Precomputed supertype relationships for classification types.
    classification_index: SupertypeIndex,
}

impl Registry {
    pub(crate) fn new(
        entity_types: HashMap<String, EntityTypeDef>,
        classification_types: HashMap<String, ClassificationTypeDef>,
        business_metadata: HashMap<String, BusinessMetadataDef>,
        enums: HashMap<String, EnumDef>,
        entity_index: SupertypeIndex,
        classification_index: SupertypeIndex,
    ) -> Self {
        Self {
            entity_types,
            classification_types,
            business_metadata,
            enums,
            entity_index,
            classification_index,
        }
    }

    // ==================== Type Lookups ====================

    /// Get an entity type definition by name.
    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeDef> {
        self.entity_types.get(name)
    }

    /// Get a classification type definition by name.
    pub fn classification_type(&self, name: &str) -> Option<&ClassificationTypeDef> {
        self.classification_types.get(name)
    }

    /// Get a business-metadata namespace by name.
    pub fn business_metadata(&self, name: &str) -> Option<&BusinessMetadataDef> {
        self.business_metadata.get(name)
    }

    /// Get an enum definition by name.
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Names of all entity types, sorted.
    pub fn entity_type_names(&self) -> BTreeSet<&str> {
        self.entity_types.keys().map(String::as_str).collect()
    }

    // ==================== Inheritance ====================

    /// The entity type and all of its supertypes.
    pub fn entity_type_and_all_supertypes(&self, name: &str) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.entity_index.supertypes_of(name).cloned().collect();
        out.insert(name.to_string());
        out
    }

    /// The classification type and all of its supertypes.
    pub fn classification_type_and_all_supertypes(&self, name: &str) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .classification_index
            .supertypes_of(name)
            .cloned()
            .collect();
        out.insert(name.to_string());
        out
    }

    /// Check if an entity type is the given type or one of its subtypes.
    pub fn is_entity_subtype(&self, sub: &str, super_type: &str) -> bool {
        self.entity_index.is_subtype_or_self(sub, super_type)
    }

    /// Whether a classification of the given type may be attached to an
    /// entity of the given type.
    pub fn can_apply_to_entity_type(&self, classification: &str, entity_type: &str) -> bool {
        // Restrictions are inherited from classification supertypes
        let restrictions: BTreeSet<&String> = self
            .classification_type_and_all_supertypes(classification)
            .iter()
            .filter_map(|c| self.classification_types.get(c))
            .flat_map(|c| c.entity_types.iter())
            .collect();
        if restrictions.is_empty() {
            return true;
        }
        restrictions
            .iter()
            .any(|r| self.is_entity_subtype(entity_type, r))
    }

    // ==================== Attribute Lookups ====================

    /// Get an attribute definition, including inherited ones.
    pub fn get_attribute(&self, type_name: &str, attr_name: &str) -> Option<&AttrDef> {
        self.entity_types
            .get(type_name)
            .and_then(|t| t.attributes.get(attr_name))
            .or_else(|| {
                self.entity_index
                    .supertypes_of(type_name)
                    .filter_map(|p| self.entity_types.get(p))
                    .find_map(|t| t.attributes.get(attr_name))
            })
    }

    /// All attributes of a type, including inherited ones. Subtype definitions
    /// shadow same-named supertype attributes.
    pub fn all_attributes(&self, type_name: &str) -> Vec<&AttrDef> {
        let mut by_name: BTreeMap<&str, &AttrDef> = BTreeMap::new();
        for parent in self.entity_index.supertypes_of(type_name) {
            if let Some(def) = self.entity_types.get(parent) {
                for attr in def.attributes.values() {
                    by_name.entry(attr.name.as_str()).or_insert(attr);
                }
            }
        }
        if let Some(def) = self.entity_types.get(type_name) {
            for attr in def.attributes.values() {
                by_name.insert(attr.name.as_str(), attr);
            }
        }
        by_name.into_values().collect()
    }

    /// Unique attributes of a type, including inherited ones.
    pub fn unique_attributes(&self, type_name: &str) -> Vec<&AttrDef> {
        self.all_attributes(type_name)
            .into_iter()
            .filter(|a| a.unique)
            .collect()
    }

    /// Get a relationship attribute definition, including inherited ones.
    pub fn get_relationship_attribute(
        &self,
        type_name: &str,
        attr_name: &str,
    ) -> Option<&RelationshipAttrDef> {
        self.entity_types
            .get(type_name)
            .and_then(|t| t.relationship_attributes.get(attr_name))
            .or_else(|| {
                self.entity_index
                    .supertypes_of(type_name)
                    .filter_map(|p| self.entity_types.get(p))
                    .find_map(|t| t.relationship_attributes.get(attr_name))
            })
    }

    /// Get a classification attribute definition, including inherited ones.
    pub fn get_classification_attribute(
        &self,
        classification: &str,
        attr_name: &str,
    ) -> Option<&AttrDef> {
        self.classification_type_and_all_supertypes(classification)
            .iter()
            .filter_map(|c| self.classification_types.get(c))
            .find_map(|c| c.attributes.get(attr_name))
    }

    /// All classification attributes, including inherited ones.
    pub fn all_classification_attributes(&self, classification: &str) -> Vec<&AttrDef> {
        let mut by_name: BTreeMap<&str, &AttrDef> = BTreeMap::new();
        for name in self.classification_type_and_all_supertypes(classification) {
            if let Some(def) = self.classification_types.get(&name) {
                for attr in def.attributes.values() {
                    if name == classification {
                        by_name.insert(attr.name.as_str(), attr);
                    } else {
                        by_name.entry(attr.name.as_str()).or_insert(attr);
                    }
                }
            }
        }
        by_name.into_values().collect()
    }

    // ==================== Business Metadata ====================

    /// Business attributes applicable to an entity type, by namespace.
    pub fn business_attributes_for(
        &self,
        entity_type: &str,
    ) -> BTreeMap<&str, BTreeMap<&str, &BusinessAttrDef>> {
        let mut out: BTreeMap<&str, BTreeMap<&str, &BusinessAttrDef>> = BTreeMap::new();
        for (ns, def) in &self.business_metadata {
            for attr in def.attributes.values() {
                let applies = attr.applicable_entity_types.is_empty()
                    || attr
                        .applicable_entity_types
                        .iter()
                        .any(|t| self.is_entity_subtype(entity_type, t));
                if applies {
                    out.entry(ns.as_str())
                        .or_default()
                        .insert(attr.name(), attr);
                }
            }
        }
        out
    }

    /// A single business attribute applicable to an entity type.
    pub fn business_attribute_for(
        &self,
        entity_type: &str,
        namespace: &str,
        attr_name: &str,
    ) -> Option<&BusinessAttrDef> {
        let attr = self.business_metadata.get(namespace)?.attributes.get(attr_name)?;
        let applies = attr.applicable_entity_types.is_empty()
            || attr
                .applicable_entity_types
                .iter()
                .any(|t| self.is_entity_subtype(entity_type, t));
        applies.then_some(attr)
    }
}
