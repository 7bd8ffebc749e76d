//! Type-aware validation, normalization and equality.
//!
//! Validation appends human-readable messages instead of failing fast so a
//! caller can report every problem in one error.

use crate::{AttrDef, AttrType, Registry};
use std::collections::{BTreeMap, HashMap};
use strata_core::{Attributes, Classification, Entity, Guid, ObjectId, Value};

impl Registry {
    /// Normalize a value to the canonical representation of `attr_type`.
    /// Returns `None` if the value cannot represent the type.
    pub fn normalize_value(&self, attr_type: &AttrType, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match attr_type {
            AttrType::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
                    Some(Value::String(value.to_string()))
                }
                _ => None,
            },
            AttrType::Int | AttrType::Long | AttrType::Short => {
                let n = match value {
                    Value::Int(i) => *i,
                    Value::Float(f) if f.is_finite() => *f as i64,
                    Value::String(s) => s.trim().parse::<i64>().ok()?,
                    _ => return None,
                };
                let in_range = match attr_type {
                    AttrType::Int => i32::try_from(n).is_ok(),
                    AttrType::Short => i16::try_from(n).is_ok(),
                    _ => true,
                };
                in_range.then_some(Value::Int(n))
            }
            AttrType::Float | AttrType::Double => match value {
                Value::Float(_) => Some(value.clone()),
                Value::Int(i) => Some(Value::Float(*i as f64)),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
                _ => None,
            },
            AttrType::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                _ => None,
            },
            AttrType::Date => match value {
                Value::Date(_) => Some(value.clone()),
                Value::Int(ms) => Some(Value::Date(*ms)),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::Date),
                _ => None,
            },
            AttrType::Enum(name) => {
                let def = self.enum_def(name)?;
                match value {
                    Value::String(s) if def.contains(s) => Some(value.clone()),
                    _ => None,
                }
            }
            AttrType::ObjectId(declared) => {
                let id = match value {
                    Value::Ref(id) => id.clone(),
                    Value::String(guid) if !guid.is_empty() => {
                        ObjectId::by_guid(Guid::new(guid.clone()), declared.clone())
                    }
                    _ => return None,
                };
                self.normalize_object_id(declared, id).map(Value::Ref)
            }
            AttrType::Array(element) => match value {
                Value::List(items) => items
                    .iter()
                    .map(|v| self.normalize_value(element, v))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List),
                _ => None,
            },
            AttrType::Map(element) => match value {
                Value::Map(entries) => entries
                    .iter()
                    .map(|(k, v)| self.normalize_value(element, v).map(|v| (k.clone(), v)))
                    .collect::<Option<BTreeMap<_, _>>>()
                    .map(Value::Map),
                _ => None,
            },
        }
    }

    fn normalize_object_id(&self, declared: &str, mut id: ObjectId) -> Option<ObjectId> {
        if id.type_name.is_empty() {
            id.type_name = declared.to_string();
        }
        if !self.is_entity_subtype(&id.type_name, declared) {
            return None;
        }
        let has_guid = id.guid.as_ref().map(|g| !g.is_empty()).unwrap_or(false);
        (has_guid || !id.unique_attributes.is_empty()).then_some(id)
    }

    /// Check a value against `attr_type`, appending a message on mismatch.
    pub fn validate_value(
        &self,
        attr_type: &AttrType,
        value: &Value,
        field: &str,
        messages: &mut Vec<String>,
    ) -> bool {
        if self.normalize_value(attr_type, value).is_some() {
            true
        } else {
            messages.push(format!("{}: invalid value for type {}", field, attr_type));
            false
        }
    }

    /// Type-aware equality of a persisted and an incoming value.
    ///
    /// Missing and null are equal. Object references are compared by GUID,
    /// mapping batch-local placeholders through `guid_assignments`, and by
    /// unique attributes when either side lacks a GUID.
    pub fn are_equal_values(
        &self,
        attr_type: &AttrType,
        current: Option<&Value>,
        incoming: Option<&Value>,
        guid_assignments: &HashMap<Guid, Guid>,
    ) -> bool {
        let current = current.filter(|v| !v.is_null());
        let incoming = incoming.filter(|v| !v.is_null());
        match (current, incoming) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(a), Some(b)) => {
                let a = self.normalize_value(attr_type, a).unwrap_or_else(|| a.clone());
                let b = self.normalize_value(attr_type, b).unwrap_or_else(|| b.clone());
                self.equal_normalized(attr_type, &a, &b, guid_assignments)
            }
        }
    }

    fn equal_normalized(
        &self,
        attr_type: &AttrType,
        a: &Value,
        b: &Value,
        guid_assignments: &HashMap<Guid, Guid>,
    ) -> bool {
        match (attr_type, a, b) {
            (AttrType::ObjectId(_), Value::Ref(a), Value::Ref(b)) => {
                Self::equal_object_ids(a, b, guid_assignments)
            }
            (AttrType::Array(element), Value::List(xs), Value::List(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(x, y)| self.are_equal_values(element, Some(x), Some(y), guid_assignments))
            }
            (AttrType::Map(element), Value::Map(xs), Value::Map(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|(k, x)| {
                        ys.contains_key(k)
                            && self.are_equal_values(element, Some(x), ys.get(k), guid_assignments)
                    })
            }
            _ => a == b,
        }
    }

    fn equal_object_ids(a: &ObjectId, b: &ObjectId, guid_assignments: &HashMap<Guid, Guid>) -> bool {
        let resolve = |id: &ObjectId| -> Option<Guid> {
            let guid = id.guid.as_ref().filter(|g| !g.is_empty())?;
            Some(guid_assignments.get(guid).cloned().unwrap_or_else(|| guid.clone()))
        };
        match (resolve(a), resolve(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => {
                a.type_name == b.type_name
                    && !a.unique_attributes.is_empty()
                    && a.unique_attributes == b.unique_attributes
            }
        }
    }

    fn validate_and_normalize_attrs<'a>(
        &self,
        owner: &str,
        defs: impl Iterator<Item = &'a AttrDef>,
        attributes: &mut Attributes,
        full: bool,
        messages: &mut Vec<String>,
    ) {
        let mut known = std::collections::HashSet::new();
        for def in defs {
            known.insert(def.name.clone());
            let field = format!("{}.{}", owner, def.name);
            match attributes.get(&def.name).filter(|v| !v.is_null()) {
                Some(value) => match self.normalize_value(&def.attr_type, value) {
                    Some(normalized) => {
                        attributes.insert(def.name.clone(), normalized);
                    }
                    None => messages.push(format!(
                        "{}: invalid value for type {}",
                        field, def.attr_type
                    )),
                },
                None if full && !def.optional => match &def.default {
                    Some(default) => {
                        attributes.insert(def.name.clone(), default.clone());
                    }
                    None => messages.push(format!(
                        "{}: mandatory attribute value missing in type {}",
                        field, owner
                    )),
                },
                None => {}
            }
        }
        let mut unknown: Vec<&String> = attributes.keys().filter(|k| !known.contains(*k)).collect();
        unknown.sort();
        for name in unknown {
            messages.push(format!("{}.{}: unknown attribute", owner, name));
        }
    }

    /// Validate and normalize an entity. `full` requires every mandatory
    /// attribute; a partial update only checks the attributes supplied.
    pub fn validate_and_normalize_entity(
        &self,
        entity: &mut Entity,
        full: bool,
        messages: &mut Vec<String>,
    ) {
        if self.entity_type(&entity.type_name).is_none() {
            messages.push(format!("{}: unknown entity type", entity.type_name));
            return;
        }
        let type_name = entity.type_name.clone();
        let defs = self.all_attributes(&type_name);
        self.validate_and_normalize_attrs(
            &type_name,
            defs.into_iter(),
            &mut entity.attributes,
            full,
            messages,
        );

        let names: Vec<String> = entity.relationship_attributes.keys().cloned().collect();
        for name in names {
            let field = format!("{}.{}", type_name, name);
            let Some(def) = self.get_relationship_attribute(&type_name, &name) else {
                messages.push(format!("{}: unknown relationship attribute", field));
                continue;
            };
            let Some(value) = entity.relationship_attributes.get(&name) else {
                continue;
            };
            match self.normalize_value(&def.attr_type, value) {
                Some(normalized) => {
                    entity.relationship_attributes.insert(name, normalized);
                }
                None => messages.push(format!(
                    "{}: invalid value for type {}",
                    field, def.attr_type
                )),
            }
        }

        if let Some(classifications) = entity.classifications.as_mut() {
            for classification in classifications {
                self.validate_and_normalize_classification(classification, messages);
            }
        }
    }

    /// Validate and normalize a classification's attributes.
    pub fn validate_and_normalize_classification(
        &self,
        classification: &mut Classification,
        messages: &mut Vec<String>,
    ) {
        if self.classification_type(&classification.type_name).is_none() {
            messages.push(format!(
                "{}: unknown classification type",
                classification.type_name
            ));
            return;
        }
        let type_name = classification.type_name.clone();
        let defs = self.all_classification_attributes(&type_name);
        self.validate_and_normalize_attrs(
            &type_name,
            defs.into_iter(),
            &mut classification.attributes,
            true,
            messages,
        );
    }
}
