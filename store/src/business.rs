//! Business-metadata manager.

use crate::{ChangeEvent, EntityStore, RequestContext, StoreError, StoreResult};
use std::collections::{BTreeMap, BTreeSet};
use strata_core::messages::{ERR_BUSINESS_ATTRIBUTES_EMPTY, ERR_GUID_EMPTY};
use strata_core::{Attributes, BusinessAttributes, Guid, Value};
use strata_graph::GraphStore;
use strata_registry::BusinessAttrDef;
use tracing::debug;

/// Business attribute defs applicable to one entity type, by namespace.
type NamespaceDefs<'r> = BTreeMap<&'r str, BTreeMap<&'r str, &'r BusinessAttrDef>>;

impl<G: GraphStore + Send> EntityStore<G> {
    /// Add or update business attributes of an entity.
    ///
    /// With `overwrite` the request replaces every namespace of the entity;
    /// otherwise the named attributes are merged into the persisted ones and
    /// a null value removes an attribute. One authorization check is issued
    /// per namespace whose content actually changes.
    pub fn add_or_update_business_attributes(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        business_attributes: BusinessAttributes,
        overwrite: bool,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        if business_attributes.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_BUSINESS_ATTRIBUTES_EMPTY));
        }
        self.run(ctx, "addOrUpdateBusinessAttributes", vec![guid.clone()], |tx, ctx| {
            let vertex = tx
                .find_by_guid(guid)
                .ok_or_else(|| StoreError::guid_not_found(guid))?;
            let header = vertex.header();
            let current = vertex.business_attributes.clone();

            let defs = self.registry.business_attributes_for(&header.type_name);
            let incoming = self.normalize_business_attributes(&header.type_name, &business_attributes);
            let changed = changed_namespaces(&defs, &current, &incoming, overwrite);

            let gate = self.gate(ctx.caller());
            for namespace in &changed {
                gate.verify_business_metadata(&header, namespace)?;
            }

            self.validate_business_attributes(&header.type_name, &defs, &current, &incoming, overwrite)?;

            if changed.is_empty() {
                debug!(guid = %guid, "business attributes unchanged");
                return Ok(());
            }
            let vertex = self
                .mapper
                .write_business_attributes(tx, guid, &incoming, overwrite, ctx.user())?;
            ctx.queue_event(ChangeEvent::BusinessAttributesUpdated {
                entity: vertex.header(),
                updated: incoming,
            });
            Ok(())
        })
    }

    /// Remove the named business attributes; values in the request are ignored.
    pub fn remove_business_attributes(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        business_attributes: BusinessAttributes,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        if business_attributes.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_BUSINESS_ATTRIBUTES_EMPTY));
        }
        self.run(ctx, "removeBusinessAttributes", vec![guid.clone()], |tx, ctx| {
            let header = tx
                .find_by_guid(guid)
                .ok_or_else(|| StoreError::guid_not_found(guid))?
                .header();

            let namespaces: BTreeSet<&str> = business_attributes.keys().map(String::as_str).collect();
            let gate = self.gate(ctx.caller());
            for namespace in namespaces {
                gate.verify_business_metadata(&header, namespace)?;
            }

            let vertex = self
                .mapper
                .remove_business_attributes(tx, guid, &business_attributes, ctx.user())?;
            let removed: BusinessAttributes = business_attributes
                .iter()
                .map(|(namespace, attrs)| {
                    let nulls = attrs.keys().map(|name| (name.clone(), Value::Null)).collect();
                    (namespace.clone(), nulls)
                })
                .collect();
            ctx.queue_event(ChangeEvent::BusinessAttributesUpdated {
                entity: vertex.header(),
                updated: removed,
            });
            Ok(())
        })
    }

    /// Convert every value with a known def to its canonical form; anything
    /// else is kept as given and reported by validation.
    fn normalize_business_attributes(
        &self,
        type_name: &str,
        business_attributes: &BusinessAttributes,
    ) -> BusinessAttributes {
        business_attributes
            .iter()
            .map(|(namespace, attrs)| {
                let attrs = attrs
                    .iter()
                    .map(|(name, value)| {
                        let normalized = self
                            .registry
                            .business_attribute_for(type_name, namespace, name)
                            .and_then(|def| self.registry.normalize_value(&def.attr.attr_type, value));
                        (name.clone(), normalized.unwrap_or_else(|| value.clone()))
                    })
                    .collect();
                (namespace.clone(), attrs)
            })
            .collect()
    }

    fn validate_business_attributes(
        &self,
        type_name: &str,
        defs: &NamespaceDefs<'_>,
        current: &BusinessAttributes,
        incoming: &BusinessAttributes,
        overwrite: bool,
    ) -> StoreResult<()> {
        let max_length = self.config.business_attribute_max_length;
        let mut messages = Vec::new();

        for (namespace, attrs) in incoming {
            let Some(namespace_defs) = defs.get(namespace.as_str()) else {
                messages.push(format!(
                    "{}: invalid business-metadata for entity type {}",
                    namespace, type_name
                ));
                continue;
            };

            for name in attrs.keys() {
                if !namespace_defs.contains_key(name.as_str()) {
                    messages.push(format!(
                        "{}.{}.{}: invalid business-metadata attribute",
                        type_name, namespace, name
                    ));
                }
            }

            for def in namespace_defs.values() {
                let field = format!("{}.{}.{}", type_name, namespace, def.name());
                let has_prior = current
                    .get(namespace)
                    .map(|prior| prior.contains_key(def.name()))
                    .unwrap_or(false);
                match attrs.get(def.name()) {
                    Some(value) if !value.is_null() => {
                        let valid = self.registry.validate_value(
                            &def.attr.attr_type,
                            value,
                            &field,
                            &mut messages,
                        );
                        if valid && !def.is_valid_length(value, max_length) {
                            messages.push(format!(
                                "{}: business attribute value exceeds maximum length limit",
                                field
                            ));
                        }
                    }
                    Some(_) if !def.attr.optional => messages.push(format!(
                        "{}: mandatory business-metadata attribute cannot be removed",
                        field
                    )),
                    None if !def.attr.optional && (overwrite || !has_prior) => {
                        messages.push(format!(
                            "{}: mandatory business-metadata attribute value missing in type {}",
                            field, type_name
                        ))
                    }
                    _ => {}
                }
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::validation_failed(messages))
        }
    }
}

/// Namespaces whose persisted content would differ after applying `incoming`.
fn changed_namespaces(
    defs: &NamespaceDefs<'_>,
    current: &BusinessAttributes,
    incoming: &BusinessAttributes,
    overwrite: bool,
) -> Vec<String> {
    let empty = Attributes::new();
    defs.keys()
        .filter(|namespace| {
            let before = current.get(**namespace).unwrap_or(&empty);
            let requested = match incoming.get(**namespace) {
                Some(requested) => requested,
                None if overwrite => &empty,
                None => return false,
            };
            let mut after = if overwrite { Attributes::new() } else { before.clone() };
            for (name, value) in requested {
                if value.is_null() {
                    after.remove(name);
                } else {
                    after.insert(name.clone(), value.clone());
                }
            }
            &after != before
        })
        .map(|namespace| namespace.to_string())
        .collect()
}
