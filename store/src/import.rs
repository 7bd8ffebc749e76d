//! Bulk business-metadata import.
//!
//! Each row names one business attribute value of one entity:
//!
//! ```text
//! typeName, uniqueAttrValue, namespace.attrName, value[, uniqueAttrName]
//! ```
//!
//! The unique attribute defaults to `qualifiedName`; array values are
//! pipe-delimited. A bad row is reported and skipped; rows targeting the
//! same entity are merged and applied in one call.

use crate::{BulkImportResponse, EntityStore, ImportInfo, RequestContext, StoreError, StoreResult};
use std::collections::HashMap;
use strata_core::{Attributes, BusinessAttributes, ErrorCode, Guid, Value};
use strata_graph::GraphStore;
use strata_registry::{AttrType, Registry};
use tracing::{error, info};

const TYPE_NAME_COLUMN: usize = 0;
const UNIQUE_ATTR_VALUE_COLUMN: usize = 1;
const BM_ATTR_NAME_COLUMN: usize = 2;
const BM_ATTR_VALUE_COLUMN: usize = 3;
const UNIQUE_ATTR_NAME_COLUMN: usize = 4;

const DEFAULT_UNIQUE_ATTR_NAME: &str = "qualifiedName";
const ARRAY_DELIMITER: char = '|';

/// Split a comma-separated text body into rows. Blank lines and lines
/// starting with `#` are skipped.
pub fn parse_import_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

/// Business attributes collected for one target entity.
struct PendingEntity {
    guid: Guid,
    unique_value: String,
    business_attributes: BusinessAttributes,
    names: Vec<String>,
}

impl<G: GraphStore + Send> EntityStore<G> {
    /// Apply business attribute values from import rows.
    ///
    /// Row-level problems land in `failed` with their 1-based row number;
    /// every entity is then written on its own with overwrite semantics,
    /// starting from its persisted business metadata.
    pub fn bulk_create_or_update_business_attributes(
        &self,
        ctx: &mut RequestContext,
        file_name: &str,
        rows: &[Vec<String>],
    ) -> StoreResult<BulkImportResponse> {
        if file_name.trim().is_empty() {
            return Err(StoreError::new(ErrorCode::FileNameNotFound, file_name));
        }

        let mut response = BulkImportResponse::default();
        let pending = self.collect_import_rows(rows, &mut response);

        for entity in pending {
            let child = entity.names.join(",");
            match self.add_or_update_business_attributes(
                ctx,
                &entity.guid,
                entity.business_attributes,
                true,
            ) {
                Ok(()) => response
                    .success
                    .push(ImportInfo::success(&entity.unique_value, child)),
                Err(e) => {
                    error!(entity = %entity.unique_value, error = %e, "failed to update business attributes");
                    response
                        .failed
                        .push(ImportInfo::failed(e.to_string()).with_names(&entity.unique_value, child));
                }
            }
        }

        info!(
            file_name,
            success = response.success.len(),
            failed = response.failed.len(),
            "business-metadata import finished"
        );
        Ok(response)
    }

    /// Validate rows and group them by target entity, in order of first
    /// appearance.
    fn collect_import_rows(
        &self,
        rows: &[Vec<String>],
        response: &mut BulkImportResponse,
    ) -> Vec<PendingEntity> {
        let graph = self.lock_graph();
        let mut pending: Vec<PendingEntity> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (i, record) in rows.iter().enumerate() {
            let line = i + 1;
            let mut fail = |info: ImportInfo| {
                error!(line, remarks = %info.remarks, "import row rejected");
                response.failed.push(info.at_line(line));
            };

            let missing = record.len() < UNIQUE_ATTR_NAME_COLUMN
                || record[..UNIQUE_ATTR_NAME_COLUMN]
                    .iter()
                    .any(|cell| cell.trim().is_empty());
            if missing {
                fail(ImportInfo::failed(format!(
                    "Missing fields: [{}] at line #{}",
                    record.join(", "),
                    line
                )));
                continue;
            }

            let type_name = record[TYPE_NAME_COLUMN].as_str();
            let unique_value = record[UNIQUE_ATTR_VALUE_COLUMN].as_str();
            let bm_attribute = record[BM_ATTR_NAME_COLUMN].as_str();
            let raw_value = record[BM_ATTR_VALUE_COLUMN].as_str();
            let unique_name = record
                .get(UNIQUE_ATTR_NAME_COLUMN)
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_UNIQUE_ATTR_NAME);

            if self.registry.entity_type(type_name).is_none() {
                fail(ImportInfo::failed(format!(
                    "Invalid entity-type: {} at line #{}",
                    type_name, line
                )));
                continue;
            }

            let Some((namespace, attr_name)) = bm_attribute
                .split_once('.')
                .filter(|(ns, attr)| !ns.is_empty() && !attr.is_empty())
            else {
                fail(
                    ImportInfo::failed(format!(
                        "Provided businessAttributeName is not in proper format : {} at line #{}",
                        bm_attribute, line
                    ))
                    .with_names(unique_value, bm_attribute),
                );
                continue;
            };

            let Some(def) = self
                .registry
                .business_attribute_for(type_name, namespace, attr_name)
            else {
                fail(
                    ImportInfo::failed(format!(
                        "Provided businessAttributeName is not valid : {} at line #{}",
                        bm_attribute, line
                    ))
                    .with_names(unique_value, bm_attribute),
                );
                continue;
            };

            let key = format!("{}_{}_{}", type_name, unique_name, unique_value);
            let vertex = match index.get(&key) {
                Some(_) => None,
                None => {
                    let tuple = Attributes::from([(
                        unique_name.to_string(),
                        Value::String(unique_value.to_string()),
                    )]);
                    match graph.find_by_unique_attributes(type_name, &tuple) {
                        Some(vertex) => Some(vertex),
                        None => {
                            fail(
                                ImportInfo::failed(format!(
                                    "Provided UniqueAttributeValue is not valid : {} at line #{}",
                                    unique_value, line
                                ))
                                .with_names(unique_value, bm_attribute),
                            );
                            continue;
                        }
                    }
                }
            };

            let value = match parse_import_value(&self.registry, &def.attr.attr_type, raw_value) {
                Ok(value) => value,
                Err(message) => {
                    fail(
                        ImportInfo::failed(format!("{} at line #{}", message, line))
                            .with_names(unique_value, bm_attribute),
                    );
                    continue;
                }
            };

            let slot = match (index.get(&key), vertex) {
                (Some(&slot), _) => slot,
                (None, Some(vertex)) => {
                    pending.push(PendingEntity {
                        guid: vertex.guid.clone(),
                        unique_value: unique_value.to_string(),
                        business_attributes: vertex.business_attributes.clone(),
                        names: Vec::new(),
                    });
                    index.insert(key, pending.len() - 1);
                    pending.len() - 1
                }
                (None, None) => continue,
            };
            let entity = &mut pending[slot];
            entity
                .business_attributes
                .entry(namespace.to_string())
                .or_default()
                .insert(attr_name.to_string(), value);
            entity.names.push(bm_attribute.to_string());
        }
        pending
    }
}

/// Parse a cell for an attribute of `attr_type`. Scalars stay strings and
/// are converted during validation; arrays are split and parsed per element.
fn parse_import_value(registry: &Registry, attr_type: &AttrType, raw: &str) -> Result<Value, String> {
    let AttrType::Array(element) = attr_type else {
        return Ok(Value::String(raw.to_string()));
    };
    raw.split(ARRAY_DELIMITER)
        .map(str::trim)
        .map(|item| parse_element(registry, element, item))
        .collect::<Option<Vec<_>>>()
        .map(Value::List)
        .ok_or_else(|| {
            format!(
                "the provided business attribute value {} is not of type {}",
                raw, element
            )
        })
}

fn parse_element(registry: &Registry, element: &AttrType, item: &str) -> Option<Value> {
    match element {
        AttrType::Int | AttrType::Long | AttrType::Short => {
            let n = item.parse::<i64>().ok()?;
            let in_range = match element {
                AttrType::Int => i32::try_from(n).is_ok(),
                AttrType::Short => i16::try_from(n).is_ok(),
                _ => true,
            };
            in_range.then_some(Value::Int(n))
        }
        AttrType::Float | AttrType::Double => item.parse::<f64>().ok().map(Value::Float),
        AttrType::Boolean => match item.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        AttrType::Date => item.parse::<i64>().ok().map(Value::Date),
        AttrType::Enum(name) => registry
            .enum_def(name)
            .filter(|def| def.contains(item))
            .map(|_| Value::String(item.to_string())),
        _ => Some(Value::String(item.to_string())),
    }
}
