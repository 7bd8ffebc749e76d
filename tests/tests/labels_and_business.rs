//! Label, business-metadata and bulk import integration tests.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use strata_store::parse_import_rows;
use strata_tests::prelude::*;

fn labels(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn bm(namespace: &str, attrs: Attributes) -> BusinessAttributes {
    BusinessAttributes::from([(namespace.to_string(), attrs)])
}

fn orders(c: &Catalog) -> Result<Guid, StoreError> {
    c.guid_of("Table", "sales.orders")
}

mod labels {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("labels")
            .step(
                "test_seed",
                |c| c.create(STEWARD, vec![table("sales.orders")]),
                |a| a.created(1),
            )
            .step(
                "test_add",
                |c| c.store.add_labels(&mut ctx(STEWARD), &orders(c)?, super::labels(&["a", "b"])),
                |a| a.access_requests(2).events(&["labels-added"]),
            )
            .step(
                "test_replace",
                |c| c.store.set_labels(&mut ctx(STEWARD), &orders(c)?, super::labels(&["b", "c"])),
                |a| {
                    a.access_requests(2)
                        .events(&["labels-added", "labels-deleted"])
                        .assert_fn(|c, _| {
                            c.entity(&orders(c).unwrap_or_default())
                                .map(|e| e.labels == Some(super::labels(&["b", "c"])))
                                .unwrap_or(false)
                        })
                },
            )
            .step(
                "test_replace_with_same_set",
                |c| c.store.set_labels(&mut ctx(STEWARD), &orders(c)?, super::labels(&["b", "c"])),
                |a| a.access_requests(0).silent(),
            )
            .step(
                "test_invalid_label",
                |c| c.store.add_labels(&mut ctx(STEWARD), &orders(c)?, super::labels(&["has space"])),
                |a| a.error_code(ErrorCode::InvalidLabel).silent(),
            )
            .step(
                "test_remove",
                |c| c.store.remove_labels(&mut ctx(STEWARD), &orders(c)?, super::labels(&["b"])),
                |a| a.access_requests(1).events(&["labels-deleted"]),
            )
            .step(
                "test_clear_all",
                |c| c.store.set_labels(&mut ctx(STEWARD), &orders(c)?, BTreeSet::new()),
                |a| a.access_requests(1).events(&["labels-deleted"]),
            )
    }

    #[test]
    fn test_labels() {
        scenario().run().unwrap();
    }
}

mod business_metadata {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("business_metadata")
            .step(
                "test_seed",
                |c| c.create(STEWARD, vec![table("sales.orders"), table("sales.items")]),
                |a| a.created(2),
            )
            .step(
                "test_set_owner",
                |c| {
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Governance", attrs! { "owner" => "ann" }),
                        false,
                    )
                },
                |a| a.access_requests(1).events(&["business-attributes-updated"]),
            )
            .step(
                "test_merge_steward",
                |c| {
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Governance", attrs! { "steward" => "bob" }),
                        false,
                    )
                },
                |a| {
                    a.access_requests(1).assert_fn(|c, _| {
                        let Ok(entity) = c.entity(&orders(c).unwrap_or_default()) else {
                            return false;
                        };
                        let governance = entity
                            .business_attributes
                            .as_ref()
                            .and_then(|b| b.get("Governance"));
                        governance.map(|g| g.len()) == Some(2)
                    })
                },
            )
            .step(
                "test_same_values_are_silent",
                |c| {
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Governance", attrs! { "owner" => "ann" }),
                        false,
                    )
                },
                |a| a.access_requests(0).silent(),
            )
            .step(
                "test_mandatory_missing_on_fresh_entity",
                |c| {
                    let guid = c.guid_of("Table", "sales.items")?;
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &guid,
                        bm("Governance", attrs! { "steward" => "bob" }),
                        false,
                    )
                },
                |a| {
                    a.error_code(ErrorCode::InstanceCrudInvalidParams)
                        .error("Table.Governance.owner: mandatory business-metadata attribute value missing in type Table")
                }
            )
            .step(
                "test_mandatory_cannot_be_removed",
                |c| {
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Governance", attrs! { "owner" => Value::Null }),
                        false,
                    )
                },
                |a| a.error("mandatory business-metadata attribute cannot be removed"),
            )
            .step(
                "test_value_too_long",
                |c| {
                    c.store.add_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Finance", attrs! { "costCenter" => "CC-0000-0001" }),
                        false,
                    )
                },
                |a| a.error("Table.Finance.costCenter: business attribute value exceeds maximum length limit"),
            )
            .step(
                "test_remove_optional",
                |c| {
                    c.store.remove_business_attributes(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        bm("Governance", attrs! { "steward" => "" }),
                    )
                },
                |a| a.access_requests(1).events(&["business-attributes-updated"]),
            )
    }

    #[test]
    fn test_business_metadata() {
        scenario().run().unwrap();
    }
}

const IMPORT_FILE: &str = "\
# typeName, uniqueAttrValue, namespace.attrName, value
Table, sales.orders, Governance.owner, ann
Table, sales.orders, Finance.budgets, 1.5|2.5
Table, sales.items, Governance.owner, bob

View, x, Governance.owner, x
Database, sales, Finance.costCenter, CC1
Table, sales.nowhere, Governance.owner, x
";

mod bulk_import {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("bulk_import")
            .step(
                "test_seed",
                |c| {
                    c.create(
                        STEWARD,
                        vec![database("sales"), table("sales.orders"), table("sales.items")],
                    )
                },
                |a| a.created(3),
            )
            .step(
                "test_import",
                |c| {
                    c.store.bulk_create_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        "governance.csv",
                        &parse_import_rows(IMPORT_FILE),
                    )
                },
                |a| {
                    a.imported(2).import_failures(3).assert_fn(|c, _| {
                        let Ok(entity) = c.entity(&orders(c).unwrap_or_default()) else {
                            return false;
                        };
                        let budgets = entity
                            .business_attributes
                            .as_ref()
                            .and_then(|b| b.get("Finance"))
                            .and_then(|f| f.get("budgets"))
                            .cloned();
                        budgets == Some(Value::List(vec![Value::Float(1.5), Value::Float(2.5)]))
                    })
                },
            )
            .step(
                "test_blank_file_name",
                |c| {
                    c.store.bulk_create_or_update_business_attributes(
                        &mut ctx(STEWARD),
                        "  ",
                        &parse_import_rows(IMPORT_FILE),
                    )
                },
                |a| a.error_code(ErrorCode::FileNameNotFound),
            )
    }

    #[test]
    fn test_bulk_import() {
        scenario().run().unwrap();
    }
}

#[test]
fn test_import_failures_name_their_rows() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog
        .create(STEWARD, vec![database("sales"), table("sales.orders")])
        .unwrap();

    // WHEN
    let response = catalog
        .store
        .bulk_create_or_update_business_attributes(
            &mut ctx(STEWARD),
            "governance.csv",
            &parse_import_rows(IMPORT_FILE),
        )
        .unwrap();

    // THEN
    let remarks: Vec<&str> = response.failed.iter().map(|f| f.remarks.as_str()).collect();
    assert_eq!(
        remarks,
        vec![
            "Provided UniqueAttributeValue is not valid : sales.items at line #3",
            "Invalid entity-type: View at line #4",
            "Provided businessAttributeName is not valid : Finance.costCenter at line #5",
            "Provided UniqueAttributeValue is not valid : sales.nowhere at line #6",
        ]
    );
    assert_eq!(response.success.len(), 1);
}

#[test]
fn test_import_rejected_entity_is_reported() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let rows = parse_import_rows("Table, sales.orders, Governance.steward, bob");

    // WHEN
    let response = catalog
        .store
        .bulk_create_or_update_business_attributes(&mut ctx(STEWARD), "governance.csv", &rows)
        .unwrap();

    // THEN
    assert!(response.success.is_empty());
    assert_eq!(response.failed.len(), 1);
    assert!(response.failed[0]
        .remarks
        .contains("mandatory business-metadata attribute value missing"));
}
