//! Classification integration tests.

use pretty_assertions::assert_eq;
use strata_tests::prelude::*;

fn orders(c: &Catalog) -> Result<Guid, StoreError> {
    c.guid_of("Table", "sales.orders")
}

mod lifecycle {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("classification_lifecycle")
            .step(
                "test_seed",
                |c| c.create(STEWARD, vec![table("sales.orders"), column("sales.orders.id", "sales.orders")]),
                |a| a.created(2),
            )
            .step(
                "test_add_two",
                |c| {
                    c.store.add_classifications(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        vec![
                            Classification::new("PII").with_attr("level", 1i64),
                            Classification::new("Deprecated"),
                        ],
                    )
                },
                |a| a.access_requests(2).events(&["classifications-added"]),
            )
            .step(
                "test_add_duplicate",
                |c| {
                    c.store.add_classifications(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        vec![Classification::new("PII")],
                    )
                },
                |a| a.error_code(ErrorCode::ClassificationAlreadyAssociated).silent(),
            )
            .step(
                "test_not_applicable_to_column",
                |c| {
                    let guid = c.guid_of("Column", "sales.orders.id")?;
                    c.store.add_classifications(
                        &mut ctx(STEWARD),
                        &guid,
                        vec![Classification::new("Confidential")],
                    )
                },
                |a| {
                    a.error_code(ErrorCode::InvalidEntityForClassification)
                        .error("cannot be applied to entity type Column")
                }
            )
            .step(
                "test_unknown_classification",
                |c| {
                    c.store.add_classifications(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        vec![Classification::new("Secret")],
                    )
                },
                |a| a.error_code(ErrorCode::InstanceCrudInvalidParams),
            )
            .step(
                "test_update_level",
                |c| {
                    c.store.update_classifications(
                        &mut ctx(STEWARD),
                        &orders(c)?,
                        vec![Classification::new("PII").with_attr("level", 3i64)],
                    )
                },
                |a| {
                    a.access_requests(1)
                        .events(&["classifications-updated"])
                        .assert_fn(|c, _| {
                            let Ok(guid) = orders(c) else { return false };
                            c.store
                                .get_classification(&ctx(READER), &guid, "pii")
                                .map(|pii| pii.attributes.get("level") == Some(&Value::Int(3)))
                                .unwrap_or(false)
                        })
                },
            )
            .step(
                "test_delete",
                |c| c.store.delete_classification(&mut ctx(STEWARD), &orders(c)?, "Deprecated", None),
                |a| a.access_requests(1).events(&["classifications-deleted"]),
            )
            .step(
                "test_delete_missing",
                |c| c.store.delete_classification(&mut ctx(STEWARD), &orders(c)?, "Deprecated", None),
                |a| a.error_code(ErrorCode::ClassificationNotFound).silent(),
            )
    }

    #[test]
    fn test_classification_lifecycle() {
        scenario().run().unwrap();
    }
}

#[test]
fn test_add_to_many_entities_is_atomic() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog
        .create(
            STEWARD,
            vec![table("sales.orders"), database("sales"), table("sales.items")],
        )
        .unwrap();
    let orders = catalog.guid_of("Table", "sales.orders").unwrap();
    let sales = catalog.guid_of("Database", "sales").unwrap();
    let items = catalog.guid_of("Table", "sales.items").unwrap();
    catalog.reset_recordings();

    // WHEN
    let result = catalog.store.add_classification(
        &mut ctx(STEWARD),
        &[orders.clone(), sales, items.clone()],
        Classification::new("Confidential"),
    );

    // THEN
    assert_eq!(
        result.unwrap_err().code(),
        ErrorCode::InvalidEntityForClassification
    );
    assert!(catalog.notifier.events().is_empty());
    let held = catalog.store.get_classifications(&ctx(ADMIN), &orders).unwrap();
    assert!(held.is_empty());
}

#[test]
fn test_set_classifications_reports_summary() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();
    catalog
        .store
        .add_classifications(
            &mut ctx(STEWARD),
            &guid,
            vec![
                Classification::new("PII").with_attr("level", 1i64),
                Classification::new("Deprecated"),
            ],
        )
        .unwrap();
    catalog.reset_recordings();

    let mut header = EntityHeader::new(guid.clone(), "Table");
    header.classifications = vec![
        Classification::new("PII").with_attr("level", 2i64),
        Classification::new("Confidential"),
    ];

    // WHEN
    let summary = catalog
        .store
        .set_classifications(&mut ctx(STEWARD), vec![header])
        .unwrap();

    // THEN
    assert_eq!(summary, "classifications added: 1, updated: 1, deleted: 1");
    assert_eq!(
        catalog.notifier.names(),
        vec![
            "classifications-deleted",
            "classifications-updated",
            "classifications-added"
        ]
    );
    let names: Vec<String> = catalog
        .store
        .get_classifications(&ctx(ADMIN), &guid)
        .unwrap()
        .into_iter()
        .map(|c| c.type_name)
        .collect();
    assert_eq!(names, vec!["PII", "Confidential"]);
}

#[test]
fn test_classifications_travel_with_create() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    catalog
        .create(
            STEWARD,
            vec![table("sales.orders").with_classification(Classification::new("Deprecated"))],
        )
        .unwrap();

    // THEN
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();
    let held = catalog.store.get_classification(&ctx(ADMIN), &guid, "Deprecated");
    assert!(held.is_ok());
}
