//! Authorization integration tests.
//!
//! These tests run the fixture users against the grant table and check both
//! the decisions and the access requests the store issues.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use strata_tests::prelude::*;

fn labels(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

mod table_editor {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("table_editor")
            .step(
                "test_create_table",
                |c| c.create(TABLE_EDITOR, vec![table("sales.orders")]),
                |a| a.created(1).access_requests(1),
            )
            .step(
                "test_update_table",
                |c| c.create(TABLE_EDITOR, vec![table("sales.orders").with_attr("rowCount", 10i64)]),
                |a| a.updated(1).access_requests(1),
            )
            .step(
                "test_create_database_denied",
                |c| c.create(TABLE_EDITOR, vec![database("sales")]),
                |a| {
                    a.error_code(ErrorCode::Unauthorized)
                        .error("table-editor is not authorized to perform entity-create on entity Database:sales")
                        .silent()
                }
            )
            .step(
                "test_delete_table_denied",
                |c| {
                    let guid = c.guid_of("Table", "sales.orders")?;
                    c.store.delete_by_id(&mut ctx(TABLE_EDITOR), &guid)
                },
                |a| a.error_code(ErrorCode::Unauthorized).access_requests(1),
            )
            .step(
                "test_label_denied",
                |c| {
                    let guid = c.guid_of("Table", "sales.orders")?;
                    c.store.add_labels(&mut ctx(TABLE_EDITOR), &guid, labels(&["hot"]))
                },
                |a| a.error("add-label"),
            )
    }

    #[test]
    fn test_table_editor() {
        scenario().run().unwrap();
    }
}

mod reader {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("reader")
            .step(
                "test_seed",
                |c| c.create(STEWARD, vec![table("sales.orders")]),
                |a| a.created(1),
            )
            .step(
                "test_read",
                |c| {
                    let guid = c.guid_of("Table", "sales.orders")?;
                    c.store.get_by_id(&ctx(READER), &guid)
                },
                |a| a.access_requests(1),
            )
            .step(
                "test_unknown_user_cannot_read",
                |c| {
                    let guid = c.guid_of("Table", "sales.orders")?;
                    c.store.get_by_id(&ctx("mallory"), &guid)
                },
                |a| a.error_code(ErrorCode::Unauthorized),
            )
            .step(
                "test_update_denied",
                |c| c.create(READER, vec![table("sales.orders").with_attr("rowCount", 1i64)]),
                |a| a.error("reader is not authorized to perform entity-update"),
            )
            .step(
                "test_purge_denied",
                |c| {
                    let guid = c.guid_of("Table", "sales.orders")?;
                    c.store.purge_by_ids(&mut ctx(READER), &[guid])
                },
                |a| a.error_code(ErrorCode::Unauthorized).access_requests(1),
            )
    }

    #[test]
    fn test_reader() {
        scenario().run().unwrap();
    }
}

#[test]
fn test_denied_entity_rolls_back_whole_batch() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    let result = catalog.create(TABLE_EDITOR, vec![table("sales.orders"), database("sales")]);

    // THEN
    assert_eq!(result.unwrap_err().code(), ErrorCode::Unauthorized);
    assert!(catalog.guid_of("Table", "sales.orders").is_err());
    assert!(catalog.guid_of("Database", "sales").is_err());
    assert!(catalog.notifier.events().is_empty());
}

#[test]
fn test_create_request_names_set_plain_attributes() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![database("sales")]).unwrap();
    catalog.reset_recordings();

    // WHEN
    catalog
        .create(
            STEWARD,
            vec![table("sales.orders")
                .with_attr("description", "orders")
                .with_attr("rowCount", Value::Null)
                .with_relationship("db", by_name("Database", "sales"))],
        )
        .unwrap();

    // THEN
    let requests = catalog.authorizer.requests_for(Privilege::EntityCreate);
    assert_eq!(requests.len(), 1);
    let request = requests[0].as_entity().unwrap();
    assert_eq!(
        request.attributes(),
        Some(&["description".to_string(), "qualifiedName".to_string()][..])
    );
}

#[test]
fn test_update_request_names_changed_attributes() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog
        .create(STEWARD, vec![table("sales.orders").with_attr("description", "orders")])
        .unwrap();
    catalog.reset_recordings();

    // WHEN
    catalog
        .create(
            STEWARD,
            vec![table("sales.orders")
                .with_attr("description", "orders")
                .with_attr("rowCount", 5i64)],
        )
        .unwrap();

    // THEN
    let requests = catalog.authorizer.requests_for(Privilege::EntityUpdate);
    assert_eq!(requests.len(), 1);
    let request = requests[0].as_entity().unwrap();
    assert_eq!(request.entity_type(), "Table");
    assert_eq!(request.entity_id(), "sales.orders");
    assert_eq!(request.attributes(), Some(&["rowCount".to_string()][..]));
}

#[test]
fn test_one_request_per_label_and_classification() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();
    catalog.reset_recordings();

    // WHEN
    catalog
        .store
        .add_labels(&mut ctx(STEWARD), &guid, labels(&["hot", "daily", "raw"]))
        .unwrap();
    catalog
        .store
        .add_classifications(
            &mut ctx(STEWARD),
            &guid,
            vec![Classification::new("PII"), Classification::new("Deprecated")],
        )
        .unwrap();

    // THEN
    let label_requests: Vec<String> = catalog
        .authorizer
        .requests_for(Privilege::EntityAddLabel)
        .iter()
        .filter_map(|r| r.as_entity().and_then(|e| e.label()).map(str::to_string))
        .collect();
    assert_eq!(label_requests, vec!["daily", "hot", "raw"]);

    let classification_requests: Vec<String> = catalog
        .authorizer
        .requests_for(Privilege::EntityAddClassification)
        .iter()
        .filter_map(|r| {
            r.as_entity()
                .and_then(|e| e.classification())
                .map(|c| c.type_name.clone())
        })
        .collect();
    assert_eq!(classification_requests, vec!["PII", "Deprecated"]);
}

#[test]
fn test_import_skips_authorization() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    let response = catalog
        .store
        .create_or_update_for_import(
            &mut ctx(READER),
            EntityStream::new(vec![database("sales"), table("sales.orders")]),
        )
        .unwrap();

    // THEN
    assert_eq!(response.created().len(), 2);
    assert!(catalog.authorizer.requests().is_empty());
    assert_eq!(catalog.notifier.names(), vec!["entities-mutated"]);
}

#[test]
fn test_import_keeps_supplied_guids() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    let guid = Guid::new("9f1c2d3e-0000-4000-8000-000000000001");

    // WHEN
    catalog
        .store
        .create_or_update_for_import(
            &mut ctx(ADMIN),
            EntityStream::single(
                Entity::new("Table", guid.clone()).with_attr("qualifiedName", "sales.orders"),
            ),
        )
        .unwrap();

    // THEN
    assert_eq!(catalog.guid_of("Table", "sales.orders").unwrap(), guid);
}
