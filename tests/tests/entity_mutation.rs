//! Entity create/update integration tests.
//!
//! These tests submit batches of catalog entities and check what the store
//! decides for each one: create, update, skip or reactivate.

use pretty_assertions::assert_eq;
use strata_tests::prelude::*;

fn db_ref(catalog: &Catalog, table: &str) -> Option<Guid> {
    let guid = catalog.guid_of("Table", table).ok()?;
    let entity = catalog.entity(&guid).ok()?;
    entity
        .relationship_attributes
        .get("db")
        .and_then(Value::as_ref_id)
        .and_then(|id| id.guid.clone())
}

mod idempotent_create {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("idempotent_create")
            .step(
                "test_create_table",
                |c| c.create(STEWARD, vec![table("sales.orders")]),
                |a| a.created(1).updated(0).access_requests(1).events(&["entities-mutated"]),
            )
            .step(
                "test_resend_identical_payload",
                |c| c.create(STEWARD, vec![table("sales.orders")]),
                |a| a.unchanged().access_requests(0).silent(),
            )
            .step(
                "test_change_row_count",
                |c| c.create(STEWARD, vec![table("sales.orders").with_attr("rowCount", 42i64)]),
                |a| a.created(0).updated(1).access_requests(1),
            )
            .step(
                "test_row_count_as_text_is_unchanged",
                |c| c.create(STEWARD, vec![table("sales.orders").with_attr("rowCount", "42")]),
                |a| a.unchanged().access_requests(0),
            )
    }

    #[test]
    fn test_idempotent_create() {
        scenario().run().unwrap();
    }
}

mod batch_references {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("batch_references")
            .step(
                "test_reference_by_placeholder_guid",
                |c| {
                    c.create(
                        STEWARD,
                        vec![
                            Entity::new("Database", Guid::temporary(1))
                                .with_attr("qualifiedName", "sales"),
                            table("sales.orders").with_relationship(
                                "db",
                                ObjectId::by_guid(Guid::temporary(1), "Database"),
                            ),
                        ],
                    )
                },
                |a| {
                    a.created(2).assert_fn(|c, _| {
                        let db = c.guid_of("Database", "sales").ok();
                        db.is_some() && db_ref(c, "sales.orders") == db
                    })
                },
            )
            .step(
                "test_reference_by_unique_attributes_in_batch",
                |c| {
                    c.create(
                        STEWARD,
                        vec![
                            table("sales.items").with_relationship(
                                "columns",
                                vec![
                                    by_name("Column", "sales.items.id"),
                                    by_name("Column", "sales.items.sku"),
                                ],
                            ),
                            column("sales.items.id", "sales.items"),
                            column("sales.items.sku", "sales.items"),
                        ],
                    )
                },
                |a| a.created(3).access_requests(3),
            )
            .step(
                "test_reference_to_persisted_entity",
                |c| {
                    c.create(
                        STEWARD,
                        vec![table("sales.returns").with_relationship("db", by_name("Database", "sales"))],
                    )
                },
                |a| {
                    a.created(1).assert_fn(|c, _| {
                        let db = c.guid_of("Database", "sales").ok();
                        db.is_some() && db_ref(c, "sales.returns") == db
                    })
                },
            )
            .step(
                "test_unresolvable_reference_fails",
                |c| {
                    c.create(
                        STEWARD,
                        vec![table("sales.lost").with_relationship("db", by_name("Database", "nowhere"))],
                    )
                },
                |a| a.error_code(ErrorCode::ReferencedEntityNotFound).silent(),
            )
    }

    #[test]
    fn test_batch_references() {
        scenario().run().unwrap();
    }
}

mod validation {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("validation")
            .step(
                "test_unknown_type",
                |c| c.create(STEWARD, vec![Entity::new("View", Guid::default())]),
                |a| a.error_code(ErrorCode::TypeNameInvalid),
            )
            .step(
                "test_missing_unique_attribute",
                |c| c.create(STEWARD, vec![Entity::new("Table", Guid::default())]),
                |a| {
                    a.error_code(ErrorCode::InstanceCrudInvalidParams)
                        .error("Table.qualifiedName: mandatory attribute value missing")
                }
            )
            .step(
                "test_messages_accumulate",
                |c| {
                    c.create(
                        STEWARD,
                        vec![table("sales.orders")
                            .with_attr("rowCount", "many")
                            .with_attr("owner", "ann")],
                    )
                },
                |a| a.error_matches(r"rowCount: invalid value.*owner: unknown attribute"),
            )
            .step(
                "test_custom_attribute_key",
                |c| {
                    c.create(
                        STEWARD,
                        vec![table("sales.orders").with_custom_attr("bad key", "value")],
                    )
                },
                |a| a.error_code(ErrorCode::InvalidCustomAttribute),
            )
            .step(
                "test_empty_batch",
                |c| {
                    c.store.create_or_update(
                        &mut ctx(STEWARD),
                        EntityStream::default(),
                        false,
                        false,
                        false,
                    )
                },
                |a| a.error("no entities to create/update."),
            )
    }

    #[test]
    fn test_validation() {
        scenario().run().unwrap();
    }
}

#[test]
fn test_resubmitting_deleted_guid_reactivates() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    let created = catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = created.first_created().unwrap().guid.clone();
    catalog.store.delete_by_id(&mut ctx(STEWARD), &guid).unwrap();
    assert!(catalog.guid_of("Table", "sales.orders").is_err());

    // WHEN
    let response = catalog
        .create(
            STEWARD,
            vec![Entity::new("Table", guid.clone())
                .with_attr("qualifiedName", "sales.orders")
                .with_status(EntityStatus::Active)],
        )
        .unwrap();

    // THEN
    assert_eq!(response.operation(&guid), Some(EntityOperation::Create));
    assert_eq!(catalog.entity(&guid).unwrap().status, Some(EntityStatus::Active));
    assert_eq!(catalog.guid_of("Table", "sales.orders").unwrap(), guid);
}

#[test]
fn test_update_without_status_keeps_deleted_entity_deleted() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    let created = catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = created.first_created().unwrap().guid.clone();
    catalog.store.delete_by_id(&mut ctx(STEWARD), &guid).unwrap();
    catalog.reset_recordings();

    // WHEN
    let attribute = catalog
        .store
        .update_entity_attribute_by_guid(&mut ctx(STEWARD), &guid, "rowCount", Value::Int(5))
        .unwrap();
    let partial = catalog
        .store
        .create_or_update(
            &mut ctx(STEWARD),
            EntityStream::single(Entity::new("Table", guid.clone()).with_attr("rowCount", 7i64)),
            true,
            false,
            false,
        )
        .unwrap();

    // THEN
    assert_ne!(attribute.operation(&guid), Some(EntityOperation::Create));
    assert_ne!(partial.operation(&guid), Some(EntityOperation::Create));
    assert!(catalog.authorizer.requests_for(Privilege::EntityCreate).is_empty());
    assert_eq!(catalog.entity(&guid).unwrap().status, Some(EntityStatus::Deleted));
    assert!(catalog.guid_of("Table", "sales.orders").is_err());
}

#[test]
fn test_failed_batch_writes_nothing() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    let result = catalog.create(
        STEWARD,
        vec![
            table("sales.orders"),
            table("sales.broken").with_attr("rowCount", "many"),
        ],
    );

    // THEN
    assert!(result.is_err());
    assert!(catalog.guid_of("Table", "sales.orders").is_err());
    assert_eq!(catalog.store.get_entity_guids("Table").unwrap(), Vec::<Guid>::new());
    assert!(catalog.notifier.events().is_empty());
}

#[test]
fn test_import_batches_share_one_commit() {
    // GIVEN
    let catalog = Catalog::new().unwrap();

    // WHEN
    let failed = catalog.store.in_transaction(&mut ctx(STEWARD), |graph, ctx| {
        catalog.store.create_or_update_for_import_in(
            graph,
            ctx,
            EntityStream::new(vec![table("sales.orders")]),
        )?;
        catalog.store.create_or_update_for_import_in(
            graph,
            ctx,
            EntityStream::new(vec![table("sales.broken").with_attr("rowCount", "many")]),
        )
    });
    let committed = catalog.store.in_transaction(&mut ctx(STEWARD), |graph, ctx| {
        let first = catalog.store.create_or_update_for_import_in(
            graph,
            ctx,
            EntityStream::new(vec![table("sales.orders")]),
        )?;
        let second = catalog.store.create_or_update_for_import_in(
            graph,
            ctx,
            EntityStream::new(vec![table("sales.items")]),
        )?;
        Ok(first.created().len() + second.created().len())
    });

    // THEN
    assert!(failed.is_err());
    assert_eq!(committed.unwrap(), 2);
    assert_eq!(catalog.store.get_entity_guids("Table").unwrap().len(), 2);
    assert_eq!(
        catalog.notifier.names(),
        vec!["entities-mutated", "entities-mutated"]
    );
    assert!(catalog.authorizer.requests().is_empty());
}

#[test]
fn test_partial_update_keeps_other_attributes() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog
        .create(
            STEWARD,
            vec![table("sales.orders").with_attr("description", "all orders")],
        )
        .unwrap();

    // WHEN
    let response = catalog
        .store
        .update_by_unique_attributes(
            &mut ctx(STEWARD),
            "Table",
            &attrs! { "qualifiedName" => "sales.orders" },
            Entity::new("Table", Guid::default()).with_attr("rowCount", 7i64),
        )
        .unwrap();

    // THEN
    assert_eq!(response.updated().len(), 1);
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();
    let entity = catalog.entity(&guid).unwrap();
    assert_eq!(entity.attributes.get("rowCount"), Some(&Value::Int(7)));
    assert_eq!(
        entity.attributes.get("description"),
        Some(&Value::from("all orders"))
    );
}

#[test]
fn test_update_single_attribute() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = catalog.guid_of("Table", "sales.orders").unwrap();

    // WHEN
    let response = catalog
        .store
        .update_entity_attribute_by_guid(&mut ctx(STEWARD), &guid, "rowCount", Value::Int(99))
        .unwrap();
    let rejected = catalog.store.update_entity_attribute_by_guid(
        &mut ctx(STEWARD),
        &guid,
        "columns",
        Value::List(vec![]),
    );

    // THEN
    assert_eq!(response.updated().len(), 1);
    assert_eq!(
        catalog.entity(&guid).unwrap().attributes.get("rowCount"),
        Some(&Value::Int(99))
    );
    assert_eq!(
        rejected.unwrap_err().code(),
        ErrorCode::AttributeUpdateNotSupported
    );
}
