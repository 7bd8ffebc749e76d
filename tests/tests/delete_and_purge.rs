//! Delete and purge integration tests.

use pretty_assertions::assert_eq;
use strata_graph::GraphStore;
use strata_store::EntityMutationResponse;
use strata_tests::prelude::*;

fn orders(c: &Catalog) -> Result<Guid, StoreError> {
    c.guid_of("Table", "sales.orders")
}

fn seed(c: &Catalog) -> Result<EntityMutationResponse, StoreError> {
    c.create(
        STEWARD,
        vec![
            database("sales"),
            table("sales.orders")
                .with_relationship("db", by_name("Database", "sales"))
                .with_relationship(
                    "columns",
                    vec![
                        by_name("Column", "sales.orders.id"),
                        by_name("Column", "sales.orders.total"),
                    ],
                ),
            column("sales.orders.id", "sales.orders"),
            column("sales.orders.total", "sales.orders"),
            process(
                "etl.daily",
                vec![by_name("Table", "sales.orders")],
                vec![],
            ),
        ],
    )
}

mod cascade {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("delete_cascade")
            .step("test_seed", seed, |a| a.created(5))
            .step(
                "test_delete_table",
                |c| c.store.delete_by_id(&mut ctx(STEWARD), &orders(c)?),
                |a| {
                    a.deleted(3)
                        .updated(1)
                        .access_requests(1)
                        .events(&["entities-mutated"])
                        .assert_fn(|c, _| {
                            let Ok(guid) = c.guid_of("Process", "etl.daily") else {
                                return false;
                            };
                            c.entity(&guid)
                                .map(|p| {
                                    p.relationship_attributes.get("inputs")
                                        == Some(&Value::List(vec![]))
                                })
                                .unwrap_or(false)
                        })
                },
            )
            .step(
                "test_delete_again",
                |c| {
                    let deleted: Vec<Guid> = c.store.with_graph(|g| {
                        g.vertex_guids_of_type("Table")
                            .into_iter()
                            .filter(|guid| g.find_deleted_by_guid(guid).is_some())
                            .collect()
                    });
                    c.store.delete_by_ids(&mut ctx(STEWARD), &deleted)
                },
                |a| a.unchanged().silent(),
            )
    }

    #[test]
    fn test_delete_cascade() {
        scenario().run().unwrap();
    }
}

#[test]
fn test_purge_removes_deleted_entities() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    seed(&catalog).unwrap();
    let table = orders(&catalog).unwrap();
    let process = catalog.guid_of("Process", "etl.daily").unwrap();
    catalog.store.delete_by_id(&mut ctx(STEWARD), &table).unwrap();
    catalog.reset_recordings();

    // WHEN
    let denied = catalog
        .store
        .purge_by_ids(&mut ctx(STEWARD), &[table.clone(), process.clone()]);
    let purged = catalog
        .store
        .purge_by_ids(&mut ctx(ADMIN), &[table.clone(), process.clone()])
        .unwrap();

    // THEN
    assert_eq!(denied.unwrap_err().code(), ErrorCode::Unauthorized);
    assert_eq!(purged.purged().len(), 3);
    assert_eq!(purged.updated().len(), 0);
    assert_eq!(catalog.authorizer.requests_for(Privilege::AdminPurge).len(), 2);
    assert_eq!(
        catalog.entity(&table).unwrap_err().code(),
        ErrorCode::InstanceGuidNotFound
    );
    assert!(catalog.entity(&process).is_ok());
}

#[test]
fn test_purge_of_active_entity_is_a_noop() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = orders(&catalog).unwrap();
    catalog.reset_recordings();

    // WHEN
    let response = catalog.store.purge_by_ids(&mut ctx(ADMIN), &[guid.clone()]).unwrap();

    // THEN
    assert!(response.is_empty());
    assert!(catalog.notifier.events().is_empty());
    assert!(catalog.entity(&guid).is_ok());
}

#[test]
fn test_delete_by_unique_attributes() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = orders(&catalog).unwrap();

    // WHEN
    let response = catalog
        .store
        .delete_by_unique_attributes(
            &mut ctx(STEWARD),
            "Table",
            &attrs! { "qualifiedName" => "sales.orders" },
        )
        .unwrap();
    let missing = catalog
        .store
        .delete_by_unique_attributes(
            &mut ctx(STEWARD),
            "Table",
            &attrs! { "qualifiedName" => "sales.orders" },
        )
        .unwrap();

    // THEN
    assert_eq!(response.operation(&guid), Some(EntityOperation::Delete));
    assert!(missing.is_empty());
    assert_eq!(
        catalog.entity(&guid).unwrap().status,
        Some(EntityStatus::Deleted)
    );
}

#[test]
fn test_delete_denied_keeps_entity() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = orders(&catalog).unwrap();

    // WHEN
    let result = catalog.store.delete_by_id(&mut ctx(READER), &guid);

    // THEN
    assert_eq!(result.unwrap_err().code(), ErrorCode::Unauthorized);
    assert_eq!(
        catalog.entity(&guid).unwrap().status,
        Some(EntityStatus::Active)
    );
}

#[test]
fn test_deleted_through_update_batch() {
    // GIVEN
    let catalog = Catalog::new().unwrap();
    catalog.create(STEWARD, vec![table("sales.orders")]).unwrap();
    let guid = orders(&catalog).unwrap();

    // WHEN
    let response = catalog
        .create(
            STEWARD,
            vec![Entity::new("Table", guid.clone())
                .with_attr("qualifiedName", "sales.orders")
                .with_status(EntityStatus::Deleted)],
        )
        .unwrap();

    // THEN
    assert_eq!(response.operation(&guid), Some(EntityOperation::Delete));
    assert!(orders(&catalog).is_err());
}
