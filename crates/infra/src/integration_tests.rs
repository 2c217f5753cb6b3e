//! Integration tests for the catalog engine over the in-memory store.
//!
//! Tests: submission → Catalog → CatalogTx → reads
//!
//! Verifies:
//! - Inherited attributes resolve ancestor-first and never leak downwards
//! - Stored trees reconstruct to the submitted shape
//! - Products attach only to leaves and only bind inherited params
//! - Deletes and replaces cascade; failed operations leave no trace

use taxonomy_core::{CatalogError, ClassId, NewClass, NewParam, NewProduct, NewUnit, ProductId};
use taxonomy_hierarchy::isomorphic;

use crate::catalog::Catalog;
use crate::store::InMemoryCatalogStore;

async fn setup() -> Catalog<InMemoryCatalogStore> {
    let catalog = Catalog::new(InMemoryCatalogStore::new());
    catalog
        .ensure_units(&[NewUnit::new("U1", "u1"), NewUnit::new("U2", "u2")])
        .await
        .unwrap();
    catalog
        .ensure_value_types(&["string".to_string(), "int".to_string()])
        .await
        .unwrap();
    catalog
}

fn vehicle() -> NewClass {
    NewClass::new("Vehicle", "U1")
        .with_param(NewParam::new("color", "string", "U1"))
        .with_child(NewClass::new("Car", "U1").with_param(NewParam::new("doors", "int", "U1")))
}

fn tesla() -> NewProduct {
    NewProduct::new("Tesla", "Car")
        .with_value("color", "red")
        .with_value("doors", "4")
}

/// Creates Vehicle > Car and returns (vehicle, car).
async fn with_vehicle(catalog: &Catalog<InMemoryCatalogStore>) -> (ClassId, ClassId) {
    let vehicle_id = catalog.create_subtree(&vehicle(), None).await.unwrap();
    let car_id = catalog.read_subtree("Car").await.unwrap().id;
    (vehicle_id, car_id)
}

fn param_names(params: &[taxonomy_core::ClassParam]) -> Vec<&str> {
    params.iter().map(|cp| cp.param.name.as_str()).collect()
}

#[tokio::test]
async fn vehicle_car_tesla_round_trip() {
    let catalog = setup().await;
    let (vehicle_id, car_id) = with_vehicle(&catalog).await;

    let car = catalog.read_class(car_id, true).await.unwrap();
    assert_eq!(car.parent, Some(vehicle_id));
    assert_eq!(car.unit.name, "U1");
    assert_eq!(param_names(&car.params), vec!["color", "doors"]);
    assert_eq!(car.params[0].class_id, vehicle_id);
    assert_eq!(car.params[1].class_id, car_id);

    let ids = catalog.create_products(&[tesla()]).await.unwrap();
    let product = catalog.read_product(ids[0]).await.unwrap();
    assert_eq!(product.name, "Tesla");
    assert_eq!(product.class.id, car_id);
    assert_eq!(product.values.len(), 2);
    assert_eq!(product.value_of("color"), Some("red"));
    assert_eq!(product.value_of("doors"), Some("4"));

    let color = product
        .values
        .iter()
        .find(|v| v.class_param.param.name == "color")
        .unwrap();
    assert_eq!(color.class_param.class_id, vehicle_id);
    assert_eq!(color.class_param.param.value_type.name, "string");
    assert_eq!(
        color.class_param.param.owner_unit.as_ref().map(|u| u.name.as_str()),
        Some("U1")
    );

    let err = catalog
        .create_products(&[NewProduct::new("Chassis", "Vehicle")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidPlacement(_)));
}

#[tokio::test]
async fn closure_never_includes_descendant_params() {
    let catalog = setup().await;
    let (vehicle_id, car_id) = with_vehicle(&catalog).await;

    let root = catalog.read_class(vehicle_id, true).await.unwrap();
    assert_eq!(param_names(&root.params), vec!["color"]);

    let own = catalog.read_class(car_id, false).await.unwrap();
    assert_eq!(param_names(&own.params), vec!["doors"]);

    let resolved = catalog.resolve_attributes(car_id).await.unwrap();
    assert_eq!(param_names(&resolved), vec!["color", "doors"]);
}

#[tokio::test]
async fn value_outside_the_closure_is_not_found() {
    let catalog = setup().await;
    let truck = NewClass::new("Truck", "U1").with_param(NewParam::new("payload", "int", "U1"));
    let (vehicle_id, _) = with_vehicle(&catalog).await;
    catalog.create_subtree(&truck, Some(vehicle_id)).await.unwrap();

    // "payload" lives on a sibling branch, not on Car's chain.
    let err = catalog
        .create_products(&[NewProduct::new("Tesla", "Car").with_value("payload", "900")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    let err = catalog
        .create_products(&[NewProduct::new("Tesla", "Car").with_value("wheels", "4")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn product_on_missing_class_is_not_found() {
    let catalog = setup().await;
    let err = catalog
        .create_products(&[NewProduct::new("Ghost", "Nowhere")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_every_descendant() {
    let catalog = setup().await;
    let (vehicle_id, car_id) = with_vehicle(&catalog).await;
    let product = catalog.create_products(&[tesla()]).await.unwrap()[0];

    catalog.delete_class(vehicle_id).await.unwrap();

    for id in [vehicle_id, car_id] {
        let err = catalog.read_class(id, false).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
    assert!(matches!(
        catalog.read_product(product).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
    assert!(catalog.read_class_tree().await.unwrap().is_empty());
    assert!(matches!(
        catalog.delete_class(vehicle_id).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
}

#[tokio::test]
async fn full_tree_matches_submitted_shape() {
    let catalog = setup().await;
    let furniture = NewClass::new("Furniture", "U2")
        .with_child(
            NewClass::new("Table", "U2")
                .with_child(NewClass::new("Desk", "U2"))
                .with_child(NewClass::new("Dining", "U2")),
        )
        .with_child(NewClass::new("Chair", "U2"));
    let submitted = vec![vehicle(), furniture];

    let roots = catalog.create_classes(&submitted).await.unwrap();
    let forest = catalog.read_class_tree().await.unwrap();

    assert_eq!(forest.len(), 2);
    for (tree, class) in forest.iter().zip(&submitted) {
        assert!(roots.contains(&tree.id));
        assert!(tree.parent.is_none());
        assert!(isomorphic(tree, class));
    }

    let table = catalog.read_subtree("Table").await.unwrap();
    assert_eq!(table.node_count(), 3);
    assert!(table.parent.is_some());
}

#[tokio::test]
async fn subtree_under_explicit_parent() {
    let catalog = setup().await;
    let (vehicle_id, _) = with_vehicle(&catalog).await;

    let bike = catalog
        .create_subtree(&NewClass::new("Bike", "U1"), Some(vehicle_id))
        .await
        .unwrap();
    let tree = catalog.read_subtree("Vehicle").await.unwrap();
    let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Car", "Bike"]);
    assert_eq!(catalog.read_class(bike, false).await.unwrap().parent, Some(vehicle_id));

    let err = catalog
        .create_subtree(&NewClass::new("Boat", "U1"), Some(ClassId::new(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn zero_parent_creates_a_root() {
    let catalog = setup().await;
    with_vehicle(&catalog).await;

    let boat = catalog
        .create_subtree(&NewClass::new("Boat", "U1"), Some(ClassId::new(0)))
        .await
        .unwrap();
    assert_eq!(catalog.read_class(boat, false).await.unwrap().parent, None);
    let roots: Vec<String> = catalog
        .read_class_tree()
        .await
        .unwrap()
        .into_iter()
        .map(|tree| tree.name)
        .collect();
    assert_eq!(roots, vec!["Vehicle", "Boat"]);

    let err = catalog
        .create_subtree(&NewClass::new("Vehicle", "U1"), Some(ClassId::new(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}

#[tokio::test]
async fn redeclaring_an_existing_class_conflicts() {
    let catalog = setup().await;
    with_vehicle(&catalog).await;

    let err = catalog.create_subtree(&vehicle(), None).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let err = catalog
        .create_subtree(&NewClass::new("Car", "U1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}

#[tokio::test]
async fn class_with_unknown_unit_is_not_found() {
    let catalog = setup().await;
    let err = catalog
        .create_subtree(&NewClass::new("Orphan", "Nobody"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn update_replaces_own_params_and_keeps_parent() {
    let catalog = setup().await;
    let (vehicle_id, car_id) = with_vehicle(&catalog).await;
    catalog.create_products(&[tesla()]).await.unwrap();

    let replacement = NewClass::new("Car", "U1").with_param(NewParam::new("seats", "int", "U1"));
    let new_id = catalog.update_class(car_id, &replacement).await.unwrap();

    let car = catalog.read_class(new_id, false).await.unwrap();
    assert_eq!(car.parent, Some(vehicle_id));
    assert_eq!(param_names(&car.params), vec!["seats"]);

    let inherited = catalog.read_class(new_id, true).await.unwrap();
    assert_eq!(param_names(&inherited.params), vec!["color", "seats"]);

    // The old class and the products under it went with the replace.
    assert!(matches!(
        catalog.read_class(car_id, false).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
    assert!(catalog.read_class_products(new_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn updating_a_root_keeps_it_a_root() {
    let catalog = setup().await;
    let (vehicle_id, _) = with_vehicle(&catalog).await;

    let new_id = catalog
        .update_class(vehicle_id, &NewClass::new("Vehicle", "U2"))
        .await
        .unwrap();
    let forest = catalog.read_class_tree().await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, new_id);
    assert!(forest[0].is_leaf());
    assert_eq!(catalog.read_class(new_id, false).await.unwrap().unit.name, "U2");
}

#[tokio::test]
async fn update_of_missing_class_is_not_found() {
    let catalog = setup().await;
    let err = catalog
        .update_class(ClassId::new(42), &NewClass::new("Ghost", "U1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn ensure_units_is_idempotent() {
    let catalog = setup().await;
    let first = catalog.ensure_units(&[NewUnit::new("Ops", "O")]).await.unwrap();
    let second = catalog.ensure_units(&[NewUnit::new("Ops", "other")]).await.unwrap();
    assert_eq!(first, second);

    let ops = catalog.list_units(Some("Ops")).await.unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].short_name, "O");
    assert_eq!(catalog.list_units(None).await.unwrap().len(), 3);

    let a = catalog.ensure_value_types(&["string".to_string()]).await.unwrap();
    let b = catalog.ensure_value_types(&["string".to_string()]).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(catalog.list_value_types(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn blank_unit_name_is_rejected() {
    let catalog = setup().await;
    let err = catalog.ensure_units(&[NewUnit::new("  ", "")]).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn failing_batch_leaves_nothing_behind() {
    let catalog = setup().await;
    let err = catalog
        .create_classes(&[vehicle(), NewClass::new("Broken", "Missing")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert!(catalog.read_class_tree().await.unwrap().is_empty());
    assert!(catalog.list_params(None).await.unwrap().is_empty());

    let (_, car_id) = with_vehicle(&catalog).await;
    let err = catalog
        .create_products(&[tesla(), NewProduct::new("Cybertruck", "Vehicle")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidPlacement(_)));
    assert!(catalog.read_class_products(car_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn param_redeclared_with_another_type_conflicts() {
    let catalog = setup().await;
    with_vehicle(&catalog).await;

    let err = catalog
        .ensure_param(&NewParam::new("color", "int", "U1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let same = catalog
        .ensure_param(&NewParam::new("color", "string", "U1"))
        .await
        .unwrap();
    let listed = catalog.list_params(Some("color")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, same);

    let err = catalog
        .ensure_param(&NewParam::new("weight", "decimal", "U1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn closest_declaration_wins_when_a_param_is_redeclared() {
    let catalog = setup().await;
    let tree = NewClass::new("Vehicle", "U1")
        .with_param(NewParam::new("color", "string", "U1"))
        .with_child(NewClass::new("Car", "U1").with_param(NewParam::new("color", "string", "U1")));
    let vehicle_id = catalog.create_subtree(&tree, None).await.unwrap();
    let car_id = catalog.read_subtree("Car").await.unwrap().id;

    let closure = catalog.resolve_attributes(car_id).await.unwrap();
    assert_eq!(param_names(&closure), vec!["color", "color"]);
    assert_eq!(closure[0].class_id, vehicle_id);
    assert_eq!(closure[0].param.id, closure[1].param.id);

    let id = catalog
        .create_products(&[NewProduct::new("Tesla", "Car").with_value("color", "red")])
        .await
        .unwrap()[0];
    let product = catalog.read_product(id).await.unwrap();
    assert_eq!(product.values[0].class_param.class_id, car_id);
}

#[tokio::test]
async fn products_of_a_class_and_replacement() {
    let catalog = setup().await;
    let (_, car_id) = with_vehicle(&catalog).await;
    let ids = catalog
        .create_products(&[tesla(), NewProduct::new("Polo", "Car").with_value("doors", "5")])
        .await
        .unwrap();

    let listed = catalog.read_class_products(car_id).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Tesla", "Polo"]);

    let new_id = catalog
        .update_product(ids[0], &NewProduct::new("Tesla", "Car").with_value("doors", "2"))
        .await
        .unwrap();
    let tesla = catalog.read_product(new_id).await.unwrap();
    assert_eq!(tesla.value_of("doors"), Some("2"));
    assert_eq!(tesla.value_of("color"), None);
    assert!(matches!(
        catalog.read_product(ids[0]).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));

    assert!(matches!(
        catalog.read_class_products(ClassId::new(999)).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
}

#[tokio::test]
async fn class_that_gains_children_rejects_new_product_writes() {
    let catalog = setup().await;
    let (_, car_id) = with_vehicle(&catalog).await;
    let id = catalog.create_products(&[tesla()]).await.unwrap()[0];

    catalog
        .create_subtree(&NewClass::new("Sedan", "U1"), Some(car_id))
        .await
        .unwrap();

    let err = catalog.update_product(id, &tesla()).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidPlacement(_)));
    let err = catalog
        .create_products(&[NewProduct::new("Polo", "Car")])
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidPlacement(_)));

    // The failed replacement rolled back, so the existing product stays readable.
    let kept = catalog.read_product(id).await.unwrap();
    assert_eq!(kept.name, "Tesla");
    assert_eq!(kept.value_of("doors"), Some("4"));
}

#[tokio::test]
async fn duplicate_product_name_conflicts() {
    let catalog = setup().await;
    with_vehicle(&catalog).await;
    catalog.create_products(&[tesla()]).await.unwrap();
    let err = catalog.create_products(&[tesla()]).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}

#[tokio::test]
async fn delete_product_then_not_found() {
    let catalog = setup().await;
    with_vehicle(&catalog).await;
    let id = catalog.create_products(&[tesla()]).await.unwrap()[0];

    catalog.delete_product(id).await.unwrap();
    assert!(matches!(
        catalog.delete_product(id).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
    assert!(matches!(
        catalog
            .update_product(ProductId::new(77), &tesla())
            .await
            .unwrap_err(),
        CatalogError::NotFound(_)
    ));
}

#[tokio::test]
async fn deleting_a_unit_drops_its_classes_and_unassigns_its_params() {
    let catalog = setup().await;
    let units = catalog.list_units(Some("U2")).await.unwrap();
    let u2 = units[0].id;

    let boat = NewClass::new("Boat", "U2").with_param(NewParam::new("hull", "string", "U2"));
    let car = NewClass::new("Car", "U1").with_param(NewParam::new("trim", "string", "U2"));
    catalog.create_classes(&[boat, car]).await.unwrap();

    catalog.delete_unit(u2).await.unwrap();

    let forest = catalog.read_class_tree().await.unwrap();
    let names: Vec<&str> = forest.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Car"]);

    let trim = catalog.list_params(Some("trim")).await.unwrap();
    assert_eq!(trim.len(), 1);
    assert!(trim[0].owner_unit.is_none());

    let car = catalog.read_class(forest[0].id, false).await.unwrap();
    assert_eq!(param_names(&car.params), vec!["trim"]);
}

#[tokio::test]
async fn deleting_a_value_type_drops_its_params() {
    let catalog = setup().await;
    let (_, car_id) = with_vehicle(&catalog).await;
    let int = catalog.list_value_types(Some("int")).await.unwrap()[0].id;

    catalog.delete_value_type(int).await.unwrap();

    assert!(catalog.list_params(Some("doors")).await.unwrap().is_empty());
    let car = catalog.read_class(car_id, true).await.unwrap();
    assert_eq!(param_names(&car.params), vec!["color"]);
    assert!(matches!(
        catalog.delete_value_type(int).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
}
