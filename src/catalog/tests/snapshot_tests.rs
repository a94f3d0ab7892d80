//! Тесты снимка каталога

use crate::catalog::loader::CatalogAccess;
use crate::catalog::snapshot::CatalogSnapshot;
use crate::catalog::TypeCategory;
use crate::common::test_utils::{sample_catalog, sample_snapshot};
use crate::common::Error;
use crate::grammar::parse_relation_identifier;

#[test]
fn test_sample_snapshot_into_catalog() {
    let catalog = sample_catalog();

    let orders = catalog
        .relation(&parse_relation_identifier("orders").unwrap())
        .unwrap();
    assert_eq!(orders.columns.len(), 11);
    assert!(orders.column("id").unwrap().primary_key);
    assert!(orders.column("created_at").unwrap().not_null);
    assert!(orders.unique_index_matching(&["email".to_string()]).is_some());
    assert!(orders
        .unique_index_matching(&["status".to_string()])
        .is_none());

    // Отношение схемы public доступно и по полному имени
    assert!(catalog
        .relation(&parse_relation_identifier("public.orders").unwrap())
        .is_ok());
}

#[test]
fn test_snapshot_enum_type() {
    let catalog = sample_catalog();
    let mood = catalog.model().type_by_name("order_mood").unwrap();
    assert_eq!(mood.category, TypeCategory::Enum);
}

#[test]
fn test_unknown_relation_in_snapshot() {
    let catalog = sample_catalog();
    let err = catalog
        .relation(&parse_relation_identifier("missing").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
}

#[test]
fn test_snapshot_json_round_trip() {
    let text = serde_json::to_string(&sample_snapshot()).unwrap();
    let parsed = CatalogSnapshot::from_json(&text).unwrap();
    assert_eq!(parsed.relations.len(), 2);
    assert!(parsed.into_catalog("snap").is_ok());
}

#[test]
fn test_snapshot_unknown_column_type() {
    let text = r#"{
        "relations": [{
            "name": "t",
            "columns": [{"name": "c", "type": "no_such_type"}]
        }]
    }"#;
    let snapshot = CatalogSnapshot::from_json(text).unwrap();
    let err = snapshot.into_catalog("snap").unwrap_err();
    assert!(matches!(err, Error::CatalogLoad { .. }));
}

#[test]
fn test_standard_operators_present() {
    let catalog = sample_catalog();
    let model = catalog.model();
    assert!(model
        .operator(crate::catalog::oid::TEXT, crate::catalog::oid::TEXT, "=")
        .is_some());
    assert!(model
        .implicit_cast(crate::catalog::oid::INT4, crate::catalog::oid::INT8)
        .is_some());
}
