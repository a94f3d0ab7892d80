//! Тесты пространства отношений

use crate::analyzer::RelationSpace;
use crate::common::Error;
use crate::grammar::parse_relation_identifier;

#[test]
fn test_register_and_lookup() {
    let mut space = RelationSpace::new();
    let ident = parse_relation_identifier("public.orders:o").unwrap();
    space.register(&ident).unwrap();

    assert!(space.contains("o"));
    assert!(!space.contains("orders"));
    assert_eq!(space.get("o").unwrap().name, "orders");
    assert_eq!(space.len(), 1);
}

#[test]
fn test_name_used_without_alias() {
    let mut space = RelationSpace::new();
    let ident = parse_relation_identifier("orders").unwrap();
    space.register(&ident).unwrap();

    assert!(space.contains("orders"));
}

#[test]
fn test_duplicate_alias_rejected() {
    let mut space = RelationSpace::new();
    space
        .register(&parse_relation_identifier("orders:o").unwrap())
        .unwrap();

    let err = space
        .register(&parse_relation_identifier("clients:o").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
    assert!(err.to_string().contains("alias conflict"));
}

#[test]
fn test_duplicate_in_reverse_order() {
    // Конфликт не зависит от порядка регистрации
    let mut space = RelationSpace::new();
    space
        .register(&parse_relation_identifier("clients:o").unwrap())
        .unwrap();
    assert!(space
        .register(&parse_relation_identifier("orders:o").unwrap())
        .is_err());
}

#[test]
fn test_alias_and_name_do_not_collide() {
    let mut space = RelationSpace::new();
    space
        .register(&parse_relation_identifier("orders:o").unwrap())
        .unwrap();
    // Имя без псевдонима занимает собственный ключ
    space
        .register(&parse_relation_identifier("clients").unwrap())
        .unwrap();

    assert!(space.contains("o"));
    assert!(space.contains("clients"));
}

#[test]
fn test_same_name_conflicts_without_aliases() {
    let mut space = RelationSpace::new();
    space
        .register(&parse_relation_identifier("orders").unwrap())
        .unwrap();
    assert!(space
        .register(&parse_relation_identifier("orders").unwrap())
        .is_err());
}
