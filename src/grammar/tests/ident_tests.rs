//! Тесты разбора идентификаторов

use crate::analyzer::RelationSpace;
use crate::common::Error;
use crate::grammar::{parse_column_identifier, parse_relation_identifier};

#[test]
fn test_relation_identifier_full_form() {
    let ident = parse_relation_identifier("public.orders:o").unwrap();
    assert_eq!(ident.qualifier.as_deref(), Some("public"));
    assert_eq!(ident.name, "orders");
    assert_eq!(ident.alias.as_deref(), Some("o"));
    assert_eq!(ident.space_key(), "o");
    assert_eq!(ident.qualified_name(), "public.orders");
}

#[test]
fn test_relation_identifier_minimal_form() {
    let ident = parse_relation_identifier("orders").unwrap();
    assert_eq!(ident.qualifier, None);
    assert_eq!(ident.alias, None);
    assert_eq!(ident.space_key(), "orders");
}

#[test]
fn test_relation_identifier_round_trip() {
    // Разбор канонической формы идемпотентен
    for input in ["orders", "orders:o", "public.orders", "public.orders:o"] {
        let first = parse_relation_identifier(input).unwrap();
        let second = parse_relation_identifier(&first.to_string()).unwrap();
        assert_eq!(first, second, "round-trip failed for '{}'", input);
    }
}

#[test]
fn test_relation_identifier_bad_format() {
    for input in ["", "1orders", "or ders", "a.b.c:d:e", "orders:1x", "-x"] {
        let err = parse_relation_identifier(input).unwrap_err();
        assert!(
            matches!(err, Error::Grammar(_)),
            "expected grammar error for '{}'",
            input
        );
    }
}

#[test]
fn test_column_identifier_plain() {
    let space = RelationSpace::new();
    let ident = parse_column_identifier("status", &space).unwrap();
    assert_eq!(ident.qualifier, None);
    assert_eq!(ident.name, "status");
}

#[test]
fn test_column_identifier_qualified() {
    let mut space = RelationSpace::new();
    space
        .register(&parse_relation_identifier("orders:o").unwrap())
        .unwrap();

    let ident = parse_column_identifier("o.status", &space).unwrap();
    assert_eq!(ident.qualifier.as_deref(), Some("o"));
    assert_eq!(ident.name, "status");
}

#[test]
fn test_column_identifier_unknown_qualifier() {
    let space = RelationSpace::new();
    let err = parse_column_identifier("x.status", &space).unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(err.to_string().contains("unknown qualifier"));
}

#[test]
fn test_column_identifier_reserved_words() {
    let space = RelationSpace::new();
    for word in ["true", "false", "null", "current_date", "CURRENT_USER"] {
        let err = parse_column_identifier(word, &space).unwrap_err();
        assert!(
            err.to_string().contains("reserved word"),
            "expected reserved-word error for '{}'",
            word
        );
    }
}
