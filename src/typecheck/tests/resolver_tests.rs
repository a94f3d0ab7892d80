//! Тесты разрешителя совместимости

use crate::catalog::loader::CatalogAccess;
use crate::catalog::oid;
use crate::catalog::relation::Column;
use crate::common::test_utils::{sample_catalog, ty_bytes, ty_i64, ty_seq, ty_string};
use crate::descriptor::{TypeInfo, TypeKind};
use crate::typecheck::CompatibilityResolver;

fn column(type_oid: u32) -> Column {
    Column {
        ordinal: 1,
        name: "c".to_string(),
        type_oid,
        not_null: false,
        has_default: false,
        primary_key: false,
        dimensions: 0,
    }
}

#[test]
fn test_direct_text_resolution() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    // Последовательность байтов пишется в текстовую колонку напрямую
    let conversion = resolver.resolve(&column(oid::TEXT), &ty_bytes()).unwrap();
    assert!(conversion.is_passthrough());

    let conversion = resolver.resolve(&column(oid::TEXT), &ty_string()).unwrap();
    assert!(conversion.is_passthrough());
}

#[test]
fn test_enum_resolves_only_via_text_fallback() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    let mood = catalog.model().type_by_name("order_mood").unwrap();

    // Прямого ключа для перечисления в таблице нет
    assert!(crate::typecheck::compatibility::lookup(mood.oid, false, "str").is_none());

    // Запасной путь через текст разрешает пару
    let conversion = resolver.resolve(&column(mood.oid), &ty_string()).unwrap();
    assert!(conversion.is_passthrough());

    // Нестроковая форма не проходит и через запасной путь
    assert!(resolver.resolve(&column(mood.oid), &ty_bool_type()).is_none());
}

fn ty_bool_type() -> TypeInfo {
    TypeInfo::plain(TypeKind::Bool)
}

#[test]
fn test_incompatible_pairing() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    assert!(resolver.resolve(&column(oid::BOOL), &ty_string()).is_none());
}

#[test]
fn test_named_conversion_routines() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    let conversion = resolver
        .resolve(&column(oid::TIMESTAMP), &ty_i64())
        .unwrap();
    assert_eq!(conversion.valuer, "encode_unix_seconds");
    assert_eq!(conversion.scanner, "decode_unix_seconds");
}

#[test]
fn test_capability_overrides() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    // Тип с обеими возможностями проходит без преобразований
    let mut custom = ty_string();
    custom.readable = true;
    custom.writable = true;
    let conversion = resolver.resolve(&column(oid::TIMESTAMP), &custom).unwrap();
    assert!(conversion.is_passthrough());

    // Одна возможность снимает преобразование только своей стороны
    let mut readable_only = ty_i64();
    readable_only.readable = true;
    let conversion = resolver
        .resolve(&column(oid::TIMESTAMP), &readable_only)
        .unwrap();
    assert_eq!(conversion.valuer, "encode_unix_seconds");
    assert_eq!(conversion.scanner, "");
}

#[test]
fn test_length_one_sequence() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    let one_text = TypeInfo::plain(TypeKind::Sequence {
        elem: Box::new(ty_string()),
        fixed_len: Some(1),
    });
    let conversion = resolver
        .resolve(&column(oid::TEXT_ARRAY), &one_text)
        .unwrap();
    assert_eq!(conversion.valuer, "encode_array_one");
}

#[test]
fn test_array_resolution() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    let conversion = resolver
        .resolve(&column(oid::TEXT_ARRAY), &ty_seq(ty_string()))
        .unwrap();
    assert_eq!(conversion.valuer, "encode_text_array");
    assert_eq!(conversion.scanner, "decode_text_array");
}

#[test]
fn test_same_oid_always_comparable() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    assert!(resolver.comparable(oid::UUID, oid::UUID, "="));
}

#[test]
fn test_string_vs_unknown_comparable() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    assert!(resolver.comparable(oid::TEXT, oid::UNKNOWN, "="));
    assert!(resolver.comparable(oid::VARCHAR, oid::UNKNOWN, "="));
    assert!(!resolver.comparable(oid::BOOL, oid::UNKNOWN, "="));
}

#[test]
fn test_comparable_via_operator() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    assert!(resolver.comparable(oid::TEXT, oid::TEXT, "~~"));
}

#[test]
fn test_comparable_via_implicit_cast() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());

    // Оператора (int8, int4) нет, но есть неявное приведение int4 -> int8
    assert!(resolver.comparable(oid::INT8, oid::INT4, "="));
    assert!(resolver.comparable(oid::INT4, oid::INT8, "<"));

    // Несравнимые типы не проходят и через приведения
    assert!(!resolver.comparable(oid::BOOL, oid::INT8, "="));
}

#[test]
fn test_element_unwrap() {
    let catalog = sample_catalog();
    let resolver = CompatibilityResolver::new(catalog.model());
    assert_eq!(resolver.element_oid(oid::TEXT_ARRAY), Some(oid::TEXT));
    // Не-массив не разворачивается
    assert_eq!(resolver.element_oid(oid::TEXT), None);
}
