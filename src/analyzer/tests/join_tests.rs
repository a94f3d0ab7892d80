//! Тесты построения соединений

use crate::analyzer::Analyzer;
use crate::common::test_utils::{field, order_record, target, ty_record, ty_string};
use crate::common::Error;
use crate::ir::{JoinItem, JoinKind};

fn join_target(
    join_fields: Vec<crate::descriptor::FieldDescriptor>,
) -> crate::descriptor::TargetDescriptor {
    target(
        "SelectOrders",
        vec![
            field("Meta", order_record(), &[("rel", &["orders:o"])]),
            field("Join", ty_record("Joins", join_fields), &[]),
        ],
    )
}

#[test]
fn test_left_join_with_condition() {
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["c.id = o.client_id"])])],
    );
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:c"]), ("kind", &["left"])],
    )]);

    let ir = Analyzer::default().analyze(&descriptor).unwrap();
    let join = ir.join_clause.unwrap();
    assert_eq!(join.directives.len(), 1);
    let directive = &join.directives[0];
    assert_eq!(directive.kind, JoinKind::Left);
    assert_eq!(directive.relation.to_string(), "clients:c");
    assert_eq!(directive.conditions.len(), 1);

    let JoinItem::Condition(condition) = &directive.conditions[0] else {
        panic!("expected join condition");
    };
    assert_eq!(condition.left.to_string(), "c.id");
}

#[test]
fn test_default_kind_is_inner() {
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["c.id = o.client_id"])])],
    );
    let descriptor = join_target(vec![field("Clients", clients, &[("sql", &["clients:c"])])]);

    let ir = Analyzer::default().analyze(&descriptor).unwrap();
    assert_eq!(ir.join_clause.unwrap().directives[0].kind, JoinKind::Inner);
}

#[test]
fn test_foreign_lhs_qualifier_rejected() {
    // Левая сторона условия обязана ссылаться на присоединяемое отношение
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["o.client_id = c.id"])])],
    );
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:c"]), ("kind", &["left"])],
    )]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
    assert!(err.to_string().contains("but directive joins"));
}

#[test]
fn test_join_alias_conflict() {
    let clients = ty_record("ClientJoin", Vec::new());
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:o"]), ("kind", &["cross"])],
    )]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("alias conflict"));
}

#[test]
fn test_cross_join_rejects_conditions() {
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["c.id = o.client_id"])])],
    );
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:c"]), ("kind", &["cross"])],
    )]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("cross join takes no conditions"));
}

#[test]
fn test_base_relation_directive() {
    let base = ty_record("Base", Vec::new());
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["c.id = legacy.client_id"])])],
    );
    let descriptor = join_target(vec![
        field("Base", base, &[("sql", &["legacy_orders:legacy"]), ("kind", &["from"])]),
        field("Clients", clients, &[("sql", &["clients:c"]), ("kind", &["left"])]),
    ]);

    let ir = Analyzer::default().analyze(&descriptor).unwrap();
    let join = ir.join_clause.unwrap();
    assert_eq!(
        join.base.as_ref().map(|b| b.to_string()),
        Some("legacy_orders:legacy".to_string())
    );
    assert_eq!(join.directives.len(), 1);
}

#[test]
fn test_duplicate_base_directive() {
    let base = ty_record("Base", Vec::new());
    let descriptor = join_target(vec![
        field("A", base.clone(), &[("sql", &["one:a"]), ("kind", &["from"])]),
        field("B", base, &[("sql", &["two:b"]), ("kind", &["from"])]),
    ]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("duplicate base relation directive"));
}

#[test]
fn test_bad_join_kind() {
    let clients = ty_record("ClientJoin", Vec::new());
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:c"]), ("kind", &["diagonal"])],
    )]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("bad join kind"));
}

#[test]
fn test_join_condition_requires_rhs() {
    let clients = ty_record(
        "ClientJoin",
        vec![field("ById", ty_string(), &[("sql", &["c.id ="])])],
    );
    let descriptor = join_target(vec![field(
        "Clients",
        clients,
        &[("sql", &["clients:c"]), ("kind", &["left"])],
    )]);

    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("requires a right-hand side"));
}

#[test]
fn test_empty_join_field_rejected() {
    let descriptor = join_target(Vec::new());
    let err = Analyzer::default().analyze(&descriptor).unwrap_err();
    assert!(err.to_string().contains("declares no directives"));
}
