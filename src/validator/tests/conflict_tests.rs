//! Тесты проверки поведения при конфликте

use crate::analyzer::Analyzer;
use crate::common::test_utils::{field, order_record, sample_catalog, target, ty_record};
use crate::common::Error;
use crate::grammar::IdentifierList;
use crate::ir::{ConflictAction, OnConflictClause};
use crate::validator::SemanticValidator;

fn insert_with_conflict(
    annotations: &[(&str, &[&str])],
) -> crate::common::Result<crate::validator::QueryPlan> {
    let mut fields = vec![field("Meta", order_record(), &[("rel", &["orders"])])];
    fields.push(field(
        "OnConflict",
        ty_record("Conflict", Vec::new()),
        annotations,
    ));
    let descriptor = target("InsertOrder", fields);

    let catalog = sample_catalog();
    let ir = Analyzer::default().analyze(&descriptor)?;
    SemanticValidator::new(&catalog).validate(&ir)
}

#[test]
fn test_columns_target_matches_unique_index() {
    let plan = insert_with_conflict(&[
        ("columns", &["email"]),
        ("action", &["update", "status"]),
    ])
    .unwrap();
    let conflict = plan.conflict.unwrap();
    assert_eq!(conflict.target_columns, vec!["email".to_string()]);
    assert_eq!(conflict.target_index.as_deref(), Some("orders_email_key"));
    assert!(!conflict.ignore);
    assert_eq!(conflict.update_columns, vec!["status".to_string()]);
}

#[test]
fn test_columns_target_without_unique_index() {
    let err = insert_with_conflict(&[("columns", &["status"]), ("action", &["ignore"])])
        .unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(err.to_string().contains("no unique index covers"));
}

#[test]
fn test_unknown_target_column() {
    let err =
        insert_with_conflict(&[("columns", &["ghost"]), ("action", &["ignore"])]).unwrap_err();
    assert!(err.to_string().contains("unknown column 'ghost'"));
}

#[test]
fn test_index_target() {
    let plan = insert_with_conflict(&[
        ("index", &["orders_email_key"]),
        ("action", &["ignore"]),
    ])
    .unwrap();
    let conflict = plan.conflict.unwrap();
    assert!(conflict.ignore);
    assert_eq!(conflict.target_columns, vec!["email".to_string()]);
}

#[test]
fn test_unknown_index_target() {
    let err =
        insert_with_conflict(&[("index", &["no_such_index"]), ("action", &["ignore"])])
            .unwrap_err();
    assert!(err.to_string().contains("unknown index"));
}

#[test]
fn test_non_unique_index_target() {
    let err = insert_with_conflict(&[
        ("index", &["orders_status_idx"]),
        ("action", &["ignore"]),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("is not unique"));
}

#[test]
fn test_constraint_target() {
    let plan = insert_with_conflict(&[
        ("constraint", &["orders_email_key"]),
        ("action", &["update", "status"]),
    ])
    .unwrap();
    let conflict = plan.conflict.unwrap();
    assert_eq!(conflict.target_constraint.as_deref(), Some("orders_email_key"));
    assert_eq!(conflict.target_columns, vec!["email".to_string()]);
}

#[test]
fn test_unknown_constraint_target() {
    let err = insert_with_conflict(&[("constraint", &["ghost"]), ("action", &["ignore"])])
        .unwrap_err();
    assert!(err.to_string().contains("unknown constraint"));
}

#[test]
fn test_update_all_expands_writable_columns() {
    let plan = insert_with_conflict(&[("columns", &["email"]), ("action", &["update", "*"])])
        .unwrap();
    let conflict = plan.conflict.unwrap();
    // Разворачивается в записываемые колонки, кроме колонок цели
    assert!(conflict.update_columns.contains(&"status".to_string()));
    assert!(conflict.update_columns.contains(&"client_id".to_string()));
    assert!(!conflict.update_columns.contains(&"email".to_string()));
    assert!(!conflict.update_columns.contains(&"created_at".to_string()));
}

#[test]
fn test_update_without_column_list_means_all() {
    let plan = insert_with_conflict(&[("columns", &["email"]), ("action", &["update"])])
        .unwrap();
    let conflict = plan.conflict.unwrap();
    assert!(conflict.update_columns.contains(&"status".to_string()));
    assert!(!conflict.update_columns.contains(&"email".to_string()));
}

#[test]
fn test_update_readonly_column_rejected() {
    // Поле created_at помечено только для чтения
    let err = insert_with_conflict(&[
        ("columns", &["email"]),
        ("action", &["update", "created_at"]),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("no writable record field"));
}

#[test]
fn test_programmatic_update_without_target_rejected() {
    // Инвариант IR перепроверяется валидатором для IR, собранных
    // программно, минуя структурный анализатор
    let descriptor = target(
        "InsertOrder",
        vec![field("Meta", order_record(), &[("rel", &["orders"])])],
    );
    let catalog = sample_catalog();
    let mut ir = Analyzer::default().analyze(&descriptor).unwrap();
    ir.on_conflict = Some(OnConflictClause {
        target: None,
        action: ConflictAction::Update(IdentifierList::Names(vec!["status".to_string()])),
    });

    let err = SemanticValidator::new(&catalog).validate(&ir).unwrap_err();
    assert!(err
        .to_string()
        .contains("update conflict action requires a conflict target"));
}
