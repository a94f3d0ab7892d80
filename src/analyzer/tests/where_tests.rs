//! Тесты построения условий отбора

use crate::analyzer::Analyzer;
use crate::common::test_utils::{field, order_record, target, ty_record, ty_seq, ty_string, ty_i64};
use crate::common::Error;
use crate::grammar::{Predicate, Quantifier};
use crate::ir::{BooleanLinker, ConditionOperand, WhereItem};

fn analyze_where(where_fields: Vec<crate::descriptor::FieldDescriptor>) -> crate::ir::QueryIr {
    let descriptor = target(
        "SelectOrders",
        vec![
            field("Meta", order_record(), &[("rel", &["orders:o"])]),
            field("Where", ty_record("Cond", where_fields), &[]),
        ],
    );
    Analyzer::default().analyze(&descriptor).unwrap()
}

fn analyze_where_err(where_fields: Vec<crate::descriptor::FieldDescriptor>) -> Error {
    let descriptor = target(
        "SelectOrders",
        vec![
            field("Meta", order_record(), &[("rel", &["orders:o"])]),
            field("Where", ty_record("Cond", where_fields), &[]),
        ],
    );
    Analyzer::default().analyze(&descriptor).unwrap_err()
}

#[test]
fn test_field_condition_with_default_equality() {
    let ir = analyze_where(vec![field("Status", ty_string(), &[("sql", &["status"])])]);
    let clause = ir.where_clause.unwrap();
    assert_eq!(clause.items.len(), 1);

    let WhereItem::Field(condition) = &clause.items[0] else {
        panic!("expected field condition");
    };
    assert_eq!(condition.column.to_string(), "status");
    assert_eq!(condition.predicate, Predicate::Eq);
    assert_eq!(condition.field_name, "Status");
}

#[test]
fn test_empty_lhs_uses_field_name() {
    let ir = analyze_where(vec![field("Status", ty_string(), &[("sql", &["> "])])]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Field(condition) = &clause.items[0] else {
        panic!("expected field condition");
    };
    // Пустой левый операнд означает колонку с именем поля
    assert_eq!(condition.column.to_string(), "status");
    assert_eq!(condition.predicate, Predicate::Gt);
}

#[test]
fn test_linker_interleaving() {
    let ir = analyze_where(vec![
        field("Status", ty_string(), &[("sql", &["status"])]),
        field("Total", ty_i64(), &[("sql", &["total > 0"]), ("link", &["or"])]),
        field("Active", ty_string(), &[("sql", &["active is true"])]),
    ]);
    let clause = ir.where_clause.unwrap();
    // Связки вставляются между условиями
    assert_eq!(clause.items.len(), 5);
    assert!(matches!(
        clause.items[1],
        WhereItem::Linker(BooleanLinker::Or)
    ));
    assert!(matches!(
        clause.items[3],
        WhereItem::Linker(BooleanLinker::And)
    ));
}

#[test]
fn test_column_condition_with_literal() {
    let ir = analyze_where(vec![field(
        "Paid",
        ty_string(),
        &[("sql", &["status = 'paid'"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Column(condition) = &clause.items[0] else {
        panic!("expected column condition");
    };
    assert_eq!(
        condition.right,
        Some(ConditionOperand::Literal("'paid'".to_string()))
    );
}

#[test]
fn test_column_condition_with_column_operand() {
    let ir = analyze_where(vec![field(
        "SameClient",
        ty_string(),
        &[("sql", &["client_id = o.id"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Column(condition) = &clause.items[0] else {
        panic!("expected column condition");
    };
    let Some(ConditionOperand::Column(right)) = &condition.right else {
        panic!("expected column operand");
    };
    assert_eq!(right.to_string(), "o.id");
}

#[test]
fn test_unary_predicate_condition() {
    let ir = analyze_where(vec![field(
        "Removed",
        ty_string(),
        &[("sql", &["status isnull"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Column(condition) = &clause.items[0] else {
        panic!("expected column condition");
    };
    assert_eq!(condition.predicate, Predicate::IsNull);
    assert!(condition.right.is_none());
}

#[test]
fn test_quantified_field_condition() {
    let ir = analyze_where(vec![field(
        "Ids",
        ty_seq(ty_i64()),
        &[("sql", &["id = any"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Field(condition) = &clause.items[0] else {
        panic!("expected field condition");
    };
    assert_eq!(condition.quantifier, Some(Quantifier::Any));
}

#[test]
fn test_nested_group() {
    let group = ty_record(
        "Group",
        vec![
            field("A", ty_string(), &[("sql", &["status"])]),
            field("B", ty_i64(), &[("sql", &["total > 0"]), ("link", &["or"])]),
        ],
    );
    let ir = analyze_where(vec![
        field("Id", ty_i64(), &[("sql", &["id"])]),
        field("Extra", group, &[("sql", &["nested", "group"])]),
    ]);
    let clause = ir.where_clause.unwrap();
    assert_eq!(clause.items.len(), 3);
    let WhereItem::Group(inner) = &clause.items[2] else {
        panic!("expected nested group");
    };
    assert_eq!(inner.items.len(), 3);
}

#[test]
fn test_empty_group_rejected() {
    let group = ty_record("Group", Vec::new());
    let err = analyze_where_err(vec![
        field("Id", ty_i64(), &[("sql", &["id"])]),
        field("Extra", group, &[("sql", &["nested", "group"])]),
    ]);
    assert!(err.to_string().contains("empty condition group"));
}

#[test]
fn test_between_with_two_bounds() {
    let bounds = ty_record(
        "Bounds",
        vec![
            field("From", ty_i64(), &[("bound", &["lower"])]),
            field("To", ty_i64(), &[("bound", &["upper"])]),
        ],
    );
    let ir = analyze_where(vec![field(
        "Created",
        bounds,
        &[("sql", &["total between"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Between(between) = &clause.items[0] else {
        panic!("expected between condition");
    };
    assert_eq!(between.lower.field_name, "From");
    assert_eq!(between.upper.field_name, "To");
    assert!(!between.symmetric);
    assert!(!between.negated);
}

#[test]
fn test_between_bounds_in_reverse_order() {
    // Порядок полей-границ не важен, важны теги
    let bounds = ty_record(
        "Bounds",
        vec![
            field("To", ty_i64(), &[("bound", &["y"])]),
            field("From", ty_i64(), &[("bound", &["x"])]),
        ],
    );
    let ir = analyze_where(vec![field(
        "Created",
        bounds,
        &[("sql", &["total betweensym"])],
    )]);
    let clause = ir.where_clause.unwrap();
    let WhereItem::Between(between) = &clause.items[0] else {
        panic!("expected between condition");
    };
    assert_eq!(between.lower.field_name, "From");
    assert_eq!(between.upper.field_name, "To");
    assert!(between.symmetric);
}

#[test]
fn test_between_with_wrong_field_count() {
    let one = ty_record(
        "Bounds",
        vec![field("From", ty_i64(), &[("bound", &["lower"])])],
    );
    let err = analyze_where_err(vec![field("Created", one, &[("sql", &["total between"])])]);
    assert!(err.to_string().contains("exactly two bound fields"));

    let three = ty_record(
        "Bounds",
        vec![
            field("A", ty_i64(), &[("bound", &["lower"])]),
            field("B", ty_i64(), &[("bound", &["upper"])]),
            field("C", ty_i64(), &[("bound", &["upper"])]),
        ],
    );
    let err = analyze_where_err(vec![field(
        "Created",
        three,
        &[("sql", &["total between"])],
    )]);
    assert!(err.to_string().contains("exactly two bound fields"));
}

#[test]
fn test_between_with_duplicate_tags() {
    let bounds = ty_record(
        "Bounds",
        vec![
            field("A", ty_i64(), &[("bound", &["lower"])]),
            field("B", ty_i64(), &[("bound", &["lower"])]),
        ],
    );
    let err = analyze_where_err(vec![field(
        "Created",
        bounds,
        &[("sql", &["total between"])],
    )]);
    assert!(err.to_string().contains("duplicate bound tag"));
}

#[test]
fn test_between_with_missing_tag() {
    let bounds = ty_record(
        "Bounds",
        vec![
            field("A", ty_i64(), &[("bound", &["lower"])]),
            field("B", ty_i64(), &[]),
        ],
    );
    let err = analyze_where_err(vec![field(
        "Created",
        bounds,
        &[("sql", &["total between"])],
    )]);
    assert!(err.to_string().contains("no bound tag"));
}

#[test]
fn test_unknown_qualifier_in_condition() {
    let err = analyze_where_err(vec![field(
        "Status",
        ty_string(),
        &[("sql", &["x.status"])],
    )]);
    assert!(matches!(err, Error::Catalog(_)));
    assert!(err.to_string().contains("unknown qualifier"));
}

#[test]
fn test_bad_linker_value() {
    let err = analyze_where_err(vec![
        field("A", ty_string(), &[("sql", &["status"])]),
        field("B", ty_i64(), &[("sql", &["total"]), ("link", &["xor"])]),
    ]);
    assert!(err.to_string().contains("bad boolean linker"));
}
