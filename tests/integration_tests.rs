//! Интеграционные тесты полного конвейера анализа

use sqlplan::analyzer::Analyzer;
use sqlplan::common::test_utils::{
    field, order_record, sample_catalog, target, ty_record, ty_string,
};
use sqlplan::descriptor::QueryKind;
use sqlplan::grammar::Predicate;
use sqlplan::ir::{NullsPosition, SortDirection};
use sqlplan::validator::{PlannedOperand, PlannedWhereItem};
use sqlplan::analyze_target;
use std::sync::Arc;

/// Сквозной сценарий: выборка с условием и сортировкой
///
/// Цель вида Select с отношением orders:o, условием status = 'paid'
/// и сортировкой -o.created_at:nullslast дает план с одним условием
/// равенства по status и сортировкой по created_at по убыванию
/// с NULL в конце.
#[test]
fn test_select_scenario_end_to_end() {
    let where_record = ty_record(
        "Cond",
        vec![field("Status", ty_string(), &[("sql", &["status = 'paid'"])])],
    );
    let descriptor = target(
        "SelectPaidOrders",
        vec![
            field("Meta", order_record(), &[("rel", &["orders:o"])]),
            field("Where", where_record, &[]),
            field(
                "Ordering",
                ty_record("Ord", Vec::new()),
                &[("dir", &["orderby"]), ("sql", &["-o.created_at:nullslast"])],
            ),
        ],
    );

    let analyzer = Analyzer::default();
    let catalog = sample_catalog();
    let plan = analyze_target(&analyzer, &catalog, &descriptor).unwrap();

    assert_eq!(plan.kind, QueryKind::Select);
    assert_eq!(plan.relation.to_string(), "orders:o");

    assert_eq!(plan.conditionals.len(), 1);
    let PlannedWhereItem::Condition(condition) = &plan.conditionals[0] else {
        panic!("expected a single planned condition");
    };
    assert_eq!(condition.column.name, "status");
    assert_eq!(condition.predicate, Predicate::Eq);
    assert_eq!(
        condition.operand,
        Some(PlannedOperand::Literal("'paid'".to_string()))
    );

    assert_eq!(plan.order_by.len(), 1);
    let order = &plan.order_by[0];
    assert_eq!(order.column.name, "created_at");
    assert_eq!(order.direction, SortDirection::Desc);
    assert_eq!(order.nulls, Some(NullsPosition::Last));
}

/// Несколько целей против одного каталога, параллельно
#[test]
fn test_parallel_targets_share_caches() {
    let analyzer = Arc::new(Analyzer::default());
    let catalog = Arc::new(sample_catalog());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let analyzer = Arc::clone(&analyzer);
            let catalog = Arc::clone(&catalog);
            std::thread::spawn(move || {
                let descriptor = target(
                    &format!("SelectOrders{}", i),
                    vec![field("Meta", order_record(), &[("rel", &["orders:o"])])],
                );
                analyze_target(&analyzer, catalog.as_ref(), &descriptor).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let plan = handle.join().unwrap();
        assert_eq!(plan.reads.len(), 6);
    }

    // Все анализы разделяют один разобранный тип записи
    assert_eq!(analyzer.type_cache().len(), 1);
}

/// Цель либо дает полный план, либо не дает плана вовсе
#[test]
fn test_fail_fast_no_partial_plan() {
    let where_record = ty_record(
        "Cond",
        vec![field("Ghost", ty_string(), &[("sql", &["ghost = 'x'"])])],
    );
    let descriptor = target(
        "SelectOrders",
        vec![
            field("Meta", order_record(), &[("rel", &["orders"])]),
            field("Where", where_record, &[]),
        ],
    );

    let analyzer = Analyzer::default();
    let catalog = sample_catalog();
    let err = analyze_target(&analyzer, &catalog, &descriptor).unwrap_err();
    assert!(err.to_string().contains("unknown column 'ghost'"));
}

/// План сериализуется в JSON для внешних потребителей
#[test]
fn test_plan_serializes_to_json() {
    let descriptor = target(
        "SelectOrders",
        vec![field("Meta", order_record(), &[("rel", &["orders:o"])])],
    );
    let analyzer = Analyzer::default();
    let catalog = sample_catalog();
    let plan = analyze_target(&analyzer, &catalog, &descriptor).unwrap();

    let json = serde_json::to_string(&plan).unwrap();
    assert!(json.contains("\"orders\""));
    assert!(json.contains("\"created_at\""));
}
