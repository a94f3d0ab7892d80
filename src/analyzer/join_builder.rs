//! Построение секции соединений
//!
//! Поле соединений является записью; каждое ее поле описывает одну
//! директиву: присоединяемое отношение, вид соединения и список
//! колоночных условий, связанных логическими связками.

use crate::analyzer::where_builder::{parse_linker, parse_operand};
use crate::analyzer::{AnalysisContext, RelationSpace};
use crate::common::{Error, Result};
use crate::descriptor::FieldDescriptor;
use crate::grammar::{
    parse_column_identifier, parse_predicate, parse_relation_identifier, Predicate,
};
use crate::ir::{ColumnCondition, JoinClause, JoinDirective, JoinItem, JoinKind};

/// Строит секцию соединений из поля `join`/`from`/`using`
pub fn build_join_clause(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
    space: &mut RelationSpace,
) -> Result<JoinClause> {
    let base = field.type_info.unwrap_optional();
    let Some((_, directive_fields)) = base.as_record() else {
        return Err(ctx.enrich(
            Error::structure("join field must be a record").with_field(&field.name),
        ));
    };

    let mut clause = JoinClause::default();

    for directive_field in directive_fields {
        if !directive_field.exported {
            continue;
        }
        let Some(head) = directive_field.annotation_head("sql") else {
            continue;
        };

        let relation = parse_relation_identifier(head).map_err(|e| {
            ctx.enrich(
                e.with_field(&directive_field.name)
                    .with_annotation(&directive_field.sql_annotation_text()),
            )
        })?;
        space
            .register(&relation)
            .map_err(|e| ctx.enrich(e.with_field(&directive_field.name)))?;

        let kind_word = directive_field.annotation_head("kind");
        if kind_word.is_some_and(|w| w.eq_ignore_ascii_case("from")) {
            if clause.base.is_some() {
                return Err(ctx.enrich(
                    Error::structure("duplicate base relation directive")
                        .with_field(&directive_field.name),
                ));
            }
            if has_condition_fields(directive_field) {
                return Err(ctx.enrich(
                    Error::structure("base relation directive takes no conditions")
                        .with_field(&directive_field.name),
                ));
            }
            clause.base = Some(relation);
            continue;
        }

        let kind = match kind_word {
            None => JoinKind::Inner,
            Some(word) => JoinKind::from_keyword(word).ok_or_else(|| {
                ctx.enrich(
                    Error::grammar(format!("bad join kind '{}'", word))
                        .with_field(&directive_field.name),
                )
            })?,
        };

        let conditions = build_conditions(directive_field, &relation, ctx, space)?;

        if kind == JoinKind::Cross && !conditions.is_empty() {
            return Err(ctx.enrich(
                Error::structure("cross join takes no conditions")
                    .with_field(&directive_field.name),
            ));
        }

        clause.directives.push(JoinDirective {
            kind,
            relation,
            conditions,
        });
    }

    if clause.base.is_none() && clause.directives.is_empty() {
        return Err(ctx.enrich(
            Error::structure("join field declares no directives").with_field(&field.name),
        ));
    }

    Ok(clause)
}

/// Есть ли у директивы поля-условия
fn has_condition_fields(directive_field: &FieldDescriptor) -> bool {
    directive_field
        .type_info
        .unwrap_optional()
        .as_record()
        .map(|(_, fields)| {
            fields
                .iter()
                .any(|f| f.exported && f.annotation_head("sql").is_some())
        })
        .unwrap_or(false)
}

/// Строит условия одной директивы соединения
///
/// Левый операнд каждого условия обязан ссылаться на отношение,
/// присоединяемое этой директивой; расхождение отклоняется до любого
/// обращения к каталогу.
fn build_conditions(
    directive_field: &FieldDescriptor,
    relation: &crate::grammar::RelationIdentifier,
    ctx: &AnalysisContext,
    space: &RelationSpace,
) -> Result<Vec<JoinItem>> {
    let inner = directive_field.type_info.unwrap_optional();
    let Some((_, condition_fields)) = inner.as_record() else {
        return Err(ctx.enrich(
            Error::structure("join directive must be a record")
                .with_field(&directive_field.name),
        ));
    };

    let mut items: Vec<JoinItem> = Vec::new();

    for condition_field in condition_fields {
        if !condition_field.exported {
            continue;
        }
        let Some(expression) = condition_field.annotation_head("sql") else {
            continue;
        };

        let parsed = parse_predicate(expression).map_err(|e| {
            ctx.enrich(
                e.with_field(&condition_field.name)
                    .with_annotation(expression),
            )
        })?;

        let lhs = if parsed.lhs.is_empty() {
            condition_field.name.to_ascii_lowercase()
        } else {
            parsed.lhs.clone()
        };
        let left = parse_column_identifier(&lhs, space)
            .map_err(|e| ctx.enrich(e.with_field(&condition_field.name)))?;

        if let Some(qualifier) = &left.qualifier {
            if qualifier != relation.space_key() && *qualifier != relation.name {
                return Err(ctx.enrich(
                    Error::structure(format!(
                        "join condition references relation '{}' but directive joins '{}'",
                        qualifier, relation
                    ))
                    .with_field(&condition_field.name)
                    .with_annotation(expression),
                ));
            }
        }

        let predicate = parsed.predicate.unwrap_or(Predicate::Eq);

        let right = if parsed.rhs.is_empty() {
            if !predicate.is_unary() {
                return Err(ctx.enrich(
                    Error::structure("join condition requires a right-hand side")
                        .with_field(&condition_field.name)
                        .with_annotation(expression),
                ));
            }
            None
        } else {
            Some(parse_operand(&parsed.rhs, condition_field, ctx, space)?)
        };

        if !items.is_empty() {
            let linker = parse_linker(condition_field, ctx)?;
            items.push(JoinItem::Linker(linker));
        }
        items.push(JoinItem::Condition(ColumnCondition {
            left,
            predicate,
            quantifier: parsed.quantifier,
            right,
        }));
    }

    Ok(items)
}
