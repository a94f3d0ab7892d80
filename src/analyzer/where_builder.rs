//! Построение дерева условий отбора
//!
//! Поля условия обходятся тем же способом, что и поля записи:
//! в глубину на явном стеке. Вложенные группы открывают новую рамку;
//! каждый элемент после первого в рамке потребляет необязательную
//! аннотацию логической связки (по умолчанию `and`).

use crate::analyzer::AnalysisContext;
use crate::common::{Error, Result};
use crate::descriptor::FieldDescriptor;
use crate::grammar::{
    is_identifier, is_reserved_word, parse_column_identifier, parse_predicate, ColumnIdentifier,
    Predicate,
};
use crate::analyzer::RelationSpace;
use crate::ir::{
    BetweenCondition, BooleanLinker, BoundField, ColumnCondition, ConditionOperand,
    FieldCondition, WhereClause, WhereItem,
};

/// Рамка построения одной группы условий
struct WhereFrame<'a> {
    fields: &'a [FieldDescriptor],
    index: usize,
    clause: WhereClause,
}

/// Строит дерево условий из поля `where`
pub fn build_where_clause(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
    space: &RelationSpace,
    max_depth: usize,
) -> Result<WhereClause> {
    let base = field.type_info.unwrap_optional();
    let Some((_, root_fields)) = base.as_record() else {
        return Err(ctx.enrich(
            Error::structure("where field must be a record").with_field(&field.name),
        ));
    };

    let mut stack = vec![WhereFrame {
        fields: root_fields,
        index: 0,
        clause: WhereClause::default(),
    }];

    loop {
        let frame_done = {
            let frame = stack.last().expect("where stack is never empty here");
            frame.index >= frame.fields.len()
        };
        if frame_done {
            let done = stack.pop().expect("where stack checked non-empty");
            if done.clause.is_empty() {
                return Err(ctx.enrich(
                    Error::structure("empty condition group").with_field(&field.name),
                ));
            }
            match stack.last_mut() {
                Some(parent) => {
                    parent.clause.items.push(WhereItem::Group(done.clause));
                    continue;
                }
                None => return Ok(done.clause),
            }
        }

        let (fields, index) = {
            let frame = stack.last_mut().expect("where stack is never empty here");
            let index = frame.index;
            frame.index += 1;
            (frame.fields, index)
        };

        let item_field = &fields[index];
        if !item_field.exported {
            continue;
        }
        let Some(head) = item_field.annotation_head("sql") else {
            continue;
        };

        let is_group = item_field
            .annotation("sql")
            .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case("group")))
            .unwrap_or(false);

        // Связка потребляется каждым элементом после первого в рамке
        let linker = parse_linker(item_field, ctx)?;
        let frame_has_items = !stack
            .last()
            .expect("where stack is never empty here")
            .clause
            .is_empty();

        if is_group {
            let inner = item_field.type_info.unwrap_optional();
            let Some((_, inner_fields)) = inner.as_record() else {
                return Err(ctx.enrich(
                    Error::structure("condition group field must be a record")
                        .with_field(&item_field.name),
                ));
            };
            if stack.len() >= max_depth {
                return Err(ctx.enrich(
                    Error::structure(format!(
                        "nested condition groups exceed maximum depth {}",
                        max_depth
                    ))
                    .with_field(&item_field.name),
                ));
            }
            if frame_has_items {
                let parent = stack.last_mut().expect("where stack is never empty here");
                parent.clause.items.push(WhereItem::Linker(linker));
            }
            stack.push(WhereFrame {
                fields: inner_fields,
                index: 0,
                clause: WhereClause::default(),
            });
            continue;
        }

        let item = build_condition_item(item_field, head, ctx, space)?;
        let frame = stack.last_mut().expect("where stack is never empty here");
        if frame_has_items {
            frame.clause.items.push(WhereItem::Linker(linker));
        }
        frame.clause.items.push(item);
    }
}

/// Строит один элемент условия из выражения предиката поля
fn build_condition_item(
    field: &FieldDescriptor,
    expression: &str,
    ctx: &AnalysisContext,
    space: &RelationSpace,
) -> Result<WhereItem> {
    let parsed = parse_predicate(expression).map_err(|e| {
        ctx.enrich(
            e.with_field(&field.name)
                .with_annotation(&field.sql_annotation_text()),
        )
    })?;

    // Пустой левый операнд означает колонку с именем поля
    let lhs = if parsed.lhs.is_empty() {
        field.name.to_ascii_lowercase()
    } else {
        parsed.lhs.clone()
    };
    let column = parse_column_identifier(&lhs, space)
        .map_err(|e| ctx.enrich(e.with_field(&field.name).with_annotation(expression)))?;

    let predicate = parsed.predicate.unwrap_or(Predicate::Eq);

    if predicate.is_between() {
        if !parsed.rhs.is_empty() {
            return Err(ctx.enrich(
                Error::grammar("between predicate takes its bounds from the field descriptor")
                    .with_field(&field.name)
                    .with_annotation(expression),
            ));
        }
        let between = build_between(field, column, predicate, ctx)?;
        return Ok(WhereItem::Between(between));
    }

    if parsed.rhs.is_empty() {
        if predicate.is_unary() {
            return Ok(WhereItem::Column(ColumnCondition {
                left: column,
                predicate,
                quantifier: None,
                right: None,
            }));
        }
        return Ok(WhereItem::Field(FieldCondition {
            column,
            predicate,
            quantifier: parsed.quantifier,
            field_name: field.name.clone(),
            type_info: field.type_info.clone(),
            position: field.position.clone(),
        }));
    }

    let right = parse_operand(&parsed.rhs, field, ctx, space)?;
    Ok(WhereItem::Column(ColumnCondition {
        left: column,
        predicate,
        quantifier: parsed.quantifier,
        right: Some(right),
    }))
}

/// Строит интервальное условие из дескриптора с двумя полями-границами
fn build_between(
    field: &FieldDescriptor,
    column: ColumnIdentifier,
    predicate: Predicate,
    ctx: &AnalysisContext,
) -> Result<BetweenCondition> {
    let base = field.type_info.unwrap_optional();
    let Some((_, bound_fields)) = base.as_record() else {
        return Err(ctx.enrich(
            Error::structure("between field must be a record with two bound fields")
                .with_field(&field.name),
        ));
    };

    if bound_fields.len() != 2 {
        return Err(ctx.enrich(
            Error::structure(format!(
                "malformed between descriptor: expected exactly two bound fields, found {}",
                bound_fields.len()
            ))
            .with_field(&field.name),
        ));
    }

    let mut lower = None;
    let mut upper = None;
    for bound in bound_fields {
        let tag = bound.annotation_head("bound").ok_or_else(|| {
            ctx.enrich(
                Error::structure(format!(
                    "malformed between descriptor: field '{}' has no bound tag",
                    bound.name
                ))
                .with_field(&field.name),
            )
        })?;
        let slot = match tag.to_ascii_lowercase().as_str() {
            "lower" | "x" => &mut lower,
            "upper" | "y" => &mut upper,
            other => {
                return Err(ctx.enrich(
                    Error::structure(format!(
                        "malformed between descriptor: unknown bound tag '{}'",
                        other
                    ))
                    .with_field(&field.name),
                ));
            }
        };
        if slot.is_some() {
            return Err(ctx.enrich(
                Error::structure(format!(
                    "malformed between descriptor: duplicate bound tag '{}'",
                    tag
                ))
                .with_field(&field.name),
            ));
        }
        *slot = Some(BoundField {
            field_name: bound.name.clone(),
            type_info: bound.type_info.clone(),
        });
    }

    let lower = lower.ok_or_else(|| {
        ctx.enrich(
            Error::structure("malformed between descriptor: missing 'lower' bound")
                .with_field(&field.name),
        )
    })?;
    let upper = upper.ok_or_else(|| {
        ctx.enrich(
            Error::structure("malformed between descriptor: missing 'upper' bound")
                .with_field(&field.name),
        )
    })?;

    Ok(BetweenCondition {
        column,
        symmetric: predicate.is_symmetric_between(),
        negated: matches!(predicate, Predicate::NotBetween | Predicate::NotBetweenSym),
        lower,
        upper,
        position: field.position.clone(),
    })
}

/// Разбирает правый операнд: колонка, если текст имеет форму
/// идентификатора колонки, иначе литеральное выражение
pub(crate) fn parse_operand(
    text: &str,
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
    space: &RelationSpace,
) -> Result<ConditionOperand> {
    if looks_like_column(text) {
        let column = parse_column_identifier(text, space)
            .map_err(|e| ctx.enrich(e.with_field(&field.name)))?;
        return Ok(ConditionOperand::Column(column));
    }
    Ok(ConditionOperand::Literal(text.to_string()))
}

/// Имеет ли текст форму `[qualifier.]name` с незарезервированным именем
fn looks_like_column(text: &str) -> bool {
    let (qualifier, name) = match text.rfind('.') {
        Some(pos) => (Some(&text[..pos]), &text[pos + 1..]),
        None => (None, text),
    };
    if !is_identifier(name) || is_reserved_word(name) {
        return false;
    }
    match qualifier {
        Some(q) => is_identifier(q),
        None => true,
    }
}

/// Читает аннотацию логической связки поля
pub(crate) fn parse_linker(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
) -> Result<BooleanLinker> {
    match field.annotation_head("link") {
        None => Ok(BooleanLinker::And),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "and" => Ok(BooleanLinker::And),
            "or" => Ok(BooleanLinker::Or),
            other => Err(ctx.enrich(
                Error::grammar(format!("bad boolean linker '{}'", other))
                    .with_field(&field.name),
            )),
        },
    }
}
