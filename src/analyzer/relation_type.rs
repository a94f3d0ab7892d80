//! Разбор типа поля отношения
//!
//! Классифицирует тип поля как итератор, последовательность или
//! обычную запись и разворачивает поля записи в плоский список
//! обходом в глубину на явном стеке.

use crate::analyzer::type_cache::RelationTypeCache;
use crate::analyzer::AnalysisContext;
use crate::common::{Error, Result};
use crate::descriptor::{FieldDescriptor, TypeInfo, TypeKind};
use crate::grammar::{is_identifier, is_reserved_word, ColumnIdentifier};
use crate::ir::{IrField, RelationType, SelectorStep};
use std::sync::Arc;

/// Рамка обхода вложенных дескрипторов
struct WalkFrame<'a> {
    fields: &'a [FieldDescriptor],
    index: usize,
    prefix: String,
    selector: Vec<SelectorStep>,
}

/// Разбирает тип поля отношения
///
/// Ровно одна из форм допустима: итератор (функция обратного вызова,
/// принимающая одну запись и возвращающая ошибкоподобный результат),
/// последовательность записей или обычная (возможно опциональная)
/// запись. Любая другая форма является ошибкой типа.
pub fn analyze_relation_type(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
    cache: &RelationTypeCache,
    max_depth: usize,
) -> Result<RelationType> {
    let type_info = &field.type_info;

    if let Some(arg) = type_info.iterator_signature() {
        let base = arg.unwrap_optional();
        let (base_name, _) = base.as_record().ok_or_else(|| {
            ctx.enrich(
                Error::type_check("iterator argument must be a record").with_field(&field.name),
            )
        })?;
        let fields = flattened_fields(base, ctx, cache, max_depth)?;
        return Ok(RelationType {
            base_name: base_name.to_string(),
            sequence: false,
            fixed_len: None,
            optional: false,
            iterator: true,
            fields,
        });
    }

    if let TypeKind::Sequence { elem, fixed_len } = &type_info.kind {
        let base = elem.unwrap_optional();
        let (base_name, _) = base.as_record().ok_or_else(|| {
            ctx.enrich(
                Error::type_check("sequence element must be a record").with_field(&field.name),
            )
        })?;
        let fields = flattened_fields(base, ctx, cache, max_depth)?;
        return Ok(RelationType {
            base_name: base_name.to_string(),
            sequence: true,
            fixed_len: *fixed_len,
            optional: false,
            iterator: false,
            fields,
        });
    }

    let base = type_info.unwrap_optional();
    if let Some((base_name, _)) = base.as_record() {
        let fields = flattened_fields(base, ctx, cache, max_depth)?;
        return Ok(RelationType {
            base_name: base_name.to_string(),
            sequence: false,
            fixed_len: None,
            optional: type_info.is_optional(),
            iterator: false,
            fields,
        });
    }

    Err(ctx.enrich(
        Error::type_check("relation field must be a record, a sequence of records, or an iterator")
            .with_field(&field.name),
    ))
}

/// Возвращает развернутый список полей записи, используя кэш
///
/// Чтение идет по разделяемой блокировке кэша; при промахе список
/// строится и сохраняется под эксклюзивной блокировкой.
pub fn flattened_fields(
    base: &TypeInfo,
    ctx: &AnalysisContext,
    cache: &RelationTypeCache,
    max_depth: usize,
) -> Result<Arc<Vec<IrField>>> {
    let key = base.structural_key();
    if let Some(fields) = cache.get(&key) {
        return Ok(fields);
    }

    let fields = Arc::new(walk_record_fields(base, ctx, max_depth)?);
    cache.insert(key, Arc::clone(&fields));
    Ok(fields)
}

/// Обходит поля записи в глубину на явном стеке
///
/// Поля с флагом `descend` открывают новую рамку с накопленным
/// префиксом имени колонки и цепочкой селекторов вместо того, чтобы
/// считаться листьями.
fn walk_record_fields(
    base: &TypeInfo,
    ctx: &AnalysisContext,
    max_depth: usize,
) -> Result<Vec<IrField>> {
    let (_, root_fields) = base
        .as_record()
        .ok_or_else(|| ctx.enrich(Error::internal("record walk on non-record type")))?;

    let mut out = Vec::new();
    let mut stack = vec![WalkFrame {
        fields: root_fields,
        index: 0,
        prefix: String::new(),
        selector: Vec::new(),
    }];

    while !stack.is_empty() {
        let frame_done = {
            let frame = stack.last().expect("stack checked non-empty");
            frame.index >= frame.fields.len()
        };
        if frame_done {
            stack.pop();
            continue;
        }

        let (fields, index, prefix, selector) = {
            let frame = stack.last_mut().expect("stack checked non-empty");
            let index = frame.index;
            frame.index += 1;
            (
                frame.fields,
                index,
                frame.prefix.clone(),
                frame.selector.clone(),
            )
        };

        let field = &fields[index];
        if !field.exported {
            continue;
        }
        let Some(head) = field.annotation_head("sql") else {
            continue;
        };

        if field.has_sql_flag("descend") {
            let inner = field.type_info.unwrap_optional();
            let Some((type_name, inner_fields)) = inner.as_record() else {
                return Err(ctx.enrich(
                    Error::type_check("descend field must be a record")
                        .with_field(&field.name)
                        .with_annotation(&field.sql_annotation_text()),
                ));
            };
            if stack.len() >= max_depth {
                return Err(ctx.enrich(
                    Error::structure(format!(
                        "nested descriptors exceed maximum depth {}",
                        max_depth
                    ))
                    .with_field(&field.name),
                ));
            }
            let mut selector = selector;
            selector.push(SelectorStep {
                field: field.name.clone(),
                type_name: type_name.to_string(),
                optional: field.type_info.is_optional(),
            });
            stack.push(WalkFrame {
                fields: inner_fields,
                index: 0,
                prefix: format!("{}{}", prefix, head),
                selector,
            });
            continue;
        }

        let column_name = format!("{}{}", prefix, head);
        let column = leaf_column(&column_name, field, ctx)?;

        out.push(IrField {
            column,
            field_name: field.name.clone(),
            type_info: field.type_info.clone(),
            readable: !field.has_sql_flag("wo"),
            writable: !field.has_sql_flag("ro"),
            filterable: !field.has_sql_flag("nofilter"),
            selector,
            coalesce_null: field.has_sql_flag("coalesce"),
            use_default: field.has_sql_flag("default"),
            force_write: field.has_sql_flag("force"),
            position: field.position.clone(),
        });
    }

    Ok(out)
}

/// Проверяет имя колонки листового поля
///
/// Колонки полей записи принадлежат целевому отношению, поэтому
/// квалификаторы здесь недопустимы; это сохраняет корректность
/// мемоизации между целями с разными псевдонимами.
fn leaf_column(
    name: &str,
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
) -> Result<ColumnIdentifier> {
    if name.contains('.') {
        return Err(ctx.enrich(
            Error::grammar(format!(
                "bad column identifier: qualified name '{}' is not allowed in record fields",
                name
            ))
            .with_field(&field.name)
            .with_annotation(&field.sql_annotation_text()),
        ));
    }
    if !is_identifier(name) {
        return Err(ctx.enrich(
            Error::grammar(format!("bad column identifier: invalid name '{}'", name))
                .with_field(&field.name)
                .with_annotation(&field.sql_annotation_text()),
        ));
    }
    if is_reserved_word(name) {
        return Err(ctx.enrich(
            Error::grammar(format!("bad column identifier: reserved word '{}'", name))
                .with_field(&field.name)
                .with_annotation(&field.sql_annotation_text()),
        ));
    }
    Ok(ColumnIdentifier {
        qualifier: None,
        name: name.to_string(),
    })
}
