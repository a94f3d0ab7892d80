//! Структурный анализатор целей
//!
//! Преобразует дескриптор цели в сырое промежуточное представление
//! за два прохода: первый находит и разбирает единственное поле
//! отношения, второй раскладывает остальные поля по виду директивы.
//! Первый обнаруженный дефект прерывает анализ цели (ошибки не
//! накапливаются).

use crate::analyzer::join_builder::build_join_clause;
use crate::analyzer::relation_type::analyze_relation_type;
use crate::analyzer::type_cache::RelationTypeCache;
use crate::analyzer::where_builder::build_where_clause;
use crate::analyzer::{AnalysisContext, RelationSpace};
use crate::common::{AnalyzerConfig, Error, Result};
use crate::descriptor::{FieldDescriptor, QueryKind, TargetDescriptor, TypeKind};
use crate::grammar::{
    parse_column_identifier, parse_identifier_list, parse_relation_identifier, IdentifierList,
};
use crate::ir::{
    ConflictAction, ConflictTarget, DirectiveField, Directives, NullsPosition, OnConflictClause,
    OrderByItem, OverrideKind, QueryIr, RelationField, SortDirection,
};
use log::debug;

/// Вид директивы для проверки допустимости по виду запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Where,
    Join,
    OnConflict,
    Limit,
    Offset,
    OrderBy,
    Return,
    Default,
    Force,
    Optional,
    Override,
    All,
    Result,
    RowsAffected,
    ErrorHandler,
    Filter,
    Context,
}

impl DirectiveKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Join => "join",
            Self::OnConflict => "onconflict",
            Self::Limit => "limit",
            Self::Offset => "offset",
            Self::OrderBy => "orderby",
            Self::Return => "return",
            Self::Default => "default",
            Self::Force => "force",
            Self::Optional => "optional",
            Self::Override => "override",
            Self::All => "all",
            Self::Result => "result",
            Self::RowsAffected => "rowsaffected",
            Self::ErrorHandler => "errorhandler",
            Self::Filter => "filter",
            Self::Context => "context",
        }
    }

    /// Допустима ли директива для вида запроса
    fn allowed_for(&self, kind: QueryKind) -> bool {
        use QueryKind::*;
        match self {
            Self::Where | Self::All | Self::Filter => kind.supports_row_qualifiers(),
            Self::Join | Self::Limit | Self::Offset | Self::OrderBy => kind.is_select_family(),
            Self::OnConflict | Self::Override => matches!(kind, Insert),
            Self::Return => matches!(kind, Insert | Update | Delete),
            Self::Default | Self::Force => matches!(kind, Insert | Update),
            Self::Optional => matches!(kind, Select | Filter),
            Self::Result => matches!(kind, Select | Insert | Update | Delete),
            Self::RowsAffected => matches!(kind, Insert | Update | Delete),
            Self::ErrorHandler | Self::Context => true,
        }
    }
}

/// Структурный анализатор
pub struct StructuralAnalyzer<'a> {
    config: &'a AnalyzerConfig,
    type_cache: &'a RelationTypeCache,
}

impl<'a> StructuralAnalyzer<'a> {
    /// Создает анализатор с заданными настройками и кэшем типов
    pub fn new(config: &'a AnalyzerConfig, type_cache: &'a RelationTypeCache) -> Self {
        Self { config, type_cache }
    }

    /// Анализирует дескриптор цели и строит сырое IR
    pub fn analyze(&self, target: &TargetDescriptor) -> Result<QueryIr> {
        let kind = target.kind().ok_or_else(|| {
            Error::structure(format!(
                "target name '{}' must start with Insert, Update, Select, Delete or Filter",
                target.name
            ))
            .with_target(&target.name)
        })?;

        let mut ctx = AnalysisContext::new(&target.name, kind);
        let mut space = RelationSpace::new();

        // Первый проход: единственное обязательное поле отношения
        let (relation_index, relation) = self.locate_relation(target, &mut ctx, &mut space)?;
        debug!(
            "target '{}': relation '{}' with {} fields",
            target.name,
            relation.relation,
            relation.relation_type.fields.len()
        );

        // Второй проход: раскладка остальных полей по директивам
        let mut builder = IrBuilder::new(kind, relation);
        for (index, field) in target.fields.iter().enumerate() {
            if index == relation_index {
                continue;
            }
            self.dispatch_field(field, &ctx, &mut space, &mut builder)?;
        }

        Ok(builder.finish(target.name.clone()))
    }

    /// Находит и разбирает поле отношения
    fn locate_relation(
        &self,
        target: &TargetDescriptor,
        ctx: &mut AnalysisContext,
        space: &mut RelationSpace,
    ) -> Result<(usize, RelationField)> {
        let mut found: Option<(usize, &FieldDescriptor, &str)> = None;
        for (index, field) in target.fields.iter().enumerate() {
            let Some(value) = field.annotation_head("rel") else {
                continue;
            };
            if let Some((_, existing, _)) = &found {
                return Err(ctx.enrich(
                    Error::structure(format!(
                        "conflicting relation fields: '{}' and '{}'",
                        existing.name, field.name
                    ))
                    .with_field(&field.name),
                ));
            }
            found = Some((index, field, value));
        }

        let Some((index, field, value)) = found else {
            return Err(ctx.enrich(Error::structure("missing relation field")));
        };

        let relation = parse_relation_identifier(value)
            .map_err(|e| ctx.enrich(e.with_field(&field.name).with_annotation(value)))?;
        space
            .register(&relation)
            .map_err(|e| ctx.enrich(e.with_field(&field.name)))?;
        ctx.set_relation(&relation.name);

        let relation_type =
            analyze_relation_type(field, ctx, self.type_cache, self.config.max_walk_depth)?;

        if relation_type.iterator && ctx.kind != QueryKind::Select {
            return Err(ctx.enrich(
                Error::structure("iterator relation field is legal only on select targets")
                    .with_field(&field.name),
            ));
        }

        Ok((
            index,
            RelationField {
                field_name: field.name.clone(),
                relation,
                relation_type,
            },
        ))
    }

    /// Раскладывает одно поле по его роли
    fn dispatch_field(
        &self,
        field: &FieldDescriptor,
        ctx: &AnalysisContext,
        space: &mut RelationSpace,
        builder: &mut IrBuilder,
    ) -> Result<()> {
        let name = field.name.to_ascii_lowercase();
        let directive = match name.as_str() {
            "where" => DirectiveKind::Where,
            "join" | "from" | "using" => DirectiveKind::Join,
            "onconflict" => DirectiveKind::OnConflict,
            "result" => DirectiveKind::Result,
            "limit" => DirectiveKind::Limit,
            "offset" => DirectiveKind::Offset,
            "orderby" => DirectiveKind::OrderBy,
            "rowsaffected" => DirectiveKind::RowsAffected,
            _ => match field.annotation_head("dir") {
                Some(word) => directive_from_keyword(word).ok_or_else(|| {
                    ctx.enrich(
                        Error::structure(format!("unknown directive kind '{}'", word))
                            .with_field(&field.name),
                    )
                })?,
                None => {
                    return Err(ctx.enrich(
                        Error::structure(format!(
                            "field '{}' has no recognized role",
                            field.name
                        ))
                        .with_field(&field.name),
                    ));
                }
            },
        };

        if !directive.allowed_for(builder.kind) {
            return Err(ctx.enrich(
                Error::structure(format!(
                    "{} is illegal on {} targets",
                    directive.name(),
                    builder.kind
                ))
                .with_field(&field.name),
            ));
        }

        match directive {
            DirectiveKind::Where => {
                if builder.where_clause.is_some() {
                    return Err(duplicate(ctx, field, "where clause"));
                }
                builder.note_row_qualifier("where", ctx)?;
                builder.where_clause = Some(build_where_clause(
                    field,
                    ctx,
                    space,
                    self.config.max_walk_depth,
                )?);
            }
            DirectiveKind::Join => {
                if builder.join_clause.is_some() {
                    return Err(duplicate(ctx, field, "join clause"));
                }
                builder.join_clause = Some(build_join_clause(field, ctx, space)?);
            }
            DirectiveKind::OnConflict => {
                if builder.on_conflict.is_some() {
                    return Err(duplicate(ctx, field, "on-conflict clause"));
                }
                builder.on_conflict = Some(build_conflict_clause(field, ctx)?);
            }
            DirectiveKind::Limit => {
                if builder.directives.limit.is_some() {
                    return Err(duplicate(ctx, field, "limit directive"));
                }
                require_integer(field, ctx, "limit")?;
                builder.directives.limit = Some(directive_field(field));
            }
            DirectiveKind::Offset => {
                if builder.directives.offset.is_some() {
                    return Err(duplicate(ctx, field, "offset directive"));
                }
                require_integer(field, ctx, "offset")?;
                builder.directives.offset = Some(directive_field(field));
            }
            DirectiveKind::OrderBy => {
                if !builder.directives.order_by.is_empty() {
                    return Err(duplicate(ctx, field, "order by directive"));
                }
                builder.directives.order_by = parse_order_items(field, ctx, space)?;
            }
            DirectiveKind::Return => {
                if builder.directives.returning.is_some() {
                    return Err(duplicate(ctx, field, "return directive"));
                }
                builder.directives.returning = Some(column_list(field, ctx)?);
            }
            DirectiveKind::Default => {
                if builder.directives.default_columns.is_some() {
                    return Err(duplicate(ctx, field, "default directive"));
                }
                builder.directives.default_columns = Some(column_list(field, ctx)?);
            }
            DirectiveKind::Force => {
                if builder.directives.force_columns.is_some() {
                    return Err(duplicate(ctx, field, "force directive"));
                }
                builder.directives.force_columns = Some(column_list(field, ctx)?);
            }
            DirectiveKind::Optional => {
                if builder.directives.optional_columns.is_some() {
                    return Err(duplicate(ctx, field, "optional directive"));
                }
                builder.directives.optional_columns = Some(column_list(field, ctx)?);
            }
            DirectiveKind::Override => {
                if builder.directives.override_kind.is_some() {
                    return Err(duplicate(ctx, field, "override directive"));
                }
                let word = field.annotation_head("sql").ok_or_else(|| {
                    ctx.enrich(
                        Error::grammar("override directive requires 'system' or 'user'")
                            .with_field(&field.name),
                    )
                })?;
                builder.directives.override_kind =
                    Some(OverrideKind::from_keyword(word).ok_or_else(|| {
                        ctx.enrich(
                            Error::grammar(format!("bad override kind '{}'", word))
                                .with_field(&field.name),
                        )
                    })?);
            }
            DirectiveKind::All => {
                builder.note_row_qualifier("all", ctx)?;
                builder.directives.all_rows = true;
            }
            DirectiveKind::Result => {
                if builder.directives.result.is_some() {
                    return Err(duplicate(ctx, field, "result descriptor"));
                }
                builder.directives.result = Some(directive_field(field));
            }
            DirectiveKind::RowsAffected => {
                if builder.directives.rows_affected.is_some() {
                    return Err(duplicate(ctx, field, "rows-affected descriptor"));
                }
                require_integer(field, ctx, "rows-affected")?;
                builder.directives.rows_affected = Some(directive_field(field));
            }
            DirectiveKind::ErrorHandler => {
                if builder.directives.error_handler.is_some() {
                    return Err(duplicate(ctx, field, "error handler descriptor"));
                }
                if !matches!(field.type_info.kind, TypeKind::Function { .. }) {
                    return Err(ctx.enrich(
                        Error::type_check("error handler field must be a function")
                            .with_field(&field.name),
                    ));
                }
                builder.directives.error_handler = Some(directive_field(field));
            }
            DirectiveKind::Filter => {
                builder.note_row_qualifier("filter", ctx)?;
                if !matches!(field.type_info.unwrap_optional().kind, TypeKind::String) {
                    return Err(ctx.enrich(
                        Error::type_check("filter field must be a string").with_field(&field.name),
                    ));
                }
                builder.directives.filter = Some(directive_field(field));
            }
            DirectiveKind::Context => {
                if builder.directives.context.is_some() {
                    return Err(duplicate(ctx, field, "context descriptor"));
                }
                builder.directives.context = Some(directive_field(field));
            }
        }

        Ok(())
    }
}

/// Промежуточное состояние сборки IR одной цели
struct IrBuilder {
    kind: QueryKind,
    relation: RelationField,
    where_clause: Option<crate::ir::WhereClause>,
    join_clause: Option<crate::ir::JoinClause>,
    on_conflict: Option<OnConflictClause>,
    directives: Directives,
    row_qualifier: Option<&'static str>,
}

impl IrBuilder {
    fn new(kind: QueryKind, relation: RelationField) -> Self {
        Self {
            kind,
            relation,
            where_clause: None,
            join_clause: None,
            on_conflict: None,
            directives: Directives::default(),
            row_qualifier: None,
        }
    }

    /// Регистрирует квалификатор строк, отклоняя второй
    ///
    /// Where, filter и "все строки" взаимно исключают друг друга;
    /// на срезовых целях обновления они недопустимы вовсе.
    fn note_row_qualifier(&mut self, what: &'static str, ctx: &AnalysisContext) -> Result<()> {
        if self.kind == QueryKind::Update && self.relation.relation_type.sequence {
            return Err(ctx.enrich(Error::structure(
                "sliced update targets take no row qualifiers",
            )));
        }
        if let Some(existing) = self.row_qualifier {
            return Err(ctx.enrich(Error::structure(format!(
                "conflicting row qualifiers: '{}' and '{}'",
                existing, what
            ))));
        }
        self.row_qualifier = Some(what);
        Ok(())
    }

    fn finish(self, target: String) -> QueryIr {
        QueryIr {
            target,
            kind: self.kind,
            relation: self.relation,
            where_clause: self.where_clause,
            join_clause: self.join_clause,
            on_conflict: self.on_conflict,
            directives: self.directives,
        }
    }
}

/// Распознает вид директивы из значения аннотации `dir`
fn directive_from_keyword(word: &str) -> Option<DirectiveKind> {
    match word.to_ascii_lowercase().as_str() {
        "where" => Some(DirectiveKind::Where),
        "join" => Some(DirectiveKind::Join),
        "onconflict" => Some(DirectiveKind::OnConflict),
        "limit" => Some(DirectiveKind::Limit),
        "offset" => Some(DirectiveKind::Offset),
        "orderby" => Some(DirectiveKind::OrderBy),
        "return" => Some(DirectiveKind::Return),
        "default" => Some(DirectiveKind::Default),
        "force" => Some(DirectiveKind::Force),
        "optional" => Some(DirectiveKind::Optional),
        "override" => Some(DirectiveKind::Override),
        "all" => Some(DirectiveKind::All),
        "result" => Some(DirectiveKind::Result),
        "rowsaffected" => Some(DirectiveKind::RowsAffected),
        "errorhandler" => Some(DirectiveKind::ErrorHandler),
        "filter" => Some(DirectiveKind::Filter),
        "context" => Some(DirectiveKind::Context),
        _ => None,
    }
}

/// Строит секцию on-conflict из аннотаций поля
///
/// Цель конфликта задается не более чем одним из ключей `columns`,
/// `index`, `constraint`; действие (`action`) обязательно. Действие
/// `update` без цели отклоняется уже здесь, при сборке IR.
fn build_conflict_clause(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
) -> Result<OnConflictClause> {
    let mut target: Option<ConflictTarget> = None;

    if let Some(values) = field.annotation("columns") {
        let list = parse_identifier_list(&values.join(","))
            .map_err(|e| ctx.enrich(e.with_field(&field.name)))?;
        let IdentifierList::Names(names) = list else {
            return Err(ctx.enrich(
                Error::grammar("conflict target requires explicit columns")
                    .with_field(&field.name),
            ));
        };
        target = Some(ConflictTarget::Columns(names));
    }
    if let Some(name) = field.annotation_head("index") {
        if target.is_some() {
            return Err(conflicting_targets(ctx, field));
        }
        target = Some(ConflictTarget::Index(name.to_string()));
    }
    if let Some(name) = field.annotation_head("constraint") {
        if target.is_some() {
            return Err(conflicting_targets(ctx, field));
        }
        target = Some(ConflictTarget::Constraint(name.to_string()));
    }

    let action_values = field.annotation("action").ok_or_else(|| {
        ctx.enrich(Error::structure("missing conflict action").with_field(&field.name))
    })?;
    let action_word = action_values
        .first()
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    let action = match action_word.as_str() {
        "ignore" => ConflictAction::Ignore,
        "update" => {
            // Список колонок необязателен: без него обновляются все
            // записываемые колонки вне цели конфликта
            let list = if action_values.len() > 1 {
                parse_identifier_list(&action_values[1..].join(","))
                    .map_err(|e| ctx.enrich(e.with_field(&field.name)))?
            } else {
                IdentifierList::All
            };
            ConflictAction::Update(list)
        }
        other => {
            return Err(ctx.enrich(
                Error::grammar(format!("bad conflict action '{}'", other))
                    .with_field(&field.name),
            ));
        }
    };

    if matches!(action, ConflictAction::Update(_)) && target.is_none() {
        return Err(ctx.enrich(
            Error::structure("update conflict action requires a conflict target")
                .with_field(&field.name),
        ));
    }

    Ok(OnConflictClause { target, action })
}

fn conflicting_targets(ctx: &AnalysisContext, field: &FieldDescriptor) -> Error {
    ctx.enrich(
        Error::structure("conflicting conflict targets: at most one of columns, index, constraint")
            .with_field(&field.name),
    )
}

/// Разбирает элементы сортировки `[-|+]column[:nullsfirst|nullslast]`
fn parse_order_items(
    field: &FieldDescriptor,
    ctx: &AnalysisContext,
    space: &RelationSpace,
) -> Result<Vec<OrderByItem>> {
    let values = field.annotation("sql").ok_or_else(|| {
        ctx.enrich(Error::grammar("missing column list").with_field(&field.name))
    })?;

    let mut items = Vec::new();
    for value in values {
        let mut text = value.trim();
        let direction = if let Some(rest) = text.strip_prefix('-') {
            text = rest;
            SortDirection::Desc
        } else if let Some(rest) = text.strip_prefix('+') {
            text = rest;
            SortDirection::Asc
        } else {
            SortDirection::Asc
        };

        let (column_text, nulls) = match text.rfind(':') {
            Some(pos) => {
                let marker = &text[pos + 1..];
                let nulls = match marker.to_ascii_lowercase().as_str() {
                    "nullsfirst" => NullsPosition::First,
                    "nullslast" => NullsPosition::Last,
                    other => {
                        return Err(ctx.enrich(
                            Error::grammar(format!("bad nulls position '{}'", other))
                                .with_field(&field.name)
                                .with_annotation(value),
                        ));
                    }
                };
                (&text[..pos], Some(nulls))
            }
            None => (text, None),
        };

        let column = parse_column_identifier(column_text, space)
            .map_err(|e| ctx.enrich(e.with_field(&field.name).with_annotation(value)))?;

        items.push(OrderByItem {
            column,
            direction,
            nulls,
        });
    }

    if items.is_empty() {
        return Err(ctx.enrich(Error::grammar("missing column list").with_field(&field.name)));
    }

    Ok(items)
}

/// Список колонок из значений аннотации `sql`
fn column_list(field: &FieldDescriptor, ctx: &AnalysisContext) -> Result<IdentifierList> {
    let values = field.annotation("sql").ok_or_else(|| {
        ctx.enrich(Error::grammar("missing column list").with_field(&field.name))
    })?;
    parse_identifier_list(&values.join(","))
        .map_err(|e| ctx.enrich(e.with_field(&field.name)))
}

/// Ссылка на поле-директиву
fn directive_field(field: &FieldDescriptor) -> DirectiveField {
    DirectiveField {
        field_name: field.name.clone(),
        type_info: field.type_info.clone(),
    }
}

/// Требует целочисленный тип поля-директивы
fn require_integer(field: &FieldDescriptor, ctx: &AnalysisContext, what: &str) -> Result<()> {
    let base = field.type_info.unwrap_optional();
    if !matches!(base.kind, TypeKind::Int { .. }) {
        return Err(ctx.enrich(
            Error::type_check(format!("{} field must be an integer", what))
                .with_field(&field.name),
        ));
    }
    Ok(())
}

fn duplicate(ctx: &AnalysisContext, field: &FieldDescriptor, what: &str) -> Error {
    ctx.enrich(Error::structure(format!("duplicate {}", what)).with_field(&field.name))
}
