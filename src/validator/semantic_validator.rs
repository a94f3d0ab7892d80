//! Семантический валидатор
//!
//! Сверяет промежуточное представление цели с моделью каталога и
//! собирает итоговый план запроса. Проверка идет стадиями: загрузка
//! целевого отношения, соединения, поля записи, условия, директивы,
//! поведение при конфликте. Первая ошибка любой стадии прерывает
//! проверку цели целиком; частичные планы не возвращаются.

use crate::analyzer::AnalysisContext;
use crate::catalog::loader::CatalogAccess;
use crate::catalog::oid;
use crate::catalog::relation::{Column, Relation, TypeCategory};
use crate::common::{Error, Result};
use crate::descriptor::{QueryKind, TypeKind};
use crate::grammar::{ColumnIdentifier, IdentifierList};
use crate::ir::{
    BetweenCondition, ColumnCondition, ConditionOperand, ConflictAction, ConflictTarget,
    FieldCondition, IrField, OnConflictClause, QueryIr, WhereClause, WhereItem,
};
use crate::typecheck::{literal_shape, natural_element_oid, natural_oid, CompatibilityResolver};
use crate::validator::plan::{
    ConflictInfo, PlannedBetween, PlannedCondition, PlannedField, PlannedJoin, PlannedJoinItem,
    PlannedOperand, PlannedOrderBy, PlannedWhereItem, QueryPlan,
};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Семантический валидатор поверх каталога
pub struct SemanticValidator<'a> {
    catalog: &'a dyn CatalogAccess,
}

/// Область видимости отношений одной проверки
struct Scope {
    relations: HashMap<String, Arc<Relation>>,
    target_key: String,
}

impl Scope {
    /// Разрешает идентификатор колонки в отношении области видимости
    fn resolve(
        &self,
        column: &ColumnIdentifier,
        default_key: &str,
        ctx: &AnalysisContext,
    ) -> Result<(String, Column)> {
        let key = column.qualifier.as_deref().unwrap_or(default_key);
        let relation = self.relations.get(key).ok_or_else(|| {
            ctx.enrich(Error::catalog(format!("unknown qualifier '{}'", key)))
        })?;
        let found = relation.column(&column.name).ok_or_else(|| {
            ctx.enrich(
                Error::catalog(format!(
                    "unknown column '{}' of relation '{}'",
                    column.name, relation.name
                ))
                .with_column(&column.name),
            )
        })?;
        Ok((key.to_string(), found.clone()))
    }
}

impl<'a> SemanticValidator<'a> {
    /// Создает валидатор поверх каталога
    pub fn new(catalog: &'a dyn CatalogAccess) -> Self {
        Self { catalog }
    }

    /// Проверяет IR цели и собирает план запроса
    pub fn validate(&self, ir: &QueryIr) -> Result<QueryPlan> {
        let mut ctx = AnalysisContext::new(&ir.target, ir.kind);
        let resolver = CompatibilityResolver::new(self.catalog.model());

        // Стадия 1: загрузка целевого отношения
        let relation = self
            .catalog
            .relation(&ir.relation.relation)
            .map_err(|e| ctx.enrich(e))?;
        ctx.set_relation(&relation.name);
        debug!("target '{}': relation '{}' loaded", ir.target, relation.name);

        let target_key = ir.relation.relation.space_key().to_string();
        let mut scope = Scope {
            relations: HashMap::new(),
            target_key: target_key.clone(),
        };
        scope.relations.insert(target_key, Arc::clone(&relation));

        // Стадия 2: соединения
        let joins = self.validate_joins(ir, &mut scope, &resolver, &ctx)?;

        // Стадия 3: поля записи отношения
        let mut reads = Vec::new();
        let mut writes = Vec::new();
        let mut filters = Vec::new();
        let mut key_writes = Vec::new();
        for field in ir.relation.relation_type.fields.iter() {
            let planned = self.validate_relation_field(field, &relation, &resolver, &ctx)?;
            if field.readable {
                reads.push(planned.clone());
            }
            if field.writable && matches!(ir.kind, QueryKind::Insert | QueryKind::Update) {
                if planned.column.primary_key {
                    key_writes.push(planned.clone());
                } else {
                    writes.push(planned.clone());
                }
            }
            if field.filterable && ir.kind == QueryKind::Filter {
                filters.push(planned);
            }
        }

        // Стадия 4: условия отбора
        let conditionals = match &ir.where_clause {
            Some(clause) => self.validate_where(clause, &scope, &resolver, &ctx)?,
            None => Vec::new(),
        };

        // Стадия 5: директивы
        let order_by = self.validate_order_by(ir, &scope, &resolver, &ctx)?;
        self.validate_column_lists(ir, &relation, &ctx)?;

        // Стадия 6: поведение при конфликте
        let conflict = match &ir.on_conflict {
            Some(clause) => Some(self.validate_conflict(clause, ir, &relation, &ctx)?),
            None => None,
        };

        debug!("target '{}': plan assembled", ir.target);

        Ok(QueryPlan {
            target: ir.target.clone(),
            kind: ir.kind,
            relation: ir.relation.relation.clone(),
            catalog_relation: relation,
            reads,
            writes,
            filters,
            key_writes,
            joins,
            conditionals,
            conflict,
            order_by,
            directives: ir.directives.clone(),
        })
    }

    /// Проверяет соединения и наполняет область видимости
    fn validate_joins(
        &self,
        ir: &QueryIr,
        scope: &mut Scope,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<Vec<PlannedJoin>> {
        let Some(join_clause) = &ir.join_clause else {
            return Ok(Vec::new());
        };

        if let Some(base) = &join_clause.base {
            let relation = self.catalog.relation(base).map_err(|e| ctx.enrich(e))?;
            scope
                .relations
                .insert(base.space_key().to_string(), relation);
        }

        // Отношения всех директив загружаются до проверки условий:
        // условие может ссылаться на отношение более поздней директивы
        let mut loaded = Vec::new();
        for directive in &join_clause.directives {
            let relation = self
                .catalog
                .relation(&directive.relation)
                .map_err(|e| ctx.enrich(e))?;
            scope
                .relations
                .insert(directive.relation.space_key().to_string(), Arc::clone(&relation));
            loaded.push(relation);
        }

        let mut joins = Vec::new();
        for (directive, relation) in join_clause.directives.iter().zip(loaded) {
            let directive_key = directive.relation.space_key();
            let mut conditions = Vec::new();
            for item in &directive.conditions {
                match item {
                    crate::ir::JoinItem::Linker(linker) => {
                        conditions.push(PlannedJoinItem::Linker(*linker));
                    }
                    crate::ir::JoinItem::Condition(condition) => {
                        let planned = self.validate_column_condition(
                            condition,
                            directive_key,
                            scope,
                            resolver,
                            ctx,
                        )?;
                        conditions.push(PlannedJoinItem::Condition(planned));
                    }
                }
            }
            joins.push(PlannedJoin {
                kind: directive.kind,
                relation: directive.relation.clone(),
                catalog_relation: relation,
                conditions,
            });
        }

        Ok(joins)
    }

    /// Проверяет одно поле записи против колонки каталога
    fn validate_relation_field(
        &self,
        field: &IrField,
        relation: &Relation,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<PlannedField> {
        let column = relation.column(&field.column.name).ok_or_else(|| {
            ctx.enrich(
                Error::catalog(format!(
                    "unknown column '{}' of relation '{}'",
                    field.column.name, relation.name
                ))
                .with_field(&field.field_name)
                .with_column(&field.column.name),
            )
        })?;

        let conversion = resolver.resolve(column, &field.type_info).ok_or_else(|| {
            ctx.enrich(
                Error::type_check(format!(
                    "field type '{}' is not compatible with column type '{}'",
                    literal_shape(&field.type_info),
                    resolver.type_name(column.type_oid)
                ))
                .with_field(&field.field_name)
                .with_column(&column.name),
            )
        })?;

        if field.use_default && !column.has_default {
            return Err(ctx.enrich(
                Error::type_check(format!(
                    "column '{}' declares no default value",
                    column.name
                ))
                .with_field(&field.field_name)
                .with_column(&column.name),
            ));
        }

        Ok(PlannedField {
            field_name: field.field_name.clone(),
            selector: field.selector.clone(),
            column: column.clone(),
            valuer: conversion.valuer,
            scanner: conversion.scanner,
            coalesce_null: field.coalesce_null,
            use_default: field.use_default,
            force_write: field.force_write,
        })
    }

    /// Проверяет дерево условий
    fn validate_where(
        &self,
        clause: &WhereClause,
        scope: &Scope,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<Vec<PlannedWhereItem>> {
        let mut items = Vec::new();
        for item in &clause.items {
            match item {
                WhereItem::Linker(linker) => items.push(PlannedWhereItem::Linker(*linker)),
                WhereItem::Field(condition) => {
                    let planned =
                        self.validate_field_condition(condition, scope, resolver, ctx)?;
                    items.push(PlannedWhereItem::Condition(planned));
                }
                WhereItem::Column(condition) => {
                    let planned = self.validate_column_condition(
                        condition,
                        &scope.target_key,
                        scope,
                        resolver,
                        ctx,
                    )?;
                    items.push(PlannedWhereItem::Condition(planned));
                }
                WhereItem::Between(condition) => {
                    let planned = self.validate_between(condition, scope, resolver, ctx)?;
                    items.push(PlannedWhereItem::Between(planned));
                }
                WhereItem::Group(inner) => {
                    let planned = self.validate_where(inner, scope, resolver, ctx)?;
                    items.push(PlannedWhereItem::Group(planned));
                }
            }
        }
        Ok(items)
    }

    /// Проверяет условие со значением поля
    fn validate_field_condition(
        &self,
        condition: &FieldCondition,
        scope: &Scope,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<PlannedCondition> {
        let (key, column) = scope.resolve(&condition.column, &scope.target_key, ctx)?;

        let quantified = condition.quantifier.is_some() || condition.predicate.is_membership();
        if let Some(operator) = condition.predicate.operator_name() {
            let field_base = condition.type_info.unwrap_optional();
            let rhs_oid = if quantified {
                // Квантификатор требует операнд-последовательность
                if !matches!(field_base.kind, TypeKind::Sequence { .. }) {
                    return Err(ctx.enrich(
                        Error::type_check(
                            "quantified predicate requires a sequence-typed operand",
                        )
                        .with_field(&condition.field_name)
                        .with_column(&column.name),
                    ));
                }
                natural_element_oid(&condition.type_info).unwrap_or(oid::UNKNOWN)
            } else {
                natural_oid(&condition.type_info).unwrap_or(oid::UNKNOWN)
            };

            if rhs_oid != oid::UNKNOWN && !resolver.comparable(column.type_oid, rhs_oid, operator)
            {
                return Err(ctx.enrich(
                    Error::type_check(format!(
                        "operand types '{}' and '{}' are not comparable with '{}'",
                        resolver.type_name(column.type_oid),
                        resolver.type_name(rhs_oid),
                        operator
                    ))
                    .with_field(&condition.field_name)
                    .with_column(&column.name),
                ));
            }
        }

        Ok(PlannedCondition {
            relation: key,
            column,
            predicate: condition.predicate,
            quantifier: condition.quantifier,
            operand: Some(PlannedOperand::Field {
                field_name: condition.field_name.clone(),
                type_info: condition.type_info.clone(),
            }),
        })
    }

    /// Проверяет колоночное условие
    fn validate_column_condition(
        &self,
        condition: &ColumnCondition,
        default_key: &str,
        scope: &Scope,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<PlannedCondition> {
        let (key, column) = scope.resolve(&condition.left, default_key, ctx)?;

        if condition.predicate.is_boolean_check()
            && resolver.category(column.type_oid) != Some(TypeCategory::Boolean)
        {
            return Err(ctx.enrich(
                Error::type_check(format!(
                    "boolean predicate '{}' on non-boolean column '{}'",
                    condition.predicate, column.name
                ))
                .with_column(&column.name),
            ));
        }

        // Проверка NULL недопустима на колонке с запретом NULL,
        // если колонка принадлежит целевому отношению
        if condition.predicate.is_null_check() && column.not_null && key == scope.target_key {
            return Err(ctx.enrich(
                Error::type_check(format!(
                    "null predicate on not-null column '{}'",
                    column.name
                ))
                .with_column(&column.name),
            ));
        }

        let operand = match &condition.right {
            None => None,
            Some(ConditionOperand::Literal(text)) => {
                // Нетипизированный литерал принимает тип колонки
                Some(PlannedOperand::Literal(text.clone()))
            }
            Some(ConditionOperand::Column(right)) => {
                let (right_key, right_column) = scope.resolve(right, &scope.target_key, ctx)?;
                if let Some(operator) = condition.predicate.operator_name() {
                    let quantified = condition.quantifier.is_some()
                        || condition.predicate.is_membership();
                    let rhs_oid = if quantified {
                        resolver.element_oid(right_column.type_oid).ok_or_else(|| {
                            ctx.enrich(
                                Error::type_check(format!(
                                    "quantified predicate requires an array operand, column '{}' is not an array",
                                    right_column.name
                                ))
                                .with_column(&right_column.name),
                            )
                        })?
                    } else {
                        right_column.type_oid
                    };
                    if !resolver.comparable(column.type_oid, rhs_oid, operator) {
                        return Err(ctx.enrich(
                            Error::type_check(format!(
                                "operand types '{}' and '{}' are not comparable with '{}'",
                                resolver.type_name(column.type_oid),
                                resolver.type_name(rhs_oid),
                                operator
                            ))
                            .with_column(&column.name),
                        ));
                    }
                }
                Some(PlannedOperand::Column {
                    relation: right_key,
                    column: right_column,
                })
            }
        };

        Ok(PlannedCondition {
            relation: key,
            column,
            predicate: condition.predicate,
            quantifier: condition.quantifier,
            operand,
        })
    }

    /// Проверяет интервальное условие
    fn validate_between(
        &self,
        condition: &BetweenCondition,
        scope: &Scope,
        resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<PlannedBetween> {
        let (key, column) = scope.resolve(&condition.column, &scope.target_key, ctx)?;

        for bound in [&condition.lower, &condition.upper] {
            let bound_oid = natural_oid(&bound.type_info).unwrap_or(oid::UNKNOWN);
            if bound_oid != oid::UNKNOWN && !resolver.comparable(column.type_oid, bound_oid, "<=")
            {
                return Err(ctx.enrich(
                    Error::type_check(format!(
                        "between bound '{}' is not comparable with column '{}'",
                        bound.field_name, column.name
                    ))
                    .with_field(&bound.field_name)
                    .with_column(&column.name),
                ));
            }
        }

        Ok(PlannedBetween {
            relation: key,
            column,
            symmetric: condition.symmetric,
            negated: condition.negated,
            lower_field: condition.lower.field_name.clone(),
            upper_field: condition.upper.field_name.clone(),
        })
    }

    /// Проверяет элементы сортировки
    fn validate_order_by(
        &self,
        ir: &QueryIr,
        scope: &Scope,
        _resolver: &CompatibilityResolver<'_>,
        ctx: &AnalysisContext,
    ) -> Result<Vec<PlannedOrderBy>> {
        let mut items = Vec::new();
        for item in &ir.directives.order_by {
            let (key, column) = scope.resolve(&item.column, &scope.target_key, ctx)?;
            items.push(PlannedOrderBy {
                relation: key,
                column,
                direction: item.direction,
                nulls: item.nulls,
            });
        }
        Ok(items)
    }

    /// Проверяет списки колонок директив
    ///
    /// Колонки директив default и force обязаны существовать именно на
    /// целевом отношении; каждая колонка всех четырех списков должна
    /// иметь сопоставленное поле в наборе колонок записи.
    fn validate_column_lists(
        &self,
        ir: &QueryIr,
        relation: &Relation,
        ctx: &AnalysisContext,
    ) -> Result<()> {
        let lists: [(&str, Option<&IdentifierList>); 4] = [
            ("return", ir.directives.returning.as_ref()),
            ("default", ir.directives.default_columns.as_ref()),
            ("force", ir.directives.force_columns.as_ref()),
            ("optional", ir.directives.optional_columns.as_ref()),
        ];

        for (what, list) in lists {
            let Some(IdentifierList::Names(names)) = list else {
                continue;
            };
            for name in names {
                let column = relation.column(name).ok_or_else(|| {
                    ctx.enrich(
                        Error::catalog(format!(
                            "unknown column '{}' of relation '{}' in {} directive",
                            name, relation.name, what
                        ))
                        .with_column(name),
                    )
                })?;

                let has_field = ir
                    .relation
                    .relation_type
                    .fields
                    .iter()
                    .any(|f| f.column.name == *name);
                if !has_field {
                    return Err(ctx.enrich(
                        Error::structure(format!(
                            "{} directive column '{}' has no matching record field",
                            what, name
                        ))
                        .with_column(name),
                    ));
                }

                if what == "default" && !column.has_default {
                    return Err(ctx.enrich(
                        Error::type_check(format!(
                            "column '{}' declares no default value",
                            name
                        ))
                        .with_column(name),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Проверяет поведение при конфликте
    fn validate_conflict(
        &self,
        clause: &OnConflictClause,
        ir: &QueryIr,
        relation: &Relation,
        ctx: &AnalysisContext,
    ) -> Result<ConflictInfo> {
        let mut info = ConflictInfo {
            target_columns: Vec::new(),
            target_index: None,
            target_constraint: None,
            ignore: matches!(clause.action, ConflictAction::Ignore),
            update_columns: Vec::new(),
        };

        match &clause.target {
            None => {}
            Some(ConflictTarget::Columns(names)) => {
                for name in names {
                    if relation.column(name).is_none() {
                        return Err(ctx.enrich(
                            Error::catalog(format!(
                                "unknown column '{}' of relation '{}' in conflict target",
                                name, relation.name
                            ))
                            .with_column(name),
                        ));
                    }
                }
                let index = relation.unique_index_matching(names).ok_or_else(|| {
                    ctx.enrich(Error::catalog(format!(
                        "no unique index covers conflict target columns ({})",
                        names.join(", ")
                    )))
                })?;
                info.target_columns = names.clone();
                info.target_index = Some(index.name.clone());
            }
            Some(ConflictTarget::Index(name)) => {
                let index = relation.index(name).ok_or_else(|| {
                    ctx.enrich(Error::catalog(format!("unknown index '{}'", name)))
                })?;
                if !index.unique {
                    return Err(ctx.enrich(Error::structure(format!(
                        "conflict target index '{}' is not unique",
                        name
                    ))));
                }
                info.target_columns = index
                    .key_columns
                    .iter()
                    .filter_map(|ordinal| relation.column_by_ordinal(*ordinal))
                    .map(|c| c.name.clone())
                    .collect();
                info.target_index = Some(name.clone());
            }
            Some(ConflictTarget::Constraint(name)) => {
                let constraint = relation.constraint(name).ok_or_else(|| {
                    ctx.enrich(Error::catalog(format!("unknown constraint '{}'", name)))
                })?;
                if !constraint.kind.enforces_uniqueness() {
                    return Err(ctx.enrich(Error::structure(format!(
                        "conflict target constraint '{}' does not enforce uniqueness",
                        name
                    ))));
                }
                info.target_columns = constraint
                    .key_columns
                    .iter()
                    .filter_map(|ordinal| relation.column_by_ordinal(*ordinal))
                    .map(|c| c.name.clone())
                    .collect();
                info.target_constraint = Some(name.clone());
            }
        }

        if let ConflictAction::Update(columns) = &clause.action {
            // Инвариант IR проверяется и здесь: IR может быть собран
            // программно, минуя структурный анализатор
            if clause.target.is_none() {
                return Err(ctx.enrich(Error::structure(
                    "update conflict action requires a conflict target",
                )));
            }
            match columns {
                IdentifierList::All => {
                    info.update_columns = ir
                        .relation
                        .relation_type
                        .fields
                        .iter()
                        .filter(|f| {
                            f.writable && !info.target_columns.contains(&f.column.name)
                        })
                        .map(|f| f.column.name.clone())
                        .collect();
                }
                IdentifierList::Names(names) => {
                    for name in names {
                        if relation.column(name).is_none() {
                            return Err(ctx.enrich(
                                Error::catalog(format!(
                                    "unknown column '{}' of relation '{}' in conflict update",
                                    name, relation.name
                                ))
                                .with_column(name),
                            ));
                        }
                        let writable = ir
                            .relation
                            .relation_type
                            .fields
                            .iter()
                            .any(|f| f.column.name == *name && f.writable);
                        if !writable {
                            return Err(ctx.enrich(
                                Error::structure(format!(
                                    "conflict update column '{}' has no writable record field",
                                    name
                                ))
                                .with_column(name),
                            ));
                        }
                    }
                    info.update_columns = names.clone();
                }
            }
        }

        Ok(info)
    }
}
