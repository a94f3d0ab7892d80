//! Снимок каталога для работы без живого соединения
//!
//! Снимок описывает отношения (и, при необходимости, дополнительные
//! типы) в JSON документе; встроенные типы Postgres добавляются
//! автоматически. Используется офлайн-режимом CLI и тестами.

use crate::catalog::loader::CatalogAccess;
use crate::catalog::model::CatalogModel;
use crate::catalog::oid::{self, Oid};
use crate::catalog::relation::{
    extract_index_expression, Cast, CastContext, Column, Constraint, ConstraintKind, Index,
    Operator, PgType, Relation, RelationKind, TypeCategory,
};
use crate::common::{Error, Result};
use crate::grammar::RelationIdentifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Снимок каталога
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Дополнительные типы (например, перечисления)
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    /// Дополнительные операторы
    #[serde(default)]
    pub operators: Vec<OperatorSnapshot>,
    /// Дополнительные неявные приведения
    #[serde(default)]
    pub casts: Vec<CastSnapshot>,
    /// Отношения
    #[serde(default)]
    pub relations: Vec<RelationSnapshot>,
}

/// Тип в снимке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSnapshot {
    pub oid: Oid,
    pub name: String,
    /// Код категории pg_type.typcategory
    pub category: char,
    #[serde(default)]
    pub elem_oid: Option<Oid>,
}

/// Оператор в снимке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSnapshot {
    pub name: String,
    pub left: Oid,
    pub right: Oid,
    pub result: Oid,
}

/// Неявное приведение в снимке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastSnapshot {
    pub source: Oid,
    pub target: Oid,
}

/// Отношение в снимке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSnapshot {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSnapshot>,
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
}

fn default_schema() -> String {
    "public".to_string()
}

/// Колонка в снимке; тип задается именем
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub dimensions: i16,
}

/// Ограничение в снимке; ключевые колонки задаются именами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSnapshot {
    pub name: String,
    /// Код вида pg_constraint.contype
    pub kind: char,
    #[serde(default)]
    pub deferrable: bool,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Индекс в снимке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub definition: Option<String>,
}

impl CatalogSnapshot {
    /// Разбирает снимок из JSON текста
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::from)
    }

    /// Строит каталог из снимка
    pub fn into_catalog(self, key: &str) -> Result<SnapshotCatalog> {
        let mut types = standard_types();
        for t in &self.types {
            types.push(PgType {
                oid: t.oid,
                name: t.name.clone(),
                category: TypeCategory::from_code(t.category),
                elem_oid: t.elem_oid,
            });
        }

        let operators = self
            .operators
            .iter()
            .enumerate()
            .map(|(i, o)| Operator {
                oid: 100_000 + i as Oid,
                name: o.name.clone(),
                left: o.left,
                right: o.right,
                result: o.result,
            })
            .chain(standard_operators())
            .collect();

        let casts = self
            .casts
            .iter()
            .map(|c| Cast {
                source: c.source,
                target: c.target,
                context: CastContext::Implicit,
            })
            .chain(standard_casts())
            .collect();

        let model = CatalogModel::new(key.to_string(), types, operators, casts, Vec::new());

        for (offset, snapshot) in self.relations.into_iter().enumerate() {
            let relation = build_relation(&model, snapshot, 50_000 + offset as Oid)?;
            let qualified = if relation.schema == "public" {
                relation.name.clone()
            } else {
                format!("{}.{}", relation.schema, relation.name)
            };
            let relation = Arc::new(relation);
            if relation.schema != "public" {
                model.store_relation(qualified, Arc::clone(&relation));
            } else {
                // Отношения схемы public доступны и по короткому имени
                model.store_relation(relation.name.clone(), Arc::clone(&relation));
                model.store_relation(
                    format!("public.{}", relation.name),
                    Arc::clone(&relation),
                );
            }
        }

        Ok(SnapshotCatalog { model })
    }
}

/// Строит отношение каталога из снимка
fn build_relation(
    model: &CatalogModel,
    snapshot: RelationSnapshot,
    oid: Oid,
) -> Result<Relation> {
    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for (index, column) in snapshot.columns.iter().enumerate() {
        let pg_type = model.type_by_name(&column.type_name).ok_or_else(|| {
            Error::catalog_load(format!(
                "snapshot column '{}.{}' references unknown type '{}'",
                snapshot.name, column.name, column.type_name
            ))
        })?;
        columns.insert(
            column.name.clone(),
            Column {
                ordinal: index as i16 + 1,
                name: column.name.clone(),
                type_oid: pg_type.oid,
                not_null: column.not_null,
                has_default: column.has_default,
                primary_key: column.primary_key,
                dimensions: column.dimensions,
            },
        );
    }

    let ordinal_of = |name: &str| -> Result<i16> {
        columns
            .get(name)
            .map(|c| c.ordinal)
            .ok_or_else(|| {
                Error::catalog_load(format!(
                    "snapshot references unknown column '{}' of relation '{}'",
                    name, snapshot.name
                ))
            })
    };

    let mut constraints = Vec::new();
    for constraint in &snapshot.constraints {
        let key_columns = constraint
            .columns
            .iter()
            .map(|n| ordinal_of(n))
            .collect::<Result<Vec<_>>>()?;
        constraints.push(Constraint {
            name: constraint.name.clone(),
            kind: ConstraintKind::from_code(constraint.kind),
            deferrable: constraint.deferrable,
            key_columns,
        });
    }

    let mut indexes = Vec::new();
    for index in &snapshot.indexes {
        let key_columns = index
            .columns
            .iter()
            .map(|n| ordinal_of(n))
            .collect::<Result<Vec<_>>>()?;
        let definition = index.definition.clone().unwrap_or_default();
        let expression = extract_index_expression(&definition);
        indexes.push(Index {
            name: index.name.clone(),
            unique: index.unique || index.primary,
            primary: index.primary,
            key_columns,
            definition,
            expression,
        });
    }

    // Членство в первичном ключе достраивается из первичного индекса
    let primary_ordinals: Vec<i16> = indexes
        .iter()
        .filter(|i| i.primary)
        .flat_map(|i| i.key_columns.iter().copied())
        .collect();
    for column in columns.values_mut() {
        if primary_ordinals.contains(&column.ordinal) {
            column.primary_key = true;
        }
    }

    Ok(Relation {
        oid,
        schema: snapshot.schema,
        name: snapshot.name,
        kind: RelationKind::Table,
        columns,
        constraints,
        indexes,
    })
}

/// Каталог, полностью заполненный из снимка
pub struct SnapshotCatalog {
    model: CatalogModel,
}

impl std::fmt::Debug for SnapshotCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCatalog").finish_non_exhaustive()
    }
}

impl CatalogAccess for SnapshotCatalog {
    fn model(&self) -> &CatalogModel {
        &self.model
    }

    fn relation(&self, ident: &RelationIdentifier) -> Result<Arc<Relation>> {
        self.model
            .cached_relation(&ident.qualified_name())
            .ok_or_else(|| {
                Error::catalog(format!("unknown relation '{}'", ident.qualified_name()))
                    .with_relation(&ident.name)
            })
    }
}

/// Встроенные типы Postgres, достаточные для снимков и тестов
pub fn standard_types() -> Vec<PgType> {
    fn t(oid: Oid, name: &str, category: TypeCategory, elem: Option<Oid>) -> PgType {
        PgType {
            oid,
            name: name.to_string(),
            category,
            elem_oid: elem,
        }
    }

    vec![
        t(oid::BOOL, "bool", TypeCategory::Boolean, None),
        t(oid::BYTEA, "bytea", TypeCategory::UserDefined, None),
        t(oid::INT8, "int8", TypeCategory::Numeric, None),
        t(oid::INT2, "int2", TypeCategory::Numeric, None),
        t(oid::INT4, "int4", TypeCategory::Numeric, None),
        t(oid::TEXT, "text", TypeCategory::String, None),
        t(oid::JSON, "json", TypeCategory::UserDefined, None),
        t(oid::FLOAT4, "float4", TypeCategory::Numeric, None),
        t(oid::FLOAT8, "float8", TypeCategory::Numeric, None),
        t(oid::UNKNOWN, "unknown", TypeCategory::Unknown, None),
        t(oid::BOOL_ARRAY, "_bool", TypeCategory::Array, Some(oid::BOOL)),
        t(oid::BYTEA_ARRAY, "_bytea", TypeCategory::Array, Some(oid::BYTEA)),
        t(oid::INT2_ARRAY, "_int2", TypeCategory::Array, Some(oid::INT2)),
        t(oid::INT4_ARRAY, "_int4", TypeCategory::Array, Some(oid::INT4)),
        t(oid::TEXT_ARRAY, "_text", TypeCategory::Array, Some(oid::TEXT)),
        t(
            oid::VARCHAR_ARRAY,
            "_varchar",
            TypeCategory::Array,
            Some(oid::VARCHAR),
        ),
        t(oid::INT8_ARRAY, "_int8", TypeCategory::Array, Some(oid::INT8)),
        t(
            oid::FLOAT4_ARRAY,
            "_float4",
            TypeCategory::Array,
            Some(oid::FLOAT4),
        ),
        t(
            oid::FLOAT8_ARRAY,
            "_float8",
            TypeCategory::Array,
            Some(oid::FLOAT8),
        ),
        t(oid::BPCHAR, "bpchar", TypeCategory::String, None),
        t(oid::VARCHAR, "varchar", TypeCategory::String, None),
        t(oid::DATE, "date", TypeCategory::DateTime, None),
        t(oid::TIME, "time", TypeCategory::DateTime, None),
        t(oid::TIMESTAMP, "timestamp", TypeCategory::DateTime, None),
        t(
            oid::TIMESTAMP_ARRAY,
            "_timestamp",
            TypeCategory::Array,
            Some(oid::TIMESTAMP),
        ),
        t(oid::TIMESTAMPTZ, "timestamptz", TypeCategory::DateTime, None),
        t(oid::INTERVAL, "interval", TypeCategory::Timespan, None),
        t(oid::NUMERIC, "numeric", TypeCategory::Numeric, None),
        t(
            oid::NUMERIC_ARRAY,
            "_numeric",
            TypeCategory::Array,
            Some(oid::NUMERIC),
        ),
        t(oid::UUID, "uuid", TypeCategory::UserDefined, None),
        t(oid::UUID_ARRAY, "_uuid", TypeCategory::Array, Some(oid::UUID)),
        t(oid::JSONB, "jsonb", TypeCategory::UserDefined, None),
    ]
}

/// Стандартные операторы сравнения для встроенных типов
fn standard_operators() -> Vec<Operator> {
    let comparable: &[Oid] = &[
        oid::BOOL,
        oid::BYTEA,
        oid::INT2,
        oid::INT4,
        oid::INT8,
        oid::TEXT,
        oid::FLOAT4,
        oid::FLOAT8,
        oid::BPCHAR,
        oid::VARCHAR,
        oid::DATE,
        oid::TIME,
        oid::TIMESTAMP,
        oid::TIMESTAMPTZ,
        oid::INTERVAL,
        oid::NUMERIC,
        oid::UUID,
    ];
    let names = ["=", "<>", "<", ">", "<=", ">="];
    let mut operators = Vec::new();
    let mut next_oid: Oid = 200_000;
    for type_oid in comparable {
        for name in names {
            operators.push(Operator {
                oid: next_oid,
                name: name.to_string(),
                left: *type_oid,
                right: *type_oid,
                result: oid::BOOL,
            });
            next_oid += 1;
        }
    }
    // Текстовые шаблонные операторы
    for name in ["~", "~*", "!~", "!~*", "~~", "!~~", "~~*", "!~~*"] {
        operators.push(Operator {
            oid: next_oid,
            name: name.to_string(),
            left: oid::TEXT,
            right: oid::TEXT,
            result: oid::BOOL,
        });
        next_oid += 1;
    }
    operators
}

/// Стандартные неявные приведения между числовыми и строковыми типами
fn standard_casts() -> Vec<Cast> {
    let pairs: &[(Oid, Oid)] = &[
        (oid::INT2, oid::INT4),
        (oid::INT2, oid::INT8),
        (oid::INT4, oid::INT8),
        (oid::INT2, oid::NUMERIC),
        (oid::INT4, oid::NUMERIC),
        (oid::INT8, oid::NUMERIC),
        (oid::FLOAT4, oid::FLOAT8),
        (oid::INT4, oid::FLOAT8),
        (oid::INT8, oid::FLOAT8),
        (oid::VARCHAR, oid::TEXT),
        (oid::BPCHAR, oid::TEXT),
        (oid::DATE, oid::TIMESTAMP),
        (oid::DATE, oid::TIMESTAMPTZ),
        (oid::TIMESTAMP, oid::TIMESTAMPTZ),
    ];
    pairs
        .iter()
        .map(|(source, target)| Cast {
            source: *source,
            target: *target,
            context: CastContext::Implicit,
        })
        .collect()
}
