//! Загрузчик каталога
//!
//! Единственное место, где живет SQL системного каталога Postgres.
//! Четыре массовые выборки выполняются при открытии соединения;
//! отношения подгружаются лениво по первому обращению. Любая ошибка
//! декодирования строки фатальна для всего прогона.

use crate::catalog::model::{CatalogModel, CatalogRegistry};
use crate::catalog::oid::Oid;
use crate::catalog::relation::{
    extract_index_expression, Cast, CastContext, Column, Constraint, ConstraintKind, Index,
    Operator, PgType, Procedure, Relation, RelationKind, TypeCategory,
};
use crate::common::{Error, Result};
use crate::grammar::RelationIdentifier;
use indexmap::IndexMap;
use log::{debug, info};
use std::sync::Arc;

/// Массовая выборка типов
const TYPES_QUERY: &str =
    "select oid, typname, typcategory, typelem from pg_catalog.pg_type";

/// Массовая выборка бинарных операторов
const OPERATORS_QUERY: &str =
    "select oid, oprname, oprleft, oprright, oprresult from pg_catalog.pg_operator \
     where oprkind = 'b'";

/// Массовая выборка приведений типов
const CASTS_QUERY: &str =
    "select castsource, casttarget, castcontext from pg_catalog.pg_cast";

/// Массовая выборка процедур с одним аргументом
const PROCEDURES_QUERY: &str =
    "select oid, proname, proargtypes[0], prorettype from pg_catalog.pg_proc \
     where pronargs = 1";

/// Выборка отношения по имени (и схеме, если она задана)
const RELATION_QUERY: &str =
    "select c.oid, n.nspname, c.relname, c.relkind from pg_catalog.pg_class c \
     join pg_catalog.pg_namespace n on n.oid = c.relnamespace \
     where c.relname = $1 and ($2 = '' or n.nspname = $2)";

/// Выборка колонок отношения
const COLUMNS_QUERY: &str =
    "select a.attnum, a.attname, a.atttypid, a.attnotnull, a.atthasdef, a.attndims \
     from pg_catalog.pg_attribute a \
     where a.attrelid = $1 and a.attnum > 0 and not a.attisdropped \
     order by a.attnum";

/// Выборка ограничений отношения
const CONSTRAINTS_QUERY: &str =
    "select conname, contype, condeferrable, conkey from pg_catalog.pg_constraint \
     where conrelid = $1";

/// Выборка индексов отношения
const INDEXES_QUERY: &str =
    "select ic.relname, i.indisunique, i.indisprimary, i.indkey, \
     pg_catalog.pg_get_indexdef(i.indexrelid) \
     from pg_catalog.pg_index i \
     join pg_catalog.pg_class ic on ic.oid = i.indexrelid \
     where i.indrelid = $1";

/// Строка результата запроса каталога в текстовом представлении
#[derive(Debug, Clone, Default)]
pub struct CatalogRow {
    pub values: Vec<Option<String>>,
}

impl CatalogRow {
    /// Создает строку из текстовых значений
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Обязательное текстовое значение
    pub fn text(&self, index: usize) -> Result<&str> {
        self.values
            .get(index)
            .and_then(|v| v.as_deref())
            .ok_or_else(|| {
                Error::catalog_load(format!("catalog row has no value at column {}", index))
            })
    }

    /// Необязательное текстовое значение
    pub fn text_opt(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Идентификатор объекта
    pub fn oid(&self, index: usize) -> Result<Oid> {
        let text = self.text(index)?;
        text.parse().map_err(|_| {
            Error::catalog_load(format!("cannot decode oid '{}' at column {}", text, index))
        })
    }

    /// Короткое целое
    pub fn small_int(&self, index: usize) -> Result<i16> {
        let text = self.text(index)?;
        text.parse().map_err(|_| {
            Error::catalog_load(format!(
                "cannot decode integer '{}' at column {}",
                text, index
            ))
        })
    }

    /// Булево значение в текстовом представлении Postgres
    pub fn boolean(&self, index: usize) -> Result<bool> {
        match self.text(index)? {
            "t" | "true" => Ok(true),
            "f" | "false" => Ok(false),
            other => Err(Error::catalog_load(format!(
                "cannot decode boolean '{}' at column {}",
                other, index
            ))),
        }
    }

    /// Одиночный символ (коды категорий и видов)
    pub fn code(&self, index: usize) -> Result<char> {
        let text = self.text(index)?;
        text.chars().next().ok_or_else(|| {
            Error::catalog_load(format!("empty code value at column {}", index))
        })
    }

    /// Вектор порядковых номеров (int2vector: "1 2 3" или "{1,2,3}")
    pub fn ordinal_vector(&self, index: usize) -> Result<Vec<i16>> {
        let text = self.text(index)?;
        let cleaned = text.trim_matches(|c| c == '{' || c == '}');
        if cleaned.trim().is_empty() {
            return Ok(Vec::new());
        }
        cleaned
            .split(|c: char| c == ' ' || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse().map_err(|_| {
                    Error::catalog_load(format!(
                        "cannot decode ordinal vector '{}' at column {}",
                        text, index
                    ))
                })
            })
            .collect()
    }
}

/// Соединение с базой данных для запросов каталога
///
/// Возвращает строки в текстовом представлении; конкретный драйвер
/// предоставляется вызывающей стороной.
pub trait CatalogConnection: Send + Sync {
    /// Ключ идентичности соединения для кэша моделей
    fn key(&self) -> String;

    /// Выполняет запрос с позиционными параметрами
    fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>>;
}

/// Доступ к каталогу для валидатора
pub trait CatalogAccess {
    /// Модель каталога
    fn model(&self) -> &CatalogModel;

    /// Отношение по идентификатору, с ленивой загрузкой
    fn relation(&self, ident: &RelationIdentifier) -> Result<Arc<Relation>>;
}

/// Каталог поверх живого соединения
pub struct Catalog<C: CatalogConnection> {
    model: Arc<CatalogModel>,
    conn: C,
}

impl<C: CatalogConnection> std::fmt::Debug for Catalog<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl<C: CatalogConnection> Catalog<C> {
    /// Открывает каталог для соединения
    ///
    /// Модель с массово загруженными таблицами кэшируется в реестре
    /// по ключу соединения; повторное открытие того же соединения
    /// переиспользует модель без новых запросов.
    pub fn open(conn: C, registry: &CatalogRegistry) -> Result<Self> {
        let key = conn.key();
        if let Some(model) = registry.get(&key) {
            debug!("catalog model for '{}' reused from registry", key);
            return Ok(Self { model, conn });
        }

        let model = Arc::new(bulk_load(&conn, key.clone())?);
        let model = registry.insert(model);
        Ok(Self { model, conn })
    }

    /// Модель каталога соединения
    pub fn model_arc(&self) -> Arc<CatalogModel> {
        Arc::clone(&self.model)
    }
}

impl<C: CatalogConnection> CatalogAccess for Catalog<C> {
    fn model(&self) -> &CatalogModel {
        &self.model
    }

    fn relation(&self, ident: &RelationIdentifier) -> Result<Arc<Relation>> {
        let qualified = ident.qualified_name();
        if let Some(relation) = self.model.cached_relation(&qualified) {
            return Ok(relation);
        }
        let relation = Arc::new(load_relation(&self.conn, ident)?);
        Ok(self.model.store_relation(qualified, relation))
    }
}

/// Массовая загрузка таблиц каталога
fn bulk_load<C: CatalogConnection>(conn: &C, key: String) -> Result<CatalogModel> {
    let mut types = Vec::new();
    for row in conn.query(TYPES_QUERY, &[])? {
        let elem = row.oid(3)?;
        types.push(PgType {
            oid: row.oid(0)?,
            name: row.text(1)?.to_string(),
            category: TypeCategory::from_code(row.code(2)?),
            elem_oid: if elem == 0 { None } else { Some(elem) },
        });
    }

    let mut operators = Vec::new();
    for row in conn.query(OPERATORS_QUERY, &[])? {
        operators.push(Operator {
            oid: row.oid(0)?,
            name: row.text(1)?.to_string(),
            left: row.oid(2)?,
            right: row.oid(3)?,
            result: row.oid(4)?,
        });
    }

    let mut casts = Vec::new();
    for row in conn.query(CASTS_QUERY, &[])? {
        casts.push(Cast {
            source: row.oid(0)?,
            target: row.oid(1)?,
            context: CastContext::from_code(row.code(2)?),
        });
    }

    let mut procedures = Vec::new();
    for row in conn.query(PROCEDURES_QUERY, &[])? {
        procedures.push(Procedure {
            oid: row.oid(0)?,
            name: row.text(1)?.to_string(),
            arg: row.oid(2)?,
            result: row.oid(3)?,
        });
    }

    info!(
        "catalog '{}' loaded: {} types, {} operators, {} casts, {} procedures",
        key,
        types.len(),
        operators.len(),
        casts.len(),
        procedures.len()
    );

    Ok(CatalogModel::new(key, types, operators, casts, procedures))
}

/// Загружает отношение с колонками, ограничениями и индексами
fn load_relation<C: CatalogConnection>(
    conn: &C,
    ident: &RelationIdentifier,
) -> Result<Relation> {
    let schema = ident.qualifier.as_deref().unwrap_or("");
    let rows = conn.query(RELATION_QUERY, &[&ident.name, schema])?;
    let row = rows.first().ok_or_else(|| {
        Error::catalog(format!("unknown relation '{}'", ident.qualified_name()))
            .with_relation(&ident.name)
    })?;

    let oid = row.oid(0)?;
    let schema = row.text(1)?.to_string();
    let name = row.text(2)?.to_string();
    let kind = RelationKind::from_code(row.code(3)?);

    let oid_text = oid.to_string();

    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for row in conn.query(COLUMNS_QUERY, &[&oid_text])? {
        let column = Column {
            ordinal: row.small_int(0)?,
            name: row.text(1)?.to_string(),
            type_oid: row.oid(2)?,
            not_null: row.boolean(3)?,
            has_default: row.boolean(4)?,
            primary_key: false,
            dimensions: row.small_int(5)?,
        };
        columns.insert(column.name.clone(), column);
    }

    let mut constraints = Vec::new();
    for row in conn.query(CONSTRAINTS_QUERY, &[&oid_text])? {
        constraints.push(Constraint {
            name: row.text(0)?.to_string(),
            kind: ConstraintKind::from_code(row.code(1)?),
            deferrable: row.boolean(2)?,
            key_columns: row.ordinal_vector(3)?,
        });
    }

    let mut indexes = Vec::new();
    for row in conn.query(INDEXES_QUERY, &[&oid_text])? {
        let definition = row.text(4)?.to_string();
        let expression = extract_index_expression(&definition);
        indexes.push(Index {
            name: row.text(0)?.to_string(),
            unique: row.boolean(1)?,
            primary: row.boolean(2)?,
            key_columns: row.ordinal_vector(3)?,
            definition,
            expression,
        });
    }

    // Членство в первичном ключе определяется первичным индексом
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

    debug!(
        "relation '{}.{}' loaded: {} columns, {} constraints, {} indexes",
        schema,
        name,
        columns.len(),
        constraints.len(),
        indexes.len()
    );

    Ok(Relation {
        oid,
        schema,
        name,
        kind,
        columns,
        constraints,
        indexes,
    })
}
