//! Тесты загрузчика каталога

use crate::catalog::loader::{Catalog, CatalogAccess, CatalogConnection, CatalogRow};
use crate::catalog::model::CatalogRegistry;
use crate::common::{Error, Result};
use crate::grammar::parse_relation_identifier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Соединение с фиксированными ответами на запросы каталога
struct MockConnection {
    key: String,
    query_count: AtomicUsize,
    /// Ответы по фрагменту текста запроса
    responses: Mutex<Vec<(&'static str, Vec<CatalogRow>)>>,
}

impl MockConnection {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            query_count: AtomicUsize::new(0),
            responses: Mutex::new(Vec::new()),
        }
    }

    fn respond(&self, marker: &'static str, rows: Vec<CatalogRow>) {
        self.responses.lock().unwrap().push((marker, rows));
    }
}

fn row(values: &[&str]) -> CatalogRow {
    CatalogRow::new(values.iter().map(|v| Some(v.to_string())).collect())
}

impl CatalogConnection for MockConnection {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn query(&self, sql: &str, _params: &[&str]) -> Result<Vec<CatalogRow>> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let responses = self.responses.lock().unwrap();
        for (marker, rows) in responses.iter() {
            if sql.contains(marker) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}

/// Соединение с минимальным набором ответов массовой загрузки
fn connection_with_bulk(key: &str) -> MockConnection {
    let conn = MockConnection::new(key);
    conn.respond(
        "pg_type",
        vec![
            row(&["25", "text", "S", "0"]),
            row(&["20", "int8", "N", "0"]),
            row(&["1009", "_text", "A", "25"]),
        ],
    );
    conn.respond("pg_operator", vec![row(&["100", "=", "25", "25", "16"])]);
    conn.respond("pg_cast", vec![row(&["1043", "25", "i"])]);
    conn.respond("pg_proc", vec![row(&["200", "lower", "25", "25"])]);
    conn
}

#[test]
fn test_bulk_load_populates_model() {
    let conn = connection_with_bulk("db-a");
    let registry = CatalogRegistry::new();
    let catalog = Catalog::open(conn, &registry).unwrap();

    let model = catalog.model();
    assert_eq!(model.type_info(25).unwrap().name, "text");
    assert_eq!(model.type_info(1009).unwrap().elem_oid, Some(25));
    assert!(model.operator(25, 25, "=").is_some());
    assert!(model.implicit_cast(1043, 25).is_some());
    assert_eq!(model.procedures("lower").len(), 1);
}

#[test]
fn test_model_reused_from_registry() {
    let registry = CatalogRegistry::new();
    let first = Catalog::open(connection_with_bulk("db-b"), &registry).unwrap();
    assert_eq!(first.model().key(), "db-b");

    // Повторное открытие того же соединения не выполняет запросов:
    // пустое соединение не смогло бы загрузить типы заново
    let second = Catalog::open(MockConnection::new("db-b"), &registry).unwrap();
    assert_eq!(second.model().type_info(25).unwrap().name, "text");

    let third = Catalog::open(connection_with_bulk("db-c"), &registry).unwrap();
    assert_eq!(third.model().key(), "db-c");
}

#[test]
fn test_lazy_relation_load_and_cache() {
    let conn = connection_with_bulk("db-d");
    // Запрос индексов тоже содержит pg_class; отношение распознается
    // по маркеру pg_namespace, уникальному для своего запроса
    conn.respond("pg_namespace", vec![row(&["5001", "public", "orders", "r"])]);
    conn.respond(
        "pg_attribute",
        vec![
            row(&["1", "id", "20", "t", "t", "0"]),
            row(&["2", "status", "25", "f", "f", "0"]),
        ],
    );
    conn.respond(
        "pg_constraint",
        vec![row(&["orders_pkey", "p", "f", "{1}"])],
    );
    conn.respond(
        "pg_index",
        vec![row(&[
            "orders_pkey",
            "t",
            "t",
            "1",
            "CREATE UNIQUE INDEX orders_pkey ON public.orders USING btree (id)",
        ])],
    );

    let registry = CatalogRegistry::new();
    let catalog = Catalog::open(conn, &registry).unwrap();
    let ident = parse_relation_identifier("orders").unwrap();

    let relation = catalog.relation(&ident).unwrap();
    assert_eq!(relation.name, "orders");
    assert_eq!(relation.columns.len(), 2);
    // Членство в первичном ключе достраивается из первичного индекса
    assert!(relation.column("id").unwrap().primary_key);
    assert!(!relation.column("status").unwrap().primary_key);
    assert_eq!(relation.indexes[0].expression.as_deref(), Some("id"));

    // Повторное обращение идет из кэша
    assert_eq!(catalog.model().cached_relation_count(), 1);
    let again = catalog.relation(&ident).unwrap();
    assert!(std::sync::Arc::ptr_eq(&relation, &again));
}

#[test]
fn test_unknown_relation() {
    let conn = connection_with_bulk("db-e");
    let registry = CatalogRegistry::new();
    let catalog = Catalog::open(conn, &registry).unwrap();

    let ident = parse_relation_identifier("missing").unwrap();
    let err = catalog.relation(&ident).unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(err.to_string().contains("unknown relation 'missing'"));
}

#[test]
fn test_row_decode_failure_is_fatal() {
    let conn = MockConnection::new("db-f");
    conn.respond("pg_type", vec![row(&["not-a-number", "text", "S", "0"])]);

    let registry = CatalogRegistry::new();
    let err = Catalog::open(conn, &registry).unwrap_err();
    assert!(matches!(err, Error::CatalogLoad { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_catalog_row_decoding() {
    let row = CatalogRow::new(vec![
        Some("42".to_string()),
        Some("t".to_string()),
        Some("{1,2,3}".to_string()),
        None,
    ]);
    assert_eq!(row.oid(0).unwrap(), 42);
    assert!(row.boolean(1).unwrap());
    assert_eq!(row.ordinal_vector(2).unwrap(), vec![1, 2, 3]);
    assert!(row.text(3).is_err());
    assert_eq!(row.text_opt(3), None);

    let vector = CatalogRow::new(vec![Some("1 2".to_string())]);
    assert_eq!(vector.ordinal_vector(0).unwrap(), vec![1, 2]);
}
