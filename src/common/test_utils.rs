//! Общие утилиты для тестирования
//!
//! Строители дескрипторов и снимков каталога, используемые юнит-тестами
//! модулей и интеграционными тестами.

use crate::catalog::snapshot::{
    CatalogSnapshot, ColumnSnapshot, ConstraintSnapshot, IndexSnapshot, RelationSnapshot,
    TypeSnapshot,
};
use crate::catalog::SnapshotCatalog;
use crate::descriptor::{FieldDescriptor, TargetDescriptor, TypeInfo, TypeKind};
use indexmap::IndexMap;

/// Строковый тип
pub fn ty_string() -> TypeInfo {
    TypeInfo::plain(TypeKind::String)
}

/// Булев тип
pub fn ty_bool() -> TypeInfo {
    TypeInfo::plain(TypeKind::Bool)
}

/// 64-битное целое
pub fn ty_i64() -> TypeInfo {
    TypeInfo::plain(TypeKind::Int {
        bits: 64,
        unsigned: false,
    })
}

/// 32-битное целое
pub fn ty_i32() -> TypeInfo {
    TypeInfo::plain(TypeKind::Int {
        bits: 32,
        unsigned: false,
    })
}

/// 64-битное число с плавающей точкой
pub fn ty_f64() -> TypeInfo {
    TypeInfo::plain(TypeKind::Float { bits: 64 })
}

/// Последовательность байтов
pub fn ty_bytes() -> TypeInfo {
    ty_seq(TypeInfo::plain(TypeKind::Int {
        bits: 8,
        unsigned: true,
    }))
}

/// Последовательность значений
pub fn ty_seq(elem: TypeInfo) -> TypeInfo {
    TypeInfo::plain(TypeKind::Sequence {
        elem: Box::new(elem),
        fixed_len: None,
    })
}

/// Опциональная обертка
pub fn ty_opt(elem: TypeInfo) -> TypeInfo {
    TypeInfo::plain(TypeKind::Optional {
        elem: Box::new(elem),
    })
}

/// Запись с полями
pub fn ty_record(name: &str, fields: Vec<FieldDescriptor>) -> TypeInfo {
    TypeInfo::plain(TypeKind::Record {
        name: name.to_string(),
        fields,
    })
}

/// Запись со своей текстовой сериализацией (аналог типа времени)
pub fn ty_time_like() -> TypeInfo {
    let mut record = ty_record("Time", Vec::new());
    record.text_marshal = true;
    record
}

/// Итераторный тип: функция от записи с ошибкоподобным результатом
pub fn ty_iterator(record: TypeInfo) -> TypeInfo {
    TypeInfo::plain(TypeKind::Function {
        params: vec![record],
        fallible: true,
    })
}

/// Поле дескриптора с аннотациями
pub fn field(name: &str, type_info: TypeInfo, annotations: &[(&str, &[&str])]) -> FieldDescriptor {
    let mut map = IndexMap::new();
    for (key, values) in annotations {
        map.insert(
            key.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
    }
    FieldDescriptor {
        name: name.to_string(),
        type_info,
        annotations: map,
        exported: true,
        embedded: false,
        position: None,
    }
}

/// Дескриптор цели
pub fn target(name: &str, fields: Vec<FieldDescriptor>) -> TargetDescriptor {
    TargetDescriptor {
        name: name.to_string(),
        fields,
    }
}

/// Запись заказа с типовым набором колонок
pub fn order_record() -> TypeInfo {
    ty_record(
        "Order",
        vec![
            field("Id", ty_i64(), &[("sql", &["id"])]),
            field("ClientId", ty_i64(), &[("sql", &["client_id"])]),
            field("Status", ty_string(), &[("sql", &["status"])]),
            field("Total", ty_f64(), &[("sql", &["total"])]),
            field("CreatedAt", ty_time_like(), &[("sql", &["created_at", "ro"])]),
            field("Tags", ty_seq(ty_string()), &[("sql", &["tags"])]),
        ],
    )
}

/// Снимок каталога с отношениями orders и clients
pub fn sample_snapshot() -> CatalogSnapshot {
    let order_columns = vec![
        ColumnSnapshot {
            name: "id".to_string(),
            type_name: "int8".to_string(),
            not_null: true,
            has_default: true,
            primary_key: true,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "client_id".to_string(),
            type_name: "int8".to_string(),
            not_null: true,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "status".to_string(),
            type_name: "text".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "total".to_string(),
            type_name: "numeric".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "created_at".to_string(),
            type_name: "timestamp".to_string(),
            not_null: true,
            has_default: true,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "tags".to_string(),
            type_name: "_text".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 1,
        },
        ColumnSnapshot {
            name: "email".to_string(),
            type_name: "text".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "flags".to_string(),
            type_name: "int8".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "payload".to_string(),
            type_name: "jsonb".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "mood".to_string(),
            type_name: "order_mood".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "active".to_string(),
            type_name: "bool".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
    ];

    let client_columns = vec![
        ColumnSnapshot {
            name: "id".to_string(),
            type_name: "int8".to_string(),
            not_null: true,
            has_default: true,
            primary_key: true,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "name".to_string(),
            type_name: "text".to_string(),
            not_null: true,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
        ColumnSnapshot {
            name: "removed_at".to_string(),
            type_name: "timestamp".to_string(),
            not_null: false,
            has_default: false,
            primary_key: false,
            dimensions: 0,
        },
    ];

    CatalogSnapshot {
        types: vec![TypeSnapshot {
            oid: 90_001,
            name: "order_mood".to_string(),
            category: 'E',
            elem_oid: None,
        }],
        operators: Vec::new(),
        casts: Vec::new(),
        relations: vec![
            RelationSnapshot {
                schema: "public".to_string(),
                name: "orders".to_string(),
                columns: order_columns,
                constraints: vec![
                    ConstraintSnapshot {
                        name: "orders_pkey".to_string(),
                        kind: 'p',
                        deferrable: false,
                        columns: vec!["id".to_string()],
                    },
                    ConstraintSnapshot {
                        name: "orders_email_key".to_string(),
                        kind: 'u',
                        deferrable: false,
                        columns: vec!["email".to_string()],
                    },
                ],
                indexes: vec![
                    IndexSnapshot {
                        name: "orders_pkey".to_string(),
                        unique: true,
                        primary: true,
                        columns: vec!["id".to_string()],
                        definition: Some(
                            "CREATE UNIQUE INDEX orders_pkey ON public.orders USING btree (id)"
                                .to_string(),
                        ),
                    },
                    IndexSnapshot {
                        name: "orders_email_key".to_string(),
                        unique: true,
                        primary: false,
                        columns: vec!["email".to_string()],
                        definition: Some(
                            "CREATE UNIQUE INDEX orders_email_key ON public.orders \
                             USING btree (email)"
                                .to_string(),
                        ),
                    },
                    IndexSnapshot {
                        name: "orders_status_idx".to_string(),
                        unique: false,
                        primary: false,
                        columns: vec!["status".to_string()],
                        definition: Some(
                            "CREATE INDEX orders_status_idx ON public.orders \
                             USING btree (status)"
                                .to_string(),
                        ),
                    },
                ],
            },
            RelationSnapshot {
                schema: "public".to_string(),
                name: "clients".to_string(),
                columns: client_columns,
                constraints: vec![ConstraintSnapshot {
                    name: "clients_pkey".to_string(),
                    kind: 'p',
                    deferrable: false,
                    columns: vec!["id".to_string()],
                }],
                indexes: vec![IndexSnapshot {
                    name: "clients_pkey".to_string(),
                    unique: true,
                    primary: true,
                    columns: vec!["id".to_string()],
                    definition: Some(
                        "CREATE UNIQUE INDEX clients_pkey ON public.clients USING btree (id)"
                            .to_string(),
                    ),
                }],
            },
        ],
    }
}

/// Каталог из типового снимка
pub fn sample_catalog() -> SnapshotCatalog {
    sample_snapshot()
        .into_catalog("test:5432/test@test")
        .expect("sample snapshot is well-formed")
}
