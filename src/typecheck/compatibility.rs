//! Таблица совместимости типов колонок и типов приложения
//!
//! Двунаправленное отображение: для каждой пары (тип колонки, форма
//! типа приложения) заданы имена процедур преобразования на запись и
//! на чтение. Пустое имя означает, что преобразование не требуется.
//! Таблица строится один раз при старте процесса и далее неизменяема.

use crate::catalog::oid::{self, Oid};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;

/// Процедуры преобразования для пары типов
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Conversion {
    /// Процедура на стороне записи (valuer)
    pub valuer: String,
    /// Процедура на стороне чтения (scanner)
    pub scanner: String,
}

impl Conversion {
    fn new(valuer: &str, scanner: &str) -> Self {
        Self {
            valuer: valuer.to_string(),
            scanner: scanner.to_string(),
        }
    }

    /// Пара проходит без преобразования
    pub fn is_passthrough(&self) -> bool {
        self.valuer.is_empty() && self.scanner.is_empty()
    }
}

/// Ключ таблицы: тип колонки и флаг одноэлементного значения
type TableKey = (Oid, bool);

lazy_static! {
    /// Предвычисленная таблица совместимости
    static ref COMPATIBILITY_TABLE: HashMap<TableKey, HashMap<&'static str, Conversion>> =
        build_table();
}

/// Ищет преобразование для пары (тип колонки, форма приложения)
pub fn lookup(column_type: Oid, length_one: bool, shape: &str) -> Option<Conversion> {
    COMPATIBILITY_TABLE
        .get(&(column_type, length_one))
        .and_then(|shapes| shapes.get(shape))
        .cloned()
}

fn build_table() -> HashMap<TableKey, HashMap<&'static str, Conversion>> {
    let mut table: HashMap<TableKey, HashMap<&'static str, Conversion>> = HashMap::new();

    let mut add = |column: Oid, length_one: bool, shape: &'static str, valuer: &str, scanner: &str| {
        table
            .entry((column, length_one))
            .or_default()
            .insert(shape, Conversion::new(valuer, scanner));
    };

    // Булев тип
    add(oid::BOOL, false, "bool", "", "");

    // Целочисленные типы: расширение выполняет драйвер
    add(oid::INT2, false, "i16", "", "");
    add(oid::INT2, false, "i32", "", "");
    add(oid::INT2, false, "i64", "", "");
    add(oid::INT4, false, "i16", "", "");
    add(oid::INT4, false, "i32", "", "");
    add(oid::INT4, false, "i64", "", "");
    add(oid::INT4, false, "u32", "encode_uint32", "decode_uint32");
    add(oid::INT8, false, "i16", "", "");
    add(oid::INT8, false, "i32", "", "");
    add(oid::INT8, false, "i64", "", "");
    add(oid::INT8, false, "u32", "", "");
    add(oid::INT8, false, "u64", "encode_uint64", "decode_uint64");

    // Типы с плавающей точкой
    add(oid::FLOAT4, false, "f32", "", "");
    add(oid::FLOAT4, false, "f64", "", "");
    add(oid::FLOAT8, false, "f32", "", "");
    add(oid::FLOAT8, false, "f64", "", "");

    // Строковые типы
    add(oid::TEXT, false, "str", "", "");
    add(oid::TEXT, false, "bytes", "", "");
    add(oid::TEXT, false, "text", "encode_text_marshal", "decode_text_marshal");
    add(oid::BPCHAR, false, "str", "", "");
    add(oid::VARCHAR, false, "str", "", "");
    add(oid::VARCHAR, false, "bytes", "", "");

    // Байтовые данные
    add(oid::BYTEA, false, "bytes", "", "");
    add(oid::BYTEA, false, "str", "encode_text_bytes", "decode_bytes_text");

    // Дата и время
    add(oid::DATE, false, "str", "encode_date_text", "decode_date_text");
    add(oid::DATE, false, "text", "encode_text_marshal", "decode_text_marshal");
    add(oid::TIME, false, "str", "encode_time_text", "decode_time_text");
    add(oid::TIME, false, "text", "encode_text_marshal", "decode_text_marshal");
    add(
        oid::TIMESTAMP,
        false,
        "str",
        "encode_timestamp_text",
        "decode_timestamp_text",
    );
    add(
        oid::TIMESTAMP,
        false,
        "text",
        "encode_text_marshal",
        "decode_text_marshal",
    );
    add(
        oid::TIMESTAMP,
        false,
        "i64",
        "encode_unix_seconds",
        "decode_unix_seconds",
    );
    add(
        oid::TIMESTAMPTZ,
        false,
        "str",
        "encode_timestamp_text",
        "decode_timestamp_text",
    );
    add(
        oid::TIMESTAMPTZ,
        false,
        "text",
        "encode_text_marshal",
        "decode_text_marshal",
    );
    add(
        oid::TIMESTAMPTZ,
        false,
        "i64",
        "encode_unix_seconds",
        "decode_unix_seconds",
    );
    add(
        oid::INTERVAL,
        false,
        "i64",
        "encode_interval_micros",
        "decode_interval_micros",
    );
    add(oid::INTERVAL, false, "str", "encode_interval_text", "decode_interval_text");

    // Числовой тип произвольной точности
    add(oid::NUMERIC, false, "str", "", "");
    add(oid::NUMERIC, false, "i64", "", "");
    add(
        oid::NUMERIC,
        false,
        "f64",
        "encode_numeric_float",
        "decode_numeric_float",
    );

    // UUID
    add(oid::UUID, false, "str", "encode_uuid_text", "decode_uuid_text");
    add(oid::UUID, false, "bytes", "encode_uuid_bytes", "decode_uuid_bytes");
    add(oid::UUID, false, "text", "encode_text_marshal", "decode_text_marshal");

    // JSON
    for json in [oid::JSON, oid::JSONB] {
        add(json, false, "str", "", "");
        add(json, false, "bytes", "", "");
        add(json, false, "any", "encode_json", "decode_json");
        add(json, false, "{str:str}", "encode_json", "decode_json");
        add(json, false, "{str:any}", "encode_json", "decode_json");
    }

    // Нетипизированный литерал
    add(oid::UNKNOWN, false, "str", "", "");

    // Массивы: значение приложения является срезом
    add(oid::BOOL_ARRAY, false, "[bool]", "encode_bool_array", "decode_bool_array");
    add(oid::BYTEA_ARRAY, false, "[bytes]", "encode_bytea_array", "decode_bytea_array");
    add(oid::INT2_ARRAY, false, "[i16]", "encode_int2_array", "decode_int2_array");
    add(oid::INT4_ARRAY, false, "[i16]", "encode_int4_array", "decode_int4_array");
    add(oid::INT4_ARRAY, false, "[i32]", "encode_int4_array", "decode_int4_array");
    add(oid::INT4_ARRAY, false, "[i64]", "encode_int4_array", "decode_int4_array");
    add(oid::INT8_ARRAY, false, "[i32]", "encode_int8_array", "decode_int8_array");
    add(oid::INT8_ARRAY, false, "[i64]", "encode_int8_array", "decode_int8_array");
    add(oid::TEXT_ARRAY, false, "[str]", "encode_text_array", "decode_text_array");
    add(
        oid::VARCHAR_ARRAY,
        false,
        "[str]",
        "encode_text_array",
        "decode_text_array",
    );
    add(
        oid::FLOAT4_ARRAY,
        false,
        "[f32]",
        "encode_float4_array",
        "decode_float4_array",
    );
    add(
        oid::FLOAT8_ARRAY,
        false,
        "[f64]",
        "encode_float8_array",
        "decode_float8_array",
    );
    add(
        oid::NUMERIC_ARRAY,
        false,
        "[str]",
        "encode_numeric_array",
        "decode_numeric_array",
    );
    add(oid::UUID_ARRAY, false, "[str]", "encode_uuid_array", "decode_uuid_array");
    add(
        oid::TIMESTAMP_ARRAY,
        false,
        "[str]",
        "encode_timestamp_array",
        "decode_timestamp_array",
    );

    // Одноэлементные значения в массивных колонках
    add(oid::TEXT_ARRAY, true, "str", "encode_array_one", "decode_array_one");
    add(oid::INT4_ARRAY, true, "i32", "encode_array_one", "decode_array_one");
    add(oid::INT8_ARRAY, true, "i64", "encode_array_one", "decode_array_one");
    add(oid::UUID_ARRAY, true, "str", "encode_uuid_array_one", "decode_uuid_array_one");

    table
}
