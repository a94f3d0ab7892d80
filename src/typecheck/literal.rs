//! Структурный отпечаток типа поля
//!
//! Отпечаток не зависит от именованных оберток и служит ключом
//! таблицы совместимости. Источником истины для правил отпечатка
//! является сама таблица: формы генерируются под ее ключи.

use crate::catalog::oid::{self, Oid};
use crate::descriptor::{TypeInfo, TypeKind};

/// Вычисляет структурный отпечаток типа
///
/// Опциональные обертки прозрачны; последовательность байтов дает
/// форму `bytes`; записи и абстрактные типы с текстовой
/// сериализацией дают форму `text`.
pub fn literal_shape(type_info: &TypeInfo) -> String {
    let base = type_info.unwrap_optional();
    match &base.kind {
        TypeKind::Bool => "bool".to_string(),
        TypeKind::Int { bits, unsigned } => {
            let bits = if *bits == 0 { 64 } else { *bits };
            if *unsigned {
                format!("u{}", bits)
            } else {
                format!("i{}", bits)
            }
        }
        TypeKind::Float { bits } => {
            let bits = if *bits == 0 { 64 } else { *bits };
            format!("f{}", bits)
        }
        TypeKind::String => "str".to_string(),
        TypeKind::Sequence { elem, .. } => {
            if elem.is_byte() {
                "bytes".to_string()
            } else {
                format!("[{}]", literal_shape(elem))
            }
        }
        TypeKind::Mapping { key, value } => {
            format!("{{{}:{}}}", literal_shape(key), literal_shape(value))
        }
        TypeKind::Record { name, .. } => {
            if base.text_marshal {
                "text".to_string()
            } else {
                format!("rec:{}", name)
            }
        }
        TypeKind::Dynamic => "any".to_string(),
        TypeKind::Abstract { .. } => {
            if base.text_marshal {
                "text".to_string()
            } else {
                "dyn".to_string()
            }
        }
        TypeKind::Function { .. } => "fn".to_string(),
        TypeKind::Channel => "chan".to_string(),
        TypeKind::Optional { .. } => unreachable!("optional wrappers are unwrapped above"),
    }
}

/// Естественный тип каталога для формы отпечатка
///
/// Используется при проверке сравнимости операндов предикатов;
/// форма без естественного типа считается нетипизированной.
pub fn natural_oid(type_info: &TypeInfo) -> Option<Oid> {
    let base = type_info.unwrap_optional();
    match &base.kind {
        TypeKind::Bool => Some(oid::BOOL),
        TypeKind::Int { bits, unsigned: _ } => match bits {
            16 => Some(oid::INT2),
            32 => Some(oid::INT4),
            _ => Some(oid::INT8),
        },
        TypeKind::Float { bits } => match bits {
            32 => Some(oid::FLOAT4),
            _ => Some(oid::FLOAT8),
        },
        TypeKind::String => Some(oid::TEXT),
        TypeKind::Sequence { elem, .. } => {
            if elem.is_byte() {
                return Some(oid::BYTEA);
            }
            match natural_oid(elem)? {
                oid::BOOL => Some(oid::BOOL_ARRAY),
                oid::INT2 => Some(oid::INT2_ARRAY),
                oid::INT4 => Some(oid::INT4_ARRAY),
                oid::INT8 => Some(oid::INT8_ARRAY),
                oid::TEXT => Some(oid::TEXT_ARRAY),
                oid::FLOAT4 => Some(oid::FLOAT4_ARRAY),
                oid::FLOAT8 => Some(oid::FLOAT8_ARRAY),
                oid::BYTEA => Some(oid::BYTEA_ARRAY),
                _ => None,
            }
        }
        TypeKind::Record { .. } | TypeKind::Abstract { .. } => {
            if base.text_marshal {
                Some(oid::TEXT)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Естественный тип элемента последовательности
pub fn natural_element_oid(type_info: &TypeInfo) -> Option<Oid> {
    let base = type_info.unwrap_optional();
    match &base.kind {
        TypeKind::Sequence { elem, .. } => natural_oid(elem),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeInfo;

    fn seq(elem: TypeInfo) -> TypeInfo {
        TypeInfo::plain(TypeKind::Sequence {
            elem: Box::new(elem),
            fixed_len: None,
        })
    }

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(literal_shape(&TypeInfo::plain(TypeKind::String)), "str");
        assert_eq!(
            literal_shape(&TypeInfo::plain(TypeKind::Int {
                bits: 64,
                unsigned: false
            })),
            "i64"
        );
        assert_eq!(
            literal_shape(&TypeInfo::plain(TypeKind::Float { bits: 32 })),
            "f32"
        );
    }

    #[test]
    fn test_optional_is_transparent() {
        let optional = TypeInfo::plain(TypeKind::Optional {
            elem: Box::new(TypeInfo::plain(TypeKind::String)),
        });
        assert_eq!(literal_shape(&optional), "str");
    }

    #[test]
    fn test_byte_sequence_shape() {
        let bytes = seq(TypeInfo::plain(TypeKind::Int {
            bits: 8,
            unsigned: true,
        }));
        assert_eq!(literal_shape(&bytes), "bytes");
        assert_eq!(natural_oid(&bytes), Some(oid::BYTEA));
    }

    #[test]
    fn test_sequence_and_mapping_shapes() {
        let ints = seq(TypeInfo::plain(TypeKind::Int {
            bits: 64,
            unsigned: false,
        }));
        assert_eq!(literal_shape(&ints), "[i64]");
        assert_eq!(natural_oid(&ints), Some(oid::INT8_ARRAY));

        let map = TypeInfo::plain(TypeKind::Mapping {
            key: Box::new(TypeInfo::plain(TypeKind::String)),
            value: Box::new(TypeInfo::plain(TypeKind::String)),
        });
        assert_eq!(literal_shape(&map), "{str:str}");
    }

    #[test]
    fn test_text_marshal_record() {
        let mut time_like = TypeInfo::plain(TypeKind::Record {
            name: "Time".to_string(),
            fields: Vec::new(),
        });
        time_like.text_marshal = true;
        assert_eq!(literal_shape(&time_like), "text");
        assert_eq!(natural_oid(&time_like), Some(oid::TEXT));

        let plain_record = TypeInfo::plain(TypeKind::Record {
            name: "Custom".to_string(),
            fields: Vec::new(),
        });
        assert_eq!(literal_shape(&plain_record), "rec:Custom");
        assert_eq!(natural_oid(&plain_record), None);
    }
}
