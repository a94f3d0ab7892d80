//! Структурное описание типов полей дескрипторов
//!
//! Источник дескрипторов (внешний экстрактор) передает тип каждого поля
//! в виде рекурсивной структуры: вид типа, элементные типы для
//! последовательностей/отображений/указателей и флаги возможностей
//! (чтение из колонки, запись в колонку, текстовая сериализация).

use crate::descriptor::FieldDescriptor;
use serde::{Deserialize, Serialize};

/// Вид типа поля
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Булев тип
    Bool,
    /// Целочисленный тип (bits = 0 означает платформенный размер)
    Int {
        #[serde(default)]
        bits: u8,
        #[serde(default)]
        unsigned: bool,
    },
    /// Тип с плавающей точкой
    Float { bits: u8 },
    /// Строковый тип
    String,
    /// Последовательность (срез или массив фиксированной длины)
    Sequence {
        elem: Box<TypeInfo>,
        #[serde(default)]
        fixed_len: Option<u32>,
    },
    /// Отображение ключ-значение
    Mapping {
        key: Box<TypeInfo>,
        value: Box<TypeInfo>,
    },
    /// Опциональный тип (указатель)
    Optional { elem: Box<TypeInfo> },
    /// Запись с именованными полями
    Record {
        name: String,
        #[serde(default)]
        fields: Vec<FieldDescriptor>,
    },
    /// Функциональный тип
    Function {
        #[serde(default)]
        params: Vec<TypeInfo>,
        /// Возвращает ли функция ошибкоподобный результат
        #[serde(default)]
        fallible: bool,
    },
    /// Абстрактный тип с набором методов
    Abstract {
        #[serde(default)]
        methods: Vec<AbstractMethod>,
    },
    /// Канал
    Channel,
    /// Динамический (открытый) тип
    Dynamic,
}

/// Метод абстрактного типа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractMethod {
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeInfo>,
    #[serde(default)]
    pub fallible: bool,
}

/// Полное описание типа поля
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Тип умеет сам читать значение колонки
    #[serde(default)]
    pub readable: bool,
    /// Тип умеет сам порождать значение колонки
    #[serde(default)]
    pub writable: bool,
    /// Тип поддерживает текстовую сериализацию
    #[serde(default)]
    pub text_marshal: bool,
}

impl TypeInfo {
    /// Создает описание типа без дополнительных возможностей
    pub fn plain(kind: TypeKind) -> Self {
        Self {
            kind,
            readable: false,
            writable: false,
            text_marshal: false,
        }
    }

    /// Снимает все опциональные обертки
    pub fn unwrap_optional(&self) -> &TypeInfo {
        let mut current = self;
        while let TypeKind::Optional { elem } = &current.kind {
            current = elem;
        }
        current
    }

    /// Является ли тип опциональной оберткой
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, TypeKind::Optional { .. })
    }

    /// Возвращает запись, если тип (после снятия опций) является записью
    pub fn as_record(&self) -> Option<(&str, &[FieldDescriptor])> {
        match &self.unwrap_optional().kind {
            TypeKind::Record { name, fields } => Some((name, fields)),
            _ => None,
        }
    }

    /// Возвращает элемент последовательности
    pub fn sequence_elem(&self) -> Option<&TypeInfo> {
        match &self.kind {
            TypeKind::Sequence { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Является ли тип байтом (8-битным беззнаковым целым)
    pub fn is_byte(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Int {
                bits: 8,
                unsigned: true
            }
        )
    }

    /// Является ли тип последовательностью байтов
    pub fn is_byte_sequence(&self) -> bool {
        match &self.kind {
            TypeKind::Sequence { elem, .. } => elem.is_byte(),
            _ => false,
        }
    }

    /// Сигнатура итератора: принимает ровно один аргумент-запись
    /// и возвращает ошибкоподобный результат
    ///
    /// Принимается либо функциональный тип с такой сигнатурой, либо
    /// абстрактный тип с единственным методом такой же формы.
    pub fn iterator_signature(&self) -> Option<&TypeInfo> {
        match &self.kind {
            TypeKind::Function { params, fallible } if *fallible && params.len() == 1 => {
                Some(&params[0])
            }
            TypeKind::Abstract { methods } if methods.len() == 1 => {
                let method = &methods[0];
                if method.fallible && method.params.len() == 1 {
                    Some(&method.params[0])
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Структурный ключ типа для мемоизации
    ///
    /// Два типа с одинаковым ключом порождают одинаковый список полей,
    /// поэтому ключ включает имена полей, их аннотации и формы типов.
    pub fn structural_key(&self) -> String {
        let mut out = String::new();
        self.write_structural_key(&mut out);
        out
    }

    fn write_structural_key(&self, out: &mut String) {
        match &self.kind {
            TypeKind::Bool => out.push_str("bool"),
            TypeKind::Int { bits, unsigned } => {
                out.push(if *unsigned { 'u' } else { 'i' });
                out.push_str(&bits.to_string());
            }
            TypeKind::Float { bits } => {
                out.push('f');
                out.push_str(&bits.to_string());
            }
            TypeKind::String => out.push_str("str"),
            TypeKind::Sequence { elem, fixed_len } => {
                out.push('[');
                if let Some(len) = fixed_len {
                    out.push_str(&len.to_string());
                    out.push(';');
                }
                elem.write_structural_key(out);
                out.push(']');
            }
            TypeKind::Mapping { key, value } => {
                out.push('{');
                key.write_structural_key(out);
                out.push(':');
                value.write_structural_key(out);
                out.push('}');
            }
            TypeKind::Optional { elem } => {
                out.push('?');
                elem.write_structural_key(out);
            }
            TypeKind::Record { name, fields } => {
                out.push_str("rec:");
                out.push_str(name);
                out.push('(');
                for field in fields {
                    out.push_str(&field.name);
                    if let Some(values) = field.annotations.get("sql") {
                        out.push('`');
                        out.push_str(&values.join(","));
                        out.push('`');
                    }
                    out.push('=');
                    field.type_info.write_structural_key(out);
                    out.push(';');
                }
                out.push(')');
            }
            TypeKind::Function { params, fallible } => {
                out.push_str("fn(");
                for param in params {
                    param.write_structural_key(out);
                    out.push(';');
                }
                out.push(')');
                if *fallible {
                    out.push('!');
                }
            }
            TypeKind::Abstract { methods } => {
                out.push_str("dyn(");
                for method in methods {
                    out.push_str(&method.name);
                    out.push(';');
                }
                out.push(')');
            }
            TypeKind::Channel => out.push_str("chan"),
            TypeKind::Dynamic => out.push_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> TypeInfo {
        TypeInfo::plain(TypeKind::Record {
            name: name.to_string(),
            fields: Vec::new(),
        })
    }

    #[test]
    fn test_unwrap_optional() {
        let inner = record("Order");
        let wrapped = TypeInfo::plain(TypeKind::Optional {
            elem: Box::new(TypeInfo::plain(TypeKind::Optional {
                elem: Box::new(inner.clone()),
            })),
        });

        assert_eq!(wrapped.unwrap_optional(), &inner);
    }

    #[test]
    fn test_iterator_signature_function() {
        let sig = TypeInfo::plain(TypeKind::Function {
            params: vec![record("Order")],
            fallible: true,
        });
        assert!(sig.iterator_signature().is_some());

        let not_fallible = TypeInfo::plain(TypeKind::Function {
            params: vec![record("Order")],
            fallible: false,
        });
        assert!(not_fallible.iterator_signature().is_none());

        let two_args = TypeInfo::plain(TypeKind::Function {
            params: vec![record("Order"), record("Extra")],
            fallible: true,
        });
        assert!(two_args.iterator_signature().is_none());
    }

    #[test]
    fn test_iterator_signature_abstract() {
        let sig = TypeInfo::plain(TypeKind::Abstract {
            methods: vec![AbstractMethod {
                name: "consume".to_string(),
                params: vec![record("Order")],
                fallible: true,
            }],
        });
        assert!(sig.iterator_signature().is_some());

        let two_methods = TypeInfo::plain(TypeKind::Abstract {
            methods: vec![
                AbstractMethod {
                    name: "a".to_string(),
                    params: vec![record("Order")],
                    fallible: true,
                },
                AbstractMethod {
                    name: "b".to_string(),
                    params: vec![record("Order")],
                    fallible: true,
                },
            ],
        });
        assert!(two_methods.iterator_signature().is_none());
    }

    #[test]
    fn test_byte_sequence() {
        let bytes = TypeInfo::plain(TypeKind::Sequence {
            elem: Box::new(TypeInfo::plain(TypeKind::Int {
                bits: 8,
                unsigned: true,
            })),
            fixed_len: None,
        });
        assert!(bytes.is_byte_sequence());

        let ints = TypeInfo::plain(TypeKind::Sequence {
            elem: Box::new(TypeInfo::plain(TypeKind::Int {
                bits: 64,
                unsigned: false,
            })),
            fixed_len: None,
        });
        assert!(!ints.is_byte_sequence());
    }

    #[test]
    fn test_structural_key_distinguishes_types() {
        let a = record("Order");
        let b = record("Client");
        assert_ne!(a.structural_key(), b.structural_key());
        assert_eq!(a.structural_key(), record("Order").structural_key());
    }
}
