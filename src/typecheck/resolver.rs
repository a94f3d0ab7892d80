//! Разрешение совместимости типов
//!
//! Для чтения и записи: поиск пары (тип колонки, форма типа
//! приложения) в таблице совместимости с запасными путями через
//! текстовые ключи. Для предикатов: проверка наличия оператора
//! сравнения в каталоге с учетом неявных приведений.

use crate::catalog::model::CatalogModel;
use crate::catalog::oid::{self, Oid};
use crate::catalog::relation::{Column, TypeCategory};
use crate::descriptor::{TypeInfo, TypeKind};
use crate::typecheck::compatibility::{lookup, Conversion};
use crate::typecheck::literal::literal_shape;

/// Разрешитель совместимости поверх модели каталога
pub struct CompatibilityResolver<'a> {
    model: &'a CatalogModel,
}

impl<'a> CompatibilityResolver<'a> {
    /// Создает разрешитель для модели каталога
    pub fn new(model: &'a CatalogModel) -> Self {
        Self { model }
    }

    /// Определяет процедуры чтения и записи для пары поле-колонка
    ///
    /// `None` означает несовместимую пару: после прямого поиска
    /// пробуются текстовый ключ для строковых и массивных категорий
    /// и текстовое представление для перечислений.
    pub fn resolve(&self, column: &Column, app: &TypeInfo) -> Option<Conversion> {
        let base = app.unwrap_optional();

        // Тип с собственными возможностями чтения и записи проходит как есть
        if base.readable && base.writable {
            return Some(Conversion::default());
        }

        let (shape, length_one) = match &base.kind {
            TypeKind::Sequence { elem, fixed_len } if *fixed_len == Some(1) => {
                (literal_shape(elem), true)
            }
            _ => (literal_shape(base), false),
        };

        let mut found = lookup(column.type_oid, length_one, &shape);

        if found.is_none() {
            // Запасной путь 1: строковые и массивные категории через текст
            match self.category(column.type_oid) {
                Some(TypeCategory::String) => {
                    found = lookup(oid::TEXT, length_one, &shape);
                }
                Some(TypeCategory::Array) => {
                    found = lookup(oid::TEXT_ARRAY, length_one, &shape);
                }
                // Запасной путь 2: перечисления читаются и пишутся как текст
                Some(TypeCategory::Enum) => {
                    found = lookup(oid::TEXT, length_one, &shape);
                }
                _ => {}
            }
        }

        let mut conversion = found?;
        // Собственная возможность типа снимает преобразование своей стороны
        if base.readable {
            conversion.scanner = String::new();
        }
        if base.writable {
            conversion.valuer = String::new();
        }
        Some(conversion)
    }

    /// Проверяет сравнимость типов операндов для оператора
    ///
    /// Совпадающие типы и строковый левый операнд против
    /// нетипизированного правого принимаются без поиска оператора.
    /// При прямом промахе пробуются неявные приведения в обе стороны
    /// с повторной проверкой оператора на типе цели приведения.
    pub fn comparable(&self, left: Oid, right: Oid, operator: &str) -> bool {
        if left == right {
            return true;
        }
        if right == oid::UNKNOWN && self.category(left) == Some(TypeCategory::String) {
            return true;
        }
        if self.model.operator(left, right, operator).is_some() {
            return true;
        }
        if let Some(cast) = self.model.implicit_cast(left, right) {
            if self
                .model
                .operator(cast.target, cast.target, operator)
                .is_some()
            {
                return true;
            }
        }
        if let Some(cast) = self.model.implicit_cast(right, left) {
            if self
                .model
                .operator(cast.target, cast.target, operator)
                .is_some()
            {
                return true;
            }
        }
        false
    }

    /// Тип элемента массивного типа каталога
    ///
    /// Квантифицированные предикаты сначала разворачивают правый
    /// операнд до типа элемента; не-массив является ошибкой на
    /// стороне вызывающего.
    pub fn element_oid(&self, array_oid: Oid) -> Option<Oid> {
        self.model
            .type_info(array_oid)
            .filter(|t| t.category == TypeCategory::Array)
            .and_then(|t| t.elem_oid)
    }

    /// Категория типа каталога
    pub fn category(&self, type_oid: Oid) -> Option<TypeCategory> {
        self.model.type_info(type_oid).map(|t| t.category)
    }

    /// Имя типа каталога для сообщений об ошибках
    pub fn type_name(&self, type_oid: Oid) -> String {
        self.model
            .type_info(type_oid)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("oid {}", type_oid))
    }
}
