//! Модель каталога одной базы данных
//!
//! Таблицы типов, операторов, приведений и процедур заполняются один
//! раз при открытии соединения и далее неизменяемы. Отношения
//! подгружаются лениво по первому обращению; их карта защищена
//! блокировкой чтения-записи. Модели кэшируются на процесс по ключу
//! идентичности соединения.

use crate::catalog::oid::Oid;
use crate::catalog::relation::{Cast, CastContext, Operator, PgType, Procedure, Relation};
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

lazy_static! {
    /// Процессный реестр моделей каталога по ключу соединения
    static ref GLOBAL_REGISTRY: CatalogRegistry = CatalogRegistry::new();
}

/// Модель каталога одного соединения
pub struct CatalogModel {
    key: String,
    types: HashMap<Oid, PgType>,
    operators: HashMap<(Oid, Oid, String), Operator>,
    casts: HashMap<(Oid, Oid), Cast>,
    procedures: HashMap<String, Vec<Procedure>>,
    relations: RwLock<HashMap<String, Arc<Relation>>>,
}

impl CatalogModel {
    /// Создает модель из загруженных таблиц каталога
    pub fn new(
        key: String,
        types: Vec<PgType>,
        operators: Vec<Operator>,
        casts: Vec<Cast>,
        procedures: Vec<Procedure>,
    ) -> Self {
        let types = types.into_iter().map(|t| (t.oid, t)).collect();
        let operators = operators
            .into_iter()
            .map(|o| ((o.left, o.right, o.name.clone()), o))
            .collect();
        let casts = casts.into_iter().map(|c| ((c.source, c.target), c)).collect();
        let mut procedure_map: HashMap<String, Vec<Procedure>> = HashMap::new();
        for procedure in procedures {
            procedure_map
                .entry(procedure.name.clone())
                .or_default()
                .push(procedure);
        }
        Self {
            key,
            types,
            operators,
            casts,
            procedures: procedure_map,
            relations: RwLock::new(HashMap::new()),
        }
    }

    /// Ключ идентичности соединения
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Тип по идентификатору
    pub fn type_info(&self, oid: Oid) -> Option<&PgType> {
        self.types.get(&oid)
    }

    /// Тип по имени
    pub fn type_by_name(&self, name: &str) -> Option<&PgType> {
        self.types.values().find(|t| t.name == name)
    }

    /// Оператор по типам операндов и имени
    pub fn operator(&self, left: Oid, right: Oid, name: &str) -> Option<&Operator> {
        self.operators.get(&(left, right, name.to_string()))
    }

    /// Неявное приведение между типами
    pub fn implicit_cast(&self, source: Oid, target: Oid) -> Option<&Cast> {
        self.casts
            .get(&(source, target))
            .filter(|c| c.context == CastContext::Implicit)
    }

    /// Процедуры с данным именем
    pub fn procedures(&self, name: &str) -> &[Procedure] {
        self.procedures.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Закэшированное отношение по полному имени
    pub fn cached_relation(&self, qualified_name: &str) -> Option<Arc<Relation>> {
        self.relations
            .read()
            .expect("relation map lock poisoned")
            .get(qualified_name)
            .map(Arc::clone)
    }

    /// Сохраняет отношение в карте
    ///
    /// Заполнение идет под эксклюзивной блокировкой; параллельная
    /// загрузка того же отношения оставляет первый экземпляр.
    pub fn store_relation(&self, qualified_name: String, relation: Arc<Relation>) -> Arc<Relation> {
        let mut relations = self.relations.write().expect("relation map lock poisoned");
        Arc::clone(relations.entry(qualified_name).or_insert(relation))
    }

    /// Количество закэшированных отношений
    pub fn cached_relation_count(&self) -> usize {
        self.relations
            .read()
            .expect("relation map lock poisoned")
            .len()
    }
}

/// Реестр моделей каталога
///
/// Тесты строят изолированные реестры; процесс использует глобальный.
pub struct CatalogRegistry {
    models: DashMap<String, Arc<CatalogModel>>,
}

impl CatalogRegistry {
    /// Создает пустой реестр
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
        }
    }

    /// Глобальный процессный реестр
    pub fn global() -> &'static CatalogRegistry {
        &GLOBAL_REGISTRY
    }

    /// Возвращает модель по ключу соединения
    pub fn get(&self, key: &str) -> Option<Arc<CatalogModel>> {
        self.models.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Регистрирует модель, возвращая уже существующую при гонке
    pub fn insert(&self, model: Arc<CatalogModel>) -> Arc<CatalogModel> {
        let entry = self
            .models
            .entry(model.key().to_string())
            .or_insert_with(|| Arc::clone(&model));
        Arc::clone(entry.value())
    }

    /// Удаляет модель из реестра
    pub fn remove(&self, key: &str) {
        self.models.remove(key);
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}
