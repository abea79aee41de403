use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use chrono::Utc;
use indexmap::IndexMap;
use value::ConstValue;

use crate::{query::Query, record::Record, StoreError};

/// Predicate backing a named scope: `(row, optional argument) -> keep`.
pub type ScopeFn = Arc<dyn Fn(&Record, Option<&ConstValue>) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDef {
    pub name: String,
    pub primary_key: String,
    pub soft_deletes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasMany,
    BelongsTo,
}

/// A named relation between two models.
///
/// `foreign_key` always names the column on the child side: for `HasMany` it
/// lives on the target model, for `BelongsTo` on the source model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: String,
    pub model: String,
    pub target: String,
    pub foreign_key: String,
    pub kind: RelationKind,
}

/// In-memory model store behind the query-builder seam.
///
/// The authorization core only ever talks to [`Query`]; the store itself is
/// the demo/test stand-in for a real database connection. The query counter
/// exists so tests can assert how many underlying queries a request issued.
pub struct MemoryStore {
    connection: String,
    models: IndexMap<String, ModelDef>,
    relations: HashMap<String, RelationDef>,
    scopes: HashMap<String, ScopeFn>,
    rows: RwLock<IndexMap<String, Vec<Record>>>,
    query_count: AtomicU64,
}

impl MemoryStore {
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            models: IndexMap::new(),
            relations: HashMap::new(),
            scopes: HashMap::new(),
            rows: RwLock::new(IndexMap::new()),
            query_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn define_model(&mut self, def: ModelDef) {
        self.rows
            .write()
            .expect("store lock poisoned")
            .entry(def.name.clone())
            .or_default();
        self.models.insert(def.name.clone(), def);
    }

    pub fn define_relation(&mut self, def: RelationDef) {
        self.relations
            .insert(format!("{}.{}", def.model, def.name), def);
    }

    pub fn define_scope(
        &mut self,
        model: &str,
        name: &str,
        scope: impl Fn(&Record, Option<&ConstValue>) -> bool + Send + Sync + 'static,
    ) {
        self.scopes
            .insert(format!("{model}.{name}"), Arc::new(scope));
    }

    pub fn model(&self, name: &str) -> Result<&ModelDef, StoreError> {
        self.models
            .get(name)
            .ok_or_else(|| StoreError::UnknownModel(name.to_string()))
    }

    pub fn relation(&self, model: &str, name: &str) -> Result<&RelationDef, StoreError> {
        self.relations
            .get(&format!("{model}.{name}"))
            .ok_or_else(|| StoreError::UnknownRelation {
                model: model.to_string(),
                relation: name.to_string(),
            })
    }

    pub fn insert(&self, model: &str, record: Record) -> Result<(), StoreError> {
        self.model(model)?;
        self.rows
            .write()
            .expect("store lock poisoned")
            .entry(model.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    /// Begin a query against one model.
    pub fn query(&self, model: &str) -> Result<Query<'_>, StoreError> {
        let def = self.model(model)?;
        Ok(Query::new(self, def.name.clone(), def.primary_key.clone()))
    }

    /// Soft-delete (or, with `force` or on models without soft deletes,
    /// remove) the row with the given key. Returns the affected row.
    pub fn delete(
        &self,
        model: &str,
        key: &ConstValue,
        force: bool,
    ) -> Result<Option<Record>, StoreError> {
        let def = self.model(model)?.clone();
        let mut rows = self.rows.write().expect("store lock poisoned");
        let table = rows.entry(def.name.clone()).or_default();
        let position = table
            .iter()
            .position(|record| crate::keys_equal(&record.key(&def.primary_key), key));
        let Some(position) = position else {
            return Ok(None);
        };
        if force || !def.soft_deletes {
            Ok(Some(table.remove(position)))
        } else {
            table[position].deleted_at = Some(Utc::now());
            Ok(Some(table[position].clone()))
        }
    }

    /// Clear the soft-delete marker on the row with the given key.
    pub fn restore(&self, model: &str, key: &ConstValue) -> Result<Option<Record>, StoreError> {
        let def = self.model(model)?.clone();
        let mut rows = self.rows.write().expect("store lock poisoned");
        let table = rows.entry(def.name.clone()).or_default();
        for record in table.iter_mut() {
            if crate::keys_equal(&record.key(&def.primary_key), key) {
                record.deleted_at = None;
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    pub fn queries_issued(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// One full pass over a model's rows; the unit the query counter counts.
    pub(crate) fn scan(
        &self,
        model: &str,
        mut keep: impl FnMut(&Record) -> Result<bool, StoreError>,
    ) -> Result<Vec<Record>, StoreError> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(model, "store scan");
        let rows = self.rows.read().expect("store lock poisoned");
        let mut matched = Vec::new();
        for record in rows.get(model).into_iter().flatten() {
            if keep(record)? {
                matched.push(record.clone());
            }
        }
        Ok(matched)
    }

    pub(crate) fn apply_scope(
        &self,
        model: &str,
        name: &str,
        record: &Record,
        argument: Option<&ConstValue>,
    ) -> Result<bool, StoreError> {
        let scope = self
            .scopes
            .get(&format!("{model}.{name}"))
            .ok_or_else(|| StoreError::UnknownScope {
                model: model.to_string(),
                scope: name.to_string(),
            })?;
        Ok(scope(record, argument))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("connection", &self.connection)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
