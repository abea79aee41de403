use value::ConstValue;

use crate::{record::Record, store::MemoryStore, StoreError};

/// Soft-delete visibility of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedMode {
    /// Exclude soft-deleted rows.
    #[default]
    Default,
    /// Include soft-deleted rows.
    With,
    /// Only soft-deleted rows.
    Only,
}

impl TrashedMode {
    fn admits(self, record: &Record) -> bool {
        match self {
            TrashedMode::Default => !record.is_trashed(),
            TrashedMode::With => true,
            TrashedMode::Only => record.is_trashed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, ConstValue),
    In(String, Vec<ConstValue>),
}

/// Compare two key values the way clients supply them: `ID` arguments may
/// arrive as strings or numbers and must match either representation.
pub fn keys_equal(a: &ConstValue, b: &ConstValue) -> bool {
    if a == b {
        return true;
    }
    let text = |v: &ConstValue| match v {
        ConstValue::String(s) => Some(s.clone()),
        ConstValue::Number(n) => Some(n.to_string()),
        _ => None,
    };
    matches!((text(a), text(b)), (Some(a), Some(b)) if a == b)
}

/// An equality-filtered scan over one model.
///
/// Every terminal method issues exactly one underlying query against the
/// store, which the store counts; batching correctness is asserted through
/// that counter.
pub struct Query<'a> {
    store: &'a MemoryStore,
    model: String,
    primary_key: String,
    filters: Vec<Filter>,
    scopes: Vec<(String, Option<ConstValue>)>,
    trashed: TrashedMode,
}

impl<'a> Query<'a> {
    pub(crate) fn new(store: &'a MemoryStore, model: String, primary_key: String) -> Self {
        Self {
            store,
            model,
            primary_key,
            filters: Vec::new(),
            scopes: Vec::new(),
            trashed: TrashedMode::Default,
        }
    }

    pub fn where_eq(mut self, key: impl Into<String>, value: ConstValue) -> Self {
        self.filters.push(Filter::Eq(key.into(), value));
        self
    }

    pub fn where_in(mut self, key: impl Into<String>, values: Vec<ConstValue>) -> Self {
        self.filters.push(Filter::In(key.into(), values));
        self
    }

    /// Apply a named scope registered on the model.
    pub fn scope(mut self, name: impl Into<String>, argument: Option<ConstValue>) -> Self {
        self.scopes.push((name.into(), argument));
        self
    }

    pub fn with_trashed(self) -> Self {
        self.trashed_mode(TrashedMode::With)
    }

    pub fn only_trashed(self) -> Self {
        self.trashed_mode(TrashedMode::Only)
    }

    pub fn trashed_mode(mut self, mode: TrashedMode) -> Self {
        self.trashed = mode;
        self
    }

    /// Execute the query and return all matching rows.
    pub fn get(self) -> Result<Vec<Record>, StoreError> {
        let Query {
            store,
            model,
            filters,
            scopes,
            trashed,
            ..
        } = self;
        store.scan(&model, |record| {
            if !trashed.admits(record) {
                return Ok(false);
            }
            for filter in &filters {
                let matched = match filter {
                    Filter::Eq(key, value) => record
                        .get(key)
                        .map(|attr| keys_equal(attr, value))
                        .unwrap_or(false),
                    Filter::In(key, values) => record
                        .get(key)
                        .map(|attr| values.iter().any(|value| keys_equal(attr, value)))
                        .unwrap_or(false),
                };
                if !matched {
                    return Ok(false);
                }
            }
            for (name, argument) in &scopes {
                if !store.apply_scope(&model, name, record, argument.as_ref())? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    pub fn first(self) -> Result<Option<Record>, StoreError> {
        Ok(self.get()?.into_iter().next())
    }

    /// Look a single row up by primary key.
    pub fn find(self, key: &ConstValue) -> Result<Option<Record>, StoreError> {
        let primary_key = self.primary_key.clone();
        Ok(self
            .get()?
            .into_iter()
            .find(|record| keys_equal(&record.key(&primary_key), key)))
    }

    /// Like [`Query::find`], but a missing row is an error.
    pub fn find_or_fail(self, key: &ConstValue) -> Result<Record, StoreError> {
        let model = self.model.clone();
        self.find(key)?.ok_or_else(|| StoreError::NotFound {
            model,
            key: display_key(key),
        })
    }

    /// Look up many rows by primary key; missing keys are skipped.
    pub fn find_many(self, keys: &[ConstValue]) -> Result<Vec<Record>, StoreError> {
        let primary_key = self.primary_key.clone();
        Ok(self
            .get()?
            .into_iter()
            .filter(|record| {
                let record_key = record.key(&primary_key);
                keys.iter().any(|key| keys_equal(&record_key, key))
            })
            .collect())
    }
}

pub(crate) fn display_key(key: &ConstValue) -> String {
    match key {
        ConstValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use value::{ConstValue, Name};

    use super::*;
    use crate::store::{MemoryStore, ModelDef};

    fn row(pairs: &[(&str, ConstValue)]) -> Record {
        let mut attributes = IndexMap::new();
        for (key, val) in pairs {
            attributes.insert(Name::new(key), val.clone());
        }
        Record::new(attributes)
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new("default");
        store.define_model(ModelDef {
            name: "Post".to_string(),
            primary_key: "id".to_string(),
            soft_deletes: true,
        });
        store.define_scope("Post", "published", |record, _| {
            record.get("published") == Some(&ConstValue::Boolean(true))
        });
        store
            .insert("Post", row(&[
                ("id", ConstValue::from(1)),
                ("author_id", ConstValue::from(1)),
                ("published", ConstValue::Boolean(true)),
            ]))
            .unwrap();
        store
            .insert("Post", row(&[
                ("id", ConstValue::from(2)),
                ("author_id", ConstValue::from(2)),
                ("published", ConstValue::Boolean(false)),
            ]))
            .unwrap();
        store
    }

    #[test]
    fn keys_match_across_representations() {
        assert!(keys_equal(
            &ConstValue::from(1),
            &ConstValue::String("1".to_string())
        ));
        assert!(!keys_equal(
            &ConstValue::from(1),
            &ConstValue::String("2".to_string())
        ));
    }

    #[test]
    fn where_eq_filters_rows() {
        let store = store();
        let rows = store
            .query("Post")
            .unwrap()
            .where_eq("author_id", ConstValue::from(1))
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key("id"), ConstValue::from(1));
    }

    #[test]
    fn scopes_apply_and_unknown_scope_errors() {
        let store = store();
        let rows = store
            .query("Post")
            .unwrap()
            .scope("published", None)
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = store
            .query("Post")
            .unwrap()
            .scope("missing", None)
            .get()
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownScope { .. }));
    }

    #[test]
    fn trashed_modes_control_visibility() {
        let store = store();
        store.delete("Post", &ConstValue::from(1), false).unwrap();

        assert_eq!(store.query("Post").unwrap().get().unwrap().len(), 1);
        assert_eq!(
            store.query("Post").unwrap().with_trashed().get().unwrap().len(),
            2
        );
        let only = store.query("Post").unwrap().only_trashed().get().unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].key("id"), ConstValue::from(1));
    }

    #[test]
    fn find_or_fail_reports_the_missing_key() {
        let store = store();
        let err = store
            .query("Post")
            .unwrap()
            .find_or_fail(&ConstValue::from(99))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No query results for model [Post] 99"
        );
    }

    #[test]
    fn each_terminal_counts_one_query() {
        let store = store();
        assert_eq!(store.queries_issued(), 0);
        store.query("Post").unwrap().get().unwrap();
        store
            .query("Post")
            .unwrap()
            .find(&ConstValue::from(1))
            .unwrap();
        assert_eq!(store.queries_issued(), 2);
    }
}
