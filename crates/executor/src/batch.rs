use indexmap::IndexMap;
use value::{ConstValue, Name};

use graphward_store::{
    keys_equal, MemoryStore, Query, RelationDef, RelationKind, TrashedMode,
};

use crate::{ExecuteError, Lazy};

/// The constraint set a relation load applies, part of the batch identity.
///
/// Two loads are combinable into one query iff their relation, constraint
/// fingerprint, connection, and pagination window all match; differing
/// constraints must never merge, even for the same relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationConstraints {
    pub filters: Vec<(String, ConstValue)>,
    pub scopes: Vec<(String, Option<ConstValue>)>,
    pub trashed: TrashedMode,
}

impl RelationConstraints {
    /// Deterministic textual identity of this constraint set.
    pub fn fingerprint(&self) -> String {
        let mut parts = Vec::new();
        for (key, value) in &self.filters {
            parts.push(format!("eq:{key}={value}"));
        }
        for (name, argument) in &self.scopes {
            match argument {
                Some(argument) => parts.push(format!("scope:{name}({argument})")),
                None => parts.push(format!("scope:{name}")),
            }
        }
        parts.push(format!("trashed:{:?}", self.trashed));
        parts.join(";")
    }

    pub fn apply<'a>(&self, mut query: Query<'a>) -> Query<'a> {
        for (key, value) in &self.filters {
            query = query.where_eq(key.clone(), value.clone());
        }
        for (name, argument) in &self.scopes {
            query = query.scope(name.clone(), argument.clone());
        }
        query.trashed_mode(self.trashed)
    }
}

/// Identity of one pending batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub connection: String,
    /// `Model.relation`.
    pub relation: String,
    pub constraints: String,
    /// `(per_page, page)` when the load is paginated.
    pub page: Option<(u64, u64)>,
}

struct PendingLoad {
    /// The parent's primary key for `HasMany`, the held foreign-key value
    /// for `BelongsTo`.
    parent_key: ConstValue,
    lazy: Lazy,
}

struct Batch {
    relation: RelationDef,
    constraints: RelationConstraints,
    page: Option<(u64, u64)>,
    pending: Vec<PendingLoad>,
}

/// Per-request registry of pending relation batches.
///
/// At most one pending batch exists per key; the executor flushes the
/// registry exactly once per tick, before any deferred value is read.
/// Batches never span connections: the connection is part of the key, so
/// loads against a different store fall back to their own query.
#[derive(Default)]
pub struct BatchRegistry {
    batches: IndexMap<BatchKey, Batch>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Queue one parent's relation load and hand back its deferred value.
    pub fn defer(
        &mut self,
        connection: &str,
        relation: &RelationDef,
        constraints: RelationConstraints,
        page: Option<(u64, u64)>,
        parent_key: ConstValue,
    ) -> Lazy {
        let key = BatchKey {
            connection: connection.to_string(),
            relation: format!("{}.{}", relation.model, relation.name),
            constraints: constraints.fingerprint(),
            page,
        };
        let batch = self.batches.entry(key).or_insert_with(|| Batch {
            relation: relation.clone(),
            constraints,
            page,
            pending: Vec::new(),
        });
        let lazy = Lazy::new();
        batch.pending.push(PendingLoad {
            parent_key,
            lazy: lazy.clone(),
        });
        lazy
    }

    /// Issue one query per pending batch and resolve every deferred value.
    pub fn flush(&mut self, store: &MemoryStore) {
        let batches = std::mem::take(&mut self.batches);
        for (key, batch) in batches {
            tracing::debug!(
                relation = %key.relation,
                pending = batch.pending.len(),
                "flushing relation batch"
            );
            match run_batch(store, &batch) {
                Ok(values) => {
                    for (load, value) in batch.pending.into_iter().zip(values) {
                        load.lazy.set(Ok(value));
                    }
                }
                Err(err) => {
                    for load in batch.pending {
                        load.lazy.set(Err(err.clone()));
                    }
                }
            }
        }
    }
}

/// One unioned fetch for the whole batch, partitioned back per parent.
fn run_batch(store: &MemoryStore, batch: &Batch) -> Result<Vec<ConstValue>, ExecuteError> {
    let relation = &batch.relation;
    let keys: Vec<ConstValue> = batch
        .pending
        .iter()
        .map(|load| load.parent_key.clone())
        .collect();

    match relation.kind {
        RelationKind::HasMany => {
            let rows = batch
                .constraints
                .apply(store.query(&relation.target)?)
                .where_in(relation.foreign_key.clone(), keys)
                .get()?;
            Ok(batch
                .pending
                .iter()
                .map(|load| {
                    let mine: Vec<ConstValue> = rows
                        .iter()
                        .filter(|row| {
                            row.get(&relation.foreign_key)
                                .map(|value| keys_equal(value, &load.parent_key))
                                .unwrap_or(false)
                        })
                        .map(|row| row.to_value())
                        .collect();
                    match batch.page {
                        Some((per_page, page)) => paginate(mine, per_page, page),
                        None => ConstValue::List(mine),
                    }
                })
                .collect())
        }
        RelationKind::BelongsTo => {
            let primary_key = store.model(&relation.target)?.primary_key.clone();
            let rows = batch
                .constraints
                .apply(store.query(&relation.target)?)
                .where_in(primary_key.clone(), keys)
                .get()?;
            Ok(batch
                .pending
                .iter()
                .map(|load| {
                    rows.iter()
                        .find(|row| keys_equal(&row.key(&primary_key), &load.parent_key))
                        .map(|row| row.to_value())
                        .unwrap_or(ConstValue::Null)
                })
                .collect())
        }
    }
}

/// Slice one parent's rows to the requested window and wrap them with
/// pagination metadata.
fn paginate(rows: Vec<ConstValue>, per_page: u64, page: u64) -> ConstValue {
    let total = rows.len() as u64;
    let start = per_page.saturating_mul(page.saturating_sub(1)) as usize;
    let data: Vec<ConstValue> = rows
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    let mut info = IndexMap::new();
    info.insert(Name::new("count"), ConstValue::from(data.len() as u64));
    info.insert(Name::new("currentPage"), ConstValue::from(page));
    info.insert(Name::new("perPage"), ConstValue::from(per_page));
    info.insert(Name::new("total"), ConstValue::from(total));

    let mut wrapper = IndexMap::new();
    wrapper.insert(Name::new("data"), ConstValue::List(data));
    wrapper.insert(Name::new("paginatorInfo"), ConstValue::Object(info));
    ConstValue::Object(wrapper)
}
