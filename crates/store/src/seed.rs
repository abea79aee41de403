use chrono::{DateTime, Utc};
use serde::Deserialize;
use value::ConstValue;

use crate::{
    store::{MemoryStore, ModelDef, RelationDef, RelationKind},
    Record, StoreError,
};

/// JSON seed document loaded by the gateway binary.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub models: Vec<SeedModel>,
}

#[derive(Debug, Deserialize)]
pub struct SeedModel {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub soft_deletes: bool,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub relations: Vec<SeedRelation>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRelation {
    pub name: String,
    pub kind: SeedRelationKind,
    pub target: String,
    pub foreign_key: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedRelationKind {
    HasMany,
    BelongsTo,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl MemoryStore {
    /// Build a store from a seed document.
    pub fn from_seed(connection: impl Into<String>, seed: SeedData) -> Result<Self, StoreError> {
        let mut store = MemoryStore::new(connection);
        for model in &seed.models {
            store.define_model(ModelDef {
                name: model.name.clone(),
                primary_key: model.primary_key.clone(),
                soft_deletes: model.soft_deletes,
            });
            for relation in &model.relations {
                store.define_relation(RelationDef {
                    name: relation.name.clone(),
                    model: model.name.clone(),
                    target: relation.target.clone(),
                    foreign_key: relation.foreign_key.clone(),
                    kind: match relation.kind {
                        SeedRelationKind::HasMany => RelationKind::HasMany,
                        SeedRelationKind::BelongsTo => RelationKind::BelongsTo,
                    },
                });
            }
        }
        for model in seed.models {
            for row in model.rows {
                store.insert(&model.name, record_from_json(&model.name, row)?)?;
            }
        }
        Ok(store)
    }
}

fn record_from_json(model: &str, row: serde_json::Value) -> Result<Record, StoreError> {
    let value = ConstValue::from_json(row)
        .map_err(|err| StoreError::InvalidSeed(format!("row of '{model}': {err}")))?;
    let ConstValue::Object(mut attributes) = value else {
        return Err(StoreError::InvalidSeed(format!(
            "row of '{model}' is not an object"
        )));
    };
    let deleted_at = match attributes.shift_remove("deleted_at") {
        Some(ConstValue::String(raw)) => Some(
            raw.parse::<DateTime<Utc>>()
                .map_err(|err| StoreError::InvalidSeed(format!("deleted_at of '{model}': {err}")))?,
        ),
        Some(ConstValue::Null) | None => None,
        Some(other) => {
            return Err(StoreError::InvalidSeed(format!(
                "deleted_at of '{model}' must be a timestamp string, got {other}"
            )))
        }
    };
    let mut record = Record::new(attributes);
    record.deleted_at = deleted_at;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_round_trip() {
        let seed: SeedData = serde_json::from_str(
            r#"{
                "models": [
                    {
                        "name": "Post",
                        "soft_deletes": true,
                        "relations": [
                            {"name": "author", "kind": "belongsTo", "target": "User", "foreign_key": "author_id"}
                        ],
                        "rows": [
                            {"id": 1, "title": "First", "author_id": 1},
                            {"id": 2, "title": "Gone", "author_id": 1, "deleted_at": "2024-03-01T00:00:00Z"}
                        ]
                    },
                    {"name": "User", "rows": [{"id": 1, "name": "ada"}]}
                ]
            }"#,
        )
        .unwrap();

        let store = MemoryStore::from_seed("default", seed).unwrap();
        assert_eq!(store.query("Post").unwrap().get().unwrap().len(), 1);
        assert_eq!(
            store.query("Post").unwrap().with_trashed().get().unwrap().len(),
            2
        );
        let relation = store.relation("Post", "author").unwrap();
        assert_eq!(relation.target, "User");
    }
}
