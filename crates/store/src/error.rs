use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Model '{0}' is not defined in the store.")]
    UnknownModel(String),

    #[error("Relation '{relation}' is not defined for model '{model}'.")]
    UnknownRelation { model: String, relation: String },

    #[error("Scope '{scope}' is not defined for model '{model}'.")]
    UnknownScope { model: String, scope: String },

    #[error("No query results for model [{model}] {key}")]
    NotFound { model: String, key: String },

    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
}
