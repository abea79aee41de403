#![forbid(unsafe_code)]

pub use error::StoreError;
pub use query::{keys_equal, Filter, Query, TrashedMode};
pub use record::Record;
pub use seed::{SeedData, SeedModel, SeedRelation, SeedRelationKind};
pub use store::{MemoryStore, ModelDef, RelationDef, RelationKind, ScopeFn};

mod error;
mod query;
mod record;
mod seed;
mod store;
