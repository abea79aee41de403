use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use value::{ConstValue, Name};

/// A single row of a model.
///
/// Soft-delete state is tracked outside the attribute map so that visibility
/// filtering does not depend on the row's own column set.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub attributes: IndexMap<Name, ConstValue>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(attributes: IndexMap<Name, ConstValue>) -> Self {
        Self {
            attributes,
            deleted_at: None,
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&ConstValue> {
        self.attributes.get(key)
    }

    /// The value of the given primary-key column, `Null` if the row lacks it.
    pub fn key(&self, primary_key: &str) -> ConstValue {
        self.attributes
            .get(primary_key)
            .cloned()
            .unwrap_or(ConstValue::Null)
    }

    #[inline]
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Render the row as a GraphQL object value.
    pub fn to_value(&self) -> ConstValue {
        let mut attributes = self.attributes.clone();
        if let Some(deleted_at) = self.deleted_at {
            attributes.insert(
                Name::new("deleted_at"),
                ConstValue::String(deleted_at.to_rfc3339()),
            );
        }
        ConstValue::Object(attributes)
    }
}
