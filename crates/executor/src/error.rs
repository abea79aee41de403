use graphward_authz::AuthzError;
use graphward_store::StoreError;
use indexmap::IndexMap;
use thiserror::Error;
use value::{ConstValue, Name};

use crate::ServerError;

/// Request-time execution failures.
#[derive(Debug, Clone, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Resolver(String),

    #[error("Unknown field '{type_name}.{field_name}'.")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error("Unknown operation '{0}'.")]
    UnknownOperation(String),

    #[error("Operation name required when the document defines multiple operations.")]
    OperationNameRequired,

    #[error("Subscriptions are not supported.")]
    SubscriptionsUnsupported,
}

impl ExecuteError {
    /// Render the error for the response.
    ///
    /// A `NotFound` from the store is the same client-visible failure as one
    /// from a find lookup; both conceal how the lookup ran. Diagnostic detail
    /// beyond the category only appears in `debug` mode.
    pub fn to_server_error(&self, path: &[ConstValue], debug: bool) -> ServerError {
        let mut extensions: IndexMap<Name, ConstValue> = IndexMap::new();
        match self {
            ExecuteError::Authz(err) => {
                extensions.insert(
                    Name::new("category"),
                    ConstValue::String(err.category().to_string()),
                );
                match err {
                    AuthzError::Unauthenticated { guards } => {
                        extensions.insert(
                            Name::new("guards"),
                            ConstValue::List(
                                guards
                                    .iter()
                                    .map(|guard| ConstValue::String(guard.clone()))
                                    .collect(),
                            ),
                        );
                    }
                    AuthzError::Denied { code: Some(code), .. } => {
                        extensions.insert(Name::new("code"), ConstValue::String(code.clone()));
                    }
                    AuthzError::NotFound { model, key } if debug => {
                        extensions.insert(Name::new("model"), ConstValue::String(model.clone()));
                        extensions.insert(Name::new("key"), ConstValue::String(key.clone()));
                    }
                    _ => {}
                }
            }
            ExecuteError::Store(err) => {
                let category = match err {
                    StoreError::NotFound { .. } => "not_found",
                    _ => "internal",
                };
                extensions.insert(
                    Name::new("category"),
                    ConstValue::String(category.to_string()),
                );
                if debug {
                    extensions.insert(
                        Name::new("detail"),
                        ConstValue::String(err.to_string()),
                    );
                }
            }
            _ => {}
        }

        let message = match self {
            // Store failures are internal; their detail stays out of the
            // client message.
            ExecuteError::Store(StoreError::NotFound { model, key }) => {
                format!("No query results for model [{model}] {key}")
            }
            ExecuteError::Store(_) if !debug => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let mut error = ServerError::new(message).with_path(path.to_vec());
        if !extensions.is_empty() {
            error = error.with_extensions(ConstValue::Object(extensions));
        }
        error
    }
}
