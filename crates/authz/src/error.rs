use thiserror::Error;

/// Request-time authorization failures.
///
/// A tagged enum rather than an exception hierarchy: callers pattern-match on
/// the kind to decide the client-visible outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// None of the attempted guards produced a principal.
    #[error("Unauthenticated.")]
    Unauthenticated { guards: Vec<String> },

    /// An ability check denied the action.
    #[error("{}", .message.as_deref().unwrap_or("This action is unauthorized."))]
    Denied {
        ability: String,
        message: Option<String>,
        code: Option<String>,
    },

    /// A find lookup with fail-on-missing enabled matched no row.
    ///
    /// The message is already client-safe: it names the model and key but
    /// conceals how the lookup was performed.
    #[error("No query results for model [{model}] {key}")]
    NotFound { model: String, key: String },

    /// The configured lookup path was absent from the client arguments.
    #[error("Missing argument '{path}'.")]
    MissingArgument { path: String },
}

impl AuthzError {
    /// Machine-readable category surfaced in error extensions.
    pub fn category(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated { .. } => "authentication",
            AuthzError::Denied { .. } => "authorization",
            AuthzError::NotFound { .. } => "not_found",
            AuthzError::MissingArgument { .. } => "bad_request",
        }
    }

    /// Replace a denial with the generic unauthorized error, discarding the
    /// predicate's message and code. All other kinds pass through unchanged.
    pub fn concealed(self) -> Self {
        match self {
            AuthzError::Denied { ability, .. } => AuthzError::Denied {
                ability,
                message: None,
                code: None,
            },
            other => other,
        }
    }
}
