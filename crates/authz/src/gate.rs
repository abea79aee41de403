use std::{collections::HashMap, sync::Arc};

use value::ConstValue;

use crate::{AuthzError, Principal};

/// The object an ability check applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A concrete row of a model.
    Instance { model: String, record: ConstValue },
    /// The bare model identity, for class-level checks such as "can create".
    Model(String),
}

impl Target {
    pub fn instance(model: impl Into<String>, record: ConstValue) -> Self {
        Target::Instance {
            model: model.into(),
            record,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Target::Instance { model, .. } => model,
            Target::Model(model) => model,
        }
    }

    /// The row for instance targets, `None` for class-level targets.
    pub fn record(&self) -> Option<&ConstValue> {
        match self {
            Target::Instance { record, .. } => Some(record),
            Target::Model(_) => None,
        }
    }
}

/// Outcome of one ability predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub message: Option<String>,
    pub code: Option<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: None,
            code: None,
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            message: None,
            code: None,
        }
    }

    pub fn deny_with(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            allowed: false,
            message: Some(message.into()),
            code,
        }
    }

    pub fn allow_if(condition: bool) -> Self {
        if condition {
            Self::allow()
        } else {
            Self::deny()
        }
    }
}

/// Ability predicate: `(principal, target, extra arguments) -> verdict`.
///
/// The target is always the first positional input; extra arguments follow in
/// the order the wrapper assembled them (injected client arguments before
/// static directive arguments).
pub type AbilityFn = Arc<dyn Fn(Option<&Principal>, &Target, &[ConstValue]) -> Verdict + Send + Sync>;

/// Registry of named ability predicates.
#[derive(Default, Clone)]
pub struct Gate {
    abilities: HashMap<String, AbilityFn>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under an ability name.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(Option<&Principal>, &Target, &[ConstValue]) -> Verdict + Send + Sync + 'static,
    ) {
        self.abilities.insert(name.into(), Arc::new(predicate));
    }

    /// Evaluate a single ability. An undefined ability denies.
    pub fn inspect(
        &self,
        ability: &str,
        principal: Option<&Principal>,
        target: &Target,
        extra: &[ConstValue],
    ) -> Verdict {
        match self.abilities.get(ability) {
            Some(predicate) => predicate(principal, target, extra),
            None => {
                tracing::warn!(ability, "ability is not defined, denying");
                Verdict::deny()
            }
        }
    }

    /// Evaluate abilities in order; the first denial wins and stops
    /// evaluation. All abilities must pass for the check to succeed.
    pub fn check(
        &self,
        principal: Option<&Principal>,
        abilities: &[String],
        target: &Target,
        extra: &[ConstValue],
    ) -> Result<(), AuthzError> {
        for ability in abilities {
            let verdict = self.inspect(ability, principal, target, extra);
            if !verdict.allowed {
                return Err(AuthzError::Denied {
                    ability: ability.clone(),
                    message: verdict.message,
                    code: verdict.code,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("abilities", &self.abilities.keys().collect::<Vec<_>>())
            .finish()
    }
}
