use std::{collections::HashMap, sync::RwLock};

use value::{ConstValue, Name};

/// An authenticated identity resolved by a guard, or absent for guests.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: String,
    pub name: Option<String>,
    /// Opaque claims carried by the credential (always an object value).
    pub claims: ConstValue,
    /// Name of the guard that resolved this principal.
    pub guard: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            claims: ConstValue::Object(Default::default()),
            guard: guard.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_claims(mut self, claims: ConstValue) -> Self {
        self.claims = claims;
        self
    }

    /// Render the principal as a GraphQL object: `id`, `name`, then claims.
    pub fn to_value(&self) -> ConstValue {
        let mut object = indexmap::IndexMap::new();
        object.insert(Name::new("id"), ConstValue::String(self.id.clone()));
        if let Some(name) = &self.name {
            object.insert(Name::new("name"), ConstValue::String(name.clone()));
        }
        if let ConstValue::Object(claims) = &self.claims {
            for (key, val) in claims {
                object.entry(key.clone()).or_insert_with(|| val.clone());
            }
        }
        ConstValue::Object(object)
    }
}

/// Raw credentials extracted from the transport, keyed by guard name.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    tokens: HashMap<String, String>,
}

impl Credentials {
    pub fn insert(&mut self, guard: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(guard.into(), token.into());
    }

    pub fn token(&self, guard: &str) -> Option<&str> {
        self.tokens.get(guard).map(String::as_str)
    }
}

/// Per-request principal cache.
///
/// The current principal is resolved at most once per request through the
/// default guard; a guard directive overwrites it for the remainder of the
/// request. Nothing here survives the request.
#[derive(Debug, Default)]
pub struct AuthState {
    // Outer None: not yet resolved. Inner None: resolved as guest.
    current: RwLock<Option<Option<Principal>>>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached principal, resolving through `resolve` on first access.
    pub fn current_or_resolve(
        &self,
        resolve: impl FnOnce() -> Option<Principal>,
    ) -> Option<Principal> {
        if let Some(resolved) = self.current.read().expect("auth state poisoned").as_ref() {
            return resolved.clone();
        }
        let mut slot = self.current.write().expect("auth state poisoned");
        if slot.is_none() {
            *slot = Some(resolve());
        }
        slot.as_ref().and_then(|resolved| resolved.clone())
    }

    /// Install a principal (or a guest) as the active identity.
    pub fn set_user(&self, principal: Option<Principal>) {
        *self.current.write().expect("auth state poisoned") = Some(principal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_happens_once() {
        let state = AuthState::new();
        let mut calls = 0;
        let first = state.current_or_resolve(|| {
            calls += 1;
            Some(Principal::new("1", "web"))
        });
        assert_eq!(first.map(|p| p.id), Some("1".to_string()));

        let second = state.current_or_resolve(|| {
            calls += 1;
            None
        });
        assert_eq!(second.map(|p| p.id), Some("1".to_string()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn set_user_overrides_the_cache() {
        let state = AuthState::new();
        state.set_user(None);
        assert!(state
            .current_or_resolve(|| Some(Principal::new("1", "web")))
            .is_none());

        state.set_user(Some(Principal::new("2", "api")));
        let current = state.current_or_resolve(|| None);
        assert_eq!(current.map(|p| p.guard), Some("api".to_string()));
    }
}
