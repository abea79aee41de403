use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use indexmap::IndexMap;
use jsonwebtoken::{jwk::JwkSet, DecodingKey};
use value::ConstValue;

use crate::{AuthzError, Credentials, Principal};

/// A named credential-resolution mechanism.
///
/// Guards are stateless: they turn the request's raw credentials into a
/// principal, or nothing. Per-request identity caching lives in
/// [`crate::AuthState`], not here.
pub trait Guard: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve the principal carried by the request credentials, if any.
    fn user(&self, credentials: &Credentials) -> Option<Principal>;

    fn id(&self, credentials: &Credentials) -> Option<String> {
        self.user(credentials).map(|principal| principal.id)
    }
}

/// The configured guards, in registration order, plus the default guard name.
pub struct GuardSet {
    guards: IndexMap<String, Arc<dyn Guard>>,
    default_guard: String,
}

impl GuardSet {
    pub fn new(default_guard: impl Into<String>) -> Self {
        Self {
            guards: IndexMap::new(),
            default_guard: default_guard.into(),
        }
    }

    pub fn register(&mut self, guard: Arc<dyn Guard>) {
        self.guards.insert(guard.name().to_string(), guard);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Guard>> {
        self.guards.get(name)
    }

    pub fn default_guard(&self) -> &str {
        &self.default_guard
    }

    /// Guard names configured, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.guards.keys().map(String::as_str)
    }

    /// Resolve the principal through the default guard, if any.
    pub fn default_user(&self, credentials: &Credentials) -> Option<Principal> {
        self.guards
            .get(&self.default_guard)
            .and_then(|guard| guard.user(credentials))
    }

    /// Try the named guards in order; the first non-null principal wins.
    ///
    /// An empty list means the default guard. Failure carries the attempted
    /// guard names for client diagnostics.
    pub fn authenticate(
        &self,
        names: &[String],
        credentials: &Credentials,
    ) -> Result<Principal, AuthzError> {
        let attempted: Vec<String> = if names.is_empty() {
            vec![self.default_guard.clone()]
        } else {
            names.to_vec()
        };
        for name in &attempted {
            let Some(guard) = self.guards.get(name) else {
                tracing::warn!(guard = %name, "guard is not configured");
                continue;
            };
            if let Some(principal) = guard.user(credentials) {
                tracing::debug!(guard = %name, principal = %principal.id, "authenticated");
                return Ok(principal);
            }
        }
        Err(AuthzError::Unauthenticated { guards: attempted })
    }
}

impl std::fmt::Debug for GuardSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardSet")
            .field("guards", &self.guards.keys().collect::<Vec<_>>())
            .field("default_guard", &self.default_guard)
            .finish()
    }
}

/// Guard backed by a static token map.
///
/// The demo and test credential source: opaque bearer tokens mapped straight
/// to principals.
pub struct TokenGuard {
    name: String,
    tokens: HashMap<String, Principal>,
}

impl TokenGuard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tokens: HashMap::new(),
        }
    }

    pub fn token(mut self, token: impl Into<String>, mut principal: Principal) -> Self {
        principal.guard = self.name.clone();
        self.tokens.insert(token.into(), principal);
        self
    }
}

impl Guard for TokenGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn user(&self, credentials: &Credentials) -> Option<Principal> {
        credentials
            .token(&self.name)
            .and_then(|token| self.tokens.get(token))
            .cloned()
    }
}

/// Guard validating JWTs against a JWKS key set.
pub struct JwtGuard {
    name: String,
    decoding_keys: HashMap<String, DecodingKey>,
}

impl JwtGuard {
    /// Fetch the JWKS document and build the decoding-key table.
    pub async fn try_new(name: impl Into<String>, jwks_url: &str) -> anyhow::Result<Self> {
        let jwks = reqwest::get(jwks_url)
            .await
            .context("failed to fetch jwks")?
            .json::<JwkSet>()
            .await
            .context("failed to decode jwks")?;

        let decoding_keys = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| {
                let res =
                    DecodingKey::from_jwk(&jwk).context("failed to create decoding key from jwk");
                jwk.common.key_id.map(|kid| res.map(|key| (kid, key)))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            name: name.into(),
            decoding_keys,
        })
    }

    pub fn from_decoding_keys(
        name: impl Into<String>,
        decoding_keys: HashMap<String, DecodingKey>,
    ) -> Self {
        Self {
            name: name.into(),
            decoding_keys,
        }
    }
}

impl Guard for JwtGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn user(&self, credentials: &Credentials) -> Option<Principal> {
        let token = credentials.token(&self.name)?;
        let header = match jsonwebtoken::decode_header(token) {
            Ok(header) => header,
            Err(err) => {
                tracing::debug!(guard = %self.name, error = %err, "jwt header rejected");
                return None;
            }
        };
        let kid = header.kid?;
        let decoding_key = self.decoding_keys.get(&kid)?;

        let data = match jsonwebtoken::decode::<serde_json::Value>(
            token,
            decoding_key,
            &jsonwebtoken::Validation::new(header.alg),
        ) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(guard = %self.name, error = %err, "jwt rejected");
                return None;
            }
        };

        let claims = ConstValue::from_json(data.claims).ok()?;
        let id = match &claims {
            ConstValue::Object(object) => match object.get("sub") {
                Some(ConstValue::String(sub)) => sub.clone(),
                Some(ConstValue::Number(sub)) => sub.to_string(),
                _ => return None,
            },
            _ => return None,
        };
        let name = match &claims {
            ConstValue::Object(object) => match object.get("name") {
                Some(ConstValue::String(name)) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        };

        let mut principal = Principal::new(id, self.name.clone()).with_claims(claims);
        principal.name = name;
        Some(principal)
    }
}
