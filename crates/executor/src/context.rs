use std::sync::{Arc, Mutex};

use graphward_authz::{AuthState, Credentials, Gate, GuardSet, Principal};
use graphward_schema::PolicySchema;
use graphward_store::MemoryStore;

use crate::{batch::BatchRegistry, resolver::ResolverMap};

/// Everything one request's resolution needs, passed in explicitly.
///
/// The gate, guards, store, and resolver map are constructor parameters, not
/// ambient lookups; nothing in the pipeline reaches for global state. The
/// batch registry and principal cache are the only mutable pieces, and both
/// die with the request.
pub struct RequestContext {
    pub schema: Arc<PolicySchema>,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<Gate>,
    pub guards: Arc<GuardSet>,
    pub resolvers: Arc<ResolverMap>,
    pub credentials: Credentials,
    pub auth: AuthState,
    pub batches: Mutex<BatchRegistry>,
    pub debug: bool,
}

impl RequestContext {
    pub fn new(
        schema: Arc<PolicySchema>,
        store: Arc<MemoryStore>,
        gate: Arc<Gate>,
        guards: Arc<GuardSet>,
        resolvers: Arc<ResolverMap>,
    ) -> Self {
        Self {
            schema,
            store,
            gate,
            guards,
            resolvers,
            credentials: Credentials::default(),
            auth: AuthState::new(),
            batches: Mutex::new(BatchRegistry::new()),
            debug: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The current principal, resolved through the default guard on first
    /// access and cached for the rest of the request.
    pub fn current_principal(&self) -> Option<Principal> {
        self.auth
            .current_or_resolve(|| self.guards.default_user(&self.credentials))
    }
}
