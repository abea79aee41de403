use std::sync::Arc;

use graphward_authz::{Gate, GuardSet};
use graphward_executor::ResolverMap;
use graphward_schema::PolicySchema;
use graphward_store::MemoryStore;

use crate::auth::CredentialConfig;

/// Everything the GraphQL endpoint needs to serve one request.
///
/// Built once at startup; each request derives its own context from it.
#[derive(Clone)]
pub struct App {
    pub schema: Arc<PolicySchema>,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<Gate>,
    pub guards: Arc<GuardSet>,
    pub resolvers: Arc<ResolverMap>,
    pub credentials: Arc<Vec<CredentialConfig>>,
    pub debug: bool,
}

impl App {
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
            credentials: Arc::new(Vec::new()),
            debug: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Vec<CredentialConfig>) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
