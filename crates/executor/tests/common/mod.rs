#![allow(dead_code)]

use std::sync::Arc;

use indexmap::IndexMap;
use value::{ConstValue, Name};

use graphward_authz::{Credentials, Gate, GuardSet, Principal, TokenGuard, Verdict};
use graphward_executor::{Executor, Request, RequestContext, Response, ResolverMap};
use graphward_schema::PolicySchema;
use graphward_store::{MemoryStore, ModelDef, Record, RelationDef, RelationKind};

pub fn record(pairs: &[(&str, ConstValue)]) -> Record {
    let mut attributes = IndexMap::new();
    for (key, value) in pairs {
        attributes.insert(Name::new(key), value.clone());
    }
    Record::new(attributes)
}

/// Two users and three posts, with the `User.posts` / `Post.author`
/// relations and a `published` scope on posts.
pub fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new("default");
    store.define_model(ModelDef {
        name: "User".to_string(),
        primary_key: "id".to_string(),
        soft_deletes: false,
    });
    store.define_model(ModelDef {
        name: "Post".to_string(),
        primary_key: "id".to_string(),
        soft_deletes: true,
    });
    store.define_relation(RelationDef {
        name: "posts".to_string(),
        model: "User".to_string(),
        target: "Post".to_string(),
        foreign_key: "author_id".to_string(),
        kind: RelationKind::HasMany,
    });
    store.define_relation(RelationDef {
        name: "author".to_string(),
        model: "Post".to_string(),
        target: "User".to_string(),
        foreign_key: "author_id".to_string(),
        kind: RelationKind::BelongsTo,
    });
    store.define_scope("Post", "published", |record, _| {
        record.get("published") == Some(&ConstValue::Boolean(true))
    });

    store
        .insert("User", record(&[
            ("id", ConstValue::from(1)),
            ("name", ConstValue::from("ada")),
        ]))
        .unwrap();
    store
        .insert("User", record(&[
            ("id", ConstValue::from(2)),
            ("name", ConstValue::from("grace")),
        ]))
        .unwrap();

    store
        .insert("Post", record(&[
            ("id", ConstValue::from(1)),
            ("author_id", ConstValue::from(1)),
            ("title", ConstValue::from("First")),
            ("published", ConstValue::Boolean(true)),
        ]))
        .unwrap();
    store
        .insert("Post", record(&[
            ("id", ConstValue::from(2)),
            ("author_id", ConstValue::from(1)),
            ("title", ConstValue::from("Draft")),
            ("published", ConstValue::Boolean(false)),
        ]))
        .unwrap();
    store
        .insert("Post", record(&[
            ("id", ConstValue::from(3)),
            ("author_id", ConstValue::from(2)),
            ("title", ConstValue::from("Third")),
            ("published", ConstValue::Boolean(true)),
        ]))
        .unwrap();

    store
}

pub fn default_gate() -> Gate {
    let mut gate = Gate::new();
    gate.define("always", |_, _, _| Verdict::allow());
    gate.define("never", |_, _, _| {
        Verdict::deny_with("Denied by policy.", Some("POLICY".to_string()))
    });
    gate.define("authenticated", |principal, _, _| {
        Verdict::allow_if(principal.is_some())
    });
    gate.define("owner", |principal, target, _| {
        let Some(principal) = principal else {
            return Verdict::deny();
        };
        let owner = target.record().and_then(|row| match row {
            ConstValue::Object(object) => object.get("author_id"),
            _ => None,
        });
        match owner {
            Some(ConstValue::Number(id)) => Verdict::allow_if(id.to_string() == principal.id),
            Some(ConstValue::String(id)) => Verdict::allow_if(*id == principal.id),
            _ => Verdict::deny(),
        }
    });
    gate
}

/// `web` guard knows ada (id 1), `api` guard knows grace (id 2).
pub fn default_guards() -> GuardSet {
    let mut guards = GuardSet::new("web");
    guards.register(Arc::new(
        TokenGuard::new("web").token("ada-token", Principal::new("1", "web").with_name("ada")),
    ));
    guards.register(Arc::new(
        TokenGuard::new("api").token("grace-token", Principal::new("2", "api").with_name("grace")),
    ));
    guards
}

pub struct TestApp {
    pub schema: Arc<PolicySchema>,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<Gate>,
    pub guards: Arc<GuardSet>,
    pub resolvers: Arc<ResolverMap>,
}

impl TestApp {
    pub fn new(sdl: &str) -> Self {
        Self {
            schema: Arc::new(PolicySchema::parse(sdl).expect("schema builds")),
            store: Arc::new(seeded_store()),
            gate: Arc::new(default_gate()),
            guards: Arc::new(default_guards()),
            resolvers: Arc::new(ResolverMap::new()),
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn with_resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers = Arc::new(resolvers);
        self
    }

    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Execute as a guest.
    pub fn execute(&self, query: &str) -> Response {
        self.execute_with(query, &[])
    }

    /// Execute with the given `(guard, token)` credentials.
    pub fn execute_with(&self, query: &str, tokens: &[(&str, &str)]) -> Response {
        let mut credentials = Credentials::default();
        for (guard, token) in tokens {
            credentials.insert(*guard, *token);
        }
        let ctx = RequestContext::new(
            self.schema.clone(),
            self.store.clone(),
            self.gate.clone(),
            self.guards.clone(),
            self.resolvers.clone(),
        )
        .with_credentials(credentials);
        Executor::new(ctx).execute(&Request::new(query))
    }
}

pub fn data_json(response: &Response) -> serde_json::Value {
    serde_json::to_value(&response.data).expect("data serializes")
}
