use std::sync::Arc;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use value::{ConstValue, Name};
use warp::test::request;

use graphward_authz::{Gate, GuardSet, Principal, TokenGuard, Verdict};
use graphward_executor::ResolverMap;
use graphward_handler::{graphql_request, App, CredentialConfig};
use graphward_schema::PolicySchema;
use graphward_store::{MemoryStore, ModelDef, Record};

const SDL: &str = r#"
    type Query {
        posts: [Post!]! @all
        post(id: ID @eq): Post @first @can(ability: "view", find: "id")
    }

    extend type Query @guard(with: ["api"]) {
        me: User @auth
    }

    type User {
        id: ID!
        name: String
    }

    type Post {
        id: ID!
        title: String
        secret: String @can(ability: "owner", root: true, action: EXCEPTION_NOT_AUTHORIZED)
    }
"#;

fn record(pairs: &[(&str, ConstValue)]) -> Record {
    let mut attributes = IndexMap::new();
    for (key, value) in pairs {
        attributes.insert(Name::new(key), value.clone());
    }
    Record::new(attributes)
}

fn test_app() -> App {
    let mut store = MemoryStore::new("default");
    store.define_model(ModelDef {
        name: "Post".to_string(),
        primary_key: "id".to_string(),
        soft_deletes: false,
    });
    store
        .insert("Post", record(&[
            ("id", ConstValue::from(1)),
            ("title", ConstValue::from("First")),
            ("author_id", ConstValue::from(1)),
            ("secret", ConstValue::from("classified")),
        ]))
        .unwrap();

    let mut gate = Gate::new();
    gate.define("view", |_, _, _| Verdict::allow());
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
            _ => Verdict::deny(),
        }
    });

    let mut guards = GuardSet::new("api");
    guards.register(Arc::new(
        TokenGuard::new("api").token("s3cr3t", Principal::new("1", "api").with_name("ada")),
    ));

    App::new(
        Arc::new(PolicySchema::parse(SDL).expect("schema builds")),
        Arc::new(store),
        Arc::new(gate),
        Arc::new(guards),
        Arc::new(ResolverMap::new()),
    )
    .with_credentials(vec![CredentialConfig::bearer("api")])
}

async fn post_query(app: &App, query: &str, token: Option<&str>) -> Value {
    let api = graphql_request(app.clone());
    let mut req = request()
        .method("POST")
        .path("/")
        .header("content-type", "application/json")
        .body(json!({ "query": query }).to_string());
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {token}"));
    }
    let resp = req.reply(&api).await;
    assert_eq!(resp.status(), warp::http::StatusCode::OK);
    serde_json::from_slice(resp.body()).expect("response is JSON")
}

#[tokio::test]
async fn an_authorized_query_returns_data() {
    let app = test_app();
    let body = post_query(&app, r#"{ post(id: "1") { id title } }"#, None).await;
    assert_eq!(body, json!({ "data": { "post": { "id": 1, "title": "First" } } }));
}

#[tokio::test]
async fn guarded_fields_require_credentials() {
    let app = test_app();

    let body = post_query(&app, "{ me { id name } }", Some("s3cr3t")).await;
    assert_eq!(
        body["data"],
        json!({ "me": { "id": "1", "name": "ada" } })
    );

    let body = post_query(&app, "{ me { id } }", None).await;
    assert_eq!(body["data"], json!({ "me": null }));
    assert_eq!(body["errors"][0]["message"], json!("Unauthenticated."));
    assert_eq!(
        body["errors"][0]["extensions"]["guards"],
        json!(["api"])
    );
}

#[tokio::test]
async fn concealed_denials_stay_generic() {
    let app = test_app();
    let body = post_query(&app, "{ posts { secret } }", None).await;
    assert_eq!(body["data"], json!({ "posts": [{ "secret": null }] }));
    assert_eq!(
        body["errors"][0]["message"],
        json!("This action is unauthorized.")
    );

    // The owner sees the field.
    let body = post_query(&app, "{ posts { secret } }", Some("s3cr3t")).await;
    assert_eq!(
        body["data"],
        json!({ "posts": [{ "secret": "classified" }] })
    );
}

#[tokio::test]
async fn a_malformed_query_is_still_a_graphql_response() {
    let app = test_app();
    let body = post_query(&app, "{ posts {", None).await;
    assert_eq!(body["data"], json!(null));
    assert!(body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse the query"));
}
