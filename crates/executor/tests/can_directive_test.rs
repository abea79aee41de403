mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use common::{data_json, default_gate, TestApp};
use graphward_authz::Verdict;
use graphward_executor::{Resolved, ResolverMap};
use pretty_assertions::assert_eq;
use serde_json::json;
use value::ConstValue;

const FIND_SDL: &str = r#"
    type Query {
        post(id: ID @eq): Post @first @can(ability: "always", find: "id")
    }

    type Post {
        id: ID!
        title: String
    }
"#;

#[test]
fn root_target_delivers_the_resolver_value_unchanged() {
    let app = TestApp::new(
        r#"
        type Query {
            posts(author: ID @eq(key: "author_id")): [Post!]! @all
        }

        type Post {
            id: ID!
            title: String @can(ability: "owner", root: true)
        }
        "#,
    );

    let response = app.execute_with(
        r#"{ posts(author: "1") { title } }"#,
        &[("web", "ada-token")],
    );
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "posts": [{ "title": "First" }, { "title": "Draft" }] })
    );
}

#[test]
fn root_target_denies_other_peoples_rows() {
    let app = TestApp::new(
        r#"
        type Query {
            posts(author: ID @eq(key: "author_id")): [Post!]! @all
        }

        type Post {
            id: ID!
            title: String @can(ability: "owner", root: true)
        }
        "#,
    );

    let response = app.execute_with(
        r#"{ posts(author: "2") { title } }"#,
        &[("web", "ada-token")],
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        data_json(&response),
        json!({ "posts": [{ "title": null }] })
    );
}

#[test]
fn find_lookup_authorizes_then_resolves() {
    let app = TestApp::new(FIND_SDL);
    let response = app.execute(r#"{ post(id: "1") { id title } }"#);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "post": { "id": 1, "title": "First" } })
    );
}

#[test]
fn find_lookup_with_a_missing_row_reports_not_found() {
    let app = TestApp::new(FIND_SDL);
    let response = app.execute(r#"{ post(id: "99") { id } }"#);

    assert_eq!(data_json(&response), json!({ "post": null }));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "No query results for model [Post] 99"
    );
    assert_eq!(
        response.errors[0].path,
        vec![ConstValue::String("post".to_string())]
    );
}

#[test]
fn find_or_fail_disabled_still_runs_the_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut resolvers = ResolverMap::new();
    {
        let calls = calls.clone();
        resolvers.register("Query", "post", move |_params| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Resolved::Value(ConstValue::Null))
        });
    }

    let app = TestApp::new(
        r#"
        type Query {
            post(id: ID): Post @can(ability: "always", find: "id", findOrFail: false)
        }

        type Post {
            id: ID!
        }
        "#,
    )
    .with_resolvers(resolvers);

    let response = app.execute(r#"{ post(id: "99") { id } }"#);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(data_json(&response), json!({ "post": null }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_find_argument_is_a_client_error() {
    let app = TestApp::new(FIND_SDL);
    let response = app.execute("{ post { id } }");
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Missing argument 'id'.");
}

#[test]
fn injected_arguments_precede_static_arguments() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut gate = default_gate();
    {
        let seen = seen.clone();
        gate.define("capture", move |_, _, extra| {
            seen.lock().unwrap().push(extra.to_vec());
            Verdict::allow()
        });
    }

    let app = TestApp::new(
        r#"
        type Query {
            posts(author: ID @eq(key: "author_id")): [Post!]!
                @all
                @can(ability: "capture", query: true, injectArgs: true, args: ["editorial", 3])
        }

        type Post {
            id: ID!
        }
        "#,
    )
    .with_gate(gate);

    let response = app.execute(r#"{ posts(author: "2") { id } }"#);
    assert!(response.is_ok(), "errors: {:?}", response.errors);

    let captured = seen.lock().unwrap();
    // One target row for author 2, checked once.
    assert_eq!(captured.len(), 1);
    let extra = &captured[0];
    assert_eq!(extra.len(), 3);
    assert_eq!(
        serde_json::to_value(&extra[0]).unwrap(),
        json!({ "author": "2" })
    );
    assert_eq!(extra[1], ConstValue::from("editorial"));
    assert_eq!(extra[2], ConstValue::from(3));
}

#[test]
fn model_target_checks_the_bare_model_identity() {
    let targets = Arc::new(Mutex::new(Vec::new()));
    let mut gate = default_gate();
    {
        let targets = targets.clone();
        gate.define("create-post", move |principal, target, _| {
            targets.lock().unwrap().push(target.clone());
            Verdict::allow_if(principal.is_some())
        });
    }

    let mut resolvers = ResolverMap::new();
    resolvers.register("Mutation", "createPost", |params| {
        let title = params
            .args
            .get("title")
            .cloned()
            .unwrap_or(ConstValue::Null);
        let mut object = indexmap::IndexMap::new();
        object.insert(value::Name::new("id"), ConstValue::from(99));
        object.insert(value::Name::new("title"), title);
        Ok(Resolved::Value(ConstValue::Object(object)))
    });

    let app = TestApp::new(
        r#"
        type Query {
            ok: Boolean
        }

        type Mutation {
            createPost(title: String!): Post @can(ability: "create-post", model: "Post")
        }

        type Post {
            id: ID!
            title: String
        }
        "#,
    )
    .with_gate(gate)
    .with_resolvers(resolvers);

    let response = app.execute_with(
        r#"mutation { createPost(title: "New") { id title } }"#,
        &[("web", "ada-token")],
    );
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "createPost": { "id": 99, "title": "New" } })
    );

    let targets = targets.lock().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].model(), "Post");
    assert!(targets[0].record().is_none());

    // A guest is denied before the resolver runs.
    let response = TestApp::new(
        r#"
        type Query {
            ok: Boolean
        }

        type Mutation {
            createPost(title: String!): Post @can(ability: "authenticated", model: "Post")
        }

        type Post {
            id: ID!
        }
        "#,
    )
    .execute(r#"mutation { createPost(title: "New") { id } }"#);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "This action is unauthorized.");
}

#[test]
fn query_target_checks_every_matching_row() {
    let checked = Arc::new(AtomicUsize::new(0));
    let mut gate = default_gate();
    {
        let checked = checked.clone();
        gate.define("count", move |_, _, _| {
            checked.fetch_add(1, Ordering::SeqCst);
            Verdict::allow()
        });
    }

    let app = TestApp::new(
        r#"
        type Query {
            posts: [Post!]! @all @can(ability: "count", query: true, scopes: ["published"])
        }

        type Post {
            id: ID!
        }
        "#,
    )
    .with_gate(gate);

    let response = app.execute("{ posts { id } }");
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    // Two published posts in the seed data.
    assert_eq!(checked.load(Ordering::SeqCst), 2);
}
