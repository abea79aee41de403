mod common;

use common::{data_json, TestApp};
use graphward_executor::ResolverMap;
use pretty_assertions::assert_eq;
use serde_json::json;
use value::ConstValue;

#[test]
fn return_value_substitutes_the_literal_on_denial() {
    let app = TestApp::new(
        r#"
        type Query {
            posts(author: ID @eq(key: "author_id")): [Post!]! @all
        }

        type Post {
            id: ID!
            title: String
                @can(ability: "never", root: true, action: RETURN_VALUE, returnValue: "REDACTED")
        }
        "#,
    );

    let response = app.execute(r#"{ posts(author: "1") { title } }"#);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "posts": [{ "title": "REDACTED" }, { "title": "REDACTED" }] })
    );
}

#[test]
fn return_value_swallows_resolver_failures_too() {
    let mut resolvers = ResolverMap::new();
    resolvers.register("Query", "fragile", |_params| {
        Err(graphward_executor::ExecuteError::Resolver(
            "downstream exploded".to_string(),
        ))
    });

    let app = TestApp::new(
        r#"
        type Query {
            fragile: Post
                @can(ability: "always", model: "Post", action: RETURN_VALUE, returnValue: null)
        }

        type Post {
            id: ID
        }
        "#,
    )
    .with_resolvers(resolvers);

    let response = app.execute("{ fragile { id } }");
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(data_json(&response), json!({ "fragile": null }));
}

#[test]
fn conceal_discards_the_predicate_message_and_code() {
    let app = TestApp::new(
        r#"
        type Query {
            posts: [Post!]! @all
        }

        type Post {
            id: ID!
            title: String
                @can(ability: "never", root: true, action: EXCEPTION_NOT_AUTHORIZED)
        }
        "#,
    );

    let response = app.execute("{ posts { title } }");
    assert_eq!(response.errors.len(), 3);
    for error in &response.errors {
        assert_eq!(error.message, "This action is unauthorized.");
        let extensions = serde_json::to_value(error.extensions.as_ref().unwrap()).unwrap();
        assert_eq!(extensions["category"], json!("authorization"));
        assert!(extensions.get("code").is_none());
    }
}

#[test]
fn conceal_does_not_mask_unrelated_resolver_failures() {
    let mut resolvers = ResolverMap::new();
    resolvers.register("Query", "fragile", |_params| {
        Err(graphward_executor::ExecuteError::Resolver(
            "downstream exploded".to_string(),
        ))
    });

    let app = TestApp::new(
        r#"
        type Query {
            fragile: Post
                @can(ability: "always", model: "Post", action: EXCEPTION_NOT_AUTHORIZED)
        }

        type Post {
            id: ID
        }
        "#,
    )
    .with_resolvers(resolvers);

    let response = app.execute("{ fragile { id } }");
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "downstream exploded");
}

#[test]
fn propagate_carries_the_predicate_message_and_code() {
    let app = TestApp::new(
        r#"
        type Query {
            posts: [Post!]! @all
        }

        type Post {
            id: ID!
            title: String @can(ability: "never", root: true)
        }
        "#,
    );

    let response = app.execute("{ posts { id title } }");
    assert_eq!(response.errors.len(), 3);
    assert_eq!(response.errors[0].message, "Denied by policy.");
    let extensions =
        serde_json::to_value(response.errors[0].extensions.as_ref().unwrap()).unwrap();
    assert_eq!(extensions["code"], json!("POLICY"));
    assert_eq!(
        response.errors[0].path,
        vec![
            ConstValue::String("posts".to_string()),
            ConstValue::from(0u64),
            ConstValue::String("title".to_string()),
        ]
    );
}
