mod common;

use common::{data_json, TestApp};
use pretty_assertions::assert_eq;
use serde_json::json;

const GUARDED_SDL: &str = r#"
    type Query {
        open: String
    }

    extend type Query @guard(with: ["web", "api"]) {
        me: User @auth
    }

    type User {
        id: ID!
        name: String
    }
"#;

#[test]
fn the_first_guard_with_a_principal_wins() {
    let app = TestApp::new(GUARDED_SDL);

    // Only the second guard in the list can authenticate this request.
    let response = app.execute_with("{ me { id name } }", &[("api", "grace-token")]);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "me": { "id": "2", "name": "grace" } })
    );
}

#[test]
fn an_unauthenticated_request_reports_the_attempted_guards() {
    let app = TestApp::new(GUARDED_SDL);
    let response = app.execute("{ me { id } }");

    assert_eq!(data_json(&response), json!({ "me": null }));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Unauthenticated.");
    let extensions =
        serde_json::to_value(response.errors[0].extensions.as_ref().unwrap()).unwrap();
    assert_eq!(extensions["category"], json!("authentication"));
    assert_eq!(extensions["guards"], json!(["web", "api"]));
}

#[test]
fn guarded_fields_do_not_affect_fields_of_other_blocks() {
    let app = TestApp::new(GUARDED_SDL);
    let response = app.execute("{ open }");
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(data_json(&response), json!({ "open": null }));
}

#[test]
fn auth_resolves_through_a_named_guard() {
    let app = TestApp::new(
        r#"
        type Query {
            me: User @auth(guard: "api")
        }

        type User {
            id: ID!
            name: String
        }
        "#,
    );

    let response = app.execute_with(
        "{ me { id name } }",
        &[("web", "ada-token"), ("api", "grace-token")],
    );
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        data_json(&response),
        json!({ "me": { "id": "2", "name": "grace" } })
    );
}

#[test]
fn auth_returns_null_for_guests() {
    let app = TestApp::new(
        r#"
        type Query {
            me: User @auth
        }

        type User {
            id: ID!
        }
        "#,
    );

    let response = app.execute("{ me { id } }");
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(data_json(&response), json!({ "me": null }));
}

#[test]
fn the_guard_principal_stays_active_for_later_checks() {
    let app = TestApp::new(
        r#"
        type Query {
            posts: [Post!]!
                @guard(with: ["api"])
                @can(ability: "authenticated", query: true)
                @all
        }

        type Post {
            id: ID!
        }
        "#,
    );

    // The default guard (web) has no principal here; @guard switches to api
    // before @can resolves the current principal.
    let response = app.execute_with("{ posts { id } }", &[("api", "grace-token")]);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
}
