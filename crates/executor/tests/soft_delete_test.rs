mod common;

use common::{data_json, TestApp};
use pretty_assertions::assert_eq;
use serde_json::json;

const SDL: &str = r#"
    type Query {
        posts: [Post!]! @all
        trashed: [Post!]! @all @onlyTrashed
    }

    type Mutation {
        deletePost(id: ID!): Post
            @can(ability: "owner", find: "id")
            @delete
        forceDeletePost(id: ID!): Post
            @can(ability: "owner", find: "id")
            @forceDelete
        restorePost(id: ID!): Post
            @can(ability: "owner", find: "id")
            @restore
    }

    type Post {
        id: ID!
        title: String
    }
"#;

#[test]
fn delete_soft_deletes_and_restore_brings_the_row_back() {
    let app = TestApp::new(SDL);
    let ada = [("web", "ada-token")];

    let response = app.execute_with(r#"mutation { deletePost(id: "1") { id } }"#, &ada);
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(data_json(&response), json!({ "deletePost": { "id": 1 } }));

    let response = app.execute_with("{ posts { id } }", &ada);
    assert_eq!(
        data_json(&response),
        json!({ "posts": [{ "id": 2 }, { "id": 3 }] })
    );
    let response = app.execute_with("{ trashed { id } }", &ada);
    assert_eq!(data_json(&response), json!({ "trashed": [{ "id": 1 }] }));

    // `@restore` restricts its find lookup to trashed rows, so the check
    // sees the soft-deleted row and the resolver revives it.
    let response = app.execute_with(r#"mutation { restorePost(id: "1") { id } }"#, &ada);
    assert!(response.is_ok(), "errors: {:?}", response.errors);

    let response = app.execute_with("{ posts { id } }", &ada);
    assert_eq!(
        data_json(&response),
        json!({ "posts": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] })
    );
}

#[test]
fn restore_cannot_find_a_live_row() {
    let app = TestApp::new(SDL);
    let response = app.execute_with(
        r#"mutation { restorePost(id: "1") { id } }"#,
        &[("web", "ada-token")],
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "No query results for model [Post] 1"
    );
}

#[test]
fn force_delete_finds_an_already_trashed_row() {
    let app = TestApp::new(SDL);
    let ada = [("web", "ada-token")];

    app.execute_with(r#"mutation { deletePost(id: "2") { id } }"#, &ada);

    // The `@forceDelete` lookup includes trashed rows, so authorization
    // still sees the row before it is removed for good.
    let response = app.execute_with(r#"mutation { forceDeletePost(id: "2") { id } }"#, &ada);
    assert!(response.is_ok(), "errors: {:?}", response.errors);

    let response = app.execute_with("{ trashed { id } }", &ada);
    assert_eq!(data_json(&response), json!({ "trashed": [] }));
}

#[test]
fn deleting_someone_elses_post_is_denied_before_the_write() {
    let app = TestApp::new(SDL);

    // Post 3 belongs to grace; ada may not delete it.
    let response = app.execute_with(
        r#"mutation { deletePost(id: "3") { id } }"#,
        &[("web", "ada-token")],
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "This action is unauthorized.");

    // The row is still there.
    let response = app.execute_with("{ posts { id } }", &[("web", "ada-token")]);
    let posts = data_json(&response);
    assert_eq!(posts["posts"].as_array().unwrap().len(), 3);
}
