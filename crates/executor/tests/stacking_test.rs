mod common;

use std::sync::{Arc, Mutex};

use common::{default_gate, TestApp};
use graphward_authz::Verdict;
use graphward_executor::{Resolved, ResolverMap};
use pretty_assertions::assert_eq;

fn logging_gate(log: Arc<Mutex<Vec<String>>>, deny: &'static str) -> graphward_authz::Gate {
    let mut gate = default_gate();
    for ability in ["outer", "inner"] {
        let log = log.clone();
        gate.define(ability, move |_, _, _| {
            log.lock().unwrap().push(ability.to_string());
            Verdict::allow_if(ability != deny)
        });
    }
    gate
}

const STACKED_SDL: &str = r#"
    type Query {
        post: Post
            @can(ability: "outer", model: "Post")
            @can(ability: "inner", model: "Post")
    }

    type Post {
        id: ID
    }
"#;

/// Declaration order is check order: the first declared directive is the
/// outermost wrapper and its checks run first.
#[test]
fn declaration_order_is_check_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut resolvers = ResolverMap::new();
    {
        let log = log.clone();
        resolvers.register("Query", "post", move |_params| {
            log.lock().unwrap().push("resolve".to_string());
            Ok(Resolved::Value(value::ConstValue::Null))
        });
    }

    let app = TestApp::new(STACKED_SDL)
        .with_gate(logging_gate(log.clone(), ""))
        .with_resolvers(resolvers);

    let response = app.execute("{ post { id } }");
    assert!(response.is_ok(), "errors: {:?}", response.errors);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer".to_string(), "inner".to_string(), "resolve".to_string()]
    );
}

#[test]
fn an_outer_denial_stops_inner_checks_and_the_resolver() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut resolvers = ResolverMap::new();
    {
        let log = log.clone();
        resolvers.register("Query", "post", move |_params| {
            log.lock().unwrap().push("resolve".to_string());
            Ok(Resolved::Value(value::ConstValue::Null))
        });
    }

    let app = TestApp::new(STACKED_SDL)
        .with_gate(logging_gate(log.clone(), "outer"))
        .with_resolvers(resolvers);

    let response = app.execute("{ post { id } }");
    assert_eq!(response.errors.len(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["outer".to_string()]);
}
