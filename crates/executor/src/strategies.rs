use indexmap::IndexMap;
use value::{ConstValue, Name};

use graphward_authz::{AuthzError, Target};
use graphward_schema::{ArgFilter, FieldPlan, TargetSpec};
use graphward_store::TrashedMode;

use crate::{
    arguments::lookup_path, batch::RelationConstraints, context::RequestContext, ExecuteError,
};

pub(crate) fn store_trashed(mode: graphward_schema::TrashedMode) -> TrashedMode {
    match mode {
        graphward_schema::TrashedMode::Default => TrashedMode::Default,
        graphward_schema::TrashedMode::With => TrashedMode::With,
        graphward_schema::TrashedMode::Only => TrashedMode::Only,
    }
}

/// Assemble the constraint set a field's lookups apply: argument filters and
/// scopes, the `@whereAuth` restriction, and soft-delete visibility.
pub(crate) fn field_constraints(
    ctx: &RequestContext,
    plan: &FieldPlan,
    args: &IndexMap<Name, ConstValue>,
) -> Result<RelationConstraints, ExecuteError> {
    let mut constraints = RelationConstraints {
        trashed: store_trashed(plan.trashed),
        ..RelationConstraints::default()
    };

    for filter in &plan.arg_filters {
        match filter {
            ArgFilter::Eq { argument, key } => {
                if let Some(value) = args.get(argument).filter(|value| **value != ConstValue::Null)
                {
                    constraints.filters.push((key.clone(), value.clone()));
                }
            }
            ArgFilter::Scope { argument, name } => {
                if let Some(value) = args.get(argument).filter(|value| **value != ConstValue::Null)
                {
                    constraints.scopes.push((name.clone(), Some(value.clone())));
                }
            }
        }
    }

    if let Some(where_auth) = &plan.where_auth {
        let principal = match &where_auth.guard {
            Some(guard) => ctx
                .guards
                .authenticate(std::slice::from_ref(guard), &ctx.credentials)?,
            None => ctx.current_principal().ok_or_else(|| {
                AuthzError::Unauthenticated {
                    guards: vec![ctx.guards.default_guard().to_string()],
                }
            })?,
        };
        constraints.filters.push((
            where_auth.key.clone(),
            ConstValue::String(principal.id),
        ));
    }

    Ok(constraints)
}

/// Resolve the targets of a pre-resolution target spec (everything but
/// `Resolved`).
pub(crate) fn resolve_targets(
    ctx: &RequestContext,
    spec: &TargetSpec,
    plan: &FieldPlan,
    root: &ConstValue,
    args: &IndexMap<Name, ConstValue>,
    parent_type: &str,
) -> Result<Vec<Target>, ExecuteError> {
    match spec {
        TargetSpec::Resolved => unreachable!("resolved targets are extracted post-resolution"),

        TargetSpec::Root => Ok(vec![Target::instance(parent_type, root.clone())]),

        TargetSpec::Model(model) => Ok(vec![Target::Model(model.clone())]),

        TargetSpec::Query { model, scopes } => {
            let mut constraints = field_constraints(ctx, plan, args)?;
            for scope in scopes {
                constraints.scopes.push((scope.clone(), None));
            }
            let rows = constraints.apply(ctx.store.query(model)?).get()?;
            Ok(rows
                .iter()
                .map(|row| Target::instance(model.clone(), row.to_value()))
                .collect())
        }

        TargetSpec::Find {
            model,
            path,
            or_fail,
        } => {
            let Some(value) = lookup_path(args, path) else {
                return Err(AuthzError::MissingArgument { path: path.clone() }.into());
            };
            let query = ctx
                .store
                .query(model)?
                .trashed_mode(store_trashed(plan.trashed));
            match value {
                ConstValue::List(keys) => {
                    let rows = query.find_many(keys)?;
                    if *or_fail && rows.len() != keys.len() {
                        return Err(missing_key(model, keys, &rows, ctx).into());
                    }
                    Ok(rows
                        .iter()
                        .map(|row| Target::instance(model.clone(), row.to_value()))
                        .collect())
                }
                key => {
                    let row = query.find(key)?;
                    match row {
                        Some(row) => Ok(vec![Target::instance(model.clone(), row.to_value())]),
                        None if *or_fail => Err(AuthzError::NotFound {
                            model: model.clone(),
                            key: display_key(key),
                        }
                        .into()),
                        None => Ok(Vec::new()),
                    }
                }
            }
        }
    }
}

/// Extract targets from a resolver's completed return value.
///
/// A pagination wrapper iterates its `data` items, a list its elements; null
/// yields no targets at all.
pub(crate) fn targets_from_resolved(model: &str, value: &ConstValue) -> Vec<Target> {
    match value {
        ConstValue::Null => Vec::new(),
        ConstValue::List(items) => items
            .iter()
            .map(|item| Target::instance(model, item.clone()))
            .collect(),
        ConstValue::Object(object) => match (object.get("data"), object.get("paginatorInfo")) {
            (Some(ConstValue::List(items)), Some(_)) => items
                .iter()
                .map(|item| Target::instance(model, item.clone()))
                .collect(),
            _ => vec![Target::instance(model, value.clone())],
        },
        other => vec![Target::instance(model, other.clone())],
    }
}

fn display_key(key: &ConstValue) -> String {
    match key {
        ConstValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Name the first requested key that the lookup did not return.
fn missing_key(
    model: &str,
    keys: &[ConstValue],
    rows: &[graphward_store::Record],
    ctx: &RequestContext,
) -> AuthzError {
    let primary_key = ctx
        .store
        .model(model)
        .map(|def| def.primary_key.clone())
        .unwrap_or_else(|_| "id".to_string());
    let missing = keys.iter().find(|&key| {
        !rows
            .iter()
            .any(|row| graphward_store::keys_equal(&row.key(&primary_key), key))
    });
    AuthzError::NotFound {
        model: model.to_string(),
        key: missing.map(display_key).unwrap_or_default(),
    }
}
