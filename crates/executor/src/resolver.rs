use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use value::{ConstValue, Name};

use graphward_authz::AuthzError;
use graphward_schema::{MetaField, ResolverSpec};
use graphward_store::RelationKind;

use crate::{context::RequestContext, strategies::field_constraints, ExecuteError, Lazy};

/// Inputs to a resolver invocation: `(root, args, context, field info)`.
pub struct ResolverParams<'a> {
    pub ctx: &'a RequestContext,
    pub root: &'a ConstValue,
    pub args: &'a IndexMap<Name, ConstValue>,
    pub parent_type: &'a str,
    pub field_name: &'a str,
}

impl<'a> ResolverParams<'a> {
    /// The parent object's attribute of the given name, if the parent is an
    /// object.
    pub fn root_attribute(&self, name: &str) -> Option<&ConstValue> {
        match self.root {
            ConstValue::Object(object) => object.get(name),
            _ => None,
        }
    }
}

/// A resolver's immediate output: a value, or a deferred handle filled when
/// the batch registry flushes.
pub enum Resolved {
    Value(ConstValue),
    Deferred(Lazy),
}

pub type ResolverFn =
    Arc<dyn Fn(&ResolverParams<'_>) -> Result<Resolved, ExecuteError> + Send + Sync>;

/// Custom resolvers keyed by `Type.field`.
///
/// A directive-provided resolver takes precedence; a registered resolver
/// beats plain property access.
#[derive(Default)]
pub struct ResolverMap {
    resolvers: HashMap<String, ResolverFn>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_name: &str,
        field_name: &str,
        resolver: impl Fn(&ResolverParams<'_>) -> Result<Resolved, ExecuteError> + Send + Sync + 'static,
    ) {
        self.resolvers
            .insert(format!("{type_name}.{field_name}"), Arc::new(resolver));
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&ResolverFn> {
        self.resolvers.get(&format!("{type_name}.{field_name}"))
    }
}

impl std::fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

const DEFAULT_PAGE_SIZE: u64 = 15;

/// Run the resolver the field's plan selects.
pub(crate) fn run_base_resolver(
    params: &ResolverParams<'_>,
    definition: &MetaField,
) -> Result<Resolved, ExecuteError> {
    let ctx = params.ctx;
    match &definition.plan.resolver {
        ResolverSpec::Default => {
            if let Some(resolver) = ctx.resolvers.get(params.parent_type, params.field_name) {
                return resolver(params);
            }
            Ok(Resolved::Value(
                params
                    .root_attribute(params.field_name)
                    .cloned()
                    .unwrap_or(ConstValue::Null),
            ))
        }

        ResolverSpec::Auth { guard } => {
            let principal = match guard {
                Some(guard) => ctx
                    .guards
                    .get(guard)
                    .and_then(|guard| guard.user(&ctx.credentials)),
                None => ctx.current_principal(),
            };
            Ok(Resolved::Value(
                principal
                    .map(|principal| principal.to_value())
                    .unwrap_or(ConstValue::Null),
            ))
        }

        ResolverSpec::All { model } => {
            let constraints = field_constraints(ctx, &definition.plan, params.args)?;
            let rows = constraints.apply(ctx.store.query(model)?).get()?;
            Ok(Resolved::Value(ConstValue::List(
                rows.iter().map(|row| row.to_value()).collect(),
            )))
        }

        ResolverSpec::First { model } => {
            let constraints = field_constraints(ctx, &definition.plan, params.args)?;
            let row = constraints.apply(ctx.store.query(model)?).first()?;
            Ok(Resolved::Value(
                row.map(|row| row.to_value()).unwrap_or(ConstValue::Null),
            ))
        }

        ResolverSpec::HasMany { relation, paginate } => {
            let relation = ctx.store.relation(params.parent_type, relation)?.clone();
            debug_assert_eq!(relation.kind, RelationKind::HasMany);
            let parent_model = ctx.store.model(&relation.model)?;
            let parent_key = params
                .root_attribute(&parent_model.primary_key)
                .cloned()
                .unwrap_or(ConstValue::Null);
            let constraints = field_constraints(ctx, &definition.plan, params.args)?;
            let page = paginate.then(|| {
                let per_page = int_argument(params.args, "first").unwrap_or(DEFAULT_PAGE_SIZE);
                let page = int_argument(params.args, "page").unwrap_or(1);
                (per_page.max(1), page.max(1))
            });
            let lazy = ctx.batches.lock().expect("batch registry poisoned").defer(
                ctx.store.connection(),
                &relation,
                constraints,
                page,
                parent_key,
            );
            Ok(Resolved::Deferred(lazy))
        }

        ResolverSpec::BelongsTo { relation } => {
            let relation = ctx.store.relation(params.parent_type, relation)?.clone();
            debug_assert_eq!(relation.kind, RelationKind::BelongsTo);
            let foreign_key = params
                .root_attribute(&relation.foreign_key)
                .cloned()
                .unwrap_or(ConstValue::Null);
            if foreign_key == ConstValue::Null {
                return Ok(Resolved::Value(ConstValue::Null));
            }
            let constraints = field_constraints(ctx, &definition.plan, params.args)?;
            let lazy = ctx.batches.lock().expect("batch registry poisoned").defer(
                ctx.store.connection(),
                &relation,
                constraints,
                None,
                foreign_key,
            );
            Ok(Resolved::Deferred(lazy))
        }

        ResolverSpec::Delete { model } => delete_resolver(params, model, false),
        ResolverSpec::ForceDelete { model } => delete_resolver(params, model, true),

        ResolverSpec::Restore { model } => {
            let key = required_id(params)?;
            let restored = params.ctx.store.restore(model, &key)?;
            Ok(Resolved::Value(
                restored
                    .map(|row| row.to_value())
                    .unwrap_or(ConstValue::Null),
            ))
        }
    }
}

fn delete_resolver(
    params: &ResolverParams<'_>,
    model: &str,
    force: bool,
) -> Result<Resolved, ExecuteError> {
    let key = required_id(params)?;
    let deleted = params.ctx.store.delete(model, &key, force)?;
    Ok(Resolved::Value(
        deleted.map(|row| row.to_value()).unwrap_or(ConstValue::Null),
    ))
}

fn required_id(params: &ResolverParams<'_>) -> Result<ConstValue, ExecuteError> {
    params
        .args
        .get("id")
        .filter(|value| **value != ConstValue::Null)
        .cloned()
        .ok_or_else(|| {
            ExecuteError::Authz(AuthzError::MissingArgument {
                path: "id".to_string(),
            })
        })
}

fn int_argument(args: &IndexMap<Name, ConstValue>, name: &str) -> Option<u64> {
    match args.get(name) {
        Some(ConstValue::Number(number)) => number.as_u64(),
        _ => None,
    }
}

/// Force a resolver output into a value, flushing the batch registry if a
/// deferred handle is still pending.
pub(crate) fn force(ctx: &RequestContext, resolved: Resolved) -> Result<ConstValue, ExecuteError> {
    match resolved {
        Resolved::Value(value) => Ok(value),
        Resolved::Deferred(lazy) => {
            if !lazy.is_set() {
                ctx.batches
                    .lock()
                    .expect("batch registry poisoned")
                    .flush(&ctx.store);
            }
            lazy.take().unwrap_or_else(|| {
                Err(ExecuteError::Resolver(
                    "deferred value was not resolved by the batch flush".to_string(),
                ))
            })
        }
    }
}
