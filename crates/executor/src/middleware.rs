use value::ConstValue;

use graphward_authz::AuthzError;
use graphward_schema::{CanSpec, FailurePolicy, FieldMiddleware, MetaField, TargetSpec, TypeExt};

use crate::{
    resolver::{force, run_base_resolver, Resolved, ResolverParams},
    strategies::{resolve_targets, targets_from_resolved},
    ExecuteError,
};

/// Run a field's middleware chain around its resolver.
///
/// The chain is the plan's middleware in declaration order: the first entry
/// is the outermost wrapper, so its checks run first. Each middleware either
/// fails or invokes the rest of the chain.
pub(crate) fn run_field_chain(
    params: &ResolverParams<'_>,
    chain: &[FieldMiddleware],
    definition: &MetaField,
) -> Result<Resolved, ExecuteError> {
    let Some((middleware, rest)) = chain.split_first() else {
        return run_base_resolver(params, definition);
    };

    match middleware {
        FieldMiddleware::Guard(spec) => {
            let principal = params
                .ctx
                .guards
                .authenticate(&spec.with, &params.ctx.credentials)?;
            params.ctx.auth.set_user(Some(principal));
            run_field_chain(params, rest, definition)
        }
        FieldMiddleware::Can(spec) => run_can(params, spec, rest, definition),
    }
}

fn run_can(
    params: &ResolverParams<'_>,
    spec: &CanSpec,
    rest: &[FieldMiddleware],
    definition: &MetaField,
) -> Result<Resolved, ExecuteError> {
    match run_can_inner(params, spec, rest, definition) {
        Ok(resolved) => Ok(resolved),
        Err(err) => match spec.policy {
            FailurePolicy::Propagate => Err(err),
            FailurePolicy::Conceal => Err(conceal(err)),
            // Swallows any failure raised within the wrapped call, including
            // resolver errors, and substitutes the configured literal.
            FailurePolicy::ReturnValue => Ok(Resolved::Value(
                spec.return_value.clone().unwrap_or(ConstValue::Null),
            )),
        },
    }
}

fn run_can_inner(
    params: &ResolverParams<'_>,
    spec: &CanSpec,
    rest: &[FieldMiddleware],
    definition: &MetaField,
) -> Result<Resolved, ExecuteError> {
    let ctx = params.ctx;
    let principal = ctx.current_principal();
    let check_args = build_check_args(params, spec);

    if spec.target == TargetSpec::Resolved {
        // Run the wrapped resolver to completion first, forcing any deferred
        // value, then check the result it returned.
        let resolved = run_field_chain(params, rest, definition)?;
        let value = force(ctx, resolved)?;
        let model = definition
            .ty
            .named_type()
            .unwrap_or(params.field_name)
            .to_string();
        for target in targets_from_resolved(&model, &value) {
            ctx.gate
                .check(principal.as_ref(), &spec.abilities, &target, &check_args)?;
        }
        return Ok(Resolved::Value(value));
    }

    let targets = resolve_targets(
        ctx,
        &spec.target,
        &definition.plan,
        params.root,
        params.args,
        params.parent_type,
    )?;
    for target in &targets {
        ctx.gate
            .check(principal.as_ref(), &spec.abilities, target, &check_args)?;
    }
    run_field_chain(params, rest, definition)
}

/// Assemble the check arguments: the injected client argument object first,
/// then the directive's static literals (a list is spread, a scalar is one
/// argument).
fn build_check_args(params: &ResolverParams<'_>, spec: &CanSpec) -> Vec<ConstValue> {
    let mut check_args = Vec::new();
    if spec.inject_args {
        check_args.push(ConstValue::Object(params.args.clone()));
    }
    match &spec.static_args {
        Some(ConstValue::List(items)) => check_args.extend(items.iter().cloned()),
        Some(ConstValue::Null) | None => {}
        Some(other) => check_args.push(other.clone()),
    }
    check_args
}

fn conceal(err: ExecuteError) -> ExecuteError {
    match err {
        ExecuteError::Authz(AuthzError::Denied { ability, .. }) => {
            ExecuteError::Authz(AuthzError::Denied {
                ability,
                message: None,
                code: None,
            })
        }
        other => other,
    }
}
