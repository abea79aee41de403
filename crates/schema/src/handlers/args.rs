use value::Name;

use crate::{
    directives::ArgFilter,
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Handler for the argument-level `@eq` directive: the argument's value
/// becomes an equality constraint on the field's query lookups.
///
/// The column defaults to the argument name.
pub struct EqDirectiveHandler;

impl DirectiveHandler for EqDirectiveHandler {
    fn name(&self) -> &'static str {
        "eq"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            arg_builder: true,
            ..Capabilities::default()
        }
    }

    fn apply_to_argument(
        &self,
        _ctx: &FieldContext<'_>,
        argument: &Name,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.push_arg_filter(ArgFilter::Eq {
            argument: argument.clone(),
            key: arguments
                .str_arg("key")?
                .unwrap_or_else(|| argument.to_string()),
        });
        Ok(())
    }
}

/// Handler for the argument-level `@scope` directive: the argument's value is
/// handed to a named store scope.
pub struct ScopeDirectiveHandler;

impl DirectiveHandler for ScopeDirectiveHandler {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            arg_builder: true,
            ..Capabilities::default()
        }
    }

    fn apply_to_argument(
        &self,
        _ctx: &FieldContext<'_>,
        argument: &Name,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.push_arg_filter(ArgFilter::Scope {
            argument: argument.clone(),
            name: arguments
                .str_arg("name")?
                .unwrap_or_else(|| argument.to_string()),
        });
        Ok(())
    }
}
