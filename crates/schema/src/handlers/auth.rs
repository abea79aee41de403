use crate::{
    directives::ResolverSpec,
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Handler for the `@auth` directive: the field resolves to the current
/// principal, or null for guests.
pub struct AuthDirectiveHandler;

impl DirectiveHandler for AuthDirectiveHandler {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            resolver_provider: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        _ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_resolver("auth", ResolverSpec::Auth {
            guard: arguments.str_arg("guard")?,
        })
    }
}
