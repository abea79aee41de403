use crate::{
    directives::{FieldMiddleware, GuardSpec},
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Handler for the `@guard` directive.
///
/// Field-level applications go through [`DirectiveHandler::apply`]; type and
/// type-extension applications are expanded by the schema builder onto the
/// fields declared in that block, reusing [`GuardSpec::from_arguments`].
pub struct GuardDirectiveHandler;

impl GuardSpec {
    pub fn from_arguments(arguments: &DirectiveArguments<'_>) -> Result<Self, DefinitionError> {
        Ok(GuardSpec {
            with: arguments.str_list_arg("with")?.unwrap_or_default(),
        })
    }
}

impl DirectiveHandler for GuardDirectiveHandler {
    fn name(&self) -> &'static str {
        "guard"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            field_middleware: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        _ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.push_middleware(FieldMiddleware::Guard(GuardSpec::from_arguments(arguments)?));
        Ok(())
    }
}
