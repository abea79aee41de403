use crate::{
    directives::ResolverSpec,
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Handler for the `@hasMany` directive: a batched child-relation load.
///
/// The relation name defaults to the field name; the target model comes from
/// the store's relation definition at request time.
pub struct HasManyDirectiveHandler;

impl DirectiveHandler for HasManyDirectiveHandler {
    fn name(&self) -> &'static str {
        "hasMany"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            resolver_provider: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        let relation = arguments
            .str_arg("relation")?
            .unwrap_or_else(|| ctx.field_name.to_string());
        plan.set_resolver("hasMany", ResolverSpec::HasMany {
            relation,
            paginate: arguments.bool_arg("paginate")?.unwrap_or(false),
        })
    }
}

/// Handler for the `@belongsTo` directive: a batched parent-relation load.
pub struct BelongsToDirectiveHandler;

impl DirectiveHandler for BelongsToDirectiveHandler {
    fn name(&self) -> &'static str {
        "belongsTo"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            resolver_provider: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        let relation = arguments
            .str_arg("relation")?
            .unwrap_or_else(|| ctx.field_name.to_string());
        plan.set_resolver("belongsTo", ResolverSpec::BelongsTo { relation })
    }
}
