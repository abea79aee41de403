use crate::{
    directives::{ResolverSpec, TrashedMode, WhereAuthSpec},
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

fn resolver_capability() -> Capabilities {
    Capabilities {
        resolver_provider: true,
        ..Capabilities::default()
    }
}

/// Handler for the `@all` directive: all rows of a model, honoring the
/// field's argument filters, `@whereAuth`, and soft-delete visibility.
pub struct AllDirectiveHandler;

impl DirectiveHandler for AllDirectiveHandler {
    fn name(&self) -> &'static str {
        "all"
    }

    fn capabilities(&self) -> Capabilities {
        resolver_capability()
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_resolver("all", ResolverSpec::All {
            model: ctx.model_argument(arguments)?,
        })
    }
}

/// Handler for the `@first` directive: the first matching row or null.
pub struct FirstDirectiveHandler;

impl DirectiveHandler for FirstDirectiveHandler {
    fn name(&self) -> &'static str {
        "first"
    }

    fn capabilities(&self) -> Capabilities {
        resolver_capability()
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_resolver("first", ResolverSpec::First {
            model: ctx.model_argument(arguments)?,
        })
    }
}

fn require_id_argument(
    ctx: &FieldContext<'_>,
    directive: &'static str,
) -> Result<(), DefinitionError> {
    if ctx.has_argument("id") {
        Ok(())
    } else {
        Err(DefinitionError::MissingDirectiveArgument {
            location: ctx.location(),
            directive: directive.to_string(),
            argument: "id",
        })
    }
}

/// Handler for the `@delete` directive: soft-delete the row named by the
/// field's `id` argument (a hard delete on models without soft deletes).
pub struct DeleteDirectiveHandler;

impl DirectiveHandler for DeleteDirectiveHandler {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn capabilities(&self) -> Capabilities {
        resolver_capability()
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        require_id_argument(ctx, "delete")?;
        plan.set_resolver("delete", ResolverSpec::Delete {
            model: ctx.model_argument(arguments)?,
        })
    }
}

/// Handler for the `@forceDelete` directive.
///
/// Besides installing the resolver, its presence widens the field's lookups
/// to include soft-deleted rows, so a sibling `@can(find: ...)` can authorize
/// the removal of an already-trashed row.
pub struct ForceDeleteDirectiveHandler;

impl DirectiveHandler for ForceDeleteDirectiveHandler {
    fn name(&self) -> &'static str {
        "forceDelete"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            resolver_provider: true,
            lookup_modifier: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        require_id_argument(ctx, "forceDelete")?;
        plan.set_trashed(TrashedMode::With);
        plan.set_resolver("forceDelete", ResolverSpec::ForceDelete {
            model: ctx.model_argument(arguments)?,
        })
    }
}

/// Handler for the `@restore` directive.
///
/// Restoring only makes sense for trashed rows, so the field's lookups are
/// restricted to soft-deleted rows.
pub struct RestoreDirectiveHandler;

impl DirectiveHandler for RestoreDirectiveHandler {
    fn name(&self) -> &'static str {
        "restore"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            resolver_provider: true,
            lookup_modifier: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        require_id_argument(ctx, "restore")?;
        plan.set_trashed(TrashedMode::Only);
        plan.set_resolver("restore", ResolverSpec::Restore {
            model: ctx.model_argument(arguments)?,
        })
    }
}

/// Handler for the `@withTrashed` directive.
pub struct WithTrashedDirectiveHandler;

impl DirectiveHandler for WithTrashedDirectiveHandler {
    fn name(&self) -> &'static str {
        "withTrashed"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            lookup_modifier: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        _ctx: &FieldContext<'_>,
        _arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_trashed(TrashedMode::With);
        Ok(())
    }
}

/// Handler for the `@onlyTrashed` directive.
pub struct OnlyTrashedDirectiveHandler;

impl DirectiveHandler for OnlyTrashedDirectiveHandler {
    fn name(&self) -> &'static str {
        "onlyTrashed"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            lookup_modifier: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        _ctx: &FieldContext<'_>,
        _arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_trashed(TrashedMode::Only);
        Ok(())
    }
}

/// Handler for the `@whereAuth` directive.
pub struct WhereAuthDirectiveHandler;

impl DirectiveHandler for WhereAuthDirectiveHandler {
    fn name(&self) -> &'static str {
        "whereAuth"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            lookup_modifier: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        _ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        plan.set_where_auth(WhereAuthSpec {
            key: arguments
                .str_arg("key")?
                .unwrap_or_else(|| "user_id".to_string()),
            guard: arguments.str_arg("guard")?,
        });
        Ok(())
    }
}
