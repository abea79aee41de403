use value::ConstValue;

use crate::{
    directives::{CanSpec, FailurePolicy, FieldMiddleware, TargetSpec},
    registry::{Capabilities, DirectiveArguments, DirectiveHandler, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Handler for the `@can` directive.
///
/// All of the directive's schema-build-time validation lives here: the
/// mutually exclusive target arguments, the mutation-safety rule for
/// `resolved`, the find-path argument check, and the `action`/`returnValue`
/// pairing.
pub struct CanDirectiveHandler;

impl CanDirectiveHandler {
    fn abilities(&self, arguments: &DirectiveArguments<'_>, ctx: &FieldContext<'_>) -> Result<Vec<String>, DefinitionError> {
        // The published contract is `ability: String!`; a constant list is
        // tolerated since the checker takes an ordered ability list anyway.
        match arguments.get("ability") {
            Some(ConstValue::String(s)) => Ok(vec![s.clone()]),
            Some(ConstValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ConstValue::String(s) => Ok(s.clone()),
                    _ => Err(DefinitionError::WrongArgumentType {
                        location: ctx.location(),
                        directive: "can".to_string(),
                        argument: "ability".to_string(),
                        expected: "a string or a list of strings",
                    }),
                })
                .collect(),
            Some(_) => Err(DefinitionError::WrongArgumentType {
                location: ctx.location(),
                directive: "can".to_string(),
                argument: "ability".to_string(),
                expected: "a string or a list of strings",
            }),
            None => Err(DefinitionError::MissingDirectiveArgument {
                location: ctx.location(),
                directive: "can".to_string(),
                argument: "ability",
            }),
        }
    }

    fn target(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
    ) -> Result<TargetSpec, DefinitionError> {
        let resolved = arguments.bool_arg("resolved")?.unwrap_or(false);
        let query = arguments.bool_arg("query")?.unwrap_or(false);
        let root = arguments.bool_arg("root")?.unwrap_or(false);
        let find = arguments.str_arg("find")?;

        let mut set = Vec::new();
        if resolved {
            set.push("resolved");
        }
        if query {
            set.push("query");
        }
        if find.is_some() {
            set.push("find");
        }
        if root {
            set.push("root");
        }
        if set.len() > 1 {
            return Err(DefinitionError::MutuallyExclusiveArguments {
                type_name: ctx.type_name.to_string(),
                field_name: ctx.field_name.to_string(),
                directive: "can".to_string(),
                arguments: set,
            });
        }

        if resolved {
            if ctx.is_mutation_root {
                return Err(DefinitionError::ResolvedOnMutation {
                    type_name: ctx.type_name.to_string(),
                    field_name: ctx.field_name.to_string(),
                });
            }
            return Ok(TargetSpec::Resolved);
        }
        if root {
            return Ok(TargetSpec::Root);
        }
        if query {
            return Ok(TargetSpec::Query {
                model: ctx.model_argument(arguments)?,
                scopes: arguments.str_list_arg("scopes")?.unwrap_or_default(),
            });
        }
        if let Some(path) = find {
            let argument = path.split('.').next().unwrap_or(&path).to_string();
            if !ctx.has_argument(&argument) {
                return Err(DefinitionError::MissingFindArgument {
                    type_name: ctx.type_name.to_string(),
                    field_name: ctx.field_name.to_string(),
                    path,
                    argument,
                });
            }
            return Ok(TargetSpec::Find {
                model: ctx.model_argument(arguments)?,
                path,
                or_fail: arguments.bool_arg("findOrFail")?.unwrap_or(true),
            });
        }

        Ok(TargetSpec::Model(ctx.model_argument(arguments)?))
    }

    fn policy(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
    ) -> Result<FailurePolicy, DefinitionError> {
        match arguments.enum_arg("action")?.as_deref() {
            None | Some("EXCEPTION_PASS") => Ok(FailurePolicy::Propagate),
            Some("EXCEPTION_NOT_AUTHORIZED") => Ok(FailurePolicy::Conceal),
            Some("RETURN_VALUE") => Ok(FailurePolicy::ReturnValue),
            Some(_) => Err(DefinitionError::WrongArgumentType {
                location: ctx.location(),
                directive: "can".to_string(),
                argument: "action".to_string(),
                expected: "one of EXCEPTION_PASS, EXCEPTION_NOT_AUTHORIZED, RETURN_VALUE",
            }),
        }
    }
}

impl DirectiveHandler for CanDirectiveHandler {
    fn name(&self) -> &'static str {
        "can"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            field_middleware: true,
            ..Capabilities::default()
        }
    }

    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        let abilities = self.abilities(arguments, ctx)?;
        let target = self.target(ctx, arguments)?;
        let policy = self.policy(ctx, arguments)?;
        let return_value = arguments.get("returnValue").cloned();

        match (policy, &return_value) {
            (FailurePolicy::ReturnValue, None) => {
                return Err(DefinitionError::MissingReturnValue {
                    type_name: ctx.type_name.to_string(),
                    field_name: ctx.field_name.to_string(),
                })
            }
            (FailurePolicy::Propagate | FailurePolicy::Conceal, Some(_)) => {
                return Err(DefinitionError::UselessReturnValue {
                    type_name: ctx.type_name.to_string(),
                    field_name: ctx.field_name.to_string(),
                })
            }
            _ => {}
        }

        plan.push_middleware(FieldMiddleware::Can(CanSpec {
            abilities,
            target,
            inject_args: arguments.bool_arg("injectArgs")?.unwrap_or(false),
            static_args: arguments.get("args").cloned(),
            policy,
            return_value,
        }));
        Ok(())
    }
}
