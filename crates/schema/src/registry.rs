use std::collections::HashMap;

use parser::{types::FieldDefinition, Positioned};
use value::{ConstValue, Name};

use crate::{
    directives::{FieldMiddleware, FieldPlan, ResolverSpec, TrashedMode, WhereAuthSpec},
    type_ext::TypeExt,
    DefinitionError,
};

/// The roles a directive may play, declared once at registration.
///
/// Schema build consults these flags to decide which handler entry points are
/// legal where, then bakes the results into each field's [`FieldPlan`]; there
/// is no capability probing at request time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Wraps the field resolver with pre/post logic (`@can`, `@guard`).
    pub field_middleware: bool,
    /// Replaces the field resolver (`@auth`, `@all`, relations, deletes).
    pub resolver_provider: bool,
    /// Adjusts how the field's lookups run (`@withTrashed`, `@whereAuth`).
    pub lookup_modifier: bool,
    /// Contributes query constraints from an argument (`@eq`, `@scope`).
    pub arg_builder: bool,
}

/// A schema directive known to the registry.
pub trait DirectiveHandler: Send + Sync {
    /// Directive name without the leading `@`.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Apply a field-level application of this directive to the plan.
    fn apply(
        &self,
        ctx: &FieldContext<'_>,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        let _ = (arguments, plan);
        Err(DefinitionError::MisplacedDirective {
            directive: self.name().to_string(),
            location: ctx.location(),
            expected: "field",
        })
    }

    /// Apply an argument-level application of this directive to the plan.
    fn apply_to_argument(
        &self,
        ctx: &FieldContext<'_>,
        argument: &Name,
        arguments: &DirectiveArguments<'_>,
        plan: &mut PlanBuilder,
    ) -> Result<(), DefinitionError> {
        let _ = (argument, arguments, plan);
        Err(DefinitionError::MisplacedDirective {
            directive: self.name().to_string(),
            location: ctx.location(),
            expected: "argument",
        })
    }
}

/// Registry mapping directive names to handlers and their capability sets.
pub struct DirectiveRegistry {
    handlers: HashMap<&'static str, Box<dyn DirectiveHandler>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in directive set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::handlers::register_defaults(&mut registry);
        registry
    }

    pub fn register(&mut self, handler: Box<dyn DirectiveHandler>) {
        let name = handler.name();
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DirectiveHandler> {
        self.handlers.get(name).map(Box::as_ref)
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The field a directive is being applied to.
pub struct FieldContext<'a> {
    pub type_name: &'a str,
    pub field_name: &'a str,
    pub field: &'a FieldDefinition,
    pub is_mutation_root: bool,
}

impl<'a> FieldContext<'a> {
    pub fn location(&self) -> String {
        format!("{}.{}", self.type_name, self.field_name)
    }

    /// Whether the field declares an argument with the given name.
    pub fn has_argument(&self, name: &str) -> bool {
        self.field
            .arguments
            .iter()
            .any(|argument| argument.node.name.node.as_str() == name)
    }

    /// Infer the model from the field's (unwrapped) return type.
    ///
    /// Built-in scalar names never name a model.
    pub fn inferred_model(&self) -> Option<String> {
        let name = self.field.ty.node.named_type()?;
        const BUILTIN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];
        if BUILTIN_SCALARS.contains(&name) {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// The model argument if present, otherwise the inferred model.
    pub fn model_argument(
        &self,
        arguments: &DirectiveArguments<'_>,
    ) -> Result<String, DefinitionError> {
        if let Some(model) = arguments.str_arg("model")? {
            return Ok(model);
        }
        self.inferred_model()
            .ok_or_else(|| DefinitionError::UnknownModel {
                type_name: self.type_name.to_string(),
                field_name: self.field_name.to_string(),
                directive: arguments.directive().to_string(),
            })
    }
}

/// Typed access to one directive application's constant arguments.
pub struct DirectiveArguments<'a> {
    directive: &'a str,
    location: String,
    arguments: &'a [(Positioned<Name>, Positioned<ConstValue>)],
}

impl<'a> DirectiveArguments<'a> {
    pub fn new(
        directive: &'a str,
        location: String,
        arguments: &'a [(Positioned<Name>, Positioned<ConstValue>)],
    ) -> Self {
        Self {
            directive,
            location,
            arguments,
        }
    }

    pub fn directive(&self) -> &str {
        self.directive
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        self.arguments
            .iter()
            .find(|(arg_name, _)| arg_name.node.as_str() == name)
            .map(|(_, value)| &value.node)
    }

    fn wrong_type(&self, argument: &str, expected: &'static str) -> DefinitionError {
        DefinitionError::WrongArgumentType {
            location: self.location.clone(),
            directive: self.directive.to_string(),
            argument: argument.to_string(),
            expected,
        }
    }

    pub fn str_arg(&self, name: &str) -> Result<Option<String>, DefinitionError> {
        match self.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.wrong_type(name, "a string")),
        }
    }

    pub fn required_str_arg(&self, name: &'static str) -> Result<String, DefinitionError> {
        self.str_arg(name)?
            .ok_or_else(|| DefinitionError::MissingDirectiveArgument {
                location: self.location.clone(),
                directive: self.directive.to_string(),
                argument: name,
            })
    }

    pub fn bool_arg(&self, name: &str) -> Result<Option<bool>, DefinitionError> {
        match self.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::Boolean(b)) => Ok(Some(*b)),
            Some(_) => Err(self.wrong_type(name, "a boolean")),
        }
    }

    pub fn str_list_arg(&self, name: &str) -> Result<Option<Vec<String>>, DefinitionError> {
        match self.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::String(s)) => Ok(Some(vec![s.clone()])),
            Some(ConstValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ConstValue::String(s) => Ok(s.clone()),
                    _ => Err(self.wrong_type(name, "a list of strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(self.wrong_type(name, "a list of strings")),
        }
    }

    /// An enum-valued argument; accepts an enum literal or a string.
    pub fn enum_arg(&self, name: &str) -> Result<Option<String>, DefinitionError> {
        match self.get(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::Enum(v)) => Ok(Some(v.to_string())),
            Some(ConstValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.wrong_type(name, "an enum value")),
        }
    }
}

/// Mutable plan under construction for one field, with the bookkeeping the
/// finished [`FieldPlan`] does not need.
pub struct PlanBuilder {
    plan: FieldPlan,
    resolver_directive: Option<&'static str>,
    type_name: String,
    field_name: String,
}

impl PlanBuilder {
    pub fn new(type_name: &str, field_name: &str) -> Self {
        Self {
            plan: FieldPlan::default(),
            resolver_directive: None,
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        }
    }

    pub fn push_middleware(&mut self, middleware: FieldMiddleware) {
        self.plan.middleware.push(middleware);
    }

    /// Install the field's resolver; a second resolver directive is an error.
    pub fn set_resolver(
        &mut self,
        directive: &'static str,
        resolver: ResolverSpec,
    ) -> Result<(), DefinitionError> {
        if let Some(first) = self.resolver_directive {
            return Err(DefinitionError::MultipleResolverDirectives {
                type_name: self.type_name.clone(),
                field_name: self.field_name.clone(),
                first: first.to_string(),
                second: directive.to_string(),
            });
        }
        self.resolver_directive = Some(directive);
        self.plan.resolver = resolver;
        Ok(())
    }

    pub fn set_trashed(&mut self, mode: TrashedMode) {
        self.plan.trashed = mode;
    }

    pub fn set_where_auth(&mut self, spec: WhereAuthSpec) {
        self.plan.where_auth = Some(spec);
    }

    pub fn push_arg_filter(&mut self, filter: crate::directives::ArgFilter) {
        self.plan.arg_filters.push(filter);
    }

    /// Finish the plan. Guard middleware is moved ahead of everything else
    /// (stable within each group): guards must run before any other
    /// middleware on the same field, since those depend on the principal.
    pub fn finish(self) -> FieldPlan {
        let mut plan = self.plan;
        let (guards, others): (Vec<_>, Vec<_>) = plan
            .middleware
            .into_iter()
            .partition(|middleware| matches!(middleware, FieldMiddleware::Guard(_)));
        plan.middleware = guards.into_iter().chain(others).collect();
        plan
    }
}
