use value::{ConstValue, Name};

/// How to obtain the target object(s) for an ability check.
///
/// Exactly one variant is active per `@can` instance; the mutually exclusive
/// schema arguments `{resolved, query, find, root}` select it.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    /// Check the wrapped resolver's return value, after it has fully
    /// completed. Never legal on mutation fields.
    Resolved,
    /// Check the parent object the field is resolved on.
    Root,
    /// Check the bare model identity, without an instance.
    Model(String),
    /// Check every row located by the field's declarative query constraints.
    Query { model: String, scopes: Vec<String> },
    /// Check the row(s) found by primary key at a dotted argument path.
    Find {
        model: String,
        path: String,
        or_fail: bool,
    },
}

/// Client-visible outcome when a wrapped call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Rethrow the failure as-is (`EXCEPTION_PASS`).
    #[default]
    Propagate,
    /// Replace a denial with the generic unauthorized error
    /// (`EXCEPTION_NOT_AUTHORIZED`); unrelated failures still propagate.
    Conceal,
    /// Swallow any failure and return the configured literal
    /// (`RETURN_VALUE`).
    ReturnValue,
}

/// One `@can` application, fully resolved at schema build.
#[derive(Debug, Clone, PartialEq)]
pub struct CanSpec {
    /// Abilities checked in order; the first denial wins.
    pub abilities: Vec<String>,
    pub target: TargetSpec,
    /// Pass the client argument object to the predicates, ahead of
    /// `static_args`.
    pub inject_args: bool,
    /// Literal arguments from the directive; a list is spread, a scalar is
    /// appended as one argument.
    pub static_args: Option<ConstValue>,
    pub policy: FailurePolicy,
    /// The literal returned under [`FailurePolicy::ReturnValue`].
    pub return_value: Option<ConstValue>,
}

/// One `@guard` application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSpec {
    /// Guard names tried in order; empty means the default guard.
    pub with: Vec<String>,
}

/// Middleware wrapping a field resolver, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMiddleware {
    Guard(GuardSpec),
    Can(CanSpec),
}

/// Soft-delete visibility for a field's lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedMode {
    #[default]
    Default,
    With,
    Only,
}

/// `@whereAuth`: restrict query lookups to the current principal's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereAuthSpec {
    /// Column compared against the principal's id.
    pub key: String,
    pub guard: Option<String>,
}

/// Constraint contributed by an argument-level builder directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgFilter {
    /// `@eq`: equality constraint from the argument's value.
    Eq { argument: Name, key: String },
    /// `@scope`: apply a named store scope with the argument's value.
    Scope { argument: Name, name: String },
}

/// The resolver a field's plan selects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolverSpec {
    /// Property access on the parent object, or a registered custom resolver.
    #[default]
    Default,
    /// `@auth`: return the current principal.
    Auth { guard: Option<String> },
    /// `@all`: all rows of a model, honoring the field's constraints.
    All { model: String },
    /// `@first`: the first matching row or null.
    First { model: String },
    /// `@hasMany`: batched child-relation load.
    HasMany { relation: String, paginate: bool },
    /// `@belongsTo`: batched parent-relation load.
    BelongsTo { relation: String },
    /// `@delete`: soft-delete the row named by the `id` argument.
    Delete { model: String },
    /// `@forceDelete`: remove the row even if soft-deleted.
    ForceDelete { model: String },
    /// `@restore`: clear the soft-delete marker.
    Restore { model: String },
}

/// Fixed per-field dispatch table, resolved once at schema build.
///
/// Middleware order is execution order: guard middleware first (type-block
/// guards ahead of field guards), then `@can` directives in declaration
/// order. The first entry is the outermost wrapper, so its checks run first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldPlan {
    pub middleware: Vec<FieldMiddleware>,
    pub resolver: ResolverSpec,
    pub trashed: TrashedMode,
    pub where_auth: Option<WhereAuthSpec>,
    pub arg_filters: Vec<ArgFilter>,
}

impl FieldPlan {
    /// Whether any directive contributed to this plan.
    pub fn is_annotated(&self) -> bool {
        self != &FieldPlan::default()
    }
}
