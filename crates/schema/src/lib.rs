#![forbid(unsafe_code)]

pub use directives::{
    ArgFilter, CanSpec, FailurePolicy, FieldMiddleware, FieldPlan, GuardSpec, ResolverSpec,
    TargetSpec, TrashedMode, WhereAuthSpec,
};
pub use error::DefinitionError;
pub use policy_schema::{MetaField, MetaInputValue, MetaType, PolicySchema, TypeKind};
pub use registry::{
    Capabilities, DirectiveArguments, DirectiveHandler, DirectiveRegistry, FieldContext,
    PlanBuilder,
};
pub use type_ext::TypeExt;

mod directives;
mod error;
pub mod handlers;
mod policy_schema;
mod registry;
mod type_ext;
