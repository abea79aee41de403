pub mod args;
pub mod auth;
pub mod can;
pub mod guard;
pub mod lookups;
pub mod relations;

pub use args::{EqDirectiveHandler, ScopeDirectiveHandler};
pub use auth::AuthDirectiveHandler;
pub use can::CanDirectiveHandler;
pub use guard::GuardDirectiveHandler;
pub use lookups::{
    AllDirectiveHandler, DeleteDirectiveHandler, FirstDirectiveHandler,
    ForceDeleteDirectiveHandler, OnlyTrashedDirectiveHandler, RestoreDirectiveHandler,
    WhereAuthDirectiveHandler, WithTrashedDirectiveHandler,
};
pub use relations::{BelongsToDirectiveHandler, HasManyDirectiveHandler};

use crate::registry::DirectiveRegistry;

/// Register the built-in directive set.
pub fn register_defaults(registry: &mut DirectiveRegistry) {
    registry.register(Box::new(CanDirectiveHandler));
    registry.register(Box::new(GuardDirectiveHandler));
    registry.register(Box::new(AuthDirectiveHandler));
    registry.register(Box::new(AllDirectiveHandler));
    registry.register(Box::new(FirstDirectiveHandler));
    registry.register(Box::new(HasManyDirectiveHandler));
    registry.register(Box::new(BelongsToDirectiveHandler));
    registry.register(Box::new(DeleteDirectiveHandler));
    registry.register(Box::new(ForceDeleteDirectiveHandler));
    registry.register(Box::new(RestoreDirectiveHandler));
    registry.register(Box::new(WithTrashedDirectiveHandler));
    registry.register(Box::new(OnlyTrashedDirectiveHandler));
    registry.register(Box::new(WhereAuthDirectiveHandler));
    registry.register(Box::new(EqDirectiveHandler));
    registry.register(Box::new(ScopeDirectiveHandler));
}
