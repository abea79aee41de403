#![forbid(unsafe_code)]

pub use batch::{BatchKey, BatchRegistry, RelationConstraints};
pub use context::RequestContext;
pub use error::ExecuteError;
pub use executor::Executor;
pub use lazy::Lazy;
pub use request::{Request, Response, ServerError};
pub use resolver::{Resolved, ResolverFn, ResolverMap, ResolverParams};

mod arguments;
mod batch;
mod context;
mod error;
mod executor;
mod lazy;
mod middleware;
mod request;
mod resolver;
mod strategies;
