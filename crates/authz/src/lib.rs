#![forbid(unsafe_code)]

pub use error::AuthzError;
pub use gate::{AbilityFn, Gate, Target, Verdict};
pub use guard::{Guard, GuardSet, JwtGuard, TokenGuard};
pub use principal::{AuthState, Credentials, Principal};

mod error;
mod gate;
mod guard;
mod principal;
