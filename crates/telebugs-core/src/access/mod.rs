//! Principal resolution and project-scope evaluation.

pub mod principal;
pub mod scope;

pub use principal::{AuthContext, Principal, Role, bearer_token, resolve};
pub use scope::ProjectScope;
