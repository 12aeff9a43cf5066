//! Central identity surface for the authorization guard.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod permission;
mod principal;
mod request_context;
mod resolver;

pub use authorizer::{AllowReason, AuthorizationEngine, Decision, DenyReason, Guard};
pub use permission::{Permission, WILDCARD};
pub use principal::{EncryptedClaim, Principal, Role};
pub use request_context::RequestContext;
pub use resolver::{PrincipalResolver, TokenResolver};
