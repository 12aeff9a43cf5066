//! The authorization decision core.
//!
//! `AuthorizationEngine` evaluates an authenticated principal's encrypted
//! claims against a route's requirement; `Guard` composes the public bypass,
//! principal resolution and the engine into the full per-request flow.
//! Decrypted claims live only inside one `evaluate` call: on every allow
//! reached through them, the surviving list is re-encrypted and written back
//! before the principal leaves the engine.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cipher::ClaimCipher;
use crate::error::AppResult;
use crate::routes::RouteRequirement;

use super::permission::Permission;
use super::principal::Principal;
use super::resolver::PrincipalResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Route is public; no principal was resolved.
    PublicRoute,
    /// Route declares an empty permission list; authentication sufficed.
    AuthenticatedOnly,
    /// The decrypted claims contained the universal wildcard.
    Wildcard,
    /// A required permission was satisfied (full-scope or self-scope).
    Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    AccessDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

pub struct AuthorizationEngine {
    cipher: ClaimCipher,
}

impl AuthorizationEngine {
    pub fn new(cipher: ClaimCipher) -> Self {
        Self { cipher }
    }

    pub fn cipher(&self) -> &ClaimCipher {
        &self.cipher
    }

    /// Evaluate an already-resolved principal against a non-public route.
    ///
    /// A claim that fails to decrypt is skipped (logged by index only), never
    /// fatal: the remaining claims still count. On an allow derived from
    /// decrypted claims the principal's permission list is replaced with the
    /// re-encrypted surviving claims.
    pub fn evaluate(
        &self,
        principal: &mut Principal,
        requirement: &RouteRequirement,
        route_id: Option<&str>,
    ) -> AppResult<Decision> {
        if requirement.required.is_empty() {
            return Ok(Decision::Allow(AllowReason::AuthenticatedOnly));
        }

        let mut decrypted: Vec<Permission> = Vec::with_capacity(principal.role.permissions.len());
        for (idx, claim) in principal.role.permissions.iter().enumerate() {
            match self.cipher.decrypt(claim) {
                Ok(plain) => decrypted.push(Permission::parse(&plain)),
                Err(err) => {
                    tracing::warn!(
                        principal = %principal.id,
                        claim_index = idx,
                        "skipping undecryptable permission claim: {}",
                        err
                    );
                }
            }
        }

        let decision = match_required(&decrypted, &requirement.required, &principal.id, route_id);

        if decision.is_allow() {
            let mut sealed = Vec::with_capacity(decrypted.len());
            for permission in &decrypted {
                sealed.push(self.cipher.encrypt(&permission.to_string())?);
            }
            principal.role.permissions = sealed;
        }
        Ok(decision)
    }
}

/// Steps over the decrypted claims: wildcard short-circuit first, then any-of
/// over the required names in declared order. Self-scoped grants match only
/// when the route's `id` parameter equals the principal's identifier; a
/// missing parameter never matches and never errors.
fn match_required(
    decrypted: &[Permission],
    required: &[String],
    principal_id: &str,
    route_id: Option<&str>,
) -> Decision {
    if decrypted.iter().any(Permission::is_wildcard) {
        return Decision::Allow(AllowReason::Wildcard);
    }

    let mut full: HashSet<&str> = HashSet::new();
    let mut self_scoped: HashSet<&str> = HashSet::new();
    for permission in decrypted {
        match permission.name() {
            Some(name) if permission.is_self_scoped() => {
                self_scoped.insert(name);
            }
            Some(name) => {
                full.insert(name);
            }
            None => {}
        }
    }

    for name in required {
        if full.contains(name.as_str()) {
            return Decision::Allow(AllowReason::Permission);
        }
        if self_scoped.contains(name.as_str()) {
            if let Some(route_id) = route_id {
                if route_id == principal_id {
                    return Decision::Allow(AllowReason::Permission);
                }
            }
        }
    }
    Decision::Deny(DenyReason::AccessDenied)
}

/// The full per-request decision flow, composing resolution with evaluation
/// (composition, not inheritance: the resolver is injected, never subclassed).
pub struct Guard {
    resolver: Arc<dyn PrincipalResolver>,
    engine: AuthorizationEngine,
}

impl Guard {
    pub fn new(resolver: Arc<dyn PrincipalResolver>, engine: AuthorizationEngine) -> Self {
        Self { resolver, engine }
    }

    /// Decide one request. On an allow for a protected route the returned
    /// principal carries re-encrypted claims, ready to attach to the request;
    /// public allows and denies carry no principal.
    pub async fn check(
        &self,
        requirement: &RouteRequirement,
        credential: Option<&str>,
        route_id: Option<&str>,
    ) -> AppResult<(Decision, Option<Principal>)> {
        if requirement.public {
            return Ok((Decision::Allow(AllowReason::PublicRoute), None));
        }

        let Some(credential) = credential else {
            return Ok((Decision::Deny(DenyReason::Unauthenticated), None));
        };
        let mut principal = match self.resolver.resolve(credential).await {
            Ok(principal) => principal,
            Err(err) => {
                tracing::debug!("credential resolution failed: {:#}", err);
                return Ok((Decision::Deny(DenyReason::Unauthenticated), None));
            }
        };

        let decision = self.engine.evaluate(&mut principal, requirement, route_id)?;
        match decision {
            Decision::Allow(_) => Ok((decision, Some(principal))),
            Decision::Deny(_) => Ok((decision, None)),
        }
    }
}
