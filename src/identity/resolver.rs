//! Principal resolution: the external-collaborator seam between credential
//! verification (not implemented here) and the authorization engine.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::tprintln;

use super::principal::Principal;

/// Resolves a bearer credential to a principal. Any error is treated by the
/// guard as an unauthenticated request; resolvers own nothing beyond the
/// lookup and must be idempotent within one request. Resolution is the only
/// suspension point in the guard pipeline.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Principal>;
}

/// Map-backed resolver: opaque token -> principal. Token issuance stays with
/// the external authentication layer; this is the seam it populates (and what
/// tests and the demo server use).
#[derive(Default)]
pub struct TokenResolver {
    tokens: RwLock<HashMap<String, Principal>>,
}

impl TokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, principal: Principal) {
        let token = token.into();
        tprintln!("resolver.register principal={}", principal.id);
        self.tokens.write().insert(token, principal);
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.write().remove(token).is_some()
    }
}

#[async_trait]
impl PrincipalResolver for TokenResolver {
    async fn resolve(&self, credential: &str) -> Result<Principal> {
        self.tokens
            .read()
            .get(credential)
            .cloned()
            .ok_or_else(|| anyhow!("unknown_credential"))
    }
}
