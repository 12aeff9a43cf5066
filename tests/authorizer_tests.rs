//! Authorization engine tests: wildcard dominance, any-of semantics,
//! self-scope matching, corrupted-claim recovery and the confidentiality
//! invariant, plus the guard's public-bypass and resolution flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use portcullis::cipher::ClaimCipher;
use portcullis::identity::{
    AllowReason, AuthorizationEngine, Decision, DenyReason, Guard, Principal, PrincipalResolver,
    TokenResolver,
};
use portcullis::routes::RouteRequirement;

const SECRET: &str = "authorizer-test-secret";

fn engine() -> AuthorizationEngine {
    AuthorizationEngine::new(ClaimCipher::new(SECRET))
}

fn sealed_principal(engine: &AuthorizationEngine, id: &str, perms: &[&str]) -> Principal {
    let claims = perms
        .iter()
        .map(|p| engine.cipher().encrypt(p).expect("seal claim"))
        .collect();
    Principal::new(id, claims)
}

#[test]
fn empty_required_means_authenticated_is_enough() -> Result<()> {
    let engine = engine();
    let mut principal = sealed_principal(&engine, "U1", &["reports:read"]);
    let before = principal.role.permissions.clone();

    let decision = engine.evaluate(&mut principal, &RouteRequirement::authenticated(), None)?;
    assert_eq!(decision, Decision::Allow(AllowReason::AuthenticatedOnly));
    // No claim was decrypted, so nothing was rewritten
    assert_eq!(principal.role.permissions, before);
    Ok(())
}

#[test]
fn wildcard_dominates_every_requirement() -> Result<()> {
    let engine = engine();
    let requirement = RouteRequirement::permissions(["orders:delete", "sponsors:update"]);

    // `orders:delete` is never explicitly present
    let mut principal = sealed_principal(&engine, "U1", &["*"]);
    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert_eq!(decision, Decision::Allow(AllowReason::Wildcard));

    // Wildcard also wins where a self-scope check would fail
    let mut principal = sealed_principal(&engine, "U1", &["*", "orders:delete:id"]);
    let decision = engine.evaluate(&mut principal, &requirement, Some("someone-else"))?;
    assert_eq!(decision, Decision::Allow(AllowReason::Wildcard));
    Ok(())
}

#[test]
fn any_of_accepts_a_later_requirement() -> Result<()> {
    let engine = engine();
    let requirement = RouteRequirement::permissions(["campaign:update", "evoucher:read"]);
    let mut principal = sealed_principal(&engine, "U1", &["evoucher:read"]);

    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert_eq!(decision, Decision::Allow(AllowReason::Permission));
    Ok(())
}

#[test]
fn self_scope_matches_own_resource_only() -> Result<()> {
    let engine = engine();
    let requirement = RouteRequirement::permissions(["users:update"]);

    let mut principal = sealed_principal(&engine, "U1", &["users:update:id"]);
    let decision = engine.evaluate(&mut principal, &requirement, Some("U1"))?;
    assert_eq!(decision, Decision::Allow(AllowReason::Permission));

    let mut principal = sealed_principal(&engine, "U1", &["users:update:id"]);
    let decision = engine.evaluate(&mut principal, &requirement, Some("U2"))?;
    assert_eq!(decision, Decision::Deny(DenyReason::AccessDenied));
    Ok(())
}

#[test]
fn missing_route_param_makes_self_scope_unsatisfiable() -> Result<()> {
    let engine = engine();
    let requirement = RouteRequirement::permissions(["reports:read"]);
    let mut principal = sealed_principal(&engine, "U1", &["reports:read:id"]);

    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert_eq!(decision, Decision::Deny(DenyReason::AccessDenied));
    Ok(())
}

#[test]
fn corrupted_claim_is_skipped_not_fatal() -> Result<()> {
    let engine = engine();
    let good = engine.cipher().encrypt("reports:read").expect("seal claim");
    let mut principal = Principal::new("U1", vec!["!!corrupted-claim!!".to_string(), good]);

    let requirement = RouteRequirement::permissions(["reports:read"]);
    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert_eq!(decision, Decision::Allow(AllowReason::Permission));

    // The corrupted claim was dropped on rewrite; the survivor still opens
    assert_eq!(principal.role.permissions.len(), 1);
    let opened = engine.cipher().decrypt(&principal.role.permissions[0]).expect("decrypt");
    assert_eq!(opened, "reports:read");
    Ok(())
}

#[test]
fn allowed_principal_carries_only_ciphertext() -> Result<()> {
    let engine = engine();
    let plains = ["reports:read", "users:update:id"];
    let mut principal = sealed_principal(&engine, "U1", &plains);
    let before = principal.role.permissions.clone();

    let requirement = RouteRequirement::permissions(["reports:read"]);
    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert!(decision.is_allow());

    for claim in &principal.role.permissions {
        assert!(!plains.contains(&claim.as_str()), "claim leaked as plaintext: {}", claim);
    }
    // Deterministic cipher: the rewritten list equals the original sealed list
    assert_eq!(principal.role.permissions, before);
    Ok(())
}

#[test]
fn principal_without_claims_is_denied() -> Result<()> {
    let engine = engine();
    let mut principal = Principal::new("U1", Vec::new());
    let requirement = RouteRequirement::permissions(["campaign:create"]);

    let decision = engine.evaluate(&mut principal, &requirement, None)?;
    assert_eq!(decision, Decision::Deny(DenyReason::AccessDenied));
    Ok(())
}

struct CountingResolver {
    inner: TokenResolver,
    calls: AtomicUsize,
}

impl CountingResolver {
    fn new(inner: TokenResolver) -> Self {
        Self { inner, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl PrincipalResolver for CountingResolver {
    async fn resolve(&self, credential: &str) -> Result<Principal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(credential).await
    }
}

#[tokio::test]
async fn public_route_never_invokes_resolution() -> Result<()> {
    let resolver = Arc::new(CountingResolver::new(TokenResolver::new()));
    let guard = Guard::new(resolver.clone(), engine());

    let (decision, principal) = guard
        .check(&RouteRequirement::public_route(), None, None)
        .await?;
    assert_eq!(decision, Decision::Allow(AllowReason::PublicRoute));
    assert!(principal.is_none());

    // Even a supplied credential is ignored on a public route
    let (decision, _) = guard
        .check(&RouteRequirement::public_route(), Some("any-token"), None)
        .await?;
    assert_eq!(decision, Decision::Allow(AllowReason::PublicRoute));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn missing_or_unknown_credential_is_unauthenticated() -> Result<()> {
    let guard = Guard::new(Arc::new(TokenResolver::new()), engine());
    let requirement = RouteRequirement::permissions(["reports:read"]);

    let (decision, principal) = guard.check(&requirement, None, None).await?;
    assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
    assert!(principal.is_none());

    let (decision, _) = guard.check(&requirement, Some("never-issued"), None).await?;
    assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn allow_hands_back_the_rewritten_principal() -> Result<()> {
    let engine = engine();
    let resolver = TokenResolver::new();
    resolver.register("tok-1", sealed_principal(&engine, "U7", &["reports:read"]));
    let guard = Guard::new(Arc::new(resolver), engine);

    let requirement = RouteRequirement::permissions(["reports:read"]);
    let (decision, principal) = guard.check(&requirement, Some("tok-1"), None).await?;
    assert_eq!(decision, Decision::Allow(AllowReason::Permission));

    let principal = principal.expect("allow must attach the principal");
    assert_eq!(principal.id, "U7");
    assert_ne!(principal.role.permissions[0], "reports:read");
    Ok(())
}
