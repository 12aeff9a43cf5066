use super::Principal;

/// Request-scoped context attached by the guard for downstream handlers.
/// `principal` is `None` on public routes; when present its claims are in
/// encrypted form.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: Option<String>,
}
