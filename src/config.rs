//! Guard configuration: explicit, built once at startup and passed into
//! constructors. The cipher key material lives here rather than in any
//! process-global state.

use crate::error::{AppError, AppResult};

pub const DEFAULT_HTTP_PORT: u16 = 8787;

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Secret the claim cipher keys are derived from. Required.
    pub claim_secret: String,
    pub http_port: u16,
    /// Bearer token registered for the seeded demo administrator. When unset,
    /// a random token is generated at startup and logged.
    pub demo_token: Option<String>,
}

impl GuardConfig {
    pub fn new(claim_secret: impl Into<String>) -> Self {
        Self {
            claim_secret: claim_secret.into(),
            http_port: DEFAULT_HTTP_PORT,
            demo_token: None,
        }
    }

    /// Read configuration from `PORTCULLIS_*` environment variables. A missing
    /// or blank claim secret is a startup error, not a request-time one.
    pub fn from_env() -> AppResult<Self> {
        let claim_secret = std::env::var("PORTCULLIS_CLAIM_SECRET").ok().unwrap_or_default();
        if claim_secret.trim().is_empty() {
            return Err(AppError::config(
                "missing_claim_secret",
                "PORTCULLIS_CLAIM_SECRET must be set to a non-empty value",
            ));
        }
        let http_port = std::env::var("PORTCULLIS_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);
        let demo_token = std::env::var("PORTCULLIS_DEMO_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());
        Ok(Self { claim_secret, http_port, demo_token })
    }
}
