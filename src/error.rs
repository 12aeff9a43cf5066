//! Unified application error model and mapping helpers.
//! This module provides the common error enum used across the guard pipeline
//! and the HTTP surface, along with the HTTP status mapping.
//!
//! Messages are intentionally opaque: no decrypted permission value is ever
//! carried inside an error.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Missing or invalid credential; the principal could not be resolved.
    Unauthenticated { code: String, message: String },
    /// The principal is authenticated but lacks every required permission.
    Forbidden { code: String, message: String },
    /// A startup/registration problem (e.g. an endpoint with no declared requirement).
    Config { code: String, message: String },
    /// Claim cipher failure that could not be recovered locally.
    Cipher { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Unauthenticated { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Config { code, .. }
            | AppError::Cipher { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Config { message, .. }
            | AppError::Cipher { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn unauthenticated<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthenticated { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn config<S: Into<String>>(code: S, msg: S) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn cipher<S: Into<String>>(code: S, msg: S) -> Self { AppError::Cipher { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::Config { .. } => 500,
            AppError::Cipher { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::unauthenticated("no_credential", "missing").http_status(), 401);
        assert_eq!(AppError::forbidden("access_denied", "no").http_status(), 403);
        assert_eq!(AppError::config("undeclared_route", "bad table").http_status(), 500);
        assert_eq!(AppError::cipher("claim_cipher", "seal failed").http_status(), 500);
        assert_eq!(AppError::internal("internal_error", "panic").http_status(), 500);
    }

    #[test]
    fn display_carries_code_and_message() {
        let err = AppError::forbidden("access_denied", "insufficient permissions");
        assert_eq!(err.to_string(), "access_denied: insufficient permissions");
        assert_eq!(err.code_str(), "access_denied");
        assert_eq!(err.message(), "insufficient permissions");
    }
}
