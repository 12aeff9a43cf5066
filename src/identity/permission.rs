//! Permission string vocabulary: `resource:action` names, the universal
//! wildcard, and the `:id` suffix marking a self-scoped grant.

use std::fmt;

pub const WILDCARD: &str = "*";

const SELF_SCOPE_SUFFIX: &str = ":id";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    /// `*`: unconditional access, short-circuits every other check.
    Wildcard,
    /// `resource:action`, valid on any target.
    Full(String),
    /// `resource:action:id`, valid only when the request's `id` route
    /// parameter equals the caller's own identifier. Stored without the suffix.
    SelfScoped(String),
}

impl Permission {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == WILDCARD {
            return Permission::Wildcard;
        }
        match raw.strip_suffix(SELF_SCOPE_SUFFIX) {
            Some(base) if !base.is_empty() => Permission::SelfScoped(base.to_string()),
            _ => Permission::Full(raw.to_string()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Permission::Wildcard)
    }

    pub fn is_self_scoped(&self) -> bool {
        matches!(self, Permission::SelfScoped(_))
    }

    /// The permission name as it appears in route declarations (no suffix).
    pub fn name(&self) -> Option<&str> {
        match self {
            Permission::Wildcard => None,
            Permission::Full(name) | Permission::SelfScoped(name) => Some(name.as_str()),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Wildcard => f.write_str(WILDCARD),
            Permission::Full(name) => f.write_str(name),
            Permission::SelfScoped(name) => write!(f, "{}{}", name, SELF_SCOPE_SUFFIX),
        }
    }
}
