use serde::{Deserialize, Serialize};

/// A single permission claim as stored on a role: ciphertext produced by the
/// claim cipher, opaque to everything but the authorization engine.
pub type EncryptedClaim = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    #[serde(default)]
    pub permissions: Vec<EncryptedClaim>,
}

/// The authenticated caller for one request. Constructed fresh per request by
/// the resolver and discarded at request end; the engine rewrites
/// `role.permissions` in place (decrypt, evaluate, re-encrypt) so the value
/// attached to the request never carries plaintext.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, permissions: Vec<EncryptedClaim>) -> Self {
        Self { id: id.into(), role: Role { permissions } }
    }
}
