//! Claim cipher: the reversible transform that keeps permission strings
//! opaque at rest and on the wire.
//!
//! Claims are sealed with ChaCha20-Poly1305 under a key derived from the
//! configured secret. The nonce is synthesized from an HMAC of the plaintext,
//! which makes the transform deterministic per key: sealing the same
//! permission twice during one request yields the same ciphertext, so
//! rewritten claim lists stay comparable. The payload travels as URL-safe
//! unpadded base64 of `nonce || ciphertext`.

use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("ciphertext is not valid base64")]
    Encoding,
    #[error("ciphertext is truncated")]
    Truncated,
    #[error("ciphertext failed authentication")]
    Rejected,
    #[error("decrypted claim is not valid utf-8")]
    Utf8,
    #[error("claim encryption failed")]
    Encrypt,
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        AppError::cipher("claim_cipher".to_string(), err.to_string())
    }
}

#[derive(Clone)]
pub struct ClaimCipher {
    aead: ChaCha20Poly1305,
    nonce_key: [u8; 32],
}

impl ClaimCipher {
    /// Build a cipher from the configured secret. Two independent keys are
    /// derived by domain separation so nonce synthesis never reuses the
    /// encryption key directly.
    pub fn new(secret: &str) -> Self {
        let enc_key = derive_key(b"portcullis/claim-enc", secret);
        let nonce_key = derive_key(b"portcullis/claim-nonce", secret);
        Self {
            aead: ChaCha20Poly1305::new(Key::from_slice(&enc_key)),
            nonce_key,
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce_bytes = self.synthesize_nonce(plaintext.as_bytes());
        let nonce = Nonce::from_slice(&nonce_bytes);
        let sealed = self
            .aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;
        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(ciphertext.as_bytes())
            .map_err(|_| CipherError::Encoding)?;
        if payload.len() < NONCE_LEN {
            return Err(CipherError::Truncated);
        }
        let (nonce_bytes, sealed) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plain = self
            .aead
            .decrypt(nonce, sealed)
            .map_err(|_| CipherError::Rejected)?;
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }

    fn synthesize_nonce(&self, plaintext: &[u8]) -> [u8; NONCE_LEN] {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.nonce_key)
            .expect("hmac accepts any key length");
        mac.update(plaintext);
        let tag = mac.finalize().into_bytes();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&tag[..NONCE_LEN]);
        nonce
    }
}

fn derive_key(domain: &[u8], secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}
