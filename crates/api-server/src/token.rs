//! Bearer token verification.
//!
//! Tokens are issued by the account service as
//! `<user_id>.<expires_unix>.<hex hmac-sha256>` where the MAC covers
//! `<user_id>.<expires_unix>`. The user id may itself contain dots, so the
//! token is split from the right.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
}

pub struct HmacTokenVerifier {
    secret: Vec<u8>,
}

impl HmacTokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::Malformed)
    }

    /// Produce a token for `user_id` valid until `expires_at`.
    pub fn sign(&self, user_id: &str, expires_at: DateTime<Utc>) -> Result<String, TokenError> {
        let payload = format!("{}.{}", user_id, expires_at.timestamp());
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        Ok(format!("{}.{}", payload, hex::encode(mac.finalize().into_bytes())))
    }

    pub(crate) fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut parts = token.trim().rsplitn(3, '.');
        let (signature, expires, user_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(e), Some(u)) if !u.is_empty() => (s, e, u),
            _ => return Err(TokenError::Malformed),
        };

        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(user_id.as_bytes());
        mac.update(b".");
        mac.update(expires.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let expires_unix: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at = Utc
            .timestamp_opt(expires_unix, 0)
            .single()
            .ok_or(TokenError::Malformed)?;
        if expires_at <= now {
            return Err(TokenError::Expired);
        }

        Ok(TokenClaims {
            user_id: user_id.to_string(),
            expires_at,
        })
    }
}

impl TokenVerifier for HmacTokenVerifier {
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }
}
