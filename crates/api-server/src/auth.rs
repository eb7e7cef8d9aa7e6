use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use signal_core::{CallerIdentity, EntitlementTier};
use std::convert::Infallible;
use std::sync::Arc;

use crate::accounts::{Account, AccountStore};
use crate::token::TokenVerifier;

/// SHA-256 hex of an API key. Account stores index by this, never the raw key.
pub(crate) fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

/// A credential presented by the caller. At most one is considered per request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(key) => write!(f, "ApiKey({})", mask_api_key(key)),
            Credential::Bearer(_) => write!(f, "Bearer(****)"),
        }
    }
}

/// Extract the caller's credential from request headers.
///
/// Checks, in order:
/// 1. X-API-Key header (static key, wins when both are present)
/// 2. Authorization: Bearer <token> header
pub(crate) fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    if let Some(api_key) = headers.get("X-API-Key") {
        if let Ok(key) = api_key.to_str() {
            let key = key.trim();
            if !key.is_empty() {
                return Some(Credential::ApiKey(key.to_string()));
            }
        }
    }

    if let Some(auth) = headers.get("Authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(Credential::Bearer(token.to_string()));
                }
            }
        }
    }

    None
}

/// Mask API key for logging (show first 4 and last 4 characters)
pub(crate) fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

/// Turns a presented credential into a [`CallerIdentity`].
///
/// Stateless: every call re-reads the account store. Every failure
/// (unknown key, bad or expired token, inactive account, store error)
/// degrades to anonymous instead of surfacing an error.
pub struct CredentialResolver {
    accounts: Arc<dyn AccountStore>,
    tokens: Option<Arc<dyn TokenVerifier>>,
}

impl CredentialResolver {
    pub fn new(accounts: Arc<dyn AccountStore>, tokens: Option<Arc<dyn TokenVerifier>>) -> Self {
        Self { accounts, tokens }
    }

    pub async fn resolve(&self, credential: Option<&Credential>) -> CallerIdentity {
        let account = match credential {
            None => return CallerIdentity::anonymous(),
            Some(Credential::ApiKey(key)) => match self.accounts.lookup_by_key(key).await {
                Ok(account) => {
                    if account.is_none() {
                        tracing::debug!("Unknown API key presented: {}", mask_api_key(key));
                    }
                    account
                }
                Err(e) => {
                    tracing::warn!("Account lookup by key failed: {:#}", e);
                    None
                }
            },
            Some(Credential::Bearer(token)) => self.resolve_token(token).await,
        };

        match account {
            Some(account) if account.is_active => identity_for(&account),
            Some(account) => {
                tracing::debug!("Inactive account {} treated as anonymous", account.id);
                CallerIdentity::anonymous()
            }
            None => CallerIdentity::anonymous(),
        }
    }

    async fn resolve_token(&self, token: &str) -> Option<Account> {
        let Some(verifier) = &self.tokens else {
            tracing::debug!("Bearer token presented but no token secret configured");
            return None;
        };

        let claims = match verifier.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Bearer token rejected: {}", e);
                return None;
            }
        };

        match self.accounts.lookup_by_id(&claims.user_id).await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!("Account lookup by id failed: {:#}", e);
                None
            }
        }
    }
}

fn identity_for(account: &Account) -> CallerIdentity {
    CallerIdentity::account(
        account.id.clone(),
        EntitlementTier::from_subscription_status(&account.subscription_status),
    )
}

/// Resolves the caller for every request and stores the identity in the
/// request extensions. Never rejects: entitlement is decided per route.
pub async fn resolve_caller_middleware(
    State(state): State<crate::AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let credential = extract_credential(&headers);
    let caller = state.resolver.resolve(credential.as_ref()).await;

    tracing::debug!(
        caller = caller.id.as_deref().unwrap_or("anonymous"),
        tier = %caller.tier,
        "Resolved caller"
    );

    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Extractor for the identity placed by [`resolve_caller_middleware`].
/// Falls back to anonymous when the middleware did not run.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(
            parts
                .extensions
                .get::<CallerIdentity>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}
