//! Entitlement gateway: decides whether a caller may see premium signal
//! data and maps upstream failures onto the public error taxonomy.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use signal_client::UpstreamError;
use signal_core::CallerIdentity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("An active subscription is required")]
    SubscriptionRequired,

    #[error("{0} is still initializing, try again shortly")]
    ResourceInitializing(String),

    #[error("Signal service unavailable")]
    UpstreamUnavailable,

    #[error("{0}")]
    ValidationError(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthRequired => StatusCode::UNAUTHORIZED,
            GatewayError::SubscriptionRequired => StatusCode::FORBIDDEN,
            GatewayError::ResourceInitializing(_) => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            GatewayError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthRequired => "auth_required",
            GatewayError::SubscriptionRequired => "subscription_required",
            GatewayError::ResourceInitializing(_) => "resource_initializing",
            GatewayError::UpstreamUnavailable => "upstream_unavailable",
            GatewayError::ValidationError(_) => "validation_error",
        }
    }

    pub fn is_entitlement(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthRequired | GatewayError::SubscriptionRequired
        )
    }

    /// Translate an upstream failure. Transport details are logged here and
    /// never reach the caller.
    pub fn from_upstream(resource: &str, err: UpstreamError) -> Self {
        if err.is_not_found() {
            tracing::info!("Upstream has no data yet for {}", resource);
            return GatewayError::ResourceInitializing(resource.to_string());
        }
        tracing::warn!("Upstream failure for {}: {}", resource, err);
        GatewayError::UpstreamUnavailable
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({
                "success": false,
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

/// Per-request entitlement state, derived from the resolved caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Unauthenticated,
    AuthenticatedUnsubscribed,
    AuthenticatedSubscribed,
}

impl AccessState {
    pub fn of(caller: &CallerIdentity) -> Self {
        if caller.is_anonymous() {
            AccessState::Unauthenticated
        } else if caller.tier.is_subscribed() {
            AccessState::AuthenticatedSubscribed
        } else {
            AccessState::AuthenticatedUnsubscribed
        }
    }
}

/// Premium-route policy.
pub fn authorize_premium(caller: &CallerIdentity) -> Result<(), GatewayError> {
    match AccessState::of(caller) {
        AccessState::Unauthenticated => Err(GatewayError::AuthRequired),
        AccessState::AuthenticatedUnsubscribed => Err(GatewayError::SubscriptionRequired),
        AccessState::AuthenticatedSubscribed => Ok(()),
    }
}

/// Route layer for premium routes. A request without a resolved identity
/// is treated as anonymous.
pub async fn require_subscription_middleware(
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let caller = request
        .extensions()
        .get::<CallerIdentity>()
        .cloned()
        .unwrap_or_default();
    authorize_premium(&caller)?;
    Ok(next.run(request).await)
}

/// Normalise a symbol path parameter: 1-32 chars of `[A-Za-z0-9._-]` starting
/// with an alphanumeric, upper-cased.
pub fn validate_symbol(raw: &str) -> Result<String, GatewayError> {
    let symbol = raw.trim();
    let valid = symbol.len() <= 32
        && symbol.starts_with(|c: char| c.is_ascii_alphanumeric())
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(GatewayError::ValidationError(format!(
            "Invalid symbol: {:?}",
            raw
        )));
    }
    Ok(symbol.to_uppercase())
}

/// Parse the optional what-if fee. Negative values are allowed; anything
/// non-numeric or non-finite is rejected.
pub fn parse_fee(raw: Option<&str>, default_fee: f64) -> Result<f64, GatewayError> {
    let Some(raw) = raw else {
        return Ok(default_fee);
    };
    match raw.trim().parse::<f64>() {
        Ok(fee) if fee.is_finite() => Ok(fee),
        _ => Err(GatewayError::ValidationError(format!(
            "fee must be a number, got {:?}",
            raw
        ))),
    }
}
