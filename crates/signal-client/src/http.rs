use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use signal_core::{
    CurrentSignal, HistoricalTradeRecord, LivePredictionRecord, PerformanceStats, SignalPoint,
    SymbolStatus,
};

use crate::error::{UpstreamError, UpstreamResult};
use crate::source::SignalSource;
use crate::SignalSourceConfig;

/// HTTP client for the signal-generation service.
///
/// Every call is a single attempt: no retries, no caching. Payloads are
/// decoded into typed records here so malformed bodies never reach the
/// accounting code.
#[derive(Clone)]
pub struct HttpSignalSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSignalSource {
    pub fn new(config: SignalSourceConfig) -> UpstreamResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl(config.base_url));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> UpstreamResult<T> {
        let url = self.endpoint(segments)?;

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::RequestFailed(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::ServiceUnavailable(format!(
                "Status: {} from {}",
                status,
                url.path()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::RequestFailed(e)
            }
        })?;

        serde_json::from_slice::<T>(&body).map_err(|e| {
            tracing::debug!("Rejected payload from {}: {}", url.path(), e);
            UpstreamError::InvalidResponse(format!("{}: {}", url.path(), e))
        })
    }
}

#[async_trait]
impl SignalSource for HttpSignalSource {
    async fn signal_points(&self) -> UpstreamResult<Vec<SignalPoint>> {
        self.get_json(&["signals"]).await
    }

    async fn current_signal(&self, symbol: &str) -> UpstreamResult<CurrentSignal> {
        self.get_json(&["signals", symbol, "current"]).await
    }

    async fn trade_history(&self, symbol: &str) -> UpstreamResult<Vec<HistoricalTradeRecord>> {
        self.get_json(&["history", symbol]).await
    }

    async fn live_predictions(&self, symbol: &str) -> UpstreamResult<Vec<LivePredictionRecord>> {
        self.get_json(&["live", symbol]).await
    }

    async fn backtest_stats(&self, symbol: &str) -> UpstreamResult<PerformanceStats> {
        self.get_json(&["stats", symbol, "backtest"]).await
    }

    async fn validation_stats(&self, symbol: &str) -> UpstreamResult<PerformanceStats> {
        self.get_json(&["stats", symbol, "validation"]).await
    }

    async fn symbol_status(&self, symbol: &str) -> UpstreamResult<SymbolStatus> {
        self.get_json(&["symbols", symbol, "status"]).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;
    use signal_core::SignalValue;
    use std::time::Duration;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base_url: String, timeout: Duration) -> HttpSignalSource {
        HttpSignalSource::new(SignalSourceConfig::new(base_url, timeout)).unwrap()
    }

    fn upstream_router() -> Router {
        Router::new()
            .route(
                "/signals",
                get(|| async {
                    Json(json!([{
                        "asset": "BTCUSDT",
                        "timeframe": "15m",
                        "signal_value": 1,
                        "generated_at": "2024-05-01T10:00:00Z",
                        "last_updated_at": "2024-05-01T10:05:00Z"
                    }]))
                }),
            )
            .route(
                "/symbols/:symbol/status",
                get(|Path(symbol): Path<String>| async move {
                    if symbol == "NEWCOIN" {
                        Err(AxumStatus::NOT_FOUND)
                    } else {
                        Ok(Json(json!({ "symbol": symbol, "initialized": true })))
                    }
                }),
            )
            .route("/history/:symbol", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }))
            .route("/live/:symbol", get(|| async { Json(json!({ "not": "an array" })) }))
            .route(
                "/stats/:symbol/backtest",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({ "total_trades": 10 }))
                }),
            )
    }

    #[tokio::test]
    async fn test_signal_points_decoded() {
        let base = spawn_upstream(upstream_router()).await;
        let client = source(base, Duration::from_secs(5));

        let points = client.signal_points().await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].asset, "BTCUSDT");
        assert_eq!(points[0].signal_value, SignalValue::Buy);
    }

    #[tokio::test]
    async fn test_symbol_status_not_found() {
        let base = spawn_upstream(upstream_router()).await;
        let client = source(base, Duration::from_secs(5));

        let ready = client.symbol_status("BTCUSDT").await.unwrap();
        assert!(ready.initialized);

        let err = client.symbol_status("NEWCOIN").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_is_service_unavailable() {
        let base = spawn_upstream(upstream_router()).await;
        let client = source(base, Duration::from_secs(5));

        let err = client.trade_history("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, UpstreamError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let base = spawn_upstream(upstream_router()).await;
        let client = source(base, Duration::from_secs(5));

        let err = client.live_predictions("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let base = spawn_upstream(upstream_router()).await;
        let client = source(base, Duration::from_millis(200));

        let err = client.backtest_stats("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = source(format!("http://{}", addr), Duration::from_secs(2));
        let err = client.signal_points().await.unwrap_err();
        assert!(matches!(err, UpstreamError::RequestFailed(_)));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = source("http://upstream.local/api/".to_string(), Duration::from_secs(1));
        let url = client.endpoint(&["history", "BTC/USD"]).unwrap();
        assert_eq!(url.as_str(), "http://upstream.local/api/history/BTC%2FUSD");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpSignalSource::new(SignalSourceConfig::new("not a url", Duration::from_secs(1)));
        assert!(matches!(result, Err(UpstreamError::InvalidUrl(_))));
    }
}
