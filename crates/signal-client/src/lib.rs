pub mod error;
pub mod http;
pub mod source;

pub use error::{UpstreamError, UpstreamResult};
pub use http::HttpSignalSource;
pub use source::SignalSource;

use std::time::Duration;

/// Connection settings for the upstream signal-generation service.
#[derive(Debug, Clone)]
pub struct SignalSourceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl SignalSourceConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}
