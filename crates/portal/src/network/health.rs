use crate::config::PortalConfig;
use chrono::{DateTime, Utc};
use portal_core::retry::with_timeout;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Default bound for a health probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of a [`check_api_health`] probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Whether the endpoint answered with a 2xx status
    pub is_healthy: bool,
    /// HTTP status, when a response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Round-trip time in milliseconds
    pub response_time_ms: u64,
    /// When the probe finished
    pub checked_at: DateTime<Utc>,
    /// Why the probe failed, when no response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probe `endpoint` with a `HEAD` request bounded by `timeout`.
///
/// Never fails: transport errors and timeouts produce an unhealthy report
/// carrying the error text.
pub async fn check_api_health(
    client: &reqwest::Client,
    endpoint: &Url,
    timeout: Duration,
) -> HealthReport {
    let start = Instant::now();
    let request = client
        .head(endpoint.clone())
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send();
    let outcome = with_timeout(request, timeout).await;
    let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let report = match outcome {
        Ok(response) => HealthReport {
            is_healthy: response.status().is_success(),
            status: Some(response.status().as_u16()),
            response_time_ms,
            checked_at: Utc::now(),
            error: None,
        },
        Err(err) => HealthReport {
            is_healthy: false,
            status: None,
            response_time_ms,
            checked_at: Utc::now(),
            error: Some(err.to_string()),
        },
    };

    debug!(
        endpoint = %endpoint,
        healthy = report.is_healthy,
        status = report.status,
        response_time_ms = report.response_time_ms,
        "health probe finished"
    );
    report
}

/// Probe the health endpoint `config` points at, bounded by
/// [`DEFAULT_HEALTH_TIMEOUT`].
pub async fn check_backend_health(
    client: &reqwest::Client,
    config: &PortalConfig,
) -> HealthReport {
    check_api_health(client, &config.health_url(), DEFAULT_HEALTH_TIMEOUT).await
}
