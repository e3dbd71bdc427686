//! Prometheus instant-query API client.

use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::TargetConfig;
use crate::series::RawSample;

/// Error type for fetch operations.
///
/// Never retried at this layer: the coordinator retries on its next
/// scheduled cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Prometheus API error: {0}")]
    Api(String),
}

/// Label-matcher selector for one target.
#[derive(Debug, Clone)]
pub struct Selector {
    pub job: String,
    pub instance_label: String,
    pub instance_value: String,
    pub label_filters: HashMap<String, String>,
}

impl Selector {
    /// Build the selector for a target's configuration.
    pub fn from_target(target: &TargetConfig) -> Self {
        Self {
            job: target.job.clone(),
            instance_label: target.instance_label.clone(),
            instance_value: target.instance_value.clone(),
            label_filters: target.label_filters.clone(),
        }
    }

    /// Render the PromQL label-matcher expression.
    ///
    /// Extra filters are rendered in sorted label order so the query string
    /// is deterministic.
    pub fn render(&self) -> String {
        let mut matchers = vec![
            format!("job=\"{}\"", self.job),
            format!("{}=\"{}\"", self.instance_label, self.instance_value),
        ];

        let mut extra: Vec<(&str, &str)> = self
            .label_filters
            .iter()
            .map(|(label, value)| (label.as_str(), value.as_str()))
            .collect();
        extra.sort();

        for (label, value) in extra {
            matchers.push(format!("{}=\"{}\"", label, value));
        }

        format!("{{{}}}", matchers.join(","))
    }
}

/// One query per poll cycle against a labeled-time-series API.
///
/// Abstracted as a trait so coordinators can be tested with scripted
/// responses; [`PrometheusClient`] is the production implementation.
pub trait QueryApi {
    /// Fetch the current samples matching a selector.
    fn fetch(
        &self,
        selector: &Selector,
    ) -> impl Future<Output = Result<Vec<RawSample>, FetchError>> + Send;
}

/// HTTP client for the Prometheus `/api/v1/query` endpoint.
///
/// All targets share one pooled `reqwest::Client`; each `PrometheusClient`
/// only carries the base URL and timeout.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PrometheusClient {
    /// Create a client for a Prometheus server.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// Issue a single instant query and parse the result list.
    async fn query(&self, expr: &str) -> Result<Vec<RawSample>, FetchError> {
        let url = format!("{}/api/v1/query", self.base_url);

        tracing::debug!(url = %url, query = %expr, "Querying Prometheus");

        let response = self
            .http
            .get(&url)
            .query(&[("query", expr)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        parse_body(&body)
    }
}

impl QueryApi for PrometheusClient {
    fn fetch(
        &self,
        selector: &Selector,
    ) -> impl Future<Output = Result<Vec<RawSample>, FetchError>> + Send {
        let expr = selector.render();
        async move { self.query(&expr).await }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<RawSample>,
}

/// Parse an instant-query response body into the raw result list.
fn parse_body(body: &str) -> Result<Vec<RawSample>, FetchError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if response.status != "success" {
        return Err(FetchError::Api(
            response.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    Ok(response.data.map(|data| data.result).unwrap_or_default())
}
