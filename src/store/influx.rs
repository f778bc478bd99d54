//! InfluxDB v2 store using the HTTP query API.
//!
//! Queries are POSTed to `/api/v2/query` as JSON and the CSV response is
//! decoded into [`FluxRecord`]s. By default parameters are bound separately
//! from the Flux text. Servers without parameterized query support (InfluxDB
//! OSS) need [`InfluxStoreBuilder::parameterized`] turned off, which sends
//! [`FluxQuery::inline`] text with no `params`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use plcwatch::{InfluxStore, StoreClient};
//!
//! # tokio_test::block_on(async {
//! let store = InfluxStore::builder()
//!     .endpoint("http://localhost:8086")
//!     .org("plant")
//!     .token("secret-token")
//!     .build()
//!     .unwrap();
//!
//! store.ping().await.unwrap();
//! # });
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{decode_csv, FluxRecord, StoreClient, StoreError};
use crate::query::FluxQuery;

/// Store client for an InfluxDB v2 server.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    endpoint: String,
    org: String,
    token: String,
    parameterized: bool,
    description: String,
}

impl InfluxStore {
    /// Create a new builder for configuring the client.
    pub fn builder() -> InfluxStoreBuilder {
        InfluxStoreBuilder::default()
    }

    fn query_url(&self) -> String {
        format!("{}/api/v2/query", self.endpoint)
    }

    fn request_body(&self, query: &FluxQuery) -> QueryRequest {
        let (query, params) = if self.parameterized {
            (query.text().to_string(), query.params_json())
        } else {
            (query.inline(), Map::new())
        };

        QueryRequest {
            query,
            params,
            kind: "flux",
            dialect: Dialect::default(),
        }
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.endpoint)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Auth(message));
        }

        Err(StoreError::Status {
            code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl StoreClient for InfluxStore {
    async fn query(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>, StoreError> {
        let request = self.request_body(query);

        let response = self
            .client
            .post(self.query_url())
            .query(&[("org", self.org.as_str())])
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/csv")
            .json(&request)
            .send()
            .await?;

        let body = Self::check_status(response).await?.text().await?;
        decode_csv(&body)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.health_url()).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for InfluxStore.
#[derive(Debug, Default)]
pub struct InfluxStoreBuilder {
    endpoint: Option<String>,
    org: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    parameterized: Option<bool>,
}

impl InfluxStoreBuilder {
    /// Set the server URL (e.g., "http://localhost:8086").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the organization queries run in.
    pub fn org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    /// Set the API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bind query parameters separately (default: true).
    ///
    /// When false, values are inlined as escaped literals instead.
    pub fn parameterized(mut self, parameterized: bool) -> Self {
        self.parameterized = Some(parameterized);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<InfluxStore, StoreError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:8086".to_string())
            .trim_end_matches('/')
            .to_string();
        let org = self.org.unwrap_or_default();

        Ok(InfluxStore {
            client,
            description: format!("influxdb: {} (org {})", endpoint, org),
            endpoint,
            org,
            token: self.token.unwrap_or_default(),
            parameterized: self.parameterized.unwrap_or(true),
        })
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    query: String,
    params: Map<String, Value>,
    #[serde(rename = "type")]
    kind: &'static str,
    dialect: Dialect,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Dialect {
    header: bool,
    delimiter: &'static str,
    annotations: Vec<&'static str>,
    comment_prefix: &'static str,
    date_time_format: &'static str,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: ",",
            annotations: Vec::new(),
            comment_prefix: "#",
            date_time_format: "RFC3339",
        }
    }
}

/// Error body returned by the API on non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;

    #[test]
    fn test_builder_defaults() {
        let store = InfluxStore::builder().build().unwrap();
        assert_eq!(store.endpoint, "http://localhost:8086");
        assert_eq!(store.org, "");
        assert_eq!(store.query_url(), "http://localhost:8086/api/v2/query");
    }

    #[test]
    fn test_builder_custom() {
        let store = InfluxStore::builder()
            .endpoint("http://influx.plant:8086/")
            .org("plant")
            .token("t0k3n")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(store.endpoint, "http://influx.plant:8086");
        assert_eq!(store.org, "plant");
        assert_eq!(store.token, "t0k3n");
        assert_eq!(store.health_url(), "http://influx.plant:8086/health");
        assert_eq!(store.description(), "influxdb: http://influx.plant:8086 (org plant)");
    }

    fn live_query() -> FluxQuery {
        let window = crate::query::TimeWindow::live(chrono::Utc::now(), chrono::TimeDelta::seconds(3));
        QueryBuilder::new("plc").chart(&["Temp".to_string()], &window)
    }

    #[test]
    fn test_request_body() {
        let store = InfluxStore::builder().build().unwrap();
        let query = live_query();

        let json = serde_json::to_value(store.request_body(&query)).unwrap();
        assert_eq!(json["type"], "flux");
        assert_eq!(json["query"], query.text());
        assert_eq!(json["params"]["bucket"], "plc");
        assert_eq!(json["params"]["var0"], "Temp");
        assert_eq!(json["dialect"]["header"], true);
        assert_eq!(json["dialect"]["dateTimeFormat"], "RFC3339");
    }

    #[test]
    fn test_request_body_inlined() {
        let store = InfluxStore::builder().parameterized(false).build().unwrap();
        let query = live_query();

        let json = serde_json::to_value(store.request_body(&query)).unwrap();
        let text = json["query"].as_str().unwrap();
        assert!(text.starts_with("from(bucket: \"plc\")"));
        assert!(text.contains(r#"r["VariableName"] == "Temp""#));
        assert!(!text.contains("params."));
        assert!(json["params"].as_object().unwrap().is_empty());
        assert_eq!(json["type"], "flux");
    }
}
