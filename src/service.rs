//! The query pipeline shared by the socket handlers and the live scheduler.
//!
//! ```text
//!   request ─► TimeWindow ─► QueryBuilder ─► StoreClient (bounded) ─► rows ─► transform
//!                 │                                                            │
//!        InvalidTimeRange / Unit / Amount            QueryExecution / QueryTimeout
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use plcwatch_types::{ChartDocument, SampleRow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chart::{transform, UnknownMeasurementPolicy};
use crate::config::{ChartConfigStore, Settings};
use crate::error::{Error, Result};
use crate::query::{FluxQuery, HistoricalRange, QueryBuilder, TimeWindow};
use crate::store::{FluxRecord, StoreClient, StoreError};

/// A chart over an explicit local date/time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalChartRequest {
    pub variable_group: String,
    #[serde(flatten)]
    pub range: HistoricalRange,
}

/// A chart over a window ending now, e.g. `searchType: "-6h"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeChartRequest {
    pub variable_group: String,
    pub search_type: String,
}

/// Resolves chart requests against the store and the current configuration.
#[derive(Debug, Clone)]
pub struct ChartService {
    store: Arc<dyn StoreClient>,
    config: Arc<ChartConfigStore>,
    builder: QueryBuilder,
    target_points: u32,
    live_lookback: TimeDelta,
    timeout: Duration,
    policy: UnknownMeasurementPolicy,
}

impl ChartService {
    pub fn new(
        store: Arc<dyn StoreClient>,
        config: Arc<ChartConfigStore>,
        builder: QueryBuilder,
    ) -> Self {
        Self {
            store,
            config,
            builder,
            target_points: 200,
            live_lookback: TimeDelta::seconds(3),
            timeout: Duration::from_secs(10),
            policy: UnknownMeasurementPolicy::default(),
        }
    }

    pub fn from_settings(
        store: Arc<dyn StoreClient>,
        config: Arc<ChartConfigStore>,
        settings: &Settings,
    ) -> Self {
        let chart = &settings.chart;
        Self::new(store, config, chart.query_builder(&settings.influxdb.bucket))
            .with_target_points(chart.target_points)
            .with_live_lookback(chart.live_lookback())
            .with_timeout(chart.query_timeout())
            .with_policy(chart.measurement_policy())
    }

    pub fn with_target_points(mut self, target_points: u32) -> Self {
        self.target_points = target_points;
        self
    }

    pub fn with_live_lookback(mut self, lookback: TimeDelta) -> Self {
        self.live_lookback = lookback;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: UnknownMeasurementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &Arc<ChartConfigStore> {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Aggregated chart for an explicit range in server-local time.
    pub async fn historical(&self, request: &HistoricalChartRequest) -> Result<ChartDocument> {
        let window = TimeWindow::historical(&request.range, self.target_points)?;
        self.chart(&request.variable_group, &window).await
    }

    /// Aggregated chart for a relative token ending at `now`.
    pub async fn relative(
        &self,
        request: &RelativeChartRequest,
        now: DateTime<Utc>,
    ) -> Result<ChartDocument> {
        let window = TimeWindow::relative(&request.search_type, now, self.target_points)?;
        self.chart(&request.variable_group, &window).await
    }

    /// Most recent sample of each listed variable. No variables, no query.
    pub async fn live_rows(&self, variables: &[String], now: DateTime<Utc>) -> Result<Vec<SampleRow>> {
        if variables.is_empty() {
            return Ok(Vec::new());
        }
        let window = TimeWindow::live(now, self.live_lookback);
        self.rows(&self.builder.chart(variables, &window)).await
    }

    /// Ordered variable names of a group in the current configuration.
    pub async fn variables_for_group(&self, group: &str) -> Vec<String> {
        self.config.variables_for_group(group).await
    }

    async fn chart(&self, group: &str, window: &TimeWindow) -> Result<ChartDocument> {
        let config = self.config.snapshot().await;
        let variables = config.variables_for_group(group);
        if variables.is_empty() {
            debug!(group, "Group has no variables, nothing to query");
            return transform(&[], &config.measurements, self.policy);
        }

        let rows = self.rows(&self.builder.chart(variables, window)).await?;
        debug!(group, rows = rows.len(), bucket = ?window.bucket.map(|b| b.to_string()), "Chart query finished");
        transform(&rows, &config.measurements, self.policy)
    }

    async fn rows(&self, query: &FluxQuery) -> Result<Vec<SampleRow>> {
        let records = self.execute(query).await?;
        let tag = self.builder.tag();
        records
            .iter()
            .map(|r| r.to_sample(tag))
            .collect::<std::result::Result<Vec<_>, StoreError>>()
            .map_err(Error::from)
    }

    async fn execute(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>> {
        debug!(query = %query.inline(), "Executing query");
        match tokio::time::timeout(self.timeout, self.store.query(query)).await {
            Ok(records) => Ok(records?),
            Err(_) => Err(Error::QueryTimeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use plcwatch_types::{Measurement, VariableGroup};
    use tempfile::TempDir;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_685_620_800 + secs, 0).unwrap()
    }

    async fn service(store: &MemoryStore, dir: &TempDir) -> ChartService {
        let config = ChartConfigStore::new(dir.path().join("chart-config.yml"), "plc");
        config
            .replace(
                vec![
                    Measurement::new("Temp", 0.0, 100.0, "#FF6384"),
                    Measurement::new("Pressure", 0.0, 10.0, "#36A2EB"),
                ],
                vec![
                    VariableGroup::new("Main", ["Temp", "Pressure"]),
                    VariableGroup::new("Empty", Vec::<String>::new()),
                ],
            )
            .await
            .unwrap();
        ChartService::new(Arc::new(store.clone()), Arc::new(config), QueryBuilder::new("plc"))
    }

    fn relative(group: &str, token: &str) -> RelativeChartRequest {
        RelativeChartRequest {
            variable_group: group.to_string(),
            search_type: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_relative_chart() {
        let store = MemoryStore::new();
        store.on(
            |_| true,
            vec![
                FluxRecord::sample("VariableName", "Pressure", t(0), 1.5),
                FluxRecord::sample("VariableName", "Temp", t(0), 40.0),
                FluxRecord::sample("VariableName", "Pressure", t(18), 1.6),
            ],
        );
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let doc = service.relative(&relative("Main", "-1h"), t(3600)).await.unwrap();
        assert_eq!(doc.datasets().len(), 2);
        assert_eq!(doc.datasets()[0].label, "Pressure");
        assert_eq!(doc.datasets()[0].data.len(), 2);

        let query = &store.queries()[0];
        assert_eq!(query.param("var0"), Some("Temp"));
        assert_eq!(query.param("var1"), Some("Pressure"));
        assert!(query.text().contains("every: 18s"));
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected_before_querying() {
        let store = MemoryStore::new();
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let err = service.relative(&relative("Main", "-5x"), t(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUnit(_)));
        let err = service.relative(&relative("Main", "-xm"), t(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_or_empty_group_queries_nothing() {
        let store = MemoryStore::new();
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let doc = service.relative(&relative("Nope", "-1h"), t(0)).await.unwrap();
        assert!(doc.datasets().is_empty());
        let doc = service.relative(&relative("Empty", "-1h"), t(0)).await.unwrap();
        assert!(doc.datasets().is_empty());
        assert!(service.live_rows(&[], t(0)).await.unwrap().is_empty());
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_historical_range_must_move_forward() {
        let store = MemoryStore::new();
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let request = HistoricalChartRequest {
            variable_group: "Main".to_string(),
            range: HistoricalRange {
                start_date: "2023-01-02".to_string(),
                start_time: "00:00".to_string(),
                end_date: "2023-01-01".to_string(),
                end_time: "00:00".to_string(),
            },
        };
        let err = service.historical(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTimeRange(_)));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = MemoryStore::new();
        store.fail_on(|_| true, "bucket not found");
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let err = service.relative(&relative("Main", "-1h"), t(0)).await.unwrap_err();
        assert!(matches!(err, Error::QueryExecution(StoreError::Query(_))));
    }

    #[tokio::test]
    async fn test_malformed_row_is_a_query_error() {
        let store = MemoryStore::new();
        store.on(|_| true, vec![FluxRecord::from_pairs([("_value", "1")])]);
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir).await;

        let err = service
            .live_rows(&["Temp".to_string()], t(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QueryExecution(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let store = MemoryStore::new().with_latency(Duration::from_secs(60));
        let dir = TempDir::new().unwrap();
        let service = service(&store, &dir)
            .await
            .with_timeout(Duration::from_secs(2));

        let err = service
            .live_rows(&["Temp".to_string()], t(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QueryTimeout(d) if d == Duration::from_secs(2)));
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"variableGroup":"Main","startDate":"2023-01-01","startTime":"08:00","endDate":"2023-01-01","endTime":"17:30"}"#;
        let request: HistoricalChartRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.variable_group, "Main");
        assert_eq!(request.range.end_time, "17:30");

        let request: RelativeChartRequest =
            serde_json::from_str(r#"{"variableGroup":"Main","searchType":"-6h"}"#).unwrap();
        assert_eq!(request.search_type, "-6h");
    }
}
