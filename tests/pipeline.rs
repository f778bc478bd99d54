//! End-to-end: default generation, chart requests and configuration updates
//! against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use plcwatch::config::{self, ChartConfigStore, DefaultGenerator, LoadOutcome};
use plcwatch::query::{FluxQuery, HistoricalRange, QueryBuilder, RelativeOffset};
use plcwatch::{
    ChartService, ConfigUpdate, Error, FluxRecord, HistoricalChartRequest, MemoryStore,
    RelativeChartRequest,
};
use plcwatch_types::{AxisDisplayType, DEFAULT_GROUP_NAME};
use tempfile::TempDir;

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.on(
        |q: &FluxQuery| q.text().contains("schema.tagValues"),
        ["Temp", "Pressure", "Flow"]
            .iter()
            .map(|v| FluxRecord::from_pairs([("_value", *v)]))
            .collect(),
    );
    store.on(
        |q: &FluxQuery| q.param("variable") == Some("Temp"),
        vec![FluxRecord::from_pairs([("min", "12.5"), ("max", "88")])],
    );
    store.fail_on(
        |q: &FluxQuery| q.param("variable") == Some("Pressure"),
        "unsupported input type for mean aggregate: string",
    );
    store.on(
        |q: &FluxQuery| q.param("variable") == Some("Flow"),
        vec![FluxRecord::from_pairs([("min", "0"), ("max", "40")])],
    );
    store.respond_with(|q| {
        if !q.text().contains("aggregateWindow") {
            return None;
        }
        let t = |s: i64| Utc.timestamp_opt(1_672_531_200 + s, 0).unwrap();
        Some(Ok(vec![
            FluxRecord::sample("VariableName", "Flow", t(0), 10.0),
            FluxRecord::sample("VariableName", "Temp", t(0), 20.0),
            FluxRecord::sample("VariableName", "Flow", t(3), 11.0),
            FluxRecord::sample("VariableName", "Temp", t(3), 21.0),
        ]))
    });
    store
}

async fn bootstrap(store: &MemoryStore, dir: &TempDir) -> (ChartService, LoadOutcome) {
    let chart_config = Arc::new(ChartConfigStore::new(
        dir.path().join("chart-config.yml"),
        "plc",
    ));
    let generator = DefaultGenerator::new(
        Arc::new(store.clone()),
        QueryBuilder::new("plc"),
        RelativeOffset::parse("-30d").unwrap(),
        Duration::from_secs(5),
    );
    let outcome = config::open(&chart_config, &generator).await;
    let service = ChartService::new(Arc::new(store.clone()), chart_config, QueryBuilder::new("plc"));
    (service, outcome)
}

#[tokio::test]
async fn test_generated_configuration_drives_charts() {
    let store = seeded_store();
    let dir = TempDir::new().unwrap();
    let (service, outcome) = bootstrap(&store, &dir).await;
    assert_eq!(outcome, LoadOutcome::Missing);

    let config = service.config().snapshot().await;
    let names: Vec<_> = config.measurements.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Temp", "Flow"]);
    assert_eq!(config.variables_for_group(DEFAULT_GROUP_NAME), ["Temp", "Flow"]);

    let request = HistoricalChartRequest {
        variable_group: DEFAULT_GROUP_NAME.to_string(),
        range: HistoricalRange {
            start_date: "2023-01-01".to_string(),
            start_time: "00:00".to_string(),
            end_date: "2023-01-01".to_string(),
            end_time: "00:10".to_string(),
        },
    };
    let chart = service.historical(&request).await.unwrap();

    let labels: Vec<_> = chart.datasets().iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, ["Flow", "Temp"]);
    assert_eq!(chart.axis("y1").unwrap().max, 40.0);
    assert!(chart.axis("y1").unwrap().display);
    assert!(!chart.axis("y2").unwrap().display);

    let query = store.queries().pop().unwrap();
    assert!(query.text().contains("aggregateWindow(every: 3s"));
    assert_eq!(query.param("var0"), Some("Temp"));
    assert_eq!(query.param("var1"), Some("Flow"));
}

#[tokio::test]
async fn test_configuration_survives_restart() {
    let store = seeded_store();
    let dir = TempDir::new().unwrap();
    let (service, _) = bootstrap(&store, &dir).await;

    let mut measurements = service.config().snapshot().await.measurements.clone();
    measurements[0].axis_display_type = AxisDisplayType::Logarithmic;
    measurements[0].units = "°C".to_string();
    service
        .config()
        .update(ConfigUpdate {
            measurements: Some(measurements),
            variable_groups: None,
        })
        .await
        .unwrap();
    let before = service.config().snapshot().await;

    let probes_before = store.query_count();
    let (restarted, outcome) = bootstrap(&store, &dir).await;
    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(store.query_count(), probes_before);
    assert_eq!(*restarted.config().snapshot().await, *before);
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_store() {
    let store = seeded_store();
    let dir = TempDir::new().unwrap();
    let (service, _) = bootstrap(&store, &dir).await;
    let queries = store.query_count();

    for (token, expected) in [("-5x", "unit"), ("-m", "amount"), ("10m", "amount")] {
        let request = RelativeChartRequest {
            variable_group: DEFAULT_GROUP_NAME.to_string(),
            search_type: token.to_string(),
        };
        let err = service.relative(&request, Utc::now()).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains(expected), "{}: {}", token, err);
    }

    let update = ConfigUpdate {
        measurements: Some(Vec::new()),
        variable_groups: None,
    };
    let err = service.config().update(update).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(store.query_count(), queries);
}
