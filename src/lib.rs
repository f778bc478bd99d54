//! # plcwatch
//!
//! A dashboard backend for PLC process data stored in InfluxDB.
//!
//! Clients pick a variable group and a time range (explicit, relative, or
//! live); the server turns that into a Flux query, runs it against the store,
//! and reshapes the rows into a multi-axis line chart document.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  server (axum)                                                    │
//! │   /api/chart-config ──► config::ChartConfigStore ◄── defaults     │
//! │   /ws ──► socket::Connection ──► live::LiveScheduler              │
//! │                 │                      │                          │
//! │                 ▼                      ▼                          │
//! │            service::ChartService ◄─────┘                          │
//! │       query::TimeWindow ─► query::QueryBuilder ─► store ─► chart  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`query`]**: time window resolution, bucket widths and parameterised Flux
//! - **[`store`]**: the [`StoreClient`] trait, the InfluxDB v2 client and an
//!   in-memory store
//! - **[`chart`]**: rows + measurement metadata to a chart document
//! - **[`config`]**: process settings and the persisted chart configuration
//! - **[`live`]**: per-connection live polling
//! - **[`service`]**: the query pipeline facade with bounded store calls
//! - **[`server`]**: HTTP endpoints and the websocket protocol
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use plcwatch::{ChartConfigStore, ChartService, FluxRecord, MemoryStore, RelativeChartRequest};
//! use plcwatch::query::QueryBuilder;
//! use plcwatch_types::{Measurement, VariableGroup};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! store.on(|_| true, vec![FluxRecord::sample("VariableName", "Temp", Utc::now(), 21.5)]);
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = ChartConfigStore::new(dir.path().join("chart-config.yml"), "plc");
//! config
//!     .replace(
//!         vec![Measurement::new("Temp", 0.0, 100.0, "#FF6384")],
//!         vec![VariableGroup::new("Main", ["Temp"])],
//!     )
//!     .await
//!     .unwrap();
//!
//! let service = ChartService::new(Arc::new(store), Arc::new(config), QueryBuilder::new("plc"));
//! let request = RelativeChartRequest {
//!     variable_group: "Main".to_string(),
//!     search_type: "-1h".to_string(),
//! };
//! let chart = service.relative(&request, Utc::now()).await.unwrap();
//! assert_eq!(chart.datasets()[0].label, "Temp");
//! # });
//! ```

pub mod chart;
pub mod config;
pub mod error;
pub mod live;
pub mod query;
pub mod server;
pub mod service;
pub mod store;

pub use config::{ChartConfigStore, ConfigUpdate, DefaultGenerator, Settings};
pub use error::{Error, Result};
pub use live::{LiveScheduler, LiveUpdate};
pub use service::{ChartService, HistoricalChartRequest, RelativeChartRequest};
pub use store::{FluxRecord, InfluxStore, MemoryStore, StoreClient, StoreError};
