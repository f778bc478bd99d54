//! Time-series store abstraction.
//!
//! The pipeline only needs a service that accepts a query and returns rows.
//! [`InfluxStore`] talks to an InfluxDB v2 server over HTTP; [`MemoryStore`]
//! answers from canned responses and records every query it receives.

mod annotated;
mod error;
mod influx;
mod memory;
mod record;

pub use annotated::decode_csv;
pub use error::StoreError;
pub use influx::{InfluxStore, InfluxStoreBuilder};
pub use memory::MemoryStore;
pub use record::FluxRecord;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::query::FluxQuery;

/// A time-series store that executes Flux queries.
///
/// Implementations are shared across connections as `Arc<dyn StoreClient>`
/// and must tolerate concurrent calls.
///
/// # Example
///
/// ```
/// use plcwatch::{FluxRecord, MemoryStore, StoreClient};
/// use plcwatch::query::QueryBuilder;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.on(|_| true, vec![FluxRecord::from_pairs([("_value", "Temp")])]);
///
/// let query = QueryBuilder::new("plc").chart(&[], &plcwatch::query::TimeWindow::live(
///     chrono::Utc::now(),
///     chrono::TimeDelta::seconds(3),
/// ));
/// let rows = store.query(&query).await.unwrap();
/// assert_eq!(rows[0].get("_value"), Some("Temp"));
/// # });
/// ```
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Execute a query and collect every returned row.
    async fn query(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Human-readable description of the store, used in logs.
    fn description(&self) -> &str;
}
