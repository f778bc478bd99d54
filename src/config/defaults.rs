//! Deriving a starting configuration from the data itself.
//!
//! ```text
//!   distinct variables ──► [A, B, C]
//!                            │  │  │   min/max probes, a bounded number at a time
//!                            ▼  ▼  ▼
//!                           ok ok err ──► C skipped with a warning
//!                            │  │
//!                            ▼  ▼
//!   measurements [A, B] + group "All Variables" [A, B] ──► store.replace()
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use plcwatch_types::{Measurement, VariableGroup, DEFAULT_GROUP_NAME};
use tracing::{info, warn};

use super::store::ChartConfigStore;
use crate::chart::color_for;
use crate::error::{Error, Result};
use crate::query::{FluxQuery, QueryBuilder, RelativeOffset};
use crate::store::{FluxRecord, StoreClient};

/// What default generation found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Every variable name the store reported, in discovery order.
    pub discovered: Vec<String>,
    /// Variables that became measurements.
    pub included: Vec<String>,
    /// Variables left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Probes in flight at once unless configured otherwise.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Discovers variables and their value ranges to seed an empty configuration.
#[derive(Debug, Clone)]
pub struct DefaultGenerator {
    store: Arc<dyn StoreClient>,
    builder: QueryBuilder,
    lookback: RelativeOffset,
    timeout: Duration,
    concurrency: usize,
}

impl DefaultGenerator {
    pub fn new(
        store: Arc<dyn StoreClient>,
        builder: QueryBuilder,
        lookback: RelativeOffset,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            builder,
            lookback,
            timeout,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    /// Cap the number of min/max probes sent to the store at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Discover measurements and replace the stored configuration with them.
    ///
    /// Fails only if discovery itself fails or the result cannot be saved.
    /// Variables whose probe fails or finds no samples are skipped.
    pub async fn generate(&self, config: &ChartConfigStore) -> Result<GenerationReport> {
        let (measurements, report) = self.discover().await?;

        let group = VariableGroup::new(
            DEFAULT_GROUP_NAME,
            measurements.iter().map(|m| m.name.clone()),
        );
        config.replace(measurements, vec![group]).await?;

        info!(
            discovered = report.discovered.len(),
            included = report.included.len(),
            skipped = report.skipped.len(),
            "Generated default chart configuration"
        );
        Ok(report)
    }

    /// Probe every distinct variable. Colours follow discovery order.
    pub async fn discover(&self) -> Result<(Vec<Measurement>, GenerationReport)> {
        let records = self
            .run(&self.builder.distinct_variables(&self.lookback))
            .await?;

        let mut discovered: Vec<String> = Vec::new();
        for name in records.iter().filter_map(|r| r.get("_value")) {
            if !name.is_empty() && !discovered.iter().any(|d| d == name) {
                discovered.push(name.to_string());
            }
        }

        let probes: Vec<_> = discovered.iter().map(|name| self.probe(name)).collect();
        let results: Vec<_> = stream::iter(probes)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = GenerationReport {
            discovered: discovered.clone(),
            ..GenerationReport::default()
        };
        let mut measurements = Vec::new();

        for (index, (name, result)) in discovered.into_iter().zip(results).enumerate() {
            match result {
                Ok((min, max)) => {
                    measurements.push(Measurement::new(name.clone(), min, max, color_for(index)));
                    report.included.push(name);
                }
                Err(reason) => {
                    warn!(variable = %name, %reason, "Skipping variable in default configuration");
                    report.skipped.push((name, reason));
                }
            }
        }

        Ok((measurements, report))
    }

    async fn probe(&self, variable: &str) -> std::result::Result<(f64, f64), String> {
        let records = self
            .run(&self.builder.min_max(variable, &self.lookback))
            .await
            .map_err(|e| e.to_string())?;
        range_of(&records).ok_or_else(|| "no samples in look-back window".to_string())
    }

    async fn run(&self, query: &FluxQuery) -> Result<Vec<FluxRecord>> {
        match tokio::time::timeout(self.timeout, self.store.query(query)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::QueryTimeout(self.timeout)),
        }
    }
}

/// The `min`/`max` pair of a probe result. Identity values mean no samples.
fn range_of(records: &[FluxRecord]) -> Option<(f64, f64)> {
    let record = records.first()?;
    let min = record.f64("min")?;
    let max = record.f64("max")?;
    (min.is_finite() && max.is_finite() && min <= max).then_some((min, max))
}
