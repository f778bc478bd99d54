//! Settings and chart configuration.
//!
//! - [`settings`]: process settings (store connection, listener, query tuning)
//! - [`store`]: the shared chart configuration and its YAML file
//! - [`defaults`]: seeding the chart configuration from the store

pub mod defaults;
pub mod settings;
pub mod store;

pub use defaults::{DefaultGenerator, GenerationReport};
pub use settings::{ChartSettings, InfluxSettings, ServerSettings, Settings};
pub use store::{validate, ChartConfigStore, ConfigUpdate, LoadOutcome};

use tracing::{info, warn};

/// Load the chart configuration, generating one from the store when the file
/// is missing or unusable.
///
/// An unusable file is moved to `<path>.bak` first; if that fails nothing is
/// generated and the file is left as it is. Generation failures are logged;
/// the process continues with an empty configuration.
pub async fn open(store: &ChartConfigStore, generator: &DefaultGenerator) -> LoadOutcome {
    let outcome = store.load().await;
    if outcome.is_loaded() {
        return outcome;
    }

    info!(
        path = %store.path().display(),
        ?outcome,
        "No usable chart configuration, generating defaults"
    );
    if outcome == LoadOutcome::Corrupt {
        if let Err(e) = store.back_up().await {
            warn!(error = %e, "Keeping unusable chart configuration, defaults not generated");
            return outcome;
        }
    }
    if let Err(e) = generator.generate(store).await {
        warn!(error = %e, "Default chart configuration generation failed");
    }
    outcome
}
