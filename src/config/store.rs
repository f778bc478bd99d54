//! Shared, persisted chart configuration.
//!
//! ```text
//!   GET /api/chart-config ──┐
//!   live subscriptions ─────┼── snapshot() ──► Arc<ChartConfiguration>
//!   chart requests ─────────┘
//!
//!   POST /api/chart-config ── update() ──► validate ─► write file ─► swap
//!   default generation ────── replace() ─────────────► write file ─► swap
//! ```
//!
//! Readers clone the current `Arc` and never observe a half-applied update.
//! Writers hold the write lock across validation, persistence and the swap,
//! so a failed write leaves the previous configuration in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plcwatch_types::{ChartConfigFile, ChartConfiguration, Measurement, VariableGroup};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A partial configuration update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default)]
    pub measurements: Option<Vec<Measurement>>,
    #[serde(default, alias = "variablegroups")]
    pub variable_groups: Option<Vec<VariableGroup>>,
}

/// How [`ChartConfigStore::load`] went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read and parsed.
    Loaded,
    /// No file exists yet.
    Missing,
    /// The file exists but could not be read, parsed or validated.
    Corrupt,
}

impl LoadOutcome {
    pub fn is_loaded(self) -> bool {
        self == LoadOutcome::Loaded
    }
}

/// The process-wide chart configuration, backed by a YAML file.
#[derive(Debug)]
pub struct ChartConfigStore {
    path: PathBuf,
    current: RwLock<Arc<ChartConfiguration>>,
}

impl ChartConfigStore {
    /// Create a store with an empty configuration. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(ChartConfiguration::empty(bucket))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the configuration file.
    ///
    /// On any failure the configuration is reset to empty; it is never left
    /// partially populated.
    pub async fn load(&self) -> LoadOutcome {
        let mut current = self.current.write().await;
        let mut next = ChartConfiguration::empty(current.bucket.clone());

        let outcome = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => match serde_yaml::from_str::<ChartConfigFile>(&text) {
                Ok(file) => {
                    next.apply_file(file);
                    if let Err(e) = validate(&next) {
                        warn!(path = %self.path.display(), error = %e, "chart configuration is inconsistent");
                        next = ChartConfiguration::empty(current.bucket.clone());
                        LoadOutcome::Corrupt
                    } else {
                        LoadOutcome::Loaded
                    }
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "chart configuration does not parse");
                    LoadOutcome::Corrupt
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LoadOutcome::Missing,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "chart configuration is unreadable");
                LoadOutcome::Corrupt
            }
        };

        if outcome.is_loaded() {
            info!(
                path = %self.path.display(),
                measurements = next.measurements.len(),
                groups = next.variable_groups.len(),
                "Loaded chart configuration"
            );
        }

        *current = Arc::new(next);
        outcome
    }

    /// Current configuration.
    pub async fn snapshot(&self) -> Arc<ChartConfiguration> {
        Arc::clone(&*self.current.read().await)
    }

    /// Ordered variable names of a group; empty if the group does not exist.
    pub async fn variables_for_group(&self, group: &str) -> Vec<String> {
        self.snapshot().await.variables_for_group(group).to_vec()
    }

    /// Merge a partial update, validate the result and persist it.
    ///
    /// Returns the new configuration. On error nothing changes.
    pub async fn update(&self, update: ConfigUpdate) -> Result<Arc<ChartConfiguration>> {
        let mut current = self.current.write().await;

        let mut next = ChartConfiguration::clone(&current);
        if let Some(measurements) = update.measurements {
            next.measurements = measurements;
        }
        if let Some(groups) = update.variable_groups {
            next.variable_groups = groups;
        }
        for group in &mut next.variable_groups {
            group.is_selected = false;
        }

        validate(&next)?;
        self.persist(&next).await?;

        let next = Arc::new(next);
        *current = Arc::clone(&next);
        info!(
            measurements = next.measurements.len(),
            groups = next.variable_groups.len(),
            "Chart configuration updated"
        );
        Ok(next)
    }

    /// Replace measurements and groups wholesale and persist them.
    pub async fn replace(
        &self,
        measurements: Vec<Measurement>,
        variable_groups: Vec<VariableGroup>,
    ) -> Result<Arc<ChartConfiguration>> {
        self.update(ConfigUpdate {
            measurements: Some(measurements),
            variable_groups: Some(variable_groups),
        })
        .await
    }

    /// Write the current configuration to the file.
    pub async fn save(&self) -> Result<()> {
        let current = self.current.write().await;
        self.persist(&current).await
    }

    /// Move the file aside to `<path>.bak`, replacing any earlier backup.
    pub async fn back_up(&self) -> Result<PathBuf> {
        let backup = self.sibling(".bak");
        tokio::fs::rename(&self.path, &backup)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;
        info!(path = %self.path.display(), backup = %backup.display(), "Chart configuration backed up");
        Ok(backup)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    /// Write via a sibling temp file and rename, so the file is never torn.
    async fn persist(&self, config: &ChartConfiguration) -> Result<()> {
        let yaml = serde_yaml::to_string(&ChartConfigFile::from(config))
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let tmp = self.sibling(".tmp");

        let describe = |e: std::io::Error| Error::Persistence(format!("{}: {}", self.path.display(), e));

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(describe)?;
        }
        tokio::fs::write(&tmp, yaml).await.map_err(describe)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(describe)?;

        debug!(path = %self.path.display(), "Chart configuration written");
        Ok(())
    }
}

/// Check the invariants every stored configuration holds.
///
/// - measurement names are non-empty and unique
/// - `ymin <= ymax`, both finite
/// - group names are non-empty and unique
/// - every group variable names a measurement, at most once per group
pub fn validate(config: &ChartConfiguration) -> Result<()> {
    let mut names = HashSet::new();
    for m in &config.measurements {
        if m.name.trim().is_empty() {
            return Err(Error::Validation("measurement name is empty".to_string()));
        }
        if !names.insert(m.name.as_str()) {
            return Err(Error::Validation(format!(
                "measurement '{}' is defined more than once",
                m.name
            )));
        }
        if !m.ymin.is_finite() || !m.ymax.is_finite() || m.ymin > m.ymax {
            return Err(Error::Validation(format!(
                "measurement '{}' has an invalid range {}..{}",
                m.name, m.ymin, m.ymax
            )));
        }
    }

    let mut groups = HashSet::new();
    for g in &config.variable_groups {
        if g.name.trim().is_empty() {
            return Err(Error::Validation("variable group name is empty".to_string()));
        }
        if !groups.insert(g.name.as_str()) {
            return Err(Error::Validation(format!(
                "variable group '{}' is defined more than once",
                g.name
            )));
        }
        let mut seen = HashSet::new();
        for v in &g.variables {
            if !names.contains(v.as_str()) {
                return Err(Error::Validation(format!(
                    "variable group '{}' references unknown measurement '{}'",
                    g.name, v
                )));
            }
            if !seen.insert(v.as_str()) {
                return Err(Error::Validation(format!(
                    "variable group '{}' lists '{}' more than once",
                    g.name, v
                )));
            }
        }
    }

    Ok(())
}
