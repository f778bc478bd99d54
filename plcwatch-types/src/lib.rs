//! # plcwatch-types
//!
//! Data model shared between the plcwatch server and the browser dashboard.
//!
//! ## Contents
//!
//! - [`Measurement`]: per-variable display metadata (axis bounds, colour, units)
//! - [`VariableGroup`]: a named, ordered selection of measurements charted together
//! - [`ChartConfiguration`]: the aggregate root holding both, plus the store bucket
//! - [`ChartConfigFile`] and [`StoredGroup`]: the persisted subset of a configuration
//! - [`SampleRow`]: one `{variable, time, value}` sample returned by the store
//! - [`ChartDocument`]: a line-chart document ready for the dashboard's chart library
//!
//! ## Features
//!
//! - `serde`: JSON/YAML serialization via serde. Field names follow the
//!   dashboard's camelCase conventions.
//!
//! ## Example
//!
//! ```rust
//! use plcwatch_types::{ChartConfiguration, Measurement, VariableGroup};
//!
//! let config = ChartConfiguration {
//!     bucket: "plc".to_string(),
//!     measurements: vec![Measurement::new("Temp", 0.0, 120.0, "#FF6384")],
//!     variable_groups: vec![VariableGroup::new("Ovens", ["Temp"])],
//! };
//!
//! assert_eq!(config.variables_for_group("Ovens"), ["Temp".to_string()]);
//! assert!(config.variables_for_group("Missing").is_empty());
//! ```

mod configuration;
mod document;
mod measurement;
mod sample;

pub use configuration::*;
pub use document::*;
pub use measurement::*;
pub use sample::*;

/// Name of the group created by default-generation, holding every discovered variable.
pub const DEFAULT_GROUP_NAME: &str = "All Variables";
