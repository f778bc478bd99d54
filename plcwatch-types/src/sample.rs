//! Raw samples as returned by the time-series store.

use chrono::{DateTime, Utc};

/// One sample of a process variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SampleRow {
    pub variable_name: String,
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl SampleRow {
    pub fn new(variable_name: impl Into<String>, time: DateTime<Utc>, value: f64) -> Self {
        Self {
            variable_name: variable_name.into(),
            time,
            value,
        }
    }
}
