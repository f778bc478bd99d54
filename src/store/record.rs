//! A single row of a Flux result table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use plcwatch_types::SampleRow;

use super::StoreError;

/// Column values of one result row, as returned by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FluxRecord {
    columns: BTreeMap<String, String>,
}

impl FluxRecord {
    pub fn new(columns: BTreeMap<String, String>) -> Self {
        Self { columns }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a sample row record with the usual `_time`/`_value` columns.
    pub fn sample(tag: &str, variable: &str, time: DateTime<Utc>, value: f64) -> Self {
        Self::from_pairs([
            (tag.to_string(), variable.to_string()),
            ("_time".to_string(), time.to_rfc3339()),
            ("_value".to_string(), value.to_string()),
        ])
    }

    /// Raw value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Column parsed as a float; `None` if missing, empty or not numeric.
    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column)?.trim().parse().ok()
    }

    /// Column parsed as an RFC 3339 instant.
    pub fn time(&self, column: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.get(column)?.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Interpret the row as a sample of the variable named by `tag`.
    pub fn to_sample(&self, tag: &str) -> Result<SampleRow, StoreError> {
        let variable = self
            .get(tag)
            .ok_or_else(|| StoreError::Parse(format!("row has no '{}' column", tag)))?;
        let time = self
            .time("_time")
            .ok_or_else(|| StoreError::Parse(format!("row for '{}' has no valid _time", variable)))?;
        let value = self
            .f64("_value")
            .ok_or_else(|| StoreError::Parse(format!("row for '{}' has no numeric _value", variable)))?;

        Ok(SampleRow::new(variable, time, value))
    }
}
