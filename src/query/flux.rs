//! Flux query construction.
//!
//! Every value that originates outside the query text (bucket, measurement,
//! field and variable names) is bound as a Flux parameter and referenced as
//! `params.<name>`, so a variable called `Temp" or true` cannot change the
//! shape of the filter. The only identifier written into the text is the
//! variable tag column, which is emitted as an escaped string literal.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::window::{RelativeOffset, TimeWindow};

/// Measurement that holds PLC samples.
pub const DEFAULT_MEASUREMENT: &str = "plc_data";
/// Tag carrying the variable name.
pub const DEFAULT_VARIABLE_TAG: &str = "VariableName";
/// Field holding the sample value.
pub const DEFAULT_FIELD: &str = "value";

/// A Flux query with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxQuery {
    text: String,
    params: Vec<(String, String)>,
}

impl FluxQuery {
    /// Query text, referencing parameters as `params.<name>`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound parameters in binding order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of a bound parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters as the JSON object expected by the query API.
    pub fn params_json(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }

    /// Render the query with every parameter substituted as an escaped literal.
    ///
    /// `params.<name>` references are replaced in one pass over the original
    /// text. Substituted values and existing string literals are never
    /// rescanned, so a value that reads like a reference stays a literal.
    ///
    /// Used for logging and for stores that do not accept bound parameters.
    pub fn inline(&self) -> String {
        const PREFIX: &str = "params.";

        let text = self.text.as_str();
        let mut out = String::with_capacity(text.len());
        let mut in_string = false;
        let mut escaped = false;
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];

            if !in_string && rest.starts_with(PREFIX) && !follows_identifier(&out) {
                let ident = &rest[PREFIX.len()..];
                let len = ident
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(ident.len());
                if let Some(value) = self.param(&ident[..len]) {
                    out.push_str(&flux_string(value));
                    i += PREFIX.len() + len;
                    continue;
                }
            }

            let Some(c) = rest.chars().next() else { break };
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
            } else if c == '"' {
                in_string = true;
            }
            out.push(c);
            i += c.len_utf8();
        }
        out
    }
}

fn follows_identifier(text: &str) -> bool {
    text.chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Builds the queries issued by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    bucket: String,
    measurement: String,
    variable_tag: String,
    field: String,
}

impl QueryBuilder {
    /// Create a builder for a bucket using the default measurement, tag and field.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            measurement: DEFAULT_MEASUREMENT.to_string(),
            variable_tag: DEFAULT_VARIABLE_TAG.to_string(),
            field: DEFAULT_FIELD.to_string(),
        }
    }

    /// Set the measurement to filter on.
    pub fn measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    /// Set the tag that carries variable names.
    pub fn variable_tag(mut self, tag: impl Into<String>) -> Self {
        self.variable_tag = tag.into();
        self
    }

    /// Set the field holding sample values.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// The tag that carries variable names.
    pub fn tag(&self) -> &str {
        &self.variable_tag
    }

    /// Build a chart query for `variables` over `window`.
    ///
    /// Windows with a bucket are mean-aggregated at that width with empty
    /// windows dropped; live windows (no bucket) keep only the last sample per
    /// series. An empty `variables` list omits the variable filter, selecting
    /// every variable.
    pub fn chart(&self, variables: &[String], window: &TimeWindow) -> FluxQuery {
        let mut q = Pipeline::from_bucket(&self.bucket);

        match window.bucket {
            Some(_) => q.stage(format!(
                "range(start: {}, stop: {})",
                flux_time(window.start),
                flux_time(window.stop)
            )),
            None => q.stage(format!("range(start: {})", flux_time(window.start))),
        }

        q.filter_param("_measurement", "measurement", &self.measurement);

        if !variables.is_empty() {
            let tag = flux_string(&self.variable_tag);
            let predicate = variables
                .iter()
                .enumerate()
                .map(|(i, variable)| {
                    let name = q.bind(format!("var{}", i), variable);
                    format!("r[{}] == params.{}", tag, name)
                })
                .collect::<Vec<_>>()
                .join(" or ");
            q.stage(format!("filter(fn: (r) => {})", predicate));
        }

        q.filter_param("_field", "field", &self.field);

        match window.bucket {
            Some(bucket) => {
                q.stage(format!(
                    "aggregateWindow(every: {}, fn: mean, createEmpty: false)",
                    bucket
                ));
                q.stage("yield(name: \"mean\")");
            }
            None => {
                q.stage("last()");
                q.stage("yield(name: \"last\")");
            }
        }

        q.finish()
    }

    /// List the distinct variable names recorded under the measurement.
    pub fn distinct_variables(&self, lookback: &RelativeOffset) -> FluxQuery {
        let params = vec![
            ("bucket".to_string(), self.bucket.clone()),
            ("measurement".to_string(), self.measurement.clone()),
        ];

        let text = format!(
            "import \"influxdata/influxdb/schema\"\n\n\
             schema.tagValues(\n  \
             bucket: params.bucket,\n  \
             tag: {},\n  \
             predicate: (r) => r[\"_measurement\"] == params.measurement,\n  \
             start: {},\n)",
            flux_string(&self.variable_tag),
            lookback
        );

        FluxQuery { text, params }
    }

    /// Minimum and maximum value of one variable over the look-back window.
    ///
    /// Yields a single row with `min` and `max` columns when any sample exists.
    pub fn min_max(&self, variable: &str, lookback: &RelativeOffset) -> FluxQuery {
        let mut q = Pipeline::from_bucket(&self.bucket);
        q.stage(format!("range(start: {})", lookback));
        q.filter_param("_measurement", "measurement", &self.measurement);
        q.filter_param(&self.variable_tag, "variable", variable);
        q.filter_param("_field", "field", &self.field);
        q.stage("map(fn: (r) => ({r with _value: float(v: r._value)}))");
        q.stage("group()");
        q.stage(
            "reduce(\n      \
             fn: (r, accumulator) => ({\n          \
             min: if r._value < accumulator.min then r._value else accumulator.min,\n          \
             max: if r._value > accumulator.max then r._value else accumulator.max,\n      \
             }),\n      \
             identity: {min: 9999999999.0, max: -9999999999.0},\n  )",
        );
        q.finish()
    }
}

/// Accumulates `|>` stages and bound parameters.
struct Pipeline {
    text: String,
    params: Vec<(String, String)>,
}

impl Pipeline {
    fn from_bucket(bucket: &str) -> Self {
        let mut pipeline = Self {
            text: String::new(),
            params: Vec::new(),
        };
        let name = pipeline.bind("bucket".to_string(), bucket);
        pipeline.text = format!("from(bucket: params.{})", name);
        pipeline
    }

    fn bind(&mut self, name: String, value: &str) -> String {
        self.params.push((name.clone(), value.to_string()));
        name
    }

    fn stage(&mut self, stage: impl AsRef<str>) {
        let _ = write!(self.text, "\n  |> {}", stage.as_ref());
    }

    fn filter_param(&mut self, column: &str, param: &str, value: &str) {
        let name = self.bind(param.to_string(), value);
        self.stage(format!(
            "filter(fn: (r) => r[{}] == params.{})",
            flux_string(column),
            name
        ));
    }

    fn finish(self) -> FluxQuery {
        FluxQuery {
            text: self.text,
            params: self.params,
        }
    }
}

/// Quote a value as a Flux string literal.
pub fn flux_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Format an instant as a Flux time literal.
fn flux_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
