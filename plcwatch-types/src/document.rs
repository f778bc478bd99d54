//! Chart documents sent to the dashboard.
//!
//! The shape follows the line-chart configuration consumed by the dashboard's
//! chart library: one dataset per variable, each bound to its own y-axis
//! (`y1`, `y2`, ...), with only the first axis displayed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::AxisDisplayType;

/// Kind of chart a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SeriesType {
    #[default]
    Line,
}

/// A complete chart document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartDocument {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub series_type: SeriesType,
    pub data: ChartData,
    pub options: ChartOptions,
}

impl ChartDocument {
    /// Datasets in axis order.
    pub fn datasets(&self) -> &[Dataset] {
        &self.data.datasets
    }

    /// The y-axis with the given id (`"y1"`, `"y2"`, ...).
    pub fn axis(&self, id: &str) -> Option<&ValueAxis> {
        self.options.scales.y.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartData {
    pub datasets: Vec<Dataset>,
}

/// One variable's series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Dataset {
    pub label: String,
    #[cfg_attr(feature = "serde", serde(rename = "yAxisID"))]
    pub y_axis_id: String,
    pub data: Vec<DataPoint>,
    pub border_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartOptions {
    pub responsive: bool,
    pub interaction: Interaction,
    pub plugins: Plugins,
    pub scales: Scales,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            interaction: Interaction::default(),
            plugins: Plugins::default(),
            scales: Scales::default(),
        }
    }
}

/// Hover behaviour: show every series at the hovered x position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interaction {
    pub mode: String,
    pub intersect: bool,
    pub position: String,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            mode: "index".to_string(),
            intersect: false,
            position: "nearest".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plugins {
    pub legend: Legend,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Legend {
    pub display: bool,
}

/// The shared time axis plus one value axis per dataset, keyed by axis id.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scales {
    pub x: TimeAxis,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub y: BTreeMap<String, ValueAxis>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeAxis {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub axis_type: String,
    pub ticks: Ticks,
}

impl Default for TimeAxis {
    fn default() -> Self {
        Self {
            axis_type: "timeseries".to_string(),
            ticks: Ticks::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Ticks {
    pub source: String,
    pub max_ticks_limit: u32,
}

impl Default for Ticks {
    fn default() -> Self {
        Self {
            source: "auto".to_string(),
            max_ticks_limit: 10,
        }
    }
}

/// A y-axis scaled to one measurement's configured range.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueAxis {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub axis_type: AxisDisplayType,
    pub min: f64,
    pub max: f64,
    pub display: bool,
}

/// Axis id for the `index`-th (zero-based) dataset.
pub fn axis_id(index: usize) -> String {
    format!("y{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_id_is_one_based() {
        assert_eq!(axis_id(0), "y1");
        assert_eq!(axis_id(9), "y10");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_document_shape() {
        let mut scales = Scales::default();
        scales.y.insert(
            axis_id(0),
            ValueAxis {
                axis_type: AxisDisplayType::Linear,
                min: 0.0,
                max: 100.0,
                display: true,
            },
        );
        let doc = ChartDocument {
            series_type: SeriesType::Line,
            data: ChartData {
                datasets: vec![Dataset {
                    label: "Temp".to_string(),
                    y_axis_id: axis_id(0),
                    data: vec![],
                    border_color: "#FF6384".to_string(),
                }],
            },
            options: ChartOptions {
                scales,
                ..ChartOptions::default()
            },
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["data"]["datasets"][0]["yAxisID"], "y1");
        assert_eq!(json["data"]["datasets"][0]["borderColor"], "#FF6384");
        assert_eq!(json["options"]["scales"]["x"]["type"], "timeseries");
        assert_eq!(json["options"]["scales"]["x"]["ticks"]["maxTicksLimit"], 10);
        assert_eq!(json["options"]["scales"]["y1"]["type"], "linear");
        assert_eq!(json["options"]["plugins"]["legend"]["display"], false);
    }
}
