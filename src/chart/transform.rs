//! Reshaping store rows into a multi-axis line chart.

use std::collections::HashMap;

use plcwatch_types::{
    axis_id, AxisDisplayType, ChartData, ChartDocument, ChartOptions, DataPoint, Dataset,
    Measurement, SampleRow, Scales, SeriesType, ValueAxis, DEFAULT_COLOR,
};
use tracing::warn;

use crate::error::{Error, Result};

/// Axis range used for variables without a configured measurement.
pub const FALLBACK_RANGE: (f64, f64) = (0.0, 1000.0);

/// What to do when a returned variable has no configured measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownMeasurementPolicy {
    /// Chart it with the default colour and a linear `0..1000` axis.
    #[default]
    Fallback,
    /// Fail the whole transform with [`Error::UnknownMeasurement`].
    Reject,
}

/// Group rows by variable and build one dataset and y-axis per variable.
///
/// Variables are ordered by first appearance in `rows`; the `k`-th variable is
/// bound to axis `y{k}` scaled to its measurement's `ymin..ymax`. Only `y1` is
/// displayed. Points keep their row order, so rows must already be
/// chronological within each variable.
pub fn transform(
    rows: &[SampleRow],
    measurements: &[Measurement],
    policy: UnknownMeasurementPolicy,
) -> Result<ChartDocument> {
    let by_name: HashMap<&str, &Measurement> =
        measurements.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<DataPoint>> = HashMap::new();
    for row in rows {
        let points = groups.entry(row.variable_name.as_str()).or_insert_with(|| {
            order.push(row.variable_name.as_str());
            Vec::new()
        });
        points.push(DataPoint {
            x: row.time,
            y: row.value,
        });
    }

    let mut datasets = Vec::with_capacity(order.len());
    let mut scales = Scales::default();

    for (index, name) in order.into_iter().enumerate() {
        let (color, axis_type, min, max) = match by_name.get(name) {
            Some(m) => (m.color.clone(), m.axis_display_type, m.ymin, m.ymax),
            None => match policy {
                UnknownMeasurementPolicy::Reject => {
                    return Err(Error::UnknownMeasurement(name.to_string()))
                }
                UnknownMeasurementPolicy::Fallback => {
                    warn!(variable = name, "no measurement configured, using default axis");
                    (
                        DEFAULT_COLOR.to_string(),
                        AxisDisplayType::Linear,
                        FALLBACK_RANGE.0,
                        FALLBACK_RANGE.1,
                    )
                }
            },
        };

        let id = axis_id(index);
        scales.y.insert(
            id.clone(),
            ValueAxis {
                axis_type,
                min,
                max,
                display: index == 0,
            },
        );
        datasets.push(Dataset {
            label: name.to_string(),
            y_axis_id: id,
            data: groups.remove(name).unwrap_or_default(),
            border_color: color,
        });
    }

    Ok(ChartDocument {
        series_type: SeriesType::Line,
        data: ChartData { datasets },
        options: ChartOptions {
            scales,
            ..ChartOptions::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_672_531_200 + secs, 0).unwrap()
    }

    fn measurements() -> Vec<Measurement> {
        vec![
            Measurement::new("Temp", -20.0, 150.0, "#FF6384"),
            Measurement::new("Pressure", 0.0, 10.0, "#36A2EB")
                .with_axis(AxisDisplayType::Logarithmic),
        ]
    }

    fn interleaved() -> Vec<SampleRow> {
        vec![
            SampleRow::new("Pressure", t(0), 1.0),
            SampleRow::new("Temp", t(0), 20.0),
            SampleRow::new("Pressure", t(3), 1.5),
            SampleRow::new("Temp", t(3), 21.0),
            SampleRow::new("Pressure", t(6), 2.0),
        ]
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let doc = transform(&interleaved(), &measurements(), UnknownMeasurementPolicy::Reject)
            .unwrap();

        let labels: Vec<_> = doc.datasets().iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Pressure", "Temp"]);
        assert_eq!(doc.datasets()[0].y_axis_id, "y1");
        assert_eq!(doc.datasets()[1].y_axis_id, "y2");

        let pressure: Vec<_> = doc.datasets()[0].data.iter().map(|p| p.y).collect();
        assert_eq!(pressure, [1.0, 1.5, 2.0]);
        assert_eq!(doc.datasets()[1].data[1].x, t(3));
    }

    #[test]
    fn test_axes_follow_measurements_and_only_first_is_visible() {
        let doc = transform(&interleaved(), &measurements(), UnknownMeasurementPolicy::Reject)
            .unwrap();

        let y1 = doc.axis("y1").unwrap();
        assert!(y1.display);
        assert_eq!(y1.axis_type, AxisDisplayType::Logarithmic);
        assert_eq!((y1.min, y1.max), (0.0, 10.0));

        let y2 = doc.axis("y2").unwrap();
        assert!(!y2.display);
        assert_eq!((y2.min, y2.max), (-20.0, 150.0));
        assert_eq!(doc.datasets()[1].border_color, "#FF6384");
        assert_eq!(doc.options.scales.y.len(), 2);
    }

    #[test]
    fn test_rows_are_not_resorted() {
        let rows = vec![
            SampleRow::new("Temp", t(6), 3.0),
            SampleRow::new("Temp", t(0), 1.0),
        ];
        let doc = transform(&rows, &measurements(), UnknownMeasurementPolicy::Reject).unwrap();
        assert_eq!(doc.datasets()[0].data[0].x, t(6));
    }

    #[test]
    fn test_unknown_measurement_rejected() {
        let rows = vec![SampleRow::new("Flow", t(0), 3.0)];
        let err = transform(&rows, &measurements(), UnknownMeasurementPolicy::Reject).unwrap_err();
        assert!(matches!(err, Error::UnknownMeasurement(name) if name == "Flow"));
    }

    #[test]
    fn test_unknown_measurement_fallback() {
        let rows = vec![
            SampleRow::new("Temp", t(0), 20.0),
            SampleRow::new("Flow", t(0), 3.0),
        ];
        let doc = transform(&rows, &measurements(), UnknownMeasurementPolicy::Fallback).unwrap();
        assert_eq!(doc.datasets()[1].border_color, DEFAULT_COLOR);
        let y2 = doc.axis("y2").unwrap();
        assert_eq!((y2.min, y2.max), FALLBACK_RANGE);
        assert!(!y2.display);
    }

    #[test]
    fn test_empty_rows() {
        let doc = transform(&[], &measurements(), UnknownMeasurementPolicy::Reject).unwrap();
        assert!(doc.datasets().is_empty());
        assert!(doc.options.scales.y.is_empty());
        assert_eq!(doc.series_type, SeriesType::Line);
    }
}
