//! Measurement display metadata.

use core::fmt;
use core::str::FromStr;

/// Scale used for a measurement's y-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AxisDisplayType {
    #[default]
    Linear,
    Logarithmic,
}

impl AxisDisplayType {
    /// Returns the name used by the chart library.
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisDisplayType::Linear => "linear",
            AxisDisplayType::Logarithmic => "logarithmic",
        }
    }
}

impl fmt::Display for AxisDisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AxisDisplayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(AxisDisplayType::Linear),
            "logarithmic" => Ok(AxisDisplayType::Logarithmic),
            other => Err(format!("unknown axis display type: {}", other)),
        }
    }
}

/// Display metadata for one process variable.
///
/// `name` matches the value of the variable tag in the store, so a
/// measurement is looked up by exact, case-sensitive name.
///
/// Older configuration files used `min`, `max` and `measurementDisplayType`;
/// those spellings are still accepted when reading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Measurement {
    pub name: String,

    #[cfg_attr(feature = "serde", serde(alias = "min"))]
    pub ymin: f64,

    #[cfg_attr(feature = "serde", serde(alias = "max"))]
    pub ymax: f64,

    #[cfg_attr(
        feature = "serde",
        serde(default, alias = "measurementDisplayType")
    )]
    pub axis_display_type: AxisDisplayType,

    #[cfg_attr(feature = "serde", serde(default = "default_color"))]
    pub color: String,

    #[cfg_attr(feature = "serde", serde(default = "default_units"))]
    pub units: String,

    #[cfg_attr(feature = "serde", serde(default = "default_numeric_format"))]
    pub numeric_format: String,
}

/// Units assigned to measurements created without explicit units.
pub const DEFAULT_UNITS: &str = "undefined";

/// printf-style format assigned to measurements created without one.
pub const DEFAULT_NUMERIC_FORMAT: &str = "%.2f";

/// Colour used when a measurement has none configured.
pub const DEFAULT_COLOR: &str = "#808080";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_units() -> String {
    DEFAULT_UNITS.to_string()
}

fn default_numeric_format() -> String {
    DEFAULT_NUMERIC_FORMAT.to_string()
}

impl Measurement {
    /// Create a linear measurement with default units and format.
    pub fn new(name: impl Into<String>, ymin: f64, ymax: f64, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ymin,
            ymax,
            axis_display_type: AxisDisplayType::Linear,
            color: color.into(),
            units: default_units(),
            numeric_format: default_numeric_format(),
        }
    }

    /// Set the axis display type.
    pub fn with_axis(mut self, axis: AxisDisplayType) -> Self {
        self.axis_display_type = axis;
        self
    }

    /// Set the units label.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_display_type_parse() {
        assert_eq!("linear".parse(), Ok(AxisDisplayType::Linear));
        assert_eq!("logarithmic".parse(), Ok(AxisDisplayType::Logarithmic));
        assert!("log".parse::<AxisDisplayType>().is_err());
    }

    #[test]
    fn test_new_uses_defaults() {
        let m = Measurement::new("Temp", 0.0, 100.0, "#FF6384");
        assert_eq!(m.axis_display_type, AxisDisplayType::Linear);
        assert_eq!(m.units, "undefined");
        assert_eq!(m.numeric_format, "%.2f");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_camel_case() {
        let m = Measurement::new("Temp", 0.0, 100.0, "#FF6384")
            .with_axis(AxisDisplayType::Logarithmic);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["axisDisplayType"], "logarithmic");
        assert_eq!(json["numericFormat"], "%.2f");
        assert_eq!(json["ymax"], 100.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_accepts_legacy_field_names() {
        let yaml = "name: Pressure\nmin: 1.5\nmax: 9.0\nmeasurementDisplayType: linear\n";
        let m: Measurement = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(m.ymin, 1.5);
        assert_eq!(m.ymax, 9.0);
        assert_eq!(m.color, DEFAULT_COLOR);
        assert_eq!(m.units, DEFAULT_UNITS);
    }
}
