//! Chart configuration - measurements, variable groups and their persisted form.

use crate::Measurement;

/// A named, ordered selection of measurements that are queried and charted together.
///
/// `is_selected` is a response-only annotation used by the dashboard to
/// preselect a group. It is always serialised; the persisted form is
/// [`StoredGroup`], which has no such field.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VariableGroup {
    pub name: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub variables: Vec<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub is_selected: bool,
}

impl VariableGroup {
    /// Create a group from an ordered list of measurement names.
    pub fn new<I, S>(name: impl Into<String>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variables: variables.into_iter().map(Into::into).collect(),
            is_selected: false,
        }
    }
}

/// The aggregate root of the dashboard's chart settings.
///
/// `bucket` comes from the process settings; `measurements` and
/// `variable_groups` are loaded from and saved to the chart configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChartConfiguration {
    pub bucket: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub measurements: Vec<Measurement>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub variable_groups: Vec<VariableGroup>,
}

impl ChartConfiguration {
    /// Create an empty configuration for a bucket.
    pub fn empty(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            measurements: Vec::new(),
            variable_groups: Vec::new(),
        }
    }

    /// Look up a measurement by exact name.
    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }

    /// Look up a variable group by exact, case-sensitive name.
    pub fn group(&self, name: &str) -> Option<&VariableGroup> {
        self.variable_groups.iter().find(|g| g.name == name)
    }

    /// Ordered variable names of a group; empty if the group does not exist.
    pub fn variables_for_group(&self, name: &str) -> &[String] {
        self.group(name).map(|g| g.variables.as_slice()).unwrap_or(&[])
    }

    /// Return a copy with `is_selected` set on the group called `selected` only.
    pub fn with_selection(&self, selected: &str) -> Self {
        let mut annotated = self.clone();
        for group in &mut annotated.variable_groups {
            group.is_selected = group.name == selected;
        }
        annotated
    }

    /// Replace the persisted fields with those read from a file.
    pub fn apply_file(&mut self, file: ChartConfigFile) {
        self.measurements = file.measurements;
        self.variable_groups = file.variable_groups.into_iter().map(Into::into).collect();
    }
}

/// The persisted subset of a [`ChartConfiguration`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChartConfigFile {
    #[cfg_attr(feature = "serde", serde(default))]
    pub measurements: Vec<Measurement>,

    #[cfg_attr(feature = "serde", serde(default, alias = "variablegroups"))]
    pub variable_groups: Vec<StoredGroup>,
}

/// A variable group as written to the configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoredGroup {
    pub name: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub variables: Vec<String>,
}

impl From<&VariableGroup> for StoredGroup {
    fn from(group: &VariableGroup) -> Self {
        Self {
            name: group.name.clone(),
            variables: group.variables.clone(),
        }
    }
}

impl From<StoredGroup> for VariableGroup {
    fn from(group: StoredGroup) -> Self {
        Self {
            name: group.name,
            variables: group.variables,
            is_selected: false,
        }
    }
}

impl From<&ChartConfiguration> for ChartConfigFile {
    fn from(config: &ChartConfiguration) -> Self {
        Self {
            measurements: config.measurements.clone(),
            variable_groups: config.variable_groups.iter().map(Into::into).collect(),
        }
    }
}
