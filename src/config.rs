use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::constants;
use crate::error::{PipelineError, Result};

/// Run configuration. Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub columns: ColumnConfig,
    pub units: UnitConfig,
    pub diagnostics: DiagnosticsConfig,
    pub composites: Vec<CompositeConfig>,
}

/// Normalized (snake_case) names of the identity and unit columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,
    pub group: String,
    pub height: String,
    pub weight: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            name: constants::NAME_COLUMN.to_string(),
            group: constants::GROUP_COLUMN.to_string(),
            height: constants::HEIGHT_COLUMN.to_string(),
            weight: constants::WEIGHT_COLUMN.to_string(),
        }
    }
}

/// Thresholds for the height/weight unit heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Bare height values above this are centimeters
    pub cm_threshold: f64,
    pub height_min_in: f64,
    pub height_max_in: f64,
    /// A weight minimum below this is reinterpreted as kilograms
    pub kg_threshold_lb: f64,
    /// A weight minimum above this is flagged
    pub weight_max_lb: f64,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            cm_threshold: 100.0,
            height_min_in: 20.0,
            height_max_in: 120.0,
            kg_threshold_lb: 90.0,
            weight_max_lb: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub warning_examples_cap: usize,
    pub anomaly_examples_cap: usize,
    /// Expected range of generic attribute values
    pub range_min: f64,
    pub range_max: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            warning_examples_cap: 200,
            anomaly_examples_cap: 10,
            range_min: 0.0,
            range_max: 100.0,
        }
    }
}

/// One composite as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub inputs: Vec<String>,
    pub weights: Vec<f64>,
}

impl Config {
    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when given, otherwise returns the validated defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Composite definitions in declaration order, falling back to the built-in table.
    pub fn composites(&self) -> Vec<CompositeConfig> {
        if !self.composites.is_empty() {
            return self.composites.clone();
        }
        constants::DEFAULT_COMPOSITES
            .iter()
            .map(|(name, inputs, weights)| CompositeConfig {
                name: name.to_string(),
                label: None,
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                weights: weights.to_vec(),
            })
            .collect()
    }

    /// Rejects configurations that could only fail later, at scoring time.
    pub fn validate(&self) -> Result<()> {
        let columns = [
            &self.columns.name,
            &self.columns.group,
            &self.columns.height,
            &self.columns.weight,
        ];
        if columns.iter().any(|c| c.trim().is_empty()) {
            return Err(PipelineError::Config(
                "column names must not be empty".to_string(),
            ));
        }
        let distinct: HashSet<&String> = columns.iter().copied().collect();
        if distinct.len() != columns.len() {
            return Err(PipelineError::Config(
                "identity and unit columns must have distinct names".to_string(),
            ));
        }

        let units = &self.units;
        if !(units.height_min_in < units.height_max_in) {
            return Err(PipelineError::Config(format!(
                "height window is empty: {} .. {}",
                units.height_min_in, units.height_max_in
            )));
        }
        if !(units.kg_threshold_lb <= units.weight_max_lb) {
            return Err(PipelineError::Config(format!(
                "kg threshold {} exceeds weight maximum {}",
                units.kg_threshold_lb, units.weight_max_lb
            )));
        }
        if !(self.diagnostics.range_min <= self.diagnostics.range_max) {
            return Err(PipelineError::Config(
                "diagnostics range_min exceeds range_max".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for composite in &self.composites {
            if composite.name.trim().is_empty() {
                return Err(PipelineError::Config(
                    "composite name must not be empty".to_string(),
                ));
            }
            if !names.insert(composite.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate composite '{}'",
                    composite.name
                )));
            }
            if composite.inputs.is_empty() {
                return Err(PipelineError::Config(format!(
                    "composite '{}' has no inputs",
                    composite.name
                )));
            }
            if composite.inputs.len() != composite.weights.len() {
                return Err(PipelineError::Config(format!(
                    "composite '{}' has {} inputs but {} weights",
                    composite.name,
                    composite.inputs.len(),
                    composite.weights.len()
                )));
            }
            if let Some(w) = composite
                .weights
                .iter()
                .find(|w| !w.is_finite() || **w < 0.0)
            {
                return Err(PipelineError::Config(format!(
                    "composite '{}' has invalid weight {}",
                    composite.name, w
                )));
            }
        }
        Ok(())
    }
}
