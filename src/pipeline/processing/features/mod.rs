//! Composite scores over the canonical table.
//!
//! Each composite is a weighted median of attribute medians. Missing attributes drop
//! out and the remaining weights are renormalized, so a record only loses a score
//! when every input is missing.

pub mod rank;
pub mod role;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{CompositeConfig, Config};
use crate::constants::median_column;
use crate::error::{PipelineError, Result};
use crate::types::{round2, CanonicalRecord, CanonicalTable};

/// One validated composite definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: String,
    /// Display label used as the primary role
    pub label: String,
    /// Attribute names without the `_med` suffix
    pub inputs: Vec<String>,
    pub weights: Vec<f64>,
}

impl FeatureDefinition {
    pub fn input_columns(&self) -> Vec<String> {
        self.inputs.iter().map(|i| median_column(i)).collect()
    }
}

impl TryFrom<CompositeConfig> for FeatureDefinition {
    type Error = PipelineError;

    fn try_from(config: CompositeConfig) -> Result<Self> {
        if config.inputs.is_empty() || config.inputs.len() != config.weights.len() {
            return Err(PipelineError::Config(format!(
                "composite '{}' needs one weight per input",
                config.name
            )));
        }
        if config.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PipelineError::Config(format!(
                "composite '{}' has a negative or non-finite weight",
                config.name
            )));
        }
        let label = config
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| capitalize(&config.name));
        Ok(Self {
            name: config.name,
            label,
            inputs: config.inputs,
            weights: config.weights,
        })
    }
}

/// `"athleticism"` becomes `"Athleticism"`; the tail is lowercased.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Ordered composite definitions. Declaration order is the role tie-break order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    definitions: Vec<FeatureDefinition>,
}

impl FeatureSet {
    pub fn new(definitions: Vec<FeatureDefinition>) -> Self {
        Self { definitions }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let definitions = config
            .composites()
            .into_iter()
            .map(FeatureDefinition::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(definitions))
    }

    pub fn definitions(&self) -> &[FeatureDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.label.clone()).collect()
    }

    /// Every attribute some composite reads, sorted and deduplicated.
    pub fn used_attributes(&self) -> Vec<String> {
        let mut attrs: Vec<String> = self
            .definitions
            .iter()
            .flat_map(|d| d.inputs.iter().cloned())
            .collect();
        attrs.sort();
        attrs.dedup();
        attrs
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Weighted median with missing-value reweighting.
///
/// Missing values drop out with their weights. When no remaining weight is positive the
/// plain median is returned. Otherwise the lowest value whose cumulative normalized
/// weight reaches one half is returned, so an exact half-half split picks the lower value.
pub fn weighted_median(values: &[Option<f64>], weights: &[f64]) -> Option<f64> {
    let present: Vec<(f64, f64)> = values
        .iter()
        .zip(weights)
        .filter_map(|(value, weight)| value.map(|v| (v, *weight)))
        .collect();
    if present.is_empty() {
        return None;
    }

    let mut positive: Vec<(f64, f64)> = present.iter().copied().filter(|(_, w)| *w > 0.0).collect();
    if positive.is_empty() {
        return median(present.into_iter().map(|(v, _)| v).collect());
    }
    let total: f64 = positive.iter().map(|(_, w)| w).sum();
    if !total.is_finite() {
        return median(positive.into_iter().map(|(v, _)| v).collect());
    }

    positive.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut cumulative = 0.0;
    for (value, weight) in &positive {
        cumulative += weight / total;
        if cumulative >= 0.5 {
            return Some(*value);
        }
    }
    positive.last().map(|(v, _)| *v)
}

/// Plain median; the mean of the two middle values for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Computes every composite of one record at full precision.
pub struct CompositeScorer<'f> {
    features: &'f FeatureSet,
}

impl<'f> CompositeScorer<'f> {
    pub fn new(features: &'f FeatureSet) -> Self {
        Self { features }
    }

    pub fn score(&self, record: &CanonicalRecord) -> Vec<Option<f64>> {
        self.features
            .definitions()
            .iter()
            .map(|definition| {
                let values: Vec<Option<f64>> =
                    definition.inputs.iter().map(|i| record.attribute(i)).collect();
                weighted_median(&values, &definition.weights)
            })
            .collect()
    }
}

/// Percentile ranks of one composite for one record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentiles {
    pub group: Option<f64>,
    pub global: Option<f64>,
}

/// A canonical record with its composite scores, ranks and primary role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    pub canonical: CanonicalRecord,
    /// One score per composite, in declaration order
    pub scores: Vec<Option<f64>>,
    pub primary_role_score: Option<f64>,
    pub primary_role: String,
    /// One entry per composite; empty when percentiles were skipped
    pub percentiles: Vec<Percentiles>,
}

/// Output of the composite stage. Values are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTable {
    pub name_column: String,
    pub group_column: String,
    pub attributes: Vec<String>,
    pub composites: Vec<String>,
    pub percentiles_included: bool,
    pub records: Vec<CompositeRecord>,
}

impl CompositeTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rounded scores of composite `index` across all records.
    pub fn scores_of(&self, index: usize) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.scores.get(index).copied().flatten())
            .collect()
    }
}

/// Runs scoring, role selection and ranking over a canonical table.
pub struct FeatureEngine {
    features: FeatureSet,
}

impl FeatureEngine {
    pub fn new(features: FeatureSet) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Roles and ranks use full-precision scores; the table is rounded afterwards.
    pub fn compute(&self, table: &CanonicalTable, skip_percentiles: bool) -> CompositeTable {
        let scorer = CompositeScorer::new(&self.features);
        let labels = self.features.labels();

        let scores: Vec<Vec<Option<f64>>> = table.records.iter().map(|r| scorer.score(r)).collect();
        let roles: Vec<(String, Option<f64>)> = scores
            .iter()
            .map(|s| role::primary_role(s, &labels))
            .collect();

        let percentiles = if skip_percentiles {
            info!("skipping percentile computation");
            vec![Vec::new(); table.len()]
        } else {
            self.percentiles(table, &scores)
        };

        for (index, definition) in self.features.definitions().iter().enumerate() {
            let missing = scores.iter().filter(|s| s[index].is_none()).count();
            crate::observability::metrics::features::composite_missing(&definition.name, missing);
            debug!(composite = %definition.name, missing, "composite scored");
        }

        let records: Vec<CompositeRecord> = table
            .records
            .iter()
            .zip(scores)
            .zip(roles)
            .zip(percentiles)
            .map(|(((canonical, scores), (primary_role, role_score)), percentiles)| CompositeRecord {
                canonical: canonical.clone(),
                scores: scores.into_iter().map(|s| s.map(round2)).collect(),
                primary_role_score: role_score.map(round2),
                primary_role,
                percentiles,
            })
            .collect();

        crate::observability::metrics::features::records_scored(records.len());
        info!(
            rows = records.len(),
            composites = self.features.len(),
            "composite table built"
        );

        CompositeTable {
            name_column: table.name_column.clone(),
            group_column: table.group_column.clone(),
            attributes: table.attributes.clone(),
            composites: self.features.names(),
            percentiles_included: !skip_percentiles,
            records,
        }
    }

    fn percentiles(&self, table: &CanonicalTable, scores: &[Vec<Option<f64>>]) -> Vec<Vec<Percentiles>> {
        let groups: Vec<&str> = table.records.iter().map(|r| r.group.as_str()).collect();
        let mut out = vec![Vec::with_capacity(self.features.len()); table.len()];
        for index in 0..self.features.len() {
            let column: Vec<Option<f64>> = scores.iter().map(|s| s[index]).collect();
            let global = rank::percentile_ranks(&column);
            let group = rank::grouped_percentile_ranks(&column, &groups);
            for (row, (group, global)) in group.into_iter().zip(global).enumerate() {
                out[row].push(Percentiles {
                    group: group.map(round2),
                    global: global.map(round2),
                });
            }
        }
        out
    }
}

/// `feature_definitions.json` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinitionsPayload {
    pub composites: Vec<DefinitionEntry>,
    pub percentile_method: PercentileMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub name: String,
    pub label: String,
    pub formula: String,
    pub inputs: Vec<String>,
    pub weights: Vec<f64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub range: [u8; 2],
    pub per_group: String,
    pub global: String,
    pub ties: String,
    pub rounding: String,
    pub computed: bool,
}

impl FeatureDefinitionsPayload {
    pub fn build(features: &FeatureSet, group_column: &str, percentiles_computed: bool) -> Self {
        let composites = features
            .definitions()
            .iter()
            .map(|d| DefinitionEntry {
                name: d.name.clone(),
                label: d.label.clone(),
                formula: "weighted_median".to_string(),
                inputs: d.input_columns(),
                weights: d.weights.clone(),
                notes: "Missing inputs are ignored and remaining weights re-normalized proportionally."
                    .to_string(),
            })
            .collect();
        Self {
            composites,
            percentile_method: PercentileMethod {
                kind: "percentile-rank".to_string(),
                range: [0, 100],
                per_group: format!("rank within {} * 100 / group count", group_column),
                global: "rank * 100 / count".to_string(),
                ties: "average".to_string(),
                rounding: "2 decimals".to_string(),
                computed: percentiles_computed,
            },
        }
    }
}
