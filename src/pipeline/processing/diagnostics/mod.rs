use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::DiagnosticsConfig;
use crate::constants::median_column;
use crate::pipeline::processing::features::{median, CompositeTable, FeatureSet};
use crate::types::{CanonicalTable, ParseWarning};

/// Summary of the canonicalization stage (`parsing_report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingReport {
    pub generated_at: DateTime<Utc>,
    pub source_files: Vec<String>,
    /// SHA-256 over the raw tables
    pub input_digest: String,
    pub rows_processed: usize,
    pub parsing_warnings_count: usize,
    pub parsing_warnings_examples: Vec<ParseWarning>,
    pub stat_columns_median_count: usize,
}

/// `{min, median, max}` of one composite's output scores; all `None` without scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

impl Distribution {
    pub fn of(values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        Self {
            min: present.iter().copied().reduce(f64::min),
            median: median(present.clone()),
            max: present.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDistribution {
    pub composite: String,
    #[serde(flatten)]
    pub distribution: Distribution,
}

/// A record with missing or out-of-range composite inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyExample {
    pub index: usize,
    pub name: String,
    pub group: String,
    pub missing_med_columns: Vec<String>,
    pub out_of_range_columns: Vec<String>,
}

/// Summary of the composite stage (`feature_report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub generated_at: DateTime<Utc>,
    pub rows_processed: usize,
    /// Keyed by `<attribute>_med`; an attribute absent from the table counts every row
    pub nan_counts_per_stat_med: BTreeMap<String, usize>,
    pub composite_distributions: Vec<CompositeDistribution>,
    pub builds_with_missing_stat_used_for_composites: usize,
    pub examples_of_missing_or_unusual_builds: Vec<AnomalyExample>,
}

/// Builds both diagnostic reports.
pub struct DiagnosticsReporter {
    config: DiagnosticsConfig,
}

impl DiagnosticsReporter {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }

    pub fn parsing_report(
        &self,
        source_files: Vec<String>,
        input_digest: String,
        table: &CanonicalTable,
        warnings: &[ParseWarning],
    ) -> ParsingReport {
        let examples: Vec<ParseWarning> = warnings
            .iter()
            .take(self.config.warning_examples_cap)
            .cloned()
            .collect();
        info!(
            rows = table.len(),
            warnings = warnings.len(),
            examples = examples.len(),
            "parsing report built"
        );
        ParsingReport {
            generated_at: Utc::now(),
            source_files,
            input_digest,
            rows_processed: table.len(),
            parsing_warnings_count: warnings.len(),
            parsing_warnings_examples: examples,
            stat_columns_median_count: table.attributes.len(),
        }
    }

    pub fn feature_report(&self, table: &CompositeTable, features: &FeatureSet) -> FeatureReport {
        let used = features.used_attributes();
        let range = self.config.range_min..=self.config.range_max;

        let nan_counts_per_stat_med = used
            .iter()
            .map(|attr| {
                let missing = table
                    .records
                    .iter()
                    .filter(|r| r.canonical.attribute(attr).is_none())
                    .count();
                (median_column(attr), missing)
            })
            .collect();

        let composite_distributions = table
            .composites
            .iter()
            .enumerate()
            .map(|(idx, name)| CompositeDistribution {
                composite: name.clone(),
                distribution: Distribution::of(&table.scores_of(idx)),
            })
            .collect();

        let mut with_missing = 0;
        let mut examples = Vec::new();
        for (index, record) in table.records.iter().enumerate() {
            let canonical = &record.canonical;
            let missing: Vec<String> = used
                .iter()
                .filter(|attr| canonical.attribute(attr).is_none())
                .map(|attr| median_column(attr))
                .collect();
            let out_of_range: Vec<String> = used
                .iter()
                .filter(|attr| {
                    canonical
                        .attribute(attr)
                        .is_some_and(|value| !range.contains(&value))
                })
                .map(|attr| median_column(attr))
                .collect();
            if !missing.is_empty() {
                with_missing += 1;
            }
            let unusual = !missing.is_empty() || !out_of_range.is_empty();
            if unusual && examples.len() < self.config.anomaly_examples_cap {
                examples.push(AnomalyExample {
                    index,
                    name: canonical.name.clone(),
                    group: canonical.group.clone(),
                    missing_med_columns: missing,
                    out_of_range_columns: out_of_range,
                });
            }
        }

        crate::observability::metrics::features::records_with_missing_inputs(with_missing);
        info!(
            rows = table.len(),
            with_missing,
            examples = examples.len(),
            "feature report built"
        );

        FeatureReport {
            generated_at: Utc::now(),
            rows_processed: table.len(),
            nan_counts_per_stat_med,
            composite_distributions,
            builds_with_missing_stat_used_for_composites: with_missing,
            examples_of_missing_or_unusual_builds: examples,
        }
    }
}
