//! Canonical and composite tables as CSV/JSON text, and canonical table reload.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ColumnConfig;
use crate::constants::{
    median_column, GLOBAL_PERCENTILE_SUFFIX, GROUP_PERCENTILE_SUFFIX, HEIGHT_MAX_COLUMN,
    HEIGHT_MED_COLUMN, HEIGHT_MIN_COLUMN, MEDIAN_SUFFIX, PRIMARY_ROLE_COLUMN,
    PRIMARY_ROLE_SCORE_COLUMN, WEIGHT_MAX_COLUMN, WEIGHT_MED_COLUMN, WEIGHT_MIN_COLUMN,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::ingestion::csv::{parse_records, CsvWriter};
use crate::pipeline::processing::features::CompositeTable;
use crate::types::{CanonicalRecord, CanonicalTable, Interval};

const UNIT_COLUMNS: [&str; 6] = [
    HEIGHT_MIN_COLUMN,
    HEIGHT_MAX_COLUMN,
    HEIGHT_MED_COLUMN,
    WEIGHT_MIN_COLUMN,
    WEIGHT_MAX_COLUMN,
    WEIGHT_MED_COLUMN,
];

/// Shortest round-trip text of a number, always with a decimal point; empty when missing.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let text = v.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{}.0", text)
            }
        }
        None => String::new(),
    }
}

fn canonical_header(table: &CanonicalTable) -> Vec<String> {
    let mut header = vec![table.name_column.clone(), table.group_column.clone()];
    header.extend(UNIT_COLUMNS.iter().map(|c| c.to_string()));
    header.extend(table.attributes.iter().map(|a| median_column(a)));
    header
}

fn canonical_cells(record: &CanonicalRecord, attributes: &[String]) -> Vec<String> {
    let mut cells = vec![record.name.clone(), record.group.clone()];
    for interval in [&record.height, &record.weight] {
        cells.push(format_number(interval.min));
        cells.push(format_number(interval.max));
        cells.push(format_number(interval.median));
    }
    cells.extend(attributes.iter().map(|a| format_number(record.attribute(a))));
    cells
}

pub fn canonical_to_csv(table: &CanonicalTable) -> String {
    let mut writer = CsvWriter::new();
    writer.write_record(canonical_header(table));
    for record in &table.records {
        writer.write_record(canonical_cells(record, &table.attributes));
    }
    writer.finish()
}

pub fn composite_to_csv(table: &CompositeTable) -> String {
    let canonical_layout = CanonicalTable {
        name_column: table.name_column.clone(),
        group_column: table.group_column.clone(),
        attributes: table.attributes.clone(),
        records: Vec::new(),
    };
    let mut header = canonical_header(&canonical_layout);
    header.extend(table.composites.iter().cloned());
    header.push(PRIMARY_ROLE_SCORE_COLUMN.to_string());
    header.push(PRIMARY_ROLE_COLUMN.to_string());
    if table.percentiles_included {
        for name in &table.composites {
            header.push(format!("{}{}", name, GROUP_PERCENTILE_SUFFIX));
            header.push(format!("{}{}", name, GLOBAL_PERCENTILE_SUFFIX));
        }
    }

    let mut writer = CsvWriter::new();
    writer.write_record(header);
    for record in &table.records {
        let mut cells = canonical_cells(&record.canonical, &table.attributes);
        cells.extend(record.scores.iter().map(|s| format_number(*s)));
        cells.push(format_number(record.primary_role_score));
        cells.push(record.primary_role.clone());
        if table.percentiles_included {
            for pct in &record.percentiles {
                cells.push(format_number(pct.group));
                cells.push(format_number(pct.global));
            }
        }
        writer.write_record(cells);
    }
    writer.finish()
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Loads a canonical table. A `.json` path, or a `.csv` path with a sibling `.json`,
/// loads the lossless JSON artifact; otherwise the CSV is parsed.
pub fn load_canonical(path: &Path, columns: &ColumnConfig) -> Result<CanonicalTable> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        info!(path = %path.display(), "loading canonical JSON");
        return load_canonical_json(path);
    }
    let sibling = path.with_extension("json");
    if sibling.is_file() {
        info!(path = %sibling.display(), "found sibling canonical JSON; loading it");
        return load_canonical_json(&sibling);
    }
    info!(path = %path.display(), "loading canonical CSV");
    let content = fs::read_to_string(path)?;
    canonical_from_csv(&content, path, columns)
}

fn load_canonical_json(path: &Path) -> Result<CanonicalTable> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Rebuilds a canonical table from its CSV form. The identity columns are required;
/// unit columns are optional and every other `<attr>_med` column is an attribute.
pub fn canonical_from_csv(content: &str, path: &Path, columns: &ColumnConfig) -> Result<CanonicalTable> {
    let mut records = parse_records(content, path)?.into_iter();
    let header = records.next().unwrap_or_default();
    let source_id = path.display().to_string();

    let position = |name: &str| header.iter().position(|h| h == name);
    let name_idx = position(columns.name.as_str()).ok_or_else(|| PipelineError::MissingIdentityColumn {
        source_id: source_id.clone(),
        column: columns.name.clone(),
    })?;
    let group_idx = position(columns.group.as_str()).ok_or_else(|| PipelineError::MissingIdentityColumn {
        source_id: source_id.clone(),
        column: columns.group.clone(),
    })?;
    let unit_idx: Vec<Option<usize>> = UNIT_COLUMNS.iter().map(|c| position(*c)).collect();

    let attribute_columns: BTreeMap<String, usize> = header
        .iter()
        .enumerate()
        .filter(|(_, h)| !UNIT_COLUMNS.contains(&h.as_str()))
        .filter_map(|(idx, h)| {
            h.strip_suffix(MEDIAN_SUFFIX)
                .filter(|a| !a.is_empty())
                .map(|a| (a.to_string(), idx))
        })
        .collect();
    debug!(attributes = attribute_columns.len(), "canonical CSV layout resolved");

    let cell = |row: &[String], idx: Option<usize>| -> Option<f64> {
        idx.and_then(|i| row.get(i))
            .and_then(|c| c.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    let interval = |row: &[String], offset: usize| Interval {
        min: cell(row, unit_idx[offset]),
        max: cell(row, unit_idx[offset + 1]),
        median: cell(row, unit_idx[offset + 2]),
    };

    let records = records
        .map(|row| CanonicalRecord {
            name: row.get(name_idx).cloned().unwrap_or_default(),
            group: row.get(group_idx).cloned().unwrap_or_default(),
            height: interval(row.as_slice(), 0),
            weight: interval(row.as_slice(), 3),
            attributes: attribute_columns
                .iter()
                .map(|(attr, idx)| (attr.clone(), cell(row.as_slice(), Some(*idx))))
                .collect(),
        })
        .collect();

    Ok(CanonicalTable {
        name_column: columns.name.clone(),
        group_column: columns.group.clone(),
        attributes: attribute_columns.into_keys().collect(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::features::{FeatureEngine, FeatureSet};
    use crate::config::Config;

    fn sample() -> CanonicalTable {
        CanonicalTable {
            name_column: "build_name".to_string(),
            group_column: "position".to_string(),
            attributes: vec!["close_shot".into(), "speed".into()],
            records: vec![
                CanonicalRecord {
                    name: "Slasher, Jr.".to_string(),
                    group: "PG".to_string(),
                    height: Interval::point(75.0),
                    weight: Interval::between(180.0, 190.5),
                    attributes: [("close_shot".to_string(), Some(70.0)), ("speed".to_string(), Some(88.5))]
                        .into_iter()
                        .collect(),
                },
                CanonicalRecord {
                    name: "Blank".to_string(),
                    group: "C".to_string(),
                    height: Interval::EMPTY,
                    weight: Interval::EMPTY,
                    attributes: [("close_shot".to_string(), None), ("speed".to_string(), None)]
                        .into_iter()
                        .collect(),
                },
            ],
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(85.0)), "85.0");
        assert_eq!(format_number(Some(187.39)), "187.39");
        assert_eq!(format_number(Some(-0.5)), "-0.5");
        assert_eq!(format_number(None), "");
    }

    #[test]
    fn test_canonical_csv_layout() {
        let csv = canonical_to_csv(&sample());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "build_name,position,height_min_in,height_max_in,height_med_in,weight_min_lb,weight_max_lb,weight_med_lb,close_shot_med,speed_med"
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"Slasher, Jr.\",PG,75.0,75.0,75.0,180.0,190.5,185.25,70.0,88.5"
        );
        assert_eq!(lines.next().unwrap(), "Blank,C,,,,,,,,");
    }

    #[test]
    fn test_canonical_csv_reload() {
        let table = sample();
        let csv = canonical_to_csv(&table);
        let columns = Config::default().columns;
        let reloaded = canonical_from_csv(&csv, Path::new("builds_canonical.csv"), &columns).unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_canonical_csv_requires_identity_columns() {
        let columns = Config::default().columns;
        let err = canonical_from_csv("build_name,speed_med\nA,1\n", Path::new("x.csv"), &columns).unwrap_err();
        match err {
            PipelineError::MissingIdentityColumn { column, .. } => assert_eq!(column, "position"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_composite_csv_header() {
        let features = FeatureSet::from_config(&Config::default()).unwrap();
        let composite = FeatureEngine::new(features).compute(&sample(), false);
        let csv = composite_to_csv(&composite);
        let header = csv.lines().next().unwrap();
        assert!(header.ends_with(
            "speed_med,finishing,shooting,playmaking,defense,athleticism,primary_role_score,primary_role,\
finishing_pct_group,finishing_pct_global,shooting_pct_group,shooting_pct_global,\
playmaking_pct_group,playmaking_pct_global,defense_pct_group,defense_pct_global,\
athleticism_pct_group,athleticism_pct_global"
        ));
        let first = csv.lines().nth(1).unwrap();
        assert!(first.contains(",70.0,,,,88.5,88.5,Athleticism,"));
    }

    #[test]
    fn test_load_prefers_sibling_json() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("builds_canonical.csv");
        fs::write(&csv_path, "not,a,canonical,table\n").unwrap();
        fs::write(dir.path().join("builds_canonical.json"), to_json(&sample()).unwrap()).unwrap();
        let table = load_canonical(&csv_path, &Config::default().columns).unwrap();
        assert_eq!(table, sample());
    }
}
