use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::config::{ColumnConfig, Config};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::parser::units::{FieldKind, UnitResolver};
use crate::types::{CanonicalRecord, CanonicalTable, Interval, ParseWarning, RawTable};

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W+").expect("non-word regex is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Normalizes a header to snake_case: `"Driving & Layup"` becomes `driving_and_layup`.
pub fn normalize_column_name(raw: &str) -> String {
    let name = raw.trim().replace('&', "and");
    NON_WORD_RE
        .replace_all(&name, "_")
        .to_lowercase()
        .trim_matches('_')
        .to_string()
}

/// Trims, collapses inner whitespace and uppercases a group label.
pub fn normalize_group_label(raw: &str) -> String {
    WHITESPACE_RE
        .replace_all(raw.trim(), " ")
        .to_uppercase()
}

/// One input row keyed by normalized column name. Lives only while its row is processed.
#[derive(Debug, Clone)]
pub struct RawRecord<'a> {
    pub source_id: &'a str,
    pub row_index: usize,
    fields: HashMap<&'a str, &'a str>,
}

impl<'a> RawRecord<'a> {
    /// Raw value of a column; absent columns read as empty.
    pub fn get(&self, column: &str) -> &'a str {
        self.fields.get(column).copied().unwrap_or("")
    }

    pub fn has(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

/// Column positions of one raw table after header normalization.
#[derive(Debug, Clone)]
struct TableLayout {
    /// (normalized name, cell index); first occurrence of a name wins
    columns: Vec<(String, usize)>,
    has_group: bool,
    group_fallback: String,
}

impl TableLayout {
    fn build(table: &RawTable, columns: &ColumnConfig) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut layout = Vec::with_capacity(table.headers.len());
        for (idx, header) in table.headers.iter().enumerate() {
            let name = normalize_column_name(header);
            if name.is_empty() {
                debug!(source = %table.source_id, column = idx, "skipping column with blank header");
                continue;
            }
            if !seen.insert(name.clone()) {
                warn!(
                    source = %table.source_id,
                    header = %header,
                    normalized = %name,
                    "duplicate column after normalization; keeping the first"
                );
                continue;
            }
            layout.push((name, idx));
        }

        if !seen.contains(&columns.name) {
            return Err(PipelineError::MissingIdentityColumn {
                source_id: table.source_id.clone(),
                column: columns.name.clone(),
            });
        }
        let has_group = seen.contains(&columns.group);
        let group_fallback = normalize_group_label(table.source_stem());
        if !has_group {
            warn!(
                source = %table.source_id,
                group = %group_fallback,
                "no group column; using the file name as group label"
            );
        }

        Ok(Self {
            columns: layout,
            has_group,
            group_fallback,
        })
    }

    fn attributes<'c>(&'c self, columns: &'c ColumnConfig) -> impl Iterator<Item = &'c str> + 'c {
        self.columns
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(move |name| !is_reserved(name, columns))
    }

    fn record<'a>(&'a self, table: &'a RawTable, row: &'a [String], row_index: usize) -> RawRecord<'a> {
        let fields = self
            .columns
            .iter()
            .map(|(name, idx)| (name.as_str(), row.get(*idx).map(String::as_str).unwrap_or("")))
            .collect();
        RawRecord {
            source_id: &table.source_id,
            row_index,
            fields,
        }
    }
}

fn is_reserved(name: &str, columns: &ColumnConfig) -> bool {
    name == columns.name || name == columns.group || name == columns.height || name == columns.weight
}

/// Parses every field of one raw record.
pub struct RowCanonicalizer<'c> {
    columns: &'c ColumnConfig,
    resolver: &'c UnitResolver,
}

impl<'c> RowCanonicalizer<'c> {
    pub fn new(columns: &'c ColumnConfig, resolver: &'c UnitResolver) -> Self {
        Self { columns, resolver }
    }

    /// Produces the canonical record for `raw`. `attributes` is the full attribute
    /// list of the merged table; attributes the row's table lacks come out as `None`.
    pub fn canonicalize(
        &self,
        raw: &RawRecord<'_>,
        group_fallback: Option<&str>,
        attributes: &[String],
    ) -> (CanonicalRecord, Vec<ParseWarning>) {
        let name = raw.get(&self.columns.name).trim().to_string();
        let group = match group_fallback {
            Some(fallback) => fallback.to_string(),
            None => normalize_group_label(raw.get(&self.columns.group)),
        };

        let mut warnings = Vec::new();
        let mut field = |column: &str, kind: FieldKind| -> Interval {
            let value = raw.get(column);
            let parsed = self.resolver.resolve(kind, value);
            warnings.extend(parsed.warnings.into_iter().map(|message| ParseWarning {
                row_index: raw.row_index,
                entity_name: name.clone(),
                column: column.to_string(),
                raw_value: value.to_string(),
                message,
            }));
            parsed.interval.rounded()
        };

        let height = field(&self.columns.height, FieldKind::Height);
        let weight = field(&self.columns.weight, FieldKind::Weight);
        let attributes: BTreeMap<String, Option<f64>> = attributes
            .iter()
            .map(|attr| {
                let median = if raw.has(attr) {
                    field(attr, FieldKind::Generic).median
                } else {
                    None
                };
                (attr.clone(), median)
            })
            .collect();

        let record = CanonicalRecord {
            name,
            group,
            height,
            weight,
            attributes,
        };
        (record, warnings)
    }
}

/// Canonical table plus the warnings collected while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalizeOutcome {
    pub table: CanonicalTable,
    pub warnings: Vec<ParseWarning>,
}

/// Merges raw tables into one canonical table.
pub struct TableCanonicalizer {
    columns: ColumnConfig,
    resolver: UnitResolver,
}

impl TableCanonicalizer {
    pub fn new(config: &Config) -> Self {
        Self {
            columns: config.columns.clone(),
            resolver: UnitResolver::new(config.units),
        }
    }

    /// Canonicalizes every row of every table, in table order then row order.
    ///
    /// Fails only on structural problems (a table without the name column);
    /// field-level problems become warnings.
    pub fn canonicalize(&self, tables: &[RawTable]) -> Result<CanonicalizeOutcome> {
        let layouts = tables
            .iter()
            .map(|table| TableLayout::build(table, &self.columns))
            .collect::<Result<Vec<_>>>()?;

        let attributes: Vec<String> = layouts
            .iter()
            .flat_map(|layout| layout.attributes(&self.columns))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        debug!(count = attributes.len(), "attribute columns resolved");

        let row_canonicalizer = RowCanonicalizer::new(&self.columns, &self.resolver);
        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut row_index = 0;
        for (table, layout) in tables.iter().zip(&layouts) {
            let fallback = (!layout.has_group).then_some(layout.group_fallback.as_str());
            for row in &table.rows {
                let raw = layout.record(table, row, row_index);
                let (record, row_warnings) = row_canonicalizer.canonicalize(&raw, fallback, &attributes);
                records.push(record);
                warnings.extend(row_warnings);
                row_index += 1;
            }
            debug!(source = %table.source_id, rows = table.rows.len(), "table canonicalized");
        }

        crate::observability::metrics::canonicalize::rows_canonicalized(records.len());
        crate::observability::metrics::canonicalize::parse_warnings(warnings.len());
        info!(
            rows = records.len(),
            attributes = attributes.len(),
            warnings = warnings.len(),
            "canonical table built"
        );

        Ok(CanonicalizeOutcome {
            table: CanonicalTable {
                name_column: self.columns.name.clone(),
                group_column: self.columns.group.clone(),
                attributes,
                records,
            },
            warnings,
        })
    }
}
