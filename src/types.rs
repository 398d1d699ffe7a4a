use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw table exactly as the ingestion layer read it: every cell is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// Identifier of the source (the file name for CSV inputs)
    pub source_id: String,
    /// Column names as the source spells them
    pub headers: Vec<String>,
    /// Data rows; a short row is padded with empty cells on access
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(source_id: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            source_id: source_id.into(),
            headers,
            rows,
        }
    }

    /// The source identifier without directory or extension, e.g. `pg` for `builds/pg.csv`.
    pub fn source_stem(&self) -> &str {
        let name = self
            .source_id
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_id);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

/// A numeric interval parsed from one field. Every present value is finite.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Interval {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: None,
        max: None,
        median: None,
    };

    pub fn point(value: f64) -> Self {
        Self {
            min: Some(value),
            max: Some(value),
            median: Some(value),
        }
    }

    /// Orders the endpoints and sets the median to their midpoint.
    pub fn between(a: f64, b: f64) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Self {
            min: Some(min),
            max: Some(max),
            median: Some((min + max) / 2.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.median.is_none()
    }

    /// Applies `f` to every present value.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            min: self.min.map(&f),
            max: self.max.map(&f),
            median: self.median.map(&f),
        }
    }

    pub fn rounded(self) -> Self {
        self.map(round2)
    }
}

/// Rounds half away from zero to 2 decimal places. Values too large to scale are
/// returned unchanged.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// One entity's normalized numeric profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: String,
    pub group: String,
    /// Height in inches
    pub height: Interval,
    /// Weight in pounds
    pub weight: Interval,
    /// Attribute name (without the `_med` suffix) to median value
    pub attributes: BTreeMap<String, Option<f64>>,
}

impl CanonicalRecord {
    /// Median of an attribute; `None` when absent from the table or unparseable.
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied().flatten()
    }
}

/// The canonical table: column layout plus one record per input row, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable {
    /// Identity column names used for output headers
    pub name_column: String,
    pub group_column: String,
    /// Attribute names in output order (sorted)
    pub attributes: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A non-fatal problem found while parsing one field of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub row_index: usize,
    pub entity_name: String,
    pub column: String,
    pub raw_value: String,
    pub message: String,
}
