//! Field parsing: raw text tokens into numeric intervals.
//!
//! A field is first normalized (dash variants and the word "to" become `-`), split
//! into at most two endpoint parts, and then handed to an ordered chain of
//! [`RangeStrategy`] implementations. The first strategy that matches wins; warnings
//! from every strategy that ran are kept.

pub mod units;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants::CM_TO_INCHES;
use crate::types::Interval;

static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("numeric regex is valid"));
static FT_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*'\s*(\d+)").expect("feet-inches regex is valid"));
// "to" between numbers, spaces or quote marks; never inside a word
static TO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(^|[\d\s"'])to([\d\s"']|$)"#).expect("range word regex is valid")
});

/// Interval plus the advisory messages produced while parsing it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedField {
    pub interval: Interval,
    pub warnings: Vec<String>,
}

impl ParsedField {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Parses one token into a finite number.
///
/// Strips whitespace, `%` and double quotes, tries a full parse, then falls back to
/// the first decimal numeral in the token. Returns `None` when the token has no numeral.
pub fn parse_number_token(token: &str) -> Option<f64> {
    let cleaned: String = token
        .trim()
        .chars()
        .filter(|c| !matches!(c, '%' | '"' | '\u{201C}' | '\u{201D}'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(value) = cleaned.parse::<f64>() {
        if value.is_finite() {
            return Some(value);
        }
    }
    NUMERIC_RE
        .find(cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses `F'I` notation anywhere in `s` into total inches.
pub fn feet_inches_to_inches(s: &str) -> Option<f64> {
    let caps = FT_IN_RE.captures(s)?;
    let feet: f64 = caps.get(1)?.as_str().parse().ok()?;
    let inches: f64 = caps.get(2)?.as_str().parse().ok()?;
    let total = feet * 12.0 + inches;
    total.is_finite().then_some(total)
}

/// A raw field after separator normalization, ready for the strategy chain.
#[derive(Debug, Clone)]
pub struct NormalizedField {
    /// Whole field with every separator rewritten to `-`
    pub text: String,
    /// At most two non-empty endpoint parts
    pub parts: Vec<String>,
}

impl NormalizedField {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().replace(['\u{2013}', '\u{2014}'], "-");
        let text = TO_RE.replace_all(&text, "${1}-${2}").into_owned();
        let parts = text
            .split('-')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .take(2)
            .map(str::to_string)
            .collect();
        Self { text, parts }
    }
}

/// Result of one strategy: a parsed interval, or no match (the next strategy runs).
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Matched(Interval),
    NoMatch,
}

/// One heuristic in the range-parsing chain.
pub trait RangeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attempts to parse the field, appending any warnings to `warnings`.
    fn parse(&self, field: &NormalizedField, warnings: &mut Vec<String>) -> StrategyOutcome;
}

/// `7'1"` and `6'11" to 7'4"` style heights. Active only when the field contains
/// feet-inches notation somewhere.
pub struct FeetInchesStrategy;

impl RangeStrategy for FeetInchesStrategy {
    fn name(&self) -> &'static str {
        "feet_inches"
    }

    fn parse(&self, field: &NormalizedField, warnings: &mut Vec<String>) -> StrategyOutcome {
        if !FT_IN_RE.is_match(&field.text) {
            return StrategyOutcome::NoMatch;
        }
        let mut values = Vec::with_capacity(2);
        for part in &field.parts {
            match feet_inches_to_inches(part) {
                Some(inches) => values.push(inches),
                None if field.parts.len() >= 2 => {
                    warnings.push(format!("unparseable ft/in part: {}", part))
                }
                None => {}
            }
        }
        interval_from_values(&values)
    }
}

/// Plain numbers and numeric ranges, optionally reading large values as centimeters.
pub struct NumericRangeStrategy {
    /// Values above this threshold are centimeters; `None` disables conversion
    pub cm_threshold: Option<f64>,
}

impl RangeStrategy for NumericRangeStrategy {
    fn name(&self) -> &'static str {
        "numeric_range"
    }

    fn parse(&self, field: &NormalizedField, warnings: &mut Vec<String>) -> StrategyOutcome {
        let mut values = Vec::with_capacity(2);
        for part in &field.parts {
            match parse_number_token(part) {
                Some(value) => values.push(value),
                None => warnings.push(format!("unparseable numeric part: {}", part)),
            }
        }
        if let Some(threshold) = self.cm_threshold {
            if values.iter().any(|v| *v > threshold) {
                for value in &mut values {
                    *value *= CM_TO_INCHES;
                }
            }
        }
        interval_from_values(&values)
    }
}

fn interval_from_values(values: &[f64]) -> StrategyOutcome {
    match values {
        [] => StrategyOutcome::NoMatch,
        [single] => StrategyOutcome::Matched(Interval::point(*single)),
        [a, b, ..] => StrategyOutcome::Matched(Interval::between(*a, *b)),
    }
}

/// An ordered chain of range strategies.
pub struct RangeParser {
    strategies: Vec<Box<dyn RangeStrategy>>,
}

impl RangeParser {
    pub fn new(strategies: Vec<Box<dyn RangeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Feet-inches first, then plain numbers without unit conversion.
    pub fn generic() -> Self {
        Self::new(vec![
            Box::new(FeetInchesStrategy),
            Box::new(NumericRangeStrategy { cm_threshold: None }),
        ])
    }

    /// Feet-inches first, then plain numbers where values above `cm_threshold` are centimeters.
    pub fn with_cm_threshold(cm_threshold: f64) -> Self {
        Self::new(vec![
            Box::new(FeetInchesStrategy),
            Box::new(NumericRangeStrategy {
                cm_threshold: Some(cm_threshold),
            }),
        ])
    }

    pub fn parse(&self, raw: &str) -> ParsedField {
        if raw.trim().is_empty() {
            return ParsedField::empty();
        }
        let field = NormalizedField::new(raw);
        let mut warnings = Vec::new();
        for strategy in &self.strategies {
            if let StrategyOutcome::Matched(interval) = strategy.parse(&field, &mut warnings) {
                debug!(strategy = strategy.name(), raw, "range parsed");
                return ParsedField { interval, warnings };
            }
        }
        ParsedField {
            interval: Interval::EMPTY,
            warnings,
        }
    }
}

impl Default for RangeParser {
    fn default() -> Self {
        Self::generic()
    }
}
