//! Unit heuristics for height and weight fields.

use crate::config::UnitConfig;
use crate::constants::KG_TO_POUNDS;
use crate::types::Interval;

use super::{ParsedField, RangeParser};

/// How a column's values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Inches; feet-inches notation or centimeters above the threshold
    Height,
    /// Pounds; low minimums are reinterpreted as kilograms
    Weight,
    /// Unitless attribute rating
    Generic,
}

/// Wraps the range parsers with the height/weight heuristics.
pub struct UnitResolver {
    units: UnitConfig,
    height_parser: RangeParser,
    plain_parser: RangeParser,
}

impl UnitResolver {
    pub fn new(units: UnitConfig) -> Self {
        Self {
            height_parser: RangeParser::with_cm_threshold(units.cm_threshold),
            plain_parser: RangeParser::generic(),
            units,
        }
    }

    pub fn resolve(&self, kind: FieldKind, raw: &str) -> ParsedField {
        match kind {
            FieldKind::Height => self.parse_height(raw),
            FieldKind::Weight => self.parse_weight(raw),
            FieldKind::Generic => self.plain_parser.parse(raw),
        }
    }

    /// Height in inches. Values outside the plausible window are kept and flagged.
    pub fn parse_height(&self, raw: &str) -> ParsedField {
        let mut parsed = self.height_parser.parse(raw);
        let raw = raw.trim();
        let window = self.units.height_min_in..=self.units.height_max_in;
        if let Some(min) = parsed.interval.min.filter(|v| !window.contains(v)) {
            parsed.warnings.push(format!(
                "height min suspicious: {} inches parsed from '{}'",
                min, raw
            ));
        }
        if let Some(max) = parsed.interval.max.filter(|v| !window.contains(v)) {
            parsed.warnings.push(format!(
                "height max suspicious: {} inches parsed from '{}'",
                max, raw
            ));
        }
        parsed
    }

    /// Weight in pounds.
    ///
    /// A minimum below the kilogram threshold converts the whole interval from
    /// kilograms; a minimum above the weight maximum is only flagged. A minimum equal
    /// to the threshold stays in pounds.
    pub fn parse_weight(&self, raw: &str) -> ParsedField {
        let mut parsed = self.plain_parser.parse(raw);
        let raw = raw.trim();
        let Some(min) = parsed.interval.min else {
            return parsed;
        };
        if min < self.units.kg_threshold_lb {
            let min_lb = min * KG_TO_POUNDS;
            let max_lb = parsed.interval.max.map_or(min_lb, |max| max * KG_TO_POUNDS);
            parsed.interval = Interval {
                min: Some(min_lb),
                max: Some(max_lb),
                median: Some((min_lb + max_lb) / 2.0),
            };
            parsed
                .warnings
                .push(format!("interpreted weight {} as kg converted to lbs", raw));
        } else if min > self.units.weight_max_lb {
            parsed
                .warnings
                .push(format!("weight suspicious value: {} (raw: {})", min, raw));
        }
        parsed
    }
}

impl Default for UnitResolver {
    fn default() -> Self {
        Self::new(UnitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::round2;

    #[test]
    fn test_height_feet_inches() {
        let parsed = UnitResolver::default().parse_height("7'1\"");
        assert_eq!(parsed.interval, Interval::point(85.0));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_height_centimeters_convert() {
        let parsed = UnitResolver::default().parse_height("220");
        assert_eq!(parsed.interval.median.map(round2), Some(86.61));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_height_inches_stay() {
        let parsed = UnitResolver::default().parse_height("82");
        assert_eq!(parsed.interval, Interval::point(82.0));
    }

    #[test]
    fn test_implausible_height_is_kept_and_flagged() {
        let parsed = UnitResolver::default().parse_height("12");
        assert_eq!(parsed.interval, Interval::point(12.0));
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings[0].starts_with("height min suspicious"));
        assert!(parsed.warnings[1].starts_with("height max suspicious"));
    }

    #[test]
    fn test_weight_kilograms_reinterpreted() {
        let parsed = UnitResolver::default().parse_weight("85");
        assert_eq!(parsed.interval.median.map(round2), Some(187.39));
        assert_eq!(parsed.interval.min, parsed.interval.max);
        assert_eq!(
            parsed.warnings,
            vec!["interpreted weight 85 as kg converted to lbs".to_string()]
        );
    }

    #[test]
    fn test_weight_pounds_kept() {
        let parsed = UnitResolver::default().parse_weight("95");
        assert_eq!(parsed.interval, Interval::point(95.0));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_weight_threshold_is_pounds() {
        let parsed = UnitResolver::default().parse_weight("90");
        assert_eq!(parsed.interval, Interval::point(90.0));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_weight_kilogram_range_converts_every_endpoint() {
        let parsed = UnitResolver::default().parse_weight("80-100");
        assert_eq!(parsed.interval.min.map(round2), Some(176.37));
        assert_eq!(parsed.interval.max.map(round2), Some(220.46));
        assert_eq!(parsed.interval.median.map(round2), Some(198.42));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_heavy_weight_is_flagged_not_converted() {
        let parsed = UnitResolver::default().parse_weight("450");
        assert_eq!(parsed.interval, Interval::point(450.0));
        assert_eq!(parsed.warnings, vec!["weight suspicious value: 450 (raw: 450)".to_string()]);
    }

    #[test]
    fn test_generic_has_no_unit_logic() {
        let resolver = UnitResolver::default();
        let parsed = resolver.resolve(FieldKind::Generic, "250");
        assert_eq!(parsed.interval, Interval::point(250.0));
        assert!(parsed.warnings.is_empty());
        let parsed = resolver.resolve(FieldKind::Generic, "40");
        assert_eq!(parsed.interval, Interval::point(40.0));
    }
}
