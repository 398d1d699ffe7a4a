/// Column and artifact name constants shared by the pipeline stages.
/// Identity and unit column names are the defaults of the `[columns]` config section.

// Default raw column names (after snake_case normalization)
pub const NAME_COLUMN: &str = "build_name";
pub const GROUP_COLUMN: &str = "position";
pub const HEIGHT_COLUMN: &str = "height";
pub const WEIGHT_COLUMN: &str = "weight";

// Canonical numeric columns
pub const HEIGHT_MIN_COLUMN: &str = "height_min_in";
pub const HEIGHT_MAX_COLUMN: &str = "height_max_in";
pub const HEIGHT_MED_COLUMN: &str = "height_med_in";
pub const WEIGHT_MIN_COLUMN: &str = "weight_min_lb";
pub const WEIGHT_MAX_COLUMN: &str = "weight_max_lb";
pub const WEIGHT_MED_COLUMN: &str = "weight_med_lb";

/// Suffix of every attribute median column in the canonical table.
pub const MEDIAN_SUFFIX: &str = "_med";

// Composite table columns
pub const PRIMARY_ROLE_SCORE_COLUMN: &str = "primary_role_score";
pub const PRIMARY_ROLE_COLUMN: &str = "primary_role";
pub const GROUP_PERCENTILE_SUFFIX: &str = "_pct_group";
pub const GLOBAL_PERCENTILE_SUFFIX: &str = "_pct_global";

// Unit conversion factors
pub const CM_TO_INCHES: f64 = 0.393_700_787_4;
pub const KG_TO_POUNDS: f64 = 2.204_622_621_8;

// Artifacts written by `prepare`
pub const CANONICAL_CSV: &str = "builds_canonical.csv";
pub const CANONICAL_JSON: &str = "builds_canonical.json";
pub const PARSING_REPORT_JSON: &str = "parsing_report.json";

// Artifacts written by `features`
pub const FEATURES_CSV: &str = "builds_features.csv";
pub const FEATURES_JSON: &str = "builds_features.json";
pub const FEATURE_DEFINITIONS_JSON: &str = "feature_definitions.json";
pub const FEATURE_REPORT_JSON: &str = "feature_report.json";

/// Name of an attribute's median column in the canonical table.
pub fn median_column(attribute: &str) -> String {
    format!("{}{}", attribute, MEDIAN_SUFFIX)
}

/// Built-in composite table: (name, inputs, weights).
pub const DEFAULT_COMPOSITES: &[(&str, &[&str], &[f64])] = &[
    (
        "finishing",
        &["close_shot", "driving_layup", "driving_dunk", "standing_dunk", "post_control"],
        &[0.22, 0.18, 0.25, 0.15, 0.20],
    ),
    (
        "shooting",
        &["midrange_shot", "threepoint_shot", "free_throw"],
        &[0.4, 0.45, 0.15],
    ),
    (
        "playmaking",
        &["pass_accuracy", "ball_handle", "speed_with_ball"],
        &[0.4, 0.35, 0.25],
    ),
    (
        "defense",
        &["interior_defense", "perimeter_defense", "steal", "block", "defensive_rebound"],
        &[0.25, 0.25, 0.15, 0.15, 0.20],
    ),
    (
        "athleticism",
        &["speed", "agility", "strength", "vertical"],
        &[0.25, 0.25, 0.2, 0.3],
    ),
];
