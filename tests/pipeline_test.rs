use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use build_features::app::features_use_case::FeaturesUseCase;
use build_features::app::prepare_use_case::PrepareUseCase;
use build_features::app::run_use_case::RunUseCase;
use build_features::config::Config;
use build_features::constants::{
    CANONICAL_CSV, CANONICAL_JSON, FEATURES_CSV, FEATURES_JSON, FEATURE_DEFINITIONS_JSON,
    FEATURE_REPORT_JSON, PARSING_REPORT_JSON,
};
use build_features::error::PipelineError;
use build_features::infra::fs_artifact_sink::FsArtifactSink;

const GUARDS: &str = "\
Build Name,Position,Height,Weight,Speed,Agility,Strength,Vertical,Midrange Shot,Threepoint Shot,Free Throw
\"Blur, The Sequel\",PG,\"6'3\"\"\",190,95,90,50,85,70,75,80
Lockdown,sg,6'5 - 6'7,200-210,80,82,60,80,88,84,90
";

const BIGS: &str = "\
Build Name,Position,Height,Weight,Speed,Agility,Strength,Vertical
Glass Cleaner,C,211,85,40,45,95,60
";

fn write_inputs(dir: &Path) -> Result<()> {
    fs::write(dir.join("guards.csv"), GUARDS)?;
    fs::write(dir.join("bigs.csv"), BIGS)?;
    // not a table
    fs::write(dir.join("notes.txt"), "ignore me")?;
    Ok(())
}

#[test]
fn test_full_run_writes_all_artifacts() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_inputs(input.path())?;

    let sink = FsArtifactSink::new(output.path())?;
    let result = RunUseCase::new(&Config::default())?.run(input.path(), &sink, false, false)?;

    for name in [
        CANONICAL_CSV,
        CANONICAL_JSON,
        PARSING_REPORT_JSON,
        FEATURES_CSV,
        FEATURES_JSON,
        FEATURE_DEFINITIONS_JSON,
        FEATURE_REPORT_JSON,
    ] {
        assert!(output.path().join(name).is_file(), "missing {}", name);
    }

    // tables are read in file-name order
    let names: Vec<&str> = result
        .prepare
        .canonical
        .records
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["Glass Cleaner", "Blur, The Sequel", "Lockdown"]);

    let blur = &result.prepare.canonical.records[1];
    assert_eq!(blur.height.median, Some(75.0));
    assert_eq!(blur.weight.median, Some(190.0));

    let lockdown = &result.prepare.canonical.records[2];
    assert_eq!(lockdown.group, "SG");
    assert_eq!(lockdown.height.min, Some(77.0));
    assert_eq!(lockdown.height.max, Some(79.0));
    assert_eq!(lockdown.weight.median, Some(205.0));

    // 85 is read as kilograms and the conversion is reported
    let big = &result.prepare.canonical.records[0];
    assert!(big.weight.median.unwrap() > 187.0);
    assert!(result.prepare.report.parsing_warnings_count >= 1);

    let canonical_csv = fs::read_to_string(output.path().join(CANONICAL_CSV))?;
    assert!(canonical_csv.contains("\"Blur, The Sequel\""));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join(PARSING_REPORT_JSON))?)?;
    assert_eq!(report["rows_processed"], 3);
    assert_eq!(report["source_files"].as_array().unwrap().len(), 2);
    Ok(())
}

#[test]
fn test_repeated_runs_are_byte_identical() -> Result<()> {
    let input = tempdir()?;
    write_inputs(input.path())?;

    let first = tempdir()?;
    let second = tempdir()?;
    let use_case = RunUseCase::new(&Config::default())?;
    use_case.run(input.path(), &FsArtifactSink::new(first.path())?, false, false)?;
    use_case.run(input.path(), &FsArtifactSink::new(second.path())?, false, false)?;

    for name in [CANONICAL_CSV, CANONICAL_JSON, FEATURES_CSV, FEATURES_JSON, FEATURE_DEFINITIONS_JSON] {
        let a = fs::read(first.path().join(name))?;
        let b = fs::read(second.path().join(name))?;
        assert_eq!(a, b, "{} differs between runs", name);
    }
    Ok(())
}

#[test]
fn test_overwrite_guard_and_force() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_inputs(input.path())?;
    let sink = FsArtifactSink::new(output.path())?;
    let prepare = PrepareUseCase::new(&Config::default());

    prepare.run(input.path(), &sink, false)?;
    fs::write(output.path().join(CANONICAL_CSV), "sentinel")?;

    let err = prepare.run(input.path(), &sink, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::OutputsExist(names)) if names.len() == 3
    ));
    assert_eq!(fs::read_to_string(output.path().join(CANONICAL_CSV))?, "sentinel");

    prepare.run(input.path(), &sink, true)?;
    assert_ne!(fs::read_to_string(output.path().join(CANONICAL_CSV))?, "sentinel");
    Ok(())
}

#[test]
fn test_features_from_csv_matches_features_from_json() -> Result<()> {
    let input = tempdir()?;
    let prepared = tempdir()?;
    write_inputs(input.path())?;
    PrepareUseCase::new(&Config::default()).run(
        input.path(),
        &FsArtifactSink::new(prepared.path())?,
        false,
    )?;

    let features = FeaturesUseCase::new(&Config::default())?;

    // sibling JSON present: loaded instead of the CSV
    let via_sibling = tempdir()?;
    let from_sibling = features.run(
        &prepared.path().join(CANONICAL_CSV),
        &FsArtifactSink::new(via_sibling.path())?,
        false,
        false,
    )?;

    // CSV only
    let csv_only = tempdir()?;
    fs::copy(
        prepared.path().join(CANONICAL_CSV),
        csv_only.path().join(CANONICAL_CSV),
    )?;
    let from_csv = features.run(
        &csv_only.path().join(CANONICAL_CSV),
        &FsArtifactSink::new(csv_only.path().join("out"))?,
        false,
        false,
    )?;

    assert_eq!(from_sibling.table.len(), 3);
    let roles = |t: &build_features::pipeline::processing::features::CompositeTable| {
        t.records.iter().map(|r| r.primary_role.clone()).collect::<Vec<_>>()
    };
    assert_eq!(roles(&from_sibling.table), roles(&from_csv.table));
    assert_eq!(from_sibling.table.scores_of(0), from_csv.table.scores_of(0));
    Ok(())
}

#[test]
fn test_skip_percentiles_omits_rank_columns() -> Result<()> {
    let input = tempdir()?;
    let output = tempdir()?;
    write_inputs(input.path())?;
    RunUseCase::new(&Config::default())?.run(
        input.path(),
        &FsArtifactSink::new(output.path())?,
        false,
        true,
    )?;

    let csv = fs::read_to_string(output.path().join(FEATURES_CSV))?;
    let header = csv.lines().next().unwrap();
    assert!(header.contains("athleticism"));
    assert!(!header.contains("_pct_"));

    let definitions: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join(FEATURE_DEFINITIONS_JSON))?)?;
    assert_eq!(definitions["percentile_method"]["computed"], false);
    Ok(())
}

#[test]
fn test_custom_config_file() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("features.toml");
    fs::write(
        &config_path,
        r#"
[columns]
name = "player"
group = "slot"

[[composites]]
name = "motor"
label = "Motor"
inputs = ["speed", "vertical"]
weights = [1.0, 1.0]
"#,
    )?;
    let config = Config::load(&config_path)?;

    let input = dir.path().join("in");
    fs::create_dir(&input)?;
    fs::write(input.join("t.csv"), "Player,Slot,Speed,Vertical\nA,PG,90,70\nB,C,40,\n")?;

    let output = RunUseCase::new(&config)?.run(
        &input,
        &FsArtifactSink::new(dir.path().join("out"))?,
        false,
        false,
    )?;
    let records = &output.features.table.records;
    assert_eq!(records[0].primary_role, "Motor");
    assert_eq!(records[0].scores, vec![Some(70.0)]);
    assert_eq!(records[1].scores, vec![Some(40.0)]);
    assert_eq!(output.features.report.builds_with_missing_stat_used_for_composites, 1);
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("bad.toml");
    fs::write(
        &config_path,
        "[[composites]]\nname = \"x\"\ninputs = [\"a\", \"b\"]\nweights = [1.0]\n",
    )?;
    let err = Config::load(&config_path).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    Ok(())
}
