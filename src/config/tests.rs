// src/config/tests.rs

use super::*;
use test_log::test;

#[test]
fn test_defaults_match_classic_batch() {
    let config = Config::default();
    assert_eq!(config.generation.continuation_probability, 0.925);
    assert_eq!(config.generation.max_depth, 64);
    assert_eq!(config.generation.max_terms, 65536);
    assert_eq!(config.render.pixels_per_unit, 150);
    assert_eq!(config.render.threads, 1);
    assert_eq!(config.output.count, 100);
    assert_eq!(config.output.prefix, "test");
    assert_eq!(config.output.directory, PathBuf::from("."));
    assert_eq!(config.seed, None);
    assert_eq!(config.dialect, Dialect::Standard);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_other_defaults() {
    let config = Config::from_json(
        r#"{
            "render": { "pixels_per_unit": 20 },
            "output": { "count": 3 },
            "seed": 5,
            "dialect": "legacy"
        }"#,
    )
    .unwrap();
    assert_eq!(config.render.pixels_per_unit, 20);
    assert_eq!(config.render.threads, 1);
    assert_eq!(config.output.count, 3);
    assert_eq!(config.output.prefix, "test");
    assert_eq!(config.seed, Some(5));
    assert_eq!(config.dialect, Dialect::Legacy);
    assert_eq!(config.generation, GenerationConfig::default());
}

#[test]
fn test_empty_object_is_default() {
    assert_eq!(Config::from_json("{}").unwrap(), Config::default());
}

#[test]
fn test_invalid_values_are_rejected() {
    for json in [
        r#"{ "generation": { "continuation_probability": 1.5 } }"#,
        r#"{ "generation": { "continuation_probability": -0.1 } }"#,
        r#"{ "generation": { "continuation_probability": 1.0 } }"#,
        r#"{ "generation": { "max_depth": 257 } }"#,
        r#"{ "render": { "pixels_per_unit": 0 } }"#,
        r#"{ "render": { "pixels_per_unit": 4294967295 } }"#,
        r#"{ "render": { "threads": 0 } }"#,
        r#"{ "output": { "prefix": "../escape" } }"#,
        r#"{ "dialect": "fancy" }"#,
        "not json",
    ] {
        assert!(Config::from_json(json).is_err(), "accepted {}", json);
    }
}

#[test]
fn test_json_round_trip() {
    let mut config = Config::default();
    config.seed = Some(42);
    config.render.threads = 4;
    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(Config::from_json(&text).unwrap(), config);
}

#[test]
fn test_load_reads_file_and_reports_missing() {
    let path = std::env::temp_dir().join(format!("exprart_config_{}.json", std::process::id()));
    fs::write(&path, r#"{ "output": { "prefix": "art" } }"#).unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.output.prefix, "art");
    fs::remove_file(&path).unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_limits_are_inclusive() {
    let config = Config::from_json(
        r#"{
            "generation": { "continuation_probability": 0.999999, "max_depth": 256 },
            "render": { "pixels_per_unit": 4096 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.generation.max_depth, MAX_DEPTH_LIMIT);
    assert_eq!(config.render.pixels_per_unit, MAX_PIXELS_PER_UNIT);
}
