//! Tests for layered configuration loading and application.

use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::capability::{detect, hardware_capabilities, reset_capabilities, Capability};
use super::config::{DispatchConfig, SimdistConfig};
use super::error::Error;

#[test]
fn test_defaults() {
    let config = SimdistConfig::default();
    assert_eq!(config.dispatch.capabilities, None);
    assert!(!config.dispatch.warmup);
}

#[test]
fn test_from_toml_str() {
    let config = SimdistConfig::from_toml_str(
        r#"
        [dispatch]
        capabilities = ["serial", "haswell"]
        warmup = true
        "#,
    )
    .unwrap();
    assert_eq!(
        config.dispatch.capabilities,
        Some(vec![Capability::Serial, Capability::Haswell])
    );
    assert!(config.dispatch.warmup);
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = SimdistConfig::from_toml_str("[dispatch]\nwarmup = true\n").unwrap();
    assert_eq!(config.dispatch.capabilities, None);
    assert!(config.dispatch.warmup);
}

#[test]
fn test_unknown_tier_is_config_error() {
    let err = SimdistConfig::from_toml_str("[dispatch]\ncapabilities = [\"sse9\"]\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
#[serial]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[dispatch]\ncapabilities = [\"serial\"]").unwrap();

    let config = SimdistConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.dispatch.capabilities, Some(vec![Capability::Serial]));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimdistConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, SimdistConfig::default());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[dispatch]\nwarmup = false").unwrap();

    std::env::set_var("SIMDIST_DISPATCH__WARMUP", "true");
    let config = SimdistConfig::load(Some(file.path()));
    std::env::remove_var("SIMDIST_DISPATCH__WARMUP");

    assert!(config.unwrap().dispatch.warmup);
}

#[test]
fn test_to_toml_round_trip() {
    let config = SimdistConfig {
        dispatch: DispatchConfig {
            capabilities: Some(vec![Capability::Serial, Capability::Neon]),
            warmup: true,
        },
    };
    let rendered = config.to_toml().unwrap();
    assert!(rendered.contains("[dispatch]"));
    assert!(rendered.contains("neon"));
    assert_eq!(SimdistConfig::from_toml_str(&rendered).unwrap(), config);
}

#[test]
#[serial]
fn test_apply_installs_override() {
    let config = SimdistConfig {
        dispatch: DispatchConfig {
            capabilities: Some(vec![Capability::Serial]),
            warmup: true,
        },
    };
    let effective = config.apply();
    assert_eq!(effective.best(), Capability::Serial);
    assert_eq!(detect(), effective);

    reset_capabilities();
    assert_eq!(detect(), hardware_capabilities());
}

#[test]
#[serial]
fn test_apply_without_override_keeps_published_set() {
    reset_capabilities();
    let effective = SimdistConfig::default().apply();
    assert_eq!(effective, hardware_capabilities());
}
