//! Integration tests for Settings loading with layered merge semantics.
//!
//! These tests use explicit local files; a global config on the machine
//! running them would be layered underneath.

use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use navcompose::application::ApplicationError;
use navcompose::config::{FailurePolicy, Settings};

#[test]
fn given_local_config_when_loading_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("navcompose.toml");
    fs::write(
        &path,
        r#"
manifest = "nav.toml"

[engine]
failure_policy = "fail_together"
event_buffer = 8

[features]
mail = true
"#,
    )
    .expect("write config");

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.engine.failure_policy, FailurePolicy::FailTogether);
    assert_eq!(settings.engine.event_buffer, 8);
    assert!(settings.engine.refresh_on_build);
    assert_eq!(settings.features.get("mail"), Some(&true));
    assert_eq!(settings.manifest.as_deref(), Some(std::path::Path::new("nav.toml")));
}

#[test]
fn given_missing_local_config_when_loading_then_config_error() {
    let dir = TempDir::new().expect("tempdir");

    let result = Settings::load(Some(&dir.path().join("missing.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_toml_when_loading_then_config_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[engine\nfailure_policy = ").expect("write config");

    let result = Settings::load(Some(&path));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[rstest]
#[case("", FailurePolicy::Isolate, true)]
#[case("[engine]\nrefresh_on_build = false\n", FailurePolicy::Isolate, false)]
#[case("[engine]\nfailure_policy = \"fail_together\"\n", FailurePolicy::FailTogether, true)]
fn given_engine_section_when_parsing_then_missing_keys_keep_defaults(
    #[case] content: &str,
    #[case] policy: FailurePolicy,
    #[case] refresh_on_build: bool,
) {
    let settings = Settings::from_toml(content).expect("parse");

    assert_eq!(settings.engine.failure_policy, policy);
    assert_eq!(settings.engine.refresh_on_build, refresh_on_build);
    assert_eq!(settings.engine.event_buffer, 64);
}

#[test]
fn given_settings_when_rendering_toml_then_round_trips() {
    let settings = Settings::from_toml(
        r#"
[features]
gtnet = false

[contributors.tenant]
order = 4
"#,
    )
    .expect("parse");

    let rendered = settings.to_toml().expect("render");
    let reparsed = Settings::from_toml(&rendered).expect("reparse");

    assert_eq!(reparsed, settings);
}
