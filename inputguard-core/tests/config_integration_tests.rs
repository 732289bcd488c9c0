// inputguard-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use inputguard_core::config::{GuardConfig, Policy, DEFAULT_INGEST_URL};
use inputguard_core::GuardError;

#[test]
fn test_load_from_file() -> Result<()> {
    let yaml_content = r#"
policy: auto_redact
debounce_ms: 300
send_control_test_id: "composer-send"
container:
  min_width: 320
endpoints:
  check_url: "https://guard.internal.example/check"
"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml_content.as_bytes())?;
    let config = GuardConfig::load_from_file(file.path())?;

    assert_eq!(config.policy, Policy::AutoRedact);
    assert_eq!(config.debounce_ms, 300);
    assert_eq!(config.send_control_test_id, "composer-send");
    assert_eq!(config.container.min_width, 320.0);
    // Omitted keys keep their defaults.
    assert_eq!(config.container.min_height, 36.0);
    assert_eq!(config.indicator_ttl_ms, 8_000);
    assert_eq!(config.endpoints.check_url, "https://guard.internal.example/check");
    assert_eq!(config.endpoints.ingest_url, DEFAULT_INGEST_URL);
    Ok(())
}

#[test]
fn test_empty_file_is_default_config() -> Result<()> {
    let file = NamedTempFile::new()?;
    std::fs::write(file.path(), "{}")?;
    assert_eq!(GuardConfig::load_from_file(file.path())?, GuardConfig::default());
    Ok(())
}

#[test]
fn test_invalid_values_are_all_reported() -> Result<()> {
    let yaml_content = r#"
debounce_ms: 0
request_timeout_ms: 0
endpoints:
  ingest_url: "ftp://example.com/ingest"
"#;
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml_content.as_bytes())?;

    let err = GuardConfig::load_from_file(file.path()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("debounce_ms"), "{}", message);
    assert!(message.contains("request_timeout_ms"), "{}", message);
    assert!(message.contains("endpoints.ingest_url"), "{}", message);
    assert!(matches!(
        err.root_cause().downcast_ref::<GuardError>(),
        Some(GuardError::InvalidConfig(_))
    ));
    Ok(())
}

#[test]
fn test_unknown_policy_is_rejected() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"policy: shred\n")?;
    assert!(GuardConfig::load_from_file(file.path()).is_err());
    Ok(())
}

#[test]
fn test_missing_file_names_the_path() {
    let err = GuardConfig::load_from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}
