use super::data::Config;
use super::defaults::{DEFAULT_ASSISTANT_NAME, DEFAULT_BASE_URL};
use super::io::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    assert_eq!(config.history_exchanges(), 3);
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.assistant_name(), DEFAULT_ASSISTANT_NAME);
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        base_url: Some("http://127.0.0.1:8000".to_string()),
        history_exchanges: Some(5),
        request_timeout_secs: Some(0),
        assistant_name: Some("Sage".to_string()),
        data_dir: Some(PathBuf::from("/tmp/nebras-data")),
    };
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);
    assert_eq!(loaded.history_exchanges(), 5);
    assert_eq!(loaded.request_timeout(), None);
    assert_eq!(loaded.assistant_name(), "Sage");
    assert_eq!(loaded.data_dir(), Some(PathBuf::from("/tmp/nebras-data")));
}

#[test]
fn test_partial_config_keeps_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "request_timeout_secs = 12\n").unwrap();

    let config = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(12)));
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
}

#[test]
fn test_invalid_toml_reports_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "history_exchanges = \"many\"\n").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn test_blank_values_fall_back_to_defaults() {
    let config = Config {
        base_url: Some("   ".to_string()),
        assistant_name: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    assert_eq!(config.assistant_name(), DEFAULT_ASSISTANT_NAME);
}

#[test]
fn test_environment_overrides_file_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("NEBRAS_BASE_URL", "http://localhost:9000/generate"),
        ("NEBRAS_DATA_DIR", "/var/lib/nebras"),
    ]);
    let mut config = Config {
        base_url: Some("http://file".to_string()),
        ..Default::default()
    };
    config.apply_env(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.base_url(), "http://localhost:9000/generate");
    assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/nebras")));

    let mut untouched = Config::default();
    untouched.apply_env(|_| None);
    assert_eq!(untouched, Config::default());
}

#[test]
fn test_set_and_unset_by_cli_key() {
    let mut config = Config::default();
    config.set_value("history-exchanges", "5").unwrap();
    config.set_value("request-timeout", "45s").unwrap();
    config.set_value("assistant-name", " Sage ").unwrap();
    assert_eq!(config.history_exchanges(), 5);
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(45)));
    assert_eq!(config.assistant_name(), "Sage");

    config.unset_value("history-exchanges").unwrap();
    assert_eq!(config.history_exchanges, None);
    assert_eq!(config.history_exchanges(), 3);
}

#[test]
fn test_set_rejects_bad_input() {
    let mut config = Config::default();
    assert!(config.set_value("history-exchanges", "lots").is_err());
    assert!(config.set_value("base-url", "  ").is_err());
    let err = config.set_value("model", "x").unwrap_err();
    assert!(err.contains("base-url"));
    assert!(config.unset_value("model").is_err());
    assert_eq!(config, Config::default());
}
