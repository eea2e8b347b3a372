//! Unit tests for config.rs module

use std::collections::HashMap;

use waste_sorter::config::AppConfig;

#[test]
fn test_default_server_config() {
    let config = AppConfig::default();

    assert_eq!(config.server.bind_address, "127.0.0.1:5000");
    assert_eq!(config.server.public_url, "http://127.0.0.1:5000");
    assert!(!config.server.secret_key.is_empty());
}

#[test]
fn test_default_upload_config() {
    let config = AppConfig::default();

    assert_eq!(config.upload.directory, "static/uploads");
    assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
    assert_eq!(config.upload.allowed_extensions, vec!["png", "jpg", "jpeg", "gif"]);
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_validation_rejects_empty_secret() {
    let mut config = AppConfig::default();
    config.server.secret_key = "   ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_bad_bind_address() {
    let mut config = AppConfig::default();
    config.server.bind_address = "not-an-address".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_dotted_extension() {
    let mut config = AppConfig::default();
    config.upload.allowed_extensions = vec![".png".to_string()];
    assert!(config.validate().is_err());

    config.upload.allowed_extensions.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_unknown_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_allowed_extensions_are_lowercased() {
    let mut config = AppConfig::default();
    config.upload.allowed_extensions = vec!["PNG".to_string(), "Jpg".to_string()];
    assert_eq!(config.allowed_extensions(), vec!["png", "jpg"]);
}

#[test]
fn test_legacy_env_overrides() {
    let vars: HashMap<&str, &str> = [
        ("SECRET_KEY", "s3cret"),
        ("AUTH0_DOMAIN", "tenant.example.com"),
        ("AUTH0_CLIENT_ID", "client"),
    ]
    .into_iter()
    .collect();

    let mut config = AppConfig::default();
    config.apply_legacy_env(|name| vars.get(name).map(|v| (*v).to_string()));

    assert_eq!(config.server.secret_key, "s3cret");
    assert_eq!(config.identity.domain, "tenant.example.com");
    assert_eq!(config.identity.client_id, "client");
    // Unset variables leave the configured value alone
    assert_eq!(config.identity.client_secret, AppConfig::default().identity.client_secret);
}

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waste.toml");
    std::fs::write(
        &path,
        r#"
[database]
path = "custom.db"

[upload]
max_bytes = 2048
"#,
    )
    .unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database.path, "custom.db");
    assert_eq!(config.upload.max_bytes, 2048);
    assert_eq!(config.model.input_size, 224);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}
