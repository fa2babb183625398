//! Integration tests for Configuration System

use crate::integration::test_utils::with_env;
use std::fs;
use tempfile::TempDir;
use universal_agent::config::{global_config_path, ConfigLoader, StorageBackend};
use universal_agent::driver::CapabilityDriver;

fn write_global(test_dir: &TempDir, contents: &str) {
    let dir = test_dir.path().join("uagent");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_global_file_is_read_from_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
[backend]
project_id = "from-global"

[backend.collections]
foo = "/foos/"
"#,
    );

    let config = with_env(&test_dir, &[], || {
        assert_eq!(
            global_config_path(),
            Some(test_dir.path().join("uagent").join("config.toml"))
        );
        ConfigLoader::new().with_env(false).load().unwrap()
    });
    assert_eq!(config.backend.project_id, "from-global");
    assert!(config.capabilities().contains("foo"));
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    write_global(&test_dir, "[backend]\nproject_id = \"from-global\"\n");
    let explicit = test_dir.path().join("explicit.toml");
    fs::write(&explicit, "[storage]\nbackend = \"json\"\n").unwrap();

    let config = with_env(
        &test_dir,
        &[
            ("UA__BACKEND__PROJECT_ID", "from-env"),
            ("UA__STORAGE__PATH", "/tmp/uagent-fields.json"),
        ],
        || ConfigLoader::new().with_file(&explicit).load().unwrap(),
    );
    assert_eq!(config.backend.project_id, "from-env");
    assert_eq!(config.storage.backend, StorageBackend::Json);
    assert_eq!(config.storage.path.to_str(), Some("/tmp/uagent-fields.json"));
}

#[test]
fn test_loaded_config_builds_working_driver() {
    let test_dir = TempDir::new().unwrap();
    let explicit = test_dir.path().join("agent.toml");
    fs::write(
        &explicit,
        format!(
            r#"
[backend]
endpoint = "http://127.0.0.1:9/v1/"
project_id = "p1"

[backend.collections]
foo = "/foos/"
bar = "/bars/"

[storage]
backend = "json"
path = "{}"

[transformers.foo]
ignore_null_attributes = true
"#,
            test_dir.path().join("fields.json").display()
        ),
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_global_file(None)
        .with_env(false)
        .with_file(&explicit)
        .load()
        .unwrap();
    assert!(config.validate().is_ok());

    let mut driver = config.build_driver().unwrap();
    assert_eq!(driver.get_capabilities().len(), 2);
    driver.start().unwrap();
    driver.abort();
}
