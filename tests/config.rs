use std::fs;
use std::path::PathBuf;

use daylist::config::{Config, CONFIG_FILE};

#[test]
fn load_from_dir_defaults_on_invalid_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE), "data_dir = 123").expect("write invalid config");

    let cfg = Config::load_from_dir(dir.path());
    assert_eq!(cfg.data_dir, PathBuf::from("data"));
    assert_eq!(cfg.storage.lock_timeout_ms, 5000);
}

#[test]
fn load_from_dir_defaults_on_zero_timeout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let content = r#"
[storage]
lock_timeout_ms = 0
"#;
    fs::write(dir.path().join(CONFIG_FILE), content.trim()).expect("write config");

    let cfg = Config::load_from_dir(dir.path());
    assert_eq!(cfg.storage.lock_timeout_ms, 5000);
}
