#![forbid(unsafe_code)]

//! Loading [`ManagerConfig`] from TOML and JSON.
//!
//! Run:
//!   cargo test -p fieldnote-undo --features config --test config_loading

use std::io::Write;

use fieldnote_undo::{ActionManager, ConfigError, ManagerConfig};

#[test]
fn toml_overrides_only_listed_keys() {
    let config = ManagerConfig::from_toml_str(
        r#"
        max_tasks = 200
        refresh_threshold = 25
        "#,
    )
    .unwrap();

    assert_eq!(config.max_tasks, 200);
    assert_eq!(config.refresh_threshold, 25);
    assert!(!config.keep_empty_tasks);
    assert!(!config.create_mark_if_needed);
}

#[test]
fn empty_toml_is_default() {
    let config = ManagerConfig::from_toml_str("").unwrap();
    assert_eq!(config, ManagerConfig::default());
}

#[test]
fn json_round_trip_through_manager() {
    let config = ManagerConfig::from_json_str(
        r#"{ "max_tasks": 3, "keep_empty_tasks": true, "create_mark_if_needed": true }"#,
    )
    .unwrap();
    assert_eq!(config.max_tasks, 3);

    let mut mgr = ActionManager::new(config);
    mgr.begin_task("Empty", "Empty").unwrap();
    mgr.end_task().unwrap();
    assert_eq!(mgr.undoable_task_count(), 1);
    assert!(mgr.top_mark_handle().is_some());
}

#[test]
fn zero_max_tasks_fails_validation() {
    let err = ManagerConfig::from_toml_str("max_tasks = 0").unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("max_tasks"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn malformed_input_reports_parser() {
    let err = ManagerConfig::from_toml_str("max_tasks = \"many\"").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
    assert!(err.to_string().starts_with("TOML parse error"));

    let err = ManagerConfig::from_json_str("{ \"max_tasks\": -1 }").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn loads_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("fieldnote-undo.toml");
    let mut file = std::fs::File::create(&toml_path).unwrap();
    writeln!(file, "max_tasks = 50").unwrap();
    writeln!(file, "keep_empty_tasks = true").unwrap();
    drop(file);
    let config = ManagerConfig::from_toml_file(&toml_path).unwrap();
    assert_eq!(config.max_tasks, 50);
    assert!(config.keep_empty_tasks);

    let json_path = dir.path().join("fieldnote-undo.json");
    std::fs::write(&json_path, r#"{ "refresh_threshold": 9 }"#).unwrap();
    let config = ManagerConfig::from_json_file(&json_path).unwrap();
    assert_eq!(config.refresh_threshold, 9);
    assert_eq!(config.max_tasks, usize::MAX);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ManagerConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
