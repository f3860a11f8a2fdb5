use notevault_core::{init_logging, logging_status, LogConfig};

// Logging is process-global, so every assertion lives in a single test.
#[test]
fn file_logging_initializes_once_and_rejects_reconfiguration() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");

    assert_eq!(logging_status(), None);

    let config = LogConfig::files("info", &log_dir);
    init_logging(&config).unwrap();
    init_logging(&LogConfig::files("INFO", &log_dir)).unwrap();

    let status = logging_status().unwrap();
    assert_eq!(status.level, "info");
    assert_eq!(status.log_dir.as_deref(), Some(log_dir.as_path()));
    assert!(log_dir.is_dir());

    let err = init_logging(&LogConfig::files("debug", &log_dir)).unwrap_err();
    assert!(err.contains("refusing to switch"));

    let err = init_logging(&LogConfig::stderr("info")).unwrap_err();
    assert!(err.contains("refusing to switch"));

    let err = init_logging(&LogConfig::files("info", "relative/logs")).unwrap_err();
    assert!(err.contains("absolute"));

    assert_eq!(logging_status().unwrap(), status);
}
