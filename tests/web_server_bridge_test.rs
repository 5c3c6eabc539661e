use easylog::logs::{SharedBuffer, FILE_HANDLER};
use easylog::{ConsoleTarget, Locations, LogLevel, LogManager, LogSettings};
use std::path::Path;
use tempfile::TempDir;

fn manager(root: &Path) -> LogManager {
    LogManager::new()
        .with_locations(Locations {
            home_dir: None,
            temp_dir: root.join("tmp"),
        })
        .with_console(ConsoleTarget::Buffer(SharedBuffer::new()))
}

#[test]
fn test_bridge_matches_active_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(temp_dir.path());

    let config = manager.setup(
        Some(
            LogSettings::new()
                .log_dir(temp_dir.path().join("logs"))
                .format("{asctime} [{levelname}] {name}: {message}")
                .date_format("%d/%m %H:%M")
                .max_bytes(65536)
                .backup_count(4),
        ),
        None,
    );

    let bridge = manager.get_external_log_config(false, LogLevel::Debug);

    let formatter = bridge.formatter().unwrap();
    assert_eq!(formatter.format, config.format);
    assert_eq!(formatter.datefmt, "%d/%m %H:%M");

    let file = &bridge.handlers[FILE_HANDLER];
    assert_eq!(
        file.filename.as_deref(),
        manager.log_file().unwrap().to_str()
    );
    assert_eq!(file.max_bytes, Some(65536));
    assert_eq!(file.backup_count, Some(4));

    for name in ["", "uvicorn", "uvicorn.error", "uvicorn.access"] {
        let logger = &bridge.loggers[name];
        assert_eq!(logger.handlers, vec!["console", "file"]);
        assert_eq!(logger.level, LogLevel::Info);
        assert!(!logger.propagate);
    }
}

#[test]
fn test_bridge_from_configured_runtime_flags() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(temp_dir.path());

    manager.setup(
        Some(
            LogSettings::new()
                .log_level("ERROR")
                .console_output(false)
                .log_dir(temp_dir.path().join("logs"))
                .web_server_runtime(true, "DEBUG")
                .web_server_loggers(vec!["hyper".to_string()]),
        ),
        None,
    );

    let bridge = manager.web_server_log_config();

    assert_eq!(bridge.loggers.len(), 2);
    assert_eq!(bridge.loggers["hyper"].level, LogLevel::Debug);
    assert_eq!(bridge.loggers["hyper"].handlers, vec!["file"]);
    assert_eq!(bridge.loggers[""].level, LogLevel::Error);
}

#[test]
fn test_bridge_json_document() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(temp_dir.path());
    manager.setup(
        Some(LogSettings::new().log_filename("").format("{message}")),
        None,
    );

    let json = manager.get_external_log_config(true, LogLevel::Warning).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["version"], 1);
    assert_eq!(value["disable_existing_loggers"], false);
    assert_eq!(value["formatters"]["easylog"]["format"], "{message}");
    assert_eq!(value["formatters"]["easylog"]["style"], "{");
    assert_eq!(value["handlers"]["console"]["class"], "logging.StreamHandler");
    assert_eq!(value["handlers"]["file"]["encoding"], "utf-8");
    assert_eq!(value["loggers"]["uvicorn.access"]["level"], "WARNING");
    assert_eq!(value["loggers"][""]["handlers"], serde_json::json!(["console"]));
}
