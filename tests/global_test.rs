// The process-wide manager can only be set up once per test binary, so
// everything runs in a single test.

use easylog::{get_log_path, get_logger, get_web_server_log_config, global, setup_logging};
use easylog::{LogLevel, LogSettings};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_global_setup_and_tracing_bridge() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");

    let config = setup_logging(
        Some(
            LogSettings::new()
                .log_dir(log_dir.clone())
                .console_output(false)
                .format("{name} {levelname} {message}"),
        ),
        Some(LogSettings::new().log_level("DEBUG")),
    );

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(get_log_path(), Some(log_dir.clone()));
    assert!(global().is_initialized());

    get_logger("billing").info("invoice sent");
    tracing::warn!(target: "worker", "queue slow");

    // ignored, the first setup stays
    setup_logging(Some(LogSettings::new().log_level("ERROR")), None);
    assert_eq!(global().config().log_level, LogLevel::Debug);

    let content = fs::read_to_string(log_dir.join("app.log")).unwrap();
    assert!(content.contains("billing INFO invoice sent\n"));
    assert!(content.contains("worker WARNING queue slow\n"));
    assert!(content.contains("easylog WARNING Logging already initialized, ignoring repeated setup\n"));

    let bridge = get_web_server_log_config();
    assert_eq!(bridge.loggers[""].handlers, vec!["file"]);
}
