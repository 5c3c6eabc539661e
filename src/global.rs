//! Process-wide manager and free-function shortcuts.
//!
//! Libraries should prefer passing a [`LogManager`] around; these helpers are
//! for binaries that want one logging setup for the whole process. The first
//! use also installs the manager's dispatcher as the global `tracing` default,
//! unless the host already installed one, so plain `tracing` macros land in
//! the same files.

use crate::config::{LogConfig, LogSettings};
use crate::logs::{LogManager, Logger, WebServerLogConfig};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<LogManager> = OnceLock::new();

/// The process-wide manager
pub fn global() -> &'static LogManager {
    GLOBAL.get_or_init(|| {
        let manager = LogManager::new();
        // Keep the host's subscriber if it set one first
        let _ = tracing::dispatcher::set_global_default(manager.dispatch().clone());
        manager
    })
}

/// Set up the process-wide manager; see [`LogManager::setup`]
pub fn setup_logging(config: Option<LogSettings>, overrides: Option<LogSettings>) -> Arc<LogConfig> {
    global().setup(config, overrides)
}

/// Named logger from the process-wide manager
pub fn get_logger(name: &str) -> Logger {
    global().get_logger(name)
}

/// Directory the process-wide manager writes to
pub fn get_log_path() -> Option<PathBuf> {
    global().get_log_path()
}

/// Web-server logging config of the process-wide manager
pub fn get_web_server_log_config() -> WebServerLogConfig {
    global().web_server_log_config()
}
