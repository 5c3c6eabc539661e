// Library exports for easylog

pub mod cli;
pub mod config;
pub mod error;
pub mod global;
pub mod logs;

pub use config::{LogConfig, LogLevel, LogSettings};
pub use error::{EasylogError, Result};
pub use global::{get_log_path, get_logger, get_web_server_log_config, global, setup_logging};
pub use logs::{ConsoleTarget, Locations, LogContext, LogManager, Logger, WebServerLogConfig};
