// Logs module - handler setup, rotation and logger handles

mod bridge;
mod format;
mod handler;
mod logger;
mod manager;
pub mod paths;
mod writer;

pub use bridge::{
    FormatterConfig, HandlerConfig, LoggerConfig, WebServerLogConfig, CONSOLE_HANDLER,
    FILE_HANDLER, FORMATTER_NAME,
};
pub use format::{PatternFormatter, Record};
pub use handler::{ConsoleTarget, SharedBuffer};
pub use logger::{LogContext, Logger};
pub use manager::LogManager;
pub use paths::Locations;
pub use writer::RotatingFileWriter;
