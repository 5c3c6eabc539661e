use crate::config::{LogConfig, LogLevel};
use crate::error::{EasylogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const FORMATTER_NAME: &str = "easylog";
pub const CONSOLE_HANDLER: &str = "console";
pub const FILE_HANDLER: &str = "file";

/// Logging configuration for a web server that takes a dictionary-style
/// logging config (`version`, `formatters`, `handlers`, `loggers`).
///
/// It points at the same console stream and log file as the manager, with the
/// same layout, so server and application records interleave cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebServerLogConfig {
    pub version: u32,
    pub disable_existing_loggers: bool,
    pub formatters: BTreeMap<String, FormatterConfig>,
    pub handlers: BTreeMap<String, HandlerConfig>,
    pub loggers: BTreeMap<String, LoggerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub format: String,
    pub datefmt: String,
    /// Placeholder style of `format`
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    pub class: String,
    pub formatter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub handlers: Vec<String>,
    pub level: LogLevel,
    pub propagate: bool,
}

/// What the manager currently writes to
pub(crate) struct ActiveOutputs<'a> {
    pub log_file: Option<&'a Path>,
    pub console: bool,
    pub console_stream: &'a str,
}

impl WebServerLogConfig {
    /// Build the config for `config` and the outputs actually in use.
    ///
    /// With `runtime_enabled` the web-server loggers get `runtime_level`,
    /// otherwise they follow the application level.
    pub(crate) fn build(
        config: &LogConfig,
        outputs: &ActiveOutputs<'_>,
        runtime_enabled: bool,
        runtime_level: LogLevel,
    ) -> Self {
        let formatters = BTreeMap::from([(
            FORMATTER_NAME.to_string(),
            FormatterConfig {
                format: config.format.clone(),
                datefmt: config.date_format.clone(),
                style: "{".to_string(),
            },
        )]);

        let filename = match outputs.log_file {
            Some(path) => path.to_path_buf(),
            None => config.log_dir.join(&config.log_filename),
        };

        let handlers = BTreeMap::from([
            (
                CONSOLE_HANDLER.to_string(),
                HandlerConfig {
                    class: "logging.StreamHandler".to_string(),
                    formatter: FORMATTER_NAME.to_string(),
                    stream: Some(outputs.console_stream.to_string()),
                    filename: None,
                    max_bytes: None,
                    backup_count: None,
                    encoding: None,
                },
            ),
            (
                FILE_HANDLER.to_string(),
                HandlerConfig {
                    class: "logging.handlers.RotatingFileHandler".to_string(),
                    formatter: FORMATTER_NAME.to_string(),
                    stream: None,
                    filename: Some(filename.display().to_string()),
                    max_bytes: Some(config.max_bytes),
                    backup_count: Some(config.backup_count),
                    encoding: Some("utf-8".to_string()),
                },
            ),
        ]);

        let mut active = Vec::new();
        if outputs.console {
            active.push(CONSOLE_HANDLER.to_string());
        }
        if outputs.log_file.is_some() {
            active.push(FILE_HANDLER.to_string());
        }
        if active.is_empty() {
            active.push(CONSOLE_HANDLER.to_string());
        }

        let server_level = if runtime_enabled {
            runtime_level
        } else {
            config.log_level
        };

        let mut loggers = BTreeMap::new();
        loggers.insert(
            String::new(),
            LoggerConfig {
                handlers: active.clone(),
                level: config.log_level,
                propagate: false,
            },
        );
        for name in &config.web_server_loggers {
            loggers.insert(
                name.clone(),
                LoggerConfig {
                    handlers: active.clone(),
                    level: server_level,
                    propagate: false,
                },
            );
        }

        Self {
            version: 1,
            disable_existing_loggers: false,
            formatters,
            handlers,
            loggers,
        }
    }

    /// The single formatter every handler uses
    pub fn formatter(&self) -> Option<&FormatterConfig> {
        self.formatters.get(FORMATTER_NAME)
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| EasylogError::SerializationError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EasylogError::SerializationError(e.to_string()))
    }
}
