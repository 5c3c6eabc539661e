use crate::error::{EasylogError, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default record layout
pub const DEFAULT_FORMAT: &str = "{asctime} - {name} - {levelname} - {message}";

/// Default `{asctime}` layout (chrono strftime)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default name of the active log file
pub const DEFAULT_LOG_FILENAME: &str = "app.log";

/// Default maximum log file size before rotation (10MB)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of rotated archives to keep
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Logger names the web-server integration applies to by default
pub const DEFAULT_WEB_SERVER_LOGGERS: [&str; 3] = ["uvicorn", "uvicorn.error", "uvicorn.access"];

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Upper-case level name as rendered by `{levelname}`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Numeric severity as rendered by `{levelno}`
    pub fn severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warning => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    /// Closest `tracing` level. CRITICAL has no counterpart and maps to ERROR.
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }

    pub fn from_tracing(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = EasylogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(EasylogError::InvalidValue {
                field: "log_level".to_string(),
                reason: format!("unknown log level '{}'", s),
            }),
        }
    }
}

/// Caller-supplied logging options.
///
/// Every field is optional: missing values fall back to the built-in
/// defaults when the settings are resolved into a [`LogConfig`]. Unknown keys
/// in configuration files are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Minimum level, one of DEBUG/INFO/WARNING/ERROR/CRITICAL (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Root used for relative log directories and the `<project_root>/logs` fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    /// Preferred log directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Name of the active log file; an empty name disables file output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filename: Option<String>,

    /// Size in bytes at which the active file is rotated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,

    /// Number of rotated archives to keep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_count: Option<usize>,

    /// Whether records are also written to the console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_output: Option<bool>,

    /// Record layout with `{token}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// strftime layout for `{asctime}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Route web-server loggers through the handlers at their own level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_web_server_logging_runtime: Option<bool>,

    /// Level applied to web-server loggers when the runtime integration is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_server_log_level_runtime: Option<String>,

    /// Logger names owned by the web server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_server_loggers: Option<Vec<String>>,
}

impl LogSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn log_filename(mut self, name: impl Into<String>) -> Self {
        self.log_filename = Some(name.into());
        self
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = Some(backup_count);
        self
    }

    pub fn console_output(mut self, enabled: bool) -> Self {
        self.console_output = Some(enabled);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }

    pub fn web_server_runtime(mut self, enabled: bool, level: impl Into<String>) -> Self {
        self.configure_web_server_logging_runtime = Some(enabled);
        self.web_server_log_level_runtime = Some(level.into());
        self
    }

    pub fn web_server_loggers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.web_server_loggers = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Layer `other` on top of `self`; values present in `other` win.
    pub fn merge(self, other: LogSettings) -> LogSettings {
        LogSettings {
            log_level: other.log_level.or(self.log_level),
            project_root: other.project_root.or(self.project_root),
            log_dir: other.log_dir.or(self.log_dir),
            log_filename: other.log_filename.or(self.log_filename),
            max_bytes: other.max_bytes.or(self.max_bytes),
            backup_count: other.backup_count.or(self.backup_count),
            console_output: other.console_output.or(self.console_output),
            format: other.format.or(self.format),
            date_format: other.date_format.or(self.date_format),
            configure_web_server_logging_runtime: other
                .configure_web_server_logging_runtime
                .or(self.configure_web_server_logging_runtime),
            web_server_log_level_runtime: other
                .web_server_log_level_runtime
                .or(self.web_server_log_level_runtime),
            web_server_loggers: other.web_server_loggers.or(self.web_server_loggers),
        }
    }

    /// Load settings from a file (supports TOML and JSON)
    ///
    /// Keys may sit at the top level or inside a `logging` table; the table wins
    /// when both are present.
    pub fn from_file(path: &Path) -> Result<LogSettings> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EasylogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        match extension {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Err(EasylogError::InvalidConfig(format!(
                "Unsupported file format: {}. Use .toml or .json",
                extension
            ))),
        }
    }

    fn parse_toml(contents: &str) -> Result<LogSettings> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| EasylogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;
        Ok(file.into_settings())
    }

    fn parse_json(contents: &str) -> Result<LogSettings> {
        let file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| EasylogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))?;
        Ok(file.into_settings())
    }

    /// Resolve into a complete configuration.
    ///
    /// Invalid values never fail resolution: each one is replaced by its
    /// default and described in the returned warnings.
    pub fn resolve(&self) -> (LogConfig, Vec<String>) {
        let mut warnings = Vec::new();

        let log_level = resolve_level(self.log_level.as_deref(), "log_level", &mut warnings);

        let project_root = match &self.project_root {
            Some(root) => absolutize(root),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let log_dir = match &self.log_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join("logs"),
        };

        let max_bytes = match self.max_bytes {
            Some(0) => {
                warnings.push(format!(
                    "max_bytes must be positive, using default {}",
                    DEFAULT_MAX_BYTES
                ));
                DEFAULT_MAX_BYTES
            }
            Some(n) => n,
            None => DEFAULT_MAX_BYTES,
        };

        let format = match &self.format {
            Some(f) if f.trim().is_empty() => {
                warnings.push("format is empty, using default record layout".to_string());
                DEFAULT_FORMAT.to_string()
            }
            Some(f) => f.clone(),
            None => DEFAULT_FORMAT.to_string(),
        };

        let date_format = match &self.date_format {
            Some(f) if !is_valid_date_format(f) => {
                warnings.push(format!(
                    "Invalid date_format '{}', using default {}",
                    f, DEFAULT_DATE_FORMAT
                ));
                DEFAULT_DATE_FORMAT.to_string()
            }
            Some(f) => f.clone(),
            None => DEFAULT_DATE_FORMAT.to_string(),
        };

        let web_server_log_level_runtime = resolve_level(
            self.web_server_log_level_runtime.as_deref(),
            "web_server_log_level_runtime",
            &mut warnings,
        );

        let config = LogConfig {
            log_level,
            project_root,
            log_dir,
            log_filename: self
                .log_filename
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILENAME.to_string()),
            max_bytes,
            backup_count: self.backup_count.unwrap_or(DEFAULT_BACKUP_COUNT),
            console_output: self.console_output.unwrap_or(true),
            format,
            date_format,
            configure_web_server_logging_runtime: self
                .configure_web_server_logging_runtime
                .unwrap_or(false),
            web_server_log_level_runtime,
            web_server_loggers: self.web_server_loggers.clone().unwrap_or_else(|| {
                DEFAULT_WEB_SERVER_LOGGERS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        };

        (config, warnings)
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logging: Option<LogSettings>,
    #[serde(flatten)]
    top: LogSettings,
}

impl ConfigFile {
    fn into_settings(self) -> LogSettings {
        match self.logging {
            Some(table) => self.top.merge(table),
            None => self.top,
        }
    }
}

fn resolve_level(value: Option<&str>, field: &str, warnings: &mut Vec<String>) -> LogLevel {
    match value {
        Some(s) => s.parse().unwrap_or_else(|_| {
            warnings.push(format!("Unknown {} '{}', using INFO", field, s));
            LogLevel::Info
        }),
        None => LogLevel::Info,
    }
}

fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Fully resolved logging configuration.
///
/// Immutable once a manager is set up; `log_dir` is the requested directory,
/// which can differ from the one in use after fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogConfig {
    pub log_level: LogLevel,
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
    pub log_filename: String,
    pub max_bytes: u64,
    pub backup_count: usize,
    pub console_output: bool,
    pub format: String,
    pub date_format: String,
    pub configure_web_server_logging_runtime: bool,
    pub web_server_log_level_runtime: LogLevel,
    pub web_server_loggers: Vec<String>,
}

impl LogConfig {
    /// Last component of the project root, used by the home and temp fallbacks
    pub fn project_name(&self) -> String {
        self.project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "app".to_string())
    }

    /// Whether a log file should be written at all
    pub fn file_output(&self) -> bool {
        !self.log_filename.trim().is_empty()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogSettings::default().resolve().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let (config, warnings) = LogSettings::new().project_root("/srv/shop").resolve();

        assert!(warnings.is_empty());
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_dir, PathBuf::from("/srv/shop/logs"));
        assert_eq!(config.log_filename, "app.log");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.backup_count, 5);
        assert!(config.console_output);
        assert_eq!(config.format, DEFAULT_FORMAT);
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert!(!config.configure_web_server_logging_runtime);
        assert_eq!(config.web_server_log_level_runtime, LogLevel::Info);
        assert_eq!(
            config.web_server_loggers,
            vec!["uvicorn", "uvicorn.error", "uvicorn.access"]
        );
        assert_eq!(config.project_name(), "shop");
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("CRITICAL".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!(matches!(
            "verbose".parse::<LogLevel>(),
            Err(EasylogError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert_eq!(LogLevel::Critical.to_tracing(), tracing::Level::ERROR);
        assert_eq!(LogLevel::from_tracing(&tracing::Level::TRACE), LogLevel::Debug);
        assert_eq!(LogLevel::Warning.severity(), 30);
    }

    #[test]
    fn test_merge_later_source_wins() {
        let config = LogSettings::new()
            .log_level("DEBUG")
            .max_bytes(2048)
            .console_output(true);
        let overrides = LogSettings::new().log_level("ERROR").backup_count(1);

        let merged = config.merge(overrides);
        assert_eq!(merged.log_level.as_deref(), Some("ERROR"));
        assert_eq!(merged.max_bytes, Some(2048));
        assert_eq!(merged.backup_count, Some(1));
        assert_eq!(merged.console_output, Some(true));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let (config, warnings) = LogSettings::new()
            .project_root("/srv/shop")
            .log_level("LOUD")
            .max_bytes(0)
            .date_format("%Y %")
            .format("   ")
            .web_server_runtime(true, "nope")
            .resolve();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.format, DEFAULT_FORMAT);
        assert_eq!(config.web_server_log_level_runtime, LogLevel::Info);
        assert_eq!(warnings.len(), 5);
        assert!(warnings[0].contains("LOUD"));
    }

    #[test]
    fn test_relative_log_dir_joins_project_root() {
        let (config, _) = LogSettings::new()
            .project_root("/srv/shop")
            .log_dir("var/log")
            .resolve();
        assert_eq!(config.log_dir, PathBuf::from("/srv/shop/var/log"));

        let (config, _) = LogSettings::new()
            .project_root("/srv/shop")
            .log_dir("/var/log/shop")
            .resolve();
        assert_eq!(config.log_dir, PathBuf::from("/var/log/shop"));
    }

    #[test]
    fn test_empty_filename_disables_file_output() {
        let (config, _) = LogSettings::new().log_filename("").resolve();
        assert!(!config.file_output());
    }

    #[test]
    fn test_parse_toml_top_level() {
        let toml_content = r#"
            log_level = "DEBUG"
            max_bytes = 1024
            backup_count = 2
            console_output = false
            colour = "blue"
        "#;

        let settings = LogSettings::parse_toml(toml_content).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(settings.max_bytes, Some(1024));
        assert_eq!(settings.backup_count, Some(2));
        assert_eq!(settings.console_output, Some(false));
        assert_eq!(settings.format, None);
    }

    #[test]
    fn test_parse_toml_logging_table() {
        let toml_content = r#"
            name = "shop"

            [logging]
            log_level = "WARNING"
            log_filename = "shop.log"
            web_server_loggers = ["hyper", "tower_http"]
        "#;

        let settings = LogSettings::parse_toml(toml_content).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("WARNING"));
        assert_eq!(settings.log_filename.as_deref(), Some("shop.log"));
        assert_eq!(
            settings.web_server_loggers,
            Some(vec!["hyper".to_string(), "tower_http".to_string()])
        );
    }

    #[test]
    fn test_parse_json() {
        let json_content = r#"
            {
                "log_level": "ERROR",
                "date_format": "%H:%M:%S",
                "unknown": [1, 2, 3]
            }
        "#;

        let settings = LogSettings::parse_json(json_content).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("ERROR"));
        assert_eq!(settings.date_format.as_deref(), Some("%H:%M:%S"));
    }

    #[test]
    fn test_parse_toml_wrong_type() {
        let result = LogSettings::parse_toml("max_bytes = \"lots\"");
        assert!(matches!(result, Err(EasylogError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("logging.toml");
        fs::write(&config_path, "log_level = \"CRITICAL\"\n").unwrap();

        let settings = LogSettings::from_file(&config_path).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("CRITICAL"));
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("logging.yaml");
        fs::write(&config_path, "log_level: DEBUG").unwrap();

        let result = LogSettings::from_file(&config_path);
        assert!(matches!(result, Err(EasylogError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = LogSettings::from_file(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(EasylogError::ConfigError(_))));
    }
}
