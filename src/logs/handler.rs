use crate::config::{LogConfig, LogLevel};
use crate::logs::format::{PatternFormatter, Record};
use crate::logs::writer::RotatingFileWriter;
use chrono::Local;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Target of every event emitted through a [`crate::Logger`]
pub(crate) const LOGGER_TARGET: &str = "easylog";

/// Name used for records the manager emits about itself
pub(crate) const INTERNAL_LOGGER: &str = "easylog";

const NAME_FIELD: &str = "logger";
const CRITICAL_FIELD: &str = "critical";
const CALLER_FILE_FIELD: &str = "caller_file";
const CALLER_LINE_FIELD: &str = "caller_line";
const MESSAGE_FIELD: &str = "message";

/// Handler set currently installed by a manager, shared with its loggers and layer
pub(crate) type SharedHandlers = Arc<RwLock<Option<Arc<HandlerSet>>>>;

pub(crate) fn current(shared: &SharedHandlers) -> Option<Arc<HandlerSet>> {
    shared
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory console, mostly useful to observe console output in tests
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.0)).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.0).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

/// Where console output goes
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
    Buffer(SharedBuffer),
}

impl ConsoleTarget {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            ConsoleTarget::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()
            }
            ConsoleTarget::Buffer(buffer) => {
                lock(&buffer.0).extend_from_slice(line.as_bytes());
                Ok(())
            }
        }
    }

    /// Stream reference understood by dictionary-based logging configs
    pub fn stream_name(&self) -> &'static str {
        match self {
            ConsoleTarget::Stderr => "ext://sys.stderr",
            _ => "ext://sys.stdout",
        }
    }
}

struct FileHandler {
    path: PathBuf,
    writer: Mutex<RotatingFileWriter>,
    disabled: AtomicBool,
}

/// Level thresholds for the web-server loggers
struct WebServerRouting {
    loggers: Vec<String>,
    level: LogLevel,
}

impl WebServerRouting {
    fn matches(&self, name: &str) -> bool {
        self.loggers.iter().any(|logger| {
            name.strip_prefix(logger.as_str()).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with('.') || rest.starts_with("::")
            })
        })
    }
}

/// The file and console outputs of one setup, sharing one formatter
pub(crate) struct HandlerSet {
    level: LogLevel,
    formatter: PatternFormatter,
    file: Option<FileHandler>,
    console: Option<ConsoleTarget>,
    /// Whether the configuration asked for a log file
    file_wanted: bool,
    /// Last resort once no other output is left
    fallback: ConsoleTarget,
    web_server: Option<WebServerRouting>,
}

impl HandlerSet {
    pub(crate) fn new(
        config: &LogConfig,
        file: Option<RotatingFileWriter>,
        console: Option<ConsoleTarget>,
    ) -> Self {
        let web_server = config
            .configure_web_server_logging_runtime
            .then(|| WebServerRouting {
                loggers: config.web_server_loggers.clone(),
                level: config.web_server_log_level_runtime,
            });

        Self {
            level: config.log_level,
            formatter: PatternFormatter::new(&config.format, &config.date_format),
            file: file.map(|writer| FileHandler {
                path: writer.path().to_path_buf(),
                writer: Mutex::new(writer),
                disabled: AtomicBool::new(false),
            }),
            console,
            file_wanted: config.file_output(),
            fallback: ConsoleTarget::Stderr,
            web_server,
        }
    }

    /// Replace the stream used when neither the file nor a console is available
    pub(crate) fn with_fallback(mut self, fallback: ConsoleTarget) -> Self {
        self.fallback = fallback;
        self
    }

    /// Minimum level for records from the named logger
    pub(crate) fn threshold(&self, name: &str) -> LogLevel {
        match &self.web_server {
            Some(routing) if routing.matches(name) => routing.level,
            _ => self.level,
        }
    }

    pub(crate) fn enabled(&self, name: &str, level: LogLevel) -> bool {
        level >= self.threshold(name)
    }

    /// Active log file, `None` once file output is off
    pub(crate) fn file_path(&self) -> Option<&Path> {
        self.file
            .as_ref()
            .filter(|file| !file.disabled.load(Ordering::Acquire))
            .map(|file| file.path.as_path())
    }

    pub(crate) fn has_console(&self) -> bool {
        self.console.is_some()
    }

    pub(crate) fn emit(&self, record: &Record<'_>) {
        if !self.enabled(record.name, record.level) {
            return;
        }

        self.write_line(&self.formatter.format(record));
    }

    /// Report a problem of the logging system itself.
    ///
    /// Goes to the file and console regardless of the level threshold; with
    /// neither available it goes to the fallback stream.
    pub(crate) fn diagnostic(&self, message: &str) {
        let line = self.formatter.format(&internal_record(LogLevel::Warning, message));

        if self.file_path().is_none() && self.console.is_none() {
            let _ = self.fallback.write_line(&line);
            return;
        }

        self.write_line(&line);
    }

    fn write_line(&self, line: &str) {
        let written = match &self.file {
            Some(file) => self.write_file(file, line),
            None => false,
        };

        match &self.console {
            Some(_) => self.write_console(line),
            // A log file was asked for but is gone; keep the record
            None if self.file_wanted && !written => {
                let _ = self.fallback.write_line(line);
            }
            None => {}
        }
    }

    /// Append `line` to the log file. Returns false when the sink is disabled,
    /// either already or because of this write.
    fn write_file(&self, file: &FileHandler, line: &str) -> bool {
        if file.disabled.load(Ordering::Acquire) {
            return false;
        }

        let result = lock(&file.writer).write_record(line.as_bytes());

        match result {
            Ok(()) => true,
            Err(e) => {
                file.disabled.store(true, Ordering::Release);
                let notice = format!("File logging to {} disabled: {}", file.path.display(), e);
                self.diagnostic(&notice);
                false
            }
        }
    }

    fn write_console(&self, line: &str) {
        if let Some(console) = &self.console {
            // Nowhere left to report a failing console
            let _ = console.write_line(line);
        }
    }
}

fn internal_record(level: LogLevel, message: &str) -> Record<'_> {
    Record {
        time: Local::now(),
        name: INTERNAL_LOGGER,
        level,
        message,
        module: INTERNAL_LOGGER,
        file: None,
        line: None,
    }
}

/// `tracing` layer forwarding every event to the installed handler set
pub(crate) struct ManagedLayer {
    handlers: SharedHandlers,
}

impl ManagedLayer {
    pub(crate) fn new(handlers: SharedHandlers) -> Self {
        Self { handlers }
    }
}

impl<S: Subscriber> Layer<S> for ManagedLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(handlers) = current(&self.handlers) else {
            return;
        };

        let metadata = event.metadata();
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let name = visitor.logger.as_deref().unwrap_or(metadata.target());
        let level = if visitor.critical {
            LogLevel::Critical
        } else {
            LogLevel::from_tracing(metadata.level())
        };

        if !handlers.enabled(name, level) {
            return;
        }

        let module = match visitor.logger {
            Some(_) => name,
            None => metadata.module_path().unwrap_or(name),
        };
        let message = visitor.render();

        handlers.emit(&Record {
            time: Local::now(),
            name,
            level,
            message: &message,
            module,
            file: visitor.caller_file.as_deref().or(metadata.file()),
            line: visitor.caller_line.or(metadata.line()),
        });
    }
}

/// Collects the message and bookkeeping fields of an event
#[derive(Default)]
struct RecordVisitor {
    message: String,
    logger: Option<String>,
    critical: bool,
    caller_file: Option<String>,
    caller_line: Option<u32>,
    extra: Vec<(&'static str, String)>,
}

impl RecordVisitor {
    /// Message followed by any other event fields as ` key=value`
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.extra {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            MESSAGE_FIELD => self.message = value.to_string(),
            NAME_FIELD => self.logger = Some(value.to_string()),
            CALLER_FILE_FIELD => self.caller_file = Some(value.to_string()),
            name => self.extra.push((name, value.to_string())),
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            CRITICAL_FIELD => self.critical = value,
            name => self.extra.push((name, value.to_string())),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            CALLER_LINE_FIELD => self.caller_line = u32::try_from(value).ok(),
            name => self.extra.push((name, value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            MESSAGE_FIELD => self.message = format!("{:?}", value),
            name => self.extra.push((name, format!("{:?}", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogSettings;
    use std::fs;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    fn config(settings: LogSettings) -> LogConfig {
        settings.format("{name}|{levelname}|{message}").resolve().0
    }

    fn record<'a>(name: &'a str, level: LogLevel, message: &'a str) -> Record<'a> {
        Record {
            time: Local::now(),
            name,
            level,
            message,
            module: name,
            file: None,
            line: None,
        }
    }

    #[test]
    fn test_emit_to_file_and_console() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let buffer = SharedBuffer::new();

        let writer = RotatingFileWriter::open(&path, 1024, 1).unwrap();
        let handlers = HandlerSet::new(
            &config(LogSettings::new()),
            Some(writer),
            Some(ConsoleTarget::Buffer(buffer.clone())),
        );

        handlers.emit(&record("shop", LogLevel::Info, "ready"));
        handlers.emit(&record("shop", LogLevel::Debug, "hidden"));

        assert_eq!(fs::read_to_string(&path).unwrap(), "shop|INFO|ready\n");
        assert_eq!(buffer.contents(), "shop|INFO|ready\n");
        assert_eq!(handlers.file_path(), Some(path.as_path()));
    }

    #[test]
    fn test_failed_rotation_without_console_uses_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        fs::create_dir_all(&log_dir).unwrap();
        let path = log_dir.join("app.log");
        let fallback = SharedBuffer::new();

        let writer = RotatingFileWriter::open(&path, 10, 2).unwrap();
        let handlers = HandlerSet::new(&config(LogSettings::new()), Some(writer), None)
            .with_fallback(ConsoleTarget::Buffer(fallback.clone()));

        handlers.emit(&record("shop", LogLevel::Info, "first"));
        assert!(fallback.is_empty());

        fs::remove_dir_all(&log_dir).unwrap();
        handlers.emit(&record("shop", LogLevel::Info, "second"));
        handlers.emit(&record("shop", LogLevel::Info, "third"));

        let lines: Vec<String> = fallback.contents().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("easylog|WARNING|File logging to "));
        assert!(lines[0].contains("disabled: Log rotation failed"));
        assert_eq!(lines[1], "shop|INFO|second");
        assert_eq!(lines[2], "shop|INFO|third");
        assert_eq!(handlers.file_path(), None);
    }

    #[test]
    fn test_diagnostic_ignores_threshold() {
        let buffer = SharedBuffer::new();
        let handlers = HandlerSet::new(
            &config(LogSettings::new().log_level("CRITICAL")),
            None,
            Some(ConsoleTarget::Buffer(buffer.clone())),
        );

        handlers.diagnostic("directory rejected");
        assert_eq!(buffer.contents(), "easylog|WARNING|directory rejected\n");
    }

    #[test]
    fn test_no_outputs_requested_stays_silent() {
        let fallback = SharedBuffer::new();
        let handlers = HandlerSet::new(&config(LogSettings::new().log_filename("")), None, None)
            .with_fallback(ConsoleTarget::Buffer(fallback.clone()));

        handlers.emit(&record("shop", LogLevel::Error, "unheard"));
        assert!(fallback.is_empty());
    }

    #[test]
    fn test_web_server_threshold() {
        let handlers = HandlerSet::new(
            &config(
                LogSettings::new()
                    .log_level("WARNING")
                    .web_server_runtime(true, "DEBUG"),
            ),
            None,
            None,
        );

        assert_eq!(handlers.threshold("uvicorn"), LogLevel::Debug);
        assert_eq!(handlers.threshold("uvicorn.access"), LogLevel::Debug);
        assert_eq!(handlers.threshold("uvicorn::proto"), LogLevel::Debug);
        assert_eq!(handlers.threshold("uvicornish"), LogLevel::Warning);
        assert_eq!(handlers.threshold("shop"), LogLevel::Warning);
    }

    #[test]
    fn test_web_server_routing_off() {
        let handlers = HandlerSet::new(
            &config(LogSettings::new().web_server_runtime(false, "DEBUG")),
            None,
            None,
        );
        assert_eq!(handlers.threshold("uvicorn"), LogLevel::Info);
    }

    #[test]
    fn test_layer_formats_tracing_events() {
        let buffer = SharedBuffer::new();
        let handlers = HandlerSet::new(
            &config(LogSettings::new()),
            None,
            Some(ConsoleTarget::Buffer(buffer.clone())),
        );
        let shared: SharedHandlers = Arc::new(RwLock::new(Some(Arc::new(handlers))));
        let subscriber = tracing_subscriber::registry().with(ManagedLayer::new(shared));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "checkout", order = 7, "paid");
            tracing::debug!(target: "checkout", "not shown");
            tracing::warn!(target: "easylog", logger = "orders", critical = true, "stock gone");
        });

        assert_eq!(
            buffer.contents(),
            "checkout|INFO|paid order=7\norders|CRITICAL|stock gone\n"
        );
    }

    #[test]
    fn test_layer_without_handlers_drops_events() {
        let shared: SharedHandlers = Arc::new(RwLock::new(None));
        let subscriber = tracing_subscriber::registry().with(ManagedLayer::new(shared.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("nobody listening");
        });

        assert!(current(&shared).is_none());
    }
}
