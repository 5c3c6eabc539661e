use crate::config::LogLevel;
use crate::logs::handler::{current, SharedHandlers, LOGGER_TARGET};
use std::backtrace::Backtrace;
use std::fmt::{self, Write};
use std::panic::Location;
use std::sync::Arc;
use tracing::Dispatch;

/// Extra data attached to a single record
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    fields: Vec<(String, String)>,
    backtrace: bool,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key=value` pair rendered after the message
    pub fn field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Capture the current stack and append it to the record
    pub fn with_backtrace(mut self) -> Self {
        self.backtrace = true;
        self
    }

    pub fn captures_backtrace(&self) -> bool {
        self.backtrace
    }

    fn append_to(&self, text: &mut String) {
        for (key, value) in &self.fields {
            let _ = write!(text, " {}={}", key, value);
        }
        if self.backtrace {
            let _ = write!(text, "\nBacktrace:\n{}", Backtrace::force_capture());
        }
    }
}

/// A named handle onto a manager's handlers.
///
/// Cloning is cheap and clones share everything. A logger obtained before a
/// `reset` stays valid but drops its records until the manager is set up again.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    handlers: SharedHandlers,
    dispatch: Dispatch,
}

impl Logger {
    pub(crate) fn new(name: &str, handlers: SharedHandlers, dispatch: Dispatch) -> Self {
        Self {
            name: Arc::from(name),
            handlers,
            dispatch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a record at `level` would currently be written anywhere
    ///
    /// # Returns
    /// * `false` when `level` is below this logger's threshold, or when the
    ///   manager has been reset and not set up again
    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        current(&self.handlers).is_some_and(|handlers| handlers.enabled(&self.name, level))
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Debug, message, None, Location::caller());
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Info, message, None, Location::caller());
    }

    #[track_caller]
    pub fn warning(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Warning, message, None, Location::caller());
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Error, message, None, Location::caller());
    }

    #[track_caller]
    pub fn critical(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Critical, message, None, Location::caller());
    }

    /// ERROR record with the current backtrace attached
    #[track_caller]
    pub fn exception(&self, message: impl fmt::Display) {
        let context = LogContext::new().with_backtrace();
        self.emit(LogLevel::Error, message, Some(&context), Location::caller());
    }

    /// Write `message` at `level`
    ///
    /// # Arguments
    /// * `level` - Record level; records below the threshold are dropped
    /// * `message` - Record text, rendered by `{message}`
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.emit(level, message, None, Location::caller());
    }

    /// Write `message` at `level` with extra fields and an optional backtrace
    ///
    /// # Arguments
    /// * `level` - Record level
    /// * `message` - Record text
    /// * `context` - Fields appended as ` key=value`, backtrace on the following lines
    #[track_caller]
    pub fn log_with(&self, level: LogLevel, message: impl fmt::Display, context: &LogContext) {
        self.emit(level, message, Some(context), Location::caller());
    }

    fn emit(
        &self,
        level: LogLevel,
        message: impl fmt::Display,
        context: Option<&LogContext>,
        location: &'static Location<'static>,
    ) {
        if !self.is_enabled_for(level) {
            return;
        }

        let mut text = message.to_string();
        if let Some(context) = context {
            context.append_to(&mut text);
        }

        let name: &str = &self.name;
        let critical = level == LogLevel::Critical;
        let file = location.file();
        let line = u64::from(location.line());

        macro_rules! event_at {
            ($level:expr) => {
                tracing::event!(
                    target: LOGGER_TARGET,
                    $level,
                    logger = name,
                    critical = critical,
                    caller_file = file,
                    caller_line = line,
                    "{}",
                    text
                )
            };
        }

        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Debug => event_at!(tracing::Level::DEBUG),
            LogLevel::Info => event_at!(tracing::Level::INFO),
            LogLevel::Warning => event_at!(tracing::Level::WARN),
            LogLevel::Error | LogLevel::Critical => event_at!(tracing::Level::ERROR),
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_rendering() {
        let mut text = String::from("payment failed");
        LogContext::new()
            .field("order", 17)
            .field("user", "ada")
            .append_to(&mut text);

        assert_eq!(text, "payment failed order=17 user=ada");
    }

    #[test]
    fn test_context_backtrace() {
        let context = LogContext::new().with_backtrace();
        assert!(context.captures_backtrace());

        let mut text = String::from("boom");
        context.append_to(&mut text);
        assert!(text.starts_with("boom\nBacktrace:\n"));
    }
}
