use crate::config::{LogConfig, LogLevel, LogSettings};
use crate::error::{EasylogError, Result};
use crate::logs::bridge::{ActiveOutputs, WebServerLogConfig};
use crate::logs::handler::{ConsoleTarget, HandlerSet, ManagedLayer, SharedHandlers};
use crate::logs::paths::{self, Locations};
use crate::logs::writer::RotatingFileWriter;
use crate::logs::Logger;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetupMode {
    Explicit,
    Forced,
    Lazy,
}

/// Result of one successful setup
#[derive(Clone)]
struct Installed {
    config: Arc<LogConfig>,
    handlers: Arc<HandlerSet>,
    generation: u64,
}

/// LogManager owns one logging configuration and the handlers built from it.
///
/// Setup happens at most once unless forced: the first call to [`setup`],
/// or to any accessor when nothing has been set up yet, installs the handler
/// set and later calls reuse it. Setup never fails; unusable directories,
/// files and values degrade to fewer outputs and are reported as WARNING
/// records.
///
/// [`setup`]: LogManager::setup
pub struct LogManager {
    defaults: LogSettings,
    locations: Locations,
    console: ConsoleTarget,
    fallback: ConsoleTarget,
    state: RwLock<Option<Installed>>,
    handlers: SharedHandlers,
    loggers: Mutex<HashMap<String, Logger>>,
    dispatch: Dispatch,
    generations: AtomicU64,
}

impl LogManager {
    /// Create a manager using the user's home and the system temp directory
    /// as the last fallbacks, writing console output to stdout
    pub fn new() -> Self {
        let handlers: SharedHandlers = Arc::new(RwLock::new(None));
        let dispatch = Dispatch::new(
            tracing_subscriber::registry().with(ManagedLayer::new(handlers.clone())),
        );

        Self {
            defaults: LogSettings::default(),
            locations: Locations::from_env(),
            console: ConsoleTarget::default(),
            fallback: ConsoleTarget::Stderr,
            state: RwLock::new(None),
            handlers,
            loggers: Mutex::new(HashMap::new()),
            dispatch,
            generations: AtomicU64::new(0),
        }
    }

    /// Settings applied beneath every setup, including the lazy one
    pub fn with_defaults(mut self, defaults: LogSettings) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the home/temp roots of the fallback chain
    pub fn with_locations(mut self, locations: Locations) -> Self {
        self.locations = locations;
        self
    }

    /// Replace the console destination
    pub fn with_console(mut self, console: ConsoleTarget) -> Self {
        self.console = console;
        self
    }

    /// Replace the stream used when neither the log file nor the console is
    /// available (stderr by default)
    pub fn with_fallback(mut self, fallback: ConsoleTarget) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set up logging from `built-in defaults → manager defaults → config → overrides`.
    ///
    /// A repeated call is ignored and returns the configuration already in
    /// use; see [`force_setup`](LogManager::force_setup) to replace it.
    ///
    /// # Arguments
    /// * `config` - Settings from the caller or a config file
    /// * `overrides` - Settings applied on top of `config`
    ///
    /// # Returns
    /// * The resolved configuration now in use. Setup never fails: unusable
    ///   values and directories are replaced and reported as WARNING records.
    pub fn setup(&self, config: Option<LogSettings>, overrides: Option<LogSettings>) -> Arc<LogConfig> {
        self.install(config, overrides, SetupMode::Explicit).config
    }

    /// Set up logging, replacing any handler set already installed
    ///
    /// Loggers handed out earlier follow the new handler set.
    ///
    /// # Arguments
    /// * `config` - Settings from the caller or a config file
    /// * `overrides` - Settings applied on top of `config`
    pub fn force_setup(
        &self,
        config: Option<LogSettings>,
        overrides: Option<LogSettings>,
    ) -> Arc<LogConfig> {
        self.install(config, overrides, SetupMode::Forced).config
    }

    /// Get the logger called `name`, setting up with defaults first if needed
    ///
    /// # Arguments
    /// * `name` - Logger name, rendered by `{name}`
    ///
    /// # Returns
    /// * A handle shared with every other caller asking for the same name
    pub fn get_logger(&self, name: &str) -> Logger {
        self.installed();

        let mut loggers = lock(&self.loggers);
        loggers
            .entry(name.to_string())
            .or_insert_with(|| Logger::new(name, self.handlers.clone(), self.dispatch.clone()))
            .clone()
    }

    /// Directory the log file is written to.
    ///
    /// # Returns
    /// * `Some(dir)` - Directory currently written to; differs from the
    ///   configured `log_dir` after a fallback
    /// * `None` - File output is disabled, or was turned off after a failed
    ///   write or rotation
    pub fn get_log_path(&self) -> Option<PathBuf> {
        self.log_file()
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }

    /// Active log file, if any
    pub fn log_file(&self) -> Option<PathBuf> {
        self.installed()
            .handlers
            .file_path()
            .map(Path::to_path_buf)
    }

    /// Configuration in use
    pub fn config(&self) -> Arc<LogConfig> {
        self.installed().config
    }

    pub fn is_initialized(&self) -> bool {
        read(&self.state).is_some()
    }

    /// Number of handler sets installed so far
    pub fn generation(&self) -> u64 {
        read(&self.state).as_ref().map_or(0, |installed| installed.generation)
    }

    /// Web-server logging config mirroring the active outputs
    ///
    /// # Arguments
    /// * `runtime_enabled` - Give the web-server loggers their own level
    /// * `runtime_level` - Level of the web-server loggers when `runtime_enabled`
    ///   is set; otherwise they use the application level
    pub fn get_external_log_config(
        &self,
        runtime_enabled: bool,
        runtime_level: LogLevel,
    ) -> WebServerLogConfig {
        let installed = self.installed();
        let outputs = ActiveOutputs {
            log_file: installed.handlers.file_path(),
            console: installed.handlers.has_console(),
            console_stream: self.console.stream_name(),
        };

        WebServerLogConfig::build(&installed.config, &outputs, runtime_enabled, runtime_level)
    }

    /// [`get_external_log_config`](LogManager::get_external_log_config) with
    /// the runtime flags of the active configuration
    pub fn web_server_log_config(&self) -> WebServerLogConfig {
        let config = self.config();
        self.get_external_log_config(
            config.configure_web_server_logging_runtime,
            config.web_server_log_level_runtime,
        )
    }

    /// `tracing` dispatcher backed by this manager's handlers
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Drop the handler set and all cached loggers.
    ///
    /// Loggers handed out earlier drop their records until the next setup.
    pub fn reset(&self) {
        let mut state = write(&self.state);
        *write(&self.handlers) = None;
        *state = None;
        lock(&self.loggers).clear();
    }

    fn installed(&self) -> Installed {
        let existing = read(&self.state).clone();
        match existing {
            Some(installed) => installed,
            None => self.install(None, None, SetupMode::Lazy),
        }
    }

    fn install(
        &self,
        config: Option<LogSettings>,
        overrides: Option<LogSettings>,
        mode: SetupMode,
    ) -> Installed {
        let mut state = write(&self.state);

        if let Some(existing) = state.clone() {
            match mode {
                SetupMode::Lazy => return existing,
                SetupMode::Explicit => {
                    drop(state);
                    existing
                        .handlers
                        .diagnostic("Logging already initialized, ignoring repeated setup");
                    return existing;
                }
                SetupMode::Forced => {}
            }
        }

        let settings = self
            .defaults
            .clone()
            .merge(config.unwrap_or_default())
            .merge(overrides.unwrap_or_default());
        let (config, mut warnings) = settings.resolve();

        let writer = if config.file_output() {
            self.open_writer(&config, &mut warnings)
        } else {
            None
        };
        let console = config.console_output.then(|| self.console.clone());
        let handlers =
            HandlerSet::new(&config, writer, console).with_fallback(self.fallback.clone());

        let installed = Installed {
            handlers: Arc::new(handlers),
            config: Arc::new(config),
            generation: self.generations.fetch_add(1, Ordering::SeqCst) + 1,
        };

        *write(&self.handlers) = Some(installed.handlers.clone());
        *state = Some(installed.clone());
        drop(state);

        for warning in &warnings {
            installed.handlers.diagnostic(warning);
        }

        installed
    }

    /// Walk the fallback chain and open the log file in the first usable directory
    fn open_writer(&self, config: &LogConfig, warnings: &mut Vec<String>) -> Option<RotatingFileWriter> {
        let candidates = paths::candidate_dirs(config, &self.locations);
        let resolution = paths::resolve_log_dir(&candidates);

        for (_, e) in &resolution.failures {
            warnings.push(e.to_string());
        }

        let Some(dir) = resolution.dir else {
            let tried = candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let e = EasylogError::NoWritableDirectory(tried);
            warnings.push(format!("{}; file logging disabled", e));
            return None;
        };

        match open_log_file(&dir, config, warnings) {
            Ok(writer) => Some(writer),
            Err(e) => {
                warnings.push(format!("{}; file logging disabled", e));
                None
            }
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Open `<dir>/<log_filename>`, or a timestamped `.tmp.log` sibling if that fails
fn open_log_file(
    dir: &Path,
    config: &LogConfig,
    warnings: &mut Vec<String>,
) -> Result<RotatingFileWriter> {
    let primary = dir.join(&config.log_filename);

    match RotatingFileWriter::open(&primary, config.max_bytes, config.backup_count) {
        Ok(writer) => Ok(writer),
        Err(e) => {
            let fallback = dir.join(temp_log_name(&config.log_filename));
            warnings.push(format!("{}; using {}", e, fallback.display()));
            RotatingFileWriter::open(&fallback, config.max_bytes, config.backup_count)
        }
    }
}

fn temp_log_name(log_filename: &str) -> String {
    let stem = Path::new(log_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    format!("{}.{}.tmp.log", stem, secs)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
