// CLI module - inspect and exercise a logging configuration

mod output;

use crate::config::{LogLevel, LogSettings};
use crate::error::{EasylogError, Result};
use crate::logs::{ConsoleTarget, LogManager};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// easylog - rotating file and console logging with a fallback log directory
#[derive(Parser)]
#[command(name = "easylog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Logging config file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Minimum level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(short, long, global = true)]
    level: Option<String>,

    /// Preferred log directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Disable console output
    #[arg(long, global = true)]
    no_console: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the log directory in use
    Path,

    /// Print the resolved configuration as TOML
    Config,

    /// Print the web-server logging configuration as JSON
    Bridge {
        /// Apply the runtime level to the web-server loggers
        #[arg(long)]
        runtime: bool,

        /// Level for the web-server loggers
        #[arg(long, default_value = "INFO")]
        runtime_level: String,
    },

    /// Write one record through the configured handlers
    Write {
        /// Logger name
        #[arg(short, long, default_value = "easylog")]
        name: String,

        /// Record level
        #[arg(short = 'L', long = "record-level", default_value = "INFO")]
        record_level: String,

        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
}

impl Cli {
    /// Parse arguments and execute the command
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute(&Self::manager())
    }

    /// Manager used by the binary; stdout carries the command output, so
    /// console records go to stderr
    fn manager() -> LogManager {
        LogManager::new().with_console(ConsoleTarget::Stderr)
    }

    /// Settings from the config file, then the command-line flags on top
    fn settings(&self) -> Result<(Option<LogSettings>, LogSettings)> {
        let file = match &self.config {
            Some(path) => Some(LogSettings::from_file(path)?),
            None => None,
        };

        let mut overrides = LogSettings::new();
        if let Some(level) = &self.level {
            overrides = overrides.log_level(level.as_str());
        }
        if let Some(dir) = &self.log_dir {
            overrides = overrides.log_dir(dir.clone());
        }
        if self.no_console {
            overrides = overrides.console_output(false);
        }

        Ok((file, overrides))
    }

    /// Execute the command against `manager`
    pub fn execute(self, manager: &LogManager) -> Result<()> {
        let (config, overrides) = self.settings()?;
        manager.setup(config, Some(overrides));

        match self.command {
            Commands::Path => {
                output::print_log_path(manager.get_log_path().as_deref());
            }

            Commands::Config => {
                let config = manager.config();
                let rendered = toml::to_string_pretty(config.as_ref())
                    .map_err(|e| EasylogError::SerializationError(e.to_string()))?;
                print!("{}", rendered);
            }

            Commands::Bridge {
                runtime,
                runtime_level,
            } => {
                let level: LogLevel = runtime_level.parse()?;
                let bridge = manager.get_external_log_config(runtime, level);
                println!("{}", bridge.to_json()?);
            }

            Commands::Write {
                name,
                record_level,
                message,
            } => {
                let level: LogLevel = record_level.parse()?;
                let logger = manager.get_logger(&name);
                let enabled = logger.is_enabled_for(level);
                logger.log(level, message.join(" "));
                output::print_written(&name, level, enabled, manager.log_file().as_deref());
            }
        }

        Ok(())
    }
}
