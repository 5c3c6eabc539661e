// Output formatting for CLI status messages

use crate::config::LogLevel;
use colored::*;
use std::path::Path;

/// Print the directory in use, or a warning when file output is off
pub fn print_log_path(path: Option<&Path>) {
    match path {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("{}", "⚠ File logging is disabled".yellow()),
    }
}

/// Report where a record went
pub fn print_written(name: &str, level: LogLevel, enabled: bool, log_file: Option<&Path>) {
    if !enabled {
        eprintln!(
            "{}",
            format!("⚠ {} record from {} is below the configured level", level, name).yellow()
        );
        return;
    }

    eprintln!("{}", "✓ Record written".green().bold());
    eprintln!("  {}: {}", "Logger".bold(), name.cyan());
    eprintln!("  {}: {}", "Level".bold(), level_colored(level));
    match log_file {
        Some(path) => eprintln!("  {}: {}", "File".bold(), path.display()),
        None => eprintln!("  {}: {}", "File".bold(), "none".dimmed()),
    }
}

fn level_colored(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Debug => level.as_str().dimmed(),
        LogLevel::Info => level.as_str().green(),
        LogLevel::Warning => level.as_str().yellow(),
        LogLevel::Error => level.as_str().red(),
        LogLevel::Critical => level.as_str().red().bold(),
    }
}
