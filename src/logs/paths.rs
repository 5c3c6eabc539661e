use crate::config::LogConfig;
use crate::error::{EasylogError, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-user and system roots used by the last two fallback candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    /// User home directory, if one is known
    pub home_dir: Option<PathBuf>,
    /// System temporary directory
    pub temp_dir: PathBuf,
}

impl Locations {
    /// Locations of the current user and system
    pub fn from_env() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl Default for Locations {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Outcome of walking the fallback chain
#[derive(Debug)]
pub struct DirResolution {
    /// First writable candidate, or `None` when every candidate failed
    pub dir: Option<PathBuf>,
    /// Candidates that were tried and rejected, in order
    pub failures: Vec<(PathBuf, EasylogError)>,
}

/// Ordered candidate directories for a configuration.
///
/// Consecutive duplicates are dropped, so a default `log_dir` is only tried once.
pub fn candidate_dirs(config: &LogConfig, locations: &Locations) -> Vec<PathBuf> {
    let project_name = config.project_name();

    let mut candidates = vec![config.log_dir.clone(), config.project_root.join("logs")];
    if let Some(home) = &locations.home_dir {
        candidates.push(home.join(".logs").join(&project_name));
    }
    candidates.push(locations.temp_dir.join(&project_name).join("logs"));

    candidates.dedup();
    candidates
}

/// Return the first candidate that is writable
pub fn resolve_log_dir(candidates: &[PathBuf]) -> DirResolution {
    let mut failures = Vec::new();

    for dir in candidates {
        match probe_writable(dir) {
            Ok(()) => {
                return DirResolution {
                    dir: Some(dir.clone()),
                    failures,
                }
            }
            Err(e) => failures.push((dir.clone(), e)),
        }
    }

    DirResolution {
        dir: None,
        failures,
    }
}

/// Create `dir` if needed and check that a file can be created and removed in it
pub fn probe_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| not_writable(dir, e))?;

    if !dir.is_dir() {
        return Err(EasylogError::DirectoryNotWritable(
            dir.display().to_string(),
            "not a directory".to_string(),
        ));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let probe = dir.join(format!(".easylog-probe-{}-{}", std::process::id(), nanos));

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .map_err(|e| not_writable(dir, e))?;

    fs::remove_file(&probe).map_err(|e| not_writable(dir, e))?;

    Ok(())
}

fn not_writable(dir: &Path, e: std::io::Error) -> EasylogError {
    EasylogError::DirectoryNotWritable(dir.display().to_string(), e.to_string())
}
