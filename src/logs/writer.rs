use crate::error::{EasylogError, Result};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// RotatingFileWriter appends records to a single log file and rotates it
/// by size.
///
/// Archives are named `<file>.1` (newest) through `<file>.<backup_count>`
/// (oldest). A record that would push a non-empty file past `max_bytes`
/// triggers a rotation first, so the active file only exceeds the limit when a
/// single record is larger than it.
pub struct RotatingFileWriter {
    /// Path to the active log file
    path: PathBuf,
    /// Open handle for the active file
    file: File,
    /// Maximum size in bytes before rotation
    max_bytes: u64,
    /// Number of archives kept after rotation
    backup_count: usize,
    /// Current size of the active file
    size: u64,
}

impl RotatingFileWriter {
    /// Open (or create) the log file at `path` in append mode
    ///
    /// # Arguments
    /// * `path` - Active log file
    /// * `max_bytes` - Size in bytes at which the file is rotated
    /// * `backup_count` - Number of archives to keep; 0 truncates instead of archiving
    pub fn open(path: &Path, max_bytes: u64, backup_count: usize) -> Result<Self> {
        let file = Self::open_append(path)?;

        // Pick up where a previous run left off
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            max_bytes,
            backup_count,
            size,
        })
    }

    /// Write one formatted record, rotating first if needed
    pub fn write_record(&mut self, data: &[u8]) -> Result<()> {
        if self.should_rotate(data.len() as u64) {
            self.rotate()?;
        }

        self.file
            .write_all(data)
            .map_err(|e| EasylogError::LogWriteError(format!("Failed to write to log: {}", e)))?;

        self.file
            .flush()
            .map_err(|e| EasylogError::LogWriteError(format!("Failed to flush log: {}", e)))?;

        self.size += data.len() as u64;

        Ok(())
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        self.size > 0 && self.size + incoming > self.max_bytes
    }

    /// Shift archives up by one and start a fresh active file
    pub fn rotate(&mut self) -> Result<()> {
        if self.backup_count == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|e| {
                    EasylogError::LogRotationError(format!("Failed to truncate log: {}", e))
                })?;
            self.size = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|e| {
                EasylogError::LogRotationError(format!("Failed to drop oldest archive: {}", e))
            })?;
        }

        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1)).map_err(|e| {
                    EasylogError::LogRotationError(format!("Failed to shift archive: {}", e))
                })?;
            }
        }

        fs::rename(&self.path, self.backup_path(1))
            .map_err(|e| EasylogError::LogRotationError(format!("Failed to rotate log: {}", e)))?;

        self.file = Self::open_append(&self.path)?;
        self.size = 0;

        Ok(())
    }

    fn open_append(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EasylogError::LogFileError(format!("{}: {}", path.display(), e)))
    }

    /// Path of the archive with the given index (1 is the newest)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// Archives currently present on disk, newest first
    pub fn backups(&self) -> Vec<PathBuf> {
        (1..=self.backup_count)
            .map(|index| self.backup_path(index))
            .filter(|path| path.exists())
            .collect()
    }

    /// Get the path to the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current size of the active log file
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backup_count(&self) -> usize {
        self.backup_count
    }
}
