//! Completion metric writer

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::MetricsConfig;
use crate::error::{Error, Result};

static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("valid metric name regex"));

/// Writes per-job completion metrics into a textfile collector directory
#[derive(Debug, Clone)]
pub struct MetricEmitter {
    out_dir: PathBuf,
}

impl MetricEmitter {
    /// Create an emitter writing into `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Create an emitter from the metrics section of the configuration
    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        config
            .prom_path
            .clone()
            .map(Self::new)
            .ok_or_else(|| Error::config("PROM_PATH is not set"))
    }

    /// Output directory
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Record that `job_name` completed now.
    ///
    /// The line is written to a working file named after the parent process
    /// and renamed over `<job_name>.prom` only once fully written. Returns the
    /// path of the canonical file.
    pub fn record_completion(&self, job_name: &str) -> Result<PathBuf> {
        self.record_completion_at(job_name, Utc::now().timestamp())
    }

    fn record_completion_at(&self, job_name: &str, timestamp: i64) -> Result<PathBuf> {
        if !METRIC_NAME.is_match(job_name) {
            return Err(Error::validation(format!(
                "'{job_name}' is not a valid Prometheus metric name"
            )));
        }

        let canonical = self.out_dir.join(format!("{job_name}.prom"));
        let working_path = self
            .out_dir
            .join(format!("{job_name}.prom.{}", parent_pid()));

        let mut working = WorkingFile::create(working_path)?;
        writeln!(working.file()?, "{job_name}_completed {timestamp}")?;
        working.finish_write()?;

        self.remove_stale(job_name)?;
        working.commit(&canonical)?;
        set_world_readable(&canonical)?;

        info!(job = %job_name, path = %canonical.display(), "Recorded completion metric");
        Ok(canonical)
    }

    /// Delete leftover `<job_name>.*.prom` files from older layouts.
    fn remove_stale(&self, job_name: &str) -> Result<()> {
        let prefix = format!("{job_name}.");
        let canonical = format!("{job_name}.prom");

        for entry in fs::read_dir(&self.out_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if name != canonical && name.starts_with(&prefix) && name.ends_with(".prom") {
                debug!(file = %name, "Removing stale metric file");
                fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }
}

/// Working file that is removed on drop unless committed
struct WorkingFile {
    path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl WorkingFile {
    fn create(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            file: Some(file),
            committed: false,
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::validation("metric working file already closed"))
    }

    /// Flush to disk and close the handle
    fn finish_write(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Atomically move the working file onto `target`
    fn commit(mut self, target: &Path) -> Result<()> {
        self.finish_write()?;
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for WorkingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove metric working file");
        }
    }
}

#[cfg(unix)]
fn parent_pid() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn parent_pid() -> u32 {
    std::process::id()
}

#[cfg(unix)]
fn set_world_readable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) -> Result<()> {
    Ok(())
}
