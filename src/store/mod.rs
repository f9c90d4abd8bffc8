use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::core::Report;
use crate::engine::BatchState;

pub fn reports_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/siteaudit/reports")
}

pub fn default_state_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/siteaudit/state.json")
}

/// On-disk report storage. One JSON file per finished audit, named by
/// generation time plus pid so concurrent runs never collide.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, report: &Report) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create reports directory: {}", self.dir.display())
        })?;

        let ts = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year][month][day]T[hour][minute][second]Z"
            ))
            .context("failed to format report timestamp")?;
        let pid = std::process::id();
        let path = self.dir.join(format!("audit-{ts}-{pid}.json"));

        let buf = serde_json::to_vec_pretty(report).context("failed to serialize report")?;
        std::fs::write(&path, buf)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        Ok(path)
    }

    /// Re-reads a saved report; the id index is rebuilt on
    /// deserialization, so merge semantics keep working.
    pub fn load(path: &Path) -> Result<Report> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read report: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse report: {}", path.display()))
    }

    /// Saved report paths, newest first. A missing directory means no
    /// reports yet, not an error.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to list reports directory: {}", self.dir.display())
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "json")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with("audit-"))
            })
            .collect();
        paths.sort();
        paths.reverse();
        Ok(paths)
    }
}

pub fn write_state(path: &Path, state: &BatchState) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create state directory: {}", parent.display())
        })?;
    }
    let buf = serde_json::to_vec_pretty(state).context("failed to serialize audit state")?;
    std::fs::write(path, buf)
        .with_context(|| format!("failed to write audit state: {}", path.display()))
}

/// Parses a persisted state file. Structural validation happens when
/// the runner resumes it.
pub fn read_state(path: &Path) -> Result<BatchState> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read audit state: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse audit state: {}", path.display()))
}
