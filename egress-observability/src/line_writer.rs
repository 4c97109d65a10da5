//! Append-only line writer with daily and size-based rotation.
//!
//! Each call to [`RotatingLineWriter::write_line`] appends one line and
//! flushes it. When the UTC date changes, or the file grows past
//! `max_file_size_bytes`, the current file is renamed with a suffix
//! (`egress.log.2025-01-15`, or `egress.log.2025-01-15-103045` for size
//! rotation) and a fresh file is opened. Old rotated files beyond
//! `max_rotated_files` are pruned.

use chrono::{NaiveDate, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Active file, e.g. `/var/log/egress/egress.log`.
    pub file_path: PathBuf,
    /// 0 = size-based rotation disabled.
    pub max_file_size_bytes: u64,
    /// 0 = unlimited.
    pub max_rotated_files: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("egress.log"),
            max_file_size_bytes: 100 * 1024 * 1024,
            max_rotated_files: 30,
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct RotatingLineWriter {
    config: RotationConfig,
    inner: Mutex<WriterState>,
}

struct WriterState {
    /// `None` only while a rotation is in progress.
    writer: Option<BufWriter<File>>,
    current_date: NaiveDate,
    current_size: u64,
}

impl RotatingLineWriter {
    /// Open (or create) the active file, creating parent directories.
    pub fn new(config: RotationConfig) -> io::Result<Self> {
        if let Some(parent) = config.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&config.file_path)?;
        let current_size = file.metadata()?.len();

        info!(path = %config.file_path.display(), "Log file writer opened");

        Ok(Self {
            config,
            inner: Mutex::new(WriterState {
                writer: Some(BufWriter::new(file)),
                current_date: Utc::now().date_naive(),
                current_size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.file_path
    }

    /// Append one line (a trailing newline is added). Rotates first if needed.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self.lock()?;

        let today = Utc::now().date_naive();
        let date_rollover = today != state.current_date;
        let size_exceeded = self.config.max_file_size_bytes > 0
            && state.current_size >= self.config.max_file_size_bytes;

        if date_rollover || size_exceeded {
            let suffix = if date_rollover {
                state.current_date.format("%Y-%m-%d").to_string()
            } else {
                Utc::now().format("%Y-%m-%d-%H%M%S").to_string()
            };
            self.rotate(&mut state, &suffix)?;
            state.current_date = today;
        }

        let state = &mut *state;
        if state.writer.is_none() {
            state.writer = Some(BufWriter::new(open_append(&self.config.file_path)?));
        }
        let Some(writer) = state.writer.as_mut() else {
            return Err(io::Error::other("log writer unavailable"));
        };
        let bytes = line.as_bytes();
        writer.write_all(bytes)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        state.current_size += bytes.len() as u64 + 1;

        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.lock()?;
        match state.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, WriterState>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))
    }

    fn rotate(&self, state: &mut WriterState, suffix: &str) -> io::Result<()> {
        if let Some(mut old) = state.writer.take() {
            old.flush()?;
        }

        let base = &self.config.file_path;
        let rotated = unused_rotated_path(base, suffix);
        if base.exists() {
            match fs::rename(base, &rotated) {
                Ok(()) => info!(from = %base.display(), to = %rotated.display(), "Rotated log file"),
                Err(e) => error!(
                    error = %e,
                    from = %base.display(),
                    to = %rotated.display(),
                    "Failed to rotate log file"
                ),
            }
        }

        if self.config.max_rotated_files > 0 {
            if let Err(e) = prune_rotated_files(base, self.config.max_rotated_files) {
                warn!(error = %e, "Failed to prune old log files");
            }
        }

        state.writer = Some(BufWriter::new(open_append(base)?));
        state.current_size = 0;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `egress.log` → `egress.log.2025-01-15`.
pub fn rotated_file_path(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Like [`rotated_file_path`], adding `.1`, `.2`, … when several rotations
/// land on the same suffix.
fn unused_rotated_path(base: &Path, suffix: &str) -> PathBuf {
    let first = rotated_file_path(base, suffix);
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| rotated_file_path(base, &format!("{suffix}.{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Rotated siblings of `base`, oldest first.
///
/// Ordered by modification time, then by name. A daily file is renamed after
/// that day's size-rotated files, so its suffix alone does not place it.
pub fn rotated_files(base: &Path) -> io::Result<Vec<PathBuf>> {
    let parent = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let base_name = base.file_name().unwrap_or_default().to_string_lossy();
    let prefix = format!("{base_name}.");

    let mut files: Vec<(Option<SystemTime>, PathBuf)> = Vec::new();
    if !parent.exists() {
        return Ok(Vec::new());
    }
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.len() > prefix.len() && name.starts_with(&prefix) {
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            files.push((modified, entry.path()));
        }
    }
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Keep only the newest `keep` rotated files.
fn prune_rotated_files(base: &Path, keep: usize) -> io::Result<()> {
    let files = rotated_files(base)?;
    if files.len() > keep {
        for path in &files[..files.len() - keep] {
            debug!(path = %path.display(), "Pruning rotated log file");
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────
