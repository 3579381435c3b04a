mod walk;
mod writer;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, XpackError};
use crate::util::check_interrupted;

use walk::{relative_archive_path, walk_source, WalkEntry};
use writer::ArchiveWriter;

/// How entry bytes are stored in the ZIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCompression {
    Stored,
    #[default]
    Deflate,
}

impl EntryCompression {
    /// Parse from a config/CLI string like "deflate" or "stored".
    pub fn from_config(value: &str) -> Result<Self> {
        match value {
            "deflate" => Ok(EntryCompression::Deflate),
            "stored" | "none" => Ok(EntryCompression::Stored),
            other => Err(XpackError::Config(format!(
                "unknown compression method: {other}"
            ))),
        }
    }
}

/// What to do when an entry fails mid-walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Stop at the first failure.
    #[default]
    #[serde(rename = "abort")]
    FailFast,
    /// Record the failure and carry on with the next entry.
    #[serde(rename = "continue")]
    BestEffort,
}

/// Treatment of symbolic links found below the source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Do not archive links; report each one as skipped.
    #[default]
    Skip,
    /// Archive the link target's content under the link's own path.
    Follow,
}

/// Parameters of a single archiving run.
pub struct ArchiveRequest<'a> {
    pub source_root: &'a Path,
    pub destination: &'a Path,
    pub compression: EntryCompression,
    pub error_policy: ErrorPolicy,
    pub symlinks: SymlinkPolicy,
    /// Pause after announcing each entry, before it is read.
    pub entry_delay: Duration,
    /// Checked between entries; a raised flag stops the run.
    pub shutdown: Option<&'a AtomicBool>,
}

impl<'a> ArchiveRequest<'a> {
    pub fn new(source_root: &'a Path, destination: &'a Path) -> Self {
        Self {
            source_root,
            destination,
            compression: EntryCompression::default(),
            error_policy: ErrorPolicy::default(),
            symlinks: SymlinkPolicy::default(),
            entry_delay: Duration::ZERO,
            shutdown: None,
        }
    }
}

/// A file being placed into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Forward-slash path relative to the source root.
    pub relative_path: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub enum ArchiveProgressEvent {
    EntryStarted { entry: ArchiveEntry },
    EntryCompleted { entry: ArchiveEntry },
    EntryFailed { entry: ArchiveEntry, error: String },
    EntrySkipped { path: String, reason: &'static str },
}

/// Result of an archiving run that got as far as creating the destination.
#[derive(Debug, Default)]
pub struct ArchiveOutcome {
    pub entries_written: u64,
    pub bytes_written: u64,
    /// Relative paths that were deliberately left out.
    pub skipped: Vec<String>,
    /// Failures in the order they happened. Under `FailFast` this holds at
    /// most the walk failure plus a finalize failure.
    pub errors: Vec<XpackError>,
}

impl ArchiveOutcome {
    pub fn first_error(&self) -> Option<&XpackError> {
        self.errors.first()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub(crate) fn emit_progress(
    progress: &mut Option<&mut dyn FnMut(ArchiveProgressEvent)>,
    event: ArchiveProgressEvent,
) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(event);
    }
}

/// Archive `req.source_root` into `req.destination`.
pub fn run(req: ArchiveRequest<'_>) -> Result<ArchiveOutcome> {
    run_with_progress(req, None)
}

/// Like [`run`], reporting each entry to `progress`.
///
/// Returns `Err` only when nothing was written: the source root is missing
/// (`SourceNotFound`/`SourceNotDirectory`, no destination is created) or the
/// destination cannot be created (`Create`). Failures during the walk are
/// collected in [`ArchiveOutcome::errors`] and the archive is finalized
/// regardless.
pub fn run_with_progress(
    req: ArchiveRequest<'_>,
    mut progress: Option<&mut dyn FnMut(ArchiveProgressEvent)>,
) -> Result<ArchiveOutcome> {
    validate_source(req.source_root)?;

    let mut writer = ArchiveWriter::create(req.destination, req.compression)?;
    info!(
        source = %req.source_root.display(),
        destination = %req.destination.display(),
        "archiving started"
    );

    let mut outcome = ArchiveOutcome::default();
    write_entries(&mut writer, &req, &mut outcome, &mut progress);

    if let Err(e) = writer.finish() {
        warn!(error = %e, "failed to finalize archive");
        outcome.errors.push(e);
    }

    info!(
        entries = outcome.entries_written,
        bytes = outcome.bytes_written,
        skipped = outcome.skipped.len(),
        errors = outcome.errors.len(),
        "archiving finished"
    );
    Ok(outcome)
}

fn validate_source(source_root: &Path) -> Result<()> {
    match std::fs::metadata(source_root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(XpackError::SourceNotDirectory(source_root.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(XpackError::SourceNotFound(source_root.to_path_buf()))
        }
        Err(source) => Err(XpackError::Read {
            path: source_root.to_path_buf(),
            source,
        }),
    }
}

/// Path of the archive itself if it lives inside the source tree.
fn archive_inside_source(req: &ArchiveRequest<'_>) -> Option<PathBuf> {
    let root = std::fs::canonicalize(req.source_root).ok()?;
    let dest = std::fs::canonicalize(req.destination).ok()?;
    dest.starts_with(&root).then_some(dest)
}

fn write_entries(
    writer: &mut ArchiveWriter,
    req: &ArchiveRequest<'_>,
    outcome: &mut ArchiveOutcome,
    progress: &mut Option<&mut dyn FnMut(ArchiveProgressEvent)>,
) {
    let self_path = archive_inside_source(req);

    for item in walk_source(req.source_root, req.symlinks) {
        if let Err(e) = check_interrupted(req.shutdown) {
            warn!("archiving interrupted");
            outcome.errors.push(e);
            return;
        }

        let (abs_path, relative_path, size, mode) = match item {
            Ok(WalkEntry::File {
                abs_path,
                relative_path,
                size,
                mode,
            }) => (abs_path, relative_path, size, mode),
            Ok(WalkEntry::Skipped {
                relative_path,
                reason,
            }) => {
                record_skip(outcome, progress, relative_path, reason);
                continue;
            }
            Err(e) => {
                let path = match &e {
                    XpackError::Read { path, .. } => path.clone(),
                    _ => req.source_root.to_path_buf(),
                };
                let relative_path = relative_archive_path(req.source_root, &path)
                    .unwrap_or_else(|| path.display().to_string());
                warn!(path = %path.display(), error = %e, "walk failed");
                emit_progress(
                    progress,
                    ArchiveProgressEvent::EntryFailed {
                        entry: ArchiveEntry {
                            relative_path,
                            size: 0,
                        },
                        error: e.to_string(),
                    },
                );
                outcome.errors.push(e);
                if req.error_policy == ErrorPolicy::FailFast {
                    return;
                }
                continue;
            }
        };

        if self_path
            .as_deref()
            .is_some_and(|own| std::fs::canonicalize(&abs_path).is_ok_and(|p| p == own))
        {
            record_skip(outcome, progress, relative_path, "output archive");
            continue;
        }

        let entry = ArchiveEntry {
            relative_path,
            size,
        };
        emit_progress(
            progress,
            ArchiveProgressEvent::EntryStarted {
                entry: entry.clone(),
            },
        );
        if !req.entry_delay.is_zero() {
            std::thread::sleep(req.entry_delay);
        }

        match writer.add_file(&entry.relative_path, &abs_path, size, mode) {
            Ok(copied) => {
                debug!(entry = %entry.relative_path, bytes = copied, "entry written");
                outcome.entries_written += 1;
                outcome.bytes_written += copied;
                emit_progress(progress, ArchiveProgressEvent::EntryCompleted { entry });
            }
            Err(e) => {
                warn!(entry = %entry.relative_path, error = %e, "entry failed");
                emit_progress(
                    progress,
                    ArchiveProgressEvent::EntryFailed {
                        entry,
                        error: e.to_string(),
                    },
                );
                outcome.errors.push(e);
                if req.error_policy == ErrorPolicy::FailFast {
                    return;
                }
            }
        }
    }
}

fn record_skip(
    outcome: &mut ArchiveOutcome,
    progress: &mut Option<&mut dyn FnMut(ArchiveProgressEvent)>,
    relative_path: String,
    reason: &'static str,
) {
    debug!(path = %relative_path, reason, "entry skipped");
    outcome.skipped.push(relative_path.clone());
    emit_progress(
        progress,
        ArchiveProgressEvent::EntrySkipped {
            path: relative_path,
            reason,
        },
    );
}
