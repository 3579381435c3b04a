use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, XpackError};

use super::SymlinkPolicy;

/// One filesystem entry yielded by the source walk.
#[derive(Debug)]
pub(super) enum WalkEntry {
    File {
        abs_path: PathBuf,
        relative_path: String,
        size: u64,
        mode: Option<u32>,
    },
    Skipped {
        relative_path: String,
        reason: &'static str,
    },
}

/// Convert `path` into a forward-slash archive name relative to `root`.
///
/// Returns `None` when `path` is not under `root` or the remainder contains
/// anything other than plain name components.
pub(super) fn relative_archive_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_string_lossy()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Walk `root` depth-first with entries sorted by file name at every level.
///
/// Directories are traversed but not yielded. Walk failures are yielded as
/// `XpackError::Read` so the caller decides whether to stop.
pub(super) fn walk_source(
    root: &Path,
    symlinks: SymlinkPolicy,
) -> impl Iterator<Item = Result<WalkEntry>> + '_ {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(symlinks == SymlinkPolicy::Follow)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| classify(root, entry).transpose())
}

fn classify(
    root: &Path,
    entry: std::result::Result<walkdir::DirEntry, walkdir::Error>,
) -> Result<Option<WalkEntry>> {
    let entry = entry.map_err(|e| {
        let path = e
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        XpackError::Read {
            path,
            source: e.into(),
        }
    })?;

    let file_type = entry.file_type();
    if file_type.is_dir() {
        return Ok(None);
    }

    let relative_path = relative_archive_path(root, entry.path()).ok_or_else(|| {
        XpackError::Read {
            path: entry.path().to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path escapes the source root",
            ),
        }
    })?;

    if file_type.is_symlink() {
        return Ok(Some(WalkEntry::Skipped {
            relative_path,
            reason: "symbolic link",
        }));
    }
    if !file_type.is_file() {
        return Ok(Some(WalkEntry::Skipped {
            relative_path,
            reason: "special file",
        }));
    }

    let metadata = entry.metadata().map_err(|e| XpackError::Read {
        path: entry.path().to_path_buf(),
        source: e.into(),
    })?;

    Ok(Some(WalkEntry::File {
        abs_path: entry.into_path(),
        relative_path,
        size: metadata.len(),
        mode: permission_bits(&metadata),
    }))
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}
