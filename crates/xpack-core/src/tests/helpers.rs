use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::archive::ArchiveProgressEvent;

/// Create `files` (relative path, contents) under `root`, making parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

/// Entry names in archive order.
pub fn zip_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Every entry's name and contents.
pub fn zip_contents(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        out.insert(file.name().to_string(), data);
    }
    out
}

/// Collects progress events for later inspection.
#[derive(Default)]
pub struct EventLog {
    pub events: Vec<ArchiveProgressEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: ArchiveProgressEvent) {
        self.events.push(event);
    }

    pub fn started(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ArchiveProgressEvent::EntryStarted { entry } => Some(entry.relative_path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ArchiveProgressEvent::EntryCompleted { entry } => {
                    Some(entry.relative_path.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ArchiveProgressEvent::EntryFailed { entry, .. } => {
                    Some(entry.relative_path.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<(String, &'static str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ArchiveProgressEvent::EntrySkipped { path, reason } => {
                    Some((path.clone(), *reason))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}
