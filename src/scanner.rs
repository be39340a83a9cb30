//! Recursive enumeration of the regular files under a set of roots.
//!
//! Every pass builds a fresh [`TreeScanner`] and walks the tree again, so a
//! pass always sees the filesystem as the previous pass left it.

use glob::Pattern;
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A regular file as seen at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path of the file.
    pub path: PathBuf,
    /// Directory containing the file.
    pub parent: PathBuf,
    /// File name including extension.
    pub name: String,
    /// File name without its final extension.
    pub stem: String,
    /// Final extension without the dot, if any.
    pub extension: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Owner/group/other permission bits (special bits masked off).
    pub mode: u32,
}

impl FileRecord {
    /// Reads a record for `path`, following symlinks.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        Self {
            path: path.to_path_buf(),
            parent: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            name,
            stem,
            extension,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            mode: permission_bits(metadata),
        }
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Walks an ordered list of roots and yields every regular file below them.
///
/// Roots are visited in the order given. Within a root, entries are sorted by
/// file name so repeated runs see files in the same order. A file reachable
/// through more than one root (a root nested inside another) is yielded once,
/// the first time it is reached. Unreadable directories and entries are logged
/// and skipped; they never end the scan.
#[derive(Debug, Clone)]
pub struct TreeScanner {
    roots: Vec<PathBuf>,
    exclude: Vec<Pattern>,
}

impl TreeScanner {
    pub fn new(roots: Vec<PathBuf>, exclude: Vec<Pattern>) -> Self {
        Self { roots, exclude }
    }

    /// Lazily enumerates file records across all roots.
    pub fn records(&self) -> impl Iterator<Item = FileRecord> + '_ {
        let mut seen = HashSet::new();
        self.roots
            .iter()
            .flat_map(move |root| {
                WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(move |entry| match entry {
                        Ok(entry) => self.record_for(entry.path(), entry.file_type().is_dir()),
                        Err(e) => {
                            warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                            None
                        }
                    })
            })
            .filter(move |record| {
                let first = seen.insert(entry_key(record));
                if !first {
                    debug!("Already scanned: {}", record.path.display());
                }
                first
            })
    }

    fn record_for(&self, path: &Path, is_dir: bool) -> Option<FileRecord> {
        if is_dir || self.is_excluded(path) {
            return None;
        }

        // Symlinks are resolved here; only ones pointing at regular files survive.
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => Some(FileRecord::from_metadata(path, &metadata)),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let excluded = self
            .exclude
            .iter()
            .any(|pattern| pattern.matches(&name) || pattern.matches_path(path));
        if excluded {
            debug!("Excluded by pattern: {}", path.display());
        }
        excluded
    }
}

/// Identifies a directory entry regardless of the root it was reached from.
///
/// Only the parent is canonicalized, so a symlink and its target stay distinct.
fn entry_key(record: &FileRecord) -> PathBuf {
    match fs::canonicalize(&record.parent) {
        Ok(parent) => parent.join(&record.name),
        Err(_) => record.path.clone(),
    }
}
