//! Filesystem mutations performed by the passes.
//!
//! [`Action::apply`] is the only place in the crate that changes the tree.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A single change to the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Delete(PathBuf),
    Chmod { path: PathBuf, mode: u32 },
    Rename { from: PathBuf, to: PathBuf },
    Move { from: PathBuf, to: PathBuf },
    Copy { from: PathBuf, to: PathBuf },
}

impl Action {
    /// Performs the action.
    ///
    /// # Errors
    ///
    /// Any I/O failure is returned unchanged. A rename whose target already
    /// exists fails with `AlreadyExists` instead of replacing the target.
    pub fn apply(&self) -> io::Result<()> {
        match self {
            Action::Delete(path) => fs::remove_file(path),
            Action::Chmod { path, mode } => set_mode(path, *mode),
            Action::Rename { from, to } => {
                if to.exists() {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} already exists", to.display()),
                    ));
                }
                fs::rename(from, to)
            }
            Action::Move { from, to } => move_file(from, to),
            Action::Copy { from, to } => fs::copy(from, to).map(|_| ()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Delete(path) => write!(f, "delete {}", path.display()),
            Action::Chmod { path, mode } => {
                write!(f, "change attributes of {} to {:o}", path.display(), mode)
            }
            Action::Rename { from, to } => {
                write!(f, "rename {} to {}", from.display(), to.display())
            }
            Action::Move { from, to } => write!(f, "move {} to {}", from.display(), to.display()),
            Action::Copy { from, to } => write!(f, "copy {} to {}", from.display(), to.display()),
        }
    }
}

/// Renames `from` to `to`, falling back to copy-and-remove when the two paths
/// are on different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    // Only the owner-write bit maps onto a read-only flag here.
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.txt");
        fs::write(&path, "x").unwrap();

        Action::Delete(path.clone()).apply().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = Action::Delete(temp_dir.path().join("never.txt")).apply();
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_rename_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("a:b.txt");
        let to = temp_dir.path().join("a_b.txt");
        fs::write(&from, "from").unwrap();
        fs::write(&to, "to").unwrap();

        let err = Action::Rename {
            from: from.clone(),
            to: to.clone(),
        }
        .apply()
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&to).unwrap(), "to");
        assert!(from.exists());
    }

    #[test]
    fn test_move_and_copy() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let moved = temp_dir.path().join("moved.txt");
        let copied = temp_dir.path().join("copied.txt");
        fs::write(&src, "payload").unwrap();

        Action::Copy {
            from: src.clone(),
            to: copied.clone(),
        }
        .apply()
        .unwrap();
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&copied).unwrap(), "payload");

        Action::Move {
            from: src.clone(),
            to: moved.clone(),
        }
        .apply()
        .unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&moved).unwrap(), "payload");
    }

    #[cfg(unix)]
    #[test]
    fn test_chmod() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, "x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o777)).unwrap();

        Action::Chmod {
            path: path.clone(),
            mode: 0o644,
        }
        .apply()
        .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);
    }

    #[test]
    fn test_display() {
        let action = Action::Chmod {
            path: PathBuf::from("/x/y"),
            mode: 0o644,
        };
        assert_eq!(action.to_string(), "change attributes of /x/y to 644");
    }
}
