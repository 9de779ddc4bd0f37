//! Filesystem operations
//!
//! Thin wrappers over `std::fs` that attach the offending path to every
//! failure. Modes are full POSIX permission bits including sticky.

use std::fs::{self, File, FileTimes};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::error::FilesystemError;

/// Ownership and mode of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Owning user id
    pub uid: u32,
    /// Owning group id
    pub gid: u32,
    /// Permission bits, including setuid/setgid/sticky
    pub mode: u32,
}

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Create a directory (and parents) and set its mode
pub fn create_dir_with_mode(path: &Path, mode: u32) -> Result<(), FilesystemError> {
    create_dir_all(path)?;
    set_mode(path, mode)
}

/// Set permission bits
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FilesystemError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        FilesystemError::Metadata {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Read ownership and permission bits without following symlinks
pub fn ownership(path: &Path) -> Result<Ownership, FilesystemError> {
    let meta = fs::symlink_metadata(path).map_err(|e| FilesystemError::Metadata {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Ownership {
        uid: meta.uid(),
        gid: meta.gid(),
        mode: meta.mode() & 0o7777,
    })
}

/// Apply ownership and permission bits
///
/// `chown` is skipped when the entry already has the requested owner, so an
/// unprivileged caller can restore its own directories.
pub fn restore_ownership(path: &Path, owner: Ownership) -> Result<(), FilesystemError> {
    let current = ownership(path)?;
    if current.uid != owner.uid || current.gid != owner.gid {
        std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid)).map_err(|e| {
            FilesystemError::Metadata {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }
    set_mode(path, owner.mode)
}

/// Write content to a file, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write content to a file and set its mode
pub fn write_file_with_mode(path: &Path, content: &str, mode: u32) -> Result<(), FilesystemError> {
    write_file(path, content)?;
    set_mode(path, mode)
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy a file, keeping its permission bits and access/modification times
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    let copy_error = |e: std::io::Error| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };
    fs::copy(from, to).map_err(copy_error)?;

    let meta = fs::metadata(from).map_err(copy_error)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed().map_err(copy_error)?)
        .set_modified(meta.modified().map_err(copy_error)?);
    File::open(to)
        .and_then(|file| file.set_times(times))
        .map_err(|e| FilesystemError::Metadata {
            path: to.to_path_buf(),
            source: e,
        })
}

/// Fail unless `path` is a directory itself rather than a link to one
pub fn require_real_dir(path: &Path) -> Result<(), FilesystemError> {
    let meta = fs::symlink_metadata(path).map_err(|e| FilesystemError::Metadata {
        path: path.to_path_buf(),
        source: e,
    })?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(FilesystemError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Remove a file; a missing file is not an error
pub fn remove_file_if_exists(path: &Path) -> Result<(), FilesystemError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FilesystemError::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    fs::remove_dir_all(path).map_err(|e| FilesystemError::Remove {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Create a symlink at `link` pointing to `target`, replacing any existing entry
pub fn replace_symlink(target: &Path, link: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = link.parent() {
        create_dir_all(parent)?;
    }
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.is_dir() => remove_dir_all(link)?,
        Ok(_) => remove_file_if_exists(link)?,
        Err(_) => {}
    }
    std::os::unix::fs::symlink(target, link).map_err(|e| FilesystemError::Metadata {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_create_dir_with_sticky_mode() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("var/tmp");

        create_dir_with_mode(&dir, 0o1777).unwrap();

        assert!(dir.is_dir());
        assert_eq!(ownership(&dir).unwrap().mode, 0o1777);
    }

    #[test]
    fn test_write_file_with_mode_creates_parents() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("etc/opkg/arch.conf");

        write_file_with_mode(&file, "arch all 1\n", 0o600).unwrap();

        assert_eq!(read_file(&file).unwrap(), "arch all 1\n");
        assert_eq!(ownership(&file).unwrap().mode, 0o600);
    }

    #[test]
    fn test_copy_file_keeps_times() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("hosts");
        let to = temp.path().join("root/etc/hosts");
        fs::write(&from, "127.0.0.1 localhost\n").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
        File::options()
            .write(true)
            .open(&from)
            .unwrap()
            .set_times(FileTimes::new().set_accessed(stamp).set_modified(stamp))
            .unwrap();

        copy_file(&from, &to).unwrap();

        let meta = fs::metadata(&to).unwrap();
        assert_eq!(meta.modified().unwrap(), stamp);
        assert_eq!(meta.accessed().unwrap(), stamp);
        assert_eq!(read_file(&to).unwrap(), "127.0.0.1 localhost\n");
    }

    #[test]
    fn test_require_real_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tmp");
        let link = temp.path().join("tmp-link");
        let file = temp.path().join("tmp-file");
        fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&dir, &link).unwrap();
        fs::write(&file, "").unwrap();

        require_real_dir(&dir).unwrap();
        assert!(matches!(
            require_real_dir(&link).unwrap_err(),
            FilesystemError::NotADirectory { .. }
        ));
        assert!(matches!(
            require_real_dir(&file).unwrap_err(),
            FilesystemError::NotADirectory { .. }
        ));
        assert!(matches!(
            require_real_dir(&temp.path().join("absent")).unwrap_err(),
            FilesystemError::Metadata { .. }
        ));
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_file_if_exists(&temp.path().join("resolv.conf")).unwrap();
    }

    #[test]
    fn test_remove_file_propagates_other_errors() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a-directory");
        fs::create_dir(&dir).unwrap();

        let err = remove_file_if_exists(&dir).unwrap_err();
        assert!(matches!(err, FilesystemError::Remove { .. }));
    }

    #[test]
    fn test_replace_symlink_overwrites() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("var/run");
        fs::create_dir_all(temp.path().join("var")).unwrap();
        fs::write(&link, "stale").unwrap();

        replace_symlink(Path::new("/run"), &link).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), Path::new("/run"));
    }

    #[test]
    fn test_restore_ownership_round_trip() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tmp");
        create_dir_with_mode(&dir, 0o1777).unwrap();
        let before = ownership(&dir).unwrap();

        set_mode(&dir, 0o700).unwrap();
        restore_ownership(&dir, before).unwrap();

        assert_eq!(ownership(&dir).unwrap(), before);
    }
}
