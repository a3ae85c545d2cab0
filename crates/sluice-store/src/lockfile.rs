use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Exclusive `<target>.lock` marker, removed on drop.
pub struct LockFile {
    path: PathBuf,
    _handle: std::fs::File,
}

impl LockFile {
    pub fn acquire(target: &Path) -> Result<Self, StoreError> {
        let mut name = target
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".lock");
        let lock_path = target.with_file_name(name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(handle) => Ok(Self {
                path: lock_path,
                _handle: handle,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockContention(target.to_path_buf()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_contends_until_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("v1.2");

        let lock = LockFile::acquire(&target).unwrap();
        assert!(lock.path().ends_with("v1.2.lock"));
        assert!(matches!(
            LockFile::acquire(&target),
            Err(StoreError::LockContention(_))
        ));

        drop(lock);
        assert!(LockFile::acquire(&target).is_ok());
    }
}
