//! In-memory filesystem adapter for testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use stackgen_core::{
    application::{ApplicationError, ports::Filesystem},
    error::StackgenResult,
};

/// In-memory filesystem for testing.
///
/// Clones share the same storage, so a test can hand one clone to the
/// assembler and inspect the output through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// A file's content as text, if present and UTF-8 (testing helper).
    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.bytes(path).and_then(|b| String::from_utf8(b).ok())
    }

    /// A file's raw bytes, if present.
    pub fn bytes(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path.as_ref()).cloned()
    }

    /// All files, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `path` was created as a directory.
    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .read()
            .map(|inner| inner.directories.contains(path.as_ref()))
            .unwrap_or(false)
    }

    /// Clear all contents.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.clear();
            inner.directories.clear();
        }
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> StackgenResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            inner.directories.insert(current.clone());
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> StackgenResult<()> {
        self.write_bytes(path, content.as_bytes())
    }

    fn write_bytes(&self, path: &Path, content: &[u8]) -> StackgenResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        // Ensure parent exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "Parent directory does not exist".into(),
                }
                .into());
            }
        }

        inner.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> StackgenResult<String> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let bytes = inner.files.get(path).ok_or_else(|| ApplicationError::FilesystemError {
            path: path.to_path_buf(),
            reason: "No such file".into(),
        })?;
        String::from_utf8(bytes.clone()).map_err(|_| {
            ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "File is not valid UTF-8".into(),
            }
            .into()
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn remove_file(&self, path: &Path) -> StackgenResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        match inner.files.remove(path) {
            Some(_) => Ok(()),
            None => Err(ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "No such file".into(),
            }
            .into()),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> StackgenResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;

        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));

        Ok(())
    }

    fn list_files(&self, root: &Path) -> StackgenResult<Vec<PathBuf>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner
            .files
            .keys()
            .filter(|p| p.starts_with(root))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent_directory() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/a/b.txt"), "x").is_err());
        fs.create_dir_all(Path::new("/a")).unwrap();
        fs.write_file(Path::new("/a/b.txt"), "x").unwrap();
        assert_eq!(fs.content("/a/b.txt").as_deref(), Some("x"));
    }

    #[test]
    fn remove_dir_all_drops_the_subtree_only() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/out/demo/apps")).unwrap();
        fs.create_dir_all(Path::new("/out/other")).unwrap();
        fs.write_file(Path::new("/out/demo/apps/x"), "").unwrap();
        fs.write_file(Path::new("/out/other/y"), "").unwrap();

        fs.remove_dir_all(Path::new("/out/demo")).unwrap();
        assert!(!fs.exists(Path::new("/out/demo")));
        assert!(!fs.exists(Path::new("/out/demo/apps/x")));
        assert!(fs.exists(Path::new("/out/other/y")));
    }

    #[test]
    fn list_files_is_scoped_to_root() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/r/src")).unwrap();
        fs.create_dir_all(Path::new("/rx")).unwrap();
        fs.write_file(Path::new("/r/src/b"), "").unwrap();
        fs.write_file(Path::new("/r/a"), "").unwrap();
        fs.write_file(Path::new("/rx/c"), "").unwrap();

        let files = fs.list_files(Path::new("/r")).unwrap();
        assert_eq!(files, vec![PathBuf::from("/r/a"), PathBuf::from("/r/src/b")]);
    }

    #[test]
    fn binary_content_is_kept_but_not_read_as_text() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/t")).unwrap();
        fs.write_bytes(Path::new("/t/icon.ico"), &[0, 0, 1, 0, 0xff, 0xfe]).unwrap();

        assert_eq!(fs.bytes("/t/icon.ico"), Some(vec![0, 0, 1, 0, 0xff, 0xfe]));
        assert_eq!(fs.content("/t/icon.ico"), None);
        assert!(fs.read_file(Path::new("/t/icon.ico")).is_err());
    }

    #[test]
    fn clones_share_storage() {
        let fs = MemoryFilesystem::new();
        let view = fs.clone();
        fs.create_dir_all(Path::new("/x")).unwrap();
        fs.write_file(Path::new("/x/f"), "hi").unwrap();
        assert_eq!(view.files(), vec![PathBuf::from("/x/f")]);
    }
}
