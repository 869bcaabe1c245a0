use std::collections::HashMap;
use std::path::{Component as PathComponent, Path, PathBuf};

use crate::error::SourceError;

/// How the loader finds and reads IDL files.
///
/// Implementations decide what a file's identity is: two paths that canonicalize to the same
/// value are the same file and are parsed only once.
pub trait SourceResolver: Send + Sync {
    /// Returns the canonical identity of `path`, or an error if there is no such file.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, SourceError>;

    /// Reads the contents of a canonical path returned by [`Self::canonicalize`].
    fn read(&self, path: &Path) -> Result<String, SourceError>;
}

/// Reads files from the local file system.
#[derive(Copy, Clone, Debug, Default)]
pub struct FileSystemResolver;

impl SourceResolver for FileSystemResolver {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, SourceError> {
        if !path.is_file() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }
        Ok(std::fs::canonicalize(path)?)
    }

    fn read(&self, path: &Path) -> Result<String, SourceError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Serves files from memory; paths are normalized lexically.
#[derive(Clone, Debug, Default)]
pub struct InMemoryResolver {
    files: HashMap<PathBuf, String>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.add_file(path, source);
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files
            .insert(normalize(path.as_ref()), source.into());
    }
}

impl SourceResolver for InMemoryResolver {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, SourceError> {
        let path = normalize(path);
        if self.files.contains_key(&path) {
            Ok(path)
        } else {
            Err(SourceError::NotFound(path.display().to_string()))
        }
    }

    fn read(&self, path: &Path) -> Result<String, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.display().to_string()))
    }
}

/// Removes `.` and resolves `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Finds the file an `include` refers to.
///
/// Absolute paths are used as they are. Relative paths are tried against the including file's
/// directory first and then against each search path, in order.
pub(crate) fn resolve_include(
    resolver: &dyn SourceResolver,
    including_file: &Path,
    include: &str,
    search_paths: &[PathBuf],
) -> Option<PathBuf> {
    let include = Path::new(include);
    if include.is_absolute() {
        return resolver.canonicalize(include).ok();
    }
    let base = including_file.parent().map(Path::to_path_buf).unwrap_or_default();
    std::iter::once(base)
        .chain(search_paths.iter().cloned())
        .find_map(|dir| resolver.canonicalize(&dir.join(include)).ok())
}
