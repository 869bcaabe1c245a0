use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies a source file within one [`Loader`](crate::Loader) invocation.
///
/// The id doubles as the file key of the loader's codespan file database.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

impl FileId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A position in an IDL source file.
///
/// Lines and columns are 1-based; `span` is the byte range of the located token(s).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file_id: FileId,
    pub path: Arc<Path>,
    pub line: u32,
    pub column: u32,
    pub span: Range<usize>,
}

impl Location {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// Maps byte offsets of one source text to [`Location`]s.
#[derive(Clone, Debug)]
pub(crate) struct LineIndex {
    file_id: FileId,
    path: Arc<Path>,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(file_id: FileId, path: impl Into<PathBuf>, source: &str) -> Self {
        let path: PathBuf = path.into();
        Self {
            file_id,
            path: path.into(),
            line_starts: codespan_reporting::files::line_starts(source).collect(),
        }
    }

    pub(crate) fn path(&self) -> &Arc<Path> {
        &self.path
    }

    pub(crate) fn location(&self, span: Range<usize>) -> Location {
        let line = match self.line_starts.binary_search(&span.start) {
            Ok(line) => line,
            Err(next_line) => next_line - 1,
        };
        let column = span.start - self.line_starts[line];
        Location {
            file_id: self.file_id,
            path: Arc::clone(&self.path),
            line: line as u32 + 1,
            column: column as u32 + 1,
            span,
        }
    }
}
