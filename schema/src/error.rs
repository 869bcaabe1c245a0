use std::fmt;
use std::io;

use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{self, termcolor::WriteColor};
use thiserror::Error;

use crate::location::{FileId, Location};

/// The kinds of problems the parser and loader report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    SyntaxError,
    UnresolvedInclude,
    UnknownType,
    CyclicInclude,
    CyclicTypedef,
    DuplicateSymbol,
    DuplicateFieldId,
    InvalidFieldId,
    DuplicateEnumValue,
    InvalidEnumValue,
    InvalidUnionField,
    InvalidDefaultValue,
    InvalidServiceExtends,
    InvalidThrows,
    InvalidOneway,
    DuplicateMethod,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::UnresolvedInclude => "UnresolvedIncludeError",
            Self::UnknownType => "UnknownTypeError",
            Self::CyclicInclude => "CyclicIncludeError",
            Self::CyclicTypedef => "CyclicTypedefError",
            Self::DuplicateSymbol => "DuplicateSymbolError",
            Self::DuplicateFieldId => "DuplicateFieldIdError",
            Self::InvalidFieldId => "InvalidFieldIdError",
            Self::DuplicateEnumValue => "DuplicateEnumValueError",
            Self::InvalidEnumValue => "InvalidEnumValueError",
            Self::InvalidUnionField => "InvalidUnionFieldError",
            Self::InvalidDefaultValue => "InvalidDefaultValueError",
            Self::InvalidServiceExtends => "InvalidServiceExtendsError",
            Self::InvalidThrows => "InvalidThrowsError",
            Self::InvalidOneway => "InvalidOnewayError",
            Self::DuplicateMethod => "DuplicateMethodError",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single problem found while parsing or linking.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}{kind}: {message}", location_prefix(.location))]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<Location>,
}

fn location_prefix(location: &Option<Location>) -> String {
    match location {
        Some(location) => format!("{location}: "),
        None => String::new(),
    }
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, location: &Location) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Some(location.clone()),
        }
    }

    pub fn without_location(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Converts this diagnostic into a codespan report against the loader's file database.
    pub fn to_report(&self) -> Report<usize> {
        let report = Report::error()
            .with_code(self.kind.name())
            .with_message(&self.message);
        match &self.location {
            Some(location) => report.with_labels(vec![Label::primary(
                location.file_id.index(),
                location.span.clone(),
            )]),
            None => report,
        }
    }
}

/// Accumulates diagnostics across independent sub-resolutions.
///
/// Callers keep going after a failure and decide at the end whether the pass succeeded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(kind = %diagnostic.kind, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, location: &Location) {
        self.push(Diagnostic::new(kind, message, location));
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `Ok(value)` if nothing was reported, otherwise all collected diagnostics.
    pub fn finish<T>(self, value: T) -> Result<T, Vec<Diagnostic>> {
        if self.items.is_empty() {
            Ok(value)
        } else {
            Err(self.items)
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Source texts read during one load, keyed by [`FileId`].
#[derive(Clone)]
pub struct SourceFiles {
    files: SimpleFiles<String, String>,
}

impl Default for SourceFiles {
    fn default() -> Self {
        SourceFiles { files: SimpleFiles::new() }
    }
}

impl SourceFiles {
    pub(crate) fn add(&mut self, name: String, source: String) -> FileId {
        FileId(self.files.add(name, source))
    }

    pub fn get(&self, file_id: FileId) -> Option<&str> {
        self.files.get(file_id.index()).ok().map(|file| file.source().as_str())
    }

    pub fn files(&self) -> &SimpleFiles<String, String> {
        &self.files
    }
}

impl fmt::Debug for SourceFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFiles").finish_non_exhaustive()
    }
}

/// The failure outcome of [`Loader::load`](crate::Loader::load).
#[derive(Debug, Error)]
#[error("failed to load Thrift schema ({} error(s))", .diagnostics.len())]
pub struct LoadError {
    pub diagnostics: Vec<Diagnostic>,
    pub sources: SourceFiles,
}

impl LoadError {
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.diagnostics.iter().map(|d| d.kind).collect()
    }

    /// Renders every diagnostic with source snippets.
    pub fn emit(&self, writer: &mut dyn WriteColor) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        for diagnostic in &self.diagnostics {
            term::emit(writer, &config, self.sources.files(), &diagnostic.to_report())?;
        }
        Ok(())
    }
}

/// Errors a [`SourceResolver`](crate::SourceResolver) may report.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
