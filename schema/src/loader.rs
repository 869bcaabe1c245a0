use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::ast::ThriftFileElement;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics, LoadError, SourceFiles};
use crate::linker::{Linker, ParsedProgram};
use crate::location::{FileId, Location};
use crate::parser;
use crate::resolver::{resolve_include, FileSystemResolver, SourceResolver};
use crate::{ProgramId, Schema};

/// Loads a set of IDL files and everything they include into one [`Schema`].
///
/// ```no_run
/// use thrift_schema::Loader;
///
/// let schema = Loader::new()
///     .add_include_path("idl/shared")
///     .add_thrift_file("idl/service.thrift")
///     .load()?;
/// # Ok::<(), thrift_schema::LoadError>(())
/// ```
pub struct Loader {
    thrift_files: Vec<PathBuf>,
    include_paths: Vec<PathBuf>,
    resolver: Box<dyn SourceResolver>,
    jobs: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// One file discovered during loading.
struct SourceFile {
    path: PathBuf,
    element: Option<ThriftFileElement>,
    /// Indices of included files, with the location of the `include` declaration.
    includes: Vec<(usize, Location)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            thrift_files: Vec::new(),
            include_paths: Vec::new(),
            resolver: Box::new(FileSystemResolver),
            jobs: thread::available_parallelism().map_or(1, usize::from),
        }
    }

    /// Adds a file to load. Files that are also reached through an include are loaded once.
    pub fn add_thrift_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.thrift_files.push(path.into());
        self
    }

    /// Adds a directory to search for includes that are not found next to the including file.
    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_resolver(&mut self, resolver: impl SourceResolver + 'static) -> &mut Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Upper bound on the number of files parsed concurrently.
    pub fn jobs(&mut self, jobs: usize) -> &mut Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Parses and links every reachable file.
    ///
    /// All diagnostics found across all files are reported together. Parse and include errors
    /// are reported before linking starts; linking only runs on a complete set of files.
    pub fn load(&self) -> Result<Schema, LoadError> {
        let _span = tracing::info_span!("load", files = self.thrift_files.len()).entered();

        let mut sources = SourceFiles::default();
        let mut diagnostics = Diagnostics::new();
        let files = self.parse_all(&mut sources, &mut diagnostics);

        if diagnostics.is_empty() {
            check_include_cycles(&files, &mut diagnostics);
        }
        if !diagnostics.is_empty() {
            return Err(LoadError {
                diagnostics: diagnostics.into_vec(),
                sources,
            });
        }

        let programs = files
            .into_iter()
            .enumerate()
            .filter_map(|(index, file)| {
                let element = file.element?;
                Some(ParsedProgram {
                    id: ProgramId(index),
                    name: program_name(&file.path),
                    path: Arc::from(file.path.as_path()),
                    element,
                    includes: file
                        .includes
                        .into_iter()
                        .map(|(included, location)| (ProgramId(included), location))
                        .collect(),
                })
            })
            .collect::<Vec<_>>();
        tracing::debug!(programs = programs.len(), "linking");

        match Linker::new(&programs).link() {
            Ok(schema) => {
                tracing::info!(programs = schema.programs().len(), "schema loaded");
                Ok(schema)
            }
            Err(diagnostics) => Err(LoadError {
                diagnostics,
                sources,
            }),
        }
    }

    /// Reads and parses the requested files and, wave by wave, everything they include.
    ///
    /// Files are numbered in discovery order, which makes the result independent of how the
    /// parse work was scheduled.
    fn parse_all(&self, sources: &mut SourceFiles, diagnostics: &mut Diagnostics) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = Vec::new();
        let mut by_path: HashMap<PathBuf, usize> = HashMap::new();
        let mut wave = Vec::new();

        for requested in &self.thrift_files {
            match self.resolver.canonicalize(requested) {
                Ok(path) => {
                    if let Some(index) = discover(&mut files, &mut by_path, path) {
                        wave.push(index);
                    }
                }
                Err(err) => diagnostics.push(Diagnostic::without_location(
                    DiagnosticKind::UnresolvedInclude,
                    format!("cannot load `{}`: {err}", requested.display()),
                )),
            }
        }

        while !wave.is_empty() {
            let mut inputs = Vec::with_capacity(wave.len());
            for &index in &wave {
                let file = &files[index];
                match self.resolver.read(&file.path) {
                    Ok(source) => {
                        let file_id = sources.add(file.path.display().to_string(), source);
                        inputs.push((index, file_id));
                    }
                    Err(err) => diagnostics.push(Diagnostic::without_location(
                        DiagnosticKind::UnresolvedInclude,
                        format!("cannot read `{}`: {err}", file.path.display()),
                    )),
                }
            }

            let parsed = parse_files(self.jobs, &files, sources, &inputs);

            let mut next_wave = Vec::new();
            for ((index, _), result) in inputs.into_iter().zip(parsed) {
                let element = match result {
                    Ok(element) => element,
                    Err(errors) => {
                        diagnostics.extend(errors);
                        continue;
                    }
                };
                let including = files[index].path.clone();
                let mut includes = Vec::new();
                for include in element.includes() {
                    let Some(path) = resolve_include(
                        self.resolver.as_ref(),
                        &including,
                        &include.path,
                        &self.include_paths,
                    ) else {
                        diagnostics.error(
                            DiagnosticKind::UnresolvedInclude,
                            format!("cannot find included file `{}`", include.path),
                            &include.location,
                        );
                        continue;
                    };
                    let known = by_path.get(&path).copied();
                    let included = match known {
                        Some(included) => included,
                        None => {
                            let included = files.len();
                            discover(&mut files, &mut by_path, path);
                            next_wave.push(included);
                            included
                        }
                    };
                    includes.push((included, include.location.clone()));
                }
                files[index].includes = includes;
                files[index].element = Some(element);
            }
            wave = next_wave;
        }

        files
    }
}

/// Registers a newly seen file and returns its index, or `None` if it was already known.
fn discover(
    files: &mut Vec<SourceFile>,
    by_path: &mut HashMap<PathBuf, usize>,
    path: PathBuf,
) -> Option<usize> {
    if by_path.contains_key(&path) {
        return None;
    }
    tracing::trace!(path = %path.display(), "discovered");
    let index = files.len();
    by_path.insert(path.clone(), index);
    files.push(SourceFile {
        path,
        element: None,
        includes: Vec::new(),
    });
    Some(index)
}

type ParseOutcome = Result<ThriftFileElement, Vec<Diagnostic>>;

/// Parses one wave of files on up to `jobs` threads; results are in input order.
fn parse_files(
    jobs: usize,
    files: &[SourceFile],
    sources: &SourceFiles,
    inputs: &[(usize, FileId)],
) -> Vec<ParseOutcome> {
    let parse_one = |&(index, file_id): &(usize, FileId)| -> ParseOutcome {
        let path = &files[index].path;
        let _span = tracing::debug_span!("parse", path = %path.display()).entered();
        let source = sources.get(file_id).unwrap_or_default();
        parser::parse(file_id, path, source)
    };

    let workers = jobs.min(inputs.len());
    if workers <= 1 {
        return inputs.iter().map(parse_one).collect();
    }

    let chunk_size = inputs.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles = inputs
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(parse_one).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Reports every include cycle once, at the include that closes it.
fn check_include_cycles(files: &[SourceFile], diagnostics: &mut Diagnostics) {
    #[derive(Copy, Clone, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }

    fn visit(
        index: usize,
        files: &[SourceFile],
        state: &mut [State],
        stack: &mut Vec<usize>,
        diagnostics: &mut Diagnostics,
    ) {
        state[index] = State::OnStack;
        stack.push(index);
        for (included, location) in &files[index].includes {
            match state[*included] {
                State::Unvisited => visit(*included, files, state, stack, diagnostics),
                State::OnStack => {
                    let start = stack.iter().position(|i| i == included).unwrap_or(0);
                    let chain = stack[start..]
                        .iter()
                        .chain(std::iter::once(included))
                        .map(|i| program_name(&files[*i].path))
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    diagnostics.error(
                        DiagnosticKind::CyclicInclude,
                        format!("include cycle: {chain}"),
                        location,
                    );
                }
                State::Done => {}
            }
        }
        stack.pop();
        state[index] = State::Done;
    }

    let mut state = vec![State::Unvisited; files.len()];
    let mut stack = Vec::new();
    for index in 0..files.len() {
        if state[index] == State::Unvisited {
            visit(index, files, &mut state, &mut stack, diagnostics);
        }
    }
}

/// The name other programs use to refer to a file: its stem.
fn program_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::InMemoryResolver;

    fn loader(files: &[(&str, &str)]) -> Loader {
        let mut resolver = InMemoryResolver::new();
        for (path, source) in files {
            resolver.add_file(path, *source);
        }
        let mut loader = Loader::new();
        loader.with_resolver(resolver);
        loader
    }

    #[test]
    fn shared_includes_are_loaded_once() {
        let mut loader = loader(&[
            ("a.thrift", "include \"common.thrift\"\ninclude \"b.thrift\"\n"),
            ("b.thrift", "include \"common.thrift\"\n"),
            ("common.thrift", "struct Shared {}\n"),
        ]);
        let schema = loader.add_thrift_file("a.thrift").load().unwrap();
        let names: Vec<_> = schema.programs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "common", "b"]);
        assert_eq!(schema.structs().len(), 1);
    }

    #[test]
    fn missing_includes_are_reported_at_the_include() {
        let mut loader = loader(&[("a.thrift", "\ninclude \"nope.thrift\"\n")]);
        let err = loader.add_thrift_file("a.thrift").load().unwrap_err();
        assert_eq!(err.kinds(), [DiagnosticKind::UnresolvedInclude]);
        let location = err.diagnostics[0].location.as_ref().unwrap();
        assert_eq!(location.line, 2);
    }

    #[test]
    fn missing_root_files_are_reported() {
        let mut loader = loader(&[]);
        let err = loader.add_thrift_file("a.thrift").load().unwrap_err();
        assert_eq!(err.kinds(), [DiagnosticKind::UnresolvedInclude]);
        assert!(err.diagnostics[0].location.is_none());
    }

    #[test]
    fn parse_errors_in_one_file_do_not_hide_errors_in_another() {
        let mut loader = loader(&[
            ("a.thrift", "struct A {\n"),
            ("b.thrift", "enum B { X = }\n"),
        ]);
        let err = loader
            .add_thrift_file("a.thrift")
            .add_thrift_file("b.thrift")
            .jobs(2)
            .load()
            .unwrap_err();
        let paths: Vec<_> = err
            .diagnostics
            .iter()
            .filter_map(|d| d.location.as_ref())
            .map(|l| l.path().to_path_buf())
            .collect();
        assert!(paths.contains(&PathBuf::from("a.thrift")));
        assert!(paths.contains(&PathBuf::from("b.thrift")));
    }

    #[test]
    fn include_cycles_are_detected() {
        let mut loader = loader(&[
            ("a.thrift", "include \"b.thrift\"\n"),
            ("b.thrift", "include \"a.thrift\"\n"),
        ]);
        let err = loader.add_thrift_file("a.thrift").load().unwrap_err();
        assert_eq!(err.kinds(), [DiagnosticKind::CyclicInclude]);
        assert!(err.diagnostics[0].message.contains("a -> b -> a"));
    }
}
