mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use thrift_generator::{render, render_module_tree, GeneratorConfig, RenderedFile};
use thrift_schema::Loader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
#[error("could not write `{}`: {source}", .path.display())]
struct WriteError {
    path: PathBuf,
    source: io::Error,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn write_files(out: Option<&Path>, files: &[RenderedFile]) -> Result<(), WriteError> {
    let Some(out) = out else {
        let mut stdout = io::stdout().lock();
        for file in files {
            writeln!(stdout, "// {}\n{}", file.path.display(), file.contents).map_err(|source| {
                WriteError {
                    path: file.path.clone(),
                    source,
                }
            })?;
        }
        return Ok(());
    };

    for file in files {
        let path = out.join(&file.path);
        let written = match path.parent() {
            Some(parent) => fs::create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|()| fs::write(&path, &file.contents));
        written.map_err(|source| WriteError {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let mut loader = Loader::new();
    for path in &cli.include_paths {
        loader.add_include_path(path);
    }
    for file in &cli.files {
        loader.add_thrift_file(file);
    }
    if let Some(jobs) = cli.jobs {
        loader.jobs(jobs);
    }

    let schema = match loader.load() {
        Ok(schema) => schema,
        Err(error) => {
            let mut stderr = StandardStream::stderr(ColorChoice::Auto);
            if let Err(err) = error.emit(&mut stderr) {
                warn!("could not render diagnostics: {err}");
            }
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = GeneratorConfig {
        root_module: cli.root_module,
        field_naming: cli.field_naming,
        scaffolding: !cli.no_scaffolding,
        ..GeneratorConfig::default()
    };
    if let Some(package) = cli.package {
        config = config.with_package(cli.target.scope(), package);
    }

    let entities = match cli.target.generate(&schema, &config) {
        Ok(entities) => entities,
        Err(errors) => {
            for error in errors.iter() {
                eprintln!("error: {error}");
            }
            return ExitCode::FAILURE;
        }
    };

    let mut files: Vec<RenderedFile> = entities.iter().map(render).collect();
    files.extend(render_module_tree(&entities));
    match write_files(cli.out.as_deref(), &files) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
