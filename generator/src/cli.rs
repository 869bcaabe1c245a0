use std::path::PathBuf;

use clap::Parser;
use thrift_generator::{FieldNaming, Target};

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
    #[clap(value_parser, required = true, help = "The IDL files to compile")]
    pub files: Vec<PathBuf>,

    #[clap(
        short = 'I',
        long = "include-path",
        value_parser,
        help = "Directory searched for included files, after the including file's own directory"
    )]
    pub include_paths: Vec<PathBuf>,

    #[clap(
        short,
        long,
        value_parser,
        help = "Directory to write the generated files to; printed to stdout when absent"
    )]
    pub out: Option<PathBuf>,

    #[clap(short, long, value_parser, help = "Number of files parsed in parallel")]
    pub jobs: Option<usize>,

    #[clap(long, default_value = "rust", value_enum)]
    pub target: Target,

    #[clap(long, help = "Package for all generated code, replacing `namespace rs` declarations")]
    pub package: Option<String>,

    #[clap(long, default_value = "crate", help = "Module the generated packages are placed under")]
    pub root_module: String,

    #[clap(long, default_value = "snake", value_enum)]
    pub field_naming: FieldNaming,

    #[clap(long, help = "Do not generate equality, hashing and Display implementations")]
    pub no_scaffolding: bool,

    #[clap(short, long, help = "Log progress to stderr")]
    pub verbose: bool,
}
