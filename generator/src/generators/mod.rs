mod common;

#[cfg(feature = "generator-rust")]
mod rust;

#[cfg(not(feature = "generator-rust"))]
compile_error!("At least one generator must be enabled");

use std::path::PathBuf;

use clap::ValueEnum;
use thrift_schema::{NamespaceScope, Schema};

use crate::config::GeneratorConfig;
use crate::error::GenerateErrors;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    #[cfg(feature = "generator-rust")]
    Rust,
}

impl Target {
    /// The namespace scope whose declarations pick the output packages.
    pub fn scope(self) -> NamespaceScope {
        match self {
            #[cfg(feature = "generator-rust")]
            Self::Rust => NamespaceScope::Rs,
        }
    }

    /// Generates every entity of `schema`.
    ///
    /// Programs without a namespace for the target's scope are rejected before anything is
    /// generated. Name collisions are collected for all entities, and any error fails the
    /// whole run.
    pub fn generate(
        self,
        schema: &Schema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedEntity>, GenerateErrors> {
        match self {
            #[cfg(feature = "generator-rust")]
            Self::Rust => rust::generate(schema, config, &self.scope()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Enum,
    Struct,
    Union,
    Exception,
    Typedef,
    Service,
    Constant,
}

/// The generated items for one schema entity and where they belong.
#[derive(Clone, Debug)]
pub struct GeneratedEntity {
    pub kind: EntityKind,
    /// `program.Name` of the schema entity.
    pub qualified_name: String,
    /// Name of the primary generated item.
    pub name: String,
    pub file_stem: String,
    /// Package module segments below the root module.
    pub module: Vec<String>,
    pub items: Vec<syn::Item>,
}

impl GeneratedEntity {
    /// `a/b/c/<file_stem>.rs` for an entity in package `a.b.c`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.module.iter().collect();
        path.push(format!("{}.rs", self.file_stem));
        path
    }
}
