use std::collections::BTreeMap;

use clap::ValueEnum;
use thrift_schema::NamespaceScope;

/// How field and parameter names are spelled in generated code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FieldNaming {
    /// `user_name`
    #[default]
    Snake,
    /// `userName`
    Camel,
    /// Exactly as written in the IDL.
    Preserve,
}

/// Options for a generator run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Replaces the declared namespace of every program for the given scope.
    pub package_overrides: BTreeMap<NamespaceScope, String>,
    /// Module path under which package modules are placed, e.g. `crate` or `crate::gen`.
    pub root_module: String,
    pub field_naming: FieldNaming,
    /// Emit equality, hashing and `Display` implementations for structs, unions and
    /// exceptions.
    pub scaffolding: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            package_overrides: BTreeMap::new(),
            root_module: "crate".to_owned(),
            field_naming: FieldNaming::default(),
            scaffolding: true,
        }
    }
}

impl GeneratorConfig {
    pub fn with_package(mut self, scope: NamespaceScope, package: impl Into<String>) -> Self {
        self.package_overrides.insert(scope, package.into());
        self
    }

    pub fn package_override(&self, scope: &NamespaceScope) -> Option<&str> {
        self.package_overrides.get(scope).map(String::as_str)
    }
}
