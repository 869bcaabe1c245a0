use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Two different schema names map to the same Rust name.
    #[error("NameCollisionError: `{first}` and `{second}` both become `{name}` in {scope}")]
    NameCollision {
        /// The module or entity in which the names clash.
        scope: String,
        name: String,
        first: String,
        second: String,
    },
    #[error(
        "MissingNamespaceMappingError: `{entity}` has no `{scope}` or `*` namespace and no package override was given"
    )]
    MissingNamespaceMapping { entity: String, scope: String },
    /// A set element or map key whose generated type does not implement `Ord`.
    #[error(
        "UnorderedKeyError: `{entity}` uses `{key}` as a set element or map key, but its generated type has no total order"
    )]
    UnorderedKey { entity: String, key: String },
    #[error("invalid root module `{0}`: expected a module path such as `crate::generated`")]
    InvalidRootModule(String),
}

impl GenerateError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NameCollision { .. } => "NameCollisionError",
            Self::MissingNamespaceMapping { .. } => "MissingNamespaceMappingError",
            Self::UnorderedKey { .. } => "UnorderedKeyError",
            Self::InvalidRootModule(_) => "InvalidRootModuleError",
        }
    }
}

/// Every problem found by one generator run, in the order they were found.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub struct GenerateErrors(pub Vec<GenerateError>);

impl GenerateErrors {
    pub fn iter(&self) -> impl Iterator<Item = &GenerateError> {
        self.0.iter()
    }
}

impl fmt::Display for GenerateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [error] => write!(f, "{error}"),
            errors => {
                write!(f, "{} errors while generating code", errors.len())?;
                for error in errors {
                    write!(f, "\n  {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<GenerateError> for GenerateErrors {
    fn from(error: GenerateError) -> Self {
        Self(vec![error])
    }
}
