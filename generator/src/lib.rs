//! Rust code generation for Thrift IDL schemas.
//!
//! A [`Schema`](thrift_schema::Schema) loaded by `thrift-schema` is lowered to `syn` items
//! per entity by [`Target::generate`], then turned into source files by [`render`] and
//! [`render_module_tree`].

pub mod config;
pub mod error;
pub mod generators;
pub mod render;

mod naming;

pub use config::{FieldNaming, GeneratorConfig};
pub use error::{GenerateError, GenerateErrors};
pub use generators::{EntityKind, GeneratedEntity, Target};
pub use render::{render, render_module_tree, RenderedFile};
