//! Parsing and linking of Thrift IDL files.
//!
//! [`Loader`] turns a set of `.thrift` files into a [`Schema`]: every include is followed,
//! every name is resolved, and all semantic checks have passed. Code generators only ever
//! see a [`Schema`].

pub mod ast;
pub mod constant;
pub mod enum_type;
pub mod error;
pub mod lexer;
pub mod location;
pub mod namespace;
pub mod parser;
pub mod program;
pub mod schema;
pub mod service_type;
pub mod struct_type;
pub mod typedef;
pub mod types;

mod components;
mod linker;
mod loader;
mod resolver;

pub use ast::{Annotations, Requiredness, StructKind};
pub use constant::{ConstValue, Constant};
pub use enum_type::{EnumMember, EnumType};
pub use error::{
    Diagnostic, DiagnosticKind, Diagnostics, LoadError, SourceError, SourceFiles,
};
pub use loader::Loader;
pub use location::{FileId, Location};
pub use namespace::{namespace_for_scope, NamespaceScope, Namespaces};
pub use program::{Program, ProgramId};
pub use resolver::{FileSystemResolver, InMemoryResolver, SourceResolver};
pub use schema::Schema;
pub use service_type::{ServiceMethod, ServiceType};
pub use struct_type::{Field, StructType};
pub use typedef::TypedefType;
pub use types::{BuiltinType, ThriftType};

pub use components::{
    Component, ComponentTable, ComponentTraits, HasArenaContainer, Ref, SchemaComponentTable,
};
