//! The per-file syntax tree produced by the [parser](crate::parser).
//!
//! Nothing in here is resolved: type references are kept as written, constant values are
//! raw literals, and includes are plain strings.

use crate::location::Location;

/// Annotations such as `(cpp.type = "Foo", deprecated)`, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations(pub Vec<(String, Option<String>)>);

impl Annotations {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    Bool,
    Byte,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

/// A type reference exactly as it appears in the source.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeElement {
    Base {
        base: BaseType,
        location: Location,
        annotations: Annotations,
    },
    List {
        element: Box<TypeElement>,
        location: Location,
        annotations: Annotations,
    },
    Set {
        element: Box<TypeElement>,
        location: Location,
        annotations: Annotations,
    },
    Map {
        key: Box<TypeElement>,
        value: Box<TypeElement>,
        location: Location,
        annotations: Annotations,
    },
    /// A bare (`Foo`) or program-qualified (`shared.Foo`) name.
    Named {
        name: String,
        location: Location,
        annotations: Annotations,
    },
}

impl TypeElement {
    pub fn location(&self) -> &Location {
        match self {
            Self::Base { location, .. }
            | Self::List { location, .. }
            | Self::Set { location, .. }
            | Self::Map { location, .. }
            | Self::Named { location, .. } => location,
        }
    }

    pub fn annotations(&self) -> &Annotations {
        match self {
            Self::Base { annotations, .. }
            | Self::List { annotations, .. }
            | Self::Set { annotations, .. }
            | Self::Map { annotations, .. }
            | Self::Named { annotations, .. } => annotations,
        }
    }

    /// The type as it would be written in IDL, e.g. `map<string, list<i16>>`.
    pub fn display_name(&self) -> String {
        match self {
            Self::Base { base, .. } => base_type_name(*base).to_owned(),
            Self::List { element, .. } => format!("list<{}>", element.display_name()),
            Self::Set { element, .. } => format!("set<{}>", element.display_name()),
            Self::Map { key, value, .. } => {
                format!("map<{}, {}>", key.display_name(), value.display_name())
            }
            Self::Named { name, .. } => name.clone(),
        }
    }
}

pub fn base_type_name(base: BaseType) -> &'static str {
    match base {
        BaseType::Bool => "bool",
        BaseType::Byte => "byte",
        BaseType::I8 => "i8",
        BaseType::I16 => "i16",
        BaseType::I32 => "i32",
        BaseType::I64 => "i64",
        BaseType::Double => "double",
        BaseType::String => "string",
        BaseType::Binary => "binary",
    }
}

/// A constant expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValueElement {
    Integer(i64),
    Double(f64),
    Literal(String),
    /// `true`/`false` are kept apart from identifiers so that they can be validated as
    /// booleans without a symbol lookup.
    Bool(bool),
    Identifier(String),
    List(Vec<ConstElement>),
    Map(Vec<(ConstElement, ConstElement)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstElement {
    pub value: ConstValueElement,
    pub location: Location,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Requiredness {
    Required,
    Optional,
    Default,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub id: i32,
    /// `false` if the id was assigned implicitly.
    pub explicit_id: bool,
    pub requiredness: Requiredness,
    pub field_type: TypeElement,
    pub name: String,
    pub default_value: Option<ConstElement>,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumMemberElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub name: String,
    pub value: Option<i64>,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub name: String,
    pub members: Vec<EnumMemberElement>,
    pub annotations: Annotations,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

impl StructKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Exception => "exception",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub kind: StructKind,
    pub name: String,
    pub fields: Vec<FieldElement>,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedefElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub old_type: TypeElement,
    pub new_name: String,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstDeclElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub const_type: TypeElement,
    pub name: String,
    pub value: ConstElement,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub oneway: bool,
    /// `None` for `void`.
    pub return_type: Option<TypeElement>,
    pub name: String,
    pub params: Vec<FieldElement>,
    pub exceptions: Vec<FieldElement>,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceElement {
    pub location: Location,
    pub documentation: Option<String>,
    pub name: String,
    pub extends: Option<TypeElement>,
    pub functions: Vec<FunctionElement>,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceElement {
    pub location: Location,
    pub scope: String,
    pub namespace: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeElement {
    pub location: Location,
    pub path: String,
    /// `cpp_include` declarations are kept but never followed.
    pub is_cpp: bool,
}

/// One top-level declaration.
///
/// Structs, unions and exceptions share [`StructElement`]; the variant and
/// [`StructElement::kind`] always agree.
#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    Namespace(NamespaceElement),
    Include(IncludeElement),
    Typedef(TypedefElement),
    Const(ConstDeclElement),
    Enum(EnumElement),
    Struct(StructElement),
    Union(StructElement),
    Exception(StructElement),
    Service(ServiceElement),
}

impl Declaration {
    pub fn location(&self) -> &Location {
        match self {
            Self::Namespace(e) => &e.location,
            Self::Include(e) => &e.location,
            Self::Typedef(e) => &e.location,
            Self::Const(e) => &e.location,
            Self::Enum(e) => &e.location,
            Self::Struct(e) | Self::Union(e) | Self::Exception(e) => &e.location,
            Self::Service(e) => &e.location,
        }
    }

    /// The declared name; `None` for namespaces and includes.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Namespace(_) | Self::Include(_) => None,
            Self::Typedef(e) => Some(&e.new_name),
            Self::Const(e) => Some(&e.name),
            Self::Enum(e) => Some(&e.name),
            Self::Struct(e) | Self::Union(e) | Self::Exception(e) => Some(&e.name),
            Self::Service(e) => Some(&e.name),
        }
    }

    pub fn documentation(&self) -> Option<&str> {
        match self {
            Self::Namespace(_) | Self::Include(_) => None,
            Self::Typedef(e) => e.documentation.as_deref(),
            Self::Const(e) => e.documentation.as_deref(),
            Self::Enum(e) => e.documentation.as_deref(),
            Self::Struct(e) | Self::Union(e) | Self::Exception(e) => e.documentation.as_deref(),
            Self::Service(e) => e.documentation.as_deref(),
        }
    }
}

/// The parse result of one IDL file.
#[derive(Clone, Debug, PartialEq)]
pub struct ThriftFileElement {
    pub location: Location,
    pub declarations: Vec<Declaration>,
}

impl ThriftFileElement {
    pub fn includes(&self) -> impl Iterator<Item = &IncludeElement> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Include(include) if !include.is_cpp => Some(include),
            _ => None,
        })
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &NamespaceElement> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Namespace(namespace) => Some(namespace),
            _ => None,
        })
    }
}
