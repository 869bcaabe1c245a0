use std::fmt;

use crate::ast::BaseType;
use crate::components::{Component, ComponentTable, Ref};
use crate::{EnumType, StructType, TypedefType};

/// The primitive Thrift types. `byte` and `i8` are the same type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
        }
    }

    /// The inclusive value range of integer types.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::I16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::I32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl From<BaseType> for BuiltinType {
    fn from(base: BaseType) -> Self {
        match base {
            BaseType::Bool => Self::Bool,
            BaseType::Byte | BaseType::I8 => Self::I8,
            BaseType::I16 => Self::I16,
            BaseType::I32 => Self::I32,
            BaseType::I64 => Self::I64,
            BaseType::Double => Self::Double,
            BaseType::String => Self::String,
            BaseType::Binary => Self::Binary,
        }
    }
}

/// A resolved type.
///
/// Named types are handles into the schema's component table, which is what allows
/// a struct to mention itself through a container or an optional field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ThriftType {
    Builtin(BuiltinType),
    Enum(Ref<EnumType>),
    Struct(Ref<StructType>),
    Union(Ref<StructType>),
    Exception(Ref<StructType>),
    Typedef(Ref<TypedefType>),
    List(Box<ThriftType>),
    Set(Box<ThriftType>),
    Map(Box<ThriftType>, Box<ThriftType>),
}

impl ThriftType {
    /// Follows typedefs to the first non-typedef type (the typedef fixed point).
    ///
    /// Only valid on tables in which typedef cycles have been ruled out; every table owned by
    /// a [`Schema`](crate::Schema) satisfies this.
    pub fn true_type<'t>(&'t self, table: &'t impl ComponentTable) -> &'t ThriftType {
        let mut current = self;
        while let ThriftType::Typedef(typedef) = current {
            current = &typedef.get(table).old_type;
        }
        current
    }

    /// Returns the referenced struct, union or exception.
    pub fn struct_ref(&self) -> Option<Ref<StructType>> {
        match self {
            Self::Struct(r) | Self::Union(r) | Self::Exception(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(..))
    }

    /// The type spelled the way it would be written in the IDL of its own program.
    pub fn display(&self, table: &impl ComponentTable) -> String {
        match self {
            Self::Builtin(builtin) => builtin.name().to_owned(),
            Self::Enum(r) => r.get(table).name().to_owned(),
            Self::Struct(r) | Self::Union(r) | Self::Exception(r) => r.get(table).name().to_owned(),
            Self::Typedef(r) => r.get(table).name().to_owned(),
            Self::List(element) => format!("list<{}>", element.display(table)),
            Self::Set(element) => format!("set<{}>", element.display(table)),
            Self::Map(key, value) => {
                format!("map<{}, {}>", key.display(table), value.display(table))
            }
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
