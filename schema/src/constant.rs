use crate::components::{Component, Ref};
use crate::location::Location;
use crate::{EnumType, Namespaces, ProgramId, StructType, ThriftType};

/// A validated constant value, shaped after the type it was checked against.
///
/// References to other constants are inlined and enum members are stored as the member
/// itself, so consumers never need to look anything up by name.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    /// Value of a `string` or `binary` constant.
    String(String),
    Enum {
        enum_type: Ref<EnumType>,
        /// Index into [`EnumType::members`].
        member: usize,
    },
    List(Vec<ConstValue>),
    Set(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
    Struct {
        struct_type: Ref<StructType>,
        /// Field indices into [`StructType::fields`] with their values, in source order.
        fields: Vec<(usize, ConstValue)>,
    },
}

/// A top-level `const` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub name: String,
    pub program: ProgramId,
    pub const_type: ThriftType,
    pub value: ConstValue,
    pub location: Location,
    pub documentation: Option<String>,
    pub namespaces: Namespaces,
}

impl Component for Constant {
    const DISPLAY_NAME: &'static str = "const";

    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> ProgramId {
        self.program
    }
}
