use crate::ast::{Annotations, Requiredness, StructKind};
use crate::components::Component;
use crate::location::Location;
use crate::{ConstValue, Namespaces, ProgramId, ThriftType};

/// A resolved struct, union or exception.
#[derive(Clone, Debug, PartialEq)]
pub struct StructType {
    pub kind: StructKind,
    pub name: String,
    pub program: ProgramId,
    pub location: Location,
    pub documentation: Option<String>,
    pub fields: Vec<Field>,
    pub namespaces: Namespaces,
    pub annotations: Annotations,
}

impl StructType {
    pub fn is_union(&self) -> bool {
        self.kind == StructKind::Union
    }

    pub fn is_exception(&self) -> bool {
        self.kind == StructKind::Exception
    }

    pub fn field_by_name(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }
}

impl Component for StructType {
    const DISPLAY_NAME: &'static str = "struct";

    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> ProgramId {
        self.program
    }
}

/// A field of a struct, union or exception, or a parameter or declared exception of a
/// service method.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub id: i32,
    pub name: String,
    pub field_type: ThriftType,
    pub requiredness: Requiredness,
    pub default_value: Option<ConstValue>,
    pub location: Location,
    pub documentation: Option<String>,
    pub annotations: Annotations,
}

impl Field {
    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    pub fn is_optional(&self) -> bool {
        self.requiredness == Requiredness::Optional
    }
}
