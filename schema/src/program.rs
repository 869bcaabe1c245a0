use std::path::Path;
use std::sync::Arc;

use crate::components::Ref;
use crate::location::Location;
use crate::{Constant, EnumType, Namespaces, ServiceType, StructType, TypedefType};

/// Index of a [`Program`] within its [`Schema`](crate::Schema).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub usize);

/// One resolved IDL file.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub id: ProgramId,
    /// The file stem, used to qualify references from including programs.
    pub name: String,
    pub path: Arc<Path>,
    pub location: Location,
    pub namespaces: Namespaces,
    pub includes: Vec<ProgramId>,
    pub cpp_includes: Vec<String>,
    pub enums: Vec<Ref<EnumType>>,
    pub structs: Vec<Ref<StructType>>,
    pub unions: Vec<Ref<StructType>>,
    pub exceptions: Vec<Ref<StructType>>,
    pub typedefs: Vec<Ref<TypedefType>>,
    pub services: Vec<Ref<ServiceType>>,
    pub constants: Vec<Ref<Constant>>,
}

impl Program {
    /// Whether the program declares no entities, only headers.
    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
            && self.structs.is_empty()
            && self.unions.is_empty()
            && self.exceptions.is_empty()
            && self.typedefs.is_empty()
            && self.services.is_empty()
            && self.constants.is_empty()
    }
}
