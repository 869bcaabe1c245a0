use crate::ast::Annotations;
use crate::components::Component;
use crate::location::Location;
use crate::{Namespaces, ProgramId, ThriftType};

/// A named alias. `old_type` may itself be a typedef; use [`ThriftType::true_type`] to reach
/// the aliased type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedefType {
    pub name: String,
    pub program: ProgramId,
    pub old_type: ThriftType,
    pub location: Location,
    pub documentation: Option<String>,
    pub namespaces: Namespaces,
    pub annotations: Annotations,
}

impl Component for TypedefType {
    const DISPLAY_NAME: &'static str = "typedef";

    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> ProgramId {
        self.program
    }
}
