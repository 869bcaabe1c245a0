use crate::ast::Annotations;
use crate::components::{Component, ComponentTable, Ref};
use crate::location::Location;
use crate::{Field, Namespaces, ProgramId, ThriftType};

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceType {
    pub name: String,
    pub program: ProgramId,
    pub extends: Option<Ref<ServiceType>>,
    pub methods: Vec<ServiceMethod>,
    pub location: Location,
    pub documentation: Option<String>,
    pub namespaces: Namespaces,
    pub annotations: Annotations,
}

impl ServiceType {
    /// The chain of extended services, nearest first.
    pub fn ancestors(&self, table: &impl ComponentTable) -> Vec<Ref<ServiceType>> {
        let mut ancestors = Vec::new();
        let mut next = self.extends;
        while let Some(service) = next {
            if ancestors.contains(&service) {
                break;
            }
            ancestors.push(service);
            next = service.get(table).extends;
        }
        ancestors
    }
}

impl Component for ServiceType {
    const DISPLAY_NAME: &'static str = "service";

    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> ProgramId {
        self.program
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceMethod {
    pub name: String,
    /// `None` for `void` methods.
    pub return_type: Option<ThriftType>,
    pub params: Vec<Field>,
    /// Declared exceptions; each field's type is an exception.
    pub exceptions: Vec<Field>,
    pub oneway: bool,
    pub location: Location,
    pub documentation: Option<String>,
    pub annotations: Annotations,
}
