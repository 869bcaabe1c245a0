use crate::ast::Annotations;
use crate::components::Component;
use crate::location::Location;
use crate::{Namespaces, ProgramId};

/// A resolved enum. Member values are always assigned.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub program: ProgramId,
    pub location: Location,
    pub documentation: Option<String>,
    pub members: Vec<EnumMember>,
    pub namespaces: Namespaces,
    pub annotations: Annotations,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: i32,
    pub location: Location,
    pub documentation: Option<String>,
    pub annotations: Annotations,
}

impl EnumType {
    pub fn find_by_value(&self, value: i64) -> Option<(usize, &EnumMember)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, member)| i64::from(member.value) == value)
    }

    pub fn find_by_name(&self, name: &str) -> Option<(usize, &EnumMember)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, member)| member.name == name)
    }
}

impl Component for EnumType {
    const DISPLAY_NAME: &'static str = "enum";

    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> ProgramId {
        self.program
    }
}
