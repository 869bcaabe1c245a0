use crate::components::{Component, ComponentTable, ComponentTraits, HasArenaContainer, Ref};
use crate::components::SchemaComponentTable;
use crate::{Constant, EnumType, Program, ProgramId, ServiceType, StructType, TypedefType};

/// The fully linked result of one [`Loader`](crate::Loader) invocation.
///
/// Immutable once built; code generators only ever read from it.
#[derive(Debug, PartialEq)]
pub struct Schema {
    programs: Vec<Program>,
    components: SchemaComponentTable,
}

impl Schema {
    pub(crate) fn new(programs: Vec<Program>, components: SchemaComponentTable) -> Self {
        Self {
            programs,
            components,
        }
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, id: ProgramId) -> &Program {
        &self.programs[id.0]
    }

    pub fn components(&self) -> &SchemaComponentTable {
        &self.components
    }

    pub fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components.get(ref_)
    }

    pub fn structs(&self) -> Vec<Ref<StructType>> {
        self.collect(|p| &p.structs)
    }

    pub fn unions(&self) -> Vec<Ref<StructType>> {
        self.collect(|p| &p.unions)
    }

    pub fn exceptions(&self) -> Vec<Ref<StructType>> {
        self.collect(|p| &p.exceptions)
    }

    pub fn enums(&self) -> Vec<Ref<EnumType>> {
        self.collect(|p| &p.enums)
    }

    pub fn typedefs(&self) -> Vec<Ref<TypedefType>> {
        self.collect(|p| &p.typedefs)
    }

    pub fn services(&self) -> Vec<Ref<ServiceType>> {
        self.collect(|p| &p.services)
    }

    pub fn constants(&self) -> Vec<Ref<Constant>> {
        self.collect(|p| &p.constants)
    }

    fn collect<T: Copy>(&self, select: impl Fn(&Program) -> &Vec<T>) -> Vec<T> {
        self.programs
            .iter()
            .flat_map(|program| select(program).iter().copied())
            .collect()
    }

    /// `program.Name` for any named entity.
    pub fn qualified_name<R>(&self, ref_: Ref<R>) -> String
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let component = self.get(ref_);
        format!(
            "{}.{}",
            self.program(component.program()).name,
            component.name()
        )
    }

    fn find<R>(&self, qualified_name: &str, select: impl Fn(&Program) -> &Vec<Ref<R>>) -> Option<Ref<R>>
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        let (program_name, name) = qualified_name.rsplit_once('.')?;
        self.programs
            .iter()
            .filter(|program| program.name == program_name)
            .flat_map(|program| select(program).iter().copied())
            .find(|ref_| self.get(*ref_).name() == name)
    }

    /// Finds a struct, union or exception by `program.Name`.
    pub fn find_struct(&self, qualified_name: &str) -> Option<Ref<StructType>> {
        self.find(qualified_name, |p| &p.structs)
            .or_else(|| self.find(qualified_name, |p| &p.unions))
            .or_else(|| self.find(qualified_name, |p| &p.exceptions))
    }

    pub fn find_enum(&self, qualified_name: &str) -> Option<Ref<EnumType>> {
        self.find(qualified_name, |p| &p.enums)
    }

    pub fn find_typedef(&self, qualified_name: &str) -> Option<Ref<TypedefType>> {
        self.find(qualified_name, |p| &p.typedefs)
    }

    pub fn find_service(&self, qualified_name: &str) -> Option<Ref<ServiceType>> {
        self.find(qualified_name, |p| &p.services)
    }

    pub fn find_constant(&self, qualified_name: &str) -> Option<Ref<Constant>> {
        self.find(qualified_name, |p| &p.constants)
    }
}

impl ComponentTable for Schema {
    fn get<R>(&self, ref_: Ref<R>) -> &R
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.components.get(ref_)
    }
}
