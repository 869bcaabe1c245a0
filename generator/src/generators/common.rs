use std::collections::{HashMap, HashSet};

use thrift_schema::{
    namespace_for_scope, BuiltinType, Component, ComponentTraits, Constant, EnumType,
    HasArenaContainer, NamespaceScope, ProgramId, Ref, Schema, ServiceType, StructType,
    ThriftType, TypedefType,
};

use crate::config::GeneratorConfig;
use crate::error::GenerateError;
use crate::naming::package_segments;

pub(super) trait ComponentVisitor: Sized {
    type EnumValue;
    fn visit_enum(&mut self, context: &mut GeneratorContext, enum_type: Ref<EnumType>) -> Self::EnumValue;

    /// Called for structs, unions and exceptions alike.
    type StructValue;
    fn visit_struct(
        &mut self,
        context: &mut GeneratorContext,
        struct_type: Ref<StructType>,
    ) -> Self::StructValue;

    type TypedefValue;
    fn visit_typedef(
        &mut self,
        context: &mut GeneratorContext,
        typedef: Ref<TypedefType>,
    ) -> Self::TypedefValue;

    type ServiceValue;
    fn visit_service(
        &mut self,
        context: &mut GeneratorContext,
        service: Ref<ServiceType>,
    ) -> Self::ServiceValue;

    type ConstantValue;
    fn visit_constant(
        &mut self,
        context: &mut GeneratorContext,
        constant: Ref<Constant>,
    ) -> Self::ConstantValue;
}

pub(super) struct GeneratorContext<'a> {
    pub(super) schema: &'a Schema,
    pub(super) config: &'a GeneratorConfig,
    /// Output module of every program, as package segments below the root module.
    pub(super) modules: HashMap<ProgramId, Vec<String>>,
    /// Module of the entity being generated.
    pub(super) current_module: Vec<String>,
    pub(super) visited_structs: HashSet<Ref<StructType>>,
}

impl<'a> GeneratorContext<'a> {
    pub(super) fn new(
        schema: &'a Schema,
        config: &'a GeneratorConfig,
        modules: HashMap<ProgramId, Vec<String>>,
    ) -> Self {
        Self {
            schema,
            config,
            modules,
            current_module: Vec::new(),
            visited_structs: HashSet::new(),
        }
    }

    pub(super) fn module_of(&self, program: ProgramId) -> &[String] {
        self.modules.get(&program).map_or(&[], Vec::as_slice)
    }

    /// Whether a value of `ty` can contain a `double`, looking through typedefs, containers
    /// and nested structs.
    pub(super) fn contains_double(&mut self, ty: &ThriftType) -> bool {
        self.visited_structs.clear();
        self.contains_double_inner(ty)
    }

    fn contains_double_inner(&mut self, ty: &ThriftType) -> bool {
        let schema = self.schema;
        match ty.true_type(schema) {
            ThriftType::Builtin(builtin) => *builtin == BuiltinType::Double,
            ThriftType::Enum(_) => false,
            ThriftType::List(element) | ThriftType::Set(element) => {
                self.contains_double_inner(element)
            }
            ThriftType::Map(key, value) => {
                self.contains_double_inner(key) || self.contains_double_inner(value)
            }
            ThriftType::Struct(r) | ThriftType::Union(r) | ThriftType::Exception(r) => {
                self.visited_structs.insert(*r)
                    && schema
                        .get(*r)
                        .fields
                        .iter()
                        .any(|field| self.contains_double_inner(&field.field_type))
            }
            ThriftType::Typedef(_) => unreachable!("typedefs are followed by true_type"),
        }
    }

    /// Whether the generated type for `ty` implements `Ord`.
    ///
    /// Structs, unions and exceptions only derive `Ord` with scaffolding and when no `double`
    /// is reachable from them.
    pub(super) fn is_ordered(&mut self, ty: &ThriftType) -> bool {
        let schema = self.schema;
        match ty.true_type(schema) {
            ThriftType::Builtin(builtin) => *builtin != BuiltinType::Double,
            ThriftType::Enum(_) => true,
            ThriftType::List(element) | ThriftType::Set(element) => self.is_ordered(element),
            ThriftType::Map(key, value) => self.is_ordered(key) && self.is_ordered(value),
            ThriftType::Struct(_) | ThriftType::Union(_) | ThriftType::Exception(_) => {
                self.config.scaffolding && !self.contains_double(ty)
            }
            ThriftType::Typedef(_) => unreachable!("typedefs are followed by true_type"),
        }
    }

    /// The first set element or map key type within `ty` that cannot go into a `BTreeSet` or
    /// `BTreeMap`.
    pub(super) fn unordered_key(&mut self, ty: &ThriftType) -> Option<String> {
        let schema = self.schema;
        match ty.true_type(schema) {
            ThriftType::List(element) => self.unordered_key(element),
            ThriftType::Set(element) => {
                if !self.is_ordered(element) {
                    return Some(element.display(schema));
                }
                self.unordered_key(element)
            }
            ThriftType::Map(key, value) => {
                if !self.is_ordered(key) {
                    return Some(key.display(schema));
                }
                self.unordered_key(key).or_else(|| self.unordered_key(value))
            }
            _ => None,
        }
    }

    /// Whether a value of `ty` can hold a `target` without an intervening container, which is
    /// when a field needs to be boxed.
    pub(super) fn reaches_struct(&mut self, ty: &ThriftType, target: Ref<StructType>) -> bool {
        self.visited_structs.clear();
        self.reaches_struct_inner(ty, target)
    }

    fn reaches_struct_inner(&mut self, ty: &ThriftType, target: Ref<StructType>) -> bool {
        let schema = self.schema;
        let Some(r) = ty.true_type(schema).struct_ref() else {
            return false;
        };
        if r == target {
            return true;
        }
        if !self.visited_structs.insert(r) {
            return false;
        }
        schema
            .get(r)
            .fields
            .iter()
            .any(|field| self.reaches_struct_inner(&field.field_type, target))
    }
}

/// Maps every program that declares something to its output package, or reports each
/// entity that has nowhere to go.
pub(super) fn resolve_modules(
    schema: &Schema,
    scope: &NamespaceScope,
    config: &GeneratorConfig,
) -> Result<HashMap<ProgramId, Vec<String>>, Vec<GenerateError>> {
    let mut modules = HashMap::new();
    let mut errors = Vec::new();
    for program in schema.programs() {
        let package = config
            .package_override(scope)
            .or_else(|| namespace_for_scope(&program.namespaces, scope));
        match package {
            Some(package) => {
                modules.insert(program.id, package_segments(package));
            }
            None => {
                let missing = |qualified_name: String| GenerateError::MissingNamespaceMapping {
                    entity: qualified_name,
                    scope: scope.to_string(),
                };
                errors.extend(entities(schema, &program.enums).map(missing));
                errors.extend(entities(schema, &program.structs).map(missing));
                errors.extend(entities(schema, &program.unions).map(missing));
                errors.extend(entities(schema, &program.exceptions).map(missing));
                errors.extend(entities(schema, &program.typedefs).map(missing));
                errors.extend(entities(schema, &program.services).map(missing));
                errors.extend(entities(schema, &program.constants).map(missing));
            }
        }
    }
    if errors.is_empty() {
        Ok(modules)
    } else {
        Err(errors)
    }
}

fn entities<'s, R>(schema: &'s Schema, refs: &'s [Ref<R>]) -> impl Iterator<Item = String> + 's
where
    R: Component,
    ComponentTraits: HasArenaContainer<R>,
{
    refs.iter().map(|r| schema.qualified_name(*r))
}
