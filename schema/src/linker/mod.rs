//! Resolves the parsed files of one load against each other.
//!
//! Every declaration first gets a reserved slot in the component table, so that later passes
//! can hand out [`Ref`]s to entities that are not built yet. Passes run in dependency order
//! and keep going after errors; an entity whose own resolution failed simply leaves its slot
//! empty, and checks that would need it are skipped.

mod constants;
mod services;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::ast::{
    ConstDeclElement, Declaration, EnumElement, FieldElement, Requiredness, ServiceElement,
    StructElement, StructKind, ThriftFileElement, TypeElement, TypedefElement,
};
use crate::components::{
    Component, ComponentTraits, ConstructionComponentTable, HasArenaContainer, Ref,
};
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::location::Location;
use crate::namespace::NamespaceScope;
use crate::{
    Constant, EnumMember, EnumType, Field, Namespaces, Program, ProgramId, Schema, ServiceType,
    StructType, ThriftType, TypedefType,
};

use self::constants::ConstState;

/// A successfully parsed file, numbered in load order.
pub(crate) struct ParsedProgram {
    pub(crate) id: ProgramId,
    pub(crate) name: String,
    pub(crate) path: Arc<Path>,
    pub(crate) element: ThriftFileElement,
    /// Included programs with the location of the `include`, in declaration order.
    pub(crate) includes: Vec<(ProgramId, Location)>,
}

/// What a top-level name refers to.
#[derive(Copy, Clone, Debug)]
enum Symbol {
    Enum(Ref<EnumType>),
    Struct(Ref<StructType>, StructKind),
    Typedef(Ref<TypedefType>),
    Service(Ref<ServiceType>),
    Const(Ref<Constant>),
}

/// The symbol table of one program.
#[derive(Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
    /// Included programs by name, in include order.
    includes: Vec<(String, ProgramId)>,
    namespaces: Namespaces,
    /// Every declaration, in source order.
    declared: Vec<Symbol>,
}

type Pending<'p, R, E> = Vec<(ProgramId, Ref<R>, &'p E)>;

pub(crate) struct Linker<'p> {
    programs: &'p [ParsedProgram],
    scopes: Vec<Scope>,
    table: ConstructionComponentTable,
    diagnostics: Diagnostics,
    enums: Pending<'p, EnumType, EnumElement>,
    structs: Pending<'p, StructType, StructElement>,
    typedefs: Pending<'p, TypedefType, TypedefElement>,
    services: Pending<'p, ServiceType, ServiceElement>,
    constants: HashMap<Ref<Constant>, (ProgramId, &'p ConstDeclElement)>,
    struct_elements: HashMap<Ref<StructType>, &'p StructElement>,
    const_state: HashMap<Ref<Constant>, ConstState>,
}

impl<'p> Linker<'p> {
    /// `programs[i].id` must be `ProgramId(i)`.
    pub(crate) fn new(programs: &'p [ParsedProgram]) -> Self {
        Self {
            programs,
            scopes: Vec::with_capacity(programs.len()),
            table: ConstructionComponentTable::new(),
            diagnostics: Diagnostics::new(),
            enums: Vec::new(),
            structs: Vec::new(),
            typedefs: Vec::new(),
            services: Vec::new(),
            constants: HashMap::new(),
            struct_elements: HashMap::new(),
            const_state: HashMap::new(),
        }
    }

    pub(crate) fn link(mut self) -> Result<Schema, Vec<Diagnostic>> {
        let _span = tracing::debug_span!("link").entered();

        self.register_symbols();
        self.link_typedefs();
        self.link_enums();
        self.link_structs();
        self.link_services();
        self.link_constants();
        self.link_default_values();

        let programs = self.build_programs();
        let components = self
            .diagnostics
            .finish(self.table)?
            .convert_to_schema_table()
            .expect("every reserved component is resolved when no diagnostics were reported");
        Ok(Schema::new(programs, components))
    }

    fn register_symbols(&mut self) {
        let programs = self.programs;
        for program in programs {
            debug_assert_eq!(program.id.0, self.scopes.len());
            let mut scope = Scope::default();

            for namespace in program.element.namespaces() {
                let namespace_scope = NamespaceScope::from_name(&namespace.scope);
                if let Some(previous) = scope
                    .namespaces
                    .insert(namespace_scope, namespace.namespace.clone())
                {
                    tracing::warn!(
                        program = %program.name,
                        scope = %namespace.scope,
                        %previous,
                        "namespace declared twice, using the last declaration"
                    );
                }
            }

            for (included, location) in &program.includes {
                let name = &programs[included.0].name;
                match scope.includes.iter().find(|(n, _)| n == name) {
                    Some((_, id)) if id == included => {}
                    Some(_) => self.diagnostics.error(
                        DiagnosticKind::DuplicateSymbol,
                        format!("two different included files are both named `{name}`"),
                        location,
                    ),
                    None => scope.includes.push((name.clone(), *included)),
                }
            }

            for declaration in &program.element.declarations {
                let (name, location, symbol) = match declaration {
                    Declaration::Namespace(_) | Declaration::Include(_) => continue,
                    Declaration::Enum(element) => {
                        let ref_ = self.table.reserve();
                        self.enums.push((program.id, ref_, element));
                        (&element.name, &element.location, Symbol::Enum(ref_))
                    }
                    Declaration::Struct(element)
                    | Declaration::Union(element)
                    | Declaration::Exception(element) => {
                        let ref_ = self.table.reserve();
                        self.structs.push((program.id, ref_, element));
                        self.struct_elements.insert(ref_, element);
                        (
                            &element.name,
                            &element.location,
                            Symbol::Struct(ref_, element.kind),
                        )
                    }
                    Declaration::Typedef(element) => {
                        let ref_ = self.table.reserve();
                        self.typedefs.push((program.id, ref_, element));
                        (&element.new_name, &element.location, Symbol::Typedef(ref_))
                    }
                    Declaration::Service(element) => {
                        let ref_ = self.table.reserve();
                        self.services.push((program.id, ref_, element));
                        (&element.name, &element.location, Symbol::Service(ref_))
                    }
                    Declaration::Const(element) => {
                        let ref_ = self.table.reserve();
                        self.constants.insert(ref_, (program.id, element));
                        (&element.name, &element.location, Symbol::Const(ref_))
                    }
                };
                scope.declared.push(symbol);
                match scope.symbols.entry(name.clone()) {
                    Entry::Occupied(_) => self.diagnostics.error(
                        DiagnosticKind::DuplicateSymbol,
                        format!("`{name}` is already defined in `{}`", program.name),
                        location,
                    ),
                    Entry::Vacant(entry) => {
                        entry.insert(symbol);
                    }
                }
            }

            tracing::trace!(
                program = %program.name,
                symbols = scope.symbols.len(),
                "registered symbols"
            );
            self.scopes.push(scope);
        }
    }

    /// Looks `name` up in `program`, then in the programs it includes.
    ///
    /// A `prefix.Name` whose prefix is the name of an included program only looks in that
    /// program. Includes are not transitive.
    fn lookup(&self, program: ProgramId, name: &str) -> Option<Symbol> {
        let scope = &self.scopes[program.0];
        if let Some(symbol) = scope.symbols.get(name) {
            return Some(*symbol);
        }
        if let Some((prefix, rest)) = name.split_once('.') {
            if let Some((_, included)) = scope.includes.iter().find(|(n, _)| n == prefix) {
                return self.scopes[included.0].symbols.get(rest).copied();
            }
        }
        scope
            .includes
            .iter()
            .find_map(|(_, included)| self.scopes[included.0].symbols.get(name).copied())
    }

    fn resolve_type(&mut self, program: ProgramId, element: &TypeElement) -> Option<ThriftType> {
        match element {
            TypeElement::Base { base, .. } => Some(ThriftType::Builtin((*base).into())),
            TypeElement::List { element, .. } => {
                Some(ThriftType::List(Box::new(self.resolve_type(program, element)?)))
            }
            TypeElement::Set { element, .. } => {
                Some(ThriftType::Set(Box::new(self.resolve_type(program, element)?)))
            }
            TypeElement::Map { key, value, .. } => {
                let key = self.resolve_type(program, key);
                let value = self.resolve_type(program, value);
                Some(ThriftType::Map(Box::new(key?), Box::new(value?)))
            }
            TypeElement::Named { name, location, .. } => {
                let not_a_type = |what: &str| format!("`{name}` is a {what}, not a type");
                let message = match self.lookup(program, name) {
                    Some(Symbol::Enum(ref_)) => return Some(ThriftType::Enum(ref_)),
                    Some(Symbol::Typedef(ref_)) => return Some(ThriftType::Typedef(ref_)),
                    Some(Symbol::Struct(ref_, kind)) => {
                        return Some(match kind {
                            StructKind::Struct => ThriftType::Struct(ref_),
                            StructKind::Union => ThriftType::Union(ref_),
                            StructKind::Exception => ThriftType::Exception(ref_),
                        })
                    }
                    Some(Symbol::Service(_)) => not_a_type("service"),
                    Some(Symbol::Const(_)) => not_a_type("constant"),
                    None => format!("unknown type `{name}`"),
                };
                self.diagnostics
                    .error(DiagnosticKind::UnknownType, message, location);
                None
            }
        }
    }

    /// Follows typedefs. `None` if one of them could not be resolved.
    fn true_type(&self, ty: &ThriftType) -> Option<ThriftType> {
        let mut current = ty;
        while let ThriftType::Typedef(typedef) = current {
            current = &self.table.try_get(*typedef)?.old_type;
        }
        Some(current.clone())
    }

    fn component_name<R>(&self, ref_: Ref<R>) -> String
    where
        R: Component,
        ComponentTraits: HasArenaContainer<R>,
    {
        self.table
            .try_get(ref_)
            .map_or_else(|| format!("{ref_:?}"), |component| component.name().to_owned())
    }

    /// Like [`ThriftType::display`], but safe on a partially built table.
    fn type_name(&self, ty: &ThriftType) -> String {
        match ty {
            ThriftType::Builtin(builtin) => builtin.name().to_owned(),
            ThriftType::Enum(r) => self.component_name(*r),
            ThriftType::Struct(r) | ThriftType::Union(r) | ThriftType::Exception(r) => {
                self.component_name(*r)
            }
            ThriftType::Typedef(r) => self.component_name(*r),
            ThriftType::List(element) => format!("list<{}>", self.type_name(element)),
            ThriftType::Set(element) => format!("set<{}>", self.type_name(element)),
            ThriftType::Map(key, value) => {
                format!("map<{}, {}>", self.type_name(key), self.type_name(value))
            }
        }
    }

    fn namespaces(&self, program: ProgramId) -> Namespaces {
        self.scopes[program.0].namespaces.clone()
    }

    fn link_typedefs(&mut self) {
        let mut resolved = Vec::new();
        for (program, ref_, element) in self.typedefs.clone() {
            if let Some(old_type) = self.resolve_type(program, &element.old_type) {
                resolved.push((
                    ref_,
                    TypedefType {
                        name: element.new_name.clone(),
                        program,
                        old_type,
                        location: element.location.clone(),
                        documentation: element.documentation.clone(),
                        namespaces: self.namespaces(program),
                        annotations: element.annotations.clone(),
                    },
                ));
            }
        }

        let cyclic = self.find_typedef_cycles(&resolved);
        for (ref_, typedef) in resolved {
            if !cyclic.contains(&ref_) {
                self.table.insert(ref_, typedef);
            }
        }
    }

    /// Reports typedefs that alias themselves, directly or through container arguments.
    ///
    /// Returns every typedef on a cycle; those are left out of the table.
    fn find_typedef_cycles(
        &mut self,
        typedefs: &[(Ref<TypedefType>, TypedefType)],
    ) -> HashSet<Ref<TypedefType>> {
        fn aliases(ty: &ThriftType, out: &mut Vec<Ref<TypedefType>>) {
            match ty {
                ThriftType::Typedef(r) => out.push(*r),
                ThriftType::List(element) | ThriftType::Set(element) => aliases(element, out),
                ThriftType::Map(key, value) => {
                    aliases(key, out);
                    aliases(value, out);
                }
                _ => {}
            }
        }

        let edges: HashMap<Ref<TypedefType>, (Vec<Ref<TypedefType>>, &TypedefType)> = typedefs
            .iter()
            .map(|(ref_, typedef)| {
                let mut out = Vec::new();
                aliases(&typedef.old_type, &mut out);
                (*ref_, (out, typedef))
            })
            .collect();

        #[derive(PartialEq)]
        enum State {
            OnStack,
            Done,
        }

        struct Search<'e> {
            edges: &'e HashMap<Ref<TypedefType>, (Vec<Ref<TypedefType>>, &'e TypedefType)>,
            state: HashMap<Ref<TypedefType>, State>,
            stack: Vec<Ref<TypedefType>>,
            cyclic: HashSet<Ref<TypedefType>>,
            found: Vec<(Location, String)>,
        }

        impl Search<'_> {
            fn visit(&mut self, node: Ref<TypedefType>) {
                let edges = self.edges;
                let Some((targets, _)) = edges.get(&node) else {
                    return;
                };
                self.state.insert(node, State::OnStack);
                self.stack.push(node);
                for target in targets {
                    match self.state.get(target) {
                        None => self.visit(*target),
                        Some(State::OnStack) => {
                            let start = self.stack.iter().position(|r| r == target).unwrap_or(0);
                            let cycle = &self.stack[start..];
                            self.cyclic.extend(cycle.iter().copied());
                            let name = |r: &Ref<TypedefType>| {
                                edges.get(r).map_or("?", |(_, t)| t.name.as_str())
                            };
                            let chain = cycle
                                .iter()
                                .chain(std::iter::once(target))
                                .map(name)
                                .collect::<Vec<_>>()
                                .join(" -> ");
                            if let Some((_, typedef)) = edges.get(target) {
                                self.found.push((
                                    typedef.location.clone(),
                                    format!("typedef `{}` refers to itself: {chain}", typedef.name),
                                ));
                            }
                        }
                        Some(State::Done) => {}
                    }
                }
                self.stack.pop();
                self.state.insert(node, State::Done);
            }
        }

        let mut search = Search {
            edges: &edges,
            state: HashMap::new(),
            stack: Vec::new(),
            cyclic: HashSet::new(),
            found: Vec::new(),
        };
        for (ref_, _) in typedefs {
            if !search.state.contains_key(ref_) {
                search.visit(*ref_);
            }
        }
        for (location, message) in search.found {
            self.diagnostics
                .error(DiagnosticKind::CyclicTypedef, message, &location);
        }
        search.cyclic
    }

    /// Assigns implicit values (previous value + 1, starting at 0) and checks uniqueness.
    fn link_enums(&mut self) {
        for (program, ref_, element) in self.enums.clone() {
            let mut members = Vec::with_capacity(element.members.len());
            let mut next: i64 = 0;
            let mut by_value: HashMap<i32, &str> = HashMap::new();
            let mut names = HashSet::new();

            for member in &element.members {
                let value = member.value.unwrap_or(next);
                next = value.saturating_add(1);
                if !names.insert(member.name.as_str()) {
                    self.diagnostics.error(
                        DiagnosticKind::DuplicateSymbol,
                        format!(
                            "enum `{}` has more than one member named `{}`",
                            element.name, member.name
                        ),
                        &member.location,
                    );
                }
                let Ok(value) = i32::try_from(value) else {
                    self.diagnostics.error(
                        DiagnosticKind::InvalidEnumValue,
                        format!(
                            "value {value} of `{}.{}` does not fit in a 32-bit integer",
                            element.name, member.name
                        ),
                        &member.location,
                    );
                    continue;
                };
                if let Some(previous) = by_value.insert(value, &member.name) {
                    self.diagnostics.error(
                        DiagnosticKind::DuplicateEnumValue,
                        format!(
                            "`{}.{}` has value {value}, which is already used by `{}.{previous}`",
                            element.name, member.name, element.name
                        ),
                        &member.location,
                    );
                }
                members.push(EnumMember {
                    name: member.name.clone(),
                    value,
                    location: member.location.clone(),
                    documentation: member.documentation.clone(),
                    annotations: member.annotations.clone(),
                });
            }

            self.table.insert(
                ref_,
                EnumType {
                    name: element.name.clone(),
                    program,
                    location: element.location.clone(),
                    documentation: element.documentation.clone(),
                    members,
                    namespaces: self.namespaces(program),
                    annotations: element.annotations.clone(),
                },
            );
        }
    }

    fn link_structs(&mut self) {
        for (program, ref_, element) in self.structs.clone() {
            let owner = format!("{} `{}`", element.kind.keyword(), element.name);
            self.check_fields(&owner, &element.fields, element.kind == StructKind::Union);
            let Some(fields) = self.link_fields(program, &element.fields) else {
                continue;
            };
            self.table.insert(
                ref_,
                StructType {
                    kind: element.kind,
                    name: element.name.clone(),
                    program,
                    location: element.location.clone(),
                    documentation: element.documentation.clone(),
                    fields,
                    namespaces: self.namespaces(program),
                    annotations: element.annotations.clone(),
                },
            );
        }
    }

    /// Resolves field types. Default values are checked in a later pass, once every struct
    /// and constant they may refer to exists.
    fn link_fields(&mut self, program: ProgramId, elements: &[FieldElement]) -> Option<Vec<Field>> {
        let fields = elements
            .iter()
            .map(|element| {
                Some(Field {
                    id: element.id,
                    name: element.name.clone(),
                    field_type: self.resolve_type(program, &element.field_type)?,
                    requiredness: element.requiredness,
                    default_value: None,
                    location: element.location.clone(),
                    documentation: element.documentation.clone(),
                    annotations: element.annotations.clone(),
                })
            })
            .collect::<Vec<_>>();
        fields.into_iter().collect()
    }

    /// Checks the rules shared by struct fields, method parameters and `throws` clauses.
    fn check_fields(&mut self, owner: &str, fields: &[FieldElement], is_union: bool) {
        let mut ids: HashMap<i32, &str> = HashMap::new();
        let mut names = HashSet::new();
        for field in fields {
            if let Some(previous) = ids.insert(field.id, &field.name) {
                self.diagnostics.error(
                    DiagnosticKind::DuplicateFieldId,
                    format!(
                        "field `{}` of {owner} reuses id {} of field `{previous}`",
                        field.name, field.id
                    ),
                    &field.location,
                );
            }
            if !names.insert(field.name.as_str()) {
                self.diagnostics.error(
                    DiagnosticKind::DuplicateSymbol,
                    format!("{owner} has more than one field named `{}`", field.name),
                    &field.location,
                );
            }
            if is_union && field.requiredness == Requiredness::Required {
                self.diagnostics.error(
                    DiagnosticKind::InvalidUnionField,
                    format!("field `{}` of {owner} cannot be required", field.name),
                    &field.location,
                );
            }
        }
        if is_union {
            let mut with_defaults = fields.iter().filter(|f| f.default_value.is_some());
            if let (Some(_), Some(second)) = (with_defaults.next(), with_defaults.next()) {
                self.diagnostics.error(
                    DiagnosticKind::InvalidUnionField,
                    format!("{owner} has default values for more than one field"),
                    &second.location,
                );
            }
        }
    }

    fn link_default_values(&mut self) {
        for (program, ref_, element) in self.structs.clone() {
            for (index, field) in element.fields.iter().enumerate() {
                let Some(default) = &field.default_value else {
                    continue;
                };
                let Some(field_type) = self
                    .table
                    .try_get(ref_)
                    .map(|s| s.fields[index].field_type.clone())
                else {
                    continue;
                };
                if let Some(value) = self.check_value(program, &field_type, default) {
                    if let Some(struct_type) = self.table.get_mut(ref_) {
                        struct_type.fields[index].default_value = Some(value);
                    }
                }
            }
        }
        self.link_parameter_defaults();
    }

    fn build_programs(&self) -> Vec<Program> {
        self.programs
            .iter()
            .map(|parsed| {
                let scope = &self.scopes[parsed.id.0];
                let mut program = Program {
                    id: parsed.id,
                    name: parsed.name.clone(),
                    path: Arc::clone(&parsed.path),
                    location: parsed.element.location.clone(),
                    namespaces: scope.namespaces.clone(),
                    includes: scope.includes.iter().map(|(_, id)| *id).collect(),
                    cpp_includes: parsed
                        .element
                        .declarations
                        .iter()
                        .filter_map(|d| match d {
                            Declaration::Include(include) if include.is_cpp => {
                                Some(include.path.clone())
                            }
                            _ => None,
                        })
                        .collect(),
                    enums: Vec::new(),
                    structs: Vec::new(),
                    unions: Vec::new(),
                    exceptions: Vec::new(),
                    typedefs: Vec::new(),
                    services: Vec::new(),
                    constants: Vec::new(),
                };
                for symbol in &scope.declared {
                    match *symbol {
                        Symbol::Enum(r) => program.enums.push(r),
                        Symbol::Struct(r, StructKind::Struct) => program.structs.push(r),
                        Symbol::Struct(r, StructKind::Union) => program.unions.push(r),
                        Symbol::Struct(r, StructKind::Exception) => program.exceptions.push(r),
                        Symbol::Typedef(r) => program.typedefs.push(r),
                        Symbol::Service(r) => program.services.push(r),
                        Symbol::Const(r) => program.constants.push(r),
                    }
                }
                program
            })
            .collect()
    }
}
