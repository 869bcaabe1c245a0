use std::collections::HashSet;

use crate::ast::{FunctionElement, TypeElement};
use crate::components::Ref;
use crate::error::DiagnosticKind;
use crate::{ProgramId, ServiceMethod, ServiceType, ThriftType};

use super::{Linker, Symbol};

impl Linker<'_> {
    pub(super) fn link_services(&mut self) {
        for (program, ref_, element) in self.services.clone() {
            let extends = element
                .extends
                .as_ref()
                .and_then(|extends| self.resolve_extends(program, extends));

            let mut names = HashSet::new();
            let mut methods = Vec::with_capacity(element.functions.len());
            let mut complete = true;
            for function in &element.functions {
                if !names.insert(function.name.as_str()) {
                    self.diagnostics.error(
                        DiagnosticKind::DuplicateMethod,
                        format!(
                            "service `{}` has more than one method named `{}`",
                            element.name, function.name
                        ),
                        &function.location,
                    );
                }
                match self.link_method(program, &element.name, function) {
                    Some(method) => methods.push(method),
                    None => complete = false,
                }
            }
            if element.extends.is_some() && extends.is_none() {
                complete = false;
            }
            if !complete {
                continue;
            }

            self.table.insert(
                ref_,
                ServiceType {
                    name: element.name.clone(),
                    program,
                    extends,
                    methods,
                    location: element.location.clone(),
                    documentation: element.documentation.clone(),
                    namespaces: self.namespaces(program),
                    annotations: element.annotations.clone(),
                },
            );
        }
        self.check_service_hierarchy();
    }

    fn resolve_extends(&mut self, program: ProgramId, extends: &TypeElement) -> Option<Ref<ServiceType>> {
        let location = extends.location();
        let message = match extends {
            TypeElement::Named { name, .. } => match self.lookup(program, name) {
                Some(Symbol::Service(service)) => return Some(service),
                Some(_) => format!("`{name}` is not a service"),
                None => {
                    self.diagnostics.error(
                        DiagnosticKind::UnknownType,
                        format!("unknown service `{name}`"),
                        location,
                    );
                    return None;
                }
            },
            other => format!("`{}` is not a service", other.display_name()),
        };
        self.diagnostics
            .error(DiagnosticKind::InvalidServiceExtends, message, location);
        None
    }

    fn link_method(
        &mut self,
        program: ProgramId,
        service: &str,
        function: &FunctionElement,
    ) -> Option<ServiceMethod> {
        let owner = format!("method `{service}.{}`", function.name);

        if function.oneway && function.return_type.is_some() {
            self.diagnostics.error(
                DiagnosticKind::InvalidOneway,
                format!("oneway {owner} must return void"),
                &function.location,
            );
        }
        if function.oneway && !function.exceptions.is_empty() {
            self.diagnostics.error(
                DiagnosticKind::InvalidOneway,
                format!("oneway {owner} cannot declare exceptions"),
                &function.location,
            );
        }

        let return_type = match &function.return_type {
            Some(return_type) => Some(self.resolve_type(program, return_type)),
            None => None,
        };
        self.check_fields(&format!("the parameters of {owner}"), &function.params, false);
        let params = self.link_fields(program, &function.params);
        self.check_fields(&format!("the throws clause of {owner}"), &function.exceptions, false);
        let exceptions = self.link_fields(program, &function.exceptions);

        for (element, field) in function.exceptions.iter().zip(exceptions.iter().flatten()) {
            match self.true_type(&field.field_type) {
                Some(ThriftType::Exception(_)) | None => {}
                Some(_) => self.diagnostics.error(
                    DiagnosticKind::InvalidThrows,
                    format!(
                        "`{}` in the throws clause of {owner} is not an exception",
                        element.field_type.display_name()
                    ),
                    element.field_type.location(),
                ),
            }
        }

        Some(ServiceMethod {
            name: function.name.clone(),
            return_type: return_type.map_or(Some(None), |t| t.map(Some))?,
            params: params?,
            exceptions: exceptions?,
            oneway: function.oneway,
            location: function.location.clone(),
            documentation: function.documentation.clone(),
            annotations: function.annotations.clone(),
        })
    }

    /// Rejects inheritance cycles and methods that redeclare an inherited method.
    fn check_service_hierarchy(&mut self) {
        for (_, ref_, element) in self.services.clone() {
            let Some(service) = self.table.try_get(ref_) else {
                continue;
            };
            let mut chain = vec![ref_];
            let mut next = service.extends;
            let mut cyclic = false;
            while let Some(ancestor) = next {
                if ancestor == ref_ {
                    cyclic = true;
                    break;
                }
                if chain.contains(&ancestor) {
                    // a cycle further up, reported for the services on it
                    break;
                }
                chain.push(ancestor);
                next = self.table.try_get(ancestor).and_then(|s| s.extends);
            }

            if cyclic {
                let names = chain
                    .iter()
                    .chain(std::iter::once(&ref_))
                    .map(|r| self.component_name(*r))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                let location = element
                    .extends
                    .as_ref()
                    .map_or(&element.location, |e| e.location());
                self.diagnostics.error(
                    DiagnosticKind::InvalidServiceExtends,
                    format!("service `{}` extends itself: {names}", element.name),
                    location,
                );
                continue;
            }

            for function in &element.functions {
                let inherited_from = chain[1..].iter().find(|ancestor| {
                    self.table
                        .try_get(**ancestor)
                        .is_some_and(|s| s.methods.iter().any(|m| m.name == function.name))
                });
                if let Some(ancestor) = inherited_from {
                    let message = format!(
                        "method `{}` of service `{}` is already defined by `{}`",
                        function.name,
                        element.name,
                        self.component_name(*ancestor)
                    );
                    self.diagnostics
                        .error(DiagnosticKind::DuplicateMethod, message, &function.location);
                }
            }
        }
    }

    /// Checks default values of method parameters.
    pub(super) fn link_parameter_defaults(&mut self) {
        for (program, ref_, element) in self.services.clone() {
            for (method_index, function) in element.functions.iter().enumerate() {
                for (param_index, param) in function.params.iter().enumerate() {
                    let Some(default) = &param.default_value else {
                        continue;
                    };
                    let Some(param_type) = self
                        .table
                        .try_get(ref_)
                        .map(|s| s.methods[method_index].params[param_index].field_type.clone())
                    else {
                        continue;
                    };
                    if let Some(value) = self.check_value(program, &param_type, default) {
                        if let Some(service) = self.table.get_mut(ref_) {
                            service.methods[method_index].params[param_index].default_value =
                                Some(value);
                        }
                    }
                }
            }
        }
    }
}
