use crate::ast::{ConstElement, ConstValueElement, Requiredness};
use crate::components::Ref;
use crate::error::DiagnosticKind;
use crate::location::Location;
use crate::types::BuiltinType;
use crate::{ConstValue, Constant, EnumType, ProgramId, StructType, ThriftType};

use super::{Linker, Symbol};

pub(super) enum ConstState {
    InProgress,
    Done(Option<ConstValue>),
}

fn describe(value: &ConstValueElement) -> String {
    match value {
        ConstValueElement::Integer(v) => format!("the integer {v}"),
        ConstValueElement::Double(v) => format!("the double {v}"),
        ConstValueElement::Literal(s) => format!("the string \"{s}\""),
        ConstValueElement::Bool(b) => format!("`{b}`"),
        ConstValueElement::Identifier(name) => format!("`{name}`"),
        ConstValueElement::List(_) => "a list".to_owned(),
        ConstValueElement::Map(_) => "a map".to_owned(),
    }
}

impl Linker<'_> {
    pub(super) fn link_constants(&mut self) {
        let mut constants: Vec<_> = self.constants.keys().copied().collect();
        constants.sort();
        for constant in constants {
            self.resolve_constant(constant);
        }
    }

    /// Resolves a constant at most once, following references to other constants first.
    fn resolve_constant(&mut self, ref_: Ref<Constant>) -> Option<ConstValue> {
        match self.const_state.get(&ref_) {
            Some(ConstState::Done(value)) => return value.clone(),
            Some(ConstState::InProgress) => return None,
            None => {}
        }
        let (program, element) = *self.constants.get(&ref_)?;
        self.const_state.insert(ref_, ConstState::InProgress);

        let const_type = self.resolve_type(program, &element.const_type);
        let value = match &const_type {
            Some(const_type) => self.check_value(program, const_type, &element.value),
            None => None,
        };
        if let (Some(const_type), Some(value)) = (const_type, &value) {
            self.table.insert(
                ref_,
                Constant {
                    name: element.name.clone(),
                    program,
                    const_type,
                    value: value.clone(),
                    location: element.location.clone(),
                    documentation: element.documentation.clone(),
                    namespaces: self.namespaces(program),
                },
            );
        }
        self.const_state.insert(ref_, ConstState::Done(value.clone()));
        value
    }

    /// Checks a constant expression against the type it is assigned to and lowers it.
    ///
    /// Problems are reported as [`DiagnosticKind::InvalidDefaultValue`]. `None` means the value
    /// is invalid or depends on something that failed to resolve.
    pub(super) fn check_value(
        &mut self,
        program: ProgramId,
        expected: &ThriftType,
        element: &ConstElement,
    ) -> Option<ConstValue> {
        let true_type = self.true_type(expected)?;
        let location = &element.location;
        match (&true_type, &element.value) {
            (_, ConstValueElement::Identifier(name)) => {
                self.check_identifier(program, &true_type, expected, name, location)
            }
            (ThriftType::Builtin(BuiltinType::Bool), ConstValueElement::Bool(b)) => {
                Some(ConstValue::Bool(*b))
            }
            (ThriftType::Builtin(BuiltinType::Bool), ConstValueElement::Integer(v @ (0 | 1))) => {
                Some(ConstValue::Bool(*v == 1))
            }
            (ThriftType::Builtin(builtin), ConstValueElement::Integer(v))
                if builtin.integer_range().is_some() =>
            {
                self.check_integer(*builtin, *v, location)
            }
            (ThriftType::Builtin(BuiltinType::Double), ConstValueElement::Integer(v)) => {
                Some(ConstValue::Double(*v as f64))
            }
            (ThriftType::Builtin(BuiltinType::Double), ConstValueElement::Double(v)) => {
                Some(ConstValue::Double(*v))
            }
            (
                ThriftType::Builtin(BuiltinType::String | BuiltinType::Binary),
                ConstValueElement::Literal(s),
            ) => Some(ConstValue::String(s.clone())),
            (ThriftType::Enum(enum_type), ConstValueElement::Integer(v)) => {
                self.enum_member_by_value(*enum_type, *v, location)
            }
            (ThriftType::List(element_type), ConstValueElement::List(items)) => self
                .check_all(program, element_type, items)
                .map(ConstValue::List),
            (ThriftType::Set(element_type), ConstValueElement::List(items)) => self
                .check_all(program, element_type, items)
                .map(ConstValue::Set),
            (ThriftType::Map(key_type, value_type), ConstValueElement::Map(entries)) => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| {
                        let key = self.check_value(program, key_type, key);
                        let value = self.check_value(program, value_type, value);
                        Some((key?, value?))
                    })
                    .collect::<Vec<_>>();
                entries.into_iter().collect::<Option<_>>().map(ConstValue::Map)
            }
            (
                ThriftType::Struct(struct_type)
                | ThriftType::Union(struct_type)
                | ThriftType::Exception(struct_type),
                ConstValueElement::Map(entries),
            ) => self.check_struct_literal(program, *struct_type, entries, location),
            (_, value) => {
                let message = format!(
                    "expected a value of type `{}`, found {}",
                    self.type_name(expected),
                    describe(value)
                );
                self.diagnostics
                    .error(DiagnosticKind::InvalidDefaultValue, message, location);
                None
            }
        }
    }

    /// Checks every element, reporting all failures rather than only the first.
    fn check_all(
        &mut self,
        program: ProgramId,
        expected: &ThriftType,
        items: &[ConstElement],
    ) -> Option<Vec<ConstValue>> {
        let values = items
            .iter()
            .map(|item| self.check_value(program, expected, item))
            .collect::<Vec<_>>();
        values.into_iter().collect()
    }

    fn check_integer(&mut self, builtin: BuiltinType, value: i64, location: &Location) -> Option<ConstValue> {
        let (min, max) = builtin.integer_range()?;
        if (min..=max).contains(&value) {
            Some(ConstValue::Integer(value))
        } else {
            self.diagnostics.error(
                DiagnosticKind::InvalidDefaultValue,
                format!("{value} is out of range for `{builtin}` ({min} to {max})"),
                location,
            );
            None
        }
    }

    fn enum_member_by_value(
        &mut self,
        enum_type: Ref<EnumType>,
        value: i64,
        location: &Location,
    ) -> Option<ConstValue> {
        let enum_ = self.table.try_get(enum_type)?;
        if let Some((member, _)) = enum_.find_by_value(value) {
            return Some(ConstValue::Enum { enum_type, member });
        }
        let message = format!("no member of enum `{}` has value {value}", enum_.name);
        self.diagnostics
            .error(DiagnosticKind::InvalidDefaultValue, message, location);
        None
    }

    /// Resolves `Enum.MEMBER` or `program.Enum.MEMBER` against `enum_type`.
    fn enum_member_by_name(
        &self,
        program: ProgramId,
        enum_type: Ref<EnumType>,
        name: &str,
    ) -> Option<ConstValue> {
        let (type_name, member_name) = name.rsplit_once('.')?;
        match self.lookup(program, type_name)? {
            Symbol::Enum(found) if found == enum_type => {}
            _ => return None,
        }
        let (member, _) = self.table.try_get(enum_type)?.find_by_name(member_name)?;
        Some(ConstValue::Enum { enum_type, member })
    }

    fn check_identifier(
        &mut self,
        program: ProgramId,
        true_type: &ThriftType,
        expected: &ThriftType,
        name: &str,
        location: &Location,
    ) -> Option<ConstValue> {
        if let ThriftType::Enum(enum_type) = true_type {
            if let Some(value) = self.enum_member_by_name(program, *enum_type, name) {
                return Some(value);
            }
        }
        if let Some(Symbol::Const(constant)) = self.lookup(program, name) {
            return self.check_const_reference(expected, constant, name, location);
        }
        let message = match true_type {
            ThriftType::Enum(enum_type) => format!(
                "`{name}` is not a member of enum `{}`",
                self.component_name(*enum_type)
            ),
            _ => format!("unknown constant `{name}`"),
        };
        self.diagnostics
            .error(DiagnosticKind::InvalidDefaultValue, message, location);
        None
    }

    /// Inlines the value of another constant.
    ///
    /// The referenced constant's expression is re-checked against the type expected here, so a
    /// large `i64` constant is still rejected where an `i16` is expected.
    fn check_const_reference(
        &mut self,
        expected: &ThriftType,
        constant: Ref<Constant>,
        name: &str,
        location: &Location,
    ) -> Option<ConstValue> {
        if matches!(self.const_state.get(&constant), Some(ConstState::InProgress)) {
            self.diagnostics.error(
                DiagnosticKind::InvalidDefaultValue,
                format!("constant `{name}` refers to itself"),
                location,
            );
            return None;
        }
        self.resolve_constant(constant)?;
        let (constant_program, element) = *self.constants.get(&constant)?;

        let outer = std::mem::take(&mut self.diagnostics);
        let value = self.check_value(constant_program, expected, &element.value);
        let inner = std::mem::replace(&mut self.diagnostics, outer);

        match value {
            Some(value) if inner.is_empty() => Some(value),
            _ => {
                let message = format!(
                    "constant `{name}` cannot be used as a value of type `{}`",
                    self.type_name(expected)
                );
                self.diagnostics
                    .error(DiagnosticKind::InvalidDefaultValue, message, location);
                None
            }
        }
    }

    /// A struct value written as a map from field names to values.
    fn check_struct_literal(
        &mut self,
        program: ProgramId,
        struct_ref: Ref<StructType>,
        entries: &[(ConstElement, ConstElement)],
        location: &Location,
    ) -> Option<ConstValue> {
        let struct_type = self.table.try_get(struct_ref)?;
        let struct_name = struct_type.name.clone();
        let is_union = struct_type.is_union();
        let fields: Vec<(String, ThriftType)> = struct_type
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.field_type.clone()))
            .collect();

        let mut values: Vec<(usize, ConstValue)> = Vec::new();
        let mut valid = true;
        for (key, value) in entries {
            let ConstValueElement::Literal(field_name) = &key.value else {
                self.diagnostics.error(
                    DiagnosticKind::InvalidDefaultValue,
                    format!("field names of a `{struct_name}` value must be string literals"),
                    &key.location,
                );
                valid = false;
                continue;
            };
            let Some(index) = fields.iter().position(|(name, _)| name == field_name) else {
                self.diagnostics.error(
                    DiagnosticKind::InvalidDefaultValue,
                    format!("`{struct_name}` has no field named `{field_name}`"),
                    &key.location,
                );
                valid = false;
                continue;
            };
            if values.iter().any(|(i, _)| *i == index) {
                self.diagnostics.error(
                    DiagnosticKind::InvalidDefaultValue,
                    format!("field `{field_name}` of `{struct_name}` is given more than once"),
                    &key.location,
                );
                valid = false;
                continue;
            }
            match self.check_value(program, &fields[index].1, value) {
                Some(value) => values.push((index, value)),
                None => valid = false,
            }
        }

        if let Some(element) = self.struct_elements.get(&struct_ref) {
            let missing = element
                .fields
                .iter()
                .enumerate()
                .filter(|(index, field)| {
                    field.requiredness == Requiredness::Required
                        && field.default_value.is_none()
                        && !values.iter().any(|(i, _)| i == index)
                })
                .map(|(_, field)| field.name.clone())
                .collect::<Vec<_>>();
            for field_name in missing {
                self.diagnostics.error(
                    DiagnosticKind::InvalidDefaultValue,
                    format!("missing required field `{field_name}` of `{struct_name}`"),
                    location,
                );
                valid = false;
            }
        }
        if is_union && values.len() > 1 {
            self.diagnostics.error(
                DiagnosticKind::InvalidDefaultValue,
                format!("a value of union `{struct_name}` must set exactly one field"),
                location,
            );
            valid = false;
        }

        valid.then_some(ConstValue::Struct {
            struct_type: struct_ref,
            fields: values,
        })
    }
}
