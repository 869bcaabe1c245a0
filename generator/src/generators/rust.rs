use std::collections::HashMap;

use quote::format_ident;
use syn::{
    Arm, Attribute, Expr, Ident, ImplItemFn, Item, LitByteStr, LitFloat, LitInt, Path,
    TraitItemFn, Type, __private::Span, parse_quote,
};
use thrift_schema::{
    BuiltinType, Component, ConstValue, Constant, EnumType, Field, NamespaceScope, ProgramId,
    Ref, Schema, ServiceMethod, ServiceType, StructKind, StructType, ThriftType, TypedefType,
};
use tracing::{debug, info_span};

use super::common::{resolve_modules, ComponentVisitor, GeneratorContext};
use super::{EntityKind, GeneratedEntity};
use crate::config::{FieldNaming, GeneratorConfig};
use crate::error::{GenerateError, GenerateErrors};
use crate::naming::{
    const_ident, field_ident, field_name, file_stem, name_to_ident, snake_ident, type_ident,
    type_name,
};

/// The items generated for one schema entity.
pub(super) struct RustEntity {
    /// Name of the primary item.
    name: String,
    /// Every name the entity adds to its module.
    exported: Vec<String>,
    items: Vec<Item>,
}

struct RustVisitor {
    root: Path,
    errors: Vec<GenerateError>,
}

/// Detects distinct schema names that map to the same Rust name.
struct NameScope {
    scope: String,
    seen: HashMap<String, String>,
    errors: Vec<GenerateError>,
}

impl NameScope {
    fn new(scope: String) -> Self {
        Self {
            scope,
            seen: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn claim(&mut self, rust_name: &str, schema_name: &str) {
        if let Some(first) = self.seen.get(rust_name) {
            self.errors.push(GenerateError::NameCollision {
                scope: self.scope.clone(),
                name: rust_name.to_owned(),
                first: first.clone(),
                second: schema_name.to_owned(),
            });
        } else {
            self.seen.insert(rust_name.to_owned(), schema_name.to_owned());
        }
    }
}

/// How a method of a service is spelled in the trait, the request and response enums, and the
/// client.
struct MethodSignature {
    ident: Ident,
    variant: Ident,
    params: Vec<Ident>,
    param_types: Vec<Type>,
    /// The error enum, as seen from the service being generated.
    error: Path,
    /// `Result<T, Error>`, or `None` for oneway methods.
    result: Option<Type>,
    docs: Vec<Attribute>,
    /// The IDL name, for messages in generated code.
    name: String,
}

fn doc_attrs(documentation: Option<&str>) -> Vec<Attribute> {
    documentation
        .into_iter()
        .flat_map(str::lines)
        .map(|line| {
            let line = match line.trim_end() {
                "" => String::new(),
                line => format!(" {line}"),
            };
            parse_quote!(#[doc = #line])
        })
        .collect()
}

fn builtin_type(builtin: BuiltinType) -> Type {
    match builtin {
        BuiltinType::Bool => parse_quote!(bool),
        BuiltinType::I8 => parse_quote!(i8),
        BuiltinType::I16 => parse_quote!(i16),
        BuiltinType::I32 => parse_quote!(i32),
        BuiltinType::I64 => parse_quote!(i64),
        BuiltinType::Double => parse_quote!(f64),
        BuiltinType::String => parse_quote!(::std::string::String),
        BuiltinType::Binary => parse_quote!(::std::vec::Vec<u8>),
    }
}

fn integer_suffix(builtin: BuiltinType) -> &'static str {
    match builtin {
        BuiltinType::I8 => "i8",
        BuiltinType::I16 => "i16",
        BuiltinType::I32 => "i32",
        BuiltinType::I64 => "i64",
        _ => "",
    }
}

fn int_literal(value: i64, suffix: &str) -> Expr {
    let literal = LitInt::new(&format!("{}{suffix}", value.unsigned_abs()), Span::call_site());
    if value < 0 {
        parse_quote!(-#literal)
    } else {
        parse_quote!(#literal)
    }
}

fn float_literal(value: f64) -> Expr {
    if value.is_nan() {
        return parse_quote!(f64::NAN);
    }
    if value.is_infinite() {
        return if value > 0.0 {
            parse_quote!(f64::INFINITY)
        } else {
            parse_quote!(f64::NEG_INFINITY)
        };
    }
    let literal = LitFloat::new(&format!("{:?}f64", value.abs()), Span::call_site());
    if value.is_sign_negative() {
        parse_quote!(-#literal)
    } else {
        parse_quote!(#literal)
    }
}

/// Format string rendering `Name{field=value, ...}`, escaped for `write!`.
fn display_format<'f>(name: &str, fields: impl IntoIterator<Item = &'f str>) -> String {
    let fields = fields
        .into_iter()
        .map(|field| format!("{field}={{:?}}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{name}{{{{{fields}}}}}")
}

fn wrap_field_value(field: &Field, boxed: bool, value: Expr) -> Expr {
    let value = if boxed {
        parse_quote!(::std::boxed::Box::new(#value))
    } else {
        value
    };
    if field.is_required() {
        value
    } else {
        parse_quote!(Some(#value))
    }
}

impl RustVisitor {
    fn new(root: Path) -> Self {
        Self {
            root,
            errors: Vec::new(),
        }
    }

    fn take_errors(&mut self) -> Vec<GenerateError> {
        std::mem::take(&mut self.errors)
    }

    fn finish_scope(&mut self, scope: NameScope) {
        self.errors.extend(scope.errors);
    }

    /// The path of a type named `name` declared by `program`, as seen from the module being
    /// generated.
    fn type_path(&self, context: &GeneratorContext, program: ProgramId, name: &Ident) -> Path {
        let module = context.module_of(program);
        if module == context.current_module.as_slice() {
            parse_quote!(super::#name)
        } else {
            let root = &self.root;
            let segments = module.iter().map(|segment| name_to_ident(segment));
            parse_quote!(#root #(::#segments)* ::#name)
        }
    }

    fn entity_path<R: Component>(&self, context: &GeneratorContext, component: &R) -> Path {
        self.type_path(context, component.program(), &type_ident(component.name()))
    }

    fn rust_type(&self, context: &GeneratorContext, ty: &ThriftType) -> Type {
        let schema = context.schema;
        let path = match ty {
            ThriftType::Builtin(builtin) => return builtin_type(*builtin),
            ThriftType::Enum(r) => self.entity_path(context, schema.get(*r)),
            ThriftType::Struct(r) | ThriftType::Union(r) | ThriftType::Exception(r) => {
                self.entity_path(context, schema.get(*r))
            }
            ThriftType::Typedef(r) => self.entity_path(context, schema.get(*r)),
            ThriftType::List(element) => {
                let element = self.rust_type(context, element);
                return parse_quote!(::std::vec::Vec<#element>);
            }
            ThriftType::Set(element) => {
                let element = self.rust_type(context, element);
                return parse_quote!(::std::collections::BTreeSet<#element>);
            }
            ThriftType::Map(key, value) => {
                let key = self.rust_type(context, key);
                let value = self.rust_type(context, value);
                return parse_quote!(::std::collections::BTreeMap<#key, #value>);
            }
        };
        parse_quote!(#path)
    }

    fn field_type(&self, context: &GeneratorContext, field: &Field, boxed: bool) -> Type {
        let mut ty = self.rust_type(context, &field.field_type);
        if boxed {
            ty = parse_quote!(::std::boxed::Box<#ty>);
        }
        if !field.is_required() {
            ty = parse_quote!(::std::option::Option<#ty>);
        }
        ty
    }

    fn boxed_fields(&self, context: &mut GeneratorContext, struct_ref: Ref<StructType>) -> Vec<bool> {
        let schema = context.schema;
        schema
            .get(struct_ref)
            .fields
            .iter()
            .map(|field| context.reaches_struct(&field.field_type, struct_ref))
            .collect()
    }

    /// The derived traits, and whether `Hash` has to be implemented by hand because a `double`
    /// is reachable.
    fn derives(&self, context: &mut GeneratorContext, struct_type: &StructType) -> (Vec<Path>, bool) {
        let mut derives: Vec<Path> = vec![parse_quote!(Debug), parse_quote!(Clone)];
        if !context.config.scaffolding {
            return (derives, false);
        }
        derives.push(parse_quote!(PartialEq));
        let has_double = struct_type
            .fields
            .iter()
            .any(|field| context.contains_double(&field.field_type));
        if has_double {
            return (derives, true);
        }
        derives.extend([
            parse_quote!(Eq),
            parse_quote!(Hash),
            parse_quote!(PartialOrd),
            parse_quote!(Ord),
        ]);
        (derives, false)
    }

    /// Feeds the value of type `ty` that `value` refers to into `state`.
    ///
    /// Doubles are hashed by their bits, with `-0.0` hashed like `0.0` so that values that
    /// compare equal hash equally.
    fn hash_value(&self, context: &mut GeneratorContext, ty: &ThriftType, value: &Ident, depth: usize) -> Expr {
        let schema = context.schema;
        if !context.contains_double(ty) {
            return parse_quote!(::std::hash::Hash::hash(#value, state));
        }
        match ty.true_type(schema) {
            ThriftType::Builtin(BuiltinType::Double) => parse_quote! {
                ::std::hash::Hasher::write_u64(state, if *#value == 0.0 { 0 } else { #value.to_bits() })
            },
            ThriftType::List(element) | ThriftType::Set(element) => {
                let item = format_ident!("item{}", depth);
                let hash = self.hash_value(context, element, &item, depth + 1);
                parse_quote!({
                    ::std::hash::Hasher::write_usize(state, #value.len());
                    for #item in #value.iter() {
                        #hash;
                    }
                })
            }
            ThriftType::Map(key_type, value_type) => {
                let key = format_ident!("key{}", depth);
                let item = format_ident!("item{}", depth);
                let key_hash = self.hash_value(context, key_type, &key, depth + 1);
                let hash = self.hash_value(context, value_type, &item, depth + 1);
                parse_quote!({
                    ::std::hash::Hasher::write_usize(state, #value.len());
                    for (#key, #item) in #value.iter() {
                        #key_hash;
                        #hash;
                    }
                })
            }
            _ => parse_quote!(::std::hash::Hash::hash(#value, state)),
        }
    }

    /// Reports every set element or map key among `types` that has no total order.
    fn check_keys<'t>(
        &mut self,
        context: &mut GeneratorContext,
        entity: &str,
        types: impl IntoIterator<Item = &'t ThriftType>,
    ) {
        for ty in types {
            if let Some(key) = context.unordered_key(ty) {
                self.errors.push(GenerateError::UnorderedKey {
                    entity: entity.to_owned(),
                    key,
                });
            }
        }
    }

    /// Lowers a linked constant value to an expression of the Rust type of `ty`.
    fn const_expr(&self, context: &mut GeneratorContext, ty: &ThriftType, value: &ConstValue) -> Expr {
        let schema = context.schema;
        match (ty.true_type(schema), value) {
            (_, ConstValue::Bool(value)) => parse_quote!(#value),
            (ThriftType::Builtin(builtin), ConstValue::Integer(value)) => {
                int_literal(*value, integer_suffix(*builtin))
            }
            (_, ConstValue::Integer(value)) => int_literal(*value, ""),
            (_, ConstValue::Double(value)) => float_literal(*value),
            (ThriftType::Builtin(BuiltinType::Binary), ConstValue::String(value)) => {
                let bytes = LitByteStr::new(value.as_bytes(), Span::call_site());
                parse_quote!(#bytes.to_vec())
            }
            (_, ConstValue::String(value)) => parse_quote!(::std::string::String::from(#value)),
            (_, ConstValue::Enum { enum_type, member }) => {
                let enum_type = schema.get(*enum_type);
                let path = self.entity_path(context, enum_type);
                let variant = type_ident(&enum_type.members[*member].name);
                parse_quote!(#path::#variant)
            }
            (ThriftType::List(element), ConstValue::List(items)) => {
                let items = items
                    .iter()
                    .map(|item| self.const_expr(context, element, item))
                    .collect::<Vec<_>>();
                parse_quote!(::std::vec![#(#items),*])
            }
            (ThriftType::Set(element), ConstValue::Set(items)) => {
                let items = items
                    .iter()
                    .map(|item| self.const_expr(context, element, item))
                    .collect::<Vec<_>>();
                parse_quote!(::std::collections::BTreeSet::from([#(#items),*]))
            }
            (ThriftType::Map(key_type, value_type), ConstValue::Map(entries)) => {
                let mut keys = Vec::with_capacity(entries.len());
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    keys.push(self.const_expr(context, key_type, key));
                    values.push(self.const_expr(context, value_type, value));
                }
                parse_quote!(::std::collections::BTreeMap::from([#((#keys, #values)),*]))
            }
            (_, ConstValue::Struct { struct_type, fields }) => {
                self.struct_literal(context, *struct_type, fields)
            }
            (ty, value) => unreachable!(
                "constant {value:?} was not checked against {}",
                ty.display(schema)
            ),
        }
    }

    /// A struct value built through the generated constructor.
    fn struct_literal(
        &self,
        context: &mut GeneratorContext,
        struct_ref: Ref<StructType>,
        values: &[(usize, ConstValue)],
    ) -> Expr {
        let schema = context.schema;
        let struct_type = schema.get(struct_ref);
        let path = self.entity_path(context, struct_type);
        let boxed = self.boxed_fields(context, struct_ref);

        if struct_type.is_union() {
            let Some((index, value)) = values.first() else {
                return parse_quote!(#path::Unset);
            };
            let field = &struct_type.fields[*index];
            let variant = type_ident(&field.name);
            let mut value = self.const_expr(context, &field.field_type, value);
            if boxed[*index] {
                value = parse_quote!(::std::boxed::Box::new(#value));
            }
            return parse_quote!(#path::#variant(#value));
        }

        let naming = context.config.field_naming;
        let mut args = Vec::new();
        let mut idents = Vec::new();
        let mut assigned = Vec::new();
        for (index, field) in struct_type.fields.iter().enumerate() {
            let Some((_, value)) = values.iter().find(|(i, _)| *i == index) else {
                continue;
            };
            let value = self.const_expr(context, &field.field_type, value);
            if field.is_required() && field.default_value.is_none() {
                args.push(value);
            } else {
                idents.push(field_ident(&field.name, naming));
                assigned.push(wrap_field_value(field, boxed[index], value));
            }
        }
        if idents.is_empty() {
            parse_quote!(#path::new(#(#args),*))
        } else {
            parse_quote!({
                let mut value = #path::new(#(#args),*);
                #(value.#idents = #assigned;)*
                value
            })
        }
    }

    fn struct_items(&mut self, context: &mut GeneratorContext, struct_ref: Ref<StructType>) -> RustEntity {
        let schema = context.schema;
        let struct_type = schema.get(struct_ref);
        let naming = context.config.field_naming;
        let name = type_ident(&struct_type.name);
        let qualified_name = schema.qualified_name(struct_ref);

        let mut fields = NameScope::new(format!("{} `{qualified_name}`", struct_type.kind.keyword()));
        let mut setters = NameScope::new(format!("the methods of `{qualified_name}`"));
        let boxed = self.boxed_fields(context, struct_ref);
        let idents: Vec<Ident> = struct_type
            .fields
            .iter()
            .map(|field| {
                let ident = field_ident(&field.name, naming);
                fields.claim(&ident.to_string(), &field.name);
                ident
            })
            .collect();
        let types: Vec<Type> = struct_type
            .fields
            .iter()
            .zip(&boxed)
            .map(|(field, boxed)| self.field_type(context, field, *boxed))
            .collect();
        let field_docs: Vec<Vec<Attribute>> = struct_type
            .fields
            .iter()
            .map(|field| doc_attrs(field.documentation.as_deref()))
            .collect();
        let docs = doc_attrs(struct_type.documentation.as_deref());
        let (derives, manual_hash) = self.derives(context, struct_type);
        self.check_keys(
            context,
            &qualified_name,
            struct_type.fields.iter().map(|field| &field.field_type),
        );

        let mut items: Vec<Item> = vec![parse_quote! {
            #(#docs)*
            #[derive(#(#derives),*)]
            pub struct #name {
                #(
                    #(#field_docs)*
                    pub #idents: #types,
                )*
            }
        }];

        let mut params = Vec::new();
        let mut param_types = Vec::new();
        let mut inits: Vec<Expr> = Vec::new();
        let mut setter_fns: Vec<ImplItemFn> = Vec::new();
        for ((field, ident), boxed) in struct_type.fields.iter().zip(&idents).zip(&boxed) {
            let value = match &field.default_value {
                Some(default) => {
                    let value = self.const_expr(context, &field.field_type, default);
                    wrap_field_value(field, *boxed, value)
                }
                None if field.is_required() => {
                    params.push(ident.clone());
                    param_types.push(self.rust_type(context, &field.field_type));
                    wrap_field_value(field, *boxed, parse_quote!(#ident))
                }
                None => parse_quote!(None),
            };
            inits.push(value);

            if !field.is_required() {
                let setter_name = format!("with_{}", field_name(&field.name, FieldNaming::Snake));
                setters.claim(&setter_name, &field.name);
                let setter = name_to_ident(&setter_name);
                let base = self.rust_type(context, &field.field_type);
                let value = wrap_field_value(field, *boxed, parse_quote!(#ident));
                setter_fns.push(parse_quote! {
                    pub fn #setter(mut self, #ident: #base) -> Self {
                        self.#ident = #value;
                        self
                    }
                });
            }
        }
        let many_arguments: Option<Attribute> =
            (params.len() > 7).then(|| parse_quote!(#[allow(clippy::too_many_arguments)]));
        items.push(parse_quote! {
            impl #name {
                #many_arguments
                pub fn new(#(#params: #param_types),*) -> Self {
                    Self {
                        #(#idents: #inits,)*
                    }
                }

                #(#setter_fns)*
            }
        });
        if params.is_empty() {
            items.push(parse_quote! {
                impl ::std::default::Default for #name {
                    fn default() -> Self {
                        Self::new()
                    }
                }
            });
        }

        if manual_hash {
            let value = format_ident!("value");
            let mut hashes: Vec<Expr> = Vec::new();
            for (field, ident) in struct_type.fields.iter().zip(&idents) {
                let hash = self.hash_value(context, &field.field_type, &value, 0);
                hashes.push(if field.is_required() {
                    parse_quote!({
                        let value = &self.#ident;
                        #hash;
                    })
                } else {
                    parse_quote! {
                        match &self.#ident {
                            Some(value) => {
                                ::std::hash::Hasher::write_u8(state, 1);
                                #hash;
                            }
                            None => ::std::hash::Hasher::write_u8(state, 0),
                        }
                    }
                });
            }
            items.push(parse_quote! {
                impl ::std::hash::Hash for #name {
                    fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                        #(#hashes;)*
                    }
                }
            });
        }

        if context.config.scaffolding || struct_type.is_exception() {
            let format = display_format(
                &struct_type.name,
                struct_type.fields.iter().map(|field| field.name.as_str()),
            );
            items.push(parse_quote! {
                impl ::std::fmt::Display for #name {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        ::std::write!(f, #format #(, self.#idents)*)
                    }
                }
            });
        }
        if struct_type.is_exception() {
            items.push(parse_quote! {
                impl ::std::error::Error for #name {}
            });
        }

        self.finish_scope(fields);
        self.finish_scope(setters);
        RustEntity {
            name: name.to_string(),
            exported: vec![name.to_string()],
            items,
        }
    }

    fn union_items(&mut self, context: &mut GeneratorContext, union_ref: Ref<StructType>) -> RustEntity {
        let schema = context.schema;
        let union_type = schema.get(union_ref);
        let name = type_ident(&union_type.name);
        let qualified_name = schema.qualified_name(union_ref);

        let mut variant_names = NameScope::new(format!("union `{qualified_name}`"));
        let mut accessor_names = NameScope::new(format!("the methods of `{qualified_name}`"));
        variant_names.claim("Unset", "the unset state");
        accessor_names.claim("is_set", "the set check");

        let boxed = self.boxed_fields(context, union_ref);
        let mut variants = Vec::new();
        let mut accessors = Vec::new();
        let mut types: Vec<Type> = Vec::new();
        let mut bases: Vec<Type> = Vec::new();
        let mut reads: Vec<Expr> = Vec::new();
        let mut field_docs = Vec::new();
        for (field, boxed) in union_type.fields.iter().zip(&boxed) {
            let variant = type_ident(&field.name);
            variant_names.claim(&variant.to_string(), &field.name);
            let accessor = snake_ident(&field.name);
            accessor_names.claim(&accessor.to_string(), &field.name);

            let base = self.rust_type(context, &field.field_type);
            if *boxed {
                types.push(parse_quote!(::std::boxed::Box<#base>));
                reads.push(parse_quote!(&**value));
            } else {
                types.push(base.clone());
                reads.push(parse_quote!(value));
            }
            bases.push(base);
            variants.push(variant);
            accessors.push(accessor);
            field_docs.push(doc_attrs(field.documentation.as_deref()));
        }

        let default_field = union_type
            .fields
            .iter()
            .enumerate()
            .find_map(|(index, field)| Some((index, field.default_value.as_ref()?)));
        let (mut derives, manual_hash) = self.derives(context, union_type);
        self.check_keys(
            context,
            &qualified_name,
            union_type.fields.iter().map(|field| &field.field_type),
        );
        let unset_attr: Option<Attribute> = match default_field {
            Some(_) => None,
            None => {
                derives.push(parse_quote!(Default));
                Some(parse_quote!(#[default]))
            }
        };
        let docs = doc_attrs(union_type.documentation.as_deref());

        let mut items: Vec<Item> = vec![
            parse_quote! {
                #(#docs)*
                #[derive(#(#derives),*)]
                pub enum #name {
                    #unset_attr
                    Unset,
                    #(
                        #(#field_docs)*
                        #variants(#types),
                    )*
                }
            },
            parse_quote! {
                impl #name {
                    pub fn is_set(&self) -> bool {
                        !matches!(self, Self::Unset)
                    }

                    #(
                        pub fn #accessors(&self) -> ::std::option::Option<&#bases> {
                            match self {
                                Self::#variants(value) => Some(#reads),
                                _ => None,
                            }
                        }
                    )*
                }
            },
        ];

        if let Some((index, default)) = default_field {
            let field = &union_type.fields[index];
            let variant = &variants[index];
            let mut value = self.const_expr(context, &field.field_type, default);
            if boxed[index] {
                value = parse_quote!(::std::boxed::Box::new(#value));
            }
            items.push(parse_quote! {
                impl ::std::default::Default for #name {
                    fn default() -> Self {
                        Self::#variant(#value)
                    }
                }
            });
        }

        if manual_hash {
            let value = format_ident!("value");
            let mut hashes: Vec<Expr> = Vec::new();
            for field in &union_type.fields {
                hashes.push(self.hash_value(context, &field.field_type, &value, 0));
            }
            items.push(parse_quote! {
                impl ::std::hash::Hash for #name {
                    fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                        ::std::hash::Hash::hash(&::std::mem::discriminant(self), state);
                        match self {
                            Self::Unset => {}
                            #(Self::#variants(value) => {
                                #hashes;
                            })*
                        }
                    }
                }
            });
        }

        if context.config.scaffolding {
            let unset = format!("{}{{}}", union_type.name);
            let formats = union_type
                .fields
                .iter()
                .map(|field| display_format(&union_type.name, [field.name.as_str()]));
            items.push(parse_quote! {
                impl ::std::fmt::Display for #name {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        match self {
                            Self::Unset => f.write_str(#unset),
                            #(Self::#variants(value) => ::std::write!(f, #formats, value),)*
                        }
                    }
                }
            });
        }

        self.finish_scope(variant_names);
        self.finish_scope(accessor_names);
        RustEntity {
            name: name.to_string(),
            exported: vec![name.to_string()],
            items,
        }
    }

    fn error_ident(service: &ServiceType, method: &ServiceMethod) -> Ident {
        format_ident!("{}{}Error", type_name(&service.name), type_name(&method.name))
    }

    fn method_signature(
        &self,
        context: &GeneratorContext,
        current: Ref<ServiceType>,
        owner: Ref<ServiceType>,
        method: &ServiceMethod,
    ) -> MethodSignature {
        let owner_service = context.schema.get(owner);
        let error_ident = Self::error_ident(owner_service, method);
        let error: Path = if owner == current {
            parse_quote!(#error_ident)
        } else {
            self.type_path(context, owner_service.program, &error_ident)
        };
        let params = method
            .params
            .iter()
            .map(|param| field_ident(&param.name, context.config.field_naming))
            .collect();
        let param_types = method
            .params
            .iter()
            .map(|param| {
                let ty = self.rust_type(context, &param.field_type);
                if param.is_optional() {
                    parse_quote!(::std::option::Option<#ty>)
                } else {
                    ty
                }
            })
            .collect();
        let result = (!method.oneway).then(|| {
            let success = match &method.return_type {
                Some(return_type) => self.rust_type(context, return_type),
                None => parse_quote!(()),
            };
            parse_quote!(::std::result::Result<#success, #error>)
        });
        MethodSignature {
            ident: snake_ident(&method.name),
            variant: type_ident(&method.name),
            params,
            param_types,
            error,
            result,
            docs: doc_attrs(method.documentation.as_deref()),
            name: method.name.clone(),
        }
    }

    /// One error enum per method, with a variant per declared exception.
    fn error_enum(&mut self, context: &GeneratorContext, service: &ServiceType, method: &ServiceMethod) -> Vec<Item> {
        let error = Self::error_ident(service, method);
        let mut variant_names = NameScope::new(format!("error enum `{error}`"));
        variant_names.claim("Application", "application errors");
        let variants: Vec<Ident> = method
            .exceptions
            .iter()
            .map(|exception| {
                let variant = type_ident(&exception.name);
                variant_names.claim(&variant.to_string(), &exception.name);
                variant
            })
            .collect();
        let types: Vec<Type> = method
            .exceptions
            .iter()
            .map(|exception| self.rust_type(context, &exception.field_type))
            .collect();
        self.finish_scope(variant_names);

        let mut derives: Vec<Path> = vec![parse_quote!(Debug), parse_quote!(Clone)];
        if context.config.scaffolding {
            derives.push(parse_quote!(PartialEq));
        }
        let doc = format!(" Errors returned by `{}.{}`.", service.name, method.name);
        vec![
            parse_quote! {
                #[doc = #doc]
                #[derive(#(#derives),*)]
                pub enum #error {
                    #(#variants(#types),)*
                    /// Failures not declared by the method, such as transport problems.
                    Application(::std::string::String),
                }
            },
            parse_quote! {
                impl ::std::fmt::Display for #error {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        match self {
                            #(Self::#variants(error) => ::std::fmt::Display::fmt(error, f),)*
                            Self::Application(message) => ::std::write!(f, "application error: {message}"),
                        }
                    }
                }
            },
            parse_quote! {
                impl ::std::error::Error for #error {}
            },
        ]
    }
}

impl ComponentVisitor for RustVisitor {
    type EnumValue = RustEntity;
    fn visit_enum(&mut self, context: &mut GeneratorContext, enum_ref: Ref<EnumType>) -> RustEntity {
        let schema = context.schema;
        let enum_type = schema.get(enum_ref);
        let name = type_ident(&enum_type.name);
        let mut members = NameScope::new(format!("enum `{}`", schema.qualified_name(enum_ref)));

        let variants: Vec<Ident> = enum_type
            .members
            .iter()
            .map(|member| {
                let variant = type_ident(&member.name);
                members.claim(&variant.to_string(), &member.name);
                variant
            })
            .collect();
        let values: Vec<Expr> = enum_type
            .members
            .iter()
            .map(|member| int_literal(member.value.into(), ""))
            .collect();
        let member_names: Vec<&str> = enum_type.members.iter().map(|m| m.name.as_str()).collect();
        let member_docs: Vec<Vec<Attribute>> = enum_type
            .members
            .iter()
            .map(|member| doc_attrs(member.documentation.as_deref()))
            .collect();
        let docs = doc_attrs(enum_type.documentation.as_deref());
        // zero-variant enums cannot have a representation
        let repr: Option<Attribute> =
            (!variants.is_empty()).then(|| parse_quote!(#[repr(i32)]));
        self.finish_scope(members);

        let items = vec![
            parse_quote! {
                #(#docs)*
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
                #repr
                pub enum #name {
                    #(
                        #(#member_docs)*
                        #variants = #values,
                    )*
                }
            },
            parse_quote! {
                impl #name {
                    pub const VALUES: &'static [Self] = &[#(Self::#variants),*];

                    pub fn value(self) -> i32 {
                        match self {
                            #(Self::#variants => #values,)*
                        }
                    }

                    pub fn find_by_value(value: i32) -> ::std::option::Option<Self> {
                        match value {
                            #(#values => Some(Self::#variants),)*
                            _ => None,
                        }
                    }
                }
            },
            parse_quote! {
                impl ::std::convert::TryFrom<i32> for #name {
                    type Error = i32;

                    fn try_from(value: i32) -> ::std::result::Result<Self, i32> {
                        Self::find_by_value(value).ok_or(value)
                    }
                }
            },
            parse_quote! {
                impl ::std::fmt::Display for #name {
                    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        f.write_str(match self {
                            #(Self::#variants => #member_names,)*
                        })
                    }
                }
            },
        ];
        RustEntity {
            name: name.to_string(),
            exported: vec![name.to_string()],
            items,
        }
    }

    type StructValue = RustEntity;
    fn visit_struct(&mut self, context: &mut GeneratorContext, struct_ref: Ref<StructType>) -> RustEntity {
        match context.schema.get(struct_ref).kind {
            StructKind::Struct | StructKind::Exception => self.struct_items(context, struct_ref),
            StructKind::Union => self.union_items(context, struct_ref),
        }
    }

    type TypedefValue = RustEntity;
    fn visit_typedef(&mut self, context: &mut GeneratorContext, typedef_ref: Ref<TypedefType>) -> RustEntity {
        let schema = context.schema;
        let typedef = schema.get(typedef_ref);
        let name = type_ident(&typedef.name);
        self.check_keys(context, &schema.qualified_name(typedef_ref), [&typedef.old_type]);
        let target = self.rust_type(context, &typedef.old_type);
        let docs = doc_attrs(typedef.documentation.as_deref());
        RustEntity {
            name: name.to_string(),
            exported: vec![name.to_string()],
            items: vec![parse_quote! {
                #(#docs)*
                pub type #name = #target;
            }],
        }
    }

    type ServiceValue = RustEntity;
    fn visit_service(&mut self, context: &mut GeneratorContext, service_ref: Ref<ServiceType>) -> RustEntity {
        let schema = context.schema;
        let service = schema.get(service_ref);
        let qualified_name = schema.qualified_name(service_ref);
        let name = type_ident(&service.name);
        let request = format_ident!("{}Request", name);
        let response = format_ident!("{}Response", name);
        let client = format_ident!("{}Client", name);
        let dispatch = snake_ident(&format!("dispatch_{}", service.name));

        // own methods first, then each ancestor's, nearest first
        let owners: Vec<Ref<ServiceType>> = std::iter::once(service_ref)
            .chain(service.ancestors(schema))
            .collect();
        let signatures: Vec<(Ref<ServiceType>, MethodSignature)> = owners
            .iter()
            .flat_map(|owner| {
                schema
                    .get(*owner)
                    .methods
                    .iter()
                    .map(move |method| (*owner, method))
            })
            .map(|(owner, method)| (owner, self.method_signature(context, service_ref, owner, method)))
            .collect();

        let mut variant_names = NameScope::new(format!("the requests of service `{qualified_name}`"));
        let mut method_names = NameScope::new(format!("the methods of service `{qualified_name}`"));
        for (_, signature) in &signatures {
            variant_names.claim(&signature.variant.to_string(), &signature.name);
            method_names.claim(&signature.ident.to_string(), &signature.name);
        }
        self.finish_scope(variant_names);
        self.finish_scope(method_names);

        for method in &service.methods {
            let types = method
                .params
                .iter()
                .chain(&method.exceptions)
                .map(|field| &field.field_type)
                .chain(&method.return_type);
            self.check_keys(context, &qualified_name, types);
        }

        let mut items: Vec<Item> = Vec::new();
        let mut exported = vec![
            name.to_string(),
            request.to_string(),
            response.to_string(),
            client.to_string(),
            dispatch.to_string(),
        ];
        for method in &service.methods {
            exported.push(Self::error_ident(service, method).to_string());
            items.extend(self.error_enum(context, service, method));
        }

        let trait_fns: Vec<TraitItemFn> = signatures
            .iter()
            .filter(|(owner, _)| *owner == service_ref)
            .map(|(_, signature)| {
                let MethodSignature {
                    ident, params, param_types, result, docs, ..
                } = signature;
                match result {
                    Some(result) => parse_quote! {
                        #(#docs)*
                        fn #ident(&mut self, #(#params: #param_types),*) -> #result;
                    },
                    None => parse_quote! {
                        #(#docs)*
                        fn #ident(&mut self, #(#params: #param_types),*);
                    },
                }
            })
            .collect();
        let docs = doc_attrs(service.documentation.as_deref());
        items.push(match service.extends {
            Some(parent) => {
                let parent = self.entity_path(context, schema.get(parent));
                parse_quote! {
                    #(#docs)*
                    pub trait #name: #parent {
                        #(#trait_fns)*
                    }
                }
            }
            None => parse_quote! {
                #(#docs)*
                pub trait #name {
                    #(#trait_fns)*
                }
            },
        });

        let mut derives: Vec<Path> = vec![parse_quote!(Debug), parse_quote!(Clone)];
        if context.config.scaffolding {
            derives.push(parse_quote!(PartialEq));
        }
        let request_variants = signatures.iter().map(|(_, s)| &s.variant);
        let request_params = signatures.iter().map(|(_, s)| &s.params);
        let request_types = signatures.iter().map(|(_, s)| &s.param_types);
        let request_doc = format!(" A call to any method of `{}`.", service.name);
        items.push(parse_quote! {
            #[doc = #request_doc]
            #[derive(#(#derives),*)]
            pub enum #request {
                #(#request_variants { #(#request_params: #request_types),* },)*
            }
        });
        let answered = || {
            signatures
                .iter()
                .filter_map(|(_, s)| Some((&s.variant, s.result.as_ref()?)))
        };
        let response_variants = answered().map(|(variant, _)| variant);
        let response_types = answered().map(|(_, result)| result);
        let response_doc = format!(" The outcome of a call to a method of `{}`.", service.name);
        items.push(parse_quote! {
            #[doc = #response_doc]
            #[derive(#(#derives),*)]
            pub enum #response {
                #(#response_variants(#response_types),)*
            }
        });

        let arms: Vec<Arm> = signatures
            .iter()
            .map(|(_, signature)| {
                let MethodSignature {
                    ident, variant, params, result, ..
                } = signature;
                let args: Vec<Ident> = (0..params.len()).map(|i| format_ident!("arg{}", i)).collect();
                match result {
                    Some(_) => parse_quote! {
                        #request::#variant { #(#params: #args),* } => {
                            Some(#response::#variant(handler.#ident(#(#args),*)))
                        }
                    },
                    None => parse_quote! {
                        #request::#variant { #(#params: #args),* } => {
                            handler.#ident(#(#args),*);
                            None
                        }
                    },
                }
            })
            .collect();
        let dispatch_doc = format!(
            " Calls the `{}` method named by `request`. Oneway methods produce no response.",
            service.name
        );
        items.push(parse_quote! {
            #[doc = #dispatch_doc]
            pub fn #dispatch<H>(handler: &mut H, request: #request) -> ::std::option::Option<#response>
            where
                H: #name + ?Sized,
            {
                match request {
                    #(#arms)*
                }
            }
        });

        let client_doc = format!(
            " Calls `{}` through a transport that delivers a request and returns its response.",
            service.name
        );
        items.push(parse_quote! {
            #[doc = #client_doc]
            pub struct #client<T> {
                transport: T,
            }
        });
        items.push(parse_quote! {
            impl<T> #client<T>
            where
                T: FnMut(#request) -> ::std::option::Option<#response>,
            {
                pub fn new(transport: T) -> Self {
                    Self { transport }
                }

                pub fn into_inner(self) -> T {
                    self.transport
                }
            }
        });
        for owner in &owners {
            let trait_path: Path = if *owner == service_ref {
                parse_quote!(#name)
            } else {
                self.entity_path(context, schema.get(*owner))
            };
            let fns: Vec<ImplItemFn> = signatures
                .iter()
                .filter(|(o, _)| o == owner)
                .map(|(_, signature)| {
                    let MethodSignature {
                        ident,
                        variant,
                        params,
                        param_types,
                        error,
                        result,
                        name,
                        ..
                    } = signature;
                    match result {
                        Some(result) => {
                            let message = format!("unexpected response to `{name}`");
                            parse_quote! {
                                fn #ident(&mut self, #(#params: #param_types),*) -> #result {
                                    match (self.transport)(#request::#variant { #(#params),* }) {
                                        Some(#response::#variant(result)) => result,
                                        _ => Err(#error::Application(#message.to_owned())),
                                    }
                                }
                            }
                        }
                        None => parse_quote! {
                            fn #ident(&mut self, #(#params: #param_types),*) {
                                let _ = (self.transport)(#request::#variant { #(#params),* });
                            }
                        },
                    }
                })
                .collect();
            items.push(parse_quote! {
                impl<T> #trait_path for #client<T>
                where
                    T: FnMut(#request) -> ::std::option::Option<#response>,
                {
                    #(#fns)*
                }
            });
        }

        RustEntity {
            name: name.to_string(),
            exported,
            items,
        }
    }

    type ConstantValue = RustEntity;
    fn visit_constant(&mut self, context: &mut GeneratorContext, constant_ref: Ref<Constant>) -> RustEntity {
        let schema = context.schema;
        let constant = schema.get(constant_ref);
        let docs = doc_attrs(constant.documentation.as_deref());
        let declared = self.rust_type(context, &constant.const_type);
        self.check_keys(context, &schema.qualified_name(constant_ref), [&constant.const_type]);

        let (ident, item): (Ident, Item) = match (constant.const_type.true_type(schema), &constant.value) {
            (ThriftType::Builtin(BuiltinType::String), ConstValue::String(value)) => {
                let ident = const_ident(&constant.name);
                let item = parse_quote! {
                    #(#docs)*
                    pub const #ident: &str = #value;
                };
                (ident, item)
            }
            (ThriftType::Builtin(BuiltinType::Binary), ConstValue::String(value)) => {
                let ident = const_ident(&constant.name);
                let bytes = LitByteStr::new(value.as_bytes(), Span::call_site());
                let item = parse_quote! {
                    #(#docs)*
                    pub const #ident: &[u8] = #bytes;
                };
                (ident, item)
            }
            (ThriftType::Builtin(_) | ThriftType::Enum(_), _) => {
                let ident = const_ident(&constant.name);
                let value = self.const_expr(context, &constant.const_type, &constant.value);
                let item = parse_quote! {
                    #(#docs)*
                    pub const #ident: #declared = #value;
                };
                (ident, item)
            }
            _ => {
                let ident = snake_ident(&constant.name);
                let value = self.const_expr(context, &constant.const_type, &constant.value);
                let item = parse_quote! {
                    #(#docs)*
                    pub fn #ident() -> #declared {
                        #value
                    }
                };
                (ident, item)
            }
        };
        let name = ident.to_string();
        RustEntity {
            name: name.clone(),
            exported: vec![name],
            items: vec![item],
        }
    }
}

/// Collects generated entities, checking that names are unique within each module.
struct Output<'c> {
    config: &'c GeneratorConfig,
    entities: Vec<GeneratedEntity>,
    errors: Vec<GenerateError>,
    /// Module-level names and file names, with the entity or package module that claimed them.
    claimed: HashMap<(Vec<String>, String), String>,
}

impl<'c> Output<'c> {
    fn new(config: &'c GeneratorConfig) -> Self {
        Self {
            config,
            entities: Vec::new(),
            errors: Vec::new(),
            claimed: HashMap::new(),
        }
    }

    fn module_display(&self, module: &[String]) -> String {
        std::iter::once(self.config.root_module.as_str())
            .chain(module.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("::")
    }

    /// Claims the file name of every package module in its parent module, so that no entity
    /// file can take the place of a package directory.
    fn claim_packages<'m>(&mut self, modules: impl IntoIterator<Item = &'m [String]>) {
        for module in modules {
            for depth in 1..=module.len() {
                let key = (module[..depth - 1].to_vec(), format!("{}.rs", module[depth - 1]));
                let package = self.module_display(&module[..depth]);
                self.claimed.entry(key).or_insert(package);
            }
        }
    }

    fn add(
        &mut self,
        kind: EntityKind,
        qualified_name: String,
        module: &[String],
        entity: RustEntity,
        entity_errors: Vec<GenerateError>,
    ) {
        if !entity_errors.is_empty() {
            self.errors.extend(entity_errors);
            return;
        }

        let stem = file_stem(&entity.name);
        let claims = entity
            .exported
            .iter()
            .cloned()
            .chain(std::iter::once(format!("{stem}.rs")));
        let mut collided = false;
        for name in claims {
            let key = (module.to_vec(), name);
            match self.claimed.get(&key) {
                Some(first) => {
                    collided = true;
                    let error = GenerateError::NameCollision {
                        scope: format!("module `{}`", self.module_display(module)),
                        name: key.1.clone(),
                        first: first.clone(),
                        second: qualified_name.clone(),
                    };
                    self.errors.push(error);
                }
                None => {
                    self.claimed.insert(key, qualified_name.clone());
                }
            }
        }
        if collided {
            return;
        }

        debug!(entity = %qualified_name, module = %self.module_display(module), "generated");
        self.entities.push(GeneratedEntity {
            kind,
            qualified_name,
            name: entity.name,
            file_stem: stem,
            module: module.to_vec(),
            items: entity.items,
        });
    }
}

pub(super) fn generate(
    schema: &Schema,
    config: &GeneratorConfig,
    scope: &NamespaceScope,
) -> Result<Vec<GeneratedEntity>, GenerateErrors> {
    let _span = info_span!("generate", target = "rust").entered();

    let root: Path = syn::parse_str(&config.root_module)
        .map_err(|_| GenerateError::InvalidRootModule(config.root_module.clone()))?;
    let modules = resolve_modules(schema, scope, config).map_err(GenerateErrors)?;

    let mut context = GeneratorContext::new(schema, config, modules);
    let mut visitor = RustVisitor::new(root);
    let mut output = Output::new(config);
    output.claim_packages(
        schema
            .programs()
            .iter()
            .filter(|program| !program.is_empty())
            .map(|program| context.module_of(program.id)),
    );

    for program in schema.programs() {
        let module = context.module_of(program.id).to_vec();
        context.current_module = module.clone();

        for r in &program.enums {
            let entity = visitor.visit_enum(&mut context, *r);
            output.add(EntityKind::Enum, schema.qualified_name(*r), &module, entity, visitor.take_errors());
        }
        for r in &program.typedefs {
            let entity = visitor.visit_typedef(&mut context, *r);
            output.add(EntityKind::Typedef, schema.qualified_name(*r), &module, entity, visitor.take_errors());
        }
        for (refs, kind) in [
            (&program.structs, EntityKind::Struct),
            (&program.unions, EntityKind::Union),
            (&program.exceptions, EntityKind::Exception),
        ] {
            for r in refs {
                let entity = visitor.visit_struct(&mut context, *r);
                output.add(kind, schema.qualified_name(*r), &module, entity, visitor.take_errors());
            }
        }
        for r in &program.services {
            let entity = visitor.visit_service(&mut context, *r);
            output.add(EntityKind::Service, schema.qualified_name(*r), &module, entity, visitor.take_errors());
        }
        for r in &program.constants {
            let entity = visitor.visit_constant(&mut context, *r);
            output.add(EntityKind::Constant, schema.qualified_name(*r), &module, entity, visitor.take_errors());
        }
    }

    if output.errors.is_empty() {
        Ok(output.entities)
    } else {
        Err(GenerateErrors(output.errors))
    }
}
