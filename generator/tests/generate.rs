use std::path::PathBuf;

use pretty_assertions::assert_eq;
use quote::{quote, ToTokens};
use syn::punctuated::Punctuated;
use syn::{parse_quote, Attribute, ImplItem, Item, ItemEnum, ItemImpl, ItemStruct, Token, Type};
use thrift_generator::{
    render, render_module_tree, EntityKind, FieldNaming, GenerateError, GenerateErrors,
    GeneratedEntity, GeneratorConfig, Target,
};
use thrift_schema::{InMemoryResolver, Loader, NamespaceScope, Schema};

fn load(files: &[(&str, &str)]) -> Schema {
    let mut resolver = InMemoryResolver::new();
    for (path, source) in files {
        resolver.add_file(path, *source);
    }
    let mut loader = Loader::new();
    loader.with_resolver(resolver).jobs(4);
    for (path, _) in files {
        loader.add_thrift_file(*path);
    }
    match loader.load() {
        Ok(schema) => schema,
        Err(err) => panic!("unexpected diagnostics: {:#?}", err.diagnostics),
    }
}

fn generate_with(
    files: &[(&str, &str)],
    config: &GeneratorConfig,
) -> Result<Vec<GeneratedEntity>, GenerateErrors> {
    Target::Rust.generate(&load(files), config)
}

fn generate(files: &[(&str, &str)]) -> Vec<GeneratedEntity> {
    match generate_with(files, &GeneratorConfig::default()) {
        Ok(entities) => entities,
        Err(errors) => panic!("unexpected errors: {errors}"),
    }
}

fn entity<'e>(entities: &'e [GeneratedEntity], qualified_name: &str) -> &'e GeneratedEntity {
    entities
        .iter()
        .find(|entity| entity.qualified_name == qualified_name)
        .unwrap_or_else(|| panic!("`{qualified_name}` was not generated"))
}

/// Renders the entity and parses the result back.
fn reparse(entity: &GeneratedEntity) -> syn::File {
    let rendered = render(entity);
    syn::parse_file(&rendered.contents).expect("generated code parses")
}

fn find_struct<'f>(file: &'f syn::File, name: &str) -> &'f ItemStruct {
    file.items
        .iter()
        .find_map(|item| match item {
            Item::Struct(item) if item.ident == name => Some(item),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no struct `{name}`"))
}

fn find_enum<'f>(file: &'f syn::File, name: &str) -> &'f ItemEnum {
    file.items
        .iter()
        .find_map(|item| match item {
            Item::Enum(item) if item.ident == name => Some(item),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no enum `{name}`"))
}

fn inherent_impl<'f>(file: &'f syn::File, name: &str) -> &'f ItemImpl {
    file.items
        .iter()
        .find_map(|item| match item {
            Item::Impl(item) if item.trait_.is_none() && tokens(&item.self_ty) == name => {
                Some(item)
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no inherent impl for `{name}`"))
}

/// The last path segments of every implemented trait.
fn implemented_traits(file: &syn::File) -> Vec<String> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(ItemImpl {
                trait_: Some((_, path, _)),
                ..
            }) => Some(path.segments.last()?.ident.to_string()),
            _ => None,
        })
        .collect()
}

fn trait_impl<'f>(file: &'f syn::File, trait_name: &str) -> &'f ItemImpl {
    file.items
        .iter()
        .find_map(|item| match item {
            Item::Impl(item @ ItemImpl { trait_: Some((_, path, _)), .. })
                if path.segments.last().is_some_and(|segment| segment.ident == trait_name) =>
            {
                Some(item)
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no `{trait_name}` impl"))
}

fn tokens(tokens: impl ToTokens) -> String {
    tokens.to_token_stream().to_string()
}

fn derives(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("derive"))
        .flat_map(|attr| {
            attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
                .expect("derive list")
        })
        .map(tokens)
        .collect()
}

fn fields(item: &ItemStruct) -> Vec<(String, Type)> {
    item.fields
        .iter()
        .map(|field| {
            let name = field.ident.as_ref().expect("named field").to_string();
            (name, field.ty.clone())
        })
        .collect()
}

/// The expression a struct's `new()` assigns to `field`.
fn initializer(file: &syn::File, struct_name: &str, field: &str) -> String {
    let new = inherent_impl(file, struct_name)
        .items
        .iter()
        .find_map(|item| match item {
            ImplItem::Fn(f) if f.sig.ident == "new" => Some(f),
            _ => None,
        })
        .expect("constructor");
    let Some(syn::Stmt::Expr(syn::Expr::Struct(init), None)) = new.block.stmts.last() else {
        panic!("constructor does not end in a struct expression");
    };
    init.fields
        .iter()
        .find(|value| tokens(&value.member) == field)
        .map(|value| tokens(&value.expr))
        .unwrap_or_else(|| panic!("`{field}` is not initialized"))
}

const TYPES: &str = r#"
namespace rs demo.types

enum Foo {
  BAR = 5,
  BAZ = 10,
}

/** A point */
struct Point {
  1: required i32 x,
  2: optional i32 y,
}

struct Init {
  1: required set<Foo> f = [10],
  2: optional string b = "bar",
  3: list<Point> points,
  4: map<string, double> weights,
  5: binary blob,
  6: optional Node node,
}

struct Node {
  1: optional Node next,
  2: list<Node> children,
}

struct Empty {}
"#;

#[test]
fn struct_fields_keep_their_names_order_and_types() {
    let entities = generate(&[("types.thrift", TYPES)]);
    let init = entity(&entities, "types.Init");
    assert_eq!(init.kind, EntityKind::Struct);
    assert_eq!(init.relative_path(), PathBuf::from("demo/types/init.rs"));

    let file = reparse(init);
    let expected: Vec<(String, Type)> = vec![
        ("f".into(), parse_quote!(::std::collections::BTreeSet<super::Foo>)),
        ("b".into(), parse_quote!(::std::option::Option<::std::string::String>)),
        (
            "points".into(),
            parse_quote!(::std::option::Option<::std::vec::Vec<super::Point>>),
        ),
        (
            "weights".into(),
            parse_quote!(
                ::std::option::Option<::std::collections::BTreeMap<::std::string::String, f64>>
            ),
        ),
        ("blob".into(), parse_quote!(::std::option::Option<::std::vec::Vec<u8>>)),
        ("node".into(), parse_quote!(::std::option::Option<super::Node>)),
    ];
    assert_eq!(fields(find_struct(&file, "Init")), expected);

    let node = reparse(entity(&entities, "types.Node"));
    let expected: Vec<(String, Type)> = vec![
        (
            "next".into(),
            parse_quote!(::std::option::Option<::std::boxed::Box<super::Node>>),
        ),
        (
            "children".into(),
            parse_quote!(::std::option::Option<::std::vec::Vec<super::Node>>),
        ),
    ];
    assert_eq!(fields(find_struct(&node, "Node")), expected);

    let empty = reparse(entity(&entities, "types.Empty"));
    assert!(fields(find_struct(&empty, "Empty")).is_empty());
}

#[test]
fn structs_of_any_size_round_trip() {
    let types = ["i32", "string", "list<i64>", "bool", "map<i16, binary>", "double"];
    for n in 0..=types.len() {
        let body = (0..n)
            .map(|i| format!("  {}: required {} field_{i},\n", i + 1, types[i]))
            .collect::<String>();
        let source = format!("namespace rs shapes\nstruct Sized {{\n{body}}}\n");
        let entities = generate(&[("sized.thrift", source.as_str())]);
        let file = reparse(entity(&entities, "sized.Sized"));

        let field_types: [Type; 6] = [
            parse_quote!(i32),
            parse_quote!(::std::string::String),
            parse_quote!(::std::vec::Vec<i64>),
            parse_quote!(bool),
            parse_quote!(::std::collections::BTreeMap<i16, ::std::vec::Vec<u8>>),
            parse_quote!(f64),
        ];
        let expected: Vec<(String, Type)> = field_types
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, ty)| (format!("field_{i}"), ty))
            .collect();
        assert_eq!(fields(find_struct(&file, "Sized")), expected, "{n} fields");
    }
}

#[test]
fn default_values_become_constructor_expressions() {
    let entities = generate(&[("types.thrift", TYPES)]);
    let file = reparse(entity(&entities, "types.Init"));

    assert_eq!(
        initializer(&file, "Init", "b"),
        tokens(quote!(Some(::std::string::String::from("bar"))))
    );
    assert_eq!(
        initializer(&file, "Init", "f"),
        tokens(quote!(::std::collections::BTreeSet::from([super::Foo::Baz])))
    );
    assert_eq!(initializer(&file, "Init", "points"), "None");
    // no constructor arguments, so there is a Default
    assert!(implemented_traits(&file).contains(&"Default".to_owned()));

    let point = reparse(entity(&entities, "types.Point"));
    assert_eq!(initializer(&point, "Point", "x"), "x");
    assert_eq!(initializer(&point, "Point", "y"), "None");
    assert!(!implemented_traits(&point).contains(&"Default".to_owned()));
    assert!(point.items.iter().any(|item| matches!(
        item,
        Item::Impl(item) if item.items.iter().any(|i| matches!(i, ImplItem::Fn(f) if f.sig.ident == "with_y"))
    )));
}

#[test]
fn scaffolding_follows_the_field_types() {
    let entities = generate(&[("types.thrift", TYPES)]);

    let point = reparse(entity(&entities, "types.Point"));
    let point_struct = find_struct(&point, "Point");
    assert_eq!(
        derives(&point_struct.attrs),
        ["Debug", "Clone", "PartialEq", "Eq", "Hash", "PartialOrd", "Ord"]
    );
    assert!(point_struct
        .attrs
        .iter()
        .any(|attr| tokens(attr) == tokens(quote!(#[doc = " A point"]))));
    assert!(implemented_traits(&point).contains(&"Display".to_owned()));

    // `weights` holds doubles
    let init = reparse(entity(&entities, "types.Init"));
    assert_eq!(
        derives(&find_struct(&init, "Init").attrs),
        ["Debug", "Clone", "PartialEq"]
    );
    let hash = tokens(trait_impl(&init, "Hash"));
    assert!(hash.contains(&tokens(quote!(let value = &self.f;))));
    assert!(hash.contains(&tokens(quote!(
        for (key0, item0) in value.iter() {
            ::std::hash::Hash::hash(key0, state);
            ::std::hash::Hasher::write_u64(state, if *item0 == 0.0 { 0 } else { item0.to_bits() });
        }
    ))));
    assert!(hash.contains(&tokens(quote!(None => ::std::hash::Hasher::write_u8(state, 0)))));
}

#[test]
fn scaffolding_and_field_naming_are_configurable() {
    let source = r#"
        namespace * plain
        struct Account { 1: required string userName, 2: optional i64 lastSeen }
        exception Denied { 1: string reason }
    "#;
    let config = GeneratorConfig {
        field_naming: FieldNaming::Camel,
        scaffolding: false,
        ..GeneratorConfig::default()
    };
    let entities = generate_with(&[("plain.thrift", source)], &config).unwrap();

    let account = reparse(entity(&entities, "plain.Account"));
    let account_struct = find_struct(&account, "Account");
    assert_eq!(derives(&account_struct.attrs), ["Debug", "Clone"]);
    let names: Vec<String> = fields(account_struct).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["userName", "lastSeen"]);
    assert!(!implemented_traits(&account).contains(&"Display".to_owned()));

    // exceptions are errors regardless
    let denied = reparse(entity(&entities, "plain.Denied"));
    let traits = implemented_traits(&denied);
    assert!(traits.contains(&"Display".to_owned()));
    assert!(traits.contains(&"Error".to_owned()));
}

#[test]
fn enums_keep_their_values() {
    let entities = generate(&[("types.thrift", TYPES)]);
    let foo = entity(&entities, "types.Foo");
    assert_eq!(foo.kind, EntityKind::Enum);
    let file = reparse(foo);

    let item = find_enum(&file, "Foo");
    let variants: Vec<(String, String)> = item
        .variants
        .iter()
        .map(|variant| {
            let (_, value) = variant.discriminant.as_ref().expect("discriminant");
            (variant.ident.to_string(), tokens(value))
        })
        .collect();
    assert_eq!(
        variants,
        [("Bar".to_owned(), "5".to_owned()), ("Baz".to_owned(), "10".to_owned())]
    );
    assert!(item
        .attrs
        .iter()
        .any(|attr| tokens(attr) == tokens(quote!(#[repr(i32)]))));

    let traits = implemented_traits(&file);
    assert!(traits.contains(&"TryFrom".to_owned()));
    assert!(traits.contains(&"Display".to_owned()));
    let methods: Vec<String> = inherent_impl(&file, "Foo")
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(f) => Some(f.sig.ident.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(methods, ["value", "find_by_value"]);
}

#[test]
fn unions_are_enums_with_an_unset_state() {
    let source = r#"
        namespace rs geometry
        struct Circle { 1: double radius }
        struct Square { 1: i32 side }
        union Shape {
          1: Circle circle,
          2: Square square,
          3: Shape inner,
        }
    "#;
    let entities = generate(&[("geometry.thrift", source)]);
    let shape = entity(&entities, "geometry.Shape");
    assert_eq!(shape.kind, EntityKind::Union);
    let file = reparse(shape);

    let item = find_enum(&file, "Shape");
    let variants: Vec<(String, String)> = item
        .variants
        .iter()
        .map(|variant| (variant.ident.to_string(), tokens(&variant.fields)))
        .collect();
    assert_eq!(
        variants,
        [
            ("Unset".to_owned(), String::new()),
            ("Circle".to_owned(), tokens(quote!((super::Circle)))),
            ("Square".to_owned(), tokens(quote!((super::Square)))),
            (
                "Inner".to_owned(),
                tokens(quote!((::std::boxed::Box<super::Shape>)))
            ),
        ]
    );
    // `circle` holds a double
    assert_eq!(derives(&item.attrs), ["Debug", "Clone", "PartialEq", "Default"]);
    let hash = tokens(trait_impl(&file, "Hash"));
    assert!(hash.contains(&tokens(quote!(::std::mem::discriminant(self)))));
    assert!(hash.contains(&tokens(quote!(Self::Square(value) => {
        ::std::hash::Hash::hash(value, state);
    }))));

    let accessors: Vec<(String, String)> = inherent_impl(&file, "Shape")
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(f) => Some((f.sig.ident.to_string(), tokens(&f.sig.output))),
            _ => None,
        })
        .collect();
    assert_eq!(
        accessors,
        [
            ("is_set".to_owned(), tokens(quote!(-> bool))),
            (
                "circle".to_owned(),
                tokens(quote!(-> ::std::option::Option<&super::Circle>))
            ),
            (
                "square".to_owned(),
                tokens(quote!(-> ::std::option::Option<&super::Square>))
            ),
            (
                "inner".to_owned(),
                tokens(quote!(-> ::std::option::Option<&super::Shape>))
            ),
        ]
    );
}

#[test]
fn services_get_a_trait_requests_and_a_client() {
    let source = r#"
        namespace rs calc
        exception Oops { 1: string why }
        service Base {
          void ping()
        }
        /** Adds things */
        service Calculator extends Base {
          i32 add(1: i32 a, 2: i32 b) throws (1: Oops oops),
          oneway void fire(1: string event),
        }
    "#;
    let entities = generate(&[("calc.thrift", source)]);
    let calculator = entity(&entities, "calc.Calculator");
    assert_eq!(calculator.kind, EntityKind::Service);
    let file = reparse(calculator);

    let handler = file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Trait(item) if item.ident == "Calculator" => Some(item),
            _ => None,
        })
        .expect("handler trait");
    assert_eq!(tokens(&handler.supertraits), tokens(quote!(super::Base)));
    let methods: Vec<(String, String)> = handler
        .items
        .iter()
        .filter_map(|item| match item {
            syn::TraitItem::Fn(f) => Some((f.sig.ident.to_string(), tokens(&f.sig.output))),
            _ => None,
        })
        .collect();
    assert_eq!(
        methods,
        [
            (
                "add".to_owned(),
                tokens(quote!(-> ::std::result::Result<i32, CalculatorAddError>))
            ),
            ("fire".to_owned(), String::new()),
        ]
    );

    assert_eq!(variant_names(&file, "CalculatorRequest"), ["Add", "Fire", "Ping"]);
    assert_eq!(variant_names(&file, "CalculatorResponse"), ["Add", "Ping"]);
    assert_eq!(variant_names(&file, "CalculatorAddError"), ["Oops", "Application"]);

    assert!(file
        .items
        .iter()
        .any(|item| matches!(item, Item::Fn(f) if f.sig.ident == "dispatch_calculator")));
    find_struct(&file, "CalculatorClient");
    let client_impls: Vec<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(ItemImpl {
                trait_: Some((_, path, _)),
                self_ty,
                ..
            }) if tokens(self_ty) == tokens(quote!(CalculatorClient<T>)) => Some(tokens(path)),
            _ => None,
        })
        .collect();
    assert_eq!(
        client_impls,
        [tokens(quote!(Calculator)), tokens(quote!(super::Base))]
    );

    let base = reparse(entity(&entities, "calc.Base"));
    assert_eq!(variant_names(&base, "BaseRequest"), ["Ping"]);
}

fn variant_names(file: &syn::File, name: &str) -> Vec<String> {
    find_enum(file, name)
        .variants
        .iter()
        .map(|variant| variant.ident.to_string())
        .collect()
}

#[test]
fn constants_become_consts_or_functions() {
    let source = r#"
        namespace rs config
        struct Point { 1: required i32 x, 2: optional i32 y }
        const i32 LIMIT = 10
        const string GREETING = "hi"
        const list<i32> PRIMES = [2, 3]
        const Point ORIGIN = {"x": 0, "y": -1}
    "#;
    let entities = generate(&[("config.thrift", source)]);

    let item = |name: &str| {
        let constant = entity(&entities, name);
        assert_eq!(constant.kind, EntityKind::Constant);
        tokens(&reparse(constant).items[0])
    };
    assert_eq!(item("config.LIMIT"), tokens(quote!(pub const LIMIT: i32 = 10i32;)));
    assert_eq!(item("config.GREETING"), tokens(quote!(pub const GREETING: &str = "hi";)));
    assert_eq!(
        item("config.PRIMES"),
        tokens(quote! {
            pub fn primes() -> ::std::vec::Vec<i32> {
                ::std::vec![2i32, 3i32]
            }
        })
    );
    assert_eq!(
        item("config.ORIGIN"),
        tokens(quote! {
            pub fn origin() -> super::Point {
                {
                    let mut value = super::Point::new(0i32);
                    value.y = Some(-1i32);
                    value
                }
            }
        })
    );
}

#[test]
fn references_across_packages_use_the_root_module() {
    let files = [
        (
            "app.thrift",
            "namespace rs app.main\ninclude \"shared.thrift\"\nstruct User { 1: required shared.Id id }\n",
        ),
        ("shared.thrift", "namespace rs app.shared\ntypedef i64 Id\n"),
    ];
    let config = GeneratorConfig {
        root_module: "crate::generated".to_owned(),
        ..GeneratorConfig::default()
    };
    let entities = generate_with(&files, &config).unwrap();

    let user = reparse(entity(&entities, "app.User"));
    let expected: Vec<(String, Type)> =
        vec![("id".into(), parse_quote!(crate::generated::app::shared::Id))];
    assert_eq!(fields(find_struct(&user, "User")), expected);

    let id = reparse(entity(&entities, "shared.Id"));
    assert_eq!(tokens(&id.items[0]), tokens(quote!(pub type Id = i64;)));

    let tree: Vec<(PathBuf, syn::File)> = render_module_tree(&entities)
        .into_iter()
        .map(|file| {
            let parsed = syn::parse_file(&file.contents).expect("module file parses");
            (file.path, parsed)
        })
        .collect();
    let paths: Vec<PathBuf> = tree.iter().map(|(path, _)| path.clone()).collect();
    assert_eq!(
        paths,
        [
            PathBuf::from("mod.rs"),
            PathBuf::from("app/mod.rs"),
            PathBuf::from("app/main/mod.rs"),
            PathBuf::from("app/shared/mod.rs"),
        ]
    );
    let main_items: Vec<String> = tree[2].1.items.iter().map(tokens).collect();
    assert_eq!(
        main_items,
        [tokens(quote!(mod user;)), tokens(quote!(pub use user::*;))]
    );
    let app_items: Vec<String> = tree[1].1.items.iter().map(tokens).collect();
    assert_eq!(
        app_items,
        [tokens(quote!(pub mod main;)), tokens(quote!(pub mod shared;))]
    );
}

#[test]
fn colliding_names_are_reported() {
    let source = r#"
        namespace rs clash
        struct Account { 1: string user_name, 2: string userName }
        enum Level { LOW_LEVEL, LowLevel }
        struct Fine { 1: i32 value }
    "#;
    let errors = generate_with(&[("clash.thrift", source)], &GeneratorConfig::default())
        .unwrap_err()
        .0;
    assert_eq!(
        errors,
        [
            GenerateError::NameCollision {
                scope: "enum `clash.Level`".into(),
                name: "LowLevel".into(),
                first: "LOW_LEVEL".into(),
                second: "LowLevel".into(),
            },
            GenerateError::NameCollision {
                scope: "struct `clash.Account`".into(),
                name: "user_name".into(),
                first: "user_name".into(),
                second: "userName".into(),
            },
            GenerateError::NameCollision {
                scope: "the methods of `clash.Account`".into(),
                name: "with_user_name".into(),
                first: "user_name".into(),
                second: "userName".into(),
            },
        ]
    );
}

#[test]
fn programs_sharing_a_package_cannot_reuse_names() {
    let files = [
        ("one.thrift", "namespace rs shared\nstruct Item { 1: i32 a }\n"),
        ("two.thrift", "namespace rs shared\nstruct Item { 1: i32 b }\n"),
    ];
    let errors = generate_with(&files, &GeneratorConfig::default())
        .unwrap_err()
        .0;
    assert_eq!(
        errors,
        [
            GenerateError::NameCollision {
                scope: "module `crate::shared`".into(),
                name: "Item".into(),
                first: "one.Item".into(),
                second: "two.Item".into(),
            },
            GenerateError::NameCollision {
                scope: "module `crate::shared`".into(),
                name: "item.rs".into(),
                first: "one.Item".into(),
                second: "two.Item".into(),
            },
        ]
    );
}

#[test]
fn missing_namespaces_fail_before_generating() {
    let files = [
        ("mapped.thrift", "namespace rs mapped\nstruct Fine { 1: i32 a }\n"),
        (
            "unmapped.thrift",
            "namespace java com.example\nenum Color { RED }\nconst i32 ANSWER = 42\n",
        ),
    ];
    let errors = generate_with(&files, &GeneratorConfig::default())
        .unwrap_err()
        .0;
    assert_eq!(
        errors,
        [
            GenerateError::MissingNamespaceMapping {
                entity: "unmapped.Color".into(),
                scope: "rs".into(),
            },
            GenerateError::MissingNamespaceMapping {
                entity: "unmapped.ANSWER".into(),
                scope: "rs".into(),
            },
        ]
    );

    // a package override gives every program a home
    let config = GeneratorConfig::default().with_package(NamespaceScope::Rs, "everything");
    let entities = generate_with(&files, &config).unwrap();
    assert_eq!(entities.len(), 3);
    assert!(entities.iter().all(|entity| entity.module == ["everything"]));
}

#[test]
fn invalid_root_modules_are_rejected() {
    let config = GeneratorConfig {
        root_module: "not a path".to_owned(),
        ..GeneratorConfig::default()
    };
    let errors = generate_with(&[("types.thrift", TYPES)], &config)
        .unwrap_err()
        .0;
    assert_eq!(
        errors,
        [GenerateError::InvalidRootModule("not a path".to_owned())]
    );
}

#[test]
fn package_modules_cannot_share_a_name_with_an_entity_file() {
    let files = [
        ("a.thrift", "namespace rs x\nstruct Y { 1: i32 a }\n"),
        ("b.thrift", "namespace rs x.y\nstruct Z { 1: i32 b }\n"),
    ];
    let errors = generate_with(&files, &GeneratorConfig::default())
        .unwrap_err()
        .0;
    assert_eq!(
        errors,
        [GenerateError::NameCollision {
            scope: "module `crate::x`".into(),
            name: "y.rs".into(),
            first: "crate::x::y".into(),
            second: "a.Y".into(),
        }]
    );

    // a program without entities adds no module
    let files = [
        ("a.thrift", "namespace rs x\nstruct Y { 1: i32 a }\n"),
        ("c.thrift", "namespace rs x.y\n"),
    ];
    let entities = generate_with(&files, &GeneratorConfig::default()).unwrap();
    assert_eq!(entities.len(), 1);
}

#[test]
fn set_elements_and_map_keys_need_a_total_order() {
    let source = r#"
        namespace rs keys
        struct Reading { 1: double value }
        typedef set<double> Samples
        struct Bag {
          1: set<double> d = [1.5],
          2: map<Reading, i32> counts,
          3: list<set<i32>> fine,
          4: map<i32, Reading> by_id,
        }
        service Stats { void record(1: map<i32, list<set<double>>> samples) }
        const list<set<double>> NESTED = [[0.5]]
    "#;
    let errors = generate_with(&[("keys.thrift", source)], &GeneratorConfig::default())
        .unwrap_err()
        .0;
    let unordered = |entity: &str, key: &str| GenerateError::UnorderedKey {
        entity: entity.into(),
        key: key.into(),
    };
    assert_eq!(
        errors,
        [
            unordered("keys.Samples", "double"),
            unordered("keys.Bag", "double"),
            unordered("keys.Bag", "Reading"),
            unordered("keys.Stats", "double"),
            unordered("keys.NESTED", "double"),
        ]
    );
}

#[test]
fn struct_keys_need_scaffolding() {
    let source = r#"
        namespace rs keys
        struct Pair { 1: i32 a, 2: i32 b }
        struct Holder { 1: set<Pair> pairs, 2: map<Pair, string> names }
    "#;
    let files = [("keys.thrift", source)];
    let holder = reparse(entity(&generate(&files), "keys.Holder"));
    assert_eq!(
        fields(find_struct(&holder, "Holder"))[0].1,
        parse_quote!(::std::option::Option<::std::collections::BTreeSet<super::Pair>>)
    );

    let config = GeneratorConfig {
        scaffolding: false,
        ..GeneratorConfig::default()
    };
    let errors = generate_with(&files, &config).unwrap_err().0;
    assert_eq!(
        errors,
        [
            GenerateError::UnorderedKey {
                entity: "keys.Holder".into(),
                key: "Pair".into(),
            },
            GenerateError::UnorderedKey {
                entity: "keys.Holder".into(),
                key: "Pair".into(),
            },
        ]
    );
}
