use pretty_assertions::assert_eq;
use thrift_schema::{
    namespace_for_scope, ConstValue, DiagnosticKind, InMemoryResolver, LoadError, Loader,
    NamespaceScope, Requiredness, Schema, StructKind, ThriftType,
};

fn load(files: &[(&str, &str)]) -> Result<Schema, LoadError> {
    let mut resolver = InMemoryResolver::new();
    for (path, source) in files {
        resolver.add_file(path, *source);
    }
    let mut loader = Loader::new();
    loader.with_resolver(resolver).jobs(4);
    for (path, _) in files {
        loader.add_thrift_file(*path);
    }
    loader.load()
}

fn load_ok(files: &[(&str, &str)]) -> Schema {
    match load(files) {
        Ok(schema) => schema,
        Err(err) => panic!("unexpected diagnostics: {:#?}", err.diagnostics),
    }
}

fn load_err(files: &[(&str, &str)]) -> Vec<DiagnosticKind> {
    match load(files) {
        Ok(_) => panic!("expected the load to fail"),
        Err(err) => err.kinds(),
    }
}

#[test]
fn enum_values_are_assigned_in_order() {
    let schema = load_ok(&[(
        "build.thrift",
        "/** Status of a build */\n\
         enum BuildStatus {\n  OK,\n  FAIL\n}\n\
         enum Foo { FOO = 0, BAR = 5, BAZ = 10, QUUX = 15 }\n\
         enum Mixed { A = 3, B, C = 10, D }\n",
    )]);

    let values = |name: &str| -> Vec<(String, i32)> {
        let enum_type = schema.get(schema.find_enum(name).unwrap());
        enum_type
            .members
            .iter()
            .map(|m| (m.name.clone(), m.value))
            .collect()
    };
    assert_eq!(
        values("build.BuildStatus"),
        [("OK".to_owned(), 0), ("FAIL".to_owned(), 1)]
    );
    assert_eq!(
        values("build.Foo"),
        [
            ("FOO".to_owned(), 0),
            ("BAR".to_owned(), 5),
            ("BAZ".to_owned(), 10),
            ("QUUX".to_owned(), 15)
        ]
    );
    assert_eq!(
        values("build.Mixed"),
        [
            ("A".to_owned(), 3),
            ("B".to_owned(), 4),
            ("C".to_owned(), 10),
            ("D".to_owned(), 11)
        ]
    );

    let status = schema.get(schema.find_enum("build.BuildStatus").unwrap());
    assert_eq!(status.documentation.as_deref(), Some("Status of a build"));
}

#[test]
fn duplicate_enum_values_are_rejected() {
    let kinds = load_err(&[("e.thrift", "enum E { A = 1, B = 0, C }\n")]);
    assert_eq!(kinds, [DiagnosticKind::DuplicateEnumValue]);
}

#[test]
fn enum_values_must_fit_in_32_bits() {
    let kinds = load_err(&[("e.thrift", "enum E { A = 4294967296 }\n")]);
    assert_eq!(kinds, [DiagnosticKind::InvalidEnumValue]);
}

#[test]
fn struct_fields_resolve_to_types() {
    let schema = load_ok(&[(
        "str.thrift",
        "struct Str {\n\
           1: list<i32> numbers\n\
           2: string name\n\
           3: map<string, list<i16>> addresses\n\
         }\n\
         exception Boom {}\n",
    )]);
    let str_type = schema.get(schema.find_struct("str.Str").unwrap());
    assert_eq!(str_type.kind, StructKind::Struct);
    let fields: Vec<_> = str_type
        .fields
        .iter()
        .map(|f| (f.id, f.name.as_str(), f.field_type.display(&schema)))
        .collect();
    assert_eq!(
        fields,
        [
            (1, "numbers", "list<i32>".to_owned()),
            (2, "name", "string".to_owned()),
            (3, "addresses", "map<string, list<i16>>".to_owned()),
        ]
    );
    assert!(str_type.fields.iter().all(|f| f.requiredness == Requiredness::Default));

    let boom = schema.find_struct("str.Boom").unwrap();
    assert!(schema.get(boom).is_exception());
    assert_eq!(schema.exceptions(), [boom]);
}

#[test]
fn default_values_resolve_enum_members() {
    let schema = load_ok(&[(
        "init.thrift",
        "enum Foo { FOO = 0, BAR = 5, BAZ = 10, QUUX = 15 }\n\
         struct Init {\n\
           1: required set<Foo> f = [10]\n\
           2: optional string b = \"bar\"\n\
           3: Foo g = Foo.QUUX\n\
         }\n",
    )]);
    let foo = schema.find_enum("init.Foo").unwrap();
    let init = schema.get(schema.find_struct("init.Init").unwrap());

    assert_eq!(init.fields[0].requiredness, Requiredness::Required);
    assert_eq!(
        init.fields[0].default_value,
        Some(ConstValue::Set(vec![ConstValue::Enum {
            enum_type: foo,
            member: 2
        }]))
    );
    assert_eq!(init.fields[1].requiredness, Requiredness::Optional);
    assert_eq!(
        init.fields[1].default_value,
        Some(ConstValue::String("bar".into()))
    );
    assert_eq!(
        init.fields[2].default_value,
        Some(ConstValue::Enum {
            enum_type: foo,
            member: 3
        })
    );
}

#[test]
fn unknown_enum_values_in_defaults_are_rejected() {
    let kinds = load_err(&[(
        "init.thrift",
        "enum Foo { FOO = 0, BAR = 5 }\n\
         struct Init {\n\
           1: set<Foo> f = [11]\n\
           2: Foo g = Foo.NOPE\n\
         }\n",
    )]);
    assert_eq!(
        kinds,
        [
            DiagnosticKind::InvalidDefaultValue,
            DiagnosticKind::InvalidDefaultValue
        ]
    );
}

#[test]
fn default_values_must_match_their_type() {
    let kinds = load_err(&[(
        "d.thrift",
        "struct D {\n\
           1: i16 small = 100000\n\
           2: string s = 5\n\
           3: bool b = 1\n\
           4: double d = 3\n\
         }\n",
    )]);
    assert_eq!(
        kinds,
        [
            DiagnosticKind::InvalidDefaultValue,
            DiagnosticKind::InvalidDefaultValue
        ]
    );
}

#[test]
fn duplicate_field_ids_are_rejected() {
    let err = load(&[(
        "dup.thrift",
        "struct Dup {\n  1: i32 a\n  1: i32 b\n}\n",
    )])
    .unwrap_err();
    assert_eq!(err.kinds(), [DiagnosticKind::DuplicateFieldId]);
    let location = err.diagnostics[0].location.as_ref().unwrap();
    assert_eq!((location.line, location.column), (3, 3));
}

#[test]
fn implicit_field_ids_can_collide_with_explicit_ones() {
    let kinds = load_err(&[(
        "dup.thrift",
        "struct Dup { 1: i32 a, i32 b, 2: i32 c }\n",
    )]);
    assert_eq!(kinds, [DiagnosticKind::DuplicateFieldId]);
}

#[test]
fn union_fields_cannot_be_required() {
    let kinds = load_err(&[(
        "u.thrift",
        "union U {\n  1: required i32 a\n  2: optional string b\n  3: i64 c\n}\n",
    )]);
    assert_eq!(kinds, [DiagnosticKind::InvalidUnionField]);
}

#[test]
fn references_resolve_regardless_of_declaration_order() {
    let schema = load_ok(&[
        (
            "main.thrift",
            "include \"shared.thrift\"\n\
             struct Outer {\n  1: Inner inner\n  2: shared.Thing thing\n  3: Alias alias\n}\n\
             typedef list<Inner> Alias\n\
             struct Inner {\n  1: optional Outer parent\n}\n",
        ),
        ("shared.thrift", "struct Thing {}\n"),
    ]);
    let outer = schema.get(schema.find_struct("main.Outer").unwrap());
    let inner = schema.find_struct("main.Inner").unwrap();
    let thing = schema.find_struct("shared.Thing").unwrap();

    assert_eq!(outer.fields[0].field_type, ThriftType::Struct(inner));
    assert_eq!(outer.fields[1].field_type, ThriftType::Struct(thing));
    assert_eq!(
        outer.fields[2].field_type.true_type(&schema),
        &ThriftType::List(Box::new(ThriftType::Struct(inner)))
    );
    assert_eq!(schema.qualified_name(thing), "shared.Thing");
}

#[test]
fn unqualified_names_fall_back_to_included_programs() {
    let schema = load_ok(&[
        ("a.thrift", "include \"b.thrift\"\nstruct A { 1: B b }\n"),
        ("b.thrift", "struct B {}\n"),
    ]);
    let a = schema.get(schema.find_struct("a.A").unwrap());
    assert_eq!(
        a.fields[0].field_type,
        ThriftType::Struct(schema.find_struct("b.B").unwrap())
    );
}

#[test]
fn includes_are_not_transitive() {
    let kinds = load_err(&[
        ("a.thrift", "include \"b.thrift\"\nstruct A { 1: c.C c }\n"),
        ("b.thrift", "include \"c.thrift\"\n"),
        ("c.thrift", "struct C {}\n"),
    ]);
    assert_eq!(kinds, [DiagnosticKind::UnknownType]);
}

#[test]
fn unknown_types_are_reported_in_every_file() {
    let err = load(&[
        ("a.thrift", "struct A {\n  1: Missing m\n}\n"),
        ("b.thrift", "typedef Nope B\nservice S { void f(1: AlsoMissing x) }\n"),
    ])
    .unwrap_err();
    assert_eq!(
        err.kinds(),
        [
            DiagnosticKind::UnknownType,
            DiagnosticKind::UnknownType,
            DiagnosticKind::UnknownType
        ]
    );
    let missing = err
        .diagnostics
        .iter()
        .find(|d| d.message.contains("`Missing`"))
        .unwrap();
    let location = missing.location.as_ref().unwrap();
    assert_eq!(location.path().to_str(), Some("a.thrift"));
    assert_eq!((location.line, location.column), (2, 6));
}

#[test]
fn typedef_cycles_are_rejected() {
    let kinds = load_err(&[(
        "t.thrift",
        "typedef B A\ntypedef list<A> B\ntypedef A C\n",
    )]);
    assert_eq!(kinds, [DiagnosticKind::CyclicTypedef]);
}

#[test]
fn recursive_structs_are_allowed() {
    let schema = load_ok(&[(
        "tree.thrift",
        "struct Node {\n  1: list<Node> children\n  2: optional Node next\n}\n",
    )]);
    let node = schema.find_struct("tree.Node").unwrap();
    assert_eq!(
        schema.get(node).fields[1].field_type,
        ThriftType::Struct(node)
    );
}

#[test]
fn duplicate_symbols_are_rejected() {
    let kinds = load_err(&[("d.thrift", "struct A {}\nenum A { X }\n")]);
    assert_eq!(kinds, [DiagnosticKind::DuplicateSymbol]);
}

#[test]
fn constants_are_validated_and_inlined() {
    let schema = load_ok(&[(
        "c.thrift",
        "const i32 LIMIT = 10\n\
         const i64 WIDE = LIMIT\n\
         const double RATIO = 2\n\
         const list<string> NAMES = [\"a\", \"b\"]\n\
         const map<string, i32> SIZES = {\"s\": 1, \"m\": LIMIT}\n\
         struct Point {\n  1: required i32 x\n  2: i32 y = 0\n}\n\
         const Point ORIGIN = {\"x\": 0}\n",
    )]);
    let value = |name: &str| schema.get(schema.find_constant(name).unwrap()).value.clone();

    assert_eq!(value("c.WIDE"), ConstValue::Integer(10));
    assert_eq!(value("c.RATIO"), ConstValue::Double(2.0));
    assert_eq!(
        value("c.NAMES"),
        ConstValue::List(vec![
            ConstValue::String("a".into()),
            ConstValue::String("b".into())
        ])
    );
    assert_eq!(
        value("c.SIZES"),
        ConstValue::Map(vec![
            (ConstValue::String("s".into()), ConstValue::Integer(1)),
            (ConstValue::String("m".into()), ConstValue::Integer(10)),
        ])
    );
    assert_eq!(
        value("c.ORIGIN"),
        ConstValue::Struct {
            struct_type: schema.find_struct("c.Point").unwrap(),
            fields: vec![(0, ConstValue::Integer(0))],
        }
    );
}

#[test]
fn invalid_constants_are_rejected() {
    let kinds = load_err(&[(
        "c.thrift",
        "const i64 BIG = 100000\n\
         const i16 SMALL = BIG\n\
         const i32 A = B\n\
         const i32 B = A\n\
         struct Point {\n  1: required i32 x\n}\n\
         const Point P = {\"y\": 1}\n",
    )]);
    assert_eq!(
        kinds,
        [
            DiagnosticKind::InvalidDefaultValue,
            DiagnosticKind::InvalidDefaultValue,
            DiagnosticKind::InvalidDefaultValue,
            DiagnosticKind::InvalidDefaultValue
        ]
    );
}

#[test]
fn services_link_to_their_parents() {
    let schema = load_ok(&[
        (
            "base.thrift",
            "exception Oops { 1: string message }\n\
             service Base {\n  void ping()\n}\n",
        ),
        (
            "api.thrift",
            "include \"base.thrift\"\n\
             service Api extends base.Base {\n\
               i32 add(1: i32 a, 2: i32 b) throws (1: base.Oops oops)\n\
               oneway void fire(1: string event)\n\
             }\n",
        ),
    ]);
    let api = schema.get(schema.find_service("api.Api").unwrap());
    let base = schema.find_service("base.Base").unwrap();
    assert_eq!(api.extends, Some(base));
    assert_eq!(api.ancestors(&schema), [base]);

    let add = &api.methods[0];
    assert_eq!(add.return_type, Some(ThriftType::Builtin(thrift_schema::BuiltinType::I32)));
    assert_eq!(add.params.len(), 2);
    assert_eq!(
        add.exceptions[0].field_type,
        ThriftType::Exception(schema.find_struct("base.Oops").unwrap())
    );
    assert!(api.methods[1].oneway);
}

#[test]
fn invalid_services_are_rejected() {
    let kinds = load_err(&[(
        "s.thrift",
        "struct NotAnException {}\n\
         struct NotAService {}\n\
         service Base { void ping() }\n\
         service A extends NotAService {}\n\
         service B extends Base {\n\
           void ping()\n\
           i32 get() throws (1: NotAnException e)\n\
           oneway i32 fire()\n\
           void get()\n\
         }\n",
    )]);
    let mut kinds = kinds;
    kinds.sort_by_key(|k| k.name());
    assert_eq!(
        kinds,
        [
            DiagnosticKind::DuplicateMethod,
            DiagnosticKind::DuplicateMethod,
            DiagnosticKind::InvalidOneway,
            DiagnosticKind::InvalidServiceExtends,
            DiagnosticKind::InvalidThrows,
        ]
    );
}

#[test]
fn service_inheritance_cycles_are_rejected() {
    let kinds = load_err(&[(
        "s.thrift",
        "service A extends B {}\nservice B extends A {}\n",
    )]);
    assert_eq!(
        kinds,
        [
            DiagnosticKind::InvalidServiceExtends,
            DiagnosticKind::InvalidServiceExtends
        ]
    );
}

#[test]
fn namespaces_attach_to_entities() {
    let schema = load_ok(&[(
        "ns.thrift",
        "namespace rs example.api\nnamespace * fallback\nnamespace java com.example\n\
         struct S {}\n",
    )]);
    let s = schema.get(schema.find_struct("ns.S").unwrap());
    assert_eq!(
        namespace_for_scope(&s.namespaces, &NamespaceScope::Rs),
        Some("example.api")
    );
    assert_eq!(
        namespace_for_scope(&s.namespaces, &NamespaceScope::Py),
        Some("fallback")
    );
    assert_eq!(schema.programs()[0].namespaces, s.namespaces);
}

#[test]
fn loading_twice_gives_equal_schemas() {
    let files = [
        (
            "main.thrift",
            "include \"shared.thrift\"\n\
             enum Color { RED, GREEN }\n\
             struct Pixel {\n  1: Color color = Color.GREEN\n  2: shared.Point at\n}\n\
             service Canvas { void draw(1: Pixel pixel) }\n",
        ),
        ("shared.thrift", "struct Point { 1: i32 x, 2: i32 y }\n"),
    ];
    assert_eq!(load_ok(&files), load_ok(&files));
}

#[test]
fn diagnostics_render_with_source_snippets() {
    let err = load(&[("a.thrift", "struct A {\n  1: Missing m\n}\n")]).unwrap_err();
    let mut buffer = codespan_reporting::term::termcolor::NoColor::new(Vec::new());
    err.emit(&mut buffer).unwrap();
    let rendered = String::from_utf8(buffer.into_inner()).unwrap();
    assert!(rendered.contains("UnknownTypeError"));
    assert!(rendered.contains("a.thrift:2:6"));
}
