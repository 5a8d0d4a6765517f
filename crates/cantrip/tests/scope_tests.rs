//! Tests for scopes and name lookup: per-kind strategies, parent
//! walking, injection copy-on-write, imports and aliases.

use cantrip::{
    AccessSpecifier, ClassBuilder, Context, Engine, EnumBuilder, FunctionBuilder, NameLookup, Namespace, OperatorId,
    Scope, ScopeKind, Type, Value,
};

// =============================================================================
// 1. Namespace scopes
// =============================================================================

#[test]
fn namespace_lookup_finds_functions_types_and_values() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let math = root.new_namespace("math");
    math.add_function(
        FunctionBuilder::function("abs")
            .returns(Type::INT)
            .param(Type::INT)
            .build(),
    );
    math.add_function(
        FunctionBuilder::function("abs")
            .returns(Type::DOUBLE)
            .param(Type::DOUBLE)
            .build(),
    );
    math.add_var("pi", Value::double(3.14159));
    math.add_typedef("integer", Type::INT);

    let scope = Scope::namespace(math);
    assert!(matches!(scope.lookup("abs"), NameLookup::Functions(fs) if fs.len() == 2));
    assert!(matches!(scope.lookup("pi"), NameLookup::Value(_)));
    assert!(matches!(scope.lookup("integer"), NameLookup::Type(t) if t == Type::INT));
    assert!(scope.lookup("nonsense").is_unknown());
}

#[test]
fn lookup_walks_to_the_parent_scope() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    root.add_var("global", Value::int(1));
    let inner = root.new_namespace("inner");

    let scope = Scope::namespace(inner).with_parent(Scope::namespace(root));
    assert!(matches!(scope.lookup("global"), NameLookup::Value(_)));
}

#[test]
fn qualified_lookup_descends_nested_namespaces() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let outer = root.new_namespace("outer");
    let inner = outer.new_namespace("inner");
    inner.add_var("x", Value::int(5));

    let scope = Scope::namespace(root);
    assert!(matches!(scope.lookup_qualified(&["outer", "inner", "x"]), NameLookup::Value(_)));
    assert!(scope.lookup_qualified(&["outer", "missing", "x"]).is_unknown());
}

#[test]
fn unscoped_enum_keys_are_visible_but_enum_class_keys_are_not() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    engine
        .register_enum(
            EnumBuilder::new("Color")
                .value("Red")
                .value("Green")
                .enclosing(cantrip::EnclosingSymbol::from(&root)),
        )
        .unwrap();
    engine
        .register_enum(
            EnumBuilder::new("Mode")
                .enum_class()
                .value("Fast")
                .enclosing(cantrip::EnclosingSymbol::from(&root)),
        )
        .unwrap();

    let scope = Scope::namespace(root);
    assert!(matches!(scope.lookup("Green"), NameLookup::Enumerator(e) if e.value() == 1));
    assert!(scope.lookup("Fast").is_unknown(), "enum class keys need qualification");
    assert!(matches!(scope.lookup("Mode"), NameLookup::Type(_)));
}

// =============================================================================
// 2. Class scopes
// =============================================================================

#[test]
fn class_scope_reports_data_members_with_absolute_indices() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("Base")).unwrap();
    base.add_data_member(Type::INT, "a", AccessSpecifier::Public);
    let derived = engine
        .register_class(ClassBuilder::new("Derived").base(base.clone()))
        .unwrap();
    derived.add_data_member(Type::INT, "b", AccessSpecifier::Public);
    derived.add_static_data_member("shared", Value::int(3), AccessSpecifier::Public);

    let scope = Scope::class(derived.clone());
    assert!(matches!(scope.lookup("a"), NameLookup::DataMember { index: 0, .. }));
    assert!(matches!(scope.lookup("b"), NameLookup::DataMember { index: 1, .. }));
    assert!(matches!(scope.lookup("shared"), NameLookup::StaticDataMember { .. }));
    assert_eq!(scope.kind(), ScopeKind::Class);
}

#[test]
fn class_scope_accumulates_member_function_overloads_across_bases() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("B")).unwrap();
    base.new_method(
        FunctionBuilder::function("get")
            .returns(Type::INT)
            .callback(|_c| Ok(Value::int(0))),
    );
    let derived = engine.register_class(ClassBuilder::new("D").base(base)).unwrap();
    derived.new_method(
        FunctionBuilder::function("get")
            .returns(Type::INT)
            .param(Type::INT)
            .callback(|_c| Ok(Value::int(1))),
    );

    let scope = Scope::class(derived);
    assert!(matches!(scope.lookup("get"), NameLookup::Functions(fs) if fs.len() == 2));
}

// =============================================================================
// 3. Context scopes
// =============================================================================

#[test]
fn context_scope_serves_bound_variables() {
    let context = Context::new("repl");
    context.add_var("answer", Value::int(42));
    let scope = Scope::context(context);
    assert!(matches!(scope.lookup("answer"), NameLookup::Value(v) if v.as_int() == Some(42)));
}

// =============================================================================
// 4. Injection and copy-on-write
// =============================================================================

#[test]
fn injection_does_not_leak_into_shared_scopes() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let shared = Scope::namespace(root);
    let mut branch = shared.clone();

    branch.inject_value("local", Value::int(1));
    assert!(matches!(branch.lookup("local"), NameLookup::Value(_)));
    assert!(
        shared.lookup("local").is_unknown(),
        "mutating a shared scope must clone the node first"
    );
}

#[test]
fn injected_names_shadow_namespace_contents() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    root.add_var("x", Value::int(1));
    let mut scope = Scope::namespace(root);
    scope.inject_value("x", Value::int(2));
    assert!(matches!(scope.lookup("x"), NameLookup::Value(v) if v.as_int() == Some(2)));
}

#[test]
fn injection_lands_on_the_nearest_extensible_ancestor() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let context = Context::new("ctx");
    let mut scope = Scope::context(context).with_parent(Scope::namespace(root));
    scope.inject_typedef("number", Type::DOUBLE);
    assert!(matches!(scope.lookup("number"), NameLookup::Type(t) if t == Type::DOUBLE));
}

#[test]
fn namespace_import_merges_visible_members() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let lib = root.new_namespace("lib");
    lib.add_var("version", Value::int(3));

    let mut scope = Scope::namespace(root);
    assert!(scope.lookup("version").is_unknown());
    scope.import_namespace(lib);
    assert!(matches!(scope.lookup("version"), NameLookup::Value(_)));
}

/// `merge` walks the two namespace chains in parallel: each level of
/// `other` is imported into the correspondingly-named level of `self`,
/// never into a single innermost node.
#[test]
fn merge_imports_each_level_into_the_corresponding_level() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let app = root.new_namespace("app");
    let mut scope = Scope::namespace(app).with_parent(Scope::namespace(root));

    // A parallel tree: a root holding `outer_only`, with an `app` child
    // holding `inner_only` and an unrelated sibling.
    let lib_root = Namespace::new("");
    lib_root.add_var("outer_only", Value::int(1));
    let lib_app = lib_root.new_namespace("app");
    lib_app.add_var("inner_only", Value::int(2));
    lib_root.new_namespace("elsewhere").add_var("stray", Value::int(3));

    scope.merge(&Scope::namespace(lib_root)).unwrap();

    // The inner level received exactly the library's `app` namespace.
    assert!(
        matches!(scope.lookup_local("inner_only"), Some(NameLookup::Value(v)) if v.as_int() == Some(2)),
        "the inner level must import the correspondingly-named namespace"
    );
    assert!(
        scope.lookup_local("outer_only").is_none(),
        "the library root must not land on the inner level"
    );

    // The outer level received exactly the library root.
    let outer = scope.parent().unwrap();
    assert!(
        matches!(outer.lookup_local("outer_only"), Some(NameLookup::Value(v)) if v.as_int() == Some(1)),
        "the outer level must import the library root"
    );
    assert!(
        outer.lookup_local("inner_only").is_none(),
        "the library's `app` namespace must not land on the outer level"
    );

    // Full lookups resolve each name through its own level.
    assert!(matches!(scope.lookup("inner_only"), NameLookup::Value(v) if v.as_int() == Some(2)));
    assert!(matches!(scope.lookup("outer_only"), NameLookup::Value(v) if v.as_int() == Some(1)));

    // Children of `other` with no matching level stay invisible.
    assert!(scope.lookup("stray").is_unknown());
}

#[test]
fn merge_rejects_a_scope_with_a_parent() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let mut scope = Scope::namespace(root.clone());

    let lib = Namespace::new("");
    let nested = Scope::namespace(lib.new_namespace("inner")).with_parent(Scope::namespace(lib));
    assert!(scope.merge(&nested).is_err());

    let context_scope = Scope::context(Context::new("ctx"));
    assert!(scope.merge(&context_scope).is_err(), "only namespace scopes can be merged");
}

#[test]
fn namespace_alias_requires_an_existing_target() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let deep = root.new_namespace("very");
    deep.new_namespace("deep").add_var("treasure", Value::int(1));

    let mut scope = Scope::namespace(root);
    scope
        .inject_namespace_alias("vd", vec!["very".to_owned(), "deep".to_owned()])
        .unwrap();
    assert!(matches!(scope.lookup_qualified(&["vd", "treasure"]), NameLookup::Value(_)));

    assert!(
        scope
            .inject_namespace_alias("bad", vec!["nowhere".to_owned()])
            .is_err()
    );
}

// =============================================================================
// 5. Operator lookup
// =============================================================================

#[test]
fn operator_lookup_recurses_outward_only_when_empty() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    let inner = root.new_namespace("inner");
    let scope = Scope::namespace(inner).with_parent(Scope::namespace(root));

    // The built-in operators live at the root; an inner scope still sees
    // them.
    let found = scope.lookup_operator(OperatorId::Addition);
    assert!(!found.is_empty());

    let none = scope.lookup_operator(OperatorId::ScopeResolution);
    assert!(none.is_empty());
}

#[test]
fn literal_operator_lookup_is_keyed_by_suffix() {
    let engine = Engine::new();
    let root = engine.root_namespace();
    root.add_function(
        FunctionBuilder::literal_operator("km")
            .returns(Type::DOUBLE)
            .param(Type::DOUBLE)
            .build(),
    );
    let scope = Scope::namespace(root);
    assert_eq!(scope.lookup_literal_operator("km").len(), 1);
    assert!(scope.lookup_literal_operator("mi").is_empty());
}
