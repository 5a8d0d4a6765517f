//! Tests for the engine facade: value lifecycle, construction errors,
//! eval through a compiler backend, scripts, modules, tracing, locals
//! and the debug workspace.

use std::{cell::Cell, cell::RefCell, rc::Rc};

use cantrip::{
    Breakpoint, ClassBuilder, CompileMode, CompilerBackend, Context, DebugHandler, DebugInfoBlock, DebugVarInfo,
    Engine, EngineResult, ErrorKind, Expr, FunctionBuilder, FunctionCall, Locals, Module, OperatorId, Script,
    SourceFile, Stmt, Type, Value, Workspace,
    tracer::{RecordingTracer, TraceEvent},
};

fn fundamental_op(engine: &Engine, op: OperatorId, operand: Type) -> cantrip::Function {
    engine
        .root_namespace()
        .find_operators(op)
        .into_iter()
        .find(|f| f.parameter(0).map(Type::base) == Some(operand.base()))
        .expect("built-in operator is installed")
}

// =============================================================================
// 1. Construction
// =============================================================================

#[test]
fn fundamentals_default_construct_and_convert() {
    let engine = Engine::new();
    assert_eq!(engine.construct(Type::INT, &[]).unwrap().as_int(), Some(0));
    assert_eq!(engine.construct(Type::BOOL, &[]).unwrap().as_bool(), Some(false));
    assert_eq!(
        engine.construct(Type::INT, &[Value::double(3.9)]).unwrap().as_int(),
        Some(3)
    );
}

/// Wrong arity is reported before any constructor body runs.
#[test]
fn construction_arity_errors_precede_constructor_execution() {
    let engine = Engine::new();
    let ran = Rc::new(Cell::new(false));
    let class = engine.register_class(ClassBuilder::new("Box")).unwrap();
    let id = class.id();
    let ran_ = ran.clone();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::INT)
            .callback(move |_call| {
                ran_.set(true);
                Ok(Value::object(id))
            }),
    );

    let err = engine
        .construct(id, &[Value::int(1), Value::int(2), Value::int(3)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyArgumentInInitialization);
    assert!(!ran.get());

    let err = engine.construct(id, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooFewArgumentInInitialization);
    assert!(!ran.get());
}

#[test]
fn deleted_constructor_is_reported() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("NoMake")).unwrap();
    let id = class.id();
    class.new_constructor(FunctionBuilder::constructor().returns(id).param(Type::INT).deleted());

    let err = engine.construct(id, &[Value::int(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstructorIsDeleted);
}

#[test]
fn no_matching_constructor_is_reported() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Picky")).unwrap();
    let id = class.id();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::STRING)
            .callback(move |_call| Ok(Value::object(id))),
    );

    // One argument, but an int cannot become a String.
    let err = engine.construct(id, &[Value::int(5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatchingConstructor);
}

#[test]
fn constructor_defaults_fill_the_missing_tail() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Point")).unwrap();
    let id = class.id();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .params([Type::INT, Type::INT])
            .default_argument(Expr::literal(Value::int(9)))
            .callback(move |call| {
                let object = Value::object(id);
                object.push_member(call.arg(1));
                object.push_member(call.arg(2));
                Ok(object)
            }),
    );

    let p = engine.construct(id, &[Value::int(1)]).unwrap();
    assert_eq!(p.member_at(0).and_then(|m| m.as_int()), Some(1));
    assert_eq!(p.member_at(1).and_then(|m| m.as_int()), Some(9));
}

// =============================================================================
// 2. Copy / destroy discipline
// =============================================================================

#[test]
fn copying_then_destroying_the_copy_leaves_the_original_alone() {
    let engine = Engine::new();
    let v = Value::int(5);
    let copy = engine.copy(&v).unwrap();
    assert!(!copy.same_as(&v));
    assert_eq!(v.ref_count(), 1);

    engine.destroy(copy).unwrap();
    assert_eq!(v.as_int(), Some(5), "destroying the copy must not touch the original");
}

#[test]
fn destructor_runs_once_and_payload_is_cleared() {
    let engine = Engine::new();
    let destroyed = Rc::new(Cell::new(0));
    let class = engine.register_class(ClassBuilder::new("Guarded")).unwrap();
    let id = class.id();
    let counter = destroyed.clone();
    class.new_destructor(FunctionBuilder::destructor().callback(move |_call| {
        counter.set(counter.get() + 1);
        Ok(Value::void())
    }));

    let v = Value::object(id);
    v.push_member(Value::int(1));
    engine.destroy(v.clone()).unwrap();
    assert_eq!(destroyed.get(), 1);
    assert!(v.is_void(), "the payload is cleared in place");
}

#[test]
fn void_singleton_is_exempt_from_destruction() {
    let engine = Engine::new();
    let v = Value::void();
    engine.destroy(v).unwrap();
    assert!(Value::void().is_void());
}

#[test]
fn lambda_copy_is_deep_per_capture() {
    let engine = Engine::new();
    let closure = cantrip::ClosureType::new(
        vec![cantrip::Capture::new(Type::INT, "a")],
        cantrip::Prototype::new(Type::VOID),
    );
    let closure_id = engine.type_system().register_closure_type(closure.clone()).unwrap();
    let mut lambda = cantrip::LambdaObject::new(closure);
    lambda.push_capture(Value::int(5));
    let original = Value::lambda(closure_id, lambda);

    let copy = engine.copy(&original).unwrap();

    let capture_of = |v: &Value| {
        let expr = Rc::new(Expr::CaptureAccess {
            lambda: Expr::literal(v.clone()),
            offset: 0,
        });
        engine.eval_expr(&expr).unwrap()
    };

    capture_of(&copy).set_int(9);
    assert_eq!(capture_of(&copy).as_int(), Some(9));
    assert_eq!(
        capture_of(&original).as_int(),
        Some(5),
        "the copy's capture must be an independent cell"
    );
}

#[test]
fn locals_destroy_unshared_values_on_drop() {
    let engine = Engine::new();
    let destroyed = Rc::new(Cell::new(0));
    let class = engine.register_class(ClassBuilder::new("Tmp")).unwrap();
    let id = class.id();
    let counter = destroyed.clone();
    class.new_destructor(FunctionBuilder::destructor().callback(move |_call| {
        counter.set(counter.get() + 1);
        Ok(Value::void())
    }));

    let survivor = Value::object(id);
    {
        let mut locals = Locals::new(&engine);
        locals.push(Value::object(id));
        locals.push(survivor.clone());
        assert_eq!(locals.len(), 2);
    }
    assert_eq!(destroyed.get(), 1, "only the unshared value is destroyed");
    assert!(!survivor.is_void());
}

// =============================================================================
// 3. Eval through a compiler backend
// =============================================================================

/// A test double for the external compiler: recognizes the few forms the
/// scenarios need and lowers them to IR.
struct MiniBackend;

impl MiniBackend {
    fn lower(source: &str, context: &Context, engine: &Engine) -> EngineResult<Rc<Expr>> {
        let source = source.trim();
        let add = fundamental_op(engine, OperatorId::Addition, Type::INT);
        let le = fundamental_op(engine, OperatorId::LessEqual, Type::INT);

        if let Some((name, rhs)) = source.split_once("<=") {
            let var = context
                .get_var(name.trim())
                .ok_or_else(|| cantrip::EngineError::new(ErrorKind::EvaluationError, "unknown variable"))?;
            let value: i32 = rhs.trim().parse().unwrap_or(0);
            return Ok(Expr::call(le, vec![Expr::variable(var), Expr::literal(Value::int(value))]));
        }
        if let Some((name, rhs)) = source.split_once('+') {
            let var = context
                .get_var(name.trim())
                .ok_or_else(|| cantrip::EngineError::new(ErrorKind::EvaluationError, "unknown variable"))?;
            let value: i32 = rhs.trim().parse().unwrap_or(0);
            return Ok(Expr::call(add, vec![Expr::variable(var), Expr::literal(Value::int(value))]));
        }
        if let Some((name, rhs)) = source.split_once('=') {
            let value: i32 = rhs
                .trim()
                .parse()
                .map_err(|_| cantrip::EngineError::new(ErrorKind::EvaluationError, "unsupported literal"))?;
            return Ok(Rc::new(Expr::Bind {
                name: name.trim().to_owned(),
                context: context.clone(),
                value: Expr::copy(Expr::literal(Value::int(value))),
            }));
        }
        Err(cantrip::EngineError::new(ErrorKind::EvaluationError, "unsupported input"))
    }
}

impl CompilerBackend for MiniBackend {
    fn compile(&mut self, _script: &Script, _mode: CompileMode, _engine: &Engine) -> bool {
        false
    }

    fn eval(&mut self, source: &str, context: &Context, engine: &Engine) -> EngineResult<Rc<Expr>> {
        Self::lower(source, context, engine)
    }
}

#[test]
fn eval_binds_reads_and_compares_context_variables() {
    let engine = Engine::new();
    engine.set_compiler(Box::new(MiniBackend));

    let bound = engine.eval("a = 5").unwrap();
    assert_eq!(bound.as_int(), Some(5));
    assert_eq!(engine.current_context().get_var("a").and_then(|v| v.as_int()), Some(5));

    assert_eq!(engine.eval("a + 3").unwrap().as_int(), Some(8));
    assert_eq!(engine.eval("a <= 5").unwrap().as_bool(), Some(true));
}

#[test]
fn eval_without_a_backend_reports_not_implemented() {
    let engine = Engine::new();
    let err = engine.eval("1 + 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}

// =============================================================================
// 4. Scripts and globals
// =============================================================================

fn script_with_two_globals(engine: &Engine) -> Script {
    let script = engine.new_script(SourceFile::with_path("demo.cs", "int a = 5; int b = a + 1;"));
    let add = fundamental_op(engine, OperatorId::Addition, Type::INT);

    // Frame layout of the root function: 0 ret, 1 a, 2 b.
    let body = Stmt::compound(vec![
        Stmt::push_value(Expr::copy(Expr::literal(Value::int(5)))),
        Rc::new(Stmt::PushGlobal {
            script: script.clone(),
            stack_index: 1,
        }),
        Stmt::push_value(Expr::call(add, vec![Expr::stack_value(1), Expr::literal(Value::int(1))])),
        Rc::new(Stmt::PushGlobal {
            script: script.clone(),
            stack_index: 2,
        }),
    ]);
    let root = FunctionBuilder::function("__root").body(body).build();
    script.set_root_function(root);
    script.add_global_name("a", 0);
    script.add_global_name("b", 1);
    script
}

#[test]
fn running_a_script_populates_its_globals() {
    let engine = Engine::new();
    let script = script_with_two_globals(&engine);
    script.run(&engine).unwrap();

    assert_eq!(script.globals().len(), 2);
    assert_eq!(script.find_global("a").and_then(|v| v.as_int()), Some(5));
    assert_eq!(script.find_global("b").and_then(|v| v.as_int()), Some(6));
}

#[test]
fn running_a_script_twice_produces_identical_globals() {
    let engine = Engine::new();
    let script = script_with_two_globals(&engine);
    script.run(&engine).unwrap();
    let first: Vec<Option<i32>> = script.globals().iter().map(Value::as_int).collect();
    script.run(&engine).unwrap();
    let second: Vec<Option<i32>> = script.globals().iter().map(Value::as_int).collect();
    assert_eq!(first, second);
    assert_eq!(script.globals().len(), 2, "globals are rebuilt, not appended");
}

#[test]
fn compiling_without_backend_fails_with_a_diagnostic() {
    let engine = Engine::new();
    let script = engine.new_script(SourceFile::from_string("int x;"));
    assert!(!script.compile(&engine));
    assert!(!script.is_compiled());
    assert!(!script.messages().is_empty());
}

// =============================================================================
// 5. Modules
// =============================================================================

#[test]
fn native_module_load_is_idempotent() {
    let engine = Engine::new();
    let loads = Rc::new(Cell::new(0));
    let loads_ = loads.clone();
    let module = engine.new_native_module(
        "geometry",
        Rc::new(move |_engine, ns| {
            loads_.set(loads_.get() + 1);
            ns.add_var("tau", Value::double(6.28));
            Ok(())
        }),
        None,
    );

    module.load(&engine).unwrap();
    module.load(&engine).unwrap();
    assert_eq!(loads.get(), 1, "loading a loaded module is a no-op");
    assert!(module.is_loaded());
    assert_eq!(
        module.global_namespace().find_var("tau").and_then(|v| v.as_double()),
        Some(6.28)
    );

    module.unload(&engine).unwrap();
    assert!(!module.is_loaded());
}

#[test]
fn group_module_loads_children_recursively() {
    let engine = Engine::new();
    let loaded = Rc::new(Cell::new(0));
    let group = engine.new_module("std");
    for name in ["io", "net"] {
        let loaded_ = loaded.clone();
        let child = engine.new_native_module(
            name,
            Rc::new(move |_engine, _ns| {
                loaded_.set(loaded_.get() + 1);
                Ok(())
            }),
            None,
        );
        group.add_child(child);
    }

    group.load(&engine).unwrap();
    assert_eq!(loaded.get(), 2);
    assert!(group.child("io").is_some_and(|m: Module| m.is_loaded()));
}

#[test]
fn failing_module_load_reports_module_loading_error() {
    let engine = Engine::new();
    let module = engine.new_native_module(
        "broken",
        Rc::new(|_engine, _ns| Err(cantrip::EngineError::new(ErrorKind::RuntimeError, "boom"))),
        None,
    );
    let err = module.load(&engine).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleLoadingError);
    assert!(!module.is_loaded());
}

// =============================================================================
// 6. Tracing and debugging
// =============================================================================

#[test]
fn tracer_observes_type_registration_and_calls() {
    let engine = Engine::new();
    let tracer = Rc::new(RecordingTracer::new());
    engine.set_tracer(tracer.clone());

    let class = engine.register_class(ClassBuilder::new("Seen")).unwrap();
    let f = FunctionBuilder::function("traced")
        .returns(Type::INT)
        .callback(|_c| Ok(Value::int(0)))
        .build();
    f.invoke(&engine, &[]).unwrap();

    let events = tracer.events();
    assert!(events.contains(&TraceEvent::TypeRegistered { ty: class.id() }));
    assert!(events.contains(&TraceEvent::FunctionEntered {
        name: "traced".to_owned()
    }));
    assert!(events.contains(&TraceEvent::FunctionLeft {
        name: "traced".to_owned()
    }));
}

struct RecordingHandler {
    hits: RefCell<Vec<(usize, Vec<(String, Option<i32>)>)>>,
}

impl DebugHandler for RecordingHandler {
    fn interrupt(&self, call: &mut FunctionCall<'_>, breakpoint: &Breakpoint) {
        let workspace = Workspace::new(call);
        let vars = workspace
            .vars()
            .iter()
            .map(|v| (v.name.clone(), v.value.as_int()))
            .collect();
        self.hits.borrow_mut().push((breakpoint.line, vars));
    }
}

#[test]
fn armed_breakpoint_interrupts_and_exposes_live_variables() {
    let engine = Engine::new();
    let handler = Rc::new(RecordingHandler {
        hits: RefCell::new(Vec::new()),
    });
    engine.set_debug_handler(handler.clone());

    let bp = Breakpoint::new(3);
    bp.set_debug_info(Rc::new(DebugInfoBlock {
        parent: None,
        vars: vec![DebugVarInfo {
            name: "x".to_owned(),
            ty: Type::INT,
            stack_index: 1,
        }],
    }));

    let body = Stmt::compound(vec![
        Stmt::push_value(Expr::copy(Expr::literal(Value::int(7)))),
        Rc::new(Stmt::Breakpoint(bp.clone())),
        Stmt::return_void(),
    ]);
    let f = FunctionBuilder::function("debugged").body(body).build();

    // Unarmed: the handler stays quiet.
    f.invoke(&engine, &[]).unwrap();
    assert!(handler.hits.borrow().is_empty());

    bp.status.set(1);
    f.invoke(&engine, &[]).unwrap();
    let hits = handler.hits.borrow();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 3);
    assert_eq!(hits[0].1, vec![("x".to_owned(), Some(7))]);
}

// =============================================================================
// 7. Enum values through the engine
// =============================================================================

#[test]
fn enum_construction_requires_a_value_of_the_same_enum() {
    let engine = Engine::new();
    let e = engine
        .register_enum(cantrip::EnumBuilder::new("Axis").value("X").value("Y").value("Z"))
        .unwrap();

    let y = Value::enumerator(cantrip::Enumerator::new(e.clone(), 1));
    let copy = engine.construct(e.id(), &[y]).unwrap();
    assert_eq!(copy.as_enumerator().map(|en| en.value()), Some(1));
    assert_eq!(copy.as_enumerator().and_then(|en| en.key()), Some("Y".to_owned()));

    let err = engine.construct(e.id(), &[Value::int(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatchingConstructor);
    let err = engine.construct(e.id(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooFewArgumentInInitialization);
}

#[test]
fn string_values_support_the_builtin_interface() {
    let engine = Engine::new();
    let string_class = engine.type_system().get_class(Type::STRING).unwrap();
    let size = string_class.find_member_functions("size").pop().unwrap();

    let s = engine.construct(Type::STRING, &[]).unwrap();
    s.set_string("hello");
    assert_eq!(size.invoke(&engine, &[s.clone()]).unwrap().as_int(), Some(5));

    let plus = engine
        .root_namespace()
        .find_operators(OperatorId::Addition)
        .into_iter()
        .find(|f| f.parameter(0).map(|t| t.base()) == Some(Type::STRING) && f.parameter(1).map(|t| t.base()) == Some(Type::STRING))
        .unwrap();
    let out = plus.invoke(&engine, &[s, Value::string(" world")]).unwrap();
    assert_eq!(out.as_string().as_deref(), Some("hello world"));
}
