//! Tests for the template machinery: deduction, instance caching,
//! partial ordering and partial-specialization selection.

use std::rc::Rc;

use cantrip::{
    ClassBuilder, Engine, FunctionBuilder, FunctionTemplate, PartialSpecialization, Prototype, TemplateArgument,
    TemplateParameter, TemplatePattern, Type, Value, select_function_template,
};

/// `template<typename T> T abs(const T&)`.
fn abs_template() -> FunctionTemplate {
    let template = FunctionTemplate::new(
        "abs",
        vec![TemplateParameter::type_param("T")],
        vec![TemplatePattern::ref_(TemplatePattern::const_(TemplatePattern::param(0)))],
    );
    template.set_backend(Rc::new(|_engine, _template, args| {
        let Some(ty) = args.first().and_then(TemplateArgument::as_type) else {
            return Err(cantrip::EngineError::new(
                cantrip::ErrorKind::TemplateInstantiationError,
                "abs needs a type",
            ));
        };
        Ok(FunctionBuilder::function("abs")
            .returns(ty)
            .param(Type::const_reference(ty))
            .callback(|call| {
                let n = call.arg(0).as_int().unwrap_or(0);
                Ok(Value::int(n.abs()))
            })
            .build())
    }));
    template
}

// =============================================================================
// 1. Function-template deduction
// =============================================================================

#[test]
fn call_with_int_argument_deduces_t_int() {
    let engine = Engine::new();
    let template = abs_template();

    let deduction = template.deduce(&[], &[Type::INT], engine.type_system());
    assert!(deduction.success());
    assert_eq!(deduction.arguments(), &[TemplateArgument::Type(Type::INT)]);

    let instance = template.get_instance(&engine, deduction.arguments()).unwrap();
    assert!(instance.instance_of().unwrap().same_as(&template));
    assert_eq!(instance.template_arguments(), vec![TemplateArgument::Type(Type::INT)]);

    let out = instance.invoke(&engine, &[Value::int(-5)]).unwrap();
    assert_eq!(out.as_int(), Some(5));
}

#[test]
fn instances_are_cached_and_idempotent() {
    let engine = Engine::new();
    let template = abs_template();
    let args = [TemplateArgument::Type(Type::INT)];
    let first = template.get_instance(&engine, &args).unwrap();
    let second = template.get_instance(&engine, &args).unwrap();
    assert!(first.same_as(&second), "getInstance must be idempotent");

    let other = template.get_instance(&engine, &[TemplateArgument::Type(Type::DOUBLE)]).unwrap();
    assert!(!first.same_as(&other));
}

#[test]
fn selection_discards_failed_deductions_and_orders_survivors() {
    let engine = Engine::new();
    let ts = engine.type_system();

    // f(T) and the more specialized f(Array<T>).
    let array_template = engine.array_template();
    let general = FunctionTemplate::new(
        "f",
        vec![TemplateParameter::type_param("T")],
        vec![TemplatePattern::param(0)],
    );
    let for_arrays = FunctionTemplate::new(
        "f",
        vec![TemplateParameter::type_param("T")],
        vec![TemplatePattern::template_id(array_template, vec![TemplatePattern::param(0)])],
    );

    let array_int = engine.array_type_of(Type::INT).unwrap();
    let candidates = [general.clone(), for_arrays.clone()];

    let (winner, args) = select_function_template(&candidates, &[], &[array_int], ts).unwrap();
    assert!(winner.same_as(&for_arrays));
    assert_eq!(args, vec![TemplateArgument::Type(Type::INT)]);

    let (winner, _) = select_function_template(&candidates, &[], &[Type::BOOL], ts).unwrap();
    assert!(winner.same_as(&general), "only the general candidate deduces for bool");
}

// =============================================================================
// 2. Class templates and partial specializations
// =============================================================================

/// Builds `template<typename T, typename U> class foo {}` with the three
/// specializations `<T, T>`, `<Array<T>, U>` and `<T, U(T)>`, each
/// tagged via the produced class name.
fn foo_template(engine: &Engine) -> cantrip::ClassTemplate {
    let template = cantrip::ClassTemplate::new(
        "foo",
        vec![TemplateParameter::type_param("T"), TemplateParameter::type_param("U")],
    );
    template.set_backend(backend_named("foo-primary"));
    template.add_specialization(PartialSpecialization {
        patterns: vec![TemplatePattern::param(0), TemplatePattern::param(0)],
        backend: backend_named("foo-same"),
    });
    template.add_specialization(PartialSpecialization {
        patterns: vec![
            TemplatePattern::template_id(engine.array_template(), vec![TemplatePattern::param(0)]),
            TemplatePattern::param(1),
        ],
        backend: backend_named("foo-array"),
    });
    template.add_specialization(PartialSpecialization {
        patterns: vec![
            TemplatePattern::param(0),
            TemplatePattern::function(TemplatePattern::param(1), vec![TemplatePattern::param(0)]),
        ],
        backend: backend_named("foo-function"),
    });
    template
}

fn backend_named(name: &'static str) -> cantrip::ClassTemplateBackend {
    Rc::new(move |engine, _template, _args| engine.type_system().register_class(ClassBuilder::new(name)))
}

#[test]
fn partial_specialization_selection_matches_the_reference_scenarios() {
    let engine = Engine::new();
    let template = foo_template(&engine);

    // foo<int, int> selects <T, T>.
    let instance = template
        .get_instance(&engine, &[TemplateArgument::Type(Type::INT), TemplateArgument::Type(Type::INT)])
        .unwrap();
    assert_eq!(instance.name(), "foo-same");

    // foo<Array<int>, bool> selects <Array<T>, U>.
    let array_int = engine.array_type_of(Type::INT).unwrap();
    let instance = template
        .get_instance(
            &engine,
            &[TemplateArgument::Type(array_int), TemplateArgument::Type(Type::BOOL)],
        )
        .unwrap();
    assert_eq!(instance.name(), "foo-array");

    // foo<int, void(int)> selects <T, U(T)>.
    let fn_type = engine
        .type_system()
        .function_type_for(&Prototype::with_params(Type::VOID, [Type::INT]));
    let instance = template
        .get_instance(
            &engine,
            &[TemplateArgument::Type(Type::INT), TemplateArgument::Type(fn_type.id())],
        )
        .unwrap();
    assert_eq!(instance.name(), "foo-function");

    // foo<int, double> matches no specialization and falls back to the
    // primary.
    let instance = template
        .get_instance(
            &engine,
            &[TemplateArgument::Type(Type::INT), TemplateArgument::Type(Type::DOUBLE)],
        )
        .unwrap();
    assert_eq!(instance.name(), "foo-primary");
}

#[test]
fn class_template_instances_record_their_origin() {
    let engine = Engine::new();
    let array_template = engine.array_template();
    let instance = array_template
        .get_instance(&engine, &[TemplateArgument::Type(Type::DOUBLE)])
        .unwrap();
    assert!(instance.instance_of().unwrap().same_as(&array_template));
    assert_eq!(instance.template_arguments(), vec![TemplateArgument::Type(Type::DOUBLE)]);
}

#[test]
fn defaulted_template_parameters_fill_missing_arguments() {
    let engine = Engine::new();
    let template = cantrip::ClassTemplate::new(
        "pair",
        vec![
            TemplateParameter::type_param("T"),
            TemplateParameter::type_param("U").with_default(TemplateArgument::Type(Type::INT)),
        ],
    );
    template.set_backend(backend_named("pair"));

    let instance = template.get_instance(&engine, &[TemplateArgument::Type(Type::BOOL)]).unwrap();
    let args = instance.template_arguments();
    assert_eq!(
        args,
        vec![TemplateArgument::Type(Type::BOOL), TemplateArgument::Type(Type::INT)]
    );

    let err = template.get_instance(&engine, &[]).unwrap_err();
    assert_eq!(err.kind(), cantrip::ErrorKind::TemplateInstantiationError);
}
