//! Tests for the conversion engine: the fundamental matrix, ranking,
//! application, user-defined conversions and ambiguity detection.

use cantrip::{
    AccessSpecifier, ClassBuilder, Conversion, ConversionPolicy, ConversionRank, Engine, EnumBuilder,
    FunctionBuilder, StandardConversion, Type, Value,
};

// =============================================================================
// 1. Fundamental conversions
// =============================================================================

/// Every pair of fundamental types is convertible, with rank ExactMatch,
/// Promotion or Conversion.
#[test]
fn all_fundamental_pairs_are_convertible() {
    let engine = Engine::new();
    let fundamentals = [Type::BOOL, Type::CHAR, Type::INT, Type::FLOAT, Type::DOUBLE];
    for src in fundamentals {
        for dest in fundamentals {
            let conv = Conversion::compute(src, dest, engine.type_system(), ConversionPolicy::AllowExplicit);
            assert_ne!(conv.rank(), ConversionRank::NotConvertible, "{src:?} -> {dest:?}");
            assert!(
                matches!(
                    conv.rank(),
                    ConversionRank::ExactMatch | ConversionRank::Promotion | ConversionRank::Conversion
                ),
                "{src:?} -> {dest:?} ranked {rank:?}",
                rank = conv.rank()
            );
        }
    }
}

#[test]
fn applying_a_fundamental_conversion_produces_the_destination_type() {
    let engine = Engine::new();
    let ts = engine.type_system();
    let pairs = [
        (Value::bool_(true), Type::INT),
        (Value::int(3), Type::DOUBLE),
        (Value::double(2.75), Type::INT),
        (Value::char_('A'), Type::INT),
        (Value::int(65), Type::CHAR),
    ];
    for (src, dest) in pairs {
        let conv = Conversion::compute(src.get_type(), dest, ts, ConversionPolicy::AllowExplicit);
        let out = Conversion::apply(&conv, &src, &engine).unwrap();
        assert_eq!(out.get_type().base(), dest.base(), "{src:?} -> {dest:?}");
    }
}

#[test]
fn narrowing_values_truncate() {
    let engine = Engine::new();
    let conv = Conversion::compute(
        Type::DOUBLE,
        Type::INT,
        engine.type_system(),
        ConversionPolicy::AllowExplicit,
    );
    let out = Conversion::apply(&conv, &Value::double(2.75), &engine).unwrap();
    assert_eq!(out.as_int(), Some(2));
}

// =============================================================================
// 2. Enum conversions
// =============================================================================

#[test]
fn enum_converts_to_int_but_not_to_int_reference() {
    let engine = Engine::new();
    let e = engine
        .register_enum(EnumBuilder::new("Color").value("Red").value("Green"))
        .unwrap();
    let ts = engine.type_system();

    let conv = StandardConversion::compute(e.id(), Type::INT, ts);
    assert!(conv.is_enum_to_int());
    assert_eq!(conv.rank(), ConversionRank::Conversion);

    let conv = StandardConversion::compute(e.id(), Type::reference(Type::INT), ts);
    assert_eq!(conv, StandardConversion::not_convertible());

    let green = Value::enumerator(cantrip::Enumerator::new(e.clone(), 1));
    let out = engine.convert(&green, Type::INT).unwrap();
    assert_eq!(out.as_int(), Some(1));
}

// =============================================================================
// 3. Class conversions
// =============================================================================

fn copyable_class(engine: &Engine, name: &str, base: Option<cantrip::Class>) -> cantrip::Class {
    let mut builder = ClassBuilder::new(name);
    if let Some(base) = base {
        builder = builder.base(base);
    }
    let class = engine.register_class(builder).unwrap();
    let id = class.id();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::const_reference(id))
            .callback(move |call| {
                let src = call.arg(1);
                let copy = Value::object(id);
                for i in 0..src.member_count() {
                    copy.push_member(src.member_at(i).unwrap());
                }
                Ok(copy)
            }),
    );
    class
}

#[test]
fn derived_to_base_depth_is_tracked_and_shallower_wins() {
    let engine = Engine::new();
    let a = copyable_class(&engine, "A", None);
    let b = copyable_class(&engine, "B", Some(a.clone()));
    let c = copyable_class(&engine, "C", Some(b.clone()));
    let ts = engine.type_system();

    let to_base = StandardConversion::compute(c.id(), Type::const_reference(a.id()), ts);
    assert!(to_base.is_derived_to_base());
    assert_eq!(to_base.derived_to_base_depth(), 2);

    let to_middle = StandardConversion::compute(c.id(), Type::const_reference(b.id()), ts);
    assert_eq!(to_middle.derived_to_base_depth(), 1);
    assert!(to_middle < to_base, "shallower derived-to-base is the better conversion");

    // A base object is not convertible to a derived type.
    assert_eq!(
        StandardConversion::compute(a.id(), b.id(), ts),
        StandardConversion::not_convertible()
    );
}

#[test]
fn converting_constructor_is_found_and_ranked_user_defined() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Meters")).unwrap();
    let id = class.id();
    class.add_data_member(Type::INT, "value", AccessSpecifier::Public);
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::INT)
            .callback(move |call| {
                let object = Value::object(id);
                object.push_member(call.arg(1));
                Ok(object)
            }),
    );

    let conv = Conversion::compute(Type::INT, id, engine.type_system(), ConversionPolicy::AllowExplicit);
    assert!(conv.is_user_defined());
    assert_eq!(conv.rank(), ConversionRank::UserDefinedConversion);

    let out = Conversion::apply(&conv, &Value::int(42), &engine).unwrap();
    assert_eq!(out.get_type(), id);
    assert_eq!(out.member_at(0).and_then(|m| m.as_int()), Some(42));
}

#[test]
fn explicit_constructor_is_skipped_when_policy_forbids() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Guarded")).unwrap();
    let id = class.id();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::INT)
            .explicit_()
            .callback(move |_call| Ok(Value::object(id))),
    );

    let allowed = Conversion::compute(Type::INT, id, engine.type_system(), ConversionPolicy::AllowExplicit);
    assert!(allowed.is_user_defined());

    let forbidden = Conversion::compute(Type::INT, id, engine.type_system(), ConversionPolicy::NoExplicitConversions);
    assert!(forbidden.is_invalid());
}

#[test]
fn ambiguous_converting_constructors_yield_not_convertible() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Torn")).unwrap();
    let id = class.id();
    // Two constructors, equally good for a bool argument (both promotions).
    for param in [Type::INT, Type::DOUBLE] {
        class.new_constructor(
            FunctionBuilder::constructor()
                .returns(id)
                .param(param)
                .callback(move |_call| Ok(Value::object(id))),
        );
    }
    let conv = Conversion::compute(Type::BOOL, id, engine.type_system(), ConversionPolicy::AllowExplicit);
    assert!(conv.is_invalid(), "a tie between converting constructors is an ambiguity");
}

#[test]
fn cast_function_converts_source_class() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Celsius")).unwrap();
    let id = class.id();
    class.new_cast(
        FunctionBuilder::cast(Type::DOUBLE)
            .const_()
            .callback(|call| Ok(Value::double(f64::from(call.arg(0).member_at(0).and_then(|m| m.as_int()).unwrap_or(0))))),
    );

    let conv = Conversion::compute(id, Type::DOUBLE, engine.type_system(), ConversionPolicy::AllowExplicit);
    assert!(conv.is_user_defined());

    let object = Value::object(id);
    object.push_member(Value::int(21));
    let out = Conversion::apply(&conv, &object, &engine).unwrap();
    assert_eq!(out.as_double(), Some(21.0));
}

// =============================================================================
// 4. Reference discipline
// =============================================================================

#[test]
fn const_source_cannot_bind_to_mutable_reference() {
    let engine = Engine::new();
    let conv = Conversion::compute(
        Type::INT.with_const(),
        Type::reference(Type::INT),
        engine.type_system(),
        ConversionPolicy::AllowExplicit,
    );
    assert!(conv.is_invalid());
}

#[test]
fn reference_conversion_returns_the_same_value() {
    let engine = Engine::new();
    let conv = Conversion::compute(
        Type::INT,
        Type::const_reference(Type::INT),
        engine.type_system(),
        ConversionPolicy::AllowExplicit,
    );
    let v = Value::int(9);
    let out = Conversion::apply(&conv, &v, &engine).unwrap();
    assert!(out.same_as(&v), "a reference bind must not copy");
}
