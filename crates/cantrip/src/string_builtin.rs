use crate::{
    class::ClassBuilder,
    engine::Engine,
    error::{EngineError, EngineResult},
    function::FunctionBuilder,
    operators::OperatorId,
    types::Type,
    value::Value,
};

fn string_of(v: &Value) -> String {
    v.as_string().unwrap_or_default()
}

/// Registers the built-in `String` class.
///
/// Called first during engine setup so the class lands in the first
/// class slot and its id equals [`Type::STRING`].
pub(crate) fn register_string_class(engine: &Engine) {
    let class = engine
        .type_system()
        .register_class(ClassBuilder::new("String"))
        .expect("String registration cannot fail on a fresh type system");
    debug_assert!(class.id() == Type::STRING);
    let id = class.id();

    class.new_constructor(FunctionBuilder::constructor().returns(id).callback(|_call| Ok(Value::string(""))));

    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::const_reference(id))
            .callback(|call| Ok(Value::string(string_of(&call.arg(1))))),
    );

    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::CHAR)
            .explicit_()
            .callback(|call| {
                let c = call.arg(1).as_char().unwrap_or_default();
                Ok(Value::string(c.to_string()))
            }),
    );

    class.new_destructor(FunctionBuilder::destructor().callback(|call| {
        call.arg(0).with_string_mut(String::clear);
        Ok(Value::void())
    }));

    class.new_method(
        FunctionBuilder::function("size")
            .returns(Type::INT)
            .const_()
            .callback(|call| {
                let len = call.arg(0).as_string().map_or(0, |s| s.chars().count());
                Ok(Value::int(len as i32))
            }),
    );

    class.new_method(
        FunctionBuilder::function("empty")
            .returns(Type::BOOL)
            .const_()
            .callback(|call| Ok(Value::bool_(call.arg(0).as_string().is_none_or(|s| s.is_empty())))),
    );

    class.new_method(
        FunctionBuilder::function("at")
            .returns(Type::CHAR)
            .param(Type::INT)
            .const_()
            .callback(|call| char_at(&call.arg(0), call.arg(1).as_int().unwrap_or(-1))),
    );

    class.new_method(FunctionBuilder::function("clear").callback(|call| {
        call.arg(0).with_string_mut(String::clear);
        Ok(Value::void())
    }));

    class.new_operator(
        FunctionBuilder::operator(OperatorId::Assignment)
            .returns(Type::reference(id))
            .param(Type::const_reference(id))
            .callback(|call| {
                let dest = call.arg(0);
                let src = string_of(&call.arg(1));
                dest.set_string(src);
                Ok(dest)
            }),
    );

    class.new_operator(
        FunctionBuilder::operator(OperatorId::AdditionAssignment)
            .returns(Type::reference(id))
            .param(Type::const_reference(id))
            .callback(|call| {
                let dest = call.arg(0);
                let src = string_of(&call.arg(1));
                dest.with_string_mut(|s| s.push_str(&src));
                Ok(dest)
            }),
    );

    class.new_operator(
        FunctionBuilder::operator(OperatorId::AdditionAssignment)
            .returns(Type::reference(id))
            .param(Type::CHAR)
            .callback(|call| {
                let dest = call.arg(0);
                let c = call.arg(1).as_char().unwrap_or_default();
                dest.with_string_mut(|s| s.push(c));
                Ok(dest)
            }),
    );

    class.new_operator(
        FunctionBuilder::operator(OperatorId::Subscript)
            .returns(Type::CHAR)
            .param(Type::INT)
            .const_()
            .callback(|call| char_at(&call.arg(0), call.arg(1).as_int().unwrap_or(-1))),
    );

    // Free operators over String live in the root namespace.
    let root = engine.root_namespace();

    root.add_function(
        FunctionBuilder::operator(OperatorId::Addition)
            .returns(id)
            .params([Type::const_reference(id), Type::const_reference(id)])
            .callback(|call| {
                let mut s = string_of(&call.arg(0));
                s.push_str(&string_of(&call.arg(1)));
                Ok(Value::string(s))
            })
            .build(),
    );

    root.add_function(
        FunctionBuilder::operator(OperatorId::Addition)
            .returns(id)
            .params([Type::const_reference(id), Type::CHAR])
            .callback(|call| {
                let mut s = string_of(&call.arg(0));
                s.push(call.arg(1).as_char().unwrap_or_default());
                Ok(Value::string(s))
            })
            .build(),
    );

    let comparisons: [(OperatorId, fn(&str, &str) -> bool); 6] = [
        (OperatorId::Equal, |a, b| a == b),
        (OperatorId::Inequal, |a, b| a != b),
        (OperatorId::Less, |a, b| a < b),
        (OperatorId::LessEqual, |a, b| a <= b),
        (OperatorId::Greater, |a, b| a > b),
        (OperatorId::GreaterEqual, |a, b| a >= b),
    ];
    for (op, cmp) in comparisons {
        root.add_function(
            FunctionBuilder::operator(op)
                .returns(Type::BOOL)
                .params([Type::const_reference(id), Type::const_reference(id)])
                .callback(move |call| {
                    let a = string_of(&call.arg(0));
                    let b = string_of(&call.arg(1));
                    Ok(Value::bool_(cmp(&a, &b)))
                })
                .build(),
        );
    }
}

fn char_at(s: &Value, index: i32) -> EngineResult<Value> {
    if index < 0 {
        return Err(EngineError::runtime_error(format!("string index {index} is negative")));
    }
    s.as_string()
        .and_then(|s| s.chars().nth(index as usize))
        .map(Value::char_)
        .ok_or_else(|| EngineError::runtime_error(format!("string index {index} out of range")))
}
