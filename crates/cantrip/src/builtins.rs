//! Installation of the built-in operators over the fundamental types.
//!
//! Every operator is a native [`Function`] registered in the root
//! namespace; overload resolution and the conversion engine make mixed
//! arithmetic work through promotions.

use crate::{
    engine::Engine,
    error::EngineError,
    function::FunctionBuilder,
    namespace::Namespace,
    operators::OperatorId,
    types::Type,
    value::Value,
};

/// Registers assignment for a fundamental type.
macro_rules! assignment_op {
    ($ns:expr, $t:expr, $as:ident, $set:ident) => {
        $ns.add_function(
            FunctionBuilder::operator(OperatorId::Assignment)
                .returns(Type::reference($t))
                .params([Type::reference($t), Type::const_reference($t)])
                .callback(|call| {
                    let dest = call.arg(0);
                    if let Some(v) = call.arg(1).$as() {
                        dest.$set(v);
                    }
                    Ok(dest)
                })
                .build(),
        );
    };
}

/// Registers a binary operator producing a value of the same type.
macro_rules! binary_op {
    ($ns:expr, $op:ident, $t:expr, $as:ident, $mk:ident, $f:expr) => {
        $ns.add_function(
            FunctionBuilder::operator(OperatorId::$op)
                .returns($t)
                .params([$t, $t])
                .callback(|call| {
                    let a = call.arg(0).$as().unwrap_or_default();
                    let b = call.arg(1).$as().unwrap_or_default();
                    ($f)(a, b).map(Value::$mk)
                })
                .build(),
        );
    };
}

/// Registers a compound assignment built from a binary function.
macro_rules! compound_op {
    ($ns:expr, $op:ident, $t:expr, $as:ident, $set:ident, $f:expr) => {
        $ns.add_function(
            FunctionBuilder::operator(OperatorId::$op)
                .returns(Type::reference($t))
                .params([Type::reference($t), Type::const_reference($t)])
                .callback(|call| {
                    let dest = call.arg(0);
                    let a = dest.$as().unwrap_or_default();
                    let b = call.arg(1).$as().unwrap_or_default();
                    dest.$set(($f)(a, b)?);
                    Ok(dest)
                })
                .build(),
        );
    };
}

/// Registers a comparison operator over a fundamental type.
macro_rules! comparison_op {
    ($ns:expr, $op:ident, $t:expr, $as:ident, $f:expr) => {
        $ns.add_function(
            FunctionBuilder::operator(OperatorId::$op)
                .returns(Type::BOOL)
                .params([$t, $t])
                .callback(|call| {
                    let a = call.arg(0).$as().unwrap_or_default();
                    let b = call.arg(1).$as().unwrap_or_default();
                    Ok(Value::bool_(($f)(&a, &b)))
                })
                .build(),
        );
    };
}

macro_rules! all_comparisons {
    ($ns:expr, $t:expr, $as:ident) => {
        comparison_op!($ns, Equal, $t, $as, |a, b| a == b);
        comparison_op!($ns, Inequal, $t, $as, |a, b| a != b);
        comparison_op!($ns, Less, $t, $as, |a, b| a < b);
        comparison_op!($ns, LessEqual, $t, $as, |a, b| a <= b);
        comparison_op!($ns, Greater, $t, $as, |a, b| a > b);
        comparison_op!($ns, GreaterEqual, $t, $as, |a, b| a >= b);
    };
}

/// Registers a unary operator producing a value of the same type.
macro_rules! unary_op {
    ($ns:expr, $op:ident, $t:expr, $as:ident, $mk:ident, $f:expr) => {
        $ns.add_function(
            FunctionBuilder::operator(OperatorId::$op)
                .returns($t)
                .param($t)
                .callback(|call| {
                    let a = call.arg(0).$as().unwrap_or_default();
                    Ok(Value::$mk(($f)(a)))
                })
                .build(),
        );
    };
}

pub(crate) fn register_builtin_operators(engine: &Engine) {
    let root = engine.root_namespace();
    register_bool_operators(&root);
    register_char_operators(&root);
    register_int_operators(&root);
    register_float_operators(&root);
    register_double_operators(&root);
}

fn register_bool_operators(ns: &Namespace) {
    assignment_op!(ns, Type::BOOL, as_bool, set_bool);
    comparison_op!(ns, Equal, Type::BOOL, as_bool, |a, b| a == b);
    comparison_op!(ns, Inequal, Type::BOOL, as_bool, |a, b| a != b);
    unary_op!(ns, LogicalNot, Type::BOOL, as_bool, bool_, |a: bool| !a);
    // && and || also exist as functions; the compiler normally lowers
    // them to short-circuit IR instead.
    comparison_op!(ns, LogicalAnd, Type::BOOL, as_bool, |a: &bool, b: &bool| *a && *b);
    comparison_op!(ns, LogicalOr, Type::BOOL, as_bool, |a: &bool, b: &bool| *a || *b);
}

fn register_char_operators(ns: &Namespace) {
    assignment_op!(ns, Type::CHAR, as_char, set_char);
    all_comparisons!(ns, Type::CHAR, as_char);
}

fn div_checked(a: i32, b: i32) -> Result<i32, EngineError> {
    a.checked_div(b)
        .ok_or_else(|| EngineError::runtime_error("integer division by zero"))
}

fn rem_checked(a: i32, b: i32) -> Result<i32, EngineError> {
    a.checked_rem(b)
        .ok_or_else(|| EngineError::runtime_error("integer remainder by zero"))
}

fn register_int_operators(ns: &Namespace) {
    assignment_op!(ns, Type::INT, as_int, set_int);

    binary_op!(ns, Addition, Type::INT, as_int, int, |a: i32, b: i32| Ok(a.wrapping_add(b)));
    binary_op!(ns, Subtraction, Type::INT, as_int, int, |a: i32, b: i32| Ok(a.wrapping_sub(b)));
    binary_op!(ns, Multiplication, Type::INT, as_int, int, |a: i32, b: i32| Ok(a.wrapping_mul(b)));
    binary_op!(ns, Division, Type::INT, as_int, int, div_checked);
    binary_op!(ns, Remainder, Type::INT, as_int, int, rem_checked);
    binary_op!(ns, LeftShift, Type::INT, as_int, int, |a: i32, b: i32| {
        Ok(a.wrapping_shl(b as u32))
    });
    binary_op!(ns, RightShift, Type::INT, as_int, int, |a: i32, b: i32| {
        Ok(a.wrapping_shr(b as u32))
    });
    binary_op!(ns, BitwiseAnd, Type::INT, as_int, int, |a: i32, b: i32| Ok(a & b));
    binary_op!(ns, BitwiseOr, Type::INT, as_int, int, |a: i32, b: i32| Ok(a | b));
    binary_op!(ns, BitwiseXor, Type::INT, as_int, int, |a: i32, b: i32| Ok(a ^ b));

    compound_op!(ns, AdditionAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a.wrapping_add(b))
    });
    compound_op!(ns, SubtractionAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a.wrapping_sub(b))
    });
    compound_op!(ns, MultiplicationAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a.wrapping_mul(b))
    });
    compound_op!(ns, DivisionAssignment, Type::INT, as_int, set_int, div_checked);
    compound_op!(ns, RemainderAssignment, Type::INT, as_int, set_int, rem_checked);
    compound_op!(ns, LeftShiftAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a.wrapping_shl(b as u32))
    });
    compound_op!(ns, RightShiftAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a.wrapping_shr(b as u32))
    });
    compound_op!(ns, BitwiseAndAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a & b)
    });
    compound_op!(ns, BitwiseOrAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a | b)
    });
    compound_op!(ns, BitwiseXorAssignment, Type::INT, as_int, set_int, |a: i32, b: i32| {
        Ok::<_, EngineError>(a ^ b)
    });

    all_comparisons!(ns, Type::INT, as_int);

    unary_op!(ns, UnaryPlus, Type::INT, as_int, int, |a: i32| a);
    unary_op!(ns, UnaryMinus, Type::INT, as_int, int, i32::wrapping_neg);
    unary_op!(ns, BitwiseNot, Type::INT, as_int, int, |a: i32| !a);

    // Pre-increment and pre-decrement return the mutated operand.
    for (op, delta) in [(OperatorId::PreIncrement, 1i32), (OperatorId::PreDecrement, -1i32)] {
        ns.add_function(
            FunctionBuilder::operator(op)
                .returns(Type::reference(Type::INT))
                .param(Type::reference(Type::INT))
                .callback(move |call| {
                    let v = call.arg(0);
                    let n = v.as_int().unwrap_or_default();
                    v.set_int(n.wrapping_add(delta));
                    Ok(v)
                })
                .build(),
        );
    }

    // Post-increment and post-decrement return the previous value.
    for (op, delta) in [(OperatorId::PostIncrement, 1i32), (OperatorId::PostDecrement, -1i32)] {
        ns.add_function(
            FunctionBuilder::operator(op)
                .returns(Type::INT)
                .param(Type::reference(Type::INT))
                .callback(move |call| {
                    let v = call.arg(0);
                    let n = v.as_int().unwrap_or_default();
                    v.set_int(n.wrapping_add(delta));
                    Ok(Value::int(n))
                })
                .build(),
        );
    }
}

fn register_float_operators(ns: &Namespace) {
    assignment_op!(ns, Type::FLOAT, as_float, set_float);
    binary_op!(ns, Addition, Type::FLOAT, as_float, float, |a: f32, b: f32| Ok(a + b));
    binary_op!(ns, Subtraction, Type::FLOAT, as_float, float, |a: f32, b: f32| Ok(a - b));
    binary_op!(ns, Multiplication, Type::FLOAT, as_float, float, |a: f32, b: f32| Ok(a * b));
    binary_op!(ns, Division, Type::FLOAT, as_float, float, |a: f32, b: f32| Ok(a / b));
    compound_op!(ns, AdditionAssignment, Type::FLOAT, as_float, set_float, |a: f32, b: f32| {
        Ok::<_, EngineError>(a + b)
    });
    compound_op!(ns, SubtractionAssignment, Type::FLOAT, as_float, set_float, |a: f32, b: f32| {
        Ok::<_, EngineError>(a - b)
    });
    compound_op!(ns, MultiplicationAssignment, Type::FLOAT, as_float, set_float, |a: f32, b: f32| {
        Ok::<_, EngineError>(a * b)
    });
    compound_op!(ns, DivisionAssignment, Type::FLOAT, as_float, set_float, |a: f32, b: f32| {
        Ok::<_, EngineError>(a / b)
    });
    all_comparisons!(ns, Type::FLOAT, as_float);
    unary_op!(ns, UnaryPlus, Type::FLOAT, as_float, float, |a: f32| a);
    unary_op!(ns, UnaryMinus, Type::FLOAT, as_float, float, |a: f32| -a);
}

fn register_double_operators(ns: &Namespace) {
    assignment_op!(ns, Type::DOUBLE, as_double, set_double);
    binary_op!(ns, Addition, Type::DOUBLE, as_double, double, |a: f64, b: f64| Ok(a + b));
    binary_op!(ns, Subtraction, Type::DOUBLE, as_double, double, |a: f64, b: f64| Ok(a - b));
    binary_op!(ns, Multiplication, Type::DOUBLE, as_double, double, |a: f64, b: f64| Ok(a * b));
    binary_op!(ns, Division, Type::DOUBLE, as_double, double, |a: f64, b: f64| Ok(a / b));
    compound_op!(ns, AdditionAssignment, Type::DOUBLE, as_double, set_double, |a: f64, b: f64| {
        Ok::<_, EngineError>(a + b)
    });
    compound_op!(ns, SubtractionAssignment, Type::DOUBLE, as_double, set_double, |a: f64, b: f64| {
        Ok::<_, EngineError>(a - b)
    });
    compound_op!(ns, MultiplicationAssignment, Type::DOUBLE, as_double, set_double, |a: f64, b: f64| {
        Ok::<_, EngineError>(a * b)
    });
    compound_op!(ns, DivisionAssignment, Type::DOUBLE, as_double, set_double, |a: f64, b: f64| {
        Ok::<_, EngineError>(a / b)
    });
    all_comparisons!(ns, Type::DOUBLE, as_double);
    unary_op!(ns, UnaryPlus, Type::DOUBLE, as_double, double, |a: f64| a);
    unary_op!(ns, UnaryMinus, Type::DOUBLE, as_double, double, |a: f64| -a);
}
