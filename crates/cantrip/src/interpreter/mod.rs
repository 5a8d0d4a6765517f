//! The tree-walking virtual machine: frame management, statement
//! execution and expression evaluation over the IR of [`crate::ir`].

mod context;
mod debug;

pub use context::{FrameFlag, FunctionCall};
pub(crate) use context::ExecutionContext;
pub use debug::{DebugHandler, DefaultDebugHandler, Workspace, WorkspaceVar};

use crate::{
    array::ArrayObject,
    closure::LambdaObject,
    conversion,
    engine::Engine,
    error::{EngineError, EngineResult},
    function::Function,
    initializer_list::InitializerListObject,
    ir::{Expr, Stmt},
    template::TemplateArgument,
    tracer::TraceEvent,
    types::Type,
    value::Value,
};

/// Invokes `f` with the argument range, pushing a frame, executing the
/// native callback or IR body, and popping the frame.
///
/// The stack and callstack are restored to their pre-call sizes when the
/// body fails, so a failed invocation leaves the engine usable.
pub(crate) fn invoke(engine: &Engine, f: &Function, args: &[Value]) -> EngineResult<Value> {
    if f.is_deleted() {
        return Err(EngineError::deleted_function_call(f.name()));
    }

    let sp = engine.with_exec(|ec| ec.stack.size());

    let pushed = (|| {
        engine.with_exec(|ec| ec.stack.push(Value::void()))?;
        for arg in args {
            engine.with_exec(|ec| ec.stack.push(arg.clone()))?;
        }
        engine.with_exec(|ec| ec.push_frame(f.clone(), sp))
    })();
    if let Err(e) = pushed {
        engine.with_exec(|ec| ec.stack.truncate(sp));
        return Err(e);
    }

    match invoke_pushed(engine, f) {
        Ok(()) => Ok(engine.with_exec(ExecutionContext::pop_frame)),
        Err(e) => {
            engine.with_exec(|ec| {
                ec.callstack.pop();
                ec.stack.truncate(sp);
            });
            Err(e)
        }
    }
}

/// Runs the body of the function whose frame is already on top.
fn invoke_pushed(engine: &Engine, f: &Function) -> EngineResult<()> {
    engine.trace(|| TraceEvent::FunctionEntered {
        name: f.name().to_string(),
    });

    let run = if let Some(native) = f.native_callback() {
        let frame_index = engine.with_exec(|ec| ec.callstack.size()) - 1;
        let mut call = FunctionCall::new(engine, frame_index);
        native(&mut call).map(|ret| call.set_return_value(ret))
    } else if let Some(body) = f.body() {
        exec_stmt(engine, &body)
    } else {
        Err(EngineError::not_implemented(format!(
            "call to bodyless function '{name}'",
            name = f.name()
        )))
    };

    if run.is_ok() && f.is_constructor() {
        // A script constructor leaves the object in the frame's object
        // slot; promote it to the return slot.
        engine.with_exec(|ec| {
            if let Some(frame) = ec.callstack.top() {
                let base = frame.stack_index;
                if frame.argc >= 1 && ec.stack.get(base).is_void() {
                    let object = ec.stack.get(base + 1);
                    ec.stack.set(base, object);
                }
            }
        });
    }

    engine.trace(|| TraceEvent::FunctionLeft {
        name: f.name().to_string(),
    });
    run
}

/// Evaluates an expression at the top level: temporaries produced during
/// evaluation are destroyed afterwards when nothing else holds them, on
/// the error path included.
pub(crate) fn eval(engine: &Engine, expr: &Expr) -> EngineResult<Value> {
    let (gc_size, il_size) = engine.with_exec(|ec| (ec.garbage.len(), ec.initializer_buffer.len()));
    let result = inner_eval(engine, expr);
    cleanup_temporaries(engine, gc_size, il_size);
    result
}

fn cleanup_temporaries(engine: &Engine, gc_size: usize, il_size: usize) {
    loop {
        let value = engine.with_exec(|ec| if ec.garbage.len() > gc_size { ec.garbage.pop() } else { None });
        match value {
            Some(v) => {
                if v.ref_count() == 1 {
                    engine.release(v);
                }
            }
            None => break,
        }
    }
    loop {
        let value = engine.with_exec(|ec| {
            if ec.initializer_buffer.len() > il_size {
                ec.initializer_buffer.pop()
            } else {
                None
            }
        });
        match value {
            Some(v) => {
                if v.ref_count() == 1 {
                    engine.release(v);
                }
            }
            None => break,
        }
    }
}

fn manage(engine: &Engine, value: Value) -> Value {
    engine.with_exec(|ec| ec.garbage.push(value.clone()));
    value
}

fn inner_eval(engine: &Engine, expr: &Expr) -> EngineResult<Value> {
    let value = eval_expr(engine, expr)?;
    Ok(manage(engine, value))
}

fn eval_condition(engine: &Engine, expr: &Expr) -> EngineResult<bool> {
    let v = eval(engine, expr)?;
    let b = v
        .as_bool()
        .ok_or_else(|| EngineError::evaluation_error("condition is not a boolean"))?;
    if v.ref_count() == 1 {
        engine.release(v);
    }
    Ok(b)
}

fn eval_for_side_effects(engine: &Engine, expr: &Expr) -> EngineResult<()> {
    let v = eval(engine, expr)?;
    if v.ref_count() == 1 {
        engine.release(v);
    }
    Ok(())
}

fn current_frame_index(engine: &Engine) -> usize {
    engine.with_exec(|ec| ec.callstack.size()).saturating_sub(1)
}

fn current_frame_base(engine: &Engine) -> usize {
    engine.with_exec(|ec| ec.callstack.top().map_or(0, |f| f.stack_index))
}

/// Executes one statement.
pub(crate) fn exec_stmt(engine: &Engine, stmt: &Stmt) -> EngineResult<()> {
    match stmt {
        Stmt::Compound { statements } => {
            for s in statements {
                exec_stmt(engine, s)?;
                let flags = engine.with_exec(|ec| ec.flags());
                if flags != FrameFlag::None {
                    return Ok(());
                }
            }
            Ok(())
        }
        Stmt::Expression { expr } => eval_for_side_effects(engine, expr),
        Stmt::If {
            condition,
            body,
            else_clause,
        } => {
            if eval_condition(engine, condition)? {
                exec_stmt(engine, body)
            } else if let Some(else_clause) = else_clause {
                exec_stmt(engine, else_clause)
            } else {
                Ok(())
            }
        }
        Stmt::While { condition, body } => {
            while eval_condition(engine, condition)? {
                exec_stmt(engine, body)?;
                let flags = engine.with_exec(|ec| ec.flags());
                if flags == FrameFlag::Return {
                    return Ok(());
                }
                engine.with_exec(|ec| ec.clear_flags());
                if flags == FrameFlag::Break {
                    break;
                }
            }
            Ok(())
        }
        Stmt::For {
            init,
            condition,
            advance,
            body,
            destroy,
        } => {
            exec_stmt(engine, init)?;
            while eval_condition(engine, condition)? {
                exec_stmt(engine, body)?;
                let flags = engine.with_exec(|ec| ec.flags());
                if flags == FrameFlag::Return {
                    return Ok(());
                }
                engine.with_exec(|ec| ec.clear_flags());
                if flags == FrameFlag::Break {
                    // The break statement already ran the destruction list
                    // covering the init-scope variables.
                    return Ok(());
                }
                eval_for_side_effects(engine, advance)?;
            }
            exec_stmt(engine, destroy)
        }
        Stmt::Return { value, destruction } => {
            let ret = match value {
                Some(expr) => eval(engine, expr)?,
                None => Value::void(),
            };
            for s in destruction {
                exec_stmt(engine, s)?;
            }
            let frame_index = current_frame_index(engine);
            FunctionCall::new(engine, frame_index).set_return_value(ret);
            Ok(())
        }
        Stmt::Break { destruction } => {
            for s in destruction {
                exec_stmt(engine, s)?;
            }
            engine.with_exec(|ec| {
                if let Some(frame) = ec.callstack.top_mut() {
                    frame.flags = FrameFlag::Break;
                }
            });
            Ok(())
        }
        Stmt::Continue { destruction } => {
            for s in destruction {
                exec_stmt(engine, s)?;
            }
            engine.with_exec(|ec| {
                if let Some(frame) = ec.callstack.top_mut() {
                    frame.flags = FrameFlag::Continue;
                }
            });
            Ok(())
        }
        Stmt::InitObject { object_type } => {
            let base = current_frame_base(engine);
            engine.with_exec(|ec| ec.stack.set(base + 1, Value::object(*object_type)));
            Ok(())
        }
        Stmt::Construction {
            object_type,
            constructor,
            arguments,
        } => {
            let mut args = Vec::with_capacity(arguments.len() + 1);
            args.push(Value::void());
            for a in arguments {
                args.push(eval(engine, a)?);
            }
            let object = invoke(engine, constructor, &args)?;
            object.set_type(*object_type);
            let base = current_frame_base(engine);
            engine.with_exec(|ec| ec.stack.set(base + 1, object));
            Ok(())
        }
        Stmt::PushDataMember { value } => {
            let frame_index = current_frame_index(engine);
            let object = FunctionCall::new(engine, frame_index).arg(0);
            let member = eval(engine, value)?;
            object.push_member(member);
            Ok(())
        }
        Stmt::PopDataMember { destructor } => {
            let frame_index = current_frame_index(engine);
            let object = FunctionCall::new(engine, frame_index).arg(0);
            if let Some(member) = object.pop_member() {
                engine.destroy_with(member, destructor.as_ref())?;
            }
            Ok(())
        }
        Stmt::PushValue { value } => {
            let v = eval(engine, value)?;
            engine.with_exec(|ec| ec.stack.push(v))
        }
        Stmt::PopValue { destroy, destructor } => {
            let top = engine.with_exec(|ec| ec.stack.pop());
            if let Some(v) = top
                && *destroy
            {
                engine.destroy_with(v, destructor.as_ref())?;
            }
            Ok(())
        }
        Stmt::PushGlobal { script, stack_index } => {
            let base = current_frame_base(engine);
            let value = engine.with_exec(|ec| ec.stack.get(base + stack_index));
            script.push_global(value);
            Ok(())
        }
        Stmt::CppReturn { native } => {
            let frame_index = current_frame_index(engine);
            let mut call = FunctionCall::new(engine, frame_index);
            let ret = native(&mut call)?;
            call.set_return_value(ret);
            Ok(())
        }
        Stmt::Breakpoint(bp) => {
            let frame_index = current_frame_index(engine);
            let call = FunctionCall::new(engine, frame_index);
            call.set_last_breakpoint(bp.clone());
            if bp.status.get() != 0 {
                engine.trace(|| TraceEvent::BreakpointHit { line: bp.line });
                let handler = engine.debug_handler();
                let mut call = FunctionCall::new(engine, frame_index);
                handler.interrupt(&mut call, bp);
            }
            Ok(())
        }
    }
}

/// Evaluates one expression node.
fn eval_expr(engine: &Engine, expr: &Expr) -> EngineResult<Value> {
    match expr {
        Expr::Literal { value } | Expr::VariableAccess { value } => Ok(value.clone()),
        Expr::StackValue { stack_index } => {
            let base = current_frame_base(engine);
            Ok(engine.with_exec(|ec| ec.stack.get(base + stack_index)))
        }
        Expr::MemberAccess { object, offset } => {
            let object = inner_eval(engine, object)?;
            object
                .member_at(*offset)
                .ok_or_else(|| EngineError::evaluation_error(format!("no data member at offset {offset}")))
        }
        Expr::FetchGlobal { script, global_index } => script
            .global_at(*global_index)
            .ok_or_else(|| EngineError::evaluation_error(format!("no global at index {global_index}"))),
        Expr::Copy { argument } => {
            let value = inner_eval(engine, argument)?;
            engine.copy(&value)
        }
        Expr::FunctionCall { callee, arguments } => {
            let mut args = Vec::with_capacity(arguments.len());
            for a in arguments {
                args.push(inner_eval(engine, a)?);
            }
            invoke(engine, callee, &args)
        }
        Expr::VirtualCall {
            object,
            vtable_index,
            arguments,
        } => {
            let object = inner_eval(engine, object)?;
            let class = engine
                .type_system()
                .get_class(object.get_type())
                .ok_or_else(|| EngineError::unknown_type(object.get_type()))?;
            let callee = class
                .vtable()
                .get(*vtable_index)
                .cloned()
                .ok_or_else(|| EngineError::evaluation_error(format!("no vtable entry at {vtable_index}")))?;
            let mut args = Vec::with_capacity(arguments.len() + 1);
            args.push(object);
            for a in arguments {
                args.push(inner_eval(engine, a)?);
            }
            invoke(engine, &callee, &args)
        }
        Expr::ConstructorCall {
            object_type,
            constructor,
            arguments,
        } => {
            let mut args = Vec::with_capacity(arguments.len() + 1);
            args.push(Value::void());
            for a in arguments {
                args.push(inner_eval(engine, a)?);
            }
            let object = invoke(engine, constructor, &args)?;
            object.set_type(*object_type);
            Ok(object)
        }
        Expr::FunctionVariableCall { callee, arguments } => {
            let callee_value = inner_eval(engine, callee)?;
            let f = callee_value
                .as_function()
                .ok_or_else(|| EngineError::evaluation_error("callee is not a function value"))?;
            let mut args = Vec::with_capacity(arguments.len());
            for a in arguments {
                args.push(inner_eval(engine, a)?);
            }
            invoke(engine, &f, &args)
        }
        Expr::LambdaExpression { closure_type, captures } => {
            let closure = engine
                .type_system()
                .get_closure_type(*closure_type)
                .ok_or_else(|| EngineError::unknown_type(*closure_type))?;
            let mut lambda = LambdaObject::new(closure);
            for capture in captures {
                lambda.push_capture(inner_eval(engine, capture)?);
            }
            Ok(Value::lambda(*closure_type, lambda))
        }
        Expr::CaptureAccess { lambda, offset } => {
            let lambda = inner_eval(engine, lambda)?;
            lambda
                .with_lambda(|l| l.capture_at(*offset))
                .flatten()
                .ok_or_else(|| EngineError::evaluation_error(format!("no capture at offset {offset}")))
        }
        Expr::ArrayExpression { array_type, elements } => {
            let class = engine
                .type_system()
                .get_class(*array_type)
                .ok_or_else(|| EngineError::unknown_type(*array_type))?;
            let element_type = class
                .template_arguments()
                .first()
                .and_then(TemplateArgument::as_type)
                .unwrap_or(Type::AUTO);
            let mut values = Vec::with_capacity(elements.len());
            for e in elements {
                values.push(inner_eval(engine, e)?);
            }
            Ok(Value::array(*array_type, ArrayObject::with_elements(element_type, values)))
        }
        Expr::InitializerList { list_type, elements } => {
            let mut handles = Vec::with_capacity(elements.len());
            for e in elements {
                let v = inner_eval(engine, e)?;
                engine.with_exec(|ec| ec.initializer_buffer.push(v.clone()));
                handles.push(v);
            }
            Ok(Value::initializer_list(*list_type, InitializerListObject::new(handles)))
        }
        Expr::Conditional {
            condition,
            on_true,
            on_false,
        } => {
            let cond = inner_eval(engine, condition)?;
            let b = cond
                .as_bool()
                .ok_or_else(|| EngineError::evaluation_error("condition is not a boolean"))?;
            if b {
                inner_eval(engine, on_true)
            } else {
                inner_eval(engine, on_false)
            }
        }
        Expr::LogicalAnd { lhs, rhs } => {
            let cond = inner_eval(engine, lhs)?;
            match cond.as_bool() {
                Some(false) => Ok(cond),
                Some(true) => inner_eval(engine, rhs),
                None => Err(EngineError::evaluation_error("operand of && is not a boolean")),
            }
        }
        Expr::LogicalOr { lhs, rhs } => {
            let cond = inner_eval(engine, lhs)?;
            match cond.as_bool() {
                Some(true) => Ok(cond),
                Some(false) => inner_eval(engine, rhs),
                None => Err(EngineError::evaluation_error("operand of || is not a boolean")),
            }
        }
        Expr::Comma { lhs, rhs } => {
            let _ = inner_eval(engine, lhs)?;
            inner_eval(engine, rhs)
        }
        Expr::Bind { name, context, value } => {
            let v = inner_eval(engine, value)?;
            context.add_var(name.clone(), v.clone());
            Ok(v)
        }
        Expr::FundamentalConversion { dest_type, argument } => {
            let src = inner_eval(engine, argument)?;
            conversion::fundamental_conversion(&src, dest_type.base(), engine)
        }
    }
}
