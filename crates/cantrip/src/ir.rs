use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    context::Context,
    function::{Function, NativeCallback},
    script::Script,
    types::Type,
    value::Value,
};

/// A variable visible at a breakpoint: its declared name, type and slot
/// relative to the frame's stack base.
#[derive(Debug, Clone)]
pub struct DebugVarInfo {
    pub name: String,
    pub ty: Type,
    pub stack_index: usize,
}

/// A block of compiler-emitted debug information, chained from innermost
/// to outermost block.
#[derive(Debug, Clone, Default)]
pub struct DebugInfoBlock {
    pub parent: Option<Rc<DebugInfoBlock>>,
    pub vars: Vec<DebugVarInfo>,
}

impl DebugInfoBlock {
    /// All variables live in this block, outermost first.
    #[must_use]
    pub fn live_vars(&self) -> Vec<DebugVarInfo> {
        let mut vars = self.parent.as_ref().map(|p| p.live_vars()).unwrap_or_default();
        vars.extend(self.vars.iter().cloned());
        vars
    }
}

/// A debug interrupt point emitted in debug compile mode.
///
/// The interpreter triggers the installed debug handler when it executes
/// a breakpoint whose `status` is non-zero.
pub struct Breakpoint {
    pub line: usize,
    pub status: Cell<i32>,
    pub debug_info: RefCell<Option<Rc<DebugInfoBlock>>>,
}

impl Breakpoint {
    #[must_use]
    pub fn new(line: usize) -> Rc<Self> {
        Rc::new(Self {
            line,
            status: Cell::new(0),
            debug_info: RefCell::new(None),
        })
    }

    pub fn set_debug_info(&self, info: Rc<DebugInfoBlock>) {
        *self.debug_info.borrow_mut() = Some(info);
    }
}

impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Breakpoint(line {line}, status {s})", line = self.line, s = self.status.get())
    }
}

/// A statement of the interpreter's program representation.
///
/// The external compiler lowers the AST to this tree and attaches bodies
/// to functions; the interpreter only ever executes this form.
pub enum Stmt {
    Compound {
        statements: Vec<Rc<Stmt>>,
    },
    Expression {
        expr: Rc<Expr>,
    },
    If {
        condition: Rc<Expr>,
        body: Rc<Stmt>,
        else_clause: Option<Rc<Stmt>>,
    },
    While {
        condition: Rc<Expr>,
        body: Rc<Stmt>,
    },
    For {
        init: Rc<Stmt>,
        condition: Rc<Expr>,
        advance: Rc<Expr>,
        body: Rc<Stmt>,
        destroy: Rc<Stmt>,
    },
    Return {
        value: Option<Rc<Expr>>,
        destruction: Vec<Rc<Stmt>>,
    },
    Break {
        destruction: Vec<Rc<Stmt>>,
    },
    Continue {
        destruction: Vec<Rc<Stmt>>,
    },
    /// Replaces the frame's object slot with a fresh, memberless object
    /// of the given type; emitted at the start of constructor bodies.
    InitObject {
        object_type: Type,
    },
    /// Constructs an object through `constructor` and stores it in the
    /// frame's object slot; emitted for base/delegate construction.
    Construction {
        object_type: Type,
        constructor: Function,
        arguments: Vec<Rc<Expr>>,
    },
    /// Evaluates `value` and appends it to the frame object's sub-objects.
    PushDataMember {
        value: Rc<Expr>,
    },
    /// Pops the frame object's last sub-object, destroying it through the
    /// member's destructor when one is supplied.
    PopDataMember {
        destructor: Option<Function>,
    },
    PushValue {
        value: Rc<Expr>,
    },
    PopValue {
        destroy: bool,
        destructor: Option<Function>,
    },
    /// Publishes the value at `stack_index` (relative to the frame) as the
    /// next global of `script`.
    PushGlobal {
        script: Script,
        stack_index: usize,
    },
    /// Invokes a native callback and returns its result from the current
    /// frame; emitted as the whole body of native-backed script functions.
    CppReturn {
        native: NativeCallback,
    },
    Breakpoint(Rc<Breakpoint>),
}

/// An expression of the interpreter's program representation.
pub enum Expr {
    Literal {
        value: Value,
    },
    /// Direct access to a pre-resolved variable (e.g. a context variable).
    VariableAccess {
        value: Value,
    },
    /// A slot of the current frame, relative to its stack base.
    StackValue {
        stack_index: usize,
    },
    /// Sub-object access: `offset` is the absolute index within the
    /// object's member vector (`attributes_offset() + member index`).
    MemberAccess {
        object: Rc<Expr>,
        offset: usize,
    },
    FetchGlobal {
        script: Script,
        global_index: usize,
    },
    Copy {
        argument: Rc<Expr>,
    },
    FunctionCall {
        callee: Function,
        arguments: Vec<Rc<Expr>>,
    },
    /// Calls the function at `vtable_index` of the runtime class of
    /// `object`.
    VirtualCall {
        object: Rc<Expr>,
        vtable_index: usize,
        arguments: Vec<Rc<Expr>>,
    },
    ConstructorCall {
        object_type: Type,
        constructor: Function,
        arguments: Vec<Rc<Expr>>,
    },
    /// Calls the function wrapped in the callee value.
    FunctionVariableCall {
        callee: Rc<Expr>,
        arguments: Vec<Rc<Expr>>,
    },
    /// Allocates a closure of `closure_type`, evaluating and storing each
    /// capture in order.
    LambdaExpression {
        closure_type: Type,
        captures: Vec<Rc<Expr>>,
    },
    CaptureAccess {
        lambda: Rc<Expr>,
        offset: usize,
    },
    ArrayExpression {
        array_type: Type,
        elements: Vec<Rc<Expr>>,
    },
    InitializerList {
        list_type: Type,
        elements: Vec<Rc<Expr>>,
    },
    Conditional {
        condition: Rc<Expr>,
        on_true: Rc<Expr>,
        on_false: Rc<Expr>,
    },
    LogicalAnd {
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    LogicalOr {
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    Comma {
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    /// Evaluates `value` and binds it under `name` in `context`.
    Bind {
        name: String,
        context: Context,
        value: Rc<Expr>,
    },
    FundamentalConversion {
        dest_type: Type,
        argument: Rc<Expr>,
    },
}

impl Stmt {
    #[must_use]
    pub fn compound(statements: Vec<Rc<Stmt>>) -> Rc<Self> {
        Rc::new(Self::Compound { statements })
    }

    #[must_use]
    pub fn expression(expr: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::Expression { expr })
    }

    #[must_use]
    pub fn if_(condition: Rc<Expr>, body: Rc<Stmt>) -> Rc<Self> {
        Rc::new(Self::If {
            condition,
            body,
            else_clause: None,
        })
    }

    #[must_use]
    pub fn if_else(condition: Rc<Expr>, body: Rc<Stmt>, else_clause: Rc<Stmt>) -> Rc<Self> {
        Rc::new(Self::If {
            condition,
            body,
            else_clause: Some(else_clause),
        })
    }

    #[must_use]
    pub fn while_(condition: Rc<Expr>, body: Rc<Stmt>) -> Rc<Self> {
        Rc::new(Self::While { condition, body })
    }

    #[must_use]
    pub fn return_(value: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::Return {
            value: Some(value),
            destruction: Vec::new(),
        })
    }

    #[must_use]
    pub fn return_void() -> Rc<Self> {
        Rc::new(Self::Return {
            value: None,
            destruction: Vec::new(),
        })
    }

    #[must_use]
    pub fn break_() -> Rc<Self> {
        Rc::new(Self::Break { destruction: Vec::new() })
    }

    #[must_use]
    pub fn continue_() -> Rc<Self> {
        Rc::new(Self::Continue { destruction: Vec::new() })
    }

    #[must_use]
    pub fn push_value(value: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::PushValue { value })
    }

    #[must_use]
    pub fn pop_value() -> Rc<Self> {
        Rc::new(Self::PopValue {
            destroy: false,
            destructor: None,
        })
    }
}

impl Expr {
    #[must_use]
    pub fn literal(value: Value) -> Rc<Self> {
        Rc::new(Self::Literal { value })
    }

    #[must_use]
    pub fn variable(value: Value) -> Rc<Self> {
        Rc::new(Self::VariableAccess { value })
    }

    #[must_use]
    pub fn stack_value(stack_index: usize) -> Rc<Self> {
        Rc::new(Self::StackValue { stack_index })
    }

    #[must_use]
    pub fn copy(argument: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::Copy { argument })
    }

    #[must_use]
    pub fn call(callee: Function, arguments: Vec<Rc<Expr>>) -> Rc<Self> {
        Rc::new(Self::FunctionCall { callee, arguments })
    }

    #[must_use]
    pub fn virtual_call(object: Rc<Expr>, vtable_index: usize, arguments: Vec<Rc<Expr>>) -> Rc<Self> {
        Rc::new(Self::VirtualCall {
            object,
            vtable_index,
            arguments,
        })
    }

    #[must_use]
    pub fn conditional(condition: Rc<Expr>, on_true: Rc<Expr>, on_false: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::Conditional {
            condition,
            on_true,
            on_false,
        })
    }

    #[must_use]
    pub fn logical_and(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::LogicalAnd { lhs, rhs })
    }

    #[must_use]
    pub fn logical_or(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::LogicalOr { lhs, rhs })
    }

    #[must_use]
    pub fn comma(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::Comma { lhs, rhs })
    }

    #[must_use]
    pub fn fundamental_conversion(dest_type: Type, argument: Rc<Expr>) -> Rc<Self> {
        Rc::new(Self::FundamentalConversion { dest_type, argument })
    }
}
