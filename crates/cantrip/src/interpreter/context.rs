use std::rc::Rc;

use crate::{
    engine::Engine,
    error::{EngineError, EngineResult},
    function::Function,
    ir::Breakpoint,
    value::Value,
};

/// Per-frame flow flags. `Return` doubles as "the return slot was set".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameFlag {
    #[default]
    None,
    Break,
    Continue,
    Return,
}

/// The flat value stack: a fixed-capacity array of values.
///
/// Pushing past the capacity fails loudly instead of reallocating.
pub(crate) struct Stack {
    data: Vec<Value>,
    capacity: usize,
}

impl Stack {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn push(&mut self, value: Value) -> EngineResult<()> {
        if self.data.len() == self.capacity {
            return Err(EngineError::stack_overflow());
        }
        self.data.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<Value> {
        self.data.pop()
    }

    pub(crate) fn get(&self, index: usize) -> Value {
        self.data[index].clone()
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        self.data[index] = value;
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
}

pub(crate) struct FrameData {
    pub callee: Function,
    /// Offset of the frame's return slot in the stack.
    pub stack_index: usize,
    /// Number of pushed arguments (the object slot included).
    pub argc: usize,
    pub flags: FrameFlag,
    pub last_breakpoint: Option<Rc<Breakpoint>>,
}

/// The callstack: a fixed-capacity vector of frames. Pushing a frame
/// never reallocates; overflow is a defined error.
pub(crate) struct Callstack {
    frames: Vec<FrameData>,
    capacity: usize,
}

impl Callstack {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push(&mut self, frame: FrameData) -> EngineResult<()> {
        if self.frames.len() == self.capacity {
            return Err(EngineError::callstack_overflow());
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<FrameData> {
        self.frames.pop()
    }

    pub(crate) fn top(&self) -> Option<&FrameData> {
        self.frames.last()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut FrameData> {
        self.frames.last_mut()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&FrameData> {
        self.frames.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut FrameData> {
        self.frames.get_mut(index)
    }
}

/// Everything backing one interpretation thread: the stack, the
/// callstack, the temporaries list and the initializer-list buffer.
///
/// Owned by a single engine and mutated exclusively by it.
pub(crate) struct ExecutionContext {
    pub stack: Stack,
    pub callstack: Callstack,
    pub garbage: Vec<Value>,
    pub initializer_buffer: Vec<Value>,
}

impl ExecutionContext {
    pub(crate) fn new(stack_capacity: usize, callstack_capacity: usize) -> Self {
        Self {
            stack: Stack::new(stack_capacity),
            callstack: Callstack::new(callstack_capacity),
            garbage: Vec::new(),
            initializer_buffer: Vec::new(),
        }
    }

    /// Pushes a frame whose return slot sits at `sp`; everything above it
    /// on the stack is the argument range.
    pub(crate) fn push_frame(&mut self, callee: Function, sp: usize) -> EngineResult<()> {
        let argc = self.stack.size() - sp - 1;
        self.callstack.push(FrameData {
            callee,
            stack_index: sp,
            argc,
            flags: FrameFlag::None,
            last_breakpoint: None,
        })
    }

    /// Pops the top frame: drops the arguments, pops the frame, and pops
    /// the return slot. An untouched return slot yields `Void`.
    pub(crate) fn pop_frame(&mut self) -> Value {
        let Some(frame) = self.callstack.pop() else {
            return Value::void();
        };
        self.stack.truncate(frame.stack_index + 1);
        self.stack.pop().unwrap_or_else(Value::void)
    }

    pub(crate) fn flags(&self) -> FrameFlag {
        self.callstack.top().map_or(FrameFlag::None, |f| f.flags)
    }

    pub(crate) fn clear_flags(&mut self) {
        if let Some(frame) = self.callstack.top_mut() {
            frame.flags = FrameFlag::None;
        }
    }
}

/// A native callback's view of the frame it was invoked with.
///
/// Argument 0 is the implicit object for member functions, and the object
/// under construction for constructors and destructors.
pub struct FunctionCall<'e> {
    engine: &'e Engine,
    frame_index: usize,
}

impl<'e> FunctionCall<'e> {
    pub(crate) fn new(engine: &'e Engine, frame_index: usize) -> Self {
        Self { engine, frame_index }
    }

    #[must_use]
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    #[must_use]
    pub fn callee(&self) -> Function {
        self.engine.with_exec(|ec| {
            ec.callstack
                .get(self.frame_index)
                .map(|f| f.callee.clone())
                .expect("frame is live while its FunctionCall exists")
        })
    }

    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.engine
            .with_exec(|ec| ec.callstack.get(self.frame_index).map_or(0, |f| f.argc))
    }

    /// The argument at `index` (argument 0 is the object slot for member
    /// functions and constructors).
    #[must_use]
    pub fn arg(&self, index: usize) -> Value {
        self.engine.with_exec(|ec| {
            let base = ec
                .callstack
                .get(self.frame_index)
                .map(|f| f.stack_index)
                .expect("frame is live while its FunctionCall exists");
            ec.stack.get(base + 1 + index)
        })
    }

    /// All arguments, in order.
    #[must_use]
    pub fn args(&self) -> Vec<Value> {
        (0..self.arg_count()).map(|i| self.arg(i)).collect()
    }

    /// The implicit object of a member-function call.
    #[must_use]
    pub fn this_value(&self) -> Value {
        self.arg(0)
    }

    pub fn set_return_value(&mut self, value: Value) {
        self.engine.with_exec(|ec| {
            if let Some(frame) = ec.callstack.get(self.frame_index) {
                let index = frame.stack_index;
                ec.stack.set(index, value);
            }
            if let Some(frame) = ec.callstack.get_mut(self.frame_index) {
                frame.flags = FrameFlag::Return;
            }
        });
    }

    #[must_use]
    pub fn return_value(&self) -> Value {
        self.engine.with_exec(|ec| {
            let index = ec
                .callstack
                .get(self.frame_index)
                .map(|f| f.stack_index)
                .expect("frame is live while its FunctionCall exists");
            ec.stack.get(index)
        })
    }

    /// Reads the frame-relative stack slot `index` (0 is the return
    /// slot, 1 the first argument, locals follow).
    #[must_use]
    pub fn stack_value(&self, index: usize) -> Value {
        self.engine.with_exec(|ec| {
            let base = ec
                .callstack
                .get(self.frame_index)
                .map(|f| f.stack_index)
                .expect("frame is live while its FunctionCall exists");
            ec.stack.get(base + index)
        })
    }

    /// The calling frame, if any.
    #[must_use]
    pub fn caller(&self) -> Option<FunctionCall<'e>> {
        if self.frame_index == 0 {
            return None;
        }
        Some(FunctionCall::new(self.engine, self.frame_index - 1))
    }

    #[must_use]
    pub fn last_breakpoint(&self) -> Option<Rc<Breakpoint>> {
        self.engine
            .with_exec(|ec| ec.callstack.get(self.frame_index).and_then(|f| f.last_breakpoint.clone()))
    }

    pub(crate) fn set_last_breakpoint(&self, bp: Rc<Breakpoint>) {
        self.engine.with_exec(|ec| {
            if let Some(frame) = ec.callstack.get_mut(self.frame_index) {
                frame.last_breakpoint = Some(bp);
            }
        });
    }
}
