use crate::{
    interpreter::FunctionCall,
    ir::Breakpoint,
    types::Type,
    value::Value,
};

/// Receives debug interrupts from the interpreter.
///
/// The handler runs on the interpreter's thread, inside the frame that
/// hit the breakpoint. It may inspect the frame through a [`Workspace`]
/// or unwind the interpreter by storing state and letting the script
/// finish.
pub trait DebugHandler {
    fn interrupt(&self, call: &mut FunctionCall<'_>, breakpoint: &Breakpoint);
}

/// The default handler: does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDebugHandler;

impl DebugHandler for DefaultDebugHandler {
    fn interrupt(&self, _call: &mut FunctionCall<'_>, _breakpoint: &Breakpoint) {}
}

/// A variable visible in a frame at a breakpoint.
#[derive(Debug, Clone)]
pub struct WorkspaceVar {
    pub name: String,
    pub ty: Type,
    /// Slot relative to the frame's stack base.
    pub stack_offset: usize,
    pub value: Value,
}

/// Enumerates the live variables of a frame, from the debug-info blocks
/// attached to the frame's last executed breakpoint.
pub struct Workspace {
    vars: Vec<WorkspaceVar>,
}

impl Workspace {
    #[must_use]
    pub fn new(call: &FunctionCall<'_>) -> Self {
        let mut vars = Vec::new();
        if let Some(bp) = call.last_breakpoint()
            && let Some(info) = bp.debug_info.borrow().as_ref()
        {
            for var in info.live_vars() {
                vars.push(WorkspaceVar {
                    value: call.stack_value(var.stack_index),
                    name: var.name,
                    ty: var.ty,
                    stack_offset: var.stack_index,
                });
            }
        }
        Self { vars }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[must_use]
    pub fn vars(&self) -> &[WorkspaceVar] {
        &self.vars
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&WorkspaceVar> {
        self.vars.iter().find(|v| v.name == name)
    }
}
