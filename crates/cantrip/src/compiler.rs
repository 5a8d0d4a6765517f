use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{context::Context, engine::Engine, error::EngineResult, ir::Expr, script::Script};

/// Whether the compiler emits breakpoint IR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompileMode {
    #[default]
    Release,
    Debug,
}

/// The seam to the external compiler front-end.
///
/// The tokenizer, parser, AST and lowering live outside the engine; a
/// host installs an implementation of this trait and the engine
/// delegates `Script::compile` and `Engine::eval` to it. The backend is
/// expected to resolve names through [`crate::scope::Scope`], produce
/// bodies in the IR of [`crate::ir`], attach them to functions, and
/// record diagnostics on the script.
pub trait CompilerBackend {
    /// Compiles `script`, attaching IR bodies and populating
    /// `script.messages()`. Returns true on success.
    fn compile(&mut self, script: &Script, mode: CompileMode, engine: &Engine) -> bool;

    /// Compiles a single expression against `context`, returning its IR.
    fn eval(&mut self, source: &str, context: &Context, engine: &Engine) -> EngineResult<Rc<Expr>>;
}
