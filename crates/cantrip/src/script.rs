use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    attributes::{AttributesMap, DefaultArgumentsMap},
    engine::Engine,
    error::EngineResult,
    function::Function,
    ir::Breakpoint,
    namespace::Namespace,
    scope::Scope,
    value::Value,
};

/// A source file: its path and, once loaded, its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    #[must_use]
    pub fn from_string(content: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_path(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured diagnostic produced by compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl DiagnosticMessage {
    #[must_use]
    pub fn error(line: usize, column: usize, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            column,
            text: text.into(),
        }
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{sev} at {line}:{col}: {text}",
            sev = self.severity,
            line = self.line,
            col = self.column,
            text = self.text
        )
    }
}

pub(crate) struct ScriptImpl {
    source: SourceFile,
    namespace: Namespace,
    root_function: RefCell<Option<Function>>,
    globals: RefCell<Vec<Value>>,
    global_names: RefCell<AHashMap<String, usize>>,
    exports: RefCell<Option<Scope>>,
    messages: RefCell<Vec<DiagnosticMessage>>,
    breakpoints: RefCell<AHashMap<usize, Vec<Rc<Breakpoint>>>>,
    attributes: RefCell<AttributesMap>,
    extra_defaults: RefCell<DefaultArgumentsMap>,
    compiled: Cell<bool>,
}

/// A script: a namespace of its own plus the source file, the root
/// "entry" function holding top-level statements, the globals produced by
/// running it, an exports scope and debug metadata.
#[derive(Clone)]
pub struct Script(Rc<ScriptImpl>);

impl Script {
    #[must_use]
    pub fn new(source: SourceFile) -> Self {
        Self(Rc::new(ScriptImpl {
            source,
            namespace: Namespace::new(""),
            root_function: RefCell::new(None),
            globals: RefCell::new(Vec::new()),
            global_names: RefCell::new(AHashMap::new()),
            exports: RefCell::new(None),
            messages: RefCell::new(Vec::new()),
            breakpoints: RefCell::new(AHashMap::new()),
            attributes: RefCell::new(AttributesMap::new()),
            extra_defaults: RefCell::new(DefaultArgumentsMap::new()),
            compiled: Cell::new(false),
        }))
    }

    #[must_use]
    pub fn source(&self) -> SourceFile {
        self.0.source.clone()
    }

    /// The namespace holding the script's top-level declarations.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.0.namespace.clone()
    }

    /// Compiles the script by delegation to the engine's compiler
    /// backend. Diagnostics end up in `messages()`; returns false when
    /// compilation failed or no backend is installed.
    pub fn compile(&self, engine: &Engine) -> bool {
        let ok = engine.compile_script(self);
        self.0.compiled.set(ok);
        ok
    }

    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.0.compiled.get()
    }

    pub(crate) fn set_compiled(&self, compiled: bool) {
        self.0.compiled.set(compiled);
    }

    /// The root function holding the script's top-level statements.
    #[must_use]
    pub fn root_function(&self) -> Option<Function> {
        self.0.root_function.borrow().clone()
    }

    pub fn set_root_function(&self, f: Function) {
        *self.0.root_function.borrow_mut() = Some(f);
    }

    /// Runs the root function; its `PushGlobal` statements populate the
    /// globals vector.
    pub fn run(&self, engine: &Engine) -> EngineResult<()> {
        self.0.globals.borrow_mut().clear();
        if let Some(root) = self.root_function() {
            root.invoke(engine, &[])?;
        }
        Ok(())
    }

    #[must_use]
    pub fn globals(&self) -> Vec<Value> {
        self.0.globals.borrow().clone()
    }

    pub(crate) fn push_global(&self, value: Value) {
        self.0.globals.borrow_mut().push(value);
    }

    #[must_use]
    pub fn global_at(&self, index: usize) -> Option<Value> {
        self.0.globals.borrow().get(index).cloned()
    }

    /// Declares the name of the global at the next index.
    pub fn add_global_name(&self, name: impl Into<String>, index: usize) {
        self.0.global_names.borrow_mut().insert(name.into(), index);
    }

    #[must_use]
    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.0.global_names.borrow().get(name).copied()
    }

    #[must_use]
    pub fn find_global(&self, name: &str) -> Option<Value> {
        self.global_index(name).and_then(|i| self.global_at(i))
    }

    #[must_use]
    pub fn exports(&self) -> Option<Scope> {
        self.0.exports.borrow().clone()
    }

    pub fn set_exports(&self, scope: Scope) {
        *self.0.exports.borrow_mut() = Some(scope);
    }

    #[must_use]
    pub fn messages(&self) -> Vec<DiagnosticMessage> {
        self.0.messages.borrow().clone()
    }

    pub fn add_message(&self, message: DiagnosticMessage) {
        self.0.messages.borrow_mut().push(message);
    }

    pub fn clear_messages(&self) {
        self.0.messages.borrow_mut().clear();
    }

    // --- debug metadata ---

    pub fn add_breakpoint(&self, bp: Rc<Breakpoint>) {
        self.0.breakpoints.borrow_mut().entry(bp.line).or_default().push(bp);
    }

    #[must_use]
    pub fn breakpoints_at(&self, line: usize) -> Vec<Rc<Breakpoint>> {
        self.0.breakpoints.borrow().get(&line).cloned().unwrap_or_default()
    }

    /// Arms every breakpoint recorded for `line`; returns the number hit.
    pub fn arm_breakpoints(&self, line: usize) -> usize {
        let bps = self.breakpoints_at(line);
        for bp in &bps {
            bp.status.set(1);
        }
        bps.len()
    }

    pub fn disarm_breakpoints(&self, line: usize) {
        for bp in self.breakpoints_at(line) {
            bp.status.set(0);
        }
    }

    // --- side tables ---

    pub fn with_attributes<R>(&self, f: impl FnOnce(&mut AttributesMap) -> R) -> R {
        f(&mut self.0.attributes.borrow_mut())
    }

    pub fn with_extra_defaults<R>(&self, f: impl FnOnce(&mut DefaultArgumentsMap) -> R) -> R {
        f(&mut self.0.extra_defaults.borrow_mut())
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Script {}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Script({path:?}, {n} globals)",
            path = self.0.source.path,
            n = self.0.globals.borrow().len()
        )
    }
}
