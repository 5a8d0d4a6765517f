use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    engine::Engine,
    error::{EngineError, EngineResult},
    namespace::Namespace,
    script::Script,
    tracer::TraceEvent,
};

/// Callback pair of a legacy native module.
pub type ModuleLoadCallback = Rc<dyn Fn(&Engine, &Namespace) -> EngineResult<()>>;

/// The contract a module implementation provides.
///
/// Three built-in variants exist (group, legacy-native, script-backed);
/// hosts may supply their own. Circular dependencies between modules are
/// not supported.
pub trait ModuleInterface {
    fn name(&self) -> &str;
    fn is_loaded(&self) -> bool;
    fn load(&self, engine: &Engine) -> EngineResult<()>;
    fn unload(&self, engine: &Engine) -> EngineResult<()>;
    fn global_namespace(&self) -> Namespace;
    fn get_script(&self) -> Option<Script> {
        None
    }
    fn child_modules(&self) -> Vec<Module>;
    fn add_child(&self, module: Module);
}

/// A module handle; cheap to clone, equality is identity.
#[derive(Clone)]
pub struct Module(Rc<dyn ModuleInterface>);

impl Module {
    #[must_use]
    pub fn new(implementation: Rc<dyn ModuleInterface>) -> Self {
        Self(implementation)
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.0.name().to_owned()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.0.is_loaded()
    }

    /// Loads the module. Idempotent: loading a loaded module is a no-op.
    pub fn load(&self, engine: &Engine) -> EngineResult<()> {
        if self.is_loaded() {
            return Ok(());
        }
        self.0.load(engine)?;
        engine.trace(|| TraceEvent::ModuleLoaded { name: self.name() });
        Ok(())
    }

    pub fn unload(&self, engine: &Engine) -> EngineResult<()> {
        if !self.is_loaded() {
            return Ok(());
        }
        self.0.unload(engine)
    }

    #[must_use]
    pub fn global_namespace(&self) -> Namespace {
        self.0.global_namespace()
    }

    #[must_use]
    pub fn get_script(&self) -> Option<Script> {
        self.0.get_script()
    }

    #[must_use]
    pub fn child_modules(&self) -> Vec<Module> {
        self.0.child_modules()
    }

    pub fn add_child(&self, module: Module) {
        self.0.add_child(module);
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Module> {
        self.child_modules().into_iter().find(|m| m.name() == name)
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({name}, loaded: {l})", name = self.name(), l = self.is_loaded())
    }
}

/// A namespace-only container of child modules.
pub struct GroupModule {
    name: String,
    namespace: Namespace,
    children: RefCell<Vec<Module>>,
    loaded: Cell<bool>,
}

impl GroupModule {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: Namespace) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            namespace,
            children: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
        })
    }
}

impl ModuleInterface for GroupModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    /// Loads all children, recursively.
    fn load(&self, engine: &Engine) -> EngineResult<()> {
        for child in self.children.borrow().iter() {
            child.load(engine)?;
        }
        self.loaded.set(true);
        Ok(())
    }

    fn unload(&self, engine: &Engine) -> EngineResult<()> {
        for child in self.children.borrow().iter() {
            child.unload(engine)?;
        }
        self.loaded.set(false);
        Ok(())
    }

    fn global_namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    fn child_modules(&self) -> Vec<Module> {
        self.children.borrow().clone()
    }

    fn add_child(&self, module: Module) {
        self.children.borrow_mut().push(module);
    }
}

/// A native module with explicit load and cleanup callbacks.
pub struct LegacyModule {
    name: String,
    namespace: Namespace,
    load_callback: ModuleLoadCallback,
    cleanup_callback: Option<ModuleLoadCallback>,
    children: RefCell<Vec<Module>>,
    loaded: Cell<bool>,
}

impl LegacyModule {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: Namespace,
        load_callback: ModuleLoadCallback,
        cleanup_callback: Option<ModuleLoadCallback>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            namespace,
            load_callback,
            cleanup_callback,
            children: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
        })
    }
}

impl ModuleInterface for LegacyModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    fn load(&self, engine: &Engine) -> EngineResult<()> {
        (self.load_callback)(engine, &self.namespace)
            .map_err(|e| EngineError::module_loading_error(format!("module '{name}': {e}", name = self.name)))?;
        for child in self.children.borrow().iter() {
            child.load(engine)?;
        }
        self.loaded.set(true);
        Ok(())
    }

    /// Runs the cleanup callback, when one was supplied.
    fn unload(&self, engine: &Engine) -> EngineResult<()> {
        if let Some(cleanup) = &self.cleanup_callback {
            cleanup(engine, &self.namespace)?;
        }
        self.loaded.set(false);
        Ok(())
    }

    fn global_namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    fn child_modules(&self) -> Vec<Module> {
        self.children.borrow().clone()
    }

    fn add_child(&self, module: Module) {
        self.children.borrow_mut().push(module);
    }
}

/// A module backed by a script: loading compiles and runs it.
pub struct ScriptModule {
    name: String,
    script: Script,
    children: RefCell<Vec<Module>>,
    loaded: Cell<bool>,
}

impl ScriptModule {
    #[must_use]
    pub fn new(name: impl Into<String>, script: Script) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            script,
            children: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
        })
    }
}

impl ModuleInterface for ScriptModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    fn load(&self, engine: &Engine) -> EngineResult<()> {
        if !self.script.compile(engine) {
            let detail = self
                .script
                .messages()
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "compilation failed".to_owned());
            return Err(EngineError::module_loading_error(format!(
                "module '{name}': {detail}",
                name = self.name
            )));
        }
        self.script.run(engine)?;
        for child in self.children.borrow().iter() {
            child.load(engine)?;
        }
        self.loaded.set(true);
        Ok(())
    }

    /// Unloading a script-backed module is a recorded no-op: its
    /// namespace stays alive until the engine goes away.
    fn unload(&self, _engine: &Engine) -> EngineResult<()> {
        Ok(())
    }

    fn global_namespace(&self) -> Namespace {
        self.script.namespace()
    }

    fn get_script(&self) -> Option<Script> {
        Some(self.script.clone())
    }

    fn child_modules(&self) -> Vec<Module> {
        self.children.borrow().clone()
    }

    fn add_child(&self, module: Module) {
        self.children.borrow_mut().push(module);
    }
}
