use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    array,
    builtins,
    class::ClassBuilder,
    closure::LambdaObject,
    compiler::{CompileMode, CompilerBackend},
    context::Context,
    conversion::{self, Conversion, ConversionPolicy},
    enumeration::EnumBuilder,
    error::{EngineError, EngineResult},
    function::Function,
    initializer_list::InitializerListObject,
    interpreter::{self, DebugHandler, DefaultDebugHandler, ExecutionContext},
    ir::Expr,
    module::{GroupModule, LegacyModule, Module, ModuleInterface, ModuleLoadCallback, ScriptModule},
    namespace::Namespace,
    overload::{self, OverloadResult},
    script::{Script, SourceFile},
    string_builtin,
    template::{ClassTemplate, TemplateArgument, TemplateParameter},
    tracer::{EngineTracer, NoopTracer, TraceEvent},
    types::{Type, TypeKind},
    typesystem::TypeSystem,
    value::{Value, ValueData},
};

/// Engine construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the flat value stack.
    pub stack_capacity: usize,
    /// Capacity of the callstack; pushing a frame never reallocates.
    pub callstack_capacity: usize,
    /// Compile mode handed to the compiler backend.
    pub compile_mode: CompileMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 2048,
            callstack_capacity: 256,
            compile_mode: CompileMode::Release,
        }
    }
}

/// The engine: owner of the type system, the symbol graph root, scripts,
/// modules, contexts and the execution context.
///
/// An engine is single-threaded; a host that needs parallelism creates
/// one engine per thread, sharing nothing.
pub struct Engine {
    config: EngineConfig,
    type_system: TypeSystem,
    root: Namespace,
    scripts: RefCell<Vec<Script>>,
    modules: RefCell<Vec<Module>>,
    contexts: RefCell<Vec<Context>>,
    current_context: RefCell<Context>,
    exec: RefCell<ExecutionContext>,
    debug_handler: RefCell<Rc<dyn DebugHandler>>,
    tracer: RefCell<Rc<dyn EngineTracer>>,
    compiler: RefCell<Option<Box<dyn CompilerBackend>>>,
    array_template: RefCell<Option<ClassTemplate>>,
    initializer_list_template: RefCell<Option<ClassTemplate>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the built-in types, operators and
    /// templates installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let default_context = Context::new("default");
        let engine = Self {
            config,
            type_system: TypeSystem::new(),
            root: Namespace::new(""),
            scripts: RefCell::new(Vec::new()),
            modules: RefCell::new(Vec::new()),
            contexts: RefCell::new(vec![default_context.clone()]),
            current_context: RefCell::new(default_context),
            exec: RefCell::new(ExecutionContext::new(config.stack_capacity, config.callstack_capacity)),
            debug_handler: RefCell::new(Rc::new(DefaultDebugHandler)),
            tracer: RefCell::new(Rc::new(NoopTracer)),
            compiler: RefCell::new(None),
            array_template: RefCell::new(None),
            initializer_list_template: RefCell::new(None),
        };
        engine.setup();
        engine
    }

    /// Registers the built-in String class, the fundamental operators and
    /// the Array / InitializerList templates.
    fn setup(&self) {
        string_builtin::register_string_class(self);
        builtins::register_builtin_operators(self);

        let array_template = ClassTemplate::new("Array", vec![TemplateParameter::type_param("T")]);
        array_template.set_backend(Rc::new(|engine, template, args| {
            array::instantiate_array(engine, template, args)
        }));
        self.root.add_class_template(array_template.clone());
        *self.array_template.borrow_mut() = Some(array_template);

        let il_template = ClassTemplate::new("InitializerList", vec![TemplateParameter::type_param("T")]);
        il_template.set_backend(Rc::new(|engine, template, args| {
            crate::initializer_list::instantiate_initializer_list(engine, template, args)
        }));
        self.root.add_class_template(il_template.clone());
        *self.initializer_list_template.borrow_mut() = Some(il_template);
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    #[must_use]
    pub fn type_system(&self) -> &TypeSystem {
        &self.type_system
    }

    /// The root namespace of the symbol graph.
    #[must_use]
    pub fn root_namespace(&self) -> Namespace {
        self.root.clone()
    }

    pub(crate) fn with_exec<R>(&self, f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
        f(&mut self.exec.borrow_mut())
    }

    // --- observability ---

    pub(crate) fn trace(&self, event: impl FnOnce() -> TraceEvent) {
        let tracer = self.tracer.borrow().clone();
        if tracer.enabled() {
            tracer.event(event());
        }
    }

    pub fn set_tracer(&self, tracer: Rc<dyn EngineTracer>) {
        *self.tracer.borrow_mut() = tracer;
    }

    #[must_use]
    pub fn debug_handler(&self) -> Rc<dyn DebugHandler> {
        self.debug_handler.borrow().clone()
    }

    pub fn set_debug_handler(&self, handler: Rc<dyn DebugHandler>) {
        *self.debug_handler.borrow_mut() = handler;
    }

    // --- compiler delegation ---

    pub fn set_compiler(&self, backend: Box<dyn CompilerBackend>) {
        *self.compiler.borrow_mut() = Some(backend);
    }

    /// Compiles `script` through the installed backend. The backend is
    /// taken out for the duration of the call so it may re-enter the
    /// engine.
    pub(crate) fn compile_script(&self, script: &Script) -> bool {
        let Some(mut backend) = self.compiler.borrow_mut().take() else {
            script.add_message(crate::script::DiagnosticMessage::error(0, 0, "no compiler backend installed"));
            return false;
        };
        let ok = backend.compile(script, self.config.compile_mode, self);
        *self.compiler.borrow_mut() = Some(backend);
        if ok {
            self.trace(|| TraceEvent::ScriptCompiled {
                path: script.source().path,
            });
        }
        ok
    }

    /// Compiles and evaluates an expression against the current context.
    pub fn eval(&self, source: &str) -> EngineResult<Value> {
        let context = self.current_context();
        let expr = {
            let Some(mut backend) = self.compiler.borrow_mut().take() else {
                return Err(EngineError::not_implemented("eval without a compiler backend"));
            };
            let result = backend.eval(source, &context, self);
            *self.compiler.borrow_mut() = Some(backend);
            result?
        };
        self.eval_expr(&expr)
    }

    /// Evaluates an already-compiled expression.
    pub fn eval_expr(&self, expr: &Rc<Expr>) -> EngineResult<Value> {
        interpreter::eval(self, expr)
    }

    // --- contexts ---

    #[must_use]
    pub fn current_context(&self) -> Context {
        self.current_context.borrow().clone()
    }

    pub fn set_current_context(&self, context: Context) {
        *self.current_context.borrow_mut() = context;
    }

    pub fn new_context(&self, name: impl Into<String>) -> Context {
        let context = Context::new(name);
        self.contexts.borrow_mut().push(context.clone());
        context
    }

    #[must_use]
    pub fn contexts(&self) -> Vec<Context> {
        self.contexts.borrow().clone()
    }

    // --- type registration ---

    pub fn register_class(&self, builder: ClassBuilder) -> EngineResult<crate::class::Class> {
        let class = self.type_system.register_class(builder)?;
        self.trace(|| TraceEvent::TypeRegistered { ty: class.id() });
        Ok(class)
    }

    pub fn register_enum(&self, builder: EnumBuilder) -> EngineResult<crate::enumeration::Enum> {
        let e = self.type_system.register_enum(builder)?;
        self.trace(|| TraceEvent::TypeRegistered { ty: e.id() });
        Ok(e)
    }

    pub fn destroy_type(&self, ty: Type) {
        self.type_system.destroy(ty);
        self.trace(|| TraceEvent::TypeDestroyed { ty });
    }

    pub fn reserve_type_range(&self, kind: TypeKind, count: usize) -> Type {
        self.type_system.reserve(kind, count)
    }

    /// The built-in `Array<T>` class template.
    #[must_use]
    pub fn array_template(&self) -> ClassTemplate {
        self.array_template.borrow().clone().expect("installed at setup")
    }

    /// The built-in `InitializerList<T>` class template.
    #[must_use]
    pub fn initializer_list_template(&self) -> ClassTemplate {
        self.initializer_list_template.borrow().clone().expect("installed at setup")
    }

    /// The instance type `Array<element>`, instantiating on first use.
    pub fn array_type_of(&self, element: Type) -> EngineResult<Type> {
        let instance = self
            .array_template()
            .get_instance(self, &[TemplateArgument::Type(element)])?;
        Ok(instance.id())
    }

    // --- scripts & modules ---

    pub fn new_script(&self, source: SourceFile) -> Script {
        let script = Script::new(source);
        self.scripts.borrow_mut().push(script.clone());
        script
    }

    #[must_use]
    pub fn scripts(&self) -> Vec<Script> {
        self.scripts.borrow().clone()
    }

    pub fn new_module(&self, name: impl Into<String>) -> Module {
        let name = name.into();
        let namespace = self.root.new_namespace(&name);
        let module = Module::new(GroupModule::new(name, namespace));
        self.modules.borrow_mut().push(module.clone());
        module
    }

    pub fn new_native_module(
        &self,
        name: impl Into<String>,
        load: ModuleLoadCallback,
        cleanup: Option<ModuleLoadCallback>,
    ) -> Module {
        let name = name.into();
        let namespace = self.root.new_namespace(&name);
        let module = Module::new(LegacyModule::new(name, namespace, load, cleanup));
        self.modules.borrow_mut().push(module.clone());
        module
    }

    pub fn new_script_module(&self, name: impl Into<String>, source: SourceFile) -> Module {
        let script = self.new_script(source);
        let module = Module::new(ScriptModule::new(name, script));
        self.modules.borrow_mut().push(module.clone());
        module
    }

    /// Registers a host-supplied module implementation.
    pub fn add_module(&self, implementation: Rc<dyn ModuleInterface>) -> Module {
        let module = Module::new(implementation);
        self.modules.borrow_mut().push(module.clone());
        module
    }

    #[must_use]
    pub fn modules(&self) -> Vec<Module> {
        self.modules.borrow().clone()
    }

    #[must_use]
    pub fn find_module(&self, name: &str) -> Option<Module> {
        self.modules.borrow().iter().find(|m| m.name() == name).cloned()
    }

    // --- value lifecycle ---

    /// Constructs a value of `ty` from `args`.
    ///
    /// Fundamentals accept zero or one argument; enums require one value
    /// of the same enum; objects go through constructor overload
    /// resolution. Arity mismatches are reported before any constructor
    /// runs.
    pub fn construct(&self, ty: Type, args: &[Value]) -> EngineResult<Value> {
        if ty.base() == Type::VOID {
            return Ok(Value::void());
        }
        if ty.is_fundamental() {
            return match args.len() {
                0 => Ok(default_fundamental(ty.base())),
                1 => conversion::fundamental_conversion(&args[0], ty.base(), self),
                n => Err(EngineError::too_many_arguments("fundamental type", n)),
            };
        }
        if ty.is_enum() {
            let e = self
                .type_system
                .get_enum(ty)
                .ok_or_else(|| EngineError::unknown_type(ty))?;
            return match args {
                [] => Err(EngineError::too_few_arguments(e.name(), 0)),
                [arg] => match arg.as_enumerator() {
                    Some(enumerator) if enumerator.enum_type().base() == ty.base() => {
                        Ok(Value::enumerator(enumerator))
                    }
                    _ => Err(EngineError::no_matching_constructor(e.name())),
                },
                more => Err(EngineError::too_many_arguments(e.name(), more.len())),
            };
        }
        if ty.is_object() {
            return self.construct_object(ty, args);
        }
        Err(EngineError::not_implemented(format!("construction of {ty}")))
    }

    fn construct_object(&self, ty: Type, args: &[Value]) -> EngineResult<Value> {
        let class = self
            .type_system
            .get_class(ty)
            .ok_or_else(|| EngineError::unknown_type(ty))?;
        let ctors = class.constructors();
        if ctors.is_empty() {
            return Err(EngineError::no_matching_constructor(class.name()));
        }

        // Arity pre-check: reported before any constructor runs.
        let n = args.len();
        let max_params = ctors.iter().map(|c| c.parameter_count().saturating_sub(1)).max().unwrap_or(0);
        let min_params = ctors
            .iter()
            .map(|c| c.parameter_count().saturating_sub(1).saturating_sub(c.default_argument_count()))
            .min()
            .unwrap_or(0);
        if n > max_params {
            return Err(EngineError::too_many_arguments(class.name(), n));
        }
        if n < min_params {
            return Err(EngineError::too_few_arguments(class.name(), n));
        }

        // Resolve over the full prototypes, with a leading object slot.
        let mut arg_types = Vec::with_capacity(n + 1);
        arg_types.push(Type::reference(ty));
        arg_types.extend(args.iter().map(Value::get_type));

        let (ctor, conversions) =
            match overload::resolve(&ctors, &arg_types, &self.type_system, ConversionPolicy::AllowExplicit) {
                OverloadResult::Selected { function, conversions } => (function, conversions),
                OverloadResult::Ambiguous => return Err(EngineError::ambiguous_call(class.name())),
                OverloadResult::NoMatch => return Err(EngineError::no_matching_constructor(class.name())),
            };
        if ctor.is_deleted() {
            return Err(EngineError::constructor_is_deleted(class.name()));
        }

        let mut call_args = Vec::with_capacity(ctor.parameter_count());
        call_args.push(Value::void());
        for (arg, conv) in args.iter().zip(conversions.iter().skip(1)) {
            call_args.push(Conversion::apply(conv, arg, self)?);
        }

        // Fill the missing tail from the reversed default-argument list.
        let missing = ctor.parameter_count() - call_args.len();
        if missing > 0 {
            let defaults = ctor.default_arguments();
            let mut tail = Vec::with_capacity(missing);
            for expr in defaults.iter().take(missing) {
                tail.push(interpreter::eval(self, expr)?);
            }
            tail.reverse();
            call_args.extend(tail);
        }

        interpreter::invoke(self, &ctor, &call_args)
    }

    /// Copies a value: fundamentals and enums get a typed duplicate,
    /// objects go through their copy constructor, lambdas deep-copy their
    /// captures.
    pub fn copy(&self, value: &Value) -> EngineResult<Value> {
        let ty = value.get_type();
        let data = value.borrow_data();
        match &*data {
            ValueData::Void => Ok(Value::void()),
            ValueData::Bool(v) => Ok(Value::bool_(*v)),
            ValueData::Char(v) => Ok(Value::char_(*v)),
            ValueData::Int(v) => Ok(Value::int(*v)),
            ValueData::Float(v) => Ok(Value::float(*v)),
            ValueData::Double(v) => Ok(Value::double(*v)),
            ValueData::String(s) => Ok(Value::string(s.clone())),
            ValueData::Enumerator(e) => Ok(Value::enumerator(e.clone())),
            ValueData::Function(f) => Ok(Value::function(ty, f.clone())),
            ValueData::Lambda(l) => {
                let mut copy = LambdaObject::new(l.closure_type().clone());
                for capture in l.captures() {
                    copy.push_capture(self.copy(capture)?);
                }
                Ok(Value::lambda(ty, copy))
            }
            ValueData::InitializerList(l) => Ok(Value::initializer_list(
                ty,
                InitializerListObject::new(l.elements().to_vec()),
            )),
            ValueData::Reference(target) => {
                let target = target.clone();
                drop(data);
                self.copy(&target)
            }
            ValueData::Object(_) | ValueData::Native(_) | ValueData::Array(_) => {
                drop(data);
                let class = self
                    .type_system
                    .get_class(ty)
                    .ok_or_else(|| EngineError::unknown_type(ty))?;
                let copy_ctor = class
                    .copy_constructor()
                    .filter(|c| !c.is_deleted())
                    .ok_or_else(|| EngineError::copy_error(class.name()))?;
                interpreter::invoke(self, &copy_ctor, &[Value::void(), value.clone()])
            }
        }
    }

    /// Destroys a value: objects run their destructor, then the payload
    /// is cleared in place. The `Void` singleton is exempt; destroying a
    /// reference never touches the referent.
    ///
    /// A failing destructor is a programmer error; the payload is cleared
    /// regardless, and the error is reported.
    pub fn destroy(&self, value: Value) -> EngineResult<()> {
        if value.is_void() || value.is_reference() {
            value.replace_data(ValueData::Void);
            return Ok(());
        }
        let ty = value.get_type();
        let mut result = Ok(());
        if ty.is_object() {
            if let Some(class) = self.type_system.get_class(ty)
                && let Some(dtor) = class.destructor()
            {
                result = interpreter::invoke(self, &dtor, &[value.clone()]).map(|_| ());
            }
        }
        value.replace_data(ValueData::Void);
        result
    }

    /// Destroys through an explicit destructor (compiler-selected), then
    /// clears the payload.
    pub(crate) fn destroy_with(&self, value: Value, destructor: Option<&Function>) -> EngineResult<()> {
        match destructor {
            Some(dtor) => {
                let result = interpreter::invoke(self, dtor, &[value.clone()]).map(|_| ());
                value.replace_data(ValueData::Void);
                result
            }
            None => self.destroy(value),
        }
    }

    /// Destroys on cleanup paths where errors cannot propagate.
    pub(crate) fn release(&self, value: Value) {
        let _ = self.destroy(value);
    }

    /// Converts a value to `dest`, computing and applying the conversion
    /// sequence.
    pub fn convert(&self, value: &Value, dest: Type) -> EngineResult<Value> {
        let conv = Conversion::compute(value.get_type(), dest, &self.type_system, ConversionPolicy::AllowExplicit);
        if conv.is_invalid() {
            return Err(EngineError::conversion_error(value.get_type(), dest));
        }
        Conversion::apply(&conv, value, self)
    }

    /// Invokes a function with an argument range.
    pub fn invoke(&self, f: &Function, args: &[Value]) -> EngineResult<Value> {
        interpreter::invoke(self, f, args)
    }
}

fn default_fundamental(base: Type) -> Value {
    match base {
        Type::BOOL => Value::bool_(false),
        Type::CHAR => Value::char_('\0'),
        Type::INT => Value::int(0),
        Type::FLOAT => Value::float(0.0),
        Type::DOUBLE => Value::double(0.0),
        _ => Value::void(),
    }
}
