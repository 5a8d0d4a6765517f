use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{
    enumeration::Enum,
    function::{Function, FunctionKind},
    operators::OperatorId,
    symbols::EnclosingSymbol,
    template::{ClassTemplate, FunctionTemplate},
    types::Type,
    value::Value,
    class::Class,
};

pub(crate) struct NamespaceImpl {
    name: String,
    enclosing: RefCell<EnclosingSymbol>,
    vars: RefCell<IndexMap<String, Value>>,
    enums: RefCell<Vec<Enum>>,
    classes: RefCell<Vec<Class>>,
    functions: RefCell<Vec<Function>>,
    operators: RefCell<Vec<Function>>,
    literal_operators: RefCell<Vec<Function>>,
    namespaces: RefCell<Vec<Namespace>>,
    class_templates: RefCell<Vec<ClassTemplate>>,
    function_templates: RefCell<Vec<FunctionTemplate>>,
    typedefs: RefCell<IndexMap<String, Type>>,
}

/// A namespace: a named bag of values, types, functions, operators,
/// templates, typedefs and child namespaces.
///
/// The handle is cheap to clone; equality is identity. Children are held
/// strongly, the enclosing-symbol back-pointer weakly.
#[derive(Clone)]
pub struct Namespace(pub(crate) Rc<NamespaceImpl>);

/// Weak counterpart of [`Namespace`], used for back-pointers.
#[derive(Clone)]
pub struct WeakNamespace(Weak<NamespaceImpl>);

impl WeakNamespace {
    #[must_use]
    pub fn upgrade(&self) -> Option<Namespace> {
        self.0.upgrade().map(Namespace)
    }
}

impl Namespace {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(NamespaceImpl {
            name: name.into(),
            enclosing: RefCell::new(EnclosingSymbol::None),
            vars: RefCell::new(IndexMap::new()),
            enums: RefCell::new(Vec::new()),
            classes: RefCell::new(Vec::new()),
            functions: RefCell::new(Vec::new()),
            operators: RefCell::new(Vec::new()),
            literal_operators: RefCell::new(Vec::new()),
            namespaces: RefCell::new(Vec::new()),
            class_templates: RefCell::new(Vec::new()),
            function_templates: RefCell::new(Vec::new()),
            typedefs: RefCell::new(IndexMap::new()),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakNamespace {
        WeakNamespace(Rc::downgrade(&self.0))
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn enclosing_symbol(&self) -> Option<crate::symbols::Symbol> {
        self.0.enclosing.borrow().resolve()
    }

    pub(crate) fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    /// Creates (or returns) the child namespace called `name`.
    pub fn new_namespace(&self, name: &str) -> Namespace {
        if let Some(existing) = self.find_namespace(name) {
            return existing;
        }
        let child = Namespace::new(name);
        child.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.0.namespaces.borrow_mut().push(child.clone());
        child
    }

    #[must_use]
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.0.namespaces.borrow().clone()
    }

    #[must_use]
    pub fn find_namespace(&self, name: &str) -> Option<Namespace> {
        self.0.namespaces.borrow().iter().find(|ns| ns.name() == name).cloned()
    }

    // --- values ---

    #[must_use]
    pub fn vars(&self) -> IndexMap<String, Value> {
        self.0.vars.borrow().clone()
    }

    pub fn add_var(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), value);
    }

    #[must_use]
    pub fn find_var(&self, name: &str) -> Option<Value> {
        self.0.vars.borrow().get(name).cloned()
    }

    // --- functions ---

    /// Registers a function, dispatching operators, literal operators and
    /// casts into their dedicated lists.
    pub fn add_function(&self, f: Function) {
        f.set_enclosing_symbol(EnclosingSymbol::from(self));
        match f.kind() {
            FunctionKind::Operator => self.0.operators.borrow_mut().push(f),
            FunctionKind::LiteralOperator => self.0.literal_operators.borrow_mut().push(f),
            _ => self.0.functions.borrow_mut().push(f),
        }
    }

    #[must_use]
    pub fn functions(&self) -> Vec<Function> {
        self.0.functions.borrow().clone()
    }

    #[must_use]
    pub fn operators(&self) -> Vec<Function> {
        self.0.operators.borrow().clone()
    }

    #[must_use]
    pub fn literal_operators(&self) -> Vec<Function> {
        self.0.literal_operators.borrow().clone()
    }

    #[must_use]
    pub fn find_functions(&self, name: &str) -> Vec<Function> {
        self.0
            .functions
            .borrow()
            .iter()
            .filter(|f| f.name().as_str() == Some(name))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn find_operators(&self, op: OperatorId) -> Vec<Function> {
        self.0
            .operators
            .borrow()
            .iter()
            .filter(|f| f.operator_id() == Some(op))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn find_literal_operators(&self, suffix: &str) -> Vec<Function> {
        self.0
            .literal_operators
            .borrow()
            .iter()
            .filter(|f| f.name().as_str() == Some(suffix))
            .cloned()
            .collect()
    }

    // --- types ---

    pub(crate) fn add_class(&self, class: Class) {
        class.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.0.classes.borrow_mut().push(class);
    }

    #[must_use]
    pub fn classes(&self) -> Vec<Class> {
        self.0.classes.borrow().clone()
    }

    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<Class> {
        self.0.classes.borrow().iter().find(|c| c.name() == name).cloned()
    }

    pub(crate) fn add_enum(&self, e: Enum) {
        e.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.0.enums.borrow_mut().push(e);
    }

    #[must_use]
    pub fn enums(&self) -> Vec<Enum> {
        self.0.enums.borrow().clone()
    }

    #[must_use]
    pub fn find_enum(&self, name: &str) -> Option<Enum> {
        self.0.enums.borrow().iter().find(|e| e.name() == name).cloned()
    }

    // --- templates ---

    pub fn add_class_template(&self, t: ClassTemplate) {
        self.0.class_templates.borrow_mut().push(t);
    }

    #[must_use]
    pub fn class_templates(&self) -> Vec<ClassTemplate> {
        self.0.class_templates.borrow().clone()
    }

    #[must_use]
    pub fn find_class_template(&self, name: &str) -> Option<ClassTemplate> {
        self.0
            .class_templates
            .borrow()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    pub fn add_function_template(&self, t: FunctionTemplate) {
        self.0.function_templates.borrow_mut().push(t);
    }

    #[must_use]
    pub fn function_templates(&self) -> Vec<FunctionTemplate> {
        self.0.function_templates.borrow().clone()
    }

    #[must_use]
    pub fn find_function_template(&self, name: &str) -> Option<FunctionTemplate> {
        self.0
            .function_templates
            .borrow()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    // --- typedefs ---

    pub fn add_typedef(&self, name: impl Into<String>, ty: Type) {
        self.0.typedefs.borrow_mut().insert(name.into(), ty);
    }

    #[must_use]
    pub fn find_typedef(&self, name: &str) -> Option<Type> {
        self.0.typedefs.borrow().get(name).copied()
    }

    /// Destroys the namespace's contents: classes and enums are
    /// unregistered from the type system (cascading through their own
    /// children), child namespaces are destroyed recursively, then every
    /// list is cleared.
    pub fn destroy_contents(&self, ts: &crate::typesystem::TypeSystem) {
        for id in self.class_ids() {
            ts.destroy(id);
        }
        for id in self.enum_ids() {
            ts.destroy(id);
        }
        for child in self.namespaces() {
            child.destroy_contents(ts);
        }
        self.clear();
    }

    /// Drops all contents; used for destruction cascades.
    pub(crate) fn clear(&self) {
        self.0.vars.borrow_mut().clear();
        self.0.enums.borrow_mut().clear();
        self.0.classes.borrow_mut().clear();
        self.0.functions.borrow_mut().clear();
        self.0.operators.borrow_mut().clear();
        self.0.literal_operators.borrow_mut().clear();
        self.0.namespaces.borrow_mut().clear();
        self.0.class_templates.borrow_mut().clear();
        self.0.function_templates.borrow_mut().clear();
        self.0.typedefs.borrow_mut().clear();
    }

    #[must_use]
    pub(crate) fn class_ids(&self) -> Vec<Type> {
        self.0.classes.borrow().iter().map(Class::id).collect()
    }

    #[must_use]
    pub(crate) fn enum_ids(&self) -> Vec<Type> {
        self.0.enums.borrow().iter().map(Enum::id).collect()
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Namespace {}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name().is_empty() { "<root>" } else { self.name() };
        write!(f, "Namespace({name})")
    }
}
