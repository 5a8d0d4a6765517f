use std::{fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    access::AccessSpecifier,
    class::Class,
    closure::ClosureType,
    context::Context,
    enumeration::{Enum, Enumerator},
    error::{EngineError, EngineResult},
    function::Function,
    namespace::Namespace,
    operators::OperatorId,
    script::Script,
    template::{ClassTemplate, FunctionTemplate, TemplateArgument},
    types::Type,
    value::Value,
};

/// A template found by name lookup.
#[derive(Clone)]
pub enum TemplateLookup {
    Class(ClassTemplate),
    Function(FunctionTemplate),
}

/// The result of a name lookup: exactly one of the possible categories.
#[derive(Clone, Default)]
pub enum NameLookup {
    #[default]
    Unknown,
    /// An overload set.
    Functions(Vec<Function>),
    Type(Type),
    Value(Value),
    Template(TemplateLookup),
    Enumerator(Enumerator),
    StaticDataMember {
        class: Class,
        name: String,
    },
    /// A nested namespace, wrapped as a scope.
    NamespaceRef(Scope),
    /// A data member: the absolute index within an instance's sub-object
    /// vector (`attributes_offset` of the owning class + member index).
    DataMember {
        class: Class,
        index: usize,
    },
    /// A script global, by index.
    Global(usize),
    /// A lambda capture, by index.
    Capture(usize),
    /// A template parameter, by index.
    TemplateParameter(usize),
}

impl NameLookup {
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Debug for NameLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Functions(fs) => write!(f, "Functions({n})", n = fs.len()),
            Self::Type(t) => write!(f, "Type({t:?})"),
            Self::Value(_) => write!(f, "Value"),
            Self::Template(TemplateLookup::Class(t)) => write!(f, "ClassTemplate({name})", name = t.name()),
            Self::Template(TemplateLookup::Function(t)) => write!(f, "FunctionTemplate({name})", name = t.name()),
            Self::Enumerator(e) => write!(f, "Enumerator({e:?})"),
            Self::StaticDataMember { name, .. } => write!(f, "StaticDataMember({name})"),
            Self::NamespaceRef(_) => write!(f, "NamespaceRef"),
            Self::DataMember { index, .. } => write!(f, "DataMember({index})"),
            Self::Global(i) => write!(f, "Global({i})"),
            Self::Capture(i) => write!(f, "Capture({i})"),
            Self::TemplateParameter(i) => write!(f, "TemplateParameter({i})"),
        }
    }
}

/// Injected names carried by extensible scopes (namespace, class, script).
#[derive(Clone, Default)]
pub(crate) struct ExtensibleData {
    classes: Vec<Class>,
    enums: Vec<Enum>,
    functions: Vec<Function>,
    values: AHashMap<String, Value>,
    typedefs: AHashMap<String, Type>,
    type_aliases: AHashMap<String, Type>,
}

impl ExtensibleData {
    fn lookup(&self, name: &str, result: &mut Vec<Function>) -> Option<NameLookup> {
        for f in &self.functions {
            if f.name().as_str() == Some(name) {
                result.push(f.clone());
            }
        }
        if !result.is_empty() {
            return Some(NameLookup::Functions(std::mem::take(result)));
        }
        if let Some(c) = self.classes.iter().find(|c| c.name() == name) {
            return Some(NameLookup::Type(c.id()));
        }
        if let Some(e) = self.enums.iter().find(|e| e.name() == name) {
            return Some(NameLookup::Type(e.id()));
        }
        for e in &self.enums {
            if !e.is_enum_class()
                && let Some(v) = e.value_of(name)
            {
                return Some(NameLookup::Enumerator(Enumerator::new(e.clone(), v)));
            }
        }
        if let Some(v) = self.values.get(name) {
            return Some(NameLookup::Value(v.clone()));
        }
        if let Some(t) = self.typedefs.get(name).or_else(|| self.type_aliases.get(name)) {
            return Some(NameLookup::Type(*t));
        }
        None
    }
}

/// Namespace-backed scope node.
#[derive(Clone)]
pub(crate) struct NamespaceScope {
    namespace: Namespace,
    imported: Vec<Namespace>,
    aliases: AHashMap<String, Vec<String>>,
    extensible: ExtensibleData,
}

/// Class-backed scope node, with the current access specifier.
#[derive(Clone)]
pub(crate) struct ClassScope {
    class: Class,
    access: AccessSpecifier,
    extensible: ExtensibleData,
}

#[derive(Clone)]
pub(crate) struct EnumScope {
    enum_: Enum,
}

#[derive(Clone)]
pub(crate) struct LambdaScope {
    closure: ClosureType,
    /// The class of the captured `this`, when the first capture is `this`.
    this_class: Option<Class>,
}

#[derive(Clone)]
pub(crate) struct ScriptScope {
    script: Script,
    imported: Vec<Namespace>,
    aliases: AHashMap<String, Vec<String>>,
    extensible: ExtensibleData,
}

#[derive(Clone)]
pub(crate) struct ContextScope {
    context: Context,
}

#[derive(Clone)]
pub(crate) struct TemplateArgumentScope {
    arguments: Vec<(String, TemplateArgument)>,
}

#[derive(Clone)]
pub(crate) struct FunctionScope {
    function: Function,
}

/// The tagged payload of a scope node; the tag selects the lookup
/// strategy.
#[derive(Clone)]
pub(crate) enum ScopeData {
    Namespace(NamespaceScope),
    Class(ClassScope),
    Enum(EnumScope),
    Lambda(LambdaScope),
    Script(ScriptScope),
    Context(ContextScope),
    TemplateArgument(TemplateArgumentScope),
    Function(FunctionScope),
}

#[derive(Clone)]
pub(crate) struct ScopeNode {
    parent: Option<Scope>,
    data: ScopeData,
}

/// The kind of a scope node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScopeKind {
    Namespace,
    Class,
    Enum,
    Lambda,
    Script,
    Context,
    TemplateArgument,
    Function,
}

/// A shared-ownership handle to a layered list of scopes.
///
/// Lookup tries the innermost node first and walks outward. Injection is
/// copy-on-write: mutating a node that other scope handles share clones
/// it (and the nodes below it) while aliasing unmodified ancestors.
#[derive(Clone)]
pub struct Scope(Rc<ScopeNode>);

impl Scope {
    fn from_node(node: ScopeNode) -> Self {
        Self(Rc::new(node))
    }

    #[must_use]
    pub fn namespace(namespace: Namespace) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Namespace(NamespaceScope {
                namespace,
                imported: Vec::new(),
                aliases: AHashMap::new(),
                extensible: ExtensibleData::default(),
            }),
        })
    }

    #[must_use]
    pub fn class(class: Class) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Class(ClassScope {
                class,
                access: AccessSpecifier::Public,
                extensible: ExtensibleData::default(),
            }),
        })
    }

    #[must_use]
    pub fn enumeration(enum_: Enum) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Enum(EnumScope { enum_ }),
        })
    }

    #[must_use]
    pub fn lambda(closure: ClosureType, this_class: Option<Class>) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Lambda(LambdaScope { closure, this_class }),
        })
    }

    #[must_use]
    pub fn script(script: Script) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Script(ScriptScope {
                script,
                imported: Vec::new(),
                aliases: AHashMap::new(),
                extensible: ExtensibleData::default(),
            }),
        })
    }

    #[must_use]
    pub fn context(context: Context) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Context(ContextScope { context }),
        })
    }

    #[must_use]
    pub fn template_arguments(arguments: Vec<(String, TemplateArgument)>) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::TemplateArgument(TemplateArgumentScope { arguments }),
        })
    }

    #[must_use]
    pub fn function(function: Function) -> Self {
        Self::from_node(ScopeNode {
            parent: None,
            data: ScopeData::Function(FunctionScope { function }),
        })
    }

    /// Returns this scope re-parented onto `parent`.
    #[must_use]
    pub fn with_parent(&self, parent: Scope) -> Self {
        let mut node = (*self.0).clone();
        node.parent = Some(parent);
        Self::from_node(node)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Scope> {
        self.0.parent.clone()
    }

    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        match &self.0.data {
            ScopeData::Namespace(_) => ScopeKind::Namespace,
            ScopeData::Class(_) => ScopeKind::Class,
            ScopeData::Enum(_) => ScopeKind::Enum,
            ScopeData::Lambda(_) => ScopeKind::Lambda,
            ScopeData::Script(_) => ScopeKind::Script,
            ScopeData::Context(_) => ScopeKind::Context,
            ScopeData::TemplateArgument(_) => ScopeKind::TemplateArgument,
            ScopeData::Function(_) => ScopeKind::Function,
        }
    }

    /// The class served by this node, when it is a class scope.
    #[must_use]
    pub fn as_class(&self) -> Option<Class> {
        match &self.0.data {
            ScopeData::Class(cs) => Some(cs.class.clone()),
            _ => None,
        }
    }

    /// The namespace served by this node, when it is a namespace scope.
    #[must_use]
    pub fn as_namespace(&self) -> Option<Namespace> {
        match &self.0.data {
            ScopeData::Namespace(ns) => Some(ns.namespace.clone()),
            ScopeData::Script(ss) => Some(ss.script.namespace()),
            _ => None,
        }
    }

    #[must_use]
    pub fn access_specifier(&self) -> AccessSpecifier {
        match &self.0.data {
            ScopeData::Class(cs) => cs.access,
            _ => AccessSpecifier::Public,
        }
    }

    pub fn set_access_specifier(&mut self, access: AccessSpecifier) {
        if let ScopeData::Class(cs) = &mut self.make_node_mut().data {
            cs.access = access;
        }
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn make_node_mut(&mut self) -> &mut ScopeNode {
        Rc::make_mut(&mut self.0)
    }

    // --- lookup ---

    /// Unqualified name lookup: asks this node, then walks to the parent.
    #[must_use]
    pub fn lookup(&self, name: &str) -> NameLookup {
        match self.lookup_local(name) {
            Some(found) => found,
            None => self.parent().map_or(NameLookup::Unknown, |p| p.lookup(name)),
        }
    }

    /// Lookup restricted to this node.
    #[must_use]
    pub fn lookup_local(&self, name: &str) -> Option<NameLookup> {
        let mut overloads = Vec::new();
        match &self.0.data {
            ScopeData::Namespace(ns) => ns.lookup(name, &mut overloads),
            ScopeData::Class(cs) => cs.lookup(name, &mut overloads),
            ScopeData::Enum(es) => es
                .enum_
                .value_of(name)
                .map(|v| NameLookup::Enumerator(Enumerator::new(es.enum_.clone(), v))),
            ScopeData::Lambda(ls) => ls.lookup(name),
            ScopeData::Script(ss) => ss.lookup(name, &mut overloads),
            ScopeData::Context(cs) => cs.context.get_var(name).map(NameLookup::Value),
            ScopeData::TemplateArgument(ts) => ts.lookup(name),
            ScopeData::Function(_) => None,
        }
    }

    /// Qualified lookup: resolves all but the last path segment as nested
    /// namespace scopes, then looks the final segment up there.
    #[must_use]
    pub fn lookup_qualified(&self, path: &[&str]) -> NameLookup {
        match path {
            [] => NameLookup::Unknown,
            [name] => self.lookup(name),
            [first, rest @ ..] => match self.child(first) {
                Some(child) => child.lookup_qualified(rest),
                None => NameLookup::Unknown,
            },
        }
    }

    /// Resolves `name` as a child namespace scope or a namespace alias
    /// target.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Scope> {
        let (namespace, aliases) = match &self.0.data {
            ScopeData::Namespace(ns) => (ns.namespace.clone(), Some(&ns.aliases)),
            ScopeData::Script(ss) => (ss.script.namespace(), Some(&ss.aliases)),
            _ => return None,
        };

        if let Some(child) = namespace.find_namespace(name) {
            return Some(Scope::namespace(child).with_parent(self.clone()));
        }
        if let Some(path) = aliases.and_then(|a| a.get(name)) {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            return self.resolve_namespace_path(&segments);
        }
        self.parent().and_then(|p| p.child(name))
    }

    fn resolve_namespace_path(&self, path: &[&str]) -> Option<Scope> {
        let mut current = self.clone();
        for segment in path {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Returns all operators with id `op` visible from this scope,
    /// walking outward only while nothing was found.
    #[must_use]
    pub fn lookup_operator(&self, op: OperatorId) -> Vec<Function> {
        let found = match &self.0.data {
            ScopeData::Namespace(ns) => {
                let mut out = ns.namespace.find_operators(op);
                for imported in &ns.imported {
                    out.extend(imported.find_operators(op));
                }
                out
            }
            ScopeData::Class(cs) => {
                // Operators of the class and its bases.
                let mut out = Vec::new();
                let mut current = Some(cs.class.clone());
                while let Some(class) = current {
                    out.extend(class.operators().into_iter().filter(|f| f.operator_id() == Some(op)));
                    current = class.parent();
                }
                out
            }
            ScopeData::Script(ss) => {
                let mut out = ss.script.namespace().find_operators(op);
                for imported in &ss.imported {
                    out.extend(imported.find_operators(op));
                }
                out
            }
            _ => Vec::new(),
        };
        if !found.is_empty() {
            return found;
        }
        self.parent().map_or_else(Vec::new, |p| p.lookup_operator(op))
    }

    /// Literal-operator lookup, keyed by suffix.
    #[must_use]
    pub fn lookup_literal_operator(&self, suffix: &str) -> Vec<Function> {
        let found = match &self.0.data {
            ScopeData::Namespace(ns) => {
                let mut out = ns.namespace.find_literal_operators(suffix);
                for imported in &ns.imported {
                    out.extend(imported.find_literal_operators(suffix));
                }
                out
            }
            ScopeData::Script(ss) => ss.script.namespace().find_literal_operators(suffix),
            _ => Vec::new(),
        };
        if !found.is_empty() {
            return found;
        }
        self.parent().map_or_else(Vec::new, |p| p.lookup_literal_operator(suffix))
    }

    // --- injection (copy-on-write) ---

    pub fn inject_value(&mut self, name: impl Into<String>, value: Value) {
        self.with_extensible(|ext| {
            ext.values.insert(name.into(), value);
        });
    }

    pub fn inject_class(&mut self, class: Class) {
        self.with_extensible(|ext| ext.classes.push(class));
    }

    pub fn inject_enum(&mut self, e: Enum) {
        self.with_extensible(|ext| ext.enums.push(e));
    }

    pub fn inject_function(&mut self, f: Function) {
        self.with_extensible(|ext| ext.functions.push(f));
    }

    pub fn inject_typedef(&mut self, name: impl Into<String>, ty: Type) {
        self.with_extensible(|ext| {
            ext.typedefs.insert(name.into(), ty);
        });
    }

    pub fn inject_type_alias(&mut self, name: impl Into<String>, ty: Type) {
        self.with_extensible(|ext| {
            ext.type_aliases.insert(name.into(), ty);
        });
    }

    fn with_extensible(&mut self, f: impl FnOnce(&mut ExtensibleData)) {
        let Some(rebuilt) = rebuild_mutating(self, &|data| {
            matches!(
                data,
                ScopeData::Namespace(_) | ScopeData::Class(_) | ScopeData::Script(_)
            )
        }) else {
            return;
        };
        let (mut scope, target) = rebuilt;
        {
            // The rebuilt chain is uniquely owned up to the target node.
            let node = unique_node_at(&mut scope, target);
            match &mut node.data {
                ScopeData::Namespace(ns) => f(&mut ns.extensible),
                ScopeData::Class(cs) => f(&mut cs.extensible),
                ScopeData::Script(ss) => f(&mut ss.extensible),
                _ => {}
            }
        }
        *self = scope;
    }

    /// Imports a namespace into the nearest namespace (or script)
    /// ancestor: its visible members merge into lookups from this scope.
    pub fn import_namespace(&mut self, imported: Namespace) {
        let Some(rebuilt) = rebuild_mutating(self, &|data| {
            matches!(data, ScopeData::Namespace(_) | ScopeData::Script(_))
        }) else {
            return;
        };
        let (mut scope, target) = rebuilt;
        {
            let node = unique_node_at(&mut scope, target);
            match &mut node.data {
                ScopeData::Namespace(ns) => ns.imported.push(imported),
                ScopeData::Script(ss) => ss.imported.push(imported),
                _ => {}
            }
        }
        *self = scope;
    }

    /// Records `alias` for the namespace designated by `path`. The first
    /// segment must resolve from this scope.
    pub fn inject_namespace_alias(&mut self, alias: impl Into<String>, path: Vec<String>) -> EngineResult<()> {
        let first = path.first().ok_or_else(|| EngineError::runtime_error("empty namespace alias target"))?;
        if self.child(first).is_none() {
            return Err(EngineError::runtime_error(format!(
                "namespace alias target '{first}' not found"
            )));
        }
        let alias = alias.into();
        let Some(rebuilt) = rebuild_mutating(self, &|data| {
            matches!(data, ScopeData::Namespace(_) | ScopeData::Script(_))
        }) else {
            return Err(EngineError::runtime_error("no namespace scope to hold the alias"));
        };
        let (mut scope, target) = rebuilt;
        {
            let node = unique_node_at(&mut scope, target);
            match &mut node.data {
                ScopeData::Namespace(ns) => {
                    ns.aliases.insert(alias, path);
                }
                ScopeData::Script(ss) => {
                    ss.aliases.insert(alias, path);
                }
                _ => {}
            }
        }
        *self = scope;
        Ok(())
    }

    /// Walks this scope's chain and `other`'s namespace tree in
    /// parallel, outermost level first, importing each level of `other`
    /// into the corresponding level of `self`.
    ///
    /// Levels are correlated by name: the outermost namespace level of
    /// the chain imports `other`'s namespace itself, and after each
    /// import the walk descends into `other`'s child namespace named
    /// like the next level. The walk stops at the first level that is
    /// not namespace-backed, or when `other` has no matching child.
    ///
    /// `other` must be a parentless namespace scope.
    pub fn merge(&mut self, other: &Scope) -> EngineResult<()> {
        if other.parent().is_some() {
            return Err(EngineError::runtime_error("cannot merge a scope that has a parent"));
        }
        let Some(mut imported) = other.as_namespace() else {
            return Err(EngineError::runtime_error("cannot merge a non-namespace scope"));
        };

        // The chain, outermost level first.
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            current = scope.parent();
            chain.push(scope);
        }
        chain.reverse();

        // Pair the levels: each namespace level receives the
        // correspondingly-named namespace of `other`'s tree.
        let mut imports: Vec<Option<Namespace>> = vec![None; chain.len()];
        let mut i = 0;
        while i < chain.len() && chain[i].as_namespace().is_some() {
            imports[i] = Some(imported.clone());
            let Some(next) = chain.get(i + 1).and_then(Scope::as_namespace) else {
                break;
            };
            match imported.find_namespace(next.name()) {
                Some(child) => imported = child,
                None => break,
            }
            i += 1;
        }

        // Rebuild the chain leafward, applying the per-level imports.
        let mut rebuilt: Option<Scope> = None;
        for (scope, import) in chain.iter().zip(imports) {
            let mut node = (*scope.0).clone();
            node.parent = rebuilt;
            if let Some(ns) = import {
                match &mut node.data {
                    ScopeData::Namespace(n) => n.imported.push(ns),
                    ScopeData::Script(s) => s.imported.push(ns),
                    _ => {}
                }
            }
            rebuilt = Some(Scope::from_node(node));
        }
        if let Some(scope) = rebuilt {
            *self = scope;
        }
        Ok(())
    }
}

/// Rebuilds the chain from `scope` down to the nearest node matching
/// `pred`, cloning shared nodes so the caller can mutate the target.
/// Returns the rebuilt leaf scope and the depth of the target node.
fn rebuild_mutating(scope: &Scope, pred: &dyn Fn(&ScopeData) -> bool) -> Option<(Scope, usize)> {
    fn rec(scope: &Scope, pred: &dyn Fn(&ScopeData) -> bool, depth: usize) -> Option<(Scope, usize)> {
        if pred(&scope.0.data) {
            let node = (*scope.0).clone();
            return Some((Scope::from_node(node), depth));
        }
        let parent = scope.parent()?;
        let (new_parent, target) = rec(&parent, pred, depth + 1)?;
        let mut node = (*scope.0).clone();
        node.parent = Some(new_parent);
        Some((Scope::from_node(node), target))
    }
    rec(scope, pred, 0)
}

/// Grants mutable access to the node `depth` levels above the leaf of a
/// freshly rebuilt (uniquely owned) chain.
fn unique_node_at(scope: &mut Scope, depth: usize) -> &mut ScopeNode {
    let mut node = Rc::get_mut(&mut scope.0).expect("rebuilt scope node is uniquely owned");
    for _ in 0..depth {
        let parent = node.parent.as_mut().expect("rebuilt chain has the target node");
        node = Rc::get_mut(&mut parent.0).expect("rebuilt scope node is uniquely owned");
    }
    node
}

impl NamespaceScope {
    fn lookup(&self, name: &str, overloads: &mut Vec<Function>) -> Option<NameLookup> {
        if let Some(found) = self.extensible.lookup(name, overloads) {
            return Some(found);
        }
        if let Some(found) = lookup_in_namespace(&self.namespace, name, overloads) {
            return Some(found);
        }
        for imported in &self.imported {
            if let Some(found) = lookup_in_namespace(imported, name, overloads) {
                return Some(found);
            }
        }
        None
    }
}

impl ScriptScope {
    fn lookup(&self, name: &str, overloads: &mut Vec<Function>) -> Option<NameLookup> {
        // Script globals shadow everything else.
        if let Some(index) = self.script.global_index(name) {
            return Some(NameLookup::Global(index));
        }
        if let Some(found) = self.extensible.lookup(name, overloads) {
            return Some(found);
        }
        if let Some(found) = lookup_in_namespace(&self.script.namespace(), name, overloads) {
            return Some(found);
        }
        for imported in &self.imported {
            if let Some(found) = lookup_in_namespace(imported, name, overloads) {
                return Some(found);
            }
        }
        None
    }
}

impl ClassScope {
    fn lookup(&self, name: &str, overloads: &mut Vec<Function>) -> Option<NameLookup> {
        // Data members of the class and its ancestors, most-derived first.
        if let Some((owner, index)) = self.class.find_data_member(name) {
            let absolute = owner.attributes_offset() + index;
            return Some(NameLookup::DataMember {
                class: owner,
                index: absolute,
            });
        }
        if let Some(_member) = self.class.static_data_member(name) {
            return Some(NameLookup::StaticDataMember {
                class: self.class.clone(),
                name: name.to_owned(),
            });
        }

        let mut current = Some(self.class.clone());
        while let Some(class) = current {
            overloads.extend(class.find_member_functions(name));
            current = class.parent();
        }
        if !overloads.is_empty() {
            return Some(NameLookup::Functions(std::mem::take(overloads)));
        }

        if let Some(nested) = self.class.classes().iter().find(|c| c.name() == name) {
            return Some(NameLookup::Type(nested.id()));
        }
        if let Some(nested) = self.class.enums().iter().find(|e| e.name() == name) {
            return Some(NameLookup::Type(nested.id()));
        }
        for e in self.class.enums() {
            if !e.is_enum_class()
                && let Some(v) = e.value_of(name)
            {
                return Some(NameLookup::Enumerator(Enumerator::new(e.clone(), v)));
            }
        }
        if let Some(t) = self.class.find_typedef(name) {
            return Some(NameLookup::Type(t));
        }
        if let Some(t) = self.class.class_templates().iter().find(|t| t.name() == name) {
            return Some(NameLookup::Template(TemplateLookup::Class(t.clone())));
        }
        if let Some(t) = self.class.function_templates().iter().find(|t| t.name() == name) {
            return Some(NameLookup::Template(TemplateLookup::Function(t.clone())));
        }
        self.extensible.lookup(name, overloads)
    }
}

impl LambdaScope {
    fn lookup(&self, name: &str) -> Option<NameLookup> {
        if let Some(index) = self.closure.capture_index(name) {
            return Some(NameLookup::Capture(index));
        }
        if self.closure.captures_this()
            && let Some(class) = &self.this_class
            && let Some((owner, index)) = class.find_data_member(name)
        {
            let absolute = owner.attributes_offset() + index;
            return Some(NameLookup::DataMember {
                class: owner,
                index: absolute,
            });
        }
        None
    }
}

impl TemplateArgumentScope {
    fn lookup(&self, name: &str) -> Option<NameLookup> {
        let (index, (_, arg)) = self.arguments.iter().enumerate().find(|(_, (n, _))| n.as_str() == name)?;
        match arg {
            TemplateArgument::Type(t) => Some(NameLookup::Type(*t)),
            TemplateArgument::Int(v) => Some(NameLookup::Value(Value::int(*v))),
            TemplateArgument::Bool(v) => Some(NameLookup::Value(Value::bool_(*v))),
            TemplateArgument::Pack(_) => Some(NameLookup::TemplateParameter(index)),
        }
    }
}

impl FunctionScope {
    #[must_use]
    pub(crate) fn function(&self) -> &Function {
        &self.function
    }
}

/// The generic lookup over a namespace's contents: functions (overload
/// accumulation), then types, enum keys, templates, values, typedefs.
fn lookup_in_namespace(ns: &Namespace, name: &str, overloads: &mut Vec<Function>) -> Option<NameLookup> {
    overloads.extend(ns.find_functions(name));
    if !overloads.is_empty() {
        return Some(NameLookup::Functions(std::mem::take(overloads)));
    }
    if let Some(c) = ns.find_class(name) {
        return Some(NameLookup::Type(c.id()));
    }
    if let Some(e) = ns.find_enum(name) {
        return Some(NameLookup::Type(e.id()));
    }
    for e in ns.enums() {
        if !e.is_enum_class()
            && let Some(v) = e.value_of(name)
        {
            return Some(NameLookup::Enumerator(Enumerator::new(e.clone(), v)));
        }
    }
    if let Some(t) = ns.find_class_template(name) {
        return Some(NameLookup::Template(TemplateLookup::Class(t)));
    }
    if let Some(t) = ns.find_function_template(name) {
        return Some(NameLookup::Template(TemplateLookup::Function(t)));
    }
    if let Some(v) = ns.find_var(name) {
        return Some(NameLookup::Value(v));
    }
    if let Some(t) = ns.find_typedef(name) {
        return Some(NameLookup::Type(t));
    }
    if let Some(child) = ns.find_namespace(name) {
        // Reported as a scope so qualified lookup can continue into it.
        return Some(NameLookup::NamespaceRef(Scope::namespace(child)));
    }
    None
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = Vec::new();
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            kinds.push(scope.kind().to_string());
            current = scope.parent();
        }
        write!(f, "Scope({chain})", chain = kinds.join(" -> "))
    }
}
