use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    class::{Class, ClassTemplateInstanceInfo},
    engine::Engine,
    error::{EngineError, EngineResult},
    function::{Function, TemplateInstanceInfo},
    scope::Scope,
    symbols::EnclosingSymbol,
    types::Type,
    typesystem::TypeSystem,
};

/// Kind of a template parameter: a type, or a non-type constant of the
/// given type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateParameterKind {
    Type,
    NonType(Type),
}

/// A single template parameter: kind, name, optional default argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub kind: TemplateParameterKind,
    pub name: String,
    pub default: Option<TemplateArgument>,
}

impl TemplateParameter {
    #[must_use]
    pub fn type_param(name: impl Into<String>) -> Self {
        Self {
            kind: TemplateParameterKind::Type,
            name: name.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn non_type(ty: Type, name: impl Into<String>) -> Self {
        Self {
            kind: TemplateParameterKind::NonType(ty),
            name: name.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: TemplateArgument) -> Self {
        self.default = Some(default);
        self
    }
}

/// A template argument: a tagged union of type, integer, bool-constant or
/// pack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArgument {
    Type(Type),
    Int(i32),
    Bool(bool),
    Pack(Vec<TemplateArgument>),
}

impl TemplateArgument {
    #[must_use]
    pub fn as_type(&self) -> Option<Type> {
        match self {
            Self::Type(t) => Some(*t),
            _ => None,
        }
    }
}

/// A deduction pattern: the compiler's lowering of a template parameter
/// appearance within a declaration.
#[derive(Clone, PartialEq)]
pub enum TemplatePattern {
    /// A template parameter of the enclosing template, by index.
    Param(usize),
    /// A known concrete type; deduction only checks equality.
    Concrete(Type),
    /// `const P`
    Const(Box<TemplatePattern>),
    /// `P&`
    Ref(Box<TemplatePattern>),
    /// `P&&`
    RRef(Box<TemplatePattern>),
    /// A function type `R(P1, ..., Pn)`.
    Function {
        ret: Box<TemplatePattern>,
        params: Vec<TemplatePattern>,
    },
    /// A class-template-id `C<A1, ..., Ak>`.
    TemplateId {
        template: ClassTemplate,
        args: Vec<TemplatePattern>,
    },
    /// A pinned non-type argument inside a template-id.
    Arg(TemplateArgument),
}

impl TemplatePattern {
    #[must_use]
    pub fn param(index: usize) -> Self {
        Self::Param(index)
    }

    #[must_use]
    pub fn concrete(ty: Type) -> Self {
        Self::Concrete(ty)
    }

    #[must_use]
    pub fn const_(inner: Self) -> Self {
        Self::Const(Box::new(inner))
    }

    #[must_use]
    pub fn ref_(inner: Self) -> Self {
        Self::Ref(Box::new(inner))
    }

    #[must_use]
    pub fn rref(inner: Self) -> Self {
        Self::RRef(Box::new(inner))
    }

    #[must_use]
    pub fn function(ret: Self, params: Vec<Self>) -> Self {
        Self::Function {
            ret: Box::new(ret),
            params,
        }
    }

    #[must_use]
    pub fn template_id(template: ClassTemplate, args: Vec<Self>) -> Self {
        Self::TemplateId { template, args }
    }

    /// True when the pattern contains no reference to a template
    /// parameter.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        match self {
            Self::Param(_) => false,
            Self::Concrete(_) | Self::Arg(_) => true,
            Self::Const(p) | Self::Ref(p) | Self::RRef(p) => p.is_grounded(),
            Self::Function { ret, params } => ret.is_grounded() && params.iter().all(Self::is_grounded),
            Self::TemplateId { args, .. } => args.iter().all(Self::is_grounded),
        }
    }
}

impl fmt::Debug for TemplatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(i) => write!(f, "#{i}"),
            Self::Concrete(t) => write!(f, "{t:?}"),
            Self::Const(p) => write!(f, "const {p:?}"),
            Self::Ref(p) => write!(f, "{p:?}&"),
            Self::RRef(p) => write!(f, "{p:?}&&"),
            Self::Function { ret, params } => write!(f, "{ret:?}({params:?})"),
            Self::TemplateId { template, args } => write!(f, "{name}<{args:?}>", name = template.name()),
            Self::Arg(a) => write!(f, "{a:?}"),
        }
    }
}

/// Outcome of comparing two templates for specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePartialOrdering {
    Indistinguishable,
    FirstMoreSpecialized,
    SecondMoreSpecialized,
    NotComparable,
}

/// Native instantiation backend of a class template (or partial
/// specialization): given the template and the full argument vector,
/// produce the instance class. Script-defined templates install a backend
/// that re-enters the compiler on the stored declaration.
pub type ClassTemplateBackend = Rc<dyn Fn(&Engine, &ClassTemplate, &[TemplateArgument]) -> EngineResult<Class>>;

/// Native instantiation backend of a function template.
pub type FunctionTemplateBackend = Rc<dyn Fn(&Engine, &FunctionTemplate, &[TemplateArgument]) -> EngineResult<Function>>;

/// A partial specialization: patterns over the primary's parameters plus
/// its own instantiation backend.
#[derive(Clone)]
pub struct PartialSpecialization {
    pub patterns: Vec<TemplatePattern>,
    pub backend: ClassTemplateBackend,
}

pub(crate) struct ClassTemplateImpl {
    name: String,
    parameters: Vec<TemplateParameter>,
    scope: RefCell<Option<Scope>>,
    enclosing: RefCell<EnclosingSymbol>,
    instances: RefCell<AHashMap<Vec<TemplateArgument>, Class>>,
    specializations: RefCell<Vec<PartialSpecialization>>,
    backend: RefCell<Option<ClassTemplateBackend>>,
}

/// A class template: parameters, an ordered list of partial
/// specializations, and a cache of instances keyed by argument vector.
#[derive(Clone)]
pub struct ClassTemplate(pub(crate) Rc<ClassTemplateImpl>);

impl ClassTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Vec<TemplateParameter>) -> Self {
        Self(Rc::new(ClassTemplateImpl {
            name: name.into(),
            parameters,
            scope: RefCell::new(None),
            enclosing: RefCell::new(EnclosingSymbol::None),
            instances: RefCell::new(AHashMap::new()),
            specializations: RefCell::new(Vec::new()),
            backend: RefCell::new(None),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.0.parameters
    }

    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.0.scope.borrow().clone()
    }

    pub fn set_scope(&self, scope: Scope) {
        *self.0.scope.borrow_mut() = Some(scope);
    }

    #[must_use]
    pub fn enclosing_symbol(&self) -> Option<crate::symbols::Symbol> {
        self.0.enclosing.borrow().resolve()
    }

    pub fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    pub fn set_backend(&self, backend: ClassTemplateBackend) {
        *self.0.backend.borrow_mut() = Some(backend);
    }

    pub fn add_specialization(&self, spec: PartialSpecialization) {
        self.0.specializations.borrow_mut().push(spec);
    }

    #[must_use]
    pub fn specializations(&self) -> Vec<PartialSpecialization> {
        self.0.specializations.borrow().clone()
    }

    #[must_use]
    pub fn instances(&self) -> Vec<(Vec<TemplateArgument>, Class)> {
        self.0
            .instances
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Fills trailing defaulted parameters.
    fn complete_arguments(&self, args: &[TemplateArgument]) -> EngineResult<Vec<TemplateArgument>> {
        let mut full = args.to_vec();
        for param in self.parameters().iter().skip(full.len()) {
            match &param.default {
                Some(default) => full.push(default.clone()),
                None => {
                    return Err(EngineError::template_instantiation_error(
                        self.name(),
                        format!("missing argument for parameter '{name}'", name = param.name),
                    ));
                }
            }
        }
        if full.len() > self.parameters().len() {
            return Err(EngineError::template_instantiation_error(
                self.name(),
                "too many template arguments",
            ));
        }
        Ok(full)
    }

    /// Returns the cached instance for `args` or instantiates it, picking
    /// the most specialized viable partial specialization (falling back
    /// to the primary). Idempotent: repeated calls with equal arguments
    /// return the same class.
    pub fn get_instance(&self, engine: &Engine, args: &[TemplateArgument]) -> EngineResult<Class> {
        let full = self.complete_arguments(args)?;

        if let Some(existing) = self.0.instances.borrow().get(&full) {
            return Ok(existing.clone());
        }

        let backend = self.select_backend(&full, engine.type_system())?;
        let class = backend(engine, self, &full)?;
        if class.template_instance_info().is_none() {
            class.set_template_instance_info(ClassTemplateInstanceInfo {
                template: self.clone(),
                arguments: full.clone(),
            });
        }
        self.0.instances.borrow_mut().insert(full, class.clone());
        Ok(class)
    }

    /// Picks the backend: the unique most-specialized matching partial
    /// specialization, or the primary.
    fn select_backend(&self, args: &[TemplateArgument], ts: &TypeSystem) -> EngineResult<ClassTemplateBackend> {
        let specs = self.0.specializations.borrow();
        let mut viable: Vec<&PartialSpecialization> = Vec::new();
        for spec in specs.iter() {
            if deduce_from_arguments(&spec.patterns, args, ts).success() {
                viable.push(spec);
            }
        }

        if !viable.is_empty() {
            let mut best = viable[0];
            for candidate in &viable[1..] {
                if matches!(
                    partial_ordering(&candidate.patterns, &best.patterns),
                    TemplatePartialOrdering::FirstMoreSpecialized
                ) {
                    best = candidate;
                }
            }
            // The winner must beat every other viable candidate.
            let unique = viable.iter().all(|other| {
                std::ptr::eq(*other, best)
                    || matches!(
                        partial_ordering(&best.patterns, &other.patterns),
                        TemplatePartialOrdering::FirstMoreSpecialized
                    )
            });
            if !unique {
                return Err(EngineError::template_instantiation_error(
                    self.name(),
                    "ambiguous partial specialization",
                ));
            }
            return Ok(best.backend.clone());
        }

        self.0
            .backend
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::template_instantiation_error(self.name(), "no instantiation backend"))
    }
}

impl PartialEq for ClassTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ClassTemplate {}

impl fmt::Debug for ClassTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassTemplate({name}<{n} params>)",
            name = self.name(),
            n = self.parameters().len()
        )
    }
}

pub(crate) struct FunctionTemplateImpl {
    name: String,
    parameters: Vec<TemplateParameter>,
    /// Patterns of the declared function parameters, used for deduction.
    patterns: Vec<TemplatePattern>,
    scope: RefCell<Option<Scope>>,
    enclosing: RefCell<EnclosingSymbol>,
    instances: RefCell<AHashMap<Vec<TemplateArgument>, Function>>,
    backend: RefCell<Option<FunctionTemplateBackend>>,
}

/// A function template: parameters, the parameter patterns used for
/// argument deduction, and a cache of instances keyed by argument vector.
#[derive(Clone)]
pub struct FunctionTemplate(pub(crate) Rc<FunctionTemplateImpl>);

impl FunctionTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Vec<TemplateParameter>, patterns: Vec<TemplatePattern>) -> Self {
        Self(Rc::new(FunctionTemplateImpl {
            name: name.into(),
            parameters,
            patterns,
            scope: RefCell::new(None),
            enclosing: RefCell::new(EnclosingSymbol::None),
            instances: RefCell::new(AHashMap::new()),
            backend: RefCell::new(None),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.0.parameters
    }

    #[must_use]
    pub fn patterns(&self) -> &[TemplatePattern] {
        &self.0.patterns
    }

    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.0.scope.borrow().clone()
    }

    pub fn set_scope(&self, scope: Scope) {
        *self.0.scope.borrow_mut() = Some(scope);
    }

    pub fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    pub fn set_backend(&self, backend: FunctionTemplateBackend) {
        *self.0.backend.borrow_mut() = Some(backend);
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Deduces this template's arguments from the call's input types.
    #[must_use]
    pub fn deduce(
        &self,
        explicit_args: &[TemplateArgument],
        input_types: &[Type],
        ts: &TypeSystem,
    ) -> TemplateArgumentDeduction {
        TemplateArgumentDeduction::process(self.parameters(), explicit_args, self.patterns(), input_types, ts)
    }

    /// Returns the cached instance for `args` or invokes the backend.
    /// The produced function records `instance_of` and its arguments.
    pub fn get_instance(&self, engine: &Engine, args: &[TemplateArgument]) -> EngineResult<Function> {
        if let Some(existing) = self.0.instances.borrow().get(args) {
            return Ok(existing.clone());
        }

        let backend = self
            .0
            .backend
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::template_instantiation_error(self.name(), "no instantiation backend"))?;
        let f = backend(engine, self, args)?;
        f.set_template_instance_info(TemplateInstanceInfo {
            template: self.clone(),
            arguments: args.to_vec(),
        });
        self.0.instances.borrow_mut().insert(args.to_vec(), f.clone());
        Ok(f)
    }
}

impl PartialEq for FunctionTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for FunctionTemplate {}

impl fmt::Debug for FunctionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FunctionTemplate({name}<{n} params>)",
            name = self.name(),
            n = self.parameters().len()
        )
    }
}

/// One recorded deduction: parameter index and deduced value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub param_index: usize,
    pub value: TemplateArgument,
}

/// The result of walking `(pattern, input)` pairs and agglomerating the
/// recorded deductions.
///
/// A walk over patterns containing no parameter references succeeds with
/// zero deductions; partial-specialization selection relies on this.
#[derive(Debug, Clone)]
pub struct TemplateArgumentDeduction {
    success: bool,
    deductions: Vec<Deduction>,
    result: Vec<TemplateArgument>,
}

impl TemplateArgumentDeduction {
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn failure(&self) -> bool {
        !self.success
    }

    #[must_use]
    pub fn deductions(&self) -> &[Deduction] {
        &self.deductions
    }

    /// The full argument vector: explicit arguments plus the deductions
    /// written back.
    #[must_use]
    pub fn arguments(&self) -> &[TemplateArgument] {
        &self.result
    }

    fn failed() -> Self {
        Self {
            success: false,
            deductions: Vec::new(),
            result: Vec::new(),
        }
    }

    /// Walks `(pattern, input)` pairs, records deductions for named
    /// parameters, then agglomerates: multiple deductions of one
    /// parameter must agree, and every parameter not covered by an
    /// explicit argument or a default must have been deduced.
    #[must_use]
    pub fn process(
        parameters: &[TemplateParameter],
        explicit_args: &[TemplateArgument],
        patterns: &[TemplatePattern],
        inputs: &[Type],
        ts: &TypeSystem,
    ) -> Self {
        let mut deductions = Vec::new();
        for (pattern, input) in patterns.iter().zip(inputs.iter()) {
            // A bare parameter pattern deduces against the decayed type.
            let input = match pattern {
                TemplatePattern::Param(_) => input.without_ref().without_const(),
                _ => *input,
            };
            if !deduce_type(pattern, input, ts, &mut deductions) {
                return Self::failed();
            }
        }
        Self::agglomerate(parameters, explicit_args, deductions)
    }

    fn agglomerate(
        parameters: &[TemplateParameter],
        explicit_args: &[TemplateArgument],
        deductions: Vec<Deduction>,
    ) -> Self {
        // All deductions of the same parameter must be equal; an explicit
        // argument pins the value.
        let mut chosen: Vec<Option<TemplateArgument>> = vec![None; parameters.len()];
        for (i, arg) in explicit_args.iter().enumerate() {
            if i >= chosen.len() {
                return Self::failed();
            }
            chosen[i] = Some(arg.clone());
        }
        for d in &deductions {
            if d.param_index >= chosen.len() {
                return Self::failed();
            }
            match &chosen[d.param_index] {
                Some(existing) if *existing != d.value => return Self::failed(),
                Some(_) => {}
                None => chosen[d.param_index] = Some(d.value.clone()),
            }
        }

        let mut result = Vec::with_capacity(parameters.len());
        for (param, slot) in parameters.iter().zip(chosen.into_iter()) {
            match slot.or_else(|| param.default.clone()) {
                Some(arg) => result.push(arg),
                None => return Self::failed(),
            }
        }

        Self {
            success: true,
            deductions,
            result,
        }
    }
}

/// Structural deduction of a type against a pattern.
fn deduce_type(pattern: &TemplatePattern, input: Type, ts: &TypeSystem, out: &mut Vec<Deduction>) -> bool {
    match pattern {
        TemplatePattern::Param(index) => {
            out.push(Deduction {
                param_index: *index,
                value: TemplateArgument::Type(input),
            });
            true
        }
        TemplatePattern::Concrete(t) => t.base() == input.base(),
        TemplatePattern::Const(inner) => {
            // Binding may add const; peel it when present.
            deduce_type(inner, input.without_const(), ts, out)
        }
        TemplatePattern::Ref(inner) | TemplatePattern::RRef(inner) => deduce_type(inner, input.without_ref(), ts, out),
        TemplatePattern::Function { ret, params } => {
            let Some(ft) = ts.get_function_type(input.base()) else {
                return false;
            };
            let proto = ft.prototype().clone();
            if proto.count() != params.len() {
                return false;
            }
            if !deduce_type(ret, proto.return_type(), ts, out) {
                return false;
            }
            params
                .iter()
                .zip(proto.parameters().iter())
                .all(|(p, t)| deduce_type(p, *t, ts, out))
        }
        TemplatePattern::TemplateId { template, args } => {
            let Some(class) = ts.get_class(input.base()) else {
                return false;
            };
            let Some(info) = class.template_instance_info() else {
                return false;
            };
            if !info.template.same_as(template) || info.arguments.len() != args.len() {
                return false;
            }
            args.iter()
                .zip(info.arguments.iter())
                .all(|(p, a)| deduce_argument(p, a, ts, out))
        }
        TemplatePattern::Arg(_) => false,
    }
}

/// Structural deduction of a template argument against a pattern.
fn deduce_argument(pattern: &TemplatePattern, arg: &TemplateArgument, ts: &TypeSystem, out: &mut Vec<Deduction>) -> bool {
    match (pattern, arg) {
        (TemplatePattern::Param(index), _) => {
            out.push(Deduction {
                param_index: *index,
                value: arg.clone(),
            });
            true
        }
        (TemplatePattern::Arg(pinned), _) => pinned == arg,
        (_, TemplateArgument::Type(t)) => deduce_type(pattern, *t, ts, out),
        _ => false,
    }
}

/// Deduces a specialization's patterns against a concrete argument list.
#[must_use]
pub fn deduce_from_arguments(
    patterns: &[TemplatePattern],
    args: &[TemplateArgument],
    ts: &TypeSystem,
) -> TemplateArgumentDeduction {
    if patterns.len() != args.len() {
        return TemplateArgumentDeduction::failed();
    }
    let mut deductions = Vec::new();
    for (pattern, arg) in patterns.iter().zip(args.iter()) {
        let arg = match (pattern, arg) {
            (TemplatePattern::Param(_), TemplateArgument::Type(t)) => {
                TemplateArgument::Type(t.without_ref().without_const())
            }
            _ => arg.clone(),
        };
        if !deduce_argument(pattern, &arg, ts, &mut deductions) {
            return TemplateArgumentDeduction::failed();
        }
    }
    // Specialization parameters are anonymous here: consistency only.
    let mut seen: AHashMap<usize, TemplateArgument> = AHashMap::new();
    for d in &deductions {
        match seen.get(&d.param_index) {
            Some(existing) if *existing != d.value => return TemplateArgumentDeduction::failed(),
            Some(_) => {}
            None => {
                seen.insert(d.param_index, d.value.clone());
            }
        }
    }
    TemplateArgumentDeduction {
        success: true,
        result: Vec::new(),
        deductions,
    }
}

/// Tries to match pattern `sketch` (whose `Param`s are free) against
/// `input`, another pattern treated as fixed. Records bindings and
/// requires consistency.
fn match_pattern(sketch: &TemplatePattern, input: &TemplatePattern, bindings: &mut AHashMap<usize, TemplatePattern>) -> bool {
    match (sketch, input) {
        (TemplatePattern::Param(i), _) => match bindings.get(i) {
            Some(bound) => bound == input,
            None => {
                bindings.insert(*i, input.clone());
                true
            }
        },
        (TemplatePattern::Concrete(a), TemplatePattern::Concrete(b)) => a.base() == b.base(),
        (TemplatePattern::Arg(a), TemplatePattern::Arg(b)) => a == b,
        (TemplatePattern::Const(a), TemplatePattern::Const(b)) => match_pattern(a, b, bindings),
        (TemplatePattern::Const(a), _) => match_pattern(a, input, bindings),
        (TemplatePattern::Ref(a), TemplatePattern::Ref(b)) => match_pattern(a, b, bindings),
        (TemplatePattern::RRef(a), TemplatePattern::RRef(b)) => match_pattern(a, b, bindings),
        (
            TemplatePattern::Function { ret: ra, params: pa },
            TemplatePattern::Function { ret: rb, params: pb },
        ) => {
            pa.len() == pb.len()
                && match_pattern(ra, rb, bindings)
                && pa.iter().zip(pb.iter()).all(|(a, b)| match_pattern(a, b, bindings))
        }
        (
            TemplatePattern::TemplateId { template: ta, args: aa },
            TemplatePattern::TemplateId { template: tb, args: ab },
        ) => {
            ta.same_as(tb)
                && aa.len() == ab.len()
                && aa.iter().zip(ab.iter()).all(|(a, b)| match_pattern(a, b, bindings))
        }
        _ => false,
    }
}

/// Whether template `general` can deduce its parameters from the
/// patterns of `specific` taken as inputs.
fn deduces_from(general: &[TemplatePattern], specific: &[TemplatePattern]) -> bool {
    if general.len() != specific.len() {
        return false;
    }
    let mut bindings = AHashMap::new();
    general
        .iter()
        .zip(specific.iter())
        .all(|(g, s)| match_pattern(g, s, &mut bindings))
}

/// The standard two-direction comparison: the template that deduces in
/// only one direction is the more general one.
#[must_use]
pub fn partial_ordering(first: &[TemplatePattern], second: &[TemplatePattern]) -> TemplatePartialOrdering {
    let second_is_general = deduces_from(second, first);
    let first_is_general = deduces_from(first, second);
    match (second_is_general, first_is_general) {
        (true, true) => TemplatePartialOrdering::Indistinguishable,
        (true, false) => TemplatePartialOrdering::FirstMoreSpecialized,
        (false, true) => TemplatePartialOrdering::SecondMoreSpecialized,
        (false, false) => TemplatePartialOrdering::NotComparable,
    }
}

/// Selects among function-template candidates for a call: deduce each
/// independently, discard failures, then pick the unique most-specialized
/// survivor.
#[must_use]
pub fn select_function_template(
    candidates: &[FunctionTemplate],
    explicit_args: &[TemplateArgument],
    input_types: &[Type],
    ts: &TypeSystem,
) -> Option<(FunctionTemplate, Vec<TemplateArgument>)> {
    let mut survivors: Vec<(usize, &FunctionTemplate, Vec<TemplateArgument>)> = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let deduction = candidate.deduce(explicit_args, input_types, ts);
        if deduction.success() {
            survivors.push((i, candidate, deduction.arguments().to_vec()));
        }
    }

    match survivors.len() {
        0 => None,
        1 => {
            let (_, t, args) = survivors.pop()?;
            Some((t.clone(), args))
        }
        _ => {
            let mut best = 0;
            for i in 1..survivors.len() {
                if matches!(
                    partial_ordering(survivors[i].1.patterns(), survivors[best].1.patterns()),
                    TemplatePartialOrdering::FirstMoreSpecialized
                ) {
                    best = i;
                }
            }
            let unique = (0..survivors.len()).all(|i| {
                i == best
                    || matches!(
                        partial_ordering(survivors[best].1.patterns(), survivors[i].1.patterns()),
                        TemplatePartialOrdering::FirstMoreSpecialized
                    )
            });
            if !unique {
                return None;
            }
            let (_, t, args) = survivors.swap_remove(best);
            Some((t.clone(), args))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n: usize) -> Vec<TemplateParameter> {
        (0..n).map(|i| TemplateParameter::type_param(format!("T{i}"))).collect()
    }

    #[test]
    fn plain_parameter_deduces_decayed_type() {
        let ts = TypeSystem::new();
        let deduction = TemplateArgumentDeduction::process(
            &params(1),
            &[],
            &[TemplatePattern::param(0)],
            &[Type::const_reference(Type::INT)],
            &ts,
        );
        assert!(deduction.success());
        assert_eq!(deduction.arguments(), &[TemplateArgument::Type(Type::INT)]);
    }

    #[test]
    fn conflicting_deductions_fail() {
        let ts = TypeSystem::new();
        let deduction = TemplateArgumentDeduction::process(
            &params(1),
            &[],
            &[TemplatePattern::param(0), TemplatePattern::param(0)],
            &[Type::INT, Type::DOUBLE],
            &ts,
        );
        assert!(deduction.failure());
    }

    #[test]
    fn explicit_argument_pins_the_value() {
        let ts = TypeSystem::new();
        let deduction = TemplateArgumentDeduction::process(
            &params(1),
            &[TemplateArgument::Type(Type::DOUBLE)],
            &[TemplatePattern::param(0)],
            &[Type::INT],
            &ts,
        );
        assert!(deduction.failure());

        let deduction = TemplateArgumentDeduction::process(
            &params(1),
            &[TemplateArgument::Type(Type::INT)],
            &[TemplatePattern::param(0)],
            &[Type::INT],
            &ts,
        );
        assert!(deduction.success());
    }

    #[test]
    fn grounded_pattern_succeeds_with_zero_deductions() {
        let ts = TypeSystem::new();
        let deduction = TemplateArgumentDeduction::process(
            &params(0),
            &[],
            &[TemplatePattern::concrete(Type::INT)],
            &[Type::INT],
            &ts,
        );
        assert!(deduction.success());
        assert!(deduction.deductions().is_empty());
    }

    #[test]
    fn partial_ordering_prefers_repeated_parameter() {
        // <T, T> vs <T, U>
        let tt = vec![TemplatePattern::param(0), TemplatePattern::param(0)];
        let tu = vec![TemplatePattern::param(0), TemplatePattern::param(1)];
        assert_eq!(partial_ordering(&tt, &tu), TemplatePartialOrdering::FirstMoreSpecialized);
        assert_eq!(partial_ordering(&tu, &tt), TemplatePartialOrdering::SecondMoreSpecialized);
        assert_eq!(partial_ordering(&tt, &tt), TemplatePartialOrdering::Indistinguishable);
    }

    #[test]
    fn partial_ordering_prefers_structured_patterns() {
        let array = ClassTemplate::new("Array", params(1));
        // <Array<T>, U> vs <T, U>
        let structured = vec![
            TemplatePattern::template_id(array, vec![TemplatePattern::param(0)]),
            TemplatePattern::param(1),
        ];
        let plain = vec![TemplatePattern::param(0), TemplatePattern::param(1)];
        assert_eq!(
            partial_ordering(&structured, &plain),
            TemplatePartialOrdering::FirstMoreSpecialized
        );
        // <T, U(T)> vs <T, U>
        let fn_pattern = vec![
            TemplatePattern::param(0),
            TemplatePattern::function(TemplatePattern::param(1), vec![TemplatePattern::param(0)]),
        ];
        assert_eq!(
            partial_ordering(&fn_pattern, &plain),
            TemplatePartialOrdering::FirstMoreSpecialized
        );
    }
}
