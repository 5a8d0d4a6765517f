use std::fmt;

use crate::{
    class::{Class, WeakClass},
    namespace::{Namespace, WeakNamespace},
    operators::OperatorId,
    types::Type,
};

/// What a symbol is, without looking at its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SymbolKind {
    Namespace,
    Class,
    Function,
    Enum,
    Template,
    Typedef,
}

/// The name of an entity declared in script or registered by the host.
///
/// Most symbols have plain string names; operators, conversion functions
/// and literal operators are identified by their operator id, target type
/// and suffix respectively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    String(String),
    Operator(OperatorId),
    Cast(Type),
    LiteralOperator(String),
}

impl Name {
    /// The plain string of the name, if it has one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::LiteralOperator(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn operator_id(&self) -> Option<OperatorId> {
        match self {
            Self::Operator(op) => Some(*op),
            _ => None,
        }
    }

    #[must_use]
    pub fn cast_target(&self) -> Option<Type> {
        match self {
            Self::Cast(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Operator(op) => write!(f, "operator{sym}", sym = op.symbol()),
            Self::Cast(t) => write!(f, "operator {t}"),
            Self::LiteralOperator(suffix) => write!(f, "operator\"\"{suffix}"),
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<OperatorId> for Name {
    fn from(op: OperatorId) -> Self {
        Self::Operator(op)
    }
}

/// A symbol that can enclose other symbols.
#[derive(Clone)]
pub enum Symbol {
    Namespace(Namespace),
    Class(Class),
}

impl Symbol {
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match self {
            Self::Namespace(_) => SymbolKind::Namespace,
            Self::Class(_) => SymbolKind::Class,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Namespace(ns) => ns.name().to_owned(),
            Self::Class(c) => c.name().to_owned(),
        }
    }

    #[must_use]
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Self::Class(c) => Some(c),
            Self::Namespace(_) => None,
        }
    }

    #[must_use]
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Self::Namespace(ns) => Some(ns),
            Self::Class(_) => None,
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace(ns) => write!(f, "Symbol::Namespace({name})", name = ns.name()),
            Self::Class(c) => write!(f, "Symbol::Class({name})", name = c.name()),
        }
    }
}

/// A weak back-pointer to the symbol enclosing another symbol.
///
/// Children are held by strong handles in their parent's lists; the
/// back-pointer must be weak to avoid ownership cycles. It is resolved
/// lazily during lookup, returning `None` once the parent is gone.
#[derive(Clone, Default)]
pub enum EnclosingSymbol {
    #[default]
    None,
    Namespace(WeakNamespace),
    Class(WeakClass),
}

impl EnclosingSymbol {
    #[must_use]
    pub fn resolve(&self) -> Option<Symbol> {
        match self {
            Self::None => None,
            Self::Namespace(weak) => weak.upgrade().map(Symbol::Namespace),
            Self::Class(weak) => weak.upgrade().map(Symbol::Class),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<&Symbol> for EnclosingSymbol {
    fn from(symbol: &Symbol) -> Self {
        match symbol {
            Symbol::Namespace(ns) => Self::Namespace(ns.downgrade()),
            Symbol::Class(c) => Self::Class(c.downgrade()),
        }
    }
}

impl From<&Namespace> for EnclosingSymbol {
    fn from(ns: &Namespace) -> Self {
        Self::Namespace(ns.downgrade())
    }
}

impl From<&Class> for EnclosingSymbol {
    fn from(c: &Class) -> Self {
        Self::Class(c.downgrade())
    }
}
