use std::rc::Rc;

use ahash::AHashMap;

use crate::{class::Class, function::Function, ir::Expr};

/// An attribute attached to a declaration via `[[ ... ]]`.
///
/// Attributes are opaque to the core; hosts inspect their raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub text: String,
}

impl Attribute {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Stable key for side tables: the identity of the symbol's shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolKey(usize);

impl From<&Function> for SymbolKey {
    fn from(f: &Function) -> Self {
        Self(Rc::as_ptr(&f.0) as usize)
    }
}

impl From<&Class> for SymbolKey {
    fn from(c: &Class) -> Self {
        Self(Rc::as_ptr(&c.0) as usize)
    }
}

/// Side table mapping symbols to their attribute lists.
///
/// Symbols do not carry attributes directly; the compiler records them
/// here and hosts query by symbol.
#[derive(Default)]
pub struct AttributesMap {
    map: AHashMap<SymbolKey, Vec<Attribute>>,
}

impl AttributesMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<SymbolKey>, attributes: Vec<Attribute>) {
        self.map.entry(key.into()).or_default().extend(attributes);
    }

    /// The attributes recorded for `key`, as a borrowed range view.
    #[must_use]
    pub fn attributes_of(&self, key: impl Into<SymbolKey>) -> &[Attribute] {
        self.map.get(&key.into()).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Side table mapping functions to extra default-argument expressions.
///
/// Like the per-function storage, lists are reversed: index 0 is the
/// default for the last parameter.
#[derive(Default)]
pub struct DefaultArgumentsMap {
    map: AHashMap<SymbolKey, Vec<Rc<Expr>>>,
}

impl DefaultArgumentsMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, f: &Function, reversed: Vec<Rc<Expr>>) {
        self.map.insert(SymbolKey::from(f), reversed);
    }

    #[must_use]
    pub fn defaults_of(&self, f: &Function) -> &[Rc<Expr>] {
        self.map.get(&SymbolKey::from(f)).map_or(&[], Vec::as_slice)
    }
}
