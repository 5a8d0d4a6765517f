use std::fmt;

use smallvec::SmallVec;

use crate::types::Type;

/// The typed signature of a function: a return type plus an ordered
/// sequence of parameter types.
///
/// For non-static member functions, parameter 0 is the implicit object
/// parameter and carries [`Type::THIS_FLAG`].
///
/// Equality is return-type equality plus elementwise parameter equality.
#[derive(Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Prototype {
    return_type: Type,
    parameters: SmallVec<[Type; 4]>,
}

impl Prototype {
    #[must_use]
    pub fn new(return_type: Type) -> Self {
        Self {
            return_type,
            parameters: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_params(return_type: Type, params: impl IntoIterator<Item = Type>) -> Self {
        Self {
            return_type,
            parameters: params.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn return_type(&self) -> Type {
        self.return_type
    }

    pub fn set_return_type(&mut self, ty: Type) {
        self.return_type = ty;
    }

    /// Number of parameters (the implicit object parameter included).
    #[must_use]
    pub fn count(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// The parameter at `index`; panics if out of bounds, like slice indexing.
    #[must_use]
    pub fn at(&self, index: usize) -> Type {
        self.parameters[index]
    }

    #[must_use]
    pub fn parameter(&self, index: usize) -> Option<Type> {
        self.parameters.get(index).copied()
    }

    #[must_use]
    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn push(&mut self, ty: Type) {
        self.parameters.push(ty);
    }

    pub fn pop(&mut self) -> Option<Type> {
        self.parameters.pop()
    }

    pub fn set(&mut self, index: usize, ty: Type) {
        self.parameters[index] = ty;
    }

    /// Inserts a parameter at the front (used when adding the implicit
    /// object parameter to a member function).
    pub fn insert_front(&mut self, ty: Type) {
        self.parameters.insert(0, ty);
    }

    /// Removes the parameter at the front (used by `set_static`).
    pub fn remove_front(&mut self) {
        if !self.parameters.is_empty() {
            self.parameters.remove(0);
        }
    }

    pub fn clear(&mut self) {
        self.parameters.clear();
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ret:?}(", ret = self.return_type)?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_elementwise() {
        let a = Prototype::with_params(Type::INT, [Type::INT, Type::DOUBLE]);
        let b = Prototype::with_params(Type::INT, [Type::INT, Type::DOUBLE]);
        let c = Prototype::with_params(Type::INT, [Type::DOUBLE, Type::INT]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Prototype::with_params(Type::VOID, [Type::INT, Type::DOUBLE]));
    }

    #[test]
    fn mutators() {
        let mut p = Prototype::new(Type::VOID);
        p.push(Type::INT);
        p.push(Type::BOOL);
        assert_eq!(p.count(), 2);
        p.set(1, Type::CHAR);
        assert_eq!(p.at(1), Type::CHAR);
        p.insert_front(Type::const_reference(Type::STRING));
        assert_eq!(p.count(), 3);
        p.remove_front();
        assert_eq!(p.at(0), Type::INT);
        p.pop();
        p.clear();
        assert!(p.is_empty());
    }
}
