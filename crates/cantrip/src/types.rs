use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::AccessSpecifier;

/// The category of a base type, derived from the category bits of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Fundamental,
    Object,
    Enum,
    Closure,
    FunctionType,
}

/// A 32-bit type tag.
///
/// The low 16 bits are an index into one of the type system's per-kind
/// tables (selected by the category bits); the upper bits carry category
/// and qualification flags.
///
/// `Type` is plain data: it can be freely copied, compared and hashed.
/// Qualification operations (`with_const`, `without_ref`, …) return new
/// tags and never mutate in place.
///
/// NOTE: `is_reference()` returns true for forwarding references as well;
/// a forwarding reference binds like a reference everywhere the conversion
/// engine and the interpreter care about reference-ness.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Type(u32);

impl Type {
    // Category flags.
    pub const ENUM_FLAG: u32 = 0x0001_0000;
    pub const OBJECT_FLAG: u32 = 0x0002_0000;
    pub const CLOSURE_FLAG: u32 = 0x0004_0000;
    pub const FUNCTION_TYPE_FLAG: u32 = 0x0008_0000;

    // Qualification flags.
    pub const REFERENCE_FLAG: u32 = 0x0010_0000;
    pub const CONST_FLAG: u32 = 0x0020_0000;
    pub const FORWARDING_REFERENCE_FLAG: u32 = 0x0040_0000;
    /// Marks the implicit object parameter of a member function.
    pub const THIS_FLAG: u32 = 0x0080_0000;

    // Access bits, used for data members.
    pub const PROTECTED_FLAG: u32 = 0x0400_0000;
    pub const PRIVATE_FLAG: u32 = 0x0800_0000;

    const CATEGORY_MASK: u32 = Self::ENUM_FLAG | Self::OBJECT_FLAG | Self::CLOSURE_FLAG | Self::FUNCTION_TYPE_FLAG;
    const INDEX_MASK: u32 = 0xFFFF;

    // Fundamental base types.
    pub const NULL: Type = Type(0);
    pub const VOID: Type = Type(1);
    pub const BOOL: Type = Type(2);
    pub const CHAR: Type = Type(3);
    pub const INT: Type = Type(4);
    pub const FLOAT: Type = Type(5);
    pub const DOUBLE: Type = Type(6);
    /// Marker for brace-initializer temporaries.
    pub const INITIALIZER_LIST: Type = Type(8);
    /// Placeholder used before deduction.
    pub const AUTO: Type = Type(9);

    /// The built-in `String` class occupies the first class slot.
    pub const STRING: Type = Type(Self::OBJECT_FLAG | 1);

    #[must_use]
    pub const fn new(data: u32) -> Self {
        Self(data)
    }

    /// Builds the id of the class registered at 1-based `index`.
    #[must_use]
    pub const fn object(index: u32) -> Self {
        Self(Self::OBJECT_FLAG | (index & Self::INDEX_MASK))
    }

    /// Builds the id of the enum registered at 1-based `index`.
    #[must_use]
    pub const fn enumeration(index: u32) -> Self {
        Self(Self::ENUM_FLAG | (index & Self::INDEX_MASK))
    }

    /// Builds the id of the closure type registered at 1-based `index`.
    #[must_use]
    pub const fn closure(index: u32) -> Self {
        Self(Self::CLOSURE_FLAG | (index & Self::INDEX_MASK))
    }

    /// Builds the id of the function type registered at 1-based `index`.
    #[must_use]
    pub const fn function_type(index: u32) -> Self {
        Self(Self::FUNCTION_TYPE_FLAG | (index & Self::INDEX_MASK))
    }

    /// The raw tag value.
    #[must_use]
    pub const fn data(self) -> u32 {
        self.0
    }

    /// The 1-based slot index within the kind's table.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Strips qualifications and access bits, keeping the category and index.
    #[must_use]
    pub const fn base(self) -> Self {
        Self(self.0 & (Self::CATEGORY_MASK | Self::INDEX_MASK))
    }

    #[must_use]
    pub const fn is_const(self) -> bool {
        self.0 & Self::CONST_FLAG != 0
    }

    #[must_use]
    pub const fn with_const(self) -> Self {
        Self(self.0 | Self::CONST_FLAG)
    }

    #[must_use]
    pub const fn without_const(self) -> Self {
        Self(self.0 & !Self::CONST_FLAG)
    }

    /// True for plain references and forwarding references alike.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        self.0 & (Self::REFERENCE_FLAG | Self::FORWARDING_REFERENCE_FLAG) != 0
    }

    #[must_use]
    pub const fn is_forwarding_reference(self) -> bool {
        self.0 & Self::FORWARDING_REFERENCE_FLAG != 0
    }

    #[must_use]
    pub const fn is_const_ref(self) -> bool {
        self.is_const() && self.is_reference()
    }

    #[must_use]
    pub const fn without_ref(self) -> Self {
        Self(self.0 & !(Self::REFERENCE_FLAG | Self::FORWARDING_REFERENCE_FLAG))
    }

    /// `T&`
    #[must_use]
    pub const fn reference(base: Self) -> Self {
        Self(base.0 | Self::REFERENCE_FLAG)
    }

    /// `const T&`
    #[must_use]
    pub const fn const_reference(base: Self) -> Self {
        Self(base.0 | Self::REFERENCE_FLAG | Self::CONST_FLAG)
    }

    /// `T&&`
    #[must_use]
    pub const fn forwarding_reference(base: Self) -> Self {
        Self(base.0 | Self::FORWARDING_REFERENCE_FLAG)
    }

    #[must_use]
    pub const fn test_flag(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    #[must_use]
    pub const fn with_flag(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    #[must_use]
    pub const fn without_flag(self, flag: u32) -> Self {
        Self(self.0 & !flag)
    }

    #[must_use]
    pub const fn is_fundamental(self) -> bool {
        self.0 & Self::CATEGORY_MASK == 0 && (self.0 & Self::INDEX_MASK) >= 1 && (self.0 & Self::INDEX_MASK) <= 6
    }

    #[must_use]
    pub const fn is_object(self) -> bool {
        self.0 & Self::OBJECT_FLAG != 0
    }

    #[must_use]
    pub const fn is_enum(self) -> bool {
        self.0 & Self::ENUM_FLAG != 0
    }

    #[must_use]
    pub const fn is_closure(self) -> bool {
        self.0 & Self::CLOSURE_FLAG != 0
    }

    #[must_use]
    pub const fn is_function_type(self) -> bool {
        self.0 & Self::FUNCTION_TYPE_FLAG != 0
    }

    #[must_use]
    pub const fn is_initializer_list(self) -> bool {
        self.base().0 == Self::INITIALIZER_LIST.0
    }

    #[must_use]
    pub fn kind(self) -> TypeKind {
        match self.0 & Self::CATEGORY_MASK {
            Self::OBJECT_FLAG => TypeKind::Object,
            Self::ENUM_FLAG => TypeKind::Enum,
            Self::CLOSURE_FLAG => TypeKind::Closure,
            Self::FUNCTION_TYPE_FLAG => TypeKind::FunctionType,
            _ => TypeKind::Fundamental,
        }
    }

    /// Access level encoded in the tag's access bits (used by data members).
    #[must_use]
    pub fn access_specifier(self) -> AccessSpecifier {
        if self.test_flag(Self::PRIVATE_FLAG) {
            AccessSpecifier::Private
        } else if self.test_flag(Self::PROTECTED_FLAG) {
            AccessSpecifier::Protected
        } else {
            AccessSpecifier::Public
        }
    }

    #[must_use]
    pub fn with_access(self, access: AccessSpecifier) -> Self {
        let cleared = self.0 & !(Self::PROTECTED_FLAG | Self::PRIVATE_FLAG);
        match access {
            AccessSpecifier::Public => Self(cleared),
            AccessSpecifier::Protected => Self(cleared | Self::PROTECTED_FLAG),
            AccessSpecifier::Private => Self(cleared | Self::PRIVATE_FLAG),
        }
    }

    /// Marks the tag as the implicit object parameter of a member function.
    #[must_use]
    pub const fn with_this_flag(self) -> Self {
        Self(self.0 | Self::THIS_FLAG)
    }

    #[must_use]
    pub const fn is_this(self) -> bool {
        self.test_flag(Self::THIS_FLAG)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            TypeKind::Fundamental => match self.base() {
                Self::NULL => "null",
                Self::VOID => "void",
                Self::BOOL => "bool",
                Self::CHAR => "char",
                Self::INT => "int",
                Self::FLOAT => "float",
                Self::DOUBLE => "double",
                Self::INITIALIZER_LIST => "initializer-list",
                Self::AUTO => "auto",
                _ => "fundamental",
            },
            TypeKind::Object => "class",
            TypeKind::Enum => "enum",
            TypeKind::Closure => "closure",
            TypeKind::FunctionType => "function-type",
        };
        write!(f, "Type({kind}#{index}", index = self.index())?;
        if self.is_const() {
            write!(f, " const")?;
        }
        if self.is_forwarding_reference() {
            write!(f, " &&")?;
        } else if self.is_reference() {
            write!(f, " &")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualification_round_trip() {
        let t = Type::const_reference(Type::INT);
        assert!(t.is_const());
        assert!(t.is_reference());
        assert!(t.is_const_ref());
        assert_eq!(t.base(), Type::INT);
        assert_eq!(t.without_ref().without_const(), Type::INT);
    }

    #[test]
    fn forwarding_reference_counts_as_reference() {
        let t = Type::forwarding_reference(Type::DOUBLE);
        assert!(t.is_reference());
        assert!(t.is_forwarding_reference());
        assert!(!Type::reference(Type::DOUBLE).is_forwarding_reference());
    }

    #[test]
    fn categories() {
        assert!(Type::INT.is_fundamental());
        assert!(!Type::VOID.is_object());
        assert!(Type::STRING.is_object());
        assert_eq!(Type::STRING.index(), 1);
        assert_eq!(Type::enumeration(3).kind(), TypeKind::Enum);
        assert_eq!(Type::closure(1).kind(), TypeKind::Closure);
        assert_eq!(Type::function_type(2).kind(), TypeKind::FunctionType);
    }

    #[test]
    fn access_bits() {
        let t = Type::INT.with_access(AccessSpecifier::Private);
        assert_eq!(t.access_specifier(), AccessSpecifier::Private);
        assert_eq!(t.base(), Type::INT);
        let t = t.with_access(AccessSpecifier::Protected);
        assert_eq!(t.access_specifier(), AccessSpecifier::Protected);
    }
}
