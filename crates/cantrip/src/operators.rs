use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Associativity of an operator precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Associativity {
    LeftToRight,
    RightToLeft,
}

/// Number of operands an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorArity {
    Unary,
    Binary,
    Ternary,
    /// The function-call operator accepts any number of operands.
    Variadic,
}

/// Names of the operators of the source language, one variant per
/// overloadable operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum OperatorId {
    ScopeResolution,
    PostIncrement,
    PostDecrement,
    FunctionCall,
    Subscript,
    MemberAccess,
    PreIncrement,
    PreDecrement,
    UnaryPlus,
    UnaryMinus,
    LogicalNot,
    BitwiseNot,
    Multiplication,
    Division,
    Remainder,
    Addition,
    Subtraction,
    LeftShift,
    RightShift,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    Inequal,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    Conditional,
    Assignment,
    MultiplicationAssignment,
    DivisionAssignment,
    RemainderAssignment,
    AdditionAssignment,
    SubtractionAssignment,
    LeftShiftAssignment,
    RightShiftAssignment,
    BitwiseAndAssignment,
    BitwiseOrAssignment,
    BitwiseXorAssignment,
    Comma,
}

impl OperatorId {
    /// The number of operands the operator's prototype must accept
    /// (the implicit object parameter counts as an operand).
    #[must_use]
    pub fn arity(self) -> OperatorArity {
        match self {
            Self::PostIncrement
            | Self::PostDecrement
            | Self::PreIncrement
            | Self::PreDecrement
            | Self::UnaryPlus
            | Self::UnaryMinus
            | Self::LogicalNot
            | Self::BitwiseNot => OperatorArity::Unary,
            Self::Conditional => OperatorArity::Ternary,
            Self::FunctionCall => OperatorArity::Variadic,
            _ => OperatorArity::Binary,
        }
    }

    /// Operators that may only be declared as class members.
    #[must_use]
    pub fn is_member_only(self) -> bool {
        matches!(
            self,
            Self::Assignment | Self::FunctionCall | Self::Subscript | Self::MemberAccess
        )
    }

    /// The operator's spelling in source code, e.g. `"+="`.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::ScopeResolution => "::",
            Self::PostIncrement | Self::PreIncrement => "++",
            Self::PostDecrement | Self::PreDecrement => "--",
            Self::FunctionCall => "()",
            Self::Subscript => "[]",
            Self::MemberAccess => ".",
            Self::UnaryPlus | Self::Addition => "+",
            Self::UnaryMinus | Self::Subtraction => "-",
            Self::LogicalNot => "!",
            Self::BitwiseNot => "~",
            Self::Multiplication => "*",
            Self::Division => "/",
            Self::Remainder => "%",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::Inequal => "!=",
            Self::BitwiseAnd => "&",
            Self::BitwiseXor => "^",
            Self::BitwiseOr => "|",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Conditional => "?:",
            Self::Assignment => "=",
            Self::MultiplicationAssignment => "*=",
            Self::DivisionAssignment => "/=",
            Self::RemainderAssignment => "%=",
            Self::AdditionAssignment => "+=",
            Self::SubtractionAssignment => "-=",
            Self::LeftShiftAssignment => "<<=",
            Self::RightShiftAssignment => ">>=",
            Self::BitwiseAndAssignment => "&=",
            Self::BitwiseOrAssignment => "|=",
            Self::BitwiseXorAssignment => "^=",
            Self::Comma => ",",
        }
    }

    /// Precedence group, 1 (tightest) to 15.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::ScopeResolution => 1,
            Self::PostIncrement | Self::PostDecrement | Self::FunctionCall | Self::Subscript | Self::MemberAccess => 2,
            Self::PreIncrement
            | Self::PreDecrement
            | Self::UnaryPlus
            | Self::UnaryMinus
            | Self::LogicalNot
            | Self::BitwiseNot => 3,
            Self::Multiplication | Self::Division | Self::Remainder => 4,
            Self::Addition | Self::Subtraction => 5,
            Self::LeftShift | Self::RightShift => 6,
            Self::Less | Self::Greater | Self::LessEqual | Self::GreaterEqual => 7,
            Self::Equal | Self::Inequal => 8,
            Self::BitwiseAnd => 9,
            Self::BitwiseXor => 10,
            Self::BitwiseOr => 11,
            Self::LogicalAnd => 12,
            Self::LogicalOr => 13,
            Self::Conditional
            | Self::Assignment
            | Self::MultiplicationAssignment
            | Self::DivisionAssignment
            | Self::RemainderAssignment
            | Self::AdditionAssignment
            | Self::SubtractionAssignment
            | Self::LeftShiftAssignment
            | Self::RightShiftAssignment
            | Self::BitwiseAndAssignment
            | Self::BitwiseOrAssignment
            | Self::BitwiseXorAssignment => 14,
            Self::Comma => 15,
        }
    }

    /// Associativity of the operator's precedence group.
    #[must_use]
    pub fn associativity(self) -> Associativity {
        match self.precedence() {
            3 | 14 => Associativity::RightToLeft,
            _ => Associativity::LeftToRight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_classification() {
        assert_eq!(OperatorId::LogicalNot.arity(), OperatorArity::Unary);
        assert_eq!(OperatorId::Addition.arity(), OperatorArity::Binary);
        assert_eq!(OperatorId::Conditional.arity(), OperatorArity::Ternary);
        assert_eq!(OperatorId::FunctionCall.arity(), OperatorArity::Variadic);
    }

    #[test]
    fn member_only_operators() {
        assert!(OperatorId::Assignment.is_member_only());
        assert!(OperatorId::Subscript.is_member_only());
        assert!(!OperatorId::Addition.is_member_only());
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(OperatorId::Assignment.associativity(), Associativity::RightToLeft);
        assert_eq!(OperatorId::Addition.associativity(), Associativity::LeftToRight);
    }
}
