//! Error handling for kplc
//!
//! Every diagnostic is fatal: the first `Error` produced anywhere in the
//! front end is returned up through `?` and ends the compile.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frontend::semantic::SymbolClass;
use crate::frontend::token::TokenKind;
use crate::types::Type;
use crate::utils::Span;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ==================== Lexical Errors ====================
    #[error("Invalid symbol!")]
    InvalidSymbol { span: Span },

    #[error("End of comment expected!")]
    UnterminatedComment { span: Span },

    #[error("Identification too long!")]
    IdentTooLong { span: Span },

    #[error("Invalid char constant!")]
    InvalidCharConstant { span: Span },

    #[error("Invalid number!")]
    InvalidNumber { span: Span },

    // ==================== Syntax Errors ====================
    #[error("Missing {}", .expected.description())]
    MissingToken { expected: TokenKind, span: Span },

    #[error("A constant expected.")]
    InvalidConstant { span: Span },

    #[error("A type expected.")]
    InvalidType { span: Span },

    #[error("A basic type expected.")]
    InvalidBasicType { span: Span },

    #[error("A parameter expected.")]
    InvalidParameter { span: Span },

    #[error("Invalid statement.")]
    InvalidStatement { span: Span },

    #[error("Wrong arguments.")]
    InvalidArguments { span: Span },

    #[error("A comparator expected.")]
    InvalidComparator { span: Span },

    #[error("Invalid expression.")]
    InvalidExpression { span: Span },

    #[error("Invalid term.")]
    InvalidTerm { span: Span },

    #[error("Invalid factor.")]
    InvalidFactor { span: Span },

    #[error("Too deeply nested.")]
    NestingTooDeep { span: Span },

    // ==================== Semantic Errors ====================
    #[error("Undeclared {}.", .class.noun())]
    Undeclared { class: SymbolClass, span: Span },

    #[error("{}", .class.expectation())]
    WrongKind { class: SymbolClass, span: Span },

    #[error("Duplicate identifier.")]
    DuplicateDeclaration { span: Span },

    #[error("Type inconsistency.")]
    TypeMismatch {
        expected: Box<Type>,
        found: Box<Type>,
        span: Span,
    },

    #[error("Invalid lvalue.")]
    NotAnLValue { span: Span },

    #[error("The number of arguments and the number of parameters are inconsistent.")]
    ArityMismatch { span: Span },

    #[error("An array type expected.")]
    NotArrayType { span: Span },

    #[error("A number type expected.")]
    NotNumericType { span: Span },

    #[error("Operator cannot be applied to this type.")]
    InvalidOperatorForType { span: Span },

    #[error("IO error: {0}")]
    Io(String),
}

/// Broad classification of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Lexical,
    Syntax,
    Semantic,
    Io,
}

impl Error {
    pub fn type_mismatch(expected: Type, found: Type, span: Span) -> Self {
        Self::TypeMismatch {
            expected: Box::new(expected),
            found: Box::new(found),
            span,
        }
    }

    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::InvalidSymbol { span }
            | Self::UnterminatedComment { span }
            | Self::IdentTooLong { span }
            | Self::InvalidCharConstant { span }
            | Self::InvalidNumber { span }
            | Self::MissingToken { span, .. }
            | Self::InvalidConstant { span }
            | Self::InvalidType { span }
            | Self::InvalidBasicType { span }
            | Self::InvalidParameter { span }
            | Self::InvalidStatement { span }
            | Self::InvalidArguments { span }
            | Self::InvalidComparator { span }
            | Self::InvalidExpression { span }
            | Self::InvalidTerm { span }
            | Self::InvalidFactor { span }
            | Self::NestingTooDeep { span }
            | Self::Undeclared { span, .. }
            | Self::WrongKind { span, .. }
            | Self::DuplicateDeclaration { span }
            | Self::TypeMismatch { span, .. }
            | Self::NotAnLValue { span }
            | Self::ArityMismatch { span }
            | Self::NotArrayType { span }
            | Self::NotNumericType { span }
            | Self::InvalidOperatorForType { span } => Some(*span),
            Self::Io(_) => None,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::InvalidSymbol { .. }
            | Self::UnterminatedComment { .. }
            | Self::IdentTooLong { .. }
            | Self::InvalidCharConstant { .. }
            | Self::InvalidNumber { .. } => Category::Lexical,
            Self::MissingToken { .. }
            | Self::InvalidConstant { .. }
            | Self::InvalidType { .. }
            | Self::InvalidBasicType { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidStatement { .. }
            | Self::InvalidArguments { .. }
            | Self::InvalidComparator { .. }
            | Self::InvalidExpression { .. }
            | Self::InvalidTerm { .. }
            | Self::InvalidFactor { .. }
            | Self::NestingTooDeep { .. } => Category::Syntax,
            Self::Undeclared { .. }
            | Self::WrongKind { .. }
            | Self::DuplicateDeclaration { .. }
            | Self::TypeMismatch { .. }
            | Self::NotAnLValue { .. }
            | Self::ArityMismatch { .. }
            | Self::NotArrayType { .. }
            | Self::NotNumericType { .. }
            | Self::InvalidOperatorForType { .. } => Category::Semantic,
            Self::Io(_) => Category::Io,
        }
    }

    /// Lexical errors after which the scanner can keep going
    pub fn is_recoverable(&self) -> bool {
        self.category() == Category::Lexical && !matches!(self, Self::UnterminatedComment { .. })
    }

    /// Render the diagnostic line, `<line>-<col>:<message>`
    pub fn report(&self) -> String {
        match self.span() {
            Some(span) => format!("{}:{}", span, self),
            None => self.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let err = Error::DuplicateDeclaration { span: Span::new(3, 7) };
        assert_eq!(err.report(), "3-7:Duplicate identifier.");
    }

    #[test]
    fn test_missing_token_report() {
        let err = Error::MissingToken {
            expected: TokenKind::Semicolon,
            span: Span::new(1, 11),
        };
        assert_eq!(err.report(), "1-11:Missing ';'");
        assert_eq!(err.category(), Category::Syntax);
    }

    #[test]
    fn test_undeclared_names_the_class() {
        let err = Error::Undeclared {
            class: SymbolClass::Procedure,
            span: Span::new(2, 5),
        };
        assert_eq!(err.report(), "2-5:Undeclared procedure.");
        assert_eq!(err.category(), Category::Semantic);
    }

    #[test]
    fn test_io_error_has_no_position() {
        let err = Error::Io("no such file".to_string());
        assert_eq!(err.span(), None);
        assert_eq!(err.report(), "IO error: no such file");
    }

    #[test]
    fn test_recoverable_lexical_errors() {
        assert!(Error::InvalidSymbol { span: Span::dummy() }.is_recoverable());
        assert!(Error::IdentTooLong { span: Span::dummy() }.is_recoverable());
        assert!(!Error::UnterminatedComment { span: Span::dummy() }.is_recoverable());
        assert!(!Error::NotAnLValue { span: Span::dummy() }.is_recoverable());
    }
}
