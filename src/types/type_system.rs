//! Type System for KPL
//!
//! Types are plain value trees: an array owns its element type, and cloning
//! a type produces an independent deep copy. Equality is structural.

use std::fmt;

use crate::utils::{Error, Result, Span};

/// A KPL value type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Char,
    Array { size: usize, element: Box<Type> },
}

impl Type {
    pub fn int() -> Self {
        Self::Int
    }

    pub fn float() -> Self {
        Self::Float
    }

    pub fn char() -> Self {
        Self::Char
    }

    /// Create an array type; takes ownership of `element`
    pub fn array(size: usize, element: Type) -> Self {
        Self::Array {
            size,
            element: Box::new(element),
        }
    }

    /// Deep copy of this type
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Int => Self::Int,
            Self::Float => Self::Float,
            Self::Char => Self::Char,
            Self::Array { size, element } => Self::array(*size, element.duplicate()),
        }
    }

    /// Int, Float or Char
    pub fn is_basic(&self) -> bool {
        !matches!(self, Self::Array { .. })
    }

    /// Int or Float
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    pub fn require_int(&self, span: Span) -> Result<()> {
        match self {
            Self::Int => Ok(()),
            _ => Err(self.mismatch(Self::Int, span)),
        }
    }

    pub fn require_basic(&self, span: Span) -> Result<()> {
        if self.is_basic() {
            Ok(())
        } else {
            Err(self.mismatch(Self::Int, span))
        }
    }

    pub fn require_number(&self, span: Span) -> Result<()> {
        if self.is_number() {
            Ok(())
        } else {
            Err(Error::NotNumericType { span })
        }
    }

    /// Check that this is an array and return its element type
    pub fn require_array(&self, span: Span) -> Result<&Type> {
        match self {
            Self::Array { element, .. } => Ok(element),
            _ => Err(Error::NotArrayType { span }),
        }
    }

    /// Raise a type mismatch unless `found` is structurally equal to `self`
    pub fn check_equal(&self, found: &Type, span: Span) -> Result<()> {
        if types_equal(self, found) {
            Ok(())
        } else {
            Err(found.mismatch(self.clone(), span))
        }
    }

    fn mismatch(&self, expected: Type, span: Span) -> Error {
        Error::type_mismatch(expected, self.clone(), span)
    }
}

/// Structural type equality
pub fn types_equal(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Int, Type::Int) | (Type::Float, Type::Float) | (Type::Char, Type::Char) => true,
        (
            Type::Array { size: sa, element: ea },
            Type::Array { size: sb, element: eb },
        ) => sa == sb && types_equal(ea, eb),
        _ => false,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "Int"),
            Self::Float => write!(f, "Float"),
            Self::Char => write!(f, "Char"),
            Self::Array { size, element } => write!(f, "Arr({},{})", size, element),
        }
    }
}

/// The value bound to a declared constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i64),
    Float(f64),
    Char(char),
}

impl ConstantValue {
    /// The type an occurrence of this constant synthesizes
    pub fn ty(&self) -> Type {
        match self {
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Char(_) => Type::Char,
        }
    }

    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Sign-negate a numeric value; chars are returned unchanged
    pub fn negated(self) -> Self {
        match self {
            Self::Int(v) => Self::Int(v.wrapping_neg()),
            Self::Float(v) => Self::Float(-v),
            Self::Char(c) => Self::Char(c),
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Char(c) => write!(f, "'{}'", c),
        }
    }
}
