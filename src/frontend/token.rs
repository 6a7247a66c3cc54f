//! Token definitions for KPL

use std::fmt;

use crate::utils::Span;

/// Numeric payload of a number token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

/// A token produced by the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: Option<Numeric>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            value: None,
            span,
        }
    }

    /// A keyword or punctuation token, spelled the canonical way
    pub fn symbol(kind: TokenKind, span: Span) -> Self {
        Self::new(kind, kind.spelling().unwrap_or_default(), span)
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", span)
    }

    pub fn int(lexeme: impl Into<String>, value: i64, span: Span) -> Self {
        Self {
            value: Some(Numeric::Int(value)),
            ..Self::new(TokenKind::Number, lexeme, span)
        }
    }

    pub fn float(lexeme: impl Into<String>, value: f64, span: Span) -> Self {
        Self {
            value: Some(Numeric::Float(value)),
            ..Self::new(TokenKind::FloatLit, lexeme, span)
        }
    }

    pub fn int_value(&self) -> i64 {
        match self.value {
            Some(Numeric::Int(v)) => v,
            Some(Numeric::Float(v)) => v as i64,
            None => 0,
        }
    }

    pub fn float_value(&self) -> f64 {
        match self.value {
            Some(Numeric::Float(v)) => v,
            Some(Numeric::Int(v)) => v as f64,
            None => 0.0,
        }
    }

    /// The character of a char literal
    pub fn char_value(&self) -> char {
        self.lexeme.chars().next().unwrap_or('\0')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident | TokenKind::Number | TokenKind::FloatLit => {
                write!(f, "{}:{:?}({})", self.span, self.kind, self.lexeme)
            }
            TokenKind::CharLit => write!(f, "{}:{:?}('{}')", self.span, self.kind, self.lexeme),
            _ => write!(f, "{}:{:?}", self.span, self.kind),
        }
    }
}

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ============ Keywords ============
    Program,
    Const,
    Type,
    Var,
    Integer,
    Char,
    Float,
    Array,
    Of,
    Function,
    Procedure,
    Begin,
    End,
    Call,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,

    // ============ Identifiers and Literals ============
    Ident,
    /// Integer literal
    Number,
    /// Floating-point literal
    FloatLit,
    /// Character literal
    CharLit,

    // ============ Operators ============
    /// :=
    Assign,
    /// +=
    PlusAssign,
    /// -=
    MinusAssign,
    /// *=
    TimesAssign,
    /// /=
    SlashAssign,
    /// =
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    Plus,
    Minus,
    Times,
    Slash,
    /// %
    Percent,

    // ============ Delimiters ============
    Semicolon,
    Colon,
    Period,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // ============ Special ============
    Eof,
}

impl TokenKind {
    /// Look up a keyword; keywords are case-insensitive
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s.to_ascii_lowercase().as_str() {
            "program" => Some(TokenKind::Program),
            "const" => Some(TokenKind::Const),
            "type" => Some(TokenKind::Type),
            "var" => Some(TokenKind::Var),
            "integer" => Some(TokenKind::Integer),
            "char" => Some(TokenKind::Char),
            "float" => Some(TokenKind::Float),
            "array" => Some(TokenKind::Array),
            "of" => Some(TokenKind::Of),
            "function" => Some(TokenKind::Function),
            "procedure" => Some(TokenKind::Procedure),
            "begin" => Some(TokenKind::Begin),
            "end" => Some(TokenKind::End),
            "call" => Some(TokenKind::Call),
            "if" => Some(TokenKind::If),
            "then" => Some(TokenKind::Then),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "do" => Some(TokenKind::Do),
            "for" => Some(TokenKind::For),
            "to" => Some(TokenKind::To),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Program
                | TokenKind::Const
                | TokenKind::Type
                | TokenKind::Var
                | TokenKind::Integer
                | TokenKind::Char
                | TokenKind::Float
                | TokenKind::Array
                | TokenKind::Of
                | TokenKind::Function
                | TokenKind::Procedure
                | TokenKind::Begin
                | TokenKind::End
                | TokenKind::Call
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::To
        )
    }

    /// Fixed source spelling, for kinds that have one
    pub fn spelling(&self) -> Option<&'static str> {
        let s = match self {
            TokenKind::Program => "program",
            TokenKind::Const => "const",
            TokenKind::Type => "type",
            TokenKind::Var => "var",
            TokenKind::Integer => "integer",
            TokenKind::Char => "char",
            TokenKind::Float => "float",
            TokenKind::Array => "array",
            TokenKind::Of => "of",
            TokenKind::Function => "function",
            TokenKind::Procedure => "procedure",
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::Call => "call",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Assign => ":=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::TimesAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::Eq => "=",
            TokenKind::Ne => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Times => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Period => ".",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::FloatLit
            | TokenKind::CharLit
            | TokenKind::Eof => return None,
        };
        Some(s)
    }

    /// How a missing token of this kind is described to the user
    pub fn description(&self) -> String {
        match self {
            TokenKind::Ident => "an identification".to_string(),
            TokenKind::Number => "a number".to_string(),
            TokenKind::FloatLit => "a float".to_string(),
            TokenKind::CharLit => "a constant char".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            kind if kind.is_keyword() => {
                format!("keyword {}", kind.spelling().unwrap_or_default().to_uppercase())
            }
            kind => format!("'{}'", kind.spelling().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(TokenKind::keyword_from_str("BEGIN"), Some(TokenKind::Begin));
        assert_eq!(TokenKind::keyword_from_str("Begin"), Some(TokenKind::Begin));
        assert_eq!(TokenKind::keyword_from_str("beginning"), None);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(TokenKind::Ident.description(), "an identification");
        assert_eq!(TokenKind::Begin.description(), "keyword BEGIN");
        assert_eq!(TokenKind::Assign.description(), "':='");
        assert_eq!(TokenKind::RBracket.description(), "']'");
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(TokenKind::Ident, "abc", Span::new(2, 3));
        assert_eq!(token.to_string(), "2-3:Ident(abc)");
        assert_eq!(Token::symbol(TokenKind::Le, Span::new(1, 1)).to_string(), "1-1:Le");
    }
}
