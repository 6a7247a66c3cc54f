//! Character reader and classifier
//!
//! The reader walks the source one character at a time and keeps the
//! position of the current character: lines start at 1, and the first
//! character of every line is column 1.

use crate::utils::Span;

/// Character-level cursor over the source text
pub struct CharReader {
    source: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl CharReader {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// The current character, or `None` at end of input
    pub fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Advance one character
    pub fn read_char(&mut self) {
        if let Some(c) = self.current() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    /// Position of the current character
    pub fn position(&self) -> Span {
        Span::new(self.line, self.col)
    }
}

/// Character classes the scanner dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Space,
    Letter,
    Digit,
    Plus,
    Minus,
    Times,
    Slash,
    Percent,
    Lt,
    Gt,
    Exclamation,
    Eq,
    Comma,
    Period,
    Colon,
    Semicolon,
    SingleQuote,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Unknown,
}

impl CharClass {
    pub fn of(c: char) -> Self {
        match c {
            ' ' | '\t' | '\n' | '\r' => Self::Space,
            c if c.is_ascii_alphabetic() => Self::Letter,
            c if c.is_ascii_digit() => Self::Digit,
            '+' => Self::Plus,
            '-' => Self::Minus,
            '*' => Self::Times,
            '/' => Self::Slash,
            '%' => Self::Percent,
            '<' => Self::Lt,
            '>' => Self::Gt,
            '!' => Self::Exclamation,
            '=' => Self::Eq,
            ',' => Self::Comma,
            '.' => Self::Period,
            ':' => Self::Colon,
            ';' => Self::Semicolon,
            '\'' => Self::SingleQuote,
            '(' => Self::LParen,
            ')' => Self::RParen,
            '[' => Self::LBracket,
            ']' => Self::RBracket,
            _ => Self::Unknown,
        }
    }
}
