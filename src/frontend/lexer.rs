//! Scanner for KPL
//!
//! Converts source text into a stream of tokens, dropping whitespace and
//! `(* ... *)` comments.

use log::trace;

use crate::frontend::reader::{CharClass, CharReader};
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// Longest identifier kept by the scanner
pub const MAX_IDENT_LEN: usize = 15;

/// Outcome of scanning one token
enum Scan {
    Token(Token),
    /// A diagnostic, with the best-effort token if there is one
    Diagnostic(Error, Option<Token>),
}

/// The scanner state
pub struct Scanner {
    reader: CharReader,
    /// Set once EOF or an error has been handed out through `Iterator`
    finished: bool,
}

impl Scanner {
    /// Create a new scanner for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            reader: CharReader::new(source),
            finished: false,
        }
    }

    /// Get the next token; every lexical diagnostic is an error
    pub fn next_token(&mut self) -> Result<Token> {
        match self.scan_token() {
            Scan::Token(token) => {
                trace!("token {}", token);
                Ok(token)
            }
            Scan::Diagnostic(err, _) => Err(err),
        }
    }

    /// Scan the whole source, continuing past recoverable diagnostics.
    ///
    /// Tokens and diagnostics come back in source order. The listing ends
    /// with the EOF token, or with the first fatal diagnostic.
    pub fn scan_all(mut self) -> Vec<Result<Token>> {
        let mut items = Vec::new();
        loop {
            match self.scan_token() {
                Scan::Token(token) => {
                    let is_eof = token.kind == TokenKind::Eof;
                    items.push(Ok(token));
                    if is_eof {
                        break;
                    }
                }
                Scan::Diagnostic(err, token) => {
                    let fatal = !err.is_recoverable();
                    items.push(Err(err));
                    if fatal {
                        break;
                    }
                    if let Some(token) = token {
                        items.push(Ok(token));
                    }
                }
            }
        }
        items
    }

    fn scan_token(&mut self) -> Scan {
        loop {
            let span = self.reader.position();
            let Some(c) = self.reader.current() else {
                return Scan::Token(Token::eof(span));
            };

            match CharClass::of(c) {
                CharClass::Space => self.skip_blank(),
                CharClass::LParen => {
                    self.reader.read_char();
                    if self.reader.current() != Some('*') {
                        return Scan::Token(Token::symbol(TokenKind::LParen, span));
                    }
                    self.reader.read_char();
                    if let Err(err) = self.skip_comment() {
                        return Scan::Diagnostic(err, None);
                    }
                }
                CharClass::Letter => return self.read_ident_keyword(span),
                CharClass::Digit => return self.read_number(span),
                CharClass::SingleQuote => return self.read_const_char(span),
                CharClass::Plus => return self.with_eq(span, TokenKind::Plus, TokenKind::PlusAssign),
                CharClass::Minus => {
                    return self.with_eq(span, TokenKind::Minus, TokenKind::MinusAssign)
                }
                CharClass::Times => {
                    return self.with_eq(span, TokenKind::Times, TokenKind::TimesAssign)
                }
                CharClass::Slash => {
                    return self.with_eq(span, TokenKind::Slash, TokenKind::SlashAssign)
                }
                CharClass::Lt => return self.with_eq(span, TokenKind::Lt, TokenKind::Le),
                CharClass::Gt => return self.with_eq(span, TokenKind::Gt, TokenKind::Ge),
                CharClass::Colon => return self.with_eq(span, TokenKind::Colon, TokenKind::Assign),
                CharClass::Exclamation => {
                    self.reader.read_char();
                    if self.reader.current() == Some('=') {
                        self.reader.read_char();
                        return Scan::Token(Token::symbol(TokenKind::Ne, span));
                    }
                    return Scan::Diagnostic(Error::InvalidSymbol { span }, None);
                }
                CharClass::Percent => return self.single(span, TokenKind::Percent),
                CharClass::Eq => return self.single(span, TokenKind::Eq),
                CharClass::Comma => return self.single(span, TokenKind::Comma),
                CharClass::Period => return self.single(span, TokenKind::Period),
                CharClass::Semicolon => return self.single(span, TokenKind::Semicolon),
                CharClass::RParen => return self.single(span, TokenKind::RParen),
                CharClass::LBracket => return self.single(span, TokenKind::LBracket),
                CharClass::RBracket => return self.single(span, TokenKind::RBracket),
                CharClass::Unknown => {
                    self.reader.read_char();
                    return Scan::Diagnostic(Error::InvalidSymbol { span }, None);
                }
            }
        }
    }

    fn skip_blank(&mut self) {
        while matches!(self.reader.current(), Some(c) if CharClass::of(c) == CharClass::Space) {
            self.reader.read_char();
        }
    }

    /// Skip a comment body; the opening `(*` is already consumed
    fn skip_comment(&mut self) -> Result<()> {
        loop {
            match self.reader.current() {
                None => {
                    return Err(Error::UnterminatedComment {
                        span: self.reader.position(),
                    })
                }
                Some('*') => {
                    self.reader.read_char();
                    if self.reader.current() == Some(')') {
                        self.reader.read_char();
                        return Ok(());
                    }
                }
                Some(_) => self.reader.read_char(),
            }
        }
    }

    fn single(&mut self, span: Span, kind: TokenKind) -> Scan {
        self.reader.read_char();
        Scan::Token(Token::symbol(kind, span))
    }

    /// One-character lookahead for the `x=` operator family
    fn with_eq(&mut self, span: Span, plain: TokenKind, compound: TokenKind) -> Scan {
        self.reader.read_char();
        if self.reader.current() == Some('=') {
            self.reader.read_char();
            Scan::Token(Token::symbol(compound, span))
        } else {
            Scan::Token(Token::symbol(plain, span))
        }
    }

    /// Read an identifier or keyword
    fn read_ident_keyword(&mut self, span: Span) -> Scan {
        let mut text = String::new();
        let mut len = 0;
        while let Some(c) = self.reader.current() {
            if !matches!(CharClass::of(c), CharClass::Letter | CharClass::Digit) {
                break;
            }
            if len < MAX_IDENT_LEN {
                text.push(c);
            }
            len += 1;
            self.reader.read_char();
        }

        if len > MAX_IDENT_LEN {
            let truncated = Token::new(TokenKind::Ident, text, span);
            return Scan::Diagnostic(Error::IdentTooLong { span }, Some(truncated));
        }

        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident);
        Scan::Token(Token::new(kind, text, span))
    }

    /// Read a number literal: digits with at most one period
    fn read_number(&mut self, span: Span) -> Scan {
        let mut text = String::new();
        let mut periods = 0;
        while let Some(c) = self.reader.current() {
            match CharClass::of(c) {
                CharClass::Digit => {}
                CharClass::Period => periods += 1,
                _ => break,
            }
            text.push(c);
            self.reader.read_char();
        }

        match periods {
            0 => match text.parse::<i64>() {
                Ok(value) => Scan::Token(Token::int(text, value, span)),
                Err(_) => Scan::Diagnostic(Error::InvalidNumber { span }, None),
            },
            1 => match text.parse::<f64>() {
                Ok(value) => Scan::Token(Token::float(text, value, span)),
                Err(_) => Scan::Diagnostic(Error::InvalidNumber { span }, None),
            },
            _ => Scan::Diagnostic(Error::InvalidNumber { span }, None),
        }
    }

    /// Read a character literal: exactly one character between quotes
    fn read_const_char(&mut self, span: Span) -> Scan {
        self.reader.read_char(); // opening quote

        let Some(c) = self.reader.current() else {
            return Scan::Diagnostic(Error::InvalidCharConstant { span }, None);
        };
        self.reader.read_char();

        if self.reader.current() != Some('\'') {
            return Scan::Diagnostic(Error::InvalidCharConstant { span }, None);
        }
        self.reader.read_char();

        Scan::Token(Token::new(TokenKind::CharLit, c.to_string(), span))
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    /// Yields tokens up to and including EOF, or up to the first diagnostic
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_token();
        if !matches!(&item, Ok(token) if token.kind != TokenKind::Eof) {
            self.finished = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .map(|item| item.map(|t| t.kind))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("program P; begin end."),
            vec![
                TokenKind::Program,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Begin,
                TokenKind::End,
                TokenKind::Period,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(
            kinds("PROGRAM Var ArRaY"),
            vec![TokenKind::Program, TokenKind::Var, TokenKind::Array, TokenKind::Eof]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds(":= += -= *= /= <= >= != : + - * / < > = %"),
            vec![
                TokenKind::Assign,
                TokenKind::PlusAssign,
                TokenKind::MinusAssign,
                TokenKind::TimesAssign,
                TokenKind::SlashAssign,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Ne,
                TokenKind::Colon,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Times,
                TokenKind::Slash,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens: Vec<Token> = Scanner::new("42 3.25")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].int_value(), 42);
        assert_eq!(tokens[1].kind, TokenKind::FloatLit);
        assert!((tokens[1].float_value() - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_two_periods_is_invalid() {
        let err = Scanner::new("1.2.3").next_token().unwrap_err();
        assert!(matches!(err, Error::InvalidNumber { span } if span == Span::new(1, 1)));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a (* one ** two *) b (**) c"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(kinds("(a)"), vec![TokenKind::LParen, TokenKind::Ident, TokenKind::RParen, TokenKind::Eof]);
    }

    #[test]
    fn test_unterminated_comment_is_fatal() {
        let mut scanner = Scanner::new("x (* open\n comment");
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Ident);
        let err = scanner.next_token().unwrap_err();
        assert!(matches!(err, Error::UnterminatedComment { span } if span == Span::new(2, 9)));
    }

    #[test]
    fn test_char_constants() {
        let token = Scanner::new("'z'").next_token().unwrap();
        assert_eq!(token.kind, TokenKind::CharLit);
        assert_eq!(token.char_value(), 'z');

        let err = Scanner::new("'ab'").next_token().unwrap_err();
        assert!(matches!(err, Error::InvalidCharConstant { .. }));
        let err = Scanner::new("'").next_token().unwrap_err();
        assert!(matches!(err, Error::InvalidCharConstant { .. }));
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<Token> = Scanner::new("var\n  x := 1")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(tokens[0].span, Span::new(1, 1));
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(2, 5));
        assert_eq!(tokens[3].span, Span::new(2, 8));
    }

    #[test]
    fn test_long_identifier_is_truncated() {
        let items = Scanner::new("abcdefghijklmnopqrst x").scan_all();
        assert!(matches!(items[0], Err(Error::IdentTooLong { .. })));
        let truncated = items[1].as_ref().unwrap();
        assert_eq!(truncated.kind, TokenKind::Ident);
        assert_eq!(truncated.lexeme, "abcdefghijklmno");
        assert_eq!(items[2].as_ref().unwrap().lexeme, "x");
    }

    #[test]
    fn test_invalid_symbol_is_skipped() {
        let items = Scanner::new("a # b ! c").scan_all();
        let errors: Vec<_> = items.iter().filter(|i| i.is_err()).collect();
        let idents: Vec<_> = items
            .iter()
            .filter_map(|i| i.as_ref().ok())
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(idents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_listing_stops_at_unterminated_comment() {
        let items = Scanner::new("a # (* open").scan_all();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().lexeme, "a");
        assert!(matches!(items[1], Err(Error::InvalidSymbol { span }) if span == Span::new(1, 3)));
        assert!(matches!(
            items[2],
            Err(Error::UnterminatedComment { span }) if span == Span::new(1, 12)
        ));
    }

    #[test]
    fn test_strict_mode_stops_at_invalid_symbol() {
        let mut scanner = Scanner::new("a $");
        assert!(scanner.next().unwrap().is_ok());
        assert!(matches!(scanner.next(), Some(Err(Error::InvalidSymbol { .. }))));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_eof_repeats_for_next_token() {
        let mut scanner = Scanner::new("");
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Eof);
    }
}
