//! Parser and semantic analyzer for KPL
//!
//! LL(1) recursive descent, one function per nonterminal. Semantic checks
//! run as each construct is recognized, against the symbol table the parser
//! owns; the first diagnostic ends the compile.

use std::mem;

use log::debug;

use crate::frontend::lexer::Scanner;
use crate::frontend::semantic::{Object, ObjectKind, ParamMode, ParamSig, SymbolTable};
use crate::frontend::token::{Token, TokenKind};
use crate::types::{ConstantValue, Type};
use crate::utils::{Error, Result, Span};

/// Tokens that may follow a complete expression
const EXPRESSION_FOLLOW: &[TokenKind] = &[
    TokenKind::To,
    TokenKind::Do,
    TokenKind::RParen,
    TokenKind::Comma,
    TokenKind::Eq,
    TokenKind::Ne,
    TokenKind::Le,
    TokenKind::Lt,
    TokenKind::Ge,
    TokenKind::Gt,
    TokenKind::RBracket,
    TokenKind::Semicolon,
    TokenKind::End,
    TokenKind::Else,
    TokenKind::Then,
];

/// Tokens that may follow a complete term, in addition to `EXPRESSION_FOLLOW`
const TERM_FOLLOW: &[TokenKind] = &[TokenKind::Plus, TokenKind::Minus];

/// Tokens that may follow a call with no argument list, in addition to the
/// term follow set
const ARGUMENTS_FOLLOW: &[TokenKind] = &[TokenKind::Times, TokenKind::Slash, TokenKind::Percent];

fn follows_expression(kind: TokenKind) -> bool {
    EXPRESSION_FOLLOW.contains(&kind)
}

fn follows_term(kind: TokenKind) -> bool {
    TERM_FOLLOW.contains(&kind) || follows_expression(kind)
}

fn follows_call(kind: TokenKind) -> bool {
    ARGUMENTS_FOLLOW.contains(&kind) || follows_term(kind)
}

fn is_assign_op(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::TimesAssign
            | TokenKind::SlashAssign
    )
}

/// Deepest combined nesting of blocks, statements, types and expressions
pub const MAX_NESTING: usize = 64;

/// A single compile session
pub struct Parser {
    scanner: Scanner,
    /// The most recently consumed token
    current: Token,
    look_ahead: Token,
    symtab: SymbolTable,
    depth: usize,
}

impl Parser {
    /// Create a parser over `source`, priming the lookahead
    pub fn new(source: &str) -> Result<Self> {
        let mut scanner = Scanner::new(source);
        let look_ahead = scanner.next_token()?;
        Ok(Self {
            scanner,
            current: Token::eof(Span::dummy()),
            look_ahead,
            symtab: SymbolTable::new(),
            depth: 0,
        })
    }

    pub fn into_symbol_table(self) -> SymbolTable {
        self.symtab
    }

    // ==================== Helper Methods ====================

    /// Promote the lookahead to current and read a new lookahead
    fn scan(&mut self) -> Result<()> {
        let next = self.scanner.next_token()?;
        self.current = mem::replace(&mut self.look_ahead, next);
        Ok(())
    }

    /// Consume the lookahead if it has the expected kind
    fn eat(&mut self, kind: TokenKind) -> Result<()> {
        if self.look_ahead.kind == kind {
            self.scan()
        } else {
            Err(Error::MissingToken {
                expected: kind,
                span: self.look_ahead.span,
            })
        }
    }

    /// Run one level of a recursive construct, bounded by `MAX_NESTING`
    fn nested<T>(&mut self, compile: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(Error::NestingTooDeep {
                span: self.look_ahead.span,
            });
        }
        self.depth += 1;
        let result = compile(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> TokenKind {
        self.look_ahead.kind
    }

    /// Consume an identifier and return its spelling and position
    fn eat_ident(&mut self) -> Result<(String, Span)> {
        self.eat(TokenKind::Ident)?;
        Ok((self.current.lexeme.clone(), self.current.span))
    }

    // ==================== Declarations ====================

    /// Compile a complete program; the final `.` must end the input
    pub fn compile_program(&mut self) -> Result<()> {
        self.eat(TokenKind::Program)?;
        let (name, span) = self.eat_ident()?;
        let program = self.symtab.create_program(&name, span);
        self.symtab.enter_block(program);

        self.eat(TokenKind::Semicolon)?;
        self.compile_block()?;
        self.eat(TokenKind::Period)?;
        self.eat_eof()?;

        self.symtab.exit_block();
        debug!("program {} compiled", name);
        Ok(())
    }

    fn eat_eof(&self) -> Result<()> {
        if self.peek() == TokenKind::Eof {
            Ok(())
        } else {
            Err(Error::MissingToken {
                expected: TokenKind::Eof,
                span: self.look_ahead.span,
            })
        }
    }

    fn compile_block(&mut self) -> Result<()> {
        self.nested(Self::compile_block_body)
    }

    fn compile_block_body(&mut self) -> Result<()> {
        if self.peek() == TokenKind::Const {
            self.eat(TokenKind::Const)?;
            loop {
                self.compile_const_decl()?;
                if self.peek() != TokenKind::Ident {
                    break;
                }
            }
        }

        if self.peek() == TokenKind::Type {
            self.eat(TokenKind::Type)?;
            loop {
                self.compile_type_decl()?;
                if self.peek() != TokenKind::Ident {
                    break;
                }
            }
        }

        if self.peek() == TokenKind::Var {
            self.eat(TokenKind::Var)?;
            loop {
                self.compile_var_decl()?;
                if self.peek() != TokenKind::Ident {
                    break;
                }
            }
        }

        self.compile_sub_decls()?;

        self.eat(TokenKind::Begin)?;
        self.compile_statements()?;
        self.eat(TokenKind::End)
    }

    fn compile_const_decl(&mut self) -> Result<()> {
        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        self.eat(TokenKind::Eq)?;
        let value = self.compile_constant()?;
        self.symtab
            .declare(Object::new(name, ObjectKind::Constant(value), span));
        self.eat(TokenKind::Semicolon)
    }

    fn compile_type_decl(&mut self) -> Result<()> {
        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        self.eat(TokenKind::Eq)?;
        let ty = self.compile_type()?;
        self.symtab
            .declare(Object::new(name, ObjectKind::TypeAlias(ty), span));
        self.eat(TokenKind::Semicolon)
    }

    fn compile_var_decl(&mut self) -> Result<()> {
        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        self.eat(TokenKind::Colon)?;
        let ty = self.compile_type()?;
        self.symtab
            .declare(Object::new(name, ObjectKind::Variable(ty), span));
        self.eat(TokenKind::Semicolon)
    }

    fn compile_sub_decls(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                TokenKind::Function => self.compile_func_decl()?,
                TokenKind::Procedure => self.compile_proc_decl()?,
                _ => return Ok(()),
            }
        }
    }

    fn compile_func_decl(&mut self) -> Result<()> {
        self.eat(TokenKind::Function)?;
        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        let function = self.symtab.declare_function(&name, span);
        self.symtab.enter_block(function);

        self.compile_params()?;
        self.eat(TokenKind::Colon)?;
        let return_type = self.compile_basic_type()?;
        self.symtab.set_return_type(function, return_type);
        self.eat(TokenKind::Semicolon)?;
        self.compile_block()?;
        self.eat(TokenKind::Semicolon)?;

        self.symtab.exit_block();
        Ok(())
    }

    fn compile_proc_decl(&mut self) -> Result<()> {
        self.eat(TokenKind::Procedure)?;
        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        let procedure = self.symtab.declare_procedure(&name, span);
        self.symtab.enter_block(procedure);

        self.compile_params()?;
        self.eat(TokenKind::Semicolon)?;
        self.compile_block()?;
        self.eat(TokenKind::Semicolon)?;

        self.symtab.exit_block();
        Ok(())
    }

    fn compile_params(&mut self) -> Result<()> {
        match self.peek() {
            TokenKind::LParen => {
                self.eat(TokenKind::LParen)?;
                self.compile_param()?;
                while self.peek() == TokenKind::Semicolon {
                    self.eat(TokenKind::Semicolon)?;
                    self.compile_param()?;
                }
                self.eat(TokenKind::RParen)
            }
            TokenKind::Semicolon | TokenKind::Colon => Ok(()),
            _ => Err(Error::InvalidParameter {
                span: self.look_ahead.span,
            }),
        }
    }

    fn compile_param(&mut self) -> Result<()> {
        let mode = match self.peek() {
            TokenKind::Var => {
                self.eat(TokenKind::Var)?;
                ParamMode::ByReference
            }
            TokenKind::Ident => ParamMode::ByValue,
            _ => {
                return Err(Error::InvalidParameter {
                    span: self.look_ahead.span,
                })
            }
        };

        let (name, span) = self.eat_ident()?;
        self.symtab.check_fresh(&name, span)?;
        self.eat(TokenKind::Colon)?;
        let ty = self.compile_basic_type()?;
        self.symtab
            .declare(Object::new(name, ObjectKind::Parameter { mode, ty }, span));
        Ok(())
    }

    // ==================== Constants and Types ====================

    fn compile_constant(&mut self) -> Result<ConstantValue> {
        match self.peek() {
            TokenKind::Plus => {
                self.eat(TokenKind::Plus)?;
                self.compile_signed_constant()
            }
            TokenKind::Minus => {
                self.eat(TokenKind::Minus)?;
                Ok(self.compile_signed_constant()?.negated())
            }
            TokenKind::CharLit => {
                self.eat(TokenKind::CharLit)?;
                Ok(ConstantValue::Char(self.current.char_value()))
            }
            _ => self.compile_unsigned_constant(),
        }
    }

    /// The operand of a signed constant, which must be numeric
    fn compile_signed_constant(&mut self) -> Result<ConstantValue> {
        match self.peek() {
            TokenKind::Number => {
                self.eat(TokenKind::Number)?;
                Ok(ConstantValue::Int(self.current.int_value()))
            }
            TokenKind::FloatLit => {
                self.eat(TokenKind::FloatLit)?;
                Ok(ConstantValue::Float(self.current.float_value()))
            }
            TokenKind::Ident => {
                let (name, span) = self.eat_ident()?;
                let value = self.symtab.expect_constant(&name, span)?.duplicate();
                if value.is_number() {
                    Ok(value)
                } else {
                    Err(Error::NotNumericType { span })
                }
            }
            _ => Err(Error::InvalidConstant {
                span: self.look_ahead.span,
            }),
        }
    }

    fn compile_unsigned_constant(&mut self) -> Result<ConstantValue> {
        match self.peek() {
            TokenKind::Number => {
                self.eat(TokenKind::Number)?;
                Ok(ConstantValue::Int(self.current.int_value()))
            }
            TokenKind::FloatLit => {
                self.eat(TokenKind::FloatLit)?;
                Ok(ConstantValue::Float(self.current.float_value()))
            }
            TokenKind::CharLit => {
                self.eat(TokenKind::CharLit)?;
                Ok(ConstantValue::Char(self.current.char_value()))
            }
            TokenKind::Ident => {
                let (name, span) = self.eat_ident()?;
                Ok(self.symtab.expect_constant(&name, span)?.duplicate())
            }
            _ => Err(Error::InvalidConstant {
                span: self.look_ahead.span,
            }),
        }
    }

    fn compile_type(&mut self) -> Result<Type> {
        match self.peek() {
            TokenKind::Integer => {
                self.eat(TokenKind::Integer)?;
                Ok(Type::int())
            }
            TokenKind::Char => {
                self.eat(TokenKind::Char)?;
                Ok(Type::char())
            }
            TokenKind::Float => {
                self.eat(TokenKind::Float)?;
                Ok(Type::float())
            }
            TokenKind::Array => {
                self.eat(TokenKind::Array)?;
                self.eat(TokenKind::LBracket)?;
                self.eat(TokenKind::Number)?;
                let size = self.current.int_value();
                if size <= 0 {
                    return Err(Error::InvalidType {
                        span: self.current.span,
                    });
                }
                self.eat(TokenKind::RBracket)?;
                self.eat(TokenKind::Of)?;
                let element = self.nested(Self::compile_type)?;
                Ok(Type::array(size as usize, element))
            }
            TokenKind::Ident => {
                let (name, span) = self.eat_ident()?;
                Ok(self.symtab.expect_type(&name, span)?.duplicate())
            }
            _ => Err(Error::InvalidType {
                span: self.look_ahead.span,
            }),
        }
    }

    fn compile_basic_type(&mut self) -> Result<Type> {
        match self.peek() {
            TokenKind::Integer => {
                self.eat(TokenKind::Integer)?;
                Ok(Type::int())
            }
            TokenKind::Char => {
                self.eat(TokenKind::Char)?;
                Ok(Type::char())
            }
            TokenKind::Float => {
                self.eat(TokenKind::Float)?;
                Ok(Type::float())
            }
            _ => Err(Error::InvalidBasicType {
                span: self.look_ahead.span,
            }),
        }
    }

    // ==================== Statements ====================

    fn compile_statements(&mut self) -> Result<()> {
        self.compile_statement()?;
        while self.peek() == TokenKind::Semicolon {
            self.eat(TokenKind::Semicolon)?;
            self.compile_statement()?;
        }
        Ok(())
    }

    fn compile_statement(&mut self) -> Result<()> {
        self.nested(Self::compile_statement_body)
    }

    fn compile_statement_body(&mut self) -> Result<()> {
        match self.peek() {
            TokenKind::Ident => self.compile_ident_statement(),
            TokenKind::Call => self.compile_call_statement(),
            TokenKind::Begin => self.compile_group_statement(),
            TokenKind::If => self.compile_if_statement(),
            TokenKind::While => self.compile_while_statement(),
            TokenKind::For => self.compile_for_statement(),
            // Empty statement
            TokenKind::Semicolon | TokenKind::End | TokenKind::Else => Ok(()),
            _ => Err(Error::InvalidStatement {
                span: self.look_ahead.span,
            }),
        }
    }

    /// A statement starting with an identifier: a procedure name starts a
    /// call, anything else an assignment.
    fn compile_ident_statement(&mut self) -> Result<()> {
        let is_procedure = self
            .symtab
            .lookup(&self.look_ahead.lexeme)
            .map(|id| matches!(self.symtab.object(id).kind, ObjectKind::Procedure { .. }))
            .unwrap_or(false);
        if !is_procedure {
            return self.compile_assignment();
        }

        let (name, span) = self.eat_ident()?;
        // A procedure name is never an assignment target
        if is_assign_op(self.peek()) {
            return Err(Error::NotAnLValue { span });
        }
        self.compile_call_tail(&name, span)
    }

    fn compile_assignment(&mut self) -> Result<()> {
        let target = self.compile_lvalue()?;
        self.compile_assign_op()?;
        let span = self.look_ahead.span;
        let value = self.compile_expression()?;
        target.check_equal(&value, span)
    }

    fn compile_assign_op(&mut self) -> Result<()> {
        match self.peek() {
            kind if is_assign_op(kind) => self.eat(kind),
            _ => Err(Error::MissingToken {
                expected: TokenKind::Assign,
                span: self.look_ahead.span,
            }),
        }
    }

    /// Compile an assignment target and return its type
    fn compile_lvalue(&mut self) -> Result<Type> {
        let (name, span) = self.eat_ident()?;
        let target = self.symtab.expect_lvalue(&name, span)?;
        let ty = match &self.symtab.object(target).kind {
            ObjectKind::Variable(ty) | ObjectKind::Parameter { ty, .. } => ty.duplicate(),
            // A function result takes no subscripts
            ObjectKind::Function { return_type, .. } => {
                return return_type.clone().ok_or(Error::NotAnLValue { span });
            }
            _ => return Err(Error::NotAnLValue { span }),
        };
        self.compile_indexes(ty)
    }

    fn compile_call_statement(&mut self) -> Result<()> {
        self.eat(TokenKind::Call)?;
        self.compile_call()
    }

    fn compile_call(&mut self) -> Result<()> {
        let (name, span) = self.eat_ident()?;
        self.compile_call_tail(&name, span)
    }

    /// A call whose procedure name has already been consumed
    fn compile_call_tail(&mut self, name: &str, span: Span) -> Result<()> {
        let procedure = self.symtab.expect_procedure(name, span)?;
        let params = self.symtab.params_of(procedure);
        debug!("call {} with {} parameter(s)", name, params.len());
        self.compile_arguments(&params)
    }

    fn compile_group_statement(&mut self) -> Result<()> {
        self.eat(TokenKind::Begin)?;
        self.compile_statements()?;
        self.eat(TokenKind::End)
    }

    fn compile_if_statement(&mut self) -> Result<()> {
        self.eat(TokenKind::If)?;
        self.compile_condition()?;
        self.eat(TokenKind::Then)?;
        self.compile_statement()?;
        if self.peek() == TokenKind::Else {
            self.eat(TokenKind::Else)?;
            self.compile_statement()?;
        }
        Ok(())
    }

    fn compile_while_statement(&mut self) -> Result<()> {
        self.eat(TokenKind::While)?;
        self.compile_condition()?;
        self.eat(TokenKind::Do)?;
        self.compile_statement()
    }

    fn compile_for_statement(&mut self) -> Result<()> {
        self.eat(TokenKind::For)?;
        let (name, span) = self.eat_ident()?;
        let var_type = self.symtab.expect_variable(&name, span)?.duplicate();
        if !var_type.is_basic() || var_type == Type::Float {
            return Err(Error::type_mismatch(Type::int(), var_type, span));
        }

        self.eat(TokenKind::Assign)?;
        let lower_span = self.look_ahead.span;
        let lower = self.compile_expression()?;
        var_type.check_equal(&lower, lower_span)?;

        self.eat(TokenKind::To)?;
        let upper_span = self.look_ahead.span;
        let upper = self.compile_expression()?;
        lower.check_equal(&upper, upper_span)?;

        self.eat(TokenKind::Do)?;
        self.compile_statement()
    }

    // ==================== Arguments ====================

    /// Match an argument list against the callee's parameters
    fn compile_arguments(&mut self, params: &[ParamSig]) -> Result<()> {
        match self.peek() {
            TokenKind::LParen => {
                self.eat(TokenKind::LParen)?;
                let mut remaining = params.iter();
                loop {
                    let param = remaining.next().ok_or(Error::ArityMismatch {
                        span: self.look_ahead.span,
                    })?;
                    self.compile_argument(param)?;
                    if self.peek() != TokenKind::Comma {
                        break;
                    }
                    self.eat(TokenKind::Comma)?;
                }
                if remaining.next().is_some() {
                    return Err(Error::ArityMismatch {
                        span: self.look_ahead.span,
                    });
                }
                self.eat(TokenKind::RParen)
            }
            kind if follows_call(kind) => {
                if params.is_empty() {
                    Ok(())
                } else {
                    Err(Error::ArityMismatch {
                        span: self.look_ahead.span,
                    })
                }
            }
            _ => Err(Error::InvalidArguments {
                span: self.look_ahead.span,
            }),
        }
    }

    fn compile_argument(&mut self, param: &ParamSig) -> Result<()> {
        let span = self.look_ahead.span;
        let ty = match param.mode {
            ParamMode::ByValue => self.compile_expression()?,
            ParamMode::ByReference => {
                if self.peek() != TokenKind::Ident {
                    return Err(Error::NotAnLValue { span });
                }
                let ty = self.compile_lvalue()?;
                // The lvalue must be the whole argument
                if !matches!(self.peek(), TokenKind::Comma | TokenKind::RParen) {
                    return Err(Error::NotAnLValue { span });
                }
                ty
            }
        };
        param.ty.check_equal(&ty, span)
    }

    // ==================== Expressions ====================

    fn compile_condition(&mut self) -> Result<()> {
        let left_span = self.look_ahead.span;
        let left = self.compile_expression()?;
        left.require_basic(left_span)?;

        match self.peek() {
            kind @ (TokenKind::Eq
            | TokenKind::Ne
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge) => self.eat(kind)?,
            _ => {
                return Err(Error::InvalidComparator {
                    span: self.look_ahead.span,
                })
            }
        }

        let right_span = self.look_ahead.span;
        let right = self.compile_expression()?;
        left.check_equal(&right, right_span)
    }

    /// Compile an expression and return its type
    fn compile_expression(&mut self) -> Result<Type> {
        self.nested(Self::compile_expression_body)
    }

    fn compile_expression_body(&mut self) -> Result<Type> {
        let ty = match self.peek() {
            kind @ (TokenKind::Plus | TokenKind::Minus) => {
                self.eat(kind)?;
                let span = self.look_ahead.span;
                let ty = self.compile_term()?;
                ty.require_number(span)?;
                ty
            }
            _ => self.compile_term()?,
        };
        self.compile_expression_tail(ty)
    }

    fn compile_expression_tail(&mut self, left: Type) -> Result<Type> {
        loop {
            match self.peek() {
                kind @ (TokenKind::Plus | TokenKind::Minus) => {
                    left.require_number(self.look_ahead.span)?;
                    self.eat(kind)?;
                    let span = self.look_ahead.span;
                    let right = self.compile_term()?;
                    right.require_number(span)?;
                    left.check_equal(&right, span)?;
                }
                kind if follows_expression(kind) => return Ok(left),
                // Not reached from compile_term, whose follow check covers
                // every token that can end a term here
                _ => {
                    return Err(Error::InvalidExpression {
                        span: self.look_ahead.span,
                    })
                }
            }
        }
    }

    fn compile_term(&mut self) -> Result<Type> {
        let left = self.compile_factor()?;
        loop {
            match self.peek() {
                kind @ (TokenKind::Times | TokenKind::Slash) => {
                    left.require_number(self.look_ahead.span)?;
                    self.eat(kind)?;
                    self.compile_term_operand(&left)?;
                }
                TokenKind::Percent => {
                    let span = self.look_ahead.span;
                    left.require_number(span)?;
                    if left != Type::Int {
                        return Err(Error::InvalidOperatorForType { span });
                    }
                    self.eat(TokenKind::Percent)?;
                    self.compile_term_operand(&left)?;
                }
                kind if follows_term(kind) => return Ok(left),
                _ => {
                    return Err(Error::InvalidTerm {
                        span: self.look_ahead.span,
                    })
                }
            }
        }
    }

    /// Right operand of a multiplicative operator
    fn compile_term_operand(&mut self, left: &Type) -> Result<()> {
        let span = self.look_ahead.span;
        let right = self.compile_factor()?;
        right.require_number(span)?;
        left.check_equal(&right, span)
    }

    fn compile_factor(&mut self) -> Result<Type> {
        match self.peek() {
            TokenKind::Number => {
                self.eat(TokenKind::Number)?;
                Ok(Type::int())
            }
            TokenKind::FloatLit => {
                self.eat(TokenKind::FloatLit)?;
                Ok(Type::float())
            }
            TokenKind::CharLit => {
                self.eat(TokenKind::CharLit)?;
                Ok(Type::char())
            }
            TokenKind::Ident => {
                let (name, span) = self.eat_ident()?;
                let id = self.symtab.expect_declared(&name, span)?;
                match self.symtab.object(id).kind.clone() {
                    ObjectKind::Constant(value) => Ok(value.ty()),
                    ObjectKind::Variable(ty) | ObjectKind::Parameter { ty, .. } => {
                        self.compile_indexes(ty)
                    }
                    ObjectKind::Function { return_type, .. } => {
                        let return_type = return_type.ok_or(Error::InvalidFactor { span })?;
                        let params = self.symtab.params_of(id);
                        self.compile_arguments(&params)?;
                        Ok(return_type)
                    }
                    _ => Err(Error::InvalidFactor { span }),
                }
            }
            TokenKind::LParen => {
                self.eat(TokenKind::LParen)?;
                let ty = self.compile_expression()?;
                self.eat(TokenKind::RParen)?;
                Ok(ty)
            }
            _ => Err(Error::InvalidFactor {
                span: self.look_ahead.span,
            }),
        }
    }

    /// Apply zero or more subscripts to `ty`, returning the residual type
    fn compile_indexes(&mut self, ty: Type) -> Result<Type> {
        let mut ty = ty;
        while self.peek() == TokenKind::LBracket {
            let element = ty.require_array(self.look_ahead.span)?.duplicate();
            self.eat(TokenKind::LBracket)?;
            let span = self.look_ahead.span;
            self.compile_expression()?.require_int(span)?;
            self.eat(TokenKind::RBracket)?;
            ty = element;
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::semantic::SymbolClass;
    use crate::utils::Category;

    fn compile(source: &str) -> Result<SymbolTable> {
        let mut parser = Parser::new(source)?;
        parser.compile_program()?;
        Ok(parser.into_symbol_table())
    }

    /// The (expected, found) pair of a type mismatch
    fn mismatch(source: &str) -> (Type, Type) {
        match compile(source) {
            Err(Error::TypeMismatch { expected, found, .. }) => (*expected, *found),
            other => panic!("expected a type mismatch for {:?}, got {:?}", source, other.err()),
        }
    }

    fn report(source: &str) -> String {
        match compile(source) {
            Ok(_) => panic!("expected a diagnostic for {:?}", source),
            Err(err) => err.report(),
        }
    }

    #[test]
    fn test_minimal_program() {
        assert!(compile("program P; begin end.").is_ok());
        assert!(compile("program P; var x: integer; begin x := 1 end.").is_ok());
    }

    #[test]
    fn test_undeclared_identifier() {
        assert_eq!(
            report("program P; var x: integer; begin x := y end."),
            "1-39:Undeclared identifier."
        );
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        assert_eq!(
            report("program P; var x: integer; x: char; begin end."),
            "1-28:Duplicate identifier."
        );
    }

    #[test]
    fn test_float_to_int_is_a_mismatch() {
        let source = "program P; var x: integer; begin x := 1.5 end.";
        assert_eq!(mismatch(source), (Type::Int, Type::Float));
        assert_eq!(report(source), "1-39:Type inconsistency.");
    }

    #[test]
    fn test_constant_subscript() {
        assert!(compile(
            "program P; const c = 3; var a: array[5] of integer; begin a[c] := 1 end."
        )
        .is_ok());
    }

    #[test]
    fn test_reference_argument_needs_lvalue() {
        assert_eq!(
            report("program P; procedure q(var v: integer); begin end; begin q(1) end."),
            "1-60:Invalid lvalue."
        );
        assert!(matches!(
            compile(
                "program P; var x: integer; procedure q(var v: integer); begin end; \
                 begin q(x + 1) end."
            ),
            Err(Error::NotAnLValue { .. })
        ));
        assert!(compile(
            "program P; var x: integer; a: array[2] of integer; \
             procedure q(var v: integer); begin v := v + 1 end; \
             begin q(x); q(a[1]) end."
        )
        .is_ok());
    }

    #[test]
    fn test_partial_indexing() {
        assert!(compile(
            "program P; var m: array[3] of array[4] of integer; r: array[4] of integer; \
             begin r := m[1] end."
        )
        .is_ok());
        assert_eq!(
            report(
                "program P; var m: array[3] of array[4] of integer; x: integer; \
                 begin x := m[1][2][3] end."
            ),
            "1-82:An array type expected."
        );
    }

    #[test]
    fn test_subscript_must_be_int() {
        assert_eq!(
            mismatch("program P; var a: array[2] of char; begin a['x'] := 'y' end."),
            (Type::Int, Type::Char)
        );
    }

    #[test]
    fn test_missing_semicolon() {
        assert_eq!(
            report("program P var x: integer; begin end."),
            "1-11:Missing ';'"
        );
    }

    #[test]
    fn test_missing_period() {
        assert_eq!(report("program P; begin end"), "1-21:Missing '.'");
    }

    #[test]
    fn test_text_after_period() {
        assert_eq!(report("program P; begin end. x"), "1-23:Missing end of file");
    }

    #[test]
    fn test_lexical_error_surfaces() {
        assert_eq!(
            report("program P; var x: integer; begin x := 1 $ end."),
            "1-41:Invalid symbol!"
        );
    }

    #[test]
    fn test_recursive_function() {
        let source = "program P;
var r: integer;
function fact(n: integer): integer;
begin
  if n <= 1 then fact := 1 else fact := n * fact(n - 1)
end;
begin
  r := fact(5)
end.";
        assert!(compile(source).is_ok());
    }

    #[test]
    fn test_function_name_outside_its_body() {
        assert_eq!(
            report(
                "program P; var r: integer; function f: integer; begin f := 1 end; \
                 begin f := 2 end."
            ),
            "1-73:Invalid lvalue."
        );
    }

    #[test]
    fn test_arity() {
        let header = "program P; procedure q(a: integer; b: char); begin end; ";
        assert_eq!(
            report(&format!("{}begin q(1) end.", header)),
            "1-66:The number of arguments and the number of parameters are inconsistent."
        );
        assert!(matches!(
            compile(&format!("{}begin q(1, 'c', 2) end.", header)),
            Err(Error::ArityMismatch { .. })
        ));
        assert!(matches!(
            compile(&format!("{}begin q end.", header)),
            Err(Error::ArityMismatch { .. })
        ));
        assert_eq!(
            mismatch(&format!("{}begin q('c', 'c') end.", header)),
            (Type::Int, Type::Char)
        );
        assert!(compile(&format!("{}begin call q(1, 'c'); q(2, 'd') end.", header)).is_ok());
    }

    #[test]
    fn test_call_requires_procedure() {
        assert!(matches!(
            compile("program P; var x: integer; begin call x end."),
            Err(Error::WrongKind { class: SymbolClass::Procedure, .. })
        ));
        assert!(matches!(
            compile("program P; begin call nothing end."),
            Err(Error::Undeclared { class: SymbolClass::Procedure, .. })
        ));
    }

    #[test]
    fn test_for_loop() {
        assert!(compile(
            "program P; var i: integer; s: integer; \
             begin s := 0; for i := 1 to 10 do s := s + i end."
        )
        .is_ok());
        assert!(compile("program P; var c: char; begin for c := 'a' to 'z' do ; end.").is_ok());
        assert_eq!(
            mismatch("program P; var f: float; begin for f := 1.0 to 2.0 do ; end."),
            (Type::Int, Type::Float)
        );
        assert_eq!(
            mismatch("program P; var i: integer; begin for i := 1 to 'z' do ; end."),
            (Type::Int, Type::Char)
        );
        assert!(matches!(
            compile("program P; const n = 1; begin for n := 1 to 2 do ; end."),
            Err(Error::WrongKind { class: SymbolClass::Variable, .. })
        ));
    }

    #[test]
    fn test_modulo_is_int_only() {
        assert!(compile("program P; var x: integer; begin x := 7 % 2 end.").is_ok());
        assert_eq!(
            report("program P; var x: integer; begin x := 7.0 % 2.0 end."),
            "1-43:Operator cannot be applied to this type."
        );
    }

    #[test]
    fn test_arithmetic_operands() {
        assert!(compile("program P; var y: float; begin y := -1.5 * 2.0 + y / 3.0 end.").is_ok());
        assert_eq!(
            mismatch("program P; var y: float; begin y := 1.5 + 1 end."),
            (Type::Float, Type::Int)
        );
        assert_eq!(
            report("program P; var c: char; begin c := -'a' end."),
            "1-37:A number type expected."
        );
        assert!(matches!(
            compile("program P; var c: char; begin c := 'a' + 'b' end."),
            Err(Error::NotNumericType { .. })
        ));
    }

    #[test]
    fn test_conditions() {
        assert!(compile(
            "program P; var x: integer; begin if x != 0 then x := 1; while x < 10 do x += 1 end."
        )
        .is_ok());
        assert_eq!(
            report(
                "program P; var x: integer; a: array[2] of integer; \
                 begin if a = a then x := 1 end."
            ),
            "1-61:Type inconsistency."
        );
        assert!(matches!(
            compile("program P; var x: integer; begin if x = 'c' then x := 1 end."),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            compile("program P; var x: integer; begin if x then x := 1 end."),
            Err(Error::InvalidComparator { .. })
        ));
    }

    #[test]
    fn test_compound_assignments() {
        assert!(compile(
            "program P; var x: integer; begin x += 1; x -= 2; x *= 3; x /= 4 end."
        )
        .is_ok());
        assert!(matches!(
            compile("program P; var x: integer; begin x += 'c' end."),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_constant_negation_copies() {
        let table = compile("program P; const n = -3; m = -n; c = 'z'; begin end.").unwrap();
        assert_eq!(
            table.dump(),
            "Program P\n    Const n = -3\n    Const m = 3\n    Const c = 'z'\n"
        );
    }

    #[test]
    fn test_signed_constant_must_be_numeric() {
        assert!(matches!(
            compile("program P; const c = 'a'; d = -c; begin end."),
            Err(Error::NotNumericType { .. })
        ));
        assert!(matches!(
            compile("program P; const c = -'a'; begin end."),
            Err(Error::InvalidConstant { .. })
        ));
    }

    #[test]
    fn test_type_alias() {
        assert!(compile(
            "program P; type t = array[2] of char; var v: t; w: array[2] of char; \
             begin v := w end."
        )
        .is_ok());
        assert!(matches!(
            compile("program P; var x: integer; y: x; begin end."),
            Err(Error::WrongKind { class: SymbolClass::Type, .. })
        ));
    }

    #[test]
    fn test_zero_sized_array() {
        assert!(matches!(
            compile("program P; var a: array[0] of integer; begin end."),
            Err(Error::InvalidType { .. })
        ));
    }

    #[test]
    fn test_identifiers_are_case_sensitive() {
        assert!(matches!(
            compile("PROGRAM P; VAR x: INTEGER; BEGIN X := 1 END."),
            Err(Error::Undeclared { class: SymbolClass::Identifier, .. })
        ));
    }

    #[test]
    fn test_shadowing() {
        assert!(compile(
            "program P; var x: integer; \
             procedure q; var x: char; begin x := 'a' end; \
             begin x := 1; q end."
        )
        .is_ok());
    }

    #[test]
    fn test_syntax_diagnostics() {
        let cases = [
            ("program P; const c = ; begin end.", "A constant expected."),
            ("program P; var x: 5; begin end.", "A type expected."),
            (
                "program P; function f: array[2] of integer; begin end; begin end.",
                "A basic type expected.",
            ),
            ("program P; procedure q(1); begin end; begin end.", "A parameter expected."),
            ("program P; begin := 1 end.", "Invalid statement."),
            ("program P; var x: integer; begin x := ; end.", "Invalid factor."),
            ("program P; var x: integer; begin x := 1 : end.", "Invalid term."),
            (
                "program P; var r: integer; function f: integer; begin f := 1 end; \
                 begin r := f 1 end.",
                "Wrong arguments.",
            ),
            ("program P; var x: integer; begin x = 1 end.", "Missing ':='"),
        ];
        for (source, message) in cases {
            let err = compile(source).unwrap_err();
            assert_eq!(err.category(), Category::Syntax, "{:?} gave {:?}", source, err);
            assert_eq!(err.to_string(), message, "{:?}", source);
        }
    }

    #[test]
    fn test_procedure_is_not_an_assignment_target() {
        let header = "program P; procedure q; begin end; begin ";
        assert_eq!(report(&format!("{}q := 1 end.", header)), "1-42:Invalid lvalue.");
        assert!(matches!(
            compile(&format!("{}q += 1 end.", header)),
            Err(Error::NotAnLValue { .. })
        ));
        assert!(compile(&format!("{}q; call q end.", header)).is_ok());
    }

    fn parenthesized(depth: usize) -> String {
        format!(
            "program P; var x: integer; begin x := {}1{} end.",
            "(".repeat(depth),
            ")".repeat(depth)
        )
    }

    #[test]
    fn test_moderate_nesting_compiles() {
        assert!(compile(&parenthesized(50)).is_ok());
        let statements = format!(
            "program P; begin {}{} end.",
            "begin ".repeat(40),
            "end ".repeat(40)
        );
        assert!(compile(&statements).is_ok());
    }

    #[test]
    fn test_deep_nesting_is_a_diagnostic() {
        let err = compile(&parenthesized(5000)).unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep { .. }));
        assert_eq!(err.category(), Category::Syntax);

        let statements = format!(
            "program P; begin {}{} end.",
            "begin ".repeat(5000),
            "end ".repeat(5000)
        );
        assert!(matches!(compile(&statements), Err(Error::NestingTooDeep { .. })));

        let types = format!(
            "program P; var a: {}integer; begin end.",
            "array[1] of ".repeat(5000)
        );
        assert!(matches!(compile(&types), Err(Error::NestingTooDeep { .. })));
    }

    #[test]
    fn test_symbol_table_after_compile() {
        let table = compile(
            "program P; var r: integer; \
             function f(a: integer; var b: char): integer; begin f := a end; \
             begin r := f(1, 'c') end.",
        );
        assert!(matches!(table, Err(Error::NotAnLValue { .. })));

        let table = compile(
            "program P; var r: integer; c: char; \
             function f(a: integer; var b: char): integer; begin f := a end; \
             begin r := f(1, c) end.",
        )
        .unwrap();
        assert_eq!(
            table.dump(),
            "Program P\n    Var r : Int\n    Var c : Char\n    Function f : Int\n        \
             Param a : Int\n        Param VAR b : Char\n"
        );
    }
}
