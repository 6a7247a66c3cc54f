//! Symbol table and scope management for KPL
//!
//! Objects and scopes live in two arenas owned by the `SymbolTable`.
//! Program, function and procedure objects own a scope; a stack of scope ids
//! tracks the blocks the analyzer is currently inside.

use std::fmt::Write as _;

use log::debug;

use crate::types::{ConstantValue, Type};
use crate::utils::{Error, Result, Span};

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Unique identifier for a declared object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// How an argument is passed to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    ByValue,
    ByReference,
}

/// Kind-specific attributes of an object
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Program {
        scope: ScopeId,
    },
    Constant(ConstantValue),
    TypeAlias(Type),
    Variable(Type),
    Function {
        scope: ScopeId,
        /// Unset while the function header is being compiled
        return_type: Option<Type>,
    },
    Procedure {
        scope: ScopeId,
    },
    Parameter {
        mode: ParamMode,
        ty: Type,
    },
}

/// A symbol-table entry
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub span: Span,
}

impl Object {
    pub fn new(name: impl Into<String>, kind: ObjectKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
        }
    }

    /// The scope owned by a program, function or procedure
    pub fn scope(&self) -> Option<ScopeId> {
        match self.kind {
            ObjectKind::Program { scope }
            | ObjectKind::Function { scope, .. }
            | ObjectKind::Procedure { scope } => Some(scope),
            _ => None,
        }
    }
}

/// The class of object a lookup expected, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    Identifier,
    Constant,
    Type,
    Variable,
    Function,
    Procedure,
}

impl SymbolClass {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Constant => "constant",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Procedure => "procedure",
        }
    }

    pub fn expectation(&self) -> &'static str {
        match self {
            Self::Identifier => "An identifier expected.",
            Self::Constant => "A constant expected.",
            Self::Type => "A type expected.",
            Self::Variable => "A variable expected.",
            Self::Function => "A function identifier expected.",
            Self::Procedure => "A procedure identifier expected.",
        }
    }
}

/// A parameter as seen from a call site
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSig {
    pub mode: ParamMode,
    pub ty: Type,
}

/// A scope containing objects, in declaration order
#[derive(Debug)]
pub struct Scope {
    pub members: Vec<ObjectId>,
    pub outer: Option<ScopeId>,
    pub owner: ObjectId,
}

/// Symbol table with nested scopes
#[derive(Debug, Default)]
pub struct SymbolTable {
    objects: Vec<Object>,
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
    program: Option<ObjectId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Objects ====================

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// The program object, once `create_program` has run
    pub fn program(&self) -> Option<ObjectId> {
        self.program
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Allocate an object that owns a fresh, empty scope
    fn alloc_block_owner(
        &mut self,
        name: &str,
        span: Span,
        kind: impl FnOnce(ScopeId) -> ObjectKind,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let scope = ScopeId(self.scopes.len());
        self.objects.push(Object::new(name, kind(scope), span));
        self.scopes.push(Scope {
            members: Vec::new(),
            outer: None,
            owner: id,
        });
        id
    }

    pub fn create_program(&mut self, name: &str, span: Span) -> ObjectId {
        let id = self.alloc_block_owner(name, span, |scope| ObjectKind::Program { scope });
        self.program = Some(id);
        id
    }

    /// Create a function and declare it in the current scope
    pub fn declare_function(&mut self, name: &str, span: Span) -> ObjectId {
        let id = self.alloc_block_owner(name, span, |scope| ObjectKind::Function {
            scope,
            return_type: None,
        });
        self.attach(id);
        id
    }

    /// Create a procedure and declare it in the current scope
    pub fn declare_procedure(&mut self, name: &str, span: Span) -> ObjectId {
        let id = self.alloc_block_owner(name, span, |scope| ObjectKind::Procedure { scope });
        self.attach(id);
        id
    }

    pub fn set_return_type(&mut self, function: ObjectId, ty: Type) {
        if let ObjectKind::Function { return_type, .. } = &mut self.objects[function.0].kind {
            *return_type = Some(ty);
        }
    }

    /// Append an object to the current scope. The caller checks freshness.
    pub fn declare(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        self.attach(id);
        id
    }

    fn attach(&mut self, id: ObjectId) {
        debug!("declare {} ({:?})", self.objects[id.0].name, self.objects[id.0].kind);
        if let Some(&current) = self.stack.last() {
            self.scopes[current.0].members.push(id);
        }
    }

    // ==================== Scopes ====================

    /// Enter the block owned by `owner`; its outer scope is the current one
    pub fn enter_block(&mut self, owner: ObjectId) {
        let Some(scope) = self.objects[owner.0].scope() else {
            return;
        };
        self.scopes[scope.0].outer = self.stack.last().copied();
        self.stack.push(scope);
        debug!("enter block {} (depth {})", self.objects[owner.0].name, self.stack.len());
    }

    /// Exit the current block
    pub fn exit_block(&mut self) {
        if let Some(scope) = self.stack.pop() {
            let owner = self.scopes[scope.0].owner;
            debug!("exit block {}", self.objects[owner.0].name);
        }
    }

    pub fn current_scope(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    /// Owner of the current scope
    pub fn current_owner(&self) -> Option<ObjectId> {
        self.current_scope().map(|scope| self.scopes[scope.0].owner)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    // ==================== Lookup ====================

    /// Look up a name, searching from the current scope outward
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        let mut scope_id = self.current_scope();
        while let Some(id) = scope_id {
            let scope = &self.scopes[id.0];
            if let Some(&found) = scope
                .members
                .iter()
                .find(|member| self.objects[member.0].name == name)
            {
                return Some(found);
            }
            scope_id = scope.outer;
        }
        None
    }

    /// Look up a name only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<ObjectId> {
        let scope = self.current_scope()?;
        self.scopes[scope.0]
            .members
            .iter()
            .copied()
            .find(|member| self.objects[member.0].name == name)
    }

    /// Fail if `name` is already declared in the current scope
    pub fn check_fresh(&self, name: &str, span: Span) -> Result<()> {
        match self.lookup_local(name) {
            Some(_) => Err(Error::DuplicateDeclaration { span }),
            None => Ok(()),
        }
    }

    pub fn expect_declared(&self, name: &str, span: Span) -> Result<ObjectId> {
        self.lookup(name).ok_or(Error::Undeclared {
            class: SymbolClass::Identifier,
            span,
        })
    }

    fn expect_class(
        &self,
        name: &str,
        span: Span,
        class: SymbolClass,
        accepts: impl Fn(&ObjectKind) -> bool,
    ) -> Result<ObjectId> {
        let id = self.lookup(name).ok_or(Error::Undeclared { class, span })?;
        if accepts(&self.objects[id.0].kind) {
            Ok(id)
        } else {
            Err(Error::WrongKind { class, span })
        }
    }

    /// The value of a declared constant
    pub fn expect_constant(&self, name: &str, span: Span) -> Result<&ConstantValue> {
        let id = self.expect_class(name, span, SymbolClass::Constant, |kind| {
            matches!(kind, ObjectKind::Constant(_))
        })?;
        match &self.objects[id.0].kind {
            ObjectKind::Constant(value) => Ok(value),
            _ => Err(Error::WrongKind { class: SymbolClass::Constant, span }),
        }
    }

    /// The actual type behind a declared type alias
    pub fn expect_type(&self, name: &str, span: Span) -> Result<&Type> {
        let id = self.expect_class(name, span, SymbolClass::Type, |kind| {
            matches!(kind, ObjectKind::TypeAlias(_))
        })?;
        match &self.objects[id.0].kind {
            ObjectKind::TypeAlias(ty) => Ok(ty),
            _ => Err(Error::WrongKind { class: SymbolClass::Type, span }),
        }
    }

    /// The type of a declared variable
    pub fn expect_variable(&self, name: &str, span: Span) -> Result<&Type> {
        let id = self.expect_class(name, span, SymbolClass::Variable, |kind| {
            matches!(kind, ObjectKind::Variable(_))
        })?;
        match &self.objects[id.0].kind {
            ObjectKind::Variable(ty) => Ok(ty),
            _ => Err(Error::WrongKind { class: SymbolClass::Variable, span }),
        }
    }

    pub fn expect_procedure(&self, name: &str, span: Span) -> Result<ObjectId> {
        self.expect_class(name, span, SymbolClass::Procedure, |kind| {
            matches!(kind, ObjectKind::Procedure { .. })
        })
    }

    pub fn expect_function(&self, name: &str, span: Span) -> Result<ObjectId> {
        self.expect_class(name, span, SymbolClass::Function, |kind| {
            matches!(kind, ObjectKind::Function { .. })
        })
    }

    /// Resolve an assignment target or reference argument.
    ///
    /// Variables and parameters qualify anywhere; a function name qualifies
    /// only inside that function's own block, where it names the result.
    pub fn expect_lvalue(&self, name: &str, span: Span) -> Result<ObjectId> {
        let id = self.expect_declared(name, span)?;
        match self.objects[id.0].kind {
            ObjectKind::Variable(_) | ObjectKind::Parameter { .. } => Ok(id),
            ObjectKind::Function { .. } if self.current_owner() == Some(id) => Ok(id),
            _ => Err(Error::NotAnLValue { span }),
        }
    }

    /// Parameters of a function or procedure, in declaration order
    pub fn params_of(&self, routine: ObjectId) -> Vec<ParamSig> {
        let Some(scope) = self.objects[routine.0].scope() else {
            return Vec::new();
        };
        self.scopes[scope.0]
            .members
            .iter()
            .filter_map(|member| match &self.objects[member.0].kind {
                ObjectKind::Parameter { mode, ty, .. } => Some(ParamSig {
                    mode: *mode,
                    ty: ty.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    // ==================== Dump ====================

    /// Render the program's object tree, one object per line
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if let Some(program) = self.program {
            self.dump_object(program, 0, &mut out);
        }
        out
    }

    fn dump_object(&self, id: ObjectId, indent: usize, out: &mut String) {
        let object = &self.objects[id.0];
        let pad = " ".repeat(indent);
        let _ = match &object.kind {
            ObjectKind::Program { .. } => writeln!(out, "{}Program {}", pad, object.name),
            ObjectKind::Constant(value) => writeln!(out, "{}Const {} = {}", pad, object.name, value),
            ObjectKind::TypeAlias(ty) => writeln!(out, "{}Type {} = {}", pad, object.name, ty),
            ObjectKind::Variable(ty) => writeln!(out, "{}Var {} : {}", pad, object.name, ty),
            ObjectKind::Function { return_type, .. } => match return_type {
                Some(ty) => writeln!(out, "{}Function {} : {}", pad, object.name, ty),
                None => writeln!(out, "{}Function {}", pad, object.name),
            },
            ObjectKind::Procedure { .. } => writeln!(out, "{}Procedure {}", pad, object.name),
            ObjectKind::Parameter { mode: ParamMode::ByValue, ty, .. } => {
                writeln!(out, "{}Param {} : {}", pad, object.name, ty)
            }
            ObjectKind::Parameter { mode: ParamMode::ByReference, ty, .. } => {
                writeln!(out, "{}Param VAR {} : {}", pad, object.name, ty)
            }
        };
        if let Some(scope) = object.scope() {
            for &member in &self.scopes[scope.0].members {
                self.dump_object(member, indent + 4, out);
            }
        }
    }
}
