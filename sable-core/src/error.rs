//! Error types for the Sable compiler pipeline.
//!
//! Each stage has its own error type; [`CoreError`] is the outer
//! wrapper returned by the convenience pipeline entry point. Lex and
//! parse errors abort at the first failure; semantic errors are
//! collected across the whole program and returned together. All of
//! them carry a span and convert into a [`Diagnostic`] for rendering,
//! which higher-level tools (the CLI) are responsible for.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use thiserror::Error;

use crate::ast::Type;
use crate::diagnostic::Diagnostic;
use crate::span::Span;

// ---------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------

/// Reasons the lexer can reject source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated character literal")]
    UnterminatedChar,
    #[error("character literal must contain exactly one character")]
    InvalidCharLiteral,
    #[error("unknown escape sequence '\\{0}'")]
    UnknownEscape(char),
    #[error("malformed number literal: {0}")]
    MalformedNumber(&'static str),
}

/// A lexical error; the first one aborts the stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    pub fn new(kind: LexErrorKind, span: Span) -> LexError {
        LexError { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self.kind {
            LexErrorKind::UnexpectedCharacter(_) => "E0001",
            LexErrorKind::UnterminatedString => "E0002",
            LexErrorKind::UnterminatedChar => "E0003",
            LexErrorKind::InvalidCharLiteral => "E0004",
            LexErrorKind::UnknownEscape(_) => "E0005",
            LexErrorKind::MalformedNumber(_) => "E0006",
        };
        Diagnostic::error(self.kind.to_string(), self.span).with_code(code)
    }
}

// ---------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------

/// Reasons the parser can reject a token sequence. First failure wins;
/// there is no recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("{0} literal out of range")]
    LiteralOutOfRange(&'static str),
    #[error("'{0}' is reserved and not supported")]
    ReservedWord(String),
    #[error("function declarations are only allowed at the top level")]
    NestedFunction,
    #[error("'return' outside of a function body")]
    ReturnOutsideFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> ParseError {
        ParseError { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self.kind {
            ParseErrorKind::UnexpectedToken { .. } => "E0101",
            ParseErrorKind::UnexpectedEof { .. } => "E0102",
            ParseErrorKind::LiteralOutOfRange(_) => "E0103",
            ParseErrorKind::ReservedWord(_) => "E0104",
            ParseErrorKind::NestedFunction => "E0105",
            ParseErrorKind::ReturnOutsideFunction => "E0106",
        };
        Diagnostic::error(self.kind.to_string(), self.span).with_code(code)
    }
}

// ---------------------------------------------------------------------
// Semantic analysis
// ---------------------------------------------------------------------

/// Scope and type rule violations. Unlike lex/parse errors these are
/// collected across the whole program and reported together.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticErrorKind {
    #[error("'{name}' is already declared in this scope")]
    DuplicateDeclaration { name: String, previous: Span },
    #[error("undeclared variable '{0}'")]
    UndeclaredVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{name}' expects {expected} argument(s), but {given} given")]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
    },
    #[error("argument {index} of '{name}' expects {expected}, found {given}")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        expected: Type,
        given: Type,
    },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("non-void function '{0}' does not return on every path")]
    MissingReturn(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, span: Span) -> SemanticError {
        SemanticError { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self.kind {
            SemanticErrorKind::DuplicateDeclaration { .. } => "E0201",
            SemanticErrorKind::UndeclaredVariable(_) => "E0202",
            SemanticErrorKind::UnknownFunction(_) => "E0203",
            SemanticErrorKind::ArityMismatch { .. } => "E0204",
            SemanticErrorKind::ArgumentTypeMismatch { .. } => "E0205",
            SemanticErrorKind::TypeMismatch(_) => "E0206",
            SemanticErrorKind::MissingReturn(_) => "E0207",
        };
        let diag = Diagnostic::error(self.kind.to_string(), self.span).with_code(code);
        match &self.kind {
            SemanticErrorKind::DuplicateDeclaration { previous, .. } => {
                diag.with_secondary_label(*previous, Some("previously declared here".to_string()))
            }
            _ => diag,
        }
    }
}

// ---------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------

/// The only code generation failure: a construct with no defined
/// lowering. Given a fully analyzed program this is unreachable, so it
/// is an internal-invariant violation rather than a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no lowering defined for this construct")]
pub struct CodeGenError {
    pub span: Span,
}

impl CodeGenError {
    pub fn unsupported(span: Span) -> CodeGenError {
        CodeGenError { span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(format!("internal: {self}"), self.span).with_code("E0301")
    }
}

// ---------------------------------------------------------------------
// Pipeline wrapper
// ---------------------------------------------------------------------

/// Outer error for the convenience pipeline entry point: the first
/// stage that fails reports here, and code generation is never reached
/// while semantic errors exist.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("semantic analysis failed with {} error(s)", .0.len())]
    Semantic(Vec<SemanticError>),
    #[error("code generation error: {0}")]
    Codegen(#[from] CodeGenError),
}

impl CoreError {
    /// Flatten into renderable diagnostics, in source order for the
    /// semantic case.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CoreError::Lex(err) => alloc::vec![err.to_diagnostic()],
            CoreError::Parse(err) => alloc::vec![err.to_diagnostic()],
            CoreError::Semantic(errs) => errs.iter().map(SemanticError::to_diagnostic).collect(),
            CoreError::Codegen(err) => alloc::vec![err.to_diagnostic()],
        }
    }
}
