#![no_std]

//! Core compiler pipeline for the Sable language.
//!
//! Sable is a small statically-typed imperative language; this crate
//! turns one in-memory compilation unit into emitted target code:
//!
//!   source .sb
//!     -> lexer      (tokens)
//!     -> parser     (AST)
//!     -> typecheck  (scope + type validation, resolved side tables)
//!     -> codegen    (linear instruction stream)
//!
//! Each stage must fully succeed before the next runs. Source loading,
//! argument handling, diagnostic rendering and output serialization
//! are collaborator concerns; the CLI should depend on this crate
//! rather than reimplementing the pipeline.

extern crate alloc;

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;
pub mod log;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic analysis
// ---------------------------------------------------------------------

pub mod typecheck;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod ir;
pub mod codegen;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen::generate;
pub use compiler::{CompileOptions, compile};
pub use error::CoreError;
pub use lexer::tokenize;
pub use parser::parse;
pub use typecheck::analyze;
