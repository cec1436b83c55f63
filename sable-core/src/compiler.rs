//! Pipeline orchestration.
//!
//! The four stages run strictly in sequence within one invocation;
//! each must fully succeed before the next starts, and nothing is
//! shared across invocations. [`compile`] is the convenience entry
//! that stops at the first failing stage and returns its diagnostics;
//! callers wanting a single stage use the per-stage entry points
//! re-exported from the crate root.

use alloc::format;
use alloc::vec::Vec;

use crate::codegen;
use crate::error::CoreError;
use crate::ir::EmittedUnit;
use crate::lexer;
use crate::log;
use crate::parser;
use crate::typecheck;

/// Options for one pipeline invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Emit per-stage traces on stderr.
    pub verbose: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { verbose: false }
    }
}

/// Run lex, parse, analyze and generate in order over one in-memory
/// compilation unit, stopping at the first stage that fails.
pub fn compile(source: &str, options: CompileOptions) -> Result<Vec<EmittedUnit>, CoreError> {
    log::set_verbose(options.verbose);

    let tokens = lexer::tokenize(source)?;
    log::trace(&format!("lex: {} tokens", tokens.len()));

    let program = parser::parse(&tokens, source)?;
    log::trace(&format!(
        "parse: {} top-level statements, {} expressions",
        program.stmts.len(),
        program.expr_count
    ));

    let resolved = typecheck::analyze(program).map_err(CoreError::Semantic)?;
    log::trace(&format!(
        "analyze: {} function(s) resolved",
        resolved.functions.len()
    ));

    let units = codegen::generate(&resolved)?;
    log::trace(&format!("codegen: {} units", units.len()));
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SemanticErrorKind;

    #[test]
    fn compiles_a_valid_program() {
        let units = compile("int x = 2 + 3;", CompileOptions::default()).expect("compile");
        assert!(!units.is_empty());
    }

    #[test]
    fn stops_at_the_first_failing_stage() {
        let err = compile("int x = @;", CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Lex(_)));

        let err = compile("int x = ;", CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));

        let err = compile("bool b = 1;", CompileOptions::default()).unwrap_err();
        match err {
            CoreError::Semantic(errs) => {
                assert!(matches!(errs[0].kind, SemanticErrorKind::TypeMismatch(_)));
            }
            other => panic!("expected semantic errors, got {other:?}"),
        }
    }
}
