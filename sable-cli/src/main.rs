use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sable_core::diagnostic::Diagnostic;
use sable_core::span::LineIndex;
use sable_core::{CompileOptions, compile, parse, tokenize};

/// Batch compiler for Sable source files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file; reads stdin when omitted.
    #[arg(short, long)]
    input: Option<String>,

    /// Output file; writes stdout when omitted.
    #[arg(short, long)]
    output: Option<String>,

    #[arg(
        long,
        value_name = "STAGE",
        default_value = "ir",
        help = "Output stage: tokens, ast, ir"
    )]
    emit: String,

    #[arg(long, help = "Print per-stage traces to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read input file {path}"))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let index = LineIndex::new(&source);

    let text = match cli.emit.as_str() {
        "tokens" => match tokenize(&source) {
            Ok(tokens) => render_tokens(&tokens, &source, &index),
            Err(err) => return Err(report(&index, &[err.to_diagnostic()])),
        },
        "ast" => {
            let tokens = match tokenize(&source) {
                Ok(tokens) => tokens,
                Err(err) => return Err(report(&index, &[err.to_diagnostic()])),
            };
            match parse(&tokens, &source) {
                Ok(program) => program.to_string(),
                Err(err) => return Err(report(&index, &[err.to_diagnostic()])),
            }
        }
        "ir" => {
            let options = CompileOptions {
                verbose: cli.verbose,
            };
            match compile(&source, options) {
                Ok(units) => render_units(&units),
                Err(err) => return Err(report(&index, &err.diagnostics())),
            }
        }
        other => return Err(anyhow::anyhow!("unsupported emit stage: {other}")),
    };

    write_output(cli.output.as_deref(), &text)
}

/// Print diagnostics to stderr with line/column positions.
fn report(index: &LineIndex, diagnostics: &[Diagnostic]) -> anyhow::Error {
    for diagnostic in diagnostics {
        let pos = index.line_col(diagnostic.primary.span.start);
        eprintln!(
            "error[{}]: {} --> {}:{}",
            diagnostic.code.unwrap_or("E0000"),
            diagnostic.message,
            pos.line,
            pos.column
        );
        for label in &diagnostic.secondary {
            let pos = index.line_col(label.span.start);
            eprintln!(
                "  note: {} --> {}:{}",
                label.message.as_deref().unwrap_or("related location"),
                pos.line,
                pos.column
            );
        }
    }
    anyhow::anyhow!("compilation failed with {} error(s)", diagnostics.len())
}

fn render_tokens(
    tokens: &[sable_core::lexer::Token],
    source: &str,
    index: &LineIndex,
) -> String {
    let mut text = String::new();
    for token in tokens {
        let pos = index.line_col(token.span.start);
        text.push_str(&format!(
            "{:?} '{}' ({}:{})\n",
            token.kind,
            token.lexeme(source),
            pos.line,
            pos.column
        ));
    }
    text
}

fn render_units(units: &[sable_core::ir::EmittedUnit]) -> String {
    use sable_core::ir::EmittedUnit;

    let mut text = String::new();
    let mut in_func = false;
    for unit in units {
        match unit {
            EmittedUnit::FuncBegin { .. } => {
                text.push_str(&format!("{unit}\n"));
                in_func = true;
            }
            EmittedUnit::FuncEnd => {
                text.push_str(&format!("{unit}\n"));
                in_func = false;
            }
            EmittedUnit::Label(_) => text.push_str(&format!("{unit}\n")),
            EmittedUnit::Inst(_) => {
                if in_func {
                    text.push_str("  ");
                }
                text.push_str(&format!("{unit}\n"));
            }
        }
    }
    text
}

fn write_output(path: Option<&str>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = PathBuf::from(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create directory {parent:?}"))?;
                }
            }
            fs::write(path, text).with_context(|| format!("failed to write output file {path}"))
        }
        None => {
            io::stdout().write_all(text.as_bytes())?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn compiles_source_to_ir_file() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.sb");
        fs::write(&input_path, "int x = 2 + 3;").expect("write input");
        let output_path = dir.path().join("out.ir");

        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        let ir = fs::read_to_string(&output_path).expect("read ir");
        assert!(ir.contains("push int 5"), "folded constant missing: {ir}");
    }

    #[test]
    fn reads_from_stdin_and_writes_stdout() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .write_stdin("long y = 1;")
            .assert()
            .success()
            .stdout(predicate::str::contains("promote int -> long"));
    }

    #[test]
    fn emits_token_dump() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("tokens")
            .write_stdin("int x = 1;")
            .assert()
            .success()
            .stdout(predicate::str::contains("KwInt 'int' (1:1)"));
    }

    #[test]
    fn emits_printed_ast() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("ast")
            .write_stdin("int x = 2 + 3;")
            .assert()
            .success()
            .stdout(predicate::str::contains("int x = (2 + 3);"));
    }

    #[test]
    fn reports_semantic_error_with_position() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .write_stdin("bool b = 1;")
            .assert()
            .failure()
            .stderr(predicate::str::contains("type mismatch"))
            .stderr(predicate::str::contains("--> 1:10"));
    }

    #[test]
    fn reports_all_semantic_errors_at_once() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .write_stdin("int a = no;\nbool b = 1;")
            .assert()
            .failure()
            .stderr(predicate::str::contains("undeclared variable 'no'"))
            .stderr(predicate::str::contains("compilation failed with 2 error(s)"));
    }

    #[test]
    fn rejects_unknown_emit_stage() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .arg("--emit")
            .arg("object")
            .write_stdin("int x = 1;")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported emit stage"));
    }

    #[test]
    fn reports_missing_input_file() {
        Command::cargo_bin("sable-cli")
            .expect("binary exists")
            .arg("--input")
            .arg("./does/not/exist.sb")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read input file"));
    }
}
