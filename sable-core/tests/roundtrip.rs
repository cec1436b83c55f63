//! Grammar round-trip: printing a parsed program and re-parsing it
//! reaches a fixpoint, so the printer emits exactly the grammar the
//! parser accepts.

use sable_core::ast::Program;
use sable_core::{analyze, parse, tokenize};

fn parse_src(source: &str) -> Program {
    let tokens = tokenize(source).expect("tokenize");
    parse(&tokens, source).expect("parse")
}

fn roundtrip(source: &str) {
    let first = parse_src(source).to_string();
    let second = parse_src(&first).to_string();
    assert_eq!(first, second, "printer fixpoint not reached for:\n{source}");
}

#[test]
fn declarations_and_literals_roundtrip() {
    roundtrip(
        "int limit = 100;\n\
         long big = 9_000_000_000l;\n\
         short small = 3s;\n\
         double ratio = 1.5;\n\
         float half = 0.5f;\n\
         double exp = 2e3;\n\
         string label = \"total:\\n\";\n\
         char tick = '\\t';\n\
         bool flag = true || false && true;\n\
         char none = '\\0';",
    );
}

#[test]
fn expressions_keep_their_shape() {
    roundtrip("int x = 1 + 2 * 3 - -4;");
    roundtrip("bool b = !(1 < 2) == (3 >= 4) && 5 != 6;");
    roundtrip("int y = (1 + 2) * (3 % 4) / 5;");
}

#[test]
fn full_program_roundtrips_and_stays_valid() {
    let source = "int limit = 100;\n\
                  \n\
                  long scaled(short base, long factor) {\n\
                  long result = base * factor;\n\
                  if (result > 0l) {\n\
                  return result;\n\
                  } else if (result == 0l) {\n\
                  return 1l;\n\
                  }\n\
                  return -result;\n\
                  }\n\
                  \n\
                  void bump() {\n\
                  limit += 2;\n\
                  }\n\
                  \n\
                  bump();\n\
                  long v = scaled(2s, 3l);\n";
    let first = parse_src(source).to_string();
    let second_program = parse_src(&first);
    assert_eq!(second_program.to_string(), first);

    // The printed form is not just grammatical but still well-typed.
    analyze(second_program).expect("printed program analyzes cleanly");
}

#[test]
fn desugared_compound_assignment_is_stable() {
    let printed = parse_src("int i = 0;\ni += 2 * 3;").to_string();
    assert_eq!(printed, "int i = 0;\ni = (i + (2 * 3));\n");
    roundtrip(&printed);
}
