//! Code generation for Sable.
//!
//! A single post-order walk over the resolved program: statements
//! lower in declaration order, expressions lower bottom-up with
//! operands pushed left to right before their operator, preserving
//! source-level evaluation order. The tree is visited exactly once and
//! never mutated; every type decision comes from the analyzer's side
//! tables, and expressions the analyzer already folded emit a single
//! push of the folded constant.
//!
//! The only failure mode is a construct with no defined lowering,
//! which a fully analyzed program cannot contain.

use alloc::vec::Vec;

use crate::ast::{Expr, ExprKind, FuncDecl, Stmt, StmtKind, Type, Value};
use crate::error::CodeGenError;
use crate::ir::{EmittedUnit, Inst, Label};
use crate::typecheck::ResolvedProgram;

/// Lower a resolved program to its emitted instruction stream.
pub fn generate(resolved: &ResolvedProgram) -> Result<Vec<EmittedUnit>, CodeGenError> {
    let mut generator = CodeGen {
        resolved,
        out: Vec::new(),
        next_label: 0,
    };
    for stmt in &resolved.program.stmts {
        generator.emit_stmt(stmt)?;
    }
    Ok(generator.out)
}

struct CodeGen<'a> {
    resolved: &'a ResolvedProgram,
    out: Vec<EmittedUnit>,
    next_label: u32,
}

impl<'a> CodeGen<'a> {
    fn inst(&mut self, inst: Inst) {
        self.out.push(EmittedUnit::Inst(inst));
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn expr_type(&self, expr: &Expr) -> Result<Type, CodeGenError> {
        self.resolved
            .expr_types
            .get(expr.id)
            .copied()
            .ok_or_else(|| CodeGenError::unsupported(expr.span))
    }

    /// The type an operand has after its recorded widening, if any.
    fn effective_type(&self, expr: &Expr) -> Result<Type, CodeGenError> {
        if let Some(to) = self.resolved.coercions.get(expr.id) {
            return Ok(*to);
        }
        self.expr_type(expr)
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodeGenError> {
        match &stmt.kind {
            StmtKind::VarDecl { ty, name, init } => {
                self.inst(Inst::Reserve {
                    name: name.name.clone(),
                    ty: *ty,
                });
                match init {
                    Some(init) => self.emit_expr(init)?,
                    None => {
                        let value = default_value(*ty)
                            .ok_or_else(|| CodeGenError::unsupported(stmt.span))?;
                        self.inst(Inst::Push(value));
                    }
                }
                self.inst(Inst::Store(name.name.clone()));
            }
            StmtKind::VarAsgn { target, value } => {
                self.emit_expr(value)?;
                self.inst(Inst::Store(target.name.clone()));
            }
            StmtKind::FuncDecl(func) => self.emit_func_decl(func)?,
            StmtKind::Call(expr) => {
                self.emit_expr(expr)?;
                // A statement-position call discards its result.
                if self.expr_type(expr)? != Type::Void {
                    self.inst(Inst::Pop);
                }
            }
            StmtKind::IfElse {
                cond,
                then_block,
                else_block,
            } => {
                self.emit_expr(cond)?;
                match else_block {
                    Some(else_block) => {
                        let else_label = self.fresh_label();
                        let end_label = self.fresh_label();
                        self.inst(Inst::JumpIfFalse(else_label));
                        self.emit_block(then_block)?;
                        self.inst(Inst::Jump(end_label));
                        self.out.push(EmittedUnit::Label(else_label));
                        self.emit_block(else_block)?;
                        self.out.push(EmittedUnit::Label(end_label));
                    }
                    None => {
                        let end_label = self.fresh_label();
                        self.inst(Inst::JumpIfFalse(end_label));
                        self.emit_block(then_block)?;
                        self.out.push(EmittedUnit::Label(end_label));
                    }
                }
            }
            StmtKind::Return { value } => match value {
                Some(value) => {
                    self.emit_expr(value)?;
                    self.inst(Inst::Ret { has_value: true });
                }
                None => self.inst(Inst::Ret { has_value: false }),
            },
        }
        Ok(())
    }

    fn emit_block(&mut self, block: &[Stmt]) -> Result<(), CodeGenError> {
        for stmt in block {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_func_decl(&mut self, func: &FuncDecl) -> Result<(), CodeGenError> {
        self.out.push(EmittedUnit::FuncBegin {
            name: func.name.name.clone(),
            params: func
                .params
                .iter()
                .map(|p| (p.name.name.clone(), p.ty))
                .collect(),
            ret: func.ret,
        });
        self.emit_block(&func.body)?;
        // Void functions may fall off the end without an explicit
        // return statement.
        if func.ret == Type::Void
            && !matches!(self.out.last(), Some(EmittedUnit::Inst(Inst::Ret { .. })))
        {
            self.inst(Inst::Ret { has_value: false });
        }
        self.out.push(EmittedUnit::FuncEnd);
        Ok(())
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        // An already-folded subtree collapses to one push.
        if let Some(value) = self.resolved.constants.get(expr.id) {
            self.inst(Inst::Push(value.clone()));
            return self.apply_coercion(expr);
        }
        match &expr.kind {
            ExprKind::Literal(value) => self.inst(Inst::Push(value.clone())),
            ExprKind::Var(name) => self.inst(Inst::Load(name.clone())),
            ExprKind::Unary { op, operand } => {
                self.emit_expr(operand)?;
                let ty = self.expr_type(expr)?;
                self.inst(Inst::Unary { op: *op, ty });
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                // The operator executes at the widened operand type,
                // not the result type (relational results are bool).
                let ty = self.effective_type(lhs)?;
                self.inst(Inst::Binary { op: *op, ty });
            }
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.emit_expr(arg)?;
                }
                self.inst(Inst::Call {
                    name: callee.name.clone(),
                    argc: args.len(),
                });
            }
        }
        self.apply_coercion(expr)
    }

    /// Emit the widening recorded by the analyzer for this use site.
    fn apply_coercion(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        if let Some(to) = self.resolved.coercions.get(expr.id) {
            let from = self.expr_type(expr)?;
            self.inst(Inst::Promote { from, to: *to });
        }
        Ok(())
    }
}

/// The zero value a declaration without an initializer stores.
fn default_value(ty: Type) -> Option<Value> {
    match ty {
        Type::Bool => Some(Value::Bool(false)),
        Type::Char => Some(Value::Char('\0')),
        Type::Short => Some(Value::Short(0)),
        Type::Int => Some(Value::Int(0)),
        Type::Long => Some(Value::Long(0)),
        Type::Float => Some(Value::Float(0.0)),
        Type::Double => Some(Value::Double(0.0)),
        Type::Str => Some(Value::Str(alloc::string::String::new())),
        Type::Void => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::typecheck::analyze;
    use alloc::string::{String, ToString};

    fn emit(source: &str) -> Vec<String> {
        let tokens = tokenize(source).expect("tokenize");
        let program = parse(&tokens, source).expect("parse");
        let resolved = analyze(program).expect("analyze");
        generate(&resolved)
            .expect("generate")
            .iter()
            .map(|unit| unit.to_string())
            .collect()
    }

    #[test]
    fn folded_initializer_collapses_to_one_push() {
        assert_eq!(
            emit("int x = 2 + 3;"),
            ["reserve x int", "push int 5", "store x"]
        );
    }

    #[test]
    fn missing_initializer_stores_the_default() {
        assert_eq!(
            emit("double d;"),
            ["reserve d double", "push double 0.0", "store d"]
        );
    }

    #[test]
    fn widening_emits_a_promote() {
        assert_eq!(
            emit("long y = 1;"),
            ["reserve y long", "push int 1", "promote int -> long", "store y"]
        );
    }

    #[test]
    fn operands_push_left_to_right_before_operator() {
        assert_eq!(
            emit("int a;\nint b;\nint c = a + b;"),
            [
                "reserve a int",
                "push int 0",
                "store a",
                "reserve b int",
                "push int 0",
                "store b",
                "reserve c int",
                "load a",
                "load b",
                "add int",
                "store c"
            ]
        );
    }

    #[test]
    fn mixed_operands_widen_before_the_operator() {
        assert_eq!(
            emit("int a;\ndouble d = a + 1.5;"),
            [
                "reserve a int",
                "push int 0",
                "store a",
                "reserve d double",
                "load a",
                "promote int -> double",
                "push double 1.5",
                "add double",
                "store d"
            ]
        );
    }

    #[test]
    fn if_else_lowers_to_branch_and_labels() {
        let lines = emit(
            "int sign(int n) {\n\
             if (n < 0) { return -1; } else { return 1; }\n\
             }",
        );
        assert_eq!(
            lines,
            [
                "func sign(n int) int",
                "load n",
                "push int 0",
                "lt int",
                "br_false .L0",
                "push int -1",
                "ret value",
                "br .L1",
                ".L0:",
                "push int 1",
                "ret value",
                ".L1:",
                "endfunc"
            ]
        );
    }

    #[test]
    fn statement_call_pops_unused_result() {
        let lines = emit(
            "int one() { return 1; }\n\
             void noop() { }\n\
             one();\n\
             noop();",
        );
        let tail = &lines[lines.len() - 3..];
        assert_eq!(tail, ["call one 0", "pop", "call noop 0"]);
    }

    #[test]
    fn void_function_gets_implicit_return() {
        let lines = emit("void f() { int x; }");
        assert_eq!(
            lines,
            [
                "func f() void",
                "reserve x int",
                "push int 0",
                "store x",
                "ret",
                "endfunc"
            ]
        );
    }

    #[test]
    fn call_arguments_widen_per_parameter() {
        let lines = emit(
            "void take(long a, double b) { }\n\
             take(1, 2);",
        );
        let tail = &lines[lines.len() - 5..];
        assert_eq!(
            tail,
            [
                "push int 1",
                "promote int -> long",
                "push int 2",
                "promote int -> double",
                "call take 2"
            ]
        );
    }
}
