//! Semantic analysis for Sable.
//!
//! A single top-down walk validates scope and type rules and produces
//! a [`ResolvedProgram`]: the original tree plus side tables of
//! resolved expression types, widening coercions, folded constants and
//! function signatures, all keyed by [`ExprId`]. The code generator
//! consumes those tables without re-deriving anything.
//!
//! Top-level function signatures are hoisted in a pre-pass, so call
//! sites may precede declarations textually. Errors are collected
//! across the whole program and returned together; an unresolvable
//! subexpression silences only the checks that would depend on its
//! type, never the rest of the walk.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::ast::{
    BinOp, Expr, ExprId, ExprKind, FuncDecl, Ident, Program, Stmt, StmtKind, Type, UnOp, Value,
};
use crate::error::{SemanticError, SemanticErrorKind};
use crate::span::Span;

/// Resolved signature of a declared function, keyed by name in the
/// analyzer's function table.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub span: Span,
}

/// Dense side table keyed by [`ExprId`].
#[derive(Debug, Clone)]
pub struct ExprTable<T> {
    entries: Vec<Option<T>>,
}

impl<T> ExprTable<T> {
    fn new(len: u32) -> ExprTable<T> {
        ExprTable {
            entries: (0..len).map(|_| None).collect(),
        }
    }

    fn set(&mut self, id: ExprId, value: T) {
        if let Some(slot) = self.entries.get_mut(id.0 as usize) {
            *slot = Some(value);
        }
    }

    pub fn get(&self, id: ExprId) -> Option<&T> {
        self.entries.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }
}

/// Output of successful analysis: the unchanged AST plus everything
/// the code generator needs.
///
/// `coercions` records the widening target for every expression used
/// where a wider type is required (binary operands, initializers,
/// assignments, call arguments, returns). `constants` holds the folded
/// value of literal-only subtrees.
#[derive(Debug)]
pub struct ResolvedProgram {
    pub program: Program,
    pub expr_types: ExprTable<Type>,
    pub coercions: ExprTable<Type>,
    pub constants: ExprTable<Value>,
    pub functions: BTreeMap<String, FunctionInfo>,
}

/// Validate a program against the scope and type rules.
///
/// On success returns the [`ResolvedProgram`]; on failure, every
/// independently detectable error found in one pass.
pub fn analyze(program: Program) -> Result<ResolvedProgram, Vec<SemanticError>> {
    let mut analyzer = Analyzer::new(program.expr_count);
    analyzer.hoist_functions(&program.stmts);
    for stmt in &program.stmts {
        analyzer.check_stmt(stmt);
    }
    if analyzer.errors.is_empty() {
        Ok(ResolvedProgram {
            program,
            expr_types: analyzer.expr_types,
            coercions: analyzer.coercions,
            constants: analyzer.constants,
            functions: analyzer.functions,
        })
    } else {
        Err(analyzer.errors)
    }
}

// ---------------------------------------------------------------------
// Widening rules
// ---------------------------------------------------------------------

/// Position on the short -> int -> long -> float -> double chain.
fn rank(ty: Type) -> Option<u8> {
    match ty {
        Type::Short => Some(0),
        Type::Int => Some(1),
        Type::Long => Some(2),
        Type::Float => Some(3),
        Type::Double => Some(4),
        _ => None,
    }
}

/// Exact match or a strictly widening numeric conversion. Narrowing is
/// never implicit.
pub fn assignable(from: Type, to: Type) -> bool {
    if from == to {
        return true;
    }
    match (rank(from), rank(to)) {
        (Some(from), Some(to)) => from < to,
        _ => false,
    }
}

/// The wider of two numeric types, or None when either is non-numeric.
fn common_numeric(a: Type, b: Type) -> Option<Type> {
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => Some(if ra >= rb { a } else { b }),
        _ => None,
    }
}

// ---------------------------------------------------------------------
// Scope stack
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct VarInfo {
    ty: Type,
    span: Span,
}

/// Explicit stack of lexical scopes, innermost last. One scope per
/// block; the bottom scope is the global one and is never popped.
#[derive(Debug)]
struct ScopeStack {
    scopes: Vec<BTreeMap<String, VarInfo>>,
}

impl ScopeStack {
    fn new() -> ScopeStack {
        ScopeStack {
            scopes: vec![BTreeMap::new()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn at_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Declare in the innermost scope. On a duplicate, returns the
    /// span of the previous declaration.
    fn declare(&mut self, name: &str, info: VarInfo) -> Result<(), Span> {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return Ok(()),
        };
        if let Some(previous) = scope.get(name) {
            return Err(previous.span);
        }
        scope.insert(name.to_string(), info);
        Ok(())
    }

    /// Innermost-first lookup through the scope chain.
    fn lookup(&self, name: &str) -> Option<VarInfo> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}

// ---------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------

struct Analyzer {
    scopes: ScopeStack,
    functions: BTreeMap<String, FunctionInfo>,
    expr_types: ExprTable<Type>,
    coercions: ExprTable<Type>,
    constants: ExprTable<Value>,
    errors: Vec<SemanticError>,
    /// Return type of the function body being checked.
    current_ret: Option<Type>,
}

impl Analyzer {
    fn new(expr_count: u32) -> Analyzer {
        Analyzer {
            scopes: ScopeStack::new(),
            functions: BTreeMap::new(),
            expr_types: ExprTable::new(expr_count),
            coercions: ExprTable::new(expr_count),
            constants: ExprTable::new(expr_count),
            errors: Vec::new(),
            current_ret: None,
        }
    }

    fn error(&mut self, kind: SemanticErrorKind, span: Span) {
        self.errors.push(SemanticError::new(kind, span));
    }

    fn type_mismatch(&mut self, message: String, span: Span) {
        self.error(SemanticErrorKind::TypeMismatch(message), span);
    }

    /// Record a widening for codegen when the found type differs from
    /// the required one.
    fn coerce(&mut self, id: ExprId, from: Type, to: Type) {
        if from != to {
            self.coercions.set(id, to);
        }
    }

    fn hoist_functions(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let StmtKind::FuncDecl(func) = &stmt.kind {
                if let Some(previous) = self.functions.get(&func.name.name) {
                    let previous = previous.span;
                    self.error(
                        SemanticErrorKind::DuplicateDeclaration {
                            name: func.name.name.clone(),
                            previous,
                        },
                        func.name.span,
                    );
                    continue;
                }
                self.functions.insert(
                    func.name.name.clone(),
                    FunctionInfo {
                        name: func.name.name.clone(),
                        params: func.params.iter().map(|p| p.ty).collect(),
                        ret: func.ret,
                        span: func.name.span,
                    },
                );
            }
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { ty, name, init } => {
                if let Some(init) = init {
                    if let Some(found) = self.check_expr(init) {
                        if assignable(found, *ty) {
                            self.coerce(init.id, found, *ty);
                        } else {
                            self.type_mismatch(
                                format!("expected {ty}, found {found}"),
                                init.span,
                            );
                        }
                    }
                }
                // Top-level variables share the global namespace with
                // hoisted functions.
                if self.scopes.at_global() {
                    if let Some(func) = self.functions.get(&name.name) {
                        let previous = func.span;
                        self.error(
                            SemanticErrorKind::DuplicateDeclaration {
                                name: name.name.clone(),
                                previous,
                            },
                            name.span,
                        );
                    }
                }
                // Declare even after a bad initializer so later uses
                // do not cascade into UndeclaredVariable.
                if let Err(previous) = self.scopes.declare(
                    &name.name,
                    VarInfo {
                        ty: *ty,
                        span: name.span,
                    },
                ) {
                    self.error(
                        SemanticErrorKind::DuplicateDeclaration {
                            name: name.name.clone(),
                            previous,
                        },
                        name.span,
                    );
                }
            }
            StmtKind::VarAsgn { target, value } => {
                let found = self.check_expr(value);
                match self.scopes.lookup(&target.name) {
                    None => self.error(
                        SemanticErrorKind::UndeclaredVariable(target.name.clone()),
                        target.span,
                    ),
                    Some(var) => {
                        if let Some(found) = found {
                            if assignable(found, var.ty) {
                                self.coerce(value.id, found, var.ty);
                            } else {
                                self.type_mismatch(
                                    format!(
                                        "cannot assign {found} to '{}' of type {}",
                                        target.name, var.ty
                                    ),
                                    value.span,
                                );
                            }
                        }
                    }
                }
            }
            StmtKind::FuncDecl(func) => self.check_func_decl(func),
            StmtKind::Call(expr) => {
                self.check_expr(expr);
            }
            StmtKind::IfElse {
                cond,
                then_block,
                else_block,
            } => {
                if let Some(found) = self.check_expr(cond) {
                    if found != Type::Bool {
                        self.type_mismatch(
                            format!("if condition must be bool, found {found}"),
                            cond.span,
                        );
                    }
                }
                self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }
            StmtKind::Return { value } => self.check_return(value.as_ref(), stmt.span),
        }
    }

    fn check_block(&mut self, block: &[Stmt]) {
        self.scopes.push();
        for stmt in block {
            self.check_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn check_func_decl(&mut self, func: &FuncDecl) {
        // Parameters and the body's outermost block share one scope.
        self.current_ret = Some(func.ret);
        self.scopes.push();
        for param in &func.params {
            if let Err(previous) = self.scopes.declare(
                &param.name.name,
                VarInfo {
                    ty: param.ty,
                    span: param.name.span,
                },
            ) {
                self.error(
                    SemanticErrorKind::DuplicateDeclaration {
                        name: param.name.name.clone(),
                        previous,
                    },
                    param.name.span,
                );
            }
        }
        for stmt in &func.body {
            self.check_stmt(stmt);
        }
        self.scopes.pop();
        self.current_ret = None;

        if func.ret != Type::Void && !block_returns(&func.body) {
            self.error(
                SemanticErrorKind::MissingReturn(func.name.name.clone()),
                func.name.span,
            );
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, stmt_span: Span) {
        // The parser rejects top-level returns, so a missing enclosing
        // return type means a malformed tree; nothing to check.
        let Some(ret) = self.current_ret else {
            return;
        };
        match value {
            None => {
                if ret != Type::Void {
                    self.type_mismatch(
                        format!("function returns {ret} but 'return' has no value"),
                        stmt_span,
                    );
                }
            }
            Some(expr) => {
                let found = self.check_expr(expr);
                if ret == Type::Void {
                    self.type_mismatch(
                        "cannot return a value from a void function".to_string(),
                        expr.span,
                    );
                } else if let Some(found) = found {
                    if assignable(found, ret) {
                        self.coerce(expr.id, found, ret);
                    } else {
                        self.type_mismatch(
                            format!("cannot return {found} from a function returning {ret}"),
                            expr.span,
                        );
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// Resolve the type of an expression, recording it in the side
    /// table. Returns None when the expression cannot be resolved;
    /// the error is already recorded in that case.
    fn check_expr(&mut self, expr: &Expr) -> Option<Type> {
        let ty = match &expr.kind {
            ExprKind::Literal(value) => {
                self.constants.set(expr.id, value.clone());
                Some(value.ty())
            }
            ExprKind::Var(name) => match self.scopes.lookup(name) {
                Some(var) => Some(var.ty),
                None => {
                    self.error(SemanticErrorKind::UndeclaredVariable(name.clone()), expr.span);
                    None
                }
            },
            ExprKind::Unary { op, operand } => self.check_unary(expr, *op, operand),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(expr, *op, lhs, rhs),
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.span),
        };
        if let Some(ty) = ty {
            self.expr_types.set(expr.id, ty);
        }
        ty
    }

    fn check_unary(&mut self, expr: &Expr, op: UnOp, operand: &Expr) -> Option<Type> {
        let ty = self.check_expr(operand)?;
        let result = match op {
            UnOp::Neg if ty.is_numeric() => ty,
            UnOp::Not if ty == Type::Bool => Type::Bool,
            _ => {
                self.type_mismatch(
                    format!("operator '{}' cannot be applied to {ty}", op.symbol()),
                    expr.span,
                );
                return None;
            }
        };
        if let Some(value) = self.constants.get(operand.id).cloned() {
            if let Some(folded) = fold_unary(op, &value) {
                self.constants.set(expr.id, folded);
            }
        }
        Some(result)
    }

    fn check_binary(&mut self, expr: &Expr, op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Type> {
        let lt = self.check_expr(lhs);
        let rt = self.check_expr(rhs);
        let (lt, rt) = (lt?, rt?);

        // (type the operator executes at, type of the result)
        let tys = if op.is_arithmetic() {
            common_numeric(lt, rt).map(|common| (common, common))
        } else if op.is_relational() {
            common_numeric(lt, rt).map(|common| (common, Type::Bool))
        } else if op.is_equality() {
            // Numeric operands widen to a common type; otherwise both
            // sides must be the same non-numeric category.
            match common_numeric(lt, rt) {
                Some(common) => Some((common, Type::Bool)),
                None if lt == rt && matches!(lt, Type::Bool | Type::Char | Type::Str) => {
                    Some((lt, Type::Bool))
                }
                None => None,
            }
        } else {
            (lt == Type::Bool && rt == Type::Bool).then_some((Type::Bool, Type::Bool))
        };

        let Some((operand_ty, result_ty)) = tys else {
            self.type_mismatch(
                format!(
                    "operator '{}' cannot be applied to {lt} and {rt}",
                    op.symbol()
                ),
                expr.span,
            );
            return None;
        };
        self.coerce(lhs.id, lt, operand_ty);
        self.coerce(rhs.id, rt, operand_ty);

        if let (Some(lv), Some(rv)) = (
            self.constants.get(lhs.id).cloned(),
            self.constants.get(rhs.id).cloned(),
        ) {
            if let (Some(lv), Some(rv)) =
                (widen_const(&lv, operand_ty), widen_const(&rv, operand_ty))
            {
                if let Some(folded) = fold_binary(op, &lv, &rv) {
                    self.constants.set(expr.id, folded);
                }
            }
        }
        Some(result_ty)
    }

    fn check_call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> Option<Type> {
        // Check the arguments regardless, so their own errors surface
        // even when the callee is unknown.
        let arg_types: Vec<Option<Type>> = args.iter().map(|arg| self.check_expr(arg)).collect();

        let Some(info) = self.functions.get(&callee.name).cloned() else {
            self.error(
                SemanticErrorKind::UnknownFunction(callee.name.clone()),
                callee.span,
            );
            return None;
        };
        if args.len() != info.params.len() {
            self.error(
                SemanticErrorKind::ArityMismatch {
                    name: callee.name.clone(),
                    expected: info.params.len(),
                    given: args.len(),
                },
                span,
            );
            return Some(info.ret);
        }
        for (index, ((arg, found), expected)) in
            args.iter().zip(&arg_types).zip(&info.params).enumerate()
        {
            let Some(found) = *found else { continue };
            if assignable(found, *expected) {
                self.coerce(arg.id, found, *expected);
            } else {
                self.error(
                    SemanticErrorKind::ArgumentTypeMismatch {
                        name: callee.name.clone(),
                        index: index + 1,
                        expected: *expected,
                        given: found,
                    },
                    arg.span,
                );
            }
        }
        Some(info.ret)
    }
}

// ---------------------------------------------------------------------
// Structural return analysis
// ---------------------------------------------------------------------

/// A block definitely returns when any of its statements does; an
/// if/else counts only when both branches definitely return.
fn block_returns(block: &[Stmt]) -> bool {
    block.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return { .. } => true,
        StmtKind::IfElse {
            then_block,
            else_block: Some(else_block),
            ..
        } => block_returns(then_block) && block_returns(else_block),
        _ => false,
    }
}

// ---------------------------------------------------------------------
// Constant folding
// ---------------------------------------------------------------------

/// Widen a constant along the numeric chain; None when the conversion
/// would not be a pure widening.
fn widen_const(value: &Value, to: Type) -> Option<Value> {
    if value.ty() == to {
        return Some(value.clone());
    }
    Some(match (value, to) {
        (Value::Short(v), Type::Int) => Value::Int(i32::from(*v)),
        (Value::Short(v), Type::Long) => Value::Long(i64::from(*v)),
        (Value::Short(v), Type::Float) => Value::Float(f32::from(*v)),
        (Value::Short(v), Type::Double) => Value::Double(f64::from(*v)),
        (Value::Int(v), Type::Long) => Value::Long(i64::from(*v)),
        (Value::Int(v), Type::Float) => Value::Float(*v as f32),
        (Value::Int(v), Type::Double) => Value::Double(f64::from(*v)),
        (Value::Long(v), Type::Float) => Value::Float(*v as f32),
        (Value::Long(v), Type::Double) => Value::Double(*v as f64),
        (Value::Float(v), Type::Double) => Value::Double(f64::from(*v)),
        _ => return None,
    })
}

fn fold_unary(op: UnOp, value: &Value) -> Option<Value> {
    Some(match (op, value) {
        (UnOp::Neg, Value::Short(v)) => Value::Short(v.wrapping_neg()),
        (UnOp::Neg, Value::Int(v)) => Value::Int(v.wrapping_neg()),
        (UnOp::Neg, Value::Long(v)) => Value::Long(v.wrapping_neg()),
        (UnOp::Neg, Value::Float(v)) => Value::Float(-v),
        (UnOp::Neg, Value::Double(v)) => Value::Double(-v),
        (UnOp::Not, Value::Bool(v)) => Value::Bool(!v),
        _ => return None,
    })
}

/// Fold a binary operation over two constants already widened to the
/// same type. Integer division/remainder by a zero constant is not
/// folded; that is left to the target runtime.
fn fold_binary(op: BinOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Short(a), Value::Short(b)) => fold_i16(op, *a, *b),
        (Value::Int(a), Value::Int(b)) => fold_i32(op, *a, *b),
        (Value::Long(a), Value::Long(b)) => fold_i64(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => fold_f32(op, *a, *b),
        (Value::Double(a), Value::Double(b)) => fold_f64(op, *a, *b),
        (Value::Bool(a), Value::Bool(b)) => fold_bool(op, *a, *b),
        (Value::Char(a), Value::Char(b)) => fold_equality(op, a == b),
        (Value::Str(a), Value::Str(b)) => fold_equality(op, a == b),
        _ => None,
    }
}

fn fold_i16(op: BinOp, a: i16, b: i16) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Short(a.wrapping_add(b)),
        BinOp::Sub => Value::Short(a.wrapping_sub(b)),
        BinOp::Mul => Value::Short(a.wrapping_mul(b)),
        BinOp::Div if b != 0 => Value::Short(a.wrapping_div(b)),
        BinOp::Rem if b != 0 => Value::Short(a.wrapping_rem(b)),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        _ => return None,
    })
}

fn fold_i32(op: BinOp, a: i32, b: i32) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Div if b != 0 => Value::Int(a.wrapping_div(b)),
        BinOp::Rem if b != 0 => Value::Int(a.wrapping_rem(b)),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        _ => return None,
    })
}

fn fold_i64(op: BinOp, a: i64, b: i64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Long(a.wrapping_add(b)),
        BinOp::Sub => Value::Long(a.wrapping_sub(b)),
        BinOp::Mul => Value::Long(a.wrapping_mul(b)),
        BinOp::Div if b != 0 => Value::Long(a.wrapping_div(b)),
        BinOp::Rem if b != 0 => Value::Long(a.wrapping_rem(b)),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        _ => return None,
    })
}

fn fold_f32(op: BinOp, a: f32, b: f32) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Rem => Value::Float(a % b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        _ => return None,
    })
}

fn fold_f64(op: BinOp, a: f64, b: f64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Double(a + b),
        BinOp::Sub => Value::Double(a - b),
        BinOp::Mul => Value::Double(a * b),
        BinOp::Div => Value::Double(a / b),
        BinOp::Rem => Value::Double(a % b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        _ => return None,
    })
}

fn fold_bool(op: BinOp, a: bool, b: bool) -> Option<Value> {
    Some(match op {
        BinOp::And => Value::Bool(a && b),
        BinOp::Or => Value::Bool(a || b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        _ => return None,
    })
}

fn fold_equality(op: BinOp, equal: bool) -> Option<Value> {
    match op {
        BinOp::Eq => Some(Value::Bool(equal)),
        BinOp::Ne => Some(Value::Bool(!equal)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn analyze_source(source: &str) -> Result<ResolvedProgram, Vec<SemanticError>> {
        let tokens = tokenize(source).expect("tokenize");
        analyze(parse(&tokens, source).expect("parse"))
    }

    #[test]
    fn scope_stack_looks_up_innermost_first() {
        let mut scopes = ScopeStack::new();
        let outer = VarInfo {
            ty: Type::Int,
            span: Span::new(0, 1),
        };
        let inner = VarInfo {
            ty: Type::Bool,
            span: Span::new(2, 3),
        };
        scopes.declare("x", outer).expect("declare outer");
        scopes.push();
        scopes.declare("x", inner).expect("shadow in nested scope");
        assert_eq!(scopes.lookup("x").map(|v| v.ty), Some(Type::Bool));
        scopes.pop();
        assert_eq!(scopes.lookup("x").map(|v| v.ty), Some(Type::Int));
    }

    #[test]
    fn scope_stack_rejects_same_scope_duplicate() {
        let mut scopes = ScopeStack::new();
        let info = VarInfo {
            ty: Type::Int,
            span: Span::new(0, 1),
        };
        scopes.declare("x", info).expect("first declaration");
        assert_eq!(scopes.declare("x", info), Err(Span::new(0, 1)));
    }

    #[test]
    fn scope_stack_allows_redeclaration_after_pop() {
        let mut scopes = ScopeStack::new();
        let info = VarInfo {
            ty: Type::Int,
            span: Span::new(0, 1),
        };
        scopes.push();
        scopes.declare("x", info).expect("declare");
        scopes.pop();
        scopes.push();
        scopes.declare("x", info).expect("same name in a disjoint scope");
    }

    #[test]
    fn return_analysis_requires_both_branches() {
        let source = "int f(int a) { if (a > 0) { return 1; } }";
        let errs = analyze_source(source).expect_err("missing return");
        assert!(matches!(
            errs[0].kind,
            SemanticErrorKind::MissingReturn(_)
        ));

        let source = "int f(int a) { if (a > 0) { return 1; } else { return 2; } }";
        analyze_source(source).expect("both branches return");
    }

    #[test]
    fn folds_literal_subtrees() {
        let resolved = analyze_source("int x = 2 + 3 * 4;").expect("analyze");
        // The initializer is the root binary expression.
        let init_id = match &resolved.program.stmts[0].kind {
            StmtKind::VarDecl { init, .. } => init.as_ref().map(|e| e.id),
            _ => None,
        };
        let init_id = init_id.expect("initializer id");
        assert_eq!(resolved.constants.get(init_id), Some(&Value::Int(14)));
        assert_eq!(resolved.expr_types.get(init_id), Some(&Type::Int));
    }

    #[test]
    fn does_not_fold_division_by_zero() {
        let resolved = analyze_source("int x = 1 / 0;").expect("analyze");
        let init_id = match &resolved.program.stmts[0].kind {
            StmtKind::VarDecl { init, .. } => init.as_ref().map(|e| e.id),
            _ => None,
        };
        assert_eq!(resolved.constants.get(init_id.expect("id")), None);
    }

    #[test]
    fn records_widening_coercion_for_initializer() {
        let resolved = analyze_source("long y = 1;").expect("analyze");
        let init_id = match &resolved.program.stmts[0].kind {
            StmtKind::VarDecl { init, .. } => init.as_ref().map(|e| e.id),
            _ => None,
        };
        assert_eq!(
            resolved.coercions.get(init_id.expect("id")),
            Some(&Type::Long)
        );
    }

    #[test]
    fn hoisting_allows_calls_before_declaration() {
        let source = "int main() { return helper(); }\nint helper() { return 1; }";
        analyze_source(source).expect("forward call resolves via hoisting");
    }

    #[test]
    fn collects_multiple_errors_in_one_pass() {
        let source = "int x = yes;\nbool b = 1;";
        let errs = analyze_source(source).expect_err("two independent errors");
        assert_eq!(errs.len(), 2);
        assert!(matches!(
            errs[0].kind,
            SemanticErrorKind::UndeclaredVariable(_)
        ));
        assert!(matches!(errs[1].kind, SemanticErrorKind::TypeMismatch(_)));
    }
}
