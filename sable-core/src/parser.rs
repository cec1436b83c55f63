//! Recursive-descent parser for Sable.
//!
//! One production per statement and expression form. Binary
//! expressions use precedence climbing over a fixed binding-power
//! table; parentheses reset precedence. Parsing halts at the first
//! grammar violation — there is no error recovery, because no
//! meaningful partial tree exists to continue with.
//!
//! Literal text is converted to [`Value`]s here, so the analyzer and
//! code generator never look at raw lexemes.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::ast::{
    BinOp, Block, Expr, ExprId, ExprKind, FuncDecl, Ident, Param, Program, Stmt, StmtKind, Type,
    UnOp, Value,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{self, Token, TokenKind};
use crate::span::Span;

/// Parse a token sequence into a program.
///
/// `source` is the text the tokens were lexed from; tokens reference
/// it by byte offsets.
pub fn parse(tokens: &[Token], source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser {
        tokens,
        source,
        pos: 0,
        next_expr_id: 0,
    };
    parser.parse_program()
}

/// Where a statement appears; controls which forms are legal there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StmtPos {
    TopLevel,
    FuncBody,
}

struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    pos: usize,
    next_expr_id: u32,
}

impl<'a> Parser<'a> {
    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            stmts.push(self.parse_stmt(StmtPos::TopLevel)?);
        }
        Ok(Program {
            stmts,
            expr_count: self.next_expr_id,
        })
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_stmt(&mut self, pos: StmtPos) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            kind if type_keyword(kind).is_some() => self.parse_decl(pos),
            TokenKind::KwIf => self.parse_if_else(pos),
            TokenKind::KwReturn => {
                if pos == StmtPos::TopLevel {
                    return Err(ParseError::new(
                        ParseErrorKind::ReturnOutsideFunction,
                        self.peek().span,
                    ));
                }
                self.parse_return()
            }
            TokenKind::Ident => match self.peek_second_kind() {
                TokenKind::LParen => self.parse_call_stmt(),
                TokenKind::Equal
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq => self.parse_asgn_stmt(),
                _ => {
                    self.bump();
                    Err(self.unexpected("'=' or '(' after the identifier"))
                }
            },
            TokenKind::KwWhile
            | TokenKind::KwFor
            | TokenKind::KwLet
            | TokenKind::KwFun
            | TokenKind::KwConst => {
                let token = self.bump();
                Err(ParseError::new(
                    ParseErrorKind::ReservedWord(token.lexeme(self.source).to_string()),
                    token.span,
                ))
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// Shared entry for `type name ...`: a '(' after the name makes it
    /// a function declaration, anything else a variable declaration.
    fn parse_decl(&mut self, pos: StmtPos) -> Result<Stmt, ParseError> {
        let ty_token = self.bump();
        let ty = match type_keyword(ty_token.kind) {
            Some(ty) => ty,
            None => return Err(self.unexpected("a type")),
        };
        let name_token = self.expect(TokenKind::Ident, "an identifier")?;
        let name = self.ident(name_token);

        if self.at(TokenKind::LParen) {
            if pos == StmtPos::FuncBody {
                return Err(ParseError::new(
                    ParseErrorKind::NestedFunction,
                    ty_token.span.join(name.span),
                ));
            }
            return self.parse_func_decl(ty_token, ty, name);
        }

        if ty == Type::Void {
            return Err(self.unexpected("'(' (void is only valid as a function return type)"));
        }
        let init = if self.eat(TokenKind::Equal).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt {
            kind: StmtKind::VarDecl { ty, name, init },
            span: ty_token.span.join(semi.span),
        })
    }

    fn parse_func_decl(
        &mut self,
        ty_token: Token,
        ret: Type,
        name: Ident,
    ) -> Result<Stmt, ParseError> {
        self.bump(); // '(' checked by the caller
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let pty = match type_keyword(self.peek_kind()) {
                    Some(ty) if ty != Type::Void => {
                        self.bump();
                        ty
                    }
                    _ => return Err(self.unexpected("a parameter type")),
                };
                let pname = self.expect(TokenKind::Ident, "a parameter name")?;
                params.push(Param {
                    name: self.ident(pname),
                    ty: pty,
                });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let (body, body_end) = self.parse_block(StmtPos::FuncBody)?;
        Ok(Stmt {
            span: ty_token.span.join(body_end),
            kind: StmtKind::FuncDecl(FuncDecl {
                name,
                ret,
                params,
                body,
            }),
        })
    }

    fn parse_asgn_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name_token = self.bump();
        let target = self.ident(name_token);
        let op_token = self.bump();
        let value = self.parse_expr()?;
        let value = match op_token.kind {
            TokenKind::Equal => value,
            TokenKind::PlusEq => self.desugar_compound(BinOp::Add, &target, value),
            TokenKind::MinusEq => self.desugar_compound(BinOp::Sub, &target, value),
            TokenKind::StarEq => self.desugar_compound(BinOp::Mul, &target, value),
            TokenKind::SlashEq => self.desugar_compound(BinOp::Div, &target, value),
            TokenKind::PercentEq => self.desugar_compound(BinOp::Rem, &target, value),
            _ => return Err(self.unexpected("an assignment operator")),
        };
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt {
            kind: StmtKind::VarAsgn { target, value },
            span: name_token.span.join(semi.span),
        })
    }

    /// Rewrite `x <op>= e` into `x = x <op> e`.
    fn desugar_compound(&mut self, op: BinOp, target: &Ident, rhs: Expr) -> Expr {
        let lhs = Expr {
            id: self.fresh_id(),
            kind: ExprKind::Var(target.name.clone()),
            span: target.span,
        };
        let span = target.span.join(rhs.span);
        Expr {
            id: self.fresh_id(),
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        }
    }

    fn parse_call_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_call_expr()?;
        let semi = self.expect(TokenKind::Semi, "';'")?;
        let span = expr.span.join(semi.span);
        Ok(Stmt {
            kind: StmtKind::Call(expr),
            span,
        })
    }

    fn parse_if_else(&mut self, pos: StmtPos) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let (then_block, mut end_span) = self.parse_block(pos)?;

        let mut else_block = None;
        if self.eat(TokenKind::KwElse).is_some() {
            if self.at(TokenKind::KwIf) {
                // `else if` sugar: an else-block holding one nested if.
                let nested = self.parse_if_else(pos)?;
                end_span = nested.span;
                else_block = Some(alloc::vec![nested]);
            } else {
                let (block, close) = self.parse_block(pos)?;
                end_span = close;
                else_block = Some(block);
            }
        }
        Ok(Stmt {
            kind: StmtKind::IfElse {
                cond,
                then_block,
                else_block,
            },
            span: kw.span.join(end_span),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.bump();
        let value = if self.at(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let semi = self.expect(TokenKind::Semi, "';'")?;
        Ok(Stmt {
            kind: StmtKind::Return { value },
            span: kw.span.join(semi.span),
        })
    }

    fn parse_block(&mut self, pos: StmtPos) -> Result<(Block, Span), ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.parse_stmt(pos)?);
        }
        let close = self.bump();
        Ok((stmts, close.span))
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_expr(0)
    }

    /// Precedence climbing: consume operators while their binding
    /// power is at least `min_bp`, recursing with `bp + 1` for the
    /// right operand so equal-power operators associate left.
    fn parse_binary_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary_expr()?;
        while let Some((bp, op)) = binding_power(self.peek_kind()) {
            if bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_binary_expr(bp + 1)?;
            let span = lhs.span.join(rhs.span);
            lhs = Expr {
                id: self.fresh_id(),
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                let op_token = self.bump();
                let operand = self.parse_unary_expr()?;
                let span = op_token.span.join(operand.span);
                Ok(Expr {
                    id: self.fresh_id(),
                    kind: ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                })
            }
            None => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Ident => {
                if self.peek_second_kind() == TokenKind::LParen {
                    self.parse_call_expr()
                } else {
                    let token = self.bump();
                    Ok(Expr {
                        id: self.fresh_id(),
                        kind: ExprKind::Var(token.lexeme(self.source).to_string()),
                        span: token.span,
                    })
                }
            }
            TokenKind::BoolLiteral
            | TokenKind::CharLiteral
            | TokenKind::ShortLiteral
            | TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::StringLiteral => self.parse_literal(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call_expr(&mut self) -> Result<Expr, ParseError> {
        let name_token = self.bump();
        let callee = self.ident(name_token);
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen, "')'")?;
        Ok(Expr {
            id: self.fresh_id(),
            kind: ExprKind::Call { callee, args },
            span: name_token.span.join(close.span),
        })
    }

    fn parse_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.bump();
        let text = token.lexeme(self.source);
        let value = match token.kind {
            TokenKind::BoolLiteral => Value::Bool(text == "true"),
            TokenKind::ShortLiteral => {
                Value::Short(parse_number(text).ok_or_else(|| range_error("short", token.span))?)
            }
            TokenKind::IntLiteral => {
                Value::Int(parse_number(text).ok_or_else(|| range_error("int", token.span))?)
            }
            TokenKind::LongLiteral => {
                Value::Long(parse_number(text).ok_or_else(|| range_error("long", token.span))?)
            }
            TokenKind::FloatLiteral => {
                Value::Float(parse_number(text).ok_or_else(|| range_error("float", token.span))?)
            }
            TokenKind::DoubleLiteral => {
                Value::Double(parse_number(text).ok_or_else(|| range_error("double", token.span))?)
            }
            TokenKind::CharLiteral => {
                let content = lexer::unescape(&text[1..text.len() - 1]);
                Value::Char(content.chars().next().unwrap_or('\0'))
            }
            TokenKind::StringLiteral => {
                Value::Str(lexer::unescape(&text[1..text.len() - 1]))
            }
            _ => return Err(self.unexpected("a literal")),
        };
        Ok(Expr {
            id: self.fresh_id(),
            kind: ExprKind::Literal(value),
            span: token.span,
        })
    }

    // -----------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------

    fn peek(&self) -> Token {
        self.tokens.get(self.pos).copied().unwrap_or(Token {
            kind: TokenKind::Eof,
            span: Span::empty(self.source.len() as u32),
        })
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_second_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::new(ParseErrorKind::UnexpectedEof { expected }, token.span)
        } else {
            ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected,
                    found: token.lexeme(self.source).to_string(),
                },
                token.span,
            )
        }
    }

    fn ident(&self, token: Token) -> Ident {
        Ident {
            name: token.lexeme(self.source).to_string(),
            span: token.span,
        }
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        id
    }
}

fn type_keyword(kind: TokenKind) -> Option<Type> {
    match kind {
        TokenKind::KwBool => Some(Type::Bool),
        TokenKind::KwChar => Some(Type::Char),
        TokenKind::KwShort => Some(Type::Short),
        TokenKind::KwInt => Some(Type::Int),
        TokenKind::KwLong => Some(Type::Long),
        TokenKind::KwFloat => Some(Type::Float),
        TokenKind::KwDouble => Some(Type::Double),
        TokenKind::KwString => Some(Type::Str),
        TokenKind::KwVoid => Some(Type::Void),
        _ => None,
    }
}

fn binding_power(kind: TokenKind) -> Option<(u8, BinOp)> {
    match kind {
        TokenKind::OrOr => Some((1, BinOp::Or)),
        TokenKind::AndAnd => Some((2, BinOp::And)),
        TokenKind::EqualEqual => Some((3, BinOp::Eq)),
        TokenKind::BangEqual => Some((3, BinOp::Ne)),
        TokenKind::Less => Some((4, BinOp::Lt)),
        TokenKind::LessEqual => Some((4, BinOp::Le)),
        TokenKind::Greater => Some((4, BinOp::Gt)),
        TokenKind::GreaterEqual => Some((4, BinOp::Ge)),
        TokenKind::Plus => Some((5, BinOp::Add)),
        TokenKind::Minus => Some((5, BinOp::Sub)),
        TokenKind::Star => Some((6, BinOp::Mul)),
        TokenKind::Slash => Some((6, BinOp::Div)),
        TokenKind::Percent => Some((6, BinOp::Rem)),
        _ => None,
    }
}

/// Parse a numeric lexeme, dropping `_` separators and the optional
/// one-letter type suffix.
fn parse_number<T: core::str::FromStr>(text: &str) -> Option<T> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned
        .trim_end_matches(['s', 'S', 'l', 'L', 'f', 'F'])
        .parse()
        .ok()
}

fn range_error(ty: &'static str, span: Span) -> ParseError {
    ParseError::new(ParseErrorKind::LiteralOutOfRange(ty), span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use alloc::string::ToString;

    fn parse_source(source: &str) -> Program {
        let tokens = tokenize(source).expect("tokenize");
        parse(&tokens, source).expect("parse")
    }

    fn parse_err(source: &str) -> ParseError {
        let tokens = tokenize(source).expect("tokenize");
        parse(&tokens, source).expect_err("expected a parse error")
    }

    /// The printer fully parenthesizes, so printing a parse makes the
    /// tree shape visible in one string.
    fn printed(source: &str) -> String {
        parse_source(source).to_string()
    }

    #[test]
    fn parses_declaration_with_binary_initializer() {
        let program = parse_source("int x = 2 + 3;");
        assert_eq!(program.stmts.len(), 1);
        match &program.stmts[0].kind {
            StmtKind::VarDecl { ty, name, init } => {
                assert_eq!(*ty, Type::Int);
                assert_eq!(name.name, "x");
                let init = init.as_ref().expect("initializer");
                match &init.kind {
                    ExprKind::Binary { op, lhs, rhs } => {
                        assert_eq!(*op, BinOp::Add);
                        assert_eq!(lhs.kind, ExprKind::Literal(Value::Int(2)));
                        assert_eq!(rhs.kind, ExprKind::Literal(Value::Int(3)));
                    }
                    other => panic!("expected binary initializer, got {other:?}"),
                }
            }
            other => panic!("expected a variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(printed("int x = 1 + 2 * 3;"), "int x = (1 + (2 * 3));\n");
    }

    #[test]
    fn binary_operators_associate_left() {
        assert_eq!(printed("int x = 1 - 2 - 3;"), "int x = ((1 - 2) - 3);\n");
    }

    #[test]
    fn logical_and_binds_tighter_than_or() {
        assert_eq!(
            printed("bool b = true || false && true;"),
            "bool b = (true || (false && true));\n"
        );
    }

    #[test]
    fn comparison_binds_tighter_than_logical() {
        assert_eq!(
            printed("bool b = 1 < 2 && 3 == 4;"),
            "bool b = ((1 < 2) && (3 == 4));\n"
        );
    }

    #[test]
    fn parentheses_reset_precedence() {
        assert_eq!(printed("int x = (1 + 2) * 3;"), "int x = ((1 + 2) * 3);\n");
    }

    #[test]
    fn unary_binds_tightest() {
        assert_eq!(printed("int x = -2 * 3;"), "int x = ((-2) * 3);\n");
    }

    #[test]
    fn call_is_expression_or_statement_by_position() {
        let program = parse_source("int x = f(1);\ng(2);");
        assert!(matches!(&program.stmts[0].kind, StmtKind::VarDecl { .. }));
        match &program.stmts[1].kind {
            StmtKind::Call(expr) => assert!(matches!(&expr.kind, ExprKind::Call { .. })),
            other => panic!("expected a call statement, got {other:?}"),
        }
    }

    #[test]
    fn compound_assignment_desugars() {
        assert_eq!(printed("x += 2;"), "x = (x + 2);\n");
        assert_eq!(printed("x *= y + 1;"), "x = (x * (y + 1));\n");
    }

    #[test]
    fn parses_function_with_params_and_else_if_chain() {
        let source = "int f(int a, int b) {\n\
                      if (a < b) { return a; } else if (a == b) { return 0; } else { return b; }\n\
                      }";
        let program = parse_source(source);
        match &program.stmts[0].kind {
            StmtKind::FuncDecl(func) => {
                assert_eq!(func.params.len(), 2);
                match &func.body[0].kind {
                    StmtKind::IfElse { else_block, .. } => {
                        let else_block = else_block.as_ref().expect("else block");
                        assert!(matches!(else_block[0].kind, StmtKind::IfElse { .. }));
                    }
                    other => panic!("expected if/else, got {other:?}"),
                }
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nested_function_declaration() {
        let err = parse_err("void f() { int g() { return 1; } }");
        assert_eq!(err.kind, ParseErrorKind::NestedFunction);
    }

    #[test]
    fn rejects_return_at_top_level() {
        let err = parse_err("return 1;");
        assert_eq!(err.kind, ParseErrorKind::ReturnOutsideFunction);
    }

    #[test]
    fn rejects_reserved_words() {
        let err = parse_err("while (true) { }");
        assert_eq!(err.kind, ParseErrorKind::ReservedWord("while".to_string()));
    }

    #[test]
    fn rejects_void_variable() {
        let err = parse_err("void x;");
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn reports_missing_semicolon() {
        let err = parse_err("int x = 1");
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnexpectedEof { expected: "';'" }
        ));
    }

    #[test]
    fn rejects_out_of_range_int_literal() {
        let err = parse_err("int x = 99999999999;");
        assert_eq!(err.kind, ParseErrorKind::LiteralOutOfRange("int"));
    }

    #[test]
    fn long_literal_holds_what_int_cannot() {
        let program = parse_source("long x = 99999999999l;");
        match &program.stmts[0].kind {
            StmtKind::VarDecl { init, .. } => {
                let init = init.as_ref().expect("initializer");
                assert_eq!(init.kind, ExprKind::Literal(Value::Long(99_999_999_999)));
            }
            other => panic!("expected a variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn expression_ids_are_dense() {
        let program = parse_source("int x = 1 + 2;\nint y = x;");
        // 1, 2, (1 + 2), x — four expression nodes in total.
        assert_eq!(program.expr_count, 4);
    }
}
