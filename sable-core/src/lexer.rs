//! Lexer for Sable.
//!
//! A single left-to-right scan over the raw bytes with one byte of
//! lookahead (two for multi-character operators). Whitespace and `//`
//! comments are skipped and never emitted. Operators take the longest
//! match (`==` before `=`); identifiers and keywords take the maximal
//! munch and are split by a fixed keyword table. The first malformed
//! input aborts the scan.
//!
//! Tokens refer to slices of the source via byte offsets; the caller
//! is responsible for keeping the source alive as long as lexemes are
//! needed.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{LexError, LexErrorKind};
use crate::span::Span;

/// Kind of a token produced by the lexer.
///
/// The lexer attaches no semantic meaning beyond recognizing keywords
/// and classifying literals; numeric literal kinds come from the
/// suffix / decimal point / exponent of the lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    BoolLiteral, // true / false
    CharLiteral,
    ShortLiteral,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    StringLiteral,

    // Type keywords
    KwBool,
    KwChar,
    KwShort,
    KwInt,
    KwLong,
    KwFloat,
    KwDouble,
    KwString,
    KwVoid,

    // Statement keywords
    KwIf,
    KwElse,
    KwReturn,

    // Reserved words: tokenized here, rejected by the parser
    KwWhile,
    KwFor,
    KwLet,
    KwFun,
    KwConst,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    Equal,      // =
    EqualEqual, // ==
    BangEqual,  // !=
    Less,       // <
    LessEqual,  // <=
    Greater,    // >
    GreaterEqual, // >=
    Bang,       // !
    AndAnd,     // &&
    OrOr,       // ||

    // Punctuation
    Comma,  // ,
    Semi,   // ;
    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }
}

/// A single token with its kind and span. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// The exact source text this token was derived from.
    pub fn lexeme<'src>(&self, source: &'src str) -> &'src str {
        &source[self.span.start as usize..self.span.end as usize]
    }
}

/// Lex a source string into tokens.
///
/// Produces a finite, ordered, one-shot sequence terminated by an
/// explicit [`TokenKind::Eof`] token, or fails with the first
/// [`LexError`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        len: source.len(),
        index: 0,
    };
    lexer.run()
}

const ESCAPES: &[u8] = b"ntr\\'\"0";

/// Resolve the escape sequences in a validated literal body.
///
/// The lexer has already rejected unknown escapes, so this cannot
/// fail; the parser uses it to build char and string values.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    len: usize,
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }
            if ch == b'/' && self.peek_next() == Some(b'/') {
                self.skip_comment();
                continue;
            }

            let start = self.index as u32;
            let token = match ch {
                b'0'..=b'9' => self.lex_number(start)?,
                b'"' => self.lex_string(start)?,
                b'\'' => self.lex_char(start)?,
                _ => {
                    if is_ident_start(ch) {
                        self.lex_word(start)
                    } else {
                        self.lex_operator(start)?
                    }
                }
            };
            tokens.push(token);
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::empty(self.len as u32),
        });
        Ok(tokens)
    }

    fn token(&self, kind: TokenKind, start: u32) -> Token {
        Token {
            kind,
            span: Span::new(start, self.index as u32),
        }
    }

    fn lex_operator(&mut self, start: u32) -> Result<Token, LexError> {
        let ch = self.char_at(self.index);
        self.consume_char();
        let kind = match ch {
            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            '*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
            '/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '=' => self.with_eq(TokenKind::Equal, TokenKind::EqualEqual),
            '!' => self.with_eq(TokenKind::Bang, TokenKind::BangEqual),
            '<' => self.with_eq(TokenKind::Less, TokenKind::LessEqual),
            '>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEqual),
            '&' => {
                // Bitwise '&' is not an operator of the language.
                if self.peek_char() == Some(b'&') {
                    self.consume_char();
                    TokenKind::AndAnd
                } else {
                    return Err(self.unexpected(ch, start));
                }
            }
            '|' => {
                if self.peek_char() == Some(b'|') {
                    self.consume_char();
                    TokenKind::OrOr
                } else {
                    return Err(self.unexpected(ch, start));
                }
            }
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            other => return Err(self.unexpected(other, start)),
        };
        Ok(self.token(kind, start))
    }

    /// Longest-match helper for `<op>` vs `<op>=`.
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek_char() == Some(b'=') {
            self.consume_char();
            with_eq
        } else {
            plain
        }
    }

    fn unexpected(&mut self, ch: char, start: u32) -> LexError {
        // The first byte was already consumed; cover the whole char.
        self.index = start as usize + ch.len_utf8();
        LexError::new(
            LexErrorKind::UnexpectedCharacter(ch),
            Span::new(start, self.index as u32),
        )
    }

    fn lex_word(&mut self, start: u32) -> Token {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        let text = &self.source[start as usize..self.index];
        let kind = match text {
            "bool" => TokenKind::KwBool,
            "char" => TokenKind::KwChar,
            "short" => TokenKind::KwShort,
            "int" => TokenKind::KwInt,
            "long" => TokenKind::KwLong,
            "float" => TokenKind::KwFloat,
            "double" => TokenKind::KwDouble,
            "string" => TokenKind::KwString,
            "void" => TokenKind::KwVoid,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "return" => TokenKind::KwReturn,
            "while" => TokenKind::KwWhile,
            "for" => TokenKind::KwFor,
            "let" => TokenKind::KwLet,
            "fun" => TokenKind::KwFun,
            "const" => TokenKind::KwConst,
            "true" | "false" => TokenKind::BoolLiteral,
            _ => TokenKind::Ident,
        };
        self.token(kind, start)
    }

    fn lex_number(&mut self, start: u32) -> Result<Token, LexError> {
        self.consume_digits();

        let mut is_floating = false;
        if self.peek_char() == Some(b'.') {
            if let Some(next) = self.peek_next() {
                if next.is_ascii_digit() {
                    is_floating = true;
                    self.consume_char(); // '.'
                    self.consume_digits();
                }
            }
        }

        if matches!(self.peek_char(), Some(b'e') | Some(b'E')) {
            is_floating = true;
            self.consume_char();
            if matches!(self.peek_char(), Some(b'+') | Some(b'-')) {
                self.consume_char();
            }
            if !matches!(self.peek_char(), Some(b'0'..=b'9')) {
                return Err(LexError::new(
                    LexErrorKind::MalformedNumber("missing exponent digits"),
                    Span::new(start, self.index as u32),
                ));
            }
            self.consume_digits();
        }

        let kind = match self.peek_char() {
            Some(b's') | Some(b'S') => {
                if is_floating {
                    return Err(self.floating_suffix_error(start));
                }
                self.consume_char();
                TokenKind::ShortLiteral
            }
            Some(b'l') | Some(b'L') => {
                if is_floating {
                    return Err(self.floating_suffix_error(start));
                }
                self.consume_char();
                TokenKind::LongLiteral
            }
            Some(b'f') | Some(b'F') => {
                self.consume_char();
                TokenKind::FloatLiteral
            }
            _ => {
                if is_floating {
                    TokenKind::DoubleLiteral
                } else {
                    TokenKind::IntLiteral
                }
            }
        };
        Ok(self.token(kind, start))
    }

    fn floating_suffix_error(&mut self, start: u32) -> LexError {
        self.consume_char();
        LexError::new(
            LexErrorKind::MalformedNumber("integer suffix on a floating literal"),
            Span::new(start, self.index as u32),
        )
    }

    fn consume_digits(&mut self) {
        while matches!(self.peek_char(), Some(b'0'..=b'9') | Some(b'_')) {
            self.consume_char();
        }
    }

    fn lex_string(&mut self, start: u32) -> Result<Token, LexError> {
        self.consume_char(); // opening quote
        loop {
            match self.peek_char() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedString,
                        Span::new(start, self.index as u32),
                    ));
                }
                Some(b'"') => {
                    self.consume_char();
                    return Ok(self.token(TokenKind::StringLiteral, start));
                }
                Some(b'\\') => self.consume_escape(start, LexErrorKind::UnterminatedString)?,
                Some(_) => self.consume_char(),
            }
        }
    }

    fn lex_char(&mut self, start: u32) -> Result<Token, LexError> {
        self.consume_char(); // opening quote
        let content_start = self.index;
        loop {
            match self.peek_char() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedChar,
                        Span::new(start, self.index as u32),
                    ));
                }
                Some(b'\'') => break,
                Some(b'\\') => self.consume_escape(start, LexErrorKind::UnterminatedChar)?,
                Some(_) => self.consume_char(),
            }
        }
        let content = &self.source[content_start..self.index];
        self.consume_char(); // closing quote

        if unescape(content).chars().count() != 1 {
            return Err(LexError::new(
                LexErrorKind::InvalidCharLiteral,
                Span::new(start, self.index as u32),
            ));
        }
        Ok(self.token(TokenKind::CharLiteral, start))
    }

    /// Consume a backslash plus its escape character, validating the
    /// escape against the supported set.
    fn consume_escape(&mut self, start: u32, eof_kind: LexErrorKind) -> Result<(), LexError> {
        let escape_start = self.index as u32;
        self.consume_char(); // backslash
        match self.peek_char() {
            None => Err(LexError::new(eof_kind, Span::new(start, self.index as u32))),
            Some(ch) if ESCAPES.contains(&ch) => {
                self.consume_char();
                Ok(())
            }
            Some(_) => {
                let ch = self.char_at(self.index);
                self.index += ch.len_utf8();
                Err(LexError::new(
                    LexErrorKind::UnknownEscape(ch),
                    Span::new(escape_start, self.index as u32),
                ))
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn char_at(&self, index: usize) -> char {
        self.source[index..].chars().next().unwrap_or('\u{FFFD}')
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
