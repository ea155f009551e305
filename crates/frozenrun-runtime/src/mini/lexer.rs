//! Tokenizer
//!
//! Raw tokens come from a logos scanner; `tokenize` layers line tracking,
//! bracket depth and newline folding on top of it.

use logos::Logos;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Op(&'static str),
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

/// Failure raised from inside the scanner; unmatched input falls back to
/// `Unrecognized`.
#[derive(Debug, Clone, Default, PartialEq)]
enum LexFault {
    #[default]
    Unrecognized,
    IntegerTooLarge,
    InvalidDecimal,
}

/// Alias keeps the logos derive from rewriting `'static` to the source lifetime.
type StaticStr = &'static str;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexFault)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"\\\r?\n")]
enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9]+(_[0-9]+)*", parse_int)]
    Int(i64),

    #[regex(r"[0-9]+(_[0-9]+)*\.([0-9]+(_[0-9]+)*)?([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9]+(_[0-9]+)*[eE][+-]?[0-9]+", parse_float)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_float)]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.|\\\n)*""#, parse_string)]
    #[regex(r"'([^'\\\n]|\\.|\\\n)*'", parse_string)]
    Str(String),

    #[token("//", |_| "//")]
    #[token("==", |_| "==")]
    #[token("!=", |_| "!=")]
    #[token("<=", |_| "<=")]
    #[token(">=", |_| ">=")]
    #[token("+", |_| "+")]
    #[token("-", |_| "-")]
    #[token("*", |_| "*")]
    #[token("/", |_| "/")]
    #[token("%", |_| "%")]
    #[token(",", |_| ",")]
    #[token(".", |_| ".")]
    #[token("=", |_| "=")]
    #[token("<", |_| "<")]
    #[token(">", |_| ">")]
    #[token(";", |_| ";")]
    Op(StaticStr),

    #[token("(", |_| "(")]
    #[token("[", |_| "[")]
    Open(StaticStr),

    #[token(")", |_| ")")]
    #[token("]", |_| "]")]
    Close(StaticStr),
}

fn parse_int(lex: &mut logos::Lexer<RawToken>) -> Result<i64, LexFault> {
    lex.slice().replace('_', "").parse().map_err(|_| LexFault::IntegerTooLarge)
}

fn parse_float(lex: &mut logos::Lexer<RawToken>) -> Result<f64, LexFault> {
    lex.slice().replace('_', "").parse().map_err(|_| LexFault::InvalidDecimal)
}

fn parse_string(lex: &mut logos::Lexer<RawToken>) -> String {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

fn unescape(s: &str) -> String {
    let mut value = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('0') => value.push('\0'),
            Some(c @ ('\\' | '\'' | '"')) => value.push(c),
            Some('\n') => {}
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut line = 1u32;
    let mut counted = 0usize;

    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        line += source[counted..span.start].matches('\n').count() as u32;
        counted = span.start;

        let raw = match result {
            Ok(raw) => raw,
            Err(fault) => {
                let message = match fault {
                    LexFault::IntegerTooLarge => "integer literal too large".to_string(),
                    LexFault::InvalidDecimal => "invalid decimal literal".to_string(),
                    LexFault::Unrecognized => match source[span.start..].chars().next() {
                        Some('\'' | '"') => "unterminated string literal".to_string(),
                        Some(c) => format!("invalid character '{}'", c),
                        None => "unexpected end of input".to_string(),
                    },
                };
                return Err(LexError { message, line });
            }
        };

        let tok = match raw {
            RawToken::Newline => {
                if depth == 0 && tokens.last().is_some_and(|t| t.tok != Tok::Newline) {
                    tokens.push(Token { tok: Tok::Newline, line });
                }
                continue;
            }
            RawToken::Name(name) => Tok::Name(name),
            RawToken::Int(value) => Tok::Int(value),
            RawToken::Float(value) => Tok::Float(value),
            RawToken::Str(value) => Tok::Str(value),
            RawToken::Op(op) => Tok::Op(op),
            RawToken::Open(op) => {
                depth += 1;
                Tok::Op(op)
            }
            RawToken::Close(op) => {
                depth = depth.saturating_sub(1);
                Tok::Op(op)
            }
        };
        tokens.push(Token { tok, line });
    }
    line += source[counted..].matches('\n').count() as u32;

    if tokens.last().is_some_and(|t| t.tok != Tok::Newline) {
        tokens.push(Token { tok: Tok::Newline, line });
    }
    tokens.push(Token { tok: Tok::Eof, line });
    Ok(tokens)
}
