//! Single-pass compiler from tokens to stack code

use super::code::{BinOp, CmpOp, CodeObject, Const, Op};
use super::lexer::{tokenize, Tok, Token};
use crate::host::TargetError;

const KEYWORDS: [&str; 10] = [
    "import", "assert", "raise", "pass", "not", "and", "or", "None", "True", "False",
];

/// Compile `source`. With `interactive`, expression statements echo their
/// value. With `optimize` > 0, `assert` statements are dropped.
pub fn compile(source: &str, filename: &str, optimize: u8, interactive: bool) -> Result<CodeObject, TargetError> {
    let tokens = tokenize(source).map_err(|e| syntax_error(&e.message, filename, e.line))?;
    let mut compiler = Compiler {
        tokens,
        pos: 0,
        code: CodeObject::new(filename),
        optimize,
        interactive,
    };
    compiler.program()?;
    Ok(compiler.code)
}

fn syntax_error(message: &str, filename: &str, line: u32) -> TargetError {
    TargetError::new("SyntaxError", format!("{} ({}, line {})", message, filename, line))
}

struct Compiler {
    tokens: Vec<Token>,
    pos: usize,
    code: CodeObject,
    optimize: u8,
    interactive: bool,
}

impl Compiler {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).map(|t| &t.tok).unwrap_or(&Tok::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens.get(self.pos + offset).map(|t| &t.tok).unwrap_or(&Tok::Eof)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == word)
    }

    fn accept_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> TargetError {
        syntax_error(message, &self.code.filename, self.line())
    }

    fn expect_op(&mut self, op: &str) -> Result<(), TargetError> {
        if self.accept_op(op) {
            Ok(())
        } else {
            Err(self.error("invalid syntax"))
        }
    }

    fn name(&mut self) -> Result<String, TargetError> {
        match self.advance() {
            Tok::Name(n) if !KEYWORDS.contains(&n.as_str()) => Ok(n),
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn emit(&mut self, op: Op) -> usize {
        let line = self.tokens.get(self.pos.saturating_sub(1)).map(|t| t.line).unwrap_or(1);
        self.code.ops.push(op);
        self.code.lines.push(line);
        self.code.ops.len() - 1
    }

    fn emit_const(&mut self, value: Const) {
        let index = self.code.add_const(value);
        self.emit(Op::LoadConst(index));
    }

    fn patch(&mut self, at: usize) {
        let target = self.code.ops.len() as u32;
        match &mut self.code.ops[at] {
            Op::JumpIfTrue(t) | Op::JumpIfFalseOrPop(t) | Op::JumpIfTrueOrPop(t) => *t = target,
            _ => {}
        }
    }

    // ── statements ──────────────────────────────────────────────────────────

    fn program(&mut self) -> Result<(), TargetError> {
        loop {
            while *self.peek() == Tok::Newline {
                self.pos += 1;
            }
            if *self.peek() == Tok::Eof {
                return Ok(());
            }
            self.statement_line()?;
        }
    }

    fn statement_line(&mut self) -> Result<(), TargetError> {
        self.simple_statement()?;
        while self.accept_op(";") {
            if matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
            self.simple_statement()?;
        }
        match self.advance() {
            Tok::Newline | Tok::Eof => Ok(()),
            _ => {
                self.pos -= 1;
                Err(self.error("invalid syntax"))
            }
        }
    }

    fn simple_statement(&mut self) -> Result<(), TargetError> {
        if self.at_keyword("import") {
            self.pos += 1;
            return self.import_statement();
        }
        if self.at_keyword("assert") {
            self.pos += 1;
            return self.assert_statement();
        }
        if self.at_keyword("raise") {
            self.pos += 1;
            return self.raise_statement();
        }
        if self.at_keyword("pass") {
            self.pos += 1;
            return Ok(());
        }
        if matches!(self.peek(), Tok::Name(_)) && matches!(self.peek_at(1), Tok::Op("=")) {
            let target = self.name()?;
            self.pos += 1;
            self.expression()?;
            let index = self.code.add_name(&target);
            self.emit(Op::StoreName(index));
            return Ok(());
        }

        self.expression()?;
        self.emit(if self.interactive { Op::PrintExpr } else { Op::Pop });
        Ok(())
    }

    fn import_statement(&mut self) -> Result<(), TargetError> {
        loop {
            let mut dotted = self.name()?;
            while self.accept_op(".") {
                dotted.push('.');
                dotted.push_str(&self.name()?);
            }
            let index = self.code.add_name(&dotted);
            self.emit(Op::Import(index));
            if !self.accept_op(",") {
                return Ok(());
            }
        }
    }

    fn assert_statement(&mut self) -> Result<(), TargetError> {
        let start = self.code.ops.len();
        self.expression()?;
        let jump = self.emit(Op::JumpIfTrue(0));
        if self.accept_op(",") {
            self.expression()?;
        } else {
            self.emit_const(Const::None);
        }
        self.emit(Op::AssertFail);
        self.patch(jump);

        if self.optimize > 0 {
            self.code.ops.truncate(start);
            self.code.lines.truncate(start);
        }
        Ok(())
    }

    fn raise_statement(&mut self) -> Result<(), TargetError> {
        if matches!(self.peek(), Tok::Newline | Tok::Eof | Tok::Op(";")) {
            self.emit_const(Const::Str("RuntimeError".into()));
            self.emit_const(Const::Str("No active exception to reraise".into()));
            self.emit(Op::Raise);
            return Ok(());
        }
        let kind = self.name()?;
        self.emit_const(Const::Str(kind));
        if self.accept_op("(") {
            if self.accept_op(")") {
                self.emit_const(Const::None);
            } else {
                self.expression()?;
                self.expect_op(")")?;
            }
        } else {
            self.emit_const(Const::None);
        }
        self.emit(Op::Raise);
        Ok(())
    }

    // ── expressions ─────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<(), TargetError> {
        self.and_test()?;
        while self.at_keyword("or") {
            self.pos += 1;
            let jump = self.emit(Op::JumpIfTrueOrPop(0));
            self.and_test()?;
            self.patch(jump);
        }
        Ok(())
    }

    fn and_test(&mut self) -> Result<(), TargetError> {
        self.not_test()?;
        while self.at_keyword("and") {
            self.pos += 1;
            let jump = self.emit(Op::JumpIfFalseOrPop(0));
            self.not_test()?;
            self.patch(jump);
        }
        Ok(())
    }

    fn not_test(&mut self) -> Result<(), TargetError> {
        if self.at_keyword("not") {
            self.pos += 1;
            self.not_test()?;
            self.emit(Op::Not);
            return Ok(());
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<(), TargetError> {
        self.arith()?;
        let op = match self.peek() {
            Tok::Op("==") => CmpOp::Eq,
            Tok::Op("!=") => CmpOp::Ne,
            Tok::Op("<") => CmpOp::Lt,
            Tok::Op("<=") => CmpOp::Le,
            Tok::Op(">") => CmpOp::Gt,
            Tok::Op(">=") => CmpOp::Ge,
            _ => return Ok(()),
        };
        self.pos += 1;
        self.arith()?;
        self.emit(Op::Compare(op));
        Ok(())
    }

    fn arith(&mut self) -> Result<(), TargetError> {
        self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinOp::Add,
                Tok::Op("-") => BinOp::Sub,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.term()?;
            self.emit(Op::Binary(op));
        }
    }

    fn term(&mut self) -> Result<(), TargetError> {
        self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinOp::Mul,
                Tok::Op("/") => BinOp::Div,
                Tok::Op("//") => BinOp::FloorDiv,
                Tok::Op("%") => BinOp::Mod,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.factor()?;
            self.emit(Op::Binary(op));
        }
    }

    fn factor(&mut self) -> Result<(), TargetError> {
        if self.accept_op("-") {
            self.factor()?;
            self.emit(Op::Negate);
            return Ok(());
        }
        if self.accept_op("+") {
            return self.factor();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<(), TargetError> {
        self.atom()?;
        loop {
            if self.accept_op("(") {
                let argc = self.items(")")?;
                self.emit(Op::Call(argc));
            } else if self.accept_op(".") {
                let attr = self.name()?;
                let index = self.code.add_name(&attr);
                self.emit(Op::LoadAttr(index));
            } else if self.accept_op("[") {
                self.expression()?;
                self.expect_op("]")?;
                self.emit(Op::Subscript);
            } else {
                return Ok(());
            }
        }
    }

    /// Comma-separated expressions up to `close`; returns their count.
    fn items(&mut self, close: &str) -> Result<u32, TargetError> {
        let mut count = 0;
        while !self.accept_op(close) {
            self.expression()?;
            count += 1;
            if !self.accept_op(",") {
                self.expect_op(close)?;
                break;
            }
        }
        Ok(count)
    }

    fn atom(&mut self) -> Result<(), TargetError> {
        match self.advance() {
            Tok::Int(i) => self.emit_const(Const::Int(i)),
            Tok::Float(f) => self.emit_const(Const::Float(f)),
            Tok::Str(mut s) => {
                while let Tok::Str(next) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                self.emit_const(Const::Str(s));
            }
            Tok::Name(n) => match n.as_str() {
                "None" => self.emit_const(Const::None),
                "True" => self.emit_const(Const::Bool(true)),
                "False" => self.emit_const(Const::Bool(false)),
                word if KEYWORDS.contains(&word) => {
                    self.pos -= 1;
                    return Err(self.error("invalid syntax"));
                }
                _ => {
                    let index = self.code.add_name(&n);
                    self.emit(Op::LoadName(index));
                }
            },
            Tok::Op("(") => {
                self.expression()?;
                self.expect_op(")")?;
            }
            Tok::Op("[") => {
                let count = self.items("]")?;
                self.emit(Op::BuildList(count));
            }
            Tok::Newline | Tok::Eof => {
                return Err(self.error("invalid syntax"));
            }
            _ => {
                self.pos -= 1;
                return Err(self.error("invalid syntax"));
            }
        }
        Ok(())
    }
}
