//! Code objects and their byte form
//!
//! Layout (all integers little-endian):
//! ```text
//! "MC" version:u8
//! filename:str
//! consts:u32 { tag:u8 payload }*
//! names:u32 { str }*
//! ops:u32 { opcode:u8 arg:u32 line:u32 }*
//! ```
//! `str` is a u32 length followed by UTF-8 bytes. The form contains nothing
//! but the compiled program, so equal sources compile to equal bytes.

use crate::host::TargetError;

const CODE_MAGIC: &[u8; 2] = b"MC";
const CODE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Const {
    fn same(&self, other: &Const) -> bool {
        match (self, other) {
            (Const::Float(a), Const::Float(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl BinOp {
    const ALL: [BinOp; 6] = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::FloorDiv, BinOp::Mod];

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    const ALL: [CmpOp; 6] = [CmpOp::Eq, CmpOp::Ne, CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge];

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// One instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    LoadConst(u32),
    LoadName(u32),
    StoreName(u32),
    LoadAttr(u32),
    Binary(BinOp),
    Compare(CmpOp),
    Negate,
    Not,
    /// Call with this many arguments
    Call(u32),
    Subscript,
    BuildList(u32),
    /// Import a dotted name and bind its first component
    Import(u32),
    Pop,
    /// Pop and echo (interactive statements)
    PrintExpr,
    /// Pop, jump when true
    JumpIfTrue(u32),
    /// Jump keeping the value when false, else pop
    JumpIfFalseOrPop(u32),
    /// Jump keeping the value when true, else pop
    JumpIfTrueOrPop(u32),
    /// Pop message and kind, raise
    Raise,
    /// Pop message, raise `AssertionError`
    AssertFail,
}

impl Op {
    fn encode(self) -> (u8, u32) {
        match self {
            Op::LoadConst(i) => (1, i),
            Op::LoadName(i) => (2, i),
            Op::StoreName(i) => (3, i),
            Op::LoadAttr(i) => (4, i),
            Op::Binary(op) => (5, BinOp::ALL.iter().position(|o| *o == op).unwrap_or(0) as u32),
            Op::Compare(op) => (6, CmpOp::ALL.iter().position(|o| *o == op).unwrap_or(0) as u32),
            Op::Negate => (7, 0),
            Op::Not => (8, 0),
            Op::Call(n) => (9, n),
            Op::Subscript => (10, 0),
            Op::BuildList(n) => (11, n),
            Op::Import(i) => (12, i),
            Op::Pop => (13, 0),
            Op::PrintExpr => (14, 0),
            Op::JumpIfTrue(t) => (15, t),
            Op::JumpIfFalseOrPop(t) => (16, t),
            Op::JumpIfTrueOrPop(t) => (17, t),
            Op::Raise => (18, 0),
            Op::AssertFail => (19, 0),
        }
    }

    fn decode(opcode: u8, arg: u32) -> Option<Op> {
        Some(match opcode {
            1 => Op::LoadConst(arg),
            2 => Op::LoadName(arg),
            3 => Op::StoreName(arg),
            4 => Op::LoadAttr(arg),
            5 => Op::Binary(*BinOp::ALL.get(arg as usize)?),
            6 => Op::Compare(*CmpOp::ALL.get(arg as usize)?),
            7 => Op::Negate,
            8 => Op::Not,
            9 => Op::Call(arg),
            10 => Op::Subscript,
            11 => Op::BuildList(arg),
            12 => Op::Import(arg),
            13 => Op::Pop,
            14 => Op::PrintExpr,
            15 => Op::JumpIfTrue(arg),
            16 => Op::JumpIfFalseOrPop(arg),
            17 => Op::JumpIfTrueOrPop(arg),
            18 => Op::Raise,
            19 => Op::AssertFail,
            _ => return None,
        })
    }
}

/// A compiled unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeObject {
    pub filename: String,
    pub consts: Vec<Const>,
    pub names: Vec<String>,
    pub ops: Vec<Op>,
    /// Source line of each op
    pub lines: Vec<u32>,
}

fn bad_code() -> TargetError {
    TargetError::new("ValueError", "bad marshal data")
}

impl CodeObject {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn add_const(&mut self, value: Const) -> u32 {
        if let Some(i) = self.consts.iter().position(|c| c.same(&value)) {
            return i as u32;
        }
        self.consts.push(value);
        (self.consts.len() - 1) as u32
    }

    pub fn add_name(&mut self, name: &str) -> u32 {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return i as u32;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn const_at(&self, index: u32) -> Result<&Const, TargetError> {
        self.consts.get(index as usize).ok_or_else(bad_code)
    }

    pub fn name_at(&self, index: u32) -> Result<&str, TargetError> {
        self.names.get(index as usize).map(String::as_str).ok_or_else(bad_code)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(CODE_MAGIC);
        out.push(CODE_VERSION);
        put_str(&mut out, &self.filename);

        out.extend_from_slice(&(self.consts.len() as u32).to_le_bytes());
        for value in &self.consts {
            match value {
                Const::None => out.push(0),
                Const::Bool(false) => out.push(1),
                Const::Bool(true) => out.push(2),
                Const::Int(i) => {
                    out.push(3);
                    out.extend_from_slice(&i.to_le_bytes());
                }
                Const::Float(f) => {
                    out.push(4);
                    out.extend_from_slice(&f.to_bits().to_le_bytes());
                }
                Const::Str(s) => {
                    out.push(5);
                    put_str(&mut out, s);
                }
            }
        }

        out.extend_from_slice(&(self.names.len() as u32).to_le_bytes());
        for name in &self.names {
            put_str(&mut out, name);
        }

        out.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());
        for (op, line) in self.ops.iter().zip(&self.lines) {
            let (opcode, arg) = op.encode();
            out.push(opcode);
            out.extend_from_slice(&arg.to_le_bytes());
            out.extend_from_slice(&line.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TargetError> {
        let mut r = Reader { bytes, pos: 0 };
        if r.take(2)? != CODE_MAGIC || r.u8()? != CODE_VERSION {
            return Err(bad_code());
        }
        let mut code = CodeObject::new(r.string()?);

        for _ in 0..r.u32()? {
            let value = match r.u8()? {
                0 => Const::None,
                1 => Const::Bool(false),
                2 => Const::Bool(true),
                3 => Const::Int(i64::from_le_bytes(r.array()?)),
                4 => Const::Float(f64::from_bits(u64::from_le_bytes(r.array()?))),
                5 => Const::Str(r.string()?),
                _ => return Err(bad_code()),
            };
            code.consts.push(value);
        }
        for _ in 0..r.u32()? {
            let name = r.string()?;
            code.names.push(name);
        }
        let count = r.u32()?;
        for _ in 0..count {
            let opcode = r.u8()?;
            let arg = r.u32()?;
            let line = r.u32()?;
            let op = Op::decode(opcode, arg).ok_or_else(bad_code)?;
            code.ops.push(op);
            code.lines.push(line);
        }
        if r.pos != bytes.len() {
            return Err(bad_code());
        }
        code.check_jumps(count)?;
        Ok(code)
    }

    fn check_jumps(&self, count: u32) -> Result<(), TargetError> {
        for op in &self.ops {
            if let Op::JumpIfTrue(t) | Op::JumpIfFalseOrPop(t) | Op::JumpIfTrueOrPop(t) = op {
                if *t > count {
                    return Err(bad_code());
                }
            }
        }
        Ok(())
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TargetError> {
        let end = self.pos.checked_add(n).ok_or_else(bad_code)?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(bad_code)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TargetError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, TargetError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, TargetError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, TargetError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| bad_code())
    }
}
