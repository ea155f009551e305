//! Runtime values

use std::cmp::Ordering;

use super::code::{BinOp, CmpOp, Const};
use crate::host::TargetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Str,
    Repr,
    Len,
    Int,
    Exit,
    Warn,
    FilterWarnings,
}

impl Builtin {
    const ALL: [(Builtin, &'static str); 8] = [
        (Builtin::Print, "print"),
        (Builtin::Str, "str"),
        (Builtin::Repr, "repr"),
        (Builtin::Len, "len"),
        (Builtin::Int, "int"),
        (Builtin::Exit, "exit"),
        (Builtin::Warn, "warn"),
        (Builtin::FilterWarnings, "filterwarnings"),
    ];

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.iter().find(|(_, n)| *n == name).map(|(b, _)| *b)
    }

    pub fn name(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(b, _)| b == self)
            .map(|(_, n)| *n)
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// A module, by qualified name
    Module(String),
    Builtin(Builtin),
}

impl From<&Const> for Value {
    fn from(value: &Const) -> Self {
        match value {
            Const::None => Value::None,
            Const::Bool(b) => Value::Bool(*b),
            Const::Int(i) => Value::Int(*i),
            Const::Float(f) => Value::Float(*f),
            Const::Str(s) => Value::Str(s.clone()),
        }
    }
}

pub fn type_error(message: impl Into<String>) -> TargetError {
    TargetError::new("TypeError", message)
}

fn zero_division(message: &str) -> TargetError {
    TargetError::new("ZeroDivisionError", message)
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{:e}", v);
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
        }
        return formatted;
    }
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Module(_) => "module",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Module(_) | Value::Builtin(_) => true,
        }
    }

    /// `str(value)`
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// `repr(value)`
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n")
                    .replace('\t', "\\t");
                format!("'{}'", escaped)
            }
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Module(name) => format!("<module '{}'>", name),
            Value::Builtin(b) => format!("<built-in function {}>", b.name()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn binary(&self, op: BinOp, rhs: &Value) -> Result<Value, TargetError> {
        let unsupported = || {
            type_error(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                self.type_name(),
                rhs.type_name()
            ))
        };
        let overflow = || TargetError::new("OverflowError", "integer overflow");

        match (op, self, rhs) {
            (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                return Ok(Value::List(a.iter().chain(b).cloned().collect()))
            }
            (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
                let count = n.as_int().unwrap_or(0).max(0) as usize;
                return Ok(Value::Str(s.repeat(count)));
            }
            (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) if n.as_int().is_some() => {
                let count = n.as_int().unwrap_or(0).max(0) as usize;
                let mut out = Vec::with_capacity(items.len() * count);
                for _ in 0..count {
                    out.extend(items.iter().cloned());
                }
                return Ok(Value::List(out));
            }
            _ => {}
        }

        if let (Some(a), Some(b)) = (self.as_int(), rhs.as_int()) {
            return match op {
                BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
                BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
                BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
                BinOp::Div => {
                    if b == 0 {
                        Err(zero_division("division by zero"))
                    } else {
                        Ok(Value::Float(a as f64 / b as f64))
                    }
                }
                BinOp::FloorDiv => {
                    if b == 0 {
                        return Err(zero_division("integer division or modulo by zero"));
                    }
                    let q = a.checked_div(b).ok_or_else(overflow)?;
                    let adjust = a % b != 0 && ((a < 0) != (b < 0));
                    Ok(Value::Int(if adjust { q - 1 } else { q }))
                }
                BinOp::Mod => {
                    if b == 0 {
                        return Err(zero_division("integer modulo by zero"));
                    }
                    let r = a.checked_rem(b).ok_or_else(overflow)?;
                    Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
                }
            };
        }

        let (Some(a), Some(b)) = (self.as_number(), rhs.as_number()) else {
            return Err(unsupported());
        };
        match op {
            BinOp::Add => Ok(Value::Float(a + b)),
            BinOp::Sub => Ok(Value::Float(a - b)),
            BinOp::Mul => Ok(Value::Float(a * b)),
            BinOp::Div if b == 0.0 => Err(zero_division("float division by zero")),
            BinOp::Div => Ok(Value::Float(a / b)),
            BinOp::FloorDiv if b == 0.0 => Err(zero_division("float floor division by zero")),
            BinOp::FloorDiv => Ok(Value::Float((a / b).floor())),
            BinOp::Mod if b == 0.0 => Err(zero_division("float modulo by zero")),
            BinOp::Mod => {
                let r = a % b;
                Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
            }
        }
    }

    pub fn negate(&self) -> Result<Value, TargetError> {
        match self {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| TargetError::new("OverflowError", "integer overflow")),
            Value::Bool(b) => Ok(Value::Int(-(*b as i64))),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(type_error(format!("bad operand type for unary -: '{}'", other.type_name()))),
        }
    }

    fn equals(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    pub fn compare(&self, op: CmpOp, rhs: &Value) -> Result<Value, TargetError> {
        let ordering = match op {
            CmpOp::Eq => return Ok(Value::Bool(self.equals(rhs))),
            CmpOp::Ne => return Ok(Value::Bool(!self.equals(rhs))),
            _ => match (self, rhs) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => match (self.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => {
                        return Err(type_error(format!(
                            "'{}' not supported between instances of '{}' and '{}'",
                            op.symbol(),
                            self.type_name(),
                            rhs.type_name()
                        )))
                    }
                },
            },
        };
        let result = match (op, ordering) {
            (_, None) => false,
            (CmpOp::Lt, Some(o)) => o == Ordering::Less,
            (CmpOp::Le, Some(o)) => o != Ordering::Greater,
            (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
            (CmpOp::Ge, Some(o)) => o != Ordering::Less,
            (CmpOp::Eq | CmpOp::Ne, _) => false,
        };
        Ok(Value::Bool(result))
    }

    pub fn subscript(&self, index: &Value) -> Result<Value, TargetError> {
        let Some(i) = index.as_int() else {
            return Err(type_error(format!(
                "{} indices must be integers, not {}",
                self.type_name(),
                index.type_name()
            )));
        };
        let resolve = |len: usize| -> Option<usize> {
            let i = if i < 0 { i + len as i64 } else { i };
            (0..len as i64).contains(&i).then_some(i as usize)
        };
        match self {
            Value::List(items) => resolve(items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| TargetError::new("IndexError", "list index out of range")),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                resolve(chars.len())
                    .map(|i| Value::Str(chars[i].to_string()))
                    .ok_or_else(|| TargetError::new("IndexError", "string index out of range"))
            }
            other => Err(type_error(format!("'{}' object is not subscriptable", other.type_name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_by_zero() {
        let err = Value::Int(1).binary(BinOp::Div, &Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        let err = Value::Float(1.0).binary(BinOp::Div, &Value::Int(0)).unwrap_err();
        assert_eq!(err.message, "float division by zero");
        assert!(Value::Int(1).binary(BinOp::Mod, &Value::Int(0)).is_err());
    }

    #[test]
    fn test_floor_semantics() {
        assert_eq!(Value::Int(-7).binary(BinOp::FloorDiv, &Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!(Value::Int(-7).binary(BinOp::Mod, &Value::Int(2)).unwrap(), Value::Int(1));
        assert_eq!(Value::Int(7).binary(BinOp::Div, &Value::Int(2)).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Float(0.1).repr(), "0.1");
        assert_eq!(Value::Float(1e20).repr(), "1e+20");
        assert_eq!(Value::Float(1.5e-7).repr(), "1.5e-07");
    }

    #[test]
    fn test_strings_and_lists() {
        let s = Value::Str("ab".into());
        assert_eq!(s.binary(BinOp::Mul, &Value::Int(2)).unwrap(), Value::Str("abab".into()));
        assert_eq!(s.subscript(&Value::Int(-1)).unwrap(), Value::Str("b".into()));
        assert_eq!(s.repr(), "'ab'");
        assert_eq!(s.to_str(), "ab");

        let list = Value::List(vec![Value::Int(1), Value::Str("x".into()), Value::None]);
        assert_eq!(list.repr(), "[1, 'x', None]");
        assert!(list.subscript(&Value::Int(3)).is_err());
    }

    #[test]
    fn test_type_errors() {
        let err = Value::Int(1).binary(BinOp::Add, &Value::Str("a".into())).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +: 'int' and 'str'");
        assert!(Value::Int(1).compare(CmpOp::Lt, &Value::None).is_err());
        assert_eq!(Value::Int(1).compare(CmpOp::Eq, &Value::Float(1.0)).unwrap(), Value::Bool(true));
    }
}
