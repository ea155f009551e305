//! Stack interpreter

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

use super::code::{CodeObject, Op};
use super::compiler::compile;
use super::value::{type_error, Builtin, Value};
use crate::context::{WarningAction, WarningFilter};
use crate::finder::{ImportError, ModuleCode};
use crate::host::{HostEnv, HostError, TargetError, TraceFrame};

type Namespace = Rc<RefCell<BTreeMap<String, Value>>>;

enum Flow {
    Next,
    Jump(usize),
}

/// Loaded modules and warning bookkeeping.
#[derive(Default)]
pub struct Interpreter {
    modules: HashMap<String, Namespace>,
    warned: HashSet<String>,
}

fn io_error(err: std::io::Error) -> HostError {
    HostError::Raised(TargetError::new("OSError", err.to_string()))
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, TargetError> {
    stack
        .pop()
        .ok_or_else(|| TargetError::new("SystemError", "stack underflow"))
}

impl Interpreter {
    /// Namespace of `module`, created with `__name__` and `__file__` if new.
    pub fn namespace(&mut self, module: &str, file: &str) -> Namespace {
        self.modules
            .entry(module.to_string())
            .or_insert_with(|| {
                let mut ns = BTreeMap::new();
                ns.insert("__name__".to_string(), Value::Str(module.to_string()));
                ns.insert("__file__".to_string(), Value::Str(file.to_string()));
                Rc::new(RefCell::new(ns))
            })
            .clone()
    }

    /// Run `code` in the namespace of `module`.
    pub fn exec(&mut self, code: &CodeObject, module: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError> {
        let ns = self.namespace(module, &code.filename);
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0;

        while pc < code.ops.len() {
            let op = code.ops[pc];
            let line = code.lines.get(pc).copied().unwrap_or(0);
            pc += 1;

            match self.step(code, op, line, module, &ns, &mut stack, env) {
                Ok(Flow::Next) => {}
                Ok(Flow::Jump(target)) => pc = target,
                Err(HostError::Raised(mut err)) => {
                    err.push_outer(TraceFrame {
                        filename: code.filename.clone(),
                        line,
                        scope: "<module>".to_string(),
                    });
                    return Err(HostError::Raised(err));
                }
                Err(exit) => return Err(exit),
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        code: &CodeObject,
        op: Op,
        line: u32,
        module: &str,
        ns: &Namespace,
        stack: &mut Vec<Value>,
        env: &mut HostEnv<'_, '_>,
    ) -> Result<Flow, HostError> {
        match op {
            Op::LoadConst(i) => stack.push(Value::from(code.const_at(i)?)),
            Op::LoadName(i) => {
                let name = code.name_at(i)?;
                let value = self.load_name(name, ns, env)?;
                stack.push(value);
            }
            Op::StoreName(i) => {
                let value = pop(stack)?;
                ns.borrow_mut().insert(code.name_at(i)?.to_string(), value);
            }
            Op::LoadAttr(i) => {
                let target = pop(stack)?;
                let value = self.load_attr(&target, code.name_at(i)?)?;
                stack.push(value);
            }
            Op::Binary(bin) => {
                let rhs = pop(stack)?;
                let lhs = pop(stack)?;
                stack.push(lhs.binary(bin, &rhs)?);
            }
            Op::Compare(cmp) => {
                let rhs = pop(stack)?;
                let lhs = pop(stack)?;
                stack.push(lhs.compare(cmp, &rhs)?);
            }
            Op::Negate => {
                let value = pop(stack)?;
                stack.push(value.negate()?);
            }
            Op::Not => {
                let value = pop(stack)?;
                stack.push(Value::Bool(!value.truthy()));
            }
            Op::Call(argc) => {
                let split = stack
                    .len()
                    .checked_sub(argc as usize)
                    .ok_or_else(|| TargetError::new("SystemError", "stack underflow"))?;
                let args = stack.split_off(split);
                let callee = pop(stack)?;
                let result = match callee {
                    Value::Builtin(builtin) => self.call(builtin, args, &code.filename, line, module, env)?,
                    other => {
                        return Err(type_error(format!("'{}' object is not callable", other.type_name())).into())
                    }
                };
                stack.push(result);
            }
            Op::Subscript => {
                let index = pop(stack)?;
                let target = pop(stack)?;
                stack.push(target.subscript(&index)?);
            }
            Op::BuildList(n) => {
                let split = stack
                    .len()
                    .checked_sub(n as usize)
                    .ok_or_else(|| TargetError::new("SystemError", "stack underflow"))?;
                let items = stack.split_off(split);
                stack.push(Value::List(items));
            }
            Op::Import(i) => {
                let dotted = code.name_at(i)?;
                self.import(dotted, env)?;
                let top = dotted.split('.').next().unwrap_or(dotted);
                ns.borrow_mut().insert(top.to_string(), Value::Module(top.to_string()));
            }
            Op::Pop => {
                pop(stack)?;
            }
            Op::PrintExpr => {
                let value = pop(stack)?;
                if value != Value::None {
                    writeln!(env.streams.stdout, "{}", value.repr()).map_err(io_error)?;
                }
            }
            Op::JumpIfTrue(target) => {
                if pop(stack)?.truthy() {
                    return Ok(Flow::Jump(target as usize));
                }
            }
            Op::JumpIfFalseOrPop(target) => {
                let keep = stack.last().map(|v| !v.truthy()).unwrap_or(false);
                if keep {
                    return Ok(Flow::Jump(target as usize));
                }
                pop(stack)?;
            }
            Op::JumpIfTrueOrPop(target) => {
                let keep = stack.last().map(Value::truthy).unwrap_or(false);
                if keep {
                    return Ok(Flow::Jump(target as usize));
                }
                pop(stack)?;
            }
            Op::Raise => {
                let message = pop(stack)?;
                let kind = pop(stack)?.to_str();
                let message = if message == Value::None { String::new() } else { message.to_str() };
                return Err(TargetError::new(kind, message).into());
            }
            Op::AssertFail => {
                let message = pop(stack)?;
                let message = if message == Value::None { String::new() } else { message.to_str() };
                return Err(TargetError::new("AssertionError", message).into());
            }
        }
        Ok(Flow::Next)
    }

    fn load_name(&self, name: &str, ns: &Namespace, env: &HostEnv<'_, '_>) -> Result<Value, TargetError> {
        if let Some(value) = ns.borrow().get(name) {
            return Ok(value.clone());
        }
        if name == "argv" {
            return Ok(Value::List(env.argv.iter().cloned().map(Value::Str).collect()));
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| TargetError::new("NameError", format!("name '{}' is not defined", name)))
    }

    fn load_attr(&self, target: &Value, attr: &str) -> Result<Value, TargetError> {
        match target {
            Value::Module(module) => self
                .modules
                .get(module)
                .and_then(|ns| ns.borrow().get(attr).cloned())
                .ok_or_else(|| {
                    TargetError::new(
                        "AttributeError",
                        format!("module '{}' has no attribute '{}'", module, attr),
                    )
                }),
            other => Err(TargetError::new(
                "AttributeError",
                format!("'{}' object has no attribute '{}'", other.type_name(), attr),
            )),
        }
    }

    // ── imports ─────────────────────────────────────────────────────────────

    fn import(&mut self, dotted: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError> {
        let mut qualified = String::new();
        for part in dotted.split('.') {
            if !qualified.is_empty() {
                qualified.push('.');
            }
            qualified.push_str(part);
            self.import_one(&qualified, env)?;
        }
        Ok(())
    }

    fn import_one(&mut self, name: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError> {
        if self.modules.contains_key(name) {
            return Ok(());
        }
        let located = env.finder.find(name).map_err(|err| match err {
            ImportError::NotFound(_) => TargetError::new("ModuleNotFoundError", err.to_string()),
            other => TargetError::new("ImportError", other.to_string()),
        })?;

        let code = match located.code {
            ModuleCode::Source(source) => compile(&source, &located.origin, env.flags.optimize, false)?,
            ModuleCode::Compiled(bytes) => CodeObject::from_bytes(&bytes)?,
            ModuleCode::Namespace => CodeObject::new(located.origin.clone()),
        };

        self.namespace(name, &located.origin);
        if let Err(err) = self.exec(&code, name, env) {
            self.modules.remove(name);
            return Err(err);
        }

        if let Some((parent, child)) = name.rsplit_once('.') {
            if let Some(parent_ns) = self.modules.get(parent) {
                parent_ns
                    .borrow_mut()
                    .insert(child.to_string(), Value::Module(name.to_string()));
            }
        }
        Ok(())
    }

    // ── builtins ────────────────────────────────────────────────────────────

    fn call(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        filename: &str,
        line: u32,
        module: &str,
        env: &mut HostEnv<'_, '_>,
    ) -> Result<Value, HostError> {
        let arity = |min: usize, max: usize| -> Result<(), TargetError> {
            if args.len() < min || args.len() > max {
                return Err(type_error(format!(
                    "{}() takes {} arguments ({} given)",
                    builtin.name(),
                    if min == max { min.to_string() } else { format!("{} to {}", min, max) },
                    args.len()
                )));
            }
            Ok(())
        };

        match builtin {
            Builtin::Print => {
                let text: Vec<String> = args.iter().map(Value::to_str).collect();
                writeln!(env.streams.stdout, "{}", text.join(" ")).map_err(io_error)?;
                Ok(Value::None)
            }
            Builtin::Str => {
                arity(0, 1)?;
                Ok(Value::Str(args.first().map(Value::to_str).unwrap_or_default()))
            }
            Builtin::Repr => {
                arity(1, 1)?;
                Ok(Value::Str(args[0].repr()))
            }
            Builtin::Len => {
                arity(1, 1)?;
                match &args[0] {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::List(items) => Ok(Value::Int(items.len() as i64)),
                    other => Err(type_error(format!("object of type '{}' has no len()", other.type_name())).into()),
                }
            }
            Builtin::Int => {
                arity(0, 1)?;
                match args.first() {
                    None => Ok(Value::Int(0)),
                    Some(Value::Int(i)) => Ok(Value::Int(*i)),
                    Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
                    Some(Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                    Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        TargetError::new(
                            "ValueError",
                            format!("invalid literal for int() with base 10: {}", Value::Str(s.clone()).repr()),
                        )
                        .into()
                    }),
                    Some(other) => Err(type_error(format!(
                        "int() argument must be a string or a number, not '{}'",
                        other.type_name()
                    ))
                    .into()),
                }
            }
            Builtin::Exit => {
                arity(0, 1)?;
                match args.first() {
                    None | Some(Value::None) => Err(HostError::Exit(0)),
                    Some(Value::Int(code)) => Err(HostError::Exit(*code as i32)),
                    Some(Value::Bool(b)) => Err(HostError::Exit(*b as i32)),
                    Some(other) => {
                        writeln!(env.streams.stderr, "{}", other.to_str()).map_err(io_error)?;
                        Err(HostError::Exit(1))
                    }
                }
            }
            Builtin::Warn => {
                arity(1, 2)?;
                let message = args[0].to_str();
                let category = args.get(1).map(Value::to_str).unwrap_or_else(|| "UserWarning".to_string());
                self.warn(&category, &message, filename, line, module, env)?;
                Ok(Value::None)
            }
            Builtin::FilterWarnings => {
                arity(1, 2)?;
                let spec = match args.get(1) {
                    Some(message) => format!("{}:{}", args[0].to_str(), message.to_str()),
                    None => args[0].to_str(),
                };
                let filter = WarningFilter::parse(&spec).map_err(|reason| TargetError::new("ValueError", reason))?;
                env.warnings.add(filter);
                Ok(Value::None)
            }
        }
    }

    fn warn(
        &mut self,
        category: &str,
        message: &str,
        filename: &str,
        line: u32,
        module: &str,
        env: &mut HostEnv<'_, '_>,
    ) -> Result<(), HostError> {
        let key = match env.warnings.action_for(category, message, module, line) {
            WarningAction::Ignore => return Ok(()),
            WarningAction::Error => return Err(TargetError::new(category, message).into()),
            WarningAction::Always => None,
            WarningAction::Default => Some(format!("{}:{}:{}:{}", category, message, module, line)),
            WarningAction::Module => Some(format!("{}:{}:{}", category, message, module)),
            WarningAction::Once => Some(format!("{}:{}", category, message)),
        };
        if let Some(key) = key {
            if !self.warned.insert(key) {
                return Ok(());
            }
        }
        writeln!(env.streams.stderr, "{}:{}: {}: {}", filename, line, category, message).map_err(io_error)
    }
}
