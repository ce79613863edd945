//! The stack-based bytecode VM (spec §4.5).
//!
//! Grounded on the teacher's tree-walking `Evaluator` turned inside-out: the
//! teacher recurses over an AST and keeps a Rust call stack; this VM
//! recurses over `Chunk`s the same way (one `run_chunk` call per GridLang
//! call frame, each with its own local operand stack) rather than
//! maintaining an explicit frame-stack data structure, since GridLang has no
//! exception unwinding that would need to walk frames after the fact.
//!
//! Variable storage reuses `scope.rs`'s chained-map `Scope` rather than a
//! slot-indexed locals array (spec §9 "heap-allocated frames linked by
//! parent pointer" — see DESIGN.md), so `LoadVar`/`StoreVar` behave
//! identically here and in the tree-walk evaluator.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    bytecode::{chunk::Chunk, op::Op},
    config::Config,
    engine::Engine,
    error::{GridError, GridResult},
    host::Host,
    ops,
    scope::Scope,
    value::{Body, Closure, Value},
};

/// An operand-stack slot: either a GridLang value or the opaque iterator
/// handle `GET_ITER`/`FOR_ITER` manage (spec §3 "Iterator (VM-internal
/// only)" — never exposed as a `Value` a script can hold).
#[derive(Debug, Clone)]
enum Slot {
    Value(Value),
    Iter(IterState),
}

#[derive(Debug, Clone)]
enum IterState {
    Array(crate::value::ArrayRef, usize),
    Chars(Rc<[char]>, usize),
    Map(crate::value::MapRef, usize),
}

impl IterState {
    fn new(target: &Value, line: u32, col: u32) -> GridResult<Self> {
        match target {
            Value::Array(a) => Ok(Self::Array(a.clone(), 0)),
            Value::String(s) => Ok(Self::Chars(s.chars().collect::<Vec<_>>().into(), 0)),
            Value::Map(m) => Ok(Self::Map(m.clone(), 0)),
            _ => Err(GridError::runtime(line, col, format!("cannot iterate over {}", target.type_name()))),
        }
    }

    /// Advances the cursor, returning `(element, index_or_key)` — the index
    /// slot is populated only when `two_var` is requested (spec §4.4
    /// `FOR_ITER`'s doc comment on `bytecode/op.rs`).
    fn advance(&mut self, two_var: bool) -> Option<(Value, Option<Value>)> {
        match self {
            Self::Array(items, idx) => {
                let item = items.borrow().get(*idx).cloned()?;
                let i = *idx;
                *idx += 1;
                Some((item, two_var.then(|| Value::Number(i as f64))))
            }
            Self::Chars(chars, idx) => {
                let c = *chars.get(*idx)?;
                let i = *idx;
                *idx += 1;
                Some((Value::string(c.to_string()), two_var.then(|| Value::Number(i as f64))))
            }
            Self::Map(map, idx) => {
                let (key, value) = {
                    let map = map.borrow();
                    let (k, v) = map.get_index(*idx)?;
                    (k.clone(), v.clone())
                };
                *idx += 1;
                if two_var {
                    Some((value, Some(Value::string(key))))
                } else {
                    // Single-variable map iteration yields keys, matching
                    // the language's `for k in map` convention.
                    Some((Value::string(key), None))
                }
            }
        }
    }
}

/// The VM proper. Borrows the host and a shared debug flag from whatever
/// owns it (`interpreter.rs`) for the duration of one run, rather than
/// owning them outright, so the same host/flag can be handed to either
/// backend without cloning (spec §5 "shared resources... owned by the
/// interpreter instance").
pub struct Vm<'h> {
    host: &'h mut dyn Host,
    debug: &'h mut bool,
    config: Config,
    call_depth: usize,
    steps: u64,
}

impl<'h> Vm<'h> {
    pub fn new(host: &'h mut dyn Host, debug: &'h mut bool, config: Config) -> Self {
        Self { host, debug, config, call_depth: 0, steps: 0 }
    }

    /// Runs a top-level program chunk to completion (`HALT`) or an early
    /// top-level `return`, under `root_scope`.
    pub fn run(&mut self, chunk: &Rc<Chunk>, root_scope: Rc<RefCell<Scope>>) -> GridResult<Value> {
        self.run_chunk(chunk, root_scope)
    }

    fn step(&mut self, line: u32) -> GridResult<()> {
        self.steps += 1;
        if self.config.max_steps.is_some_and(|max| self.steps > max) {
            return Err(GridError::runtime(line, 0, "execution step limit exceeded"));
        }
        Ok(())
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
        let Body::Code(body_chunk) = &closure.body else {
            return Err(GridError::runtime(line, col, "cannot run a tree-walk function body under the VM backend"));
        };
        if self.call_depth >= self.config.max_call_depth {
            return Err(GridError::runtime(line, col, "maximum call depth exceeded"));
        }
        let scope = Scope::child(&closure.captured);
        // Missing arguments bind to `null`, extras are dropped, matching the
        // host-callback contract (spec §6) extended uniformly to user
        // functions since the spec defines no arity-mismatch error kind.
        let mut args_iter = args.iter().cloned();
        for param in &closure.params {
            scope.borrow_mut().declare(param.clone(), args_iter.next().unwrap_or(Value::Null));
        }
        self.call_depth += 1;
        let result = self.run_chunk(body_chunk, scope);
        self.call_depth -= 1;
        result
    }

    fn run_chunk(&mut self, chunk: &Rc<Chunk>, scope: Rc<RefCell<Scope>>) -> GridResult<Value> {
        let mut stack: Vec<Slot> = Vec::new();
        let mut ip: usize = 0;
        loop {
            let line = chunk.line_at(ip);
            self.step(line)?;
            let opcode = chunk.read_u8(ip);
            let op = Op::from_repr(opcode)
                .ok_or_else(|| GridError::runtime(line, 0, format!("corrupt bytecode: unknown opcode {opcode}")))?;
            ip += 1;

            match op {
                Op::Const => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    stack.push(Slot::Value(chunk.constants[idx].clone()));
                }
                Op::LoadNull => stack.push(Slot::Value(Value::Null)),
                Op::LoadTrue => stack.push(Slot::Value(Value::Boolean(true))),
                Op::LoadFalse => stack.push(Slot::Value(Value::Boolean(false))),
                Op::LoadUndefined => stack.push(Slot::Value(Value::Undefined)),

                Op::LoadVar => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let name = &chunk.names[idx];
                    let value = scope
                        .borrow()
                        .get(name)
                        .ok_or_else(|| GridError::runtime(line, 0, format!("undefined variable '{name}'")))?;
                    stack.push(Slot::Value(value));
                }
                Op::StoreVar => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let name = chunk.names[idx].clone();
                    let value = pop_value(&mut stack, line)?;
                    Scope::assign(&scope, &name, value);
                }

                Op::Add => {
                    let b = pop_value(&mut stack, line)?;
                    let a = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(ops::add(&a, &b, line, 0)?));
                }
                Op::Sub => binary_arith(&mut stack, line, |x, y| x - y)?,
                Op::Mul => binary_arith(&mut stack, line, |x, y| x * y)?,
                Op::Div => binary_arith(&mut stack, line, |x, y| x / y)?,
                Op::Mod => binary_arith(&mut stack, line, |x, y| x % y)?,
                Op::Pow => binary_arith(&mut stack, line, f64::powf)?,
                Op::Neg => {
                    let a = pop_value(&mut stack, line)?;
                    let result = match a {
                        Value::Number(n) => Value::Number(-n),
                        _ => Value::Number(f64::NAN),
                    };
                    stack.push(Slot::Value(result));
                }
                Op::Not => {
                    let a = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(Value::Boolean(!a.is_truthy())));
                }
                Op::Eq => {
                    let b = pop_value(&mut stack, line)?;
                    let a = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(Value::Boolean(Value::values_equal(&a, &b))));
                }
                Op::NotEq => {
                    let b = pop_value(&mut stack, line)?;
                    let a = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(Value::Boolean(!Value::values_equal(&a, &b))));
                }
                Op::Lt => binary_compare(&mut stack, line, |o| o == std::cmp::Ordering::Less)?,
                Op::LtEq => binary_compare(&mut stack, line, |o| o != std::cmp::Ordering::Greater)?,
                Op::Gt => binary_compare(&mut stack, line, |o| o == std::cmp::Ordering::Greater)?,
                Op::GtEq => binary_compare(&mut stack, line, |o| o != std::cmp::Ordering::Less)?,
                Op::In => {
                    let haystack = pop_value(&mut stack, line)?;
                    let needle = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(Value::Boolean(ops::contains(&needle, &haystack, line, 0)?)));
                }
                Op::IsNull => {
                    let a = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(Value::Boolean(matches!(a, Value::Null))));
                }

                Op::Dup => {
                    let top = stack.last().cloned().ok_or_else(|| internal_stack_error(line))?;
                    stack.push(top);
                }
                Op::Swap => {
                    let len = stack.len();
                    if len < 2 {
                        return Err(internal_stack_error(line));
                    }
                    stack.swap(len - 1, len - 2);
                }
                Op::Pop => {
                    stack.pop().ok_or_else(|| internal_stack_error(line))?;
                }

                Op::BuildArray => {
                    let n = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let mut items = Vec::with_capacity(n);
                    for _ in 0..n {
                        items.push(pop_value(&mut stack, line)?);
                    }
                    items.reverse();
                    stack.push(Slot::Value(Value::array(items)));
                }
                Op::BuildMap => {
                    let n = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let mut pairs = Vec::with_capacity(n);
                    for _ in 0..n {
                        let value = pop_value(&mut stack, line)?;
                        let key = pop_value(&mut stack, line)?;
                        pairs.push((key.to_string(), value));
                    }
                    pairs.reverse();
                    let mut map = IndexMap::with_capacity(n);
                    for (key, value) in pairs {
                        map.insert(key, value);
                    }
                    stack.push(Slot::Value(Value::map(map)));
                }
                Op::BuildRegex => {
                    let pattern = pop_value(&mut stack, line)?;
                    let Value::String(pattern) = pattern else {
                        return Err(GridError::runtime(line, 0, "regex literal pattern must be a string"));
                    };
                    let compiled = regex::Regex::new(&crate::value::translate_named_groups(&pattern))
                        .map_err(|e| GridError::runtime(line, 0, format!("invalid regex '{pattern}': {e}")))?;
                    stack.push(Slot::Value(Value::Regex(Rc::new(crate::value::RegexValue {
                        pattern: pattern.to_string(),
                        compiled,
                    }))));
                }
                Op::Index => {
                    let index = pop_value(&mut stack, line)?;
                    let target = pop_value(&mut stack, line)?;
                    stack.push(Slot::Value(ops::index_get(&target, &index, line, 0)?));
                }
                Op::StoreIndex => {
                    let index = pop_value(&mut stack, line)?;
                    let target = pop_value(&mut stack, line)?;
                    let value = pop_value(&mut stack, line)?;
                    ops::index_set(&target, &index, value, line, 0)?;
                }
                Op::GetMember => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let target = pop_value(&mut stack, line)?;
                    let name = &chunk.names[idx];
                    stack.push(Slot::Value(ops::get_member(&target, name, line, 0)?));
                }
                Op::StoreMember => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let target = pop_value(&mut stack, line)?;
                    let value = pop_value(&mut stack, line)?;
                    let name = &chunk.names[idx];
                    ops::store_member(&target, name, value, line, 0)?;
                }

                Op::Jump => {
                    let target = chunk.read_u16(ip) as usize;
                    ip = target;
                }
                Op::JumpIfFalse => {
                    let target = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let cond = pop_value(&mut stack, line)?;
                    if !cond.is_truthy() {
                        ip = target;
                    }
                }
                Op::JumpIfFalseNoPop => {
                    let target = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let cond = stack.last().ok_or_else(|| internal_stack_error(line))?;
                    let falsy = !matches!(cond, Slot::Value(v) if v.is_truthy());
                    if falsy {
                        ip = target;
                    }
                }
                Op::JumpIfTrueNoPop => {
                    let target = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let cond = stack.last().ok_or_else(|| internal_stack_error(line))?;
                    let truthy = matches!(cond, Slot::Value(v) if v.is_truthy());
                    if truthy {
                        ip = target;
                    }
                }

                Op::GetIter => {
                    let target = pop_value(&mut stack, line)?;
                    stack.push(Slot::Iter(IterState::new(&target, line, 0)?));
                }
                Op::ForIter => {
                    let target = chunk.read_u16(ip) as usize;
                    let two_var = chunk.read_u8(ip + 2) != 0;
                    ip += 3;
                    let Some(Slot::Iter(state)) = stack.last_mut() else {
                        return Err(internal_stack_error(line));
                    };
                    match state.advance(two_var) {
                        Some((element, index)) => {
                            stack.push(Slot::Value(element));
                            if let Some(index) = index {
                                stack.push(Slot::Value(index));
                            }
                        }
                        None => ip = target,
                    }
                }

                Op::Call => {
                    let argc = chunk.read_u8(ip) as usize;
                    ip += 1;
                    let mut args = Vec::with_capacity(argc);
                    for _ in 0..argc {
                        args.push(pop_value(&mut stack, line)?);
                    }
                    args.reverse();
                    let callee = pop_value(&mut stack, line)?;
                    let result = self.call_value(&callee, &args, line, 0)?;
                    stack.push(Slot::Value(result));
                }
                Op::Return => {
                    return pop_value(&mut stack, line);
                }

                Op::MakeFunc => {
                    let idx = chunk.read_u16(ip) as usize;
                    ip += 2;
                    let proto = &chunk.functions[idx];
                    let closure = Closure {
                        name: proto.name.clone(),
                        params: proto.params.clone(),
                        body: Body::Code(proto.chunk.clone()),
                        captured: scope.clone(),
                    };
                    stack.push(Slot::Value(Value::Func(Rc::new(closure))));
                }

                Op::Halt => return Ok(Value::Null),
            }
        }
    }
}

fn pop_value(stack: &mut Vec<Slot>, line: u32) -> GridResult<Value> {
    match stack.pop() {
        Some(Slot::Value(v)) => Ok(v),
        Some(Slot::Iter(_)) => Err(GridError::runtime(line, 0, "internal error: expected a value, found an iterator")),
        None => Err(internal_stack_error(line)),
    }
}

fn internal_stack_error(line: u32) -> GridError {
    GridError::runtime(line, 0, "internal error: operand stack underflow")
}

fn binary_arith(stack: &mut Vec<Slot>, line: u32, f: fn(f64, f64) -> f64) -> GridResult<()> {
    let b = pop_value(stack, line)?;
    let a = pop_value(stack, line)?;
    stack.push(Slot::Value(ops::arith(f, &a, &b)));
    Ok(())
}

fn binary_compare(stack: &mut Vec<Slot>, line: u32, f: fn(std::cmp::Ordering) -> bool) -> GridResult<()> {
    let b = pop_value(stack, line)?;
    let a = pop_value(stack, line)?;
    let ordering = ops::compare(&a, &b, line, 0)?;
    stack.push(Slot::Value(Value::Boolean(f(ordering))));
    Ok(())
}

impl<'h> Engine for Vm<'h> {
    fn call_value(&mut self, callee: &Value, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
        match callee {
            Value::Func(closure) => self.call_closure(closure, args, line, col),
            Value::Native(_) | Value::BoundMethod { .. } => ops::call_builtin_or_method(self, callee, args, line, col)?
                .ok_or_else(|| GridError::runtime(line, col, "value is not callable")),
            _ => Err(GridError::runtime(line, col, format!("{} is not callable", callee.type_name()))),
        }
    }

    fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }

    fn debug_enabled(&self) -> bool {
        *self.debug
    }

    fn set_debug_enabled(&mut self, enabled: bool) {
        *self.debug = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bytecode::compiler::compile, host::NullHost, lexer::Lexer, parser::Parser};

    fn run_source(src: &str) -> (Value, String) {
        let tokens = Lexer::tokenize(src).unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        let chunk = Rc::new(compile(&program).unwrap());
        let mut host = NullHost::default();
        let mut debug = false;
        let mut vm = Vm::new(&mut host, &mut debug, Config::default());
        let scope = Scope::root();
        for (name, _) in crate::builtins::table() {
            scope.borrow_mut().declare(*name, Value::Native(*name));
        }
        let result = vm.run(&chunk, scope).unwrap();
        (result, host.output().to_string())
    }

    #[test]
    fn arithmetic_and_print() {
        let (_, out) = run_source("print(1 + 2 * 3)");
        assert_eq!(out, "7\n");
    }

    #[test]
    fn while_loop_accumulates() {
        let (_, out) = run_source("i = 0\ntotal = 0\nwhile (i < 5) {\n  total = total + i\n  i = i + 1\n}\nprint(total)");
        assert_eq!(out, "10\n");
    }

    #[test]
    fn for_loop_two_variables_over_array() {
        let (_, out) = run_source("for i, v in [10, 20, 30] {\n  print(i, v)\n}");
        assert_eq!(out, "0 10\n1 20\n2 30\n");
    }

    #[test]
    fn break_exits_loop_and_discards_iterator() {
        let (_, out) = run_source("for v in [1, 2, 3] {\n  if (v == 2) { break }\n  print(v)\n}\nprint(\"done\")");
        assert_eq!(out, "1\ndone\n");
    }

    #[test]
    fn user_function_call_and_closure_capture() {
        let (_, out) = run_source("func add(a, b) {\n  return a + b\n}\nprint(add(2, 3))");
        assert_eq!(out, "5\n");
    }

    #[test]
    fn chained_assignment_shares_the_final_value() {
        let (_, out) = run_source("a = b = 5\nprint(a, b)");
        assert_eq!(out, "5 5\n");
    }
}
