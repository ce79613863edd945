//! Tree-walk evaluator (spec §4.6): a second, independent way to run the
//! same AST the compiler lowers to bytecode, sharing `Scope`/`Value`/`ops`/
//! `builtins` with the VM so the two backends can only drift on *how* they
//! execute, never on *what* an operation means (spec §8 "Backend
//! equivalence").
//!
//! Grounded in shape on the VM's own `run_chunk`: one `eval_stmt` per
//! statement kind, `?` for error propagation, and user calls recursing
//! natively into Rust (`eval_block` for a function body) rather than an
//! explicit call-frame stack.

use std::{cell::RefCell, rc::Rc};

use crate::{
    ast::{AssignTarget, BinaryOp, Expr, ExprKind, FuncDef, MapKey, Program, Stmt, StmtKind, UnaryOp},
    config::Config,
    engine::Engine,
    error::{GridError, GridResult},
    host::Host,
    ops,
    scope::Scope,
    value::{Body, Closure, Value},
};

/// How a statement (or block) finished: fell off the end, or is unwinding
/// toward an enclosing loop/function.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Evaluator<'h> {
    host: &'h mut dyn Host,
    debug: &'h mut bool,
    config: Config,
    call_depth: usize,
}

impl<'h> Evaluator<'h> {
    pub fn new(host: &'h mut dyn Host, debug: &'h mut bool, config: Config) -> Self {
        Self { host, debug, config, call_depth: 0 }
    }

    pub fn run(&mut self, program: &Program, scope: Rc<RefCell<Scope>>) -> GridResult<Value> {
        match self.eval_block(&program.statements, &scope)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Null),
        }
    }

    fn eval_block(&mut self, stmts: &[Stmt], scope: &Rc<RefCell<Scope>>) -> GridResult<Flow> {
        for stmt in stmts {
            match self.eval_stmt(stmt, scope)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, scope: &Rc<RefCell<Scope>>) -> GridResult<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval_expr(expr, scope)?;
                Ok(Flow::Normal)
            }
            StmtKind::Assignment { target, value } => {
                let v = self.eval_expr(value, scope)?;
                self.assign(target, v, scope)?;
                Ok(Flow::Normal)
            }
            StmtKind::ChainAssignment { targets, value } => {
                let v = self.eval_expr(value, scope)?;
                for target in targets {
                    self.assign(target, v.clone(), scope)?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::MultiAssignment { targets, value } => {
                let v = self.eval_expr(value, scope)?;
                for (i, target) in targets.iter().enumerate() {
                    let element = ops::index_get(&v, &Value::Number(i as f64), stmt.line, stmt.col)?;
                    self.assign(target, element, scope)?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, scope)?.is_truthy() {
                    self.eval_block(then_branch, scope)
                } else if let Some(else_stmts) = else_branch {
                    self.eval_block(else_stmts, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval_expr(cond, scope)?.is_truthy() {
                    match self.eval_block(body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For { var, index_var, iterable, body } => {
                let target = self.eval_expr(iterable, scope)?;
                let items = iteration_items(&target, stmt.line, stmt.col)?;
                for (index, element) in items.into_iter().enumerate() {
                    let iter_scope = Scope::child(scope);
                    if let Some(idx_name) = index_var {
                        iter_scope.borrow_mut().declare(idx_name.clone(), Value::Number(index as f64));
                    }
                    iter_scope.borrow_mut().declare(var.clone(), element);
                    match self.eval_block(body, &iter_scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::FuncDef(def) => {
                let closure = self.make_closure(def, scope);
                let name = def.name.clone().expect("top-level func definitions are named");
                scope.borrow_mut().declare(name, closure);
                Ok(Flow::Normal)
            }
            StmtKind::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval_expr(e, scope)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(v))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Block(stmts) => self.eval_block(stmts, scope),
        }
    }

    fn assign(&mut self, target: &AssignTarget, value: Value, scope: &Rc<RefCell<Scope>>) -> GridResult<()> {
        match target {
            AssignTarget::Identifier(name) => {
                Scope::assign(scope, name, value);
                Ok(())
            }
            AssignTarget::Index { target, index } => {
                let t = self.eval_expr(target, scope)?;
                let i = self.eval_expr(index, scope)?;
                ops::index_set(&t, &i, value, target.line, target.col)
            }
            AssignTarget::Member { target, member } => {
                let t = self.eval_expr(target, scope)?;
                ops::store_member(&t, member, value, target.line, target.col)
            }
        }
    }

    fn make_closure(&self, def: &Rc<FuncDef>, scope: &Rc<RefCell<Scope>>) -> Value {
        Value::Func(Rc::new(Closure {
            name: def.name.clone(),
            params: def.params.clone(),
            body: Body::Tree(def.body.clone()),
            captured: scope.clone(),
        }))
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Rc<RefCell<Scope>>) -> GridResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::string(s.as_str())),
            ExprKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::RegexLiteral(pattern) => {
                let compiled = regex::Regex::new(&crate::value::translate_named_groups(pattern))
                    .map_err(|e| GridError::runtime(expr.line, expr.col, format!("invalid regex '{pattern}': {e}")))?;
                Ok(Value::Regex(Rc::new(crate::value::RegexValue { pattern: pattern.clone(), compiled })))
            }
            ExprKind::FString(segments) => {
                let mut out = String::new();
                for seg in segments {
                    match seg {
                        crate::ast::FStringSegment::Literal(s) => out.push_str(s),
                        crate::ast::FStringSegment::Path(path) => {
                            out.push_str(&self.eval_fstring_path(path, scope, expr)?.to_string());
                        }
                    }
                }
                Ok(Value::string(out))
            }
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scope)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Map(entries) => {
                let mut map = indexmap::IndexMap::with_capacity(entries.len());
                for (key, value_expr) in entries {
                    let key_str = match key {
                        MapKey::Identifier(name) | MapKey::String(name) => name.clone(),
                        MapKey::Computed(key_expr) => self.eval_expr(key_expr, scope)?.to_string(),
                    };
                    let value = self.eval_expr(value_expr, scope)?;
                    map.insert(key_str, value);
                }
                Ok(Value::map(map))
            }
            ExprKind::Identifier(name) => scope
                .borrow()
                .get(name)
                .ok_or_else(|| GridError::runtime(expr.line, expr.col, format!("undefined variable '{name}'"))),
            ExprKind::Index { target, index } => {
                let t = self.eval_expr(target, scope)?;
                let i = self.eval_expr(index, scope)?;
                ops::index_get(&t, &i, expr.line, expr.col)
            }
            ExprKind::MemberAccess { target, member } => {
                let t = self.eval_expr(target, scope)?;
                ops::get_member(&t, member, expr.line, expr.col)
            }
            ExprKind::BinaryOp { op: BinaryOp::And, left, right } => {
                let l = self.eval_expr(left, scope)?;
                if !l.is_truthy() { Ok(l) } else { self.eval_expr(right, scope) }
            }
            ExprKind::BinaryOp { op: BinaryOp::Or, left, right } => {
                let l = self.eval_expr(left, scope)?;
                if l.is_truthy() { Ok(l) } else { self.eval_expr(right, scope) }
            }
            ExprKind::BinaryOp { op, left, right } => {
                let l = self.eval_expr(left, scope)?;
                let r = self.eval_expr(right, scope)?;
                eval_binary(op, &l, &r, expr.line, expr.col)
            }
            ExprKind::UnaryOp { op: UnaryOp::Neg, operand } => {
                let v = self.eval_expr(operand, scope)?;
                Ok(match v {
                    Value::Number(n) => Value::Number(-n),
                    _ => Value::Number(f64::NAN),
                })
            }
            ExprKind::UnaryOp { op: UnaryOp::Not, operand } => {
                let v = self.eval_expr(operand, scope)?;
                Ok(Value::Boolean(!v.is_truthy()))
            }
            ExprKind::Ternary { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, scope)?.is_truthy() {
                    self.eval_expr(then_branch, scope)
                } else {
                    self.eval_expr(else_branch, scope)
                }
            }
            ExprKind::Elvis { left, right } => {
                let l = self.eval_expr(left, scope)?;
                if matches!(l, Value::Null) { self.eval_expr(right, scope) } else { Ok(l) }
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.eval_expr(callee, scope)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg, scope)?);
                }
                self.call_value(&callee_value, &arg_values, expr.line, expr.col)
            }
            ExprKind::FuncExpr(def) => Ok(self.make_closure(def, scope)),
        }
    }

    fn eval_fstring_path(&mut self, path: &[String], scope: &Rc<RefCell<Scope>>, expr: &Expr) -> GridResult<Value> {
        let mut parts = path.iter();
        let first = parts.next().expect("f-string path is never empty");
        let mut value = scope
            .borrow()
            .get(first)
            .ok_or_else(|| GridError::runtime(expr.line, expr.col, format!("undefined variable '{first}'")))?;
        for member in parts {
            value = ops::get_member(&value, member, expr.line, expr.col)?;
        }
        Ok(value)
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
        let Body::Tree(body) = &closure.body else {
            return Err(GridError::runtime(line, col, "cannot run a compiled function body under the tree-walk backend"));
        };
        if self.call_depth >= self.config.max_call_depth {
            return Err(GridError::runtime(line, col, "maximum call depth exceeded"));
        }
        let scope = Scope::child(&closure.captured);
        let mut args_iter = args.iter().cloned();
        for param in &closure.params {
            scope.borrow_mut().declare(param.clone(), args_iter.next().unwrap_or(Value::Null));
        }
        self.call_depth += 1;
        let result = self.eval_block(body, &scope);
        self.call_depth -= 1;
        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Null),
        }
    }
}

fn eval_binary(op: &BinaryOp, l: &Value, r: &Value, line: u32, col: u32) -> GridResult<Value> {
    match op {
        BinaryOp::Add => ops::add(l, r, line, col),
        BinaryOp::Sub => Ok(ops::arith(|a, b| a - b, l, r)),
        BinaryOp::Mul => Ok(ops::arith(|a, b| a * b, l, r)),
        BinaryOp::Div => Ok(ops::arith(|a, b| a / b, l, r)),
        BinaryOp::Mod => Ok(ops::arith(|a, b| a % b, l, r)),
        BinaryOp::Pow => Ok(ops::arith(f64::powf, l, r)),
        BinaryOp::Eq => Ok(Value::Boolean(Value::values_equal(l, r))),
        BinaryOp::NotEq => Ok(Value::Boolean(!Value::values_equal(l, r))),
        BinaryOp::Lt => ops::compare(l, r, line, col).map(|o| Value::Boolean(o == std::cmp::Ordering::Less)),
        BinaryOp::LtEq => ops::compare(l, r, line, col).map(|o| Value::Boolean(o != std::cmp::Ordering::Greater)),
        BinaryOp::Gt => ops::compare(l, r, line, col).map(|o| Value::Boolean(o == std::cmp::Ordering::Greater)),
        BinaryOp::GtEq => ops::compare(l, r, line, col).map(|o| Value::Boolean(o != std::cmp::Ordering::Less)),
        BinaryOp::In => ops::contains(l, r, line, col).map(Value::Boolean),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops are evaluated separately"),
    }
}

/// Materializes a `for`-loop's elements up front (spec places no constraint
/// forbidding this; unlike the VM's lazily-advanced `IterState`, the
/// tree-walk backend has no bytecode operand stack to stash a cursor in, so
/// cloning the snapshot at loop entry is the natural fit — mutating the
/// underlying array mid-loop does not retroactively change what's iterated,
/// matching the VM, whose `IterState` also holds its own `Rc` clone of the
/// array taken at `GET_ITER` time).
fn iteration_items(target: &Value, line: u32, col: u32) -> GridResult<Vec<Value>> {
    match target {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Value::Map(m) => Ok(m.borrow().keys().map(|k| Value::string(k.clone())).collect()),
        _ => Err(GridError::runtime(line, col, format!("cannot iterate over {}", target.type_name()))),
    }
}

impl<'h> Engine for Evaluator<'h> {
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
    use crate::{host::NullHost, lexer::Lexer, parser::Parser};

    fn run_source(src: &str) -> (Value, String) {
        let tokens = Lexer::tokenize(src).unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        let mut host = NullHost::default();
        let mut debug = false;
        let mut eval = Evaluator::new(&mut host, &mut debug, Config::default());
        let scope = Scope::root();
        for (name, _) in crate::builtins::table() {
            scope.borrow_mut().declare(*name, Value::Native(*name));
        }
        let result = eval.run(&program, scope).unwrap();
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
    fn user_function_call_and_recursion() {
        let (_, out) = run_source(
            "func fact(n) {\n  if (n <= 1) { return 1 }\n  return n * fact(n - 1)\n}\nprint(fact(5))",
        );
        assert_eq!(out, "120\n");
    }

    #[test]
    fn elvis_falls_through_only_on_null() {
        let (_, out) = run_source("x = null\nprint(x ?: 9)\ny = 0\nprint(y ?: 9)");
        assert_eq!(out, "9\n0\n");
    }

    #[test]
    fn break_and_continue_inside_for() {
        let (_, out) = run_source(
            "for v in [1, 2, 3, 4] {\n  if (v == 2) { continue }\n  if (v == 4) { break }\n  print(v)\n}",
        );
        assert_eq!(out, "1\n3\n");
    }
}
