//! AST-to-chunk compiler (spec §4.4).

use std::rc::Rc;

use crate::{
    ast::{AssignTarget, BinaryOp, Expr, ExprKind, FStringSegment, FuncDef, MapKey, Program, Stmt, StmtKind, UnaryOp},
    bytecode::{
        builder::{ChunkBuilder, JumpLabel},
        chunk::{Chunk, FuncProto},
        op::Op,
    },
    error::{GridError, GridResult},
    value::Value,
};

pub fn compile(program: &Program) -> GridResult<Chunk> {
    let mut compiler = Compiler::new();
    compiler.compile_block(&program.statements)?;
    compiler.builder.emit(Op::Halt);
    Ok(compiler.builder.build())
}

/// One loop's pending `break`/`continue` jump labels, patched once the
/// loop's exit and continuation offsets are known (spec §4.4 "Loop sugar").
struct LoopContext {
    break_labels: Vec<JumpLabel>,
    continue_labels: Vec<JumpLabel>,
}

struct Compiler {
    builder: ChunkBuilder,
    loops: Vec<LoopContext>,
}

impl Compiler {
    fn new() -> Self {
        Self { builder: ChunkBuilder::new(), loops: Vec::new() }
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> GridResult<()> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> GridResult<()> {
        self.builder.set_line(stmt.line);
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.compile_expr(expr)?;
                self.builder.emit(Op::Pop);
            }
            StmtKind::Assignment { target, value } => {
                self.compile_expr(value)?;
                self.compile_assign_target(target)?;
            }
            StmtKind::ChainAssignment { targets, value } => {
                self.compile_expr(value)?;
                for (i, target) in targets.iter().enumerate() {
                    if i + 1 < targets.len() {
                        self.builder.emit(Op::Dup);
                    }
                    self.compile_assign_target(target)?;
                }
            }
            StmtKind::MultiAssignment { targets, value } => {
                self.compile_expr(value)?;
                for (i, target) in targets.iter().enumerate() {
                    if i + 1 < targets.len() {
                        self.builder.emit(Op::Dup);
                    }
                    let idx = self.builder.add_const(Value::Number(i as f64));
                    self.builder.emit_u16(Op::Const, idx);
                    self.builder.emit(Op::Index);
                    self.compile_assign_target(target)?;
                }
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.compile_expr(cond)?;
                let else_jump = self.builder.emit_jump(Op::JumpIfFalse);
                self.compile_block(then_branch)?;
                let end_jump = self.builder.emit_jump(Op::Jump);
                self.builder.patch_jump(else_jump);
                if let Some(else_stmts) = else_branch {
                    self.compile_block(else_stmts)?;
                }
                self.builder.patch_jump(end_jump);
            }
            StmtKind::While { cond, body } => {
                let loop_start = self.builder.current_offset();
                self.compile_expr(cond)?;
                let exit_jump = self.builder.emit_jump(Op::JumpIfFalse);
                self.loops.push(LoopContext { break_labels: Vec::new(), continue_labels: Vec::new() });
                self.compile_block(body)?;
                let ctx = self.loops.pop().unwrap();
                for label in ctx.continue_labels {
                    self.builder.patch_jump_to(label, loop_start);
                }
                self.builder.emit_jump_to_known(Op::Jump, loop_start);
                self.builder.patch_jump(exit_jump);
                for label in ctx.break_labels {
                    self.builder.patch_jump(label);
                }
            }
            StmtKind::For { var, index_var, iterable, body } => {
                self.compile_expr(iterable)?;
                self.builder.emit(Op::GetIter);
                let loop_start = self.builder.current_offset();
                let two_var = index_var.is_some();
                let exit_jump = self.builder.emit_jump_with_flag(Op::ForIter, u8::from(two_var));
                // FOR_ITER leaves the index/key on top when two_var is set.
                if let Some(idx_name) = index_var {
                    let idx_slot = self.builder.add_name(idx_name);
                    self.builder.emit_u16(Op::StoreVar, idx_slot);
                }
                let var_slot = self.builder.add_name(var);
                self.builder.emit_u16(Op::StoreVar, var_slot);
                self.loops.push(LoopContext { break_labels: Vec::new(), continue_labels: Vec::new() });
                self.compile_block(body)?;
                let ctx = self.loops.pop().unwrap();
                for label in ctx.continue_labels {
                    self.builder.patch_jump_to(label, loop_start);
                }
                self.builder.emit_jump_to_known(Op::Jump, loop_start);
                // The exit target is this trailing POP, which discards the
                // iterator handle GET_ITER left on the stack; `break` lands
                // here too (spec §4.4 "For").
                let pop_offset = self.builder.current_offset();
                self.builder.patch_jump_to(exit_jump, pop_offset);
                self.builder.emit(Op::Pop);
                for label in ctx.break_labels {
                    self.builder.patch_jump_to(label, pop_offset);
                }
            }
            StmtKind::FuncDef(def) => {
                self.compile_func_value(def)?;
                let name = def.name.as_deref().expect("top-level func definitions are named");
                let slot = self.builder.add_name(name);
                self.builder.emit_u16(Op::StoreVar, slot);
            }
            StmtKind::Return(expr) => {
                match expr {
                    Some(e) => self.compile_expr(e)?,
                    None => self.builder.emit(Op::LoadNull),
                }
                self.builder.emit(Op::Return);
            }
            StmtKind::Break => {
                let label = self.builder.emit_jump(Op::Jump);
                let ctx = self
                    .loops
                    .last_mut()
                    .ok_or_else(|| GridError::compile(stmt.line, stmt.col, "'break' outside of a loop"))?;
                ctx.break_labels.push(label);
            }
            StmtKind::Continue => {
                let label = self.builder.emit_jump(Op::Jump);
                let ctx = self
                    .loops
                    .last_mut()
                    .ok_or_else(|| GridError::compile(stmt.line, stmt.col, "'continue' outside of a loop"))?;
                ctx.continue_labels.push(label);
            }
            StmtKind::Block(stmts) => self.compile_block(stmts)?,
        }
        Ok(())
    }

    fn compile_assign_target(&mut self, target: &AssignTarget) -> GridResult<()> {
        match target {
            AssignTarget::Identifier(name) => {
                let slot = self.builder.add_name(name);
                self.builder.emit_u16(Op::StoreVar, slot);
            }
            AssignTarget::Index { target, index } => {
                self.compile_expr(target)?;
                self.compile_expr(index)?;
                self.builder.emit(Op::StoreIndex);
            }
            AssignTarget::Member { target, member } => {
                self.compile_expr(target)?;
                let slot = self.builder.add_name(member);
                self.builder.emit_u16(Op::StoreMember, slot);
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> GridResult<()> {
        self.builder.set_line(expr.line);
        match &expr.kind {
            ExprKind::Number(n) => {
                let idx = self.builder.add_const(Value::Number(*n));
                self.builder.emit_u16(Op::Const, idx);
            }
            ExprKind::String(s) => {
                let idx = self.builder.add_const(Value::string(s.as_str()));
                self.builder.emit_u16(Op::Const, idx);
            }
            ExprKind::Boolean(true) => self.builder.emit(Op::LoadTrue),
            ExprKind::Boolean(false) => self.builder.emit(Op::LoadFalse),
            ExprKind::Null => self.builder.emit(Op::LoadNull),
            ExprKind::RegexLiteral(pattern) => {
                let idx = self.builder.add_const(Value::string(pattern.as_str()));
                self.builder.emit_u16(Op::Const, idx);
                self.builder.emit(Op::BuildRegex);
            }
            ExprKind::FString(segments) => {
                let count = segments.len();
                if count == 0 {
                    let idx = self.builder.add_const(Value::string(""));
                    self.builder.emit_u16(Op::Const, idx);
                } else {
                    for segment in segments {
                        match segment {
                            FStringSegment::Literal(text) => {
                                let idx = self.builder.add_const(Value::string(text.as_str()));
                                self.builder.emit_u16(Op::Const, idx);
                            }
                            FStringSegment::Path(path) => {
                                let str_slot = self.builder.add_name("str");
                                self.builder.emit_u16(Op::LoadVar, str_slot);
                                let slot = self.builder.add_name(&path[0]);
                                self.builder.emit_u16(Op::LoadVar, slot);
                                for segment_name in &path[1..] {
                                    let member_slot = self.builder.add_name(segment_name);
                                    self.builder.emit_u16(Op::GetMember, member_slot);
                                }
                                self.builder.emit_u8(Op::Call, 1);
                            }
                        }
                    }
                    // Concatenation folds left-to-right via the `+` operator
                    // (spec §4.4 "f-strings lower to string concatenation").
                    for _ in 1..count {
                        self.builder.emit(Op::Add);
                    }
                }
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.compile_expr(item)?;
                }
                let len = u16::try_from(items.len()).expect("array literal too large");
                self.builder.emit_u16(Op::BuildArray, len);
            }
            ExprKind::Map(entries) => {
                for (key, value) in entries {
                    match key {
                        MapKey::Identifier(name) | MapKey::String(name) => {
                            let idx = self.builder.add_const(Value::string(name.as_str()));
                            self.builder.emit_u16(Op::Const, idx);
                        }
                        MapKey::Computed(key_expr) => self.compile_expr(key_expr)?,
                    }
                    self.compile_expr(value)?;
                }
                let len = u16::try_from(entries.len()).expect("map literal too large");
                self.builder.emit_u16(Op::BuildMap, len);
            }
            ExprKind::Identifier(name) => {
                let slot = self.builder.add_name(name);
                self.builder.emit_u16(Op::LoadVar, slot);
            }
            ExprKind::Index { target, index } => {
                self.compile_expr(target)?;
                self.compile_expr(index)?;
                self.builder.emit(Op::Index);
            }
            ExprKind::MemberAccess { target, member } => {
                self.compile_expr(target)?;
                let slot = self.builder.add_name(member);
                self.builder.emit_u16(Op::GetMember, slot);
            }
            ExprKind::BinaryOp { op: BinaryOp::And, left, right } => {
                self.compile_expr(left)?;
                let short_circuit = self.builder.emit_jump(Op::JumpIfFalseNoPop);
                self.builder.emit(Op::Pop);
                self.compile_expr(right)?;
                self.builder.patch_jump(short_circuit);
            }
            ExprKind::BinaryOp { op: BinaryOp::Or, left, right } => {
                self.compile_expr(left)?;
                let short_circuit = self.builder.emit_jump(Op::JumpIfTrueNoPop);
                self.builder.emit(Op::Pop);
                self.compile_expr(right)?;
                self.builder.patch_jump(short_circuit);
            }
            ExprKind::BinaryOp { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.builder.emit(binary_op_code(op));
            }
            ExprKind::UnaryOp { op, operand } => {
                self.compile_expr(operand)?;
                self.builder.emit(match op {
                    UnaryOp::Neg => Op::Neg,
                    UnaryOp::Not => Op::Not,
                });
            }
            ExprKind::Ternary { cond, then_branch, else_branch } => {
                self.compile_expr(cond)?;
                let else_jump = self.builder.emit_jump(Op::JumpIfFalse);
                self.compile_expr(then_branch)?;
                let end_jump = self.builder.emit_jump(Op::Jump);
                self.builder.patch_jump(else_jump);
                self.compile_expr(else_branch)?;
                self.builder.patch_jump(end_jump);
            }
            ExprKind::Elvis { left, right } => {
                // `left ?: right`: evaluate `left` once, use it unless null.
                self.compile_expr(left)?;
                self.builder.emit(Op::Dup);
                self.builder.emit(Op::IsNull);
                let left_is_not_null = self.builder.emit_jump(Op::JumpIfFalse);
                self.builder.emit(Op::Pop);
                self.compile_expr(right)?;
                self.builder.patch_jump(left_is_not_null);
            }
            ExprKind::Call { callee, args } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                let argc = u8::try_from(args.len()).expect("too many call arguments");
                self.builder.emit_u8(Op::Call, argc);
            }
            ExprKind::FuncExpr(def) => self.compile_func_value(def)?,
        }
        Ok(())
    }

    fn compile_func_value(&mut self, def: &Rc<FuncDef>) -> GridResult<()> {
        let mut inner = Compiler::new();
        inner.compile_block(&def.body)?;
        inner.builder.emit(Op::LoadNull);
        inner.builder.emit(Op::Return);
        let chunk = Rc::new(inner.builder.build());
        let proto = FuncProto { name: def.name.clone(), params: def.params.clone(), chunk };
        let idx = self.builder.add_function(proto);
        self.builder.emit_u16(Op::MakeFunc, idx);
        Ok(())
    }
}

fn binary_op_code(op: &BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Mod => Op::Mod,
        BinaryOp::Pow => Op::Pow,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::NotEq => Op::NotEq,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::LtEq => Op::LtEq,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::GtEq => Op::GtEq,
        BinaryOp::In => Op::In,
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops are compiled separately"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};

    fn compile_src(src: &str) -> Chunk {
        let tokens = Lexer::tokenize(src).unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        compile(&program).unwrap()
    }

    #[test]
    fn simple_arithmetic_compiles() {
        let chunk = compile_src("x = 1 + 2");
        assert!(chunk.code.contains(&(Op::Add as u8)));
        assert!(chunk.code.last() == Some(&(Op::Halt as u8)));
    }

    #[test]
    fn break_outside_loop_is_compile_error() {
        let tokens = Lexer::tokenize("break").unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        let err = compile(&program).unwrap_err();
        assert!(matches!(err, GridError::Compile(_)));
    }
}
