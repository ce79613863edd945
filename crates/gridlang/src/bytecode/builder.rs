//! Builder for emitting bytecode during compilation.
//!
//! `ChunkBuilder` mirrors the teacher's `CodeBuilder`: emit helpers plus
//! forward-jump labels that get patched once the target offset is known.
//! Jumps are absolute 16-bit big-endian offsets (spec §4.3), unlike the
//! teacher's relative little-endian scheme.

use crate::{
    bytecode::chunk::{Chunk, FuncProto},
    bytecode::op::Op,
    value::Value,
};

#[derive(Debug, Clone, Copy)]
pub struct JumpLabel(usize);

#[derive(Debug, Default)]
pub struct ChunkBuilder {
    code: Vec<u8>,
    constants: Vec<Value>,
    names: Vec<String>,
    lines: Vec<u32>,
    functions: Vec<FuncProto>,
    current_line: u32,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn emit(&mut self, op: Op) {
        self.code.push(op as u8);
        self.lines.push(self.current_line);
    }

    pub fn emit_u16(&mut self, op: Op, operand: u16) {
        self.code.push(op as u8);
        self.lines.push(self.current_line);
        self.code.extend_from_slice(&operand.to_be_bytes());
        self.lines.push(self.current_line);
        self.lines.push(self.current_line);
    }

    pub fn emit_u8(&mut self, op: Op, operand: u8) {
        self.code.push(op as u8);
        self.lines.push(self.current_line);
        self.code.push(operand);
        self.lines.push(self.current_line);
    }

    /// Emits a jump with a placeholder offset, returning a label to patch.
    #[must_use]
    pub fn emit_jump(&mut self, op: Op) -> JumpLabel {
        let label = JumpLabel(self.code.len());
        self.emit_u16(op, 0);
        label
    }

    /// Emits a jump instruction that carries one extra trailing flag byte
    /// after the u16 operand (`ForIter`'s single/two-variable flag).
    #[must_use]
    pub fn emit_jump_with_flag(&mut self, op: Op, flag: u8) -> JumpLabel {
        let label = self.emit_jump(op);
        self.code.push(flag);
        self.lines.push(self.current_line);
        label
    }

    /// Patches a previously emitted jump to target the current code offset.
    pub fn patch_jump(&mut self, label: JumpLabel) {
        self.patch_jump_to(label, self.code.len());
    }

    pub fn patch_jump_to(&mut self, label: JumpLabel, target: usize) {
        let target = u16::try_from(target).expect("chunk exceeds 65535 bytes");
        let bytes = target.to_be_bytes();
        self.code[label.0 + 1] = bytes[0];
        self.code[label.0 + 2] = bytes[1];
    }

    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emits a jump to an already-known target (backward jumps, e.g. loop
    /// headers), needing no later patching.
    pub fn emit_jump_to_known(&mut self, op: Op, target: usize) {
        let label = self.emit_jump(op);
        self.patch_jump_to(label, target);
    }

    /// Adds a constant, reusing an existing slot when an identical one
    /// already exists for numbers/strings/booleans (spec §4.3 "constant
    /// pool dedup").
    pub fn add_const(&mut self, value: Value) -> u16 {
        if let Some(idx) = self.constants.iter().position(|c| const_eq(c, &value)) {
            return u16::try_from(idx).expect("constant pool exceeds u16 range");
        }
        let idx = self.constants.len();
        self.constants.push(value);
        u16::try_from(idx).expect("constant pool exceeds u16 range")
    }

    /// Adds a name, reusing an existing slot if already interned.
    pub fn add_name(&mut self, name: &str) -> u16 {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            return u16::try_from(idx).expect("name pool exceeds u16 range");
        }
        let idx = self.names.len();
        self.names.push(name.to_owned());
        u16::try_from(idx).expect("name pool exceeds u16 range")
    }

    /// Adds a nested function prototype, returning its index for `MakeFunc`.
    pub fn add_function(&mut self, proto: FuncProto) -> u16 {
        let idx = self.functions.len();
        self.functions.push(proto);
        u16::try_from(idx).expect("function pool exceeds u16 range")
    }

    pub fn build(self) -> Chunk {
        Chunk {
            code: self.code,
            constants: self.constants,
            names: self.names,
            lines: self.lines,
            functions: self.functions,
        }
    }
}

fn const_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.to_bits() == y.to_bits(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_patches_to_absolute_big_endian_offset() {
        let mut b = ChunkBuilder::new();
        let label = b.emit_jump(Op::Jump);
        b.emit(Op::LoadNull);
        b.emit(Op::LoadNull);
        b.patch_jump(label);
        let chunk = b.build();
        assert_eq!(chunk.read_u16(1), 5);
    }

    #[test]
    fn const_pool_dedups_identical_numbers() {
        let mut b = ChunkBuilder::new();
        let a = b.add_const(Value::Number(1.0));
        let c = b.add_const(Value::Number(1.0));
        assert_eq!(a, c);
    }
}
