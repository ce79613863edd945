//! Opcode set (spec §4.4).

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum Op {
    /// Pushes `constants[u16]`.
    Const,
    LoadNull,
    LoadTrue,
    LoadFalse,
    /// Pushes `undefined`, distinct from `null` (spec §3). No compiler path
    /// currently emits this (no source literal produces `undefined`; it
    /// only arises from a map-key miss on read), but it is part of the
    /// fixed opcode set (spec §4.3) so the VM implements it.
    LoadUndefined,

    /// Pushes the value of `names[u16]` from the current scope chain.
    LoadVar,
    /// Pops and stores into `names[u16]` in the nearest enclosing scope, or
    /// declares locally if unbound anywhere in the chain.
    StoreVar,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,
    Not,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Pops a needle and haystack, pushes membership (spec §3 `in`).
    In,
    /// Pops a value, pushes whether it is `null`.
    IsNull,

    /// Duplicates the top-of-stack value without popping.
    Dup,
    /// Swaps the top two stack values.
    Swap,
    Pop,

    /// Pops `n` (u16) items and pushes one array.
    BuildArray,
    /// Pops `2n` (u16 = n) items (key, value pairs) and pushes one map.
    BuildMap,
    /// Pops a string, pushes a compiled regex value.
    BuildRegex,
    /// Pops index then target, pushes `target[index]`.
    Index,
    /// Stack (top to bottom) must be `index, target, value`; pops all
    /// three and stores `target[index] = value`, leaving nothing behind.
    StoreIndex,
    /// Pops target, pushes `target.names[u16]` (bound method or field).
    GetMember,
    /// Pops value then target, stores `target.names[u16] = value`.
    StoreMember,

    /// Unconditional jump to the absolute big-endian u16 code offset.
    Jump,
    /// Pops condition; jumps to the absolute offset if falsy.
    JumpIfFalse,
    /// Jumps to the absolute offset if the top-of-stack value is falsy,
    /// WITHOUT popping (used for short-circuit `and`).
    JumpIfFalseNoPop,
    /// Jumps to the absolute offset if the top-of-stack value is truthy,
    /// WITHOUT popping (used for short-circuit `or`).
    JumpIfTrueNoPop,

    /// Pops an iterable, pushes an opaque iterator state handle (spec §3
    /// "Iterator (VM-internal only)" — never a value a GridLang program can
    /// hold).
    GetIter,
    /// Peeks (does not pop) the iterator on top of the stack. Operand is a
    /// 2-byte absolute jump target plus a 1-byte flag (0 = single loop
    /// variable, 1 = two). On exhaustion, jumps to the target, which is the
    /// trailing `POP` that discards the iterator (`break` jumps there too;
    /// `continue` jumps back to this op). Otherwise pushes, for a single
    /// variable, the element (array/string) or the key (map); for two
    /// variables, the element beneath the index (array/string) or beneath
    /// the key (map) — i.e. top-of-stack after the push is always the
    /// index/key when two variables are requested.
    ForIter,

    /// Pops `argc` (u8) args plus the callee, pushes the call result.
    Call,
    Return,

    /// Pushes a closure built from `functions[u16]`, capturing the current scope.
    MakeFunc,

    Halt,
}

impl Op {
    /// Number of operand bytes following the opcode byte, per spec §4.4.
    pub fn operand_len(self) -> usize {
        match self {
            Self::Const
            | Self::LoadVar
            | Self::StoreVar
            | Self::BuildArray
            | Self::BuildMap
            | Self::GetMember
            | Self::StoreMember
            | Self::Jump
            | Self::JumpIfFalse
            | Self::JumpIfFalseNoPop
            | Self::JumpIfTrueNoPop
            | Self::MakeFunc => 2,
            Self::ForIter => 3,
            Self::Call => 1,
            _ => 0,
        }
    }
}
