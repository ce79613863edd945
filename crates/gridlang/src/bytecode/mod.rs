//! Bytecode compiler backend (spec §4.3-4.4): chunk format, builder with
//! jump-patching, and the AST-to-chunk compiler.

pub mod builder;
pub mod chunk;
pub mod compiler;
pub mod op;

pub use chunk::Chunk;
pub use compiler::compile;
pub use op::Op;
