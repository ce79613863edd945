//! The seam shared by the VM and tree-walk evaluator (spec §9 "Two backends,
//! one AST... new built-ins are registered once into a shared table").
//!
//! Built-ins that need to call back into a user function value (`sort`'s
//! comparator, `animate`'s callback, `benchmark`'s `fn`) do so through this
//! trait rather than knowing whether they're running under the VM or the
//! evaluator.

use crate::{error::GridResult, host::Host, value::Value};

pub trait Engine {
    /// Calls any callable value: a user `Func` closure, a `Native` built-in,
    /// or a `BoundMethod` partial application (spec §4.5 `CALL`, §9
    /// "method/function duality").
    fn call_value(&mut self, callee: &Value, args: &[Value], line: u32, col: u32) -> GridResult<Value>;

    fn host(&mut self) -> &mut dyn Host;

    /// Backing store for `debug()`/`set_debug()` (spec §6 "Core"): whether
    /// `debug(...)` prints anything this run.
    fn debug_enabled(&self) -> bool;
    fn set_debug_enabled(&mut self, enabled: bool);
}
