//! Set-like array built-ins (spec §6 "Set-like"): `merge`, `diff`,
//! `intersect`, `union`. All treat arrays as unordered bags compared by
//! structural equality (`Value::values_equal`), not hashed sets, since
//! GridLang values aren't `Hash`.

use crate::{builtins::array_arg, engine::Engine, error::GridResult, value::Value};

/// Concatenates two arrays without deduplication.
pub fn merge(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let a = array_arg(args, 0, "merge", line, col)?;
    let b = array_arg(args, 1, "merge", line, col)?;
    let mut out = a.borrow().clone();
    out.extend(b.borrow().iter().cloned());
    Ok(Value::array(out))
}

/// Elements of `a` not present in `b`.
pub fn diff(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let a = array_arg(args, 0, "diff", line, col)?;
    let b = array_arg(args, 1, "diff", line, col)?;
    let b = b.borrow();
    let out = a.borrow().iter().filter(|v| !b.iter().any(|bv| Value::values_equal(v, bv))).cloned().collect();
    Ok(Value::array(out))
}

/// Elements present in both `a` and `b`.
pub fn intersect(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let a = array_arg(args, 0, "intersect", line, col)?;
    let b = array_arg(args, 1, "intersect", line, col)?;
    let b = b.borrow();
    let out = a.borrow().iter().filter(|v| b.iter().any(|bv| Value::values_equal(v, bv))).cloned().collect();
    Ok(Value::array(out))
}

/// Deduplicated concatenation of `a` and `b`.
pub fn union(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let a = array_arg(args, 0, "union", line, col)?;
    let b = array_arg(args, 1, "union", line, col)?;
    let mut out: Vec<Value> = Vec::new();
    for v in a.borrow().iter().chain(b.borrow().iter()) {
        if !out.iter().any(|o| Value::values_equal(o, v)) {
            out.push(v.clone());
        }
    }
    Ok(Value::array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    struct FakeEngine(NullHost);
    impl Engine for FakeEngine {
        fn call_value(&mut self, _c: &Value, _a: &[Value], _l: u32, _co: u32) -> GridResult<Value> {
            unreachable!()
        }
        fn host(&mut self) -> &mut dyn crate::host::Host {
            &mut self.0
        }
        fn debug_enabled(&self) -> bool {
            false
        }
        fn set_debug_enabled(&mut self, _e: bool) {}
    }

    #[test]
    fn union_deduplicates() {
        let mut e = FakeEngine(NullHost::default());
        let a = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::array(vec![Value::Number(2.0), Value::Number(3.0)]);
        let r = union(&mut e, &[a, b], 1, 1).unwrap();
        assert_eq!(r.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn diff_removes_shared_elements() {
        let mut e = FakeEngine(NullHost::default());
        let a = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::array(vec![Value::Number(2.0)]);
        let r = diff(&mut e, &[a, b], 1, 1).unwrap();
        assert_eq!(r.to_string(), "[1]");
    }
}
