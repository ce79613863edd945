//! Array built-ins (spec §6 "Array"). `sort` needs to call back into a
//! user-supplied comparator, so it is the one built-in in this module that
//! touches `Engine::call_value`.

use crate::{
    builtins::{array_arg, number_or},
    engine::Engine,
    error::GridResult,
    ops,
    value::Value,
};

/// `append(arr, v)`: mutates in place, returns the array (spec §6).
pub fn append(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "append", line, col)?;
    let v = args.get(1).cloned().unwrap_or(Value::Undefined);
    arr.borrow_mut().push(v);
    Ok(Value::Array(arr))
}

/// `add(arr, v, idx?)`: inserts at `idx` (default: end); distinct from the
/// method-form `arr.remove(v)` pairing described in spec §9.
pub fn add(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "add", line, col)?;
    let v = args.get(1).cloned().unwrap_or(Value::Undefined);
    let len = arr.borrow().len();
    let idx = (number_or(args, 2, len as f64) as usize).min(len);
    arr.borrow_mut().insert(idx, v);
    Ok(Value::Array(arr))
}

/// `insert(arr, idx, v)`: the fixed-position counterpart to `add`'s
/// optional index.
pub fn insert(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "insert", line, col)?;
    let len = arr.borrow().len();
    let idx = (number_or(args, 1, len as f64) as usize).min(len);
    let v = args.get(2).cloned().unwrap_or(Value::Undefined);
    arr.borrow_mut().insert(idx, v);
    Ok(Value::Array(arr))
}

/// `remove(arr, idx?)` (top-level, by index; default: last element) — the
/// method-form `arr.remove(v)` (by value) is a *different* built-in entry,
/// resolved only through `BoundMethod` dispatch, per spec §9's explicit
/// "remove ambiguity" note (see DESIGN.md).
pub fn remove(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "remove", line, col)?;
    let mut items = arr.borrow_mut();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    let idx = (number_or(args, 1, (items.len() - 1) as f64) as usize).min(items.len() - 1);
    Ok(items.remove(idx))
}

/// `arr.remove(v)` (method form only, spec §9 "remove ambiguity"): removes
/// the first element structurally equal to `v`. Never reached through the
/// top-level `remove` table entry — `ops::call_builtin_or_method` routes
/// `Array` receivers named `remove` here directly instead.
pub fn remove_by_value(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "remove", line, col)?;
    let needle = args.get(1).cloned().unwrap_or(Value::Undefined);
    let mut items = arr.borrow_mut();
    match items.iter().position(|v| Value::values_equal(v, &needle)) {
        Some(idx) => Ok(items.remove(idx)),
        None => Ok(Value::Undefined),
    }
}

/// `sort(arr, cmp?)`: stable, ascending by default comparison; with a
/// two-argument comparator callback it is threaded through the active
/// backend's `Engine::call_value` (spec §9 "sort's comparator").
pub fn sort(engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = array_arg(args, 0, "sort", line, col)?;
    let mut items = arr.borrow().clone();
    let cmp = args.get(1).cloned();
    match cmp {
        Some(callback) => {
            let mut err = None;
            items.sort_by(|a, b| {
                if err.is_some() {
                    return std::cmp::Ordering::Equal;
                }
                match engine.call_value(&callback, &[a.clone(), b.clone()], line, col) {
                    Ok(Value::Number(n)) if n < 0.0 => std::cmp::Ordering::Less,
                    Ok(Value::Number(n)) if n > 0.0 => std::cmp::Ordering::Greater,
                    Ok(_) => std::cmp::Ordering::Equal,
                    Err(e) => {
                        err = Some(e);
                        std::cmp::Ordering::Equal
                    }
                }
            });
            if let Some(e) = err {
                return Err(e);
            }
        }
        None => {
            let mut sort_err = None;
            items.sort_by(|a, b| match ops::compare(a, b, line, col) {
                Ok(ord) => ord,
                Err(e) => {
                    sort_err.get_or_insert(e);
                    std::cmp::Ordering::Equal
                }
            });
            if let Some(e) = sort_err {
                return Err(e);
            }
        }
    }
    Ok(Value::array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    struct FakeEngine(NullHost);
    impl Engine for FakeEngine {
        fn call_value(&mut self, _c: &Value, _a: &[Value], _l: u32, _co: u32) -> GridResult<Value> {
            unreachable!("default sort never calls back")
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
    fn append_mutates_in_place() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::Number(1.0)]);
        append(&mut e, &[arr.clone(), Value::Number(2.0)], 1, 1).unwrap();
        assert_eq!(arr.to_string(), "[1, 2]");
    }

    #[test]
    fn remove_default_pops_last() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let removed = remove(&mut e, &[arr.clone()], 1, 1).unwrap();
        assert_eq!(removed.to_string(), "2");
        assert_eq!(arr.to_string(), "[1]");
    }

    #[test]
    fn remove_by_value_removes_first_match_not_by_index() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::Number(5.0), Value::Number(2.0), Value::Number(5.0)]);
        let removed = remove_by_value(&mut e, &[arr.clone(), Value::Number(5.0)], 1, 1).unwrap();
        assert_eq!(removed.to_string(), "5");
        assert_eq!(arr.to_string(), "[2, 5]");
    }

    #[test]
    fn sort_without_comparator_is_ascending() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)]);
        let sorted = sort(&mut e, &[arr], 1, 1).unwrap();
        assert_eq!(sorted.to_string(), "[1, 2, 3]");
    }
}
