//! Value-level operations shared by the VM and tree-walk evaluator: binary
//! arithmetic/comparison, indexing, and member access (spec §3 "Invariants",
//! §4.5 `INDEX`/`STORE_INDEX`/`GET_MEMBER`/`STORE_MEMBER`).
//!
//! Both backends lower to the same opcodes conceptually (the evaluator just
//! never materializes them as bytes), so keeping this logic in one place
//! keeps the two backends from drifting apart (spec §8 "Backend
//! equivalence").

use crate::{
    builtins,
    engine::Engine,
    error::{GridError, GridResult},
    value::Value,
};

pub fn add(a: &Value, b: &Value, line: u32, col: u32) -> GridResult<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x + y)),
        (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::string(format!("{a}{b}"))),
        _ => {
            let _ = (line, col);
            Ok(Value::Number(f64::NAN))
        }
    }
}

/// All other arithmetic (`- * / % **`) on non-numbers is NaN-equivalent
/// (spec §3 "Invariants"); division by zero is `±Infinity`, not an error
/// (spec §7).
pub fn arith(op: fn(f64, f64) -> f64, a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Value::Number(op(*x, *y)),
        _ => Value::Number(f64::NAN),
    }
}

pub fn compare(a: &Value, b: &Value, line: u32, col: u32) -> GridResult<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            Ok(x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(GridError::runtime(
            line,
            col,
            format!("cannot compare {} and {}", a.type_name(), b.type_name()),
        )),
    }
}

/// `in` membership (spec §3 `BinaryOp::In`): array by structural equality,
/// map by key, string haystack by substring.
pub fn contains(needle: &Value, haystack: &Value, line: u32, col: u32) -> GridResult<bool> {
    match haystack {
        Value::Array(items) => Ok(items.borrow().iter().any(|v| Value::values_equal(v, needle))),
        Value::Map(m) => match needle {
            Value::String(key) => Ok(m.borrow().contains_key(key.as_ref())),
            _ => Ok(false),
        },
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_ref())),
            _ => Err(GridError::runtime(line, col, "'in' on a string requires a string needle")),
        },
        _ => Err(GridError::runtime(line, col, format!("'in' is not supported on {}", haystack.type_name()))),
    }
}

/// `target[index]` (spec §4.5 `INDEX`): array by integer index, map by any
/// string, string by integer (read-only, UTF-8 char index). Out-of-range
/// array/string reads yield `undefined`, not an error (spec §3).
pub fn index_get(target: &Value, index: &Value, line: u32, col: u32) -> GridResult<Value> {
    match (target, index) {
        (Value::Array(items), Value::Number(n)) => {
            let items = items.borrow();
            Ok(to_index(*n).and_then(|i| items.get(i).cloned()).unwrap_or(Value::Undefined))
        }
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(to_index(*n).and_then(|i| chars.get(i)).map(|c| Value::string(c.to_string())).unwrap_or(Value::Undefined))
        }
        (Value::Map(m), Value::String(key)) => Ok(m.borrow().get(key.as_ref()).cloned().unwrap_or(Value::Undefined)),
        (Value::Grid(_), _) => Err(GridError::runtime(line, col, "grid values are indexed via .get(x, y), not []")),
        _ => Err(GridError::runtime(
            line,
            col,
            format!("invalid index target/kind: {}[{}]", target.type_name(), index.type_name()),
        )),
    }
}

pub fn index_set(target: &Value, index: &Value, value: Value, line: u32, col: u32) -> GridResult<()> {
    match (target, index) {
        (Value::Array(items), Value::Number(n)) => {
            let mut items = items.borrow_mut();
            let Some(i) = to_index(*n) else {
                return Err(GridError::runtime(line, col, format!("invalid array index {n}")));
            };
            if i >= items.len() {
                return Err(GridError::runtime(line, col, format!("array index {i} out of range")));
            }
            items[i] = value;
            Ok(())
        }
        (Value::Map(m), Value::String(key)) => {
            m.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        (Value::String(_), _) => Err(GridError::runtime(line, col, "strings are immutable")),
        _ => Err(GridError::runtime(
            line,
            col,
            format!("invalid index-assignment target/kind: {}[{}]", target.type_name(), index.type_name()),
        )),
    }
}

fn to_index(n: f64) -> Option<usize> {
    if n.is_finite() && n.fract() == 0.0 && n >= 0.0 { Some(n as usize) } else { None }
}

/// `target.name` (spec §4.5 `GET_MEMBER`). Maps read by key (missing key
/// yields `undefined`, not an error, mirroring index reads). Strings and
/// arrays resolve `name` against the shared built-in table and return a
/// bound partial application (spec §9 "method/function duality"). Grid and
/// regex values consult their own small attribute/method tables (spec §9
/// "GridObject"/§3 "Regex value").
pub fn get_member(target: &Value, name: &str, line: u32, col: u32) -> GridResult<Value> {
    match target {
        Value::Map(m) => Ok(m.borrow().get(name).cloned().unwrap_or(Value::Undefined)),
        Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(a) if name == "length" => Ok(Value::Number(a.borrow().len() as f64)),
        Value::String(_) | Value::Array(_) => {
            if builtins::table().contains_key(name) {
                Ok(Value::BoundMethod { receiver: Box::new(target.clone()), name: name.into() })
            } else {
                Err(GridError::runtime(line, col, format!("'{name}' is not a built-in")))
            }
        }
        Value::Grid(g) => {
            let g = g.borrow();
            match name {
                "width" => Ok(Value::Number(g.width as f64)),
                "height" => Ok(Value::Number(g.height as f64)),
                "cellSize" => Ok(Value::Number(g.cell_size)),
                "diags" => Ok(Value::Boolean(g.diags)),
                "colorMap" => Ok(Value::map(g.color_map.clone())),
                "get" | "set" | "inBounds" | "neighbors" | "visit" | "find" | "count" | "draw" => {
                    Ok(Value::BoundMethod { receiver: Box::new(target.clone()), name: name.into() })
                }
                other => Err(GridError::runtime(line, col, format!("grid has no attribute '{other}'"))),
            }
        }
        Value::Regex(_) => match name {
            "test" | "match" | "groups" | "find_all" | "replace" | "split" => {
                Ok(Value::BoundMethod { receiver: Box::new(target.clone()), name: name.into() })
            }
            other => Err(GridError::runtime(line, col, format!("regex has no method '{other}'"))),
        },
        _ => Err(GridError::runtime(line, col, format!("cannot access member '{name}' on {}", target.type_name()))),
    }
}

/// `target.name = value` (spec §4.5 `STORE_MEMBER`): map-set for maps;
/// only `diags`/`cellSize`/`colorMap` are assignable on a grid.
pub fn store_member(target: &Value, name: &str, value: Value, line: u32, col: u32) -> GridResult<()> {
    match target {
        Value::Map(m) => {
            m.borrow_mut().insert(name.to_owned(), value);
            Ok(())
        }
        Value::Grid(g) => {
            let mut g = g.borrow_mut();
            match name {
                "diags" => {
                    g.diags = value.is_truthy();
                    Ok(())
                }
                "cellSize" => {
                    if let Value::Number(n) = value {
                        g.cell_size = n;
                        Ok(())
                    } else {
                        Err(GridError::runtime(line, col, "cellSize must be a number"))
                    }
                }
                "colorMap" => {
                    if let Value::Map(m) = value {
                        g.color_map = m.borrow().clone();
                        Ok(())
                    } else {
                        Err(GridError::runtime(line, col, "colorMap must be a map"))
                    }
                }
                other => Err(GridError::runtime(line, col, format!("'{other}' is not assignable on a grid"))),
            }
        }
        _ => Err(GridError::runtime(line, col, format!("cannot assign member '{name}' on {}", target.type_name()))),
    }
}

/// Resolves and invokes any callable value (spec §4.5 `CALL`, §9
/// "method/function duality"). `Native`/`BoundMethod` both bottom out in the
/// shared built-in table; `Func` is left to the caller since the two
/// backends execute user closures differently (chunk dispatch vs AST walk).
pub fn call_builtin_or_method(
    engine: &mut dyn Engine,
    callee: &Value,
    args: &[Value],
    line: u32,
    col: u32,
) -> GridResult<Option<Value>> {
    match callee {
        Value::Native(name) => {
            let f = builtins::table()
                .get(*name)
                .copied()
                .ok_or_else(|| GridError::runtime(line, col, format!("unknown built-in '{name}'")))?;
            Ok(Some(f(engine, args, line, col)?))
        }
        Value::BoundMethod { receiver, name } => {
            if matches!(receiver.as_ref(), Value::Grid(_) | Value::Regex(_)) {
                return Ok(Some(builtins::call_value_method(engine, receiver, name, args, line, col)?));
            }
            // `arr.remove(v)` removes by value; the free function `remove(arr, idx?)`
            // removes by index. Same name, deliberately different built-ins (spec §9
            // "remove ambiguity") — the method form never reaches the shared table.
            if matches!(receiver.as_ref(), Value::Array(_)) && name.as_ref() == "remove" {
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push((**receiver).clone());
                full_args.extend_from_slice(args);
                return Ok(Some(builtins::array_remove_by_value(engine, &full_args, line, col)?));
            }
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push((**receiver).clone());
            full_args.extend_from_slice(args);
            let f = builtins::table()
                .get(name.as_ref())
                .copied()
                .ok_or_else(|| GridError::runtime(line, col, format!("'{name}' is not a built-in")))?;
            Ok(Some(f(engine, &full_args, line, col)?))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn add_concatenates_when_either_side_is_a_string() {
        let result = add(&Value::string("n="), &Value::Number(3.0), 1, 1).unwrap();
        assert_eq!(result.to_string(), "n=3");
    }

    #[test]
    fn index_out_of_range_read_is_undefined() {
        let arr = Value::array(vec![Value::Number(1.0)]);
        assert!(matches!(index_get(&arr, &Value::Number(5.0), 1, 1).unwrap(), Value::Undefined));
    }

    #[test]
    fn map_index_miss_is_undefined() {
        let m = Value::map(IndexMap::new());
        assert!(matches!(index_get(&m, &Value::string("x"), 1, 1).unwrap(), Value::Undefined));
    }
}
