//! String built-ins (spec §6 "String"). All operate on UTF-8 char indices,
//! not bytes, matching `ops::index_get`'s string-indexing semantics.

use crate::{
    builtins::{number_or, string_arg, string_or},
    engine::Engine,
    error::{GridError, GridResult},
    value::Value,
};

fn chars(v: &Value) -> Vec<char> {
    match v {
        Value::String(s) => s.chars().collect(),
        _ => Vec::new(),
    }
}

fn clamp_index(n: f64, len: usize) -> usize {
    if n.is_nan() || n < 0.0 {
        0
    } else if n as usize > len {
        len
    } else {
        n as usize
    }
}

/// `substr(s, start, len?)`: `len` characters starting at `start`.
pub fn substr(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cs = chars(args.first().ok_or_else(|| GridError::runtime(line, col, "substr: missing argument 0"))?);
    let start = clamp_index(number_or(args, 1, 0.0), cs.len());
    let take = number_or(args, 2, (cs.len() - start) as f64).max(0.0) as usize;
    let end = (start + take).min(cs.len());
    Ok(Value::string(cs[start..end].iter().collect::<String>()))
}

/// `substring(s, start, end?)`: characters in `[start, end)`.
pub fn substring(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cs = chars(args.first().ok_or_else(|| GridError::runtime(line, col, "substring: missing argument 0"))?);
    let start = clamp_index(number_or(args, 1, 0.0), cs.len());
    let end = clamp_index(number_or(args, 2, cs.len() as f64), cs.len()).max(start);
    Ok(Value::string(cs[start..end].iter().collect::<String>()))
}

/// `slice(s|arr, start, end?)`: polymorphic over strings and arrays, with
/// Python-style negative indices counted from the end.
pub fn slice(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    match args.first() {
        Some(Value::Array(a)) => {
            let items = a.borrow();
            let (start, end) = slice_bounds(args, items.len());
            Ok(Value::array(items[start..end].to_vec()))
        }
        Some(Value::String(_)) => {
            let cs = chars(&args[0]);
            let (start, end) = slice_bounds(args, cs.len());
            Ok(Value::string(cs[start..end].iter().collect::<String>()))
        }
        _ => Err(GridError::runtime(line, col, "slice: expected a string or array")),
    }
}

fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let norm = |n: f64| -> usize {
        if n < 0.0 {
            clamp_index(len as f64 + n, len)
        } else {
            clamp_index(n, len)
        }
    };
    let start = norm(number_or(args, 1, 0.0));
    let end = norm(number_or(args, 2, len as f64)).max(start);
    (start, end)
}

/// `split(s, sep=" ")`.
pub fn split(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "split", line, col)?;
    let sep = string_or(args, 1, " ");
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep.as_ref()).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

/// `join(arr, sep="")`.
pub fn join(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let arr = crate::builtins::array_arg(args, 0, "join", line, col)?;
    let sep = string_or(args, 1, "");
    let rendered: Vec<String> = arr.borrow().iter().map(Value::to_string).collect();
    Ok(Value::string(rendered.join(sep.as_ref())))
}

pub fn upper(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::string(string_arg(args, 0, "upper", line, col)?.to_uppercase()))
}

pub fn lower(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::string(string_arg(args, 0, "lower", line, col)?.to_lowercase()))
}

pub fn trim(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::string(string_arg(args, 0, "trim", line, col)?.trim().to_owned()))
}

pub fn replace(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "replace", line, col)?;
    let needle = string_arg(args, 1, "replace", line, col)?;
    let repl = string_arg(args, 2, "replace", line, col)?;
    Ok(Value::string(s.replace(needle.as_ref(), repl.as_ref())))
}

pub fn starts_with(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "starts_with", line, col)?;
    let prefix = string_arg(args, 1, "starts_with", line, col)?;
    Ok(Value::Boolean(s.starts_with(prefix.as_ref())))
}

pub fn ends_with(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "ends_with", line, col)?;
    let suffix = string_arg(args, 1, "ends_with", line, col)?;
    Ok(Value::Boolean(s.ends_with(suffix.as_ref())))
}

/// `contains(s, sub)`, distinct from the `in` operator (spec §6 lists both).
pub fn contains(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "contains", line, col)?;
    let sub = string_arg(args, 1, "contains", line, col)?;
    Ok(Value::Boolean(s.contains(sub.as_ref())))
}

pub fn index_of(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cs = chars(&Value::String(string_arg(args, 0, "index_of", line, col)?));
    let sub = chars(&Value::String(string_arg(args, 1, "index_of", line, col)?));
    if sub.is_empty() {
        return Ok(Value::Number(0.0));
    }
    let found = cs.windows(sub.len()).position(|w| w == sub.as_slice());
    Ok(found.map(|i| Value::Number(i as f64)).unwrap_or(Value::Number(-1.0)))
}

pub fn char_at(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cs = chars(&Value::String(string_arg(args, 0, "char_at", line, col)?));
    let i = number_or(args, 1, 0.0);
    if i < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(match cs.get(i as usize) {
        Some(c) => Value::string(c.to_string()),
        None => Value::Undefined,
    })
}

pub fn char_code(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cs = chars(&Value::String(string_arg(args, 0, "char_code", line, col)?));
    let i = number_or(args, 1, 0.0) as usize;
    Ok(match cs.get(i) {
        Some(c) => Value::Number(*c as u32 as f64),
        None => Value::Undefined,
    })
}

pub fn from_char_code(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let code = crate::builtins::number(args, 0, "from_char_code", line, col)? as u32;
    let c = char::from_u32(code).ok_or_else(|| GridError::runtime(line, col, format!("from_char_code: {code} is not a valid code point")))?;
    Ok(Value::string(c.to_string()))
}

pub fn repeat(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let s = string_arg(args, 0, "repeat", line, col)?;
    let n = crate::builtins::number(args, 1, "repeat", line, col)?.max(0.0) as usize;
    Ok(Value::string(s.repeat(n)))
}

/// Polymorphic over strings and arrays (spec §6 groups `reverse` under
/// "String" but it applies equally to arrays, mirroring `sort`/`slice`).
pub fn reverse(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::string(s.chars().rev().collect::<String>())),
        Some(Value::Array(a)) => {
            let mut items = a.borrow().clone();
            items.reverse();
            Ok(Value::array(items))
        }
        _ => Err(GridError::runtime(line, col, "reverse: expected a string or array")),
    }
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
    fn split_default_separator_is_space() {
        let mut e = FakeEngine(NullHost::default());
        let r = split(&mut e, &[Value::string("a b  c")], 1, 1).unwrap();
        assert_eq!(r.to_string(), "[a, b, , c]");
    }

    #[test]
    fn join_default_separator_is_empty() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::string("a"), Value::string("b")]);
        let r = join(&mut e, &[arr], 1, 1).unwrap();
        assert_eq!(r.to_string(), "ab");
    }

    #[test]
    fn slice_handles_negative_indices() {
        let mut e = FakeEngine(NullHost::default());
        let r = slice(&mut e, &[Value::string("hello"), Value::Number(-3.0)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "llo");
    }

    #[test]
    fn reverse_array() {
        let mut e = FakeEngine(NullHost::default());
        let arr = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let r = reverse(&mut e, &[arr], 1, 1).unwrap();
        assert_eq!(r.to_string(), "[2, 1]");
    }
}
