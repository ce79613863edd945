//! Core built-ins (spec §6 "Core"): `print`, `debug`, `assert`, `range`,
//! `len`, `keys`, `values`.

use crate::{
    builtins::{array_arg, map_arg, number, number_or},
    engine::Engine,
    error::{GridError, GridResult},
    value::Value,
};

pub fn print(engine: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for v in args {
        parts.push(v.to_string());
    }
    let host = engine.host();
    host.write(&parts.join(" "));
    host.write("\n");
    Ok(Value::Null)
}

/// Prints only when `set_debug(true)` was previously called (spec §6).
pub fn debug(engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    if engine.debug_enabled() {
        print(engine, args, line, col)
    } else {
        Ok(Value::Null)
    }
}

pub fn set_debug(engine: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let enabled = args.first().map(Value::is_truthy).unwrap_or(false);
    engine.set_debug_enabled(enabled);
    Ok(Value::Null)
}

pub fn assert_fn(_engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let cond = args.first().map(Value::is_truthy).unwrap_or(false);
    if cond {
        return Ok(Value::Null);
    }
    let message = match args.get(1) {
        Some(v) => v.to_string(),
        None => "Assertion failed".to_owned(),
    };
    Err(GridError::assertion(line, col, message))
}

/// `range(start)`, `range(start, end)`, or `range(start, end, step)` (spec
/// §6); returns a materialized array rather than a lazy value since
/// GridLang's value universe has no iterator type visible to scripts.
pub fn range(_engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let (start, end) = if args.len() >= 2 {
        (number(args, 0, "range", line, col)?, number(args, 1, "range", line, col)?)
    } else {
        (0.0, number(args, 0, "range", line, col)?)
    };
    let step = number_or(args, 2, 1.0);
    if step == 0.0 {
        return Err(GridError::runtime(line, col, "range: step must not be 0"));
    }
    let mut out = Vec::new();
    let mut n = start;
    if step > 0.0 {
        while n < end {
            out.push(Value::Number(n));
            n += step;
        }
    } else {
        while n > end {
            out.push(Value::Number(n));
            n += step;
        }
    }
    Ok(Value::array(out))
}

pub fn len(_engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let n = match args.first() {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(a)) => a.borrow().len(),
        Some(Value::Map(m)) => m.borrow().len(),
        Some(v) => return Err(GridError::runtime(line, col, format!("len: unsupported type {}", v.type_name()))),
        None => return Err(GridError::runtime(line, col, "len: missing argument")),
    };
    Ok(Value::Number(n as f64))
}

pub fn keys(_engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let m = map_arg(args, 0, "keys", line, col)?;
    let out = m.borrow().keys().map(|k| Value::string(k.as_str())).collect();
    Ok(Value::array(out))
}

pub fn values(_engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let m = map_arg(args, 0, "values", line, col)?;
    let out = m.borrow().values().cloned().collect();
    Ok(Value::array(out))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::host::NullHost;

    struct FakeEngine {
        host: NullHost,
        debug: bool,
    }

    impl Engine for FakeEngine {
        fn call_value(&mut self, _c: &Value, _a: &[Value], _l: u32, _co: u32) -> GridResult<Value> {
            unreachable!("core builtins never call back")
        }
        fn host(&mut self) -> &mut dyn crate::host::Host {
            &mut self.host
        }
        fn debug_enabled(&self) -> bool {
            self.debug
        }
        fn set_debug_enabled(&mut self, enabled: bool) {
            self.debug = enabled;
        }
    }

    #[test]
    fn range_with_default_step() {
        let mut e = FakeEngine { host: NullHost::default(), debug: false };
        let result = range(&mut e, &[Value::Number(0.0), Value::Number(3.0)], 1, 1).unwrap();
        assert_eq!(result.to_string(), "[0, 1, 2]");
    }

    #[test]
    fn assert_false_raises_with_default_message() {
        let mut e = FakeEngine { host: NullHost::default(), debug: false };
        let err = assert_fn(&mut e, &[Value::Boolean(false)], 2, 3).unwrap_err();
        assert!(matches!(err, GridError::Assertion(info) if info.message == "Assertion failed"));
    }

    #[test]
    fn keys_preserves_insertion_order() {
        let mut e = FakeEngine { host: NullHost::default(), debug: false };
        let mut m = IndexMap::new();
        m.insert("b".to_owned(), Value::Number(1.0));
        m.insert("a".to_owned(), Value::Number(2.0));
        let result = keys(&mut e, &[Value::map(m)], 1, 1).unwrap();
        assert_eq!(result.to_string(), "[b, a]");
    }
}
