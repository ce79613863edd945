//! Type-conversion built-ins (spec §6 "Type"): `str`, `int`, `float`, `bool`.

use crate::{engine::Engine, error::GridResult, value::Value};

pub fn str_fn(_e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let rendered = args.first().map(Value::to_string).unwrap_or_default();
    Ok(Value::string(rendered))
}

/// Truncates toward zero, like most scripting languages' `int()` (spec §6
/// doesn't mandate rounding mode; the original implementation truncates).
pub fn int_fn(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(to_number(args.first(), line, col)?.trunc()))
}

pub fn float_fn(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(to_number(args.first(), line, col)?))
}

pub fn bool_fn(_e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    Ok(Value::Boolean(args.first().map(Value::is_truthy).unwrap_or(false)))
}

fn to_number(v: Option<&Value>, line: u32, col: u32) -> GridResult<f64> {
    match v {
        Some(Value::Number(n)) => Ok(*n),
        Some(Value::String(s)) => {
            s.trim().parse::<f64>().map_err(|_| crate::error::GridError::runtime(line, col, format!("cannot convert '{s}' to a number")))
        }
        Some(Value::Boolean(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Ok(f64::NAN),
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
    fn str_of_number_has_no_trailing_zero() {
        let mut e = FakeEngine(NullHost::default());
        let r = str_fn(&mut e, &[Value::Number(3.0)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "3");
    }

    #[test]
    fn int_truncates() {
        let mut e = FakeEngine(NullHost::default());
        let r = int_fn(&mut e, &[Value::Number(3.9)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "3");
    }

    #[test]
    fn float_parses_numeric_string() {
        let mut e = FakeEngine(NullHost::default());
        let r = float_fn(&mut e, &[Value::string("2.5")], 1, 1).unwrap();
        assert_eq!(r.to_string(), "2.5");
    }
}
