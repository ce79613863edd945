//! Math built-ins (spec §6 "Math").

use crate::{
    builtins::number,
    engine::Engine,
    error::GridResult,
    value::Value,
};

pub fn abs(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "abs", line, col)?.abs()))
}

pub fn sqrt(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "sqrt", line, col)?.sqrt()))
}

pub fn pow(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let base = number(args, 0, "pow", line, col)?;
    let exp = number(args, 1, "pow", line, col)?;
    Ok(Value::Number(base.powf(exp)))
}

pub fn floor(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "floor", line, col)?.floor()))
}

pub fn ceil(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "ceil", line, col)?.ceil()))
}

pub fn round(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "round", line, col)?.round()))
}

pub fn sin(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "sin", line, col)?.sin()))
}

pub fn cos(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "cos", line, col)?.cos()))
}

pub fn tan(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    Ok(Value::Number(number(args, 0, "tan", line, col)?.tan()))
}

/// Variadic (spec §6 lists `min`/`max` without a fixed arity); two or more
/// numbers, folded left to right.
pub fn min(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    fold_numeric(args, line, col, "min", f64::min)
}

pub fn max(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    fold_numeric(args, line, col, "max", f64::max)
}

fn fold_numeric(
    args: &[Value],
    line: u32,
    col: u32,
    who: &str,
    op: fn(f64, f64) -> f64,
) -> GridResult<Value> {
    let mut acc = number(args, 0, who, line, col)?;
    for i in 1..args.len() {
        acc = op(acc, number(args, i, who, line, col)?);
    }
    Ok(Value::Number(acc))
}

/// `random()` with no args is `[0, 1)`; `random(n)` is `[0, n)`; `random(a,
/// b)` is `[a, b)` (spec §6). Not reproducible across runs — spec §8's
/// determinism property is scoped to programs that don't call it.
pub fn random(_e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let value = match args.len() {
        0 => rng.gen::<f64>(),
        1 => {
            let n = if let Value::Number(n) = args[0] { n } else { 1.0 };
            rng.gen::<f64>() * n
        }
        _ => {
            let a = if let Value::Number(n) = args[0] { n } else { 0.0 };
            let b = if let Value::Number(n) = args[1] { n } else { 1.0 };
            a + rng.gen::<f64>() * (b - a)
        }
    };
    Ok(Value::Number(value))
}

pub fn clamp(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let v = number(args, 0, "clamp", line, col)?;
    let lo = number(args, 1, "clamp", line, col)?;
    let hi = number(args, 2, "clamp", line, col)?;
    Ok(Value::Number(v.clamp(lo, hi)))
}

pub fn lerp(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let a = number(args, 0, "lerp", line, col)?;
    let b = number(args, 1, "lerp", line, col)?;
    let t = number(args, 2, "lerp", line, col)?;
    Ok(Value::Number(a + (b - a) * t))
}

pub fn sign(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let n = number(args, 0, "sign", line, col)?;
    Ok(Value::Number(if n > 0.0 { 1.0 } else if n < 0.0 { -1.0 } else { 0.0 }))
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
    fn clamp_restricts_to_range() {
        let mut e = FakeEngine(NullHost::default());
        let r = clamp(&mut e, &[Value::Number(10.0), Value::Number(0.0), Value::Number(5.0)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "5");
    }

    #[test]
    fn lerp_midpoint() {
        let mut e = FakeEngine(NullHost::default());
        let r = lerp(&mut e, &[Value::Number(0.0), Value::Number(10.0), Value::Number(0.5)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "5");
    }

    #[test]
    fn sign_of_negative() {
        let mut e = FakeEngine(NullHost::default());
        let r = sign(&mut e, &[Value::Number(-3.0)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "-1");
    }
}
