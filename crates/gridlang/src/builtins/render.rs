//! Rendering built-ins (spec §6 "Rendering"): thin wrappers that validate
//! arguments and forward to the active `Host`'s `Render2d`/`Render3d`
//! methods. A `NullHost` makes every one of these a no-op, which is what
//! keeps spec §8's "Determinism" property independent of rendering calls.

use crate::{builtins::number, engine::Engine, error::GridResult, value::Value};

fn int_or(args: &[Value], i: usize, default: i64) -> i64 {
    match args.get(i) {
        Some(Value::Number(n)) => *n as i64,
        _ => default,
    }
}

fn color_or<'a>(args: &'a [Value], i: usize, default: &'a str) -> String {
    match args.get(i) {
        Some(v) => v.to_string(),
        None => default.to_owned(),
    }
}

pub fn init_2d(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let rows = number(args, 0, "init_2d", line, col)? as usize;
    let cols = number(args, 1, "init_2d", line, col)? as usize;
    let cell_size = args.get(2).and_then(|v| if let Value::Number(n) = v { Some(*n) } else { None }).unwrap_or(20.0);
    e.host().init_2d(rows, cols, cell_size);
    Ok(Value::Null)
}

pub fn set_cell(e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let row = int_or(args, 0, 0);
    let col = int_or(args, 1, 0);
    let color = color_or(args, 2, "black");
    e.host().set_cell(row, col, &color);
    Ok(Value::Null)
}

pub fn clear_canvas(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().clear_canvas();
    Ok(Value::Null)
}

pub fn set_pixel(e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let x = int_or(args, 0, 0);
    let y = int_or(args, 1, 0);
    let color = color_or(args, 2, "black");
    e.host().set_pixel(x, y, &color);
    Ok(Value::Null)
}

pub fn draw_line(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x0 = number(args, 0, "draw_line", line, col)?;
    let y0 = number(args, 1, "draw_line", line, col)?;
    let x1 = number(args, 2, "draw_line", line, col)?;
    let y1 = number(args, 3, "draw_line", line, col)?;
    let color = color_or(args, 4, "black");
    e.host().draw_line(x0, y0, x1, y1, &color);
    Ok(Value::Null)
}

pub fn draw_circle(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x = number(args, 0, "draw_circle", line, col)?;
    let y = number(args, 1, "draw_circle", line, col)?;
    let radius = number(args, 2, "draw_circle", line, col)?;
    let color = color_or(args, 3, "black");
    e.host().draw_circle(x, y, radius, &color);
    Ok(Value::Null)
}

pub fn draw_rect(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x = number(args, 0, "draw_rect", line, col)?;
    let y = number(args, 1, "draw_rect", line, col)?;
    let w = number(args, 2, "draw_rect", line, col)?;
    let h = number(args, 3, "draw_rect", line, col)?;
    let color = color_or(args, 4, "black");
    e.host().draw_rect(x, y, w, h, &color);
    Ok(Value::Null)
}

/// `rgb(r, g, b)` produces the opaque color string hosts/renderers consume.
pub fn rgb(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let r = number(args, 0, "rgb", line, col)? as i64;
    let g = number(args, 1, "rgb", line, col)? as i64;
    let b = number(args, 2, "rgb", line, col)? as i64;
    Ok(Value::string(format!("rgb({r}, {g}, {b})")))
}

pub fn hsl(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let h = number(args, 0, "hsl", line, col)?;
    let s = number(args, 1, "hsl", line, col)?;
    let l = number(args, 2, "hsl", line, col)?;
    Ok(Value::string(format!("hsl({h}, {s}%, {l}%)")))
}

pub fn init_3d(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().init_3d();
    Ok(Value::Null)
}

pub fn set_voxel(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x = number(args, 0, "set_voxel", line, col)? as i64;
    let y = number(args, 1, "set_voxel", line, col)? as i64;
    let z = number(args, 2, "set_voxel", line, col)? as i64;
    let color = color_or(args, 3, "black");
    e.host().set_voxel(x, y, z, &color);
    Ok(Value::Null)
}

pub fn remove_voxel(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x = number(args, 0, "remove_voxel", line, col)? as i64;
    let y = number(args, 1, "remove_voxel", line, col)? as i64;
    let z = number(args, 2, "remove_voxel", line, col)? as i64;
    e.host().remove_voxel(x, y, z);
    Ok(Value::Null)
}

pub fn get_voxel(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let x = number(args, 0, "get_voxel", line, col)? as i64;
    let y = number(args, 1, "get_voxel", line, col)? as i64;
    let z = number(args, 2, "get_voxel", line, col)? as i64;
    Ok(match e.host().get_voxel(x, y, z) {
        Some(color) => Value::string(color),
        None => Value::Null,
    })
}

pub fn clear_3d(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().clear_3d();
    Ok(Value::Null)
}

pub fn begin_3d_batch(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().begin_3d_batch();
    Ok(Value::Null)
}

pub fn end_3d_batch(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().end_3d_batch();
    Ok(Value::Null)
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
    fn rgb_formats_triplet() {
        let mut e = FakeEngine(NullHost::default());
        let r = rgb(&mut e, &[Value::Number(255.0), Value::Number(0.0), Value::Number(0.0)], 1, 1).unwrap();
        assert_eq!(r.to_string(), "rgb(255, 0, 0)");
    }

    #[test]
    fn get_voxel_on_null_host_is_null() {
        let mut e = FakeEngine(NullHost::default());
        let r = get_voxel(&mut e, &[Value::Number(0.0), Value::Number(0.0), Value::Number(0.0)], 1, 1).unwrap();
        assert!(matches!(r, Value::Null));
    }
}
