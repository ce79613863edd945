//! The built-in function library (spec §6 "External Interfaces").
//!
//! Grounded on the teacher's `builtins/` directory: a registration table
//! built once and consulted by name at call time. The teacher gives each
//! built-in its own file; GridLang groups by area instead (`core`, `math`,
//! `string`, `array`, `set_ops`, `render`, `input`, `timing`) since each
//! group here is only a handful of functions, not the teacher's hundred-plus.
//!
//! `Grid` and regex values keep their own small method tables
//! (`call_value_method`) rather than living in the global table, since they
//! are resolved only through a receiver (spec §9 "method/function duality").

mod array;
mod core;
mod grid;
mod input;
mod math;
mod regex_methods;
mod render;
mod set_ops;
mod string;
mod timing;
mod typeconv;

use std::{collections::HashMap, sync::OnceLock};

use crate::{
    engine::Engine,
    error::{GridError, GridResult},
    value::Value,
};

/// Signature every global built-in shares: the engine (for host access and
/// calling back into user functions), the already-evaluated argument list,
/// and the call site's source position for error reporting.
pub type BuiltinFn = fn(&mut dyn Engine, &[Value], u32, u32) -> GridResult<Value>;

macro_rules! table {
    ($($name:literal => $f:path),* $(,)?) => {{
        let mut m: HashMap<&'static str, BuiltinFn> = HashMap::new();
        $(m.insert($name, $f as BuiltinFn);)*
        m
    }};
}

pub fn table() -> &'static HashMap<&'static str, BuiltinFn> {
    static TABLE: OnceLock<HashMap<&'static str, BuiltinFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        table! {
            // Core
            "print" => core::print,
            "debug" => core::debug,
            "set_debug" => core::set_debug,
            "assert" => core::assert_fn,
            "range" => core::range,
            "len" => core::len,
            "keys" => core::keys,
            "values" => core::values,

            // Math
            "abs" => math::abs,
            "sqrt" => math::sqrt,
            "pow" => math::pow,
            "floor" => math::floor,
            "ceil" => math::ceil,
            "round" => math::round,
            "sin" => math::sin,
            "cos" => math::cos,
            "tan" => math::tan,
            "min" => math::min,
            "max" => math::max,
            "random" => math::random,
            "clamp" => math::clamp,
            "lerp" => math::lerp,
            "sign" => math::sign,

            // Type conversion
            "str" => typeconv::str_fn,
            "int" => typeconv::int_fn,
            "float" => typeconv::float_fn,
            "bool" => typeconv::bool_fn,

            // String
            "substr" => string::substr,
            "substring" => string::substring,
            "slice" => string::slice,
            "split" => string::split,
            "join" => string::join,
            "upper" => string::upper,
            "lower" => string::lower,
            "trim" => string::trim,
            "replace" => string::replace,
            "starts_with" => string::starts_with,
            "ends_with" => string::ends_with,
            "contains" => string::contains,
            "index_of" => string::index_of,
            "char_at" => string::char_at,
            "char_code" => string::char_code,
            "from_char_code" => string::from_char_code,
            "repeat" => string::repeat,
            "reverse" => string::reverse,

            // Array
            "append" => array::append,
            "add" => array::add,
            "insert" => array::insert,
            "remove" => array::remove,
            "sort" => array::sort,

            // Set-like
            "merge" => set_ops::merge,
            "diff" => set_ops::diff,
            "intersect" => set_ops::intersect,
            "union" => set_ops::union,

            // Rendering (host-delegated)
            "init_2d" => render::init_2d,
            "set_cell" => render::set_cell,
            "clear_canvas" => render::clear_canvas,
            "set_pixel" => render::set_pixel,
            "draw_line" => render::draw_line,
            "draw_circle" => render::draw_circle,
            "draw_rect" => render::draw_rect,
            "rgb" => render::rgb,
            "hsl" => render::hsl,
            "init_3d" => render::init_3d,
            "set_voxel" => render::set_voxel,
            "remove_voxel" => render::remove_voxel,
            "get_voxel" => render::get_voxel,
            "clear_3d" => render::clear_3d,
            "begin_3d_batch" => render::begin_3d_batch,
            "end_3d_batch" => render::end_3d_batch,

            // Input (host-delegated)
            "input_string" => input::input_string,
            "input_lines" => input::input_lines,
            "input_grid" => input::input_grid,

            // Timing / animation (host-delegated)
            "time" => timing::time,
            "clock" => timing::clock,
            "benchmark" => timing::benchmark,
            "animate" => timing::animate,
            "stop_animation" => timing::stop_animation,
            "record_animation" => timing::record_animation,
            "save_animation_gif" => timing::save_animation_gif,
            "stop_recording" => timing::stop_recording,
            "clear_recording" => timing::clear_recording,
            "get_animation_frames" => timing::get_animation_frames,

            // Grid constructor
            "Grid" => grid::make_grid,
        }
    })
}

/// `arr.remove(v)` (method form, by value) — deliberately not reachable
/// through the `remove` entry in `table()`, which is `remove(arr, idx?)`
/// (by index). See `ops::call_builtin_or_method` and DESIGN.md "remove
/// ambiguity".
pub fn array_remove_by_value(engine: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    array::remove_by_value(engine, args, line, col)
}

/// Dispatches a method call on a `Grid` or `Regex` receiver (spec §9
/// "Grid-object and regex keep their own small attribute/method tables").
pub fn call_value_method(
    engine: &mut dyn Engine,
    receiver: &Value,
    name: &str,
    args: &[Value],
    line: u32,
    col: u32,
) -> GridResult<Value> {
    match receiver {
        Value::Grid(_) => grid::call_method(engine, receiver, name, args, line, col),
        Value::Regex(_) => regex_methods::call_method(receiver, name, args, line, col),
        _ => Err(GridError::runtime(line, col, format!("'{name}' is not a built-in method on {}", receiver.type_name()))),
    }
}

// ---- shared argument helpers, used by every submodule ----

pub(crate) fn number(args: &[Value], i: usize, who: &str, line: u32, col: u32) -> GridResult<f64> {
    match args.get(i) {
        Some(Value::Number(n)) => Ok(*n),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected a number, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

pub(crate) fn number_or(args: &[Value], i: usize, default: f64) -> f64 {
    match args.get(i) {
        Some(Value::Number(n)) => *n,
        _ => default,
    }
}

pub(crate) fn string_arg(args: &[Value], i: usize, who: &str, line: u32, col: u32) -> GridResult<std::rc::Rc<str>> {
    match args.get(i) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected a string, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

pub(crate) fn string_or<'a>(args: &'a [Value], i: usize, default: &'a str) -> std::borrow::Cow<'a, str> {
    match args.get(i) {
        Some(Value::String(s)) => std::borrow::Cow::Owned(s.to_string()),
        _ => std::borrow::Cow::Borrowed(default),
    }
}

pub(crate) fn array_arg(
    args: &[Value],
    i: usize,
    who: &str,
    line: u32,
    col: u32,
) -> GridResult<crate::value::ArrayRef> {
    match args.get(i) {
        Some(Value::Array(a)) => Ok(a.clone()),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected an array, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

pub(crate) fn map_arg(args: &[Value], i: usize, who: &str, line: u32, col: u32) -> GridResult<crate::value::MapRef> {
    match args.get(i) {
        Some(Value::Map(m)) => Ok(m.clone()),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected a map, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_contains_every_core_builtin() {
        let t = table();
        for name in ["print", "len", "range", "abs", "str", "upper", "append", "merge", "Grid"] {
            assert!(t.contains_key(name), "missing builtin {name}");
        }
    }
}
