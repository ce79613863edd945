//! Input built-ins (spec §6 "Input"): named text the host (browser editor
//! or file manager) stages before the script runs. A `NullHost` always
//! returns empty input, keeping determinism (spec §8) independent of these.

use crate::{
    builtins::string_or,
    engine::Engine,
    error::GridResult,
    value::{GridObject, Value},
};

fn name_arg<'a>(args: &'a [Value], i: usize) -> Option<std::borrow::Cow<'a, str>> {
    match args.get(i) {
        Some(Value::String(s)) => Some(std::borrow::Cow::Owned(s.to_string())),
        _ => None,
    }
}

pub fn input_string(e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let name = name_arg(args, 0);
    Ok(Value::string(e.host().input_string(name.as_deref())))
}

pub fn input_lines(e: &mut dyn Engine, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let name = name_arg(args, 0);
    let lines = e.host().input_lines(name.as_deref());
    Ok(Value::array(lines.into_iter().map(Value::string).collect()))
}

/// `input_grid(type="char", sep=auto, name?)`: parses staged input text into
/// a `Grid` value, splitting rows on newlines and cells either per-character
/// or on `sep` (spec §6 "Input").
pub fn input_grid(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let kind = string_or(args, 0, "char");
    let sep = args.get(1).and_then(|v| if let Value::String(s) = v { Some(s.to_string()) } else { None });
    let name = name_arg(args, 2);
    let text = e.host().input_string(name.as_deref());
    let rows: Vec<Vec<Value>> = text
        .lines()
        .map(|line_text| {
            if kind.as_ref() == "char" && sep.is_none() {
                line_text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                let sep = sep.as_deref().unwrap_or(",");
                line_text.split(sep).map(Value::string).collect()
            }
        })
        .collect();
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != width) {
        return Err(crate::error::GridError::runtime(line, col, "input_grid: rows have differing lengths"));
    }
    let mut grid = GridObject::new(width, height, Value::Undefined);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, cell) in row.into_iter().enumerate() {
            grid.set(x, y, cell);
        }
    }
    Ok(Value::Grid(std::rc::Rc::new(std::cell::RefCell::new(grid))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Clock, InputBag, NullHost, Print};

    struct StaticInputHost {
        null: NullHost,
        text: String,
    }

    impl Print for StaticInputHost {
        fn write(&mut self, text: &str) {
            (&mut self.null as &mut dyn Print).write(text);
        }
        fn flush(&mut self) {
            (&mut self.null as &mut dyn Print).flush();
        }
    }
    impl crate::host::Render2d for StaticInputHost {
        fn init_2d(&mut self, _r: usize, _c: usize, _s: f64) {}
        fn set_cell(&mut self, _r: i64, _c: i64, _col: &str) {}
        fn clear_canvas(&mut self) {}
        fn set_pixel(&mut self, _x: i64, _y: i64, _col: &str) {}
        fn draw_line(&mut self, _x0: f64, _y0: f64, _x1: f64, _y1: f64, _col: &str) {}
        fn draw_circle(&mut self, _x: f64, _y: f64, _r: f64, _col: &str) {}
        fn draw_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64, _col: &str) {}
    }
    impl crate::host::Render3d for StaticInputHost {
        fn init_3d(&mut self) {}
        fn set_voxel(&mut self, _x: i64, _y: i64, _z: i64, _c: &str) {}
        fn remove_voxel(&mut self, _x: i64, _y: i64, _z: i64) {}
        fn get_voxel(&mut self, _x: i64, _y: i64, _z: i64) -> Option<String> {
            None
        }
        fn clear_3d(&mut self) {}
        fn begin_3d_batch(&mut self) {}
        fn end_3d_batch(&mut self) {}
    }
    impl InputBag for StaticInputHost {
        fn input_string(&mut self, _name: Option<&str>) -> String {
            self.text.clone()
        }
        fn input_lines(&mut self, name: Option<&str>) -> Vec<String> {
            self.input_string(name).lines().map(str::to_owned).collect()
        }
    }
    impl Clock for StaticInputHost {
        fn time(&mut self) -> f64 {
            0.0
        }
        fn clock(&mut self) -> f64 {
            0.0
        }
    }
    impl crate::host::Animator for StaticInputHost {
        fn animate_started(&mut self) {}
        fn stop_animation(&mut self) {}
        fn record_animation(&mut self) {}
        fn stop_recording(&mut self) {}
        fn clear_recording(&mut self) {}
        fn get_animation_frames(&mut self) -> Vec<String> {
            Vec::new()
        }
        fn save_animation_gif(&mut self, _path: &str) {}
    }

    struct FakeEngine(StaticInputHost);
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
    fn input_grid_splits_rows_into_chars() {
        let mut e = FakeEngine(StaticInputHost { null: NullHost::default(), text: "ab\ncd".to_owned() });
        let grid = input_grid(&mut e, &[], 1, 1).unwrap();
        let Value::Grid(g) = grid else { panic!("expected a grid") };
        let g = g.borrow();
        assert_eq!((g.width, g.height), (2, 2));
        assert_eq!(g.get(1, 1).unwrap().to_string(), "d");
    }
}
