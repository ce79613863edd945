//! `Grid(data)` constructor and grid-object methods (spec §3 "grid-object",
//! §9 "GridObject inheritance" — modeled as a fixed-attribute record, not a
//! generic object with prototype inheritance).

use crate::{
    builtins::array_arg,
    engine::Engine,
    error::{GridError, GridResult},
    value::{GridObject, Value},
};

/// `Grid(data)`: `data` is a rectangular array of rows.
pub fn make_grid(_e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let rows = array_arg(args, 0, "Grid", line, col)?;
    let rows = rows.borrow();
    let height = rows.len();
    let mut width = 0;
    let mut cells = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        let Value::Array(row) = row else {
            return Err(GridError::runtime(line, col, format!("Grid: row {y} is not an array")));
        };
        let row = row.borrow();
        if y == 0 {
            width = row.len();
        } else if row.len() != width {
            return Err(GridError::runtime(line, col, "Grid: rows have differing lengths"));
        }
        cells.extend(row.iter().cloned());
    }
    let mut grid = GridObject::new(width, height, Value::Undefined);
    grid.cells = cells;
    Ok(Value::Grid(std::rc::Rc::new(std::cell::RefCell::new(grid))))
}

fn as_grid(receiver: &Value, line: u32, col: u32) -> GridResult<crate::value::GridRef> {
    match receiver {
        Value::Grid(g) => Ok(g.clone()),
        _ => Err(GridError::runtime(line, col, "expected a grid receiver")),
    }
}

fn int_arg(args: &[Value], i: usize, who: &str, line: u32, col: u32) -> GridResult<i64> {
    match args.get(i) {
        Some(Value::Number(n)) => Ok(*n as i64),
        Some(v) => Err(GridError::runtime(line, col, format!("{who}: expected a number, got {}", v.type_name()))),
        None => Err(GridError::runtime(line, col, format!("{who}: missing argument {i}"))),
    }
}

const ORTHOGONAL: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const DIAGONAL: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

pub fn call_method(
    engine: &mut dyn Engine,
    receiver: &Value,
    name: &str,
    args: &[Value],
    line: u32,
    col: u32,
) -> GridResult<Value> {
    let grid = as_grid(receiver, line, col)?;
    match name {
        "get" => {
            let x = int_arg(args, 0, "get", line, col)?;
            let y = int_arg(args, 1, "get", line, col)?;
            if x < 0 || y < 0 {
                return Ok(Value::Undefined);
            }
            Ok(grid.borrow().get(x as usize, y as usize).cloned().unwrap_or(Value::Undefined))
        }
        "set" => {
            let x = int_arg(args, 0, "set", line, col)?;
            let y = int_arg(args, 1, "set", line, col)?;
            let value = args.get(2).cloned().unwrap_or(Value::Undefined);
            if x < 0 || y < 0 {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(grid.borrow_mut().set(x as usize, y as usize, value)))
        }
        "inBounds" => {
            let x = int_arg(args, 0, "inBounds", line, col)?;
            let y = int_arg(args, 1, "inBounds", line, col)?;
            let g = grid.borrow();
            Ok(Value::Boolean(x >= 0 && y >= 0 && (x as usize) < g.width && (y as usize) < g.height))
        }
        "neighbors" => {
            let x = int_arg(args, 0, "neighbors", line, col)?;
            let y = int_arg(args, 1, "neighbors", line, col)?;
            let g = grid.borrow();
            let mut dirs = ORTHOGONAL.to_vec();
            if g.diags {
                dirs.extend_from_slice(&DIAGONAL);
            }
            let out = dirs
                .iter()
                .map(|(dx, dy)| (x + dx, y + dy))
                .filter(|(nx, ny)| *nx >= 0 && *ny >= 0 && (*nx as usize) < g.width && (*ny as usize) < g.height)
                .map(|(nx, ny)| Value::array(vec![Value::Number(nx as f64), Value::Number(ny as f64)]))
                .collect();
            Ok(Value::array(out))
        }
        "visit" => {
            let callback = args.first().cloned().unwrap_or(Value::Null);
            let (width, height) = {
                let g = grid.borrow();
                (g.width, g.height)
            };
            for y in 0..height {
                for x in 0..width {
                    let cell = grid.borrow().get(x, y).cloned().unwrap_or(Value::Undefined);
                    engine.call_value(&callback, &[cell, Value::Number(x as f64), Value::Number(y as f64)], line, col)?;
                }
            }
            Ok(Value::Null)
        }
        "find" => {
            let callback = args.first().cloned().unwrap_or(Value::Null);
            let (width, height) = {
                let g = grid.borrow();
                (g.width, g.height)
            };
            for y in 0..height {
                for x in 0..width {
                    let cell = grid.borrow().get(x, y).cloned().unwrap_or(Value::Undefined);
                    let matched = engine.call_value(&callback, &[cell, Value::Number(x as f64), Value::Number(y as f64)], line, col)?;
                    if matched.is_truthy() {
                        return Ok(Value::array(vec![Value::Number(x as f64), Value::Number(y as f64)]));
                    }
                }
            }
            Ok(Value::Null)
        }
        "count" => {
            let callback = args.first().cloned().unwrap_or(Value::Null);
            let (width, height) = {
                let g = grid.borrow();
                (g.width, g.height)
            };
            let mut total = 0.0;
            for y in 0..height {
                for x in 0..width {
                    let cell = grid.borrow().get(x, y).cloned().unwrap_or(Value::Undefined);
                    let matched = engine.call_value(&callback, &[cell, Value::Number(x as f64), Value::Number(y as f64)], line, col)?;
                    if matched.is_truthy() {
                        total += 1.0;
                    }
                }
            }
            Ok(Value::Number(total))
        }
        "draw" => {
            let (width, height) = {
                let g = grid.borrow();
                (g.width, g.height)
            };
            for y in 0..height {
                for x in 0..width {
                    let color = {
                        let g = grid.borrow();
                        let cell = g.get(x, y).cloned().unwrap_or(Value::Undefined);
                        g.color_map.get(&cell.to_string()).map(Value::to_string)
                    };
                    if let Some(color) = color {
                        engine.host().set_cell(x as i64, y as i64, &color);
                    }
                }
            }
            Ok(Value::Null)
        }
        other => Err(GridError::runtime(line, col, format!("grid has no method '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    struct FakeEngine(NullHost);
    impl Engine for FakeEngine {
        fn call_value(&mut self, callee: &Value, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
            let Value::Native("is_one") = callee else { unreachable!() };
            Ok(Value::Boolean(matches!(args.first(), Some(Value::Number(n)) if *n == 1.0)))
        }
        fn host(&mut self) -> &mut dyn crate::host::Host {
            &mut self.0
        }
        fn debug_enabled(&self) -> bool {
            false
        }
        fn set_debug_enabled(&mut self, _e: bool) {}
    }

    fn sample_grid() -> Value {
        let rows = Value::array(vec![
            Value::array(vec![Value::Number(0.0), Value::Number(1.0)]),
            Value::array(vec![Value::Number(1.0), Value::Number(0.0)]),
        ]);
        let mut e = FakeEngine(NullHost::default());
        make_grid(&mut e, &[rows], 1, 1).unwrap()
    }

    #[test]
    fn get_and_set_round_trip() {
        let grid = sample_grid();
        let mut e = FakeEngine(NullHost::default());
        let v = call_method(&mut e, &grid, "get", &[Value::Number(1.0), Value::Number(0.0)], 1, 1).unwrap();
        assert_eq!(v.to_string(), "1");
        call_method(&mut e, &grid, "set", &[Value::Number(0.0), Value::Number(0.0), Value::Number(9.0)], 1, 1).unwrap();
        let v = call_method(&mut e, &grid, "get", &[Value::Number(0.0), Value::Number(0.0)], 1, 1).unwrap();
        assert_eq!(v.to_string(), "9");
    }

    #[test]
    fn neighbors_excludes_out_of_bounds() {
        let grid = sample_grid();
        let mut e = FakeEngine(NullHost::default());
        let n = call_method(&mut e, &grid, "neighbors", &[Value::Number(0.0), Value::Number(0.0)], 1, 1).unwrap();
        assert_eq!(n.to_string(), "[[1, 0], [0, 1]]");
    }

    #[test]
    fn count_uses_callback_predicate() {
        let grid = sample_grid();
        let mut e = FakeEngine(NullHost::default());
        let n = call_method(&mut e, &grid, "count", &[Value::Native("is_one")], 1, 1).unwrap();
        assert_eq!(n.to_string(), "2");
    }
}
