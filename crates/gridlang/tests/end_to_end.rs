//! The literal end-to-end scenarios, run under both backends and asserted
//! to produce byte-identical stdout ("Backend equivalence").

use std::{cell::RefCell, rc::Rc};

use gridlang::{
    host::{Animator, Clock, InputBag, NullHost, Print, Render2d, Render3d},
    Backend, Config, Interpreter,
};

/// A `Host` that records everything written through `print`/`debug` into a
/// shared buffer while delegating every other seam to an inert `NullHost`,
/// so a test can read back stdout after the `Interpreter` (which owns the
/// host by value) has finished running.
struct RecordingHost {
    output: Rc<RefCell<String>>,
    null: NullHost,
}

impl RecordingHost {
    fn new() -> (Self, Rc<RefCell<String>>) {
        let output = Rc::new(RefCell::new(String::new()));
        (Self { output: output.clone(), null: NullHost::default() }, output)
    }
}

impl Print for RecordingHost {
    fn write(&mut self, text: &str) {
        self.output.borrow_mut().push_str(text);
    }
    fn flush(&mut self) {}
}

impl Render2d for RecordingHost {
    fn init_2d(&mut self, rows: usize, cols: usize, cell_size: f64) {
        self.null.init_2d(rows, cols, cell_size);
    }
    fn set_cell(&mut self, row: i64, col: i64, color: &str) {
        self.null.set_cell(row, col, color);
    }
    fn clear_canvas(&mut self) {
        self.null.clear_canvas();
    }
    fn set_pixel(&mut self, x: i64, y: i64, color: &str) {
        self.null.set_pixel(x, y, color);
    }
    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: &str) {
        self.null.draw_line(x0, y0, x1, y1, color);
    }
    fn draw_circle(&mut self, x: f64, y: f64, radius: f64, color: &str) {
        self.null.draw_circle(x, y, radius, color);
    }
    fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.null.draw_rect(x, y, w, h, color);
    }
}

impl Render3d for RecordingHost {
    fn init_3d(&mut self) {
        self.null.init_3d();
    }
    fn set_voxel(&mut self, x: i64, y: i64, z: i64, color: &str) {
        self.null.set_voxel(x, y, z, color);
    }
    fn remove_voxel(&mut self, x: i64, y: i64, z: i64) {
        self.null.remove_voxel(x, y, z);
    }
    fn get_voxel(&mut self, x: i64, y: i64, z: i64) -> Option<String> {
        self.null.get_voxel(x, y, z)
    }
    fn clear_3d(&mut self) {
        self.null.clear_3d();
    }
    fn begin_3d_batch(&mut self) {
        self.null.begin_3d_batch();
    }
    fn end_3d_batch(&mut self) {
        self.null.end_3d_batch();
    }
}

impl InputBag for RecordingHost {
    fn input_string(&mut self, name: Option<&str>) -> String {
        self.null.input_string(name)
    }
    fn input_lines(&mut self, name: Option<&str>) -> Vec<String> {
        self.null.input_lines(name)
    }
}

impl Clock for RecordingHost {
    fn time(&mut self) -> f64 {
        self.null.time()
    }
    fn clock(&mut self) -> f64 {
        self.null.clock()
    }
}

impl Animator for RecordingHost {
    fn animate_started(&mut self) {
        self.null.animate_started();
    }
    fn stop_animation(&mut self) {
        self.null.stop_animation();
    }
    fn record_animation(&mut self) {
        self.null.record_animation();
    }
    fn stop_recording(&mut self) {
        self.null.stop_recording();
    }
    fn clear_recording(&mut self) {
        self.null.clear_recording();
    }
    fn get_animation_frames(&mut self) -> Vec<String> {
        self.null.get_animation_frames()
    }
    fn save_animation_gif(&mut self, path: &str) {
        self.null.save_animation_gif(path);
    }
}

fn run_under(src: &str, backend: Backend) -> String {
    let (host, output) = RecordingHost::new();
    let mut interp = Interpreter::new(Box::new(host), Config { backend, ..Config::default() });
    interp.run(src).unwrap();
    output.borrow().clone()
}

fn assert_both(src: &str, expected: &str) {
    assert_eq!(run_under(src, Backend::Vm), expected, "VM backend output mismatch");
    assert_eq!(run_under(src, Backend::TreeWalk), expected, "tree-walk backend output mismatch");
}

#[test]
fn arithmetic_precedence() {
    assert_both("print(2+3*4)", "14\n");
}

#[test]
fn for_loop_over_range() {
    assert_both("for i in range(3){print(i)}", "0\n1\n2\n");
}

#[test]
fn two_variable_for_over_map_yields_key_then_value() {
    assert_both("m={a:1,b:2}\nfor k,v in m {print(k,v)}", "a 1\nb 2\n");
}

#[test]
fn recursive_fibonacci() {
    assert_both(
        "func fib(n){if n<=1 {return n} return fib(n-1)+fib(n-2)}\nprint(fib(10))",
        "55\n",
    );
}

#[test]
fn named_capture_groups_resolve_by_attribute_and_index() {
    assert_both(
        r#"p=r"(?<y>\d+)-(?<m>\d+)"
g=p.groups("2025-12")
print(g.y, g["m"])"#,
        "2025 12\n",
    );
}

#[test]
fn sort_returns_a_new_array_leaving_the_original_unchanged() {
    assert_both(
        "a=[3,1,2]\nb=a.sort()\nprint(b[0], a[0])",
        "1 3\n",
    );
}

#[test]
fn short_circuit_or_skips_the_right_operand() {
    let src = "calls=0\nfunc bump(){calls=calls+1; return true}\nresult = true or bump()\nprint(calls)";
    assert_both(src, "0\n");
}

#[test]
fn closure_capture_is_independent_per_call_to_the_factory() {
    let src = "func make(){x=0\n  return func(){x=x+1\n    return x}}\nf=make()\ng=make()\nprint(f(), f(), g())";
    assert_both(src, "1 2 1\n");
}

#[test]
fn fstring_interpolates_a_member_path() {
    let src = "m={name:\"grid\"}\nprint(f\"hello {m.name}, count {m.name.length}\")";
    assert_both(src, "hello grid, count 4\n");
}
