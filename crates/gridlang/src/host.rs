//! Host surface: the seam the out-of-scope collaborators (browser editor,
//! 2-D/3-D renderers, Gist storage, GIF recorder, input manager) attach to.
//!
//! Grounded on the teacher's `io.rs` `PrintWriter` trait: one method per
//! responsibility, a default stdout impl, and a no-op/collecting impl for
//! tests. GridLang splits the teacher's single trait into several narrow
//! ones because the built-in groups in spec §6 ("Rendering", "Input",
//! "Timing/animation") are independent concerns a host may implement
//! selectively.

use std::io::Write as _;

/// Sink for `print`/`debug` output (spec §6 "Core", §5 "Ordering").
pub trait Print {
    fn write(&mut self, text: &str);
    fn flush(&mut self);
}

/// Line-buffered stdout sink, flushed on program end/error/animation stop
/// (spec §5 "Ordering").
#[derive(Debug, Default)]
pub struct StdPrint {
    buf: String,
}

impl Print for StdPrint {
    fn write(&mut self, text: &str) {
        self.buf.push_str(text);
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            print!("{line}");
        }
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            print!("{}", self.buf);
            self.buf.clear();
        }
        let _ = std::io::stdout().flush();
    }
}

/// Collects output into an in-memory string; used by tests that assert on
/// stdout without touching the real terminal.
#[derive(Debug, Default)]
pub struct CollectPrint {
    pub output: String,
}

impl Print for CollectPrint {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn flush(&mut self) {}
}

/// The 2-D canvas built-ins (spec §6 "Rendering"). A color is an opaque
/// string (`rgb(...)`/`hsl(...)` produce it; hosts interpret it however
/// their canvas wants).
pub trait Render2d {
    fn init_2d(&mut self, rows: usize, cols: usize, cell_size: f64);
    fn set_cell(&mut self, row: i64, col: i64, color: &str);
    fn clear_canvas(&mut self);
    fn set_pixel(&mut self, x: i64, y: i64, color: &str);
    fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: &str);
    fn draw_circle(&mut self, x: f64, y: f64, radius: f64, color: &str);
    fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
}

/// The voxel/3-D built-ins (spec §6 "Rendering").
pub trait Render3d {
    fn init_3d(&mut self);
    fn set_voxel(&mut self, x: i64, y: i64, z: i64, color: &str);
    fn remove_voxel(&mut self, x: i64, y: i64, z: i64);
    fn get_voxel(&mut self, x: i64, y: i64, z: i64) -> Option<String>;
    fn clear_3d(&mut self);
    fn begin_3d_batch(&mut self);
    fn end_3d_batch(&mut self);
}

/// Named input-text bag (spec §6 "Input"); the editor/file-manager
/// collaborator populates it before the script runs.
pub trait InputBag {
    fn input_string(&mut self, name: Option<&str>) -> String;
    fn input_lines(&mut self, name: Option<&str>) -> Vec<String>;
}

/// Wall-clock source (spec §6 "Timing"); a `NullHost` always returns 0 so
/// scripts that don't call `random()`/timing built-ins stay deterministic
/// (spec §8 "Determinism").
pub trait Clock {
    fn time(&mut self) -> f64;
    fn clock(&mut self) -> f64;
}

/// Cooperative animation scheduler (spec §5). The interpreter hands the
/// host a callback value; the host decides when to invoke it and whether
/// to keep going.
pub trait Animator {
    fn animate_started(&mut self);
    fn stop_animation(&mut self);
    fn record_animation(&mut self);
    fn stop_recording(&mut self);
    fn clear_recording(&mut self);
    fn get_animation_frames(&mut self) -> Vec<String>;
    fn save_animation_gif(&mut self, path: &str);
}

/// The single seam the interpreter owns (spec §5 "Shared resources... owned
/// by the interpreter instance").
pub trait Host: Print + Render2d + Render3d + InputBag + Clock + Animator {}
impl<T: Print + Render2d + Render3d + InputBag + Clock + Animator> Host for T {}

/// A host that discards rendering, returns empty input, and a frozen clock.
/// What the built-in library is tested against (spec §8's "Determinism"
/// property requires no real clock/canvas).
#[derive(Debug, Default)]
pub struct NullHost {
    print: CollectPrint,
}

impl NullHost {
    /// Everything written through `print`/`debug` so far, for test assertions.
    pub fn output(&self) -> &str {
        &self.print.output
    }
}

impl Print for NullHost {
    fn write(&mut self, text: &str) {
        self.print.write(text);
    }

    fn flush(&mut self) {
        self.print.flush();
    }
}

impl Render2d for NullHost {
    fn init_2d(&mut self, _rows: usize, _cols: usize, _cell_size: f64) {}
    fn set_cell(&mut self, _row: i64, _col: i64, _color: &str) {}
    fn clear_canvas(&mut self) {}
    fn set_pixel(&mut self, _x: i64, _y: i64, _color: &str) {}
    fn draw_line(&mut self, _x0: f64, _y0: f64, _x1: f64, _y1: f64, _color: &str) {}
    fn draw_circle(&mut self, _x: f64, _y: f64, _radius: f64, _color: &str) {}
    fn draw_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64, _color: &str) {}
}

impl Render3d for NullHost {
    fn init_3d(&mut self) {}
    fn set_voxel(&mut self, _x: i64, _y: i64, _z: i64, _color: &str) {}
    fn remove_voxel(&mut self, _x: i64, _y: i64, _z: i64) {}
    fn get_voxel(&mut self, _x: i64, _y: i64, _z: i64) -> Option<String> {
        None
    }
    fn clear_3d(&mut self) {}
    fn begin_3d_batch(&mut self) {}
    fn end_3d_batch(&mut self) {}
}

impl InputBag for NullHost {
    fn input_string(&mut self, _name: Option<&str>) -> String {
        String::new()
    }

    fn input_lines(&mut self, _name: Option<&str>) -> Vec<String> {
        Vec::new()
    }
}

impl Clock for NullHost {
    fn time(&mut self) -> f64 {
        0.0
    }

    fn clock(&mut self) -> f64 {
        0.0
    }
}

impl Animator for NullHost {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_print_accumulates() {
        let mut p = CollectPrint::default();
        p.write("a");
        p.write("b\n");
        assert_eq!(p.output, "ab\n");
    }

    #[test]
    fn null_host_clock_is_frozen() {
        let mut h = NullHost::default();
        assert_eq!(h.time(), 0.0);
        assert_eq!(h.clock(), 0.0);
    }
}
