//! Timing and animation built-ins (spec §6 "Timing/animation", §5
//! "Scheduling"). True frame-by-frame asynchronous scheduling is the host's
//! job (spec §1 lists the benchmark/animation harness as an external
//! collaborator); inside the core, `animate` drives a bounded synchronous
//! loop over the callback so the language itself stays single-threaded and
//! deterministic (spec §5 "the VM itself never yields mid-instruction").
//! See DESIGN.md for this Open Question's resolution.

use crate::{
    builtins::{map_arg, number_or},
    engine::Engine,
    error::GridResult,
    value::Value,
};

/// Frame cap used when `opts` doesn't name one, keeping a callback that
/// never returns `false` from looping forever inside the core.
const DEFAULT_ANIMATE_FRAMES: f64 = 1.0;

pub fn time(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    Ok(Value::Number(e.host().time()))
}

pub fn clock(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    Ok(Value::Number(e.host().clock()))
}

/// `benchmark(fn, n=1)`: calls `fn` `n` times, returns elapsed host-clock
/// time in the same units `time()`/`clock()` use.
pub fn benchmark(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let callback = args.first().cloned().unwrap_or(Value::Null);
    let n = number_or(args, 1, 1.0).max(0.0) as u64;
    let start = e.host().time();
    for _ in 0..n {
        e.call_value(&callback, &[], line, col)?;
    }
    let end = e.host().time();
    Ok(Value::Number(end - start))
}

fn frame_cap(args: &[Value]) -> f64 {
    match args.get(1) {
        Some(Value::Map(_)) => {
            let opts = map_arg(args, 1, "animate", 0, 0).expect("already matched Map");
            match opts.borrow().get("frames") {
                Some(Value::Number(n)) => *n,
                _ => DEFAULT_ANIMATE_FRAMES,
            }
        }
        _ => DEFAULT_ANIMATE_FRAMES,
    }
}

/// `animate(fn, opts?)`: signals the host that animation started, then calls
/// `fn(frame)` for each frame up to `opts.frames` (default one frame) or
/// until `fn` returns a falsy value, then signals the host to stop.
pub fn animate(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let callback = args.first().cloned().unwrap_or(Value::Null);
    let cap = frame_cap(args).max(0.0) as u64;
    e.host().animate_started();
    let mut frames_run = 0u64;
    for frame in 0..cap {
        let result = e.call_value(&callback, &[Value::Number(frame as f64)], line, col)?;
        frames_run += 1;
        if !result.is_truthy() {
            break;
        }
    }
    e.host().stop_animation();
    Ok(Value::Number(frames_run as f64))
}

pub fn stop_animation(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().stop_animation();
    Ok(Value::Null)
}

pub fn record_animation(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().record_animation();
    Ok(Value::Null)
}

pub fn save_animation_gif(e: &mut dyn Engine, args: &[Value], line: u32, col: u32) -> GridResult<Value> {
    let path = crate::builtins::string_or(args, 0, "animation.gif");
    let _ = (line, col);
    e.host().save_animation_gif(path.as_ref());
    Ok(Value::Null)
}

pub fn stop_recording(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().stop_recording();
    Ok(Value::Null)
}

pub fn clear_recording(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    e.host().clear_recording();
    Ok(Value::Null)
}

pub fn get_animation_frames(e: &mut dyn Engine, _args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
    let frames = e.host().get_animation_frames();
    Ok(Value::array(frames.into_iter().map(Value::string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    struct FakeEngine {
        host: NullHost,
        calls: u64,
    }
    impl Engine for FakeEngine {
        fn call_value(&mut self, _callee: &Value, args: &[Value], _line: u32, _col: u32) -> GridResult<Value> {
            self.calls += 1;
            // Treat the frame index argument as the loop's continue signal: stop once it reaches 2.
            let frame = args.first().and_then(|v| if let Value::Number(n) = v { Some(*n) } else { None }).unwrap_or(0.0);
            Ok(Value::Boolean(frame < 2.0))
        }
        fn host(&mut self) -> &mut dyn crate::host::Host {
            &mut self.host
        }
        fn debug_enabled(&self) -> bool {
            false
        }
        fn set_debug_enabled(&mut self, _e: bool) {}
    }

    #[test]
    fn benchmark_invokes_callback_n_times() {
        let mut e = FakeEngine { host: NullHost::default(), calls: 0 };
        benchmark(&mut e, &[Value::Native("noop"), Value::Number(3.0)], 1, 1).unwrap();
        assert_eq!(e.calls, 3);
    }

    #[test]
    fn animate_stops_when_callback_returns_false() {
        let mut e = FakeEngine { host: NullHost::default(), calls: 0 };
        let mut opts = indexmap::IndexMap::new();
        opts.insert("frames".to_owned(), Value::Number(10.0));
        let frames_run = animate(&mut e, &[Value::Native("noop"), Value::map(opts)], 1, 1).unwrap();
        assert_eq!(frames_run.to_string(), "3");
        assert_eq!(e.calls, 3);
    }
}
