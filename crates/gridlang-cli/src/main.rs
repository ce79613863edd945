//! Script-runner binary (spec §6 "CLI surface"): reads a GridLang source
//! file plus an optional input-text file, runs it, and exits 0 on success
//! or 1 on any parse/compile/runtime error.

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use gridlang::{Backend, Config, GridError, Interpreter, NullHost};

#[derive(Debug, ClapParser)]
#[command(name = "gridlang", about = "Run a GridLang script")]
struct Args {
    /// Path to the `.grid` source file to run.
    script: PathBuf,

    /// Optional input-text file staged for `input_string`/`input_lines`/`input_grid`.
    input: Option<PathBuf>,

    /// Run with the tree-walk evaluator instead of the bytecode VM.
    #[arg(long)]
    tree_walk: bool,

    /// Cap on nested function-call depth.
    #[arg(long, default_value_t = 512)]
    max_call_depth: usize,

    /// Verbose logging (`-v` for debug, `-vv` for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("gridlang={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> Result<()> {
    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("reading script '{}'", args.script.display()))?;

    let staged_input = match &args.input {
        Some(path) => {
            Some(fs::read_to_string(path).with_context(|| format!("reading input file '{}'", path.display()))?)
        }
        None => None,
    };

    let config = Config {
        max_call_depth: args.max_call_depth,
        backend: if args.tree_walk { Backend::TreeWalk } else { Backend::Vm },
        ..Config::default()
    };
    let host = StagedInputHost::new(staged_input);
    let mut interpreter = Interpreter::new(Box::new(host), config);

    tracing::info!(script = %args.script.display(), backend = ?config.backend, "running script");
    interpreter.run(&source).map_err(report_grid_error)?;
    Ok(())
}

/// Flattens a `GridError` into `anyhow::Error`, preserving the user-visible
/// `<kind> at line L, col C: <message>` shape (spec §7).
fn report_grid_error(err: GridError) -> anyhow::Error {
    anyhow::anyhow!("{}", err.user_visible())
}

/// A `Host` that delegates rendering/timing to `NullHost` (no canvas in a
/// CLI runner) but answers `input_string`/`input_lines` from a file staged
/// on the command line, rather than from stdin — the CLI is meant for
/// batch/CI use, not an interactive prompt (spec §6 "Input").
struct StagedInputHost {
    null: NullHost,
    staged: Option<String>,
}

impl StagedInputHost {
    fn new(staged: Option<String>) -> Self {
        Self { null: NullHost::default(), staged }
    }
}

impl gridlang::host::Print for StagedInputHost {
    fn write(&mut self, text: &str) {
        print!("{text}");
    }

    fn flush(&mut self) {
        use std::io::Write as _;
        let _ = std::io::stdout().flush();
    }
}

impl gridlang::host::Render2d for StagedInputHost {
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

impl gridlang::host::Render3d for StagedInputHost {
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

impl gridlang::host::InputBag for StagedInputHost {
    fn input_string(&mut self, _name: Option<&str>) -> String {
        self.staged.clone().unwrap_or_default()
    }

    fn input_lines(&mut self, _name: Option<&str>) -> Vec<String> {
        match &self.staged {
            Some(text) => text.lines().map(str::to_owned).collect(),
            None => Vec::new(),
        }
    }
}

impl gridlang::host::Clock for StagedInputHost {
    fn time(&mut self) -> f64 {
        self.null.time()
    }
    fn clock(&mut self) -> f64 {
        self.null.clock()
    }
}

impl gridlang::host::Animator for StagedInputHost {
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
