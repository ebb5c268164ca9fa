//! CLI wiring for the `sqcarve` binary.
//!
//! Argument parsing uses clap derive macros; the [`app::Cli`] struct is
//! shared between `main.rs` and `build.rs` (for man page and completion
//! generation) via `include!()`. The carving command itself lives in
//! [`carve`] as an options struct plus a
//! `pub fn execute(opts, writer) -> Result<(), CarveError>` entry point;
//! the `writer: &mut dyn Write` parameter is where rows and verbose
//! diagnostics go, and lets tests capture output.

pub mod app;
pub mod carve;

/// Write a line to the given writer, converting io::Error to CarveError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::CarveError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::CarveError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;
