//! Verbose stage tracing.
//!
//! The pipeline stays quiet by default; [`CompileOptions`] and the CLI
//! `--verbose` flag turn on short per-stage traces on stderr.
//!
//! [`CompileOptions`]: crate::compiler::CompileOptions

extern crate std;

use core::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(value: bool) {
    VERBOSE.store(value, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a trace line to stderr when verbose mode is on.
pub fn trace(message: &str) {
    if is_verbose() {
        std::eprintln!("sable: {message}");
    }
}
