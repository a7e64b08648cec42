// Progress reporting while a patch is applied.
//
// Purely observational: nothing reported here feeds back into decoding.

use std::fmt;

/// Receives human-readable progress messages from the patch applier.
///
/// Only [`message`](Diagnostics::message) is required. `detail` carries one
/// line per decoded command and `warning` carries checksum mismatches; both
/// fall back to `message`.
pub trait Diagnostics {
    fn message(&mut self, args: fmt::Arguments<'_>);

    fn detail(&mut self, args: fmt::Arguments<'_>) {
        self.message(args);
    }

    fn warning(&mut self, args: fmt::Arguments<'_>) {
        self.message(args);
    }
}

/// Forwards to the `log` facade: `debug` for messages, `trace` for
/// per-command detail, `warn` for warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn message(&mut self, args: fmt::Arguments<'_>) {
        log::debug!("{args}");
    }

    fn detail(&mut self, args: fmt::Arguments<'_>) {
        log::trace!("{args}");
    }

    fn warning(&mut self, args: fmt::Arguments<'_>) {
        log::warn!("{args}");
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn message(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Any `FnMut(&str)` closure receives every message, formatted.
impl<F: FnMut(&str)> Diagnostics for F {
    fn message(&mut self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self(s),
            None => self(&args.to_string()),
        }
    }
}
