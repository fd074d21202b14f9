//! Numbered step output for interactive runs.

use std::fmt::Display;
use std::io::{self, Stdout, Write};

/// Prints `[n/total] message...` lines plus status lines underneath.
///
/// Everything is suppressed in quiet mode. Write failures on the output are
/// ignored; progress is cosmetic and must never abort a run.
pub struct ProgressTracker<W: Write = Stdout> {
    output: W,
    verbose: bool,
    step: usize,
    total_steps: usize,
}

impl ProgressTracker<Stdout> {
    /// Creates a tracker writing to stdout.
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ProgressTracker<W> {
    /// Creates a tracker writing to `output`.
    pub fn new(output: W, verbose: bool) -> Self {
        Self {
            output,
            verbose,
            step: 0,
            total_steps: 0,
        }
    }

    /// Sets the number of steps shown in the `[n/total]` prefix and resets the counter.
    pub fn set_total_steps(&mut self, total: usize) {
        self.total_steps = total;
        self.step = 0;
    }

    /// Starts the next step.
    pub fn step(&mut self, message: &str) {
        self.step += 1;
        let prefix = self.prefix(self.step);
        self.emit(format_args!("{prefix} {message}...\n"));
    }

    /// Starts the next step with a detail line.
    pub fn step_with_details(&mut self, message: &str, details: &str) {
        self.step(message);
        self.emit(format_args!("  → {details}\n"));
    }

    /// Informational line.
    pub fn info(&mut self, message: impl Display) {
        self.emit(format_args!("  ℹ {message}\n"));
    }

    /// Warning line.
    pub fn warning(&mut self, message: impl Display) {
        self.emit(format_args!("  ⚠ {message}\n"));
    }

    /// Success line.
    pub fn success(&mut self, message: impl Display) {
        self.emit(format_args!("  ✓ {message}\n"));
    }

    /// Error line.
    pub fn error(&mut self, message: impl Display) {
        self.emit(format_args!("  ✗ {message}\n"));
    }

    /// Runs `f` as one step, closing the line with ✓ or ✗ and the error.
    ///
    /// The step counter only advances when `f` succeeds.
    pub fn step_context<T, E, F>(&mut self, message: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        let prefix = self.prefix(self.step + 1);
        self.emit(format_args!("{prefix} {message}..."));
        let result = f();
        match &result {
            Ok(_) => {
                self.emit(format_args!(" ✓\n"));
                self.step += 1;
            }
            Err(e) => self.emit(format_args!(" ✗ ({e})\n")),
        }
        result
    }

    /// Consumes the tracker and returns the writer.
    pub fn into_inner(self) -> W {
        self.output
    }

    fn prefix(&self, step: usize) -> String {
        if self.total_steps > 0 {
            format!("[{step}/{}]", self.total_steps)
        } else {
            format!("[{step}]")
        }
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        if self.verbose {
            let _ = self.output.write_fmt(args);
            let _ = self.output.flush();
        }
    }
}
