//! Terminal output for results and errors.

/// ANSI color codes
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
}

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a user-facing error on stderr.
    pub fn error(message: &str) {
        eprintln!("{}✗{} {}", colors::BRIGHT_RED, colors::RESET, message);
    }

    pub fn warning(message: &str) {
        eprintln!("{}⚠{} {}", colors::BRIGHT_YELLOW, colors::RESET, message);
    }
}
