//! Built-in executors.

pub mod format;
pub mod process;
