//! arbor - a command orchestrator driven by a declarative command tree.

pub mod constants;
pub mod engine;
