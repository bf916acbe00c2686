//! Core modules for arbor.
//!
//! This module contains all the functionality for:
//! - Describing the command tree and loading it from a document
//! - Building a dynamic CLI and matching argv against it
//! - Resolving parameters and building execution plans
//! - Running plans through pluggable executors

pub mod ast;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod executable;
pub mod executor;
pub mod executors;
pub mod group;
pub mod params;
pub mod path;
pub mod planner;
pub mod runtime;
pub mod template;
pub mod validator;
