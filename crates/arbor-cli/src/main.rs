//! arbor - a command orchestrator driven by a declarative command tree.
//!
//! Loads the command tree document, builds a CLI from it, and runs the
//! matched command's execution plan.

mod output;

use arbor_core::constants::{FLAG_CONFIG, FLAG_VERBOSE, SHORT_CONFIG, SHORT_VERBOSE};
use arbor_core::engine::cancel::CancellationSource;
use arbor_core::engine::cli::{CliGenerator, Invocation};
use arbor_core::engine::config::load_document;
use arbor_core::engine::display::render_plan;
use arbor_core::engine::error::EngineError;
use arbor_core::engine::executor::{ExecutionValue, ExecutorRegistry};
use arbor_core::engine::path::find_config_file;
use arbor_core::engine::runtime::Runtime;
use output::OutputFormatter;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

/// Main entry point of the application.
#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Logging and config location are needed before the CLI can be built,
    // so they are read from the raw arguments first.
    init_logging(has_verbose_flag(&args));

    let config_path = match config_flag(&args).or_else(find_config_file) {
        Some(path) => path,
        None => {
            OutputFormatter::error("Configuration file not found.");
            process::exit(EXIT_FAILURE);
        }
    };
    debug!(config = %config_path.display(), "Loading command tree");

    let tree = match load_document(&config_path) {
        Ok(tree) => tree,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            process::exit(EXIT_FAILURE);
        }
    };

    let outcome = match CliGenerator::new(&tree).parse(&args) {
        Invocation::Run(outcome) => outcome,
        Invocation::Display(text) => {
            print!("{}", text);
            return;
        }
    };

    let runtime = Runtime::new(tree, ExecutorRegistry::with_defaults());
    let cancellation = Arc::new(CancellationSource::new());
    {
        let cancellation = cancellation.clone();
        if let Err(e) = ctrlc::set_handler(move || cancellation.cancel()) {
            OutputFormatter::warning(&format!("Failed to install Ctrl-C handler: {}", e));
        }
    }

    if outcome.flags.dry_run {
        match runtime.plan(&outcome, cancellation.signal()) {
            Ok(plan) => print!("{}", render_plan(&plan)),
            Err(e) => exit_with_error(&e),
        }
        return;
    }

    match runtime.run(&outcome, cancellation.signal()).await {
        Ok(results) => process::exit(report_results(&results)),
        Err(e) => exit_with_error(&e),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn has_verbose_flag(args: &[String]) -> bool {
    let long = format!("--{}", FLAG_VERBOSE);
    let short = format!("-{}", SHORT_VERBOSE);
    args.iter().skip(1).any(|arg| *arg == long || *arg == short)
}

/// Value of `--config`/`-c`, in either `--config path` or `--config=path` form.
fn config_flag(args: &[String]) -> Option<PathBuf> {
    let long = format!("--{}", FLAG_CONFIG);
    let short = format!("-{}", SHORT_CONFIG);
    let prefixed = format!("{}=", long);

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if *arg == long || *arg == short {
            return iter.next().map(PathBuf::from);
        }
        if let Some(value) = arg.strip_prefix(&prefixed) {
            return Some(PathBuf::from(value));
        }
    }
    None
}

/// Prints text results and returns the process exit code, taken from the
/// last exit-code result.
fn report_results(results: &[ExecutionValue]) -> i32 {
    for result in results {
        if let ExecutionValue::Text(text) = result {
            if !text.is_empty() {
                println!("{}", text);
            }
        }
    }
    results
        .iter()
        .rev()
        .find_map(ExecutionValue::exit_code)
        .unwrap_or(0)
}

fn exit_with_error(error: &EngineError) -> ! {
    OutputFormatter::error(&error.to_string());
    match error {
        EngineError::Cancelled => process::exit(EXIT_INTERRUPTED),
        _ => process::exit(EXIT_FAILURE),
    }
}
