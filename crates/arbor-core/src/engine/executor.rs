//! Executor contract and registry.
//!
//! An [`Executor`] performs the actual work for a leaf command. Executors are
//! looked up by identifier in an [`ExecutorRegistry`] that is populated once
//! at startup with explicit factories.

use super::cancel::CancellationSignal;
use super::error::{EngineError, EngineResult, ExpectedType};
use super::executors::format::{FormatExecutor, NoopExecutor};
use super::executors::process::{ProcessExecutor, Shell};
use super::params::ParameterSet;
use super::template::TemplateProcessor;
use crate::constants::{
    EXECUTOR_BASH, EXECUTOR_CMD, EXECUTOR_FORMAT, EXECUTOR_NOOP, EXECUTOR_POWERSHELL,
    EXECUTOR_PWSH, EXECUTOR_SH,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::Span;

/// Value produced by an executor. The engine never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExecutionValue {
    ExitCode(i32),
    Text(String),
}

impl ExecutionValue {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionValue::ExitCode(code) => Some(*code),
            ExecutionValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ExecutionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionValue::ExitCode(code) => write!(f, "{}", code),
            ExecutionValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Everything an executor gets to see about the command it runs.
pub struct ExecutionContext<'a> {
    pub path: &'a [String],
    pub parameters: &'a ParameterSet,
    pub cancellation: &'a CancellationSignal,
    /// Span of the running executable; log through it.
    pub span: &'a Span,
}

impl<'a> ExecutionContext<'a> {
    pub fn display_path(&self) -> String {
        self.path.join(" ")
    }

    /// Interpolates `{{key}}` placeholders against the resolved parameters.
    pub fn interpolate(&self, template: &str) -> String {
        TemplateProcessor::process(template, self.parameters)
    }

    /// Reads the first of `names` that is present, requiring a string.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingParameter`] names the first candidate when none
    /// is present; [`EngineError::InvalidParameter`] when the value found is
    /// not a string.
    pub fn required_str(&self, names: &[&str]) -> EngineResult<&'a str> {
        let parameters: &'a ParameterSet = self.parameters;
        for name in names {
            if let Some(value) = parameters.get(name) {
                return value.as_str().ok_or_else(|| EngineError::InvalidParameter {
                    parameter: name.to_string(),
                    path: self.display_path(),
                    expected: ExpectedType::String,
                });
            }
        }
        Err(EngineError::MissingParameter {
            parameter: names.first().copied().unwrap_or_default().to_string(),
            path: self.display_path(),
        })
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, context: &ExecutionContext<'_>) -> EngineResult<ExecutionValue>;
}

type ExecutorFactory = Box<dyn Fn() -> Box<dyn Executor> + Send + Sync>;

/// Maps executor identifiers (case-insensitive) to factories.
#[derive(Default)]
pub struct ExecutorRegistry {
    factories: HashMap<String, ExecutorFactory>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in executor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (id, shell) in [
            (EXECUTOR_SH, Shell::Sh),
            (EXECUTOR_BASH, Shell::Bash),
            (EXECUTOR_CMD, Shell::Cmd),
            (EXECUTOR_POWERSHELL, Shell::PowerShell),
            (EXECUTOR_PWSH, Shell::Pwsh),
        ] {
            registry.register(id, move || Box::new(ProcessExecutor::new(shell)));
        }
        registry.register(EXECUTOR_FORMAT, || Box::new(FormatExecutor));
        registry.register(EXECUTOR_NOOP, || Box::new(NoopExecutor));
        registry
    }

    /// Registers a factory, replacing any previous one with the same id.
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<dyn Executor> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(&id.to_lowercase())
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn create(&self, id: &str) -> EngineResult<Box<dyn Executor>> {
        self.factories
            .get(&id.to_lowercase())
            .map(|factory| factory())
            .ok_or_else(|| EngineError::UnknownExecutor {
                executor: id.to_string(),
            })
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.ids())
            .finish()
    }
}
