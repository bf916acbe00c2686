//! A leaf command bound to its resolved parameters, ready to dispatch.

use super::cancel::CancellationSignal;
use super::error::{EngineError, EngineResult};
use super::executor::{ExecutionContext, ExecutionValue, ExecutorRegistry};
use super::params::ParameterSet;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

pub struct Executable {
    path: Vec<String>,
    parameters: ParameterSet,
    cancellation: CancellationSignal,
    executor: Option<String>,
    registry: Arc<ExecutorRegistry>,
}

impl Executable {
    pub fn new(
        path: Vec<String>,
        parameters: ParameterSet,
        cancellation: CancellationSignal,
        executor: Option<String>,
        registry: Arc<ExecutorRegistry>,
    ) -> Self {
        Self {
            path,
            parameters,
            cancellation,
            executor,
            registry,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn display_path(&self) -> String {
        self.path.join(" ")
    }

    pub fn executor_id(&self) -> Option<&str> {
        self.executor.as_deref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Looks up the executor and runs it. Consumes the executable.
    ///
    /// # Errors
    ///
    /// Fails if no executor id is configured, the id is not registered, or
    /// the executor itself fails.
    pub async fn execute(self) -> EngineResult<ExecutionValue> {
        let display_path = self.display_path();
        let id = self
            .executor
            .as_deref()
            .ok_or_else(|| EngineError::MissingExecutor {
                path: display_path.clone(),
            })?;
        let executor = self.registry.create(id)?;

        let span = info_span!("executable", path = %display_path, executor = %id);
        let context = ExecutionContext {
            path: &self.path,
            parameters: &self.parameters,
            cancellation: &self.cancellation,
            span: &span,
        };

        info!(parent: &span, "Executing '{}'", display_path);
        let result = executor.execute(&context).instrument(span.clone()).await;
        match &result {
            Ok(value) => info!(parent: &span, result = %value, "Finished '{}'", display_path),
            Err(e) => warn!(parent: &span, "'{}' failed: {}", display_path, e),
        }
        result
    }
}

impl std::fmt::Debug for Executable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executable")
            .field("path", &self.path)
            .field("executor", &self.executor)
            .field("parameters", &self.parameters)
            .finish()
    }
}
