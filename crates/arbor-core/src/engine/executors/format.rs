//! Executors that produce text without side effects.

use crate::constants::PARAM_MESSAGE;
use crate::engine::error::EngineResult;
use crate::engine::executor::{ExecutionContext, ExecutionValue, Executor};
use async_trait::async_trait;
use tracing::debug;

/// Returns the interpolated `message` parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatExecutor;

#[async_trait]
impl Executor for FormatExecutor {
    async fn execute(&self, context: &ExecutionContext<'_>) -> EngineResult<ExecutionValue> {
        let template = context.required_str(&[PARAM_MESSAGE])?;
        let text = context.interpolate(template);
        debug!(parent: context.span, chars = text.len(), "Formatted message");
        Ok(ExecutionValue::Text(text))
    }
}

/// Does nothing and returns empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
    async fn execute(&self, _context: &ExecutionContext<'_>) -> EngineResult<ExecutionValue> {
        Ok(ExecutionValue::Text(String::new()))
    }
}
