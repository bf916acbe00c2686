//! Runtime for executing arbor commands.
//!
//! Ties the stages together for one invocation: validate the parsed command
//! line, build the plan, run it.

use super::ast::CommandTree;
use super::cancel::CancellationSignal;
use super::cli::ParseOutcome;
use super::error::EngineResult;
use super::executor::{ExecutionValue, ExecutorRegistry};
use super::group::ExecutionGroup;
use super::planner::PlanBuilder;
use super::validator::InvocationValidator;
use std::sync::Arc;

pub struct Runtime {
    tree: CommandTree,
    registry: Arc<ExecutorRegistry>,
}

impl Runtime {
    pub fn new(tree: CommandTree, registry: ExecutorRegistry) -> Self {
        Self {
            tree,
            registry: Arc::new(registry),
        }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Validates the invocation and builds its plan without running anything.
    pub fn plan(
        &self,
        outcome: &ParseOutcome,
        cancellation: CancellationSignal,
    ) -> EngineResult<ExecutionGroup> {
        InvocationValidator::validate(&outcome.errors, outcome.token_count)?;
        PlanBuilder::new(
            &self.tree,
            &outcome.bindings,
            self.registry.clone(),
            cancellation,
        )
        .build(outcome.node)
    }

    /// Validates, plans and executes one invocation.
    pub async fn run(
        &self,
        outcome: &ParseOutcome,
        cancellation: CancellationSignal,
    ) -> EngineResult<Vec<ExecutionValue>> {
        let mut plan = self.plan(outcome, cancellation)?;
        plan.execute().await
    }
}
