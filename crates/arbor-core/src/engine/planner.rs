//! Execution plan construction.
//!
//! Walks the matched command and its descendants and produces a tree of
//! [`ExecutionGroup`]s. The direct children of each node are partitioned by
//! kind: leaves become executables of the current group, internal children
//! become nested groups. The matched node's own children are placed straight
//! into the top-level group.

use super::ast::{CommandTree, NodeId};
use super::cancel::CancellationSignal;
use super::error::{EngineResult, ValidationError};
use super::executable::Executable;
use super::executor::ExecutorRegistry;
use super::group::{ExecutionGroup, Strategy};
use super::params::{BoundValues, ParameterResolver, ParameterSet};
use crate::constants::{
    MSG_NO_EXECUTABLE_COMMANDS, PARAM_EXECUTABLE, PARAM_PARALLEL, ROOT_COMMAND_NAME,
};
use std::sync::Arc;
use tracing::debug;

pub struct PlanBuilder<'a> {
    tree: &'a CommandTree,
    resolver: ParameterResolver<'a>,
    registry: Arc<ExecutorRegistry>,
    cancellation: CancellationSignal,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        tree: &'a CommandTree,
        bindings: &'a dyn BoundValues,
        registry: Arc<ExecutorRegistry>,
        cancellation: CancellationSignal,
    ) -> Self {
        Self {
            tree,
            resolver: ParameterResolver::new(tree, bindings),
            registry,
            cancellation,
        }
    }

    /// Builds the plan for `matched`.
    ///
    /// A matched leaf yields a single-executable group. A matched internal
    /// node other than the tree root must resolve `executable` to `true`, as
    /// must every internal node below it.
    ///
    /// # Errors
    ///
    /// Fails with a validation error when an internal node is not executable
    /// or when the plan contains no executables at all.
    pub fn build(&self, matched: NodeId) -> EngineResult<ExecutionGroup> {
        let parameters = self.resolver.resolve(matched);
        let node = self.tree.node(matched);

        let group = if node.is_leaf() && matched != self.tree.root() {
            let mut group = ExecutionGroup::new(
                self.group_name(matched),
                Self::strategy(&parameters),
                self.cancellation.clone(),
            );
            group.push_executable(self.executable(matched, parameters));
            group
        } else {
            if matched != self.tree.root() {
                self.ensure_executable(matched, &parameters)?;
            }
            self.build_group(matched, &parameters)?
        };

        if group.executable_count() == 0 {
            return Err(ValidationError::new(MSG_NO_EXECUTABLE_COMMANDS).into());
        }
        debug!(
            group = %group.name(),
            executables = group.executable_count(),
            "Built execution plan"
        );
        Ok(group)
    }

    fn build_group(&self, node: NodeId, parameters: &ParameterSet) -> EngineResult<ExecutionGroup> {
        let mut group = ExecutionGroup::new(
            self.group_name(node),
            Self::strategy(parameters),
            self.cancellation.clone(),
        );

        for &child in self.tree.node(node).children() {
            let child_parameters = self.resolver.resolve(child);
            if self.tree.node(child).is_leaf() {
                group.push_executable(self.executable(child, child_parameters));
            } else {
                self.ensure_executable(child, &child_parameters)?;
                group.push_group(self.build_group(child, &child_parameters)?);
            }
        }

        Ok(group)
    }

    fn ensure_executable(&self, node: NodeId, parameters: &ParameterSet) -> EngineResult<()> {
        if parameters.get_bool(PARAM_EXECUTABLE) == Some(true) {
            Ok(())
        } else {
            Err(ValidationError::not_executable(&self.tree.node(node).name).into())
        }
    }

    fn executable(&self, node: NodeId, parameters: ParameterSet) -> Executable {
        Executable::new(
            self.tree.path(node),
            parameters,
            self.cancellation.clone(),
            self.tree.node(node).executor.clone(),
            self.registry.clone(),
        )
    }

    fn strategy(parameters: &ParameterSet) -> Strategy {
        Strategy::from_parallel(parameters.get_bool(PARAM_PARALLEL).unwrap_or(false))
    }

    fn group_name(&self, node: NodeId) -> String {
        if node == self.tree.root() {
            ROOT_COMMAND_NAME.to_string()
        } else {
            self.tree.display_path(node)
        }
    }
}
