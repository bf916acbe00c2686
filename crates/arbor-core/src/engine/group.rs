//! Sequential and parallel composition of executables.
//!
//! Within a group, every direct executable finishes before any nested group
//! starts, in both strategies. Results are ordered by declaration position:
//! the group's own executables first, then each nested group's results in
//! turn.

use super::cancel::CancellationSignal;
use super::error::{EngineError, EngineResult};
use super::executable::Executable;
use super::executor::ExecutionValue;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::task::JoinSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
}

impl Strategy {
    pub fn from_parallel(parallel: bool) -> Self {
        if parallel {
            Strategy::Parallel
        } else {
            Strategy::Sequential
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Parallel => write!(f, "parallel"),
        }
    }
}

/// `Idle -> Running -> Completed | Failed`. A group runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Idle,
    Running,
    Completed,
    Failed,
}

type GroupFuture<'a> = Pin<Box<dyn Future<Output = EngineResult<Vec<ExecutionValue>>> + Send + 'a>>;

#[derive(Debug)]
pub struct ExecutionGroup {
    name: String,
    strategy: Strategy,
    executables: Vec<Executable>,
    groups: Vec<ExecutionGroup>,
    cancellation: CancellationSignal,
    state: GroupState,
}

impl ExecutionGroup {
    pub fn new(name: impl Into<String>, strategy: Strategy, cancellation: CancellationSignal) -> Self {
        Self {
            name: name.into(),
            strategy,
            executables: Vec::new(),
            groups: Vec::new(),
            cancellation,
            state: GroupState::Idle,
        }
    }

    pub fn push_executable(&mut self, executable: Executable) {
        self.executables.push(executable);
    }

    pub fn push_group(&mut self, group: ExecutionGroup) {
        self.groups.push(group);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn executables(&self) -> &[Executable] {
        &self.executables
    }

    pub fn groups(&self) -> &[ExecutionGroup] {
        &self.groups
    }

    /// Executables in this group and every nested group.
    pub fn executable_count(&self) -> usize {
        self.executables.len()
            + self
                .groups
                .iter()
                .map(ExecutionGroup::executable_count)
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.executables.is_empty() && self.groups.is_empty()
    }

    /// Runs the group and returns its ordered results.
    ///
    /// Members are moved out as they run, so the group is empty afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first failure by declaration order. In sequential mode the
    /// remaining members never start; in parallel mode members that already
    /// started are awaited before the failure is returned.
    pub fn execute(&mut self) -> GroupFuture<'_> {
        Box::pin(async move {
            if self.state != GroupState::Idle {
                return Err(EngineError::GroupAlreadyExecuted {
                    name: self.name.clone(),
                });
            }
            self.state = GroupState::Running;
            debug!(
                group = %self.name,
                strategy = %self.strategy,
                executables = self.executables.len(),
                groups = self.groups.len(),
                "Running execution group"
            );

            let executables = std::mem::take(&mut self.executables);
            let groups = std::mem::take(&mut self.groups);
            let result = match self.strategy {
                Strategy::Sequential => {
                    Self::run_sequential(&self.cancellation, executables, groups).await
                }
                Strategy::Parallel => {
                    Self::run_parallel(&self.cancellation, executables, groups).await
                }
            };

            self.state = if result.is_ok() {
                GroupState::Completed
            } else {
                GroupState::Failed
            };
            debug!(group = %self.name, state = ?self.state, "Execution group finished");
            result
        })
    }

    async fn run_sequential(
        cancellation: &CancellationSignal,
        executables: Vec<Executable>,
        groups: Vec<ExecutionGroup>,
    ) -> EngineResult<Vec<ExecutionValue>> {
        let mut results = Vec::with_capacity(executables.len());
        for executable in executables {
            if cancellation.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            results.push(executable.execute().await?);
        }
        for mut group in groups {
            if cancellation.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            results.extend(group.execute().await?);
        }
        Ok(results)
    }

    async fn run_parallel(
        cancellation: &CancellationSignal,
        executables: Vec<Executable>,
        groups: Vec<ExecutionGroup>,
    ) -> EngineResult<Vec<ExecutionValue>> {
        if cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut leaves = JoinSet::new();
        let leaf_count = executables.len();
        for (index, executable) in executables.into_iter().enumerate() {
            leaves.spawn(async move { (index, executable.execute().await) });
        }
        let mut results = Self::join_in_order(leaves, leaf_count).await?;

        if cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut nested = JoinSet::new();
        let group_count = groups.len();
        for (index, mut group) in groups.into_iter().enumerate() {
            nested.spawn(async move { (index, group.execute().await) });
        }
        for values in Self::join_in_order(nested, group_count).await? {
            results.extend(values);
        }
        Ok(results)
    }

    /// Waits for every task, then returns results by spawn index. The first
    /// failure by index wins.
    async fn join_in_order<T: Send + 'static>(
        mut set: JoinSet<(usize, EngineResult<T>)>,
        len: usize,
    ) -> EngineResult<Vec<T>> {
        let mut slots: Vec<Option<EngineResult<T>>> = (0..len).map(|_| None).collect();
        let mut join_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    join_error.get_or_insert(EngineError::Join(e.to_string()));
                }
            }
        }
        if let Some(e) = join_error {
            return Err(e);
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(EngineError::Join("task produced no result".to_string())))
            })
            .collect()
    }
}
