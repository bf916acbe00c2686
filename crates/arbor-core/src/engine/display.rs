//! Display utilities for execution plans, used by `arbor --dry-run`.

use super::group::ExecutionGroup;
use std::fmt::Write;

/// Renders a plan as an indented tree.
///
/// Each group shows its strategy, then its executables in run order, then its
/// nested groups.
pub fn render_plan(group: &ExecutionGroup) -> String {
    let mut output = String::new();
    render_group(group, 0, &mut output);
    output
}

fn render_group(group: &ExecutionGroup, indent: usize, output: &mut String) {
    let indent_str = "  ".repeat(indent);
    let _ = writeln!(output, "{}└─ {} ({})", indent_str, group.name(), group.strategy());
    for executable in group.executables() {
        let _ = writeln!(
            output,
            "{}    • {} [{}]",
            indent_str,
            executable.display_path(),
            executable.executor_id().unwrap_or("no executor")
        );
    }
    for nested in group.groups() {
        render_group(nested, indent + 1, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cancel::CancellationSignal;
    use crate::engine::executable::Executable;
    use crate::engine::executor::ExecutorRegistry;
    use crate::engine::group::Strategy;
    use crate::engine::params::ParameterSet;
    use std::sync::Arc;

    #[test]
    fn test_render_nested_plan() {
        let registry = Arc::new(ExecutorRegistry::new());
        let leaf = |path: &[&str], executor: Option<&str>| {
            Executable::new(
                path.iter().map(|s| s.to_string()).collect(),
                ParameterSet::new(),
                CancellationSignal::never(),
                executor.map(str::to_string),
                registry.clone(),
            )
        };

        let mut nested = ExecutionGroup::new("ci deploy", Strategy::Parallel, CancellationSignal::never());
        nested.push_executable(leaf(&["ci", "deploy", "prod"], Some("sh")));
        let mut root = ExecutionGroup::new("ci", Strategy::Sequential, CancellationSignal::never());
        root.push_executable(leaf(&["ci", "lint"], None));
        root.push_group(nested);

        let expected = "\
└─ ci (sequential)
    • ci lint [no executor]
  └─ ci deploy (parallel)
      • ci deploy prod [sh]
";
        assert_eq!(render_plan(&root), expected);
    }
}
