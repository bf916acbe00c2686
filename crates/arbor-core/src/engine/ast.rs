//! The command tree.
//!
//! Commands are declared through [`CommandBuilder`] and frozen into a
//! [`CommandTree`]. Nodes live in a flat arena; children are referenced by
//! [`NodeId`] and each node keeps a non-owning parent index that is only used
//! to rebuild paths and ancestor chains.

use super::error::{EngineError, EngineResult};
use super::params::ParameterSet;
use crate::constants::{RESERVED_OPTION_NAMES, ROOT_COMMAND_NAME};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A scalar value held by parameters and bound command-line values.
///
/// Variant order matters for untagged deserialization: booleans, then
/// integers, then floats must be tried before falling back to strings.
///
/// Integral literals are kept exactly as [`Value::Integer`]. Anything else
/// numeric is a float, so `3.10` in a document reads back as `3.1`; quote it
/// to keep the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl Value {
    /// Reads the value as a boolean. Strings `"true"` and `"false"` are
    /// accepted regardless of case.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

/// A positional argument declared on a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
}

/// How an option's value is read from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionType {
    #[default]
    String,
    /// A flag: present means `true`.
    Bool,
    Number,
}

impl OptionType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "str" | "string" => Some(OptionType::String),
            "bool" | "boolean" | "flag" => Some(OptionType::Bool),
            "num" | "number" | "int" | "float" => Some(OptionType::Number),
            _ => None,
        }
    }
}

/// A named option declared on a command.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub value_type: OptionType,
}

/// Index of a node inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// One entry in the command tree.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub description: String,
    pub executor: Option<String>,
    pub parameters: ParameterSet,
    pub arguments: Vec<ArgumentSpec>,
    pub options: Vec<OptionSpec>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl CommandNode {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An immutable hierarchy of commands with exactly one root.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl CommandTree {
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).name == name)
    }

    /// Follows a sequence of command names from the root.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        path.iter().try_fold(self.root(), |current, segment| {
            self.find_child(current, segment.as_ref())
        })
    }

    /// Ancestors of `id`, ordered from the root down to the nearest parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).parent;
        }
        chain.reverse();
        chain
    }

    /// User-visible path segments; the root itself contributes nothing.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut segments: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .filter(|ancestor| *ancestor != NodeId::ROOT)
            .map(|ancestor| self.node(ancestor).name.clone())
            .collect();
        if id != NodeId::ROOT {
            segments.push(self.node(id).name.clone());
        }
        segments
    }

    pub fn display_path(&self, id: NodeId) -> String {
        self.path(id).join(" ")
    }
}

/// Declares a command and its subtree before the tree is frozen.
///
/// # Example
///
/// ```rust
/// use arbor_core::engine::ast::CommandBuilder;
/// let tree = CommandBuilder::root("Project tasks")
///     .child(
///         CommandBuilder::new("greet")
///             .executor("format")
///             .parameter("message", "Hello {{name}}")
///             .argument("name", "Who to greet"),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(tree.display_path(tree.find_path(&["greet"]).unwrap()), "greet");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    name: String,
    description: String,
    executor: Option<String>,
    parameters: Vec<(String, Value)>,
    arguments: Vec<ArgumentSpec>,
    options: Vec<OptionSpec>,
    children: Vec<CommandBuilder>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn root(description: impl Into<String>) -> Self {
        Self {
            name: ROOT_COMMAND_NAME.to_string(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn argument(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.arguments.push(ArgumentSpec {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn child(mut self, child: CommandBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Freezes this builder as the root of a new tree.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if a non-root command has no name,
    /// two siblings share a name (case-insensitively), or an option uses a
    /// reserved name.
    pub fn build(self) -> EngineResult<CommandTree> {
        let mut nodes = Vec::new();
        Self::freeze(self, None, &mut nodes)?;
        Ok(CommandTree { nodes })
    }

    fn freeze(
        builder: CommandBuilder,
        parent: Option<NodeId>,
        nodes: &mut Vec<CommandNode>,
    ) -> EngineResult<NodeId> {
        let id = NodeId(nodes.len());
        if parent.is_some() && builder.name.trim().is_empty() {
            return Err(EngineError::Config(
                "Every command except the root requires a name.".to_string(),
            ));
        }
        for option in &builder.options {
            if RESERVED_OPTION_NAMES
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(&option.name))
            {
                return Err(EngineError::Config(format!(
                    "Option '--{}' on '{}' is reserved.",
                    option.name, builder.name
                )));
            }
        }

        // Parameter keys are case-insensitive, so declared names must be too.
        let mut declared = HashSet::new();
        for argument in &builder.arguments {
            if !declared.insert(argument.name.to_lowercase()) {
                return Err(EngineError::Config(format!(
                    "Duplicate argument '{}' on '{}'.",
                    argument.name, builder.name
                )));
            }
        }
        declared.clear();
        for option in &builder.options {
            if !declared.insert(option.name.to_lowercase()) {
                return Err(EngineError::Config(format!(
                    "Duplicate option '--{}' on '{}'.",
                    option.name, builder.name
                )));
            }
        }

        nodes.push(CommandNode {
            name: builder.name,
            description: builder.description,
            executor: builder.executor,
            parameters: builder.parameters.into_iter().collect(),
            arguments: builder.arguments,
            options: builder.options,
            children: Vec::new(),
            parent,
        });

        let mut seen = HashSet::new();
        let mut children = Vec::with_capacity(builder.children.len());
        for child in builder.children {
            if !seen.insert(child.name.to_lowercase()) {
                return Err(EngineError::Config(format!(
                    "Duplicate command '{}' under '{}'.",
                    child.name, nodes[id.0].name
                )));
            }
            children.push(Self::freeze(child, Some(id), nodes)?);
        }
        nodes[id.0].children = children;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> CommandTree {
        CommandBuilder::root("root")
            .child(
                CommandBuilder::new("ci")
                    .child(CommandBuilder::new("lint"))
                    .child(CommandBuilder::new("deploy").child(CommandBuilder::new("prod"))),
            )
            .child(CommandBuilder::new("clean"))
            .build()
            .expect("tree should build")
    }

    #[test]
    fn test_paths_exclude_root() {
        let tree = sample_tree();
        let prod = tree.find_path(&["ci", "deploy", "prod"]).unwrap();
        assert_eq!(tree.path(prod), vec!["ci", "deploy", "prod"]);
        assert_eq!(tree.display_path(prod), "ci deploy prod");
        assert!(tree.path(tree.root()).is_empty());
    }

    #[test]
    fn test_ancestors_are_root_first() {
        let tree = sample_tree();
        let prod = tree.find_path(&["ci", "deploy", "prod"]).unwrap();
        let names: Vec<&str> = tree
            .ancestors(prod)
            .into_iter()
            .map(|id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec![ROOT_COMMAND_NAME, "ci", "deploy"]);
    }

    #[test]
    fn test_children_keep_declaration_order() {
        let tree = sample_tree();
        let ci = tree.find_path(&["ci"]).unwrap();
        let names: Vec<&str> = tree
            .node(ci)
            .children()
            .iter()
            .map(|id| tree.node(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["lint", "deploy"]);
        assert!(!tree.node(ci).is_leaf());
        assert!(tree.node(tree.find_path(&["clean"]).unwrap()).is_leaf());
    }

    #[test]
    fn test_duplicate_siblings_rejected() {
        let result = CommandBuilder::root("root")
            .child(CommandBuilder::new("build"))
            .child(CommandBuilder::new("Build"))
            .build();
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("Duplicate command")));
    }

    #[test]
    fn test_reserved_option_rejected() {
        let result = CommandBuilder::root("root")
            .child(CommandBuilder::new("build").option(OptionSpec {
                name: "verbose".to_string(),
                description: String::new(),
                required: false,
                value_type: OptionType::Bool,
            }))
            .build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_duplicate_arguments_rejected() {
        let result = CommandBuilder::root("root")
            .child(
                CommandBuilder::new("show")
                    .argument("x", "first")
                    .argument("X", "second"),
            )
            .build();
        assert!(
            matches!(result, Err(EngineError::Config(msg)) if msg == "Duplicate argument 'X' on 'show'.")
        );
    }

    #[test]
    fn test_duplicate_options_rejected() {
        let option = OptionSpec {
            name: "target".to_string(),
            description: String::new(),
            required: false,
            value_type: OptionType::String,
        };
        let result = CommandBuilder::root("root")
            .child(
                CommandBuilder::new("show")
                    .option(option.clone())
                    .option(option),
            )
            .build();
        assert!(
            matches!(result, Err(EngineError::Config(msg)) if msg == "Duplicate option '--target' on 'show'.")
        );
    }

    #[test]
    fn test_argument_and_option_may_share_a_name() {
        let tree = CommandBuilder::root("root")
            .child(
                CommandBuilder::new("show")
                    .argument("target", "positional")
                    .option(OptionSpec {
                        name: "target".to_string(),
                        description: String::new(),
                        required: false,
                        value_type: OptionType::String,
                    }),
            )
            .build();
        assert!(tree.is_ok());
    }

    #[test]
    fn test_value_display_and_bool() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Integer(9_007_199_254_740_993).to_string(), "9007199254740993");
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::from("4").as_f64(), None);
        assert_eq!(Value::from("TRUE").as_bool(), Some(true));
        assert_eq!(Value::from("yes").as_bool(), None);
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
    }
}
