//! Parameter sets and their resolution.
//!
//! A [`ParameterSet`] is a case-insensitive key/value mapping. The
//! [`ParameterResolver`] builds a fresh one for every node it is asked about,
//! merging, in increasing priority:
//!
//! 1. static parameters of every ancestor, root first
//! 2. the node's own static parameters
//! 3. bound argument values, in declared order
//! 4. bound option values, in declared order
//!
//! Unbound (absent) arguments and options are skipped, so they never erase
//! an inherited value.

use super::ast::{CommandTree, NodeId, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Case-insensitive mapping from parameter name to value.
///
/// Keys keep the spelling they were last written with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: IndexMap<String, (String, Value)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.entries.insert(key.to_lowercase(), (key, value));
    }

    pub(crate) fn merge(&mut self, other: &ParameterSet) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&key.to_lowercase()).map(|(_, value)| value)
    }

    /// Reads a boolean parameter. Non-boolean values read as `None`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Source of the values bound on the command line for a node.
pub trait BoundValues {
    fn argument(&self, node: NodeId, name: &str) -> Option<&Value>;
    fn option(&self, node: NodeId, name: &str) -> Option<&Value>;
}

#[derive(Debug, Clone, Default)]
struct NodeBindings {
    arguments: HashMap<String, Value>,
    options: HashMap<String, Value>,
}

/// Values bound on the command line, grouped by the node that declared them.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    nodes: HashMap<NodeId, NodeBindings>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_argument(&mut self, node: NodeId, name: impl Into<String>, value: Value) {
        self.nodes
            .entry(node)
            .or_default()
            .arguments
            .insert(name.into(), value);
    }

    pub fn bind_option(&mut self, node: NodeId, name: impl Into<String>, value: Value) {
        self.nodes
            .entry(node)
            .or_default()
            .options
            .insert(name.into(), value);
    }
}

impl BoundValues for Bindings {
    fn argument(&self, node: NodeId, name: &str) -> Option<&Value> {
        self.nodes.get(&node)?.arguments.get(name)
    }

    fn option(&self, node: NodeId, name: &str) -> Option<&Value> {
        self.nodes.get(&node)?.options.get(name)
    }
}

/// Computes the effective parameters of a node for one invocation.
pub struct ParameterResolver<'a> {
    tree: &'a CommandTree,
    bindings: &'a dyn BoundValues,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(tree: &'a CommandTree, bindings: &'a dyn BoundValues) -> Self {
        Self { tree, bindings }
    }

    pub fn resolve(&self, node: NodeId) -> ParameterSet {
        let mut resolved = ParameterSet::new();

        for ancestor in self.tree.ancestors(node) {
            resolved.merge(&self.tree.node(ancestor).parameters);
        }

        let command = self.tree.node(node);
        resolved.merge(&command.parameters);

        for argument in &command.arguments {
            if let Some(value) = self.bindings.argument(node, &argument.name) {
                resolved.insert(argument.name.clone(), value.clone());
            }
        }
        for option in &command.options {
            if let Some(value) = self.bindings.option(node, &option.name) {
                resolved.insert(option.name.clone(), value.clone());
            }
        }

        resolved
    }
}
