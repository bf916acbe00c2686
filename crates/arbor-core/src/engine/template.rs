//! Template processing for parameter substitution.
//!
//! Placeholders use mustache syntax: `{{name}}`, with optional whitespace
//! inside the braces (`{{ name }}`). Names are looked up case-insensitively
//! in a [`ParameterSet`]; unknown names render as an empty string.

use super::params::ParameterSet;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Processes templates by replacing placeholders with parameter values.
pub struct TemplateProcessor;

impl TemplateProcessor {
    /// # Example
    ///
    /// ```rust
    /// use arbor_core::engine::ast::Value;
    /// use arbor_core::engine::params::ParameterSet;
    /// use arbor_core::engine::template::TemplateProcessor;
    /// let params: ParameterSet = vec![("name", Value::from("World"))].into_iter().collect();
    /// assert_eq!(TemplateProcessor::process("Hello {{name}}", &params), "Hello World");
    /// ```
    pub fn process(template: &str, parameters: &ParameterSet) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures| {
                parameters
                    .get(&caps[1])
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .into_owned()
    }

    /// Names referenced by a template, in order of first appearance.
    pub fn placeholders(template: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in placeholder_pattern().captures_iter(template) {
            let name = caps[1].to_string();
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
        names
    }
}
