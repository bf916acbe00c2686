//! Command tree documents.
//!
//! Maps a YAML or JSON document onto a [`CommandTree`]:
//!
//! ```yaml
//! description: Project tasks
//! parameters:
//!   env: dev
//! commands:
//!   - name: greet
//!     executor: format
//!     parameters:
//!       message: "Hello {{name}}"
//!     arguments:
//!       - name: name
//!         description: Who to greet
//! ```

use super::ast::{CommandBuilder, CommandTree, OptionSpec, OptionType, Value};
use super::error::{EngineError, EngineResult};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Serialization format of a command tree document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    executor: Option<String>,
    #[serde(default)]
    parameters: IndexMap<String, Option<Value>>,
    #[serde(default)]
    arguments: Vec<ArgumentDocument>,
    #[serde(default)]
    options: Vec<OptionDocument>,
    #[serde(default)]
    commands: Vec<CommandDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArgumentDocument {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionDocument {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
    #[serde(default, rename = "type")]
    value_type: Option<String>,
}

impl CommandDocument {
    fn into_builder(self, builder: CommandBuilder) -> EngineResult<CommandBuilder> {
        let label = builder_label(&self.name);
        let mut builder = builder.description(self.description.unwrap_or_default());
        if let Some(executor) = self.executor {
            builder = builder.executor(executor);
        }
        // Null values are dropped rather than stored.
        for (key, value) in self.parameters {
            if let Some(value) = value {
                builder = builder.parameter(key, value);
            }
        }
        for argument in self.arguments {
            builder = builder.argument(argument.name, argument.description);
        }
        for option in self.options {
            let value_type = match option.value_type.as_deref() {
                None => OptionType::default(),
                Some(name) => OptionType::parse(name).ok_or_else(|| {
                    EngineError::Config(format!(
                        "Unknown type '{}' for option '--{}' on '{}'.",
                        name, option.name, label
                    ))
                })?,
            };
            builder = builder.option(OptionSpec {
                name: option.name,
                description: option.description,
                required: option.required,
                value_type,
            });
        }
        for child in self.commands {
            let child_builder = CommandBuilder::new(child.name.clone().unwrap_or_default());
            builder = builder.child(child.into_builder(child_builder)?);
        }
        Ok(builder)
    }
}

fn builder_label(name: &Option<String>) -> String {
    name.clone().unwrap_or_else(|| "root".to_string())
}

/// Parses a command tree document.
///
/// # Errors
///
/// Returns [`EngineError::Config`] for malformed documents, a root without a
/// description, or any structural problem reported by the tree builder.
pub fn parse_document(content: &str, format: DocumentFormat) -> EngineResult<CommandTree> {
    let document: CommandDocument = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Invalid command document: {}", e)))?,
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| EngineError::Config(format!("Invalid command document: {}", e)))?,
    };

    let description = match document.description.as_deref() {
        Some(description) if !description.trim().is_empty() => description.to_string(),
        _ => {
            return Err(EngineError::Config(
                "Root command requires a description.".to_string(),
            ))
        }
    };

    document
        .into_builder(CommandBuilder::root(description))?
        .build()
}

/// Reads and parses a command tree document from disk.
pub fn load_document(path: &Path) -> EngineResult<CommandTree> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_document(&content, DocumentFormat::from_path(path))
}
