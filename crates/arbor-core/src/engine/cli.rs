//! Dynamic CLI generation from the command tree.
//!
//! Builds a clap command with one subcommand per tree node, then matches
//! argv against it. Parsing never fails outright: problems are reported as
//! [`ParseError`]s with the canonical messages the invocation validator
//! expects, next to whatever could be matched.

use super::ast::{CommandNode, CommandTree, NodeId, OptionSpec, OptionType, Value};
use super::error::ValidationError;
use super::params::Bindings;
use super::validator::ParseError;
use crate::constants::{
    APP_NAME, FLAG_CONFIG, FLAG_DRY_RUN, FLAG_VERBOSE, RESERVED_SHORT_OPTIONS, SHORT_CONFIG,
    SHORT_VERBOSE,
};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};
use std::ffi::OsString;
use std::path::PathBuf;

const BOOL_TRUE: &str = "true";
const BOOL_FALSE: &str = "false";

fn argument_id(name: &str) -> String {
    format!("arg:{}", name)
}

fn option_id(name: &str) -> String {
    format!("opt:{}", name)
}

/// Flags accepted at any level of the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    pub verbose: bool,
    pub dry_run: bool,
    pub config: Option<PathBuf>,
}

/// Everything recovered from one command line.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Deepest command that was matched; the root if none was.
    pub node: NodeId,
    pub bindings: Bindings,
    pub errors: Vec<ParseError>,
    /// Tokens supplied after the program name.
    pub token_count: usize,
    pub flags: GlobalFlags,
}

#[derive(Debug, Clone)]
pub enum Invocation {
    Run(ParseOutcome),
    /// `--help` or `--version` was requested; the text is ready to print.
    Display(String),
}

/// Generates a CLI interface from a command tree.
pub struct CliGenerator<'a> {
    tree: &'a CommandTree,
}

impl<'a> CliGenerator<'a> {
    pub fn new(tree: &'a CommandTree) -> Self {
        Self { tree }
    }

    pub fn build_cli(&self) -> ClapCommand {
        let root = self.tree.node(self.tree.root());
        let mut app = Self::create_base_cli(&root.description);
        app = Self::add_arguments(app, root);
        for &child in root.children() {
            app = app.subcommand(self.command_to_clap(child));
        }
        app
    }

    fn create_base_cli(about: &str) -> ClapCommand {
        ClapCommand::new(APP_NAME)
            .about(about.to_string())
            .version(env!("CARGO_PKG_VERSION"))
            .disable_help_subcommand(true)
            .arg(
                Arg::new(FLAG_VERBOSE)
                    .long(FLAG_VERBOSE)
                    .short(SHORT_VERBOSE)
                    .action(ArgAction::SetTrue)
                    .global(true)
                    .help("Enable verbose logging"),
            )
            .arg(
                Arg::new(FLAG_CONFIG)
                    .long(FLAG_CONFIG)
                    .short(SHORT_CONFIG)
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .global(true)
                    .help("Path to the command tree document"),
            )
            .arg(
                Arg::new(FLAG_DRY_RUN)
                    .long(FLAG_DRY_RUN)
                    .action(ArgAction::SetTrue)
                    .global(true)
                    .help("Show the execution plan without running it"),
            )
    }

    fn command_to_clap(&self, id: NodeId) -> ClapCommand {
        let node = self.tree.node(id);
        let mut subcmd = ClapCommand::new(node.name.clone());
        if !node.description.is_empty() {
            subcmd = subcmd.about(node.description.clone());
        }
        subcmd = Self::add_arguments(subcmd, node);
        for &child in node.children() {
            subcmd = subcmd.subcommand(self.command_to_clap(child));
        }
        subcmd
    }

    fn add_arguments(mut cmd: ClapCommand, node: &CommandNode) -> ClapCommand {
        for (index, argument) in node.arguments.iter().enumerate() {
            let mut arg = Arg::new(argument_id(&argument.name))
                .index(index + 1)
                .required(false)
                .value_name(argument.name.to_uppercase());
            if !argument.description.is_empty() {
                arg = arg.help(argument.description.clone());
            }
            cmd = cmd.arg(arg);
        }
        for option in &node.options {
            cmd = cmd.arg(Self::option_to_arg(option, Self::short_for(option, &node.options)));
        }
        cmd
    }

    /// First letter of the option name, if no sibling option or global flag
    /// already starts with it.
    fn short_for(option: &OptionSpec, siblings: &[OptionSpec]) -> Option<char> {
        let first = option.name.chars().next().filter(char::is_ascii_alphanumeric)?;
        let shared = siblings
            .iter()
            .filter(|other| other.name.chars().next() == Some(first))
            .count();
        if shared == 1 && !RESERVED_SHORT_OPTIONS.contains(&first) {
            Some(first)
        } else {
            None
        }
    }

    fn option_to_arg(option: &OptionSpec, short: Option<char>) -> Arg {
        let mut arg = Arg::new(option_id(&option.name))
            .long(option.name.clone())
            .required(option.required);
        if let Some(short) = short {
            arg = arg.short(short);
        }
        if !option.description.is_empty() {
            arg = arg.help(option.description.clone());
        }
        match option.value_type {
            // `--flag` alone means true; `--flag false` is also accepted.
            OptionType::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_missing_value(BOOL_TRUE)
                .value_parser([BOOL_TRUE, BOOL_FALSE]),
            OptionType::Number => arg
                .value_name(option.name.to_uppercase())
                .value_parser(parse_number),
            OptionType::String => arg.value_name(option.name.to_uppercase()),
        }
    }

    /// Matches `argv` (program name first) against the tree.
    pub fn parse<I, T>(&self, argv: I) -> Invocation
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let token_count = argv.len().saturating_sub(1);

        let matches = match self.build_cli().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => {
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                    return Invocation::Display(err.render().to_string());
                }
                return Invocation::Run(ParseOutcome {
                    node: self.tree.root(),
                    bindings: Bindings::new(),
                    errors: vec![parse_error_from_clap(&err)],
                    token_count,
                    flags: GlobalFlags::default(),
                });
            }
        };

        let mut errors = Vec::new();
        let mut bindings = Bindings::new();
        let mut node = self.tree.root();
        let mut current = &matches;
        self.bind(node, current, &mut bindings);

        while let Some((name, sub_matches)) = current.subcommand() {
            match self.tree.find_child(node, name) {
                Some(child) => {
                    node = child;
                    current = sub_matches;
                    self.bind(node, current, &mut bindings);
                }
                None => {
                    errors.push(ParseError::new(ValidationError::unrecognized(name).message));
                    break;
                }
            }
        }

        if !self.tree.node(node).is_leaf() {
            errors.push(ParseError::required_command());
        }

        Invocation::Run(ParseOutcome {
            node,
            bindings,
            errors,
            token_count,
            flags: Self::global_flags(current),
        })
    }

    fn bind(&self, id: NodeId, matches: &ArgMatches, bindings: &mut Bindings) {
        let node = self.tree.node(id);
        for argument in &node.arguments {
            if let Ok(Some(value)) = matches.try_get_one::<String>(&argument_id(&argument.name)) {
                bindings.bind_argument(id, argument.name.clone(), Value::String(value.clone()));
            }
        }
        for option in &node.options {
            let arg_id = option_id(&option.name);
            if matches.value_source(&arg_id) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = match option.value_type {
                OptionType::Bool => matches
                    .try_get_one::<String>(&arg_id)
                    .ok()
                    .flatten()
                    .map(|v| Value::Bool(v == BOOL_TRUE)),
                OptionType::Number => matches
                    .try_get_one::<Value>(&arg_id)
                    .ok()
                    .flatten()
                    .cloned(),
                OptionType::String => matches
                    .try_get_one::<String>(&arg_id)
                    .ok()
                    .flatten()
                    .map(|v| Value::String(v.clone())),
            };
            if let Some(value) = value {
                bindings.bind_option(id, option.name.clone(), value);
            }
        }
    }

    fn global_flags(matches: &ArgMatches) -> GlobalFlags {
        let flag = |id: &str| {
            matches
                .try_get_one::<bool>(id)
                .ok()
                .flatten()
                .copied()
                .unwrap_or(false)
        };
        GlobalFlags {
            verbose: flag(FLAG_VERBOSE),
            dry_run: flag(FLAG_DRY_RUN),
            config: matches
                .try_get_one::<PathBuf>(FLAG_CONFIG)
                .ok()
                .flatten()
                .cloned(),
        }
    }
}

/// Integers stay exact; anything else numeric is read as a float.
fn parse_number(raw: &str) -> Result<Value, String> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Integer(n));
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Value::Number(n)),
        _ => Err(format!("'{}' is not a number", raw)),
    }
}

fn context_text(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind)? {
        ContextValue::String(s) => Some(s.clone()),
        ContextValue::Strings(values) => values.first().cloned(),
        _ => None,
    }
}

/// Maps a clap error onto the message the validator reports.
fn parse_error_from_clap(err: &clap::Error) -> ParseError {
    match err.kind() {
        ErrorKind::InvalidSubcommand => {
            if let Some(token) = context_text(err, ContextKind::InvalidSubcommand) {
                return ParseError::new(ValidationError::unrecognized(&token).message);
            }
        }
        ErrorKind::UnknownArgument => {
            if let Some(token) = context_text(err, ContextKind::InvalidArg) {
                return ParseError::new(ValidationError::unrecognized(&token).message);
            }
        }
        ErrorKind::MissingRequiredArgument => {
            if let Some(rendered) = context_text(err, ContextKind::InvalidArg) {
                let name = rendered.split_whitespace().next().unwrap_or(&rendered);
                let what = if name.starts_with('-') { "Option" } else { "Argument" };
                return ParseError::new(format!("{} '{}' is required.", what, name));
            }
        }
        ErrorKind::MissingSubcommand => return ParseError::required_command(),
        _ => {}
    }

    let rendered = err.render().to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    ParseError::new(first_line.trim_start_matches("error: ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ast::CommandBuilder;
    use crate::engine::params::BoundValues;

    fn tree() -> CommandTree {
        CommandBuilder::root("Project tasks")
            .child(
                CommandBuilder::new("greet")
                    .executor("format")
                    .argument("name", "Who to greet")
                    .option(OptionSpec {
                        name: "loud".to_string(),
                        description: "Shout".to_string(),
                        required: false,
                        value_type: OptionType::Bool,
                    })
                    .option(OptionSpec {
                        name: "times".to_string(),
                        description: String::new(),
                        required: false,
                        value_type: OptionType::Number,
                    }),
            )
            .child(
                CommandBuilder::new("deploy")
                    .child(CommandBuilder::new("prod").option(OptionSpec {
                        name: "region".to_string(),
                        description: String::new(),
                        required: true,
                        value_type: OptionType::String,
                    })),
            )
            .build()
            .unwrap()
    }

    fn run(tree: &CommandTree, args: &[&str]) -> ParseOutcome {
        let argv = std::iter::once("arbor").chain(args.iter().copied());
        match CliGenerator::new(tree).parse(argv) {
            Invocation::Run(outcome) => outcome,
            Invocation::Display(text) => panic!("unexpected display: {}", text),
        }
    }

    fn messages(outcome: &ParseOutcome) -> Vec<&str> {
        outcome.errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_leaf_with_bindings() {
        let tree = tree();
        let outcome = run(&tree, &["greet", "World", "--loud", "-t", "2"]);
        let greet = tree.find_path(&["greet"]).unwrap();

        assert_eq!(outcome.node, greet);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.token_count, 5);
        assert_eq!(outcome.bindings.argument(greet, "name"), Some(&Value::from("World")));
        assert_eq!(outcome.bindings.option(greet, "loud"), Some(&Value::Bool(true)));
        assert_eq!(outcome.bindings.option(greet, "times"), Some(&Value::Integer(2)));

        let outcome = run(&tree, &["greet", "--times", "0.5"]);
        assert_eq!(outcome.bindings.option(greet, "times"), Some(&Value::Number(0.5)));
    }

    #[test]
    fn test_absent_values_are_unbound() {
        let tree = tree();
        let outcome = run(&tree, &["greet"]);
        let greet = tree.find_path(&["greet"]).unwrap();
        assert!(outcome.bindings.argument(greet, "name").is_none());
        assert!(outcome.bindings.option(greet, "loud").is_none());
    }

    #[test]
    fn test_explicit_false_flag() {
        let tree = tree();
        let outcome = run(&tree, &["greet", "--loud", "false"]);
        let greet = tree.find_path(&["greet"]).unwrap();
        assert_eq!(outcome.bindings.option(greet, "loud"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_unknown_subcommand() {
        let outcome = run(&tree(), &["xyz"]);
        assert_eq!(messages(&outcome), vec!["Unrecognized command or argument 'xyz'."]);
    }

    #[test]
    fn test_unexpected_token_on_leaf() {
        let tree = CommandBuilder::root("r")
            .child(CommandBuilder::new("clean"))
            .build()
            .unwrap();
        let outcome = run(&tree, &["clean", "xyz"]);
        assert_eq!(messages(&outcome), vec!["Unrecognized command or argument 'xyz'."]);
    }

    #[test]
    fn test_no_tokens_requires_command() {
        let outcome = run(&tree(), &[]);
        assert_eq!(outcome.token_count, 0);
        assert_eq!(outcome.node, NodeId::ROOT);
        assert_eq!(messages(&outcome), vec!["Required command was not provided."]);
    }

    #[test]
    fn test_internal_node_requires_command() {
        let tree = tree();
        let outcome = run(&tree, &["deploy", "--verbose"]);
        assert_eq!(outcome.node, tree.find_path(&["deploy"]).unwrap());
        assert_eq!(messages(&outcome), vec!["Required command was not provided."]);
        assert!(outcome.flags.verbose);
    }

    #[test]
    fn test_missing_required_option() {
        let outcome = run(&tree(), &["deploy", "prod"]);
        assert_eq!(messages(&outcome), vec!["Option '--region' is required."]);
    }

    #[test]
    fn test_global_flags_anywhere() {
        let tree = tree();
        let outcome = run(&tree, &["-c", "tasks.yaml", "greet", "--dry-run"]);
        assert!(outcome.errors.is_empty());
        assert!(outcome.flags.dry_run);
        assert!(!outcome.flags.verbose);
        assert_eq!(outcome.flags.config, Some(PathBuf::from("tasks.yaml")));
    }

    #[test]
    fn test_help_is_displayed() {
        let tree = tree();
        match CliGenerator::new(&tree).parse(["arbor", "--help"]) {
            Invocation::Display(text) => assert!(text.contains("greet")),
            Invocation::Run(_) => panic!("expected help"),
        }
    }

    #[test]
    fn test_short_options_skip_reserved_and_shared_letters() {
        let options = vec![
            OptionSpec {
                name: "config-file".to_string(),
                description: String::new(),
                required: false,
                value_type: OptionType::String,
            },
            OptionSpec {
                name: "tag".to_string(),
                description: String::new(),
                required: false,
                value_type: OptionType::String,
            },
            OptionSpec {
                name: "target".to_string(),
                description: String::new(),
                required: false,
                value_type: OptionType::String,
            },
        ];
        assert_eq!(CliGenerator::short_for(&options[0], &options), None);
        assert_eq!(CliGenerator::short_for(&options[1], &options), None);
    }
}
