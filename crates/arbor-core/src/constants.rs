pub const APP_NAME: &str = "arbor";

/// Name given to the implicit root command. Never shown in command paths.
pub const ROOT_COMMAND_NAME: &str = "(root)";

pub const CONFIG_NAMES: [&str; 4] = ["arbor.yaml", "arbor.yml", "arbor.json", "Arborfile"];

// Global flags
pub const FLAG_VERBOSE: &str = "verbose";
pub const FLAG_CONFIG: &str = "config";
pub const FLAG_DRY_RUN: &str = "dry-run";
pub const SHORT_VERBOSE: char = 'v';
pub const SHORT_CONFIG: char = 'c';

/// Option names that collide with the global flags or clap's builtins.
pub const RESERVED_OPTION_NAMES: [&str; 5] =
    [FLAG_VERBOSE, FLAG_CONFIG, FLAG_DRY_RUN, "help", "version"];
pub const RESERVED_SHORT_OPTIONS: [char; 4] = [SHORT_VERBOSE, SHORT_CONFIG, 'h', 'V'];

// Parameters read by the engine itself
pub const PARAM_PARALLEL: &str = "parallel";
pub const PARAM_EXECUTABLE: &str = "executable";
pub const PARAM_COMMAND: &str = "command";
pub const PARAM_RUN: &str = "run";
pub const PARAM_CWD: &str = "cwd";
pub const PARAM_MESSAGE: &str = "message";

// Built-in executor identifiers
pub const EXECUTOR_SH: &str = "sh";
pub const EXECUTOR_BASH: &str = "bash";
pub const EXECUTOR_CMD: &str = "cmd";
pub const EXECUTOR_POWERSHELL: &str = "powershell";
pub const EXECUTOR_PWSH: &str = "pwsh";
pub const EXECUTOR_FORMAT: &str = "format";
pub const EXECUTOR_NOOP: &str = "noop";

/// Exit code reported when a subprocess could not be started.
pub const PROCESS_START_FAILURE: i32 = -1;

pub const SCRIPT_FILE_PREFIX: &str = "arbor-";

// User-facing messages
pub const MSG_REQUIRED_COMMAND: &str = "Required command was not provided.";
pub const MSG_NO_EXECUTABLE_COMMANDS: &str = "No executable commands were found.";
