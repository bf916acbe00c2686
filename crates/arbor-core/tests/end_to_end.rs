use arbor_core::engine::ast::{CommandTree, Value};
use arbor_core::engine::cancel::{CancellationSignal, CancellationSource};
use arbor_core::engine::cli::{CliGenerator, Invocation, ParseOutcome};
use arbor_core::engine::config::{parse_document, DocumentFormat};
use arbor_core::engine::display::render_plan;
use arbor_core::engine::error::{EngineError, EngineResult};
use arbor_core::engine::executor::{ExecutionContext, ExecutionValue, Executor, ExecutorRegistry};
use arbor_core::engine::runtime::Runtime;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sleeps for `delay` milliseconds, then logs and returns the command path.
struct Sleeper {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Executor for Sleeper {
    async fn execute(&self, context: &ExecutionContext<'_>) -> EngineResult<ExecutionValue> {
        if let Some(ms) = context.parameters.get("delay").and_then(Value::as_f64) {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
        let path = context.display_path();
        self.log.lock().unwrap().push(path.clone());
        Ok(ExecutionValue::Text(path))
    }
}

fn runtime_with_sleeper(document: &str) -> (Runtime, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ExecutorRegistry::with_defaults();
    let shared = log.clone();
    registry.register("sleep", move || {
        Box::new(Sleeper {
            log: shared.clone(),
        })
    });
    (Runtime::new(tree(document), registry), log)
}

fn tree(document: &str) -> CommandTree {
    parse_document(document, DocumentFormat::Yaml).unwrap()
}

fn parse(runtime: &Runtime, args: &[&str]) -> ParseOutcome {
    let argv = std::iter::once("arbor").chain(args.iter().copied());
    match CliGenerator::new(runtime.tree()).parse(argv) {
        Invocation::Run(outcome) => outcome,
        Invocation::Display(text) => panic!("unexpected display output: {}", text),
    }
}

async fn run(runtime: &Runtime, args: &[&str]) -> EngineResult<Vec<ExecutionValue>> {
    let outcome = parse(runtime, args);
    runtime.run(&outcome, CancellationSignal::never()).await
}

fn validation_message(result: EngineResult<Vec<ExecutionValue>>) -> String {
    match result {
        Err(EngineError::Validation(e)) => e.message,
        other => panic!("expected validation error, got {:?}", other),
    }
}

const GREETER: &str = r#"
description: Greeter
commands:
  - name: greet
    description: Says hello
    executor: format
    parameters:
      message: "Hello {{name}}"
    arguments:
      - name: name
        description: Who to greet
"#;

#[tokio::test]
async fn test_argument_is_interpolated_into_message() {
    let (runtime, _) = runtime_with_sleeper(GREETER);
    let results = run(&runtime, &["greet", "World"]).await.unwrap();
    assert_eq!(results, vec![ExecutionValue::Text("Hello World".to_string())]);
}

#[tokio::test]
async fn test_unknown_command_is_rejected() {
    let (runtime, log) = runtime_with_sleeper(GREETER);
    let message = validation_message(run(&runtime, &["xyz"]).await);
    assert_eq!(message, "Unrecognized command or argument 'xyz'.");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_tokens_requires_command() {
    let (runtime, _) = runtime_with_sleeper(GREETER);
    let message = validation_message(run(&runtime, &[]).await);
    assert_eq!(message, "Required command was not provided.");
}

const BUILD: &str = r#"
description: Build tool
commands:
  - name: build
    description: Builds everything
    parameters:
      parallel: true
    commands:
      - name: docs
        description: Docs
        executor: sleep
        parameters:
          executable: true
        commands:
          - name: html
            description: HTML
            executor: sleep
      - name: lib
        description: Library
        executor: sleep
        parameters:
          delay: 300
      - name: bin
        description: Binary
        executor: sleep
        parameters:
          delay: 300
  - name: deploy
    description: Not runnable as a group
    commands:
      - name: prod
        description: Production
        executor: sleep
"#;

#[tokio::test]
async fn test_internal_command_without_executable_is_rejected() {
    let (runtime, log) = runtime_with_sleeper(BUILD);
    let message = validation_message(run(&runtime, &["deploy"]).await);
    assert_eq!(message, "deploy is not executable.");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_internal_command_requires_executable_flag() {
    let (runtime, _) = runtime_with_sleeper(BUILD);
    let message = validation_message(run(&runtime, &["build"]).await);
    assert_eq!(message, "build is not executable.");
}

#[tokio::test]
async fn test_leaf_below_internal_command_runs_alone() {
    let (runtime, log) = runtime_with_sleeper(BUILD);
    let results = run(&runtime, &["deploy", "prod"]).await.unwrap();
    assert_eq!(results, vec![ExecutionValue::Text("deploy prod".to_string())]);
    assert_eq!(*log.lock().unwrap(), vec!["deploy prod".to_string()]);
}

const BUILD_EXECUTABLE: &str = r#"
description: Build tool
commands:
  - name: build
    description: Builds everything
    parameters:
      parallel: true
      executable: true
    commands:
      - name: docs
        description: Docs
        commands:
          - name: html
            description: HTML
            executor: sleep
      - name: lib
        description: Library
        executor: sleep
        parameters:
          delay: 300
      - name: bin
        description: Binary
        executor: sleep
        parameters:
          delay: 300
"#;

#[tokio::test]
async fn test_parallel_leaves_overlap_and_finish_before_subgroups() {
    let (runtime, log) = runtime_with_sleeper(BUILD_EXECUTABLE);

    let start = Instant::now();
    let results = run(&runtime, &["build"]).await.unwrap();
    let elapsed = start.elapsed();

    // Sequentially the two 300ms leaves would need 600ms.
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);

    // Results follow declaration order within each group, leaves first.
    assert_eq!(
        results,
        vec![
            ExecutionValue::Text("build lib".to_string()),
            ExecutionValue::Text("build bin".to_string()),
            ExecutionValue::Text("build docs html".to_string()),
        ]
    );
    // The nested group only starts once both leaves are done.
    let logged = log.lock().unwrap().clone();
    assert_eq!(logged.last().map(String::as_str), Some("build docs html"));
}

#[tokio::test]
async fn test_dry_run_plan_lists_every_executable() {
    let (runtime, log) = runtime_with_sleeper(BUILD_EXECUTABLE);
    let outcome = parse(&runtime, &["build", "--dry-run"]);
    assert!(outcome.flags.dry_run);

    let plan = runtime
        .plan(&outcome, CancellationSignal::never())
        .unwrap();
    let rendered = render_plan(&plan);
    assert!(rendered.contains("build (parallel)"));
    assert!(rendered.contains("build lib [sleep]"));
    assert!(rendered.contains("build docs html [sleep]"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_option_overrides_inherited_parameter() {
    let document = r#"
description: Tool
parameters:
  target: debug
commands:
  - name: show
    description: Shows the target
    executor: format
    parameters:
      message: "target={{target}}"
    options:
      - name: target
        description: Build target
"#;
    let (runtime, _) = runtime_with_sleeper(document);

    let inherited = run(&runtime, &["show"]).await.unwrap();
    assert_eq!(inherited, vec![ExecutionValue::Text("target=debug".to_string())]);

    let overridden = run(&runtime, &["show", "--target", "release"]).await.unwrap();
    assert_eq!(overridden, vec![ExecutionValue::Text("target=release".to_string())]);
}

#[tokio::test]
async fn test_cancelled_run_stops_before_starting() {
    let (runtime, log) = runtime_with_sleeper(BUILD_EXECUTABLE);
    let source = CancellationSource::new();
    source.cancel();

    let outcome = parse(&runtime, &["build"]);
    let result = runtime.run(&outcome, source.signal()).await;
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(log.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_shell_command_exit_code_is_returned() {
    let document = r#"
description: Tool
commands:
  - name: fail
    description: Exits with 3
    executor: sh
    parameters:
      command: "exit {{code}}"
      code: 3
"#;
    let (runtime, _) = runtime_with_sleeper(document);
    let results = run(&runtime, &["fail"]).await.unwrap();
    assert_eq!(results, vec![ExecutionValue::ExitCode(3)]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_parallel_siblings_with_similar_names_run_their_own_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let document = format!(
        r#"
description: Tool
commands:
  - name: all
    description: Runs both
    parameters:
      executable: true
      parallel: true
      cwd: "{}"
    commands:
      - name: "x y"
        description: Spaced
        executor: sh
        parameters:
          command: "echo one > a.txt"
      - name: "x_y"
        description: Underscored
        executor: sh
        parameters:
          command: "echo two > b.txt"
"#,
        dir.path().display()
    );
    let (runtime, _) = runtime_with_sleeper(&document);

    let results = run(&runtime, &["all"]).await.unwrap();
    assert_eq!(
        results,
        vec![ExecutionValue::ExitCode(0), ExecutionValue::ExitCode(0)]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "one\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "two\n"
    );
}
