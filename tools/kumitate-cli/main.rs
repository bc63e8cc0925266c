use clap::{Args, Parser, Subcommand, ValueEnum};
use kumitate::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::time::Instant;

/// Compiles workflow templates into executable documents and DAGs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one compiler stage
    Compile {
        #[command(subcommand)]
        stage: Stage,
    },
}

#[derive(Subcommand, Debug)]
enum Stage {
    /// Template JSON + context -> Executable JSON
    Template(TemplateArgs),
    /// Executable JSON -> DAG JSON
    Dag(DagArgs),
}

#[derive(Args, Debug)]
struct TemplateArgs {
    /// Path to the template JSON file
    #[arg(long = "in")]
    input: String,
    /// Where to write the executable JSON
    #[arg(long)]
    out: String,
    #[arg(long)]
    catalog: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    connections: Option<String>,
    #[arg(long)]
    answers: Option<String>,
    #[arg(long)]
    defaults: Option<String>,
    /// Where to write the diagnostics JSON
    #[arg(long)]
    diagnostics: Option<String>,
}

#[derive(Args, Debug)]
struct DagArgs {
    /// Path to the executable JSON file
    #[arg(long = "in")]
    input: String,
    /// Where to write the DAG JSON
    #[arg(long)]
    out: String,
    /// Catalog used for node icons and labels
    #[arg(long)]
    catalog: Option<String>,
    #[arg(long, value_enum)]
    layout: Option<LayoutCli>,
    /// JSON object of dot-path UI keys applied where unset
    #[arg(long = "ui-defaults")]
    ui_defaults: Option<String>,
    /// Where to write the diagnostics JSON
    #[arg(long)]
    diagnostics: Option<String>,
}

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutCli {
    Dagre,
    Elk,
    Manual,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Command::Compile { stage } = cli.command;
    let succeeded = match stage {
        Stage::Template(args) => run_template(args),
        Stage::Dag(args) => run_dag(args),
    };
    if !succeeded {
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn run_template(args: TemplateArgs) -> bool {
    let template: Value = load_or_exit(&args.input);
    let catalog: Catalog = load_optional(args.catalog.as_deref());
    let connections: Connections = load_optional(args.connections.as_deref());
    let answers: Map<String, Value> = load_optional(args.answers.as_deref());
    let defaults: Policies = load_optional(args.defaults.as_deref());

    let mut builder = CompileContext::builder(catalog)
        .connections(connections)
        .answers(answers)
        .defaults(defaults);
    if let Some(path) = args.user.as_deref() {
        builder = builder.user(load_or_exit::<UserInfo>(path));
    }
    let context = builder.build();

    let start = Instant::now();
    let mut materializer = TemplateMaterializer::builder().build();
    let outcome = materializer.compile(&template, &context);
    let elapsed = start.elapsed();

    finish(outcome, &args.out, args.diagnostics.as_deref(), elapsed)
}

fn run_dag(args: DagArgs) -> bool {
    let executable: Value = load_or_exit(&args.input);

    let layout = match args.layout.unwrap_or(LayoutCli::Dagre) {
        LayoutCli::Dagre => LayoutKind::Dagre,
        LayoutCli::Elk => LayoutKind::Elk,
        LayoutCli::Manual => LayoutKind::Manual,
    };
    let mut builder = GraphLowerer::builder().with_layout(layout);
    if let Some(path) = args.catalog.as_deref() {
        builder = builder.with_catalog(&load_or_exit::<Catalog>(path));
    }
    if let Some(path) = args.ui_defaults.as_deref() {
        builder = builder.with_ui_defaults(load_or_exit(path));
    }

    let start = Instant::now();
    let mut lowerer = builder.build();
    let outcome = lowerer.compile(&executable);
    let elapsed = start.elapsed();

    finish(outcome, &args.out, args.diagnostics.as_deref(), elapsed)
}

/// Prints the report, writes the outputs, and tells whether a document was produced.
fn finish<T: Serialize>(
    outcome: CompileOutcome<T>,
    out: &str,
    diagnostics_path: Option<&str>,
    elapsed: std::time::Duration,
) -> bool {
    eprint!("{}", outcome.diagnostics);
    if let Some(path) = diagnostics_path {
        write_json(path, &outcome.diagnostics);
    }

    match &outcome.document {
        Some(document) => {
            write_json(out, document);
            println!(
                "Compiled in {:?} ({} warnings) -> {}",
                elapsed,
                outcome.diagnostics.warnings.len(),
                out
            );
            true
        }
        None => {
            eprintln!(
                "\nCompilation failed with {} errors",
                outcome.diagnostics.errors.len()
            );
            false
        }
    }
}

fn load_or_exit<T: DeserializeOwned>(path: &str) -> T {
    load_json(path).unwrap_or_else(|e| exit_with_error(&e.to_string()))
}

fn load_optional<T: DeserializeOwned + Default>(path: Option<&str>) -> T {
    path.map(load_or_exit::<T>).unwrap_or_default()
}

fn write_json<T: Serialize>(path: &str, value: &T) {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize output: {}", e)));
    fs::write(path, text)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
