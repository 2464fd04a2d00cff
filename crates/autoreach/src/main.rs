use anyhow::{bail, Context, Result};
use autoreach::{Environment, HandlerRegistry, Workflow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run declarative outreach workflows.
#[derive(Parser, Debug)]
#[command(name = "autoreach", version, about)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute every step and print the outputs as JSON
    Run {
        /// Path to the workflow document
        #[arg(default_value = "workflow.json")]
        workflow: PathBuf,
    },
    /// Load the document and construct its handlers without running them
    Check {
        /// Path to the workflow document
        #[arg(default_value = "workflow.json")]
        workflow: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Run { workflow } => run(workflow).await,
        Command::Check { workflow } => check(workflow),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load(path: PathBuf) -> Result<Workflow> {
    Workflow::builder()
        .registry(HandlerRegistry::with_builtin_handlers())
        .environment(Environment::from_process())
        .load(&path)
        .with_context(|| format!("failed to load workflow {}", path.display()))
}

async fn run(path: PathBuf) -> Result<()> {
    let workflow = load(path)?;
    let outputs = workflow.run().await;

    let rendered =
        serde_json::to_string_pretty(&outputs.to_json()).context("failed to render outputs")?;
    println!("{rendered}");

    let failures = workflow.failures(&outputs);

    if !failures.is_empty() {
        eprintln!(
            "{} of {} steps failed in '{}' ({:.2?}):",
            failures.len(),
            workflow.descriptor().step_count(),
            workflow.name(),
            outputs.elapsed()
        );
        for failure in failures {
            eprintln!("  - {failure}");
        }
    }
    Ok(())
}

fn check(path: PathBuf) -> Result<()> {
    let workflow = load(path)?;
    let errors = workflow.construction_errors();
    if errors.is_empty() {
        println!(
            "'{}': {} steps, all handlers constructed",
            workflow.name(),
            workflow.descriptor().step_count()
        );
        return Ok(());
    }

    for error in errors {
        eprintln!("  - {error}");
    }
    bail!(
        "{} of {} steps cannot be constructed",
        errors.len(),
        workflow.descriptor().step_count()
    )
}
