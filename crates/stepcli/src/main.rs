// crates/stepcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stepcore::{Event, EventBus, ExecutionEvent};
use stepruntime::{to_dot, PipelineDefinition, StepKinds};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXAMPLE_PIPELINE: &str = include_str!("../../../pipelines/support.json");

#[derive(Parser)]
#[command(name = "stepgraph")]
#[command(about = "Step graph pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline against one event
    Run {
        /// Path to pipeline JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Path to a JSON file holding the event payload
        #[arg(short, long, conflicts_with = "input")]
        event: Option<PathBuf>,

        /// Event payload as JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a pipeline file
    Validate {
        /// Path to pipeline JSON file
        file: PathBuf,
    },

    /// Print the pipeline graph in DOT format
    Graph {
        /// Path to pipeline JSON file
        file: PathBuf,
    },

    /// List available step kinds
    Steps,

    /// Create an example pipeline
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn step_kinds() -> StepKinds {
    let mut kinds = StepKinds::new();
    stepnodes::register_all(&mut kinds);
    kinds
}

fn load(file: &PathBuf) -> Result<PipelineDefinition> {
    PipelineDefinition::from_file(file)
        .with_context(|| format!("failed to load pipeline from {}", file.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            event,
            input,
            verbose,
        } => {
            init_tracing(verbose);
            run_pipeline(file, event, input).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_pipeline(file)?;
        }

        Commands::Graph { file } => {
            let def = load(&file)?;
            println!("{}", to_dot(&def.schema));
        }

        Commands::Steps => {
            list_steps();
        }

        Commands::Init { output } => {
            create_example_pipeline(output)?;
        }
    }

    Ok(())
}

fn read_payload(event: Option<PathBuf>, input: Option<String>) -> Result<serde_json::Value> {
    let raw = match (event, input) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read event from {}", path.display()))?,
        (None, Some(input)) => input,
        (None, None) => return Ok(serde_json::json!({})),
    };

    let payload: serde_json::Value = serde_json::from_str(&raw).context("event is not valid JSON")?;
    if !payload.is_object() {
        anyhow::bail!("Event payload must be a JSON object");
    }
    Ok(payload)
}

async fn run_pipeline(file: PathBuf, event: Option<PathBuf>, input: Option<String>) -> Result<()> {
    eprintln!("🚀 Loading pipeline from: {}", file.display());

    let def = load(&file)?;
    let payload = read_payload(event, input)?;
    tracing::debug!("Event payload: {}", payload);

    eprintln!("📋 Pipeline: {}", def.name);
    eprintln!("   Steps: {}", def.schema.step_ids().len());
    eprintln!();

    let bus = Arc::new(EventBus::default());
    let pipeline = def.build(&step_kinds())?.with_event_bus(bus.clone());

    let mut events = bus.subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { start, .. } => {
                    eprintln!("▶️  Run started at {}", start);
                }
                ExecutionEvent::StepStarted { step, .. } => {
                    eprintln!("  ⚡ Starting step: {}", step);
                }
                ExecutionEvent::StepCompleted { step, duration_ms, .. } => {
                    eprintln!("  ✅ Step {} completed in {}ms", step, duration_ms);
                }
                ExecutionEvent::StepFailed { step, error, .. } => {
                    eprintln!("  ❌ Step {} failed: {}", step, error);
                }
                ExecutionEvent::RouteChosen { router, next, .. } => match next {
                    Some(next) => eprintln!("  🔀 {} routed to {}", router, next),
                    None => eprintln!("  🔀 {} found no route", router),
                },
                ExecutionEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        eprintln!("✨ Run completed successfully in {}ms", duration_ms);
                    } else {
                        eprintln!("💥 Run failed after {}ms", duration_ms);
                    }
                    break;
                }
            }
        }
    });

    let result = pipeline.run(Event::new(payload)).await;

    // RunCompleted is always emitted, so the listener ends on its own
    join_listener(event_task).await;

    let state = result?;
    println!("{}", serde_json::to_string_pretty(&state)?);

    Ok(())
}

/// Wait for the event listener; returns false if it panicked or was cancelled
async fn join_listener(task: tokio::task::JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Event listener failed: {}", e);
            false
        }
    }
}

fn validate_pipeline(file: PathBuf) -> Result<()> {
    println!("🔍 Validating pipeline: {}", file.display());

    let def = load(&file)?;
    def.build(&step_kinds())?;

    println!("✅ Pipeline is valid:");
    println!("   Name: {}", def.name);
    println!("   Start: {}", def.schema.start);
    println!("   Steps: {}", def.schema.step_ids().len());

    Ok(())
}

fn list_steps() {
    println!("📦 Available Step Kinds:");
    println!();

    let kinds = step_kinds();

    for kind in kinds.list_kinds() {
        if let Some(metadata) = kinds.get_metadata(&kind) {
            println!("  • {} ({})", kind, metadata.category);
            println!("    {}", metadata.description);
            for field in &metadata.config {
                let marker = if field.required { "required" } else { "optional" };
                println!("      - {} [{}]: {}", field.name, marker, field.description);
            }
        } else {
            println!("  • {}", kind);
        }
    }
}

fn create_example_pipeline(output: PathBuf) -> Result<()> {
    std::fs::write(&output, EXAMPLE_PIPELINE)?;

    println!("✨ Created example pipeline: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  stepgraph run --file {} --input '{{\"to_email\": \"support@acme.io\", \"intent\": \"billing/invoice\"}}'",
        output.display()
    );

    Ok(())
}
