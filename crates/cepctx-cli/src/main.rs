//! cepctx CLI: validate, assemble and explain operator context descriptors.

use clap::{Parser, Subcommand};
use cepctx_core::config::ExecutionConfig;
use cepctx_exec::{EngineFactory, OperatorContext, StagingEngineManager, Worker};
use cepctx_planner::parse_yaml_context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cepctx", version = cepctx_core::VERSION)]
#[command(
    about = "Assemble CEP execution programs from operator context descriptors",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a context descriptor and check that every plan resolves
    Validate {
        /// Path to the context YAML file
        #[arg(short, long)]
        context: PathBuf,
    },

    /// Print the assembled program (all plans, or one enriched plan)
    Assemble {
        /// Path to the context YAML file
        #[arg(short, long)]
        context: PathBuf,

        /// Only assemble this plan, with just the streams it references
        #[arg(long)]
        plan: Option<String>,
    },

    /// Describe the context and stage its program on a fresh engine
    Explain {
        /// Path to the context YAML file
        #[arg(short, long)]
        context: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cepctx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { context } => validate_context(&context),
        Commands::Assemble { context, plan } => assemble_context(&context, plan.as_deref()),
        Commands::Explain { context } => explain_context(&context),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_context(path: &Path) -> Result<OperatorContext, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(path)?;
    let descriptor = parse_yaml_context(&yaml_content)?;
    let mut ctx = OperatorContext::from_descriptor(descriptor)?;
    if ctx.execution_config().is_err() {
        ctx.set_execution_config(ExecutionConfig::from_env());
    }
    tracing::debug!(context = %ctx.display_name(), "loaded context descriptor");
    Ok(ctx)
}

fn validate_context(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(path)?;
    for id in ctx.plans()?.ids() {
        ctx.assemble_one(id.as_str())?;
    }
    println!("✓ Context is valid");
    Ok(())
}

fn assemble_context(path: &Path, plan: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(path)?;
    let program = match plan {
        Some(id) => ctx.assemble_one(id)?,
        None => ctx.assemble_all()?,
    };
    println!("{program}");
    Ok(())
}

fn explain_context(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = load_context(path)?;
    let plans = ctx.plans()?.list_all();

    println!("Operator Context (cepctx {})", cepctx_core::VERSION);
    println!("===========================");
    println!();
    println!("Name: {}", ctx.display_name());
    match ctx.time_characteristic() {
        Ok(tc) => println!("Time Characteristic: {tc}"),
        Err(_) => println!("Time Characteristic: (not set)"),
    }
    let cfg = ctx.execution_config()?;
    println!("Parallelism: {}", cfg.parallelism);
    println!();
    println!("Input Streams:");
    for id in ctx.input_stream_ids() {
        println!("  {}", ctx.schemas().render(&id)?);
    }
    println!();
    println!("Extensions:");
    for (name, handle) in ctx.extensions().iter() {
        println!("  {name} -> {handle}");
    }
    println!();
    println!("Execution Plans: {}", plans.len());
    for (id, body) in &plans {
        println!("  {id}: {body}");
    }

    let factory = EngineFactory::<StagingEngineManager>::default();
    let worker = Worker::start(ctx, &factory)?;
    println!();
    println!("Program Fingerprint: {}", worker.fingerprint());
    println!("Engine Instance: {}", worker.engine().instance_id());

    Ok(())
}
