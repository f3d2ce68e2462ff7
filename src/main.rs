use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};

use nh_observe::models::AnchorPolicy;
use nh_observe::{StudyConfig, aggregate, prepare, run, run_single_worker};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(
    name = "nh-observe",
    version,
    about = "Build nursing-home episodes and drug-observable time from Medicare data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Study configuration file (JSON)
    #[arg(long, short, value_name = "FILE", global = true, default_value = "study.json")]
    config: PathBuf,

    /// Override the run id, e.g. to rerun a worker of an earlier run
    #[arg(long, value_name = "ID", global = true)]
    run_id: Option<String>,

    /// Override the partition count
    #[arg(long, value_name = "N", global = true)]
    partitions: Option<usize>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare, run every worker of both policies and aggregate
    Run,
    /// Load inputs and write the staging tables only
    Prepare,
    /// Run a single partition from the staging tables
    Worker {
        /// Anchoring policy (entry or admission)
        #[arg(long)]
        policy: AnchorPolicy,
        /// Zero-based partition index
        #[arg(long)]
        partition: usize,
    },
    /// Collect worker artifacts and publish the final tables
    Aggregate,
}

fn load_config(cli: &Cli) -> anyhow::Result<StudyConfig> {
    let mut config = StudyConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(run_id) = &cli.run_id {
        config.run_id.clone_from(run_id);
    }
    if let Some(partitions) = cli.partitions {
        config.partitions = partitions;
    }
    config.validate().context("invalid command line overrides")?;
    Ok(config)
}

async fn execute(cli: Cli) -> anyhow::Result<u8> {
    let config = load_config(&cli)?;
    info!("{config}");

    match cli.command {
        Command::Run => {
            let report = run(&config).await.context("study run failed")?;
            println!("{report}");
            Ok(u8::from(!report.is_complete()))
        }
        Command::Prepare => {
            let staged = prepare(&config).await.context("preparing staging tables")?;
            println!(
                "Staged {} entry and {} admission episodes under {}",
                staged.entry.len(),
                staged.admission.len(),
                config.work_dir().display()
            );
            Ok(0)
        }
        Command::Worker { policy, partition } => {
            let status = run_single_worker(&config, policy, partition)
                .with_context(|| format!("reading staging tables for run {}", config.run_id))?;
            println!(
                "Worker {partition} ({policy}): {} rows, code {}",
                status.rows, status.code
            );
            Ok(u8::from(!status.succeeded()))
        }
        Command::Aggregate => {
            let report = aggregate(&config).context("aggregating worker artifacts")?;
            println!("{report}");
            Ok(u8::from(!report.is_complete()))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
