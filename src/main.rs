//! Baton - backlog relay for memoryless coding agents

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use baton::config::{BatonConfig, DEFAULT_MAX_ITERATIONS};
use baton::orchestrator::{report, Orchestrator, OrchestratorConfig};
use baton::state::{StatePaths, StateStore};
use baton::worker::{anchor_program, ProcessWorker};

#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(version)]
#[command(about = "Run a coding agent repeatedly until every backlog item passes", long_about = None)]
struct Cli {
    /// Maximum worker invocations
    #[arg(default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// State directory holding prd.json and prompt.md
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Worker program (overrides config)
    #[arg(short, long, env = "BATON_WORKER")]
    worker: Option<String>,

    /// Pause between iterations in milliseconds (overrides config)
    #[arg(long)]
    pause_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "baton=debug,info"
    } else {
        "baton=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let dir = match cli.dir.canonicalize() {
        Ok(dir) => dir,
        Err(_) => {
            eprintln!(
                "{} State directory does not exist: {}",
                "Error:".red().bold(),
                cli.dir.display()
            );
            std::process::exit(1);
        }
    };

    let mut config = match BatonConfig::load(&dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };
    if let Some(worker) = cli.worker {
        // A program given on the command line brings no arguments of its own,
        // and a relative path is taken from where baton was started.
        config.worker.command = anchor_program(&worker, &std::env::current_dir()?);
        config.worker.args.clear();
    }
    if let Some(pause_ms) = cli.pause_ms {
        config.pause_ms = pause_ms;
    }
    debug!("Effective config: {:?}", config);

    let store = StateStore::new(StatePaths::new(&dir, &config.files));
    let worker = Arc::new(ProcessWorker::from_config(&config.worker, &dir));
    let orchestrator_config = OrchestratorConfig::new()
        .with_max_iterations(cli.max_iterations)
        .with_pause(config.pause());

    let mut orchestrator = Orchestrator::new(store, worker, orchestrator_config);
    match orchestrator.run().await {
        Ok(run) => {
            report::print_report(&run);
            std::process::exit(run.exit_code());
        }
        Err(e) => {
            eprintln!("{} {} ({})", "Error:".red().bold(), e, e.category());
            std::process::exit(e.exit_code());
        }
    }
}
