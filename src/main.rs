use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use squadron::logging::{init_logging, LogConfig};
use squadron::{SpawnRequest, SquadConfig, WorkerManager, WorkerRecord, WorkerStatus};

#[derive(Parser)]
#[command(name = "squadron")]
#[command(version, about = "Run coding agents in parallel, one clone and terminal tab each", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn one worker per task
    Spawn {
        repo: String,
        #[arg(required = true)]
        tasks: Vec<String>,
        /// Branch to create instead of a generated one (single task only)
        #[arg(short, long)]
        branch: Option<String>,
        /// Do not start the dev server
        #[arg(long)]
        no_dev: bool,
        /// Agent command to run in the worker tab
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        skip_install: bool,
    },
    /// List all workers
    List,
    /// Show one worker
    Status { worker: String },
    /// Bring a worker's tab to the front
    Focus { worker: String },
    /// Type text into a worker's session
    Send { worker: String, text: String },
    /// Close a worker's tab and delete its directory
    Cleanup { worker: String },
    /// Clean up every worker (dry run unless --force)
    CleanupAll {
        #[arg(long)]
        force: bool,
    },
    /// Record a status change, e.g. `stopped`
    SetStatus { worker: String, status: WorkerStatus },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::verbose(cli.verbose));

    let config = SquadConfig::load().context("Failed to load configuration")?;
    let manager = WorkerManager::from_config(config);

    handle_command(&manager, cli.command).await
}

async fn handle_command(manager: &WorkerManager, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Spawn {
            repo,
            tasks,
            branch,
            no_dev,
            agent,
            skip_install,
        } => {
            let template = SpawnRequest {
                branch,
                agent_command: agent,
                dev_server: !no_dev,
                install: !skip_install,
                ..SpawnRequest::new(repo, "")
            };

            let results = manager.spawn_batch(&template, &tasks).await;
            let mut failed = 0;
            for (task, result) in &results {
                match result {
                    Ok(worker) => print_worker(worker),
                    Err(e) => {
                        failed += 1;
                        eprintln!("Failed to spawn worker for \"{}\": {}", task, e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} workers failed to spawn", failed, results.len());
            }
        }
        Commands::List => {
            let workers = manager.list();
            if workers.is_empty() {
                println!("No workers");
            }
            for worker in &workers {
                println!(
                    "{:<24} {:<11} :{:<6} {}",
                    worker.name,
                    worker.status.to_string(),
                    worker.port,
                    worker.branch
                );
            }
        }
        Commands::Status { worker } => {
            let record = manager.get(&worker)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Focus { worker } => {
            manager.focus(&worker).await?;
        }
        Commands::Send { worker, text } => {
            if !manager.send(&worker, &text).await? {
                bail!("Session for {} is not available", worker);
            }
        }
        Commands::Cleanup { worker } => {
            let outcome = manager.cleanup(&worker).await?;
            println!("Removed {}", outcome.record.name);
            if !outcome.directory_removed {
                bail!(
                    "Directory {} could not be deleted, remove it by hand",
                    outcome.record.directory.display()
                );
            }
        }
        Commands::CleanupAll { force } => {
            let report = manager.cleanup_all(force).await?;
            if report.dry_run {
                println!("Would remove {} workers:", report.workers.len());
                for name in &report.workers {
                    println!("  {}", name);
                }
                println!("Run again with --force to remove them");
                return Ok(());
            }

            println!("Removed {} workers", report.removed);
            for error in &report.errors {
                eprintln!("  {}", error);
            }
            if report.failed() > 0 {
                bail!("{} workers were not cleaned up completely", report.failed());
            }
        }
        Commands::SetStatus { worker, status } => {
            let record = manager.set_status(&worker, status)?;
            println!("{} is now {}", record.name, record.status);
        }
    }
    Ok(())
}

fn print_worker(worker: &WorkerRecord) {
    println!("Spawned {}", worker.name);
    println!("  branch:    {}", worker.branch);
    println!("  port:      {}", worker.port);
    println!("  directory: {}", worker.directory.display());
}
