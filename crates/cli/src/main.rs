//! Pestpool CLI - launch worker pools, run sweeps, execute one-shot commands

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tabled::builder::Builder;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pestpool_core::application::sweep::{DEFAULT_MASTER_DIR, DEFAULT_SWEEP_EXE};
use pestpool_core::application::{CommandRunner, PoolSupervisor, SweepConfig, SweepRunner};
use pestpool_core::domain::{
    ParameterEnsemble, PoolConfig, PoolOutcome, SweepTable, DEFAULT_RENDEZVOUS_PORT,
};
use pestpool_infra_system::bin_path::register_bin_dir;
use pestpool_infra_system::{
    default_worker_count, is_text_file, StdWorkspace, TokioProcessLauncher,
};

#[derive(Parser)]
#[command(name = "pestpool")]
#[command(about = "Local worker-pool launcher for parameter-estimation runs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a pool of workers (and optionally a master) from a template directory
    Launch {
        /// Directory holding the complete input-file set
        template_dir: PathBuf,

        /// Relative path of the estimation executable inside the template
        exe: String,

        /// Relative path of the control file inside the template
        control_file: String,

        /// Number of workers (default: one per logical CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Rendezvous port
        #[arg(long, default_value_t = DEFAULT_RENDEZVOUS_PORT)]
        port: u16,

        /// Directory name for a master instance; omit to start none
        #[arg(long)]
        master_dir: Option<String>,

        /// Root directory the replica directories are created under
        #[arg(long, default_value = ".")]
        worker_root: PathBuf,

        /// Hostname workers rendezvous on instead of localhost
        #[arg(long)]
        hostname: Option<String>,

        /// Subdirectory inside each replica to launch from
        #[arg(long)]
        run_subdir: Option<String>,

        /// Keep replica directories after the run
        #[arg(long)]
        no_cleanup: bool,

        /// Discard master output and poll its status instead of blocking
        #[arg(long)]
        silent_master: bool,

        /// Root of prebuilt binaries to append to this process's PATH
        #[arg(long)]
        bin_dir: Option<PathBuf>,

        /// Log spawned command lines at info level
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run a parameter sweep and load its result table
    Sweep {
        /// Directory holding the complete input-file set
        template_dir: PathBuf,

        /// CSV file with one labelled row per parameter realization
        ensemble: PathBuf,

        /// Control file inside the template
        #[arg(long)]
        control_file: Option<String>,

        /// Number of workers (default: one per logical CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Rendezvous port
        #[arg(long, default_value_t = DEFAULT_RENDEZVOUS_PORT)]
        port: u16,

        /// Sweep executable name
        #[arg(long, default_value = DEFAULT_SWEEP_EXE)]
        exe: String,

        /// Master directory name
        #[arg(long, default_value = DEFAULT_MASTER_DIR)]
        master_dir: String,

        /// Keep the master directory after loading results
        #[arg(long)]
        keep_master: bool,

        /// Write the loaded result table to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Execute one command string in a working directory
    Run {
        /// The command string, quoted as one argument
        command: String,

        /// Working directory to execute in
        #[arg(long, default_value = ".")]
        cwd: PathBuf,
    },
}

fn init_logging() {
    let log_format =
        std::env::var("PESTPOOL_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("pestpool=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

fn print_outcome(outcome: &PoolOutcome) {
    println!("{}", "✓ Pool run finished".green().bold());
    if let Some(code) = outcome.master_exit {
        println!("  {} {}", "Master exit code:".bold(), code);
    }
    println!("  {} {}", "Workers launched:".bold(), outcome.worker_dirs.len());
    for dir in &outcome.leftover_dirs {
        println!(
            "  {} {}",
            "! could not remove".yellow(),
            dir.display()
        );
    }
}

fn print_table(table: &SweepTable) {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in table.rows() {
        builder.push_record(row.iter().cloned());
    }
    println!("{}", builder.build());
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let launcher = Arc::new(TokioProcessLauncher);
    let workspace = Arc::new(StdWorkspace);

    match cli.command {
        Commands::Launch {
            template_dir,
            exe,
            control_file,
            workers,
            port,
            master_dir,
            worker_root,
            hostname,
            run_subdir,
            no_cleanup,
            silent_master,
            bin_dir,
            verbose,
        } => {
            if let Some(root) = bin_dir {
                register_bin_dir(&root).context("Failed to register binary dir on PATH")?;
            }

            let control_path = template_dir.join(&control_file);
            if let Ok(false) = is_text_file(&control_path) {
                warn!(
                    path = %control_path.display(),
                    "control file looks binary; the estimation executable may reject it"
                );
            }

            let num_workers = workers.unwrap_or_else(default_worker_count);
            let mut config = PoolConfig::new(template_dir, exe, control_file, num_workers);
            config.port = port;
            config.master_dir = master_dir;
            config.worker_root = worker_root;
            config.hostname = hostname;
            config.run_subdir = run_subdir;
            config.cleanup = !no_cleanup;
            config.silent_master = silent_master;
            config.verbose = verbose;

            let supervisor = PoolSupervisor::new(launcher, workspace);
            let outcome = supervisor.run(&config).await.context("Pool run failed")?;
            print_outcome(&outcome);
        }

        Commands::Sweep {
            template_dir,
            ensemble,
            control_file,
            workers,
            port,
            exe,
            master_dir,
            keep_master,
            out,
        } => {
            let file = File::open(&ensemble)
                .with_context(|| format!("Failed to open ensemble file {}", ensemble.display()))?;
            let pe = ParameterEnsemble::read_csv(file).context("Failed to parse ensemble")?;
            println!(
                "{}",
                format!("Sweeping {} realizations...", pe.len()).cyan().bold()
            );

            let mut config = SweepConfig::new(template_dir, workers.unwrap_or_else(default_worker_count));
            config.control_file = control_file;
            config.port = port;
            config.exe_name = exe;
            config.master_dir = master_dir;
            config.cleanup_master = !keep_master;

            let runner = SweepRunner::new(launcher, workspace);
            let table = runner.run(&pe, &config).await.context("Sweep failed")?;

            println!("{}", "✓ Sweep finished".green().bold());
            print_table(&table);

            if let Some(out_path) = out {
                let out_file = File::create(&out_path).with_context(|| {
                    format!("Failed to create output file {}", out_path.display())
                })?;
                table.write_csv(out_file).context("Failed to write result table")?;
                println!("  {} {}", "Results written to:".bold(), out_path.display());
            }
        }

        Commands::Run { command, cwd } => {
            let runner = CommandRunner::new(launcher, workspace);
            runner
                .run(&command, &cwd)
                .await
                .with_context(|| format!("Command failed: {command}"))?;
            println!("{}", "✓ Command finished".green().bold());
        }
    }

    Ok(())
}
