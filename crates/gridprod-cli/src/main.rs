mod clean;
mod primes;
mod report;

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gridprod_core::{
    format_hms, PartitionPolicy, SearchCoordinator, SearchError, SearchMode, SearchStatus,
    Solution, SolutionWriter,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gridprod",
    version,
    about = "Search n×n grids of 1..n² whose row and column products match"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search every order from 1 up to n
    Search {
        /// Largest grid order to search; 0 keeps increasing until interrupted
        #[arg(allow_negative_numbers = true)]
        n: i64,
        /// Whether to enumerate every solution or stop at the first
        #[arg(long, value_enum, default_value = "all")]
        mode: ModeArg,
        /// Worker thread count (default: available cores)
        #[arg(long)]
        workers: Option<usize>,
        /// Directory for checkpoints and JSON outputs
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Delete leftover worker checkpoints and JSON outputs
    Clean {
        /// Only delete worker checkpoint files
        #[arg(long, conflicts_with = "outputs_only")]
        workers_only: bool,
        /// Only delete JSON output files
        #[arg(long)]
        outputs_only: bool,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List the primes in (n²/2, n²): each pins one row/column pair of an
    /// order-n grid, since only one cell value can carry it
    Primes {
        /// Grid order to probe
        n: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Enumerate every solution per order
    All,
    /// Stop each order at its first solution
    First,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Search {
            n,
            mode,
            workers,
            data_dir,
        } => run_search(n, mode, workers, data_dir),
        Command::Clean {
            workers_only,
            outputs_only,
            data_dir,
        } => {
            let data_dir = resolve_data_dir(data_dir);
            clean::run(&data_dir, !outputs_only, !workers_only)
        }
        Command::Primes { n } => {
            primes::run(n);
            Ok(())
        }
    }
}

/// Streams accepted solutions to the console as workers report them.
#[derive(Debug, Default)]
struct ConsoleWriter;

impl SolutionWriter for ConsoleWriter {
    fn append(&mut self, solution: &Solution) -> std::io::Result<()> {
        println!(
            "| found {:?} | rows {:?} | cols {:?}",
            solution.grid, solution.row_products, solution.col_products
        );
        Ok(())
    }
}

fn run_search(
    n_max: i64,
    mode: ModeArg,
    workers: Option<usize>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    if n_max < 0 {
        bail!("invalid value {n_max}: grid order must be a natural number");
    }
    let workers = workers
        .unwrap_or_else(|| thread::available_parallelism().map(|c| c.get()).unwrap_or(1));
    let data_dir = resolve_data_dir(data_dir);
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    let mode = match mode {
        ModeArg::All => SearchMode::All,
        ModeArg::First => SearchMode::First,
    };
    tracing::debug!(workers, data_dir = %data_dir.display(), "search configuration");
    let engine =
        SearchCoordinator::new(PartitionPolicy::new(workers, &data_dir)).with_progress(true);

    let cancel = engine.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!("\ninterrupt received; checkpointing and stopping");
        cancel.cancel();
    })
    .context("installing the interrupt handler")?;

    let started = Instant::now();
    let mut session = report::Session::new(data_dir.clone());

    let mut order: usize = 1;
    loop {
        if n_max > 0 && order as i64 > n_max {
            break;
        }
        println!(
            "\nBegin execution for n = {order} ({} mode, {workers} workers)",
            mode_name(mode)
        );
        let outcome = match engine.search(order, mode, &mut ConsoleWriter) {
            Ok(outcome) => outcome,
            Err(SearchError::Aborted { n, partial }) => {
                let path = session.record_failed(n, &partial)?;
                let _ = session.finish(started.elapsed())?;
                bail!(
                    "search for n={n} failed after retry; {} partial solution(s) saved to {}",
                    partial.len(),
                    path.display()
                );
            }
            Err(err) => return Err(err).with_context(|| format!("searching n={order}")),
        };

        let path = session.record(&outcome)?;
        println!(
            "Finished n = {}: {} solution(s), {} checked in {} | output {}",
            outcome.n,
            outcome.solutions.len(),
            outcome.total_checked,
            format_hms(outcome.wall_time),
            path.display()
        );

        if outcome.status == SearchStatus::Cancelled {
            println!("Execution interrupted; checkpoints kept for resume.");
            break;
        }
        order += 1;
    }

    if let Some(path) = session.finish(started.elapsed())? {
        println!("\nSession output saved to {}", path.display());
    }
    println!("Total execution time: {}", format_hms(started.elapsed()));
    Ok(())
}

fn mode_name(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::All => "all solutions",
        SearchMode::First => "single solution",
    }
}

fn resolve_data_dir(overridden: Option<PathBuf>) -> PathBuf {
    overridden.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridprod")
    })
}
