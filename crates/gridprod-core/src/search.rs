//! Search coordination: worker pool, dispatch, aggregation, teardown.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{SearchError, SearchResult};
use crate::partition::{PartitionPolicy, PartitionSpec, SpacePartitioner};
use crate::perm::total_permutations;
use crate::progress::ProgressReporter;
use crate::sink::{ResultSink, SolutionSender, SolutionWriter};
use crate::{check_permutation, ProductCache, Solution, Topology};

/// Search variant: enumerate every solution, or stop at the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    All,
    First,
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The whole space was scored.
    Completed,
    /// Single-solution mode stopped on its first hit.
    FoundFirst,
    /// An operator interrupt stopped dispatch; checkpoints stay resumable.
    Cancelled,
}

/// Summary of one order's search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub n: usize,
    /// Deduplicated solutions in arrival order.
    pub solutions: Vec<Solution>,
    pub total_checked: u64,
    pub wall_time: Duration,
    pub status: SearchStatus,
}

/// Shared cooperative cancellation flag. Workers observe it at permutation
/// boundaries; nothing is interrupted mid-candidate.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-search shared state handed to every worker.
struct WorkerCtx<'a> {
    partitioner: &'a SpacePartitioner,
    topology: &'a Topology,
    mode: SearchMode,
    checked: &'a AtomicU64,
    found: &'a AtomicBool,
    cancel: &'a CancelToken,
}

/// Owns the worker pool and drives one order's search end to end.
#[derive(Debug)]
pub struct SearchCoordinator {
    partitioner: SpacePartitioner,
    cancel: CancelToken,
    progress: bool,
}

impl SearchCoordinator {
    pub fn new(policy: PartitionPolicy) -> Self {
        Self {
            partitioner: SpacePartitioner::new(policy),
            cancel: CancelToken::new(),
            progress: false,
        }
    }

    /// Enable the once-per-second progress line.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Handle for interrupt wiring; cancelling stops new work at the next
    /// permutation boundary and leaves checkpoints resumable.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn partitioner(&self) -> &SpacePartitioner {
        &self.partitioner
    }

    /// Search order `n`, streaming accepted solutions to `writer` as they
    /// arrive. Returns the deduplicated result set and counters.
    pub fn search(
        &self,
        n: usize,
        mode: SearchMode,
        writer: &mut dyn SolutionWriter,
    ) -> SearchResult<SearchOutcome> {
        if n == 0 {
            return Err(SearchError::InvalidOrder(0));
        }
        let started = Instant::now();
        let total = total_permutations(n * n);
        let topology = Topology::build(n);
        let checked = Arc::new(AtomicU64::new(0));
        let found = AtomicBool::new(false);

        let specs = self.partitioner.plan(n);
        tracing::info!(n, workers = specs.len(), total = %total, ?mode, "search starting");

        let limit = match mode {
            SearchMode::First => Some(1),
            SearchMode::All => None,
        };
        let (tx, mut sink) = ResultSink::channel(limit);

        let reporter = self.progress.then(|| {
            ProgressReporter::start(
                u64::try_from(total).unwrap_or(u64::MAX),
                Arc::clone(&checked),
            )
        });

        let ctx = WorkerCtx {
            partitioner: &self.partitioner,
            topology: &topology,
            mode,
            checked: checked.as_ref(),
            found: &found,
            cancel: &self.cancel,
        };

        let mut failed = run_round(&specs, &ctx, &tx, &mut sink, writer)?;
        if !failed.is_empty() && !self.cancel.is_cancelled() {
            tracing::warn!(n, failed = failed.len(), "retrying failed partitions once");
            failed = run_round(&failed, &ctx, &tx, &mut sink, writer)?;
        }
        drop(tx);
        sink.drain(writer)?;

        if let Some(reporter) = reporter {
            reporter.stop();
        }

        let total_checked = checked.load(Ordering::Relaxed);
        let solutions = sink.into_solutions();

        if !failed.is_empty() && !self.cancel.is_cancelled() {
            return Err(SearchError::Aborted {
                n,
                partial: solutions,
            });
        }

        let status = if self.cancel.is_cancelled() {
            SearchStatus::Cancelled
        } else if found.load(Ordering::Relaxed) {
            SearchStatus::FoundFirst
        } else {
            SearchStatus::Completed
        };
        tracing::info!(
            n,
            checked = total_checked,
            solutions = solutions.len(),
            ?status,
            "search finished"
        );

        Ok(SearchOutcome {
            n,
            solutions,
            total_checked,
            wall_time: started.elapsed(),
            status,
        })
    }
}

/// Run one pool round over `specs`, draining the sink continuously while
/// workers are live. Returns the specs whose workers failed or panicked.
fn run_round(
    specs: &[PartitionSpec],
    ctx: &WorkerCtx<'_>,
    tx: &SolutionSender,
    sink: &mut ResultSink,
    writer: &mut dyn SolutionWriter,
) -> SearchResult<Vec<PartitionSpec>> {
    let mut failed = Vec::new();
    thread::scope(|scope| -> SearchResult<()> {
        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let tx = tx.clone();
            let spec = *spec;
            handles.push((spec, scope.spawn(move || worker_run(spec, ctx, tx))));
        }

        // Continuous drain keeps result memory bounded by the result count,
        // not by the space size, and lets the writer stream as hits arrive.
        loop {
            sink.drain(writer)?;
            if handles.iter().all(|(_, handle)| handle.is_finished()) {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        for (spec, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(worker = spec.worker_id, %err, "worker failed");
                    failed.push(spec);
                }
                Err(_) => {
                    tracing::error!(worker = spec.worker_id, "worker panicked");
                    failed.push(spec);
                }
            }
        }
        sink.drain(writer)?;
        Ok(())
    })?;
    Ok(failed)
}

/// One worker's life: obtain the partition (resumed or fresh), score every
/// remaining permutation, checkpoint consumption, report hits.
fn worker_run(spec: PartitionSpec, ctx: &WorkerCtx<'_>, tx: SolutionSender) -> SearchResult<()> {
    let mut partition = ctx.partitioner.obtain(&spec)?;
    let mut cache = ProductCache::new();
    tracing::debug!(
        n = spec.n,
        worker = spec.worker_id,
        remaining = %partition.remaining(),
        "worker starting"
    );

    loop {
        if ctx.cancel.is_cancelled() {
            tracing::debug!(worker = spec.worker_id, "stopping on cancellation");
            return Ok(());
        }
        if ctx.mode == SearchMode::First && ctx.found.load(Ordering::Relaxed) {
            return Ok(());
        }

        let hit = match partition.head() {
            None => break,
            Some(permutation) => {
                let hit = check_permutation(permutation, ctx.topology, &mut cache);
                ctx.checked.fetch_add(1, Ordering::Relaxed);
                hit
            }
        };
        if let Some(solution) = hit {
            if ctx.mode == SearchMode::First {
                ctx.found.store(true, Ordering::Relaxed);
            }
            // A closed channel only means the search is shutting down.
            let _ = tx.send(solution);
        }
        partition.mark_consumed()?;
    }

    ctx.partitioner.mark_complete(spec.n, spec.worker_id)?;
    tracing::debug!(n = spec.n, worker = spec.worker_id, "partition exhausted");
    Ok(())
}
