//! Work partitioning and crash-resumable checkpoint state.
//!
//! The lexicographic enumeration for an order is split into contiguous,
//! disjoint chunks, one per worker. Small orders walk their chunk in
//! memory; past a policy threshold each chunk is persisted as a
//! line-oriented checkpoint file (one comma-separated permutation per line,
//! closed by a terminator record) that shrinks from the head as candidates
//! are scored. A crash therefore loses at most the in-flight permutation,
//! and a restart resumes the file verbatim instead of regenerating it.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{SearchError, SearchResult};
use crate::perm::{next_permutation, nth_permutation, total_permutations};

/// Terminator record: marks "no more work" so a truncated write is
/// distinguishable from a legitimately short file.
const END_SENTINEL: &str = "&end&";

/// How the enumeration space is split and where checkpoints live.
#[derive(Debug, Clone)]
pub struct PartitionPolicy {
    /// Number of workers, and therefore chunks per order.
    pub workers: usize,
    /// Grid orders at or above this persist their chunks to disk; smaller
    /// orders are walked in memory with no checkpoint.
    pub on_disk_threshold: usize,
    /// Root data directory; checkpoints live in its `workers/` subdirectory.
    pub data_dir: PathBuf,
}

impl PartitionPolicy {
    pub fn new(workers: usize, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            workers: workers.max(1),
            on_disk_threshold: 4,
            data_dir: data_dir.into(),
        }
    }

    /// Override the order at which chunks start persisting to disk.
    pub fn with_on_disk_threshold(mut self, n: usize) -> Self {
        self.on_disk_threshold = n;
        self
    }

    fn persists(&self, n: usize) -> bool {
        n >= self.on_disk_threshold
    }
}

/// A contiguous chunk of the enumeration, before materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSpec {
    pub n: usize,
    pub worker_id: usize,
    /// Lexicographic rank of the first permutation in the chunk.
    pub start_rank: u128,
    pub len: u128,
}

/// Observed state of one worker's persisted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    NotStarted,
    InProgress { remaining: u64 },
    Complete,
}

#[derive(Debug)]
enum Backing {
    /// Current permutation advanced in place; nothing persisted.
    Memory { current: Vec<u32>, remaining: u128 },
    /// Remaining permutations behind a checkpoint file, consumed head first.
    Disk {
        path: PathBuf,
        records: VecDeque<Vec<u32>>,
    },
}

/// A materialized chunk, exclusively owned by one worker.
#[derive(Debug)]
pub struct Partition {
    n: usize,
    worker_id: usize,
    backing: Backing,
}

impl Partition {
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Permutations not yet consumed.
    pub fn remaining(&self) -> u128 {
        match &self.backing {
            Backing::Memory { remaining, .. } => *remaining,
            Backing::Disk { records, .. } => records.len() as u128,
        }
    }

    /// The next permutation to score, if any.
    pub fn head(&self) -> Option<&[u32]> {
        match &self.backing {
            Backing::Memory { current, remaining } => {
                (*remaining > 0).then_some(current.as_slice())
            }
            Backing::Disk { records, .. } => records.front().map(Vec::as_slice),
        }
    }

    /// Drop the head entry once it has been scored. For persisted chunks
    /// the checkpoint file is rewritten without it, so an interruption
    /// between candidates costs nothing on resume.
    pub fn mark_consumed(&mut self) -> SearchResult<()> {
        match &mut self.backing {
            Backing::Memory { current, remaining } => {
                debug_assert!(*remaining > 0, "consumed past the end of the chunk");
                *remaining -= 1;
                if *remaining > 0 {
                    let advanced = next_permutation(current);
                    debug_assert!(advanced, "chunk extends past the last permutation");
                }
            }
            Backing::Disk { path, records } => {
                records.pop_front();
                write_records(path, records)?;
            }
        }
        Ok(())
    }
}

/// Splits the enumeration for an order into per-worker chunks and manages
/// their persisted form.
#[derive(Debug)]
pub struct SpacePartitioner {
    policy: PartitionPolicy,
}

impl SpacePartitioner {
    pub fn new(policy: PartitionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PartitionPolicy {
        &self.policy
    }

    /// Plan one chunk per worker: contiguous, disjoint, covering the whole
    /// space. Chunk size is `max(total / workers, 1)`; the last chunk
    /// absorbs the remainder.
    pub fn plan(&self, n: usize) -> Vec<PartitionSpec> {
        let total = total_permutations(n * n);
        let chunk = (total / self.policy.workers as u128).max(1);
        (0..self.policy.workers)
            .map(|worker_id| {
                let start_rank = chunk * worker_id as u128;
                let len = if worker_id == self.policy.workers - 1 {
                    total.saturating_sub(start_rank)
                } else {
                    chunk.min(total.saturating_sub(start_rank))
                };
                PartitionSpec {
                    n,
                    worker_id,
                    start_rank,
                    len,
                }
            })
            .collect()
    }

    /// Inspect a worker's persisted chunk without loading it for work.
    pub fn state(&self, n: usize, worker_id: usize) -> SearchResult<PartitionState> {
        let path = self.chunk_path(n, worker_id);
        if !path.exists() {
            return Ok(PartitionState::NotStarted);
        }
        let records = read_records(&path, n, worker_id)?;
        Ok(if records.is_empty() {
            PartitionState::Complete
        } else {
            PartitionState::InProgress {
                remaining: records.len() as u64,
            }
        })
    }

    /// Reload a persisted chunk verbatim, if one exists. Entries consumed
    /// before the interruption stay consumed.
    pub fn resume(&self, n: usize, worker_id: usize) -> SearchResult<Option<Partition>> {
        let path = self.chunk_path(n, worker_id);
        if !path.exists() {
            return Ok(None);
        }
        let records = read_records(&path, n, worker_id)?;
        Ok(Some(Partition {
            n,
            worker_id,
            backing: Backing::Disk { path, records },
        }))
    }

    /// Realize a chunk from its spec: in memory below the policy threshold,
    /// otherwise as a fresh checkpoint file.
    pub fn materialize(&self, spec: &PartitionSpec) -> SearchResult<Partition> {
        let cells = spec.n * spec.n;
        if !self.policy.persists(spec.n) {
            let current = if spec.len == 0 {
                Vec::new()
            } else {
                nth_permutation(cells, spec.start_rank)
            };
            return Ok(Partition {
                n: spec.n,
                worker_id: spec.worker_id,
                backing: Backing::Memory {
                    current,
                    remaining: spec.len,
                },
            });
        }

        let count = usize::try_from(spec.len).expect("chunk too large to materialize on disk");
        let mut records = VecDeque::with_capacity(count.min(1 << 20));
        if count > 0 {
            let mut perm = nth_permutation(cells, spec.start_rank);
            for i in 0..count {
                records.push_back(perm.clone());
                if i + 1 < count {
                    let advanced = next_permutation(&mut perm);
                    debug_assert!(advanced, "chunk extends past the last permutation");
                }
            }
        }
        let path = self.chunk_path(spec.n, spec.worker_id);
        write_records(&path, &records)?;
        tracing::debug!(
            n = spec.n,
            worker = spec.worker_id,
            len = count,
            "chunk checkpoint written"
        );
        Ok(Partition {
            n: spec.n,
            worker_id: spec.worker_id,
            backing: Backing::Disk { path, records },
        })
    }

    /// Resume the persisted chunk for this spec, or materialize it fresh.
    /// A corrupt checkpoint is discarded whole and regenerated, never
    /// half-applied.
    pub fn obtain(&self, spec: &PartitionSpec) -> SearchResult<Partition> {
        match self.resume(spec.n, spec.worker_id) {
            Ok(Some(partition)) => {
                tracing::debug!(
                    n = spec.n,
                    worker = spec.worker_id,
                    remaining = %partition.remaining(),
                    "resuming persisted chunk"
                );
                Ok(partition)
            }
            Ok(None) => self.materialize(spec),
            Err(SearchError::PartitionCorrupt { reason, .. }) => {
                tracing::warn!(
                    n = spec.n,
                    worker = spec.worker_id,
                    %reason,
                    "discarding corrupt chunk and regenerating"
                );
                fs::remove_file(self.chunk_path(spec.n, spec.worker_id))?;
                self.materialize(spec)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete a worker's checkpoint once its chunk (or the whole search for
    /// the order) has finished.
    pub fn mark_complete(&self, n: usize, worker_id: usize) -> SearchResult<()> {
        let path = self.chunk_path(n, worker_id);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!(n, worker = worker_id, "chunk checkpoint removed");
        }
        Ok(())
    }

    fn chunk_path(&self, n: usize, worker_id: usize) -> PathBuf {
        self.policy
            .data_dir
            .join("workers")
            .join(format!("worker_{n}_{worker_id}.txt"))
    }
}

// ==================== Checkpoint file format ====================

fn write_records(path: &Path, records: &VecDeque<Vec<u32>>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        let fields: Vec<String> = record.iter().map(u32::to_string).collect();
        writeln!(out, "{}", fields.join(","))?;
    }
    writeln!(out, "{END_SENTINEL}")?;
    out.flush()
}

fn read_records(path: &Path, n: usize, worker_id: usize) -> SearchResult<VecDeque<Vec<u32>>> {
    let corrupt = |reason: String| SearchError::PartitionCorrupt {
        n,
        worker_id,
        reason,
    };
    let file = File::open(path)?;
    let mut records = VecDeque::new();
    let mut terminated = false;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if terminated {
            return Err(corrupt(format!("record after terminator at line {}", idx + 1)));
        }
        if line == END_SENTINEL {
            terminated = true;
            continue;
        }
        let record =
            parse_record(line, n).map_err(|reason| corrupt(format!("line {}: {reason}", idx + 1)))?;
        records.push_back(record);
    }
    if !terminated {
        return Err(corrupt("missing terminator record".into()));
    }
    Ok(records)
}

fn parse_record(line: &str, n: usize) -> Result<Vec<u32>, String> {
    let cells = n * n;
    let mut values = Vec::with_capacity(cells);
    for field in line.split(',') {
        let value: u32 = field
            .trim()
            .parse()
            .map_err(|_| format!("bad value {field:?}"))?;
        values.push(value);
    }
    if values.len() != cells {
        return Err(format!("expected {cells} values, found {}", values.len()));
    }
    let mut seen = vec![false; cells];
    for &v in &values {
        let idx = v as usize;
        if idx == 0 || idx > cells {
            return Err(format!("value {v} out of range 1..={cells}"));
        }
        if seen[idx - 1] {
            return Err(format!("value {v} repeated"));
        }
        seen[idx - 1] = true;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_partitioner(dir: &Path, workers: usize) -> SpacePartitioner {
        SpacePartitioner::new(PartitionPolicy::new(workers, dir).with_on_disk_threshold(0))
    }

    #[test]
    fn plan_covers_the_space_without_overlap() {
        let dir = tempfile::tempdir().unwrap();
        for workers in [1, 2, 3, 5, 8, 30] {
            let partitioner =
                SpacePartitioner::new(PartitionPolicy::new(workers, dir.path()));
            let specs = partitioner.plan(2);
            assert_eq!(specs.len(), workers);
            let total: u128 = specs.iter().map(|s| s.len).sum();
            assert_eq!(total, 24, "workers={workers}");
            // Contiguity: each chunk starts where the planner put it and
            // chunks never overlap.
            for pair in specs.windows(2) {
                assert!(pair[0].start_rank + pair[0].len <= pair[1].start_rank);
            }
        }
    }

    #[test]
    fn memory_chunk_walks_its_window() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner =
            SpacePartitioner::new(PartitionPolicy::new(2, dir.path()));
        let spec = PartitionSpec {
            n: 2,
            worker_id: 0,
            start_rank: 5,
            len: 3,
        };
        let mut partition = partitioner.materialize(&spec).unwrap();
        let mut seen = Vec::new();
        while let Some(head) = partition.head() {
            seen.push(head.to_vec());
            partition.mark_consumed().unwrap();
        }
        assert_eq!(
            seen,
            vec![
                nth_permutation(4, 5),
                nth_permutation(4, 6),
                nth_permutation(4, 7)
            ]
        );
    }

    #[test]
    fn disk_chunk_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner = disk_partitioner(dir.path(), 2);
        let spec = PartitionSpec {
            n: 2,
            worker_id: 1,
            start_rank: 12,
            len: 4,
        };
        let partition = partitioner.materialize(&spec).unwrap();
        assert_eq!(partition.remaining(), 4);
        assert_eq!(partition.head().unwrap(), nth_permutation(4, 12).as_slice());

        let resumed = partitioner.resume(2, 1).unwrap().unwrap();
        assert_eq!(resumed.remaining(), 4);
        assert_eq!(resumed.head().unwrap(), nth_permutation(4, 12).as_slice());
    }

    #[test]
    fn consumption_shrinks_the_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner = disk_partitioner(dir.path(), 1);
        let spec = PartitionSpec {
            n: 2,
            worker_id: 0,
            start_rank: 0,
            len: 6,
        };
        let mut partition = partitioner.obtain(&spec).unwrap();
        partition.mark_consumed().unwrap();
        partition.mark_consumed().unwrap();
        drop(partition);

        // A restart sees only the unconsumed tail.
        let resumed = partitioner.resume(2, 0).unwrap().unwrap();
        assert_eq!(resumed.remaining(), 4);
        assert_eq!(resumed.head().unwrap(), nth_permutation(4, 2).as_slice());
        assert_eq!(
            partitioner.state(2, 0).unwrap(),
            PartitionState::InProgress { remaining: 4 }
        );
    }

    #[test]
    fn state_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner = disk_partitioner(dir.path(), 1);
        assert_eq!(partitioner.state(2, 0).unwrap(), PartitionState::NotStarted);

        let spec = PartitionSpec {
            n: 2,
            worker_id: 0,
            start_rank: 0,
            len: 2,
        };
        let mut partition = partitioner.obtain(&spec).unwrap();
        assert_eq!(
            partitioner.state(2, 0).unwrap(),
            PartitionState::InProgress { remaining: 2 }
        );

        partition.mark_consumed().unwrap();
        partition.mark_consumed().unwrap();
        assert_eq!(partitioner.state(2, 0).unwrap(), PartitionState::Complete);

        partitioner.mark_complete(2, 0).unwrap();
        assert_eq!(partitioner.state(2, 0).unwrap(), PartitionState::NotStarted);
    }

    #[test]
    fn corrupt_checkpoint_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner = disk_partitioner(dir.path(), 1);
        let spec = PartitionSpec {
            n: 2,
            worker_id: 0,
            start_rank: 0,
            len: 5,
        };
        partitioner.materialize(&spec).unwrap();

        let path = dir.path().join("workers").join("worker_2_0.txt");
        fs::write(&path, "1,2,3,4\nnot a record\n&end&\n").unwrap();
        assert!(matches!(
            partitioner.state(2, 0),
            Err(SearchError::PartitionCorrupt { .. })
        ));

        let partition = partitioner.obtain(&spec).unwrap();
        assert_eq!(partition.remaining(), 5);
        assert_eq!(partition.head().unwrap(), nth_permutation(4, 0).as_slice());
    }

    #[test]
    fn truncated_checkpoint_counts_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let partitioner = disk_partitioner(dir.path(), 1);
        let path = dir.path().join("workers").join("worker_2_0.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        // No terminator: the writer died mid-file.
        fs::write(&path, "1,2,3,4\n2,1,3,4\n").unwrap();
        assert!(matches!(
            partitioner.resume(2, 0),
            Err(SearchError::PartitionCorrupt { .. })
        ));
    }

    #[test]
    fn record_validation() {
        assert!(parse_record("1,2,3,4", 2).is_ok());
        assert!(parse_record("1, 2, 3, 4", 2).is_ok());
        assert!(parse_record("1,2,3", 2).is_err());
        assert!(parse_record("1,2,3,5", 2).is_err());
        assert!(parse_record("1,2,3,3", 2).is_err());
        assert!(parse_record("1,2,3,x", 2).is_err());
    }
}
