//! Aggregation of solutions from concurrent workers.
//!
//! Workers push typed [`Solution`] records into an mpsc channel; exactly one
//! consumer drains them, deduplicates by canonical grid, and appends
//! survivors to the embedding application's writer in arrival order. The
//! single consumer is what keeps the output stream free of interleaved
//! writes.

use std::collections::HashSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::Solution;

/// Producer half handed to each worker.
pub type SolutionSender = Sender<Solution>;

/// Destination for accepted solutions, implemented by the embedding
/// application (console stream, JSON export, ...).
pub trait SolutionWriter {
    fn append(&mut self, solution: &Solution) -> io::Result<()>;
}

/// Writer that discards everything; callers then read the deduplicated
/// list off the sink itself.
#[derive(Debug, Default)]
pub struct NullWriter;

impl SolutionWriter for NullWriter {
    fn append(&mut self, _solution: &Solution) -> io::Result<()> {
        Ok(())
    }
}

impl SolutionWriter for Vec<Solution> {
    fn append(&mut self, solution: &Solution) -> io::Result<()> {
        self.push(solution.clone());
        Ok(())
    }
}

/// Consumer half: owns the receiver, the dedup set, and the accepted list.
#[derive(Debug)]
pub struct ResultSink {
    rx: Receiver<Solution>,
    seen: HashSet<Vec<u32>>,
    accepted: Vec<Solution>,
    /// Stop accepting past this many solutions (single-solution mode).
    limit: Option<usize>,
}

impl ResultSink {
    /// Create the channel; `limit` caps how many deduplicated solutions are
    /// retained (`None` = unbounded).
    pub fn channel(limit: Option<usize>) -> (SolutionSender, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                rx,
                seen: HashSet::new(),
                accepted: Vec::new(),
                limit,
            },
        )
    }

    /// Pull everything currently queued. First arrival wins per canonical
    /// form; fresh solutions are appended to `writer` in arrival order.
    /// Returns how many fresh solutions were accepted.
    pub fn drain(&mut self, writer: &mut dyn SolutionWriter) -> io::Result<usize> {
        let mut fresh = 0;
        while let Ok(solution) = self.rx.try_recv() {
            if self.at_limit() {
                continue;
            }
            if self.seen.insert(solution.grid.clone()) {
                writer.append(&solution)?;
                self.accepted.push(solution);
                fresh += 1;
            }
        }
        Ok(fresh)
    }

    fn at_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.accepted.len() >= limit)
    }

    /// Solutions accepted so far, in arrival order.
    pub fn solutions(&self) -> &[Solution] {
        &self.accepted
    }

    pub fn into_solutions(self) -> Vec<Solution> {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn solution(grid: Vec<u32>) -> Solution {
        Solution {
            n: 2,
            grid,
            row_products: vec![2, 12],
            col_products: vec![3, 8],
        }
    }

    #[test]
    fn deduplicates_by_canonical_grid() {
        let (tx, mut sink) = ResultSink::channel(None);
        tx.send(solution(vec![1, 2, 3, 4])).unwrap();
        tx.send(solution(vec![1, 2, 3, 4])).unwrap();
        tx.send(solution(vec![4, 3, 2, 1])).unwrap();
        drop(tx);

        let mut out: Vec<Solution> = Vec::new();
        let fresh = sink.drain(&mut out).unwrap();
        assert_eq!(fresh, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(sink.solutions().len(), 2);
        assert_eq!(sink.solutions()[0].grid, vec![1, 2, 3, 4]);
    }

    #[test]
    fn limit_keeps_first_arrival_only() {
        let (tx, mut sink) = ResultSink::channel(Some(1));
        tx.send(solution(vec![1, 2, 3, 4])).unwrap();
        tx.send(solution(vec![4, 3, 2, 1])).unwrap();
        drop(tx);

        let mut writer = NullWriter;
        sink.drain(&mut writer).unwrap();
        let kept = sink.into_solutions();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].grid, vec![1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_producers_all_land() {
        let (tx, mut sink) = ResultSink::channel(None);
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                for i in 0..10u32 {
                    tx.send(solution(vec![t, i, 0, 0])).unwrap();
                }
            }));
        }
        drop(tx);
        for handle in handles {
            handle.join().unwrap();
        }

        let mut writer = NullWriter;
        sink.drain(&mut writer).unwrap();
        assert_eq!(sink.solutions().len(), 40);
    }
}
