//! Search engine for multiplicative magic grids.
//!
//! An order-`n` grid places each of `1..n²` in exactly one cell. A grid is
//! accepted when its row products and column products match as sets. The
//! permutation space `(n²)!` dwarfs memory and any single-run wall time past
//! tiny orders, so the engine splits the lexicographic enumeration into
//! per-worker partitions, checkpoints them to disk, and resumes interrupted
//! runs without re-scoring consumed candidates.

mod canonical;
mod check;
mod error;
mod partition;
mod perm;
mod product;
mod progress;
mod search;
mod sink;
mod topology;

use serde::{Deserialize, Serialize};

pub use canonical::canonicalize;
pub use check::check_permutation;
pub use error::{SearchError, SearchResult};
pub use partition::{
    Partition, PartitionPolicy, PartitionSpec, PartitionState, SpacePartitioner,
};
pub use perm::{next_permutation, nth_permutation, total_permutations};
pub use product::ProductCache;
pub use progress::{format_hms, ProgressReporter};
pub use search::{
    CancelToken, SearchCoordinator, SearchMode, SearchOutcome, SearchStatus,
};
pub use sink::{NullWriter, ResultSink, SolutionSender, SolutionWriter};
pub use topology::Topology;

/// An accepted grid together with the products that admitted it.
///
/// `grid` is stored in canonical form, which doubles as the deduplication
/// key: no result stream ever carries two solutions with the same grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// Grid order.
    pub n: usize,
    /// Canonical form of the accepted arrangement, row-major, n² values.
    pub grid: Vec<u32>,
    /// Product of each row, top to bottom.
    pub row_products: Vec<u64>,
    /// Product of each column, left to right.
    pub col_products: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solution_round_trips_through_json() {
        let solution = Solution {
            n: 2,
            grid: vec![1, 2, 3, 4],
            row_products: vec![2, 12],
            col_products: vec![3, 8],
        };
        let json = serde_json::to_string(&solution).unwrap();
        let back: Solution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, solution);
    }
}
