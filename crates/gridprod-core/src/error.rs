use thiserror::Error;

use crate::Solution;

/// Result type for search engine operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while planning or running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The requested grid order is outside the supported range.
    #[error("invalid grid order {0}: must be at least 1")]
    InvalidOrder(usize),

    /// A persisted partition file failed to parse. Recovered locally by
    /// discarding the file and regenerating the partition from its spec.
    #[error("partition file for worker {worker_id} (n={n}) is corrupt: {reason}")]
    PartitionCorrupt {
        n: usize,
        worker_id: usize,
        reason: String,
    },

    /// A search was abandoned after a worker failed twice on the same
    /// partition. Solutions collected before the failure are attached.
    #[error("search for n={n} aborted after repeated worker failure; {} solution(s) collected", partial.len())]
    Aborted { n: usize, partial: Vec<Solution> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
