/// Row and column index-sets for an order-`n` grid.
///
/// Cells are numbered row-major, so row sets are contiguous ranges and
/// column sets are strided. Each cell index appears in exactly one row set
/// and exactly one column set; both families partition `[0, n²)`. Built once
/// per search and shared read-only across workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    n: usize,
    rows: Vec<Vec<usize>>,
    cols: Vec<Vec<usize>>,
}

impl Topology {
    /// Build the topology for an order-`n` grid. Callers must pass `n >= 1`.
    pub fn build(n: usize) -> Self {
        debug_assert!(n >= 1, "grid order must be at least 1");
        let rows = (0..n)
            .map(|j| (j * n..(j + 1) * n).collect())
            .collect();
        let cols = (0..n)
            .map(|l| (0..n).map(|m| l + m * n).collect())
            .collect();
        Self { n, rows, cols }
    }

    /// Grid order.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Index sets covering each row, top to bottom.
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Index sets covering each column, left to right.
    pub fn cols(&self) -> &[Vec<usize>] {
        &self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_three_layout() {
        let topo = Topology::build(3);
        assert_eq!(topo.rows(), &[vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]);
        assert_eq!(topo.cols(), &[vec![0, 3, 6], vec![1, 4, 7], vec![2, 5, 8]]);
    }

    #[test]
    fn rows_and_cols_partition_the_cells() {
        for n in 1..=6 {
            let topo = Topology::build(n);
            for family in [topo.rows(), topo.cols()] {
                assert_eq!(family.len(), n);
                let mut seen = vec![false; n * n];
                for set in family {
                    assert_eq!(set.len(), n);
                    for &idx in set {
                        assert!(!seen[idx], "cell {idx} covered twice for n={n}");
                        seen[idx] = true;
                    }
                }
                assert!(seen.into_iter().all(|s| s), "gap in coverage for n={n}");
            }
        }
    }
}
