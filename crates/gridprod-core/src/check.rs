use std::collections::HashSet;

use crate::{canonicalize, ProductCache, Solution, Topology};

/// Score one candidate permutation against the grid topology.
///
/// Row products and column products are compared as sets: a product value
/// counts as present or absent, and duplicates collapse. Two rows sharing a
/// product therefore need only one matching column value. Multiset
/// comparison would be stricter when products repeat; see DESIGN.md before
/// changing this.
pub fn check_permutation(
    permutation: &[u32],
    topology: &Topology,
    cache: &mut ProductCache,
) -> Option<Solution> {
    let row_products: Vec<u64> = topology
        .rows()
        .iter()
        .map(|row| cache.product_of(row, permutation))
        .collect();
    let col_products: Vec<u64> = topology
        .cols()
        .iter()
        .map(|col| cache.product_of(col, permutation))
        .collect();

    let row_set: HashSet<u64> = row_products.iter().copied().collect();
    let col_set: HashSet<u64> = col_products.iter().copied().collect();
    if row_set != col_set {
        return None;
    }

    let n = topology.n();
    Some(Solution {
        n,
        grid: canonicalize(permutation, n),
        row_products,
        col_products,
    })
}
