use std::collections::HashMap;

/// Memoizes products of index-selected value sublists.
///
/// Keyed by the sorted selected values rather than grid identity: adjacent
/// candidates in enumeration order share most of their rows and columns, so
/// the same sublists recur constantly. Each worker owns one cache for the
/// lifetime of its search; nothing here is process-global.
#[derive(Debug, Default)]
pub struct ProductCache {
    memo: HashMap<Vec<u32>, u64>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Product of `grid[idx]` for each `idx` in `indices`.
    pub fn product_of(&mut self, indices: &[usize], grid: &[u32]) -> u64 {
        let mut key: Vec<u32> = indices.iter().map(|&i| grid[i]).collect();
        key.sort_unstable();
        if let Some(&product) = self.memo.get(&key) {
            return product;
        }
        let product = key.iter().map(|&v| u64::from(v)).product();
        self.memo.insert(key, product);
        product
    }

    /// Number of distinct sublists memoized so far.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_products() {
        let mut cache = ProductCache::new();
        let grid = [4, 1, 3, 2];
        assert_eq!(cache.product_of(&[0, 1], &grid), 4);
        assert_eq!(cache.product_of(&[2, 3], &grid), 6);
        assert_eq!(cache.product_of(&[0, 1, 2, 3], &grid), 24);
    }

    #[test]
    fn key_ignores_selection_order() {
        let mut cache = ProductCache::new();
        let grid = [5, 7, 2, 9];
        assert_eq!(cache.product_of(&[0, 1], &grid), 35);
        // Same values selected through different indices hit the same entry.
        let grid_swapped = [7, 5, 2, 9];
        assert_eq!(cache.product_of(&[0, 1], &grid_swapped), 35);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_sublists_get_distinct_entries() {
        let mut cache = ProductCache::new();
        let grid = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        cache.product_of(&[0, 1, 2], &grid);
        cache.product_of(&[3, 4, 5], &grid);
        cache.product_of(&[0, 1, 2], &grid);
        assert_eq!(cache.len(), 2);
    }
}
