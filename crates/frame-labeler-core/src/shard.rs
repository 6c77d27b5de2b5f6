use crate::error::Error;

/// A contiguous half-open range `[start, end)` of the work list owned by one
/// worker rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub rank: usize,
    pub start: usize,
    pub end: usize,
}

impl Shard {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start..self.end]
    }
}

/// Split `item_count` items into `worker_count` contiguous shards. Every rank
/// gets `item_count / worker_count` items except the last, which also takes
/// the remainder. Computed once up front; there is no rebalancing.
pub fn plan(item_count: usize, worker_count: usize) -> Result<Vec<Shard>, Error> {
    if worker_count == 0 {
        return Err(Error::Configuration(
            "worker count must be at least 1".to_string(),
        ));
    }

    let base = item_count / worker_count;
    let shards = (0..worker_count)
        .map(|rank| {
            let start = rank * base;
            let end = if rank == worker_count - 1 {
                item_count
            } else {
                start + base
            };
            Shard { rank, start, end }
        })
        .collect();

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_items_three_workers() {
        let shards = plan(10, 3).unwrap();
        let sizes: Vec<usize> = shards.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(shards[2], Shard { rank: 2, start: 6, end: 10 });

        let items: Vec<usize> = (0..10).collect();
        assert_eq!(shards[2].slice(&items), &[6, 7, 8, 9]);
    }

    #[test]
    fn test_fewer_items_than_workers() {
        let shards = plan(2, 4).unwrap();
        let sizes: Vec<usize> = shards.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![0, 0, 0, 2]);
        assert!(shards[0].is_empty());
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        assert!(matches!(plan(5, 0), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_partition_is_exact_for_all_small_inputs() {
        for n in 0..40 {
            for w in 1..9 {
                let shards = plan(n, w).unwrap();
                assert_eq!(shards.len(), w);

                let items: Vec<usize> = (0..n).collect();
                let rejoined: Vec<usize> = shards
                    .iter()
                    .flat_map(|s| s.slice(&items).iter().copied())
                    .collect();
                assert_eq!(rejoined, items, "n={} w={}", n, w);

                for (rank, shard) in shards.iter().enumerate() {
                    assert_eq!(shard.rank, rank);
                    if rank + 1 < w {
                        assert_eq!(shard.len(), n / w);
                        assert_eq!(shard.end, shards[rank + 1].start);
                    } else {
                        assert!(shard.len() >= n / w);
                    }
                }
            }
        }
    }
}
