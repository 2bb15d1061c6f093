//! Row-range partitioning for parallel workers.
//!
//! The target table is addressed by a 1-based logical row number
//! (`ROW_NUMBER() OVER (ORDER BY key)`), so a run can be split into
//! contiguous, non-overlapping slices handed to independent workers.

/// An inclusive, 1-based slice of the target table's row ordering.
///
/// Ranges produced by [`partition`] are pairwise disjoint and together
/// cover `[1, total]` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    /// First row number in the range (>= 1).
    pub start: u64,

    /// Last row number in the range (>= start).
    pub end: u64,
}

impl RowRange {
    /// Number of rows covered by this range. Ranges are never empty by
    /// construction.
    pub fn rows(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Split `total` rows into at most `workers` contiguous ranges.
///
/// The remainder after integer division is spread over the leading
/// workers, so range sizes differ by at most one row. When there are
/// fewer rows than workers, each of the first `total` workers gets a
/// single row and the rest get no range at all. `total == 0` yields an
/// empty vector, which callers must treat as "nothing to test" rather
/// than a failure.
///
/// Pure and deterministic: the same `(total, workers)` always produces
/// the same ranges.
pub fn partition(total: u64, workers: usize) -> Vec<RowRange> {
    assert!(workers >= 1, "worker count must be at least 1");

    if total == 0 {
        return Vec::new();
    }

    let workers = workers as u64;

    // Fewer rows than workers: one row per range, extras omitted.
    if total < workers {
        return (1..=total).map(|i| RowRange { start: i, end: i }).collect();
    }

    let quotient = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 1u64;
    for i in 0..workers {
        // The first `remainder` workers absorb one extra row each.
        let share = if i < remainder { quotient + 1 } else { quotient };
        let end = start + share - 1;
        ranges.push(RowRange { start, end });
        start = end + 1;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let ranges = partition(12, 3);
        assert_eq!(
            ranges,
            vec![
                RowRange { start: 1, end: 4 },
                RowRange { start: 5, end: 8 },
                RowRange { start: 9, end: 12 },
            ]
        );
    }

    #[test]
    fn test_remainder_goes_to_leading_workers() {
        let ranges = partition(10, 3);
        assert_eq!(
            ranges,
            vec![
                RowRange { start: 1, end: 4 },
                RowRange { start: 5, end: 7 },
                RowRange { start: 8, end: 10 },
            ]
        );
    }

    #[test]
    fn test_fewer_rows_than_workers() {
        let ranges = partition(2, 5);
        assert_eq!(
            ranges,
            vec![RowRange { start: 1, end: 1 }, RowRange { start: 2, end: 2 }]
        );
    }

    #[test]
    fn test_zero_rows_is_empty_not_an_error() {
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn test_single_worker_gets_everything() {
        let ranges = partition(100, 1);
        assert_eq!(ranges, vec![RowRange { start: 1, end: 100 }]);
    }

    #[test]
    fn test_range_count() {
        assert_eq!(partition(10, 3).len(), 3);
        assert_eq!(partition(3, 10).len(), 3);
        assert_eq!(partition(7, 7).len(), 7);
    }

    #[test]
    fn test_coverage_no_gaps_no_overlaps() {
        for total in 0..=50 {
            for workers in 1..=8 {
                let ranges = partition(total, workers);

                if total == 0 {
                    assert!(ranges.is_empty());
                    continue;
                }

                assert_eq!(ranges.len() as u64, total.min(workers as u64));

                // Contiguous prefix-sum walk starting at row 1.
                let mut next = 1u64;
                for range in &ranges {
                    assert_eq!(range.start, next, "gap or overlap at {}", range);
                    assert!(range.end >= range.start);
                    next = range.end + 1;
                }
                assert_eq!(next, total + 1, "ranges do not cover [1, {}]", total);

                // Balanced: sizes differ by at most one row.
                let min = ranges.iter().map(|r| r.rows()).min().unwrap();
                let max = ranges.iter().map(|r| r.rows()).max().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(partition(1234, 7), partition(1234, 7));
    }
}
