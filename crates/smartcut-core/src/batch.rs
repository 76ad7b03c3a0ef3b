use std::ops::Range;

/// Split `total` items into at most `num_batches` contiguous index ranges of
/// `ceil(total / num_batches)` items each. The last range may be shorter.
/// A batch count of zero is treated as one.
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let batches = num_batches.max(1);
    let size = total.div_ceil(batches);
    (0..batches)
        .map(|i| i * size..((i + 1) * size).min(total))
        .take_while(|r| r.start < total)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_batches() {
        assert!(batch_ranges(0, 3).is_empty());
    }

    #[test]
    fn even_split() {
        assert_eq!(batch_ranges(10, 2), vec![0..5, 5..10]);
    }

    #[test]
    fn last_batch_shorter() {
        assert_eq!(batch_ranges(10, 3), vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn more_batches_than_items() {
        // ceil(3/5) = 1 per batch; batches past the end are dropped.
        assert_eq!(batch_ranges(3, 5), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn uneven_split_can_yield_fewer_batches() {
        // ceil(5/4) = 2 → [0,2) [2,4) [4,5); the fourth would start at 6.
        assert_eq!(batch_ranges(5, 4), vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn zero_batches_means_one() {
        assert_eq!(batch_ranges(4, 0), vec![0..4]);
    }

    #[test]
    fn ranges_cover_everything_once() {
        for total in 1..40 {
            for n in 1..8 {
                let ranges = batch_ranges(total, n);
                let covered: Vec<usize> = ranges.into_iter().flatten().collect();
                assert_eq!(covered, (0..total).collect::<Vec<_>>());
            }
        }
    }
}
