//! Beneficiary-disjoint partitioning
//!
//! Rows are split into `P` order-preserving chunks of roughly `ceil(N / P)`
//! rows. A chunk boundary never separates two rows of the same beneficiary:
//! it is pushed forward to the end of the beneficiary's rows, so trailing
//! chunks may be smaller or empty.

use std::ops::Range;

/// Row ranges of each partition, always `partitions` long
///
/// `rows` must be grouped by the key returned from `bene_of`.
#[must_use]
pub fn partition_ranges<T, F>(rows: &[T], partitions: usize, bene_of: F) -> Vec<Range<usize>>
where
    F: Fn(&T) -> &str,
{
    let partitions = partitions.max(1);
    let size = rows.len().div_ceil(partitions);

    let mut ranges = Vec::with_capacity(partitions);
    let mut start = 0;
    for _ in 0..partitions {
        let mut end = (start + size).min(rows.len());
        while end > start && end < rows.len() && bene_of(&rows[end]) == bene_of(&rows[end - 1]) {
            end += 1;
        }
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// The slice of `rows` assigned to partition `index`
#[must_use]
pub fn partition_slice<T, F>(rows: &[T], partitions: usize, index: usize, bene_of: F) -> &[T]
where
    F: Fn(&T) -> &str,
{
    partition_ranges(rows, partitions, bene_of)
        .get(index)
        .map_or(&rows[..0], |range| &rows[range.clone()])
}
