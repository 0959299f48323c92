//! Longest increasing subsequence.
//!
//! Patience sorting with predecessor links, `O(n log n)`. Used to find the
//! largest set of reused list instances that are already in the right
//! relative order, so only the rest need to move.

/// Return the positions (indices into `sequence`) of one longest strictly
/// increasing subsequence of the `Some` entries, in ascending order. `None`
/// entries are skipped.
pub fn longest_increasing_subsequence(sequence: &[Option<usize>]) -> Vec<usize> {
    // tails[k]: position of the smallest tail value of an increasing run of
    // length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; sequence.len()];

    for (position, value) in sequence.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };
        let slot = tails.partition_point(|&t| sequence[t].is_some_and(|tv| tv < value));
        if slot > 0 {
            predecessor[position] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(position);
        } else {
            tails[slot] = position;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        result.push(position);
        cursor = predecessor[position];
    }
    result.reverse();
    result
}
