//! Seed ordering methods.
//!
//! Pure, total, length-preserving permutations over a seeded list. The
//! elimination methods reorder a bracket field; the group methods return a
//! flat permutation meant to be chunked into consecutive groups.

use crate::model::SeedOrdering;

/// Apply an ordering method to a sequence.
///
/// `group_count` is only consulted by the `Groups*` methods and must be at
/// least 1 for them; other methods ignore it.
pub fn apply<T: Clone>(method: SeedOrdering, seq: &[T], group_count: usize) -> Vec<T> {
    match method {
        SeedOrdering::Natural => seq.to_vec(),
        SeedOrdering::Reverse => reverse(seq),
        SeedOrdering::HalfShift => half_shift(seq),
        SeedOrdering::ReverseHalfShift => half_shift(&reverse(seq)),
        SeedOrdering::PairFlip => pair_flip(seq),
        SeedOrdering::InnerOuter => inner_outer(seq),
        SeedOrdering::GroupsEffortBalanced => groups_effort_balanced(seq, group_count.max(1)),
        SeedOrdering::GroupsSnake => groups_snake(seq, group_count.max(1)),
        SeedOrdering::GroupsBracketOptimized => inner_outer(seq),
    }
}

/// Whether a method is one of the group-distribution orderings.
pub fn is_group_method(method: SeedOrdering) -> bool {
    matches!(
        method,
        SeedOrdering::GroupsEffortBalanced
            | SeedOrdering::GroupsSnake
            | SeedOrdering::GroupsBracketOptimized
    )
}

fn reverse<T: Clone>(seq: &[T]) -> Vec<T> {
    seq.iter().rev().cloned().collect()
}

/// Swap the two halves. For odd lengths the shorter first half moves back.
fn half_shift<T: Clone>(seq: &[T]) -> Vec<T> {
    let mid = seq.len() / 2;
    let mut out = seq[mid..].to_vec();
    out.extend_from_slice(&seq[..mid]);
    out
}

/// Swap every adjacent pair. An odd trailing element stays in place.
fn pair_flip<T: Clone>(seq: &[T]) -> Vec<T> {
    let mut out = seq.to_vec();
    for pair in out.chunks_mut(2) {
        if pair.len() == 2 {
            pair.swap(0, 1);
        }
    }
    out
}

/// Project seeds onto bracket slots so that seed 1 meets seed N in round 1
/// and only meets seed 2 in the final.
///
/// Requires a power-of-two length to describe a bracket; other lengths are
/// returned unchanged.
fn inner_outer<T: Clone>(seq: &[T]) -> Vec<T> {
    let n = seq.len();
    if n < 4 || !n.is_power_of_two() {
        return seq.to_vec();
    }
    let mut positions: Vec<usize> = vec![0];
    let mut size = 1;
    while size < n {
        size *= 2;
        let mut next = Vec::with_capacity(size);
        for &seed in &positions {
            next.push(seed);
            next.push(size - 1 - seed);
        }
        positions = next;
    }
    positions.into_iter().map(|i| seq[i].clone()).collect()
}

/// Deal every `group_count`-th seed into the same group so that seed effort
/// is spread across groups.
fn groups_effort_balanced<T: Clone>(seq: &[T], group_count: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(seq.len());
    let mut i = 0;
    let mut offset = 0;
    while out.len() < seq.len() {
        out.push(seq[i].clone());
        i += group_count;
        if i >= seq.len() {
            offset += 1;
            i = offset;
        }
    }
    out
}

/// Serpentine distribution: deal groups left to right, then right to left.
fn groups_snake<T: Clone>(seq: &[T], group_count: usize) -> Vec<T> {
    let mut groups: Vec<Vec<T>> = vec![Vec::new(); group_count];
    for (index, item) in seq.iter().enumerate() {
        let pass = index / group_count;
        let pos = index % group_count;
        let group = if pass % 2 == 0 {
            pos
        } else {
            group_count - 1 - pos
        };
        groups[group].push(item.clone());
    }
    groups.into_iter().flatten().collect()
}
