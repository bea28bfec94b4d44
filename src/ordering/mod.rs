//! Pure, deterministic, length-preserving permutations of seed arrays (§4.1).
//!
//! Every function here is a total function over `&[T]` — no I/O, no randomness, no
//! stage/storage dependency. `topology::creator` is the only caller that matters, but
//! they are exposed publicly since callers may want to preview an ordering (e.g. to
//! render a bracket before committing a seeding).

use crate::error::{BracketError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One of the named permutation methods of §4.1. The `serde` renames match the
/// dotted names the spec (and the wire format callers build `seedOrdering` lists with)
/// uses for the `groups.*` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderingMethod {
    #[serde(rename = "natural")]
    Natural,
    #[serde(rename = "reverse")]
    Reverse,
    #[serde(rename = "half_shift")]
    HalfShift,
    #[serde(rename = "reverse_half_shift")]
    ReverseHalfShift,
    #[serde(rename = "pair_flip")]
    PairFlip,
    #[serde(rename = "inner_outer")]
    InnerOuter,
    #[serde(rename = "groups.effort_balanced")]
    GroupsEffortBalanced,
    #[serde(rename = "groups.seed_optimized")]
    GroupsSeedOptimized,
    #[serde(rename = "groups.bracket_optimized")]
    GroupsBracketOptimized,
}

impl OrderingMethod {
    /// Apply this ordering to `seq`. `group_count` is required (and only used) by the
    /// `groups.*` family; it is ignored otherwise.
    pub fn apply<T: Clone>(&self, seq: &[T], group_count: Option<u32>) -> Result<Vec<T>> {
        match self {
            OrderingMethod::Natural => Ok(natural(seq)),
            OrderingMethod::Reverse => Ok(reverse(seq)),
            OrderingMethod::HalfShift => Ok(half_shift(seq)),
            OrderingMethod::ReverseHalfShift => Ok(reverse_half_shift(seq)),
            OrderingMethod::PairFlip => Ok(pair_flip(seq)),
            OrderingMethod::InnerOuter => inner_outer(seq),
            OrderingMethod::GroupsEffortBalanced => {
                let g = group_count.ok_or_else(|| {
                    BracketError::invalid_input("groups.effort_balanced requires a group count")
                })?;
                Ok(groups_effort_balanced(seq, g))
            }
            OrderingMethod::GroupsSeedOptimized => {
                let g = group_count.ok_or_else(|| {
                    BracketError::invalid_input("groups.seed_optimized requires a group count")
                })?;
                Ok(groups_seed_optimized(seq, g))
            }
            OrderingMethod::GroupsBracketOptimized => {
                Err(BracketError::not_implemented("groups.bracket_optimized"))
            }
        }
    }
}

pub fn natural<T: Clone>(seq: &[T]) -> Vec<T> {
    seq.to_vec()
}

pub fn reverse<T: Clone>(seq: &[T]) -> Vec<T> {
    let mut out = seq.to_vec();
    out.reverse();
    out
}

pub fn half_shift<T: Clone>(seq: &[T]) -> Vec<T> {
    let mid = seq.len() / 2;
    let mut out = seq[mid..].to_vec();
    out.extend_from_slice(&seq[..mid]);
    out
}

pub fn reverse_half_shift<T: Clone>(seq: &[T]) -> Vec<T> {
    let mid = seq.len() / 2;
    let mut out = reverse(&seq[..mid]);
    out.extend(reverse(&seq[mid..]));
    out
}

pub fn pair_flip<T: Clone>(seq: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(seq.len());
    let mut chunks = seq.chunks_exact(2);
    for pair in &mut chunks {
        out.push(pair[1].clone());
        out.push(pair[0].clone());
    }
    out.extend_from_slice(chunks.remainder());
    out
}

/// Splits `seq` into four equal quarters `[Q0|Q1|Q2|Q3]` and interleaves pops from the
/// front/back of the outer pair `(Q0, Q3)` and the inner pair `(Q1, Q2)`, per §4.1.
/// Length 2 is the identity (too short to have four quarters); any other length not
/// divisible by 4 is rejected.
///
/// Each quarter is drained by at most two passes — `outer.outer`/`inner.inner` (the
/// "outer" read of each quarter), then `outer.inner`/`inner.outer` (the "inner" read).
/// A quarter of size 1 is exhausted by the first pass alone (front and back pop are the
/// same element), so the second pass is skipped once every quarter has run dry — this is
/// what makes length 4 (quarters of size 1) produce `[1, 4, 2, 3]` instead of underrunning.
pub fn inner_outer<T: Clone>(seq: &[T]) -> Result<Vec<T>> {
    if seq.len() == 2 {
        return Ok(seq.to_vec());
    }
    if seq.len() % 4 != 0 {
        return Err(BracketError::invalid_input(
            "inner_outer requires a length divisible by 4 (or exactly 2)",
        ));
    }
    let quarter = seq.len() / 4;
    let mut q0: VecDeque<T> = seq[0..quarter].iter().cloned().collect();
    let mut q1: VecDeque<T> = seq[quarter..2 * quarter].iter().cloned().collect();
    let mut q2: VecDeque<T> = seq[2 * quarter..3 * quarter].iter().cloned().collect();
    let mut q3: VecDeque<T> = seq[3 * quarter..4 * quarter].iter().cloned().collect();

    let mut out = Vec::with_capacity(seq.len());
    loop {
        if q0.is_empty() && q1.is_empty() && q2.is_empty() && q3.is_empty() {
            break;
        }
        // outer.outer: outer() applied to the outer pair (Q0, Q3)
        if let Some(v) = q0.pop_front() {
            out.push(v);
        }
        if let Some(v) = q3.pop_back() {
            out.push(v);
        }
        // inner.inner: inner() applied to the inner pair (Q1, Q2)
        if let Some(v) = q1.pop_back() {
            out.push(v);
        }
        if let Some(v) = q2.pop_front() {
            out.push(v);
        }
        if q0.is_empty() && q1.is_empty() && q2.is_empty() && q3.is_empty() {
            break;
        }
        // outer.inner: inner() applied to the outer pair (Q0, Q3)
        if let Some(v) = q0.pop_back() {
            out.push(v);
        }
        if let Some(v) = q3.pop_front() {
            out.push(v);
        }
        // inner.outer: outer() applied to the inner pair (Q1, Q2)
        if let Some(v) = q1.pop_front() {
            out.push(v);
        }
        if let Some(v) = q2.pop_back() {
            out.push(v);
        }
    }
    Ok(out)
}

/// Distributes `seq` by stride `group_count`, wrapping: index sequence
/// `0, G, 2G, …, 1, 1+G, …`.
pub fn groups_effort_balanced<T: Clone>(seq: &[T], group_count: u32) -> Vec<T> {
    let g = group_count.max(1) as usize;
    let mut out = Vec::with_capacity(seq.len());
    for start in 0..g {
        let mut i = start;
        while i < seq.len() {
            out.push(seq[i].clone());
            i += g;
        }
    }
    out
}

/// Snake-draft distribution into `group_count` groups (row-major on even rows,
/// reversed on odd rows), then concatenates the groups in order.
pub fn groups_seed_optimized<T: Clone>(seq: &[T], group_count: u32) -> Vec<T> {
    let g = (group_count.max(1) as usize).min(seq.len().max(1));
    let mut groups: Vec<Vec<T>> = vec![Vec::new(); g];
    let mut idx = 0;
    let mut row = 0;
    while idx < seq.len() {
        let columns: Box<dyn Iterator<Item = usize>> = if row % 2 == 0 {
            Box::new(0..g)
        } else {
            Box::new((0..g).rev())
        };
        for col in columns {
            if idx >= seq.len() {
                break;
            }
            groups[col].push(seq[idx].clone());
            idx += 1;
        }
        row += 1;
    }
    groups.into_iter().flatten().collect()
}

/// The per-participant-count default loser-bracket ordering sequences of §4.1, used
/// when a stage's `seedOrdering` is absent or shorter than the loser bracket needs
/// (§9 Open Question 4). Sizes outside the table fall back to `InnerOuter` for every
/// slot, the same fallback already used as the single-elimination first-round default;
/// that is this crate's resolution of the open question (see DESIGN.md).
pub fn default_loser_bracket_ordering(participant_count: u32) -> Vec<OrderingMethod> {
    use OrderingMethod::*;
    match participant_count {
        8 => vec![Natural, Reverse, Natural],
        16 => vec![Natural, ReverseHalfShift, Reverse, Natural],
        32 => vec![Natural, Reverse, HalfShift, Natural, Natural],
        64 => vec![Natural, Reverse, HalfShift, Reverse, Natural, Natural],
        128 => vec![
            Natural,
            Reverse,
            HalfShift,
            PairFlip,
            PairFlip,
            PairFlip,
            Natural,
        ],
        n => {
            let major_rounds = (n.max(2) as f64).log2().max(1.0) as usize;
            vec![InnerOuter; major_rounds.max(1)]
        }
    }
}

/// The default first-round ordering for an elimination stage (§4.1).
pub fn default_first_round_ordering() -> OrderingMethod {
    OrderingMethod::InnerOuter
}

/// Resolves the loser-bracket ordering list a stage actually uses: the tail of
/// `seed_ordering` (index 0 is the first-round ordering; the rest, one per
/// winner-bracket round, govern WB→LB routing per §4.4 `findLoserMatchNumber`) when
/// there are enough entries, otherwise the §4.1 per-size default table wholesale —
/// which §9 Open Question 4 requires to be persisted back onto the stage once resolved.
pub fn resolve_loser_bracket_ordering(
    seed_ordering: Option<&[OrderingMethod]>,
    participant_count: u32,
) -> Vec<OrderingMethod> {
    let required = crate::topology::helpers::single_elimination_round_count(participant_count) as usize;
    if let Some(list) = seed_ordering {
        if list.len() > 1 && list.len() - 1 >= required {
            return list[1..].to_vec();
        }
    }
    default_loser_bracket_ordering(participant_count)
}
