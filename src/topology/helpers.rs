//! Small, pure arithmetic and classification helpers shared by the topology creators
//! (§4.2, §4.4): power-of-two checks, BYE balancing, the "diagonal" `D(n) = ceil(n/2)`
//! match-number split, and the `(stage kind, group number)` → `GroupKind` mapping that
//! §4.4's navigation table is built around.

use crate::model::StageKind;
use crate::ordering::OrderingMethod;

pub fn is_power_of_two(n: u32) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Smallest power of two `>= n` (the bracket size a single/double elimination stage is
/// padded up to before BYEs are distributed).
pub fn next_power_of_two(n: u32) -> u32 {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two()
}

/// `D(n) = ceil(n / 2)`: the number of matches in a round of `n` slots.
pub fn diagonal(n: u32) -> u32 {
    n.div_ceil(2)
}

/// Total number of single-elimination rounds for a bracket of `size` slots
/// (`log2(size)`), `size` assumed to already be a power of two.
pub fn single_elimination_round_count(size: u32) -> u32 {
    (size.max(1) as f64).log2().round() as u32
}

/// What role a `Group` plays within its stage, derived purely from `(stage.kind,
/// group.number)` per §4.4. Round-robin and single-elimination stages have exactly one
/// "real" group kind; double-elimination stages have three groups in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Round-robin stage, or the only group of a single-elimination stage.
    SingleBracket,
    /// Double-elimination stage, group 1.
    WinnerBracket,
    /// Double-elimination stage, group 2.
    LoserBracket,
    /// Double-elimination stage, group 3: the grand final (and, if present, the
    /// consolation final lives alongside it as an extra round).
    FinalGroup,
}

pub fn classify_group(stage_kind: StageKind, group_number: u32) -> GroupKind {
    match (stage_kind, group_number) {
        (StageKind::RoundRobin, _) | (StageKind::SingleElimination, _) => GroupKind::SingleBracket,
        (StageKind::DoubleElimination, 1) => GroupKind::WinnerBracket,
        (StageKind::DoubleElimination, 2) => GroupKind::LoserBracket,
        (StageKind::DoubleElimination, _) => GroupKind::FinalGroup,
    }
}

/// Number of rounds in a double-elimination loser bracket for a `winner_bracket_size`
/// (power-of-two) bracket: `2 * (log2(size) - 1)`, per §4.2.
pub fn loser_bracket_round_count(winner_bracket_size: u32) -> u32 {
    let major = single_elimination_round_count(winner_bracket_size);
    if major < 2 {
        0
    } else {
        2 * (major - 1)
    }
}

/// Loser-bracket rounds come in two flavors (§4.4): "minor" rounds (even `roundLB`,
/// merging the previous LB round's winners with the matching winner-bracket round's
/// drop-ins, same match count) and "major" rounds (odd `roundLB > 1`, the loser bracket
/// playing itself down by half like an ordinary elimination round). Round 1 is neither —
/// it is seeded directly from the winner bracket's round-1 losers (§4.4 "loser_bracket
/// previous: round 1 → the two WB round-1 matches").
pub fn is_minor_loser_round(round_number: u32) -> bool {
    round_number > 1 && round_number % 2 == 0
}

/// Round 1 of the loser bracket is seeded straight from WB round 1; every other round
/// is either major or minor per [`is_minor_loser_round`].
pub fn is_first_loser_round(round_number: u32) -> bool {
    round_number == 1
}

/// The per-round match count of a double-elimination loser bracket, in round order
/// (§3 invariant 6: `N/4, N/4, N/8, N/8, ..., 1, 1`). A minor round always repeats the
/// previous round's count (it merely merges in an equal-sized wave of WB drop-ins); a
/// major round halves it.
pub fn loser_bracket_match_counts(winner_bracket_size: u32) -> Vec<u32> {
    let round_count = loser_bracket_round_count(winner_bracket_size);
    let mut counts = Vec::with_capacity(round_count as usize);
    let mut count = (winner_bracket_size / 4).max(1);
    for r in 1..=round_count {
        counts.push(count);
        if is_minor_loser_round(r) {
            count = (count / 2).max(1);
        }
    }
    counts
}

/// Which loser-bracket round absorbs the losers of winner-bracket round `wb_round`
/// (§4.4 "winner_bracket next"): round 1 if `wb_round == 1`, else `2 * (wb_round - 1)`.
pub fn wb_round_to_lb_round(wb_round: u32) -> u32 {
    if wb_round <= 1 {
        1
    } else {
        2 * (wb_round - 1)
    }
}

/// Inverse of [`wb_round_to_lb_round`]: which winner-bracket round's losers a given
/// (minor) loser-bracket round absorbed.
pub fn lb_round_to_wb_round(lb_round: u32) -> u32 {
    if lb_round <= 1 {
        1
    } else {
        lb_round / 2 + 1
    }
}

/// The complement of [`is_minor_loser_round`]: odd `roundLB > 1` (§4.4's "major round").
/// Round 1 is neither, so this is `false` there too.
pub fn is_major_loser_round(round_number: u32) -> bool {
    round_number > 1 && round_number % 2 == 1
}

/// §4.4 `findLoserMatchNumber`: the per-round loser-bracket ordering reorders the
/// `wb_round_match_count` losers of winner-bracket round `wb_round` before they are
/// paired into loser-bracket matches (§4.2); this inverts that permutation to answer
/// which loser-bracket match a given WB match's loser lands in. `ordering` is the
/// stage's resolved loser-bracket ordering list (see
/// [`crate::ordering::resolve_loser_bracket_ordering`]), indexed by `wb_round - 1`.
/// LB round 1 additionally pairs two WB losers per LB match, hence the extra
/// [`diagonal`] there.
pub fn find_loser_match_number(
    wb_round: u32,
    wb_match_number: u32,
    wb_round_match_count: u32,
    ordering: &[OrderingMethod],
) -> u32 {
    let seq: Vec<u32> = (1..=wb_round_match_count).collect();
    let method = ordering.get((wb_round - 1) as usize).copied().unwrap_or(OrderingMethod::Natural);
    let permuted = method.apply(&seq, None).unwrap_or(seq);
    let position = permuted
        .iter()
        .position(|&x| x == wb_match_number)
        .map(|p| p as u32 + 1)
        .unwrap_or(wb_match_number);
    if wb_round == 1 {
        diagonal(position)
    } else {
        position
    }
}

/// The forward direction of [`find_loser_match_number`], used at topology construction
/// time to record which winner-bracket match number(s) feed a given loser-bracket
/// match's slot(s) — LB round 1 absorbs two WB matches per LB match (the second element
/// is `Some`), every later minor round absorbs one (the second element is `None`).
pub fn loser_bracket_sources(
    wb_round: u32,
    lb_match_number: u32,
    wb_round_match_count: u32,
    ordering: &[OrderingMethod],
) -> (u32, Option<u32>) {
    let seq: Vec<u32> = (1..=wb_round_match_count).collect();
    let method = ordering.get((wb_round - 1) as usize).copied().unwrap_or(OrderingMethod::Natural);
    let permuted = method.apply(&seq, None).unwrap_or(seq);
    if wb_round == 1 {
        let i = (lb_match_number - 1) as usize;
        let a = permuted.get(2 * i).copied().unwrap_or(2 * lb_match_number - 1);
        let b = permuted.get(2 * i + 1).copied().unwrap_or(2 * lb_match_number);
        (a, Some(b))
    } else {
        let i = (lb_match_number - 1) as usize;
        let a = permuted.get(i).copied().unwrap_or(lb_match_number);
        (a, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_detection() {
        assert!(is_power_of_two(8));
        assert!(!is_power_of_two(6));
        assert!(!is_power_of_two(0));
    }

    #[test]
    fn next_power_of_two_rounds_up() {
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
        assert_eq!(next_power_of_two(1), 1);
    }

    #[test]
    fn diagonal_rounds_up_odd_counts() {
        assert_eq!(diagonal(8), 4);
        assert_eq!(diagonal(7), 4);
    }

    #[test]
    fn group_classification_matches_table() {
        assert_eq!(
            classify_group(StageKind::RoundRobin, 1),
            GroupKind::SingleBracket
        );
        assert_eq!(
            classify_group(StageKind::DoubleElimination, 1),
            GroupKind::WinnerBracket
        );
        assert_eq!(
            classify_group(StageKind::DoubleElimination, 2),
            GroupKind::LoserBracket
        );
        assert_eq!(
            classify_group(StageKind::DoubleElimination, 3),
            GroupKind::FinalGroup
        );
    }

    #[test]
    fn loser_bracket_round_count_for_eight() {
        assert_eq!(loser_bracket_round_count(8), 4);
    }

    #[test]
    fn loser_bracket_match_counts_follow_the_doubled_pattern() {
        assert_eq!(loser_bracket_match_counts(8), vec![2, 2, 1, 1]);
        assert_eq!(loser_bracket_match_counts(16), vec![4, 4, 2, 2, 1, 1]);
    }

    #[test]
    fn wb_round_maps_to_lb_round() {
        assert_eq!(wb_round_to_lb_round(1), 1);
        assert_eq!(wb_round_to_lb_round(2), 2);
        assert_eq!(wb_round_to_lb_round(3), 4);
    }

    #[test]
    fn loser_match_number_pairs_round_one_by_diagonal() {
        let ordering = crate::ordering::default_loser_bracket_ordering(8);
        assert_eq!(find_loser_match_number(1, 1, 4, &ordering), 1);
        assert_eq!(find_loser_match_number(1, 2, 4, &ordering), 1);
        assert_eq!(find_loser_match_number(1, 3, 4, &ordering), 2);
        assert_eq!(find_loser_match_number(1, 4, 4, &ordering), 2);
    }

    #[test]
    fn loser_match_number_honors_a_non_identity_round_ordering() {
        // size-8 default is [natural, reverse, natural]; WB round 2 (index 1) reverses
        // its two losers before they drop into LB round 2's two matches.
        let ordering = crate::ordering::default_loser_bracket_ordering(8);
        assert_eq!(find_loser_match_number(2, 1, 2, &ordering), 2);
        assert_eq!(find_loser_match_number(2, 2, 2, &ordering), 1);
    }

    #[test]
    fn loser_bracket_sources_inverts_find_loser_match_number() {
        let ordering = crate::ordering::default_loser_bracket_ordering(8);
        for wb_round in 1..=3u32 {
            let count = 8 / 2u32.pow(wb_round);
            for wb_match in 1..=count {
                let lb_match = find_loser_match_number(wb_round, wb_match, count, &ordering);
                let (a, b) = loser_bracket_sources(wb_round, lb_match, count, &ordering);
                assert!(a == wb_match || b == Some(wb_match), "wb_round={wb_round} wb_match={wb_match} lb_match={lb_match} got ({a}, {b:?})");
            }
        }
    }
}
