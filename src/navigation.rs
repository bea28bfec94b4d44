//! Navigation (§4.4) and side selection (§4.5): given a match's location within its
//! stage, computes the previous/next matches across round-robin, single-elimination and
//! double-elimination topologies, and which side of a next match a propagated result
//! lands on.
//!
//! Every function here is pure over a [`StageShape`] — the handful of per-stage facts
//! navigation needs beyond the match's own `(round, number)` — plus, where a rule reads
//! a slot's recorded `position` (the loser-bracket round-1 and minor-round previous
//! rules), the `Match` itself. None of this module touches storage; `update` resolves a
//! [`NextRef`] back into a concrete row.

use crate::model::{GrandFinalKind, Match, Side, StageKind};
use crate::ordering::OrderingMethod;
use crate::topology::helpers::{
    diagonal, find_loser_match_number, is_major_loser_round, is_minor_loser_round,
    lb_round_to_wb_round, wb_round_to_lb_round,
};

pub use crate::topology::helpers::GroupKind;

/// The per-stage facts navigation needs beyond a match's own `(round, number)`.
/// Assembled by `engine`/`query` from the stage's settings and actual row counts.
#[derive(Debug, Clone, Copy)]
pub struct StageShape {
    pub stage_kind: StageKind,
    /// Rounds in the single bracket (single-elimination) or winner bracket
    /// (double-elimination).
    pub bracket_round_count: u32,
    /// Rounds in the loser bracket; `0` for stages that don't have one.
    pub loser_round_count: u32,
    pub has_consolation_final: bool,
    pub grand_final: GrandFinalKind,
    pub skip_first_round: bool,
    /// The resolved per-winner-bracket-round loser-bracket ordering (§4.1/§4.4),
    /// indexed by `wb_round - 1`; empty for stages without a loser bracket. See
    /// [`crate::ordering::resolve_loser_bracket_ordering`].
    pub loser_bracket_ordering: Vec<OrderingMethod>,
}

/// A location this match's result propagates to, or one its own previous matches came
/// from — a `(group, round, number)` triple, not yet resolved against storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRef {
    pub group: GroupKind,
    pub round: u32,
    pub number: u32,
}

/// The matches that feed into `(group, round, number)`, per §4.4's per-group table.
/// `m` is the match at that location itself — only read for the loser-bracket rules
/// that recover a winner-bracket match number from a slot's recorded `position`.
pub fn previous_matches(shape: &StageShape, group: GroupKind, m: &Match, round: u32, number: u32) -> Vec<NextRef> {
    match group {
        GroupKind::SingleBracket => bracket_previous(GroupKind::SingleBracket, round, number),
        GroupKind::WinnerBracket => bracket_previous(GroupKind::WinnerBracket, round, number),
        GroupKind::LoserBracket => loser_bracket_previous(shape, m, round, number),
        GroupKind::FinalGroup => final_group_previous(shape, round),
    }
}

/// The matches that `(group, round, number)` feeds into, per §4.4's per-group table.
/// Index 0 is always the "primary" progression target (the winner's destination, or for
/// `final_group` the only destination); index 1, when present, is the second element
/// described by §4.5 ("the loser drops to...").
pub fn next_matches(shape: &StageShape, group: GroupKind, round: u32, number: u32) -> Vec<NextRef> {
    match group {
        GroupKind::SingleBracket => single_bracket_next(shape, round, number),
        GroupKind::WinnerBracket => winner_bracket_next(shape, round, number),
        GroupKind::LoserBracket => loser_bracket_next(shape, round, number),
        GroupKind::FinalGroup => final_group_next(shape, round),
    }
}

fn bracket_previous(group: GroupKind, round: u32, number: u32) -> Vec<NextRef> {
    if round == 1 {
        return Vec::new();
    }
    vec![
        NextRef { group, round: round - 1, number: 2 * number - 1 },
        NextRef { group, round: round - 1, number: 2 * number },
    ]
}

fn single_bracket_next(shape: &StageShape, round: u32, number: u32) -> Vec<NextRef> {
    let round_count = shape.bracket_round_count;
    if round == round_count {
        // The championship match has no successor: a single-elimination stage's last
        // round already crowns the winner (see DESIGN.md's resolution of the
        // single_bracket-vs-winner_bracket "next at roundCount" question).
        return Vec::new();
    }
    let mut next = vec![NextRef {
        group: GroupKind::SingleBracket,
        round: round + 1,
        number: diagonal(number),
    }];
    if round + 1 == round_count && shape.has_consolation_final {
        next.push(NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 });
    }
    next
}

fn winner_bracket_next(shape: &StageShape, round: u32, number: u32) -> Vec<NextRef> {
    let round_count = shape.bracket_round_count;
    let mut next = Vec::new();
    if round == round_count {
        if shape.grand_final != GrandFinalKind::None {
            next.push(NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 });
        }
    } else {
        next.push(NextRef {
            group: GroupKind::WinnerBracket,
            round: round + 1,
            number: diagonal(number),
        });
    }
    if shape.loser_round_count > 0 {
        let lb_round = wb_round_to_lb_round(round);
        let wb_round_match_count = 1u32 << round_count.saturating_sub(round);
        let lb_number = find_loser_match_number(round, number, wb_round_match_count, &shape.loser_bracket_ordering);
        next.push(NextRef { group: GroupKind::LoserBracket, round: lb_round, number: lb_number });
    }
    next
}

fn loser_bracket_next(shape: &StageShape, round: u32, number: u32) -> Vec<NextRef> {
    let round_count = shape.loser_round_count;
    if round == round_count {
        let mut next = Vec::new();
        if shape.grand_final != GrandFinalKind::None {
            next.push(NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 });
        }
        return next;
    }
    if is_minor_loser_round(round) {
        vec![NextRef { group: GroupKind::LoserBracket, round: round + 1, number: diagonal(number) }]
    } else {
        vec![NextRef { group: GroupKind::LoserBracket, round: round + 1, number }]
    }
}

fn loser_bracket_previous(shape: &StageShape, m: &Match, round: u32, number: u32) -> Vec<NextRef> {
    if round == 1 {
        if shape.skip_first_round {
            // Seeded directly from the original seeding under `skipFirstRound`; there is
            // no winner-bracket round 1 to point back to.
            return Vec::new();
        }
        let mut previous = Vec::new();
        if let Some(pos) = m.opponent1.as_ref().and_then(|o| o.position) {
            previous.push(NextRef { group: GroupKind::WinnerBracket, round: 1, number: pos });
        }
        if let Some(pos) = m.opponent2.as_ref().and_then(|o| o.position) {
            previous.push(NextRef { group: GroupKind::WinnerBracket, round: 1, number: pos });
        }
        return previous;
    }
    if is_minor_loser_round(round) {
        let wb_round = lb_round_to_wb_round(round);
        let wb_number = m.opponent1.as_ref().and_then(|o| o.position).unwrap_or(number);
        vec![
            NextRef { group: GroupKind::WinnerBracket, round: wb_round, number: wb_number },
            NextRef { group: GroupKind::LoserBracket, round: round - 1, number },
        ]
    } else {
        vec![
            NextRef { group: GroupKind::LoserBracket, round: round - 1, number: 2 * number - 1 },
            NextRef { group: GroupKind::LoserBracket, round: round - 1, number: 2 * number },
        ]
    }
}

fn final_group_previous(shape: &StageShape, round: u32) -> Vec<NextRef> {
    match shape.stage_kind {
        StageKind::SingleElimination => {
            let semifinal_round = shape.bracket_round_count.saturating_sub(1).max(1);
            vec![
                NextRef { group: GroupKind::SingleBracket, round: semifinal_round, number: 1 },
                NextRef { group: GroupKind::SingleBracket, round: semifinal_round, number: 2 },
            ]
        }
        StageKind::DoubleElimination => {
            if round == 1 {
                vec![
                    NextRef {
                        group: GroupKind::WinnerBracket,
                        round: shape.bracket_round_count,
                        number: 1,
                    },
                    NextRef {
                        group: GroupKind::LoserBracket,
                        round: shape.loser_round_count,
                        number: 1,
                    },
                ]
            } else {
                vec![NextRef { group: GroupKind::FinalGroup, round: round - 1, number: 1 }]
            }
        }
        StageKind::RoundRobin => Vec::new(),
    }
}

fn final_group_next(shape: &StageShape, round: u32) -> Vec<NextRef> {
    if shape.stage_kind == StageKind::DoubleElimination
        && shape.grand_final == GrandFinalKind::Double
        && round == 1
    {
        vec![NextRef { group: GroupKind::FinalGroup, round: 2, number: 1 }]
    } else {
        Vec::new()
    }
}

/// §4.5's default/exception side rule for the *primary* next match (`next[0]`).
/// `final_group` targets are special-cased by the caller (`update::propagate`), which
/// copies both slots verbatim instead of picking one side.
pub fn primary_next_side(from_group: GroupKind, from_number: u32, to: &NextRef) -> Side {
    let exception = match to.group {
        GroupKind::LoserBracket => is_major_loser_round(to.round),
        GroupKind::FinalGroup => from_group == GroupKind::LoserBracket,
        _ => false,
    };
    if exception {
        Side::Opponent2
    } else {
        Side::alternate_by(from_number)
    }
}

/// §4.5's side rule for the *second* next-match target, when one exists: the
/// consolation-final entry from a single-elimination semi-final, or the loser-bracket
/// entry dropped from a winner-bracket match.
pub fn secondary_next_side(from_group: GroupKind, from_round: u32, from_number: u32) -> Side {
    match from_group {
        GroupKind::WinnerBracket if from_round > 1 => Side::Opponent1,
        _ => Side::alternate_by(from_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(stage_kind: StageKind) -> StageShape {
        StageShape {
            stage_kind,
            bracket_round_count: 3,
            loser_round_count: 4,
            has_consolation_final: false,
            grand_final: GrandFinalKind::Simple,
            skip_first_round: false,
            loser_bracket_ordering: vec![OrderingMethod::Natural; 3],
        }
    }

    #[test]
    fn single_bracket_diagonal_progression() {
        let s = shape(StageKind::SingleElimination);
        let next = single_bracket_next(&s, 1, 3);
        assert_eq!(next, vec![NextRef { group: GroupKind::SingleBracket, round: 2, number: 2 }]);
    }

    #[test]
    fn single_bracket_championship_has_no_next() {
        let s = shape(StageKind::SingleElimination);
        assert!(single_bracket_next(&s, 3, 1).is_empty());
    }

    #[test]
    fn single_bracket_semifinal_feeds_consolation_too() {
        let mut s = shape(StageKind::SingleElimination);
        s.has_consolation_final = true;
        let next = single_bracket_next(&s, 2, 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next[1], NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 });
    }

    #[test]
    fn winner_bracket_round_one_drops_two_losers_into_one_lb_match() {
        let s = shape(StageKind::DoubleElimination);
        let from_m1 = winner_bracket_next(&s, 1, 1);
        let from_m2 = winner_bracket_next(&s, 1, 2);
        assert_eq!(from_m1[1], NextRef { group: GroupKind::LoserBracket, round: 1, number: 1 });
        assert_eq!(from_m2[1], NextRef { group: GroupKind::LoserBracket, round: 1, number: 1 });
    }

    #[test]
    fn winner_bracket_next_inverts_a_non_identity_loser_ordering() {
        // WB round 2 of a size-8 bracket has 2 matches; reversing their loser order
        // (as the size-8 default table does at round index 1) swaps which LB match
        // each match's loser drops into, rather than the identity `number` passthrough.
        let mut s = shape(StageKind::DoubleElimination);
        s.loser_bracket_ordering = crate::ordering::default_loser_bracket_ordering(8);
        let next = winner_bracket_next(&s, 2, 1);
        assert_eq!(next[1], NextRef { group: GroupKind::LoserBracket, round: 2, number: 2 });
        let next = winner_bracket_next(&s, 2, 2);
        assert_eq!(next[1], NextRef { group: GroupKind::LoserBracket, round: 2, number: 1 });
    }

    #[test]
    fn winner_bracket_later_rounds_drop_in_parallel() {
        let s = shape(StageKind::DoubleElimination);
        let next = winner_bracket_next(&s, 2, 1);
        assert_eq!(next[1], NextRef { group: GroupKind::LoserBracket, round: 2, number: 1 });
    }

    #[test]
    fn winner_bracket_final_feeds_grand_final_and_loser_bracket_final() {
        let s = shape(StageKind::DoubleElimination);
        let next = winner_bracket_next(&s, 3, 1);
        assert_eq!(next[0], NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 });
        assert_eq!(next[1], NextRef { group: GroupKind::LoserBracket, round: 4, number: 1 });
    }

    #[test]
    fn loser_bracket_minor_round_merges_diagonally_into_next_major() {
        let s = shape(StageKind::DoubleElimination);
        let next = loser_bracket_next(&s, 2, 3);
        assert_eq!(next, vec![NextRef { group: GroupKind::LoserBracket, round: 3, number: 2 }]);
    }

    #[test]
    fn loser_bracket_major_round_feeds_parallel_into_next_minor() {
        let s = shape(StageKind::DoubleElimination);
        let next = loser_bracket_next(&s, 1, 2);
        assert_eq!(next, vec![NextRef { group: GroupKind::LoserBracket, round: 2, number: 2 }]);
    }

    #[test]
    fn loser_bracket_final_feeds_grand_final() {
        let s = shape(StageKind::DoubleElimination);
        let next = loser_bracket_next(&s, 4, 1);
        assert_eq!(next, vec![NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 }]);
    }

    #[test]
    fn loser_bracket_round_one_previous_reads_recorded_positions() {
        let s = shape(StageKind::DoubleElimination);
        let mut m = test_match(1);
        m.opponent1.as_mut().unwrap().position = Some(1);
        m.opponent2.as_mut().unwrap().position = Some(2);
        let previous = loser_bracket_previous(&s, &m, 1, 1);
        assert_eq!(
            previous,
            vec![
                NextRef { group: GroupKind::WinnerBracket, round: 1, number: 1 },
                NextRef { group: GroupKind::WinnerBracket, round: 1, number: 2 },
            ]
        );
    }

    #[test]
    fn loser_bracket_skip_first_round_has_no_previous() {
        let mut s = shape(StageKind::DoubleElimination);
        s.skip_first_round = true;
        let m = test_match(1);
        assert!(loser_bracket_previous(&s, &m, 1, 1).is_empty());
    }

    #[test]
    fn loser_bracket_minor_round_previous_combines_wb_and_lb() {
        let s = shape(StageKind::DoubleElimination);
        let mut m = test_match(2);
        m.opponent1.as_mut().unwrap().position = Some(2);
        let previous = loser_bracket_previous(&s, &m, 2, 2);
        assert_eq!(
            previous,
            vec![
                NextRef { group: GroupKind::WinnerBracket, round: 2, number: 2 },
                NextRef { group: GroupKind::LoserBracket, round: 1, number: 2 },
            ]
        );
    }

    #[test]
    fn loser_bracket_major_round_previous_is_standard_split() {
        let s = shape(StageKind::DoubleElimination);
        let m = test_match(2);
        let previous = loser_bracket_previous(&s, &m, 3, 2);
        assert_eq!(
            previous,
            vec![
                NextRef { group: GroupKind::LoserBracket, round: 2, number: 3 },
                NextRef { group: GroupKind::LoserBracket, round: 2, number: 4 },
            ]
        );
    }

    #[test]
    fn final_group_previous_for_double_elimination_grand_final() {
        let s = shape(StageKind::DoubleElimination);
        let previous = final_group_previous(&s, 1);
        assert_eq!(
            previous,
            vec![
                NextRef { group: GroupKind::WinnerBracket, round: 3, number: 1 },
                NextRef { group: GroupKind::LoserBracket, round: 4, number: 1 },
            ]
        );
    }

    #[test]
    fn final_group_next_only_continues_for_double_grand_final_game_one() {
        let mut s = shape(StageKind::DoubleElimination);
        s.grand_final = GrandFinalKind::Double;
        assert_eq!(
            final_group_next(&s, 1),
            vec![NextRef { group: GroupKind::FinalGroup, round: 2, number: 1 }]
        );
        assert!(final_group_next(&s, 2).is_empty());
    }

    #[test]
    fn primary_side_alternates_by_default() {
        let to = NextRef { group: GroupKind::SingleBracket, round: 2, number: 1 };
        assert_eq!(primary_next_side(GroupKind::SingleBracket, 1, &to), Side::Opponent1);
        assert_eq!(primary_next_side(GroupKind::SingleBracket, 2, &to), Side::Opponent2);
    }

    #[test]
    fn primary_side_is_opponent2_into_a_major_loser_round() {
        let to = NextRef { group: GroupKind::LoserBracket, round: 3, number: 1 };
        assert_eq!(primary_next_side(GroupKind::LoserBracket, 4, &to), Side::Opponent2);
    }

    #[test]
    fn primary_side_is_opponent2_from_loser_bracket_into_grand_final() {
        let to = NextRef { group: GroupKind::FinalGroup, round: 1, number: 1 };
        assert_eq!(primary_next_side(GroupKind::LoserBracket, 1, &to), Side::Opponent2);
    }

    #[test]
    fn secondary_side_for_winner_bracket_drop_in() {
        assert_eq!(secondary_next_side(GroupKind::WinnerBracket, 1, 2), Side::Opponent2);
        assert_eq!(secondary_next_side(GroupKind::WinnerBracket, 2, 1), Side::Opponent1);
    }

    fn test_match(number: u32) -> Match {
        use crate::model::{GroupId, MatchId, Opponent, ParticipantId, RoundId, StageId, TournamentId};
        Match {
            id: MatchId::new(),
            stage_id: StageId::new(),
            tournament_id: TournamentId::new(),
            group_id: GroupId::new(),
            round_id: RoundId::new(),
            number,
            status: crate::model::MatchStatus::Waiting,
            opponent1: Some(Opponent::of(ParticipantId::new())),
            opponent2: Some(Opponent::of(ParticipantId::new())),
            child_count: 0,
            extra: Default::default(),
        }
    }
}
