//! Stage construction (§4.2, Component F): turns a `StageSettings` plus a resolved
//! seeding (`None` = BYE) into the full `Group`/`Round`/`Match` skeleton for a stage.
//!
//! Creation only fills in what's structurally known at construction time — round 1's
//! opponents, and BYE-completed status where a slot is permanently empty. Winner/loser
//! propagation through the rest of the bracket (including BYE cascades past round 1) is
//! `update::propagate_bye_winners`'s job, run once by the engine immediately after a
//! freshly created stage is persisted; creation and propagation share that one code
//! path rather than each re-implementing the navigation rules.

use crate::error::{BracketError, Result};
use crate::model::{
    Group, GroupId, Match, MatchId, Opponent, ParticipantId, Round, RoundId, Stage, StageId,
    StageKind, StageSettings, TournamentId,
};
use crate::ordering::{default_first_round_ordering, resolve_loser_bracket_ordering, OrderingMethod};
use crate::semantics::compute_status_from_opponents;
use crate::topology::helpers::{
    lb_round_to_wb_round, loser_bracket_match_counts, loser_bracket_sources, next_power_of_two,
    single_elimination_round_count,
};
use crate::topology::round_robin::{double_round_robin, round_robin_pairings};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CreatedStage {
    pub stage: Stage,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
}

/// Builds a full stage skeleton. `seeds[i] == None` is a BYE at seed position `i`;
/// `seeds` is in natural seed order (seed 1 first) — ordering permutations are applied
/// internally per `settings.seed_ordering`.
pub fn create_stage(
    tournament_id: TournamentId,
    name: String,
    kind: StageKind,
    number: u32,
    settings: StageSettings,
    seeds: Vec<Option<ParticipantId>>,
) -> Result<CreatedStage> {
    let stage_id = StageId::new();
    let stage = Stage {
        id: stage_id,
        tournament_id,
        name,
        kind,
        number,
        settings: settings.clone(),
    };
    debug!(stage_id = %stage_id, kind = ?kind, participants = seeds.len(), "creating stage");

    match kind {
        StageKind::RoundRobin => create_round_robin(stage, seeds),
        StageKind::SingleElimination => create_single_elimination(stage, seeds),
        StageKind::DoubleElimination => create_double_elimination(stage, seeds),
    }
}

/// BYE balancing (§4.2 `balanceByes`): rearranges a bracket-sized, already-padded
/// seeding so round 1 has no BYE-vs-BYE match. `seeds` must already be padded to `cap`
/// entries; only the relative order of the non-`None` entries among themselves and the
/// placement of `None` padding changes.
fn rebalance_byes(
    seeds: Vec<Option<ParticipantId>>,
    cap: u32,
) -> Vec<Option<ParticipantId>> {
    let values: Vec<ParticipantId> = seeds.into_iter().flatten().collect();
    let n = values.len();
    let cap = cap as usize;
    if n == 0 {
        return vec![None; cap];
    }
    if n <= cap / 2 {
        let mut out = Vec::with_capacity(cap);
        for v in &values {
            out.push(Some(*v));
            out.push(None);
        }
        out.resize(cap, None);
        return out;
    }
    let null_count = cap - n;
    let mut out = Vec::with_capacity(cap);
    // `n - null_count` head entries pair up with each other (no BYE needed)...
    out.extend(values[..n - null_count].iter().map(|v| Some(*v)));
    // ...the remaining `null_count` entries each get a BYE partner.
    for v in &values[n - null_count..] {
        out.push(Some(*v));
        out.push(None);
    }
    out
}

fn ordered_seeds(
    seeds: Vec<Option<ParticipantId>>,
    ordering: &[OrderingMethod],
    group_count: Option<u32>,
) -> Result<Vec<Option<ParticipantId>>> {
    match ordering.first() {
        Some(method) => method.apply(&seeds, group_count),
        None => Ok(seeds),
    }
}

/// Like [`ordered_seeds`], but carries each slot's pre-ordering seed number (`i+1`)
/// through the permutation alongside its id (§4.2 step 3 assigns `position = i+1` before
/// step 4 applies the ordering, so the two travel together). Used for single/double
/// elimination round 1, where `position` is later read back by `get.seeding`.
fn ordered_seeds_with_positions(
    seeds: Vec<Option<ParticipantId>>,
    ordering: &[OrderingMethod],
) -> Result<Vec<(Option<ParticipantId>, u32)>> {
    let indexed: Vec<(Option<ParticipantId>, u32)> = seeds
        .into_iter()
        .enumerate()
        .map(|(i, s)| (s, i as u32 + 1))
        .collect();
    match ordering.first() {
        Some(method) => method.apply(&indexed, None),
        None => Ok(indexed),
    }
}

fn new_match(
    stage_id: StageId,
    tournament_id: TournamentId,
    group_id: GroupId,
    round_id: RoundId,
    number: u32,
    o1: Option<ParticipantId>,
    o2: Option<ParticipantId>,
    child_count: u32,
) -> Match {
    new_match_with_positions(stage_id, tournament_id, group_id, round_id, number, (o1, None), (o2, None), child_count)
}

/// Like [`new_match`], but records each slot's origin seed `position` (§4.2 "Round 1
/// matches record the seed `position` on each slot") so `get.seeding` can recover the
/// original seed order after an ordering permutation has scattered it across matches.
#[allow(clippy::too_many_arguments)]
fn new_match_with_positions(
    stage_id: StageId,
    tournament_id: TournamentId,
    group_id: GroupId,
    round_id: RoundId,
    number: u32,
    (o1, p1): (Option<ParticipantId>, Option<u32>),
    (o2, p2): (Option<ParticipantId>, Option<u32>),
    child_count: u32,
) -> Match {
    let opponent1 = o1.map(|id| Opponent { position: p1, ..Opponent::of(id) });
    let opponent2 = o2.map(|id| Opponent { position: p2, ..Opponent::of(id) });
    let status = compute_status_from_opponents(&opponent1, &opponent2);
    Match {
        id: MatchId::new(),
        stage_id,
        tournament_id,
        group_id,
        round_id,
        number,
        status,
        opponent1,
        opponent2,
        child_count,
        extra: Default::default(),
    }
}

fn tbd_match(
    stage_id: StageId,
    tournament_id: TournamentId,
    group_id: GroupId,
    round_id: RoundId,
    number: u32,
    child_count: u32,
) -> Match {
    tbd_match_with_positions(stage_id, tournament_id, group_id, round_id, number, child_count, None, None)
}

/// A TBD match whose slots record which upstream match number will eventually drop
/// into them (§4.4 "loser_bracket previous" reads these `position`s back to recover the
/// originating winner-bracket match without a stored edge).
#[allow(clippy::too_many_arguments)]
fn tbd_match_with_positions(
    stage_id: StageId,
    tournament_id: TournamentId,
    group_id: GroupId,
    round_id: RoundId,
    number: u32,
    child_count: u32,
    position1: Option<u32>,
    position2: Option<u32>,
) -> Match {
    let mut opponent1 = Opponent::tbd();
    opponent1.position = position1;
    let mut opponent2 = Opponent::tbd();
    opponent2.position = position2;
    Match {
        id: MatchId::new(),
        stage_id,
        tournament_id,
        group_id,
        round_id,
        number,
        status: crate::model::MatchStatus::Locked,
        opponent1: Some(opponent1),
        opponent2: Some(opponent2),
        child_count,
        extra: Default::default(),
    }
}

fn create_round_robin(stage: Stage, seeds: Vec<Option<ParticipantId>>) -> Result<CreatedStage> {
    let group_count = stage.settings.group_count.unwrap_or(1).max(1);
    let ordering = stage
        .settings
        .seed_ordering
        .clone()
        .unwrap_or_else(|| vec![OrderingMethod::Natural]);
    let mut seeds = ordered_seeds(seeds, &ordering, Some(group_count))?;
    if seeds.len() % 2 == 1 {
        seeds.push(None);
    }

    let per_group = seeds.len() / group_count as usize;
    let mut groups = Vec::new();
    let mut rounds = Vec::new();
    let mut matches = Vec::new();

    for g in 0..group_count {
        let group_id = GroupId::new();
        groups.push(Group {
            id: group_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            number: g + 1,
        });
        let start = g as usize * per_group;
        let end = if g + 1 == group_count {
            seeds.len()
        } else {
            start + per_group
        };
        let mut group_seeds = seeds[start..end].to_vec();
        // `manualOrdering` (round-robin only, §3): an explicit per-group permutation of
        // 0-based indices into this group's already-padded seeding, overriding whatever
        // `seedOrdering` produced for this group.
        if let Some(permutation) = stage
            .settings
            .manual_ordering
            .as_ref()
            .and_then(|groups| groups.get(g as usize))
        {
            group_seeds = permutation
                .iter()
                .map(|&i| group_seeds.get(i).copied().flatten())
                .collect();
        }

        let mut schedule = round_robin_pairings(&group_seeds);
        if stage.settings.round_robin_mode() == crate::model::RoundRobinMode::Double {
            schedule = double_round_robin(schedule);
        }

        for (r, round_pairs) in schedule.into_iter().enumerate() {
            let round_id = RoundId::new();
            rounds.push(Round {
                id: round_id,
                stage_id: stage.id,
                tournament_id: stage.tournament_id,
                group_id,
                number: r as u32 + 1,
            });
            // §4.2: a round-robin pairing where both slots are BYE never gets a match
            // persisted for it at all (as opposed to elimination stages, where a BYE
            // always still occupies a real match that auto-completes).
            let mut m = 0u32;
            for (a, b) in round_pairs {
                if a.is_none() && b.is_none() {
                    continue;
                }
                m += 1;
                matches.push(new_match(
                    stage.id,
                    stage.tournament_id,
                    group_id,
                    round_id,
                    m,
                    a,
                    b,
                    stage.settings.default_child_count(),
                ));
            }
        }
    }

    Ok(CreatedStage {
        stage,
        groups,
        rounds,
        matches,
    })
}

fn create_single_elimination(stage: Stage, seeds: Vec<Option<ParticipantId>>) -> Result<CreatedStage> {
    let participant_count = seeds.iter().filter(|s| s.is_some()).count() as u32;
    let bracket_size = stage
        .settings
        .size
        .unwrap_or_else(|| next_power_of_two(participant_count.max(seeds.len() as u32)));
    if !crate::topology::helpers::is_power_of_two(bracket_size) {
        return Err(BracketError::invalid_input(
            "single elimination bracket size must be a power of two",
        ));
    }

    let ordering = stage
        .settings
        .seed_ordering
        .clone()
        .unwrap_or_else(|| vec![default_first_round_ordering()]);
    let mut seeds = seeds;
    seeds.resize(bracket_size as usize, None);
    if stage.settings.balances_byes() {
        seeds = rebalance_byes(seeds, bracket_size);
    }
    let seeds = ordered_seeds_with_positions(seeds, &ordering)?;

    let group_id = GroupId::new();
    let mut groups = vec![Group {
        id: group_id,
        stage_id: stage.id,
        tournament_id: stage.tournament_id,
        number: 1,
    }];
    let mut rounds = Vec::new();
    let mut matches = Vec::new();

    let round_count = single_elimination_round_count(bracket_size);
    let mut match_count = bracket_size / 2;
    for r in 0..round_count {
        let round_id = RoundId::new();
        rounds.push(Round {
            id: round_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            group_id,
            number: r + 1,
        });
        for m in 0..match_count {
            let child_count = stage.settings.default_child_count();
            let new = if r == 0 {
                let (a, pa) = seeds[(2 * m) as usize];
                let (b, pb) = seeds[(2 * m + 1) as usize];
                new_match_with_positions(
                    stage.id,
                    stage.tournament_id,
                    group_id,
                    round_id,
                    m + 1,
                    (a, Some(pa)),
                    (b, Some(pb)),
                    child_count,
                )
            } else {
                tbd_match(stage.id, stage.tournament_id, group_id, round_id, m + 1, child_count)
            };
            matches.push(new);
        }
        match_count /= 2;
    }

    if stage.settings.has_consolation_final() {
        let consolation_group_id = GroupId::new();
        groups.push(Group {
            id: consolation_group_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            number: 2,
        });
        let round_id = RoundId::new();
        rounds.push(Round {
            id: round_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            group_id: consolation_group_id,
            number: 1,
        });
        matches.push(tbd_match(
            stage.id,
            stage.tournament_id,
            consolation_group_id,
            round_id,
            1,
            stage.settings.default_child_count(),
        ));
    }

    Ok(CreatedStage {
        stage,
        groups,
        rounds,
        matches,
    })
}

fn create_double_elimination(mut stage: Stage, seeds: Vec<Option<ParticipantId>>) -> Result<CreatedStage> {
    let participant_count = seeds.iter().filter(|s| s.is_some()).count() as u32;
    let bracket_size = stage
        .settings
        .size
        .unwrap_or_else(|| next_power_of_two(participant_count.max(seeds.len() as u32)));
    if !crate::topology::helpers::is_power_of_two(bracket_size) {
        return Err(BracketError::invalid_input(
            "double elimination bracket size must be a power of two",
        ));
    }
    // §4.4/§9 Q4: the WB→LB match-number inversion depends on the per-round loser
    // ordering; resolve it once here (falling back to the §4.1 per-size default table)
    // so both the positions recorded below and the persisted settings agree with what
    // `navigation::winner_bracket_next` will later invert.
    let lb_ordering = resolve_loser_bracket_ordering(stage.settings.seed_ordering.as_deref(), bracket_size);
    let first_round_ordering = stage
        .settings
        .seed_ordering
        .as_ref()
        .and_then(|v| v.first())
        .copied()
        .unwrap_or_else(default_first_round_ordering);
    let mut resolved_ordering = vec![first_round_ordering];
    resolved_ordering.extend(lb_ordering.iter().copied());
    stage.settings.seed_ordering = Some(resolved_ordering);

    let loser_group_id = GroupId::new();
    let mut skip_first_round_losers: Vec<Option<ParticipantId>> = Vec::new();

    // Winner bracket: identical shape to a single-elimination stage, except that when
    // `skipFirstRound` is set the odd-positioned seeds never enter the WB at all — they
    // are routed straight into LB round 1 below, and the WB itself is built one round
    // smaller, over only the even-positioned half (§4.2 "skip-first-round variant").
    let wb_seeds = if stage.settings.skips_first_round() {
        let mut padded = seeds.clone();
        padded.resize(bracket_size as usize, None);
        let (evens, odds): (Vec<_>, Vec<_>) = padded
            .into_iter()
            .enumerate()
            .partition(|(i, _)| i % 2 == 0);
        skip_first_round_losers = odds.into_iter().map(|(_, s)| s).collect();
        evens.into_iter().map(|(_, s)| s).collect()
    } else {
        seeds
    };
    let wb_stage = Stage {
        settings: StageSettings {
            size: Some(if stage.settings.skips_first_round() {
                bracket_size / 2
            } else {
                bracket_size
            }),
            ..stage.settings.clone()
        },
        ..stage.clone()
    };
    let wb = create_single_elimination(wb_stage, wb_seeds)?;
    let winner_group_id = wb.groups[0].id;
    let mut groups = vec![Group {
        number: 1,
        ..wb.groups[0].clone()
    }];
    let mut rounds = wb.rounds;
    let mut matches = wb.matches;

    // Loser bracket: `loser_bracket_round_count` rounds, alternating major (the bracket
    // playing itself down) and minor (merging in the matching winner-bracket round's
    // drop-ins) rounds, per `loser_bracket_match_counts` (§3 invariant 6). Every slot
    // starts TBD except round 1 under `skipFirstRound`, which is seeded directly from
    // the odd-positioned seeds that never played a WB match; `update::propagate_bye_winners`
    // and ordinary match completion wire every other drop-down in via `navigation`.
    groups.push(Group {
        id: loser_group_id,
        stage_id: stage.id,
        tournament_id: stage.tournament_id,
        number: 2,
    });
    let lb_counts = loser_bracket_match_counts(bracket_size);
    for (idx, &count) in lb_counts.iter().enumerate() {
        let round_number = idx as u32 + 1;
        let round_id = RoundId::new();
        rounds.push(Round {
            id: round_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            group_id: loser_group_id,
            number: round_number,
        });
        for m in 0..count {
            let new = if round_number == 1 && !skip_first_round_losers.is_empty() {
                let a = skip_first_round_losers.get(2 * m as usize).copied().flatten();
                let b = skip_first_round_losers
                    .get(2 * m as usize + 1)
                    .copied()
                    .flatten();
                new_match(
                    stage.id,
                    stage.tournament_id,
                    loser_group_id,
                    round_id,
                    m + 1,
                    a,
                    b,
                    stage.settings.default_child_count(),
                )
            } else if round_number == 1 {
                // Round 1 is seeded straight from WB round 1: match `m+1` absorbs the
                // losers of the two WB round-1 matches that the loser ordering's
                // inversion (`findLoserMatchNumber`, §4.4) pairs into it.
                let wb_round_match_count = bracket_size / 2;
                let (p1, p2) = loser_bracket_sources(1, m + 1, wb_round_match_count, &lb_ordering);
                tbd_match_with_positions(
                    stage.id,
                    stage.tournament_id,
                    loser_group_id,
                    round_id,
                    m + 1,
                    stage.settings.default_child_count(),
                    Some(p1),
                    p2,
                )
            } else if crate::topology::helpers::is_minor_loser_round(round_number) {
                // A minor round's opponent1 receives the matching winner-bracket
                // round's drop-in per the same ordering inversion (§4.5); opponent2 is
                // the previous LB round's winner, which has no WB match number to record.
                let wb_round = lb_round_to_wb_round(round_number);
                let wb_round_match_count = bracket_size >> wb_round;
                let (p1, _) = loser_bracket_sources(wb_round, m + 1, wb_round_match_count, &lb_ordering);
                tbd_match_with_positions(
                    stage.id,
                    stage.tournament_id,
                    loser_group_id,
                    round_id,
                    m + 1,
                    stage.settings.default_child_count(),
                    Some(p1),
                    None,
                )
            } else {
                tbd_match(
                    stage.id,
                    stage.tournament_id,
                    loser_group_id,
                    round_id,
                    m + 1,
                    stage.settings.default_child_count(),
                )
            };
            matches.push(new);
        }
    }

    // Final group: the grand final, plus (per `GrandFinalKind::Double`) its reset match.
    let final_group_id = GroupId::new();
    groups.push(Group {
        id: final_group_id,
        stage_id: stage.id,
        tournament_id: stage.tournament_id,
        number: 3,
    });
    let final_round_id = RoundId::new();
    rounds.push(Round {
        id: final_round_id,
        stage_id: stage.id,
        tournament_id: stage.tournament_id,
        group_id: final_group_id,
        number: 1,
    });
    matches.push(tbd_match(
        stage.id,
        stage.tournament_id,
        final_group_id,
        final_round_id,
        1,
        stage.settings.default_child_count(),
    ));
    if stage.settings.grand_final() == crate::model::GrandFinalKind::Double {
        let reset_round_id = RoundId::new();
        rounds.push(Round {
            id: reset_round_id,
            stage_id: stage.id,
            tournament_id: stage.tournament_id,
            group_id: final_group_id,
            number: 2,
        });
        matches.push(tbd_match(
            stage.id,
            stage.tournament_id,
            final_group_id,
            reset_round_id,
            1,
            stage.settings.default_child_count(),
        ));
    }

    let _ = winner_group_id; // kept for symmetry/readability with the other group ids above

    Ok(CreatedStage {
        stage,
        groups,
        rounds,
        matches,
    })
}
