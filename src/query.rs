//! The query surface (§6 `get.*`, Component H): read-only views over a persisted stage
//! or tournament — full dumps, the "current" stage/round/matches of an in-progress
//! tournament, the original seeding recovered from round 1, and final standings.
//!
//! Nothing here mutates storage; every function takes `&S: Storage` the same way
//! `update`/`reset` do, so `engine::GetFacet` is a thin wrapper exactly like its
//! siblings.

use crate::error::{BracketError, Result};
use crate::model::{
    Group, Match, MatchGame, MatchStatus, Participant, ParticipantId, Round, Stage, StageId,
    StageKind, TournamentId,
};
use crate::semantics;
use crate::storage::{Filter, Storage};
use serde::Serialize;

/// A full dump of one stage's rows, used by `get.stageData` and as a building block of
/// `get.tournamentData`/`export`.
#[derive(Debug, Clone, Serialize)]
pub struct StageData {
    pub stage: Stage,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
    pub match_games: Vec<MatchGame>,
}

/// A full dump of every stage belonging to a tournament, plus its participants —
/// `get.tournamentData` (§6) and the unit `import`/`export` (§6) build on.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentData {
    pub tournament_id: TournamentId,
    pub participants: Vec<Participant>,
    pub stages: Vec<StageData>,
}

/// One entry of `get.finalStandings`: a participant and the rank they finished at.
/// Multiple entries may share a `rank` (tied eliminations); ranks skip ahead by the
/// size of each tied group, matching ordinary "competition ranking" (1224).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StandingEntry {
    pub rank: u32,
    pub participant_id: ParticipantId,
}

pub async fn stage_data<S: Storage>(storage: &S, stage_id: StageId) -> Result<StageData> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    let rounds = storage.select_rounds(Filter::by_stage(stage_id)).await?;
    let matches = storage.select_matches(Filter::by_stage(stage_id)).await?;
    let mut match_games = Vec::new();
    for m in &matches {
        match_games.extend(storage.select_match_games(Filter::by_match(m.id)).await?);
    }
    Ok(StageData { stage, groups, rounds, matches, match_games })
}

pub async fn tournament_data<S: Storage>(storage: &S, tournament_id: TournamentId) -> Result<TournamentData> {
    let participants = storage.select_participants(Filter::by_tournament(tournament_id)).await?;
    let stages = storage.select_stages(Filter::by_tournament(tournament_id)).await?;
    let mut stage_dumps = Vec::with_capacity(stages.len());
    for stage in stages {
        stage_dumps.push(stage_data(storage, stage.id).await?);
    }
    Ok(TournamentData { tournament_id, participants, stages: stage_dumps })
}

/// `get.currentStage` (§6): the lowest-numbered stage of the tournament that still has
/// an unresolved match, or the highest-numbered stage if every stage is done (so callers
/// always get something to look at rather than `None` once a tournament is complete).
pub async fn current_stage<S: Storage>(storage: &S, tournament_id: TournamentId) -> Result<Option<Stage>> {
    let mut stages = storage.select_stages(Filter::by_tournament(tournament_id)).await?;
    stages.sort_by_key(|s| s.number);
    for stage in &stages {
        let matches = storage.select_matches(Filter::by_stage(stage.id)).await?;
        if matches.iter().any(|m| m.status < MatchStatus::Archived) {
            return Ok(Some(stage.clone()));
        }
    }
    Ok(stages.into_iter().last())
}

/// `get.currentRound` (§6): within a stage's primary bracket (group 1), the
/// lowest-numbered round that still has a non-`Archived` match, or its last round.
pub async fn current_round<S: Storage>(storage: &S, stage_id: StageId) -> Result<Option<Round>> {
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    let Some(primary) = groups.iter().find(|g| g.number == 1) else { return Ok(None) };
    let mut rounds = storage.select_rounds(Filter::by_group(primary.id)).await?;
    rounds.sort_by_key(|r| r.number);
    for round in &rounds {
        let matches = storage.select_matches(Filter::by_round(round.id)).await?;
        if matches.iter().any(|m| m.status < MatchStatus::Archived) {
            return Ok(Some(round.clone()));
        }
    }
    Ok(rounds.into_iter().last())
}

/// `get.currentMatches` (§6, §9 Open Question 3): only meaningful for
/// single-elimination, where "the current round" is unambiguous; every other stage kind
/// raises `NotImplemented` rather than guessing at a definition.
pub async fn current_matches<S: Storage>(storage: &S, stage_id: StageId) -> Result<Vec<Match>> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    if stage.kind != StageKind::SingleElimination {
        return Err(BracketError::not_implemented("get.currentMatches outside single-elimination"));
    }
    match current_round(storage, stage_id).await? {
        Some(round) => storage.select_matches(Filter::by_round(round.id)).await,
        None => Ok(Vec::new()),
    }
}

/// `get.seeding` (§6): recovers the original seed order from round 1's recorded
/// `position`s, one entry per seed slot (`None` for a BYE or an unrecorded position).
pub async fn seeding<S: Storage>(storage: &S, stage_id: StageId) -> Result<Vec<Option<ParticipantId>>> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    let Some(primary) = groups.iter().find(|g| g.number == 1) else { return Ok(Vec::new()) };
    let rounds = storage.select_rounds(Filter::by_group(primary.id)).await?;
    let Some(round1) = rounds.iter().find(|r| r.number == 1) else { return Ok(Vec::new()) };
    let mut matches = storage.select_matches(Filter::by_round(round1.id)).await?;
    matches.sort_by_key(|m| m.number);

    if stage.kind == StageKind::RoundRobin {
        // Round-robin has no `position` bookkeeping (every round is a full pairing
        // cycle, not a progressively-pruned bracket); fall back to round 1's natural
        // left-to-right pairing order, BYE matches included as gaps.
        let mut out = Vec::with_capacity(matches.len() * 2);
        for m in &matches {
            out.push(m.opponent1.as_ref().and_then(|o| o.id));
            out.push(m.opponent2.as_ref().and_then(|o| o.id));
        }
        return Ok(out);
    }

    let size = matches.len() as u32 * 2;
    let mut out = vec![None; size as usize];
    for m in &matches {
        if let Some(o1) = &m.opponent1 {
            let pos = o1.position.unwrap_or(2 * m.number - 1);
            if let Some(slot) = out.get_mut(pos as usize - 1) {
                *slot = o1.id;
            }
        }
        if let Some(o2) = &m.opponent2 {
            let pos = o2.position.unwrap_or(2 * m.number);
            if let Some(slot) = out.get_mut(pos as usize - 1) {
                *slot = o2.id;
            }
        }
    }
    Ok(out)
}

/// `get.finalStandings` (§6): the stage's final ranking, round-robin by total wins and
/// elimination stages by the round a participant was last eliminated in.
pub async fn final_standings<S: Storage>(storage: &S, stage_id: StageId) -> Result<Vec<StandingEntry>> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    match stage.kind {
        StageKind::RoundRobin => round_robin_standings(storage, &stage).await,
        StageKind::SingleElimination => single_elimination_standings(storage, &stage).await,
        StageKind::DoubleElimination => double_elimination_standings(storage, &stage).await,
    }
}

/// Turns an ordered list of tiers (best first; each tier a set of tied participants)
/// into competition-ranked `StandingEntry` rows: rank = 1 + the number of participants
/// placed in strictly better tiers.
fn tiers_to_standings(tiers: Vec<Vec<ParticipantId>>) -> Vec<StandingEntry> {
    let mut out = Vec::new();
    let mut ahead = 0u32;
    for tier in tiers {
        let rank = ahead + 1;
        for participant_id in &tier {
            out.push(StandingEntry { rank, participant_id: *participant_id });
        }
        ahead += tier.len() as u32;
    }
    out
}

async fn round_robin_standings<S: Storage>(storage: &S, stage: &Stage) -> Result<Vec<StandingEntry>> {
    let matches = storage.select_matches(Filter::by_stage(stage.id)).await?;
    let mut wins: std::collections::HashMap<ParticipantId, u32> = std::collections::HashMap::new();
    let mut seen_order: Vec<ParticipantId> = Vec::new();
    for m in &matches {
        for slot in [&m.opponent1, &m.opponent2] {
            if let Some(Some(id)) = slot.as_ref().map(|o| o.id) {
                wins.entry(id).or_insert(0);
                if !seen_order.contains(&id) {
                    seen_order.push(id);
                }
            }
        }
        if let Some(side) = semantics::get_match_result(m)? {
            let winner_id = m.opponent(side).as_ref().and_then(|o| o.id);
            if let Some(id) = winner_id {
                *wins.entry(id).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<ParticipantId> = seen_order;
    ranked.sort_by_key(|id| std::cmp::Reverse(*wins.get(id).unwrap_or(&0)));

    let mut tiers: Vec<Vec<ParticipantId>> = Vec::new();
    for id in ranked {
        let w = *wins.get(&id).unwrap_or(&0);
        match tiers.last_mut() {
            Some(tier) if wins.get(&tier[0]).copied() == Some(w) => tier.push(id),
            _ => tiers.push(vec![id]),
        }
    }
    Ok(tiers_to_standings(tiers))
}

/// Builds the single-elimination tiers: champion, runner-up, then each earlier round's
/// losers tied together — except the semifinal-loser tier, which a `consolationFinal`
/// splits into two singleton tiers (its winner and loser) instead.
async fn single_elimination_standings<S: Storage>(storage: &S, stage: &Stage) -> Result<Vec<StandingEntry>> {
    let groups = storage.select_groups(Filter::by_stage(stage.id)).await?;
    let bracket = groups.iter().find(|g| g.number == 1).ok_or_else(|| BracketError::invalid_input("stage has no bracket group"))?;
    let mut rounds = storage.select_rounds(Filter::by_group(bracket.id)).await?;
    rounds.sort_by_key(|r| r.number);
    let round_count = rounds.len() as u32;

    let mut tiers: Vec<Vec<ParticipantId>> = Vec::new();
    for (idx, round) in rounds.iter().enumerate().rev() {
        let round_number = idx as u32 + 1;
        let matches = storage.select_matches(Filter::by_round(round.id)).await?;
        if round_number == round_count - 1 && stage.settings.has_consolation_final() {
            if let Some(consolation_group) = groups.iter().find(|g| g.number == 2) {
                let consolation_rounds = storage.select_rounds(Filter::by_group(consolation_group.id)).await?;
                if let Some(consolation_round) = consolation_rounds.first() {
                    let consolation_matches = storage.select_matches(Filter::by_round(consolation_round.id)).await?;
                    if let Some(m) = consolation_matches.first() {
                        if let Some(side) = semantics::get_match_result(m)? {
                            let winner = m.opponent(side).as_ref().and_then(|o| o.id);
                            let loser = m.opponent(side.other()).as_ref().and_then(|o| o.id);
                            if let Some(id) = winner {
                                tiers.push(vec![id]);
                            }
                            if let Some(id) = loser {
                                tiers.push(vec![id]);
                            }
                            continue;
                        }
                    }
                }
            }
        }
        let mut tier = Vec::new();
        for m in &matches {
            if round_number == round_count {
                if let Some(side) = semantics::get_match_result(m)? {
                    if let Some(id) = m.opponent(side).as_ref().and_then(|o| o.id) {
                        tiers.push(vec![id]);
                    }
                    if let Some(id) = m.opponent(side.other()).as_ref().and_then(|o| o.id) {
                        tiers.push(vec![id]);
                    }
                }
            } else if let Some(side) = semantics::get_match_result(m)? {
                if let Some(id) = m.opponent(side.other()).as_ref().and_then(|o| o.id) {
                    tier.push(id);
                }
            }
        }
        if round_number != round_count && !tier.is_empty() {
            tiers.push(tier);
        }
    }
    Ok(tiers_to_standings(tiers))
}

/// Builds double-elimination tiers: the grand final's winner/loser (or, with no grand
/// final, the winner bracket's and loser bracket's own finalists) at the top, then the
/// loser bracket's elimination rounds from last to first for everyone below them.
async fn double_elimination_standings<S: Storage>(storage: &S, stage: &Stage) -> Result<Vec<StandingEntry>> {
    let groups = storage.select_groups(Filter::by_stage(stage.id)).await?;
    let winner_group = groups.iter().find(|g| g.number == 1).ok_or_else(|| BracketError::invalid_input("stage has no winner bracket"))?;
    let loser_group = groups.iter().find(|g| g.number == 2).ok_or_else(|| BracketError::invalid_input("stage has no loser bracket"))?;
    let final_group = groups.iter().find(|g| g.number == 3);

    let mut tiers: Vec<Vec<ParticipantId>> = Vec::new();

    if stage.settings.grand_final() != crate::model::GrandFinalKind::None {
        if let Some(final_group) = final_group {
            let mut final_rounds = storage.select_rounds(Filter::by_group(final_group.id)).await?;
            final_rounds.sort_by_key(|r| r.number);
            let mut decider = None;
            for round in final_rounds.iter().rev() {
                let matches = storage.select_matches(Filter::by_round(round.id)).await?;
                if let Some(m) = matches.first() {
                    if semantics::get_match_result(m)?.is_some() {
                        decider = Some(m.clone());
                        break;
                    }
                }
            }
            if let Some(m) = decider {
                let side = semantics::get_match_result(&m)?.expect("checked above");
                if let Some(id) = m.opponent(side).as_ref().and_then(|o| o.id) {
                    tiers.push(vec![id]);
                }
                if let Some(id) = m.opponent(side.other()).as_ref().and_then(|o| o.id) {
                    tiers.push(vec![id]);
                }
            }
        }
    } else {
        let wb_winner = bracket_final_winner(storage, winner_group.id).await?;
        let lb_winner = bracket_final_winner(storage, loser_group.id).await?;
        if let Some(id) = wb_winner {
            tiers.push(vec![id]);
        }
        if let Some(id) = lb_winner {
            tiers.push(vec![id]);
        }
    }

    let mut lb_rounds = storage.select_rounds(Filter::by_group(loser_group.id)).await?;
    lb_rounds.sort_by_key(|r| r.number);
    for round in lb_rounds.iter().rev() {
        let matches = storage.select_matches(Filter::by_round(round.id)).await?;
        let mut tier = Vec::new();
        for m in &matches {
            if let Some(side) = semantics::get_match_result(m)? {
                if let Some(id) = m.opponent(side.other()).as_ref().and_then(|o| o.id) {
                    tier.push(id);
                }
            }
        }
        if !tier.is_empty() {
            tiers.push(tier);
        }
    }
    Ok(tiers_to_standings(tiers))
}

async fn bracket_final_winner<S: Storage>(storage: &S, group_id: crate::model::GroupId) -> Result<Option<ParticipantId>> {
    let mut rounds = storage.select_rounds(Filter::by_group(group_id)).await?;
    rounds.sort_by_key(|r| r.number);
    let Some(last) = rounds.last() else { return Ok(None) };
    let matches = storage.select_matches(Filter::by_round(last.id)).await?;
    let Some(m) = matches.first() else { return Ok(None) };
    let Some(side) = semantics::get_match_result(m)? else { return Ok(None) };
    Ok(m.opponent(side).as_ref().and_then(|o| o.id))
}
