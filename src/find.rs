//! The navigation query surface (§6 `find.*`): resolves a match's location or its
//! topological neighbours into concrete rows, on top of the pure `navigation` module and
//! the same `Filter`-based storage lookups `query`/`update` use.

use crate::error::{BracketError, Result};
use crate::model::{Group, Match, MatchGame, Stage, StageId};
use crate::navigation::{self, GroupKind};
use crate::storage::{Filter, Storage};
use crate::topology::helpers::classify_group;
use crate::update::stage_shape;

/// Which of a double-elimination stage's two brackets to look up — `find.upperBracket`
/// and `find.loserBracket` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Upper,
    Loser,
}

/// `find.upperBracket` / `find.loserBracket` (§6): the group backing one bracket of a
/// stage. Round-robin and single-elimination stages only have an upper bracket (their
/// one and only group); `Loser` on those raises `InvalidInput`.
pub async fn bracket_group<S: Storage>(storage: &S, stage_id: StageId, which: BracketKind) -> Result<Group> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    let group_number = match (stage.kind, which) {
        (_, BracketKind::Upper) => 1,
        (crate::model::StageKind::DoubleElimination, BracketKind::Loser) => 2,
        _ => return Err(BracketError::invalid_input("stage has no loser bracket")),
    };
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    groups
        .into_iter()
        .find(|g| g.number == group_number)
        .ok_or_else(|| BracketError::invalid_input("bracket group missing"))
}

/// `find.match` (§6): the match at an explicit `(group, round, number)` coordinate
/// within a stage.
pub async fn match_at<S: Storage>(storage: &S, stage_id: StageId, group_number: u32, round_number: u32, match_number: u32) -> Result<Option<Match>> {
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    let Some(group) = groups.into_iter().find(|g| g.number == group_number) else { return Ok(None) };
    let rounds = storage.select_rounds(Filter::by_group(group.id)).await?;
    let Some(round) = rounds.into_iter().find(|r| r.number == round_number) else { return Ok(None) };
    let matches = storage.select_matches(Filter::by_round(round.id)).await?;
    Ok(matches.into_iter().find(|m| m.number == match_number))
}

/// `find.matchGame` (§6): one child game of a best-of-X match by its 1-based number.
pub async fn match_game<S: Storage>(storage: &S, match_id: crate::model::MatchId, game_number: u32) -> Result<Option<MatchGame>> {
    let games = storage.select_match_games(Filter::by_match(match_id)).await?;
    Ok(games.into_iter().find(|g| g.number == game_number))
}

async fn resolve_many<S: Storage>(storage: &S, stage_id: StageId, refs: &[navigation::NextRef]) -> Result<Vec<Match>> {
    let mut out = Vec::with_capacity(refs.len());
    for r in refs {
        let group_number = match r.group {
            GroupKind::SingleBracket | GroupKind::WinnerBracket => 1,
            GroupKind::LoserBracket => 2,
            GroupKind::FinalGroup => 3,
        };
        if let Some(m) = match_at(storage, stage_id, group_number, r.round, r.number).await? {
            out.push(m);
        }
    }
    Ok(out)
}

/// `find.previousMatches` (§6): the matches whose winner (or, on the loser-bracket
/// second slot, loser) feeds into `m`.
pub async fn previous_matches<S: Storage>(storage: &S, stage: &Stage, m: &Match) -> Result<Vec<Match>> {
    let shape = stage_shape(storage, stage).await?;
    let group = storage.select_group(m.group_id).await?.ok_or(BracketError::GroupNotFound(m.group_id))?;
    let kind = classify_group(stage.kind, group.number);
    let round = storage.select_round(m.round_id).await?.ok_or(BracketError::RoundNotFound(m.round_id))?;
    let refs = navigation::previous_matches(&shape, kind, m, round.number, m.number);
    resolve_many(storage, stage.id, &refs).await
}

/// `find.nextMatches` (§6): the matches `m`'s winner (and, where one exists, loser)
/// propagate into.
pub async fn next_matches<S: Storage>(storage: &S, stage: &Stage, m: &Match) -> Result<Vec<Match>> {
    let shape = stage_shape(storage, stage).await?;
    let group = storage.select_group(m.group_id).await?.ok_or(BracketError::GroupNotFound(m.group_id))?;
    let kind = classify_group(stage.kind, group.number);
    let round = storage.select_round(m.round_id).await?.ok_or(BracketError::RoundNotFound(m.round_id))?;
    let refs = navigation::next_matches(&shape, kind, round.number, m.number);
    resolve_many(storage, stage.id, &refs).await
}
