//! Reset operations (§4.6 "reset" family, Component G): undo a match's recorded
//! result, undo a match game's result, or discard a stage's seeding back to an
//! all-BYE/TBD skeleton.
//!
//! Clearing a score isn't expressible through `semantics::OpponentPatch` — its fields
//! mean "leave untouched" when absent, not "erase" — so these functions mutate the
//! stored slots directly rather than going through `update::update_match`'s patch path.

use crate::error::{BracketError, Result};
use crate::model::{Match, MatchGame, MatchGameId, MatchId, StageId};
use crate::semantics::compute_status_from_opponents;
use crate::storage::{Filter, Storage};
use crate::update;
use tracing::debug;

fn clear_slot(slot: &mut Option<crate::model::Opponent>) {
    if let Some(o) = slot {
        o.score = None;
        o.result = None;
        o.forfeit = None;
    }
}

/// `reset.matchResults` (§4.6): erases both slots' scores/results/forfeits (their `id`s,
/// and any BYE, are untouched), recomputes status purely from the opponents, and runs
/// the ordinary propagation cascade — which is a no-op forward (there's no longer a
/// winner to advance) but leaves the match itself in the state it would have been in had
/// it never been completed.
pub async fn reset_match_results<S: Storage>(storage: &S, match_id: MatchId) -> Result<Match> {
    debug!(%match_id, "resetting match results");
    let mut m = storage.select_match(match_id).await?.ok_or(BracketError::MatchNotFound(match_id))?;
    if m.status == crate::model::MatchStatus::Archived {
        return Err(BracketError::MatchLocked(match_id));
    }
    // §4.7: a best-of-X parent with unplayed children can't be reset directly — its
    // result only exists by forfeit, or by `reconcile_parent_from_games` deriving it
    // from child games that must be reset individually instead.
    if m.child_count > 0 {
        let forfeited = matches!(&m.opponent1, Some(o) if o.has_forfeited())
            || matches!(&m.opponent2, Some(o) if o.has_forfeited());
        if !forfeited {
            return Err(BracketError::invalid_input(
                "match has child games; reset those instead of the parent",
            ));
        }
    }

    let stage = storage.select_stage(m.stage_id).await?.ok_or(BracketError::StageNotFound(m.stage_id))?;
    // §4.7: a downstream match already in progress (and not merely BYE-completed) has
    // consumed this match's result; resetting would orphan it.
    let next = crate::find::next_matches(storage, &stage, &m).await?;
    for n in &next {
        if n.status >= crate::model::MatchStatus::Running && !crate::semantics::is_match_bye_completed(n) {
            return Err(BracketError::MatchLocked(n.id));
        }
    }

    clear_slot(&mut m.opponent1);
    clear_slot(&mut m.opponent2);
    m.status = compute_status_from_opponents(&m.opponent1, &m.opponent2);
    storage.update_match(m.clone()).await?;
    update::propagate_from_match(storage, &stage, &m).await?;
    Ok(m)
}

/// `reset.matchGameResults`: same idea as [`reset_match_results`] but for one game of a
/// best-of-X series, followed by reconciling the parent match — which itself may
/// un-complete and propagate further if this was the deciding game.
pub async fn reset_match_game_results<S: Storage>(storage: &S, game_id: MatchGameId) -> Result<MatchGame> {
    debug!(%game_id, "resetting match game results");
    let mut game = storage.select_match_game(game_id).await?.ok_or(BracketError::MatchGameNotFound(game_id))?;
    clear_slot(&mut game.opponent1);
    clear_slot(&mut game.opponent2);
    game.status = compute_status_from_opponents(&game.opponent1, &game.opponent2);
    storage.update_match_game(game.clone()).await?;

    let stage = storage.select_stage(game.stage_id).await?.ok_or(BracketError::StageNotFound(game.stage_id))?;
    update::reconcile_parent_from_games(storage, &stage, game.parent_id).await?;
    Ok(game)
}

/// `reset.seeding` (§4.6): equivalent to `update::update_seeding` with every slot set
/// back to BYE, honoring the same round-1 lock as a real reseed (a stage that has
/// already started cannot be wiped back to empty either).
pub async fn reset_seeding<S: Storage>(storage: &S, stage_id: StageId) -> Result<crate::model::Stage> {
    let groups = storage.select_groups(Filter::by_stage(stage_id)).await?;
    let seed_count = match groups.iter().find(|g| g.number == 1) {
        Some(group) => {
            let rounds = storage.select_rounds(Filter::by_group(group.id)).await?;
            let round1 = rounds.iter().find(|r| r.number == 1).ok_or(BracketError::StageNotFound(stage_id))?;
            storage.select_matches(Filter::by_round(round1.id)).await?.len() as u32 * 2
        }
        None => 0,
    };
    update::update_seeding(storage, stage_id, vec![None; seed_count as usize]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchStatus, ParticipantId, StageKind, StageSettings, TournamentId};
    use crate::storage::InMemoryStorage;
    use crate::topology::creator::create_stage;

    async fn seeded_single_elimination(storage: &InMemoryStorage, n: usize) -> crate::model::Stage {
        let tournament_id = TournamentId::new();
        let seeds: Vec<Option<ParticipantId>> = (0..n).map(|_| Some(ParticipantId::new())).collect();
        let created = create_stage(tournament_id, "SE".into(), StageKind::SingleElimination, 1, StageSettings::default(), seeds).unwrap();
        storage
            .insert_stage_tree(created.stage.clone(), created.groups, created.rounds, created.matches)
            .await
            .unwrap();
        update::propagate_bye_winners(storage, &created.stage).await.unwrap();
        created.stage
    }

    #[tokio::test]
    async fn resetting_a_completed_match_clears_its_result() {
        let storage = InMemoryStorage::new();
        let stage = seeded_single_elimination(&storage, 4).await;
        let groups = storage.select_groups(Filter::by_stage(stage.id)).await.unwrap();
        let rounds = storage.select_rounds(Filter::by_group(groups[0].id)).await.unwrap();
        let round1 = rounds.iter().find(|r| r.number == 1).unwrap();
        let matches = storage.select_matches(Filter::by_round(round1.id)).await.unwrap();
        let m = &matches[0];

        let patch = crate::semantics::MatchPatch {
            opponent1: Some(crate::semantics::OpponentPatch { score: Some(2), ..Default::default() }),
            opponent2: Some(crate::semantics::OpponentPatch { score: Some(1), ..Default::default() }),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        update::update_match(&storage, m.id, patch, false).await.unwrap();

        let reset = reset_match_results(&storage, m.id).await.unwrap();
        assert!(reset.opponent1.as_ref().unwrap().score.is_none());
        assert!(reset.opponent2.as_ref().unwrap().result.is_none());
        assert_ne!(reset.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn resetting_an_archived_match_is_rejected() {
        let storage = InMemoryStorage::new();
        let stage = seeded_single_elimination(&storage, 4).await;
        let groups = storage.select_groups(Filter::by_stage(stage.id)).await.unwrap();
        let rounds = storage.select_rounds(Filter::by_group(groups[0].id)).await.unwrap();
        let round1 = rounds.iter().find(|r| r.number == 1).unwrap();
        let matches = storage.select_matches(Filter::by_round(round1.id)).await.unwrap();
        let m = &matches[0];
        let patch = crate::semantics::MatchPatch {
            opponent1: Some(crate::semantics::OpponentPatch { score: Some(2), ..Default::default() }),
            opponent2: Some(crate::semantics::OpponentPatch { score: Some(1), ..Default::default() }),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        update::update_match(&storage, m.id, patch, false).await.unwrap();
        update::archive_matches(&storage, &[m.id]).await.unwrap();

        let err = reset_match_results(&storage, m.id).await.unwrap_err();
        assert!(matches!(err, crate::error::BracketError::MatchLocked(_)));
    }

    #[tokio::test]
    async fn resetting_seeding_clears_every_slot() {
        let storage = InMemoryStorage::new();
        let stage = seeded_single_elimination(&storage, 4).await;
        let reset_stage = reset_seeding(&storage, stage.id).await.unwrap();
        let matches = storage.select_matches(Filter::by_stage(reset_stage.id)).await.unwrap();
        assert!(matches.iter().all(|m| m.opponent1.as_ref().map(|o| o.id.is_none()).unwrap_or(true)));
    }
}
