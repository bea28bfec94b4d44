//! The engine facade (§6): `BracketEngine<S>` bundles a `Storage` backend with six
//! facet objects — `create`/`get`/`update`/`delete`/`reset`/`find` — each a thin,
//! borrowing wrapper around the free functions of `topology::creator`, `query`,
//! `update`, `reset` and `find`. None of the facets hold their own state; they exist so
//! callers write `engine.update().match_result(...)` instead of threading `&storage`
//! through every call site themselves.

use crate::error::{BracketError, Result};
use crate::find::{self, BracketKind};
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, SeedEntry, Stage, StageId, StageKind, StageSettings, TournamentId,
};
use crate::ordering::OrderingMethod;
use crate::query::{self, StageData, StandingEntry, TournamentData};
use crate::reset;
use crate::semantics::MatchPatch;
use crate::storage::{Filter, Storage};
use crate::topology::creator;
use crate::update;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A storage-agnostic handle onto one backend. Cheap to construct (it just owns the
/// backend), and every facet borrows it rather than cloning anything.
pub struct BracketEngine<S: Storage> {
    storage: S,
}

impl<S: Storage> BracketEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn create(&self) -> CreateFacet<'_, S> {
        CreateFacet { engine: self }
    }

    pub fn get(&self) -> GetFacet<'_, S> {
        GetFacet { engine: self }
    }

    pub fn update(&self) -> UpdateFacet<'_, S> {
        UpdateFacet { engine: self }
    }

    pub fn delete(&self) -> DeleteFacet<'_, S> {
        DeleteFacet { engine: self }
    }

    pub fn reset(&self) -> ResetFacet<'_, S> {
        ResetFacet { engine: self }
    }

    pub fn find(&self) -> FindFacet<'_, S> {
        FindFacet { engine: self }
    }
}

/// Resolves a `SeedEntry` list into storage-backed `ParticipantId`s, registering any
/// new-by-name participant along the way (§2 "register participants"). Duplicate
/// non-BYE entries are rejected up front — a name or id appearing twice in one seeding
/// almost always indicates a caller mistake rather than the same person playing
/// themselves.
async fn resolve_seeds<S: Storage>(
    storage: &S,
    tournament_id: TournamentId,
    seeds: Vec<SeedEntry>,
) -> Result<Vec<Option<ParticipantId>>> {
    let mut seen_ids = std::collections::HashSet::new();
    let mut seen_names = std::collections::HashSet::new();
    for entry in &seeds {
        match entry {
            SeedEntry::Id(id) => {
                if !seen_ids.insert(*id) {
                    return Err(BracketError::invalid_input("duplicate participant id in seeding"));
                }
            }
            SeedEntry::Name(name) => {
                if !seen_names.insert(name.clone()) {
                    return Err(BracketError::invalid_input("duplicate participant name in seeding"));
                }
            }
            SeedEntry::Bye => {}
        }
    }

    let existing = storage.select_participants(Filter::by_tournament(tournament_id)).await?;
    let mut by_name: HashMap<String, ParticipantId> = existing.iter().map(|p| (p.name.clone(), p.id)).collect();

    let mut resolved = Vec::with_capacity(seeds.len());
    for entry in seeds {
        let id = match entry {
            SeedEntry::Bye => None,
            SeedEntry::Id(id) => {
                storage.select_participant(id).await?.ok_or(BracketError::ParticipantNotFound(id))?;
                Some(id)
            }
            SeedEntry::Name(name) => match by_name.get(&name) {
                Some(&id) => Some(id),
                None => {
                    let participant = Participant::new(tournament_id, name.clone());
                    storage.insert_participant(participant.clone()).await?;
                    by_name.insert(name, participant.id);
                    Some(participant.id)
                }
            },
        };
        resolved.push(id);
    }
    Ok(resolved)
}

pub struct CreateFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> CreateFacet<'_, S> {
    /// `create.stage` (§6): registers the seeding's participants, builds the topology,
    /// persists it, and replays BYE propagation — the full sequence §4.2 describes.
    pub async fn stage(
        &self,
        tournament_id: TournamentId,
        name: String,
        kind: StageKind,
        number: u32,
        settings: StageSettings,
        seeds: Vec<SeedEntry>,
    ) -> Result<Stage> {
        if seeds.is_empty() && settings.size.is_none() {
            return Err(BracketError::invalid_input("a stage needs a seeding or an explicit size"));
        }
        if kind == StageKind::RoundRobin && seeds.iter().filter(|s| !s.is_bye()).count() < 2 {
            return Err(BracketError::invalid_input("round-robin needs at least two participants"));
        }

        let resolved = resolve_seeds(self.engine.storage(), tournament_id, seeds).await?;
        let created = creator::create_stage(tournament_id, name, kind, number, settings, resolved)?;
        self.engine
            .storage()
            .insert_stage_tree(created.stage.clone(), created.groups, created.rounds, created.matches)
            .await?;
        update::propagate_bye_winners(self.engine.storage(), &created.stage).await?;
        Ok(created.stage)
    }
}

pub struct GetFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> GetFacet<'_, S> {
    pub async fn stage_data(&self, stage_id: StageId) -> Result<StageData> {
        query::stage_data(self.engine.storage(), stage_id).await
    }

    pub async fn tournament_data(&self, tournament_id: TournamentId) -> Result<TournamentData> {
        query::tournament_data(self.engine.storage(), tournament_id).await
    }

    pub async fn current_stage(&self, tournament_id: TournamentId) -> Result<Option<Stage>> {
        query::current_stage(self.engine.storage(), tournament_id).await
    }

    pub async fn current_round(&self, stage_id: StageId) -> Result<Option<Round>> {
        query::current_round(self.engine.storage(), stage_id).await
    }

    pub async fn current_matches(&self, stage_id: StageId) -> Result<Vec<Match>> {
        query::current_matches(self.engine.storage(), stage_id).await
    }

    pub async fn seeding(&self, stage_id: StageId) -> Result<Vec<Option<ParticipantId>>> {
        query::seeding(self.engine.storage(), stage_id).await
    }

    pub async fn final_standings(&self, stage_id: StageId) -> Result<Vec<StandingEntry>> {
        query::final_standings(self.engine.storage(), stage_id).await
    }
}

pub struct FindFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> FindFacet<'_, S> {
    pub async fn upper_bracket(&self, stage_id: StageId) -> Result<Group> {
        find::bracket_group(self.engine.storage(), stage_id, BracketKind::Upper).await
    }

    pub async fn loser_bracket(&self, stage_id: StageId) -> Result<Group> {
        find::bracket_group(self.engine.storage(), stage_id, BracketKind::Loser).await
    }

    pub async fn a_match(&self, stage_id: StageId, group_number: u32, round_number: u32, match_number: u32) -> Result<Option<Match>> {
        find::match_at(self.engine.storage(), stage_id, group_number, round_number, match_number).await
    }

    pub async fn match_game(&self, match_id: MatchId, game_number: u32) -> Result<Option<MatchGame>> {
        find::match_game(self.engine.storage(), match_id, game_number).await
    }

    pub async fn previous_matches(&self, stage: &Stage, m: &Match) -> Result<Vec<Match>> {
        find::previous_matches(self.engine.storage(), stage, m).await
    }

    pub async fn next_matches(&self, stage: &Stage, m: &Match) -> Result<Vec<Match>> {
        find::next_matches(self.engine.storage(), stage, m).await
    }
}

pub struct UpdateFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> UpdateFacet<'_, S> {
    pub async fn a_match(&self, match_id: MatchId, patch: MatchPatch) -> Result<Match> {
        update::update_match(self.engine.storage(), match_id, patch, false).await
    }

    pub async fn match_game(&self, game_id: MatchGameId, patch: MatchPatch) -> Result<MatchGame> {
        update::update_match_game(self.engine.storage(), game_id, patch, false).await
    }

    pub async fn seeding(&self, stage_id: StageId, new_seeds: Vec<Option<ParticipantId>>) -> Result<Stage> {
        update::update_seeding(self.engine.storage(), stage_id, new_seeds).await
    }

    pub async fn archive_matches(&self, match_ids: &[MatchId]) -> Result<Vec<Match>> {
        update::archive_matches(self.engine.storage(), match_ids).await
    }

    /// `update.confirmCurrentSeeding` (§10.5): re-reads the current seeding and
    /// round-trips it through `updateSeeding`'s own validation without changing
    /// anything — an acknowledgement that the caller has reviewed the draw, still
    /// rejected the same way a real reseed would be once round 1 has started.
    pub async fn confirm_current_seeding(&self, stage_id: StageId) -> Result<Stage> {
        let current = query::seeding(self.engine.storage(), stage_id).await?;
        update::update_seeding(self.engine.storage(), stage_id, current).await
    }

    /// `update.ordering` (§10.5): replaces a stage's `seedOrdering` and rebuilds it from
    /// the seeding currently on file, going through the same round-1 lock
    /// `updateSeeding` enforces (only the first method of the list actually feeds
    /// initial placement; see `topology::creator::ordered_seeds`).
    pub async fn ordering(&self, stage_id: StageId, methods: Vec<OrderingMethod>) -> Result<Stage> {
        let stage = self
            .engine
            .storage()
            .select_stage(stage_id)
            .await?
            .ok_or(BracketError::StageNotFound(stage_id))?;
        let current = query::seeding(self.engine.storage(), stage_id).await?;
        let mut settings = stage.settings.clone();
        settings.seed_ordering = Some(methods);
        reseed_with_settings(self.engine.storage(), stage_id, settings, current).await
    }

    /// `update.roundOrdering` (§10.5): patches the ordering used for a single round.
    /// Only round 1 actually feeds the seed-placement algorithm (every later round is
    /// pure bracket arithmetic), so any other round number is rejected rather than
    /// silently ignored.
    pub async fn round_ordering(&self, stage_id: StageId, round_number: u32, method: OrderingMethod) -> Result<Stage> {
        if round_number != 1 {
            return Err(BracketError::invalid_input("only round 1's ordering can be changed after creation"));
        }
        self.ordering(stage_id, vec![method]).await
    }

    /// `update.matchChildCount` (§10.5): changes how many `MatchGame`s a match expands
    /// into. Rejected once any affected match already has a scored child game — raising
    /// or lowering best-of-X mid-series would silently invalidate recorded results.
    pub async fn match_child_count(&self, stage_id: StageId, new_count: u32) -> Result<Vec<Match>> {
        let matches = self.engine.storage().select_matches(Filter::by_stage(stage_id)).await?;
        let mut updated = Vec::with_capacity(matches.len());
        for m in matches {
            let games = self.engine.storage().select_match_games(Filter::by_match(m.id)).await?;
            if games.iter().any(|g| g.opponent1.as_ref().map_or(false, |o| o.score.is_some()) || g.opponent2.as_ref().map_or(false, |o| o.score.is_some())) {
                return Err(BracketError::invalid_input("match already has scored child games"));
            }
            let mut m = m;
            m.child_count = new_count;
            self.engine.storage().update_match(m.clone()).await?;
            updated.push(m);
        }
        Ok(updated)
    }
}

async fn reseed_with_settings<S: Storage>(
    storage: &S,
    stage_id: StageId,
    settings: StageSettings,
    seeds: Vec<Option<ParticipantId>>,
) -> Result<Stage> {
    let stage = storage.select_stage(stage_id).await?.ok_or(BracketError::StageNotFound(stage_id))?;
    let mut patched = stage.clone();
    patched.settings = settings;
    storage.update_stage(patched).await?;
    update::update_seeding(storage, stage_id, seeds).await
}

pub struct DeleteFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> DeleteFacet<'_, S> {
    /// `delete.stage` (§6): removes a stage and everything nested inside it. Leaves
    /// participants in place — they may be shared by sibling stages of the tournament.
    pub async fn stage(&self, stage_id: StageId) -> Result<()> {
        self.engine.storage().delete_stage_cascade(stage_id).await
    }

    /// `delete.tournament` (§6): removes every stage (and its nested rows) belonging to
    /// the tournament, then its participants.
    pub async fn tournament(&self, tournament_id: TournamentId) -> Result<()> {
        let stages = self.engine.storage().select_stages(Filter::by_tournament(tournament_id)).await?;
        for stage in stages {
            self.engine.storage().delete_stage_cascade(stage.id).await?;
        }
        for participant in self.engine.storage().select_participants(Filter::by_tournament(tournament_id)).await? {
            self.engine.storage().delete_participant(participant.id).await?;
        }
        Ok(())
    }
}

pub struct ResetFacet<'a, S: Storage> {
    engine: &'a BracketEngine<S>,
}

impl<S: Storage> ResetFacet<'_, S> {
    pub async fn match_results(&self, match_id: MatchId) -> Result<Match> {
        reset::reset_match_results(self.engine.storage(), match_id).await
    }

    pub async fn match_game_results(&self, game_id: MatchGameId) -> Result<MatchGame> {
        reset::reset_match_game_results(self.engine.storage(), game_id).await
    }

    pub async fn seeding(&self, stage_id: StageId) -> Result<Stage> {
        reset::reset_seeding(self.engine.storage(), stage_id).await
    }
}

/// A full, serializable snapshot of one tournament (§10.5 `export`/`import`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentDump {
    pub tournament_id: TournamentId,
    pub participants: Vec<Participant>,
    pub stages: Vec<Stage>,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
    pub match_games: Vec<MatchGame>,
}

impl<S: Storage> BracketEngine<S> {
    /// `export` (§10.5): dumps a tournament's full row set, ready to `import` into a
    /// fresh backend or archive to disk.
    pub async fn export(&self, tournament_id: TournamentId) -> Result<TournamentDump> {
        let data = query::tournament_data(&self.storage, tournament_id).await?;
        let mut groups = Vec::new();
        let mut rounds = Vec::new();
        let mut matches = Vec::new();
        let mut match_games = Vec::new();
        let mut stages = Vec::with_capacity(data.stages.len());
        for stage_data in data.stages {
            stages.push(stage_data.stage);
            groups.extend(stage_data.groups);
            rounds.extend(stage_data.rounds);
            matches.extend(stage_data.matches);
            match_games.extend(stage_data.match_games);
        }
        Ok(TournamentDump {
            tournament_id,
            participants: data.participants,
            stages,
            groups,
            rounds,
            matches,
            match_games,
        })
    }

    /// `import` (§10.5): persists a `TournamentDump` as-is, or with every id freshly
    /// minted (`normalize_ids`) so the same dump can be imported into a backend that
    /// already has a tournament under the original ids without colliding.
    pub async fn import(&self, dump: TournamentDump, normalize_ids: bool) -> Result<TournamentId> {
        if !normalize_ids {
            for participant in dump.participants {
                self.storage.insert_participant(participant).await?;
            }
            for stage in dump.stages {
                self.storage.insert_stage(stage).await?;
            }
            for group in dump.groups {
                self.storage.insert_group(group).await?;
            }
            for round in dump.rounds {
                self.storage.insert_round(round).await?;
            }
            for m in dump.matches {
                self.storage.insert_match(m).await?;
            }
            for game in dump.match_games {
                self.storage.insert_match_game(game).await?;
            }
            return Ok(dump.tournament_id);
        }

        let new_tournament_id = TournamentId::new();
        let mut participant_ids = HashMap::new();
        let mut stage_ids = HashMap::new();
        let mut group_ids = HashMap::new();
        let mut round_ids = HashMap::new();
        let mut match_ids = HashMap::new();

        for mut participant in dump.participants {
            let new_id = ParticipantId::new();
            participant_ids.insert(participant.id, new_id);
            participant.id = new_id;
            participant.tournament_id = new_tournament_id;
            self.storage.insert_participant(participant).await?;
        }
        for mut stage in dump.stages {
            let new_id = StageId::new();
            stage_ids.insert(stage.id, new_id);
            stage.id = new_id;
            stage.tournament_id = new_tournament_id;
            self.storage.insert_stage(stage).await?;
        }
        for mut group in dump.groups {
            let new_id = GroupId::new();
            group_ids.insert(group.id, new_id);
            group.id = new_id;
            group.tournament_id = new_tournament_id;
            group.stage_id = *stage_ids.get(&group.stage_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown stage"))?;
            self.storage.insert_group(group).await?;
        }
        for mut round in dump.rounds {
            let new_id = RoundId::new();
            round_ids.insert(round.id, new_id);
            round.id = new_id;
            round.tournament_id = new_tournament_id;
            round.stage_id = *stage_ids.get(&round.stage_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown stage"))?;
            round.group_id = *group_ids.get(&round.group_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown group"))?;
            self.storage.insert_round(round).await?;
        }
        for mut m in dump.matches {
            let new_id = MatchId::new();
            match_ids.insert(m.id, new_id);
            m.id = new_id;
            m.tournament_id = new_tournament_id;
            m.stage_id = *stage_ids.get(&m.stage_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown stage"))?;
            m.group_id = *group_ids.get(&m.group_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown group"))?;
            m.round_id = *round_ids.get(&m.round_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown round"))?;
            for slot in [&mut m.opponent1, &mut m.opponent2] {
                if let Some(o) = slot {
                    if let Some(old_id) = o.id {
                        o.id = participant_ids.get(&old_id).copied();
                    }
                }
            }
            self.storage.insert_match(m).await?;
        }
        for mut game in dump.match_games {
            game.id = MatchGameId::new();
            game.tournament_id = new_tournament_id;
            game.stage_id = *stage_ids.get(&game.stage_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown stage"))?;
            game.parent_id = *match_ids.get(&game.parent_id).ok_or_else(|| BracketError::invalid_input("dump references an unknown match"))?;
            for slot in [&mut game.opponent1, &mut game.opponent2] {
                if let Some(o) = slot {
                    if let Some(old_id) = o.id {
                        o.id = participant_ids.get(&old_id).copied();
                    }
                }
            }
            self.storage.insert_match_game(game).await?;
        }
        Ok(new_tournament_id)
    }
}
