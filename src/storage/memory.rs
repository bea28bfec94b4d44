use super::traits::{Filter, Storage};
use crate::error::{BracketError, Result};
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, Stage, StageId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory storage adapter: the engine's default backend, and what every unit and
/// integration test runs against. One `RwLock<HashMap<Id, Row>>` per entity kind,
/// mirroring the teacher SDK's `InMemoryAdapter`.
#[derive(Default)]
pub struct InMemoryStorage {
    participants: RwLock<HashMap<ParticipantId, Participant>>,
    stages: RwLock<HashMap<StageId, Stage>>,
    groups: RwLock<HashMap<GroupId, Group>>,
    rounds: RwLock<HashMap<RoundId, Round>>,
    matches: RwLock<HashMap<MatchId, Match>>,
    match_games: RwLock<HashMap<MatchGameId, MatchGame>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter_stage(stage_id: StageId, filter: &Filter) -> bool {
    filter.stage_id.map_or(true, |f| f == stage_id)
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert_participant(&self, participant: Participant) -> Result<()> {
        self.participants.write().await.insert(participant.id, participant);
        Ok(())
    }

    async fn select_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self.participants.read().await.get(&id).cloned())
    }

    async fn select_participants(&self, filter: Filter) -> Result<Vec<Participant>> {
        Ok(self
            .participants
            .read()
            .await
            .values()
            .filter(|p| filter.tournament_id.map_or(true, |t| t == p.tournament_id))
            .cloned()
            .collect())
    }

    async fn update_participant(&self, participant: Participant) -> Result<()> {
        let mut guard = self.participants.write().await;
        if !guard.contains_key(&participant.id) {
            return Err(BracketError::ParticipantNotFound(participant.id));
        }
        guard.insert(participant.id, participant);
        Ok(())
    }

    async fn delete_participant(&self, id: ParticipantId) -> Result<()> {
        self.participants.write().await.remove(&id);
        Ok(())
    }

    async fn insert_stage(&self, stage: Stage) -> Result<()> {
        self.stages.write().await.insert(stage.id, stage);
        Ok(())
    }

    async fn select_stage(&self, id: StageId) -> Result<Option<Stage>> {
        Ok(self.stages.read().await.get(&id).cloned())
    }

    async fn select_stages(&self, filter: Filter) -> Result<Vec<Stage>> {
        Ok(self
            .stages
            .read()
            .await
            .values()
            .filter(|s| filter.tournament_id.map_or(true, |t| t == s.tournament_id))
            .cloned()
            .collect())
    }

    async fn update_stage(&self, stage: Stage) -> Result<()> {
        let mut guard = self.stages.write().await;
        if !guard.contains_key(&stage.id) {
            return Err(BracketError::StageNotFound(stage.id));
        }
        guard.insert(stage.id, stage);
        Ok(())
    }

    async fn delete_stage(&self, id: StageId) -> Result<()> {
        self.stages.write().await.remove(&id);
        Ok(())
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        self.groups.write().await.insert(group.id, group);
        Ok(())
    }

    async fn select_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn select_groups(&self, filter: Filter) -> Result<Vec<Group>> {
        Ok(self
            .groups
            .read()
            .await
            .values()
            .filter(|g| matches_filter_stage(g.stage_id, &filter))
            .cloned()
            .collect())
    }

    async fn update_group(&self, group: Group) -> Result<()> {
        let mut guard = self.groups.write().await;
        if !guard.contains_key(&group.id) {
            return Err(BracketError::GroupNotFound(group.id));
        }
        guard.insert(group.id, group);
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<()> {
        self.groups.write().await.remove(&id);
        Ok(())
    }

    async fn insert_round(&self, round: Round) -> Result<()> {
        self.rounds.write().await.insert(round.id, round);
        Ok(())
    }

    async fn select_round(&self, id: RoundId) -> Result<Option<Round>> {
        Ok(self.rounds.read().await.get(&id).cloned())
    }

    async fn select_rounds(&self, filter: Filter) -> Result<Vec<Round>> {
        Ok(self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| {
                matches_filter_stage(r.stage_id, &filter)
                    && filter.group_id.map_or(true, |g| g == r.group_id)
            })
            .cloned()
            .collect())
    }

    async fn update_round(&self, round: Round) -> Result<()> {
        let mut guard = self.rounds.write().await;
        if !guard.contains_key(&round.id) {
            return Err(BracketError::RoundNotFound(round.id));
        }
        guard.insert(round.id, round);
        Ok(())
    }

    async fn delete_round(&self, id: RoundId) -> Result<()> {
        self.rounds.write().await.remove(&id);
        Ok(())
    }

    async fn insert_match(&self, m: Match) -> Result<()> {
        self.matches.write().await.insert(m.id, m);
        Ok(())
    }

    async fn select_match(&self, id: MatchId) -> Result<Option<Match>> {
        Ok(self.matches.read().await.get(&id).cloned())
    }

    async fn select_matches(&self, filter: Filter) -> Result<Vec<Match>> {
        Ok(self
            .matches
            .read()
            .await
            .values()
            .filter(|m| {
                matches_filter_stage(m.stage_id, &filter)
                    && filter.group_id.map_or(true, |g| g == m.group_id)
                    && filter.round_id.map_or(true, |r| r == m.round_id)
            })
            .cloned()
            .collect())
    }

    async fn update_match(&self, m: Match) -> Result<()> {
        let mut guard = self.matches.write().await;
        if !guard.contains_key(&m.id) {
            return Err(BracketError::MatchNotFound(m.id));
        }
        guard.insert(m.id, m);
        Ok(())
    }

    async fn delete_match(&self, id: MatchId) -> Result<()> {
        self.matches.write().await.remove(&id);
        Ok(())
    }

    async fn insert_match_game(&self, game: MatchGame) -> Result<()> {
        self.match_games.write().await.insert(game.id, game);
        Ok(())
    }

    async fn select_match_game(&self, id: MatchGameId) -> Result<Option<MatchGame>> {
        Ok(self.match_games.read().await.get(&id).cloned())
    }

    async fn select_match_games(&self, filter: Filter) -> Result<Vec<MatchGame>> {
        Ok(self
            .match_games
            .read()
            .await
            .values()
            .filter(|g| filter.match_id.map_or(true, |m| m == g.parent_id))
            .cloned()
            .collect())
    }

    async fn update_match_game(&self, game: MatchGame) -> Result<()> {
        let mut guard = self.match_games.write().await;
        if !guard.contains_key(&game.id) {
            return Err(BracketError::MatchGameNotFound(game.id));
        }
        guard.insert(game.id, game);
        Ok(())
    }

    async fn delete_match_game(&self, id: MatchGameId) -> Result<()> {
        self.match_games.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TournamentId;

    #[tokio::test]
    async fn round_trips_a_participant() {
        let storage = InMemoryStorage::new();
        let participant = Participant::new(TournamentId::new(), "Alice");
        storage.insert_participant(participant.clone()).await.unwrap();
        let loaded = storage.select_participant(participant.id).await.unwrap();
        assert_eq!(loaded, Some(participant));
    }

    #[tokio::test]
    async fn update_of_unknown_stage_is_not_found() {
        let storage = InMemoryStorage::new();
        let stage = Stage {
            id: StageId::new(),
            tournament_id: TournamentId::new(),
            name: "Stage".into(),
            kind: crate::model::StageKind::SingleElimination,
            number: 1,
            settings: Default::default(),
        };
        let err = storage.update_stage(stage).await.unwrap_err();
        assert!(matches!(err, BracketError::StageNotFound(_)));
    }

    #[tokio::test]
    async fn delete_stage_cascade_removes_descendants() {
        let storage = InMemoryStorage::new();
        let tournament_id = TournamentId::new();
        let stage_id = StageId::new();
        let group_id = GroupId::new();
        let round_id = RoundId::new();
        storage
            .insert_stage(Stage {
                id: stage_id,
                tournament_id,
                name: "Stage".into(),
                kind: crate::model::StageKind::SingleElimination,
                number: 1,
                settings: Default::default(),
            })
            .await
            .unwrap();
        storage.insert_group(Group { id: group_id, stage_id, tournament_id, number: 1 }).await.unwrap();
        storage.insert_round(Round { id: round_id, stage_id, tournament_id, group_id, number: 1 }).await.unwrap();
        let match_id = MatchId::new();
        storage
            .insert_match(Match {
                id: match_id,
                stage_id,
                tournament_id,
                group_id,
                round_id,
                number: 1,
                status: crate::model::MatchStatus::Locked,
                opponent1: Some(crate::model::Opponent::tbd()),
                opponent2: Some(crate::model::Opponent::tbd()),
                child_count: 0,
                extra: Default::default(),
            })
            .await
            .unwrap();

        storage.delete_stage_cascade(stage_id).await.unwrap();

        assert!(storage.select_stage(stage_id).await.unwrap().is_none());
        assert!(storage.select_groups(Filter::by_stage(stage_id)).await.unwrap().is_empty());
        assert!(storage.select_rounds(Filter::by_stage(stage_id)).await.unwrap().is_empty());
        assert!(storage.select_matches(Filter::by_stage(stage_id)).await.unwrap().is_empty());
    }
}
