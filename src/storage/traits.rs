use crate::error::Result;
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, Stage, StageId, TournamentId,
};
use async_trait::async_trait;

/// A narrowing over one or more of an entity's foreign keys, shared by every
/// `select_*` family (§6 "uniform CRUD contract") so adapters implement one filter
/// translation instead of one per entity kind. Fields irrelevant to a given entity are
/// simply ignored by its query — e.g. `round_id` has no effect on `select_groups`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub tournament_id: Option<TournamentId>,
    pub stage_id: Option<StageId>,
    pub group_id: Option<GroupId>,
    pub round_id: Option<RoundId>,
    /// The parent `Match` for a `MatchGame` filter.
    pub match_id: Option<MatchId>,
}

impl Filter {
    pub fn by_tournament(tournament_id: TournamentId) -> Self {
        Self { tournament_id: Some(tournament_id), ..Default::default() }
    }

    pub fn by_stage(stage_id: StageId) -> Self {
        Self { stage_id: Some(stage_id), ..Default::default() }
    }

    pub fn by_group(group_id: GroupId) -> Self {
        Self { group_id: Some(group_id), ..Default::default() }
    }

    pub fn by_round(round_id: RoundId) -> Self {
        Self { round_id: Some(round_id), ..Default::default() }
    }

    pub fn by_match(match_id: MatchId) -> Self {
        Self { match_id: Some(match_id), ..Default::default() }
    }
}

/// The storage abstraction (§6): one method family per entity kind rather than a single
/// stringly-typed `table` parameter, so row types are checked at compile time. Both the
/// in-memory adapter (the engine's default, and what every unit test runs against) and
/// the optional Postgres adapter implement this same trait, so `engine::BracketEngine`
/// is generic over it rather than over a concrete backend.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn insert_participant(&self, participant: Participant) -> Result<()>;
    async fn select_participant(&self, id: ParticipantId) -> Result<Option<Participant>>;
    async fn select_participants(&self, filter: Filter) -> Result<Vec<Participant>>;
    async fn update_participant(&self, participant: Participant) -> Result<()>;
    async fn delete_participant(&self, id: ParticipantId) -> Result<()>;

    async fn insert_stage(&self, stage: Stage) -> Result<()>;
    async fn select_stage(&self, id: StageId) -> Result<Option<Stage>>;
    async fn select_stages(&self, filter: Filter) -> Result<Vec<Stage>>;
    async fn update_stage(&self, stage: Stage) -> Result<()>;
    async fn delete_stage(&self, id: StageId) -> Result<()>;

    async fn insert_group(&self, group: Group) -> Result<()>;
    async fn select_group(&self, id: GroupId) -> Result<Option<Group>>;
    async fn select_groups(&self, filter: Filter) -> Result<Vec<Group>>;
    async fn update_group(&self, group: Group) -> Result<()>;
    async fn delete_group(&self, id: GroupId) -> Result<()>;

    async fn insert_round(&self, round: Round) -> Result<()>;
    async fn select_round(&self, id: RoundId) -> Result<Option<Round>>;
    async fn select_rounds(&self, filter: Filter) -> Result<Vec<Round>>;
    async fn update_round(&self, round: Round) -> Result<()>;
    async fn delete_round(&self, id: RoundId) -> Result<()>;

    async fn insert_match(&self, m: Match) -> Result<()>;
    async fn select_match(&self, id: MatchId) -> Result<Option<Match>>;
    async fn select_matches(&self, filter: Filter) -> Result<Vec<Match>>;
    async fn update_match(&self, m: Match) -> Result<()>;
    async fn delete_match(&self, id: MatchId) -> Result<()>;

    async fn insert_match_game(&self, game: MatchGame) -> Result<()>;
    async fn select_match_game(&self, id: MatchGameId) -> Result<Option<MatchGame>>;
    async fn select_match_games(&self, filter: Filter) -> Result<Vec<MatchGame>>;
    async fn update_match_game(&self, game: MatchGame) -> Result<()>;
    async fn delete_match_game(&self, id: MatchGameId) -> Result<()>;

    /// Persists a freshly built `topology::creator::CreatedStage` in one call. The
    /// default implementation simply inserts every row in order; `Storage` is object
    /// safe so adapters that can batch (e.g. a single Postgres transaction) may still
    /// override it, but none of the bundled adapters need to.
    async fn insert_stage_tree(
        &self,
        stage: Stage,
        groups: Vec<Group>,
        rounds: Vec<Round>,
        matches: Vec<Match>,
    ) -> Result<()> {
        self.insert_stage(stage).await?;
        for group in groups {
            self.insert_group(group).await?;
        }
        for round in rounds {
            self.insert_round(round).await?;
        }
        for m in matches {
            self.insert_match(m).await?;
        }
        Ok(())
    }

    /// Removes every group, round, match and match game belonging to `stage_id`, then
    /// the stage itself (§5 `delete.stage`'s cascade). Implemented generically over the
    /// other methods so adapters get it for free.
    async fn delete_stage_cascade(&self, stage_id: StageId) -> Result<()> {
        for m in self.select_matches(Filter::by_stage(stage_id)).await? {
            for game in self.select_match_games(Filter::by_match(m.id)).await? {
                self.delete_match_game(game.id).await?;
            }
            self.delete_match(m.id).await?;
        }
        for round in self.select_rounds(Filter::by_stage(stage_id)).await? {
            self.delete_round(round.id).await?;
        }
        for group in self.select_groups(Filter::by_stage(stage_id)).await? {
            self.delete_group(group.id).await?;
        }
        self.delete_stage(stage_id).await
    }
}
