use super::traits::{Filter, Storage};
use crate::error::{BracketError, Result};
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, Stage, StageId,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

fn storage_err(e: sqlx::Error) -> BracketError {
    BracketError::storage(e.to_string())
}

/// Postgres storage adapter (§6, feature-gated behind `postgres`).
///
/// Every entity is kept as one `id` column plus a `data JSONB` column holding the whole
/// row serialized with `serde_json` — the same representation the engine already uses
/// for the `extra` bag on `Opponent`/`Match`/`MatchGame`, so no hand-written column list
/// has to track every field the model adds. Parent-key columns are still broken out and
/// indexed, since `select_*`'s `Filter` needs to push those down into `WHERE` rather
/// than filtering client-side.
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPool::connect(connection_string).await.map_err(storage_err)?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                id UUID PRIMARY KEY,
                tournament_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_participants_tournament ON participants(tournament_id);

            CREATE TABLE IF NOT EXISTS stages (
                id UUID PRIMARY KEY,
                tournament_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_stages_tournament ON stages(tournament_id);

            CREATE TABLE IF NOT EXISTS groups (
                id UUID PRIMARY KEY,
                stage_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_groups_stage ON groups(stage_id);

            CREATE TABLE IF NOT EXISTS rounds (
                id UUID PRIMARY KEY,
                stage_id UUID NOT NULL,
                group_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rounds_stage ON rounds(stage_id);
            CREATE INDEX IF NOT EXISTS idx_rounds_group ON rounds(group_id);

            CREATE TABLE IF NOT EXISTS matches (
                id UUID PRIMARY KEY,
                stage_id UUID NOT NULL,
                group_id UUID NOT NULL,
                round_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_matches_stage ON matches(stage_id);
            CREATE INDEX IF NOT EXISTS idx_matches_group ON matches(group_id);
            CREATE INDEX IF NOT EXISTS idx_matches_round ON matches(round_id);

            CREATE TABLE IF NOT EXISTS match_games (
                id UUID PRIMARY KEY,
                parent_id UUID NOT NULL,
                data JSONB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_match_games_parent ON match_games(parent_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    fn decode<T: serde::de::DeserializeOwned>(row: &PgRow) -> Result<T> {
        let value: serde_json::Value = row.try_get("data").map_err(storage_err)?;
        serde_json::from_value(value).map_err(|e| BracketError::storage(e.to_string()))
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn insert_participant(&self, participant: Participant) -> Result<()> {
        let data = serde_json::to_value(&participant).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO participants (id, tournament_id, data) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(participant.id.as_uuid())
        .bind(participant.tournament_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query("SELECT data FROM participants WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_participants(&self, filter: Filter) -> Result<Vec<Participant>> {
        let rows = match filter.tournament_id {
            Some(t) => sqlx::query("SELECT data FROM participants WHERE tournament_id = $1")
                .bind(t.as_uuid())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT data FROM participants").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_participant(&self, participant: Participant) -> Result<()> {
        self.insert_participant(participant).await
    }

    async fn delete_participant(&self, id: ParticipantId) -> Result<()> {
        sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_stage(&self, stage: Stage) -> Result<()> {
        let data = serde_json::to_value(&stage).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO stages (id, tournament_id, data) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(stage.id.as_uuid())
        .bind(stage.tournament_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_stage(&self, id: StageId) -> Result<Option<Stage>> {
        let row = sqlx::query("SELECT data FROM stages WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_stages(&self, filter: Filter) -> Result<Vec<Stage>> {
        let rows = match filter.tournament_id {
            Some(t) => sqlx::query("SELECT data FROM stages WHERE tournament_id = $1")
                .bind(t.as_uuid())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT data FROM stages").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_stage(&self, stage: Stage) -> Result<()> {
        self.insert_stage(stage).await
    }

    async fn delete_stage(&self, id: StageId) -> Result<()> {
        sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        let data = serde_json::to_value(&group).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO groups (id, stage_id, data) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(group.id.as_uuid())
        .bind(group.stage_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_group(&self, id: GroupId) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT data FROM groups WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_groups(&self, filter: Filter) -> Result<Vec<Group>> {
        let rows = match filter.stage_id {
            Some(s) => sqlx::query("SELECT data FROM groups WHERE stage_id = $1")
                .bind(s.as_uuid())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT data FROM groups").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_group(&self, group: Group) -> Result<()> {
        self.insert_group(group).await
    }

    async fn delete_group(&self, id: GroupId) -> Result<()> {
        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_round(&self, round: Round) -> Result<()> {
        let data = serde_json::to_value(&round).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO rounds (id, stage_id, group_id, data) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(round.id.as_uuid())
        .bind(round.stage_id.as_uuid())
        .bind(round.group_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_round(&self, id: RoundId) -> Result<Option<Round>> {
        let row = sqlx::query("SELECT data FROM rounds WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_rounds(&self, filter: Filter) -> Result<Vec<Round>> {
        let rows = match (filter.group_id, filter.stage_id) {
            (Some(g), _) => sqlx::query("SELECT data FROM rounds WHERE group_id = $1")
                .bind(g.as_uuid())
                .fetch_all(&self.pool)
                .await,
            (None, Some(s)) => sqlx::query("SELECT data FROM rounds WHERE stage_id = $1")
                .bind(s.as_uuid())
                .fetch_all(&self.pool)
                .await,
            (None, None) => sqlx::query("SELECT data FROM rounds").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_round(&self, round: Round) -> Result<()> {
        self.insert_round(round).await
    }

    async fn delete_round(&self, id: RoundId) -> Result<()> {
        sqlx::query("DELETE FROM rounds WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_match(&self, m: Match) -> Result<()> {
        let data = serde_json::to_value(&m).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO matches (id, stage_id, group_id, round_id, data) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(m.id.as_uuid())
        .bind(m.stage_id.as_uuid())
        .bind(m.group_id.as_uuid())
        .bind(m.round_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_match(&self, id: MatchId) -> Result<Option<Match>> {
        let row = sqlx::query("SELECT data FROM matches WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_matches(&self, filter: Filter) -> Result<Vec<Match>> {
        let rows = match (filter.round_id, filter.group_id, filter.stage_id) {
            (Some(r), _, _) => sqlx::query("SELECT data FROM matches WHERE round_id = $1")
                .bind(r.as_uuid())
                .fetch_all(&self.pool)
                .await,
            (None, Some(g), _) => sqlx::query("SELECT data FROM matches WHERE group_id = $1")
                .bind(g.as_uuid())
                .fetch_all(&self.pool)
                .await,
            (None, None, Some(s)) => sqlx::query("SELECT data FROM matches WHERE stage_id = $1")
                .bind(s.as_uuid())
                .fetch_all(&self.pool)
                .await,
            (None, None, None) => sqlx::query("SELECT data FROM matches").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_match(&self, m: Match) -> Result<()> {
        self.insert_match(m).await
    }

    async fn delete_match(&self, id: MatchId) -> Result<()> {
        sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert_match_game(&self, game: MatchGame) -> Result<()> {
        let data = serde_json::to_value(&game).map_err(|e| BracketError::storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO match_games (id, parent_id, data) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(game.id.as_uuid())
        .bind(game.parent_id.as_uuid())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn select_match_game(&self, id: MatchGameId) -> Result<Option<MatchGame>> {
        let row = sqlx::query("SELECT data FROM match_games WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| Self::decode(&r)).transpose()
    }

    async fn select_match_games(&self, filter: Filter) -> Result<Vec<MatchGame>> {
        let rows = match filter.match_id {
            Some(m) => sqlx::query("SELECT data FROM match_games WHERE parent_id = $1")
                .bind(m.as_uuid())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT data FROM match_games").fetch_all(&self.pool).await,
        }
        .map_err(storage_err)?;
        rows.iter().map(Self::decode).collect()
    }

    async fn update_match_game(&self, game: MatchGame) -> Result<()> {
        self.insert_match_game(game).await
    }

    async fn delete_match_game(&self, id: MatchGameId) -> Result<()> {
        sqlx::query("DELETE FROM match_games WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
