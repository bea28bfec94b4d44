use super::ids::{MatchGameId, MatchId, StageId, TournamentId};
use super::match_::{MatchStatus, Opponent};
use serde::{Deserialize, Serialize};

/// One game of a best-of-X series that rolls up into a parent `Match`. Shares the
/// `Opponent` slot type with `Match`, but `position` is never set on a game's slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchGame {
    pub id: MatchGameId,
    pub stage_id: StageId,
    pub tournament_id: TournamentId,
    pub parent_id: MatchId,
    pub number: u32,
    pub status: MatchStatus,
    pub opponent1: Option<Opponent>,
    pub opponent2: Option<Opponent>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
