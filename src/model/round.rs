use super::ids::{GroupId, RoundId, StageId, TournamentId};
use serde::{Deserialize, Serialize};

/// A collection of matches played in parallel within a group. `number` is 1-based
/// within the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub stage_id: StageId,
    pub tournament_id: TournamentId,
    pub group_id: GroupId,
    pub number: u32,
}
