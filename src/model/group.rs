use super::ids::{GroupId, StageId, TournamentId};
use serde::{Deserialize, Serialize};

/// A sub-container within a stage. `number` is the positional key that also encodes the
/// group's role — see `topology::helpers::GroupKind` for how `(stage.type, number)` maps
/// to winner/loser/final-group semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub stage_id: StageId,
    pub tournament_id: TournamentId,
    pub number: u32,
}
