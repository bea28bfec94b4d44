//! The six entity kinds plus `Participant` (§3): `Stage ⊃ Group ⊃ Round ⊃ Match ⊃
//! MatchGame`, with `Participant` an orthogonal, stage-independent dimension.

pub mod group;
pub mod ids;
pub mod match_;
pub mod match_game;
pub mod participant;
pub mod round;
pub mod stage;

pub use group::Group;
pub use ids::{GroupId, MatchGameId, MatchId, ParticipantId, RoundId, StageId, TournamentId};
pub use match_::{Match, MatchResultValue, MatchStatus, Opponent, Side};
pub use match_game::MatchGame;
pub use participant::{Participant, SeedEntry};
pub use round::Round;
pub use stage::{GrandFinalKind, RoundRobinMode, Stage, StageKind, StageSettings};
