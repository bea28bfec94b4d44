use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a `Copy` newtype around [`Uuid`] for one entity kind.
///
/// The teacher SDK passes bare `Uuid`s everywhere (players, parties, lobbies all share
/// the same type), which is fine when there is one dominant entity. This engine has six
/// entity kinds threaded through every call, so each gets its own type to make it a
/// compile error to pass a `RoundId` where a `MatchId` is expected.
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(TournamentId);
entity_id!(ParticipantId);
entity_id!(StageId);
entity_id!(GroupId);
entity_id!(RoundId);
entity_id!(MatchId);
entity_id!(MatchGameId);
