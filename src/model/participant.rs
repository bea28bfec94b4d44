use super::ids::{ParticipantId, TournamentId};
use serde::{Deserialize, Serialize};

/// A tournament participant. Created once by the seeding extractor and shared by
/// every stage of the tournament; the engine never deletes a participant as a side
/// effect of mutating a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub name: String,
}

impl Participant {
    pub fn new(tournament_id: TournamentId, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            tournament_id,
            name: name.into(),
        }
    }
}

/// One entry of an input seeding, before participants have been registered.
///
/// A seeding is a list of these; `Bye` occupies a slot without creating a participant,
/// `Name` registers a new-or-existing participant looked up by name, and `Id` refers to
/// a participant that must already exist under the tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedEntry {
    Bye,
    Name(String),
    Id(ParticipantId),
}

impl SeedEntry {
    pub fn is_bye(&self) -> bool {
        matches!(self, SeedEntry::Bye)
    }
}
