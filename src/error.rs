use crate::model::ids::{GroupId, MatchGameId, MatchId, ParticipantId, RoundId, StageId};
use thiserror::Error;

/// The five error kinds of §7, plus a `Storage` escape hatch for adapter failures that
/// are not the engine's own preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Locked,
    Impossible,
    NotImplemented,
    Storage,
}

/// All ways a `BracketEngine` operation can fail.
///
/// Every variant's `Display` message matches §7's triggering condition, and the exact
/// text quoted by the spec ("The match is locked", "A match is locked", "A match of
/// round 1 is archived", "Two winners", …) is reproduced verbatim so that tests written
/// against those strings keep working.
#[derive(Error, Debug)]
pub enum BracketError {
    #[error("Stage not found: {0}")]
    StageNotFound(StageId),
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),
    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),
    #[error("Match game not found: {0}")]
    MatchGameNotFound(MatchGameId),
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("The match is locked")]
    MatchLocked(MatchId),
    #[error("A match is locked")]
    SeedingLocked,
    #[error("A match of round 1 is archived")]
    Round1Archived,

    #[error("Impossible state: {0}")]
    Impossible(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BracketError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        BracketError::InvalidInput(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        BracketError::NotImplemented(msg.into())
    }

    pub fn impossible(msg: impl Into<String>) -> Self {
        BracketError::Impossible(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        BracketError::Storage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        use BracketError::*;
        match self {
            StageNotFound(_)
            | GroupNotFound(_)
            | RoundNotFound(_)
            | MatchNotFound(_)
            | MatchGameNotFound(_)
            | ParticipantNotFound(_) => ErrorKind::NotFound,
            InvalidInput(_) => ErrorKind::InvalidInput,
            MatchLocked(_) | SeedingLocked | Round1Archived => ErrorKind::Locked,
            Impossible(_) => ErrorKind::Impossible,
            NotImplemented(_) => ErrorKind::NotImplemented,
            Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, BracketError>;
