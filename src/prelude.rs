//! Prelude module with commonly used types and traits.
//!
//! ```rust
//! use bracket_engine::prelude::*;
//! ```

pub use crate::{
    engine::{BracketEngine, TournamentDump},
    error::{BracketError, ErrorKind, Result},
    find::BracketKind,
    model::{
        GrandFinalKind, Group, GroupId, Match, MatchGame, MatchGameId, MatchId, MatchResultValue,
        MatchStatus, Opponent, Participant, ParticipantId, Round, RoundId, RoundRobinMode,
        SeedEntry, Side, Stage, StageId, StageKind, StageSettings, TournamentId,
    },
    ordering::OrderingMethod,
    query::{StageData, StandingEntry, TournamentData},
    storage::{InMemoryStorage, Storage},
};

// Re-export common external dependencies
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use tokio::sync::RwLock;
pub use uuid::Uuid;
