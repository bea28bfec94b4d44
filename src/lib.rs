//! bracket-engine
//!
//! A storage-agnostic bracket engine for round-robin, single- and double-elimination
//! tournament stages: topology construction from a seeding, the match state machine,
//! winner/loser propagation through the bracket (including BYE cascades), the locking
//! discipline that protects already-decided downstream matches, and the seed-ordering
//! functions that determine initial placement.
//!
//! # Quick start
//!
//! ```rust
//! use bracket_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let storage = InMemoryStorage::new();
//!     let engine = BracketEngine::new(storage);
//!
//!     let tournament_id = TournamentId::new();
//!     let stage = engine
//!         .create()
//!         .stage(
//!             tournament_id,
//!             "Main Event".to_string(),
//!             StageKind::SingleElimination,
//!             1,
//!             StageSettings::default(),
//!             vec![
//!                 SeedEntry::Name("A".into()),
//!                 SeedEntry::Name("B".into()),
//!                 SeedEntry::Name("C".into()),
//!                 SeedEntry::Name("D".into()),
//!             ],
//!         )
//!         .await?;
//!
//!     let _standings = engine.get().final_standings(stage.id).await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod find;
pub mod model;
pub mod navigation;
pub mod ordering;
pub mod query;
pub mod reset;
pub mod semantics;
pub mod storage;
pub mod topology;
pub mod update;

pub use engine::{
    BracketEngine, CreateFacet, DeleteFacet, FindFacet, GetFacet, ResetFacet, TournamentDump,
    UpdateFacet,
};
pub use error::{BracketError, ErrorKind, Result};
pub use find::BracketKind;
pub use model::{
    GrandFinalKind, Group, GroupId, Match, MatchGame, MatchGameId, MatchId, MatchResultValue,
    MatchStatus, Opponent, Participant, ParticipantId, Round, RoundId, RoundRobinMode, SeedEntry,
    Side, Stage, StageId, StageKind, StageSettings, TournamentId,
};
pub use ordering::OrderingMethod;
pub use query::{StageData, StandingEntry, TournamentData};
pub use storage::{InMemoryStorage, Storage};

/// Prelude module for convenient imports.
pub mod prelude;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
