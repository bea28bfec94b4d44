use super::ids::{GroupId, MatchId, ParticipantId, RoundId, StageId, TournamentId};
use serde::{Deserialize, Serialize};

/// The six-state match lifecycle of §3. Declaration order is significant: `derive(Ord)`
/// gives us the monotone `Locked < Waiting < Ready < Running < Completed < Archived`
/// comparison the spec relies on ("status >= Running", "status >= Completed") for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Locked,
    Waiting,
    Ready,
    Running,
    Completed,
    Archived,
}

/// The outcome recorded on one side of a completed, non-BYE match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResultValue {
    Win,
    Loss,
    Draw,
}

/// One side of a match or match game.
///
/// `id = None` is TBD (the slot exists but the participant is not yet known); the whole
/// slot being `None` at the `Match`/`MatchGame` level is a BYE (see `Match::opponent1`).
/// `position` is the origin seed used by navigation to route a match's winner/loser into
/// a specific side of a downstream match; it is only meaningful on `Match`, not
/// `MatchGame`, but lives here so the two entities can share one slot type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub id: Option<ParticipantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forfeit: Option<bool>,
    /// Caller-supplied keys outside the reserved set `{id, score, position, forfeit,
    /// result}`, preserved verbatim across read-modify-write cycles (§4.3 "Extra fields").
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Opponent {
    pub fn tbd() -> Self {
        Self::default()
    }

    pub fn of(id: ParticipantId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn is_tbd(&self) -> bool {
        self.id.is_none()
    }

    pub fn has_forfeited(&self) -> bool {
        self.forfeit.unwrap_or(false)
    }
}

/// A single contest between two slots, possibly composed of `child_count` child
/// `MatchGame`s in a best-of-X series (`child_count == 0` means a single-game match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub stage_id: StageId,
    pub tournament_id: TournamentId,
    pub group_id: GroupId,
    pub round_id: RoundId,
    pub number: u32,
    pub status: MatchStatus,
    /// `None` means BYE: the slot is permanently empty and its opponent auto-advances.
    pub opponent1: Option<Opponent>,
    pub opponent2: Option<Opponent>,
    pub child_count: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Match {
    pub fn opponent(&self, side: Side) -> &Option<Opponent> {
        match side {
            Side::Opponent1 => &self.opponent1,
            Side::Opponent2 => &self.opponent2,
        }
    }

    pub fn opponent_mut(&mut self, side: Side) -> &mut Option<Opponent> {
        match side {
            Side::Opponent1 => &mut self.opponent1,
            Side::Opponent2 => &mut self.opponent2,
        }
    }

    pub fn has_bye(&self) -> bool {
        self.opponent1.is_none() || self.opponent2.is_none()
    }

    pub fn both_tbd(&self) -> bool {
        match (&self.opponent1, &self.opponent2) {
            (Some(a), Some(b)) => a.is_tbd() && b.is_tbd(),
            _ => false,
        }
    }
}

/// Which of the two slots on a `Match`/`MatchGame` is being referenced. The spec's
/// `'opponent1'`/`'opponent2'` string literals become this enum throughout the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Opponent1,
    Opponent2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Opponent1 => Side::Opponent2,
            Side::Opponent2 => Side::Opponent1,
        }
    }

    /// `number % 2` alternation used by §4.5's default side-selection rule: odd match
    /// numbers feed `opponent1`, even match numbers feed `opponent2`.
    pub fn alternate_by(number: u32) -> Side {
        if number % 2 == 1 {
            Side::Opponent1
        } else {
            Side::Opponent2
        }
    }
}
