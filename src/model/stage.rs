use super::ids::{StageId, TournamentId};
use crate::ordering::OrderingMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    RoundRobin,
    SingleElimination,
    DoubleElimination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundRobinMode {
    Simple,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrandFinalKind {
    None,
    Simple,
    Double,
}

/// The enumerated, all-optional settings of §3. `size`, `group_count` and the
/// `manual_ordering` permutation are validated by `topology::creator` against the
/// concrete seeding at construction time; everything else has a documented default
/// applied at that point too (never silently defaulted deeper in the engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    pub size: Option<u32>,
    pub seed_ordering: Option<Vec<OrderingMethod>>,
    pub group_count: Option<u32>,
    pub round_robin_mode: Option<RoundRobinMode>,
    pub consolation_final: Option<bool>,
    pub grand_final: Option<GrandFinalKind>,
    pub skip_first_round: Option<bool>,
    pub balance_byes: Option<bool>,
    pub matches_child_count: Option<u32>,
    /// Explicit per-group seed permutation (round-robin only): one `Vec<usize>` of
    /// 0-based indices into the (already BYE-padded) seeding, per group.
    pub manual_ordering: Option<Vec<Vec<usize>>>,
}

impl StageSettings {
    pub fn round_robin_mode(&self) -> RoundRobinMode {
        self.round_robin_mode.unwrap_or(RoundRobinMode::Simple)
    }

    pub fn grand_final(&self) -> GrandFinalKind {
        self.grand_final.unwrap_or(GrandFinalKind::Simple)
    }

    pub fn has_consolation_final(&self) -> bool {
        self.consolation_final.unwrap_or(false)
    }

    pub fn skips_first_round(&self) -> bool {
        self.skip_first_round.unwrap_or(false)
    }

    pub fn balances_byes(&self) -> bool {
        self.balance_byes.unwrap_or(false)
    }

    pub fn default_child_count(&self) -> u32 {
        self.matches_child_count.unwrap_or(0)
    }
}

/// One tournament phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub kind: StageKind,
    pub number: u32,
    pub settings: StageSettings,
}
