//! Match semantics (§4.3): pure predicates over a `Match`'s opponents/results, the
//! score-to-result promotion rule, opponent-side inversion, and Best-of-X parent
//! reconciliation. Nothing here touches storage; `update` calls these functions and
//! persists their output.

use crate::error::{BracketError, Result};
use crate::model::{Match, MatchGame, MatchResultValue, MatchStatus, Opponent, Side};

pub fn is_match_started(m: &Match) -> bool {
    side_started(&m.opponent1) || side_started(&m.opponent2)
}

fn side_started(slot: &Option<Opponent>) -> bool {
    matches!(slot, Some(o) if o.score.is_some())
}

/// One side absent and the other present (not TBD), or both sides absent.
pub fn is_match_bye_completed(m: &Match) -> bool {
    match (&m.opponent1, &m.opponent2) {
        (None, None) => true,
        (None, Some(o)) | (Some(o), None) => o.id.is_some(),
        _ => false,
    }
}

pub fn is_match_completed(m: &Match) -> bool {
    if is_match_bye_completed(m) {
        return true;
    }
    let forfeited = matches!(&m.opponent1, Some(o) if o.has_forfeited())
        || matches!(&m.opponent2, Some(o) if o.has_forfeited());
    if forfeited {
        return true;
    }
    let both_drawn = matches!(
        (&m.opponent1, &m.opponent2),
        (Some(a), Some(b)) if a.result == Some(MatchResultValue::Draw) && b.result == Some(MatchResultValue::Draw)
    );
    if both_drawn {
        return true;
    }
    let any_win_or_loss = [&m.opponent1, &m.opponent2].into_iter().any(|slot| {
        matches!(
            slot,
            Some(o) if matches!(o.result, Some(MatchResultValue::Win) | Some(MatchResultValue::Loss))
        )
    });
    any_win_or_loss
}

pub fn is_match_update_locked(m: &Match) -> bool {
    matches!(
        m.status,
        MatchStatus::Locked | MatchStatus::Waiting | MatchStatus::Archived
    ) || is_match_bye_completed(m)
}

pub fn is_match_participant_locked(m: &Match) -> bool {
    m.status >= MatchStatus::Running
}

pub fn is_match_stale(m: &Match) -> bool {
    m.status >= MatchStatus::Completed || is_match_bye_completed(m)
}

/// Computes the match's status purely from its two slots (§4.2 "Match status at
/// creation", reused by the updater whenever a slot is rewritten without an explicit
/// status, e.g. `setNextOpponent`/`resetNextOpponent`).
pub fn compute_status_from_opponents(o1: &Option<Opponent>, o2: &Option<Opponent>) -> MatchStatus {
    let has_bye = o1.is_none() || o2.is_none();
    if has_bye {
        return MatchStatus::Locked;
    }
    let (a, b) = (o1.as_ref().unwrap(), o2.as_ref().unwrap());
    if a.is_tbd() && b.is_tbd() {
        return MatchStatus::Locked;
    }
    if a.is_tbd() || b.is_tbd() {
        return MatchStatus::Waiting;
    }
    MatchStatus::Ready
}

/// The winning side of a completed, non-drawn match (§4.3 `getMatchResult`). Returns
/// `Ok(None)` if the match isn't completed, or is a legitimate draw.
pub fn get_match_result(m: &Match) -> Result<Option<Side>> {
    if !is_match_completed(m) {
        return Ok(None);
    }
    let drawn = matches!(
        (&m.opponent1, &m.opponent2),
        (Some(a), Some(b)) if a.result == Some(MatchResultValue::Draw) && b.result == Some(MatchResultValue::Draw)
    );
    if drawn {
        return Ok(None);
    }

    let wins_by_rule = |side: &Option<Opponent>, other: &Option<Opponent>| -> bool {
        match side {
            Some(o) if o.result == Some(MatchResultValue::Win) => true,
            _ => match other {
                None => true,
                Some(o) => o.has_forfeited(),
            },
        }
    };

    let o1_wins = wins_by_rule(&m.opponent1, &m.opponent2);
    let o2_wins = wins_by_rule(&m.opponent2, &m.opponent1);

    let o1_forfeit = matches!(&m.opponent1, Some(o) if o.has_forfeited());
    let o2_forfeit = matches!(&m.opponent2, Some(o) if o.has_forfeited());
    if o1_forfeit && o2_forfeit {
        return Err(BracketError::impossible("Two forfeits"));
    }

    let o1_loss = matches!(&m.opponent1, Some(o) if o.result == Some(MatchResultValue::Loss));
    let o2_loss = matches!(&m.opponent2, Some(o) if o.result == Some(MatchResultValue::Loss));
    if o1_loss && o2_loss {
        return Err(BracketError::impossible("Two losers"));
    }

    match (o1_wins, o2_wins) {
        (true, true) => Err(BracketError::impossible("Two winners")),
        (true, false) => Ok(Some(Side::Opponent1)),
        (false, true) => Ok(Some(Side::Opponent2)),
        (false, false) => Ok(None),
    }
}

/// A caller-supplied change to one slot of a `Match`/`MatchGame`. All fields are
/// optional: only the ones present are applied, matching §4.3's "extra fields are
/// copied verbatim" preservation rule for everything the caller doesn't touch.
#[derive(Debug, Clone, Default)]
pub struct OpponentPatch {
    pub id: Option<ParticipantIdPatch>,
    pub score: Option<i64>,
    pub result: Option<MatchResultValue>,
    pub forfeit: Option<bool>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Three-state id update: untouched, explicitly cleared back to TBD, or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantIdPatch {
    Clear,
    Set(crate::model::ParticipantId),
}

impl OpponentPatch {
    fn apply(&self, slot: &mut Opponent) {
        match self.id {
            Some(ParticipantIdPatch::Clear) => slot.id = None,
            Some(ParticipantIdPatch::Set(id)) => slot.id = Some(id),
            None => {}
        }
        if let Some(score) = self.score {
            slot.score = Some(score);
        }
        if let Some(result) = self.result {
            slot.result = Some(result);
        }
        if let Some(forfeit) = self.forfeit {
            slot.forfeit = Some(forfeit);
        }
        for (k, v) in &self.extra {
            slot.extra.insert(k.clone(), v.clone());
        }
    }
}

/// A caller-supplied partial update to a `Match` (§4.6 `updateMatch`'s `partialMatch`).
#[derive(Debug, Clone, Default)]
pub struct MatchPatch {
    pub status: Option<MatchStatus>,
    pub opponent1: Option<OpponentPatch>,
    pub opponent2: Option<OpponentPatch>,
    pub child_count: Option<u32>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What changed as a result of applying a patch, driving whether `update_related_matches`
/// needs to run (§4.6 step 4: "if resultChanged || statusChanged").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub status_changed: bool,
    pub result_changed: bool,
}

/// Applies `patch` to `stored` in place, implementing §4.6 step 2 (`setMatchResults`).
/// `allow_draw` is `true` only for round-robin matches (draws are `Impossible` in
/// elimination stages, per §4.3 and §7).
pub fn set_match_results(
    stored: &mut Match,
    mut patch: MatchPatch,
    allow_draw: bool,
) -> Result<PatchOutcome> {
    let original_status = stored.status;
    let original_result = get_match_result(stored)?;
    let was_completed = is_match_completed(stored);

    // Opponent inversion (§4.3): if the incoming opponent1 id names the match's
    // current opponent2 (or vice versa), the caller is addressing sides by identity
    // rather than position — swap the patch before applying it.
    if let (Some(p1), Some(stored2)) = (&patch.opponent1, &stored.opponent2) {
        if let Some(ParticipantIdPatch::Set(id)) = p1.id {
            if stored2.id == Some(id) {
                std::mem::swap(&mut patch.opponent1, &mut patch.opponent2);
            }
        }
    }

    // Explicit `status = Running` resets any previously recorded result (§4.6 step 2,
    // §9 Open Question 2: explicit Running takes precedence over score promotion).
    let explicit_running = patch.status == Some(MatchStatus::Running);
    if explicit_running {
        for slot in [&mut stored.opponent1, &mut stored.opponent2] {
            if let Some(o) = slot {
                o.result = None;
            }
        }
    }

    if let Some(p) = patch.opponent1.take() {
        if let Some(slot) = stored.opponent1.as_mut() {
            p.apply(slot);
        }
    }
    if let Some(p) = patch.opponent2.take() {
        if let Some(slot) = stored.opponent2.as_mut() {
            p.apply(slot);
        }
    }
    for (k, v) in patch.extra {
        stored.extra.insert(k, v);
    }
    if let Some(cc) = patch.child_count {
        stored.child_count = cc;
    }

    let scores_changed = side_started(&stored.opponent1) || side_started(&stored.opponent2);

    let should_try_complete = !explicit_running
        && (patch.status == Some(MatchStatus::Completed)
            || both_scores_present(stored)
            || is_match_completed(stored));

    if should_try_complete {
        promote_scores_to_result(stored, allow_draw)?;
    }

    if is_match_completed(stored) {
        stored.status = MatchStatus::Completed;
    } else if explicit_running || scores_changed {
        stored.status = MatchStatus::Running;
    } else if let Some(status) = patch.status {
        stored.status = status;
    } else {
        stored.status = compute_status_from_opponents(&stored.opponent1, &stored.opponent2);
    }

    // If the match regressed out of Completed, drop any leftover results.
    if was_completed && !is_match_completed(stored) {
        for slot in [&mut stored.opponent1, &mut stored.opponent2] {
            if let Some(o) = slot {
                o.result = None;
            }
        }
    }

    let new_result = get_match_result(stored)?;
    Ok(PatchOutcome {
        status_changed: stored.status != original_status,
        result_changed: new_result != original_result,
    })
}

fn both_scores_present(m: &Match) -> bool {
    matches!((&m.opponent1, &m.opponent2), (Some(a), Some(b)) if a.score.is_some() && b.score.is_some())
}

/// Score → result promotion (§4.3): infers `win`/`loss` for the higher score, or
/// `draw` for equal scores — rejecting draws outside round-robin.
fn promote_scores_to_result(m: &mut Match, allow_draw: bool) -> Result<()> {
    let (Some(a), Some(b)) = (m.opponent1.as_ref(), m.opponent2.as_ref()) else {
        return Ok(());
    };
    // Apply forfeits first: a forfeited side's opponent always wins, independent of score.
    let a_forfeit = a.has_forfeited();
    let b_forfeit = b.has_forfeited();
    if a_forfeit || b_forfeit {
        return Ok(()); // `get_match_result` derives the winner from forfeit flags directly.
    }
    let (Some(sa), Some(sb)) = (a.score, b.score) else {
        return Ok(());
    };
    if a.result.is_some() || b.result.is_some() {
        return Ok(()); // caller already supplied explicit results; don't override.
    }
    use std::cmp::Ordering::*;
    match sa.cmp(&sb) {
        Greater => {
            m.opponent1.as_mut().unwrap().result = Some(MatchResultValue::Win);
            m.opponent2.as_mut().unwrap().result = Some(MatchResultValue::Loss);
        }
        Less => {
            m.opponent1.as_mut().unwrap().result = Some(MatchResultValue::Loss);
            m.opponent2.as_mut().unwrap().result = Some(MatchResultValue::Win);
        }
        Equal => {
            if !allow_draw {
                return Err(BracketError::impossible("Draw in elimination"));
            }
            m.opponent1.as_mut().unwrap().result = Some(MatchResultValue::Draw);
            m.opponent2.as_mut().unwrap().result = Some(MatchResultValue::Draw);
        }
    }
    Ok(())
}

/// Best-of-X parent completion (§4.3): counts each side's child-game wins and decides
/// whether the parent match is decided. Returns the computed `(opponent1_wins,
/// opponent2_wins, decided)`; `decided = false` means the series continues.
pub fn best_of_x_outcome(
    games: &[MatchGame],
    child_count: u32,
    allow_draw: bool,
) -> Result<BestOfXOutcome> {
    let mut wins1 = 0i64;
    let mut wins2 = 0i64;
    let mut played = 0u32;
    for game in games {
        let Ok(Some(side)) = get_match_result_game(game) else {
            if is_match_completed_game(game) {
                played += 1; // a drawn game still counts as played but awards no win
            }
            continue;
        };
        played += 1;
        match side {
            Side::Opponent1 => wins1 += 1,
            Side::Opponent2 => wins2 += 1,
        }
    }
    let needed = (child_count as i64 + 1) / 2;
    let decided = wins1 >= needed || wins2 >= needed;
    if decided {
        return Ok(BestOfXOutcome {
            opponent1_wins: wins1,
            opponent2_wins: wins2,
            result: if wins1 > wins2 {
                Some(MatchResultValue::Win)
            } else {
                Some(MatchResultValue::Loss)
            },
        });
    }
    if played == child_count && wins1 == wins2 {
        if !allow_draw {
            return Err(BracketError::impossible("Match games tie for parent"));
        }
        return Ok(BestOfXOutcome {
            opponent1_wins: wins1,
            opponent2_wins: wins2,
            result: Some(MatchResultValue::Draw),
        });
    }
    Ok(BestOfXOutcome {
        opponent1_wins: wins1,
        opponent2_wins: wins2,
        result: None,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct BestOfXOutcome {
    pub opponent1_wins: i64,
    pub opponent2_wins: i64,
    /// `None` while the series is still undecided.
    pub result: Option<MatchResultValue>,
}

fn is_match_completed_game(g: &MatchGame) -> bool {
    let m = as_match_view(g);
    is_match_completed(&m)
}

fn get_match_result_game(g: &MatchGame) -> Result<Option<Side>> {
    let m = as_match_view(g);
    get_match_result(&m)
}

/// `MatchGame` shares its opponent semantics with `Match` but isn't itself a `Match`;
/// this builds a throwaway `Match` view so the semantics functions above can be reused
/// without duplicating every predicate for `MatchGame`.
fn as_match_view(g: &MatchGame) -> Match {
    Match {
        id: crate::model::MatchId::from_uuid(g.id.as_uuid()),
        stage_id: g.stage_id,
        tournament_id: g.tournament_id,
        group_id: crate::model::GroupId::from_uuid(g.stage_id.as_uuid()),
        round_id: crate::model::RoundId::from_uuid(g.parent_id.as_uuid()),
        number: g.number,
        status: g.status,
        opponent1: g.opponent1.clone(),
        opponent2: g.opponent2.clone(),
        child_count: 0,
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParticipantId;

    fn participant() -> ParticipantId {
        ParticipantId::new()
    }

    fn base_match() -> Match {
        let stage_id = crate::model::StageId::new();
        let group_id = crate::model::GroupId::new();
        Match {
            id: crate::model::MatchId::new(),
            stage_id,
            tournament_id: crate::model::TournamentId::new(),
            group_id,
            round_id: crate::model::RoundId::new(),
            number: 1,
            status: MatchStatus::Ready,
            opponent1: Some(Opponent::of(participant())),
            opponent2: Some(Opponent::of(participant())),
            child_count: 0,
            extra: Default::default(),
        }
    }

    #[test]
    fn bye_completed_when_one_side_absent() {
        let mut m = base_match();
        m.opponent2 = None;
        assert!(is_match_bye_completed(&m));
        assert!(is_match_completed(&m));
    }

    #[test]
    fn score_promotion_declares_winner() {
        let mut m = base_match();
        let patch = MatchPatch {
            opponent1: Some(OpponentPatch {
                score: Some(2),
                ..Default::default()
            }),
            opponent2: Some(OpponentPatch {
                score: Some(1),
                ..Default::default()
            }),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        let outcome = set_match_results(&mut m, patch, false).unwrap();
        assert!(outcome.status_changed);
        assert!(outcome.result_changed);
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(get_match_result(&m).unwrap(), Some(Side::Opponent1));
    }

    #[test]
    fn tied_scores_forbidden_in_elimination() {
        let mut m = base_match();
        let patch = MatchPatch {
            opponent1: Some(OpponentPatch {
                score: Some(1),
                ..Default::default()
            }),
            opponent2: Some(OpponentPatch {
                score: Some(1),
                ..Default::default()
            }),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        let err = set_match_results(&mut m, patch, false).unwrap_err();
        assert!(matches!(err, BracketError::Impossible(_)));
    }

    #[test]
    fn tied_scores_allowed_in_round_robin() {
        let mut m = base_match();
        let patch = MatchPatch {
            opponent1: Some(OpponentPatch {
                score: Some(1),
                ..Default::default()
            }),
            opponent2: Some(OpponentPatch {
                score: Some(1),
                ..Default::default()
            }),
            status: Some(MatchStatus::Completed),
            ..Default::default()
        };
        set_match_results(&mut m, patch, true).unwrap();
        assert_eq!(get_match_result(&m).unwrap(), None);
        assert!(is_match_completed(&m));
    }

    #[test]
    fn explicit_running_clears_prior_result() {
        let mut m = base_match();
        m.opponent1.as_mut().unwrap().result = Some(MatchResultValue::Win);
        m.opponent2.as_mut().unwrap().result = Some(MatchResultValue::Loss);
        m.status = MatchStatus::Completed;
        let patch = MatchPatch {
            status: Some(MatchStatus::Running),
            ..Default::default()
        };
        set_match_results(&mut m, patch, false).unwrap();
        assert_eq!(m.status, MatchStatus::Running);
        assert!(m.opponent1.as_ref().unwrap().result.is_none());
    }

    #[test]
    fn opponent_inversion_swaps_patch_sides() {
        let mut m = base_match();
        let o2_id = m.opponent2.as_ref().unwrap().id.unwrap();
        let patch = MatchPatch {
            opponent1: Some(OpponentPatch {
                id: Some(ParticipantIdPatch::Set(o2_id)),
                score: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };
        set_match_results(&mut m, patch, true).unwrap();
        assert_eq!(m.opponent2.as_ref().unwrap().score, Some(5));
        assert_eq!(m.opponent1.as_ref().unwrap().score, None);
    }
}
