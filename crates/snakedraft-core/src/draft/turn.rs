// Turn calculation.
//
// Whose turn it is derives purely from the number of committed picks; no
// cached "current pick" field is ever trusted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::draft::state::DraftSettings;

/// Position in the draft for the next pick to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub overall: u32,
    pub round: u32,
    pub slot: u32,
    /// `None` when the draft has no pick timer.
    pub deadline: Option<DateTime<Utc>>,
}

/// Map a 1-based overall pick number to `(round, slot)`.
///
/// Snake drafts reverse the slot order on even rounds.
pub fn slot_for(overall: u32, num_teams: u32, snake: bool) -> (u32, u32) {
    let round = overall.div_ceil(num_teams);
    let idx = (overall - 1) % num_teams;
    let slot = if snake && round % 2 == 0 {
        num_teams - idx
    } else {
        idx + 1
    };
    (round, slot)
}

/// Compute the next turn after `committed` picks.
///
/// Returns `None` once every pick has been made.
pub fn next_turn(
    committed: u32,
    settings: &DraftSettings,
    last_pick_at: DateTime<Utc>,
) -> Option<Turn> {
    let overall = committed.checked_add(1)?;
    if overall > settings.total_picks() {
        return None;
    }
    let (round, slot) = slot_for(overall, settings.num_teams, settings.snake);
    let deadline = (settings.timer_per_pick_sec > 0)
        .then(|| last_pick_at + Duration::seconds(i64::from(settings.timer_per_pick_sec)));
    Some(Turn {
        overall,
        round,
        slot,
        deadline,
    })
}

/// Whether the pick timer has run out at `now`. Timerless turns never expire.
pub fn is_expired(turn: &Turn, now: DateTime<Utc>) -> bool {
    turn.deadline.is_some_and(|deadline| now > deadline)
}

/// The full slot sequence for a draft, one entry per overall pick.
pub fn pick_order(num_teams: u32, rounds: u32, snake: bool) -> Vec<u32> {
    (1..=num_teams * rounds)
        .map(|overall| slot_for(overall, num_teams, snake).1)
        .collect()
}
