// Positional scarcity for a single team.
//
// For each position the team still has room for, compares how many players
// remain at that position against how many picks the team has left. Fewer
// players per remaining pick means a higher urgency.

use crate::draft::pick::Position;
use crate::valuation::catalog::Player;
use crate::valuation::scoring::{ScoringConfig, TeamNeeds};

// ---------------------------------------------------------------------------
// Scarcity urgency levels
// ---------------------------------------------------------------------------

/// How urgently a position needs to be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScarcityUrgency {
    /// At most one player left per remaining pick.
    Critical,
    /// Up to two players per remaining pick.
    High,
    /// Up to four players per remaining pick.
    Medium,
    /// Plenty left.
    Low,
}

impl ScarcityUrgency {
    /// Determine urgency from available players per remaining team pick.
    pub fn from_supply(players_per_pick: f64) -> Self {
        if players_per_pick <= 1.0 {
            ScarcityUrgency::Critical
        } else if players_per_pick <= 2.0 {
            ScarcityUrgency::High
        } else if players_per_pick <= 4.0 {
            ScarcityUrgency::Medium
        } else {
            ScarcityUrgency::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScarcityUrgency::Critical => "CRITICAL",
            ScarcityUrgency::High => "HIGH",
            ScarcityUrgency::Medium => "MEDIUM",
            ScarcityUrgency::Low => "LOW",
        }
    }

    /// Multiplier applied to the scarcity component of a player's score.
    pub fn weight(&self) -> f64 {
        match self {
            ScarcityUrgency::Critical => 1.0,
            ScarcityUrgency::High => 0.75,
            ScarcityUrgency::Medium => 0.5,
            ScarcityUrgency::Low => 0.25,
        }
    }
}

// ---------------------------------------------------------------------------
// Scarcity entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScarcityEntry {
    pub position: Position,
    /// Players still available at this position.
    pub available: usize,
    /// Roster spots the team can still fill at this position.
    pub open_slots: u32,
    pub limit: u32,
    pub urgency: ScarcityUrgency,
}

impl ScarcityEntry {
    pub fn is_filled(&self) -> bool {
        self.open_slots == 0
    }

    /// Scarcity bonus in `[0, 1]`: the open fraction of the position's limit
    /// scaled by urgency. Zero for filled positions.
    pub fn bonus(&self) -> f64 {
        if self.is_filled() || self.limit == 0 {
            return 0.0;
        }
        f64::from(self.open_slots) / f64::from(self.limit) * self.urgency.weight()
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Compute per-position scarcity for one team.
pub fn compute_scarcity(
    available: &[&Player],
    needs: &TeamNeeds,
    config: &ScoringConfig,
) -> Vec<ScarcityEntry> {
    let remaining_picks = f64::from(needs.remaining_rounds.max(1));

    Position::ALL
        .iter()
        .map(|&position| {
            let count = available.iter().filter(|p| p.position == position).count();
            let limit = config.limit(position);
            let open_slots = limit.saturating_sub(needs.count(position));
            let urgency = ScarcityUrgency::from_supply(count as f64 / remaining_picks);
            ScarcityEntry {
                position,
                available: count,
                open_slots,
                limit,
                urgency,
            }
        })
        .collect()
}

pub fn scarcity_for_position(
    scarcity: &[ScarcityEntry],
    position: Position,
) -> Option<&ScarcityEntry> {
    scarcity.iter().find(|e| e.position == position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn player(id: &str, position: Position) -> Player {
        Player {
            id: id.into(),
            name: id.into(),
            position,
            team: "Team".into(),
            projection: 100.0,
            adp: 50.0,
        }
    }

    fn needs(counts: &[(Position, u32)], remaining_rounds: u32) -> TeamNeeds {
        TeamNeeds {
            slot: 1,
            counts: counts.iter().copied().collect::<HashMap<_, _>>(),
            total_picks: counts.iter().map(|(_, c)| c).sum(),
            remaining_rounds,
        }
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(ScarcityUrgency::from_supply(0.0), ScarcityUrgency::Critical);
        assert_eq!(ScarcityUrgency::from_supply(1.0), ScarcityUrgency::Critical);
        assert_eq!(ScarcityUrgency::from_supply(1.5), ScarcityUrgency::High);
        assert_eq!(ScarcityUrgency::from_supply(3.0), ScarcityUrgency::Medium);
        assert_eq!(ScarcityUrgency::from_supply(10.0), ScarcityUrgency::Low);
        assert_eq!(ScarcityUrgency::Critical.label(), "CRITICAL");
    }

    #[test]
    fn scarce_position_gets_larger_bonus() {
        let pool: Vec<Player> = (0..20)
            .map(|i| player(&format!("wr-{i}"), Position::WideReceiver))
            .chain(std::iter::once(player("te-0", Position::TightEnd)))
            .collect();
        let available: Vec<&Player> = pool.iter().collect();
        let config = ScoringConfig::default();
        let entries = compute_scarcity(&available, &needs(&[], 2), &config);

        let te = scarcity_for_position(&entries, Position::TightEnd).unwrap();
        let wr = scarcity_for_position(&entries, Position::WideReceiver).unwrap();
        assert_eq!(te.urgency, ScarcityUrgency::Critical);
        assert_eq!(wr.urgency, ScarcityUrgency::Low);
        assert!(te.bonus() > wr.bonus());
    }

    #[test]
    fn filled_position_has_no_bonus() {
        let pool = [player("k-0", Position::Kicker)];
        let available: Vec<&Player> = pool.iter().collect();
        let config = ScoringConfig::default();
        let limit = config.limit(Position::Kicker);
        let entries = compute_scarcity(&available, &needs(&[(Position::Kicker, limit)], 5), &config);
        let k = scarcity_for_position(&entries, Position::Kicker).unwrap();
        assert!(k.is_filled());
        assert_eq!(k.bonus(), 0.0);
    }
}
