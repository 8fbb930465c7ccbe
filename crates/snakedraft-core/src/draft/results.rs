// Draft results: per-team rosters and an integrity audit built from the ledger.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::draft::pick::Pick;
use crate::draft::state::{Draft, DraftStatus, Participant, UserType};
use crate::valuation::catalog::{index_by_id, Player};

/// Shown for picks whose player is no longer in the catalog.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player_id: String,
    pub name: String,
    pub position: String,
    pub team: String,
    pub overall: u32,
    pub round: u32,
    pub autopick: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub slot: u32,
    pub participant_id: String,
    pub display_name: String,
    pub user_type: UserType,
    pub players: Vec<RosterEntry>,
    pub position_counts: BTreeMap<String, u32>,
    pub total_players: u32,
}

/// Integrity checks over the committed picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsAudit {
    pub no_duplicate_players: bool,
    /// Overall numbers run 1..=n without holes.
    pub gap_free_overall: bool,
    /// Pick count equals rounds * teams.
    pub correct_pick_count: bool,
    pub draft_complete: bool,
}

impl ResultsAudit {
    pub fn is_clean(&self) -> bool {
        self.no_duplicate_players && self.gap_free_overall
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResults {
    pub draft: Draft,
    pub participants: Vec<Participant>,
    pub picks: Vec<Pick>,
    pub summary_by_team: Vec<TeamSummary>,
    pub audit: ResultsAudit,
}

pub fn audit_picks(draft: &Draft, picks: &[Pick]) -> ResultsAudit {
    let mut seen = HashSet::new();
    let no_duplicate_players = picks.iter().all(|p| seen.insert(p.player_id.as_str()));

    let mut overalls: Vec<u32> = picks.iter().map(|p| p.overall).collect();
    overalls.sort_unstable();
    let gap_free_overall = overalls
        .iter()
        .enumerate()
        .all(|(i, &overall)| overall as usize == i + 1);

    ResultsAudit {
        no_duplicate_players,
        gap_free_overall,
        correct_pick_count: picks.len() as u32 == draft.settings.total_picks(),
        draft_complete: draft.status == DraftStatus::Complete,
    }
}

/// Assemble the by-team summary. Participants and picks are expected in
/// ledger order (by slot and by overall).
pub fn build_results(
    draft: Draft,
    participants: Vec<Participant>,
    picks: Vec<Pick>,
    players: &[Player],
) -> DraftResults {
    let index = index_by_id(players);

    let summary_by_team = participants
        .iter()
        .map(|participant| {
            let roster: Vec<RosterEntry> = picks
                .iter()
                .filter(|pick| pick.slot == participant.slot)
                .map(|pick| {
                    let player = index.get(pick.player_id.as_str());
                    RosterEntry {
                        player_id: pick.player_id.clone(),
                        name: player.map_or(UNKNOWN.into(), |p| p.name.clone()),
                        position: player
                            .map_or(UNKNOWN.into(), |p| p.position.display_str().to_string()),
                        team: player.map_or(UNKNOWN.into(), |p| p.team.clone()),
                        overall: pick.overall,
                        round: pick.round,
                        autopick: pick.autopick,
                    }
                })
                .collect();

            let mut position_counts = BTreeMap::new();
            for entry in &roster {
                *position_counts.entry(entry.position.clone()).or_insert(0) += 1;
            }

            TeamSummary {
                slot: participant.slot,
                participant_id: participant.id.clone(),
                display_name: participant.display_name.clone(),
                user_type: participant.user_type,
                total_players: roster.len() as u32,
                players: roster,
                position_counts,
            }
        })
        .collect();

    let audit = audit_picks(&draft, &picks);
    DraftResults {
        draft,
        participants,
        picks,
        summary_by_team,
        audit,
    }
}
