// Draft and participant records, draft lifecycle, and per-draft settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::DraftError;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Draft status. Moves only forward: pending -> active -> complete | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Active,
    Complete,
    Failed,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Active => "active",
            DraftStatus::Complete => "complete",
            DraftStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DraftStatus::Pending),
            "active" => Some(DraftStatus::Active),
            "complete" => Some(DraftStatus::Complete),
            "failed" => Some(DraftStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DraftStatus::Complete | DraftStatus::Failed)
    }

    pub fn can_transition_to(&self, next: DraftStatus) -> bool {
        matches!(
            (self, next),
            (DraftStatus::Pending, DraftStatus::Active)
                | (DraftStatus::Active, DraftStatus::Complete)
                | (DraftStatus::Active, DraftStatus::Failed)
        )
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side data written together with a status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: DraftStatus,
    pub to: DraftStatus,
    pub at: DateTime<Utc>,
    /// Recorded as the failure reason when `to` is `Failed`.
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn new(from: DraftStatus, to: DraftStatus, at: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            at,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            from: DraftStatus::Active,
            to: DraftStatus::Failed,
            at,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-draft configuration, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSettings {
    pub num_teams: u32,
    pub rounds: u32,
    pub snake: bool,
    /// Seconds a human has to pick; 0 disables the timer.
    pub timer_per_pick_sec: u32,
    pub seed: String,
}

impl DraftSettings {
    pub fn total_picks(&self) -> u32 {
        self.num_teams * self.rounds
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.num_teams < 2 {
            return Err(DraftError::invalid_config(
                "numTeams",
                format!("must be at least 2, got {}", self.num_teams),
            ));
        }
        if self.rounds < 1 {
            return Err(DraftError::invalid_config("rounds", "must be at least 1"));
        }
        if self.num_teams.checked_mul(self.rounds).is_none() {
            return Err(DraftError::invalid_config("rounds", "total pick count overflows"));
        }
        if self.seed.trim().is_empty() {
            return Err(DraftError::invalid_config("seed", "must not be empty"));
        }
        Ok(())
    }

    /// Seed used when the caller does not supply one: `DRAFT-<millis>-<suffix>`.
    pub fn generate_seed(now: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("DRAFT-{}-{}", now.timestamp_millis(), &suffix[..9])
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Summary of a bot-only run, stored on the draft once it completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub duration_sec: f64,
    pub total_picks: u32,
    pub autopicks_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub name: String,
    pub status: DraftStatus,
    #[serde(flatten)]
    pub settings: DraftSettings,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_pick_at: Option<DateTime<Utc>>,
    pub last_bot_auto_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub metrics: Option<RunMetrics>,
}

impl Draft {
    /// Generate a new draft id from the current time plus a random suffix.
    ///
    /// Format: `draft_YYYYMMDD_HHMMSS_SSS_xxxxxxxx`.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", now.format("draft_%Y%m%d_%H%M%S_%3f"), &suffix[..8])
    }

    pub fn new(id: String, name: String, settings: DraftSettings, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            status: DraftStatus::Pending,
            settings,
            created_at: now,
            start_time: None,
            completed_at: None,
            last_pick_at: None,
            last_bot_auto_at: None,
            failure_reason: None,
            metrics: None,
        }
    }

    /// Apply a status change if the draft is in `change.from` and the move is
    /// legal. Activation stamps `start_time` and seeds `last_pick_at` once.
    pub fn apply_status_change(&mut self, change: &StatusChange) -> bool {
        if self.status != change.from || !change.from.can_transition_to(change.to) {
            return false;
        }
        self.status = change.to;
        match change.to {
            DraftStatus::Active => {
                self.start_time.get_or_insert(change.at);
                self.last_pick_at.get_or_insert(change.at);
            }
            DraftStatus::Complete => self.completed_at = Some(change.at),
            DraftStatus::Failed => self.failure_reason = change.reason.clone(),
            DraftStatus::Pending => {}
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Bot,
    Human,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Bot => "bot",
            UserType::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bot" => Some(UserType::Bot),
            "human" => Some(UserType::Human),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub draft_id: String,
    pub slot: u32,
    pub user_type: UserType,
    pub display_name: String,
    pub user_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Creation request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSpec {
    pub slot: u32,
    pub user_type: UserType,
    pub display_name: String,
    #[serde(default)]
    pub user_ref: Option<String>,
}

fn default_snake() -> bool {
    true
}

fn default_timer() -> u32 {
    30
}

/// Input for creating a draft together with its participants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub num_teams: u32,
    pub rounds: u32,
    #[serde(default = "default_snake")]
    pub snake: bool,
    #[serde(default = "default_timer")]
    pub timer_per_pick_sec: u32,
    #[serde(default)]
    pub seed: Option<String>,
    /// When omitted every slot is filled by a bot named "Bot Team N".
    #[serde(default)]
    pub participants: Option<Vec<ParticipantSpec>>,
}

impl CreateDraftRequest {
    pub fn new(num_teams: u32, rounds: u32) -> Self {
        Self {
            name: None,
            num_teams,
            rounds,
            snake: true,
            timer_per_pick_sec: default_timer(),
            seed: None,
            participants: None,
        }
    }

    /// Resolve the participant roster, filling in the all-bot default.
    pub fn resolve_participants(&self) -> Result<Vec<ParticipantSpec>, DraftError> {
        let Some(specs) = &self.participants else {
            return Ok((1..=self.num_teams)
                .map(|slot| ParticipantSpec {
                    slot,
                    user_type: UserType::Bot,
                    display_name: format!("Bot Team {slot}"),
                    user_ref: None,
                })
                .collect());
        };

        if specs.len() != self.num_teams as usize {
            return Err(DraftError::invalid_config(
                "participants",
                format!(
                    "expected {} participants, got {}",
                    self.num_teams,
                    specs.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        for spec in specs {
            if spec.slot < 1 || spec.slot > self.num_teams {
                return Err(DraftError::invalid_config(
                    "participants.slot",
                    format!("slot {} is outside 1..={}", spec.slot, self.num_teams),
                ));
            }
            if !seen.insert(spec.slot) {
                return Err(DraftError::invalid_config(
                    "participants.slot",
                    format!("slot {} is assigned twice", spec.slot),
                ));
            }
            if spec.display_name.trim().is_empty() {
                return Err(DraftError::invalid_config(
                    "participants.displayName",
                    format!("slot {} has an empty display name", spec.slot),
                ));
            }
        }

        let mut specs = specs.clone();
        specs.sort_by_key(|s| s.slot);
        Ok(specs)
    }
}
