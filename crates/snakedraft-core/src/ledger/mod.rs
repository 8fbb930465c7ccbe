// Pick ledger: durable storage of drafts, participants and committed picks.
//
// The engine relies on the ledger for every correctness guarantee. Each
// operation is atomic on its own; nothing spans calls.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::draft::pick::Pick;
use crate::draft::state::{Draft, DraftStatus, Participant, RunMetrics, StatusChange};

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store could not be reached or stayed busy past its retry budget.
    #[error("ledger temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("draft {0} already exists")]
    DuplicateDraft(String),

    #[error("slot {slot} of draft {draft_id} is already taken")]
    DuplicateSlot { draft_id: String, slot: u32 },

    #[error("no draft with id {0}")]
    MissingDraft(String),

    #[error("corrupt ledger record: {0}")]
    Corrupt(String),

    #[error("ledger error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

/// Which uniqueness rule rejected a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Another pick already holds this overall number.
    Overall,
    /// The player was already taken at another overall number.
    Player,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created,
    Conflict(ConflictKind),
}

#[async_trait]
pub trait PickLedger: Send + Sync {
    /// Insert a new draft record. Fails if the id already exists.
    async fn create_draft(&self, draft: &Draft) -> Result<(), LedgerError>;

    async fn get_draft(&self, draft_id: &str) -> Result<Option<Draft>, LedgerError>;

    /// Insert a participant. Fails if its slot is already taken.
    async fn create_participant(&self, participant: &Participant) -> Result<(), LedgerError>;

    /// Participants ordered by slot.
    async fn list_participants(&self, draft_id: &str) -> Result<Vec<Participant>, LedgerError>;

    /// Insert `pick` unless a pick with the same overall number or player
    /// already exists for the draft. Atomic: concurrent callers with the same
    /// key see exactly one `Created`.
    async fn create_pick_if_absent(&self, pick: &Pick) -> Result<CreateOutcome, LedgerError>;

    async fn count_picks(&self, draft_id: &str) -> Result<u32, LedgerError>;

    /// Picks ordered by overall number.
    async fn list_picks(&self, draft_id: &str) -> Result<Vec<Pick>, LedgerError>;

    /// Apply `change` only if the draft is currently in `change.from`.
    /// Returns whether the transition happened.
    async fn transition_status(
        &self,
        draft_id: &str,
        change: &StatusChange,
    ) -> Result<bool, LedgerError>;

    /// Advance `last_pick_at` to `at`. Never moves it backwards.
    async fn record_pick_time(&self, draft_id: &str, at: DateTime<Utc>)
        -> Result<(), LedgerError>;

    /// Compare-and-set on `last_bot_auto_at`: succeeds only when no bot pick
    /// was claimed within `min_interval` before `now`.
    async fn claim_bot_turn(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool, LedgerError>;

    async fn record_metrics(&self, draft_id: &str, metrics: &RunMetrics)
        -> Result<(), LedgerError>;

    /// Ids of drafts in `status`.
    async fn draft_ids(&self, status: DraftStatus) -> Result<Vec<String>, LedgerError>;

    /// Drop drafts whose last activity (completion, last pick, start, or
    /// creation, in that order) is before `cutoff`.
    /// Durable ledgers keep their history and report zero.
    async fn purge_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        Ok(0)
    }
}
