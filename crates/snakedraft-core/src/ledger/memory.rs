// Process-wide in-memory ledger for ephemeral (mock) drafts.
//
// Every operation takes the single map lock, so the uniqueness checks in
// `create_pick_if_absent` and the compare-and-set in `claim_bot_turn` are
// atomic with respect to each other.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::{ConflictKind, CreateOutcome, LedgerError, PickLedger};
use crate::draft::pick::Pick;
use crate::draft::state::{Draft, DraftStatus, Participant, RunMetrics, StatusChange};

struct Session {
    draft: Draft,
    participants: Vec<Participant>,
    /// Kept sorted by overall.
    picks: Vec<Pick>,
}

#[derive(Default)]
pub struct MemoryLedger {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, LedgerError> {
        self.sessions
            .lock()
            .map_err(|_| LedgerError::Corrupt("memory ledger lock poisoned".into()))
    }
}

fn session_mut<'a>(
    sessions: &'a mut HashMap<String, Session>,
    draft_id: &str,
) -> Result<&'a mut Session, LedgerError> {
    sessions
        .get_mut(draft_id)
        .ok_or_else(|| LedgerError::MissingDraft(draft_id.to_string()))
}

#[async_trait]
impl PickLedger for MemoryLedger {
    async fn create_draft(&self, draft: &Draft) -> Result<(), LedgerError> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(&draft.id) {
            return Err(LedgerError::DuplicateDraft(draft.id.clone()));
        }
        sessions.insert(
            draft.id.clone(),
            Session {
                draft: draft.clone(),
                participants: Vec::new(),
                picks: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Option<Draft>, LedgerError> {
        Ok(self.lock()?.get(draft_id).map(|s| s.draft.clone()))
    }

    async fn create_participant(&self, participant: &Participant) -> Result<(), LedgerError> {
        let mut sessions = self.lock()?;
        let session = session_mut(&mut sessions, &participant.draft_id)?;
        if session
            .participants
            .iter()
            .any(|p| p.slot == participant.slot)
        {
            return Err(LedgerError::DuplicateSlot {
                draft_id: participant.draft_id.clone(),
                slot: participant.slot,
            });
        }
        session.participants.push(participant.clone());
        session.participants.sort_by_key(|p| p.slot);
        Ok(())
    }

    async fn list_participants(&self, draft_id: &str) -> Result<Vec<Participant>, LedgerError> {
        Ok(self
            .lock()?
            .get(draft_id)
            .map(|s| s.participants.clone())
            .unwrap_or_default())
    }

    async fn create_pick_if_absent(&self, pick: &Pick) -> Result<CreateOutcome, LedgerError> {
        let mut sessions = self.lock()?;
        let session = session_mut(&mut sessions, &pick.draft_id)?;
        if session.picks.iter().any(|p| p.overall == pick.overall) {
            return Ok(CreateOutcome::Conflict(ConflictKind::Overall));
        }
        if session.picks.iter().any(|p| p.player_id == pick.player_id) {
            return Ok(CreateOutcome::Conflict(ConflictKind::Player));
        }
        let at = session.picks.partition_point(|p| p.overall < pick.overall);
        session.picks.insert(at, pick.clone());
        Ok(CreateOutcome::Created)
    }

    async fn count_picks(&self, draft_id: &str) -> Result<u32, LedgerError> {
        Ok(self
            .lock()?
            .get(draft_id)
            .map(|s| s.picks.len() as u32)
            .unwrap_or(0))
    }

    async fn list_picks(&self, draft_id: &str) -> Result<Vec<Pick>, LedgerError> {
        Ok(self
            .lock()?
            .get(draft_id)
            .map(|s| s.picks.clone())
            .unwrap_or_default())
    }

    async fn transition_status(
        &self,
        draft_id: &str,
        change: &StatusChange,
    ) -> Result<bool, LedgerError> {
        let mut sessions = self.lock()?;
        let session = session_mut(&mut sessions, draft_id)?;
        Ok(session.draft.apply_status_change(change))
    }

    async fn record_pick_time(
        &self,
        draft_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.lock()?;
        let draft = &mut session_mut(&mut sessions, draft_id)?.draft;
        if draft.last_pick_at.map_or(true, |prev| prev < at) {
            draft.last_pick_at = Some(at);
        }
        Ok(())
    }

    async fn claim_bot_turn(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool, LedgerError> {
        let mut sessions = self.lock()?;
        let draft = &mut session_mut(&mut sessions, draft_id)?.draft;
        let allowed = draft
            .last_bot_auto_at
            .map_or(true, |prev| prev <= now - min_interval);
        if allowed {
            draft.last_bot_auto_at = Some(now);
        }
        Ok(allowed)
    }

    async fn record_metrics(
        &self,
        draft_id: &str,
        metrics: &RunMetrics,
    ) -> Result<(), LedgerError> {
        let mut sessions = self.lock()?;
        session_mut(&mut sessions, draft_id)?.draft.metrics = Some(metrics.clone());
        Ok(())
    }

    async fn draft_ids(&self, status: DraftStatus) -> Result<Vec<String>, LedgerError> {
        let mut ids: Vec<String> = self
            .lock()?
            .values()
            .filter(|s| s.draft.status == status)
            .map(|s| s.draft.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|id, s| {
            let draft = &s.draft;
            let last_activity = draft
                .completed_at
                .or(draft.last_pick_at)
                .or(draft.start_time)
                .unwrap_or(draft.created_at);
            let keep = last_activity >= cutoff;
            if !keep {
                info!(draft_id = %id, "purged ephemeral draft");
            }
            keep
        });
        Ok(before - sessions.len())
    }
}
