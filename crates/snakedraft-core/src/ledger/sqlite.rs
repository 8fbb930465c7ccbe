// SQLite-backed pick ledger.
//
// Uniqueness of (draft_id, overall), (draft_id, player_id) and
// (draft_id, slot) is enforced by the schema, so several processes sharing one
// database file still commit at most one pick per overall number. SQLite's
// busy timeout retries lock contention before an error surfaces as
// `LedgerError::Unavailable`.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ConflictKind, CreateOutcome, LedgerError, PickLedger};
use crate::draft::pick::Pick;
use crate::draft::state::{
    Draft, DraftSettings, DraftStatus, Participant, RunMetrics, StatusChange, UserType,
};

pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open ledger database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS drafts (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                status              TEXT NOT NULL
                    CHECK (status IN ('pending', 'active', 'complete', 'failed')),
                num_teams           INTEGER NOT NULL CHECK (num_teams >= 2),
                rounds              INTEGER NOT NULL CHECK (rounds >= 1),
                snake               INTEGER NOT NULL,
                timer_per_pick_sec  INTEGER NOT NULL CHECK (timer_per_pick_sec >= 0),
                seed                TEXT NOT NULL,
                created_at_ms       INTEGER NOT NULL,
                start_time_ms       INTEGER,
                completed_at_ms     INTEGER,
                last_pick_at_ms     INTEGER,
                last_bot_auto_at_ms INTEGER,
                failure_reason      TEXT,
                metric_duration_sec REAL,
                metric_total_picks  INTEGER,
                metric_autopicks    INTEGER
            );

            CREATE TABLE IF NOT EXISTS participants (
                id           TEXT PRIMARY KEY,
                draft_id     TEXT NOT NULL REFERENCES drafts(id),
                slot         INTEGER NOT NULL CHECK (slot >= 1),
                user_type    TEXT NOT NULL CHECK (user_type IN ('bot', 'human')),
                display_name TEXT NOT NULL,
                user_ref     TEXT,
                UNIQUE (draft_id, slot)
            );

            CREATE TABLE IF NOT EXISTS picks (
                id             TEXT PRIMARY KEY,
                draft_id       TEXT NOT NULL REFERENCES drafts(id),
                round          INTEGER NOT NULL,
                overall        INTEGER NOT NULL CHECK (overall >= 1),
                slot           INTEGER NOT NULL,
                participant_id TEXT NOT NULL REFERENCES participants(id),
                player_id      TEXT NOT NULL,
                picked_at_ms   INTEGER NOT NULL,
                autopick       INTEGER NOT NULL,
                UNIQUE (draft_id, overall),
                UNIQUE (draft_id, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts(status);
            ",
        )
        .context("failed to create ledger schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("ledger connection mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    fn insert_draft(&self, draft: &Draft) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO drafts
                (id, name, status, num_teams, rounds, snake, timer_per_pick_sec, seed,
                 created_at_ms, start_time_ms, completed_at_ms, last_pick_at_ms,
                 last_bot_auto_at_ms, failure_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                draft.id,
                draft.name,
                draft.status.as_str(),
                draft.settings.num_teams,
                draft.settings.rounds,
                draft.settings.snake,
                draft.settings.timer_per_pick_sec,
                draft.settings.seed,
                draft.created_at.timestamp_millis(),
                draft.start_time.map(|t| t.timestamp_millis()),
                draft.completed_at.map(|t| t.timestamp_millis()),
                draft.last_pick_at.map(|t| t.timestamp_millis()),
                draft.last_bot_auto_at.map(|t| t.timestamp_millis()),
                draft.failure_reason,
            ],
        )
        .context("failed to insert draft")?;
        Ok(())
    }

    fn load_draft(&self, draft_id: &str) -> Result<Option<Draft>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, status, num_teams, rounds, snake, timer_per_pick_sec, seed,
                    created_at_ms, start_time_ms, completed_at_ms, last_pick_at_ms,
                    last_bot_auto_at_ms, failure_reason,
                    metric_duration_sec, metric_total_picks, metric_autopicks
             FROM drafts WHERE id = ?1",
            params![draft_id],
            draft_from_row,
        )
        .optional()
        .context("failed to load draft")
    }

    fn update_status(&self, draft_id: &str, change: &StatusChange) -> Result<bool> {
        if !change.from.can_transition_to(change.to) {
            return Ok(false);
        }
        let conn = self.conn()?;
        let at = change.at.timestamp_millis();
        let from = change.from.as_str();
        let updated = match change.to {
            DraftStatus::Active => conn.execute(
                "UPDATE drafts SET status = 'active',
                        start_time_ms = COALESCE(start_time_ms, ?2),
                        last_pick_at_ms = COALESCE(last_pick_at_ms, ?2)
                 WHERE id = ?1 AND status = ?3",
                params![draft_id, at, from],
            ),
            DraftStatus::Complete => conn.execute(
                "UPDATE drafts SET status = 'complete', completed_at_ms = ?2
                 WHERE id = ?1 AND status = ?3",
                params![draft_id, at, from],
            ),
            DraftStatus::Failed => conn.execute(
                "UPDATE drafts SET status = 'failed', failure_reason = ?2
                 WHERE id = ?1 AND status = ?3",
                params![draft_id, change.reason, from],
            ),
            DraftStatus::Pending => return Ok(false),
        }
        .context("failed to update draft status")?;
        Ok(updated == 1)
    }

    fn bump_last_pick_at(&self, draft_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE drafts SET last_pick_at_ms = ?2
             WHERE id = ?1 AND (last_pick_at_ms IS NULL OR last_pick_at_ms < ?2)",
            params![draft_id, at.timestamp_millis()],
        )
        .context("failed to record pick time")?;
        Ok(())
    }

    fn try_claim_bot_turn(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let now_ms = now.timestamp_millis();
        let updated = conn
            .execute(
                "UPDATE drafts SET last_bot_auto_at_ms = ?2
                 WHERE id = ?1
                   AND (last_bot_auto_at_ms IS NULL OR last_bot_auto_at_ms <= ?3)",
                params![draft_id, now_ms, now_ms - min_interval.num_milliseconds()],
            )
            .context("failed to claim bot turn")?;
        Ok(updated == 1)
    }

    fn save_metrics(&self, draft_id: &str, metrics: &RunMetrics) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE drafts SET metric_duration_sec = ?2, metric_total_picks = ?3,
                    metric_autopicks = ?4
             WHERE id = ?1",
            params![
                draft_id,
                metrics.duration_sec,
                metrics.total_picks,
                metrics.autopicks_count
            ],
        )
        .context("failed to save run metrics")?;
        Ok(())
    }

    fn ids_with_status(&self, status: DraftStatus) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id FROM drafts WHERE status = ?1 ORDER BY id")
            .context("failed to prepare draft id query")?;
        let ids = stmt
            .query_map(params![status.as_str()], |row| row.get(0))
            .context("failed to query draft ids")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to map draft id rows")?;
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    fn insert_participant(&self, p: &Participant) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO participants (id, draft_id, slot, user_type, display_name, user_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                p.id,
                p.draft_id,
                p.slot,
                p.user_type.as_str(),
                p.display_name,
                p.user_ref
            ],
        )
        .context("failed to insert participant")?;
        Ok(())
    }

    fn load_participants(&self, draft_id: &str) -> Result<Vec<Participant>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, draft_id, slot, user_type, display_name, user_ref
                 FROM participants WHERE draft_id = ?1 ORDER BY slot",
            )
            .context("failed to prepare participant query")?;
        let participants = stmt
            .query_map(params![draft_id], |row| {
                let user_type: String = row.get(3)?;
                Ok(Participant {
                    id: row.get(0)?,
                    draft_id: row.get(1)?,
                    slot: row.get(2)?,
                    user_type: UserType::parse(&user_type)
                        .ok_or_else(|| conversion_error(3, format!("bad user type {user_type}")))?,
                    display_name: row.get(4)?,
                    user_ref: row.get(5)?,
                })
            })
            .context("failed to query participants")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map participant rows")?;
        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    fn insert_pick(&self, pick: &Pick) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO picks
                (id, draft_id, round, overall, slot, participant_id, player_id,
                 picked_at_ms, autopick)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                pick.id,
                pick.draft_id,
                pick.round,
                pick.overall,
                pick.slot,
                pick.participant_id,
                pick.player_id,
                pick.picked_at.timestamp_millis(),
                pick.autopick,
            ],
        )
        .context("failed to insert pick")?;
        Ok(())
    }

    fn pick_count(&self, draft_id: &str) -> Result<u32> {
        let conn = self.conn()?;
        let count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM picks WHERE draft_id = ?1",
                params![draft_id],
                |row| row.get(0),
            )
            .context("failed to count picks")?;
        Ok(count)
    }

    fn load_picks(&self, draft_id: &str) -> Result<Vec<Pick>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, draft_id, round, overall, slot, participant_id, player_id,
                        picked_at_ms, autopick
                 FROM picks WHERE draft_id = ?1 ORDER BY overall",
            )
            .context("failed to prepare load_picks query")?;
        let picks = stmt
            .query_map(params![draft_id], |row| {
                Ok(Pick {
                    id: row.get(0)?,
                    draft_id: row.get(1)?,
                    round: row.get(2)?,
                    overall: row.get(3)?,
                    slot: row.get(4)?,
                    participant_id: row.get(5)?,
                    player_id: row.get(6)?,
                    picked_at: timestamp(7, row.get(7)?)?,
                    autopick: row.get(8)?,
                })
            })
            .context("failed to query picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pick rows")?;
        Ok(picks)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn timestamp(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| conversion_error(idx, format!("timestamp out of range: {ms}")))
}

fn optional_timestamp(idx: usize, ms: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    ms.map(|ms| timestamp(idx, ms)).transpose()
}

fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<Draft> {
    let status: String = row.get(2)?;
    let status = DraftStatus::parse(&status)
        .ok_or_else(|| conversion_error(2, format!("bad draft status {status}")))?;
    let duration_sec: Option<f64> = row.get(14)?;
    let metrics = match duration_sec {
        Some(duration_sec) => Some(RunMetrics {
            duration_sec,
            total_picks: row.get::<_, Option<u32>>(15)?.unwrap_or(0),
            autopicks_count: row.get::<_, Option<u32>>(16)?.unwrap_or(0),
        }),
        None => None,
    };
    Ok(Draft {
        id: row.get(0)?,
        name: row.get(1)?,
        status,
        settings: DraftSettings {
            num_teams: row.get(3)?,
            rounds: row.get(4)?,
            snake: row.get(5)?,
            timer_per_pick_sec: row.get(6)?,
            seed: row.get(7)?,
        },
        created_at: timestamp(8, row.get(8)?)?,
        start_time: optional_timestamp(9, row.get(9)?)?,
        completed_at: optional_timestamp(10, row.get(10)?)?,
        last_pick_at: optional_timestamp(11, row.get(11)?)?,
        last_bot_auto_at: optional_timestamp(12, row.get(12)?)?,
        failure_reason: row.get(13)?,
        metrics,
    })
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

fn sqlite_failure(err: &anyhow::Error) -> Option<(rusqlite::ErrorCode, String)> {
    err.chain().find_map(|cause| match cause.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, msg)) => {
            Some((e.code, msg.clone().unwrap_or_default()))
        }
        _ => None,
    })
}

/// The UNIQUE constraint message for a failed insert, if that was the cause.
fn unique_violation(err: &anyhow::Error) -> Option<String> {
    match sqlite_failure(err) {
        Some((rusqlite::ErrorCode::ConstraintViolation, msg)) if msg.contains("UNIQUE") => {
            Some(msg)
        }
        _ => None,
    }
}

fn classify(err: anyhow::Error) -> LedgerError {
    match sqlite_failure(&err) {
        Some((rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked, _)) => {
            LedgerError::Unavailable(format!("{err:#}"))
        }
        _ => LedgerError::Backend(err),
    }
}

// ---------------------------------------------------------------------------
// PickLedger
// ---------------------------------------------------------------------------

#[async_trait]
impl PickLedger for SqliteLedger {
    async fn create_draft(&self, draft: &Draft) -> Result<(), LedgerError> {
        self.insert_draft(draft).map_err(|e| match unique_violation(&e) {
            Some(_) => LedgerError::DuplicateDraft(draft.id.clone()),
            None => classify(e),
        })
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Option<Draft>, LedgerError> {
        self.load_draft(draft_id).map_err(classify)
    }

    async fn create_participant(&self, participant: &Participant) -> Result<(), LedgerError> {
        self.insert_participant(participant)
            .map_err(|e| match unique_violation(&e) {
                Some(msg) if msg.contains("participants.slot") => LedgerError::DuplicateSlot {
                    draft_id: participant.draft_id.clone(),
                    slot: participant.slot,
                },
                _ => classify(e),
            })
    }

    async fn list_participants(&self, draft_id: &str) -> Result<Vec<Participant>, LedgerError> {
        self.load_participants(draft_id).map_err(classify)
    }

    async fn create_pick_if_absent(&self, pick: &Pick) -> Result<CreateOutcome, LedgerError> {
        match self.insert_pick(pick) {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(e) => match unique_violation(&e) {
                Some(msg) if msg.contains("picks.player_id") => {
                    Ok(CreateOutcome::Conflict(ConflictKind::Player))
                }
                Some(msg) if msg.contains("picks.overall") => {
                    Ok(CreateOutcome::Conflict(ConflictKind::Overall))
                }
                _ => Err(classify(e)),
            },
        }
    }

    async fn count_picks(&self, draft_id: &str) -> Result<u32, LedgerError> {
        self.pick_count(draft_id).map_err(classify)
    }

    async fn list_picks(&self, draft_id: &str) -> Result<Vec<Pick>, LedgerError> {
        self.load_picks(draft_id).map_err(classify)
    }

    async fn transition_status(
        &self,
        draft_id: &str,
        change: &StatusChange,
    ) -> Result<bool, LedgerError> {
        self.update_status(draft_id, change).map_err(classify)
    }

    async fn record_pick_time(
        &self,
        draft_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.bump_last_pick_at(draft_id, at).map_err(classify)
    }

    async fn claim_bot_turn(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
        min_interval: Duration,
    ) -> Result<bool, LedgerError> {
        self.try_claim_bot_turn(draft_id, now, min_interval)
            .map_err(classify)
    }

    async fn record_metrics(
        &self,
        draft_id: &str,
        metrics: &RunMetrics,
    ) -> Result<(), LedgerError> {
        self.save_metrics(draft_id, metrics).map_err(classify)
    }

    async fn draft_ids(&self, status: DraftStatus) -> Result<Vec<String>, LedgerError> {
        self.ids_with_status(status).map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAFT_ID: &str = "draft_test_001";

    fn test_ledger() -> SqliteLedger {
        SqliteLedger::open(":memory:").expect("in-memory database should open")
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample_draft() -> Draft {
        let settings = DraftSettings {
            num_teams: 2,
            rounds: 3,
            snake: true,
            timer_per_pick_sec: 45,
            seed: "DRAFT-1-abc".into(),
        };
        Draft::new(DRAFT_ID.into(), "Saturday Mock".into(), settings, t(0))
    }

    fn participant(slot: u32) -> Participant {
        Participant {
            id: format!("participant-{slot}"),
            draft_id: DRAFT_ID.into(),
            slot,
            user_type: if slot == 1 { UserType::Human } else { UserType::Bot },
            display_name: format!("Team {slot}"),
            user_ref: (slot == 1).then(|| "user-42".to_string()),
        }
    }

    fn sample_pick(overall: u32, player_id: &str) -> Pick {
        Pick {
            id: format!("pick-{overall}-{player_id}"),
            draft_id: DRAFT_ID.into(),
            round: 1,
            overall,
            slot: 1,
            participant_id: "participant-1".into(),
            player_id: player_id.into(),
            picked_at: t(overall as i64),
            autopick: overall % 2 == 0,
        }
    }

    async fn seeded_ledger() -> SqliteLedger {
        let ledger = test_ledger();
        ledger.create_draft(&sample_draft()).await.unwrap();
        ledger.create_participant(&participant(1)).await.unwrap();
        ledger.create_participant(&participant(2)).await.unwrap();
        ledger
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let ledger = test_ledger();
        let conn = ledger.conn().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(tables, vec!["drafts", "participants", "picks"]);
    }

    #[test]
    fn reopening_existing_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();
        {
            let ledger = SqliteLedger::open(path).unwrap();
            ledger.insert_draft(&sample_draft()).unwrap();
        }
        let ledger = SqliteLedger::open(path).unwrap();
        assert!(ledger.load_draft(DRAFT_ID).unwrap().is_some());
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn draft_round_trips() {
        let ledger = seeded_ledger().await;
        let loaded = ledger.get_draft(DRAFT_ID).await.unwrap().unwrap();
        assert_eq!(loaded, sample_draft());
        assert!(ledger.get_draft("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_draft_is_rejected() {
        let ledger = seeded_ledger().await;
        let err = ledger.create_draft(&sample_draft()).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateDraft(_)));
    }

    #[tokio::test]
    async fn status_transitions_are_conditional() {
        let ledger = seeded_ledger().await;
        let activate = StatusChange::new(DraftStatus::Pending, DraftStatus::Active, t(5));
        assert!(ledger.transition_status(DRAFT_ID, &activate).await.unwrap());
        assert!(!ledger.transition_status(DRAFT_ID, &activate).await.unwrap());

        let draft = ledger.get_draft(DRAFT_ID).await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Active);
        assert_eq!(draft.start_time, Some(t(5)));
        assert_eq!(draft.last_pick_at, Some(t(5)));

        let fail = StatusChange::failed("slot 2 has no participant", t(6));
        assert!(ledger.transition_status(DRAFT_ID, &fail).await.unwrap());
        let complete = StatusChange::new(DraftStatus::Active, DraftStatus::Complete, t(7));
        assert!(!ledger.transition_status(DRAFT_ID, &complete).await.unwrap());

        let draft = ledger.get_draft(DRAFT_ID).await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Failed);
        assert_eq!(draft.failure_reason.as_deref(), Some("slot 2 has no participant"));
        assert_eq!(draft.completed_at, None);
    }

    #[tokio::test]
    async fn pick_time_and_bot_claims() {
        let ledger = seeded_ledger().await;
        ledger.record_pick_time(DRAFT_ID, t(10)).await.unwrap();
        ledger.record_pick_time(DRAFT_ID, t(8)).await.unwrap();

        let interval = Duration::seconds(5);
        assert!(ledger.claim_bot_turn(DRAFT_ID, t(10), interval).await.unwrap());
        assert!(!ledger.claim_bot_turn(DRAFT_ID, t(14), interval).await.unwrap());
        assert!(ledger.claim_bot_turn(DRAFT_ID, t(15), interval).await.unwrap());

        let draft = ledger.get_draft(DRAFT_ID).await.unwrap().unwrap();
        assert_eq!(draft.last_pick_at, Some(t(10)));
        assert_eq!(draft.last_bot_auto_at, Some(t(15)));
    }

    #[tokio::test]
    async fn metrics_and_status_listing() {
        let ledger = seeded_ledger().await;
        let metrics = RunMetrics {
            duration_sec: 0.25,
            total_picks: 6,
            autopicks_count: 6,
        };
        ledger.record_metrics(DRAFT_ID, &metrics).await.unwrap();
        let draft = ledger.get_draft(DRAFT_ID).await.unwrap().unwrap();
        assert_eq!(draft.metrics, Some(metrics));

        assert_eq!(
            ledger.draft_ids(DraftStatus::Pending).await.unwrap(),
            vec![DRAFT_ID.to_string()]
        );
        assert!(ledger.draft_ids(DraftStatus::Active).await.unwrap().is_empty());
        assert_eq!(ledger.purge_older_than(t(1_000_000)).await.unwrap(), 0);
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn participants_round_trip_in_slot_order() {
        let ledger = seeded_ledger().await;
        let listed = ledger.list_participants(DRAFT_ID).await.unwrap();
        assert_eq!(listed, vec![participant(1), participant(2)]);
    }

    #[tokio::test]
    async fn slot_is_unique_per_draft() {
        let ledger = seeded_ledger().await;
        let mut dup = participant(2);
        dup.id = "participant-x".into();
        let err = ledger.create_participant(&dup).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSlot { slot: 2, .. }));
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn conditional_create_reports_conflict_kind() {
        let ledger = seeded_ledger().await;
        assert_eq!(
            ledger.create_pick_if_absent(&sample_pick(1, "qb-1")).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            ledger.create_pick_if_absent(&sample_pick(1, "rb-1")).await.unwrap(),
            CreateOutcome::Conflict(ConflictKind::Overall)
        );
        assert_eq!(
            ledger.create_pick_if_absent(&sample_pick(2, "qb-1")).await.unwrap(),
            CreateOutcome::Conflict(ConflictKind::Player)
        );
        assert_eq!(ledger.count_picks(DRAFT_ID).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn picks_round_trip_ordered_by_overall() {
        let ledger = seeded_ledger().await;
        for (overall, player) in [(3, "c"), (1, "a"), (2, "b")] {
            ledger
                .create_pick_if_absent(&sample_pick(overall, player))
                .await
                .unwrap();
        }
        let picks = ledger.list_picks(DRAFT_ID).await.unwrap();
        assert_eq!(picks.iter().map(|p| p.overall).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(picks[1], sample_pick(2, "b"));
        assert!(picks[1].autopick);
    }

    #[tokio::test]
    async fn foreign_keys_enforced() {
        let ledger = seeded_ledger().await;
        let mut pick = sample_pick(1, "qb-1");
        pick.participant_id = "ghost".into();
        let err = ledger.create_pick_if_absent(&pick).await.unwrap_err();
        assert!(matches!(err, LedgerError::Backend(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn two_connections_share_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let path = path.to_str().unwrap();
        let a = SqliteLedger::open(path).unwrap();
        let b = SqliteLedger::open(path).unwrap();
        a.create_draft(&sample_draft()).await.unwrap();
        a.create_participant(&participant(1)).await.unwrap();

        assert_eq!(
            a.create_pick_if_absent(&sample_pick(1, "qb-1")).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            b.create_pick_if_absent(&sample_pick(1, "wr-1")).await.unwrap(),
            CreateOutcome::Conflict(ConflictKind::Overall)
        );
        assert_eq!(b.count_picks(DRAFT_ID).await.unwrap(), 1);
    }
}
