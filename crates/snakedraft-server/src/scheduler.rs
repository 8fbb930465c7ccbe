// Background autopick scheduler.
//
// Periodically ticks every active draft so expired human timers and bot
// turns advance without a client polling the autopick endpoint. Any number of
// scheduler instances may run against one ledger; the ledger's conditional
// writes keep their picks from colliding.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use snakedraft_core::{DraftEngine, DraftError};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Ephemeral drafts are purged once every this many ticks.
const PURGE_EVERY_TICKS: u64 = 300;

/// Tick every active draft once. Returns the number of picks committed.
pub async fn run_once(engine: &DraftEngine, now: DateTime<Utc>) -> usize {
    let draft_ids = match engine.active_draft_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("scheduler could not list active drafts: {e}");
            return 0;
        }
    };

    let mut committed = 0;
    for draft_id in draft_ids {
        match engine.tick(&draft_id, now).await {
            Ok(Some(pick)) => {
                debug!(%draft_id, overall = pick.overall, "scheduler autopick");
                committed += 1;
            }
            Ok(None) => {}
            // Another writer finished or failed the draft since it was listed.
            Err(DraftError::DraftComplete { .. }) | Err(DraftError::DraftFailed { .. }) => {}
            Err(e) => warn!(%draft_id, code = %e.code(), "scheduler tick failed: {e}"),
        }
    }
    committed
}

/// Run the scheduler loop until the task is aborted.
pub async fn run(engine: Arc<DraftEngine>, period: Duration) {
    info!(period_ms = period.as_millis() as u64, "autopick scheduler started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut ticks: u64 = 0;
    loop {
        interval.tick().await;
        let now = Utc::now();
        run_once(&engine, now).await;

        ticks += 1;
        if ticks % PURGE_EVERY_TICKS == 0 {
            match engine.purge_expired(now).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired drafts"),
                Err(e) => warn!("draft purge failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakedraft_core::draft::pick::Position;
    use snakedraft_core::draft::state::CreateDraftRequest;
    use snakedraft_core::ledger::{MemoryLedger, PickLedger};
    use snakedraft_core::valuation::catalog::{Player, PlayerPool};
    use snakedraft_core::EngineSettings;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn pool() -> PlayerPool {
        PlayerPool::new(
            (0..40)
                .map(|i| Player {
                    id: format!("p{i:02}"),
                    name: format!("Player {i}"),
                    position: Position::ALL[i % Position::ALL.len()],
                    team: "Owls".into(),
                    projection: 250.0 - i as f64,
                    adp: (i + 1) as f64,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn ticks_only_active_drafts() {
        let ledger = Arc::new(MemoryLedger::new());
        let engine = DraftEngine::new(ledger.clone(), Arc::new(pool()), EngineSettings::default());

        let pending = engine
            .create_draft(CreateDraftRequest::new(2, 2), t(0))
            .await
            .unwrap();
        let active = engine
            .create_draft(CreateDraftRequest::new(2, 2), t(0))
            .await
            .unwrap();
        engine.start_draft(&active.draft.id, t(0)).await.unwrap();

        assert_eq!(run_once(&engine, t(1)).await, 1);
        // Bot rate limit holds the second pick back.
        assert_eq!(run_once(&engine, t(2)).await, 0);
        assert_eq!(run_once(&engine, t(6)).await, 1);

        assert_eq!(ledger.count_picks(&active.draft.id).await.unwrap(), 2);
        assert_eq!(ledger.count_picks(&pending.draft.id).await.unwrap(), 0);
    }
}
