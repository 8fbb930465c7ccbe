// Draft session engine.
//
// Drives the draft lifecycle: computes the turn from the ledger, validates
// human picks, selects picks for bots and expired timers, and commits every
// pick through the ledger's conditional create. Holds no per-draft state of
// its own, so any number of engines (in one process or many) may serve the
// same draft concurrently.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::draft::pick::Pick;
use crate::draft::results::{build_results, DraftResults};
use crate::draft::state::{
    CreateDraftRequest, Draft, DraftSettings, DraftStatus, Participant, RunMetrics,
    StatusChange, UserType,
};
use crate::draft::turn::{is_expired, next_turn, Turn};
use crate::error::DraftError;
use crate::ledger::{ConflictKind, CreateOutcome, PickLedger};
use crate::valuation::catalog::{index_by_id, Player, PlayerCatalog};
use crate::valuation::scoring::{
    best_available, bot_strategy, default_strategies, BotStrategy, ScoringConfig, TeamNeeds,
};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_commit_attempts: u32,
    pub retry_backoff: std::time::Duration,
    /// Minimum spacing between bot auto-commits on one draft.
    pub bot_min_interval: Duration,
    pub ephemeral_ttl: Duration,
    pub scoring: ScoringConfig,
    pub bot_strategies: Vec<BotStrategy>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            retry_backoff: std::time::Duration::from_millis(100),
            bot_min_interval: Duration::seconds(5),
            ephemeral_ttl: Duration::hours(2),
            scoring: ScoringConfig::default(),
            bot_strategies: default_strategies(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let engine = &config.engine;
        Self {
            max_commit_attempts: engine.max_commit_attempts,
            retry_backoff: std::time::Duration::from_millis(engine.retry_backoff_ms),
            bot_min_interval: Duration::seconds(engine.bot_min_interval_secs as i64),
            ephemeral_ttl: Duration::hours(engine.ephemeral_ttl_hours as i64),
            scoring: config.scoring.clone(),
            bot_strategies: config.bot_strategies.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A draft together with its participants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    #[serde(flatten)]
    pub draft: Draft,
    pub participants: Vec<Participant>,
}

/// Who is on the clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInfo {
    pub draft_id: String,
    pub overall: u32,
    pub round: u32,
    pub slot: u32,
    pub participant_id: String,
    pub user_type: UserType,
    pub display_name: String,
    pub deadline: Option<DateTime<Utc>>,
    pub total_picks: u32,
}

/// Turn computed against a consistent read of the ledger.
struct TurnContext {
    draft: Draft,
    participants: Vec<Participant>,
    participant: Participant,
    turn: Turn,
}

impl TurnContext {
    fn info(&self) -> TurnInfo {
        TurnInfo {
            draft_id: self.draft.id.clone(),
            overall: self.turn.overall,
            round: self.turn.round,
            slot: self.turn.slot,
            participant_id: self.participant.id.clone(),
            user_type: self.participant.user_type,
            display_name: self.participant.display_name.clone(),
            deadline: self.turn.deadline,
            total_picks: self.draft.settings.total_picks(),
        }
    }
}

enum CommitResult {
    Committed(Pick),
    Conflict(ConflictKind),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct DraftEngine {
    ledger: Arc<dyn PickLedger>,
    catalog: Arc<dyn PlayerCatalog>,
    settings: EngineSettings,
}

impl DraftEngine {
    pub fn new(
        ledger: Arc<dyn PickLedger>,
        catalog: Arc<dyn PlayerCatalog>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger,
            catalog,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a pending draft and its participants.
    pub async fn create_draft(
        &self,
        request: CreateDraftRequest,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot, DraftError> {
        let seed = request
            .seed
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DraftSettings::generate_seed(now));
        let settings = DraftSettings {
            num_teams: request.num_teams,
            rounds: request.rounds,
            snake: request.snake,
            timer_per_pick_sec: request.timer_per_pick_sec,
            seed,
        };
        settings.validate()?;
        let specs = request.resolve_participants()?;

        let pool = self.catalog.list_draftable_players().await?;
        if (pool.len() as u64) < u64::from(settings.total_picks()) {
            return Err(DraftError::invalid_config(
                "rounds",
                format!(
                    "{} picks requested but the catalog holds only {} players",
                    settings.total_picks(),
                    pool.len()
                ),
            ));
        }

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Mock Draft {}", now.format("%Y-%m-%d %H:%M")));

        let draft = Draft::new(Draft::generate_id(now), name, settings, now);
        self.ledger.create_draft(&draft).await?;

        let mut participants = Vec::with_capacity(specs.len());
        for spec in specs {
            let participant = Participant {
                id: format!("participant_{}", uuid::Uuid::new_v4().simple()),
                draft_id: draft.id.clone(),
                slot: spec.slot,
                user_type: spec.user_type,
                display_name: spec.display_name.trim().to_string(),
                user_ref: spec.user_ref,
            };
            self.ledger.create_participant(&participant).await?;
            participants.push(participant);
        }

        info!(
            draft_id = %draft.id,
            num_teams = draft.settings.num_teams,
            rounds = draft.settings.rounds,
            snake = draft.settings.snake,
            "draft created"
        );
        Ok(DraftSnapshot {
            draft,
            participants,
        })
    }

    /// Move a pending draft to active. Starting an active draft is a no-op.
    pub async fn start_draft(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot, DraftError> {
        let draft = self.load_draft(draft_id).await?;
        let draft = self.ensure_active(draft, now).await?;
        let participants = self.ledger.list_participants(draft_id).await?;
        Ok(DraftSnapshot {
            draft,
            participants,
        })
    }

    pub async fn get_draft(&self, draft_id: &str) -> Result<DraftSnapshot, DraftError> {
        let draft = self.load_draft(draft_id).await?;
        let participants = self.ledger.list_participants(draft_id).await?;
        Ok(DraftSnapshot {
            draft,
            participants,
        })
    }

    /// The pick currently on the clock. Activates a pending draft.
    pub async fn current_turn(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnInfo, DraftError> {
        Ok(self.turn_context(draft_id, now).await?.info())
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    /// Submit a pick for `participant_id`. Retries on commit conflicts and
    /// fails with `TurnChanged` once the attempts run out.
    pub async fn apply_pick(
        &self,
        draft_id: &str,
        participant_id: &str,
        player_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Pick, DraftError> {
        let attempts = self.settings.max_commit_attempts.max(1);
        let mut overall = 0;
        for attempt in 1..=attempts {
            let ctx = self.turn_context(draft_id, now).await?;
            overall = ctx.turn.overall;

            if ctx.participant.id != participant_id {
                if !ctx.participants.iter().any(|p| p.id == participant_id) {
                    return Err(DraftError::UnknownParticipant(participant_id.to_string()));
                }
                return Err(DraftError::NotYourTurn {
                    participant_id: participant_id.to_string(),
                    overall,
                });
            }

            let players = self.catalog.list_draftable_players().await?;
            if !players.iter().any(|p| p.id == player_id) {
                return Err(DraftError::UnknownPlayer(player_id.to_string()));
            }

            let picks = self.ledger.list_picks(draft_id).await?;
            if picks.iter().any(|p| p.player_id == player_id) {
                return Err(DraftError::PlayerAlreadyDrafted {
                    player_id: player_id.to_string(),
                });
            }

            match self.commit(&ctx, player_id, false, now).await? {
                CommitResult::Committed(pick) => return Ok(pick),
                CommitResult::Conflict(kind) => {
                    warn!(
                        draft_id,
                        overall,
                        attempt,
                        ?kind,
                        "pick conflicted with a concurrent commit"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_backoff).await;
                    }
                }
            }
        }

        Err(DraftError::TurnChanged { overall })
    }

    /// Autopick for a human whose timer has run out. `None` when nothing was
    /// due or another writer filled the pick first.
    pub async fn autopick_if_expired(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Pick>, DraftError> {
        if !self.accepts_autopick(draft_id).await? {
            return Ok(None);
        }
        let ctx = self.turn_context(draft_id, now).await?;
        if ctx.participant.user_type != UserType::Human || !is_expired(&ctx.turn, now) {
            return Ok(None);
        }

        let player_id = self.select_player(&ctx, &BotStrategy::balanced()).await?;
        match self.commit(&ctx, &player_id, true, now).await? {
            CommitResult::Committed(pick) => {
                info!(
                    draft_id,
                    overall = pick.overall,
                    participant = %pick.participant_id,
                    "pick timer expired, autopicked"
                );
                Ok(Some(pick))
            }
            CommitResult::Conflict(kind) => {
                debug!(draft_id, overall = ctx.turn.overall, ?kind, "timer autopick lost the race");
                Ok(None)
            }
        }
    }

    /// Pick for the bot on the clock, at most once per `bot_min_interval`
    /// per draft. The pick timer does not apply to bots.
    pub async fn autopick_bot_if_on_clock(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Pick>, DraftError> {
        if !self.accepts_autopick(draft_id).await? {
            return Ok(None);
        }
        let ctx = self.turn_context(draft_id, now).await?;
        if ctx.participant.user_type != UserType::Bot {
            return Ok(None);
        }

        // Select before claiming so a failed selection leaves the window open.
        let strategy = bot_strategy(ctx.turn.slot, &self.settings.bot_strategies);
        let player_id = self.select_player(&ctx, &strategy).await?;
        if !self
            .ledger
            .claim_bot_turn(draft_id, now, self.settings.bot_min_interval)
            .await?
        {
            debug!(draft_id, overall = ctx.turn.overall, "bot pick rate limited");
            return Ok(None);
        }
        match self.commit(&ctx, &player_id, true, now).await? {
            CommitResult::Committed(pick) => Ok(Some(pick)),
            CommitResult::Conflict(kind) => {
                debug!(draft_id, overall = ctx.turn.overall, ?kind, "bot pick lost the race");
                Ok(None)
            }
        }
    }

    /// Scheduler entry point: expired human timers first, then bots.
    pub async fn tick(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Pick>, DraftError> {
        if let Some(pick) = self.autopick_if_expired(draft_id, now).await? {
            return Ok(Some(pick));
        }
        self.autopick_bot_if_on_clock(draft_id, now).await
    }

    /// Run an all-bot draft to completion without rate limiting and record
    /// run metrics on the draft.
    pub async fn run_bot_draft(&self, draft_id: &str) -> Result<RunMetrics, DraftError> {
        let started = Instant::now();
        let draft = self.load_draft(draft_id).await?;
        match draft.status {
            DraftStatus::Complete => {
                return Err(DraftError::DraftComplete {
                    draft_id: draft_id.to_string(),
                })
            }
            DraftStatus::Failed => return Err(failed_error(&draft)),
            DraftStatus::Pending | DraftStatus::Active => {}
        }

        let participants = self.ledger.list_participants(draft_id).await?;
        if let Some(human) = participants.iter().find(|p| p.user_type == UserType::Human) {
            return Err(DraftError::invalid_config(
                "participants",
                format!("bot-only run requires every slot to be a bot; slot {} is human", human.slot),
            ));
        }

        info!(draft_id, "bot-only run started");
        let mut autopicks = 0;
        loop {
            let now = Utc::now();
            let ctx = match self.turn_context(draft_id, now).await {
                Ok(ctx) => ctx,
                Err(DraftError::DraftComplete { .. }) => break,
                Err(e) => return Err(e),
            };
            let strategy = bot_strategy(ctx.turn.slot, &self.settings.bot_strategies);
            let player_id = self.select_player(&ctx, &strategy).await?;
            match self.commit(&ctx, &player_id, true, now).await? {
                CommitResult::Committed(_) => autopicks += 1,
                CommitResult::Conflict(kind) => {
                    warn!(draft_id, overall = ctx.turn.overall, ?kind, "bot-only run hit a concurrent commit");
                }
            }
        }

        let metrics = RunMetrics {
            duration_sec: started.elapsed().as_secs_f64(),
            total_picks: self.ledger.count_picks(draft_id).await?,
            autopicks_count: autopicks,
        };
        self.ledger.record_metrics(draft_id, &metrics).await?;
        info!(
            draft_id,
            duration_sec = metrics.duration_sec,
            total_picks = metrics.total_picks,
            autopicks = metrics.autopicks_count,
            "bot-only run finished"
        );
        Ok(metrics)
    }

    // ------------------------------------------------------------------
    // Reporting and housekeeping
    // ------------------------------------------------------------------

    pub async fn get_results(&self, draft_id: &str) -> Result<DraftResults, DraftError> {
        let draft = self.load_draft(draft_id).await?;
        let participants = self.ledger.list_participants(draft_id).await?;
        let picks = self.ledger.list_picks(draft_id).await?;
        let players = self.catalog.list_draftable_players().await?;
        Ok(build_results(draft, participants, picks, &players))
    }

    pub async fn active_draft_ids(&self) -> Result<Vec<String>, DraftError> {
        Ok(self.ledger.draft_ids(DraftStatus::Active).await?)
    }

    /// Drop ephemeral drafts older than the configured time-to-live.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DraftError> {
        Ok(self
            .ledger
            .purge_older_than(now - self.settings.ephemeral_ttl)
            .await?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load_draft(&self, draft_id: &str) -> Result<Draft, DraftError> {
        self.ledger
            .get_draft(draft_id)
            .await?
            .ok_or_else(|| DraftError::DraftNotFound(draft_id.to_string()))
    }

    /// Whether autopick should look at this draft at all. Pending drafts are
    /// skipped; finished drafts report their terminal error.
    async fn accepts_autopick(&self, draft_id: &str) -> Result<bool, DraftError> {
        let draft = self.load_draft(draft_id).await?;
        match draft.status {
            DraftStatus::Pending => Ok(false),
            DraftStatus::Active => Ok(true),
            DraftStatus::Complete => Err(DraftError::DraftComplete {
                draft_id: draft.id,
            }),
            DraftStatus::Failed => Err(failed_error(&draft)),
        }
    }

    async fn ensure_active(&self, draft: Draft, now: DateTime<Utc>) -> Result<Draft, DraftError> {
        match draft.status {
            DraftStatus::Active => Ok(draft),
            DraftStatus::Pending => {
                let change = StatusChange::new(DraftStatus::Pending, DraftStatus::Active, now);
                if self.ledger.transition_status(&draft.id, &change).await? {
                    info!(draft_id = %draft.id, "draft started");
                }
                // Another writer may have moved it further; reread and recheck.
                let draft = self.load_draft(&draft.id).await?;
                match draft.status {
                    DraftStatus::Pending | DraftStatus::Active => Ok(draft),
                    DraftStatus::Complete => Err(DraftError::DraftComplete {
                        draft_id: draft.id,
                    }),
                    DraftStatus::Failed => Err(failed_error(&draft)),
                }
            }
            DraftStatus::Complete => Err(DraftError::DraftComplete {
                draft_id: draft.id,
            }),
            DraftStatus::Failed => Err(failed_error(&draft)),
        }
    }

    async fn turn_context(
        &self,
        draft_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnContext, DraftError> {
        let draft = self.load_draft(draft_id).await?;
        let draft = self.ensure_active(draft, now).await?;

        let committed = self.ledger.count_picks(draft_id).await?;
        let total = draft.settings.total_picks();
        if committed > total {
            let reason = format!("ledger holds {committed} picks but the draft allows {total}");
            return Err(self.fail(&draft, reason, now).await);
        }

        let last_pick_at = draft.last_pick_at.or(draft.start_time).unwrap_or(now);
        let Some(turn) = next_turn(committed, &draft.settings, last_pick_at) else {
            // Every pick is in but the completion write never landed.
            self.complete(&draft, now).await?;
            return Err(DraftError::DraftComplete {
                draft_id: draft.id,
            });
        };

        let participants = self.ledger.list_participants(draft_id).await?;
        let Some(participant) = participants.iter().find(|p| p.slot == turn.slot).cloned() else {
            let reason = format!("slot {} has no participant", turn.slot);
            return Err(self.fail(&draft, reason, now).await);
        };

        Ok(TurnContext {
            draft,
            participants,
            participant,
            turn,
        })
    }

    async fn select_player(
        &self,
        ctx: &TurnContext,
        strategy: &BotStrategy,
    ) -> Result<String, DraftError> {
        let players = self.catalog.list_draftable_players().await?;
        let picks = self.ledger.list_picks(&ctx.draft.id).await?;
        let taken: HashSet<&str> = picks.iter().map(|p| p.player_id.as_str()).collect();
        let available: Vec<&Player> = players
            .iter()
            .filter(|p| !taken.contains(p.id.as_str()))
            .collect();

        let index = index_by_id(&players);
        let needs = TeamNeeds::from_picks(
            ctx.turn.slot,
            &picks,
            &index,
            ctx.draft.settings.rounds,
            ctx.turn.round,
        );
        let player = best_available(
            &available,
            &needs,
            strategy,
            &ctx.draft.settings.seed,
            &self.settings.scoring,
        )?;
        Ok(player.id.clone())
    }

    async fn commit(
        &self,
        ctx: &TurnContext,
        player_id: &str,
        autopick: bool,
        now: DateTime<Utc>,
    ) -> Result<CommitResult, DraftError> {
        let pick = Pick {
            id: Pick::generate_id(),
            draft_id: ctx.draft.id.clone(),
            round: ctx.turn.round,
            overall: ctx.turn.overall,
            slot: ctx.turn.slot,
            participant_id: ctx.participant.id.clone(),
            player_id: player_id.to_string(),
            picked_at: now,
            autopick,
        };

        match self.ledger.create_pick_if_absent(&pick).await? {
            CreateOutcome::Conflict(kind) => Ok(CommitResult::Conflict(kind)),
            CreateOutcome::Created => {
                info!(
                    draft_id = %pick.draft_id,
                    overall = pick.overall,
                    round = pick.round,
                    slot = pick.slot,
                    player = %pick.player_id,
                    autopick,
                    "pick committed"
                );
                // The pick is durable at this point; the bookkeeping below is
                // repaired by the next turn computation if it fails.
                if let Err(e) = self.ledger.record_pick_time(&pick.draft_id, now).await {
                    warn!(draft_id = %pick.draft_id, "failed to advance last pick time: {e}");
                }
                if pick.overall == ctx.draft.settings.total_picks() {
                    if let Err(e) = self.complete(&ctx.draft, now).await {
                        warn!(draft_id = %pick.draft_id, "failed to mark draft complete: {e}");
                    }
                }
                Ok(CommitResult::Committed(pick))
            }
        }
    }

    async fn complete(&self, draft: &Draft, now: DateTime<Utc>) -> Result<(), DraftError> {
        let change = StatusChange::new(DraftStatus::Active, DraftStatus::Complete, now);
        if self.ledger.transition_status(&draft.id, &change).await? {
            info!(draft_id = %draft.id, total_picks = draft.settings.total_picks(), "draft complete");
        }
        Ok(())
    }

    /// Record an unrecoverable invariant violation and return it as an error.
    async fn fail(&self, draft: &Draft, reason: String, now: DateTime<Utc>) -> DraftError {
        error!(draft_id = %draft.id, %reason, "draft failed");
        let change = StatusChange::failed(reason.clone(), now);
        if let Err(e) = self.ledger.transition_status(&draft.id, &change).await {
            error!(draft_id = %draft.id, "failed to record draft failure: {e}");
        }
        DraftError::Invariant(reason)
    }
}

fn failed_error(draft: &Draft) -> DraftError {
    DraftError::DraftFailed {
        draft_id: draft.id.clone(),
        reason: draft
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    }
}
