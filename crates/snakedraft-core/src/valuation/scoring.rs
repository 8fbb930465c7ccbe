// Deterministic pick scoring for bots and expired human timers.
//
// score = w_rank * rank + w_scarcity * scarcity + w_adp * adp
//         + late-round fill bonus + seeded jitter
//
// Nothing here draws from an RNG: the same available pool, team needs,
// strategy and seed always yield the same choice.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::draft::pick::{Pick, Position};
use crate::error::DraftError;
use crate::valuation::catalog::Player;
use crate::valuation::scarcity::{compute_scarcity, scarcity_for_position, ScarcityEntry};
use crate::valuation::seed::{tiebreak_hash, unit_jitter};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Bot personality: relative weights of the three score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStrategy {
    pub name: String,
    pub w_rank: f64,
    pub w_scarcity: f64,
    pub w_adp: f64,
}

impl BotStrategy {
    pub fn new(name: &str, w_rank: f64, w_scarcity: f64, w_adp: f64) -> Self {
        Self {
            name: name.to_string(),
            w_rank,
            w_scarcity,
            w_adp,
        }
        .normalized()
    }

    pub fn balanced() -> Self {
        Self::new("balanced", 0.5, 0.3, 0.2)
    }

    /// Rescale the weights to sum to 1. Degenerate weights fall back to
    /// `balanced`.
    pub fn normalized(self) -> Self {
        let sum = self.w_rank + self.w_scarcity + self.w_adp;
        if !sum.is_finite() || sum <= 0.0 {
            return Self::balanced();
        }
        Self {
            w_rank: self.w_rank / sum,
            w_scarcity: self.w_scarcity / sum,
            w_adp: self.w_adp / sum,
            name: self.name,
        }
    }
}

/// The rotating personality table used when configuration supplies none.
pub fn default_strategies() -> Vec<BotStrategy> {
    vec![
        BotStrategy::balanced(),
        BotStrategy::new("rank-heavy", 0.7, 0.15, 0.15),
        BotStrategy::new("need-heavy", 0.35, 0.5, 0.15),
        BotStrategy::new("adp-follower", 0.3, 0.2, 0.5),
    ]
}

/// Personality for a draft slot, rotating through `table`.
pub fn bot_strategy(slot: u32, table: &[BotStrategy]) -> BotStrategy {
    if table.is_empty() {
        return BotStrategy::balanced();
    }
    let idx = (slot.saturating_sub(1) as usize) % table.len();
    table[idx].clone()
}

// ---------------------------------------------------------------------------
// Scoring configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Maximum players per position on one roster.
    pub position_limits: HashMap<Position, u32>,
    /// Multiplier applied to the normalized projection.
    pub position_values: HashMap<Position, f64>,
    /// Score added when the team has reached the position limit.
    pub filled_penalty: f64,
    /// Late-round fill applies when this many rounds or fewer remain.
    pub late_round_threshold: u32,
    pub late_round_bonus: f64,
    /// Upper bound of the seeded jitter.
    pub tiebreak_scale: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use Position::*;
        Self {
            position_limits: HashMap::from([
                (Quarterback, 2),
                (RunningBack, 5),
                (WideReceiver, 5),
                (TightEnd, 2),
                (Kicker, 1),
                (Defense, 1),
            ]),
            position_values: HashMap::from([
                (Quarterback, 1.1),
                (RunningBack, 1.15),
                (WideReceiver, 1.1),
                (TightEnd, 0.95),
                (Kicker, 0.6),
                (Defense, 0.7),
            ]),
            filled_penalty: -100.0,
            late_round_threshold: 3,
            late_round_bonus: 0.25,
            tiebreak_scale: 0.001,
        }
    }
}

impl ScoringConfig {
    /// Positions without a configured limit cannot be rostered.
    pub fn limit(&self, position: Position) -> u32 {
        self.position_limits.get(&position).copied().unwrap_or(0)
    }

    pub fn value(&self, position: Position) -> f64 {
        self.position_values.get(&position).copied().unwrap_or(1.0)
    }
}

// ---------------------------------------------------------------------------
// Team needs
// ---------------------------------------------------------------------------

/// Roster state of one team, derived from the ledger on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamNeeds {
    pub slot: u32,
    pub counts: HashMap<Position, u32>,
    pub total_picks: u32,
    /// Rounds left including the current one.
    pub remaining_rounds: u32,
}

impl TeamNeeds {
    /// Build needs for `slot` from committed picks. Picks of players missing
    /// from the catalog count toward the total but not toward any position.
    pub fn from_picks(
        slot: u32,
        picks: &[Pick],
        players: &HashMap<&str, &Player>,
        rounds: u32,
        current_round: u32,
    ) -> Self {
        let mut counts = HashMap::new();
        let mut total_picks = 0;
        for pick in picks.iter().filter(|p| p.slot == slot) {
            total_picks += 1;
            if let Some(player) = players.get(pick.player_id.as_str()) {
                *counts.entry(player.position).or_insert(0) += 1;
            }
        }
        Self {
            slot,
            counts,
            total_picks,
            remaining_rounds: rounds.saturating_sub(current_round) + 1,
        }
    }

    pub fn count(&self, position: Position) -> u32 {
        self.counts.get(&position).copied().unwrap_or(0)
    }

    pub fn has_room_at(&self, position: Position, config: &ScoringConfig) -> bool {
        self.count(position) < config.limit(position)
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub rank: f64,
    pub scarcity: f64,
    pub adp: f64,
    pub late_round: f64,
    pub jitter: f64,
    pub total: f64,
}

/// Scores players against one team's needs over a fixed available pool.
pub struct Scorer<'a> {
    needs: &'a TeamNeeds,
    strategy: &'a BotStrategy,
    seed: &'a str,
    config: &'a ScoringConfig,
    best_projection: f64,
    scarcity: Vec<ScarcityEntry>,
}

impl<'a> Scorer<'a> {
    pub fn new(
        available: &[&Player],
        needs: &'a TeamNeeds,
        strategy: &'a BotStrategy,
        seed: &'a str,
        config: &'a ScoringConfig,
    ) -> Self {
        let best_projection = available
            .iter()
            .map(|p| p.projection)
            .fold(0.0_f64, f64::max);
        Self {
            needs,
            strategy,
            seed,
            config,
            best_projection,
            scarcity: compute_scarcity(available, needs, config),
        }
    }

    pub fn breakdown(&self, player: &Player) -> ScoreBreakdown {
        let rank = if self.best_projection > 0.0 {
            (player.projection / self.best_projection).clamp(0.0, 1.0)
                * self.config.value(player.position)
        } else {
            0.0
        };

        let has_room = self.needs.has_room_at(player.position, self.config);
        let scarcity = if has_room {
            scarcity_for_position(&self.scarcity, player.position)
                .map(ScarcityEntry::bonus)
                .unwrap_or(0.0)
        } else {
            self.config.filled_penalty
        };

        let adp = 1.0 / player.adp.max(1.0);

        let late_round = if has_room
            && self.needs.remaining_rounds <= self.config.late_round_threshold
        {
            self.config.late_round_bonus
        } else {
            0.0
        };

        let jitter =
            unit_jitter(self.seed, &player.id, self.needs.slot) * self.config.tiebreak_scale;

        let total = self.strategy.w_rank * rank
            + self.strategy.w_scarcity * scarcity
            + self.strategy.w_adp * adp
            + late_round
            + jitter;

        ScoreBreakdown {
            rank,
            scarcity,
            adp,
            late_round,
            jitter,
            total,
        }
    }

    pub fn score(&self, player: &Player) -> f64 {
        self.breakdown(player).total
    }
}

pub fn score_player(
    player: &Player,
    needs: &TeamNeeds,
    available: &[&Player],
    strategy: &BotStrategy,
    seed: &str,
    config: &ScoringConfig,
) -> f64 {
    Scorer::new(available, needs, strategy, seed, config).score(player)
}

/// Highest-scoring available player. Exact score ties go to the larger seeded
/// hash, then to the lexicographically smaller player id.
pub fn best_available<'p>(
    available: &[&'p Player],
    needs: &TeamNeeds,
    strategy: &BotStrategy,
    seed: &str,
    config: &ScoringConfig,
) -> Result<&'p Player, DraftError> {
    let scorer = Scorer::new(available, needs, strategy, seed, config);
    let (player, score) = available
        .iter()
        .map(|&p| (p, scorer.score(p)))
        .max_by(|(a, sa), (b, sb)| {
            sa.total_cmp(sb)
                .then_with(|| {
                    tiebreak_hash(seed, &a.id, needs.slot)
                        .cmp(&tiebreak_hash(seed, &b.id, needs.slot))
                })
                .then_with(|| b.id.cmp(&a.id))
        })
        .ok_or(DraftError::NoPlayersAvailable)?;

    debug!(
        slot = needs.slot,
        strategy = %strategy.name,
        player = %player.id,
        score,
        "selected best available"
    );
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn player(id: &str, position: Position, projection: f64, adp: f64) -> Player {
        Player {
            id: id.into(),
            name: id.into(),
            position,
            team: "Team".into(),
            projection,
            adp,
        }
    }

    fn empty_needs(slot: u32, remaining_rounds: u32) -> TeamNeeds {
        TeamNeeds {
            slot,
            counts: HashMap::new(),
            total_picks: 0,
            remaining_rounds,
        }
    }

    fn pick(slot: u32, overall: u32, player_id: &str) -> Pick {
        Pick {
            id: format!("pick-{overall}"),
            draft_id: "d".into(),
            round: 1,
            overall,
            slot,
            participant_id: format!("p{slot}"),
            player_id: player_id.into(),
            picked_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            autopick: false,
        }
    }

    // ------------------------------------------------------------------
    // Strategies
    // ------------------------------------------------------------------

    #[test]
    fn strategies_are_normalized() {
        let s = BotStrategy::new("custom", 2.0, 1.0, 1.0);
        assert!((s.w_rank - 0.5).abs() < 1e-12);
        assert!((s.w_rank + s.w_scarcity + s.w_adp - 1.0).abs() < 1e-12);

        let degenerate = BotStrategy::new("zero", 0.0, 0.0, 0.0);
        assert_eq!(degenerate, BotStrategy::balanced());
    }

    #[test]
    fn strategy_rotates_by_slot() {
        let table = default_strategies();
        assert_eq!(bot_strategy(1, &table).name, "balanced");
        assert_eq!(bot_strategy(2, &table).name, "rank-heavy");
        assert_eq!(bot_strategy(4, &table).name, "adp-follower");
        assert_eq!(bot_strategy(5, &table).name, "balanced");
        assert_eq!(bot_strategy(3, &[]).name, "balanced");
    }

    // ------------------------------------------------------------------
    // Team needs
    // ------------------------------------------------------------------

    #[test]
    fn needs_count_only_this_slot() {
        let pool = vec![
            player("qb-1", Position::Quarterback, 300.0, 1.0),
            player("rb-1", Position::RunningBack, 250.0, 2.0),
            player("rb-2", Position::RunningBack, 240.0, 3.0),
        ];
        let index = crate::valuation::catalog::index_by_id(&pool);
        let picks = vec![
            pick(1, 1, "qb-1"),
            pick(2, 2, "rb-1"),
            pick(1, 4, "rb-2"),
            pick(1, 5, "retired-player"),
        ];
        let needs = TeamNeeds::from_picks(1, &picks, &index, 15, 3);
        assert_eq!(needs.total_picks, 3);
        assert_eq!(needs.count(Position::Quarterback), 1);
        assert_eq!(needs.count(Position::RunningBack), 1);
        assert_eq!(needs.count(Position::Kicker), 0);
        assert_eq!(needs.remaining_rounds, 13);
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    #[test]
    fn filled_position_is_penalized() {
        let config = ScoringConfig::default();
        let pool = vec![
            player("k-1", Position::Kicker, 300.0, 1.0),
            player("wr-1", Position::WideReceiver, 100.0, 90.0),
        ];
        let available: Vec<&Player> = pool.iter().collect();
        let mut needs = empty_needs(1, 10);
        needs.counts.insert(Position::Kicker, 1);
        let strategy = BotStrategy::balanced();

        let scorer = Scorer::new(&available, &needs, &strategy, "s", &config);
        let k = scorer.breakdown(&pool[0]);
        assert_eq!(k.scarcity, config.filled_penalty);

        let best = best_available(&available, &needs, &strategy, "s", &config).unwrap();
        assert_eq!(best.id, "wr-1");
    }

    #[test]
    fn late_round_bonus_only_near_the_end() {
        let config = ScoringConfig::default();
        let pool = vec![player("te-1", Position::TightEnd, 100.0, 50.0)];
        let available: Vec<&Player> = pool.iter().collect();
        let strategy = BotStrategy::balanced();

        let early = empty_needs(1, 4);
        let late = empty_needs(1, 3);
        let b_early = Scorer::new(&available, &early, &strategy, "s", &config).breakdown(&pool[0]);
        let b_late = Scorer::new(&available, &late, &strategy, "s", &config).breakdown(&pool[0]);
        assert_eq!(b_early.late_round, 0.0);
        assert_eq!(b_late.late_round, config.late_round_bonus);
    }

    #[test]
    fn lower_adp_scores_higher() {
        let config = ScoringConfig::default();
        let pool = vec![
            player("wr-1", Position::WideReceiver, 100.0, 5.0),
            player("wr-2", Position::WideReceiver, 100.0, 50.0),
        ];
        let available: Vec<&Player> = pool.iter().collect();
        let needs = empty_needs(1, 10);
        let strategy = BotStrategy::new("adp-only", 0.0, 0.0, 1.0);
        let scorer = Scorer::new(&available, &needs, &strategy, "s", &config);
        assert!(scorer.breakdown(&pool[0]).adp > scorer.breakdown(&pool[1]).adp);
        let best = best_available(&available, &needs, &strategy, "s", &config).unwrap();
        assert_eq!(best.id, "wr-1");
    }

    #[test]
    fn rank_is_normalized_against_best_available() {
        let config = ScoringConfig::default();
        let pool = vec![
            player("wr-1", Position::WideReceiver, 200.0, 10.0),
            player("wr-2", Position::WideReceiver, 100.0, 10.0),
        ];
        let available: Vec<&Player> = pool.iter().collect();
        let needs = empty_needs(1, 10);
        let strategy = BotStrategy::balanced();
        let scorer = Scorer::new(&available, &needs, &strategy, "s", &config);
        let wr_value = config.value(Position::WideReceiver);
        assert!((scorer.breakdown(&pool[0]).rank - wr_value).abs() < 1e-12);
        assert!((scorer.breakdown(&pool[1]).rank - 0.5 * wr_value).abs() < 1e-12);
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    #[test]
    fn empty_pool_has_no_players() {
        let config = ScoringConfig::default();
        let needs = empty_needs(1, 10);
        let err = best_available(&[], &needs, &BotStrategy::balanced(), "s", &config).unwrap_err();
        assert!(matches!(err, DraftError::NoPlayersAvailable));
    }

    #[test]
    fn selection_ignores_input_order() {
        let config = ScoringConfig::default();
        let pool: Vec<Player> = (0..12)
            .map(|i| player(&format!("wr-{i:02}"), Position::WideReceiver, 100.0, 20.0))
            .collect();
        let forward: Vec<&Player> = pool.iter().collect();
        let reversed: Vec<&Player> = pool.iter().rev().collect();
        let needs = empty_needs(3, 10);
        let strategy = BotStrategy::balanced();

        let a = best_available(&forward, &needs, &strategy, "seed-a", &config).unwrap();
        let b = best_available(&reversed, &needs, &strategy, "seed-a", &config).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn seed_decides_between_identical_players() {
        let config = ScoringConfig::default();
        let pool: Vec<Player> = (0..12)
            .map(|i| player(&format!("wr-{i:02}"), Position::WideReceiver, 100.0, 20.0))
            .collect();
        let available: Vec<&Player> = pool.iter().collect();
        let needs = empty_needs(3, 10);
        let strategy = BotStrategy::balanced();

        let picks: std::collections::HashSet<String> = (0..20)
            .map(|i| {
                best_available(&available, &needs, &strategy, &format!("seed-{i}"), &config)
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        assert!(picks.len() > 1, "different seeds should not always agree");
    }

    #[test]
    fn score_player_matches_scorer() {
        let config = ScoringConfig::default();
        let pool = vec![
            player("qb-1", Position::Quarterback, 300.0, 3.0),
            player("rb-1", Position::RunningBack, 280.0, 1.0),
        ];
        let available: Vec<&Player> = pool.iter().collect();
        let needs = empty_needs(2, 15);
        let strategy = BotStrategy::balanced();
        let direct = score_player(&pool[1], &needs, &available, &strategy, "s", &config);
        let via = Scorer::new(&available, &needs, &strategy, "s", &config).score(&pool[1]);
        assert_eq!(direct, via);
    }
}
