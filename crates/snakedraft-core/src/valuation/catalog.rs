// Player catalog: the read-only pool of draftable players.
//
// Loaded from a CSV file with columns `id,name,position,team,projection,adp`.
// Extra columns are ignored; malformed rows are skipped with a warning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::draft::pick::Position;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    /// Opaque desirability score; higher is better.
    pub projection: f64,
    /// Average draft position ordinal; lower is drafted earlier.
    pub adp: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Read-only source of draftable players. Assumed stable for a draft's life.
#[async_trait]
pub trait PlayerCatalog: Send + Sync {
    async fn list_draftable_players(&self) -> Result<Arc<Vec<Player>>, CatalogError>;
}

/// In-memory catalog backed by a fixed player list.
#[derive(Debug, Clone)]
pub struct PlayerPool {
    players: Arc<Vec<Player>>,
}

impl PlayerPool {
    pub fn new(players: Vec<Player>) -> Self {
        Self {
            players: Arc::new(players),
        }
    }

    pub fn from_csv(path: &Path) -> Result<Self, CatalogError> {
        load_players(path).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[async_trait]
impl PlayerCatalog for PlayerPool {
    async fn list_draftable_players(&self) -> Result<Arc<Vec<Player>>, CatalogError> {
        Ok(Arc::clone(&self.players))
    }
}

/// Index a player slice by id.
pub fn index_by_id(players: &[Player]) -> HashMap<&str, &Player> {
    players.iter().map(|p| (p.id.as_str(), p)).collect()
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    name: String,
    position: String,
    #[serde(default)]
    team: String,
    projection: f64,
    #[serde(default)]
    adp: Option<f64>,
}

/// ADP assigned to players without one so they sort after every ranked player.
pub const UNRANKED_ADP: f64 = 999.0;

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    let mut seen = HashSet::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => {
                let id = raw.id.trim().to_string();
                if id.is_empty() {
                    warn!("skipping player '{}': empty id", raw.name.trim());
                    continue;
                }
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!("skipping player '{}': unknown position '{}'", id, raw.position);
                    continue;
                };
                if !raw.projection.is_finite() {
                    warn!("skipping player '{}': non-finite projection", id);
                    continue;
                }
                let adp = match raw.adp {
                    Some(adp) if adp.is_finite() && adp > 0.0 => adp,
                    _ => UNRANKED_ADP,
                };
                if !seen.insert(id.clone()) {
                    warn!("skipping duplicate player id '{}'", id);
                    continue;
                }
                players.push(Player {
                    id,
                    name: raw.name.trim().to_string(),
                    position,
                    team: raw.team.trim().to_string(),
                    projection: raw.projection,
                    adp,
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

/// Load the player pool from a CSV file. Fails if no valid rows remain.
pub fn load_players(path: &Path) -> Result<Vec<Player>, CatalogError> {
    let shown = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| CatalogError::Io {
        path: shown.clone(),
        source: e,
    })?;
    let players = load_players_from_reader(file).map_err(|e| CatalogError::Csv {
        path: shown.clone(),
        source: e,
    })?;
    if players.is_empty() {
        return Err(CatalogError::Validation(format!(
            "no valid players found in {shown}"
        )));
    }
    info!("loaded {} players from {}", players.len(), shown);
    Ok(players)
}
