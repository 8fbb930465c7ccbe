// Snake-draft turn engine: turn calculation, pick validation and commit,
// bot/timer autopick, and results reporting over pluggable storage.

pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod valuation;

pub use engine::{DraftEngine, EngineSettings};
pub use error::{DraftError, ErrorCode};
