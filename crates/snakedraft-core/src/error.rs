// Error taxonomy for draft operations.
//
// Every failure carries a stable machine code. Client errors leave the draft
// untouched; server errors come from the ledger, the catalog, or a broken
// invariant.

use std::fmt;

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::valuation::catalog::CatalogError;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Stable SCREAMING_SNAKE_CASE codes surfaced in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotYourTurn,
    PlayerAlreadyDrafted,
    DraftComplete,
    NoPlayersAvailable,
    TurnChanged,
    InvalidConfig,
    DraftNotFound,
    UnknownParticipant,
    UnknownPlayer,
    DraftFailed,
    LedgerUnavailable,
    LedgerError,
    CatalogError,
    InvariantViolation,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::PlayerAlreadyDrafted => "PLAYER_ALREADY_DRAFTED",
            ErrorCode::DraftComplete => "DRAFT_COMPLETE",
            ErrorCode::NoPlayersAvailable => "NO_PLAYERS_AVAILABLE",
            ErrorCode::TurnChanged => "TURN_CHANGED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::DraftNotFound => "DRAFT_NOT_FOUND",
            ErrorCode::UnknownParticipant => "UNKNOWN_PARTICIPANT",
            ErrorCode::UnknownPlayer => "UNKNOWN_PLAYER",
            ErrorCode::DraftFailed => "DRAFT_FAILED",
            ErrorCode::LedgerUnavailable => "LEDGER_UNAVAILABLE",
            ErrorCode::LedgerError => "LEDGER_ERROR",
            ErrorCode::CatalogError => "CATALOG_ERROR",
            ErrorCode::InvariantViolation => "INVARIANT_VIOLATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DraftError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("participant {participant_id} is not on the clock for pick {overall}")]
    NotYourTurn { participant_id: String, overall: u32 },

    #[error("player {player_id} has already been drafted")]
    PlayerAlreadyDrafted { player_id: String },

    #[error("draft {draft_id} is complete")]
    DraftComplete { draft_id: String },

    #[error("no players available")]
    NoPlayersAvailable,

    #[error("turn changed while committing pick {overall}; refresh and retry")]
    TurnChanged { overall: u32 },

    #[error("invalid draft configuration for `{field}`: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("draft {0} not found")]
    DraftNotFound(String),

    #[error("participant {0} is not part of this draft")]
    UnknownParticipant(String),

    #[error("player {0} is not in the catalog")]
    UnknownPlayer(String),

    #[error("draft {draft_id} has failed: {reason}")]
    DraftFailed { draft_id: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl DraftError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        DraftError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DraftError::NotYourTurn { .. } => ErrorCode::NotYourTurn,
            DraftError::PlayerAlreadyDrafted { .. } => ErrorCode::PlayerAlreadyDrafted,
            DraftError::DraftComplete { .. } => ErrorCode::DraftComplete,
            DraftError::NoPlayersAvailable => ErrorCode::NoPlayersAvailable,
            DraftError::TurnChanged { .. } => ErrorCode::TurnChanged,
            DraftError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            DraftError::DraftNotFound(_) => ErrorCode::DraftNotFound,
            DraftError::UnknownParticipant(_) => ErrorCode::UnknownParticipant,
            DraftError::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
            DraftError::DraftFailed { .. } => ErrorCode::DraftFailed,
            DraftError::Ledger(e) if e.is_transient() => ErrorCode::LedgerUnavailable,
            DraftError::Ledger(_) => ErrorCode::LedgerError,
            DraftError::Catalog(_) => ErrorCode::CatalogError,
            DraftError::Invariant(_) => ErrorCode::InvariantViolation,
        }
    }

    /// Client errors are answered synchronously and never mutate the draft.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            DraftError::Ledger(_) | DraftError::Catalog(_) | DraftError::Invariant(_)
        )
    }
}
