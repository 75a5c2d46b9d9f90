//! Tournament error types.

use super::models::TournamentId;
use crate::{db::StoreError, sync::SyncError, user::UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// The daily entry cutoff has passed
    #[error("Tournament entry is closed until tomorrow (cutoff {cutoff})")]
    EntryWindowClosed { cutoff: DateTime<Utc> },

    /// User already holds a seat in an active tournament
    #[error("User is already enrolled in tournament {0}")]
    AlreadyEnrolled(TournamentId),

    /// User is below the level or balance threshold
    #[error("User does not meet entry requirements: level {level}, balance {balance}")]
    NotEligible { level: i32, balance: i64 },

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// User has no seat in the requested (or any active) tournament
    #[error("User {0} is not in a tournament")]
    ParticipantNotFound(UserId),

    /// Every seat was taken when the reservation ran
    #[error("Tournament {0} is full")]
    CapacityExceeded(TournamentId),

    /// Tournament is finished and accepts no entries
    #[error("Tournament {0} is not admitting")]
    NotAdmitting(TournamentId),

    /// Durable store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl TournamentError {
    /// Client-safe message that does not leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Store(_) => "Internal server error".to_string(),
            TournamentError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<StoreError> for TournamentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => TournamentError::StoreUnavailable(reason),
            other => TournamentError::Store(other),
        }
    }
}

impl From<SyncError> for TournamentError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::StoreUnavailable(store) => store.into(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_maps_to_store_unavailable() {
        let err: TournamentError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, TournamentError::StoreUnavailable(_)));
    }

    #[test]
    fn test_client_message_hides_database_details() {
        let err: TournamentError = StoreError::NotFound("users row abc".into()).into();
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::NotEligible { level: 9, balance: 800 };
        assert!(err.client_message().contains("level 9"));
    }
}
