use persistence::PersistenceError;
use sim_core::{CountryName, PolicyLever, RoomName, ValidationError};
use sim_econ::EconError;
use thiserror::Error;

/// Errors surfaced by the economy service.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("room {0} not found")]
    RoomNotFound(RoomName),
    #[error("country {country} not found in room {room}")]
    CountryNotFound { room: RoomName, country: CountryName },
    /// Rejected policy change; state is left untouched.
    #[error("invalid {lever}: {reason}")]
    InvalidParameter { lever: PolicyLever, reason: String },
    #[error("invalid trade agreement: {0}")]
    InvalidAgreement(&'static str),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error("state validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl RuntimeError {
    /// Whether the error reports a missing room or country.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RuntimeError::RoomNotFound(_) | RuntimeError::CountryNotFound { .. }
        )
    }
}
