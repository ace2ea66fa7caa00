//! Error taxonomy for the voting client.
//!
//! Validation and remote failures are recoverable and carry a message meant
//! for the voter. Configuration and data-integrity failures mean the ballot
//! view cannot be trusted and must not continue.

use shared::{domain::CandidateId, error::ProtocolError};
use thiserror::Error;

/// Generic message shown when the transport fails or times out.
pub const SYSTEM_FAILURE_MESSAGE: &str = "A system error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("you can select at most {max_choices} candidates")]
    CapacityReached { max_choices: usize },
    #[error("select {remaining} more candidate(s); exactly {required} are required")]
    IncompleteSelection { remaining: usize, required: usize },
    #[error("a ballot is already being submitted")]
    SubmissionInFlight,
    #[error("the ballot must be confirmed before it is submitted")]
    ConfirmationRequired,
    #[error("this ballot has already been accepted")]
    BallotAlreadyAccepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("ballot requires a positive number of choices, got {0}")]
    NonPositiveMaxChoices(i64),
    #[error("no candidates are available for this ballot")]
    EmptyCandidateSet,
    #[error("ballot requires {max_choices} choices but only {available} candidates exist")]
    NotEnoughCandidates { max_choices: usize, available: usize },
    #[error("invalid candidate list: {0}")]
    InvalidCandidates(#[from] ProtocolError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    #[error("candidate `{0}` is not on this ballot")]
    UnknownCandidate(CandidateId),
}

/// Faults raised while talking to the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("the voting service did not answer in time")]
    Timeout,
    #[error("malformed service response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("a token is required")]
    EmptyToken,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Service(#[from] SubmitError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("session storage failure: {0}")]
    Storage(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Service(_) | Self::Storage(_) => SYSTEM_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VotingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
    #[error("submission is not in progress")]
    NotSubmitting,
    #[error("session storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl VotingError {
    /// Fatal errors halt the ballot view instead of being shown and retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DataIntegrity(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultsError {
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Service(#[from] SubmitError),
}
