//! Voting client core: candidate selection, ballot confirmation and
//! at-most-once submission, plus the session and service plumbing around them.

pub mod auth;
pub mod booth;
pub mod error;
pub mod results;
pub mod selection;
pub mod service;
pub mod session;
pub mod submission;

pub use booth::{BallotBooth, BoothState, CandidateView, Dispatched, VoterCommand};
pub use error::{
    AuthError, ConfigurationError, DataIntegrityError, ResultsError, SubmitError,
    ValidationError, VotingError,
};
pub use results::ResultsBoard;
pub use selection::{ProgressHint, SelectionProgress, SelectionTracker, ToggleOutcome};
pub use service::{HttpScoringService, MissingScoringService, ScoringService};
pub use session::{SessionContext, SessionVault};
pub use submission::{
    BallotSnapshot, SubmissionController, SubmissionOutcome, SubmissionPhase, SubmitResult,
};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
