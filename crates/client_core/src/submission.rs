//! Submission controller: gates, confirms and performs one ballot submission.
//!
//! `Idle -> Confirming -> Submitting -> {Accepted | back to Idle}`. A rejected
//! submission returns to `Idle`, so a retry always needs a fresh confirmation.

use std::sync::Arc;

use shared::domain::CandidateId;
use tracing::{info, warn};

use crate::{
    error::{SubmitError, ValidationError, VotingError, SYSTEM_FAILURE_MESSAGE},
    selection::{SelectionProgress, SelectionTracker},
};

/// Immutable copy of the selection order taken when the voter confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotSnapshot {
    choices: Arc<[CandidateId]>,
}

impl BallotSnapshot {
    pub fn capture(tracker: &SelectionTracker) -> Self {
        Self {
            choices: tracker.selected().into(),
        }
    }

    pub fn choices(&self) -> &[CandidateId] {
        &self.choices
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn to_json(&self) -> String {
        let names: Vec<&str> = self.choices.iter().map(CandidateId::as_str).collect();
        serde_json::Value::from(names).to_string()
    }
}

/// What the remote service made of a submitted ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    Accepted,
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Confirming,
    Submitting(BallotSnapshot),
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected { message: String },
}

#[derive(Debug, Clone)]
pub struct SubmissionController {
    phase: SubmissionPhase,
    last_failure: Option<String>,
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionController {
    pub fn new() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            last_failure: None,
        }
    }

    pub fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn in_flight(&self) -> Option<&BallotSnapshot> {
        match &self.phase {
            SubmissionPhase::Submitting(ballot) => Some(ballot),
            _ => None,
        }
    }

    fn ensure_open(&self) -> Result<(), ValidationError> {
        match self.phase {
            SubmissionPhase::Submitting(_) => Err(ValidationError::SubmissionInFlight),
            SubmissionPhase::Accepted => Err(ValidationError::BallotAlreadyAccepted),
            SubmissionPhase::Idle | SubmissionPhase::Confirming => Ok(()),
        }
    }

    /// Selection edits are refused while a ballot is in flight or accepted.
    pub fn ensure_editable(&self) -> Result<(), ValidationError> {
        self.ensure_open()
    }

    pub fn request_confirmation(
        &mut self,
        progress: &SelectionProgress,
    ) -> Result<(), ValidationError> {
        self.ensure_open()?;
        if !progress.is_complete {
            return Err(ValidationError::IncompleteSelection {
                remaining: progress.remaining(),
                required: progress.max_choices,
            });
        }
        self.phase = SubmissionPhase::Confirming;
        info!(choices = progress.count, "ballot confirmation opened");
        Ok(())
    }

    /// Closing the confirmation has no side effects; cancelling in flight is refused.
    pub fn cancel(&mut self) -> Result<(), ValidationError> {
        self.ensure_open()?;
        if self.phase == SubmissionPhase::Confirming {
            info!("ballot confirmation cancelled");
        }
        self.phase = SubmissionPhase::Idle;
        Ok(())
    }

    /// Any edit to the selection invalidates an open confirmation.
    pub fn selection_changed(&mut self) {
        if self.phase == SubmissionPhase::Confirming {
            self.phase = SubmissionPhase::Idle;
        }
    }

    pub fn begin(&mut self, tracker: &SelectionTracker) -> Result<BallotSnapshot, ValidationError> {
        self.ensure_open()?;
        if self.phase != SubmissionPhase::Confirming {
            return Err(ValidationError::ConfirmationRequired);
        }
        let progress = tracker.derived_state();
        if !progress.is_complete {
            self.phase = SubmissionPhase::Idle;
            return Err(ValidationError::IncompleteSelection {
                remaining: progress.remaining(),
                required: progress.max_choices,
            });
        }

        let ballot = BallotSnapshot::capture(tracker);
        self.phase = SubmissionPhase::Submitting(ballot.clone());
        self.last_failure = None;
        info!(choices = ballot.len(), "ballot submitting");
        Ok(ballot)
    }

    pub fn finish(
        &mut self,
        result: Result<SubmitResult, SubmitError>,
    ) -> Result<SubmissionOutcome, VotingError> {
        if self.in_flight().is_none() {
            return Err(VotingError::NotSubmitting);
        }

        let message = match result {
            Ok(SubmitResult::Accepted) => {
                self.phase = SubmissionPhase::Accepted;
                info!("ballot accepted");
                return Ok(SubmissionOutcome::Accepted);
            }
            Ok(SubmitResult::Rejected { message }) => {
                warn!(%message, "ballot rejected by service");
                message
            }
            Err(err) => {
                warn!(error = %err, "ballot submission failed");
                SYSTEM_FAILURE_MESSAGE.to_string()
            }
        };

        self.phase = SubmissionPhase::Idle;
        self.last_failure = Some(message.clone());
        Ok(SubmissionOutcome::Rejected { message })
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
