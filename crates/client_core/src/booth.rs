//! Ballot booth: one voter's selection and submission state for one view.
//!
//! The booth is built when the voting view opens and dropped when the voter
//! leaves it. Voter input arrives as [`VoterCommand`]s; `dispatch` applies a
//! command synchronously and returns the projected [`BoothState`]. The only
//! effect it asks the caller to perform is the ballot submission itself.

use shared::domain::{Candidate, CandidateId};
use tracing::info;

use crate::{
    error::{ConfigurationError, SubmitError, VotingError},
    selection::{ProgressHint, SelectionProgress, SelectionTracker, ToggleOutcome},
    service::ScoringService,
    session::{SessionContext, SessionVault},
    submission::{
        BallotSnapshot, SubmissionController, SubmissionOutcome, SubmissionPhase, SubmitResult,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterCommand {
    Toggle(CandidateId),
    ClearSelection,
    RequestSubmit,
    CancelSubmit,
    ConfirmSubmit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateView {
    pub candidate: Candidate,
    pub rank: Option<usize>,
}

/// Everything a front end needs to render the voting view.
#[derive(Debug, Clone, PartialEq)]
pub struct BoothState {
    pub progress: SelectionProgress,
    pub hint: ProgressHint,
    pub candidates: Vec<CandidateView>,
    pub phase: SubmissionPhase,
    pub last_failure: Option<String>,
    /// Chosen names in rank order, shown while confirming.
    pub pending_ballot: Option<BallotSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub state: BoothState,
    pub toggled: Option<ToggleOutcome>,
    /// Set once the voter confirmed; the caller must submit exactly this ballot.
    pub submit: Option<BallotSnapshot>,
}

pub struct BallotBooth {
    session: Option<SessionContext>,
    tracker: SelectionTracker,
    controller: SubmissionController,
}

impl BallotBooth {
    pub fn open(session: SessionContext) -> Result<Self, ConfigurationError> {
        let tracker = SelectionTracker::new(session.candidates.clone(), session.max_choices)?;
        info!(
            candidates = tracker.candidates().len(),
            max_choices = tracker.max_choices(),
            "ballot booth opened"
        );
        Ok(Self {
            session: Some(session),
            tracker,
            controller: SubmissionController::new(),
        })
    }

    /// `None` once the ballot was accepted and the session torn down.
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn controller(&self) -> &SubmissionController {
        &self.controller
    }

    pub fn dispatch(&mut self, command: VoterCommand) -> Result<Dispatched, VotingError> {
        let mut toggled = None;
        let mut submit = None;

        match command {
            VoterCommand::Toggle(id) => {
                self.controller.ensure_editable()?;
                toggled = Some(self.tracker.toggle(&id)?);
                self.controller.selection_changed();
            }
            VoterCommand::ClearSelection => {
                self.controller.ensure_editable()?;
                if self.tracker.clear() > 0 {
                    self.controller.selection_changed();
                    info!("selection cleared");
                }
            }
            VoterCommand::RequestSubmit => {
                self.controller
                    .request_confirmation(&self.tracker.derived_state())?;
            }
            VoterCommand::CancelSubmit => self.controller.cancel()?,
            VoterCommand::ConfirmSubmit => {
                submit = Some(self.controller.begin(&self.tracker)?);
            }
        }

        Ok(Dispatched {
            state: self.state(),
            toggled,
            submit,
        })
    }

    /// Applies the service's answer to the in-flight ballot. On acceptance the
    /// selection is emptied and the session dropped; this happens at most once.
    pub fn complete_submission(
        &mut self,
        result: Result<SubmitResult, SubmitError>,
    ) -> Result<SubmissionOutcome, VotingError> {
        let outcome = self.controller.finish(result)?;
        if outcome == SubmissionOutcome::Accepted {
            self.tracker.clear();
            self.session = None;
        }
        Ok(outcome)
    }

    /// Sends the confirmed ballot and applies the answer. A successful
    /// submission also clears the persisted session.
    pub async fn submit(
        &mut self,
        service: &dyn ScoringService,
        vault: &SessionVault,
        ballot: BallotSnapshot,
    ) -> Result<SubmissionOutcome, VotingError> {
        if self.controller.in_flight() != Some(&ballot) {
            return Err(VotingError::NotSubmitting);
        }
        let Some(session) = self.session.clone() else {
            return Err(VotingError::NotSubmitting);
        };

        let result = service.submit_ballot(&session, &ballot).await;
        let outcome = self.complete_submission(result)?;
        if outcome == SubmissionOutcome::Accepted {
            vault.clear_session().await.map_err(VotingError::Storage)?;
        }
        Ok(outcome)
    }

    pub fn state(&self) -> BoothState {
        let progress = self.tracker.derived_state();
        let phase = self.controller.phase().clone();
        let pending_ballot = match &phase {
            SubmissionPhase::Confirming => Some(BallotSnapshot::capture(&self.tracker)),
            SubmissionPhase::Submitting(ballot) => Some(ballot.clone()),
            SubmissionPhase::Idle | SubmissionPhase::Accepted => None,
        };

        BoothState {
            progress,
            hint: progress.hint(),
            candidates: self
                .tracker
                .candidates()
                .iter()
                .map(|candidate| CandidateView {
                    rank: self.tracker.rank_of(candidate.id()),
                    candidate: candidate.clone(),
                })
                .collect(),
            phase,
            last_failure: self.controller.last_failure().map(str::to_string),
            pending_ballot,
        }
    }
}

#[cfg(test)]
#[path = "tests/booth_tests.rs"]
mod tests;
