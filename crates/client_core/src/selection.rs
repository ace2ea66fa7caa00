//! Selection tracker: which candidates the voter has chosen, and in what order.

use std::fmt;

use shared::domain::{Candidate, CandidateId, CandidateSet};
use tracing::debug;

use crate::error::{ConfigurationError, DataIntegrityError, ValidationError, VotingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected { rank: usize },
    Deselected,
}

/// Derived view of the selection, computed from the selection on every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionProgress {
    pub count: usize,
    pub max_choices: usize,
    pub progress_ratio: f64,
    pub is_complete: bool,
}

impl SelectionProgress {
    pub fn remaining(&self) -> usize {
        self.max_choices.saturating_sub(self.count)
    }

    pub fn hint(&self) -> ProgressHint {
        if self.count == 0 {
            ProgressHint::NothingSelected
        } else if self.is_complete {
            ProgressHint::Complete
        } else {
            ProgressHint::Remaining(self.remaining())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressHint {
    NothingSelected,
    Remaining(usize),
    Complete,
}

impl fmt::Display for ProgressHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingSelected => f.write_str("Choose candidates below"),
            Self::Remaining(n) => write!(f, "Select {n} more candidate(s)"),
            Self::Complete => f.write_str("Selection complete! You can submit your vote."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionTracker {
    candidates: CandidateSet,
    max_choices: usize,
    // Insertion order is the rank order.
    selected: Vec<CandidateId>,
}

impl SelectionTracker {
    pub fn new(candidates: CandidateSet, max_choices: i64) -> Result<Self, ConfigurationError> {
        let max_choices = validate_ballot_shape(&candidates, max_choices)?;
        Ok(Self {
            candidates,
            max_choices,
            selected: Vec::with_capacity(max_choices),
        })
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn max_choices(&self) -> usize {
        self.max_choices
    }

    pub fn toggle(&mut self, id: &CandidateId) -> Result<ToggleOutcome, VotingError> {
        if !self.candidates.contains(id) {
            return Err(DataIntegrityError::UnknownCandidate(id.clone()).into());
        }

        if let Some(position) = self.selected.iter().position(|chosen| chosen == id) {
            self.selected.remove(position);
            debug!(candidate = %id, count = self.selected.len(), "candidate deselected");
            return Ok(ToggleOutcome::Deselected);
        }

        if self.selected.len() >= self.max_choices {
            debug!(candidate = %id, max_choices = self.max_choices, "selection at capacity");
            return Err(ValidationError::CapacityReached {
                max_choices: self.max_choices,
            }
            .into());
        }

        self.selected.push(id.clone());
        let rank = self.selected.len();
        debug!(candidate = %id, rank, "candidate selected");
        Ok(ToggleOutcome::Selected { rank })
    }

    /// 1-based position of `id` in selection order.
    pub fn rank_of(&self, id: &CandidateId) -> Option<usize> {
        self.selected
            .iter()
            .position(|chosen| chosen == id)
            .map(|index| index + 1)
    }

    /// Empties the selection in one step and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.selected.len();
        self.selected.clear();
        dropped
    }

    pub fn selected(&self) -> &[CandidateId] {
        &self.selected
    }

    pub fn selected_candidates(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.selected
            .iter()
            .filter_map(|id| self.candidates.get(id))
    }

    pub fn derived_state(&self) -> SelectionProgress {
        let count = self.selected.len();
        SelectionProgress {
            count,
            max_choices: self.max_choices,
            progress_ratio: count as f64 / self.max_choices as f64,
            is_complete: count == self.max_choices,
        }
    }
}

/// Checks that a ballot with these candidates can ever be completed.
pub fn validate_ballot_shape(
    candidates: &CandidateSet,
    max_choices: i64,
) -> Result<usize, ConfigurationError> {
    if max_choices <= 0 {
        return Err(ConfigurationError::NonPositiveMaxChoices(max_choices));
    }
    if candidates.is_empty() {
        return Err(ConfigurationError::EmptyCandidateSet);
    }
    let max_choices = usize::try_from(max_choices)
        .map_err(|_| ConfigurationError::NonPositiveMaxChoices(max_choices))?;
    if max_choices > candidates.len() {
        return Err(ConfigurationError::NotEnoughCandidates {
            max_choices,
            available: candidates.len(),
        });
    }
    Ok(max_choices)
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
