use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{Candidate, CandidateId, CandidateSet, SessionToken},
    protocol::{AdminGrant, Tally},
};
use storage::MemorySessionStore;
use tokio::sync::Mutex;

use crate::{
    error::{AuthError, ResultsError, SubmitError},
    service::ScoringService,
    session::{SessionContext, SessionVault},
    submission::{BallotSnapshot, SubmitResult},
};

pub fn candidate(name: &str) -> Candidate {
    Candidate {
        name: CandidateId::from(name),
        school: format!("SMA {name}"),
        region: "Sleman".to_string(),
        photo_url: None,
    }
}

pub fn candidate_set(names: &[&str]) -> CandidateSet {
    CandidateSet::new(names.iter().map(|name| candidate(name)).collect()).expect("candidate set")
}

pub fn id(name: &str) -> CandidateId {
    CandidateId::from(name)
}

pub fn session(names: &[&str], max_choices: i64) -> SessionContext {
    SessionContext {
        session_token: SessionToken::from("sess-test"),
        voter_token: "voter-token".to_string(),
        candidates: candidate_set(names),
        max_choices,
    }
}

pub fn memory_vault() -> (Arc<MemorySessionStore>, SessionVault) {
    let store = Arc::new(MemorySessionStore::new());
    (store.clone(), SessionVault::new(store))
}

/// Scripted scoring service that records every ballot it receives.
pub struct FakeScoringService {
    pub session: Option<SessionContext>,
    pub admin_grant: Option<AdminGrant>,
    pub submit_result: Mutex<Result<SubmitResult, SubmitError>>,
    pub tally: Option<Tally>,
    pub submitted: Mutex<Vec<Vec<CandidateId>>>,
    pub submit_calls: AtomicUsize,
}

impl FakeScoringService {
    pub fn new() -> Self {
        Self {
            session: None,
            admin_grant: None,
            submit_result: Mutex::new(Ok(SubmitResult::Accepted)),
            tally: None,
            submitted: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_admin_grant(mut self, grant: AdminGrant) -> Self {
        self.admin_grant = Some(grant);
        self
    }

    pub fn with_submit_result(self, result: Result<SubmitResult, SubmitError>) -> Self {
        Self {
            submit_result: Mutex::new(result),
            ..self
        }
    }

    pub async fn set_submit_result(&self, result: Result<SubmitResult, SubmitError>) {
        *self.submit_result.lock().await = result;
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringService for FakeScoringService {
    async fn authenticate(&self, _token: &str) -> Result<SessionContext, AuthError> {
        self.session
            .clone()
            .ok_or_else(|| AuthError::Rejected("Token tidak valid".to_string()))
    }

    async fn submit_ballot(
        &self,
        _session: &SessionContext,
        ballot: &BallotSnapshot,
    ) -> Result<SubmitResult, SubmitError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().await.push(ballot.choices().to_vec());
        self.submit_result.lock().await.clone()
    }

    async fn login_admin(&self, _token: &str) -> Result<AdminGrant, AuthError> {
        self.admin_grant
            .clone()
            .ok_or_else(|| AuthError::Rejected("Token admin tidak valid".to_string()))
    }

    async fn fetch_results(&self) -> Result<Tally, ResultsError> {
        self.tally
            .clone()
            .ok_or_else(|| ResultsError::Unavailable("Results are not published yet".to_string()))
    }
}
