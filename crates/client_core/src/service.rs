use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::CandidateSet,
    error::ProtocolError,
    protocol::{
        AdminGrant, AdminLoginResponse, AuthenticateVoterResponse, ResultsResponse,
        ServiceAction, SubmitVoteResponse, Tally,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{AuthError, ConfigurationError, ResultsError, SubmitError},
    session::SessionContext,
    submission::{BallotSnapshot, SubmitResult},
};

/// The remote service that authenticates voters and scores ballots.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<SessionContext, AuthError>;
    /// Called exactly once per confirmed ballot; never retried here.
    async fn submit_ballot(
        &self,
        session: &SessionContext,
        ballot: &BallotSnapshot,
    ) -> Result<SubmitResult, SubmitError>;
    async fn login_admin(&self, token: &str) -> Result<AdminGrant, AuthError>;
    async fn fetch_results(&self) -> Result<Tally, ResultsError>;
}

pub struct MissingScoringService;

const MISSING_SERVICE: &str = "voting service URL is not configured";

#[async_trait]
impl ScoringService for MissingScoringService {
    async fn authenticate(&self, _token: &str) -> Result<SessionContext, AuthError> {
        Err(SubmitError::Transport(MISSING_SERVICE.to_string()).into())
    }

    async fn submit_ballot(
        &self,
        _session: &SessionContext,
        _ballot: &BallotSnapshot,
    ) -> Result<SubmitResult, SubmitError> {
        Err(SubmitError::Transport(MISSING_SERVICE.to_string()))
    }

    async fn login_admin(&self, _token: &str) -> Result<AdminGrant, AuthError> {
        Err(SubmitError::Transport(MISSING_SERVICE.to_string()).into())
    }

    async fn fetch_results(&self) -> Result<Tally, ResultsError> {
        Err(SubmitError::Transport(MISSING_SERVICE.to_string()).into())
    }
}

/// Turns an `authenticateVoter` answer into a session for `voter_token`.
pub fn session_from_response(
    voter_token: &str,
    response: AuthenticateVoterResponse,
) -> Result<SessionContext, AuthError> {
    let grant = response.into_grant().map_err(auth_protocol_error)?;
    let candidates = CandidateSet::new(grant.candidates).map_err(ConfigurationError::from)?;
    Ok(SessionContext {
        session_token: grant.session_token,
        voter_token: voter_token.to_string(),
        candidates,
        max_choices: grant.max_choices,
    })
}

fn auth_protocol_error(err: ProtocolError) -> AuthError {
    match err {
        ProtocolError::Rejected(message) => AuthError::Rejected(message),
        ProtocolError::DuplicateCandidate(_) => ConfigurationError::from(err).into(),
        ProtocolError::MissingField(_) => SubmitError::Malformed(err.to_string()).into(),
    }
}

/// Form-POST client for a single-endpoint scoring service: every call sends
/// `action` plus its parameters and receives a JSON status envelope.
pub struct HttpScoringService {
    http: Client,
    endpoint: Url,
}

impl HttpScoringService {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: ServiceAction,
        params: &[(&str, &str)],
    ) -> Result<T, SubmitError> {
        let mut form = Vec::with_capacity(params.len() + 1);
        form.push(("action", action.as_str()));
        form.extend_from_slice(params);

        debug!(action = action.as_str(), "calling scoring service");
        let res = self
            .http
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        let body = res.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|err| {
            warn!(action = action.as_str(), error = %err, "undecodable service response");
            SubmitError::Malformed(err.to_string())
        })
    }
}

fn transport_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout
    } else {
        SubmitError::Transport(err.to_string())
    }
}

#[async_trait]
impl ScoringService for HttpScoringService {
    async fn authenticate(&self, token: &str) -> Result<SessionContext, AuthError> {
        let response: AuthenticateVoterResponse = self
            .call(ServiceAction::AuthenticateVoter, &[("token", token)])
            .await?;
        session_from_response(token, response)
    }

    async fn submit_ballot(
        &self,
        session: &SessionContext,
        ballot: &BallotSnapshot,
    ) -> Result<SubmitResult, SubmitError> {
        let choices = ballot.to_json();
        let response: SubmitVoteResponse = self
            .call(
                ServiceAction::SubmitVote,
                &[
                    ("choices", choices.as_str()),
                    ("sessionToken", session.session_token.as_str()),
                ],
            )
            .await?;
        match response.check() {
            Ok(()) => Ok(SubmitResult::Accepted),
            Err(ProtocolError::Rejected(message)) => Ok(SubmitResult::Rejected { message }),
            Err(other) => Err(SubmitError::Malformed(other.to_string())),
        }
    }

    async fn login_admin(&self, token: &str) -> Result<AdminGrant, AuthError> {
        let response: AdminLoginResponse = self
            .call(ServiceAction::LoginAdmin, &[("token", token)])
            .await?;
        response.into_grant().map_err(auth_protocol_error)
    }

    async fn fetch_results(&self) -> Result<Tally, ResultsError> {
        let response: ResultsResponse = self.call(ServiceAction::GetResults, &[]).await?;
        response.into_tally().map_err(|err| match err {
            ProtocolError::Rejected(message) => ResultsError::Unavailable(message),
            other => SubmitError::Malformed(other.to_string()).into(),
        })
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
