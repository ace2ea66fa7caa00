use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{Candidate, CandidateId, SessionToken},
    error::ProtocolError,
};

const DEFAULT_FAILURE_MESSAGE: &str = "The request was rejected by the voting service.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    AuthenticateVoter,
    SubmitVote,
    LoginAdmin,
    GetResults,
}

impl ServiceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticateVoter => "authenticateVoter",
            Self::SubmitVote => "submitVote",
            Self::LoginAdmin => "loginAdmin",
            Self::GetResults => "getResults",
        }
    }
}

/// Anything other than `"success"` counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    #[serde(other)]
    Error,
}

fn ensure_success(status: ResponseStatus, message: Option<&str>) -> Result<(), ProtocolError> {
    match status {
        ResponseStatus::Success => Ok(()),
        ResponseStatus::Error => Err(ProtocolError::Rejected(
            message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                .to_string(),
        )),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateVoterResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<SessionToken>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_choices: Option<i64>,
}

/// A successful voter sign-in, before it is checked as a ballot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VoterGrant {
    pub session_token: SessionToken,
    pub candidates: Vec<Candidate>,
    pub max_choices: i64,
}

impl AuthenticateVoterResponse {
    pub fn into_grant(self) -> Result<VoterGrant, ProtocolError> {
        ensure_success(self.status, self.message.as_deref())?;
        Ok(VoterGrant {
            session_token: self
                .session_token
                .ok_or(ProtocolError::MissingField("sessionToken"))?,
            candidates: self.candidates,
            max_choices: self
                .max_choices
                .ok_or(ProtocolError::MissingField("maxChoices"))?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitVoteResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmitVoteResponse {
    pub fn check(&self) -> Result<(), ProtocolError> {
        ensure_success(self.status, self.message.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<SessionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminGrant {
    Admin(SessionToken),
    Public,
}

impl AdminLoginResponse {
    pub fn into_grant(self) -> Result<AdminGrant, ProtocolError> {
        ensure_success(self.status, self.message.as_deref())?;
        if self.user_type.as_deref() == Some("admin") {
            let token = self
                .session_token
                .ok_or(ProtocolError::MissingField("sessionToken"))?;
            Ok(AdminGrant::Admin(token))
        } else {
            Ok(AdminGrant::Public)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTally {
    #[serde(rename = "nama")]
    pub name: CandidateId,
    #[serde(rename = "suara", default)]
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStatistics {
    #[serde(rename = "totalPemilih", default)]
    pub total_voters: u64,
    #[serde(rename = "totalSudahMemilih", default)]
    pub total_voted: u64,
    #[serde(rename = "totalCalon", default)]
    pub total_candidates: u64,
    #[serde(
        rename = "participationRate",
        default,
        deserialize_with = "number_or_numeric_string"
    )]
    pub participation_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<CandidateTally>,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ElectionStatistics>,
}

/// A finished tally as published by the scoring service.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub results: Vec<CandidateTally>,
    pub total_votes: u64,
    pub statistics: Option<ElectionStatistics>,
}

impl ResultsResponse {
    pub fn into_tally(self) -> Result<Tally, ProtocolError> {
        ensure_success(self.status, self.message.as_deref())?;
        Ok(Tally {
            results: self.results,
            total_votes: self.total_votes,
            statistics: self.statistics,
        })
    }
}

// Spreadsheet backends often send rates pre-formatted, e.g. "42.5".
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_status_surfaces_service_message() {
        let response: AuthenticateVoterResponse =
            serde_json::from_str(r#"{"status":"error","message":"Token sudah digunakan"}"#)
                .expect("decode");
        assert_eq!(
            response.into_grant(),
            Err(ProtocolError::Rejected("Token sudah digunakan".to_string()))
        );
    }

    #[test]
    fn unknown_status_is_treated_as_failure() {
        let response: SubmitVoteResponse =
            serde_json::from_str(r#"{"status":"pending"}"#).expect("decode");
        assert!(matches!(response.check(), Err(ProtocolError::Rejected(_))));
    }

    #[test]
    fn voter_grant_reads_service_field_names() {
        let response: AuthenticateVoterResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "sessionToken": "sess-1",
                "maxChoices": 2,
                "candidates": [
                    {"nama": "Ayu", "sekolah": "SMA 1", "kapanewon": "Sleman"},
                    {"nama": "Budi", "sekolah": "SMA 2", "kapanewon": "Depok", "fotoUrl": "b.jpg"}
                ]
            }"#,
        )
        .expect("decode");
        let grant = response.into_grant().expect("grant");
        assert_eq!(grant.session_token, SessionToken::from("sess-1"));
        assert_eq!(grant.max_choices, 2);
        assert_eq!(grant.candidates[1].photo_url.as_deref(), Some("b.jpg"));
        assert_eq!(
            grant.candidates[0].photo_or_placeholder(),
            crate::domain::PLACEHOLDER_PHOTO
        );
    }

    #[test]
    fn success_without_session_token_is_missing_field() {
        let response: AuthenticateVoterResponse =
            serde_json::from_str(r#"{"status":"success","maxChoices":3}"#).expect("decode");
        assert_eq!(
            response.into_grant(),
            Err(ProtocolError::MissingField("sessionToken"))
        );
    }

    #[test]
    fn non_admin_user_type_grants_public_access() {
        let response: AdminLoginResponse =
            serde_json::from_str(r#"{"status":"success","userType":"public"}"#).expect("decode");
        assert_eq!(response.into_grant(), Ok(AdminGrant::Public));
    }

    #[test]
    fn participation_rate_accepts_formatted_text() {
        let stats: ElectionStatistics = serde_json::from_str(
            r#"{"totalPemilih":200,"totalSudahMemilih":85,"totalCalon":12,"participationRate":"42.5"}"#,
        )
        .expect("decode");
        assert_eq!(stats.participation_rate, 42.5);
        assert_eq!(stats.total_voted, 85);
    }
}
