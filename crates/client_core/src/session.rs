//! Session context and its persistence under the well-known storage keys.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::domain::{CandidateSet, SessionToken};
use storage::SessionStore;
use tracing::{info, warn};

pub const VOTER_SESSION_KEY: &str = "voterSession";
pub const VOTER_DATA_KEY: &str = "voterData";
pub const ADMIN_SESSION_KEY: &str = "adminSession";
pub const PUBLIC_ACCESS_KEY: &str = "publicAccess";

const SESSION_KEYS: [&str; 4] = [
    ADMIN_SESSION_KEY,
    VOTER_SESSION_KEY,
    VOTER_DATA_KEY,
    PUBLIC_ACCESS_KEY,
];

/// Everything an authenticated voter needs to fill in one ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_token: SessionToken,
    pub voter_token: String,
    pub candidates: CandidateSet,
    pub max_choices: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoterData {
    token: String,
    candidates: CandidateSet,
    max_choices: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStatus {
    pub voter: bool,
    pub admin: bool,
    pub public: bool,
}

#[derive(Clone)]
pub struct SessionVault {
    store: Arc<dyn SessionStore>,
}

impl SessionVault {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn persist_session(&self, context: &SessionContext) -> Result<()> {
        let data = VoterData {
            token: context.voter_token.clone(),
            candidates: context.candidates.clone(),
            max_choices: context.max_choices,
        };
        // The token goes last: its presence is what grants voting access.
        self.store
            .remove(VOTER_SESSION_KEY)
            .await
            .context("failed to drop previous voter session")?;
        self.store
            .put(VOTER_DATA_KEY, &serde_json::to_value(data)?)
            .await
            .context("failed to persist voter data")?;
        self.store
            .put(VOTER_SESSION_KEY, &Value::from(context.session_token.as_str()))
            .await
            .context("failed to persist voter session")?;
        info!(candidates = context.candidates.len(), "voter session persisted");
        Ok(())
    }

    pub async fn load_session(&self) -> Result<Option<SessionContext>> {
        let Some(token) = self.store.get(VOTER_SESSION_KEY).await? else {
            return Ok(None);
        };
        let Some(raw_data) = self.store.get(VOTER_DATA_KEY).await? else {
            return Ok(None);
        };

        let Some(token) = token.as_str().filter(|t| !t.is_empty()) else {
            warn!("stored voter session token is not a string; ignoring session");
            return Ok(None);
        };
        let data: VoterData = match serde_json::from_value(raw_data) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "stored voter data is unreadable; ignoring session");
                return Ok(None);
            }
        };

        Ok(Some(SessionContext {
            session_token: SessionToken::new(token),
            voter_token: data.token,
            candidates: data.candidates,
            max_choices: data.max_choices,
        }))
    }

    pub async fn clear_session(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.store
                .remove(key)
                .await
                .with_context(|| format!("failed to clear session key '{key}'"))?;
        }
        info!("session cleared");
        Ok(())
    }

    pub async fn persist_admin_session(&self, token: &SessionToken) -> Result<()> {
        self.store
            .put(ADMIN_SESSION_KEY, &Value::from(token.as_str()))
            .await
    }

    pub async fn grant_public_access(&self) -> Result<()> {
        self.store.put(PUBLIC_ACCESS_KEY, &Value::Bool(true)).await
    }

    pub async fn access_status(&self) -> Result<AccessStatus> {
        Ok(AccessStatus {
            voter: is_present(self.store.get(VOTER_SESSION_KEY).await?),
            admin: is_present(self.store.get(ADMIN_SESSION_KEY).await?),
            public: is_present(self.store.get(PUBLIC_ACCESS_KEY).await?),
        })
    }
}

fn is_present(value: Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
