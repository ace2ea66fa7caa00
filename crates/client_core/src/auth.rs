//! Sign-in, sign-out and area access checks.

use shared::{domain::AccessKind, protocol::AdminGrant};
use tracing::{info, warn};

use crate::{
    error::AuthError,
    selection::validate_ballot_shape,
    service::ScoringService,
    session::{SessionContext, SessionVault},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Voting,
    Admin,
    Results,
}

fn storage_error(err: anyhow::Error) -> AuthError {
    AuthError::Storage(format!("{err:#}"))
}

fn normalize_token(token: &str) -> Result<&str, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

pub async fn login_voter(
    service: &dyn ScoringService,
    vault: &SessionVault,
    token: &str,
) -> Result<SessionContext, AuthError> {
    let token = normalize_token(token)?;
    let context = service.authenticate(token).await.inspect_err(|err| {
        warn!(error = %err, "voter sign-in failed");
    })?;
    validate_ballot_shape(&context.candidates, context.max_choices)?;
    vault
        .persist_session(&context)
        .await
        .map_err(storage_error)?;
    info!(max_choices = context.max_choices, "voter signed in");
    Ok(context)
}

pub async fn login_admin(
    service: &dyn ScoringService,
    vault: &SessionVault,
    token: &str,
) -> Result<AccessKind, AuthError> {
    let token = normalize_token(token)?;
    match service.login_admin(token).await? {
        AdminGrant::Admin(session_token) => {
            vault
                .persist_admin_session(&session_token)
                .await
                .map_err(storage_error)?;
            info!("admin signed in");
            Ok(AccessKind::Admin)
        }
        AdminGrant::Public => {
            vault.grant_public_access().await.map_err(storage_error)?;
            info!("public access granted");
            Ok(AccessKind::Public)
        }
    }
}

/// Results-only sign-in: any accepted token grants public access.
pub async fn login_public(
    service: &dyn ScoringService,
    vault: &SessionVault,
    token: &str,
) -> Result<(), AuthError> {
    let token = normalize_token(token)?;
    service.login_admin(token).await?;
    vault.grant_public_access().await.map_err(storage_error)?;
    info!("public access granted");
    Ok(())
}

pub async fn logout(vault: &SessionVault) -> Result<(), AuthError> {
    vault.clear_session().await.map_err(storage_error)
}

pub async fn require_access(vault: &SessionVault, area: Area) -> Result<(), AuthError> {
    let status = vault.access_status().await.map_err(storage_error)?;
    let allowed = match area {
        Area::Voting => status.voter,
        Area::Admin => status.admin,
        Area::Results => status.voter || status.admin || status.public,
    };
    if allowed {
        Ok(())
    } else {
        Err(AuthError::NotSignedIn)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
