use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use url::Url;

pub const SETTINGS_FILE: &str = "ballot.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Scoring service endpoint; unset means every remote call fails.
    pub service_url: Option<String>,
    pub session_database_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: None,
            session_database_url: "sqlite://./data/session.db".into(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn service_endpoint(&self) -> anyhow::Result<Option<Url>> {
        let Some(raw) = self.service_url.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let url = Url::parse(raw).with_context(|| format!("invalid service url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("service url '{raw}' must use http or https");
        }
        Ok(Some(url))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(SETTINGS_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
        Ok(file_cfg) => {
            if let Some(v) = file_cfg.get("service_url").and_then(toml::Value::as_str) {
                settings.service_url = Some(v.to_string());
            }
            if let Some(v) = file_cfg
                .get("session_database_url")
                .and_then(toml::Value::as_str)
            {
                settings.session_database_url = v.to_string();
            }
            if let Some(v) = file_cfg
                .get("request_timeout_secs")
                .and_then(toml::Value::as_integer)
                .and_then(|v| u64::try_from(v).ok())
            {
                settings.request_timeout_secs = v;
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
        }
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BALLOT_SERVICE_URL") {
        settings.service_url = Some(v);
    }
    if let Some(v) = var("APP__SERVICE_URL") {
        settings.service_url = Some(v);
    }

    if let Some(v) = var("BALLOT_SESSION_DB") {
        settings.session_database_url = v;
    }
    if let Some(v) = var("APP__SESSION_DATABASE_URL") {
        settings.session_database_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
