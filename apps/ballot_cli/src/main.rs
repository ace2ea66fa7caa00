use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    auth::{self, Area},
    BallotBooth, HttpScoringService, MissingScoringService, ResultsBoard, ScoringService,
    SessionVault, SubmissionOutcome, VoterCommand, VotingError,
};
use shared::domain::{AccessKind, CandidateId, CandidateSet};
use storage::SqliteSessionStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "ballot", about = "Sign in, choose candidates and cast a ballot")]
struct Args {
    /// Scoring service endpoint, overriding ballot.toml and the environment.
    #[arg(long, global = true)]
    service_url: Option<String>,
    #[arg(long, global = true)]
    session_db: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in as a voter with a ballot token.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Sign in as an administrator (or receive public access).
    AdminLogin {
        #[arg(long)]
        token: String,
    },
    /// Sign in to view published results only.
    PublicLogin {
        #[arg(long)]
        token: String,
    },
    /// List the candidates on the signed-in voter's ballot.
    Candidates,
    /// Select candidates in order and submit the ballot.
    Vote {
        #[arg(required = true)]
        choices: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show the current tally.
    Results,
    Logout,
}

fn apply_overrides(mut settings: Settings, args: &Args) -> Settings {
    if let Some(url) = &args.service_url {
        settings.service_url = Some(url.clone());
    }
    if let Some(db) = &args.session_db {
        settings.session_database_url = db.clone();
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = secs;
    }
    settings
}

fn build_service(settings: &Settings) -> Result<Arc<dyn ScoringService>> {
    match settings.service_endpoint()? {
        Some(endpoint) => {
            let service = HttpScoringService::new(endpoint, settings.request_timeout())?;
            info!(endpoint = %service.endpoint(), "scoring service configured");
            Ok(Arc::new(service))
        }
        None => {
            warn!("no scoring service configured; remote calls will fail");
            Ok(Arc::new(MissingScoringService))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = apply_overrides(load_settings(), &args);

    let store = SqliteSessionStore::new(&settings.session_database_url)
        .await
        .context("failed to open session store")?;
    store.health_check().await?;
    let vault = SessionVault::new(Arc::new(store));
    let service = build_service(&settings)?;

    match args.command {
        Command::Login { token } => {
            let context = auth::login_voter(service.as_ref(), &vault, &token)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!(
                "Signed in. Choose exactly {} of {} candidates with `ballot vote`.",
                context.max_choices,
                context.candidates.len()
            );
        }
        Command::AdminLogin { token } => {
            let access = auth::login_admin(service.as_ref(), &vault, &token)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            match access {
                AccessKind::Admin => println!("Signed in as administrator."),
                AccessKind::Public => println!("Public access granted."),
            }
        }
        Command::PublicLogin { token } => {
            auth::login_public(service.as_ref(), &vault, &token)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Public access granted.");
        }
        Command::Candidates => {
            let booth = open_booth(&vault).await?;
            let state = booth.state();
            println!("Choose exactly {} candidates:", state.progress.max_choices);
            for view in &state.candidates {
                let candidate = &view.candidate;
                println!(
                    "  {} ({}, {}) [{}]",
                    candidate.name,
                    candidate.school,
                    candidate.region,
                    candidate.photo_or_placeholder()
                );
            }
        }
        Command::Vote { choices, yes } => {
            let mut booth = open_booth(&vault).await?;
            vote(&mut booth, service.as_ref(), &vault, choices, yes).await?;
        }
        Command::Results => {
            auth::require_access(&vault, Area::Results)
                .await
                .map_err(|_| anyhow!("sign in first to view results"))?;
            let tally = service
                .fetch_results()
                .await
                .map_err(|err| anyhow!("failed to load results: {err}"))?;
            print_results(&ResultsBoard::build(tally, Utc::now()));
        }
        Command::Logout => {
            auth::logout(&vault)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Signed out.");
        }
    }

    Ok(())
}

async fn open_booth(vault: &SessionVault) -> Result<BallotBooth> {
    auth::require_access(vault, Area::Voting)
        .await
        .map_err(|_| anyhow!("sign in with `ballot login --token <TOKEN>` first"))?;
    let session = vault
        .load_session()
        .await?
        .ok_or_else(|| anyhow!("stored voter session is incomplete; sign in again"))?;
    BallotBooth::open(session).context("ballot cannot be shown")
}

async fn vote(
    booth: &mut BallotBooth,
    service: &dyn ScoringService,
    vault: &SessionVault,
    choices: Vec<String>,
    skip_prompt: bool,
) -> Result<()> {
    let unknown = unknown_choices(booth.tracker().candidates(), &choices);
    if !unknown.is_empty() {
        bail!(
            "not on this ballot: {}; run `ballot candidates` to see the names",
            unknown.join(", ")
        );
    }

    for name in choices {
        match booth.dispatch(VoterCommand::Toggle(CandidateId::new(name.trim()))) {
            Ok(_) => {}
            Err(err) if err.is_fatal() => {
                error!(error = %err, "ballot halted");
                bail!("{err}");
            }
            Err(err) => println!("{err}"),
        }
    }

    let pending = booth
        .dispatch(VoterCommand::RequestSubmit)
        .map_err(|err| anyhow!("{err}"))?
        .state
        .pending_ballot
        .ok_or_else(|| anyhow!("nothing to confirm"))?;

    println!("You are about to submit {} choices:", pending.len());
    for (index, choice) in pending.choices().iter().enumerate() {
        println!("  {}. {choice}", index + 1);
    }

    if !skip_prompt && !confirm("Submit this ballot? [y/N] ").await? {
        booth.dispatch(VoterCommand::CancelSubmit)?;
        println!("Submission cancelled; nothing was sent.");
        return Ok(());
    }

    let ballot = booth
        .dispatch(VoterCommand::ConfirmSubmit)?
        .submit
        .ok_or_else(|| anyhow!("ballot was not confirmed"))?;

    match booth.submit(service, vault, ballot).await {
        Ok(SubmissionOutcome::Accepted) => {
            println!("Vote recorded. Thank you for taking part!");
            Ok(())
        }
        Ok(SubmissionOutcome::Rejected { message }) => bail!("{message}"),
        Err(VotingError::Storage(err)) => {
            // The vote itself went through; only the local cleanup failed.
            println!("Vote recorded. Thank you for taking part!");
            Err(err.context("failed to clear the local session"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Names typed on the command line that are not on the ballot.
fn unknown_choices<'a>(candidates: &CandidateSet, choices: &'a [String]) -> Vec<&'a str> {
    choices
        .iter()
        .map(|name| name.trim())
        .filter(|name| !candidates.contains(&CandidateId::new(*name)))
        .collect()
}

async fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_results(board: &ResultsBoard) {
    if let Some(stats) = &board.statistics {
        println!(
            "Voters: {}  Voted: {}  Candidates: {}  Turnout: {}%",
            stats.total_voters, stats.total_voted, stats.total_candidates, stats.participation_rate
        );
    }
    if board.is_empty() {
        println!("No votes have been counted yet.");
    }
    for row in &board.rows {
        let marker = if row.podium.is_some() { "*" } else { " " };
        println!(
            "{marker}{:>3}. {:<30} {:>6} votes {:>6.1}%",
            row.rank,
            row.name.as_str(),
            row.votes,
            row.percentage
        );
    }
    println!(
        "Last updated {}",
        board.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
