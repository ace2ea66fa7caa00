use std::{collections::HashMap, sync::Arc};

use super::*;

use axum::{extract::State, http::StatusCode, routing::post, Form, Json, Router};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{
    selection::SelectionTracker,
    test_support::{id, session},
};

#[derive(Clone)]
struct ScoringServerState {
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    submit_reply: Arc<Value>,
}

async fn handle_action(
    State(state): State<ScoringServerState>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let action = form.get("action").cloned().unwrap_or_default();
    state.requests.lock().await.push(form);
    let reply = match action.as_str() {
        "authenticateVoter" => json!({
            "status": "success",
            "sessionToken": "sess-http",
            "maxChoices": 2,
            "candidates": [
                {"nama": "Ayu", "sekolah": "SMA 1", "kapanewon": "Sleman"},
                {"nama": "Budi", "sekolah": "SMA 2", "kapanewon": "Depok"},
                {"nama": "Citra", "sekolah": "SMA 3", "kapanewon": "Mlati"}
            ]
        }),
        "submitVote" => state.submit_reply.as_ref().clone(),
        "loginAdmin" => json!({"status": "success", "sessionToken": "adm-1", "userType": "admin"}),
        "getResults" => json!({
            "status": "success",
            "results": [{"nama": "Budi", "suara": 6}, {"nama": "Ayu", "suara": 4}],
            "totalVotes": 10,
            "statistics": {
                "totalPemilih": 20,
                "totalSudahMemilih": 5,
                "totalCalon": 3,
                "participationRate": "25.0"
            }
        }),
        _ => json!({"status": "error", "message": "unknown action"}),
    };
    Json(reply)
}

async fn spawn_scoring_server(submit_reply: Value) -> anyhow::Result<(String, ScoringServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ScoringServerState {
        requests: Arc::new(Mutex::new(Vec::new())),
        submit_reply: Arc::new(submit_reply),
    };
    let app = Router::new()
        .route("/exec", post(handle_action))
        .route(
            "/broken",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/garbage", post(|| async { "<html>not json</html>" }))
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"status": "success"}))
            }),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn client(base: &str, path: &str, timeout: Duration) -> HttpScoringService {
    let endpoint = Url::parse(&format!("{base}{path}")).expect("endpoint url");
    HttpScoringService::new(endpoint, timeout).expect("client")
}

fn ballot_for(context: &SessionContext, names: &[&str]) -> BallotSnapshot {
    let mut tracker = SelectionTracker::new(context.candidates.clone(), context.max_choices)
        .expect("tracker");
    for name in names {
        tracker.toggle(&id(name)).expect("select");
    }
    BallotSnapshot::capture(&tracker)
}

#[tokio::test]
async fn authenticate_posts_token_and_builds_session() {
    let (base, state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/exec", Duration::from_secs(5));

    let context = service.authenticate("voter-42").await.expect("authenticate");
    assert_eq!(context.session_token.as_str(), "sess-http");
    assert_eq!(context.voter_token, "voter-42");
    assert_eq!(context.max_choices, 2);
    assert_eq!(context.candidates.len(), 3);

    let requests = state.requests.lock().await;
    assert_eq!(requests[0]["action"], "authenticateVoter");
    assert_eq!(requests[0]["token"], "voter-42");
}

#[tokio::test]
async fn submit_sends_ordered_choices_and_session_token() {
    let (base, state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/exec", Duration::from_secs(5));
    let context = session(&["Ayu", "Budi", "Citra"], 2);
    let ballot = ballot_for(&context, &["Citra", "Ayu"]);

    let result = service
        .submit_ballot(&context, &ballot)
        .await
        .expect("submit");
    assert_eq!(result, SubmitResult::Accepted);

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["action"], "submitVote");
    assert_eq!(requests[0]["choices"], r#"["Citra","Ayu"]"#);
    assert_eq!(requests[0]["sessionToken"], "sess-test");
}

#[tokio::test]
async fn submit_rejection_carries_service_message() {
    let (base, _state) = spawn_scoring_server(json!({
        "status": "error",
        "message": "Anda sudah memberikan suara"
    }))
    .await
    .expect("spawn server");
    let service = client(&base, "/exec", Duration::from_secs(5));
    let context = session(&["Ayu", "Budi"], 1);

    let result = service
        .submit_ballot(&context, &ballot_for(&context, &["Budi"]))
        .await
        .expect("submit");
    assert_eq!(
        result,
        SubmitResult::Rejected {
            message: "Anda sudah memberikan suara".to_string()
        }
    );
}

#[tokio::test]
async fn http_error_status_is_a_transport_fault() {
    let (base, _state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/broken", Duration::from_secs(5));
    let context = session(&["Ayu"], 1);

    let err = service
        .submit_ballot(&context, &ballot_for(&context, &["Ayu"]))
        .await
        .expect_err("http 500");
    assert!(matches!(err, SubmitError::Transport(_)));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let (base, _state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/garbage", Duration::from_secs(5));

    let err = service.fetch_results().await.expect_err("garbage");
    assert!(matches!(err, ResultsError::Service(SubmitError::Malformed(_))));
}

#[tokio::test]
async fn slow_service_times_out() {
    let (base, _state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/slow", Duration::from_millis(100));
    let context = session(&["Ayu"], 1);

    let err = service
        .submit_ballot(&context, &ballot_for(&context, &["Ayu"]))
        .await
        .expect_err("timeout");
    assert_eq!(err, SubmitError::Timeout);
}

#[tokio::test]
async fn admin_login_and_results_decode() {
    let (base, _state) = spawn_scoring_server(json!({"status": "success"}))
        .await
        .expect("spawn server");
    let service = client(&base, "/exec", Duration::from_secs(5));

    let grant = service.login_admin("admin").await.expect("admin");
    assert_eq!(
        grant,
        AdminGrant::Admin(shared::domain::SessionToken::from("adm-1"))
    );

    let tally = service.fetch_results().await.expect("results");
    assert_eq!(tally.total_votes, 10);
    assert_eq!(tally.results[0].name.as_str(), "Budi");
    let stats = tally.statistics.expect("stats");
    assert_eq!(stats.participation_rate, 25.0);
}

#[test]
fn duplicate_candidates_are_a_configuration_error() {
    let response: AuthenticateVoterResponse = serde_json::from_value(json!({
        "status": "success",
        "sessionToken": "s",
        "maxChoices": 1,
        "candidates": [{"nama": "Ayu"}, {"nama": "Ayu"}]
    }))
    .expect("decode");
    assert!(matches!(
        session_from_response("t", response),
        Err(AuthError::Configuration(ConfigurationError::InvalidCandidates(
            ProtocolError::DuplicateCandidate(_)
        )))
    ));
}

#[tokio::test]
async fn missing_service_fails_every_call() {
    let context = session(&["Ayu"], 1);
    let ballot = ballot_for(&context, &["Ayu"]);
    assert!(matches!(
        MissingScoringService
            .submit_ballot(&context, &ballot)
            .await,
        Err(SubmitError::Transport(_))
    ));
    assert!(MissingScoringService.fetch_results().await.is_err());
}
