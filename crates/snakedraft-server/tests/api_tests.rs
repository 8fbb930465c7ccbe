// HTTP API tests, driven through the router with `oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use snakedraft_core::draft::pick::Position;
use snakedraft_core::ledger::MemoryLedger;
use snakedraft_core::valuation::catalog::{Player, PlayerPool};
use snakedraft_core::{DraftEngine, EngineSettings};
use snakedraft_server::{build_router, AppState};
use tower::util::ServiceExt; // for `oneshot`

// =============================================================================
// Helpers
// =============================================================================

fn setup_app() -> Router {
    let players = (0..120)
        .map(|i| Player {
            id: format!("player-{:03}", i + 1),
            name: format!("Player {}", i + 1),
            position: Position::ALL[i % Position::ALL.len()],
            team: "Owls".into(),
            projection: 280.0 - i as f64,
            adp: (i + 1) as f64,
        })
        .collect();
    let engine = DraftEngine::new(
        Arc::new(MemoryLedger::new()),
        Arc::new(PlayerPool::new(players)),
        EngineSettings::default(),
    );
    build_router(AppState::new(Arc::new(engine)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("should parse JSON")
    };
    (status, json)
}

async fn create_human_draft(app: &Router) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/drafts",
        Some(json!({
            "name": "Office League",
            "numTeams": 2,
            "rounds": 2,
            "timerPerPickSec": 0,
            "seed": "API-SEED",
            "participants": [
                {"slot": 1, "userType": "human", "displayName": "Avery"},
                {"slot": 2, "userType": "human", "displayName": "Jordan"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint() {
    let app = setup_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "snakedraft");
    assert!(body["version"].is_string());
}

// =============================================================================
// Drafts
// =============================================================================

#[tokio::test]
async fn create_draft_with_default_bots() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        "POST",
        "/drafts",
        Some(json!({"numTeams": 4, "rounds": 3})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["numTeams"], 4);
    assert_eq!(body["snake"], true);
    assert_eq!(body["timerPerPickSec"], 30);
    assert_eq!(body["participants"].as_array().unwrap().len(), 4);
    assert_eq!(body["participants"][0]["userType"], "bot");
}

#[tokio::test]
async fn invalid_settings_are_bad_request() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        "POST",
        "/drafts",
        Some(json!({"numTeams": 1, "rounds": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CONFIG");
}

#[tokio::test]
async fn unknown_draft_is_not_found() {
    let app = setup_app();
    let (status, body) = send(&app, "GET", "/drafts/draft_nope/turn", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DRAFT_NOT_FOUND");
}

#[tokio::test]
async fn human_pick_flow() {
    let app = setup_app();
    let draft = create_human_draft(&app).await;
    let id = draft["id"].as_str().unwrap();
    let first = draft["participants"][0]["id"].as_str().unwrap();
    let second = draft["participants"][1]["id"].as_str().unwrap();

    let (status, started) = send(&app, "POST", &format!("/drafts/{id}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "active");

    let (status, turn) = send(&app, "GET", &format!("/drafts/{id}/turn"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["overall"], 1);
    assert_eq!(turn["participantId"], first);
    assert_eq!(turn["deadline"], Value::Null);

    let pick_uri = format!("/drafts/{id}/pick");
    let (status, body) = send(
        &app,
        "POST",
        &pick_uri,
        Some(json!({"participantId": second, "playerId": "player-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_YOUR_TURN");

    let (status, pick) = send(
        &app,
        "POST",
        &pick_uri,
        Some(json!({"participantId": first, "playerId": "player-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pick["overall"], 1);
    assert_eq!(pick["autopick"], false);

    let (status, body) = send(
        &app,
        "POST",
        &pick_uri,
        Some(json!({"participantId": second, "playerId": "player-001"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PLAYER_ALREADY_DRAFTED");

    let (status, body) = send(
        &app,
        "POST",
        &pick_uri,
        Some(json!({"participantId": second, "playerId": "player-999"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PLAYER");

    // No timer and a human on the clock: nothing to autopick.
    let (status, body) = send(&app, "POST", &format!("/drafts/{id}/autopick"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autopicked"], false);
    assert_eq!(body["pick"], Value::Null);
}

#[tokio::test]
async fn bot_autopick_endpoint() {
    let app = setup_app();
    let (_, draft) = send(
        &app,
        "POST",
        "/drafts",
        Some(json!({"numTeams": 3, "rounds": 2})),
    )
    .await;
    let id = draft["id"].as_str().unwrap();
    send(&app, "POST", &format!("/drafts/{id}/start"), None).await;

    let (status, body) = send(&app, "POST", &format!("/drafts/{id}/autopick"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autopicked"], true);
    assert_eq!(body["pick"]["overall"], 1);
    assert_eq!(body["pick"]["autopick"], true);

    // Second call inside the bot rate limit window.
    let (_, body) = send(&app, "POST", &format!("/drafts/{id}/autopick"), None).await;
    assert_eq!(body["autopicked"], false);
}

#[tokio::test]
async fn bot_run_and_results() {
    let app = setup_app();
    let (_, draft) = send(
        &app,
        "POST",
        "/drafts",
        Some(json!({"numTeams": 4, "rounds": 5, "seed": "RUN-SEED"})),
    )
    .await;
    let id = draft["id"].as_str().unwrap();

    let (status, metrics) = send(&app, "POST", &format!("/drafts/{id}/run"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["totalPicks"], 20);
    assert_eq!(metrics["autopicksCount"], 20);

    let (status, results) = send(&app, "GET", &format!("/drafts/{id}/results"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["draft"]["status"], "complete");
    assert_eq!(results["picks"].as_array().unwrap().len(), 20);
    assert_eq!(results["summaryByTeam"].as_array().unwrap().len(), 4);
    assert_eq!(results["audit"]["noDuplicatePlayers"], true);
    assert_eq!(results["audit"]["correctPickCount"], true);
    assert_eq!(results["audit"]["draftComplete"], true);

    let (status, body) = send(&app, "GET", &format!("/drafts/{id}/turn"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DRAFT_COMPLETE");
}
