use aicurate_mint::SimulatedContract;
use aicurate_node::api::router;
use aicurate_node::config::NodeConfig;
use aicurate_node::node::AicurateNode;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

const WALLET: &str = "0x00112233445566778899aabbccddeeff00112233";

fn test_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.mint.conversion_rate = 100;
    config.mint.min_proof_points = 100;
    config.mint.daily_claim_limit = 1;
    config.mint.max_reward_per_tx = 10;
    config.mint.claim_cooldown_secs = 0;
    config
}

async fn test_app() -> (Router, Arc<SimulatedContract>) {
    let config = test_config();
    let contract = Arc::new(SimulatedContract::new([config.mint.signer.clone()]));
    let node = AicurateNode::with_contract(&config, contract.clone())
        .await
        .unwrap();
    (router(node), contract)
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn challenge_body(user: &str, challenge: &str, points: u64) -> serde_json::Value {
    serde_json::json!({
        "userId": user,
        "challengeId": challenge,
        "proofPointsEarned": points,
        "userWalletAddress": WALLET,
    })
}

#[tokio::test]
async fn replayed_event_credits_once() {
    let (app, contract) = test_app().await;

    let (status, first) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-1", "challenge-1", 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["proofPoints"], 100);
    assert_eq!(first["alreadyApplied"], false);
    assert_eq!(first["mint"]["minted"], true);

    let (status, replay) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-1", "challenge-1", 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["proofPoints"], 100);
    assert_eq!(replay["alreadyApplied"], true);
    assert_eq!(replay["mint"]["txHash"], first["mint"]["txHash"]);

    // Exactly one on-chain transaction happened.
    let wallet = aicurate_ledger::WalletAddress::from_string(WALLET).unwrap();
    assert_eq!(contract.minted_total(wallet).await.value(), 1);
}

#[tokio::test]
async fn rate_limited_mint_keeps_credit() {
    let (app, _contract) = test_app().await;

    let (status, first) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-2", "challenge-1", 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["mint"]["minted"], true);

    // Daily limit is one token: the second event still earns points but
    // the mint leg is rejected.
    let (status, second) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-2", "challenge-2", 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["proofPoints"], 200);
    assert_eq!(second["mint"]["minted"], false);
    assert_eq!(second["mint"]["retryable"], false);
    assert!(second["mint"]["error"]
        .as_str()
        .unwrap()
        .contains("rate limited"));
}

#[tokio::test]
async fn chain_failure_reports_retryable_mint() {
    let (app, contract) = test_app().await;

    contract.fail_next_mint("rpc timeout").await;
    let (status, body) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-3", "challenge-1", 100),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proofPoints"], 100);
    assert_eq!(body["mint"]["minted"], false);
    assert_eq!(body["mint"]["retryable"], true);
}

#[tokio::test]
async fn duplicate_badge_mint_rejected() {
    let (app, _contract) = test_app().await;

    let body = serde_json::json!({
        "worldcoinId": "worldcoin-1",
        "userAddress": WALLET,
        "badgeName": "pioneer",
        "transactionId": "0xabc",
    });

    let (status, first) = post_json(&app, "/v1/badge/mint", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["badgeMint"]["badge"], "pioneer");

    let (status, second) = post_json(&app, "/v1/badge/mint", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(second["error"].as_str().unwrap().contains("already minted"));

    // Still exactly one badge on record.
    let (status, badges) = get_json(&app, "/v1/user/worldcoin-1/badges").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(badges["badges"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_reward_amount_is_bad_request() {
    let (app, _contract) = test_app().await;

    let (status, body) = post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-4", "challenge-1", 0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("positive"));

    // No user record was created as a side effect of the rejected event.
    let (status, _) = get_json(&app, "/v1/user/user-4/badges").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_quiz_earns_nothing() {
    let (app, _contract) = test_app().await;

    let (status, _) = post_json(
        &app,
        "/v1/quiz/complete",
        serde_json::json!({
            "userId": "user-5",
            "quizId": "quiz-1",
            "score": 30,
            "proofPointsEarned": 50,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &app,
        "/v1/quiz/complete",
        serde_json::json!({
            "userId": "user-5",
            "quizId": "quiz-1",
            "score": 85,
            "proofPointsEarned": 50,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proofPoints"], 50);
}

#[tokio::test]
async fn cur8_transactions_view_lists_mint_events() {
    let (app, _contract) = test_app().await;

    post_json(
        &app,
        "/v1/challenge/complete",
        challenge_body("user-6", "challenge-1", 100),
    )
    .await;

    let (status, body) = get_json(&app, "/v1/user/user-6/cur8-transactions").await;
    assert_eq!(status, StatusCode::OK);
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["kind"], "token_mint");
    assert_eq!(transactions[0]["pointsDelta"], 0);

    // The full activity view carries both the earn and the mint entries.
    let (status, body) = get_json(&app, "/v1/user/user-6/activity").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activity"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let (app, _contract) = test_app().await;

    let (status, _) = get_json(&app, "/v1/user/nobody/badges").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, "/v1/user/nobody/cur8-transactions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
