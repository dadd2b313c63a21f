use crate::config::ApiConfig;
use crate::node::AicurateNode;
use aicurate_ledger::{
    ActivityRecord, BadgeMintRecord, BadgeType, EventKey, LedgerError, UserId, WalletAddress,
};
use aicurate_rewards::{RewardError, RewardEvent, RewardOutcome};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    node: AicurateNode,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reward_error(e: RewardError) -> ApiError {
    let status = match &e {
        RewardError::InvalidRewardAmount(_) => StatusCode::BAD_REQUEST,
        RewardError::UserNotFound(_) => StatusCode::NOT_FOUND,
        RewardError::AlreadyMinted { .. } => StatusCode::CONFLICT,
        RewardError::LedgerWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "Reward event failed");
    }
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn ledger_error(e: LedgerError) -> ApiError {
    let status = match &e {
        LedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyMinted { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    minted: bool,
    tokens: Option<u64>,
    tx_hash: Option<String>,
    error: Option<String>,
    retryable: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewardResponse {
    proof_points: u64,
    level: u32,
    level_up: bool,
    already_applied: bool,
    mint: MintResponse,
}

impl From<RewardOutcome> for RewardResponse {
    fn from(outcome: RewardOutcome) -> Self {
        Self {
            proof_points: outcome.proof_points,
            level: outcome.level,
            level_up: outcome.level_up,
            already_applied: outcome.already_applied,
            mint: MintResponse {
                minted: outcome.mint.minted,
                tokens: outcome.mint.tokens,
                tx_hash: outcome.mint.tx_hash,
                error: outcome.mint.error,
                retryable: outcome.mint.retryable,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeCompleteRequest {
    user_id: String,
    challenge_id: String,
    proof_points_earned: u64,
    user_wallet_address: Option<String>,
    event_key: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizCompleteRequest {
    user_id: String,
    quiz_id: String,
    score: u32,
    proof_points_earned: u64,
    user_wallet_address: Option<String>,
    event_key: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BadgeMintRequest {
    worldcoin_id: String,
    user_address: String,
    badge_name: String,
    transaction_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BadgeResponse {
    badge: String,
    status: String,
    wallet: String,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BadgeMintRecord> for BadgeResponse {
    fn from(record: BadgeMintRecord) -> Self {
        Self {
            badge: record.badge.to_string(),
            status: format!("{:?}", record.status).to_lowercase(),
            wallet: record.wallet.to_string(),
            transaction_id: record.transaction_id,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BadgeMintResponse {
    badge_mint: BadgeResponse,
    reward: RewardResponse,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserBadgesResponse {
    badges: Vec<BadgeResponse>,
    proof_points: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResponse {
    kind: String,
    description: String,
    points_delta: u64,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<ActivityRecord> for ActivityResponse {
    fn from(record: ActivityRecord) -> Self {
        Self {
            kind: record.kind.to_string(),
            description: record.description,
            points_delta: record.points_delta,
            metadata: record.metadata,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityListResponse {
    activity: Vec<ActivityResponse>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionListResponse {
    transactions: Vec<ActivityResponse>,
}

pub fn router(node: AicurateNode) -> Router {
    let state = AppState { node };
    Router::new()
        .route("/health", get(health))
        .route("/v1/challenge/complete", post(complete_challenge))
        .route("/v1/quiz/complete", post(complete_quiz))
        .route("/v1/badge/mint", post(mint_badge))
        .route("/v1/user/:id/badges", get(get_user_badges))
        .route("/v1/user/:id/cur8-transactions", get(get_cur8_transactions))
        .route("/v1/user/:id/activity", get(get_user_activity))
        .with_state(Arc::new(state))
}

pub async fn serve(node: AicurateNode, api: &ApiConfig) -> anyhow::Result<()> {
    let app = router(node);
    let addr = format!("{}:{}", api.host, api.port);
    info!("📡 Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

fn parse_user(id: &str) -> Result<UserId, ApiError> {
    UserId::new(id).map_err(|e| bad_request(e.to_string()))
}

fn parse_wallet(address: &Option<String>) -> Result<Option<WalletAddress>, ApiError> {
    match address {
        Some(s) => WalletAddress::from_string(s)
            .map(Some)
            .map_err(|e| bad_request(e.to_string())),
        None => Ok(None),
    }
}

fn parse_event_key(key: &Option<String>) -> Result<Option<EventKey>, ApiError> {
    match key {
        Some(s) => EventKey::from_hex(s)
            .map(Some)
            .map_err(|e| bad_request(e.to_string())),
        None => Ok(None),
    }
}

async fn complete_challenge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChallengeCompleteRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    let user = parse_user(&req.user_id)?;
    let wallet = parse_wallet(&req.user_wallet_address)?;
    let key = parse_event_key(&req.event_key)?;

    let event = RewardEvent::ChallengeCompleted {
        challenge_id: req.challenge_id,
        points: req.proof_points_earned,
    };

    let outcome = state
        .node
        .orchestrator
        .process(&user, wallet, event, key)
        .await
        .map_err(reward_error)?;

    Ok(Json(outcome.into()))
}

async fn complete_quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuizCompleteRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    let user = parse_user(&req.user_id)?;
    let wallet = parse_wallet(&req.user_wallet_address)?;
    let key = parse_event_key(&req.event_key)?;

    let event = RewardEvent::QuizCompleted {
        quiz_id: req.quiz_id,
        score: req.score,
        points: req.proof_points_earned,
    };

    let outcome = state
        .node
        .orchestrator
        .process(&user, wallet, event, key)
        .await
        .map_err(reward_error)?;

    Ok(Json(outcome.into()))
}

async fn mint_badge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BadgeMintRequest>,
) -> Result<Json<BadgeMintResponse>, ApiError> {
    let user = parse_user(&req.worldcoin_id)?;
    let badge = BadgeType::from_name(&req.badge_name).map_err(|e| bad_request(e.to_string()))?;
    let wallet = WalletAddress::from_string(&req.user_address)
        .map_err(|e| bad_request(e.to_string()))?;

    let event = RewardEvent::BadgeMinted {
        badge,
        transaction_id: req.transaction_id,
    };

    let outcome = state
        .node
        .orchestrator
        .process(&user, Some(wallet), event, None)
        .await
        .map_err(reward_error)?;

    let record = state
        .node
        .ledger
        .get_badge_mint(&user, badge)
        .await
        .map_err(ledger_error)?
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Badge record missing after mint".to_string(),
                }),
            )
        })?;

    Ok(Json(BadgeMintResponse {
        badge_mint: record.into(),
        reward: outcome.into(),
    }))
}

async fn get_user_badges(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserBadgesResponse>, ApiError> {
    let user = parse_user(&id)?;
    let record = state.node.ledger.get_user(&user).await.map_err(ledger_error)?;
    let badges = state
        .node
        .ledger
        .badges_for_user(&user)
        .await
        .map_err(ledger_error)?;

    Ok(Json(UserBadgesResponse {
        badges: badges.into_iter().map(Into::into).collect(),
        proof_points: record.proof_points.value(),
    }))
}

async fn get_cur8_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let user = parse_user(&id)?;
    // Existence check keeps 404 semantics consistent across user routes.
    state.node.ledger.get_user(&user).await.map_err(ledger_error)?;

    let history = state
        .node
        .ledger
        .token_mint_history(&user)
        .await
        .map_err(ledger_error)?;

    Ok(Json(TransactionListResponse {
        transactions: history.into_iter().map(Into::into).collect(),
    }))
}

async fn get_user_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let user = parse_user(&id)?;
    state.node.ledger.get_user(&user).await.map_err(ledger_error)?;

    let activity = state
        .node
        .ledger
        .activity_for_user(&user, None)
        .await
        .map_err(ledger_error)?;

    Ok(Json(ActivityListResponse {
        activity: activity.into_iter().map(Into::into).collect(),
    }))
}
