//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::aggregate::{Transaction, User};
use crate::audit::{AuditReport, LedgerAuditService};
use crate::domain::Amount;
use crate::error::AppError;
use crate::handlers::{CreateTransactionCommand, CreateUserCommand, IntakeService, UserView};
use crate::jobs::{JobQueue, StatsSnapshot, WorkerStats};

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub intake: IntakeService,
    pub queue: JobQueue,
    pub stats: Arc<WorkerStats>,
    pub audit: LedgerAuditService,
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default, alias = "dontVerify")]
    pub skip_verification: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
}

/// Success envelope: `{ "message": "success", "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            message: "success",
            data,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub depth: usize,
    pub capacity: usize,
    pub deferred: u64,
    pub closed: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub workers: StatsSnapshot,
    pub queue: QueueStats,
    pub audit: AuditReport,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:user_id", get(get_user))
        .route("/tx", get(list_transactions).post(create_transaction))
        .route("/tx/:tx_id", get(get_transaction))
        .route("/stats", get(stats))
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

// =========================================================================
// Users
// =========================================================================

/// Register a user; verification happens in the background
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = payload?;

    let mut command = CreateUserCommand::new(request.name);
    if request.skip_verification {
        command = command.skipping_verification();
    }

    let user = state.intake.create_user(command).await?;
    Ok(ApiResponse::success(user))
}

/// List users with their current balances
async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserView>> {
    Ok(ApiResponse::success(state.intake.list_users().await?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserView> {
    Ok(ApiResponse::success(state.intake.get_user(user_id).await?))
}

// =========================================================================
// Transactions
// =========================================================================

/// Accept a transfer request; settlement happens in the background
async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> ApiResult<Transaction> {
    let Json(request) = payload?;
    let amount = Amount::new(request.amount)?;

    let command = CreateTransactionCommand::new(request.sender_id, request.receiver_id, amount);
    let tx = state.intake.create_transaction(command).await?;
    Ok(ApiResponse::success(tx))
}

async fn list_transactions(State(state): State<AppState>) -> ApiResult<Vec<Transaction>> {
    Ok(ApiResponse::success(state.intake.list_transactions().await?))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(tx_id): Path<Uuid>,
) -> ApiResult<Transaction> {
    Ok(ApiResponse::success(state.intake.get_transaction(tx_id).await?))
}

// =========================================================================
// Stats
// =========================================================================

/// Worker counters, queue depth and a fresh ledger audit
async fn stats(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    let queue = QueueStats {
        depth: state.queue.depth().await,
        capacity: state.queue.capacity(),
        deferred: state.queue.deferred_count(),
        closed: state.queue.is_closed().await,
    };
    let audit = state.audit.verify().await?;

    Ok(ApiResponse::success(StatsResponse {
        workers: state.stats.snapshot(),
        queue,
        audit,
    }))
}
