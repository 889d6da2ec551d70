//! HTTP routes.
//!
//! Reads are open to the presentation layer; the only user-state writes
//! are start and collect. Account and reconciliation routes are for the
//! account service and operators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use archipelago_domain::{
    CatalogDocument, CrewMemberId, QuestHistoryRecord, QuestInstanceId, QuestTemplateId, UserId,
};

use crate::app::App;
use crate::infrastructure::ports::RepoError;
use crate::use_cases::accounts::AccountCreated;
use crate::use_cases::quests::{ActiveQuestView, CollectedQuest};
use crate::use_cases::reconciliation::BaselineRepair;
use crate::use_cases::{ProgressionSnapshot, QuestError, ReconciliationReport};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/catalog", get(get_catalog))
        .route("/api/accounts", post(create_account))
        .route("/api/accounts/{user_id}", delete(deactivate_account))
        .route("/api/users/{user_id}/progression", get(get_progression))
        .route("/api/users/{user_id}/quests/history", get(list_history))
        .route("/api/users/{user_id}/quests", post(start_quest))
        .route(
            "/api/users/{user_id}/quests/{instance_id}",
            get(get_quest_status),
        )
        .route(
            "/api/users/{user_id}/quests/{instance_id}/collect",
            post(collect_quest),
        )
        .route("/api/users/{user_id}/reconcile", post(reconcile_user))
        .route("/api/admin/reconcile", post(reconcile_all))
}

async fn health() -> &'static str {
    "OK"
}

async fn get_catalog(State(app): State<Arc<App>>) -> Json<CatalogDocument> {
    Json(app.catalog.to_document())
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateAccountRequest {
    user_id: String,
}

async fn create_account(
    State(app): State<Arc<App>>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountCreated>), ApiError> {
    let user_id = parse_user_id(&request.user_id)?;
    let created = app
        .use_cases
        .accounts
        .on_account_created(&user_id)
        .await?;
    let status = if created.newly_registered {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(created)))
}

async fn deactivate_account(
    State(app): State<Arc<App>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    app.use_cases.accounts.deactivate(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Progression
// =============================================================================

async fn get_progression(
    State(app): State<Arc<App>>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressionSnapshot>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let snapshot = app.use_cases.progression.snapshot.execute(&user_id).await?;
    Ok(Json(snapshot))
}

async fn list_history(
    State(app): State<Arc<App>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<QuestHistoryRecord>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let history = app.use_cases.progression.history.list(&user_id).await?;
    Ok(Json(history))
}

// =============================================================================
// Quests
// =============================================================================

#[derive(Debug, Deserialize)]
struct StartQuestRequest {
    quest_id: String,
    crew: Vec<String>,
}

async fn start_quest(
    State(app): State<Arc<App>>,
    Path(user_id): Path<String>,
    Json(request): Json<StartQuestRequest>,
) -> Result<(StatusCode, Json<ActiveQuestView>), ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let quest_id = QuestTemplateId::new(request.quest_id)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let crew = request
        .crew
        .into_iter()
        .map(CrewMemberId::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let view = app
        .use_cases
        .quests
        .start
        .execute(&user_id, &quest_id, crew)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_quest_status(
    State(app): State<Arc<App>>,
    Path((user_id, instance_id)): Path<(String, Uuid)>,
) -> Result<Json<ActiveQuestView>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let view = app
        .use_cases
        .quests
        .status
        .get(&user_id, QuestInstanceId::from_uuid(instance_id))
        .await?;
    Ok(Json(view))
}

async fn collect_quest(
    State(app): State<Arc<App>>,
    Path((user_id, instance_id)): Path<(String, Uuid)>,
) -> Result<Json<CollectedQuest>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let collected = app
        .use_cases
        .quests
        .collect
        .execute(&user_id, QuestInstanceId::from_uuid(instance_id))
        .await?;
    Ok(Json(collected))
}

// =============================================================================
// Reconciliation
// =============================================================================

async fn reconcile_user(
    State(app): State<Arc<App>>,
    Path(user_id): Path<String>,
) -> Result<Json<BaselineRepair>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let repair = app.use_cases.reconciliation.user.execute(&user_id).await?;
    Ok(Json(repair))
}

async fn reconcile_all(
    State(app): State<Arc<App>>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let report = app.use_cases.reconciliation.all.execute().await?;
    Ok(Json(report))
}

fn parse_user_id(value: &str) -> Result<UserId, ApiError> {
    UserId::new(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    /// Rejected by a precondition; nothing was written
    Conflict(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        if e.is_not_found() {
            ApiError::NotFound
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<QuestError> for ApiError {
    fn from(e: QuestError) -> Self {
        match e {
            QuestError::Precondition(violation) => ApiError::Conflict(violation.to_string()),
            QuestError::Repo(e) => e.into(),
        }
    }
}
