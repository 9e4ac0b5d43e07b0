use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};

use super::domain::{AgentApplication, ScopeChange, VettingDecisionRequest};
use super::service::VettingService;
use crate::workflows::directory::{Agent, AgentId};
use crate::workflows::WorkflowError;

/// Router builder exposing agent intake and vetting endpoints.
pub fn vetting_router(service: Arc<VettingService>) -> Router {
    Router::new()
        .route("/api/v1/agents", post(submit_handler))
        .route("/api/v1/agents/:agent_id/decision", post(decision_handler))
        .route("/api/v1/agents/:agent_id/scope", patch(scope_handler))
        .with_state(service)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<VettingService>>,
    Json(application): Json<AgentApplication>,
) -> Result<(StatusCode, Json<Agent>), WorkflowError> {
    let agent = service.submit_application(application)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub(crate) async fn decision_handler(
    State(service): State<Arc<VettingService>>,
    Path(agent_id): Path<String>,
    Json(request): Json<VettingDecisionRequest>,
) -> Result<Json<Agent>, WorkflowError> {
    service
        .decide(&AgentId(agent_id), request.decision, request.notes)
        .map(Json)
}

pub(crate) async fn scope_handler(
    State(service): State<Arc<VettingService>>,
    Path(agent_id): Path<String>,
    Json(change): Json<ScopeChange>,
) -> Result<Json<Agent>, WorkflowError> {
    service.reassign_scope(&AgentId(agent_id), change).map(Json)
}
