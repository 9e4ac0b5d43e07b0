use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::domain::{Agent, AgentId, AreaId, UserId};
use super::service::DirectoryService;
use crate::workflows::WorkflowError;

/// Lookup endpoints for agent records and area eligibility.
pub fn directory_router(service: Arc<DirectoryService>) -> Router {
    Router::new()
        .route("/api/v1/agents/:agent_id", get(agent_handler))
        .route("/api/v1/users/:user_id/agent", get(agent_for_user_handler))
        .route("/api/v1/areas/:area_id/agents", get(eligible_agents_handler))
        .with_state(service)
}

pub(crate) async fn agent_handler(
    State(service): State<Arc<DirectoryService>>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, WorkflowError> {
    service.get_agent(&AgentId(agent_id)).map(Json)
}

pub(crate) async fn agent_for_user_handler(
    State(service): State<Arc<DirectoryService>>,
    Path(user_id): Path<String>,
) -> Result<Json<Agent>, WorkflowError> {
    service.resolve_agent_for_user(&UserId(user_id)).map(Json)
}

pub(crate) async fn eligible_agents_handler(
    State(service): State<Arc<DirectoryService>>,
    Path(area_id): Path<String>,
) -> Result<Json<Vec<Agent>>, WorkflowError> {
    service.find_eligible_agents(&AreaId(area_id)).map(Json)
}
