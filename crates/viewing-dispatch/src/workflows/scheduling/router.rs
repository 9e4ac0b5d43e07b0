use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::arbitration::{AgentAppointments, RequestArbitrator};
use super::domain::{
    AgentAppointmentRequest, Appointment, AppointmentId, AppointmentRecord, RequestDecision,
    RequestId,
};
use super::service::{AppointmentScheduler, StatusUpdate, ViewingRequest};
use crate::workflows::directory::{AgentId, UserId};
use crate::workflows::pagination::{Page, PageRequest};
use crate::workflows::WorkflowError;

#[derive(Clone)]
pub(crate) struct SchedulingState {
    scheduler: Arc<AppointmentScheduler>,
    arbitrator: Arc<RequestArbitrator>,
}

impl SchedulingState {
    pub(crate) fn new(
        scheduler: Arc<AppointmentScheduler>,
        arbitrator: Arc<RequestArbitrator>,
    ) -> Self {
        Self {
            scheduler,
            arbitrator,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignAgentBody {
    pub(crate) agent_id: AgentId,
    pub(crate) actor_id: UserId,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RespondBody {
    pub(crate) agent_id: AgentId,
    pub(crate) decision: RequestDecision,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AgentAppointmentsQuery {
    pub(crate) page: Option<u32>,
    pub(crate) limit: Option<u32>,
    pub(crate) pending_page: Option<u32>,
    pub(crate) pending_limit: Option<u32>,
}

/// Router builder exposing appointment booking, arbitration, and lifecycle endpoints.
pub fn scheduling_router(
    scheduler: Arc<AppointmentScheduler>,
    arbitrator: Arc<RequestArbitrator>,
) -> Router {
    Router::new()
        .route("/api/v1/appointments", post(create_handler))
        .route("/api/v1/appointments/:appointment_id", get(appointment_handler))
        .route(
            "/api/v1/appointments/:appointment_id/assign",
            post(assign_handler),
        )
        .route(
            "/api/v1/appointments/:appointment_id/status",
            post(status_handler),
        )
        .route(
            "/api/v1/customers/:customer_id/appointments",
            get(customer_appointments_handler),
        )
        .route(
            "/api/v1/appointment-requests/:request_id/respond",
            post(respond_handler),
        )
        .route(
            "/api/v1/agents/:agent_id/appointments",
            get(agent_appointments_handler),
        )
        .with_state(SchedulingState::new(scheduler, arbitrator))
}

pub(crate) async fn create_handler(
    State(state): State<SchedulingState>,
    Json(request): Json<ViewingRequest>,
) -> Result<(StatusCode, Json<AppointmentRecord>), WorkflowError> {
    let record = state.scheduler.create_appointment(request)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn appointment_handler(
    State(state): State<SchedulingState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<AppointmentRecord>, WorkflowError> {
    state
        .scheduler
        .get_appointment(&AppointmentId(appointment_id))
        .map(Json)
}

pub(crate) async fn assign_handler(
    State(state): State<SchedulingState>,
    Path(appointment_id): Path<String>,
    Json(body): Json<AssignAgentBody>,
) -> Result<Json<AppointmentRecord>, WorkflowError> {
    state
        .scheduler
        .assign_agent(
            &AppointmentId(appointment_id),
            &body.agent_id,
            &body.actor_id,
            body.notes,
        )
        .map(Json)
}

pub(crate) async fn status_handler(
    State(state): State<SchedulingState>,
    Path(appointment_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<AppointmentRecord>, WorkflowError> {
    state
        .scheduler
        .update_status(&AppointmentId(appointment_id), update)
        .map(Json)
}

pub(crate) async fn customer_appointments_handler(
    State(state): State<SchedulingState>,
    Path(customer_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<Appointment>>, WorkflowError> {
    state
        .scheduler
        .customer_appointments(&UserId(customer_id), page)
        .map(Json)
}

pub(crate) async fn respond_handler(
    State(state): State<SchedulingState>,
    Path(request_id): Path<String>,
    Json(body): Json<RespondBody>,
) -> Result<Json<AgentAppointmentRequest>, WorkflowError> {
    state
        .arbitrator
        .respond(&RequestId(request_id), &body.agent_id, body.decision)
        .map(Json)
}

pub(crate) async fn agent_appointments_handler(
    State(state): State<SchedulingState>,
    Path(agent_id): Path<String>,
    Query(query): Query<AgentAppointmentsQuery>,
) -> Result<Json<AgentAppointments>, WorkflowError> {
    state
        .arbitrator
        .agent_appointments(
            &AgentId(agent_id),
            PageRequest {
                page: query.page,
                limit: query.limit,
            },
            PageRequest {
                page: query.pending_page,
                limit: query.pending_limit,
            },
        )
        .map(Json)
}
