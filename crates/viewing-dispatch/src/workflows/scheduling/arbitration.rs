use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::calendar::ensure_agent_available;
use super::domain::{
    AgentAppointmentRequest, Appointment, AppointmentRecord, RequestDecision, RequestId,
};
use super::repository::{commit_with_retry, AppointmentRepository};
use crate::config::SchedulingConfig;
use crate::workflows::directory::{
    Agent, AgentId, AgentRepository, PropertyRepository, UserRole,
};
use crate::workflows::notifications::{NotificationKind, Notifier};
use crate::workflows::pagination::{Page, PageRequest};
use crate::workflows::{Stores, WorkflowError};

/// A pending request together with the appointment it invites the agent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequestView {
    pub request: AgentAppointmentRequest,
    pub appointment: Appointment,
}

/// Independently paginated projections of an agent's workload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentAppointments {
    pub confirmed: Page<Appointment>,
    pub pending: Page<PendingRequestView>,
}

/// Resolves the agents' accept/reject answers so that at most one request per appointment is
/// ever accepted.
///
/// Every answer is validated against a freshly read aggregate and committed with a
/// compare-and-swap on the aggregate version. When two agents accept concurrently, one commit
/// wins; the other re-reads, finds its own request already rejected by the cascade, and fails
/// with `BadRequest`.
pub struct RequestArbitrator {
    appointments: Arc<dyn AppointmentRepository>,
    agents: Arc<dyn AgentRepository>,
    properties: Arc<dyn PropertyRepository>,
    notifier: Notifier,
    config: SchedulingConfig,
}

impl RequestArbitrator {
    pub fn new(stores: &Stores, notifier: Notifier, config: SchedulingConfig) -> Self {
        Self {
            appointments: stores.appointments.clone(),
            agents: stores.agents.clone(),
            properties: stores.properties.clone(),
            notifier,
            config,
        }
    }

    pub fn respond(
        &self,
        request_id: &RequestId,
        acting_agent_id: &AgentId,
        decision: RequestDecision,
    ) -> Result<AgentAppointmentRequest, WorkflowError> {
        let acting_agent = self.agents.fetch_agent(acting_agent_id)?;

        let now = Utc::now();
        let saved = commit_with_retry(
            self.appointments.as_ref(),
            || {
                self.appointments
                    .fetch_by_request(request_id)?
                    .ok_or_else(|| WorkflowError::not_found("appointment request"))
            },
            |record| {
                let request = record
                    .request(request_id)
                    .ok_or_else(|| WorkflowError::not_found("appointment request"))?;
                let agent = match &acting_agent {
                    Some(agent) if agent.id == request.agent_id => agent,
                    _ => {
                        return Err(WorkflowError::forbidden(
                            "request belongs to another agent",
                        ))
                    }
                };
                if !request.is_pending() {
                    return Err(WorkflowError::bad_request(
                        "request has already been processed",
                    ));
                }

                match decision {
                    RequestDecision::Rejected => record.reject_request(request_id, now),
                    RequestDecision::Accepted => {
                        ensure_agent_available(
                            self.appointments.as_ref(),
                            &agent.id,
                            &record.appointment,
                        )?;
                        record.accept_request(request_id, &agent.user_id, now)
                    }
                }
            },
        )?;

        let agent = acting_agent.ok_or_else(|| WorkflowError::not_found("agent"))?;
        let answered = saved
            .request(request_id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found("appointment request"))?;

        info!(
            request = %request_id,
            appointment = %saved.appointment.id,
            agent = %agent.id,
            decision = answered.status.label(),
            "appointment request answered"
        );

        match decision {
            RequestDecision::Accepted => self.announce_acceptance(&saved, &agent),
            RequestDecision::Rejected if saved.is_exhausted() => self.announce_exhaustion(&saved),
            RequestDecision::Rejected => {}
        }

        Ok(answered)
    }

    pub fn agent_appointments(
        &self,
        agent_id: &AgentId,
        confirmed_page: PageRequest,
        pending_page: PageRequest,
    ) -> Result<AgentAppointments, WorkflowError> {
        if self.agents.fetch_agent(agent_id)?.is_none() {
            return Err(WorkflowError::not_found("agent"));
        }

        let mut confirmed: Vec<Appointment> = self
            .appointments
            .agent_appointments(agent_id)?
            .into_iter()
            .map(|record| record.appointment)
            .collect();
        confirmed.sort_by_key(|appointment| {
            (appointment.appointment_date, appointment.start_time)
        });

        let mut pending: Vec<PendingRequestView> = self
            .appointments
            .requested_from(agent_id)?
            .into_iter()
            .flat_map(|record| {
                let AppointmentRecord {
                    appointment,
                    requests,
                    ..
                } = record;
                requests
                    .into_iter()
                    .filter(move |request| {
                        request.is_pending() && &request.agent_id == agent_id
                    })
                    .map(move |request| PendingRequestView {
                        request,
                        appointment: appointment.clone(),
                    })
            })
            .collect();
        pending.sort_by_key(|view| {
            (
                view.appointment.appointment_date,
                view.appointment.start_time,
            )
        });

        Ok(AgentAppointments {
            confirmed: Page::slice(confirmed, confirmed_page, &self.config),
            pending: Page::slice(pending, pending_page, &self.config),
        })
    }

    fn announce_acceptance(&self, record: &AppointmentRecord, agent: &Agent) {
        let appointment_id = record.id().as_str();
        let agent_name = self.notifier.display_name(&agent.user_id);

        self.notifier.notify(
            &record.appointment.customer_id,
            NotificationKind::AgentAccepted {
                agent_name: agent_name.clone(),
            },
            Some(appointment_id),
        );
        self.notifier.notify_role(
            UserRole::Admin,
            NotificationKind::AppointmentAssigned { agent_name },
            Some(appointment_id),
        );
    }

    fn announce_exhaustion(&self, record: &AppointmentRecord) {
        let appointment_id = record.id().as_str();
        let property_title = match self.properties.fetch_property(&record.appointment.property_id)
        {
            Ok(Some(property)) => property.title,
            _ => record.appointment.property_id.to_string(),
        };
        let kind = NotificationKind::RequestsExhausted { property_title };

        self.notifier.notify(
            &record.appointment.customer_id,
            kind.clone(),
            Some(appointment_id),
        );
        self.notifier
            .notify_role(UserRole::Admin, kind, Some(appointment_id));
    }
}
