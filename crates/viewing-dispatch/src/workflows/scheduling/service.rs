use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::calendar::ensure_agent_available;
use super::domain::{
    AgentAppointmentRequest, Appointment, AppointmentId, AppointmentRecord, AppointmentStatus,
    RequestId, RequestStatus, TimeWindow,
};
use super::repository::{commit_with_retry, AppointmentRepository};
use crate::config::SchedulingConfig;
use crate::workflows::directory::{
    AgentId, AgentRepository, DirectoryService, PropertyId, PropertyRepository, User,
    UserDirectory, UserId, UserRole,
};
use crate::workflows::notifications::{NotificationKind, Notifier};
use crate::workflows::pagination::{Page, PageRequest};
use crate::workflows::parse::{deserialize_date, deserialize_time};
use crate::workflows::{Stores, WorkflowError};

/// Customer request to view a property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewingRequest {
    pub property_id: PropertyId,
    pub customer_id: UserId,
    #[serde(deserialize_with = "deserialize_date")]
    pub appointment_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    pub end_time: NaiveTime,
}

/// Administrative lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
    pub actor_id: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Creates viewing appointments, fans them out to eligible agents, and applies the
/// administrative parts of the appointment lifecycle.
pub struct AppointmentScheduler {
    appointments: Arc<dyn AppointmentRepository>,
    properties: Arc<dyn PropertyRepository>,
    users: Arc<dyn UserDirectory>,
    agents: Arc<dyn AgentRepository>,
    directory: DirectoryService,
    notifier: Notifier,
    config: SchedulingConfig,
}

static APPOINTMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_appointment_id() -> AppointmentId {
    let id = APPOINTMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AppointmentId(format!("apt-{id:06}"))
}

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

impl AppointmentScheduler {
    pub fn new(
        stores: &Stores,
        directory: DirectoryService,
        notifier: Notifier,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            appointments: stores.appointments.clone(),
            properties: stores.properties.clone(),
            users: stores.users.clone(),
            agents: stores.agents.clone(),
            directory,
            notifier,
            config,
        }
    }

    /// Book a viewing and invite every eligible agent to claim it.
    ///
    /// The appointment and all of its requests are written in a single insert; notifications go
    /// out only after that write succeeds.
    pub fn create_appointment(
        &self,
        request: ViewingRequest,
    ) -> Result<AppointmentRecord, WorkflowError> {
        let window = TimeWindow::new(
            request.appointment_date,
            request.start_time,
            request.end_time,
        )?;

        let property = self
            .properties
            .fetch_property(&request.property_id)?
            .ok_or_else(|| WorkflowError::not_found("property"))?;
        let customer = self
            .users
            .fetch_user(&request.customer_id)?
            .ok_or_else(|| WorkflowError::not_found("customer"))?;

        let overlapping = self
            .appointments
            .customer_appointments(&customer.id)?
            .into_iter()
            .any(|record| {
                let existing = &record.appointment;
                existing.property_id == property.id
                    && existing.status.holds_customer_slot()
                    && existing.window().overlaps(&window)
            });
        if overlapping {
            return Err(WorkflowError::conflict(
                "customer already has a pending or confirmed appointment for this property at this time",
            ));
        }

        let agents = self.directory.find_eligible_agents(&property.area_id)?;
        if agents.is_empty() {
            return Err(WorkflowError::NotFound(
                "no agents available in this area".to_string(),
            ));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: next_appointment_id(),
            property_id: property.id.clone(),
            customer_id: customer.id.clone(),
            agent_id: None,
            appointment_date: request.appointment_date,
            start_time: request.start_time,
            end_time: request.end_time,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let requests = agents
            .iter()
            .map(|agent| AgentAppointmentRequest {
                id: next_request_id(),
                appointment_id: appointment.id.clone(),
                agent_id: agent.id.clone(),
                status: RequestStatus::Pending,
                created_at: now,
                responded_at: None,
            })
            .collect();

        let stored = self
            .appointments
            .insert_appointment(AppointmentRecord::new(appointment, requests))?;
        let appointment_id = stored.id().as_str();

        info!(
            appointment = appointment_id,
            property = %property.id,
            customer = %customer.id,
            invited = stored.requests.len(),
            "appointment created"
        );

        for agent in &agents {
            self.notifier.notify(
                &agent.user_id,
                NotificationKind::AppointmentRequested {
                    property_title: property.title.clone(),
                },
                Some(appointment_id),
            );
        }
        self.notifier.notify(
            &customer.id,
            NotificationKind::AppointmentCreated,
            Some(appointment_id),
        );
        self.notifier.notify_role(
            UserRole::Admin,
            NotificationKind::AppointmentOpened {
                property_title: property.title.clone(),
            },
            Some(appointment_id),
        );

        Ok(stored)
    }

    /// Admin override of arbitration: give a pending appointment to a specific approved agent.
    pub fn assign_agent(
        &self,
        appointment_id: &AppointmentId,
        agent_id: &AgentId,
        actor_id: &UserId,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, WorkflowError> {
        let actor = self.actor(actor_id)?;
        if actor.role != UserRole::Admin {
            return Err(WorkflowError::forbidden(
                "only admins can assign agents to appointments",
            ));
        }

        let agent = self
            .agents
            .fetch_agent(agent_id)?
            .ok_or_else(|| WorkflowError::not_found("agent"))?;
        if !agent.is_approved() {
            return Err(WorkflowError::bad_request("agent is not approved"));
        }

        let now = Utc::now();
        let saved = commit_with_retry(
            self.appointments.as_ref(),
            || self.load(appointment_id),
            |record| {
                ensure_agent_available(
                    self.appointments.as_ref(),
                    &agent.id,
                    &record.appointment,
                )?;
                record.assign_agent(&agent.id, &actor.id, notes.clone(), now)
            },
        )?;

        info!(
            appointment = %appointment_id,
            agent = %agent.id,
            actor = %actor.id,
            "agent assigned by admin"
        );

        let customer_name = self.notifier.display_name(&saved.appointment.customer_id);
        let agent_name = self.notifier.display_name(&agent.user_id);
        self.notifier.notify(
            &saved.appointment.customer_id,
            NotificationKind::AgentAssigned { agent_name },
            Some(appointment_id.as_str()),
        );
        self.notifier.notify(
            &agent.user_id,
            NotificationKind::AssignmentReceived { customer_name },
            Some(appointment_id.as_str()),
        );

        Ok(saved)
    }

    /// Move an appointment along `confirmed -> in_progress -> completed`, or cancel it.
    ///
    /// Admins may apply any allowed transition, the assigned agent may progress or cancel its
    /// own appointment, and the customer may only cancel.
    pub fn update_status(
        &self,
        appointment_id: &AppointmentId,
        update: StatusUpdate,
    ) -> Result<AppointmentRecord, WorkflowError> {
        let actor = self.actor(&update.actor_id)?;
        let actor_agent = match actor.role {
            UserRole::Agent => self
                .agents
                .fetch_agent_by_user(&actor.id)?
                .map(|agent| agent.id),
            _ => None,
        };

        let now = Utc::now();
        let saved = commit_with_retry(
            self.appointments.as_ref(),
            || self.load(appointment_id),
            |record| {
                authorize_status_change(&actor, actor_agent.as_ref(), record, update.status)?;
                record.transition(update.status, &actor.id, update.notes.clone(), now)
            },
        )?;

        info!(
            appointment = %appointment_id,
            status = update.status.label(),
            actor = %actor.id,
            "appointment status changed"
        );

        let kind = NotificationKind::StatusChanged {
            status: update.status,
        };
        self.notifier.notify(
            &saved.appointment.customer_id,
            kind.clone(),
            Some(appointment_id.as_str()),
        );
        if let Some(agent_id) = &saved.appointment.agent_id {
            match self.agents.fetch_agent(agent_id) {
                Ok(Some(agent)) => {
                    self.notifier
                        .notify(&agent.user_id, kind, Some(appointment_id.as_str()));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        agent = %agent_id,
                        error = %err,
                        "unable to resolve agent for status notification"
                    );
                }
            }
        }

        Ok(saved)
    }

    pub fn get_appointment(
        &self,
        appointment_id: &AppointmentId,
    ) -> Result<AppointmentRecord, WorkflowError> {
        self.load(appointment_id)
    }

    /// The customer's appointments, latest first.
    pub fn customer_appointments(
        &self,
        customer_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<Appointment>, WorkflowError> {
        self.actor(customer_id)?;

        let mut appointments: Vec<Appointment> = self
            .appointments
            .customer_appointments(customer_id)?
            .into_iter()
            .map(|record| record.appointment)
            .collect();
        appointments.sort_by(|left, right| {
            (right.appointment_date, right.start_time)
                .cmp(&(left.appointment_date, left.start_time))
        });

        Ok(Page::slice(appointments, page, &self.config))
    }

    fn load(&self, appointment_id: &AppointmentId) -> Result<AppointmentRecord, WorkflowError> {
        self.appointments
            .fetch_appointment(appointment_id)?
            .ok_or_else(|| WorkflowError::not_found("appointment"))
    }

    fn actor(&self, user_id: &UserId) -> Result<User, WorkflowError> {
        self.users
            .fetch_user(user_id)?
            .ok_or_else(|| WorkflowError::not_found("user"))
    }
}

fn authorize_status_change(
    actor: &User,
    actor_agent: Option<&AgentId>,
    record: &AppointmentRecord,
    next: AppointmentStatus,
) -> Result<(), WorkflowError> {
    let appointment = &record.appointment;
    let allowed = match actor.role {
        UserRole::Admin => true,
        UserRole::Agent => {
            actor_agent.is_some() && appointment.agent_id.as_ref() == actor_agent
        }
        UserRole::Customer => {
            appointment.customer_id == actor.id && next == AppointmentStatus::Cancelled
        }
        UserRole::Quality => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::forbidden(format!(
            "{} cannot set this appointment to '{}'",
            actor.role.label(),
            next.label()
        )))
    }
}
