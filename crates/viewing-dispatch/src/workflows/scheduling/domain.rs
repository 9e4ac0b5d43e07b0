use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::{AgentId, PropertyId, UserId};
use crate::workflows::WorkflowError;

string_id!(AppointmentId);
string_id!(
    /// Identifier of one agent's invitation to claim an appointment.
    RequestId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    /// Legacy synonym of `Confirmed` still present in stored data.
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Statuses that occupy the assigned agent's calendar.
    pub const fn holds_agent_slot(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Confirmed | AppointmentStatus::Accepted
        )
    }

    /// Statuses that block the customer from booking the same property at an overlapping time.
    pub const fn holds_customer_slot(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Accepted
        )
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        match (self, next) {
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed) => true,
            (
                AppointmentStatus::Confirmed | AppointmentStatus::Accepted,
                AppointmentStatus::InProgress,
            ) => true,
            (AppointmentStatus::InProgress, AppointmentStatus::Completed) => true,
            (current, AppointmentStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// An agent's answer to an appointment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestDecision {
    Accepted,
    Rejected,
}

/// Half-open interval `[start, end)` of absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, WorkflowError> {
        if end_time <= start_time {
            return Err(WorkflowError::bad_request(
                "end time must be after start time",
            ));
        }

        Ok(Self {
            start: date.and_time(start_time),
            end: date.and_time(end_time),
        })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A property viewing booked by a customer and, once claimed, served by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub property_id: PropertyId,
    pub customer_id: UserId,
    pub agent_id: Option<AgentId>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.appointment_date.and_time(self.start_time),
            end: self.appointment_date.and_time(self.end_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAppointmentRequest {
    pub id: RequestId,
    pub appointment_id: AppointmentId,
    pub agent_id: AgentId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl AgentAppointmentRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Append-only audit row written for every appointment status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub old_status: AppointmentStatus,
    pub new_status: AppointmentStatus,
    pub changed_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Consistency boundary for one appointment: the appointment itself, the requests fanned out to
/// agents, and its status history. Stores persist it as a unit and use `version` for
/// compare-and-swap writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub appointment: Appointment,
    pub requests: Vec<AgentAppointmentRequest>,
    pub history: Vec<StatusHistoryEntry>,
    pub version: u64,
}

impl AppointmentRecord {
    pub fn new(appointment: Appointment, requests: Vec<AgentAppointmentRequest>) -> Self {
        Self {
            appointment,
            requests,
            history: Vec::new(),
            version: 0,
        }
    }

    pub fn id(&self) -> &AppointmentId {
        &self.appointment.id
    }

    pub fn request(&self, id: &RequestId) -> Option<&AgentAppointmentRequest> {
        self.requests.iter().find(|request| &request.id == id)
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &AgentAppointmentRequest> {
        self.requests.iter().filter(|request| request.is_pending())
    }

    /// Still waiting for an agent while nobody is left to answer.
    pub fn is_exhausted(&self) -> bool {
        self.appointment.status == AppointmentStatus::Pending
            && self.appointment.agent_id.is_none()
            && self.pending_requests().next().is_none()
    }

    /// Claim the appointment for the request's agent and retire every sibling request.
    pub(crate) fn accept_request(
        &mut self,
        request_id: &RequestId,
        changed_by: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.ensure_open()?;
        let index = self.pending_request_index(request_id)?;

        let request = &mut self.requests[index];
        request.status = RequestStatus::Accepted;
        request.responded_at = Some(at);
        let agent_id = request.agent_id.clone();

        self.appointment.agent_id = Some(agent_id);
        self.record_status(AppointmentStatus::Confirmed, changed_by, None, at);
        self.retire_pending_requests(at);
        Ok(())
    }

    pub(crate) fn reject_request(
        &mut self,
        request_id: &RequestId,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let index = self.pending_request_index(request_id)?;
        let request = &mut self.requests[index];
        request.status = RequestStatus::Rejected;
        request.responded_at = Some(at);
        Ok(())
    }

    /// Administrative assignment bypassing arbitration. The agent's own pending request, if any,
    /// is marked accepted; all others are rejected.
    pub(crate) fn assign_agent(
        &mut self,
        agent_id: &AgentId,
        changed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.ensure_open()?;

        if let Some(request) = self
            .requests
            .iter_mut()
            .find(|request| request.is_pending() && &request.agent_id == agent_id)
        {
            request.status = RequestStatus::Accepted;
            request.responded_at = Some(at);
        }

        self.appointment.agent_id = Some(agent_id.clone());
        self.record_status(AppointmentStatus::Confirmed, changed_by, notes, at);
        self.retire_pending_requests(at);
        Ok(())
    }

    /// Administrative lifecycle transitions after confirmation (and cancellation at any point).
    pub(crate) fn transition(
        &mut self,
        next: AppointmentStatus,
        changed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if !matches!(
            next,
            AppointmentStatus::InProgress
                | AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
        ) {
            return Err(WorkflowError::bad_request(format!(
                "status '{}' is only reached through agent acceptance or assignment",
                next.label()
            )));
        }

        let current = self.appointment.status;
        if !current.can_transition_to(next) {
            return Err(WorkflowError::bad_request(format!(
                "cannot move appointment from '{}' to '{}'",
                current.label(),
                next.label()
            )));
        }

        if next == AppointmentStatus::Cancelled {
            self.retire_pending_requests(at);
        }
        self.record_status(next, changed_by, notes, at);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), WorkflowError> {
        if self.appointment.status != AppointmentStatus::Pending
            || self.appointment.agent_id.is_some()
        {
            return Err(WorkflowError::bad_request(
                "appointment is no longer awaiting an agent",
            ));
        }
        Ok(())
    }

    fn pending_request_index(&self, request_id: &RequestId) -> Result<usize, WorkflowError> {
        let index = self
            .requests
            .iter()
            .position(|request| &request.id == request_id)
            .ok_or_else(|| WorkflowError::not_found("appointment request"))?;

        if !self.requests[index].is_pending() {
            return Err(WorkflowError::bad_request(
                "request has already been processed",
            ));
        }
        Ok(index)
    }

    fn retire_pending_requests(&mut self, at: DateTime<Utc>) -> usize {
        let mut retired = 0;
        for request in self.requests.iter_mut().filter(|request| request.is_pending()) {
            request.status = RequestStatus::Rejected;
            request.responded_at = Some(at);
            retired += 1;
        }
        retired
    }

    fn record_status(
        &mut self,
        next: AppointmentStatus,
        changed_by: &UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) {
        let old_status = self.appointment.status;
        self.appointment.status = next;
        self.appointment.updated_at = at;
        self.history.push(StatusHistoryEntry {
            old_status,
            new_status: next,
            changed_by: changed_by.clone(),
            notes,
            changed_at: at,
        });
    }
}
