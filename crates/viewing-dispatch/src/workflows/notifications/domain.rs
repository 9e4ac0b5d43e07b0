use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::{AgentStatus, UserId};
use crate::workflows::scheduling::AppointmentStatus;

/// Coarse bucket used by inbox filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    System,
    AppointmentReminder,
}

/// Delivery surface. Every workflow notification currently lands in the in-app inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
}

/// Every event the workflows announce, with the data needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    AgentApplicationSubmitted { applicant_name: String },
    VettingDecided { status: AgentStatus },
    AppointmentRequested { property_title: String },
    AppointmentCreated,
    AppointmentOpened { property_title: String },
    AgentAccepted { agent_name: String },
    AppointmentAssigned { agent_name: String },
    AgentAssigned { agent_name: String },
    AssignmentReceived { customer_name: String },
    RequestsExhausted { property_title: String },
    StatusChanged { status: AppointmentStatus },
}

impl NotificationKind {
    pub fn category(&self) -> NotificationCategory {
        match self {
            NotificationKind::AgentApplicationSubmitted { .. }
            | NotificationKind::VettingDecided { .. }
            | NotificationKind::AppointmentRequested { .. }
            | NotificationKind::AppointmentOpened { .. }
            | NotificationKind::AppointmentAssigned { .. }
            | NotificationKind::RequestsExhausted { .. } => NotificationCategory::System,
            NotificationKind::AppointmentCreated
            | NotificationKind::AgentAccepted { .. }
            | NotificationKind::AgentAssigned { .. }
            | NotificationKind::AssignmentReceived { .. }
            | NotificationKind::StatusChanged { .. } => NotificationCategory::AppointmentReminder,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::AgentApplicationSubmitted { .. } => "New Agent Application",
            NotificationKind::VettingDecided { .. } => "Agent Registration Decision",
            NotificationKind::AppointmentRequested { .. } => "New Appointment Request",
            NotificationKind::AppointmentCreated => "Appointment Created",
            NotificationKind::AppointmentOpened { .. } => "New Appointment Created",
            NotificationKind::AgentAccepted { .. } => "Agent Accepted Appointment",
            NotificationKind::AppointmentAssigned { .. } => "Appointment Assigned",
            NotificationKind::AgentAssigned { .. } => "Agent Assigned to Your Appointment",
            NotificationKind::AssignmentReceived { .. } => {
                "You Have Been Assigned to a New Appointment"
            }
            NotificationKind::RequestsExhausted { .. } => "No Agent Available",
            NotificationKind::StatusChanged { .. } => "Appointment Status Updated",
        }
    }

    pub fn message(&self) -> String {
        match self {
            NotificationKind::AgentApplicationSubmitted { applicant_name } => {
                format!("Agent {applicant_name} submitted an application.")
            }
            NotificationKind::VettingDecided { status } => {
                let outcome = match status {
                    AgentStatus::Approved => "approved",
                    AgentStatus::Rejected => "rejected",
                    AgentStatus::Pending => "returned to review",
                };
                format!("Your agent registration request has been {outcome}.")
            }
            NotificationKind::AppointmentRequested { property_title } => format!(
                "A customer wants to visit {property_title} in your area. Please accept or reject the request."
            ),
            NotificationKind::AppointmentCreated => {
                "Your appointment request was sent to agents in the area.".to_string()
            }
            NotificationKind::AppointmentOpened { property_title } => {
                format!("A customer created an appointment for property: {property_title}")
            }
            NotificationKind::AgentAccepted { agent_name } => {
                format!("Agent {agent_name} accepted your appointment request.")
            }
            NotificationKind::AppointmentAssigned { agent_name } => {
                format!("Appointment has been assigned to agent {agent_name}.")
            }
            NotificationKind::AgentAssigned { agent_name } => format!(
                "Agent {agent_name} has been assigned to your property viewing appointment."
            ),
            NotificationKind::AssignmentReceived { customer_name } => format!(
                "You have been assigned to an appointment with the client {customer_name}."
            ),
            NotificationKind::RequestsExhausted { property_title } => format!(
                "No agent accepted the viewing request for {property_title}."
            ),
            NotificationKind::StatusChanged { status } => match status {
                AppointmentStatus::Pending => "Your appointment is awaiting an agent.",
                AppointmentStatus::Confirmed | AppointmentStatus::Accepted => {
                    "Your appointment has been confirmed."
                }
                AppointmentStatus::InProgress => "Your appointment is currently in progress.",
                AppointmentStatus::Completed => "Your appointment has been completed.",
                AppointmentStatus::Cancelled => "Your appointment has been cancelled.",
            }
            .to_string(),
        }
    }
}

/// A rendered notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    pub channel: NotificationChannel,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: UserId, kind: NotificationKind, related_id: Option<String>) -> Self {
        Self {
            recipient,
            category: kind.category(),
            title: kind.title().to_string(),
            message: kind.message(),
            kind,
            related_id,
            channel: NotificationChannel::InApp,
            created_at: Utc::now(),
        }
    }
}
