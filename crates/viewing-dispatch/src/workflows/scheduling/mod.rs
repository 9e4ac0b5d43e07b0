//! Viewing appointments: creation with fan-out to eligible agents, accept/reject arbitration
//! among those agents, and the administrative lifecycle that follows confirmation.

pub mod arbitration;
mod calendar;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use arbitration::{AgentAppointments, PendingRequestView, RequestArbitrator};
pub use domain::{
    AgentAppointmentRequest, Appointment, AppointmentId, AppointmentRecord, AppointmentStatus,
    RequestDecision, RequestId, RequestStatus, StatusHistoryEntry, TimeWindow,
};
pub use repository::AppointmentRepository;
pub use router::scheduling_router;
pub use service::{AppointmentScheduler, StatusUpdate, ViewingRequest};
