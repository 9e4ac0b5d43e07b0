use tracing::debug;

use super::domain::{AppointmentId, AppointmentRecord, RequestId};
use crate::workflows::directory::{AgentId, RepositoryError, UserId};
use crate::workflows::WorkflowError;

/// Storage for appointment aggregates.
///
/// `insert_appointment` persists an appointment together with its fan-out requests in one write.
/// `save_appointment` is a compare-and-swap: it succeeds only while the stored version equals
/// `record.version`, and returns the record with its version advanced. A stale write fails with
/// [`RepositoryError::VersionConflict`] and changes nothing.
pub trait AppointmentRepository: Send + Sync {
    fn insert_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError>;
    fn save_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError>;
    fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError>;
    /// Resolve the aggregate owning a request.
    fn fetch_by_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError>;
    fn customer_appointments(
        &self,
        customer_id: &UserId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError>;
    /// Appointments currently assigned to the agent.
    fn agent_appointments(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError>;
    /// Appointments holding at least one request addressed to the agent.
    fn requested_from(&self, agent_id: &AgentId)
        -> Result<Vec<AppointmentRecord>, RepositoryError>;
}

/// Load, mutate, and compare-and-swap an aggregate, re-reading after each lost race.
///
/// `load` runs on every attempt so that `apply` always validates against fresh state; a
/// transition another writer already made is therefore rejected by `apply` rather than
/// overwritten. A version conflict means some other writer committed, so the loop keeps going
/// until this write either lands or `apply` refuses the fresh state.
pub(crate) fn commit_with_retry<L, F>(
    appointments: &dyn AppointmentRepository,
    mut load: L,
    mut apply: F,
) -> Result<AppointmentRecord, WorkflowError>
where
    L: FnMut() -> Result<AppointmentRecord, WorkflowError>,
    F: FnMut(&mut AppointmentRecord) -> Result<(), WorkflowError>,
{
    let mut attempt: u32 = 1;
    loop {
        let mut record = load()?;
        apply(&mut record)?;

        match appointments.save_appointment(record) {
            Ok(saved) => return Ok(saved),
            Err(RepositoryError::VersionConflict) => {
                debug!(attempt, "appointment changed concurrently, re-reading");
                attempt = attempt.saturating_add(1);
            }
            Err(err) => return Err(err.into()),
        }
    }
}
