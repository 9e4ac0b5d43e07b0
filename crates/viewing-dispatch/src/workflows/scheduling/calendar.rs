use super::domain::Appointment;
use super::repository::AppointmentRepository;
use crate::workflows::directory::AgentId;
use crate::workflows::WorkflowError;

/// Fail with `Conflict` when the agent already holds a booking overlapping `candidate`.
pub(crate) fn ensure_agent_available(
    appointments: &dyn AppointmentRepository,
    agent_id: &AgentId,
    candidate: &Appointment,
) -> Result<(), WorkflowError> {
    let window = candidate.window();
    let clash = appointments
        .agent_appointments(agent_id)?
        .into_iter()
        .map(|record| record.appointment)
        .find(|existing| {
            existing.id != candidate.id
                && existing.status.holds_agent_slot()
                && existing.window().overlaps(&window)
        });

    match clash {
        Some(existing) => Err(WorkflowError::conflict(format!(
            "agent is already booked for appointment {} on {} from {} to {}",
            existing.id,
            existing.appointment_date,
            existing.start_time.format("%H:%M"),
            existing.end_time.format("%H:%M"),
        ))),
        None => Ok(()),
    }
}
