use crate::infra::{build_marketplace, default_seed};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;
use viewing_dispatch::config::SchedulingConfig;
use viewing_dispatch::error::AppError;
use viewing_dispatch::workflows::directory::{AreaId, CityId, PropertyId, UserId};
use viewing_dispatch::workflows::memory::RecordingGateway;
use viewing_dispatch::workflows::pagination::PageRequest;
use viewing_dispatch::workflows::scheduling::{
    AppointmentStatus, RequestDecision, StatusUpdate, ViewingRequest,
};
use viewing_dispatch::workflows::vetting::{AgentApplication, VettingDecision};
use viewing_dispatch::workflows::WorkflowError;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Viewing date (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Print every notification produced during the walkthrough.
    #[arg(long)]
    pub(crate) show_notifications: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        date,
        show_notifications,
    } = args;
    let viewing_date = date.unwrap_or_else(|| Local::now().date_naive() + Duration::days(1));

    let gateway = Arc::new(RecordingGateway::new());
    let (_, marketplace) = build_marketplace(
        &default_seed(),
        gateway.clone(),
        SchedulingConfig::default(),
    )?;

    println!("Viewing dispatch demo");

    println!("\nAgent vetting");
    let applicant = marketplace.vetting.submit_application(AgentApplication {
        user_id: UserId::from("usr-applicant"),
        city_ids: vec![CityId::from("cairo")],
        area_ids: Some(vec![AreaId::from("maadi")]),
        identity_proof: "demo://usr-applicant/identity.pdf".to_string(),
        residency_proof: "demo://usr-applicant/residency.pdf".to_string(),
        submitted_by_admin: false,
    })?;
    println!(
        "- Application {} received -> status {}",
        applicant.id,
        applicant.status.label()
    );
    let applicant = marketplace.vetting.decide(
        &applicant.id,
        VettingDecision::Approved,
        Some("documents verified".to_string()),
    )?;
    println!(
        "- Application {} decided -> status {}",
        applicant.id,
        applicant.status.label()
    );

    println!("\nBooking");
    let record = marketplace.scheduler.create_appointment(ViewingRequest {
        property_id: PropertyId::from("prop-villa"),
        customer_id: UserId::from("usr-customer"),
        appointment_date: viewing_date,
        start_time: hour(10)?,
        end_time: hour(11)?,
    })?;
    println!(
        "- Appointment {} on {} {}-{} -> status {}",
        record.id(),
        record.appointment.appointment_date,
        record.appointment.start_time,
        record.appointment.end_time,
        record.appointment.status.label()
    );
    for request in &record.requests {
        println!("  Invited {} via request {}", request.agent_id, request.id);
    }

    println!("\nArbitration");
    let mut requests = record.requests.iter();
    if let Some(request) = requests.next() {
        let answered = marketplace.arbitrator.respond(
            &request.id,
            &request.agent_id,
            RequestDecision::Accepted,
        )?;
        println!(
            "- {} answered {} -> {}",
            request.agent_id,
            request.id,
            answered.status.label()
        );
    }
    for request in requests {
        match marketplace.arbitrator.respond(
            &request.id,
            &request.agent_id,
            RequestDecision::Accepted,
        ) {
            Ok(answered) => println!(
                "- {} answered {} -> {}",
                request.agent_id,
                request.id,
                answered.status.label()
            ),
            Err(err) => println!(
                "- {} late answer on {} refused: {}",
                request.agent_id, request.id, err
            ),
        }
    }

    let confirmed = marketplace.scheduler.get_appointment(record.id())?;
    let Some(assigned) = confirmed.appointment.agent_id.clone() else {
        println!("  No agent claimed the appointment");
        return Ok(());
    };
    println!(
        "  Appointment {} -> status {} with {}",
        confirmed.id(),
        confirmed.appointment.status.label(),
        assigned
    );

    println!("\nLifecycle");
    let assigned_agent = marketplace.directory.get_agent(&assigned)?;
    for (status, actor) in [
        (AppointmentStatus::InProgress, assigned_agent.user_id.clone()),
        (AppointmentStatus::Completed, UserId::from("usr-admin")),
    ] {
        let updated = marketplace.scheduler.update_status(
            record.id(),
            StatusUpdate {
                status,
                actor_id: actor.clone(),
                notes: None,
            },
        )?;
        println!(
            "- {} moved {} -> {}",
            actor,
            updated.id(),
            updated.appointment.status.label()
        );
    }

    let workload = marketplace.arbitrator.agent_appointments(
        &assigned,
        PageRequest::default(),
        PageRequest::default(),
    )?;
    println!(
        "  {} workload: {} assigned | {} pending requests",
        assigned, workload.confirmed.total, workload.pending.total
    );

    let events = gateway.take();
    println!("\nNotifications ({} dispatched)", events.len());
    if show_notifications {
        for notification in &events {
            println!(
                "  - {} <- {}: {}",
                notification.recipient, notification.title, notification.message
            );
        }
    } else {
        let mut per_recipient: BTreeMap<String, usize> = BTreeMap::new();
        for notification in &events {
            *per_recipient
                .entry(notification.recipient.to_string())
                .or_default() += 1;
        }
        for (recipient, count) in per_recipient {
            println!("  - {}: {}", recipient, count);
        }
    }

    Ok(())
}

fn hour(value: u32) -> Result<NaiveTime, AppError> {
    NaiveTime::from_hms_opt(value, 0, 0).ok_or_else(|| {
        AppError::Workflow(WorkflowError::BadRequest(format!(
            "{value} is not a valid hour"
        )))
    })
}
