use std::sync::Arc;

use crate::workflows::directory::{
    AgentId, AgentRepository, AgentStatus, AreaId, CityId, RepositoryError, UserDirectory, UserId,
    UserRole,
};
use crate::workflows::test_support::*;
use crate::workflows::vetting::{ScopeChange, VettingDecision};
use crate::workflows::WorkflowError;

fn role_of(fixture: &Fixture, user: &str) -> UserRole {
    fixture
        .store
        .fetch_user(&UserId::from(user))
        .expect("fetch succeeds")
        .expect("user present")
        .role
}

fn cities(values: &[&str]) -> Option<Vec<CityId>> {
    Some(values.iter().copied().map(CityId::from).collect())
}

fn areas(values: &[&str]) -> Option<Vec<AreaId>> {
    Some(values.iter().copied().map(AreaId::from).collect())
}

#[test]
fn customer_application_waits_for_vetting_and_alerts_admins() {
    let fixture = Fixture::new();

    let agent = fixture
        .marketplace
        .vetting
        .submit_application(application("usr-agent-1", &["cairo"], &["zamalek"], false))
        .expect("application accepted");

    assert_eq!(agent.status, AgentStatus::Pending);
    assert!(agent.id.as_str().starts_with("agt-"));
    assert!(agent.areas().contains(&AreaId::from("zamalek")));
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);

    let admin = fixture.gateway.for_user(&UserId::from(ADMIN));
    assert_eq!(titles(&admin), vec!["New Agent Application"]);
    assert!(admin[0].message.contains("Youssef Agent"));
    assert_eq!(admin[0].related_id.as_deref(), Some(agent.id.as_str()));
    assert!(fixture
        .gateway
        .for_user(&UserId::from(QUALITY))
        .is_empty());
}

#[test]
fn admin_submission_is_approved_immediately_and_silent() {
    let fixture = Fixture::new();

    let agent = fixture.approved_agent("usr-agent-1", &["cairo"], &[]);

    assert_eq!(agent.status, AgentStatus::Approved);
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Agent);
    assert!(fixture.gateway.events().is_empty());
}

#[test]
fn multi_city_application_discards_areas() {
    let fixture = Fixture::new();

    let agent = fixture
        .marketplace
        .vetting
        .submit_application(application(
            "usr-agent-1",
            &["cairo", "giza"],
            &["zamalek"],
            false,
        ))
        .expect("application accepted");

    assert_eq!(agent.cities().len(), 2);
    assert!(agent.areas().is_empty());
}

#[test]
fn application_validation_failures() {
    let fixture = Fixture::new();
    let vetting = &fixture.marketplace.vetting;

    let no_cities = vetting.submit_application(application("usr-agent-1", &[], &[], false));
    assert!(matches!(no_cities, Err(WorkflowError::BadRequest(_))));

    let mut missing_docs = application("usr-agent-1", &["cairo"], &[], false);
    missing_docs.residency_proof = "  ".to_string();
    assert!(matches!(
        vetting.submit_application(missing_docs),
        Err(WorkflowError::BadRequest(_))
    ));

    let unknown_user = vetting.submit_application(application("usr-ghost", &["cairo"], &[], false));
    assert!(matches!(unknown_user, Err(WorkflowError::NotFound(_))));

    let unknown_city =
        vetting.submit_application(application("usr-agent-1", &["alexandria"], &[], false));
    assert!(matches!(unknown_city, Err(WorkflowError::NotFound(_))));

    let unknown_area =
        vetting.submit_application(application("usr-agent-1", &["cairo"], &["heliopolis"], false));
    assert!(matches!(unknown_area, Err(WorkflowError::NotFound(_))));

    let foreign_area =
        vetting.submit_application(application("usr-agent-1", &["cairo"], &["dokki"], false));
    assert!(matches!(foreign_area, Err(WorkflowError::BadRequest(_))));

    assert!(fixture.gateway.events().is_empty());
}

#[test]
fn second_application_for_the_same_user_conflicts() {
    let fixture = Fixture::new();
    let vetting = &fixture.marketplace.vetting;
    vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("first application");

    let duplicate = vetting.submit_application(application("usr-agent-1", &["giza"], &[], true));

    assert!(matches!(duplicate, Err(WorkflowError::Conflict(_))));
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);
}

#[test]
fn approval_promotes_the_user_and_notifies_them() {
    let fixture = Fixture::new();
    let vetting = &fixture.marketplace.vetting;
    let agent = vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("application accepted");
    fixture.gateway.take();

    let decided = vetting
        .decide(
            &agent.id,
            VettingDecision::Approved,
            Some("documents verified".to_string()),
        )
        .expect("decision recorded");

    assert_eq!(decided.status, AgentStatus::Approved);
    assert_eq!(decided.vetting_notes.as_deref(), Some("documents verified"));
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Agent);
    let inbox = fixture.gateway.for_user(&agent.user_id);
    assert_eq!(titles(&inbox), vec!["Agent Registration Decision"]);
    assert!(inbox[0].message.contains("approved"));
}

#[test]
fn rejection_keeps_the_customer_role_and_still_notifies() {
    let fixture = Fixture::new();
    let vetting = &fixture.marketplace.vetting;
    let agent = vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("application accepted");
    fixture.gateway.take();

    let decided = vetting
        .decide(&agent.id, VettingDecision::Rejected, None)
        .expect("decision recorded");

    assert_eq!(decided.status, AgentStatus::Rejected);
    assert!(decided.vetting_notes.is_none());
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);
    let inbox = fixture.gateway.for_user(&agent.user_id);
    assert!(inbox[0].message.contains("rejected"));

    let missing = vetting.decide(&AgentId::from("agt-ghost"), VettingDecision::Approved, None);
    assert!(matches!(missing, Err(WorkflowError::NotFound(_))));
}

#[test]
fn rejected_agents_are_not_eligible_for_new_appointments() {
    let fixture = Fixture::new();
    let agent = fixture.approved_agent("usr-agent-1", &["cairo"], &[]);
    fixture
        .marketplace
        .vetting
        .decide(&agent.id, VettingDecision::Rejected, None)
        .expect("decision recorded");

    let result = fixture
        .marketplace
        .scheduler
        .create_appointment(viewing(CUSTOMER, "prop-nile", "2030-05-01", "10:00", "11:00"));

    assert!(matches!(result, Err(WorkflowError::NotFound(_))));
}

#[test]
fn scope_changes_follow_the_single_city_rule() {
    let fixture = Fixture::new();
    let vetting = &fixture.marketplace.vetting;
    let agent = fixture.approved_agent("usr-agent-1", &["cairo"], &["zamalek", "maadi"]);

    let narrowed = vetting
        .reassign_scope(
            &agent.id,
            ScopeChange {
                city_ids: None,
                area_ids: areas(&["maadi"]),
            },
        )
        .expect("areas replaced");
    assert_eq!(narrowed.areas().len(), 1);
    assert!(narrowed.areas().contains(&AreaId::from("maadi")));

    let widened = vetting
        .reassign_scope(
            &agent.id,
            ScopeChange {
                city_ids: cities(&["cairo", "giza"]),
                area_ids: None,
            },
        )
        .expect("cities replaced");
    assert_eq!(widened.cities().len(), 2);
    assert!(widened.areas().is_empty());

    let areas_with_many_cities = vetting.reassign_scope(
        &agent.id,
        ScopeChange {
            city_ids: None,
            area_ids: areas(&["zamalek"]),
        },
    );
    assert!(matches!(
        areas_with_many_cities,
        Err(WorkflowError::BadRequest(_))
    ));

    let moved = vetting
        .reassign_scope(
            &agent.id,
            ScopeChange {
                city_ids: cities(&["giza"]),
                area_ids: areas(&["dokki"]),
            },
        )
        .expect("moved to giza");
    assert_eq!(
        moved.cities().iter().collect::<Vec<_>>(),
        vec![&CityId::from("giza")]
    );
    assert!(moved.areas().contains(&AreaId::from("dokki")));

    let empty = vetting.reassign_scope(
        &agent.id,
        ScopeChange {
            city_ids: Some(Vec::new()),
            area_ids: None,
        },
    );
    assert!(matches!(empty, Err(WorkflowError::BadRequest(_))));
}

#[test]
fn switching_single_city_drops_areas_outside_it() {
    let fixture = Fixture::new();
    let agent = fixture.approved_agent("usr-agent-1", &["cairo"], &["zamalek"]);

    let moved = fixture
        .marketplace
        .vetting
        .reassign_scope(
            &agent.id,
            ScopeChange {
                city_ids: cities(&["giza"]),
                area_ids: None,
            },
        )
        .expect("moved");

    assert_eq!(
        moved.cities().iter().collect::<Vec<_>>(),
        vec![&CityId::from("giza")]
    );
    assert!(moved.areas().is_empty());
    let stored = fixture
        .marketplace
        .vetting
        .get_agent(&agent.id)
        .expect("agent stored");
    assert_eq!(stored, moved);
}

#[test]
fn failed_promotion_discards_the_new_agent() {
    let fixture = Fixture::with_stores(|store, mut stores| {
        stores.users = Arc::new(PromotionOutage::new(store));
        stores
    });
    let vetting = &fixture.marketplace.vetting;

    let result = vetting.submit_application(application("usr-agent-1", &["cairo"], &[], true));

    assert!(matches!(
        result,
        Err(WorkflowError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(fixture
        .store
        .fetch_agent_by_user(&UserId::from("usr-agent-1"))
        .expect("fetch succeeds")
        .is_none());
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);

    let resubmitted = vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("resubmission is not a duplicate");
    assert_eq!(resubmitted.status, AgentStatus::Pending);
}

#[test]
fn failed_promotion_restores_the_pending_profile() {
    let fixture = Fixture::with_stores(|store, mut stores| {
        stores.users = Arc::new(PromotionOutage::new(store));
        stores
    });
    let vetting = &fixture.marketplace.vetting;
    let agent = vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("application accepted");
    fixture.gateway.take();

    let result = vetting.decide(
        &agent.id,
        VettingDecision::Approved,
        Some("documents verified".to_string()),
    );

    assert!(matches!(result, Err(WorkflowError::Repository(_))));
    let stored = vetting.get_agent(&agent.id).expect("agent stored");
    assert_eq!(stored.status, AgentStatus::Pending);
    assert!(stored.vetting_notes.is_none());
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);
    assert!(fixture.gateway.events().is_empty());
}

#[test]
fn failed_profile_update_leaves_the_role_untouched() {
    let (fixture, agents) = Fixture::with_flaky_agents();
    let vetting = &fixture.marketplace.vetting;
    let agent = vetting
        .submit_application(application("usr-agent-1", &["cairo"], &[], false))
        .expect("application accepted");

    agents.fail_updates();
    let result = vetting.decide(&agent.id, VettingDecision::Approved, None);

    assert!(matches!(result, Err(WorkflowError::Repository(_))));
    assert_eq!(role_of(&fixture, "usr-agent-1"), UserRole::Customer);
    assert_eq!(
        fixture
            .store
            .fetch_agent(&agent.id)
            .expect("fetch succeeds")
            .expect("agent present")
            .status,
        AgentStatus::Pending
    );
}
