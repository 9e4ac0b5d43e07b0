//! Integration scenarios for agent intake, vetting decisions, and service-scope changes.

use std::sync::Arc;

use viewing_dispatch::config::SchedulingConfig;
use viewing_dispatch::workflows::directory::{
    AgentStatus, Area, AreaId, City, CityId, User, UserDirectory, UserId, UserRole,
};
use viewing_dispatch::workflows::memory::{InMemoryStore, RecordingGateway};
use viewing_dispatch::workflows::vetting::{AgentApplication, ScopeChange, VettingDecision};
use viewing_dispatch::workflows::{Marketplace, Stores, WorkflowError};

fn marketplace() -> (Arc<InMemoryStore>, Arc<RecordingGateway>, Marketplace) {
    let store = Arc::new(InMemoryStore::new());
    for city in ["dubai", "sharjah"] {
        store
            .insert_city(City {
                id: CityId::from(city),
                name: city.to_string(),
            })
            .expect("city");
    }
    for (area, city) in [("marina", "dubai"), ("jlt", "dubai"), ("khan", "sharjah")] {
        store
            .insert_area(Area {
                id: AreaId::from(area),
                city_id: CityId::from(city),
                name: area.to_string(),
            })
            .expect("area");
    }
    for (id, role) in [
        ("usr-admin-1", UserRole::Admin),
        ("usr-admin-2", UserRole::Admin),
        ("usr-candidate", UserRole::Customer),
    ] {
        store
            .insert_user(User {
                id: UserId::from(id),
                full_name: id.to_string(),
                role,
            })
            .expect("user");
    }

    let gateway = Arc::new(RecordingGateway::new());
    let marketplace = Marketplace::new(
        Stores::shared(store.clone()),
        gateway.clone(),
        SchedulingConfig::default(),
    );
    (store, gateway, marketplace)
}

fn application(cities: &[&str], areas: Option<&[&str]>) -> AgentApplication {
    AgentApplication {
        user_id: UserId::from("usr-candidate"),
        city_ids: cities.iter().copied().map(CityId::from).collect(),
        area_ids: areas.map(|areas| areas.iter().copied().map(AreaId::from).collect()),
        identity_proof: "uploads/identity.jpg".to_string(),
        residency_proof: "uploads/residency.jpg".to_string(),
        submitted_by_admin: false,
    }
}

#[test]
fn application_is_vetted_and_becomes_eligible() {
    let (store, gateway, marketplace) = marketplace();

    let agent = marketplace
        .vetting
        .submit_application(application(&["dubai"], Some(&["marina"])))
        .expect("application accepted");
    assert_eq!(agent.status, AgentStatus::Pending);
    for admin in ["usr-admin-1", "usr-admin-2"] {
        assert_eq!(gateway.for_user(&UserId::from(admin)).len(), 1);
    }
    assert!(marketplace
        .directory
        .find_eligible_agents(&AreaId::from("marina"))
        .expect("lookup")
        .is_empty());

    marketplace
        .vetting
        .decide(&agent.id, VettingDecision::Approved, None)
        .expect("approved");

    let user = store
        .fetch_user(&UserId::from("usr-candidate"))
        .expect("fetch")
        .expect("user");
    assert_eq!(user.role, UserRole::Agent);
    let eligible = marketplace
        .directory
        .find_eligible_agents(&AreaId::from("marina"))
        .expect("lookup");
    assert_eq!(eligible.len(), 1);
    assert!(marketplace
        .directory
        .find_eligible_agents(&AreaId::from("jlt"))
        .expect("lookup")
        .is_empty());
    assert_eq!(
        marketplace
            .directory
            .resolve_agent_for_user(&UserId::from("usr-candidate"))
            .expect("resolves")
            .id,
        agent.id
    );
}

#[test]
fn widening_to_several_cities_makes_the_agent_city_scoped() {
    let (_, _, marketplace) = marketplace();
    let agent = marketplace
        .vetting
        .submit_application(application(&["dubai"], Some(&["marina"])))
        .expect("application accepted");
    marketplace
        .vetting
        .decide(&agent.id, VettingDecision::Approved, None)
        .expect("approved");

    let widened = marketplace
        .vetting
        .reassign_scope(
            &agent.id,
            ScopeChange {
                city_ids: Some(vec![CityId::from("dubai"), CityId::from("sharjah")]),
                area_ids: None,
            },
        )
        .expect("scope updated");

    assert!(widened.areas().is_empty());
    for area in ["marina", "jlt", "khan"] {
        assert_eq!(
            marketplace
                .directory
                .find_eligible_agents(&AreaId::from(area))
                .expect("lookup")
                .len(),
            1,
            "area {area}"
        );
    }
}

#[test]
fn unknown_area_lookup_is_not_found() {
    let (_, _, marketplace) = marketplace();

    let result = marketplace
        .directory
        .find_eligible_agents(&AreaId::from("deira"));

    assert!(matches!(result, Err(WorkflowError::NotFound(_))));
}
