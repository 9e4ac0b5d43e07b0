use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use viewing_dispatch::config::SchedulingConfig;
use viewing_dispatch::error::AppError;
use viewing_dispatch::workflows::directory::{
    Area, AreaId, City, CityId, Property, PropertyId, User, UserId, UserRole,
};
use viewing_dispatch::workflows::memory::InMemoryStore;
use viewing_dispatch::workflows::notifications::NotificationGateway;
use viewing_dispatch::workflows::vetting::AgentApplication;
use viewing_dispatch::workflows::{Marketplace, Stores};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reference data loaded into the in-memory store at startup.
///
/// `agents` are registered as admin submissions, so they start out approved and their users
/// are promoted to the agent role.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SeedData {
    #[serde(default)]
    pub(crate) users: Vec<User>,
    #[serde(default)]
    pub(crate) cities: Vec<City>,
    #[serde(default)]
    pub(crate) areas: Vec<Area>,
    #[serde(default)]
    pub(crate) properties: Vec<Property>,
    #[serde(default)]
    pub(crate) agents: Vec<AgentApplication>,
}

pub(crate) fn load_seed(path: Option<&Path>) -> Result<SeedData, AppError> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let seed = serde_json::from_str(&raw)?;
            info!(path = %path.display(), "loaded seed data");
            Ok(seed)
        }
        None => Ok(default_seed()),
    }
}

pub(crate) fn build_marketplace(
    seed: &SeedData,
    gateway: Arc<dyn NotificationGateway>,
    config: SchedulingConfig,
) -> Result<(Arc<InMemoryStore>, Marketplace), AppError> {
    let store = Arc::new(InMemoryStore::new());
    for user in &seed.users {
        store.insert_user(user.clone())?;
    }
    for city in &seed.cities {
        store.insert_city(city.clone())?;
    }
    for area in &seed.areas {
        store.insert_area(area.clone())?;
    }
    for property in &seed.properties {
        store.insert_property(property.clone())?;
    }

    let marketplace = Marketplace::new(Stores::shared(store.clone()), gateway, config);
    for application in &seed.agents {
        let mut application = application.clone();
        application.submitted_by_admin = true;
        marketplace.vetting.submit_application(application)?;
    }

    info!(
        users = seed.users.len(),
        properties = seed.properties.len(),
        agents = seed.agents.len(),
        "marketplace seeded"
    );
    Ok((store, marketplace))
}

pub(crate) fn default_seed() -> SeedData {
    let user = |id: &str, name: &str, role: UserRole| User {
        id: UserId::from(id),
        full_name: name.to_string(),
        role,
    };
    let area = |id: &str, city: &str, name: &str| Area {
        id: AreaId::from(id),
        city_id: CityId::from(city),
        name: name.to_string(),
    };
    let property = |id: &str, title: &str, city: &str, area: &str| Property {
        id: PropertyId::from(id),
        title: title.to_string(),
        city_id: CityId::from(city),
        area_id: AreaId::from(area),
    };
    let agent = |user: &str, cities: &[&str], areas: &[&str]| AgentApplication {
        user_id: UserId::from(user),
        city_ids: cities.iter().copied().map(CityId::from).collect(),
        area_ids: if areas.is_empty() {
            None
        } else {
            Some(areas.iter().copied().map(AreaId::from).collect())
        },
        identity_proof: format!("seed://{user}/identity.pdf"),
        residency_proof: format!("seed://{user}/residency.pdf"),
        submitted_by_admin: true,
    };

    SeedData {
        users: vec![
            user("usr-admin", "Amal Hassan", UserRole::Admin),
            user("usr-quality", "Omar Fathy", UserRole::Quality),
            user("usr-customer", "Karim Nabil", UserRole::Customer),
            user("usr-agent-1", "Youssef Adel", UserRole::Customer),
            user("usr-agent-2", "Mona Samir", UserRole::Customer),
            user("usr-agent-3", "Tarek Ali", UserRole::Customer),
            user("usr-applicant", "Nour Ibrahim", UserRole::Customer),
        ],
        cities: vec![
            City {
                id: CityId::from("cairo"),
                name: "Cairo".to_string(),
            },
            City {
                id: CityId::from("giza"),
                name: "Giza".to_string(),
            },
        ],
        areas: vec![
            area("zamalek", "cairo", "Zamalek"),
            area("maadi", "cairo", "Maadi"),
            area("dokki", "giza", "Dokki"),
        ],
        properties: vec![
            property("prop-nile", "Nile view flat", "cairo", "zamalek"),
            property("prop-villa", "Maadi garden villa", "cairo", "maadi"),
            property("prop-dokki", "Dokki studio", "giza", "dokki"),
        ],
        agents: vec![
            agent("usr-agent-1", &["cairo"], &["zamalek"]),
            agent("usr-agent-2", &["cairo"], &[]),
            agent("usr-agent-3", &["giza"], &[]),
        ],
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewing_dispatch::workflows::directory::UserDirectory;
    use viewing_dispatch::workflows::memory::RecordingGateway;

    #[test]
    fn default_seed_registers_approved_agents() {
        let (store, marketplace) = build_marketplace(
            &default_seed(),
            Arc::new(RecordingGateway::new()),
            SchedulingConfig::default(),
        )
        .expect("seed loads");

        let eligible = marketplace
            .directory
            .find_eligible_agents(&AreaId::from("zamalek"))
            .expect("lookup succeeds");
        assert_eq!(eligible.len(), 2);
        let agents = store
            .users_with_role(UserRole::Agent)
            .expect("query succeeds");
        assert_eq!(agents.len(), 3);
    }

    #[test]
    fn seed_json_defaults_missing_sections() {
        let seed: SeedData = serde_json::from_str(
            r#"{
                "users": [{ "id": "usr-1", "full_name": "Lina", "role": "admin" }],
                "cities": [{ "id": "alex", "name": "Alexandria" }]
            }"#,
        )
        .expect("seed parses");

        assert_eq!(seed.users.len(), 1);
        assert!(seed.areas.is_empty());
        assert!(seed.agents.is_empty());
    }

    #[test]
    fn seed_with_orphan_area_is_rejected() {
        let mut seed = default_seed();
        seed.areas.push(Area {
            id: AreaId::from("smouha"),
            city_id: CityId::from("alex"),
            name: "Smouha".to_string(),
        });

        let result = build_marketplace(
            &seed,
            Arc::new(RecordingGateway::new()),
            SchedulingConfig::default(),
        );
        assert!(matches!(result, Err(AppError::Workflow(_))));
    }

    #[test]
    fn parse_date_reports_format() {
        assert!(parse_date("2030-05-01").is_ok());
        let err = parse_date("05/01/2030").expect_err("rejects other formats");
        assert!(err.contains("YYYY-MM-DD"));
    }
}
