use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::config::SchedulingConfig;
use crate::workflows::directory::{
    Agent, AgentId, AgentRepository, AreaId, Area, City, CityId, Property, PropertyId,
    RepositoryError, User, UserDirectory, UserId, UserRole,
};
use crate::workflows::memory::{InMemoryStore, RecordingGateway};
use crate::workflows::notifications::{Notification, NotificationError, NotificationGateway};
use crate::workflows::scheduling::{
    AppointmentId, AppointmentRecord, AppointmentRepository, RequestId, ViewingRequest,
};
use crate::workflows::vetting::AgentApplication;
use crate::workflows::{Marketplace, Stores};

pub(crate) const ADMIN: &str = "usr-admin";
pub(crate) const QUALITY: &str = "usr-quality";
pub(crate) const CUSTOMER: &str = "usr-customer";
pub(crate) const OTHER_CUSTOMER: &str = "usr-customer-2";

/// Cairo (zamalek, maadi) and Giza (dokki), one property in zamalek and one in dokki, an admin,
/// a quality reviewer, two customers, and four users that can become agents.
pub(crate) struct Fixture {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) gateway: Arc<RecordingGateway>,
    pub(crate) marketplace: Marketplace,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_stores(|_, stores| stores)
    }

    /// Seeded fixture whose services run against `wrap`'s view of the store.
    pub(crate) fn with_stores<W>(wrap: W) -> Self
    where
        W: FnOnce(Arc<InMemoryStore>, Stores) -> Stores,
    {
        let store = Arc::new(InMemoryStore::new());
        seed(&store);
        let gateway = Arc::new(RecordingGateway::new());
        let stores = wrap(store.clone(), Stores::shared(store.clone()));
        let marketplace = Marketplace::new(stores, gateway.clone(), SchedulingConfig::default());
        Self {
            store,
            gateway,
            marketplace,
        }
    }

    pub(crate) fn with_flaky_agents() -> (Self, Arc<FlakyAgents>) {
        let mut wrapped = None;
        let fixture = Self::with_stores(|store, mut stores| {
            let agents = Arc::new(FlakyAgents::new(store));
            stores.agents = agents.clone();
            wrapped = Some(agents);
            stores
        });
        let agents = wrapped.expect("agent store wrapped");
        (fixture, agents)
    }

    /// Register an admin-approved agent for one of the seeded `usr-agent-*` users.
    pub(crate) fn approved_agent(&self, user: &str, cities: &[&str], areas: &[&str]) -> Agent {
        self.marketplace
            .vetting
            .submit_application(application(user, cities, areas, true))
            .expect("admin-submitted agent registers")
    }

    pub(crate) fn router(&self) -> axum::Router {
        self.marketplace.router()
    }
}

pub(crate) fn seed(store: &InMemoryStore) {
    for (id, name) in [("cairo", "Cairo"), ("giza", "Giza")] {
        store
            .insert_city(City {
                id: CityId::from(id),
                name: name.to_string(),
            })
            .expect("city seeded");
    }
    for (id, city) in [("zamalek", "cairo"), ("maadi", "cairo"), ("dokki", "giza")] {
        store
            .insert_area(Area {
                id: AreaId::from(id),
                city_id: CityId::from(city),
                name: id.to_string(),
            })
            .expect("area seeded");
    }
    for (id, title, city, area) in [
        ("prop-nile", "Nile view flat", "cairo", "zamalek"),
        ("prop-garden", "Garden duplex", "giza", "dokki"),
    ] {
        store
            .insert_property(Property {
                id: PropertyId::from(id),
                title: title.to_string(),
                city_id: CityId::from(city),
                area_id: AreaId::from(area),
            })
            .expect("property seeded");
    }

    let users = [
        (ADMIN, "Amal Admin", UserRole::Admin),
        (QUALITY, "Qadri Quality", UserRole::Quality),
        (CUSTOMER, "Karim Customer", UserRole::Customer),
        (OTHER_CUSTOMER, "Salma Customer", UserRole::Customer),
        ("usr-agent-1", "Youssef Agent", UserRole::Customer),
        ("usr-agent-2", "Mona Agent", UserRole::Customer),
        ("usr-agent-3", "Tarek Agent", UserRole::Customer),
        ("usr-agent-4", "Nour Agent", UserRole::Customer),
    ];
    for (id, name, role) in users {
        store
            .insert_user(User {
                id: UserId::from(id),
                full_name: name.to_string(),
                role,
            })
            .expect("user seeded");
    }
}

pub(crate) fn application(
    user: &str,
    cities: &[&str],
    areas: &[&str],
    submitted_by_admin: bool,
) -> AgentApplication {
    AgentApplication {
        user_id: UserId::from(user),
        city_ids: cities.iter().copied().map(CityId::from).collect(),
        area_ids: if areas.is_empty() {
            None
        } else {
            Some(areas.iter().copied().map(AreaId::from).collect())
        },
        identity_proof: format!("s3://agents/{user}/id.pdf"),
        residency_proof: format!("s3://agents/{user}/residency.pdf"),
        submitted_by_admin,
    }
}

pub(crate) fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

pub(crate) fn time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").expect("valid time")
}

pub(crate) fn viewing(
    customer: &str,
    property: &str,
    day: &str,
    start: &str,
    end: &str,
) -> ViewingRequest {
    ViewingRequest {
        property_id: PropertyId::from(property),
        customer_id: UserId::from(customer),
        appointment_date: date(day),
        start_time: time(start),
        end_time: time(end),
    }
}

pub(crate) fn titles(notifications: &[Notification]) -> Vec<String> {
    notifications
        .iter()
        .map(|notification| notification.title.clone())
        .collect()
}

/// Gateway whose transport is always down.
pub(crate) struct FailingGateway;

impl NotificationGateway for FailingGateway {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// Appointment store whose writes stall before the compare-and-swap, widening every race window.
pub(crate) struct SlowSaves {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

impl SlowSaves {
    pub(crate) fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl AppointmentRepository for SlowSaves {
    fn insert_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        self.inner.insert_appointment(record)
    }

    fn save_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        thread::sleep(self.delay);
        self.inner.save_appointment(record)
    }

    fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        self.inner.fetch_appointment(id)
    }

    fn fetch_by_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        self.inner.fetch_by_request(id)
    }

    fn customer_appointments(
        &self,
        customer_id: &UserId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        self.inner.customer_appointments(customer_id)
    }

    fn agent_appointments(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        self.inner.agent_appointments(agent_id)
    }

    fn requested_from(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        self.inner.requested_from(agent_id)
    }
}

/// User directory that refuses to promote anyone to the agent role.
pub(crate) struct PromotionOutage {
    inner: Arc<InMemoryStore>,
}

impl PromotionOutage {
    pub(crate) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self { inner }
    }
}

impl UserDirectory for PromotionOutage {
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), RepositoryError> {
        if role == UserRole::Agent {
            return Err(RepositoryError::Unavailable("role service offline".to_string()));
        }
        self.inner.set_role(id, role)
    }

    fn users_with_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        self.inner.users_with_role(role)
    }
}

/// Agent store with switchable outages for lookups by id and for profile updates.
pub(crate) struct FlakyAgents {
    inner: Arc<InMemoryStore>,
    lookups_down: AtomicBool,
    updates_down: AtomicBool,
}

impl FlakyAgents {
    pub(crate) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            lookups_down: AtomicBool::new(false),
            updates_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_lookups(&self) {
        self.lookups_down.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_updates(&self) {
        self.updates_down.store(true, Ordering::SeqCst);
    }

    fn outage() -> RepositoryError {
        RepositoryError::Unavailable("agent store offline".to_string())
    }
}

impl AgentRepository for FlakyAgents {
    fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        self.inner.insert_agent(agent)
    }

    fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError> {
        if self.updates_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.update_agent(agent)
    }

    fn remove_agent(&self, id: &AgentId) -> Result<(), RepositoryError> {
        self.inner.remove_agent(id)
    }

    fn fetch_agent(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        if self.lookups_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.fetch_agent(id)
    }

    fn fetch_agent_by_user(&self, user_id: &UserId) -> Result<Option<Agent>, RepositoryError> {
        self.inner.fetch_agent_by_user(user_id)
    }

    fn approved_agents(&self) -> Result<Vec<Agent>, RepositoryError> {
        self.inner.approved_agents()
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
