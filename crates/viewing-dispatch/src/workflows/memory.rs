//! Process-local stores used by the API binary, the demo walkthrough, and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::directory::{
    Agent, AgentId, AgentRepository, Area, AreaId, City, CityId, GeographyRepository, Property,
    PropertyId, PropertyRepository, RepositoryError, User, UserDirectory, UserId, UserRole,
};
use super::notifications::{Notification, NotificationError, NotificationGateway};
use super::scheduling::{AppointmentId, AppointmentRecord, AppointmentRepository, RequestId};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    cities: HashMap<CityId, City>,
    areas: HashMap<AreaId, Area>,
    properties: HashMap<PropertyId, Property>,
    agents: HashMap<AgentId, Agent>,
    agents_by_user: HashMap<UserId, AgentId>,
    appointments: HashMap<AppointmentId, AppointmentRecord>,
    request_index: HashMap<RequestId, AppointmentId>,
}

/// Every repository trait behind a single mutex, so each call observes and writes one
/// consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
    }

    pub fn insert_user(&self, user: User) -> Result<(), RepositoryError> {
        self.state()?.users.insert(user.id.clone(), user);
        Ok(())
    }

    pub fn insert_city(&self, city: City) -> Result<(), RepositoryError> {
        self.state()?.cities.insert(city.id.clone(), city);
        Ok(())
    }

    /// Areas must reference a known city.
    pub fn insert_area(&self, area: Area) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.cities.contains_key(&area.city_id) {
            return Err(RepositoryError::NotFound);
        }
        state.areas.insert(area.id.clone(), area);
        Ok(())
    }

    /// Properties must reference a known area inside the stated city.
    pub fn insert_property(&self, property: Property) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.areas.get(&property.area_id) {
            Some(area) if area.city_id == property.city_id => {}
            _ => return Err(RepositoryError::NotFound),
        }
        state.properties.insert(property.id.clone(), property);
        Ok(())
    }
}

impl UserDirectory for InMemoryStore {
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let user = state.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        Ok(())
    }

    fn users_with_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let state = self.state()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect();
        users.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(users)
    }
}

impl GeographyRepository for InMemoryStore {
    fn fetch_city(&self, id: &CityId) -> Result<Option<City>, RepositoryError> {
        Ok(self.state()?.cities.get(id).cloned())
    }

    fn fetch_area(&self, id: &AreaId) -> Result<Option<Area>, RepositoryError> {
        Ok(self.state()?.areas.get(id).cloned())
    }
}

impl PropertyRepository for InMemoryStore {
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.state()?.properties.get(id).cloned())
    }
}

impl AgentRepository for InMemoryStore {
    fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut state = self.state()?;
        if state.agents.contains_key(&agent.id) || state.agents_by_user.contains_key(&agent.user_id)
        {
            return Err(RepositoryError::Conflict);
        }
        state
            .agents_by_user
            .insert(agent.user_id.clone(), agent.id.clone());
        state.agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.agents.get(&agent.id) {
            Some(existing) if existing.user_id == agent.user_id => {}
            Some(_) => return Err(RepositoryError::Conflict),
            None => return Err(RepositoryError::NotFound),
        }
        state.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    fn remove_agent(&self, id: &AgentId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let agent = state.agents.remove(id).ok_or(RepositoryError::NotFound)?;
        state.agents_by_user.remove(&agent.user_id);
        Ok(())
    }

    fn fetch_agent(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.state()?.agents.get(id).cloned())
    }

    fn fetch_agent_by_user(&self, user_id: &UserId) -> Result<Option<Agent>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .agents_by_user
            .get(user_id)
            .and_then(|agent_id| state.agents.get(agent_id))
            .cloned())
    }

    fn approved_agents(&self) -> Result<Vec<Agent>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .agents
            .values()
            .filter(|agent| agent.is_approved())
            .cloned()
            .collect())
    }
}

impl AppointmentRepository for InMemoryStore {
    fn insert_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let mut state = self.state()?;
        if state.appointments.contains_key(record.id())
            || record
                .requests
                .iter()
                .any(|request| state.request_index.contains_key(&request.id))
        {
            return Err(RepositoryError::Conflict);
        }

        for request in &record.requests {
            state
                .request_index
                .insert(request.id.clone(), record.id().clone());
        }
        state
            .appointments
            .insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn save_appointment(
        &self,
        mut record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let mut state = self.state()?;
        let stored_version = state
            .appointments
            .get(record.id())
            .map(|stored| stored.version)
            .ok_or(RepositoryError::NotFound)?;
        if stored_version != record.version {
            return Err(RepositoryError::VersionConflict);
        }

        record.version += 1;
        for request in &record.requests {
            state
                .request_index
                .insert(request.id.clone(), record.id().clone());
        }
        state
            .appointments
            .insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        Ok(self.state()?.appointments.get(id).cloned())
    }

    fn fetch_by_request(
        &self,
        id: &RequestId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .request_index
            .get(id)
            .and_then(|appointment_id| state.appointments.get(appointment_id))
            .cloned())
    }

    fn customer_appointments(
        &self,
        customer_id: &UserId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .appointments
            .values()
            .filter(|record| &record.appointment.customer_id == customer_id)
            .cloned()
            .collect())
    }

    fn agent_appointments(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .appointments
            .values()
            .filter(|record| record.appointment.agent_id.as_ref() == Some(agent_id))
            .cloned()
            .collect())
    }

    fn requested_from(
        &self,
        agent_id: &AgentId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .appointments
            .values()
            .filter(|record| {
                record
                    .requests
                    .iter()
                    .any(|request| &request.agent_id == agent_id)
            })
            .cloned()
            .collect())
    }
}

/// Gateway that keeps every published notification, in order.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    events: Mutex<Vec<Notification>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn for_user(&self, user_id: &UserId) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(|notification| &notification.recipient == user_id)
            .collect()
    }

    /// Drain everything published so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NotificationGateway for RecordingGateway {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("recording gateway poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}
