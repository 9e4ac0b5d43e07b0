use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{AgentApplication, ScopeChange, VettingDecision};
use crate::workflows::directory::{
    Agent, AgentId, AgentRepository, AgentStatus, AreaId, CityId, GeographyRepository,
    RepositoryError, UserDirectory, UserRole,
};
use crate::workflows::notifications::{NotificationKind, Notifier};
use crate::workflows::{Stores, WorkflowError};

/// Service composing the agent store, user directory, and geography for the vetting workflow.
pub struct VettingService {
    agents: Arc<dyn AgentRepository>,
    users: Arc<dyn UserDirectory>,
    geography: Arc<dyn GeographyRepository>,
    notifier: Notifier,
}

static AGENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_agent_id() -> AgentId {
    let id = AGENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AgentId(format!("agt-{id:06}"))
}

impl VettingService {
    pub fn new(stores: &Stores, notifier: Notifier) -> Self {
        Self {
            agents: stores.agents.clone(),
            users: stores.users.clone(),
            geography: stores.geography.clone(),
            notifier,
        }
    }

    /// Register an agent profile for a user.
    ///
    /// Customer-submitted applications start `pending` and are announced to every admin;
    /// admin-submitted ones start `approved` and promote the user straight away.
    pub fn submit_application(
        &self,
        application: AgentApplication,
    ) -> Result<Agent, WorkflowError> {
        if application.city_ids.is_empty() {
            return Err(WorkflowError::bad_request(
                "at least one city must be provided",
            ));
        }
        if application.identity_proof.trim().is_empty()
            || application.residency_proof.trim().is_empty()
        {
            return Err(WorkflowError::bad_request(
                "identity proof and residency document are both required",
            ));
        }

        if self
            .agents
            .fetch_agent_by_user(&application.user_id)?
            .is_some()
        {
            return Err(WorkflowError::conflict(
                "agent application already exists for this user",
            ));
        }
        let user = self
            .users
            .fetch_user(&application.user_id)?
            .ok_or_else(|| WorkflowError::not_found("user"))?;

        let cities = self.resolve_cities(&application.city_ids)?;
        let areas = match (cities.len(), application.area_ids) {
            (1, Some(area_ids)) => self.resolve_areas(&cities, &area_ids)?,
            _ => BTreeSet::new(),
        };

        let status = if application.submitted_by_admin {
            AgentStatus::Approved
        } else {
            AgentStatus::Pending
        };
        let mut agent = Agent::new(
            next_agent_id(),
            user.id.clone(),
            status,
            application.identity_proof,
            application.residency_proof,
            Utc::now(),
        );
        agent.set_scope(cities, areas);

        let stored = self.agents.insert_agent(agent).map_err(|err| match err {
            RepositoryError::Conflict => {
                WorkflowError::conflict("agent application already exists for this user")
            }
            other => other.into(),
        })?;

        let role = if application.submitted_by_admin {
            UserRole::Agent
        } else {
            UserRole::Customer
        };
        if let Err(err) = self.users.set_role(&user.id, role) {
            if let Err(undo) = self.agents.remove_agent(&stored.id) {
                warn!(
                    agent = %stored.id,
                    error = %undo,
                    "unable to discard unregistered agent"
                );
            }
            return Err(err.into());
        }

        info!(
            agent = %stored.id,
            user = %user.id,
            status = stored.status.label(),
            "agent application submitted"
        );

        if !application.submitted_by_admin {
            self.notifier.notify_role(
                UserRole::Admin,
                NotificationKind::AgentApplicationSubmitted {
                    applicant_name: user.full_name.clone(),
                },
                Some(stored.id.as_str()),
            );
        }

        Ok(stored)
    }

    /// Record a vetting decision. Decisions may be revisited; approving always promotes the
    /// linked user to the agent role.
    pub fn decide(
        &self,
        agent_id: &AgentId,
        decision: VettingDecision,
        notes: Option<String>,
    ) -> Result<Agent, WorkflowError> {
        let previous = self.load(agent_id)?;

        let mut agent = previous.clone();
        agent.status = decision.status();
        if let Some(notes) = notes.filter(|notes| !notes.trim().is_empty()) {
            agent.vetting_notes = Some(notes);
        }
        agent.updated_at = Utc::now();

        self.agents.update_agent(agent.clone())?;
        if decision == VettingDecision::Approved {
            if let Err(err) = self.users.set_role(&agent.user_id, UserRole::Agent) {
                if let Err(undo) = self.agents.update_agent(previous) {
                    warn!(
                        agent = %agent.id,
                        error = %undo,
                        "unable to restore agent after failed promotion"
                    );
                }
                return Err(err.into());
            }
        }

        info!(agent = %agent.id, status = agent.status.label(), "vetting decision recorded");

        self.notifier.notify(
            &agent.user_id,
            NotificationKind::VettingDecided {
                status: agent.status,
            },
            Some(agent.id.as_str()),
        );

        Ok(agent)
    }

    /// Replace the cities and/or areas an agent serves.
    ///
    /// Areas can only be supplied for an agent serving exactly one city (after applying any new
    /// city list), and must belong to that city. Switching to several cities clears the areas;
    /// switching to a different single city keeps only the areas inside it.
    pub fn reassign_scope(
        &self,
        agent_id: &AgentId,
        change: ScopeChange,
    ) -> Result<Agent, WorkflowError> {
        let mut agent = self.load(agent_id)?;

        let cities = match &change.city_ids {
            Some(city_ids) if city_ids.is_empty() => {
                return Err(WorkflowError::bad_request(
                    "at least one city must be provided",
                ));
            }
            Some(city_ids) => self.resolve_cities(city_ids)?,
            None => agent.cities().clone(),
        };

        let areas = match &change.area_ids {
            Some(_) if cities.len() != 1 => {
                return Err(WorkflowError::bad_request(
                    "areas can only be assigned when the agent serves exactly one city",
                ));
            }
            Some(area_ids) => self.resolve_areas(&cities, area_ids)?,
            None => self.retain_areas_within(&cities, agent.areas())?,
        };

        agent.set_scope(cities, areas);
        agent.updated_at = Utc::now();
        self.agents.update_agent(agent.clone())?;

        info!(
            agent = %agent.id,
            cities = agent.cities().len(),
            areas = agent.areas().len(),
            "agent scope reassigned"
        );

        Ok(agent)
    }

    pub fn get_agent(&self, agent_id: &AgentId) -> Result<Agent, WorkflowError> {
        self.load(agent_id)
    }

    fn load(&self, agent_id: &AgentId) -> Result<Agent, WorkflowError> {
        self.agents
            .fetch_agent(agent_id)?
            .ok_or_else(|| WorkflowError::not_found("agent"))
    }

    fn resolve_cities(&self, city_ids: &[CityId]) -> Result<BTreeSet<CityId>, WorkflowError> {
        let mut cities = BTreeSet::new();
        for city_id in city_ids {
            let city = self
                .geography
                .fetch_city(city_id)?
                .ok_or_else(|| WorkflowError::NotFound(format!("city {city_id} not found")))?;
            cities.insert(city.id);
        }
        Ok(cities)
    }

    fn resolve_areas(
        &self,
        cities: &BTreeSet<CityId>,
        area_ids: &[AreaId],
    ) -> Result<BTreeSet<AreaId>, WorkflowError> {
        let mut areas = BTreeSet::new();
        for area_id in area_ids {
            let area = self
                .geography
                .fetch_area(area_id)?
                .ok_or_else(|| WorkflowError::NotFound(format!("area {area_id} not found")))?;
            if !cities.contains(&area.city_id) {
                return Err(WorkflowError::bad_request(format!(
                    "area {} does not belong to the agent's city",
                    area.id
                )));
            }
            areas.insert(area.id);
        }
        Ok(areas)
    }

    fn retain_areas_within(
        &self,
        cities: &BTreeSet<CityId>,
        current: &BTreeSet<AreaId>,
    ) -> Result<BTreeSet<AreaId>, WorkflowError> {
        if cities.len() != 1 {
            return Ok(BTreeSet::new());
        }

        let mut kept = BTreeSet::new();
        for area_id in current {
            if let Some(area) = self.geography.fetch_area(area_id)? {
                if cities.contains(&area.city_id) {
                    kept.insert(area.id);
                }
            }
        }
        Ok(kept)
    }
}
