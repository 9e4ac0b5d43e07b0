use std::sync::Arc;

use tracing::debug;

use super::domain::{Agent, AgentId, AreaId, UserId};
use super::repository::{AgentRepository, GeographyRepository};
use crate::workflows::{Stores, WorkflowError};

/// Read-only lookups translating geography and user identities into agent records.
#[derive(Clone)]
pub struct DirectoryService {
    agents: Arc<dyn AgentRepository>,
    geography: Arc<dyn GeographyRepository>,
}

impl DirectoryService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            agents: stores.agents.clone(),
            geography: stores.geography.clone(),
        }
    }

    /// Approved agents serving the area. An empty result is returned as-is; scheduling treats it
    /// as a failure.
    pub fn find_eligible_agents(&self, area_id: &AreaId) -> Result<Vec<Agent>, WorkflowError> {
        let area = self
            .geography
            .fetch_area(area_id)?
            .ok_or_else(|| WorkflowError::not_found("area"))?;

        let mut eligible: Vec<Agent> = self
            .agents
            .approved_agents()?
            .into_iter()
            .filter(|agent| agent.is_approved() && agent.serves(&area))
            .collect();
        eligible.sort_by(|left, right| left.id.cmp(&right.id));

        debug!(area = %area_id, count = eligible.len(), "resolved eligible agents");
        Ok(eligible)
    }

    pub fn resolve_agent_for_user(&self, user_id: &UserId) -> Result<Agent, WorkflowError> {
        self.agents
            .fetch_agent_by_user(user_id)?
            .ok_or_else(|| WorkflowError::not_found("agent for this user"))
    }

    pub fn get_agent(&self, agent_id: &AgentId) -> Result<Agent, WorkflowError> {
        self.agents
            .fetch_agent(agent_id)?
            .ok_or_else(|| WorkflowError::not_found("agent"))
    }
}
