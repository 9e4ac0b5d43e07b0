use serde::{Deserialize, Serialize};

use crate::workflows::directory::{AgentStatus, AreaId, CityId, UserId};

/// Intake payload for a new agent profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentApplication {
    pub user_id: UserId,
    pub city_ids: Vec<CityId>,
    #[serde(default)]
    pub area_ids: Option<Vec<AreaId>>,
    pub identity_proof: String,
    pub residency_proof: String,
    /// Admin-submitted profiles skip vetting and start out approved.
    #[serde(default)]
    pub submitted_by_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VettingDecision {
    Approved,
    Rejected,
}

impl VettingDecision {
    pub const fn status(self) -> AgentStatus {
        match self {
            VettingDecision::Approved => AgentStatus::Approved,
            VettingDecision::Rejected => AgentStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VettingDecisionRequest {
    pub decision: VettingDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of an agent's service scope. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScopeChange {
    #[serde(default)]
    pub city_ids: Option<Vec<CityId>>,
    #[serde(default)]
    pub area_ids: Option<Vec<AreaId>>,
}
