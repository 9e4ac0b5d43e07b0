use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_id!(
    /// Account identifier shared by customers, agents, and staff.
    UserId
);
string_id!(CityId);
string_id!(AreaId);
string_id!(PropertyId);
string_id!(
    /// Identifier of the agent profile, distinct from the linked [`UserId`].
    AgentId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Agent,
    Admin,
    Quality,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Agent => "agent",
            UserRole::Admin => "admin",
            UserRole::Quality => "quality",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
}

/// Neighbourhood inside exactly one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub city_id: CityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub city_id: CityId,
    pub area_id: AreaId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AgentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Approved => "approved",
            AgentStatus::Rejected => "rejected",
        }
    }
}

/// Vetted (or vetting) agent profile linked one-to-one with a user account.
///
/// An agent serving more than one city never carries area assignments; areas only scope
/// agents that serve exactly one city. [`Agent::set_scope`] is the only way to change the
/// assignment sets and enforces that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub user_id: UserId,
    pub status: AgentStatus,
    cities: BTreeSet<CityId>,
    areas: BTreeSet<AreaId>,
    pub identity_proof: String,
    pub residency_proof: String,
    pub vetting_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        user_id: UserId,
        status: AgentStatus,
        identity_proof: String,
        residency_proof: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            cities: BTreeSet::new(),
            areas: BTreeSet::new(),
            identity_proof,
            residency_proof,
            vetting_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cities(&self) -> &BTreeSet<CityId> {
        &self.cities
    }

    pub fn areas(&self) -> &BTreeSet<AreaId> {
        &self.areas
    }

    /// Replace both assignment sets. Areas are dropped whenever more than one city remains.
    pub fn set_scope<C, A>(&mut self, cities: C, areas: A)
    where
        C: IntoIterator<Item = CityId>,
        A: IntoIterator<Item = AreaId>,
    {
        self.cities = cities.into_iter().collect();
        self.areas = if self.cities.len() > 1 {
            BTreeSet::new()
        } else {
            areas.into_iter().collect()
        };
    }

    pub fn is_approved(&self) -> bool {
        self.status == AgentStatus::Approved
    }

    /// Area-scoped agents serve the areas they list; city-scoped agents (no areas) serve every
    /// area of their cities.
    pub fn serves(&self, area: &Area) -> bool {
        if self.areas.is_empty() {
            self.cities.contains(&area.city_id)
        } else {
            self.areas.contains(&area.id)
        }
    }
}
