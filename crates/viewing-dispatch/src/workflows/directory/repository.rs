use super::domain::{
    Agent, AgentId, Area, AreaId, City, CityId, Property, PropertyId, User, UserId, UserRole,
};

/// Storage abstraction for user accounts.
pub trait UserDirectory: Send + Sync {
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), RepositoryError>;
    /// Current holders of a role, resolved at call time.
    fn users_with_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError>;
}

pub trait GeographyRepository: Send + Sync {
    fn fetch_city(&self, id: &CityId) -> Result<Option<City>, RepositoryError>;
    fn fetch_area(&self, id: &AreaId) -> Result<Option<Area>, RepositoryError>;
}

pub trait PropertyRepository: Send + Sync {
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
}

/// Agent profiles. At most one agent exists per user; `insert` reports [`RepositoryError::Conflict`]
/// for a second profile on the same user.
pub trait AgentRepository: Send + Sync {
    fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError>;
    fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError>;
    /// Drop a profile that was never fully registered.
    fn remove_agent(&self, id: &AgentId) -> Result<(), RepositoryError>;
    fn fetch_agent(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;
    fn fetch_agent_by_user(&self, user_id: &UserId) -> Result<Option<Agent>, RepositoryError>;
    fn approved_agents(&self) -> Result<Vec<Agent>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    VersionConflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
