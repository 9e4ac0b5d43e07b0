//! Reference data the workflows depend on (users, cities, areas, properties, agent records)
//! and the eligibility rules that map a property's area onto the agents able to serve it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Agent, AgentId, AgentStatus, Area, AreaId, City, CityId, Property, PropertyId, User, UserId,
    UserRole,
};
pub use repository::{
    AgentRepository, GeographyRepository, PropertyRepository, RepositoryError, UserDirectory,
};
pub use router::directory_router;
pub use service::DirectoryService;
