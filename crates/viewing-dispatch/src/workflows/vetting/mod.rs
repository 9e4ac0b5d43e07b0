//! Agent application intake, admin/quality vetting decisions, and city/area scope management.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{AgentApplication, ScopeChange, VettingDecision, VettingDecisionRequest};
pub use router::vetting_router;
pub use service::VettingService;
