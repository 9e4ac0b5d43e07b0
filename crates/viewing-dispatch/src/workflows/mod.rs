//! Marketplace workflows: agent directory and vetting, viewing appointment scheduling,
//! per-agent request arbitration, and the notification fan-out that accompanies them.

use std::sync::Arc;

use axum::Router;

use crate::config::SchedulingConfig;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

pub mod directory;
mod error;
pub mod memory;
pub mod notifications;
pub mod pagination;
pub(crate) mod parse;
pub mod scheduling;
pub mod vetting;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::WorkflowError;

use directory::{
    AgentRepository, DirectoryService, GeographyRepository, PropertyRepository, UserDirectory,
};
use notifications::{NotificationGateway, Notifier};
use scheduling::{AppointmentRepository, AppointmentScheduler, RequestArbitrator};
use vetting::VettingService;

/// Handles to every store the workflows read from and write to.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserDirectory>,
    pub geography: Arc<dyn GeographyRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

impl Stores {
    /// Back every store with the same value, e.g. a single database handle or [`memory::InMemoryStore`].
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserDirectory
            + GeographyRepository
            + PropertyRepository
            + AgentRepository
            + AppointmentRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            geography: store.clone(),
            properties: store.clone(),
            agents: store.clone(),
            appointments: store,
        }
    }
}

/// The four workflow services wired against one set of stores and one notification gateway.
#[derive(Clone)]
pub struct Marketplace {
    pub directory: Arc<DirectoryService>,
    pub vetting: Arc<VettingService>,
    pub scheduler: Arc<AppointmentScheduler>,
    pub arbitrator: Arc<RequestArbitrator>,
}

impl Marketplace {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn NotificationGateway>,
        config: SchedulingConfig,
    ) -> Self {
        let notifier = Notifier::new(gateway, stores.users.clone());
        let directory = DirectoryService::new(&stores);

        Self {
            vetting: Arc::new(VettingService::new(&stores, notifier.clone())),
            scheduler: Arc::new(AppointmentScheduler::new(
                &stores,
                directory.clone(),
                notifier.clone(),
                config,
            )),
            arbitrator: Arc::new(RequestArbitrator::new(&stores, notifier, config)),
            directory: Arc::new(directory),
        }
    }

    /// Every workflow route merged into one router.
    pub fn router(&self) -> Router {
        directory::directory_router(self.directory.clone())
            .merge(vetting::vetting_router(self.vetting.clone()))
            .merge(scheduling::scheduling_router(
                self.scheduler.clone(),
                self.arbitrator.clone(),
            ))
    }
}
