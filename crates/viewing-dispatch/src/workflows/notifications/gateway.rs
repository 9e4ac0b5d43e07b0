use tracing::info;

use super::domain::Notification;

/// Outbound delivery hook (in-app inbox, e-mail, SMS adapters).
pub trait NotificationGateway: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Gateway that only writes each notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingGateway;

impl NotificationGateway for TracingGateway {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient,
            title = notification.title.as_str(),
            related_id = notification.related_id.as_deref().unwrap_or("-"),
            "notification dispatched"
        );
        Ok(())
    }
}
